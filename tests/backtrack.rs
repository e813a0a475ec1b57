use recoil::{Regex, RegexOptions};

include!("macros.rs");

#[test]
fn alternation_prefers_left_branch() {
    let re = Regex::new("a|ab").unwrap();
    let m = re.find("ab").unwrap().unwrap();
    assert_eq!(m.value(), "a");

    let re = Regex::new("ab|a").unwrap();
    let m = re.find("ab").unwrap().unwrap();
    assert_eq!(m.value(), "ab");
}

#[test]
fn greedy_consumes_maximum_then_backs_off() {
    let re = Regex::new("<(.*)>").unwrap();
    let m = re.find("<a><b>").unwrap().unwrap();
    assert_eq!(m.group(1).unwrap().value(), "a><b");

    let re = Regex::new("a*a").unwrap();
    let m = re.find("aaaa").unwrap().unwrap();
    assert_eq!(m.range(), 0..4);
}

#[test]
fn lazy_consumes_minimum_then_grows() {
    let re = Regex::new("<(.*?)>").unwrap();
    let m = re.find("<a><b>").unwrap().unwrap();
    assert_eq!(m.group(1).unwrap().value(), "a");

    let re = Regex::new("a+?").unwrap();
    let m = re.find("aaa").unwrap().unwrap();
    assert_eq!(m.range(), 0..1);

    let re = Regex::new("a+?b").unwrap();
    let m = re.find("aaab").unwrap().unwrap();
    assert_eq!(m.range(), 0..4);
}

#[test]
fn counted_repetition() {
    let re = Regex::new("^a{2,4}$").unwrap();
    assert!(!re.is_match("a").unwrap());
    assert!(re.is_match("aa").unwrap());
    assert!(re.is_match("aaaa").unwrap());
    assert!(!re.is_match("aaaaa").unwrap());

    let re = Regex::new("(ab){2,3}").unwrap();
    let m = re.find("abababab").unwrap().unwrap();
    assert_eq!(m.range(), 0..6);

    let re = Regex::new("(ab){1,3}?").unwrap();
    let m = re.find("ababab").unwrap().unwrap();
    assert_eq!(m.range(), 0..2);
}

#[test]
fn counted_group_backs_off_whole_iterations() {
    let re = Regex::new("^(?:ab){1,3}abc$").unwrap();
    assert!(re.is_match("abababc").unwrap());
    assert!(re.is_match("ababc").unwrap());
    assert!(!re.is_match("abc").unwrap());
}

#[test]
fn atomic_group_forbids_backtracking() {
    let re = Regex::new("(?>a+)a").unwrap();
    assert!(!re.is_match("aaaa").unwrap());

    let plain = Regex::new("(a+)a").unwrap();
    assert!(plain.is_match("aaaa").unwrap());
}

#[test]
fn atomic_group_commits_inner_choice() {
    let re = Regex::new("^(?>ab|a)b$").unwrap();
    assert!(!re.is_match("ab").unwrap());
    assert!(re.is_match("abb").unwrap());
}

#[test]
fn empty_loop_bodies_terminate() {
    let re = Regex::new("(?:a?)*y").unwrap();
    assert!(re.is_match("y").unwrap());
    let re = Regex::new("(?:)*x").unwrap();
    assert!(re.is_match("x").unwrap());
    let re = Regex::new("(a*)*").unwrap();
    assert_eq!(first_span!(re, "b"), Some((0, 0)));
}

#[test]
fn lookahead() {
    let re = Regex::new(r"foo(?=bar)").unwrap();
    assert_eq!(first_span!(re, "foobar"), Some((0, 3)));
    assert_eq!(first_span!(re, "foobaz"), None);

    let re = Regex::new(r"foo(?!bar)").unwrap();
    assert_eq!(first_span!(re, "foobaz"), Some((0, 3)));
    assert_eq!(first_span!(re, "foobar"), None);
}

#[test]
fn lookbehind() {
    let re = Regex::new(r"(?<=foo)bar").unwrap();
    assert_eq!(first_span!(re, "foobar"), Some((3, 6)));
    assert_eq!(first_span!(re, "bazbar"), None);

    let re = Regex::new(r"(?<!foo)bar").unwrap();
    assert_eq!(first_span!(re, "bazbar"), Some((3, 6)));
    assert_eq!(first_span!(re, "foobar"), None);
}

#[test]
fn variable_width_lookbehind() {
    let re = Regex::new(r"(?<=\d{2,3})x").unwrap();
    assert!(re.is_match("12x").unwrap());
    assert!(re.is_match("123x").unwrap());
    assert!(!re.is_match("1x").unwrap());
}

#[test]
fn anchors() {
    let re = Regex::new("^foo").unwrap();
    assert_eq!(findall!(re, "foo\nfoo"), vec![(0, 3)]);

    let re =
        Regex::with_options("^foo", RegexOptions::MULTILINE).unwrap();
    assert_eq!(findall!(re, "foo\nfoo"), vec![(0, 3), (4, 7)]);

    let re = Regex::with_options("foo$", RegexOptions::MULTILINE).unwrap();
    assert_eq!(findall!(re, "foo\nfoo"), vec![(0, 3), (4, 7)]);

    let re = Regex::new(r"\Afoo").unwrap();
    assert_eq!(findall!(re, "foo foo"), vec![(0, 3)]);

    // $ and \Z tolerate one trailing newline, \z does not
    let re = Regex::new(r"foo$").unwrap();
    assert!(re.is_match("foo\n").unwrap());
    let re = Regex::new(r"foo\Z").unwrap();
    assert!(re.is_match("foo\n").unwrap());
    let re = Regex::new(r"foo\z").unwrap();
    assert!(!re.is_match("foo\n").unwrap());
    assert!(re.is_match("foo").unwrap());
}

#[test]
fn word_boundaries() {
    let re = Regex::new(r"\bcat\b").unwrap();
    assert_eq!(first_span!(re, "the cat sat"), Some((4, 7)));
    assert_eq!(first_span!(re, "concatenate"), None);

    let re = Regex::new(r"\Bcat\B").unwrap();
    assert_eq!(first_span!(re, "concatenate"), Some((3, 6)));
    assert_eq!(first_span!(re, "the cat sat"), None);
}

#[test]
fn dot_and_singleline() {
    let re = Regex::new("a.b").unwrap();
    assert!(!re.is_match("a\nb").unwrap());
    let re = Regex::with_options("a.b", RegexOptions::SINGLELINE).unwrap();
    assert!(re.is_match("a\nb").unwrap());
}

#[test]
fn ignore_case_option() {
    let re =
        Regex::with_options("straße", RegexOptions::IGNORE_CASE).unwrap();
    assert!(re.is_match("STRAßE").unwrap());

    let re = Regex::with_options("[a-z]+", RegexOptions::IGNORE_CASE).unwrap();
    let m = re.find("HeLLo").unwrap().unwrap();
    assert_eq!(m.range(), 0..5);
}

#[test]
fn ignore_pattern_whitespace() {
    let re = Regex::with_options(
        "a b  # trailing comment\n c",
        RegexOptions::IGNORE_PATTERN_WHITESPACE,
    )
    .unwrap();
    assert!(re.is_match("abc").unwrap());

    let re = Regex::new("a(?#inline comment)b").unwrap();
    assert!(re.is_match("ab").unwrap());
}

#[test]
fn unicode_classes() {
    let re = Regex::new(r"\p{Greek}+").unwrap();
    assert_eq!(first_span!(re, "abcαβγ"), Some((3, 6)));

    let re = Regex::new(r"\P{L}").unwrap();
    assert_eq!(first_span!(re, "ab9"), Some((2, 3)));

    let re = Regex::new(r"\d+").unwrap();
    assert!(re.is_match("٣٤").unwrap());

    let ecma = Regex::with_options(r"^\d+$", RegexOptions::ECMA_SCRIPT)
        .unwrap();
    assert!(!ecma.is_match("٣٤").unwrap());
}

#[test]
fn class_subtraction() {
    let re = Regex::new(r"^[a-z-[aeiou]]+$").unwrap();
    assert!(re.is_match("rhythm").unwrap());
    assert!(!re.is_match("vowel").unwrap());
}

#[test]
fn right_to_left_finds_last_match_first() {
    let re =
        Regex::with_options("ab", RegexOptions::RIGHT_TO_LEFT).unwrap();
    let m = re.find("ab ab").unwrap().unwrap();
    assert_eq!(m.range(), 3..5);
    let m2 = re.find_next(&m).unwrap().unwrap();
    assert_eq!(m2.range(), 0..2);
    assert!(re.find_next(&m2).unwrap().is_none());
}

#[test]
fn right_to_left_keeps_alternation_order() {
    let re =
        Regex::with_options("a|b", RegexOptions::RIGHT_TO_LEFT).unwrap();
    let m = re.find("ab").unwrap().unwrap();
    assert_eq!(m.value(), "b");
    assert_eq!(m.range(), 1..2);
}

#[test]
fn right_to_left_captures() {
    let re = Regex::with_options(
        r"(\d+)-(\d+)",
        RegexOptions::RIGHT_TO_LEFT,
    )
    .unwrap();
    let m = re.find("10-20 30-40").unwrap().unwrap();
    assert_eq!(m.value(), "30-40");
    assert_eq!(m.group(1).unwrap().value(), "30");
    assert_eq!(m.group(2).unwrap().value(), "40");
}

#[test]
fn inline_options_toggle() {
    let re = Regex::new("(?i)abc").unwrap();
    assert!(re.is_match("ABC").unwrap());

    let re = Regex::new("a(?i:b)c").unwrap();
    assert!(re.is_match("aBc").unwrap());
    assert!(!re.is_match("aBC").unwrap());

    let re = Regex::with_options("(?-i)abc", RegexOptions::IGNORE_CASE)
        .unwrap();
    assert!(!re.is_match("ABC").unwrap());
}

#[test]
fn literal_prefix_scan_is_still_correct() {
    // multi-char literal head exercises the prefix skip path
    let re = Regex::new("needle").unwrap();
    let hay = format!("{}needle{}", "x".repeat(100), "y".repeat(10));
    let m = re.find(&hay).unwrap().unwrap();
    assert_eq!(m.range(), 100..106);
    assert!(re.find("haystack only").unwrap().is_none());

    let re = Regex::new("^needle").unwrap();
    assert!(re.find(&hay).unwrap().is_none());
    assert!(re.is_match("needle and more").unwrap());
}
