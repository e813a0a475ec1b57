use recoil::{Regex, RegexOptions};

#[test]
fn backreference_matches_captured_text() {
    let re = Regex::new(r"(a)(b)\1").unwrap();
    let m = re.find("aba").unwrap().unwrap();
    assert_eq!(m.range(), 0..3);
    assert_eq!(m.group(1).unwrap().range(), 0..1);
    assert_eq!(m.group(2).unwrap().range(), 1..2);
    assert!(!re.is_match("abb").unwrap());
}

#[test]
fn named_backreference() {
    let re = Regex::new(r#"(?<q>['"])\w+\k<q>"#).unwrap();
    assert!(re.is_match("'hello'").unwrap());
    assert!(!re.is_match("'hello\"").unwrap());
}

#[test]
fn case_insensitive_backreference() {
    let re =
        Regex::with_options(r"(\w+) \1", RegexOptions::IGNORE_CASE).unwrap();
    assert!(re.is_match("Hello hELLo").unwrap());
}

#[test]
fn repeated_group_keeps_history() {
    let re = Regex::new(r"(\w)+").unwrap();
    let m = re.find("abc").unwrap().unwrap();
    let g = m.group(1).unwrap();
    assert_eq!(g.value(), "c");
    let history: Vec<String> =
        g.captures().iter().map(|c| c.value()).collect();
    assert_eq!(history, vec!["a", "b", "c"]);
}

#[test]
fn unset_group_is_distinct_from_empty() {
    let re = Regex::new(r"(a)?(b*)c").unwrap();
    let m = re.find("c").unwrap().unwrap();
    let g1 = m.group(1).unwrap();
    let g2 = m.group(2).unwrap();
    assert!(!g1.matched());
    assert!(g2.matched());
    assert!(g2.is_empty());
}

#[test]
fn failed_branches_leak_no_captures() {
    // the first arm captures 'a' before dying at 'X'; the winning arm
    // must not see that capture
    let re = Regex::new(r"(?:(a)X|a(b))").unwrap();
    let m = re.find("ab").unwrap().unwrap();
    assert!(!m.group(1).unwrap().matched());
    assert_eq!(m.group(2).unwrap().value(), "b");
}

#[test]
fn lookahead_captures_survive() {
    let re = Regex::new(r"(?=(ab))a").unwrap();
    let m = re.find("ab").unwrap().unwrap();
    assert_eq!(m.range(), 0..1);
    assert_eq!(m.group(1).unwrap().value(), "ab");
}

#[test]
fn negative_lookahead_captures_do_not_survive() {
    // the body captures 'a' before failing at 'x'; the capture must be
    // unwound when the lookahead succeeds by failing
    let re = Regex::new(r"(?!(a)x)ab").unwrap();
    let m = re.find("ab").unwrap().unwrap();
    assert!(!m.group(1).unwrap().matched());
}

#[test]
fn balancing_group_transfers_spans() {
    let re = Regex::new(r"^(?<open>a)+(?<close-open>b)+$").unwrap();
    let m = re.find("aabb").unwrap().unwrap();
    assert!(!m.named("open").unwrap().matched());
    let close = m.named("close").unwrap();
    let spans: Vec<(usize, usize)> = close
        .captures()
        .iter()
        .map(|c| (c.index, c.length))
        .collect();
    assert_eq!(spans, vec![(2, 0), (1, 2)]);
    assert_eq!(close.value(), "ab");
}

#[test]
fn balancing_rejects_unbalanced_input() {
    let re = Regex::new(r"^(?<open>a)+(?<-open>b)+$").unwrap();
    assert!(re.is_match("aabb").unwrap());
    assert!(re.is_match("ab").unwrap());
    assert!(!re.is_match("abb").unwrap());
}

#[test]
fn balanced_parens_classic() {
    let re = Regex::new(
        r"^(?:(?<open>\()|(?<-open>\))|[^()])*(?(open)(?!))$",
    )
    .unwrap();
    assert!(re.is_match("(a(b)c)").unwrap());
    assert!(re.is_match("no parens at all").unwrap());
    assert!(!re.is_match("(a(b").unwrap());
    assert!(!re.is_match("a)b").unwrap());
}

#[test]
fn conditional_on_group() {
    let re = Regex::new(r"^(a)?(?(1)b|c)$").unwrap();
    assert!(re.is_match("ab").unwrap());
    assert!(re.is_match("c").unwrap());
    assert!(!re.is_match("b").unwrap());
    assert!(!re.is_match("ac").unwrap());
}

#[test]
fn conditional_on_named_group() {
    let re = Regex::new(r"^(?<num>\d)?(?(num)!|\?)$").unwrap();
    assert!(re.is_match("5!").unwrap());
    assert!(re.is_match("?").unwrap());
    assert!(!re.is_match("5?").unwrap());
}

#[test]
fn named_groups_number_after_unnamed() {
    let re = Regex::new(r"(a)(?<n>b)(c)").unwrap();
    let m = re.find("abc").unwrap().unwrap();
    assert_eq!(m.group(1).unwrap().value(), "a");
    assert_eq!(m.group(2).unwrap().value(), "c");
    assert_eq!(m.group(3).unwrap().value(), "b");
    assert_eq!(m.named("n").unwrap().number, 3);
}

#[test]
fn all_digit_name_resolves_as_number() {
    let re = Regex::new(r"(x)(y)").unwrap();
    let m = re.find("xy").unwrap().unwrap();
    assert_eq!(m.named("2").unwrap().value(), "y");
}

#[test]
fn explicit_capture_option_disables_plain_groups() {
    let re = Regex::with_options(
        r"(a)(?<keep>b)",
        RegexOptions::EXPLICIT_CAPTURE,
    )
    .unwrap();
    assert_eq!(re.captures_len(), 2);
    let m = re.find("ab").unwrap().unwrap();
    assert_eq!(m.named("keep").unwrap().value(), "b");
    assert!(m.group(2).is_none());
}

#[test]
fn group_zero_is_whole_match() {
    let re = Regex::new(r"b+").unwrap();
    let m = re.find("abbc").unwrap().unwrap();
    let g0 = m.group(0).unwrap();
    assert_eq!(g0.range(), m.range());
    assert_eq!(g0.value(), "bb");
}

#[test]
fn forward_reference_is_unset_on_first_iteration() {
    let re = Regex::new(r"^(?:\1?(a)){2}$").unwrap();
    assert!(re.is_match("aa").unwrap());
    assert!(re.is_match("aaa").unwrap());
    assert!(!re.is_match("a").unwrap());
}

#[test]
fn ecma_unset_backreference_matches_empty() {
    let re = Regex::with_options(
        r"^(?:(a)|b)\1$",
        RegexOptions::ECMA_SCRIPT,
    )
    .unwrap();
    assert!(re.is_match("b").unwrap());
    assert!(re.is_match("aa").unwrap());

    let strict = Regex::new(r"^(?:(a)|b)\1$").unwrap();
    assert!(!strict.is_match("b").unwrap());
}
