use recoil::{escape, unescape, Error, Regex, RegexOptions};

include!("macros.rs");

#[test]
fn find_all_indices() {
    let re = Regex::new(r"p([a-z]+)ch").unwrap();
    assert_eq!(
        findall!(re, "peach punch pinch"),
        vec![(0, 5), (6, 11), (12, 17)]
    );
}

#[test]
fn find_all_submatch_indices() {
    let re = Regex::new(r"p([a-z]+)ch").unwrap();
    let got: Vec<Vec<usize>> = re
        .find_iter("peach punch pinch")
        .map(|m| {
            let m = m.unwrap();
            m.groups()
                .iter()
                .flat_map(|g| [g.index(), g.index() + g.len()])
                .collect()
        })
        .collect();
    assert_eq!(
        got,
        vec![vec![0, 5, 1, 3], vec![6, 11, 7, 9], vec![12, 17, 13, 15]]
    );
}

#[test]
fn find_next_walks_words() {
    let re = Regex::new(r"(?<word>\w+)").unwrap();
    let m = re.find("hello world").unwrap().unwrap();
    let word = m.named("word").unwrap();
    assert_eq!((word.index(), word.len()), (0, 5));

    let m2 = re.find_next(&m).unwrap().unwrap();
    assert_eq!((m2.index(), m2.len()), (6, 5));
    assert!(re.find_next(&m2).unwrap().is_none());
}

#[test]
fn zero_width_matches_advance() {
    let re = Regex::new("a*").unwrap();
    let m = re.find("bbb").unwrap().unwrap();
    assert_eq!((m.index(), m.len()), (0, 0));
    assert_eq!(findall!(re, "bbb"), vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
}

#[test]
fn empty_regex_empty_match() {
    let re = Regex::new("").unwrap();
    assert_eq!(findall!(re, ""), vec![(0, 0)]);
    assert_eq!(findall!(re, "abc"), vec![(0, 0), (1, 1), (2, 2), (3, 3)]);
}

#[test]
fn zero_length_vs_nonzero_interleave() {
    // unlike leftmost-first linear engines, an empty match directly after
    // a nonempty one is reported, as in .NET
    let re = Regex::new(r"\d*").unwrap();
    assert_eq!(
        findall!(re, "a1b2"),
        vec![(0, 0), (1, 2), (2, 2), (3, 4), (4, 4)]
    );
}

#[test]
fn match_value_and_range() {
    let re = Regex::new(r"[a-z]+").unwrap();
    let m = re.find("123abc456").unwrap().unwrap();
    assert_eq!(m.range(), 3..6);
    assert_eq!(m.value(), "abc");
    assert!(!m.is_empty());
}

#[test]
fn is_match_agrees_with_find() {
    let re = Regex::new(r"ab?c").unwrap();
    for text in ["abc", "ac", "xxacxx", "ab", ""] {
        assert_eq!(
            re.is_match(text).unwrap(),
            re.find(text).unwrap().is_some(),
            "disagreement on {:?}",
            text
        );
    }
}

#[test]
fn positions_are_scalar_indices() {
    let re = Regex::new("ö").unwrap();
    let m = re.find("xöy").unwrap().unwrap();
    assert_eq!(m.range(), 1..2);

    let re = Regex::new(".").unwrap();
    assert_eq!(findall!(re, "é漢a"), vec![(0, 1), (1, 2), (2, 3)]);
}

#[test]
fn find_from_validates_byte_offsets() {
    let re = Regex::new("a").unwrap();
    // 'é' is two bytes; offset 1 splits it
    match re.find_from("éa", 1) {
        Err(Error::BadStart { offset: 1 }) => {}
        other => panic!("expected BadStart, got {:?}", other),
    }
    let m = re.find_from("éa", 2).unwrap().unwrap();
    assert_eq!(m.range(), 1..2);
    assert!(re.find_from("abc", 99).is_err());
}

#[test]
fn find_from_respects_contiguous_anchor() {
    let re = Regex::new(r"\Gb").unwrap();
    assert!(re.find_from("ab", 1).unwrap().is_some());
    assert!(re.find_from("ab", 0).unwrap().is_none());
}

#[test]
fn group_metadata() {
    let re = Regex::new(r"(a)(?<x>b)").unwrap();
    assert_eq!(re.group_numbers(), vec![0, 1, 2]);
    assert_eq!(re.group_names(), vec!["0", "1", "x"]);
    assert_eq!(re.group_name_from_number(2), "x");
    assert_eq!(re.group_name_from_number(1), "1");
    assert_eq!(re.group_name_from_number(9), "");
    assert_eq!(re.group_number_from_name("x"), Some(2));
    assert_eq!(re.group_number_from_name("2"), Some(2));
    assert_eq!(re.group_number_from_name("nope"), None);
    assert_eq!(re.captures_len(), 3);
}

#[test]
fn explicit_numbered_groups_are_sparse() {
    let re = Regex::new(r"(?<5>a)").unwrap();
    assert_eq!(re.group_numbers(), vec![0, 5]);
    let m = re.find("a").unwrap().unwrap();
    assert_eq!(m.group(5).unwrap().value(), "a");
    assert!(m.group(1).is_none());
}

#[test]
fn escape_literal_lift() {
    let text = "1+1=2? (yes) [really] {sure}";
    let re = Regex::new(&escape(text)).unwrap();
    let m = re.find(text).unwrap().unwrap();
    assert_eq!(m.range(), 0..text.chars().count());
    assert_eq!(m.value(), text);
}

#[test]
fn escape_unescape_roundtrip() {
    let text = r"a*b+c.d|e";
    assert_eq!(unescape(&escape(text)).unwrap(), text);
}

#[test]
fn syntax_errors_carry_positions() {
    match Regex::new("a(b") {
        Err(Error::Syntax { pos, .. }) => assert!(pos <= 3),
        other => panic!("expected syntax error, got {:?}", other),
    }
    assert!(Regex::new("a{2,1}").is_err());
    assert!(Regex::new(r"\q").is_err());
    assert!(Regex::new("[z-a]").is_err());
}

#[test]
fn compiled_option_is_accepted() {
    let re =
        Regex::with_options("ab", RegexOptions::COMPILED).unwrap();
    assert!(re.is_match("xabx").unwrap());
}

#[test]
fn regex_is_cloneable_and_shareable() {
    let re = Regex::new(r"\w+").unwrap();
    let re2 = re.clone();
    assert_eq!(re2.as_str(), re.as_str());
    assert!(re2.is_match("ok").unwrap());

    let shared = std::sync::Arc::new(re);
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let re = shared.clone();
            std::thread::spawn(move || {
                for _ in 0..50 {
                    assert!(re.is_match("many words here").unwrap());
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }
}
