use std::time::{Duration, Instant};

use recoil::{Error, Regex};

#[test]
fn catastrophic_pattern_times_out_near_deadline() {
    let mut re = Regex::new(r"(a+)+b").unwrap();
    re.set_match_timeout(Duration::from_millis(100));
    let input = "a".repeat(40);

    let started = Instant::now();
    let result = re.is_match(&input);
    let elapsed = started.elapsed();

    match result {
        Err(Error::Timeout { ref pattern, duration }) => {
            assert_eq!(pattern, r"(a+)+b");
            assert_eq!(duration, Duration::from_millis(100));
        }
        other => panic!("expected a timeout, got {:?}", other),
    }
    // the deadline is checked every fixed number of ticks, so the
    // overshoot stays small even though the attempt would otherwise run
    // for eons
    assert!(
        elapsed < Duration::from_secs(5),
        "timeout overshot: {:?}",
        elapsed
    );
}

#[test]
fn timeout_surfaces_from_every_operation() {
    let mut re = Regex::new(r"(a+)+b").unwrap();
    re.set_match_timeout(Duration::from_millis(50));
    let input = "a".repeat(40);

    assert!(matches!(re.find(&input), Err(Error::Timeout { .. })));
    assert!(matches!(
        re.replace_all(&input, "x"),
        Err(Error::Timeout { .. })
    ));
    let mut it = re.find_iter(&input);
    assert!(matches!(it.next(), Some(Err(Error::Timeout { .. }))));
    assert!(it.next().is_none());
}

#[test]
fn fast_matches_are_unaffected_by_a_timeout() {
    let mut re = Regex::new(r"\w+").unwrap();
    re.set_match_timeout(Duration::from_secs(10));
    assert!(re.is_match("hello").unwrap());
}

#[test]
fn no_timeout_means_run_to_completion() {
    let re = Regex::new(r"(a+)+b").unwrap();
    assert!(re.match_timeout().is_none());
    // small enough to finish without a deadline
    assert!(re.is_match("aaab").unwrap());
    assert!(!re.is_match("aaaa").unwrap());
}
