use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use regex_syntax::hir::{Class, HirKind};

/// The highest Unicode scalar value.
const MAX_SCALAR: char = '\u{10FFFF}';

/// Folding a range wider than this is done by keeping the range as-is; the
/// only ranges that wide are the big Unicode blocks that already carry both
/// cases.
const FOLD_SCAN_LIMIT: u32 = 1024;

/// A set of Unicode scalar values, the matching predicate behind the `Set`
/// family of opcodes.
///
/// A set is a union of inclusive scalar ranges, optionally negated, with an
/// optional subtracted set (the `[base-[sub]]` class subtraction syntax).
/// Named classes (`\d`, `\w`, `\p{Greek}`, ...) are resolved to ranges when
/// the pattern is parsed, so membership tests never consult Unicode tables.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CharSet {
    negate: bool,
    ranges: Vec<(char, char)>,
    sub: Option<Box<CharSet>>,
}

impl CharSet {
    /// Create an empty (matches nothing) set.
    pub fn new() -> CharSet {
        CharSet::default()
    }

    /// Create a set holding exactly one scalar.
    pub fn single(ch: char) -> CharSet {
        let mut s = CharSet::new();
        s.add_char(ch);
        s
    }

    /// The set matching any scalar except `\n`, i.e. `.` outside of
    /// single-line mode.
    pub fn any_but_newline() -> CharSet {
        let mut s = CharSet::new();
        s.add_char('\n');
        s.negate = true;
        s
    }

    /// The set matching any scalar, i.e. `.` in single-line mode.
    pub fn any() -> CharSet {
        let mut s = CharSet::new();
        s.add_range('\0', MAX_SCALAR);
        s
    }

    pub fn add_char(&mut self, ch: char) {
        self.ranges.push((ch, ch));
    }

    pub fn add_range(&mut self, first: char, last: char) {
        debug_assert!(first <= last);
        self.ranges.push((first, last));
    }

    pub fn add_ranges(&mut self, ranges: &[(char, char)]) {
        self.ranges.extend_from_slice(ranges);
    }

    /// Union in the complement of `ranges` (used for `\D`, `\W`, `\S` and
    /// `\P{..}` inside a class, where flipping the whole set is wrong).
    pub fn add_negated_ranges(&mut self, ranges: &[(char, char)]) {
        self.ranges.extend(complement(ranges));
    }

    pub fn set_negate(&mut self, negate: bool) {
        self.negate = negate;
    }

    pub fn is_negated(&self) -> bool {
        self.negate
    }

    pub fn set_subtraction(&mut self, sub: CharSet) {
        self.sub = Some(Box::new(sub));
    }

    /// Fold the set for case-insensitive matching: the engine lowercases
    /// each input scalar before testing membership, so every range must be
    /// reachable through its lowercase image.
    pub fn add_lowercase(&mut self) {
        let orig = std::mem::take(&mut self.ranges);
        for (first, last) in orig {
            if first == last {
                let lo = fold(first);
                self.ranges.push((lo, lo));
            } else if last as u32 - first as u32 <= FOLD_SCAN_LIMIT {
                self.ranges.push((first, last));
                for c in first..=last {
                    let lo = fold(c);
                    if lo != c {
                        self.ranges.push((lo, lo));
                    }
                }
            } else {
                self.ranges.push((first, last));
            }
        }
        self.canonicalize();
        if let Some(ref mut sub) = self.sub {
            sub.add_lowercase();
        }
    }

    /// Sort and merge ranges. Must be called once construction is finished;
    /// membership tests assume sorted, non-overlapping ranges.
    pub fn canonicalize(&mut self) {
        if self.ranges.is_empty() {
            return;
        }
        self.ranges.sort();
        let mut merged: Vec<(char, char)> = Vec::with_capacity(self.ranges.len());
        for &(first, last) in &self.ranges {
            match merged.last_mut() {
                Some(prev) if first as u32 <= prev.1 as u32 + 1 => {
                    if last > prev.1 {
                        prev.1 = last;
                    }
                }
                _ => merged.push((first, last)),
            }
        }
        self.ranges = merged;
        if let Some(ref mut sub) = self.sub {
            sub.canonicalize();
        }
    }

    /// Tests whether the given scalar is in the set.
    #[inline(always)]
    pub fn char_in(&self, c: char) -> bool {
        let mut found = self.in_ranges(c) != self.negate;
        if found {
            if let Some(ref sub) = self.sub {
                found = !sub.char_in(c);
            }
        }
        found
    }

    #[inline(always)]
    fn in_ranges(&self, c: char) -> bool {
        // Check the leading ranges linearly before falling back to binary
        // search; most classes in real patterns are a handful of ASCII
        // ranges and the input is predominantly ASCII.
        for r in self.ranges.iter().take(4) {
            if c < r.0 {
                return false;
            }
            if c <= r.1 {
                return true;
            }
        }
        self.ranges
            .binary_search_by(|r| {
                if r.1 < c {
                    Ordering::Less
                } else if r.0 > c {
                    Ordering::Greater
                } else {
                    Ordering::Equal
                }
            })
            .is_ok()
    }

    /// If this set admits exactly one scalar, return it. Used by the scan
    /// accelerator to turn a first-character set into a plain scan.
    pub fn singleton(&self) -> Option<char> {
        if self.negate || self.sub.is_some() {
            return None;
        }
        match self.ranges.as_slice() {
            [(first, last)] if first == last => Some(*first),
            _ => None,
        }
    }

    /// Union another set's ranges into this one. Only legal when `other`
    /// is a plain positive set (the parser guarantees this for first-set
    /// computation).
    pub fn union(&mut self, other: &CharSet) {
        debug_assert!(!other.negate && other.sub.is_none());
        self.ranges.extend_from_slice(&other.ranges);
        self.canonicalize();
    }

    /// True when the set could not possibly be used to skip ahead: a
    /// negated set or a subtraction matches too much to be a useful filter.
    pub fn is_scan_friendly(&self) -> bool {
        !self.negate && self.sub.is_none() && !self.ranges.is_empty()
    }
}

impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}", if self.negate { "^" } else { "" })?;
        for &(first, last) in &self.ranges {
            if first == last {
                write!(f, "{:?}", first)?;
            } else {
                write!(f, "{:?}-{:?}", first, last)?;
            }
        }
        if let Some(ref sub) = self.sub {
            write!(f, "-{}", sub)?;
        }
        write!(f, "]")
    }
}

/// Simple case folding of one scalar, mirroring the original engine's
/// single-scalar lowercase mapping. Multi-scalar expansions keep the
/// original scalar.
#[inline]
pub fn fold(c: char) -> char {
    if c.is_ascii() {
        return c.to_ascii_lowercase();
    }
    let mut it = c.to_lowercase();
    match (it.next(), it.next()) {
        (Some(lo), None) => lo,
        _ => c,
    }
}

fn complement(ranges: &[(char, char)]) -> Vec<(char, char)> {
    let mut sorted = ranges.to_vec();
    sorted.sort();
    let mut out = Vec::new();
    let mut next = 0u32;
    for &(first, last) in &sorted {
        if (first as u32) > next {
            push_scalar_range(&mut out, next, first as u32 - 1);
        }
        next = (last as u32).saturating_add(1).max(next);
    }
    if next <= MAX_SCALAR as u32 {
        push_scalar_range(&mut out, next, MAX_SCALAR as u32);
    }
    out
}

// Scalar ranges must step around the surrogate gap, which `char` cannot
// represent.
fn push_scalar_range(out: &mut Vec<(char, char)>, lo: u32, hi: u32) {
    const SUR_LO: u32 = 0xD800;
    const SUR_HI: u32 = 0xDFFF;
    if lo > hi {
        return;
    }
    if lo < SUR_LO && hi > SUR_HI {
        out.push((from_u32(lo), from_u32(SUR_LO - 1)));
        out.push((from_u32(SUR_HI + 1), from_u32(hi)));
        return;
    }
    let lo = if (SUR_LO..=SUR_HI).contains(&lo) { SUR_HI + 1 } else { lo };
    let hi = if (SUR_LO..=SUR_HI).contains(&hi) { SUR_LO - 1 } else { hi };
    if lo <= hi {
        out.push((from_u32(lo), from_u32(hi)));
    }
}

fn from_u32(v: u32) -> char {
    char::from_u32(v).unwrap_or('\u{FFFD}')
}

/// Materialize the scalar ranges of a pattern-level class escape by asking
/// regex-syntax to translate it. This is how the crate gets at the Unicode
/// tables without carrying its own copy.
fn ranges_of(pattern: &str) -> Option<Vec<(char, char)>> {
    let hir = regex_syntax::Parser::new().parse(pattern).ok()?;
    match hir.kind() {
        HirKind::Class(Class::Unicode(cls)) => {
            Some(cls.ranges().iter().map(|r| (r.start(), r.end())).collect())
        }
        _ => None,
    }
}

static WORD: Lazy<Vec<(char, char)>> =
    Lazy::new(|| ranges_of(r"\w").expect("regex-syntax knows \\w"));
static DIGIT: Lazy<Vec<(char, char)>> =
    Lazy::new(|| ranges_of(r"\d").expect("regex-syntax knows \\d"));
static SPACE: Lazy<Vec<(char, char)>> =
    Lazy::new(|| ranges_of(r"\s").expect("regex-syntax knows \\s"));

static CATEGORIES: Lazy<Mutex<HashMap<String, Option<Arc<Vec<(char, char)>>>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Unicode `\w` ranges.
pub fn word_ranges() -> &'static [(char, char)] {
    &WORD
}

/// Unicode `\d` ranges.
pub fn digit_ranges() -> &'static [(char, char)] {
    &DIGIT
}

/// Unicode `\s` ranges.
pub fn space_ranges() -> &'static [(char, char)] {
    &SPACE
}

/// ECMAScript `\w`: `[0-9A-Za-z_]`.
pub const ECMA_WORD: &[(char, char)] =
    &[('0', '9'), ('A', 'Z'), ('_', '_'), ('a', 'z')];

/// ECMAScript `\d`: `[0-9]`.
pub const ECMA_DIGIT: &[(char, char)] = &[('0', '9')];

/// ECMAScript `\s`.
pub const ECMA_SPACE: &[(char, char)] = &[
    ('\t', '\r'),
    (' ', ' '),
    ('\u{00A0}', '\u{00A0}'),
    ('\u{1680}', '\u{1680}'),
    ('\u{2000}', '\u{200A}'),
    ('\u{2028}', '\u{2029}'),
    ('\u{202F}', '\u{202F}'),
    ('\u{205F}', '\u{205F}'),
    ('\u{3000}', '\u{3000}'),
    ('\u{FEFF}', '\u{FEFF}'),
];

/// Resolve a `\p{..}` general category or script name to scalar ranges.
/// Results are cached; lookups after the first never touch regex-syntax.
pub fn unicode_category(name: &str) -> Option<Arc<Vec<(char, char)>>> {
    let mut cache = CATEGORIES.lock().unwrap();
    if let Some(cached) = cache.get(name) {
        return cached.clone();
    }
    let resolved = ranges_of(&format!(r"\p{{{}}}", name)).map(Arc::new);
    cache.insert(name.to_string(), resolved.clone());
    resolved
}

/// Word-character predicate used by `\b`/`\B`.
#[inline]
pub fn is_word_char(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_alphanumeric() || c == '_';
    }
    in_sorted(word_ranges(), c)
}

/// ASCII word-character predicate used by the ECMAScript boundary opcodes.
#[inline]
pub fn is_ecma_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn in_sorted(ranges: &[(char, char)], c: char) -> bool {
    ranges
        .binary_search_by(|r| {
            if r.1 < c {
                Ordering::Less
            } else if r.0 > c {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        })
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_merge() {
        let mut s = CharSet::new();
        s.add_range('a', 'f');
        s.add_range('d', 'k');
        s.add_char('l');
        s.canonicalize();
        assert!(s.char_in('a'));
        assert!(s.char_in('k'));
        assert!(s.char_in('l'));
        assert!(!s.char_in('m'));
        assert_eq!(s.singleton(), None);
    }

    #[test]
    fn negation() {
        let mut s = CharSet::new();
        s.add_range('0', '9');
        s.set_negate(true);
        s.canonicalize();
        assert!(!s.char_in('5'));
        assert!(s.char_in('a'));
    }

    #[test]
    fn subtraction() {
        let mut base = CharSet::new();
        base.add_range('a', 'z');
        let mut sub = CharSet::new();
        for v in ['a', 'e', 'i', 'o', 'u'] {
            sub.add_char(v);
        }
        sub.canonicalize();
        base.set_subtraction(sub);
        base.canonicalize();
        assert!(base.char_in('b'));
        assert!(!base.char_in('e'));
        assert!(!base.char_in('0'));
    }

    #[test]
    fn folding_adds_lowercase_images() {
        let mut s = CharSet::new();
        s.add_range('A', 'Z');
        s.add_lowercase();
        assert!(s.char_in('q'));
        assert!(s.char_in('Q'));
    }

    #[test]
    fn word_class_is_unicode() {
        assert!(is_word_char('é'));
        assert!(is_word_char('_'));
        assert!(!is_word_char('-'));
        assert!(!is_ecma_word_char('é'));
    }

    #[test]
    fn category_lookup() {
        let greek = unicode_category("Greek").unwrap();
        assert!(in_sorted(&greek, 'λ'));
        assert!(unicode_category("NoSuchCategory").is_none());
    }

    #[test]
    fn complement_skips_surrogates() {
        let comp = complement(&[('\0', 'a')]);
        assert_eq!(comp[0].0, 'b');
        assert!(comp.iter().all(|&(f, l)| f <= l));
    }
}
