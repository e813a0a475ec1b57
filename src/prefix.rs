use std::collections::HashMap;

use crate::charclass::{fold, CharSet};
use crate::parse::Node;

/// A required literal prefix with a Boyer-Moore bad-character table,
/// computed over scalars rather than bytes because the engine's input is a
/// scalar sequence.
#[derive(Clone, Debug)]
pub struct BoyerMoore {
    pattern: Vec<char>,
    ci: bool,
    /// Shift for ASCII scalars; `pattern.len()` when absent.
    ascii_skip: [usize; 128],
    /// Shift for everything else; absent scalars shift the whole pattern.
    other_skip: HashMap<char, usize>,
}

impl BoyerMoore {
    fn new(mut pattern: Vec<char>, ci: bool) -> BoyerMoore {
        if ci {
            for c in pattern.iter_mut() {
                *c = fold(*c);
            }
        }
        let m = pattern.len();
        let mut ascii_skip = [m; 128];
        let mut other_skip = HashMap::new();
        // bad-character rule only; the good-suffix table is not worth its
        // setup cost on the short prefixes patterns produce
        for (i, &c) in pattern.iter().enumerate().take(m - 1) {
            let shift = m - 1 - i;
            if (c as u32) < 128 {
                ascii_skip[c as usize] = shift;
            } else {
                other_skip.insert(c, shift);
            }
        }
        BoyerMoore { pattern, ci, ascii_skip, other_skip }
    }

    pub fn len(&self) -> usize {
        self.pattern.len()
    }

    #[inline]
    fn skip(&self, c: char) -> usize {
        if (c as u32) < 128 {
            self.ascii_skip[c as usize]
        } else {
            *self.other_skip.get(&c).unwrap_or(&self.pattern.len())
        }
    }

    #[inline]
    fn at(&self, text: &[char], i: usize) -> char {
        if self.ci {
            fold(text[i])
        } else {
            text[i]
        }
    }

    /// Find the first occurrence of the prefix at or after `start`,
    /// returning its starting index.
    pub fn scan(&self, text: &[char], start: usize, end: usize) -> Option<usize> {
        let m = self.pattern.len();
        let mut i = start;
        while i + m <= end {
            let mut j = m;
            while j > 0 && self.at(text, i + j - 1) == self.pattern[j - 1] {
                j -= 1;
            }
            if j == 0 {
                return Some(i);
            }
            let bad = self.at(text, i + m - 1);
            i += self.skip(bad).max(1);
        }
        None
    }

    /// Whether the prefix sits exactly at `pos`.
    pub fn is_match(&self, text: &[char], pos: usize, end: usize) -> bool {
        let m = self.pattern.len();
        if pos + m > end {
            return false;
        }
        (0..m).all(|j| self.at(text, pos + j) == self.pattern[j])
    }
}

/// The set of scalars any match must begin with (end with, under
/// right-to-left). Used to skip candidate start positions.
#[derive(Clone, Debug)]
pub struct FirstSet {
    pub set: CharSet,
    pub ci: bool,
}

impl FirstSet {
    #[inline]
    pub fn matches(&self, c: char) -> bool {
        let c = if self.ci { fold(c) } else { c };
        self.set.char_in(c)
    }
}

/// Extract the pattern's leading literal, if it has one: the first
/// consuming atom reached by walking leading groups and zero-width nodes,
/// when that atom is a literal. Mandatory floors of a quantified literal
/// contribute their repetitions.
pub fn literal_prefix(root: &Node) -> Option<BoyerMoore> {
    let mut cur = root;
    let mut pending: &[Node] = &[];
    let mut next = 0;
    loop {
        match *cur {
            Node::Concat { ref children } => {
                if !children.is_empty() {
                    pending = children;
                    next = 0;
                }
            }
            Node::Capture { ref child, .. } | Node::Atomic { ref child } => {
                pending = &[];
                cur = child;
                continue;
            }
            Node::One { ch, flags } => {
                return build_bm(vec![ch], flags.ci);
            }
            Node::Multi { ref chars, flags } => {
                return build_bm(chars.clone(), flags.ci);
            }
            Node::OneLoop { ch, min, lazy: _, flags, .. } => {
                if min == 0 {
                    return None;
                }
                return build_bm(vec![ch; min], flags.ci);
            }
            Node::Empty
            | Node::Bol
            | Node::Eol
            | Node::Boundary
            | Node::NonBoundary
            | Node::EcmaBoundary
            | Node::NonEcmaBoundary
            | Node::Beginning
            | Node::Start
            | Node::EndZ
            | Node::End
            | Node::Require { .. }
            | Node::Prevent { .. } => {}
            _ => return None,
        }
        if next >= pending.len() {
            return None;
        }
        cur = &pending[next];
        next += 1;
    }
}

fn build_bm(chars: Vec<char>, ci: bool) -> Option<BoyerMoore> {
    // single-scalar prefixes are better served by the first-set scan
    if chars.len() < 2 {
        return None;
    }
    Some(BoyerMoore::new(chars, ci))
}

struct Fc {
    set: CharSet,
    nullable: bool,
    ci: Option<bool>,
}

/// Compute the set of scalars a match can start with. `None` when the
/// pattern admits an unknown or empty first position (leading
/// backreference, nullable whole pattern, ...), or when case sensitivity
/// is mixed across contributing atoms.
pub fn first_chars(root: &Node) -> Option<FirstSet> {
    let fc = fc_of(root)?;
    if fc.nullable || !fc.set.is_scan_friendly() {
        return None;
    }
    Some(FirstSet { set: fc.set, ci: fc.ci.unwrap_or(false) })
}

fn fc_of(node: &Node) -> Option<Fc> {
    match *node {
        Node::Empty
        | Node::Bol
        | Node::Eol
        | Node::Boundary
        | Node::NonBoundary
        | Node::EcmaBoundary
        | Node::NonEcmaBoundary
        | Node::Beginning
        | Node::Start
        | Node::EndZ
        | Node::End
        | Node::Require { .. }
        | Node::Prevent { .. } => {
            Some(Fc { set: CharSet::new(), nullable: true, ci: None })
        }
        Node::Nothing => {
            Some(Fc { set: CharSet::new(), nullable: false, ci: None })
        }
        Node::One { ch, flags } => Some(leaf(CharSet::single(ch), flags.ci)),
        Node::Multi { ref chars, flags } => {
            let ch = if flags.rtl {
                *chars.last()?
            } else {
                *chars.first()?
            };
            Some(leaf(CharSet::single(ch), flags.ci))
        }
        Node::Set { ref set, flags } => {
            if !set.is_scan_friendly() {
                return None;
            }
            Some(leaf(set.clone(), flags.ci))
        }
        Node::Notone { .. } | Node::Ref { .. } => None,
        Node::OneLoop { ch, min, flags, .. } => {
            let mut fc = leaf(CharSet::single(ch), flags.ci);
            fc.nullable = min == 0;
            Some(fc)
        }
        Node::SetLoop { ref set, min, flags, .. } => {
            if !set.is_scan_friendly() {
                return None;
            }
            let mut fc = leaf(set.clone(), flags.ci);
            fc.nullable = min == 0;
            Some(fc)
        }
        Node::NotoneLoop { .. } => None,
        Node::Loop { min, ref child, .. } => {
            let mut fc = fc_of(child)?;
            if min == 0 {
                fc.nullable = true;
            }
            Some(fc)
        }
        Node::Capture { ref child, .. } | Node::Atomic { ref child } => {
            fc_of(child)
        }
        Node::Concat { ref children } => {
            let mut set = CharSet::new();
            let mut ci: Option<bool> = None;
            let mut nullable = true;
            for child in children {
                let fc = fc_of(child)?;
                if !fc.set.is_scan_friendly() && !fc.nullable {
                    // a consuming atom with no usable set poisons the scan
                    return None;
                }
                set.union(&fc.set);
                ci = merge_ci(ci, fc.ci)?;
                if !fc.nullable {
                    nullable = false;
                    break;
                }
            }
            Some(Fc { set, nullable, ci })
        }
        Node::Alternate { ref children } => {
            let mut set = CharSet::new();
            let mut ci: Option<bool> = None;
            let mut nullable = false;
            for child in children {
                let fc = fc_of(child)?;
                set.union(&fc.set);
                ci = merge_ci(ci, fc.ci)?;
                nullable = nullable || fc.nullable;
            }
            Some(Fc { set, nullable, ci })
        }
        Node::TestRef { ref yes, ref no, .. } => {
            let a = fc_of(yes)?;
            let b = fc_of(no)?;
            let mut set = a.set;
            set.union(&b.set);
            Some(Fc {
                set,
                nullable: a.nullable || b.nullable,
                ci: merge_ci(a.ci, b.ci)?,
            })
        }
    }
}

fn leaf(set: CharSet, ci: bool) -> Fc {
    Fc { set, nullable: false, ci: Some(ci) }
}

/// Atoms that disagree about case folding cannot share one scan; bail.
fn merge_ci(a: Option<bool>, b: Option<bool>) -> Option<Option<bool>> {
    match (a, b) {
        (None, x) => Some(x),
        (x, None) => Some(x),
        (Some(x), Some(y)) if x == y => Some(Some(x)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use crate::re::RegexOptions;

    fn tree(pat: &str) -> Node {
        parse::parse(pat, RegexOptions::empty()).unwrap().root
    }

    #[test]
    fn boyer_moore_finds_prefix() {
        let bm = BoyerMoore::new("needle".chars().collect(), false);
        let hay: Vec<char> = "haystack with a needle inside".chars().collect();
        assert_eq!(bm.scan(&hay, 0, hay.len()), Some(16));
        assert!(bm.is_match(&hay, 16, hay.len()));
        assert!(!bm.is_match(&hay, 15, hay.len()));
        assert_eq!(bm.scan(&hay, 17, hay.len()), None);
    }

    #[test]
    fn boyer_moore_folds_when_ci() {
        let bm = BoyerMoore::new("AbC".chars().collect(), true);
        let hay: Vec<char> = "xxaBCxx".chars().collect();
        assert_eq!(bm.scan(&hay, 0, hay.len()), Some(2));
    }

    #[test]
    fn literal_prefix_walks_groups() {
        assert!(literal_prefix(&tree("(foo)bar")).is_some());
        assert!(literal_prefix(&tree("^foo")).is_some());
        assert!(literal_prefix(&tree("a|foo")).is_none());
        assert!(literal_prefix(&tree("x")).is_none());
    }

    #[test]
    fn first_chars_union_over_alternation() {
        let fs = first_chars(&tree("pa|pb|qc")).unwrap();
        assert!(fs.matches('p'));
        assert!(fs.matches('q'));
        assert!(!fs.matches('a'));
    }

    #[test]
    fn nullable_pattern_has_no_first_set() {
        assert!(first_chars(&tree("a*")).is_none());
        assert!(first_chars(&tree("a*b")).is_some());
    }
}
