use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use crate::prog::Code;

/// A fully-balanced placeholder length. A group whose latest entry carries
/// this length has had every capture balanced away and reports as unset.
const BALANCED: isize = -2;

/// The capture book accumulated while the VM runs: per-slot span lists
/// with the most recent on top. Balancing groups append negative
/// placeholder entries that reference the capture they strike; `tidy`
/// compacts them once a match wins.
#[derive(Clone, Debug, Default)]
pub(crate) struct MatchData {
    pub matches: Vec<Vec<isize>>,
    pub matchcount: Vec<usize>,
    balancing: bool,
}

impl MatchData {
    pub fn new(cap_size: usize) -> MatchData {
        MatchData {
            matches: vec![Vec::new(); cap_size],
            matchcount: vec![0; cap_size],
            balancing: false,
        }
    }

    pub fn reset(&mut self, cap_size: usize) {
        self.matches.resize(cap_size, Vec::new());
        self.matchcount.clear();
        self.matchcount.resize(cap_size, 0);
        for m in &mut self.matches {
            m.clear();
        }
        self.balancing = false;
    }

    pub fn add_match(&mut self, cap: usize, start: isize, len: isize) {
        let count = self.matchcount[cap];
        let list = &mut self.matches[cap];
        list.truncate(count * 2);
        list.push(start);
        list.push(len);
        self.matchcount[cap] = count + 1;
    }

    /// Strike the latest live capture of `cap` by appending a reference
    /// entry, so the strike itself can be undone on backtrack.
    pub fn balance_match(&mut self, cap: usize) {
        self.balancing = true;
        let count = self.matchcount[cap];
        let mut target = count as isize * 2 - 2;
        if self.matches[cap][target as usize] < 0 {
            target = -3 - self.matches[cap][target as usize];
        }
        target -= 2;
        if target >= 0 && self.matches[cap][target as usize] < 0 {
            let start = self.matches[cap][target as usize];
            let len = self.matches[cap][target as usize + 1];
            self.add_match(cap, start, len);
        } else {
            self.add_match(cap, -3 - target, -4 - target);
        }
    }

    pub fn remove_match(&mut self, cap: usize) {
        self.matchcount[cap] -= 1;
    }

    pub fn is_matched(&self, cap: usize) -> bool {
        let count = self.matchcount[cap];
        count > 0 && self.matches[cap][count * 2 - 1] != BALANCED
    }

    pub fn match_index(&self, cap: usize) -> isize {
        let list = &self.matches[cap];
        let i = list[self.matchcount[cap] * 2 - 2];
        if i >= 0 {
            i
        } else {
            list[(-3 - i) as usize]
        }
    }

    pub fn match_length(&self, cap: usize) -> isize {
        let list = &self.matches[cap];
        let i = list[self.matchcount[cap] * 2 - 1];
        if i >= 0 {
            i
        } else {
            list[(-3 - i) as usize]
        }
    }

    /// Compact balancing placeholders so every surviving pair is a real
    /// span. Only meaningful once a match has won.
    fn tidy(&mut self) {
        if !self.balancing {
            return;
        }
        for cap in 0..self.matchcount.len() {
            let limit = self.matchcount[cap] * 2;
            let arr = &mut self.matches[cap];
            let mut i = 0;
            while i < limit && arr[i] >= 0 {
                i += 1;
            }
            let mut j = i;
            while i < limit {
                if arr[i] < 0 {
                    j -= 1;
                } else {
                    if i != j {
                        arr[j] = arr[i];
                    }
                    j += 1;
                }
                i += 1;
            }
            self.matchcount[cap] = j / 2;
        }
        self.balancing = false;
    }

    /// Freeze the book into an immutable [`Match`].
    pub fn into_match(
        mut self,
        code: Arc<Code>,
        text: Arc<[char]>,
        textpos: usize,
    ) -> Match {
        self.tidy();
        let index = self.matches[0][0] as usize;
        let length = self.matches[0][1] as usize;
        Match {
            code,
            text,
            textpos,
            index,
            length,
            matches: self.matches,
            matchcount: self.matchcount,
        }
    }
}

/// The result of a single successful match: the group-0 span, the capture
/// history of every group, and a reference to the input it was found in.
///
/// A `Match` owns its input as a shared scalar sequence, so it remains
/// valid after the regex and the runner that produced it are gone, and
/// feeding it back to [`crate::Regex::find_next`] needs no re-decoding.
#[derive(Clone)]
pub struct Match {
    code: Arc<Code>,
    text: Arc<[char]>,
    textpos: usize,
    index: usize,
    length: usize,
    matches: Vec<Vec<isize>>,
    matchcount: Vec<usize>,
}

impl Match {
    /// Start of the whole match, in scalars.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Length of the whole match, in scalars.
    pub fn len(&self) -> usize {
        self.length
    }

    /// True for a zero-width match.
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The whole-match span as a scalar range.
    pub fn range(&self) -> Range<usize> {
        self.index..self.index + self.length
    }

    /// The matched text.
    pub fn value(&self) -> String {
        self.slice(self.index, self.length)
    }

    /// The input the match was found in.
    pub fn text(&self) -> &[char] {
        &self.text
    }

    pub(crate) fn shared_text(&self) -> Arc<[char]> {
        self.text.clone()
    }

    pub(crate) fn code(&self) -> &Arc<Code> {
        &self.code
    }

    /// Where the scan stopped; the resume point for find-next.
    pub(crate) fn text_pos(&self) -> usize {
        self.textpos
    }

    fn slice(&self, index: usize, length: usize) -> String {
        self.text[index..index + length].iter().collect()
    }

    /// Look up a group by user number. Returns `None` for numbers the
    /// pattern never declared; an unmatched group is `Some` with no
    /// captures.
    pub fn group(&self, number: usize) -> Option<Group> {
        let slot = self.code.slot_of(number)?;
        let count = self.matchcount[slot];
        let text = self.text.clone();
        let captures: Vec<Capture> = (0..count)
            .map(|i| Capture {
                index: self.matches[slot][i * 2] as usize,
                length: self.matches[slot][i * 2 + 1] as usize,
                text: text.clone(),
            })
            .collect();
        Some(Group {
            name: self.code.group_name(number),
            number,
            captures,
            text,
        })
    }

    /// Look up a group by name. All-digit names resolve as numbers.
    pub fn named(&self, name: &str) -> Option<Group> {
        let number = self.code.group_number(name)?;
        self.group(number)
    }

    /// All groups in capture-number order. Group 0 is first and is the
    /// whole match.
    pub fn groups(&self) -> Vec<Group> {
        self.code
            .group_numbers()
            .into_iter()
            .filter_map(|n| self.group(n))
            .collect()
    }

    /// The highest-numbered group, the `$+` of replacement templates.
    pub(crate) fn last_group(&self) -> Option<Group> {
        let numbers = self.code.group_numbers();
        let last = numbers.into_iter().max()?;
        self.group(last)
    }
}

impl fmt::Debug for Match {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Match")
            .field("index", &self.index)
            .field("length", &self.length)
            .field("value", &self.value())
            .finish()
    }
}

/// One capture group of a match: its full capture history in textual
/// order, with the last capture as the group's current span.
#[derive(Clone, Debug)]
pub struct Group {
    /// The group's name; unnamed groups carry their number in decimal.
    pub name: String,
    /// The group's user capture number.
    pub number: usize,
    captures: Vec<Capture>,
    text: Arc<[char]>,
}

impl Group {
    /// True when the winning path captured this group at least once.
    pub fn matched(&self) -> bool {
        !self.captures.is_empty()
    }

    /// Start of the current (last) capture, in scalars; 0 when unset.
    pub fn index(&self) -> usize {
        self.captures.last().map_or(0, |c| c.index)
    }

    /// Length of the current capture, in scalars; 0 when unset.
    pub fn len(&self) -> usize {
        self.captures.last().map_or(0, |c| c.length)
    }

    /// True when the current capture is empty or the group is unset.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current capture's span as a scalar range.
    pub fn range(&self) -> Range<usize> {
        self.index()..self.index() + self.len()
    }

    /// Text of the current capture; empty when unset.
    pub fn value(&self) -> String {
        self.captures.last().map_or_else(String::new, Capture::value)
    }

    /// Every capture this group recorded on the winning path, oldest
    /// first. Repeated and balancing groups expose their history here.
    pub fn captures(&self) -> &[Capture] {
        &self.captures
    }

    /// The input the group was captured from.
    pub fn text(&self) -> &[char] {
        &self.text
    }
}

/// A single captured span.
#[derive(Clone)]
pub struct Capture {
    /// Start of the span, in scalars.
    pub index: usize,
    /// Length of the span, in scalars.
    pub length: usize,
    text: Arc<[char]>,
}

impl Capture {
    /// The captured span as a scalar range.
    pub fn range(&self) -> Range<usize> {
        self.index..self.index + self.length
    }

    /// The captured text.
    pub fn value(&self) -> String {
        self.text[self.index..self.index + self.length].iter().collect()
    }
}

impl fmt::Debug for Capture {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Capture({}, {}: {:?})", self.index, self.length, self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_history_stacks() {
        let mut d = MatchData::new(2);
        d.add_match(1, 0, 1);
        d.add_match(1, 1, 1);
        assert!(d.is_matched(1));
        assert_eq!(d.match_index(1), 1);
        d.remove_match(1);
        assert_eq!(d.match_index(1), 0);
        assert_eq!(d.match_length(1), 1);
    }

    #[test]
    fn balance_strikes_latest_capture() {
        let mut d = MatchData::new(2);
        d.add_match(1, 3, 2);
        d.add_match(1, 5, 2);
        d.balance_match(1);
        // current resolves to the first capture
        assert!(d.is_matched(1));
        assert_eq!(d.match_index(1), 3);
        d.balance_match(1);
        assert!(!d.is_matched(1));
        // un-balancing restores the struck capture
        d.remove_match(1);
        assert!(d.is_matched(1));
        assert_eq!(d.match_index(1), 3);
    }

    #[test]
    fn tidy_compacts_balanced_entries() {
        let mut d = MatchData::new(2);
        d.add_match(0, 0, 4);
        d.add_match(1, 0, 1);
        d.add_match(1, 1, 1);
        d.balance_match(1);
        d.tidy();
        assert_eq!(d.matchcount[1], 1);
        assert_eq!(d.matches[1][0], 0);
        assert_eq!(d.matches[1][1], 1);
    }
}
