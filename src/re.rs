use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use bitflags::bitflags;
use log::debug;

use crate::compile;
use crate::error::Error;
use crate::expand::Replacement;
use crate::matches::Match;
use crate::parse;
use crate::pool::RunnerPool;
use crate::prog::Code;

bitflags! {
    /// Options controlling parsing and matching, combinable as a bitset.
    /// The letter subset `imnsx` is also settable inline via
    /// `(?imnsx-imnsx)`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct RegexOptions: u32 {
        /// `i`: case-insensitive matching.
        const IGNORE_CASE = 0x0001;
        /// `m`: `^` and `$` match at line boundaries.
        const MULTILINE = 0x0002;
        /// `n`: plain `(..)` groups do not capture.
        const EXPLICIT_CAPTURE = 0x0004;
        /// A compilation hint; accepted and ignored.
        const COMPILED = 0x0008;
        /// `s`: `.` also matches `\n`.
        const SINGLELINE = 0x0010;
        /// `x`: unescaped whitespace in the pattern is ignored and `#`
        /// starts a comment.
        const IGNORE_PATTERN_WHITESPACE = 0x0020;
        /// Matching scans and consumes the input right to left.
        const RIGHT_TO_LEFT = 0x0040;
        /// Emit the compiled program and scan positions to the `log`
        /// facade. The output format is unspecified.
        const DEBUG = 0x0080;
        /// ECMAScript-compatible dialect: ASCII classes, octal escapes,
        /// unset backreferences match empty.
        const ECMA_SCRIPT = 0x0100;
        /// Accept RE2-flavored syntax such as `(?P<name>..)` and
        /// `\x{..}`.
        const RE2 = 0x0200;
    }
}

/// A compiled backtracking regular expression.
///
/// The pattern dialect and matching semantics follow the .NET/Perl5
/// family: backreferences, lookaround, atomic groups, balancing groups,
/// lazy quantifiers and right-to-left matching are all supported, at the
/// price of no linear-time guarantee. A pathological pattern can
/// backtrack exponentially; bound it with [`Regex::set_match_timeout`].
///
/// All positions reported by matches are indices into the input's
/// sequence of Unicode scalar values, not byte offsets.
///
/// A `Regex` is immutable after construction and safe to share across
/// threads; each match borrows a pooled runner so concurrent callers do
/// not contend beyond a pop from the pool.
///
/// # Examples
///
/// Find a word and a capture:
///
/// ```
/// use recoil::Regex;
///
/// let re = Regex::new(r"p([a-z]+)ch").unwrap();
/// let m = re.find("peach punch").unwrap().unwrap();
/// assert_eq!(m.range(), 0..5);
/// assert_eq!(m.group(1).unwrap().value(), "ea");
/// ```
///
/// Backreferences, which linear-time engines reject:
///
/// ```
/// use recoil::Regex;
///
/// let re = Regex::new(r"(\w+) \1").unwrap();
/// assert!(re.is_match("hello hello").unwrap());
/// assert!(!re.is_match("hello world").unwrap());
/// ```
pub struct Regex {
    pattern: String,
    options: RegexOptions,
    code: Arc<Code>,
    pool: RunnerPool,
    match_timeout: Option<Duration>,
}

impl Regex {
    /// Compile a pattern with default options.
    pub fn new(pattern: &str) -> Result<Regex, Error> {
        Regex::with_options(pattern, RegexOptions::empty())
    }

    /// Compile a pattern with the given options.
    pub fn with_options(
        pattern: &str,
        options: RegexOptions,
    ) -> Result<Regex, Error> {
        let ast = parse::parse(pattern, options)?;
        let code = compile::write(&ast)?;
        if options.contains(RegexOptions::DEBUG) {
            debug!("compiled program for {:?}:\n{:?}", pattern, code);
        }
        Ok(Regex {
            pattern: pattern.to_string(),
            options,
            code: Arc::new(code),
            pool: RunnerPool::new(),
            match_timeout: None,
        })
    }

    /// The pattern this regex was compiled from.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// The options this regex was compiled with.
    pub fn options(&self) -> RegexOptions {
        self.options
    }

    /// True when matching proceeds right to left.
    pub fn right_to_left(&self) -> bool {
        self.code.rtl
    }

    /// Bound every subsequent match attempt by `timeout`. The engine
    /// converts it to an absolute deadline when a scan starts and aborts
    /// with [`Error::Timeout`] once the deadline passes; the check is
    /// amortized over a fixed number of VM ticks, so overshoot is bounded
    /// by one check interval.
    pub fn set_match_timeout(&mut self, timeout: Duration) {
        self.match_timeout = Some(timeout);
    }

    /// The configured match timeout, if any. `None` means run forever.
    pub fn match_timeout(&self) -> Option<Duration> {
        self.match_timeout
    }

    /// Test whether the pattern matches anywhere in `text`.
    pub fn is_match(&self, text: &str) -> Result<bool, Error> {
        Ok(self.find(text)?.is_some())
    }

    /// Find the first match in `text` (the last, under right-to-left).
    pub fn find(&self, text: &str) -> Result<Option<Match>, Error> {
        let chars = decode(text);
        let start = self.default_start(&chars);
        self.run(chars, start)
    }

    /// Find the first match at or after the byte offset `start_at`.
    ///
    /// The offset must lie on a scalar boundary of `text`; an offset
    /// inside a multi-byte scalar or past the end reports
    /// [`Error::BadStart`].
    pub fn find_from(
        &self,
        text: &str,
        start_at: usize,
    ) -> Result<Option<Match>, Error> {
        if start_at > text.len() || !text.is_char_boundary(start_at) {
            return Err(Error::BadStart { offset: start_at });
        }
        let scalar_start = text[..start_at].chars().count();
        self.run(decode(text), scalar_start)
    }

    /// Find the match following `m` in the same input.
    ///
    /// When `m` was zero-width the search resumes one scalar further (one
    /// back, under right-to-left) so iteration cannot sit on a fixed
    /// point.
    pub fn find_next(&self, m: &Match) -> Result<Option<Match>, Error> {
        let text = m.shared_text();
        let mut start_at = m.text_pos();
        if m.is_empty() {
            if self.code.rtl {
                if start_at == 0 {
                    return Ok(None);
                }
                start_at -= 1;
            } else {
                if start_at == text.len() {
                    return Ok(None);
                }
                start_at += 1;
            }
        }
        self.run(text, start_at)
    }

    /// Iterate over all successive non-overlapping matches.
    ///
    /// The iterator yields `Result` because any step can hit the match
    /// timeout; it ends after the first error.
    pub fn find_iter(&self, text: &str) -> Matches<'_> {
        Matches {
            re: self,
            text: decode(text),
            prev: None,
            started: false,
            done: false,
        }
    }

    /// Replace the first match (the last, under right-to-left) using a
    /// replacement template.
    ///
    /// Template syntax: `$1`/`${name}` expand a group, `$$` is a literal
    /// dollar, `$&` the whole match, ``$` `` and `$'` the text before and
    /// after the match, `$+` the highest-numbered group, `$_` the whole
    /// input.
    pub fn replace(&self, text: &str, rep: &str) -> Result<String, Error> {
        self.replacen(text, 1, rep)
    }

    /// Replace every match using a replacement template.
    pub fn replace_all(&self, text: &str, rep: &str) -> Result<String, Error> {
        self.replacen(text, 0, rep)
    }

    /// Replace up to `limit` matches (0 means no limit) using a
    /// replacement template.
    pub fn replacen(
        &self,
        text: &str,
        limit: usize,
        rep: &str,
    ) -> Result<String, Error> {
        let replacement = Replacement::parse(rep, &self.code)?;
        self.replace_impl(text, limit, |m, dst| replacement.expand(m, dst))
    }

    /// Replace the first match with the output of `evaluator`.
    pub fn replace_func<F>(&self, text: &str, evaluator: F) -> Result<String, Error>
    where
        F: FnMut(&Match) -> String,
    {
        self.replacen_func(text, 1, evaluator)
    }

    /// Replace every match with the output of `evaluator`.
    pub fn replace_all_func<F>(
        &self,
        text: &str,
        evaluator: F,
    ) -> Result<String, Error>
    where
        F: FnMut(&Match) -> String,
    {
        self.replacen_func(text, 0, evaluator)
    }

    /// Replace up to `limit` matches (0 means no limit) with the output
    /// of `evaluator`.
    pub fn replacen_func<F>(
        &self,
        text: &str,
        limit: usize,
        mut evaluator: F,
    ) -> Result<String, Error>
    where
        F: FnMut(&Match) -> String,
    {
        self.replace_impl(text, limit, move |m, dst| {
            dst.push_str(&evaluator(m))
        })
    }

    fn replace_impl<F>(
        &self,
        text: &str,
        limit: usize,
        mut emit: F,
    ) -> Result<String, Error>
    where
        F: FnMut(&Match, &mut String),
    {
        let chars = decode(text);
        let start = self.default_start(&chars);
        let mut m = match self.run(chars.clone(), start)? {
            None => return Ok(text.to_string()),
            Some(m) => m,
        };
        let mut n = 0;

        if !self.code.rtl {
            let mut out = String::with_capacity(text.len());
            let mut prev = 0;
            loop {
                out.extend(&chars[prev..m.index()]);
                emit(&m, &mut out);
                prev = m.index() + m.len();
                n += 1;
                if limit != 0 && n >= limit {
                    break;
                }
                match self.find_next(&m)? {
                    Some(next) => m = next,
                    None => break,
                }
            }
            out.extend(&chars[prev..]);
            Ok(out)
        } else {
            // matches arrive right to left; assemble the pieces in
            // reverse
            let mut pieces: Vec<String> = Vec::new();
            let mut prev = chars.len();
            loop {
                pieces.push(chars[m.index() + m.len()..prev].iter().collect());
                let mut s = String::new();
                emit(&m, &mut s);
                pieces.push(s);
                prev = m.index();
                n += 1;
                if limit != 0 && n >= limit {
                    break;
                }
                match self.find_next(&m)? {
                    Some(next) => m = next,
                    None => break,
                }
            }
            let mut out = String::with_capacity(text.len());
            out.extend(&chars[..prev]);
            for piece in pieces.iter().rev() {
                out.push_str(piece);
            }
            Ok(out)
        }
    }

    /// The names of all capture groups, in slot order. Unnamed groups
    /// answer with their number in decimal.
    pub fn group_names(&self) -> Vec<String> {
        match self.code.caps_list {
            Some(ref list) => list.clone(),
            None => self
                .code
                .group_numbers()
                .iter()
                .map(|n| n.to_string())
                .collect(),
        }
    }

    /// The user capture numbers, in slot order.
    pub fn group_numbers(&self) -> Vec<usize> {
        self.code.group_numbers()
    }

    /// The name of the group with the given number, or the empty string
    /// for an unknown number.
    pub fn group_name_from_number(&self, number: usize) -> String {
        self.code.group_name(number)
    }

    /// The number of the group with the given name. All-digit names
    /// resolve as numbers.
    pub fn group_number_from_name(&self, name: &str) -> Option<usize> {
        self.code.group_number(name)
    }

    /// Total number of capture slots, including slot 0.
    pub fn captures_len(&self) -> usize {
        self.code.cap_size
    }

    fn default_start(&self, chars: &[char]) -> usize {
        if self.code.rtl {
            chars.len()
        } else {
            0
        }
    }

    fn run(
        &self,
        text: Arc<[char]>,
        start: usize,
    ) -> Result<Option<Match>, Error> {
        let ecma = self.options.contains(RegexOptions::ECMA_SCRIPT);
        let dbg = self.options.contains(RegexOptions::DEBUG);
        let mut runner = self.pool.get();
        let found = runner.scan(
            &self.code,
            &text,
            start,
            self.match_timeout,
            &self.pattern,
            ecma,
            dbg,
        )?;
        Ok(found.map(|(data, textpos)| {
            data.into_match(self.code.clone(), text, textpos)
        }))
    }
}

impl Clone for Regex {
    fn clone(&self) -> Regex {
        Regex {
            pattern: self.pattern.clone(),
            options: self.options,
            code: self.code.clone(),
            // runners are cheap to re-create; clones get a fresh pool
            pool: RunnerPool::new(),
            match_timeout: self.match_timeout,
        }
    }
}

impl fmt::Display for Regex {
    /// Shows the original pattern.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.pattern)
    }
}

impl fmt::Debug for Regex {
    /// Shows the original pattern.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl FromStr for Regex {
    type Err = Error;

    /// Compile with default options.
    fn from_str(s: &str) -> Result<Regex, Error> {
        Regex::new(s)
    }
}

/// An iterator over all successive non-overlapping matches.
///
/// `'r` is the lifetime of the compiled expression. The searched text is
/// decoded once up front and shared with every yielded [`Match`].
pub struct Matches<'r> {
    re: &'r Regex,
    text: Arc<[char]>,
    prev: Option<Match>,
    started: bool,
    done: bool,
}

impl<'r> Iterator for Matches<'r> {
    type Item = Result<Match, Error>;

    fn next(&mut self) -> Option<Result<Match, Error>> {
        if self.done {
            return None;
        }
        let result = match self.prev {
            None if !self.started => {
                self.started = true;
                let start = self.re.default_start(&self.text);
                self.re.run(self.text.clone(), start)
            }
            None => return None,
            Some(ref m) => self.re.find_next(m),
        };
        match result {
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Ok(Some(m)) => {
                self.prev = Some(m.clone());
                Some(Ok(m))
            }
        }
    }
}

fn decode(text: &str) -> Arc<[char]> {
    text.chars().collect::<Vec<char>>().into()
}
