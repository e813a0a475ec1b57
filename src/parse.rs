use std::collections::HashMap;

use crate::charclass::{self, CharSet};
use crate::error::Error;
use crate::re::RegexOptions;

/// Loop bound meaning "no upper limit".
pub const UNBOUNDED: usize = usize::MAX;

/// Flags captured on a consuming leaf at the moment it was parsed. The
/// writer turns them into the Ci/Rtl bits of the emitted instruction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeFlags {
    pub ci: bool,
    pub rtl: bool,
}

/// A node of the parsed pattern. The tree is already reduced: adjacent
/// literals are merged into `Multi`, quantified single-scalar atoms are
/// loop leaves, and non-capturing groups have dissolved into their bodies.
#[derive(Clone, Debug)]
pub enum Node {
    /// Matches the empty string.
    Empty,
    /// Matches nothing (an impossible branch).
    Nothing,
    One { ch: char, flags: NodeFlags },
    Notone { ch: char, flags: NodeFlags },
    Set { set: CharSet, flags: NodeFlags },
    Multi { chars: Vec<char>, flags: NodeFlags },
    Ref { capnum: usize, flags: NodeFlags },
    OneLoop { ch: char, min: usize, max: usize, lazy: bool, flags: NodeFlags },
    NotoneLoop { ch: char, min: usize, max: usize, lazy: bool, flags: NodeFlags },
    SetLoop { set: CharSet, min: usize, max: usize, lazy: bool, flags: NodeFlags },
    /// A quantified subexpression.
    Loop { min: usize, max: usize, lazy: bool, child: Box<Node> },
    Concat { children: Vec<Node> },
    Alternate { children: Vec<Node> },
    /// A capture group. `capnum` is the user capture number (-1 for a pure
    /// balancing pop); `uncapnum` is the balanced group's number or -1.
    Capture { capnum: isize, uncapnum: isize, child: Box<Node> },
    /// `(?>..)`: no backtracking into the body once it succeeds.
    Atomic { child: Box<Node> },
    /// `(?=..)` / `(?<=..)`: zero-width positive lookaround.
    Require { child: Box<Node> },
    /// `(?!..)` / `(?<!..)`: zero-width negative lookaround.
    Prevent { child: Box<Node> },
    /// `(?(n)yes|no)`: conditional on whether group `capnum` has matched.
    TestRef { capnum: usize, yes: Box<Node>, no: Box<Node> },
    Bol,
    Eol,
    Boundary,
    NonBoundary,
    EcmaBoundary,
    NonEcmaBoundary,
    Beginning,
    Start,
    EndZ,
    End,
}

/// The parsed pattern plus everything the writer needs to number captures.
#[derive(Clone, Debug)]
pub struct Ast {
    pub root: Node,
    /// Capture numbers in use, mapped to the pattern position where each
    /// was first seen (the position feeds the ECMAScript backreference
    /// disambiguation).
    pub caps: HashMap<usize, usize>,
    /// Sorted capture numbers when the numbering is sparse; `None` when
    /// numbers are dense `0..cap_top`.
    pub cap_num_list: Option<Vec<usize>>,
    /// One past the highest capture number.
    pub cap_top: usize,
    /// Total number of distinct capture numbers (slots).
    pub cap_count: usize,
    /// Group name -> capture number, when any group is named.
    pub cap_names: Option<HashMap<String, usize>>,
    /// Names ordered by capture number (numeric strings for unnamed
    /// groups), when any group is named.
    pub caps_list: Option<Vec<String>>,
    pub options: RegexOptions,
}

/// What kind of group an open paren started; lives on the parser's group
/// stack until the matching `)`.
#[derive(Clone, Debug)]
enum GroupKind {
    Capture { capnum: isize, uncapnum: isize },
    Group,
    Atomic,
    Require,
    Prevent,
    TestRef { capnum: usize },
}

#[derive(Debug)]
struct GroupFrame {
    kind: GroupKind,
    alternates: Vec<Node>,
    concat: Vec<Node>,
    saved_options: RegexOptions,
}

/// Parse a pattern into an [`Ast`].
pub fn parse(pattern: &str, options: RegexOptions) -> Result<Ast, Error> {
    let mut p = Parser::new(pattern, options);
    p.count_captures()?;
    p.assign_name_slots();
    p.reset(options);
    let root = p.scan_regex()?;
    Ok(Ast {
        root,
        caps: p.caps,
        cap_num_list: p.cap_num_list,
        cap_top: p.cap_top,
        cap_count: p.cap_count,
        cap_names: if p.cap_names.is_empty() { None } else { Some(p.cap_names) },
        caps_list: p.caps_list,
        options,
    })
}

struct Parser {
    pattern: Vec<char>,
    pos: usize,
    options: RegexOptions,
    options_stack: Vec<RegexOptions>,

    // capture bookkeeping (two passes, as in the original: the first walk
    // only numbers captures so that forward references and .NET
    // name-numbering rules resolve during the real parse)
    caps: HashMap<usize, usize>,
    cap_names: HashMap<String, usize>,
    cap_name_list: Vec<String>,
    caps_list: Option<Vec<String>>,
    cap_num_list: Option<Vec<usize>>,
    autocap: usize,
    cap_count: usize,
    cap_top: usize,
    ignore_next_paren: bool,

    // tree construction
    stack: Vec<GroupFrame>,
    alternates: Vec<Node>,
    concat: Vec<Node>,
    unit: Option<Node>,
    prev_was_quantifier: bool,
}

impl Parser {
    fn new(pattern: &str, options: RegexOptions) -> Parser {
        Parser {
            pattern: pattern.chars().collect(),
            pos: 0,
            options,
            options_stack: Vec::new(),
            caps: HashMap::new(),
            cap_names: HashMap::new(),
            cap_name_list: Vec::new(),
            caps_list: None,
            cap_num_list: None,
            autocap: 1,
            cap_count: 0,
            cap_top: 0,
            ignore_next_paren: false,
            stack: Vec::new(),
            alternates: Vec::new(),
            concat: Vec::new(),
            unit: None,
            prev_was_quantifier: false,
        }
    }

    fn reset(&mut self, options: RegexOptions) {
        self.pos = 0;
        self.options = options;
        self.options_stack.clear();
        self.autocap = 1;
        self.ignore_next_paren = false;
    }

    // ---------------------------------------------------------------------
    // cursor primitives

    fn chars_right(&self) -> usize {
        self.pattern.len() - self.pos
    }

    fn right_char(&self, i: usize) -> char {
        self.pattern[self.pos + i]
    }

    fn move_right_get(&mut self) -> char {
        let c = self.pattern[self.pos];
        self.pos += 1;
        c
    }

    fn move_right(&mut self, n: usize) {
        self.pos += n;
    }

    fn move_left(&mut self) {
        self.pos -= 1;
    }

    fn err<S: Into<String>>(&self, message: S) -> Error {
        Error::syntax(message, self.pos)
    }

    // ---------------------------------------------------------------------
    // pass 1: capture numbering

    fn count_captures(&mut self) -> Result<(), Error> {
        self.note_capture_slot(0, 0);
        while self.chars_right() > 0 {
            let pos = self.pos;
            let ch = self.move_right_get();
            match ch {
                '\\' => {
                    if self.chars_right() > 0 {
                        self.move_right(1);
                    }
                }
                '#' if self.use_option_x() => {
                    self.move_left();
                    self.scan_blank()?;
                }
                '[' => {
                    self.scan_char_set(false, true)?;
                }
                ')' => {
                    if let Some(saved) = self.options_stack.pop() {
                        self.options = saved;
                    }
                }
                '(' => {
                    if self.chars_right() >= 2
                        && self.right_char(0) == '?'
                        && self.right_char(1) == '#'
                    {
                        self.move_left();
                        self.scan_blank()?;
                    } else {
                        self.options_stack.push(self.options);
                        if self.chars_right() > 0 && self.right_char(0) == '?' {
                            self.move_right(1);
                            if self.chars_right() > 1
                                && (self.right_char(0) == '<'
                                    || self.right_char(0) == '\'')
                            {
                                self.move_right(1);
                                let ch = self.right_char(0);
                                if ch != '0' && is_word_char(ch) {
                                    if ch.is_ascii_digit() {
                                        let n = self.scan_decimal()?;
                                        self.note_capture_slot(n, pos);
                                    } else {
                                        let name = self.scan_capname();
                                        self.note_capture_name(name, pos);
                                    }
                                }
                            } else if self.chars_right() > 2
                                && self.options.contains(RegexOptions::RE2)
                                && self.right_char(0) == 'P'
                                && self.right_char(1) == '<'
                            {
                                self.move_right(2);
                                let ch = self.right_char(0);
                                if is_word_char(ch) && !ch.is_ascii_digit() {
                                    let name = self.scan_capname();
                                    self.note_capture_name(name, pos);
                                }
                            } else {
                                self.scan_options();
                                if self.chars_right() > 0 {
                                    if self.right_char(0) == ')' {
                                        self.move_right(1);
                                        // a bare (?opts) keeps its options
                                        // in force in the enclosing group
                                        self.options_stack.pop();
                                    } else if self.right_char(0) == '(' {
                                        // the paren of a (?(..)..) test
                                        self.ignore_next_paren = true;
                                        continue;
                                    }
                                }
                            }
                        } else if !self.use_option_n() && !self.ignore_next_paren
                        {
                            let n = self.autocap;
                            self.autocap += 1;
                            self.note_capture_slot(n, pos);
                        }
                        self.ignore_next_paren = false;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn note_capture_slot(&mut self, i: usize, pos: usize) {
        if !self.caps.contains_key(&i) {
            self.caps.insert(i, pos);
            self.cap_count += 1;
            if self.cap_top <= i {
                self.cap_top = i + 1;
            }
        }
    }

    fn note_capture_name(&mut self, name: String, pos: usize) {
        if !self.cap_names.contains_key(&name) {
            self.cap_names.insert(name.clone(), pos);
            self.cap_name_list.push(name);
        }
    }

    /// Assign numbers to named groups (after all explicitly numbered and
    /// auto-numbered ones), then build the sparse-number list and the
    /// per-number name list.
    fn assign_name_slots(&mut self) {
        let names: Vec<String> = self.cap_name_list.clone();
        for name in &names {
            while self.caps.contains_key(&self.autocap) {
                self.autocap += 1;
            }
            let pos = self.cap_names[name];
            self.cap_names.insert(name.clone(), self.autocap);
            let num = self.autocap;
            self.note_capture_slot(num, pos);
            self.autocap += 1;
        }

        if self.cap_count < self.cap_top {
            let mut nums: Vec<usize> = self.caps.keys().copied().collect();
            nums.sort();
            self.cap_num_list = Some(nums);
        }

        if !self.cap_names.is_empty() {
            let mut by_num: HashMap<usize, String> = HashMap::new();
            for (name, &num) in &self.cap_names {
                by_num.insert(num, name.clone());
            }
            let numbers: Vec<usize> = match self.cap_num_list {
                Some(ref nums) => nums.clone(),
                None => (0..self.cap_top).collect(),
            };
            let mut list = Vec::with_capacity(numbers.len());
            for num in numbers {
                match by_num.get(&num) {
                    Some(name) => list.push(name.clone()),
                    None => {
                        let name = num.to_string();
                        self.cap_names.insert(name.clone(), num);
                        list.push(name);
                    }
                }
            }
            self.caps_list = Some(list);
        }
    }

    fn is_capture_slot(&self, i: usize) -> bool {
        self.caps.contains_key(&i)
    }

    // ---------------------------------------------------------------------
    // pass 2: the real parse

    fn scan_regex(&mut self) -> Result<Node, Error> {
        loop {
            if self.use_option_x() || self.peek_comment() {
                self.scan_blank()?;
            }
            if self.chars_right() == 0 {
                break;
            }
            let was_quantifier = self.prev_was_quantifier;
            self.prev_was_quantifier = false;
            let ch = self.move_right_get();
            match ch {
                '|' => {
                    self.flush_unit();
                    self.finish_alternate();
                }
                '(' => {
                    self.flush_unit();
                    let saved = self.options;
                    if let Some(kind) = self.scan_group_open()? {
                        self.push_group(kind, saved);
                    }
                }
                ')' => {
                    self.flush_unit();
                    self.close_group()?;
                }
                '[' => {
                    let set = self.scan_char_set(self.use_option_i(), false)?;
                    self.set_unit(self.make_set_node(set));
                }
                '^' => {
                    self.set_unit(if self.use_option_m() {
                        Node::Bol
                    } else {
                        Node::Beginning
                    });
                }
                '$' => {
                    self.set_unit(if self.use_option_m() {
                        Node::Eol
                    } else {
                        Node::EndZ
                    });
                }
                '.' => {
                    let node = if self.use_option_s() {
                        let mut set = CharSet::any();
                        set.canonicalize();
                        Node::Set { set, flags: self.leaf_flags() }
                    } else {
                        Node::Notone { ch: '\n', flags: self.leaf_flags() }
                    };
                    self.set_unit(node);
                }
                '\\' => {
                    let node = self.scan_backslash()?;
                    self.set_unit(node);
                }
                '{' => {
                    // the cursor sits just past the brace
                    if self.is_true_quantifier()? {
                        self.move_left();
                        self.scan_quantifier(was_quantifier)?;
                        self.prev_was_quantifier = true;
                    } else {
                        let c = self.fold_if_ci('{');
                        self.set_unit(Node::One {
                            ch: c,
                            flags: self.leaf_flags(),
                        });
                    }
                }
                '*' | '+' | '?' => {
                    self.move_left();
                    self.scan_quantifier(was_quantifier)?;
                    self.prev_was_quantifier = true;
                }
                _ => {
                    let ch = self.fold_if_ci(ch);
                    self.set_unit(Node::One { ch, flags: self.leaf_flags() });
                }
            }
        }
        self.flush_unit();
        if !self.stack.is_empty() {
            return Err(self.err("not enough )'s"));
        }
        self.finish_alternate();
        Ok(self.pop_alternation())
    }

    fn leaf_flags(&self) -> NodeFlags {
        NodeFlags {
            ci: self.use_option_i(),
            rtl: self.options.contains(RegexOptions::RIGHT_TO_LEFT),
        }
    }

    fn fold_if_ci(&self, ch: char) -> char {
        if self.use_option_i() {
            charclass::fold(ch)
        } else {
            ch
        }
    }

    fn make_set_node(&self, set: CharSet) -> Node {
        Node::Set { set, flags: self.leaf_flags() }
    }

    fn peek_comment(&self) -> bool {
        self.chars_right() >= 3
            && self.right_char(0) == '('
            && self.right_char(1) == '?'
            && self.right_char(2) == '#'
    }

    fn set_unit(&mut self, node: Node) {
        self.flush_unit();
        self.unit = Some(node);
    }

    fn flush_unit(&mut self) {
        if let Some(node) = self.unit.take() {
            self.concat.push(node);
        }
    }

    /// Close the arm under construction. Right-to-left arms reverse their
    /// concatenation order here, once and shallowly; nested groups were
    /// reversed when they closed.
    fn finish_alternate(&mut self) {
        let mut children = std::mem::take(&mut self.concat);
        if self.options.contains(RegexOptions::RIGHT_TO_LEFT) {
            children.reverse();
        }
        self.alternates.push(make_concat(children));
    }

    fn pop_alternation(&mut self) -> Node {
        let arms = std::mem::take(&mut self.alternates);
        make_alternate(arms)
    }

    // ---------------------------------------------------------------------
    // quantifiers

    /// True when the cursor (just past `{`) starts a valid `{n}`/`{n,}`/
    /// `{n,m}` repetition. Leaves the cursor where it was.
    fn is_true_quantifier(&mut self) -> Result<bool, Error> {
        let start = self.pos;
        let ok = self.scan_repetition()?.is_some();
        self.pos = start;
        Ok(ok)
    }

    fn scan_quantifier(&mut self, was_quantifier: bool) -> Result<(), Error> {
        let ch = self.right_char(0);
        let unit = match self.unit.take() {
            Some(u) => u,
            None => {
                return Err(if was_quantifier {
                    self.err("nested quantifier")
                } else {
                    self.err(format!("quantifier {:?} following nothing", ch))
                });
            }
        };

        self.move_right(1);
        let (min, max) = match ch {
            '*' => (0, UNBOUNDED),
            '+' => (1, UNBOUNDED),
            '?' => (0, 1),
            '{' => match self.scan_repetition()? {
                Some(bounds) => bounds,
                // scan_regex only dispatches here for true quantifiers
                None => unreachable!("is_true_quantifier screens '{{'"),
            },
            _ => unreachable!(),
        };
        if max != UNBOUNDED && min > max {
            return Err(
                self.err(format!("illegal {{{},{}}} with min > max", min, max))
            );
        }

        let mut lazy = false;
        if self.chars_right() > 0 && self.right_char(0) == '?' {
            self.move_right(1);
            lazy = true;
        }

        self.concat.push(quantify(unit, min, max, lazy));
        Ok(())
    }

    /// Parse the inside of `{..}` after the brace. `None` means the brace
    /// sequence is not a repetition and must be taken literally.
    fn scan_repetition(&mut self) -> Result<Option<(usize, usize)>, Error> {
        let start = self.pos;
        if self.chars_right() == 0 || !self.right_char(0).is_ascii_digit() {
            self.pos = start;
            return Ok(None);
        }
        let min = self.scan_decimal()?;
        let max;
        if self.chars_right() > 0 && self.right_char(0) == '}' {
            self.move_right(1);
            max = min;
        } else if self.chars_right() >= 2 && self.right_char(0) == ',' {
            self.move_right(1);
            if self.right_char(0) == '}' {
                self.move_right(1);
                max = UNBOUNDED;
            } else if self.right_char(0).is_ascii_digit() {
                let m = self.scan_decimal()?;
                if self.chars_right() == 0 || self.right_char(0) != '}' {
                    self.pos = start;
                    return Ok(None);
                }
                self.move_right(1);
                max = m;
            } else {
                self.pos = start;
                return Ok(None);
            }
        } else {
            self.pos = start;
            return Ok(None);
        }
        Ok(Some((min, max)))
    }

    // ---------------------------------------------------------------------
    // groups

    fn push_group(&mut self, kind: GroupKind, saved_options: RegexOptions) {
        self.stack.push(GroupFrame {
            kind,
            alternates: std::mem::take(&mut self.alternates),
            concat: std::mem::take(&mut self.concat),
            saved_options,
        });
    }

    fn close_group(&mut self) -> Result<(), Error> {
        let frame = match self.stack.pop() {
            Some(f) => f,
            None => return Err(self.err("too many )'s")),
        };
        self.finish_alternate();
        let body = self.pop_alternation();

        let node = match frame.kind {
            GroupKind::Capture { capnum, uncapnum } => Node::Capture {
                capnum,
                uncapnum,
                child: Box::new(body),
            },
            GroupKind::Group => body,
            GroupKind::Atomic => Node::Atomic { child: Box::new(body) },
            GroupKind::Require => Node::Require { child: Box::new(body) },
            GroupKind::Prevent => Node::Prevent { child: Box::new(body) },
            GroupKind::TestRef { capnum } => {
                let (yes, no) = match body {
                    Node::Alternate { mut children } => {
                        if children.len() > 2 {
                            return Err(self.err("too many | in (?(..)..|..)"));
                        }
                        let no = children.pop().unwrap_or(Node::Empty);
                        let yes = children.pop().unwrap_or(Node::Empty);
                        (yes, no)
                    }
                    single => (single, Node::Empty),
                };
                Node::TestRef {
                    capnum,
                    yes: Box::new(yes),
                    no: Box::new(no),
                }
            }
        };

        self.options = frame.saved_options;
        self.alternates = frame.alternates;
        self.concat = frame.concat;
        self.unit = Some(node);
        Ok(())
    }

    /// Scan what follows `(`. Returns the kind of group opened, or `None`
    /// when the construct was consumed whole (inline options).
    fn scan_group_open(&mut self) -> Result<Option<GroupKind>, Error> {
        if self.chars_right() == 0 || self.right_char(0) != '?' {
            if self.use_option_n() {
                return Ok(Some(GroupKind::Group));
            }
            let capnum = self.autocap as isize;
            self.autocap += 1;
            return Ok(Some(GroupKind::Capture { capnum, uncapnum: -1 }));
        }

        self.move_right(1);
        if self.chars_right() == 0 {
            return Err(self.err("unrecognized grouping construct"));
        }
        let ch = self.right_char(0);
        match ch {
            ':' => {
                self.move_right(1);
                Ok(Some(GroupKind::Group))
            }
            '=' => {
                self.move_right(1);
                self.options.remove(RegexOptions::RIGHT_TO_LEFT);
                Ok(Some(GroupKind::Require))
            }
            '!' => {
                self.move_right(1);
                self.options.remove(RegexOptions::RIGHT_TO_LEFT);
                Ok(Some(GroupKind::Prevent))
            }
            '>' => {
                self.move_right(1);
                Ok(Some(GroupKind::Atomic))
            }
            'P' if self.options.contains(RegexOptions::RE2)
                && self.chars_right() > 1
                && self.right_char(1) == '<' =>
            {
                self.move_right(1);
                self.scan_named_group('<')
            }
            '\'' | '<' => {
                if ch == '<' && self.chars_right() > 1 {
                    match self.right_char(1) {
                        '=' => {
                            self.move_right(2);
                            self.options.insert(RegexOptions::RIGHT_TO_LEFT);
                            return Ok(Some(GroupKind::Require));
                        }
                        '!' => {
                            self.move_right(2);
                            self.options.insert(RegexOptions::RIGHT_TO_LEFT);
                            return Ok(Some(GroupKind::Prevent));
                        }
                        _ => {}
                    }
                }
                self.scan_named_group(ch)
            }
            '(' => {
                self.move_right(1);
                self.scan_condition().map(Some)
            }
            _ => {
                let start = self.pos;
                self.scan_options();
                if self.chars_right() > 0 {
                    match self.right_char(0) {
                        ')' => {
                            self.move_right(1);
                            return Ok(None);
                        }
                        ':' => {
                            self.move_right(1);
                            return Ok(Some(GroupKind::Group));
                        }
                        _ => {}
                    }
                }
                self.pos = start;
                Err(self.err("unrecognized grouping construct"))
            }
        }
    }

    /// The test of a `(?(..)..)` conditional; only group numbers and group
    /// names are supported as conditions.
    fn scan_condition(&mut self) -> Result<GroupKind, Error> {
        if self.chars_right() == 0 {
            return Err(self.err("malformed (?(..) condition"));
        }
        let first = self.right_char(0);
        let capnum = if first.is_ascii_digit() {
            let n = self.scan_decimal()?;
            if !self.is_capture_slot(n) {
                return Err(self.err(format!(
                    "conditional refers to undefined group {}",
                    n
                )));
            }
            n
        } else if is_word_char(first) {
            let name = self.scan_capname();
            match self.cap_names.get(&name).copied() {
                Some(n) => n,
                None => {
                    return Err(self.err(format!(
                        "conditional refers to undefined group name `{}`",
                        name
                    )))
                }
            }
        } else {
            return Err(self.err("conditional test must name a capture group"));
        };
        if self.chars_right() == 0 || self.move_right_get() != ')' {
            return Err(self.err("malformed (?(..) condition"));
        }
        Ok(GroupKind::TestRef { capnum })
    }

    fn scan_named_group(
        &mut self,
        open: char,
    ) -> Result<Option<GroupKind>, Error> {
        debug_assert!(open == '<' || open == '\'');
        let close = if open == '<' { '>' } else { '\'' };
        self.move_right(1);
        if self.chars_right() == 0 {
            return Err(self.err("unrecognized grouping construct"));
        }

        let mut capnum: isize = -1;
        let mut uncapnum: isize = -1;
        let ch = self.right_char(0);
        if ch.is_ascii_digit() {
            let n = self.scan_decimal()?;
            if n == 0 {
                return Err(self.err("capture number cannot be zero"));
            }
            capnum = n as isize;
        } else if is_word_char(ch) {
            let name = self.scan_capname();
            match self.cap_names.get(&name).copied() {
                Some(n) => capnum = n as isize,
                None => {
                    return Err(
                        self.err(format!("invalid group name `{}`", name))
                    )
                }
            }
        } else if ch != '-' {
            return Err(
                self.err("group names must begin with a word character")
            );
        }

        if self.chars_right() > 0 && self.right_char(0) == '-' {
            self.move_right(1);
            if self.chars_right() == 0 {
                return Err(self.err("unrecognized grouping construct"));
            }
            let ch = self.right_char(0);
            if ch.is_ascii_digit() {
                let n = self.scan_decimal()?;
                if !self.is_capture_slot(n) {
                    return Err(self.err(format!(
                        "reference to undefined group number {}",
                        n
                    )));
                }
                uncapnum = n as isize;
            } else if is_word_char(ch) {
                let name = self.scan_capname();
                match self.cap_names.get(&name).copied() {
                    Some(n) => uncapnum = n as isize,
                    None => {
                        return Err(self.err(format!(
                            "reference to undefined group name `{}`",
                            name
                        )))
                    }
                }
            } else {
                return Err(
                    self.err("group names must begin with a word character")
                );
            }
        }

        if capnum == -1 && uncapnum == -1 {
            return Err(
                self.err("group names must begin with a word character")
            );
        }
        if self.chars_right() == 0 || self.move_right_get() != close {
            return Err(self.err("unrecognized grouping construct"));
        }
        Ok(Some(GroupKind::Capture { capnum, uncapnum }))
    }

    // ---------------------------------------------------------------------
    // escapes

    fn scan_backslash(&mut self) -> Result<Node, Error> {
        if self.chars_right() == 0 {
            return Err(self.err("illegal \\ at end of pattern"));
        }
        let ch = self.right_char(0);
        match ch {
            'b' => {
                self.move_right(1);
                Ok(if self.use_option_e() {
                    Node::EcmaBoundary
                } else {
                    Node::Boundary
                })
            }
            'B' => {
                self.move_right(1);
                Ok(if self.use_option_e() {
                    Node::NonEcmaBoundary
                } else {
                    Node::NonBoundary
                })
            }
            'A' => {
                self.move_right(1);
                Ok(Node::Beginning)
            }
            'G' => {
                self.move_right(1);
                Ok(Node::Start)
            }
            'Z' => {
                self.move_right(1);
                Ok(Node::EndZ)
            }
            'z' => {
                self.move_right(1);
                Ok(Node::End)
            }
            'w' | 'W' | 's' | 'S' | 'd' | 'D' | 'p' | 'P' => {
                let set = self.scan_class_escape()?;
                Ok(self.make_set_node(set))
            }
            'k' => {
                self.move_right(1);
                if self.chars_right() >= 2 {
                    let open = self.move_right_get();
                    if open == '<' || open == '\'' {
                        let close = if open == '<' { '>' } else { '\'' };
                        return self.scan_backref_name(close);
                    }
                }
                Err(self.err("malformed \\k<..> named backreference"))
            }
            '1'..='9' if !self.use_option_e() => {
                let capnum = self.scan_decimal()?;
                if self.is_capture_slot(capnum) {
                    Ok(Node::Ref { capnum, flags: self.leaf_flags() })
                } else {
                    Err(self.err(format!(
                        "reference to undefined group number {}",
                        capnum
                    )))
                }
            }
            '1'..='9' => self.scan_ecma_backref_or_octal(),
            '0' => {
                let value = self.scan_octal();
                let ch = self.fold_if_ci(value);
                Ok(Node::One { ch, flags: self.leaf_flags() })
            }
            _ => {
                let c = self.scan_char_escape()?;
                let ch = self.fold_if_ci(c);
                Ok(Node::One { ch, flags: self.leaf_flags() })
            }
        }
    }

    fn scan_backref_name(&mut self, close: char) -> Result<Node, Error> {
        if self.chars_right() == 0 {
            return Err(self.err("malformed \\k<..> named backreference"));
        }
        let ch = self.right_char(0);
        let capnum = if ch.is_ascii_digit() {
            let n = self.scan_decimal()?;
            if !self.is_capture_slot(n) {
                return Err(self.err(format!(
                    "reference to undefined group number {}",
                    n
                )));
            }
            n
        } else {
            let name = self.scan_capname();
            match self.cap_names.get(&name).copied() {
                Some(n) => n,
                None => {
                    return Err(self.err(format!(
                        "reference to undefined group name `{}`",
                        name
                    )))
                }
            }
        };
        if self.chars_right() == 0 || self.move_right_get() != close {
            return Err(self.err("malformed \\k<..> named backreference"));
        }
        Ok(Node::Ref { capnum, flags: self.leaf_flags() })
    }

    /// ECMAScript `\n` digits: the longest prefix naming a group declared
    /// to the left is a backreference; otherwise the digits are an octal
    /// escape (or a literal digit if they cannot be octal).
    fn scan_ecma_backref_or_octal(&mut self) -> Result<Node, Error> {
        let ref_pos = self.pos;
        let mut capnum: Option<usize> = None;
        let mut newcapnum = (self.right_char(0) as u8 - b'0') as usize;
        self.move_right(1);
        if self.is_capture_slot(newcapnum)
            && self.caps.get(&newcapnum).map_or(false, |&p| p < ref_pos)
        {
            capnum = Some(newcapnum);
        }
        while self.chars_right() > 0 && self.right_char(0).is_ascii_digit() {
            let digit = (self.right_char(0) as u8 - b'0') as usize;
            let candidate = newcapnum * 10 + digit;
            if candidate > self.cap_top {
                break;
            }
            self.move_right(1);
            newcapnum = candidate;
            if self.is_capture_slot(newcapnum)
                && self.caps.get(&newcapnum).map_or(false, |&p| p < ref_pos)
            {
                capnum = Some(newcapnum);
            }
        }
        if let Some(capnum) = capnum {
            return Ok(Node::Ref { capnum, flags: self.leaf_flags() });
        }
        self.pos = ref_pos;
        let first = self.right_char(0);
        let ch = if ('0'..='7').contains(&first) {
            self.scan_octal()
        } else {
            self.move_right(1);
            first
        };
        let ch = self.fold_if_ci(ch);
        Ok(Node::One { ch, flags: self.leaf_flags() })
    }

    /// A class shorthand escape: `\d \D \w \W \s \S \p \P`. The cursor is
    /// on the letter.
    fn scan_class_escape(&mut self) -> Result<CharSet, Error> {
        let ch = self.move_right_get();
        let ecma = self.use_option_e();
        let mut set = CharSet::new();
        match ch {
            'd' => set.add_ranges(digit_ranges(ecma)),
            'D' => set.add_negated_ranges(digit_ranges(ecma)),
            'w' => set.add_ranges(word_ranges(ecma)),
            'W' => set.add_negated_ranges(word_ranges(ecma)),
            's' => set.add_ranges(space_ranges(ecma)),
            'S' => set.add_negated_ranges(space_ranges(ecma)),
            'p' | 'P' => {
                let ranges = self.scan_category()?;
                if ch == 'p' {
                    set.add_ranges(&ranges);
                } else {
                    set.add_negated_ranges(&ranges);
                }
            }
            _ => unreachable!(),
        }
        if self.use_option_i() {
            set.add_lowercase();
        }
        set.canonicalize();
        Ok(set)
    }

    fn scan_category(&mut self) -> Result<Vec<(char, char)>, Error> {
        if self.chars_right() < 3 || self.move_right_get() != '{' {
            return Err(self.err("malformed \\p{..} character escape"));
        }
        let start = self.pos;
        while self.chars_right() > 0 && self.right_char(0) != '}' {
            self.move_right(1);
        }
        if self.chars_right() == 0 {
            return Err(self.err("incomplete \\p{..} character escape"));
        }
        let name: String = self.pattern[start..self.pos].iter().collect();
        self.move_right(1);
        match charclass::unicode_category(&name) {
            Some(ranges) => Ok(ranges.to_vec()),
            None => Err(self.err(format!(
                "unknown Unicode category or script `{}`",
                name
            ))),
        }
    }

    /// A single-character escape: control, hex, unicode, or an escaped
    /// metacharacter. The cursor sits on the escape's first character.
    fn scan_char_escape(&mut self) -> Result<char, Error> {
        let ch = self.move_right_get();
        match ch {
            'a' => Ok('\u{7}'),
            'b' => Ok('\u{8}'),
            'e' => Ok('\u{1B}'),
            'f' => Ok('\u{C}'),
            'n' => Ok('\n'),
            'r' => Ok('\r'),
            't' => Ok('\t'),
            'v' => Ok('\u{B}'),
            'c' => {
                if self.chars_right() == 0 {
                    return Err(self.err("missing control character"));
                }
                let c = self.move_right_get().to_ascii_uppercase();
                if ('@'..='_').contains(&c) {
                    Ok(((c as u8) ^ 0x40) as char)
                } else {
                    Err(self.err("unrecognized control character"))
                }
            }
            'x' => {
                if self.options.contains(RegexOptions::RE2)
                    && self.chars_right() > 0
                    && self.right_char(0) == '{'
                {
                    self.move_right(1);
                    let start = self.pos;
                    while self.chars_right() > 0 && self.right_char(0) != '}' {
                        self.move_right(1);
                    }
                    if self.chars_right() == 0 || self.pos == start {
                        return Err(self.err("malformed \\x{..} escape"));
                    }
                    let digits: String =
                        self.pattern[start..self.pos].iter().collect();
                    self.move_right(1);
                    return u32::from_str_radix(&digits, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| self.err("malformed \\x{..} escape"));
                }
                self.scan_hex(2)
            }
            'u' => self.scan_hex(4),
            '0'..='7' => {
                self.move_left();
                Ok(self.scan_octal())
            }
            _ if !is_word_char(ch) => Ok(ch),
            _ => {
                Err(self.err(format!("unrecognized escape sequence \\{}", ch)))
            }
        }
    }

    fn scan_hex(&mut self, digits: usize) -> Result<char, Error> {
        if self.chars_right() < digits {
            return Err(self.err("insufficient hexadecimal digits"));
        }
        let mut value: u32 = 0;
        for _ in 0..digits {
            let c = self.move_right_get();
            let d = c
                .to_digit(16)
                .ok_or_else(|| self.err("insufficient hexadecimal digits"))?;
            value = value * 16 + d;
        }
        char::from_u32(value)
            .ok_or_else(|| self.err("hexadecimal escape is not a scalar"))
    }

    fn scan_octal(&mut self) -> char {
        let mut value: u32 = 0;
        let mut count = 0;
        while count < 3
            && self.chars_right() > 0
            && ('0'..='7').contains(&self.right_char(0))
        {
            let d = self.move_right_get() as u32 - '0' as u32;
            value = value * 8 + d;
            count += 1;
        }
        if self.use_option_e() {
            value &= 0xFF;
        }
        char::from_u32(value).unwrap_or('\0')
    }

    fn scan_decimal(&mut self) -> Result<usize, Error> {
        let mut value: usize = 0;
        let mut any = false;
        while self.chars_right() > 0 && self.right_char(0).is_ascii_digit() {
            let d = (self.move_right_get() as u8 - b'0') as usize;
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(d))
                .filter(|&v| v <= i32::MAX as usize)
                .ok_or_else(|| self.err("decimal number too large"))?;
            any = true;
        }
        if !any {
            return Err(self.err("expected a decimal number"));
        }
        Ok(value)
    }

    fn scan_capname(&mut self) -> String {
        let start = self.pos;
        while self.chars_right() > 0 && is_word_char(self.right_char(0)) {
            self.move_right(1);
        }
        self.pattern[start..self.pos].iter().collect()
    }

    // ---------------------------------------------------------------------
    // character classes

    fn scan_char_set(
        &mut self,
        case_insensitive: bool,
        scan_only: bool,
    ) -> Result<CharSet, Error> {
        let mut set = CharSet::new();
        let mut ch_prev = '\0';
        let mut in_range = false;
        let mut first_char = true;
        let mut closed = false;

        if self.chars_right() > 0 && self.right_char(0) == '^' {
            self.move_right(1);
            set.set_negate(true);
        }

        while self.chars_right() > 0 {
            let mut translated = false;
            let mut ch = self.move_right_get();
            if ch == ']' && !first_char {
                closed = true;
                break;
            }
            if ch == '\\' && self.chars_right() > 0 {
                let esc = self.right_char(0);
                match esc {
                    'D' | 'd' | 'W' | 'w' | 'S' | 's' | 'P' | 'p' => {
                        if in_range {
                            return Err(self.err(
                                "cannot include a class in a character range",
                            ));
                        }
                        if scan_only {
                            self.move_right(1);
                            if esc == 'p' || esc == 'P' {
                                self.scan_category()?;
                            }
                        } else {
                            let class = self.scan_class_escape()?;
                            set.union(&class);
                        }
                        first_char = false;
                        continue;
                    }
                    _ => {
                        ch = self.scan_char_escape()?;
                        translated = true;
                    }
                }
            }

            if in_range {
                in_range = false;
                if ch_prev > ch {
                    return Err(self.err("[x-y] range in reverse order"));
                }
                if !scan_only {
                    set.add_range(ch_prev, ch);
                }
            } else if self.chars_right() >= 2
                && self.right_char(0) == '-'
                && self.right_char(1) == '['
                || !translated
                    && ch == '-'
                    && !first_char
                    && self.chars_right() >= 1
                    && self.right_char(0) == '['
            {
                // class subtraction `x-[..]` or trailing `-[..]`; either
                // way it must be the last element before `]`
                if ch != '-' {
                    if !scan_only {
                        set.add_char(ch);
                    }
                    self.move_right(1);
                }
                self.move_right(1);
                let sub = self.scan_char_set(case_insensitive, scan_only)?;
                if !scan_only {
                    set.set_subtraction(sub);
                }
                if self.chars_right() == 0 || self.right_char(0) != ']' {
                    return Err(self.err(
                        "a subtraction must be the last element in a character class",
                    ));
                }
                self.move_right(1);
                closed = true;
                break;
            } else if self.chars_right() >= 2
                && self.right_char(0) == '-'
                && self.right_char(1) != ']'
            {
                // start of an x-y range
                ch_prev = ch;
                in_range = true;
                self.move_right(1);
            } else if !scan_only {
                set.add_char(ch);
            }
            first_char = false;
        }

        if !closed {
            return Err(self.err("unterminated [] set"));
        }
        if !scan_only {
            if in_range {
                set.add_char(ch_prev);
                set.add_char('-');
            }
            if case_insensitive {
                set.add_lowercase();
            }
            set.canonicalize();
        }
        Ok(set)
    }

    // ---------------------------------------------------------------------
    // whitespace, comments, options

    fn scan_blank(&mut self) -> Result<(), Error> {
        loop {
            while self.use_option_x()
                && self.chars_right() > 0
                && is_space_char(self.right_char(0))
            {
                self.move_right(1);
            }
            if self.chars_right() >= 3
                && self.right_char(0) == '('
                && self.right_char(1) == '?'
                && self.right_char(2) == '#'
            {
                while self.chars_right() > 0 && self.right_char(0) != ')' {
                    self.move_right(1);
                }
                if self.chars_right() == 0 {
                    return Err(self.err("unterminated (?#..) comment"));
                }
                self.move_right(1);
            } else if self.use_option_x()
                && self.chars_right() > 0
                && self.right_char(0) == '#'
            {
                while self.chars_right() > 0 && self.right_char(0) != '\n' {
                    self.move_right(1);
                }
            } else {
                return Ok(());
            }
        }
    }

    /// Consume `imnsx-imnsx` option letters; stops at anything else.
    fn scan_options(&mut self) {
        let mut off = false;
        while self.chars_right() > 0 {
            let ch = self.right_char(0);
            let flag = match ch {
                '-' => {
                    off = true;
                    self.move_right(1);
                    continue;
                }
                '+' => {
                    off = false;
                    self.move_right(1);
                    continue;
                }
                'i' => RegexOptions::IGNORE_CASE,
                'm' => RegexOptions::MULTILINE,
                'n' => RegexOptions::EXPLICIT_CAPTURE,
                's' => RegexOptions::SINGLELINE,
                'x' => RegexOptions::IGNORE_PATTERN_WHITESPACE,
                _ => return,
            };
            self.move_right(1);
            if off {
                self.options.remove(flag);
            } else {
                self.options.insert(flag);
            }
        }
    }

    fn use_option_i(&self) -> bool {
        self.options.contains(RegexOptions::IGNORE_CASE)
    }
    fn use_option_m(&self) -> bool {
        self.options.contains(RegexOptions::MULTILINE)
    }
    fn use_option_n(&self) -> bool {
        self.options.contains(RegexOptions::EXPLICIT_CAPTURE)
    }
    fn use_option_s(&self) -> bool {
        self.options.contains(RegexOptions::SINGLELINE)
    }
    fn use_option_x(&self) -> bool {
        self.options.contains(RegexOptions::IGNORE_PATTERN_WHITESPACE)
    }
    fn use_option_e(&self) -> bool {
        self.options.contains(RegexOptions::ECMA_SCRIPT)
    }
}

// -------------------------------------------------------------------------
// tree construction helpers

fn make_concat(mut children: Vec<Node>) -> Node {
    // merge runs of single-scalar literals with identical flags; leaves
    // parsed under rtl prepend, so a reversed concatenation still yields
    // the literal in reading order
    let mut merged: Vec<Node> = Vec::with_capacity(children.len());
    for node in children.drain(..) {
        match merged.pop() {
            None => merged.push(node),
            Some(prev) => match merge_literals(prev, node) {
                Ok(joined) => merged.push(joined),
                Err((prev, node)) => {
                    merged.push(prev);
                    merged.push(node);
                }
            },
        }
    }
    match merged.len() {
        0 => Node::Empty,
        1 => merged.pop().unwrap(),
        _ => Node::Concat { children: merged },
    }
}

fn merge_literals(prev: Node, next: Node) -> Result<Node, (Node, Node)> {
    match (prev, next) {
        (Node::One { ch: a, flags: fa }, Node::One { ch: b, flags: fb })
            if fa == fb =>
        {
            let chars = if fa.rtl { vec![b, a] } else { vec![a, b] };
            Ok(Node::Multi { chars, flags: fa })
        }
        (Node::Multi { mut chars, flags: fa }, Node::One { ch, flags: fb })
            if fa == fb =>
        {
            if fa.rtl {
                chars.insert(0, ch);
            } else {
                chars.push(ch);
            }
            Ok(Node::Multi { chars, flags: fa })
        }
        (
            Node::Multi { chars: a, flags: fa },
            Node::Multi { chars: b, flags: fb },
        ) if fa == fb => {
            let chars = if fa.rtl {
                let mut joined = b;
                joined.extend(a);
                joined
            } else {
                let mut joined = a;
                joined.extend(b);
                joined
            };
            Ok(Node::Multi { chars, flags: fa })
        }
        (prev, next) => Err((prev, next)),
    }
}

fn make_alternate(mut arms: Vec<Node>) -> Node {
    match arms.len() {
        0 => Node::Empty,
        1 => arms.pop().unwrap(),
        _ => Node::Alternate { children: arms },
    }
}

fn quantify(node: Node, min: usize, max: usize, lazy: bool) -> Node {
    if min == 1 && max == 1 {
        return node;
    }
    match node {
        Node::One { ch, flags } => Node::OneLoop { ch, min, max, lazy, flags },
        Node::Notone { ch, flags } => {
            Node::NotoneLoop { ch, min, max, lazy, flags }
        }
        Node::Set { set, flags } => {
            Node::SetLoop { set, min, max, lazy, flags }
        }
        child => Node::Loop { min, max, lazy, child: Box::new(child) },
    }
}

fn is_word_char(ch: char) -> bool {
    charclass::is_word_char(ch)
}

fn is_space_char(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r' | '\u{B}' | '\u{C}')
}

fn word_ranges(ecma: bool) -> &'static [(char, char)] {
    if ecma {
        charclass::ECMA_WORD
    } else {
        charclass::word_ranges()
    }
}

fn digit_ranges(ecma: bool) -> &'static [(char, char)] {
    if ecma {
        charclass::ECMA_DIGIT
    } else {
        charclass::digit_ranges()
    }
}

fn space_ranges(ecma: bool) -> &'static [(char, char)] {
    if ecma {
        charclass::ECMA_SPACE
    } else {
        charclass::space_ranges()
    }
}

/// Escape all metacharacters in `text` so the result matches it literally.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' | '*' | '+' | '?' | '|' | '{' | '}' | '[' | ']' | '(' | ')'
            | '^' | '$' | '.' | '#' => {
                out.push('\\');
                out.push(ch);
            }
            ' ' => out.push_str("\\ "),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{C}' => out.push_str("\\f"),
            _ => out.push(ch),
        }
    }
    out
}

/// Reverse [`escape`]: strip one level of backslash escaping.
pub fn unescape(text: &str) -> Result<String, Error> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        i += 1;
        if i >= chars.len() {
            return Err(Error::syntax("illegal \\ at end of pattern", i));
        }
        let rest: String = chars[i..].iter().collect();
        let mut p = Parser::new(&rest, RegexOptions::empty());
        let c = p.scan_char_escape()?;
        out.push(c);
        i += p.pos;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(pat: &str) -> Ast {
        parse(pat, RegexOptions::empty()).unwrap()
    }

    #[test]
    fn literal_run_merges() {
        let ast = parse_ok("abc");
        match ast.root {
            Node::Multi { ref chars, .. } => {
                assert_eq!(chars.as_slice(), &['a', 'b', 'c'])
            }
            ref other => panic!("expected Multi, got {:?}", other),
        }
    }

    #[test]
    fn alternation_keeps_order() {
        let ast = parse_ok("a|b|c");
        match ast.root {
            Node::Alternate { ref children } => assert_eq!(children.len(), 3),
            ref other => panic!("expected Alternate, got {:?}", other),
        }
    }

    #[test]
    fn quantifier_on_char_is_a_loop_leaf() {
        let ast = parse_ok("a{2,5}?");
        match ast.root {
            Node::OneLoop { ch, min, max, lazy, .. } => {
                assert_eq!((ch, min, max, lazy), ('a', 2, 5, true));
            }
            ref other => panic!("expected OneLoop, got {:?}", other),
        }
    }

    #[test]
    fn named_groups_number_after_unnamed() {
        let ast = parse_ok(r"(a)(?<x>b)(c)");
        let names = ast.cap_names.unwrap();
        assert_eq!(names["x"], 3);
        assert_eq!(ast.cap_count, 4);
        assert_eq!(
            ast.caps_list.unwrap(),
            vec!["0", "1", "2", "x"]
        );
    }

    #[test]
    fn explicit_numbers_make_sparse_maps() {
        let ast = parse_ok(r"(?<17>a)");
        assert_eq!(ast.cap_num_list, Some(vec![0, 17]));
        assert_eq!(ast.cap_count, 2);
        assert_eq!(ast.cap_top, 18);
    }

    #[test]
    fn forward_backreference_is_accepted() {
        assert!(parse(r"\1(a)", RegexOptions::empty()).is_ok());
    }

    #[test]
    fn undefined_backreference_is_rejected() {
        let err = parse(r"(a)\2", RegexOptions::empty()).unwrap_err();
        match err {
            Error::Syntax { .. } => {}
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn quantifier_following_nothing() {
        assert!(parse("*a", RegexOptions::empty()).is_err());
        assert!(parse("(|*)", RegexOptions::empty()).is_err());
        assert!(parse("a**", RegexOptions::empty()).is_err());
    }

    #[test]
    fn invalid_brace_is_literal() {
        let ast = parse_ok("a{,2}");
        match ast.root {
            Node::Multi { ref chars, .. } => {
                assert_eq!(chars.iter().collect::<String>(), "a{,2}");
            }
            ref other => panic!("expected literal chars, got {:?}", other),
        }
    }

    #[test]
    fn unbalanced_parens() {
        assert!(parse("(a", RegexOptions::empty()).is_err());
        assert!(parse("a)", RegexOptions::empty()).is_err());
    }

    #[test]
    fn lookbehind_body_is_right_to_left() {
        let ast = parse_ok(r"(?<=ab)c");
        match ast.root {
            Node::Concat { ref children } => match children[0] {
                Node::Require { ref child } => match **child {
                    Node::Multi { ref chars, flags } => {
                        assert!(flags.rtl);
                        assert_eq!(chars.iter().collect::<String>(), "ab");
                    }
                    ref other => panic!("unexpected body {:?}", other),
                },
                ref other => panic!("expected Require, got {:?}", other),
            },
            ref other => panic!("expected Concat, got {:?}", other),
        }
    }

    #[test]
    fn escape_roundtrip() {
        let orig = r"a+b (c) [d] #e";
        let escaped = escape(orig);
        assert_eq!(unescape(&escaped).unwrap(), orig);
    }

    #[test]
    fn inline_options_scope_to_group() {
        let ast = parse_ok(r"(?i:a)b");
        match ast.root {
            Node::Concat { ref children } => {
                match children[0] {
                    Node::One { ch, flags } => {
                        assert_eq!(ch, 'a');
                        assert!(flags.ci);
                    }
                    ref other => panic!("unexpected {:?}", other),
                }
                match children[1] {
                    Node::One { ch, flags } => {
                        assert_eq!(ch, 'b');
                        assert!(!flags.ci);
                    }
                    ref other => panic!("unexpected {:?}", other),
                }
            }
            ref other => panic!("expected Concat, got {:?}", other),
        }
    }

    #[test]
    fn class_subtraction_parses() {
        assert!(parse(r"[a-z-[aeiou]]+", RegexOptions::empty()).is_ok());
        assert!(parse(r"[a-z-[b]x]", RegexOptions::empty()).is_err());
    }

    #[test]
    fn balancing_group_parses() {
        let ast = parse_ok(r"(?<open>o)+(?<-open>c)+");
        match ast.root {
            Node::Concat { ref children } => match children[1] {
                Node::Loop { ref child, .. } => match **child {
                    Node::Capture { capnum, uncapnum, .. } => {
                        assert_eq!(capnum, -1);
                        assert_eq!(uncapnum, 1);
                    }
                    ref other => panic!("unexpected {:?}", other),
                },
                ref other => panic!("unexpected {:?}", other),
            },
            ref other => panic!("expected Concat, got {:?}", other),
        }
    }
}
