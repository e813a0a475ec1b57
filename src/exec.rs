use std::time::{Duration, Instant};

use log::trace;

use crate::charclass::{self, fold};
use crate::error::Error;
use crate::matches::MatchData;
use crate::prog::{Anchors, Code, Op, BACK, BACK2, CI, RTL};

/// How many VM ticks run between wall-clock reads when a timeout is set.
/// Fixed so timing behavior is reproducible across runs.
pub const TIMEOUT_CHECK_FREQUENCY: u32 = 1000;

/// A reusable execution workspace: the three runtime stacks plus the
/// capture book. One runner serves exactly one match attempt at a time;
/// the pool hands them out and resets them on return.
///
/// `runtrack` is the operation (backtrack) stack. Frames are pushed
/// argument-first and end with the instruction's code position; a negated
/// code position selects the second-level re-entry of the instruction on
/// unwind. Position 0 always holds the program prologue, so a negated
/// position is never ambiguous.
///
/// `runstack` is the grouping stack and `runcrawl` the capture undo log:
/// every mutation of the capture book pushes the affected slot here, and
/// popping undoes exactly one mutation.
#[derive(Debug, Default)]
pub(crate) struct Runner {
    runtrack: Vec<isize>,
    runstack: Vec<isize>,
    runcrawl: Vec<usize>,
    data: MatchData,
}

impl Runner {
    pub fn new() -> Runner {
        Runner {
            runtrack: Vec::with_capacity(64),
            runstack: Vec::with_capacity(16),
            runcrawl: Vec::with_capacity(16),
            data: MatchData::default(),
        }
    }

    /// Zero the workspace before the runner goes back to the pool, so no
    /// partial state from this match leaks into the next acquisition.
    pub fn reset(&mut self) {
        self.runtrack.clear();
        self.runstack.clear();
        self.runcrawl.clear();
        self.data.reset(0);
    }

    /// Iterate candidate start positions and run the program at each.
    /// Returns the winning capture book and the cursor's resting position,
    /// or `None` when no start position admits a match.
    pub fn scan(
        &mut self,
        code: &Code,
        text: &[char],
        textstart: usize,
        timeout: Option<Duration>,
        pattern: &str,
        ecma: bool,
        debug: bool,
    ) -> Result<Option<(MatchData, usize)>, Error> {
        self.data.reset(code.cap_size);
        self.runtrack.clear();
        self.runstack.clear();
        self.runcrawl.clear();

        let textend = text.len();
        let (stoppos, bump): (usize, isize) =
            if code.rtl { (0, -1) } else { (textend, 1) };

        let mut vm = Vm {
            code,
            text,
            textstart,
            textend,
            textpos: textstart,
            codepos: 0,
            op: 0,
            op_rtl: false,
            ci: false,
            runner: self,
            ecma,
            pattern,
            timeout,
            deadline: timeout.map(|d| Instant::now() + d),
            ticks_left: TIMEOUT_CHECK_FREQUENCY,
        };

        loop {
            // a candidate too close to the input edge cannot fit even the
            // shortest match
            let hopeless = if code.rtl {
                vm.textpos < code.min_match_len
            } else {
                vm.textpos.saturating_add(code.min_match_len) > textend
            };
            if hopeless {
                return Ok(None);
            }

            if vm.find_first_char() {
                vm.check_timeout()?;
                if debug {
                    trace!("attempt at {}", vm.textpos);
                }
                vm.execute()?;
                if vm.runner.data.matchcount[0] > 0 {
                    let textpos = vm.textpos;
                    let data = std::mem::take(&mut vm.runner.data);
                    return Ok(Some((data, textpos)));
                }
                vm.runner.runtrack.clear();
                vm.runner.runstack.clear();
                vm.runner.runcrawl.clear();
            }

            if vm.textpos == stoppos {
                return Ok(None);
            }
            vm.textpos = (vm.textpos as isize + bump) as usize;
        }
    }
}

struct Vm<'r, 't> {
    code: &'r Code,
    text: &'t [char],
    textstart: usize,
    textend: usize,
    textpos: usize,
    codepos: usize,
    /// Current instruction cell with Ci/Rtl stripped; Back/Back2 bits are
    /// present when resuming from a popped frame.
    op: i32,
    op_rtl: bool,
    ci: bool,
    runner: &'r mut Runner,
    ecma: bool,
    pattern: &'r str,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    ticks_left: u32,
}

impl<'r, 't> Vm<'r, 't> {
    // -----------------------------------------------------------------
    // instruction cursor

    #[inline]
    fn set_operator(&mut self, cell: i32) {
        self.ci = cell & CI != 0;
        self.op_rtl = cell & RTL != 0;
        self.op = cell & !(CI | RTL);
    }

    #[inline]
    fn advance(&mut self, operands: usize) {
        self.codepos += operands + 1;
        let cell = self.code.ops[self.codepos];
        self.set_operator(cell);
    }

    #[inline]
    fn goto_pos(&mut self, pos: usize) {
        self.codepos = pos;
        let cell = self.code.ops[pos];
        self.set_operator(cell);
    }

    #[inline]
    fn operand(&self, i: usize) -> i32 {
        self.code.ops[self.codepos + 1 + i]
    }

    #[inline]
    fn operand_char(&self, i: usize) -> char {
        char::from_u32(self.operand(i) as u32).unwrap_or('\0')
    }

    /// Resume the instruction recorded by the top frame, at its first or
    /// second backtrack entry depending on the frame's sign.
    #[inline]
    fn backtrack(&mut self) {
        let newpos = match self.runner.runtrack.pop() {
            Some(v) => v,
            None => unreachable!("operation stack empty below the prologue"),
        };
        if newpos < 0 {
            self.codepos = (-newpos) as usize;
            let cell = self.code.ops[self.codepos] | BACK2;
            self.set_operator(cell);
        } else {
            self.codepos = newpos as usize;
            let cell = self.code.ops[self.codepos] | BACK;
            self.set_operator(cell);
        }
    }

    // -----------------------------------------------------------------
    // stacks

    #[inline]
    fn track_push0(&mut self) {
        self.runner.runtrack.push(self.codepos as isize);
    }

    #[inline]
    fn track_push1(&mut self, a: isize) {
        self.runner.runtrack.push(a);
        self.runner.runtrack.push(self.codepos as isize);
    }

    #[inline]
    fn track_push2(&mut self, a: isize, b: isize) {
        self.runner.runtrack.push(a);
        self.runner.runtrack.push(b);
        self.runner.runtrack.push(self.codepos as isize);
    }

    #[inline]
    fn track_push3(&mut self, a: isize, b: isize, c: isize) {
        self.runner.runtrack.push(a);
        self.runner.runtrack.push(b);
        self.runner.runtrack.push(c);
        self.runner.runtrack.push(self.codepos as isize);
    }

    #[inline]
    fn track_push_back2_1(&mut self, a: isize) {
        self.runner.runtrack.push(a);
        self.runner.runtrack.push(-(self.codepos as isize));
    }

    #[inline]
    fn track_push_back2_2(&mut self, a: isize, b: isize) {
        self.runner.runtrack.push(a);
        self.runner.runtrack.push(b);
        self.runner.runtrack.push(-(self.codepos as isize));
    }

    #[inline]
    fn track_pop(&mut self) -> isize {
        match self.runner.runtrack.pop() {
            Some(v) => v,
            None => unreachable!("operation stack underflow"),
        }
    }

    #[inline]
    fn track_pos(&self) -> usize {
        self.runner.runtrack.len()
    }

    #[inline]
    fn track_to(&mut self, depth: usize) {
        self.runner.runtrack.truncate(depth);
    }

    #[inline]
    fn stack_push1(&mut self, a: isize) {
        self.runner.runstack.push(a);
    }

    #[inline]
    fn stack_push2(&mut self, a: isize, b: isize) {
        self.runner.runstack.push(a);
        self.runner.runstack.push(b);
    }

    #[inline]
    fn stack_pop(&mut self) -> isize {
        match self.runner.runstack.pop() {
            Some(v) => v,
            None => unreachable!("grouping stack underflow"),
        }
    }

    #[inline]
    fn crawl_pos(&self) -> usize {
        self.runner.runcrawl.len()
    }

    // -----------------------------------------------------------------
    // captures

    fn capture(&mut self, cap: usize, start: isize, end: isize) {
        let (start, end) = if end < start { (end, start) } else { (start, end) };
        self.runner.runcrawl.push(cap);
        self.runner.data.add_match(cap, start, end - start);
    }

    /// Close a balancing group: the new capture is the span between the
    /// balanced group's end and this group's boundary, and the balanced
    /// group loses its latest capture.
    fn transfer_capture(
        &mut self,
        capnum: i32,
        uncapnum: i32,
        start: isize,
        end: isize,
    ) {
        let (mut start, mut end) =
            if end < start { (end, start) } else { (start, end) };
        let uncap = uncapnum as usize;
        let start2 = self.runner.data.match_index(uncap);
        let end2 = start2 + self.runner.data.match_length(uncap);

        // the new capture gets the innermost defined interval
        if start >= end2 {
            end = start;
            start = end2;
        } else if end <= start2 {
            start = start2;
        } else {
            if end > end2 {
                end = end2;
            }
            if start2 > start {
                start = start2;
            }
        }

        self.runner.runcrawl.push(uncap);
        self.runner.data.balance_match(uncap);

        if capnum != -1 {
            self.runner.runcrawl.push(capnum as usize);
            self.runner.data.add_match(capnum as usize, start, end - start);
        }
    }

    fn uncapture(&mut self) {
        let cap = match self.runner.runcrawl.pop() {
            Some(v) => v,
            None => unreachable!("capture undo log underflow"),
        };
        self.runner.data.remove_match(cap);
    }

    // -----------------------------------------------------------------
    // text cursor

    #[inline]
    fn char_at(&self, i: usize) -> char {
        self.text[i]
    }

    #[inline]
    fn leftchars(&self) -> usize {
        self.textpos
    }

    #[inline]
    fn rightchars(&self) -> usize {
        self.textend - self.textpos
    }

    #[inline]
    fn forwardchars(&self) -> usize {
        if self.op_rtl {
            self.textpos
        } else {
            self.textend - self.textpos
        }
    }

    /// Consume one scalar in the instruction's direction, folded when the
    /// instruction is case-insensitive.
    #[inline]
    fn forwardcharnext(&mut self) -> char {
        let ch = if self.op_rtl {
            self.textpos -= 1;
            self.text[self.textpos]
        } else {
            let c = self.text[self.textpos];
            self.textpos += 1;
            c
        };
        if self.ci {
            fold(ch)
        } else {
            ch
        }
    }

    /// Give back the scalar most recently consumed by `forwardcharnext`.
    #[inline]
    fn backwardnext(&mut self) {
        if self.op_rtl {
            self.textpos += 1;
        } else {
            self.textpos -= 1;
        }
    }

    /// Cursor step in the instruction's direction.
    #[inline]
    fn bump(&self) -> isize {
        if self.op_rtl {
            -1
        } else {
            1
        }
    }

    #[inline]
    fn textto(&mut self, pos: isize) {
        self.textpos = pos as usize;
    }

    fn stringmatch(&mut self, index: usize) -> bool {
        let s = &self.code.strings[index];
        let len = s.len();
        if !self.op_rtl {
            if self.textend - self.textpos < len {
                return false;
            }
            for (i, &pc) in s.iter().enumerate() {
                let tc = self.text[self.textpos + i];
                let tc = if self.ci { fold(tc) } else { tc };
                if tc != pc {
                    return false;
                }
            }
            self.textpos += len;
        } else {
            if self.textpos < len {
                return false;
            }
            let base = self.textpos - len;
            for (i, &pc) in s.iter().enumerate() {
                let tc = self.text[base + i];
                let tc = if self.ci { fold(tc) } else { tc };
                if tc != pc {
                    return false;
                }
            }
            self.textpos = base;
        }
        true
    }

    fn refmatch(&mut self, index: isize, len: isize) -> bool {
        let (index, len) = (index as usize, len as usize);
        if !self.op_rtl {
            if self.textend - self.textpos < len {
                return false;
            }
            for i in 0..len {
                let (mut a, mut b) =
                    (self.text[index + i], self.text[self.textpos + i]);
                if self.ci {
                    a = fold(a);
                    b = fold(b);
                }
                if a != b {
                    return false;
                }
            }
            self.textpos += len;
        } else {
            if self.textpos < len {
                return false;
            }
            let base = self.textpos - len;
            for i in 0..len {
                let (mut a, mut b) = (self.text[index + i], self.text[base + i]);
                if self.ci {
                    a = fold(a);
                    b = fold(b);
                }
                if a != b {
                    return false;
                }
            }
            self.textpos = base;
        }
        true
    }

    fn is_boundary(&self, pos: usize) -> bool {
        let before = pos > 0 && charclass::is_word_char(self.text[pos - 1]);
        let after =
            pos < self.textend && charclass::is_word_char(self.text[pos]);
        before != after
    }

    fn is_ecma_boundary(&self, pos: usize) -> bool {
        let before = pos > 0 && charclass::is_ecma_word_char(self.text[pos - 1]);
        let after =
            pos < self.textend && charclass::is_ecma_word_char(self.text[pos]);
        before != after
    }

    // -----------------------------------------------------------------
    // timeout

    #[inline]
    fn check_timeout(&mut self) -> Result<(), Error> {
        let deadline = match self.deadline {
            Some(d) => d,
            None => return Ok(()),
        };
        self.ticks_left -= 1;
        if self.ticks_left > 0 {
            return Ok(());
        }
        self.ticks_left = TIMEOUT_CHECK_FREQUENCY;
        if Instant::now() >= deadline {
            return Err(Error::Timeout {
                pattern: self.pattern.to_string(),
                duration: self.timeout.unwrap_or_default(),
            });
        }
        Ok(())
    }

    // -----------------------------------------------------------------
    // start-position filter

    /// Reject or relocate the candidate start using the program's leading
    /// anchors and precomputed prefixes. Returns false when no match can
    /// start here or anywhere the scan loop would visit next; `textpos`
    /// is then already pushed to the stop position.
    fn find_first_char(&mut self) -> bool {
        let code = self.code;
        let edge_anchors = Anchors::BEGINNING
            | Anchors::START
            | Anchors::END_Z
            | Anchors::END;
        if code.anchors.intersects(edge_anchors) {
            if !code.rtl {
                if (code.anchors.contains(Anchors::BEGINNING)
                    && self.textpos > 0)
                    || (code.anchors.contains(Anchors::START)
                        && self.textpos > self.textstart)
                {
                    self.textpos = self.textend;
                    return false;
                }
                if code.anchors.contains(Anchors::END_Z)
                    && self.textpos + 1 < self.textend
                {
                    self.textpos = self.textend - 1;
                } else if code.anchors.contains(Anchors::END)
                    && self.textpos < self.textend
                {
                    self.textpos = self.textend;
                }
            } else {
                if (code.anchors.contains(Anchors::END)
                    && self.textpos < self.textend)
                    || (code.anchors.contains(Anchors::END_Z)
                        && (self.textpos + 1 < self.textend
                            || (self.textpos + 1 == self.textend
                                && self.char_at(self.textpos) != '\n')))
                    || (code.anchors.contains(Anchors::START)
                        && self.textpos < self.textstart)
                {
                    self.textpos = 0;
                    return false;
                }
                if code.anchors.contains(Anchors::BEGINNING) && self.textpos > 0
                {
                    self.textpos = 0;
                }
            }
            if let Some(ref bm) = code.bm_prefix {
                return bm.is_match(self.text, self.textpos, self.textend);
            }
            return true;
        }

        if let Some(ref bm) = code.bm_prefix {
            return match bm.scan(self.text, self.textpos, self.textend) {
                Some(pos) => {
                    self.textpos = pos;
                    true
                }
                None => {
                    self.textpos = if code.rtl { 0 } else { self.textend };
                    false
                }
            };
        }

        let fc = match code.fc_prefix {
            Some(ref fc) => fc,
            None => return true,
        };
        if !code.rtl {
            while self.textpos < self.textend {
                if fc.matches(self.text[self.textpos]) {
                    return true;
                }
                self.textpos += 1;
            }
        } else {
            while self.textpos > 0 {
                if fc.matches(self.text[self.textpos - 1]) {
                    return true;
                }
                self.textpos -= 1;
            }
        }
        false
    }

    // -----------------------------------------------------------------
    // the interpreter loop

    /// Run the program from its entry until `Stop`. Whether the attempt
    /// matched is recorded in the capture book (group 0 captured or not);
    /// the only error is a timeout.
    fn execute(&mut self) -> Result<(), Error> {
        self.goto_pos(0);
        loop {
            self.check_timeout()?;
            match (Op::from_cell(self.op), self.op & (BACK | BACK2)) {
                (Op::Stop, 0) => return Ok(()),

                (Op::Nothing, 0) => {}

                (Op::Goto, 0) => {
                    let target = self.operand(0) as usize;
                    self.goto_pos(target);
                    continue;
                }

                (Op::Testref, 0) => {
                    let cap = self.operand(0) as usize;
                    if self.runner.data.is_matched(cap) {
                        self.advance(1);
                        continue;
                    }
                }

                (Op::Lazybranch, 0) => {
                    self.track_push1(self.textpos as isize);
                    self.advance(1);
                    continue;
                }
                (Op::Lazybranch, BACK) => {
                    let pos = self.track_pop();
                    self.textto(pos);
                    let target = self.operand(0) as usize;
                    self.goto_pos(target);
                    continue;
                }

                (Op::Setmark, 0) => {
                    self.stack_push1(self.textpos as isize);
                    self.track_push0();
                    self.advance(0);
                    continue;
                }
                (Op::Nullmark, 0) => {
                    self.stack_push1(-1);
                    self.track_push0();
                    self.advance(0);
                    continue;
                }
                (Op::Setmark, BACK) | (Op::Nullmark, BACK) => {
                    self.stack_pop();
                }

                (Op::Getmark, 0) => {
                    let mark = self.stack_pop();
                    self.track_push1(mark);
                    self.textto(mark);
                    self.advance(0);
                    continue;
                }
                (Op::Getmark, BACK) => {
                    let mark = self.track_pop();
                    self.stack_push1(mark);
                }

                (Op::Capturemark, 0) => {
                    let uncap = self.operand(1);
                    if uncap != -1
                        && !self.runner.data.is_matched(uncap as usize)
                    {
                        self.backtrack();
                        continue;
                    }
                    let mark = self.stack_pop();
                    let cap = self.operand(0);
                    if uncap != -1 {
                        self.transfer_capture(
                            cap,
                            uncap,
                            mark,
                            self.textpos as isize,
                        );
                    } else {
                        self.capture(cap as usize, mark, self.textpos as isize);
                    }
                    self.track_push1(mark);
                    self.advance(2);
                    continue;
                }
                (Op::Capturemark, BACK) => {
                    let mark = self.track_pop();
                    self.stack_push1(mark);
                    self.uncapture();
                    if self.operand(0) != -1 && self.operand(1) != -1 {
                        self.uncapture();
                    }
                }

                (Op::Branchmark, 0) => {
                    let mark = self.stack_pop();
                    if self.textpos as isize != mark {
                        // nonempty body: remember this iteration, loop
                        self.track_push2(mark, self.textpos as isize);
                        self.stack_push1(self.textpos as isize);
                        let target = self.operand(0) as usize;
                        self.goto_pos(target);
                    } else {
                        // empty body: proceed straight
                        self.track_push_back2_1(mark);
                        self.advance(1);
                    }
                    continue;
                }
                (Op::Branchmark, BACK) => {
                    let pos = self.track_pop();
                    let old_mark = self.track_pop();
                    self.stack_pop();
                    self.textto(pos);
                    self.track_push_back2_1(old_mark);
                    self.advance(1);
                    continue;
                }
                (Op::Branchmark, BACK2) => {
                    let old_mark = self.track_pop();
                    self.stack_push1(old_mark);
                }

                (Op::Lazybranchmark, 0) => {
                    let old_mark = self.stack_pop();
                    if self.textpos as isize != old_mark {
                        // nonempty body: offer one more iteration on
                        // backtrack
                        if old_mark != -1 {
                            self.track_push2(old_mark, self.textpos as isize);
                        } else {
                            self.track_push2(
                                self.textpos as isize,
                                self.textpos as isize,
                            );
                        }
                    } else {
                        // empty body: re-anchor the mark so the second
                        // backtrack entry has something to pop
                        self.stack_push1(old_mark);
                        self.track_push_back2_1(old_mark);
                    }
                    self.advance(1);
                    continue;
                }
                (Op::Lazybranchmark, BACK) => {
                    let pos = self.track_pop();
                    let mark = self.track_pop();
                    self.track_push_back2_1(mark);
                    self.stack_push1(pos);
                    self.textto(pos);
                    let target = self.operand(0) as usize;
                    self.goto_pos(target);
                    continue;
                }
                (Op::Lazybranchmark, BACK2) => {
                    self.stack_pop();
                    let old_mark = self.track_pop();
                    self.stack_push1(old_mark);
                }

                (Op::Setcount, 0) => {
                    self.stack_push2(self.textpos as isize, self.operand(0) as isize);
                    self.track_push0();
                    self.advance(1);
                    continue;
                }
                (Op::Nullcount, 0) => {
                    self.stack_push2(-1, self.operand(0) as isize);
                    self.track_push0();
                    self.advance(1);
                    continue;
                }
                (Op::Setcount, BACK) | (Op::Nullcount, BACK) => {
                    self.stack_pop();
                    self.stack_pop();
                }

                (Op::Branchcount, 0) => {
                    let count = self.stack_pop();
                    let mark = self.stack_pop();
                    let matched = self.textpos as isize - mark;
                    if count >= self.operand(1) as isize
                        || (matched == 0 && count >= 0)
                    {
                        // max iterations or empty body: proceed straight
                        self.track_push_back2_2(mark, count);
                        self.advance(2);
                    } else {
                        self.track_push1(mark);
                        self.stack_push2(self.textpos as isize, count + 1);
                        let target = self.operand(0) as usize;
                        self.goto_pos(target);
                    }
                    continue;
                }
                (Op::Branchcount, BACK) => {
                    let prev_mark = self.track_pop();
                    let count = self.stack_pop();
                    let mark = self.stack_pop();
                    if count > 0 {
                        // give back one iteration and proceed straight
                        self.textto(mark);
                        self.track_push_back2_2(prev_mark, count - 1);
                        self.advance(2);
                        continue;
                    }
                    self.stack_push2(prev_mark, count - 1);
                }
                (Op::Branchcount, BACK2) => {
                    let count = self.track_pop();
                    let mark = self.track_pop();
                    self.stack_push2(mark, count);
                }

                (Op::Lazybranchcount, 0) => {
                    let count = self.stack_pop();
                    let mark = self.stack_pop();
                    if count < 0 {
                        // still under the mandatory floor: loop now
                        self.track_push_back2_1(mark);
                        self.stack_push2(self.textpos as isize, count + 1);
                        let target = self.operand(0) as usize;
                        self.goto_pos(target);
                    } else {
                        self.track_push3(mark, count, self.textpos as isize);
                        self.advance(2);
                    }
                    continue;
                }
                (Op::Lazybranchcount, BACK) => {
                    let pos = self.track_pop();
                    let count = self.track_pop();
                    let mark = self.track_pop();
                    if count < self.operand(1) as isize && pos != mark {
                        self.textto(pos);
                        self.stack_push2(pos, count + 1);
                        self.track_push_back2_1(mark);
                        let target = self.operand(0) as usize;
                        self.goto_pos(target);
                        continue;
                    }
                    self.stack_push2(mark, count);
                }
                (Op::Lazybranchcount, BACK2) => {
                    let prev_mark = self.track_pop();
                    let count = self.stack_pop();
                    self.stack_pop();
                    self.stack_push2(prev_mark, count - 1);
                }

                (Op::Setjump, 0) => {
                    self.stack_push2(
                        self.track_pos() as isize,
                        self.crawl_pos() as isize,
                    );
                    self.track_push0();
                    self.advance(0);
                    continue;
                }
                (Op::Setjump, BACK) => {
                    self.stack_pop();
                    self.stack_pop();
                }

                (Op::Backjump, 0) => {
                    let crawl = self.stack_pop();
                    let track = self.stack_pop();
                    self.track_to(track as usize);
                    while self.crawl_pos() != crawl as usize {
                        self.uncapture();
                    }
                }

                (Op::Forejump, 0) => {
                    let crawl = self.stack_pop();
                    let track = self.stack_pop();
                    self.track_to(track as usize);
                    self.track_push1(crawl);
                    self.advance(0);
                    continue;
                }
                (Op::Forejump, BACK) => {
                    let crawl = self.track_pop();
                    while self.crawl_pos() != crawl as usize {
                        self.uncapture();
                    }
                }

                (Op::Bol, 0) => {
                    if self.leftchars() == 0
                        || self.char_at(self.textpos - 1) == '\n'
                    {
                        self.advance(0);
                        continue;
                    }
                }
                (Op::Eol, 0) => {
                    if self.rightchars() == 0
                        || self.char_at(self.textpos) == '\n'
                    {
                        self.advance(0);
                        continue;
                    }
                }
                (Op::Boundary, 0) => {
                    if self.is_boundary(self.textpos) {
                        self.advance(0);
                        continue;
                    }
                }
                (Op::Nonboundary, 0) => {
                    if !self.is_boundary(self.textpos) {
                        self.advance(0);
                        continue;
                    }
                }
                (Op::EcmaBoundary, 0) => {
                    if self.is_ecma_boundary(self.textpos) {
                        self.advance(0);
                        continue;
                    }
                }
                (Op::NonEcmaBoundary, 0) => {
                    if !self.is_ecma_boundary(self.textpos) {
                        self.advance(0);
                        continue;
                    }
                }
                (Op::Beginning, 0) => {
                    if self.leftchars() == 0 {
                        self.advance(0);
                        continue;
                    }
                }
                (Op::Start, 0) => {
                    if self.textpos == self.textstart {
                        self.advance(0);
                        continue;
                    }
                }
                (Op::EndZ, 0) => {
                    let right = self.rightchars();
                    if right == 0
                        || (right == 1 && self.char_at(self.textpos) == '\n')
                    {
                        self.advance(0);
                        continue;
                    }
                }
                (Op::End, 0) => {
                    if self.rightchars() == 0 {
                        self.advance(0);
                        continue;
                    }
                }

                (Op::One, 0) => {
                    if self.forwardchars() >= 1
                        && self.forwardcharnext() == self.operand_char(0)
                    {
                        self.advance(1);
                        continue;
                    }
                }
                (Op::Notone, 0) => {
                    if self.forwardchars() >= 1
                        && self.forwardcharnext() != self.operand_char(0)
                    {
                        self.advance(1);
                        continue;
                    }
                }
                (Op::Set, 0) => {
                    if self.forwardchars() >= 1 {
                        let c = self.forwardcharnext();
                        let set = &self.code.sets[self.operand(0) as usize];
                        if set.char_in(c) {
                            self.advance(1);
                            continue;
                        }
                    }
                }

                (Op::Multi, 0) => {
                    let idx = self.operand(0) as usize;
                    if self.stringmatch(idx) {
                        self.advance(1);
                        continue;
                    }
                }

                (Op::Ref, 0) => {
                    let cap = self.operand(0) as usize;
                    if self.runner.data.is_matched(cap) {
                        let index = self.runner.data.match_index(cap);
                        let length = self.runner.data.match_length(cap);
                        if self.refmatch(index, length) {
                            self.advance(1);
                            continue;
                        }
                    } else if self.ecma {
                        // an unset backreference matches empty in the
                        // ECMAScript dialect
                        self.advance(1);
                        continue;
                    }
                }

                (Op::Onerep, 0) | (Op::Notonerep, 0) => {
                    let count = self.operand(1) as usize;
                    if self.forwardchars() >= count {
                        let ch = self.operand_char(0);
                        let want = Op::from_cell(self.op) == Op::Onerep;
                        let mut ok = true;
                        for _ in 0..count {
                            if (self.forwardcharnext() == ch) != want {
                                ok = false;
                                break;
                            }
                        }
                        if ok {
                            self.advance(2);
                            continue;
                        }
                    }
                }
                (Op::Setrep, 0) => {
                    let count = self.operand(1) as usize;
                    if self.forwardchars() >= count {
                        let idx = self.operand(0) as usize;
                        let mut ok = true;
                        for _ in 0..count {
                            let c = self.forwardcharnext();
                            if !self.code.sets[idx].char_in(c) {
                                ok = false;
                                break;
                            }
                        }
                        if ok {
                            self.advance(2);
                            continue;
                        }
                    }
                }

                (Op::Oneloop, 0) | (Op::Notoneloop, 0) | (Op::Setloop, 0) => {
                    let limit =
                        (self.operand(1) as usize).min(self.forwardchars());
                    let kind = Op::from_cell(self.op);
                    let mut left = limit;
                    while left > 0 {
                        let c = self.forwardcharnext();
                        let hit = match kind {
                            Op::Oneloop => c == self.operand_char(0),
                            Op::Notoneloop => c != self.operand_char(0),
                            _ => {
                                let idx = self.operand(0) as usize;
                                self.code.sets[idx].char_in(c)
                            }
                        };
                        if !hit {
                            self.backwardnext();
                            break;
                        }
                        left -= 1;
                    }
                    // each consumed unit is an alternative to unroll later
                    if limit > left {
                        self.track_push2(
                            (limit - left - 1) as isize,
                            self.textpos as isize - self.bump(),
                        );
                    }
                    self.advance(2);
                    continue;
                }
                (Op::Oneloop, BACK)
                | (Op::Notoneloop, BACK)
                | (Op::Setloop, BACK) => {
                    let pos = self.track_pop();
                    let left = self.track_pop();
                    self.textto(pos);
                    if left > 0 {
                        self.track_push2(left - 1, pos - self.bump());
                    }
                    self.advance(2);
                    continue;
                }

                (Op::Onelazy, 0) | (Op::Notonelazy, 0) | (Op::Setlazy, 0) => {
                    let available =
                        (self.operand(1) as usize).min(self.forwardchars());
                    if available > 0 {
                        self.track_push2(
                            available as isize - 1,
                            self.textpos as isize,
                        );
                    }
                    self.advance(2);
                    continue;
                }
                (Op::Onelazy, BACK)
                | (Op::Notonelazy, BACK)
                | (Op::Setlazy, BACK) => {
                    let pos = self.track_pop();
                    let left = self.track_pop();
                    self.textto(pos);
                    let c = self.forwardcharnext();
                    let hit = match Op::from_cell(self.op) {
                        Op::Onelazy => c == self.operand_char(0),
                        Op::Notonelazy => c != self.operand_char(0),
                        _ => {
                            let idx = self.operand(0) as usize;
                            self.code.sets[idx].char_in(c)
                        }
                    };
                    if hit {
                        if left > 0 {
                            self.track_push2(left - 1, pos + self.bump());
                        }
                        self.advance(2);
                        continue;
                    }
                }

                (op, back) => {
                    unreachable!(
                        "unhandled instruction state {:?}/{:x} at {}",
                        op, back, self.codepos
                    )
                }
            }
            self.backtrack();
        }
    }
}
