use std::collections::HashMap;

use crate::charclass::CharSet;
use crate::error::Error;
use crate::parse::{Ast, Node, NodeFlags, UNBOUNDED};
use crate::prefix;
use crate::prog::{Anchors, Code, Op, CI, RTL};
use crate::re::RegexOptions;

/// Translate a parsed pattern into a compiled program.
///
/// The emitted program is framed so a failed attempt has somewhere to
/// unwind to:
///
/// ```text
/// 0000 Lazybranch -> stop
///      Setmark
///      <body>
///      Capturemark 0 -1
/// stop Stop
/// ```
pub fn write(ast: &Ast) -> Result<Code, Error> {
    let (caps, cap_size) = match ast.cap_num_list {
        None => (None, ast.cap_top),
        Some(ref nums) => {
            let mut map = HashMap::with_capacity(nums.len());
            for (slot, &num) in nums.iter().enumerate() {
                map.insert(num, slot);
            }
            (Some(map), nums.len())
        }
    };

    let mut w = Writer {
        ops: Vec::with_capacity(64),
        strings: Vec::new(),
        string_idx: HashMap::new(),
        sets: Vec::new(),
        int_stack: Vec::new(),
        caps: caps.clone(),
    };

    let root = Node::Capture {
        capnum: 0,
        uncapnum: -1,
        child: Box::new(ast.root.clone()),
    };

    w.emit1(Op::Lazybranch, 0, 0);
    w.emit_fragment(&root)?;
    let stop = w.cur_pos();
    w.patch_jump(0, stop);
    w.emit(Op::Stop, 0);

    let rtl = ast.options.contains(RegexOptions::RIGHT_TO_LEFT);
    let anchors = leading_anchors(&ast.root);
    let min_match_len = min_len(&ast.root);
    let bm_prefix = if rtl { None } else { prefix::literal_prefix(&ast.root) };
    let fc_prefix = if bm_prefix.is_some() {
        None
    } else {
        prefix::first_chars(&ast.root)
    };

    Ok(Code {
        ops: w.ops,
        strings: w.strings,
        sets: w.sets,
        caps,
        cap_size,
        caps_list: ast.caps_list.clone(),
        cap_names: ast.cap_names.clone(),
        rtl,
        anchors,
        min_match_len,
        bm_prefix,
        fc_prefix,
    })
}

struct Writer {
    ops: Vec<i32>,
    strings: Vec<Vec<char>>,
    string_idx: HashMap<Vec<char>, usize>,
    sets: Vec<CharSet>,
    int_stack: Vec<usize>,
    caps: Option<HashMap<usize, usize>>,
}

/// One step of the iterative emission walk. A container node is expanded
/// into Before/After hooks around each child, mirroring the original
/// writer's BeforeChild/AfterChild dispatch.
enum Item<'a> {
    Emit(&'a Node),
    Before(&'a Node, usize),
    After(&'a Node, usize),
}

impl Writer {
    fn cur_pos(&self) -> usize {
        self.ops.len()
    }

    fn emit(&mut self, op: Op, flags: i32) {
        self.ops.push(op as i32 | flags);
    }

    fn emit1(&mut self, op: Op, flags: i32, operand: i32) {
        self.ops.push(op as i32 | flags);
        self.ops.push(operand);
    }

    fn emit2(&mut self, op: Op, flags: i32, op0: i32, op1: i32) {
        self.ops.push(op as i32 | flags);
        self.ops.push(op0);
        self.ops.push(op1);
    }

    fn patch_jump(&mut self, pos: usize, target: usize) {
        self.ops[pos + 1] = target as i32;
    }

    fn push_int(&mut self, v: usize) {
        self.int_stack.push(v);
    }

    fn pop_int(&mut self) -> usize {
        // the walk pushes before it pops; an underflow is a writer bug
        self.int_stack.pop().expect("writer patch stack underflow")
    }

    fn string_code(&mut self, chars: &[char]) -> i32 {
        if let Some(&i) = self.string_idx.get(chars) {
            return i as i32;
        }
        let i = self.strings.len();
        self.strings.push(chars.to_vec());
        self.string_idx.insert(chars.to_vec(), i);
        i as i32
    }

    fn set_code(&mut self, set: &CharSet) -> i32 {
        let i = self.sets.len();
        self.sets.push(set.clone());
        i as i32
    }

    fn map_capnum(&self, capnum: isize) -> i32 {
        if capnum < 0 {
            return -1;
        }
        match self.caps {
            None => capnum as i32,
            Some(ref caps) => caps[&(capnum as usize)] as i32,
        }
    }

    fn emit_fragment(&mut self, root: &Node) -> Result<(), Error> {
        let mut work = vec![Item::Emit(root)];
        while let Some(item) = work.pop() {
            match item {
                Item::Emit(node) => {
                    if let Some(children) = container_children(node) {
                        self.before_node(node);
                        for (i, child) in children.into_iter().enumerate().rev()
                        {
                            work.push(Item::After(node, i));
                            work.push(Item::Emit(child));
                            work.push(Item::Before(node, i));
                        }
                    } else {
                        self.emit_leaf(node)?;
                    }
                }
                Item::Before(node, i) => self.before_child(node, i),
                Item::After(node, i) => self.after_node(node, i)?,
            }
        }
        Ok(())
    }

    /// Emitted once, before any child of a container.
    fn before_node(&mut self, node: &Node) {
        match *node {
            Node::Capture { .. } => self.emit(Op::Setmark, 0),
            Node::Atomic { .. } => self.emit(Op::Setjump, 0),
            Node::Require { .. } => {
                self.emit(Op::Setjump, 0);
                self.emit(Op::Setmark, 0);
            }
            Node::Prevent { .. } => {
                self.emit(Op::Setjump, 0);
                let pos = self.cur_pos();
                self.push_int(pos);
                self.emit1(Op::Lazybranch, 0, 0);
            }
            Node::Loop { min, max, .. } => {
                let counted = max != UNBOUNDED || min > 1;
                if counted {
                    let op = if min == 0 { Op::Nullcount } else { Op::Setcount };
                    let operand =
                        if min == 0 { 0 } else { 1i64 - min as i64 };
                    self.emit1(op, 0, operand as i32);
                } else if min == 0 {
                    self.emit(Op::Nullmark, 0);
                } else {
                    self.emit(Op::Setmark, 0);
                }
                if min == 0 {
                    let pos = self.cur_pos();
                    self.push_int(pos);
                    self.emit1(Op::Goto, 0, 0);
                }
                let pos = self.cur_pos();
                self.push_int(pos);
            }
            _ => {}
        }
    }

    /// Emitted between children, before child `i`.
    fn before_child(&mut self, node: &Node, i: usize) {
        match *node {
            Node::Alternate { ref children } => {
                if i < children.len() - 1 {
                    let pos = self.cur_pos();
                    self.push_int(pos);
                    self.emit1(Op::Lazybranch, 0, 0);
                }
            }
            Node::TestRef { capnum, .. } => {
                if i == 0 {
                    self.emit(Op::Setjump, 0);
                    let pos = self.cur_pos();
                    self.push_int(pos);
                    self.emit1(Op::Lazybranch, 0, 0);
                    let slot = self.map_capnum(capnum as isize);
                    self.emit1(Op::Testref, 0, slot);
                    self.emit(Op::Forejump, 0);
                }
            }
            _ => {}
        }
    }

    /// Emitted after child `i` of a container.
    fn after_node(&mut self, node: &Node, i: usize) -> Result<(), Error> {
        match *node {
            Node::Capture { capnum, uncapnum, .. } => {
                let cap = self.map_capnum(capnum);
                let uncap = self.map_capnum(uncapnum);
                self.emit2(Op::Capturemark, 0, cap, uncap);
            }
            Node::Atomic { .. } => self.emit(Op::Forejump, 0),
            Node::Require { .. } => {
                self.emit(Op::Getmark, 0);
                self.emit(Op::Forejump, 0);
            }
            Node::Prevent { .. } => {
                self.emit(Op::Backjump, 0);
                let lb = self.pop_int();
                let here = self.cur_pos();
                self.patch_jump(lb, here);
                self.emit(Op::Forejump, 0);
            }
            Node::Loop { min, max, lazy, .. } => {
                let start_jump = self.cur_pos();
                let counted = max != UNBOUNDED || min > 1;
                let target = self.pop_int();
                if counted {
                    let op = if lazy {
                        Op::Lazybranchcount
                    } else {
                        Op::Branchcount
                    };
                    let extra = if max == UNBOUNDED {
                        i32::MAX
                    } else {
                        (max - min) as i32
                    };
                    self.emit2(op, 0, target as i32, extra);
                } else {
                    let op =
                        if lazy { Op::Lazybranchmark } else { Op::Branchmark };
                    self.emit1(op, 0, target as i32);
                }
                if min == 0 {
                    let goto = self.pop_int();
                    self.patch_jump(goto, start_jump);
                }
            }
            Node::Alternate { ref children } => {
                if i < children.len() - 1 {
                    let lb = self.pop_int();
                    let pos = self.cur_pos();
                    self.push_int(pos);
                    self.emit1(Op::Goto, 0, 0);
                    let here = self.cur_pos();
                    self.patch_jump(lb, here);
                } else {
                    for _ in 0..i {
                        let goto = self.pop_int();
                        let here = self.cur_pos();
                        self.patch_jump(goto, here);
                    }
                }
            }
            Node::TestRef { .. } => {
                if i == 0 {
                    let branch = self.pop_int();
                    let pos = self.cur_pos();
                    self.push_int(pos);
                    self.emit1(Op::Goto, 0, 0);
                    let here = self.cur_pos();
                    self.patch_jump(branch, here);
                    self.emit(Op::Forejump, 0);
                } else {
                    let goto = self.pop_int();
                    let here = self.cur_pos();
                    self.patch_jump(goto, here);
                }
            }
            Node::Concat { .. } => {}
            _ => {}
        }
        Ok(())
    }

    fn emit_leaf(&mut self, node: &Node) -> Result<(), Error> {
        match *node {
            Node::Empty => {}
            Node::Nothing => self.emit(Op::Nothing, 0),
            Node::One { ch, flags } => {
                self.emit1(Op::One, bits(flags), ch as i32)
            }
            Node::Notone { ch, flags } => {
                self.emit1(Op::Notone, bits(flags), ch as i32)
            }
            Node::Set { ref set, flags } => {
                let idx = self.set_code(set);
                self.emit1(Op::Set, bits(flags), idx);
            }
            Node::Multi { ref chars, flags } => {
                let idx = self.string_code(chars);
                self.emit1(Op::Multi, bits(flags), idx);
            }
            Node::Ref { capnum, flags } => {
                let slot = self.map_capnum(capnum as isize);
                self.emit1(Op::Ref, bits(flags), slot);
            }
            Node::OneLoop { ch, min, max, lazy, flags } => {
                self.emit_scalar_loop(
                    Op::Onerep,
                    ch as i32,
                    min,
                    max,
                    lazy,
                    flags,
                );
            }
            Node::NotoneLoop { ch, min, max, lazy, flags } => {
                self.emit_scalar_loop(
                    Op::Notonerep,
                    ch as i32,
                    min,
                    max,
                    lazy,
                    flags,
                );
            }
            Node::SetLoop { ref set, min, max, lazy, flags } => {
                let idx = self.set_code(set);
                self.emit_scalar_loop(Op::Setrep, idx, min, max, lazy, flags);
            }
            Node::Bol => self.emit(Op::Bol, 0),
            Node::Eol => self.emit(Op::Eol, 0),
            Node::Boundary => self.emit(Op::Boundary, 0),
            Node::NonBoundary => self.emit(Op::Nonboundary, 0),
            Node::EcmaBoundary => self.emit(Op::EcmaBoundary, 0),
            Node::NonEcmaBoundary => self.emit(Op::NonEcmaBoundary, 0),
            Node::Beginning => self.emit(Op::Beginning, 0),
            Node::Start => self.emit(Op::Start, 0),
            Node::EndZ => self.emit(Op::EndZ, 0),
            Node::End => self.emit(Op::End, 0),
            _ => unreachable!("container node reached emit_leaf"),
        }
        Ok(())
    }

    /// A quantified single-scalar predicate: the mandatory floor becomes a
    /// rep instruction, the variable tail a loop or lazy instruction.
    fn emit_scalar_loop(
        &mut self,
        rep_op: Op,
        operand: i32,
        min: usize,
        max: usize,
        lazy: bool,
        flags: NodeFlags,
    ) {
        let flags = bits(flags);
        if min > 0 {
            self.emit2(rep_op, flags, operand, min as i32);
        }
        if max == UNBOUNDED || max > min {
            let delta = if max == UNBOUNDED {
                i32::MAX
            } else {
                (max - min) as i32
            };
            let loop_op = match (rep_op, lazy) {
                (Op::Onerep, false) => Op::Oneloop,
                (Op::Onerep, true) => Op::Onelazy,
                (Op::Notonerep, false) => Op::Notoneloop,
                (Op::Notonerep, true) => Op::Notonelazy,
                (Op::Setrep, false) => Op::Setloop,
                (Op::Setrep, true) => Op::Setlazy,
                _ => unreachable!(),
            };
            self.emit2(loop_op, flags, operand, delta);
        }
    }
}

fn bits(flags: NodeFlags) -> i32 {
    (if flags.ci { CI } else { 0 }) | (if flags.rtl { RTL } else { 0 })
}

/// Children of a container node, or `None` for a leaf.
fn container_children(node: &Node) -> Option<Vec<&Node>> {
    match *node {
        Node::Concat { ref children } | Node::Alternate { ref children } => {
            Some(children.iter().collect())
        }
        Node::Capture { ref child, .. }
        | Node::Atomic { ref child }
        | Node::Require { ref child }
        | Node::Prevent { ref child }
        | Node::Loop { ref child, .. } => Some(vec![child.as_ref()]),
        Node::TestRef { ref yes, ref no, .. } => {
            Some(vec![yes.as_ref(), no.as_ref()])
        }
        _ => None,
    }
}

/// Accumulate the anchors every match must satisfy at its first position.
/// Conservative: descending into a group abandons the walk of the outer
/// concatenation, which can only miss anchors, never invent them.
fn leading_anchors(root: &Node) -> Anchors {
    let mut anchors = Anchors::empty();
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
            Node::Bol => anchors |= Anchors::BOL,
            Node::Eol => anchors |= Anchors::EOL,
            Node::Beginning => anchors |= Anchors::BEGINNING,
            Node::Start => anchors |= Anchors::START,
            Node::EndZ => anchors |= Anchors::END_Z,
            Node::End => anchors |= Anchors::END,
            Node::Boundary | Node::NonBoundary | Node::EcmaBoundary
            | Node::NonEcmaBoundary => anchors |= Anchors::BOUNDARY,
            Node::Empty | Node::Require { .. } | Node::Prevent { .. } => {}
            _ => return anchors,
        }
        if next >= pending.len() {
            return anchors;
        }
        cur = &pending[next];
        next += 1;
    }
}

/// Lower bound on scalars consumed by any match of `node`.
fn min_len(node: &Node) -> usize {
    match *node {
        Node::One { .. } | Node::Notone { .. } | Node::Set { .. } => 1,
        Node::Multi { ref chars, .. } => chars.len(),
        Node::OneLoop { min, .. }
        | Node::NotoneLoop { min, .. }
        | Node::SetLoop { min, .. } => min,
        Node::Loop { min, ref child, .. } => {
            if min == 0 {
                0
            } else {
                min_len(child).saturating_mul(min)
            }
        }
        Node::Concat { ref children } => children
            .iter()
            .fold(0usize, |acc, c| acc.saturating_add(min_len(c))),
        Node::Alternate { ref children } => {
            children.iter().map(min_len).min().unwrap_or(0)
        }
        Node::Capture { ref child, .. } | Node::Atomic { ref child } => {
            min_len(child)
        }
        Node::TestRef { ref yes, ref no, .. } => {
            min_len(yes).min(min_len(no))
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    fn compile(pat: &str) -> Code {
        let ast = parse::parse(pat, RegexOptions::empty()).unwrap();
        write(&ast).unwrap()
    }

    #[test]
    fn program_frame() {
        let code = compile("a");
        // Lazybranch 2ops, Setmark, One 2ops, Capturemark 3ops, Stop
        let (op, _) = code.op_at(0);
        assert_eq!(op, Op::Lazybranch);
        let stop = code.ops[1] as usize;
        let (op, _) = code.op_at(stop);
        assert_eq!(op, Op::Stop);
        assert_eq!(code.cap_size, 1);
    }

    #[test]
    fn bounded_repeat_splits_into_rep_and_loop() {
        let code = compile("a{2,5}");
        let (op, _) = code.op_at(3);
        assert_eq!(op, Op::Onerep);
        assert_eq!(code.ops[4], 'a' as i32);
        assert_eq!(code.ops[5], 2);
        let (op, _) = code.op_at(6);
        assert_eq!(op, Op::Oneloop);
        assert_eq!(code.ops[8], 3);
    }

    #[test]
    fn min_match_len_is_computed() {
        assert_eq!(compile("abc").min_match_len, 3);
        assert_eq!(compile("a{2,5}b?").min_match_len, 2);
        assert_eq!(compile("(ab|c)").min_match_len, 1);
        assert_eq!(compile("a*").min_match_len, 0);
        assert_eq!(compile(r"(ab){3}").min_match_len, 6);
    }

    #[test]
    fn leading_anchor_detection() {
        assert!(compile("^foo").anchors.contains(Anchors::BEGINNING));
        assert!(compile(r"\Gx").anchors.contains(Anchors::START));
        assert!(compile("foo").anchors.is_empty());
        assert!(compile("(^a)b").anchors.contains(Anchors::BEGINNING));
    }

    #[test]
    fn alternation_layout_prefers_left_branch() {
        let code = compile("ab|cd");
        // first instruction after the prologue Setmark is the Lazybranch
        // guarding the left arm
        let (op, _) = code.op_at(3);
        assert_eq!(op, Op::Lazybranch);
    }
}
