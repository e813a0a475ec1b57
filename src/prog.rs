use std::collections::HashMap;
use std::fmt;

use bitflags::bitflags;

use crate::charclass::CharSet;
use crate::prefix::{BoyerMoore, FirstSet};

/// CodePtr is the index of an instruction cell in a compiled program.
pub type CodePtr = usize;

/// Low six bits of an instruction cell select the opcode.
pub const MASK: i32 = 63;
/// The instruction consumes input leftward (right-to-left matching).
pub const RTL: i32 = 64;
/// Fold the input scalar before comparing.
pub const CI: i32 = 512;

/// Backtrack re-entry bits. These never appear in `Code::ops`; the VM ors
/// them onto the current cell when it resumes an instruction from a popped
/// frame (the frame's sign selects between the two levels).
pub const BACK: i32 = 128;
pub const BACK2: i32 = 256;

/// The opcode set. Numbering is part of the program encoding: an
/// instruction cell is `op | flags`, followed by `op.size() - 1` operand
/// cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(i32)]
pub enum Op {
    /// Match the operand scalar exactly `count` times.
    Onerep = 0,
    Notonerep = 1,
    Setrep = 2,
    /// Greedily match the operand predicate up to `count` times, giving
    /// back one unit per backtrack.
    Oneloop = 3,
    Notoneloop = 4,
    Setloop = 5,
    /// Lazily match the operand predicate: none up front, one more unit
    /// per backtrack, up to `count`.
    Onelazy = 6,
    Notonelazy = 7,
    Setlazy = 8,
    /// Match one scalar against a literal, its complement, or a set.
    One = 9,
    Notone = 10,
    Set = 11,
    /// Match a literal string from the string table.
    Multi = 12,
    /// Match the current text of a capture group.
    Ref = 13,
    Bol = 14,
    Eol = 15,
    Boundary = 16,
    Nonboundary = 17,
    Beginning = 18,
    Start = 19,
    EndZ = 20,
    End = 21,
    /// Unconditional failure.
    Nothing = 22,
    /// Push a frame for the alternate target, then fall through.
    Lazybranch = 23,
    /// Greedy loop body re-entry with a grouping mark.
    Branchmark = 24,
    Lazybranchmark = 25,
    /// Counted-loop machinery for `{n,m}`.
    Nullcount = 26,
    Setcount = 27,
    Branchcount = 28,
    Lazybranchcount = 29,
    /// Grouping-stack marks.
    Nullmark = 30,
    Setmark = 31,
    /// Close a capture group: operands (slot, balancing slot | -1).
    Capturemark = 32,
    Getmark = 33,
    /// Atomic-group / lookaround cut machinery.
    Setjump = 34,
    Backjump = 35,
    Forejump = 36,
    /// Conditional test: fail unless the operand group has matched.
    Testref = 37,
    Goto = 38,
    /// Accept.
    Stop = 39,
    EcmaBoundary = 40,
    NonEcmaBoundary = 41,
}

impl Op {
    /// Decode the opcode of an instruction cell.
    pub fn from_cell(cell: i32) -> Op {
        use self::Op::*;
        match cell & MASK {
            0 => Onerep,
            1 => Notonerep,
            2 => Setrep,
            3 => Oneloop,
            4 => Notoneloop,
            5 => Setloop,
            6 => Onelazy,
            7 => Notonelazy,
            8 => Setlazy,
            9 => One,
            10 => Notone,
            11 => Set,
            12 => Multi,
            13 => Ref,
            14 => Bol,
            15 => Eol,
            16 => Boundary,
            17 => Nonboundary,
            18 => Beginning,
            19 => Start,
            20 => EndZ,
            21 => End,
            22 => Nothing,
            23 => Lazybranch,
            24 => Branchmark,
            25 => Lazybranchmark,
            26 => Nullcount,
            27 => Setcount,
            28 => Branchcount,
            29 => Lazybranchcount,
            30 => Nullmark,
            31 => Setmark,
            32 => Capturemark,
            33 => Getmark,
            34 => Setjump,
            35 => Backjump,
            36 => Forejump,
            37 => Testref,
            38 => Goto,
            39 => Stop,
            40 => EcmaBoundary,
            _ => NonEcmaBoundary,
        }
    }

    /// Total width of the instruction in cells, opcode included.
    pub fn size(self) -> usize {
        use self::Op::*;
        match self {
            Onerep | Notonerep | Setrep | Oneloop | Notoneloop | Setloop
            | Onelazy | Notonelazy | Setlazy | Branchcount
            | Lazybranchcount | Capturemark => 3,
            One | Notone | Set | Multi | Ref | Lazybranch | Branchmark
            | Lazybranchmark | Nullcount | Setcount | Testref | Goto => 2,
            Bol | Eol | Boundary | Nonboundary | Beginning | Start | EndZ
            | End | Nothing | Nullmark | Setmark | Getmark | Setjump
            | Backjump | Forejump | Stop | EcmaBoundary
            | NonEcmaBoundary => 1,
        }
    }
}

bitflags! {
    /// Leading-anchor facts about a program, used to reject or relocate
    /// candidate start positions without running the VM.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Anchors: u32 {
        const BEGINNING = 1 << 0;
        const BOL = 1 << 1;
        const START = 1 << 2;
        const EOL = 1 << 3;
        const END_Z = 1 << 4;
        const END = 1 << 5;
        const BOUNDARY = 1 << 6;
    }
}

/// A compiled program: the flat opcode stream plus its literal/set tables,
/// capture metadata and precomputed scan accelerators. Immutable after
/// construction and freely shareable across threads.
#[derive(Clone)]
pub struct Code {
    /// Instruction cells: `opcode | flags` followed by operands.
    pub ops: Vec<i32>,
    /// Literal strings referenced by `Multi`.
    pub strings: Vec<Vec<char>>,
    /// Character classes referenced by the `Set` family.
    pub sets: Vec<CharSet>,
    /// Sparse user capture number -> slot map; `None` means dense
    /// numbering where slot == number.
    pub caps: Option<HashMap<usize, usize>>,
    /// Number of capture slots, including slot 0 (the whole match).
    pub cap_size: usize,
    /// Per-slot group names, present when any group is named. Unnamed
    /// slots carry their number as a decimal string.
    pub caps_list: Option<Vec<String>>,
    /// Group name -> user capture number.
    pub cap_names: Option<HashMap<String, usize>>,
    /// Matching proceeds right-to-left.
    pub rtl: bool,
    /// Leading anchors.
    pub anchors: Anchors,
    /// Lower bound on scalars consumed by any successful match.
    pub min_match_len: usize,
    /// Required literal prefix, if the pattern has one.
    pub bm_prefix: Option<BoyerMoore>,
    /// Set of scalars a match can start with, if computable.
    pub fc_prefix: Option<FirstSet>,
}

impl Code {
    /// Decode the instruction cell at `pc` into its opcode and flag bits.
    #[inline]
    pub fn op_at(&self, pc: CodePtr) -> (Op, i32) {
        let cell = self.ops[pc];
        (Op::from_cell(cell), cell & !MASK)
    }

    /// Translate a user capture number to its slot index.
    pub fn slot_of(&self, capnum: usize) -> Option<usize> {
        match self.caps {
            None => {
                if capnum < self.cap_size {
                    Some(capnum)
                } else {
                    None
                }
            }
            Some(ref caps) => caps.get(&capnum).copied(),
        }
    }

    /// The user capture numbers of this program, in slot order.
    pub fn group_numbers(&self) -> Vec<usize> {
        match self.caps {
            None => (0..self.cap_size).collect(),
            Some(ref caps) => {
                let mut result = vec![0; caps.len()];
                for (&num, &slot) in caps {
                    result[slot] = num;
                }
                result
            }
        }
    }

    /// The name of a capture group given its user number. Unnamed groups
    /// answer with their number in decimal; unknown numbers answer with
    /// the empty string.
    pub fn group_name(&self, num: usize) -> String {
        let caps_list = match self.caps_list {
            None => {
                return if self.slot_of(num).is_some() {
                    num.to_string()
                } else {
                    String::new()
                };
            }
            Some(ref list) => list,
        };
        match self.slot_of(num) {
            Some(slot) if slot < caps_list.len() => caps_list[slot].clone(),
            _ => String::new(),
        }
    }

    /// The user capture number of a named group. All-digit names resolve
    /// as plain numbers.
    pub fn group_number(&self, name: &str) -> Option<usize> {
        if let Some(ref names) = self.cap_names {
            return names.get(name).copied();
        }
        let num: usize = name.parse().ok()?;
        self.slot_of(num).map(|_| num)
    }

    /// Return the approximate heap usage of this program in bytes.
    pub fn approximate_size(&self) -> usize {
        self.ops.len() * std::mem::size_of::<i32>()
            + self.strings.iter().map(|s| s.len() * 4).sum::<usize>()
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "--------------------------------")?;
        let mut pc = 0;
        while pc < self.ops.len() {
            let (op, flags) = self.op_at(pc);
            let width = op.size();
            let mut line = format!("{:04} {:?}", pc, op);
            if flags & CI != 0 {
                line.push_str("-Ci");
            }
            if flags & RTL != 0 {
                line.push_str("-Rtl");
            }
            for operand in &self.ops[pc + 1..pc + width] {
                line.push_str(&format!(" {}", operand));
            }
            match op {
                Op::One | Op::Notone | Op::Onerep | Op::Notonerep
                | Op::Oneloop | Op::Notoneloop | Op::Onelazy
                | Op::Notonelazy => {
                    if let Some(c) = char::from_u32(self.ops[pc + 1] as u32) {
                        line.push_str(&format!(" ({:?})", c));
                    }
                }
                Op::Multi => {
                    let s: String =
                        self.strings[self.ops[pc + 1] as usize].iter().collect();
                    line.push_str(&format!(" ({:?})", s));
                }
                Op::Set | Op::Setrep | Op::Setloop | Op::Setlazy => {
                    let set = &self.sets[self.ops[pc + 1] as usize];
                    line.push_str(&format!(" ({})", set));
                }
                _ => {}
            }
            writeln!(f, "{}", line)?;
            pc += width;
        }
        writeln!(f, "--------------------------------")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_roundtrip() {
        for raw in 0..=41 {
            let op = Op::from_cell(raw | CI | RTL);
            assert_eq!(op as i32, raw);
            assert!(op.size() >= 1 && op.size() <= 3);
        }
    }
}
