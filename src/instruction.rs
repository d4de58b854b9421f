//! Decoded instruction record.

use crate::dispatch::{fold_index, OpcodeSpace};
use crate::format::{LengthClass, LengthMode};

/// In-memory form of one decoded instruction.
///
/// Fields outside the instruction's length class are always zero. A zeroed
/// record (`Instruction::default()`) is also what error reports carry when a
/// failure happens before an instruction could be decoded.
///
/// # Examples
///
/// ```
/// use macro_vm::{decoder, Instruction, OperandWidth};
///
/// // sleep #01:$03E8 (compact, single wide operand)
/// let instr = decoder::parse(&[0x0C, 0x01, 0xE8, 0x03], 4, OperandWidth::Compact);
/// assert_eq!(instr.opcode, 0x0C);
/// assert_eq!(instr.dst_type, 0x01);
/// assert_eq!(instr.dst, 1000);
/// assert_eq!(instr.src, 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Instruction {
    /// Raw opcode byte (low 8 bits of the dispatch index).
    pub opcode: u8,

    /// Destination operand type byte, or the immediate of a narrow instruction.
    pub dst_type: u8,

    /// Destination operand value.
    pub dst: u32,

    /// Source operand type byte.
    pub src_type: u8,

    /// Source operand value.
    pub src: u32,

    /// Extension operand type byte (extended width only).
    pub ext_type: u8,

    /// Extension operand value (extended width only).
    pub ext: u32,
}

impl Instruction {
    /// The 8-bit immediate of a narrow instruction.
    pub fn imm8(&self) -> u8 {
        self.dst_type
    }

    /// The three operand type bytes in fold order (dst, src, ext).
    pub fn type_bytes(&self) -> [u8; 3] {
        [self.dst_type, self.src_type, self.ext_type]
    }

    /// Dispatch-table index of this instruction.
    ///
    /// `class` is the length class of the opcode's family. Only the type
    /// bytes the instruction holds in `mode` donate their high bit: in
    /// variable-length images that is the ones `class` carries (a narrow
    /// immediate never folds), in fixed-length records it is all of them.
    ///
    /// # Examples
    ///
    /// ```
    /// use macro_vm::{Instruction, LengthClass, LengthMode, OpcodeSpace};
    ///
    /// let instr = Instruction {
    ///     opcode: 0x02,
    ///     dst_type: 0x80,
    ///     ..Instruction::default()
    /// };
    ///
    /// let space = OpcodeSpace::Ext512;
    /// assert_eq!(instr.index(space, LengthClass::Narrow, LengthMode::Variable), 0x002);
    /// assert_eq!(instr.index(space, LengthClass::Single, LengthMode::Variable), 0x102);
    /// assert_eq!(instr.index(space, LengthClass::Narrow, LengthMode::Fixed), 0x102);
    /// ```
    pub fn index(&self, space: OpcodeSpace, class: LengthClass, mode: LengthMode) -> u16 {
        let count = mode.folded_type_bytes(class);
        let mut carried = [0u8; 3];
        carried[..count].copy_from_slice(&self.type_bytes()[..count]);
        fold_index(self.opcode, carried, space)
    }
}
