//! # Program Builder
//!
//! Encodes instructions into the byte layout described in [`crate::format`].
//! The builder does not consult a dispatch table; the caller picks the method
//! matching the opcode's length class.

use crate::format::{LengthClass, OperandWidth};
use crate::instruction::Instruction;
use thiserror::Error;

/// Error returned when an instruction cannot be encoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Operand value does not fit the operand width.
    #[error("value 0x{value:X} does not fit a {width:?} operand")]
    ValueTooWide {
        /// Rejected value
        value: u32,
        /// Width of the program image
        width: OperandWidth,
    },

    /// The length class does not exist at this operand width.
    #[error("{0:?} instructions need extended operand width")]
    NeedsExtended(LengthClass),
}

/// Incremental macro program encoder.
///
/// # Examples
///
/// ```
/// use macro_vm::{OperandWidth, ProgramBuilder};
///
/// let mut builder = ProgramBuilder::new(OperandWidth::Compact);
/// builder.no_operand(0x02);
/// builder.narrow(0x03, 0x04);
/// builder.single(0x0C, 0x00, 500).unwrap();
///
/// assert_eq!(builder.build(), vec![0x02, 0x03, 0x04, 0x0C, 0x00, 0xF4, 0x01]);
/// ```
#[derive(Debug, Clone)]
pub struct ProgramBuilder {
    width: OperandWidth,
    bytes: Vec<u8>,
}

impl ProgramBuilder {
    /// Creates an empty program for the given operand width.
    pub fn new(width: OperandWidth) -> Self {
        Self {
            width,
            bytes: Vec::new(),
        }
    }

    /// Appends an opcode-only instruction.
    pub fn no_operand(&mut self, opcode: u8) -> &mut Self {
        self.bytes.push(opcode);
        self
    }

    /// Appends an instruction with one raw operand byte.
    pub fn narrow(&mut self, opcode: u8, imm: u8) -> &mut Self {
        self.bytes.extend_from_slice(&[opcode, imm]);
        self
    }

    /// Appends an instruction with one type/value pair.
    pub fn single(&mut self, opcode: u8, dst_type: u8, dst: u32) -> Result<&mut Self, EncodeError> {
        self.check(dst)?;
        self.bytes.extend_from_slice(&[opcode, dst_type]);
        self.push_value(dst);
        Ok(self)
    }

    /// Appends an instruction with two type/value pairs.
    ///
    /// Compact images get the trailing reserved byte (zero).
    pub fn dual(
        &mut self,
        opcode: u8,
        (dst_type, dst): (u8, u32),
        (src_type, src): (u8, u32),
    ) -> Result<&mut Self, EncodeError> {
        self.check(dst)?;
        self.check(src)?;
        self.bytes.extend_from_slice(&[opcode, dst_type]);
        self.push_value(dst);
        self.bytes.push(src_type);
        self.push_value(src);
        if self.width == OperandWidth::Compact {
            self.bytes.push(0);
        }
        Ok(self)
    }

    /// Appends an instruction with two type/value pairs and an extension pair.
    ///
    /// Only available in extended images.
    pub fn dual_ext(
        &mut self,
        opcode: u8,
        dst: (u8, u32),
        src: (u8, u32),
        (ext_type, ext): (u8, u32),
    ) -> Result<&mut Self, EncodeError> {
        if self.width != OperandWidth::Extended {
            return Err(EncodeError::NeedsExtended(LengthClass::DualExt));
        }
        self.dual(opcode, dst, src)?;
        self.bytes.push(ext_type);
        self.push_value(ext);
        Ok(self)
    }

    /// Appends a full fixed-length record holding every field of `instr`.
    ///
    /// The extension pair is dropped in compact images, where the record has
    /// no room for it.
    pub fn fixed(&mut self, instr: &Instruction) -> Result<&mut Self, EncodeError> {
        let dst = (instr.dst_type, instr.dst);
        let src = (instr.src_type, instr.src);
        match self.width {
            OperandWidth::Compact => self.dual(instr.opcode, dst, src),
            OperandWidth::Extended => {
                self.dual_ext(instr.opcode, dst, src, (instr.ext_type, instr.ext))
            }
        }
    }

    /// Appends raw bytes, e.g. data or a deliberately malformed tail.
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    /// Current length in bytes, i.e. the offset of the next instruction.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if nothing was appended.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Returns the encoded program.
    pub fn build(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    fn check(&self, value: u32) -> Result<(), EncodeError> {
        if value > self.width.max_value() {
            return Err(EncodeError::ValueTooWide {
                value,
                width: self.width,
            });
        }
        Ok(())
    }

    fn push_value(&mut self, value: u32) {
        let size = self.width.value_size();
        self.bytes.extend_from_slice(&value.to_le_bytes()[..size]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_dual_has_reserved_byte() {
        let mut builder = ProgramBuilder::new(OperandWidth::Compact);
        builder.dual(0x0D, (0x01, 0x0002), (0x00, 0xFF00)).unwrap();
        assert_eq!(
            builder.build(),
            vec![0x0D, 0x01, 0x02, 0x00, 0x00, 0x00, 0xFF, 0x00]
        );
    }

    #[test]
    fn test_extended_lengths_match_format() {
        let mut builder = ProgramBuilder::new(OperandWidth::Extended);
        builder.single(0x01, 0, 0xDEAD_BEEF).unwrap();
        assert_eq!(builder.len(), 6);
        builder.dual(0x02, (0, 1), (0, 2)).unwrap();
        assert_eq!(builder.len(), 17);
        builder.dual_ext(0x03, (0, 1), (0, 2), (0, 3)).unwrap();
        assert_eq!(builder.len(), 33);
    }

    #[test]
    fn test_rejects_wide_value_in_compact_image() {
        let mut builder = ProgramBuilder::new(OperandWidth::Compact);
        assert_eq!(
            builder.single(0x0C, 0, 0x1_0000).unwrap_err(),
            EncodeError::ValueTooWide {
                value: 0x1_0000,
                width: OperandWidth::Compact
            }
        );
        assert!(builder.is_empty());
    }

    #[test]
    fn test_rejects_extension_in_compact_image() {
        let mut builder = ProgramBuilder::new(OperandWidth::Compact);
        assert_eq!(
            builder.dual_ext(0x01, (0, 0), (0, 0), (0, 0)).unwrap_err(),
            EncodeError::NeedsExtended(LengthClass::DualExt)
        );
    }

    #[test]
    fn test_fixed_record_sizes() {
        let instr = Instruction {
            opcode: 0x06,
            dst_type: 1,
            dst: 2,
            ..Instruction::default()
        };
        let mut compact = ProgramBuilder::new(OperandWidth::Compact);
        compact.fixed(&instr).unwrap();
        assert_eq!(compact.len(), OperandWidth::Compact.fixed_length());

        let mut extended = ProgramBuilder::new(OperandWidth::Extended);
        extended.fixed(&instr).unwrap();
        assert_eq!(extended.len(), OperandWidth::Extended.fixed_length());
    }
}
