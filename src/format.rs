//! # Instruction Format
//!
//! This module defines the binary layout of a macro instruction: the five
//! length classes an opcode can belong to, the two operand widths a program
//! image can be encoded with, and the byte offsets of every field.
//!
//! The format is not self-describing. An instruction's length is chosen by
//! the dispatch table entry for its opcode, and the operand width is fixed for
//! the whole program image by [`VmConfig`].
//!
//! ## Byte Layout
//!
//! All multi-byte values are little-endian.
//!
//! ```text
//! compact:   op | dst_type | dst[2] | src_type | src[2] | reserved
//!            0    1          2..4     4          5..7     7
//! extended:  op | dst_type | dst[4] | src_type | src[4] | ext_type | ext[4]
//!            0    1          2..6     6          7..11    11         12..16
//! ```

use crate::dispatch::OpcodeSpace;
use thiserror::Error;

/// Operand length class of an opcode.
///
/// The class is a property of the opcode (via its dispatch table entry), not
/// of the bytes in the program.
///
/// # Sizes
///
/// | Class       | Compact | Extended |
/// |-------------|---------|----------|
/// | `NoOperand` | 1       | 1        |
/// | `Narrow`    | 2       | 2        |
/// | `Single`    | 4       | 6        |
/// | `Dual`      | 8       | 11       |
/// | `DualExt`   | -       | 16       |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LengthClass {
    /// Opcode byte only.
    ///
    /// Examples: nop, clr, hidp
    NoOperand,

    /// Opcode plus one raw byte, read by the handler as an 8-bit immediate.
    ///
    /// Examples: jmp, prt
    Narrow,

    /// Opcode, one type byte and one wide value.
    ///
    /// Examples: sleep, out, rgb
    Single,

    /// Opcode and two type/value pairs. Compact images pad this class with one
    /// reserved byte.
    ///
    /// Examples: led, fade
    Dual,

    /// Two type/value pairs plus a third "extension" pair. Extended width only.
    DualExt,
}

impl LengthClass {
    /// Number of operand-type bytes carried by this class.
    ///
    /// Only these type bytes may donate their high bit to the opcode index.
    /// The narrow operand is an immediate, not a type byte.
    pub const fn type_bytes(self) -> usize {
        match self {
            LengthClass::NoOperand | LengthClass::Narrow => 0,
            LengthClass::Single => 1,
            LengthClass::Dual => 2,
            LengthClass::DualExt => 3,
        }
    }
}

/// Width of the wide operand values in a program image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperandWidth {
    /// 16-bit operand values.
    #[default]
    Compact,

    /// 32-bit operand values, with an optional extension operand pair.
    Extended,
}

impl OperandWidth {
    /// Size in bytes of one wide operand value.
    pub const fn value_size(self) -> usize {
        match self {
            OperandWidth::Compact => 2,
            OperandWidth::Extended => 4,
        }
    }

    /// Largest value a wide operand can hold.
    pub const fn max_value(self) -> u32 {
        match self {
            OperandWidth::Compact => u16::MAX as u32,
            OperandWidth::Extended => u32::MAX,
        }
    }

    /// Encoded length of an instruction of the given class, or `None` if the
    /// class does not exist at this width.
    pub const fn length_of(self, class: LengthClass) -> Option<usize> {
        match (self, class) {
            (_, LengthClass::NoOperand) => Some(1),
            (_, LengthClass::Narrow) => Some(2),
            (OperandWidth::Compact, LengthClass::Single) => Some(4),
            (OperandWidth::Compact, LengthClass::Dual) => Some(8),
            (OperandWidth::Compact, LengthClass::DualExt) => None,
            (OperandWidth::Extended, LengthClass::Single) => Some(6),
            (OperandWidth::Extended, LengthClass::Dual) => Some(11),
            (OperandWidth::Extended, LengthClass::DualExt) => Some(16),
        }
    }

    /// Size of a full instruction record, used by fixed-length images.
    pub const fn fixed_length(self) -> usize {
        match self {
            OperandWidth::Compact => 8,
            OperandWidth::Extended => 16,
        }
    }

    /// Byte offsets of the `dst_type`, `src_type` and `ext_type` fields.
    ///
    /// Compact images have no extension pair.
    pub const fn type_offsets(self) -> [Option<usize>; 3] {
        match self {
            OperandWidth::Compact => [Some(1), Some(4), None],
            OperandWidth::Extended => [Some(1), Some(6), Some(11)],
        }
    }
}

/// How instruction lengths are determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LengthMode {
    /// Each instruction is as long as its opcode's length class.
    #[default]
    Variable,

    /// Every instruction occupies a full record
    /// ([`OperandWidth::fixed_length`]) and all fields are decoded.
    Fixed,
}

impl LengthMode {
    /// Number of type bytes that may donate a high bit to the opcode index of
    /// an instruction of the given class.
    ///
    /// A fixed record holds every type byte whatever its class; a
    /// variable-length instruction only holds the ones its class carries.
    pub const fn folded_type_bytes(self, class: LengthClass) -> usize {
        match self {
            LengthMode::Variable => class.type_bytes(),
            LengthMode::Fixed => 3,
        }
    }
}

/// Interpreter configuration, chosen once at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VmConfig {
    /// Width of the wide operands.
    pub width: OperandWidth,

    /// Variable- or fixed-length instructions.
    pub length_mode: LengthMode,
}

impl VmConfig {
    /// Compact, variable-length configuration (the firmware default).
    pub const fn compact() -> Self {
        Self {
            width: OperandWidth::Compact,
            length_mode: LengthMode::Variable,
        }
    }

    /// Extended, variable-length configuration.
    pub const fn extended() -> Self {
        Self {
            width: OperandWidth::Extended,
            length_mode: LengthMode::Variable,
        }
    }

    /// Returns this configuration switched to fixed-length instructions.
    pub const fn fixed(self) -> Self {
        Self {
            width: self.width,
            length_mode: LengthMode::Fixed,
        }
    }
}

/// Error returned when a configuration cannot run a dispatch table.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The table registers a class that does not exist at compact width.
    #[error("{class:?} instructions need extended operand width")]
    ClassNeedsExtended {
        /// Offending length class
        class: LengthClass,
    },

    /// The opcode space folds the extension type byte, which compact images lack.
    #[error("the {space:?} opcode space needs extended operand width")]
    SpaceNeedsExtended {
        /// Offending opcode space
        space: OpcodeSpace,
    },

    /// In variable-length images the index needs a high bit from a type byte
    /// its class does not carry.
    #[error("index 0x{index:03X} cannot be reached by a variable-length {class:?} instruction")]
    UnreachableIndex {
        /// Offending index
        index: u16,
        /// Class of the index's family
        class: LengthClass,
    },
}
