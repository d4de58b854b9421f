//! # Dispatch Table
//!
//! This module maps opcode indices to their handler, mnemonic and length
//! class. It is the single source of truth used both to size an instruction
//! before it is parsed and to dispatch it afterwards.
//!
//! ## Opcode-Space Folding
//!
//! The base opcode is one byte. Larger opcode spaces borrow the high bit of
//! each operand-type byte:
//!
//! | Space     | Index bits | Extra bits from          |
//! |-----------|------------|--------------------------|
//! | `Base256` | 8          | -                        |
//! | `Ext512`  | 9          | dst_type                 |
//! | `Ext1024` | 10         | dst_type, src_type       |
//! | `Ext2048` | 11         | dst_type, src_type, ext  |
//!
//! All indices that share one base byte form a *family* and must share one
//! length class, so an instruction is sized from its base byte alone. A type
//! byte only donates its bit when the instruction holds it: a variable-length
//! instruction holds the type bytes of its class, a fixed record holds all
//! of them.

use crate::format::{ConfigError, LengthClass, LengthMode, OperandWidth, VmConfig};
use crate::instruction::Instruction;
use crate::vm::{Context, Signal};
use thiserror::Error;

/// Opcode handler.
///
/// Receives the decoded instruction and a [`Context`] through which it can
/// reach host state and request a jump or a stop.
pub type Handler<H> = fn(&mut Context<'_, H>, &Instruction) -> Signal;

/// Size of the opcode index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OpcodeSpace {
    /// 256 entries, no folding.
    #[default]
    Base256,

    /// 512 entries, bit 8 from `dst_type`.
    Ext512,

    /// 1024 entries, bit 9 from `src_type`.
    Ext1024,

    /// 2048 entries, bit 10 from `ext_type`.
    Ext2048,
}

impl OpcodeSpace {
    /// Number of indices in this space.
    pub const fn size(self) -> usize {
        256 << self.folded_bytes()
    }

    /// Number of type bytes that donate a high bit.
    pub const fn folded_bytes(self) -> usize {
        match self {
            OpcodeSpace::Base256 => 0,
            OpcodeSpace::Ext512 => 1,
            OpcodeSpace::Ext1024 => 2,
            OpcodeSpace::Ext2048 => 3,
        }
    }
}

/// Builds a dispatch index from a base opcode and the operand type bytes.
///
/// The high bit of `types[n]` becomes index bit `8 + n` for every type byte
/// the space folds. Callers pass zero for type bytes the instruction lacks.
///
/// # Examples
///
/// ```
/// use macro_vm::{fold_index, OpcodeSpace};
///
/// assert_eq!(fold_index(0x06, [0x80, 0x00, 0x00], OpcodeSpace::Base256), 0x006);
/// assert_eq!(fold_index(0x06, [0x80, 0x00, 0x00], OpcodeSpace::Ext512), 0x106);
/// assert_eq!(fold_index(0x06, [0x81, 0x80, 0x80], OpcodeSpace::Ext2048), 0x706);
/// ```
pub fn fold_index(opcode: u8, types: [u8; 3], space: OpcodeSpace) -> u16 {
    types
        .iter()
        .take(space.folded_bytes())
        .enumerate()
        .fold(opcode as u16, |index, (n, &ty)| {
            index | (((ty & 0x80) as u16) << (n + 1))
        })
}

/// One registered opcode.
pub struct DispatchEntry<H> {
    /// Instruction mnemonic (e.g., "led", "sleep").
    pub mnemonic: &'static str,

    /// Operand length class.
    pub class: LengthClass,

    /// Handler invoked when the opcode executes.
    pub handler: Handler<H>,
}

impl<H> Clone for DispatchEntry<H> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<H> Copy for DispatchEntry<H> {}

impl<H> std::fmt::Debug for DispatchEntry<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("DispatchEntry")
            .field("mnemonic", &self.mnemonic)
            .field("class", &self.class)
            .finish_non_exhaustive()
    }
}

/// Error returned when an opcode registration is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TableError {
    /// Index does not fit the opcode space.
    #[error("index 0x{index:03X} is outside the {size}-entry opcode space")]
    OutOfSpace {
        /// Rejected index
        index: u16,
        /// Size of the table's opcode space
        size: usize,
    },

    /// Index already has an entry.
    #[error("index 0x{0:03X} is already registered")]
    Duplicate(u16),

    /// Index disagrees with the length class of its family.
    #[error("index 0x{index:03X} is {class:?} but its opcode family is {family:?}")]
    FamilyMismatch {
        /// Rejected index
        index: u16,
        /// Class requested for the index
        class: LengthClass,
        /// Class already used by the family
        family: LengthClass,
    },
}

/// Immutable opcode dispatch table.
///
/// Built once through [`DispatchTable::builder`] and never modified afterwards.
///
/// # Examples
///
/// ```
/// use macro_vm::{Context, DispatchTable, Instruction, LengthClass, OpcodeSpace, Signal};
///
/// fn nop(_ctx: &mut Context<'_, ()>, _instr: &Instruction) -> Signal {
///     Signal::Ok
/// }
///
/// let table = DispatchTable::builder(OpcodeSpace::Base256)
///     .register(0x00, "nop", LengthClass::NoOperand, nop)
///     .unwrap()
///     .build();
///
/// assert_eq!(table.get(0x00).map(|e| e.mnemonic), Some("nop"));
/// assert!(table.get(0x01).is_none());
/// ```
pub struct DispatchTable<H> {
    space: OpcodeSpace,
    entries: Vec<Option<DispatchEntry<H>>>,
    families: [Option<LengthClass>; 256],
}

impl<H> DispatchTable<H> {
    /// Starts building a table for the given opcode space.
    pub fn builder(space: OpcodeSpace) -> DispatchTableBuilder<H> {
        DispatchTableBuilder {
            table: DispatchTable {
                space,
                entries: vec![None; space.size()],
                families: [None; 256],
            },
        }
    }

    /// Returns the opcode space of this table.
    pub fn space(&self) -> OpcodeSpace {
        self.space
    }

    /// Returns the number of registered opcodes.
    pub fn len(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    /// Returns true if no opcode is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Looks up an entry by its full index.
    pub fn get(&self, index: u16) -> Option<&DispatchEntry<H>> {
        self.entries.get(index as usize)?.as_ref()
    }

    /// Length class shared by every index with this base opcode byte.
    pub fn family_class(&self, opcode: u8) -> Option<LengthClass> {
        self.families[opcode as usize]
    }

    /// Resolves a decoded instruction to its index and entry.
    ///
    /// See [`Instruction::index`] for which type bytes fold in each mode.
    pub fn resolve(
        &self,
        instr: &Instruction,
        mode: LengthMode,
    ) -> Option<(u16, &DispatchEntry<H>)> {
        let class = self.family_class(instr.opcode)?;
        let index = instr.index(self.space, class, mode);
        self.get(index).map(|entry| (index, entry))
    }

    /// Iterates over all registered entries in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &DispatchEntry<H>)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.as_ref().map(|e| (index as u16, e)))
    }

    /// Checks that every registered class and the opcode space exist at the
    /// configured operand width, and that every index can be reached in the
    /// configured length mode.
    pub fn check_config(&self, config: VmConfig) -> Result<(), ConfigError> {
        if config.width == OperandWidth::Compact && self.space == OpcodeSpace::Ext2048 {
            return Err(ConfigError::SpaceNeedsExtended { space: self.space });
        }

        for (index, entry) in self.iter() {
            if config.width.length_of(entry.class).is_none() {
                return Err(ConfigError::ClassNeedsExtended { class: entry.class });
            }

            // Bits 8..=10 each need the matching type byte to be present.
            let folded = (index >> 8) as usize;
            if folded >> config.length_mode.folded_type_bytes(entry.class) != 0 {
                return Err(ConfigError::UnreachableIndex {
                    index,
                    class: entry.class,
                });
            }
        }

        Ok(())
    }
}

impl<H> std::fmt::Debug for DispatchTable<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("DispatchTable")
            .field("space", &self.space)
            .field("entries", &self.len())
            .finish()
    }
}

/// Builder for [`DispatchTable`].
pub struct DispatchTableBuilder<H> {
    table: DispatchTable<H>,
}

impl<H> std::fmt::Debug for DispatchTableBuilder<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_tuple("DispatchTableBuilder")
            .field(&self.table)
            .finish()
    }
}

impl<H> DispatchTableBuilder<H> {
    /// Registers a handler at the given index.
    ///
    /// # Errors
    ///
    /// - [`TableError::OutOfSpace`] if `index` does not fit the opcode space
    /// - [`TableError::Duplicate`] if `index` is already registered
    /// - [`TableError::FamilyMismatch`] if another index with the same base byte
    ///   uses a different class
    ///
    /// Whether the index can be reached depends on the length mode and is
    /// checked by [`DispatchTable::check_config`].
    pub fn register(
        mut self,
        index: u16,
        mnemonic: &'static str,
        class: LengthClass,
        handler: Handler<H>,
    ) -> Result<Self, TableError> {
        let size = self.table.space.size();
        if index as usize >= size {
            return Err(TableError::OutOfSpace { index, size });
        }
        if self.table.entries[index as usize].is_some() {
            return Err(TableError::Duplicate(index));
        }

        let base = (index & 0xFF) as usize;
        if let Some(family) = self.table.families[base] {
            if family != class {
                return Err(TableError::FamilyMismatch {
                    index,
                    class,
                    family,
                });
            }
        }

        self.table.families[base] = Some(class);
        self.table.entries[index as usize] = Some(DispatchEntry {
            mnemonic,
            class,
            handler,
        });
        Ok(self)
    }

    /// Finishes the table.
    pub fn build(self) -> DispatchTable<H> {
        self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(_ctx: &mut Context<'_, ()>, _instr: &Instruction) -> Signal {
        Signal::Ok
    }

    #[test]
    fn test_space_sizes() {
        assert_eq!(OpcodeSpace::Base256.size(), 256);
        assert_eq!(OpcodeSpace::Ext512.size(), 512);
        assert_eq!(OpcodeSpace::Ext1024.size(), 1024);
        assert_eq!(OpcodeSpace::Ext2048.size(), 2048);
    }

    #[test]
    fn test_fold_ignores_low_bits_of_type_bytes() {
        assert_eq!(fold_index(0x10, [0x7F, 0x7F, 0x7F], OpcodeSpace::Ext2048), 0x010);
        assert_eq!(fold_index(0x10, [0x00, 0x80, 0x00], OpcodeSpace::Ext1024), 0x210);
        assert_eq!(fold_index(0x10, [0x00, 0x00, 0x80], OpcodeSpace::Ext1024), 0x010);
        assert_eq!(fold_index(0x10, [0x00, 0x00, 0x80], OpcodeSpace::Ext2048), 0x410);
    }

    #[test]
    fn test_register_rejects_out_of_space() {
        let err = DispatchTable::<()>::builder(OpcodeSpace::Base256)
            .register(0x100, "x", LengthClass::Single, ok)
            .unwrap_err();
        assert_eq!(
            err,
            TableError::OutOfSpace {
                index: 0x100,
                size: 256
            }
        );
    }

    #[test]
    fn test_register_rejects_duplicate() {
        let err = DispatchTable::<()>::builder(OpcodeSpace::Base256)
            .register(0x05, "a", LengthClass::NoOperand, ok)
            .unwrap()
            .register(0x05, "b", LengthClass::NoOperand, ok)
            .unwrap_err();
        assert_eq!(err, TableError::Duplicate(0x05));
    }

    #[test]
    fn test_register_rejects_family_mismatch() {
        let err = DispatchTable::<()>::builder(OpcodeSpace::Ext512)
            .register(0x05, "a", LengthClass::Single, ok)
            .unwrap()
            .register(0x105, "b", LengthClass::Dual, ok)
            .unwrap_err();
        assert!(matches!(err, TableError::FamilyMismatch { index: 0x105, .. }));
    }

    #[test]
    fn test_check_config_rejects_unreachable_index() {
        // A single-operand instruction has no src_type to donate bit 9.
        let table = DispatchTable::<()>::builder(OpcodeSpace::Ext1024)
            .register(0x205, "a", LengthClass::Single, ok)
            .unwrap()
            .build();
        assert_eq!(
            table.check_config(VmConfig::compact()),
            Err(ConfigError::UnreachableIndex {
                index: 0x205,
                class: LengthClass::Single
            })
        );
        assert_eq!(table.check_config(VmConfig::compact().fixed()), Ok(()));

        // Narrow immediates never fold in variable-length images.
        let table = DispatchTable::<()>::builder(OpcodeSpace::Ext512)
            .register(0x101, "b", LengthClass::Narrow, ok)
            .unwrap()
            .build();
        assert!(matches!(
            table.check_config(VmConfig::extended()),
            Err(ConfigError::UnreachableIndex { index: 0x101, .. })
        ));
        assert_eq!(table.check_config(VmConfig::extended().fixed()), Ok(()));
    }

    #[test]
    fn test_resolve_folds_type_bytes_by_mode() {
        let table = DispatchTable::<()>::builder(OpcodeSpace::Ext1024)
            .register(0x07, "single", LengthClass::Single, ok)
            .unwrap()
            .register(0x107, "single_hi", LengthClass::Single, ok)
            .unwrap()
            .register(0x207, "single_src", LengthClass::Single, ok)
            .unwrap()
            .build();

        let instr = Instruction {
            opcode: 0x07,
            dst_type: 0x80,
            ..Instruction::default()
        };
        let (index, entry) = table.resolve(&instr, LengthMode::Variable).unwrap();
        assert_eq!(index, 0x107);
        assert_eq!(entry.mnemonic, "single_hi");

        // src_type is outside a variable-length Single instruction.
        let instr = Instruction {
            opcode: 0x07,
            src_type: 0xFF,
            ..Instruction::default()
        };
        let (index, _) = table.resolve(&instr, LengthMode::Variable).unwrap();
        assert_eq!(index, 0x007);

        // A fixed record carries it.
        let (index, entry) = table.resolve(&instr, LengthMode::Fixed).unwrap();
        assert_eq!(index, 0x207);
        assert_eq!(entry.mnemonic, "single_src");

        let unknown = Instruction {
            opcode: 0x08,
            ..Instruction::default()
        };
        assert!(table.resolve(&unknown, LengthMode::Fixed).is_none());
    }

    #[test]
    fn test_check_config_rejects_extension_on_compact() {
        let table = DispatchTable::<()>::builder(OpcodeSpace::Base256)
            .register(0x01, "ext", LengthClass::DualExt, ok)
            .unwrap()
            .build();
        assert_eq!(
            table.check_config(VmConfig::compact()),
            Err(ConfigError::ClassNeedsExtended {
                class: LengthClass::DualExt
            })
        );
        assert_eq!(table.check_config(VmConfig::extended()), Ok(()));

        let wide = DispatchTable::<()>::builder(OpcodeSpace::Ext2048).build();
        assert!(wide.check_config(VmConfig::compact()).is_err());
    }
}
