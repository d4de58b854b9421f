//! Macro program disassembler
//!
//! Walks a program the same way the interpreter does, without executing it,
//! and produces one [`Listing`] per instruction.

pub mod formatter;

pub use formatter::{format_listing, format_program};

use crate::decoder;
use crate::dispatch::DispatchTable;
use crate::format::{LengthClass, VmConfig};
use crate::instruction::Instruction;

/// A single disassembled instruction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    /// Program offset where this instruction starts
    pub address: usize,

    /// Raw instruction bytes
    pub bytes: Vec<u8>,

    /// Dispatch index, or `None` for a `.byte` directive
    pub index: Option<u16>,

    /// Instruction mnemonic, or `.byte` for undecodable bytes
    pub mnemonic: &'static str,

    /// Operand length class, or `None` for a `.byte` directive
    pub class: Option<LengthClass>,

    /// Decoded instruction (zeroed for a `.byte` directive)
    pub instruction: Instruction,
}

impl Listing {
    fn data(address: usize, bytes: &[u8]) -> Self {
        Self {
            address,
            bytes: bytes.to_vec(),
            index: None,
            mnemonic: ".byte",
            class: None,
            instruction: Instruction::default(),
        }
    }

    /// Returns true if this listing is a `.byte` directive.
    pub fn is_data(&self) -> bool {
        self.index.is_none()
    }
}

/// Disassemble a program into a vector of listings
///
/// Base bytes with no registered family and instructions running past the
/// end of `bytes` become one-byte `.byte` directives, and disassembly resumes
/// at the next byte. An instruction whose family is known but whose folded
/// index is not registered (in fixed-length images, a whole record with an
/// unknown opcode) becomes one `.byte` directive of its full length.
///
/// # Examples
///
/// ```
/// use macro_vm::disassemble;
/// use macro_vm::instructions::{stock_table, EventLog};
/// use macro_vm::VmConfig;
///
/// let table = stock_table::<EventLog>().unwrap();
/// let listings = disassemble(&[0x02, 0x03, 0x04, 0xFF], &table, VmConfig::compact());
///
/// let mnemonics: Vec<_> = listings.iter().map(|l| l.mnemonic).collect();
/// assert_eq!(mnemonics, vec!["clr", "prt", ".byte"]);
/// assert_eq!(listings[2].address, 3);
/// ```
pub fn disassemble<H>(bytes: &[u8], table: &DispatchTable<H>, config: VmConfig) -> Vec<Listing> {
    let mut listings = Vec::new();
    let mut pc = 0;

    while pc < bytes.len() {
        let code = &bytes[pc..];
        let length = decoder::length_of(code, table, config).filter(|&len| len <= code.len());

        let Some(length) = length else {
            listings.push(Listing::data(pc, &code[..1]));
            pc += 1;
            continue;
        };

        let instr = decoder::parse(code, length, config.width);
        match table.resolve(&instr, config.length_mode) {
            Some((index, entry)) => listings.push(Listing {
                address: pc,
                bytes: code[..length].to_vec(),
                index: Some(index),
                mnemonic: entry.mnemonic,
                class: Some(entry.class),
                instruction: instr,
            }),
            None => listings.push(Listing::data(pc, &code[..length])),
        }
        pc += length;
    }

    listings
}
