//! # Instruction Decoder
//!
//! Two steps turn the bytes at the program counter into an [`Instruction`]:
//!
//! 1. [`length_of`] looks the base opcode's family up in the dispatch table
//!    and returns the instruction's byte length, before anything else is read
//! 2. [`parse`] unpacks exactly that many bytes into a zeroed record
//!
//! The execution engine checks the length against the end of the program
//! between the two steps, so `parse` never sees a truncated instruction in
//! normal operation. It still tolerates one.

use crate::dispatch::DispatchTable;
use crate::format::{LengthClass, LengthMode, OperandWidth, VmConfig};
use crate::instruction::Instruction;

/// Returns the byte length of the instruction starting at `bytes[0]`.
///
/// In fixed-length mode this is always the full record size. In
/// variable-length mode it is the length of the class shared by every index
/// with this base opcode byte, so only `bytes[0]` is read.
///
/// Returns `None` if `bytes` is empty or no index with this base byte is
/// registered.
///
/// # Examples
///
/// ```
/// use macro_vm::decoder::length_of;
/// use macro_vm::instructions::{stock_table, EventLog, StockOp};
/// use macro_vm::VmConfig;
///
/// let table = stock_table::<EventLog>().unwrap();
/// let config = VmConfig::compact();
///
/// assert_eq!(length_of(&[StockOp::Nop.opcode()], &table, config), Some(1));
/// assert_eq!(length_of(&[StockOp::Led.opcode()], &table, config), Some(8));
/// assert_eq!(length_of(&[0xFF], &table, config), None);
/// ```
pub fn length_of<H>(bytes: &[u8], table: &DispatchTable<H>, config: VmConfig) -> Option<usize> {
    let &opcode = bytes.first()?;

    match config.length_mode {
        LengthMode::Fixed => Some(config.width.fixed_length()),
        LengthMode::Variable => {
            let class = table.family_class(opcode)?;
            config.width.length_of(class)
        }
    }
}

/// Unpacks an instruction of `length` bytes.
///
/// The record starts zeroed and fields are filled left to right while they
/// fit within `length` (and within `bytes`). A narrow instruction only sets
/// `opcode` and `dst_type`; a dual-with-extension instruction sets all seven
/// fields.
///
/// # Examples
///
/// ```
/// use macro_vm::{decoder, OperandWidth};
///
/// // led #01:$0002, #00:$FF00 followed by unrelated bytes
/// let bytes = [0x0D, 0x01, 0x02, 0x00, 0x00, 0x00, 0xFF, 0x00, 0xAA, 0xBB];
/// let instr = decoder::parse(&bytes, 8, OperandWidth::Compact);
/// assert_eq!(instr.dst, 0x0002);
/// assert_eq!(instr.src, 0xFF00);
///
/// // Only the opcode and the narrow byte fit in a 2-byte prefix
/// let instr = decoder::parse(&bytes, 2, OperandWidth::Compact);
/// assert_eq!(instr.dst_type, 0x01);
/// assert_eq!(instr.dst, 0);
/// ```
pub fn parse(bytes: &[u8], length: usize, width: OperandWidth) -> Instruction {
    let code = &bytes[..length.min(bytes.len())];
    let mut instr = Instruction::default();

    let Some(&opcode) = code.first() else {
        return instr;
    };
    instr.opcode = opcode;

    if let Some(&dst_type) = code.get(1) {
        instr.dst_type = dst_type;
    }

    let size = width.value_size();
    let [_, src_at, ext_at] = width.type_offsets();

    if fits(code, width, LengthClass::Single) {
        instr.dst = read_le(&code[2..2 + size]);
    }

    if let (true, Some(at)) = (fits(code, width, LengthClass::Dual), src_at) {
        instr.src_type = code[at];
        instr.src = read_le(&code[at + 1..at + 1 + size]);
    }

    if let (true, Some(at)) = (fits(code, width, LengthClass::DualExt), ext_at) {
        instr.ext_type = code[at];
        instr.ext = read_le(&code[at + 1..at + 1 + size]);
    }

    instr
}

/// True if `code` is long enough to hold every field of `class`.
fn fits(code: &[u8], width: OperandWidth, class: LengthClass) -> bool {
    width.length_of(class).is_some_and(|len| code.len() >= len)
}

/// Little-endian value of up to four bytes.
fn read_le(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .rev()
        .fold(0, |value, &byte| (value << 8) | byte as u32)
}
