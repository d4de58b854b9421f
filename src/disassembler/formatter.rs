//! Formatting functions for disassembled instructions

use crate::disassembler::Listing;
use crate::format::LengthClass;

/// Format a single listing as one line of text
///
/// # Examples
///
/// ```
/// use macro_vm::disassembler::format_listing;
/// use macro_vm::instructions::{stock_table, EventLog};
/// use macro_vm::{disassemble, VmConfig};
///
/// let table = stock_table::<EventLog>().unwrap();
/// let program = [0x0D, 0x01, 0x10, 0x00, 0x00, 0xFF, 0x00, 0x00];
/// let listings = disassemble(&program, &table, VmConfig::compact());
///
/// assert_eq!(format_listing(&listings[0]), "0000  led #01:$0010, #00:$00FF");
/// ```
pub fn format_listing(listing: &Listing) -> String {
    let operand = format_operand(listing);

    if operand.is_empty() {
        format!("{:04X}  {}", listing.address, listing.mnemonic)
    } else {
        format!("{:04X}  {} {}", listing.address, listing.mnemonic, operand)
    }
}

/// Format a whole program, one listing per line
pub fn format_program(listings: &[Listing]) -> String {
    listings
        .iter()
        .map(format_listing)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Format the operand based on length class
fn format_operand(listing: &Listing) -> String {
    let instr = &listing.instruction;

    let Some(class) = listing.class else {
        return listing
            .bytes
            .iter()
            .map(|byte| format!("${:02X}", byte))
            .collect::<Vec<_>>()
            .join(" ");
    };

    match class {
        LengthClass::NoOperand => String::new(),
        LengthClass::Narrow => format!("#${:02X}", instr.imm8()),
        LengthClass::Single => pair(instr.dst_type, instr.dst),
        LengthClass::Dual => format!(
            "{}, {}",
            pair(instr.dst_type, instr.dst),
            pair(instr.src_type, instr.src)
        ),
        LengthClass::DualExt => format!(
            "{}, {}, {}",
            pair(instr.dst_type, instr.dst),
            pair(instr.src_type, instr.src),
            pair(instr.ext_type, instr.ext)
        ),
    }
}

fn pair(ty: u8, value: u32) -> String {
    if value > 0xFFFF {
        format!("#{:02X}:${:08X}", ty, value)
    } else {
        format!("#{:02X}:${:04X}", ty, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Instruction;

    #[test]
    fn test_format_data_directive() {
        let listing = Listing {
            address: 0x12,
            bytes: vec![0xFF],
            index: None,
            mnemonic: ".byte",
            class: None,
            instruction: Instruction::default(),
        };
        assert_eq!(format_listing(&listing), "0012  .byte $FF");
    }

    #[test]
    fn test_format_narrow_and_wide_values() {
        let listing = Listing {
            address: 0,
            bytes: vec![],
            index: Some(0x20),
            mnemonic: "x",
            class: Some(LengthClass::Single),
            instruction: Instruction {
                dst_type: 0x80,
                dst: 0x0001_0000,
                ..Instruction::default()
            },
        };
        assert_eq!(format_listing(&listing), "0000  x #80:$00010000");

        let narrow = Listing {
            class: Some(LengthClass::Narrow),
            instruction: Instruction {
                dst_type: 0x2A,
                ..Instruction::default()
            },
            ..listing
        };
        assert_eq!(format_listing(&narrow), "0000  x #$2A");
    }
}
