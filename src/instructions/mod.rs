//! # Stock Instruction Set
//!
//! The opcodes registered by the keyboard/LED firmware, in registration
//! order. The opcode byte of each instruction is its position in the list.
//!
//! | Opcode | Mnemonic | Class       | Purpose                        |
//! |--------|----------|-------------|--------------------------------|
//! | 0x00   | nop      | NoOperand   | do nothing                     |
//! | 0x01   | jmp      | Narrow      | jump to an 8-bit offset        |
//! | 0x02   | clr      | NoOperand   | clear the key report           |
//! | 0x03   | prt      | Narrow      | put a key code in the report   |
//! | 0x04   | hidp     | NoOperand   | push the HID report            |
//! | 0x05   | strp     | Narrow      | type a character               |
//! | 0x06   | out      | Single      | drive an output                |
//! | 0x07   | keyp     | NoOperand   | key pressed                    |
//! | 0x08   | ldi      | Single      | load from internal memory      |
//! | 0x09   | lde      | Single      | load from EEPROM               |
//! | 0x0A   | wri      | Single      | write internal memory          |
//! | 0x0B   | wre      | Single      | write EEPROM                   |
//! | 0x0C   | sleep    | Single      | delay                          |
//! | 0x0D   | led      | Dual        | set an LED color               |
//! | 0x0E   | time     | Single      | timer control                  |
//! | 0x0F   | fade     | Dual        | fade an LED                    |
//! | 0x10   | trig     | Single      | trigger                        |
//! | 0x11   | rgb      | Single      | RGB effect                     |
//! | 0x12   | sysrst   | Single      | system reset                   |
//! | 0x13   | reload   | Single      | reload configuration           |
//! | 0x14   | iap      | Single      | enter firmware update          |
//!
//! `nop` and `jmp` are handled by the interpreter itself. Every other opcode
//! is forwarded to the host through [`MacroHost`]; what it does to keys,
//! LEDs or EEPROM is up to the firmware.

pub mod control;
pub mod peripheral;

pub use peripheral::{Event, EventLog};

use crate::dispatch::{DispatchTable, Handler, OpcodeSpace, TableError};
use crate::format::LengthClass;
use crate::instruction::Instruction;
use crate::vm::Signal;

/// Largest macro program the firmware stores per key or per LED.
pub const MAX_PROGRAM_LEN: usize = 256;

/// Host side of the stock instruction set.
pub trait MacroHost {
    /// Executes a peripheral instruction.
    ///
    /// Called for every stock opcode except `nop` and `jmp`.
    fn execute(&mut self, op: StockOp, instr: &Instruction) -> Signal;
}

/// Stock firmware opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockOp {
    Nop,
    Jmp,
    Clr,
    Prt,
    Hidp,
    Strp,
    Out,
    Keyp,
    Ldi,
    Lde,
    Wri,
    Wre,
    Sleep,
    Led,
    Time,
    Fade,
    Trig,
    Rgb,
    Sysrst,
    Reload,
    Iap,
}

impl StockOp {
    /// All stock opcodes in opcode order.
    pub const ALL: [StockOp; 21] = [
        StockOp::Nop,
        StockOp::Jmp,
        StockOp::Clr,
        StockOp::Prt,
        StockOp::Hidp,
        StockOp::Strp,
        StockOp::Out,
        StockOp::Keyp,
        StockOp::Ldi,
        StockOp::Lde,
        StockOp::Wri,
        StockOp::Wre,
        StockOp::Sleep,
        StockOp::Led,
        StockOp::Time,
        StockOp::Fade,
        StockOp::Trig,
        StockOp::Rgb,
        StockOp::Sysrst,
        StockOp::Reload,
        StockOp::Iap,
    ];

    /// Opcode byte.
    pub const fn opcode(self) -> u8 {
        self as u8
    }

    /// Looks up a stock opcode by its byte.
    pub fn from_opcode(opcode: u8) -> Option<StockOp> {
        Self::ALL.get(opcode as usize).copied()
    }

    /// Instruction mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            StockOp::Nop => "nop",
            StockOp::Jmp => "jmp",
            StockOp::Clr => "clr",
            StockOp::Prt => "prt",
            StockOp::Hidp => "hidp",
            StockOp::Strp => "strp",
            StockOp::Out => "out",
            StockOp::Keyp => "keyp",
            StockOp::Ldi => "ldi",
            StockOp::Lde => "lde",
            StockOp::Wri => "wri",
            StockOp::Wre => "wre",
            StockOp::Sleep => "sleep",
            StockOp::Led => "led",
            StockOp::Time => "time",
            StockOp::Fade => "fade",
            StockOp::Trig => "trig",
            StockOp::Rgb => "rgb",
            StockOp::Sysrst => "sysrst",
            StockOp::Reload => "reload",
            StockOp::Iap => "iap",
        }
    }

    /// Operand length class.
    pub const fn class(self) -> LengthClass {
        match self {
            StockOp::Nop | StockOp::Clr | StockOp::Hidp | StockOp::Keyp => LengthClass::NoOperand,
            StockOp::Jmp | StockOp::Prt | StockOp::Strp => LengthClass::Narrow,
            StockOp::Led | StockOp::Fade => LengthClass::Dual,
            _ => LengthClass::Single,
        }
    }

    fn handler<H: MacroHost>(self) -> Handler<H> {
        match self {
            StockOp::Nop => control::execute_nop::<H> as Handler<H>,
            StockOp::Jmp => control::execute_jmp::<H> as Handler<H>,
            _ => peripheral::execute_forward::<H> as Handler<H>,
        }
    }
}

/// Builds the firmware's compact, 256-entry dispatch table.
///
/// # Examples
///
/// ```
/// use macro_vm::instructions::{stock_table, EventLog, StockOp};
/// use macro_vm::LengthClass;
///
/// let table = stock_table::<EventLog>().unwrap();
/// assert_eq!(table.len(), StockOp::ALL.len());
/// assert_eq!(table.get(0x0D).map(|e| e.class), Some(LengthClass::Dual));
/// ```
pub fn stock_table<H: MacroHost>() -> Result<DispatchTable<H>, TableError> {
    StockOp::ALL
        .iter()
        .try_fold(DispatchTable::builder(OpcodeSpace::Base256), |builder, &op| {
            builder.register(op.opcode() as u16, op.mnemonic(), op.class(), op.handler())
        })
        .map(|builder| builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcodes_follow_registration_order() {
        for (position, op) in StockOp::ALL.iter().enumerate() {
            assert_eq!(op.opcode() as usize, position);
            assert_eq!(StockOp::from_opcode(position as u8), Some(*op));
        }
        assert_eq!(StockOp::from_opcode(21), None);
    }

    #[test]
    fn test_stock_table_classes() {
        let table = stock_table::<EventLog>().unwrap();
        for op in StockOp::ALL {
            let entry = table.get(op.opcode() as u16).unwrap();
            assert_eq!(entry.mnemonic, op.mnemonic());
            assert_eq!(entry.class, op.class());
        }
        assert_eq!(StockOp::Sleep.class(), LengthClass::Single);
        assert_eq!(StockOp::Fade.class(), LengthClass::Dual);
        assert_eq!(StockOp::Strp.class(), LengthClass::Narrow);
    }
}
