//! # Macro Bytecode Interpreter
//!
//! A compact bytecode virtual machine for keyboard and LED firmware. Each key
//! and each LED can carry a small binary "macro" program; the host runs it
//! through an [`Interpreter`] when the key or LED event fires.
//!
//! ## Quick Start
//!
//! ```rust
//! use macro_vm::instructions::{stock_table, EventLog, StockOp};
//! use macro_vm::{Interpreter, Outcome, ProgramBuilder, VmConfig};
//!
//! // prt 0x04 ; sleep #00:$0064 ; hidp
//! let mut builder = ProgramBuilder::new(VmConfig::compact().width);
//! builder.narrow(StockOp::Prt.opcode(), 0x04);
//! builder.single(StockOp::Sleep.opcode(), 0x00, 100).unwrap();
//! builder.no_operand(StockOp::Hidp.opcode());
//! let program = builder.build();
//!
//! let mut vm = Interpreter::new(EventLog::new(), stock_table().unwrap(), VmConfig::compact()).unwrap();
//! assert_eq!(vm.run(&program), Ok(Outcome::Completed));
//! assert_eq!(vm.host().ops(), vec![StockOp::Prt, StockOp::Sleep, StockOp::Hidp]);
//! ```
//!
//! ## Architecture
//!
//! - **Table-driven dispatch**: one [`DispatchTable`] maps every opcode index to
//!   its mnemonic, length class and handler
//! - **Owned state**: program counter, jump register, stop flag and error
//!   record live in one [`Interpreter`] value, no globals
//! - **Cooperative control**: handlers steer the loop through a [`Context`]
//!   (jump, stop) and the host can abort between instructions with a watchdog
//! - **Bounds checked**: no instruction is decoded unless it fits entirely
//!   inside the program
//!
//! ## Modules
//!
//! - `format` - Length classes, operand widths and configuration
//! - `instruction` - Decoded instruction record
//! - `decoder` - Instruction length lookup and parsing
//! - `dispatch` - Dispatch table and opcode-space folding
//! - `vm` - Execution engine
//! - `instructions` - Stock firmware instruction set
//! - `encoder` - Program builder
//! - `disassembler` - Program listings

pub mod decoder;
pub mod disassembler;
pub mod dispatch;
pub mod encoder;
pub mod format;
pub mod instruction;
pub mod instructions;
pub mod vm;
pub mod wasm;

// Re-export public API
pub use disassembler::{disassemble, Listing};
pub use dispatch::{fold_index, DispatchEntry, DispatchTable, Handler, OpcodeSpace, TableError};
pub use encoder::{EncodeError, ProgramBuilder};
pub use format::{ConfigError, LengthClass, LengthMode, OperandWidth, VmConfig};
pub use instruction::Instruction;
pub use vm::{Context, Interpreter, Outcome, Signal, Watchdog, WatchdogStatus};

use thiserror::Error;

/// Coarse category of an aborted run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The next instruction would extend past the end of the program.
    Length,

    /// A handler returned [`Signal::Error`].
    Handler,

    /// The program counter was out of range after dispatch.
    Anomaly,

    /// A requested jump target lies outside the program.
    Jump,

    /// The watchdog hook expired.
    Watchdog,

    /// No dispatch table entry exists for the opcode.
    InvalidOpcode,
}

impl ErrorKind {
    /// One-letter tag used by firmware diagnostics.
    pub fn tag(self) -> char {
        match self {
            ErrorKind::Length => 'L',
            ErrorKind::Handler => 'E',
            ErrorKind::Anomaly => 'A',
            ErrorKind::Jump => 'J',
            ErrorKind::Watchdog => 'W',
            ErrorKind::InvalidOpcode => 'O',
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let text = match self {
            ErrorKind::Length => "length error",
            ErrorKind::Handler => "handler error",
            ErrorKind::Anomaly => "program counter anomaly",
            ErrorKind::Jump => "invalid jump target",
            ErrorKind::Watchdog => "watchdog expired",
            ErrorKind::InvalidOpcode => "invalid opcode",
        };
        f.write_str(text)
    }
}

/// Error record describing why a run aborted.
///
/// `instruction` is a snapshot of the instruction being executed, or a zeroed
/// record when the failure happened before one was decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at 0x{address:04X} (opcode 0x{:02X})", .instruction.opcode)]
pub struct ExecutionError {
    /// What went wrong.
    pub kind: ErrorKind,

    /// Program offset active when the failure occurred.
    pub address: usize,

    /// The failing instruction, if it had been decoded.
    pub instruction: Instruction,
}
