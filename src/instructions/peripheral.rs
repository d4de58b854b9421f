//! # Peripheral Instructions
//!
//! Every stock opcode other than NOP and JMP goes to the host through
//! [`MacroHost::execute`]. This module holds the forwarding handler and
//! [`EventLog`], a host that simply records what it was asked to do.

use crate::instructions::{MacroHost, StockOp};
use crate::vm::{Context, Signal};
use crate::Instruction;

/// Forwards a peripheral instruction to the host.
pub(crate) fn execute_forward<H: MacroHost>(ctx: &mut Context<'_, H>, instr: &Instruction) -> Signal {
    match StockOp::from_opcode(instr.opcode) {
        Some(op) => ctx.host_mut().execute(op, instr),
        None => Signal::Error,
    }
}

/// One forwarded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    /// The stock opcode.
    pub op: StockOp,

    /// The decoded instruction.
    pub instruction: Instruction,
}

/// Recording host.
///
/// Stores every forwarded instruction and answers [`Signal::Ok`], unless told
/// to fail on a particular opcode. Useful for tests, listings and the browser
/// demo, where there is no real keyboard to drive.
///
/// # Examples
///
/// ```
/// use macro_vm::instructions::{EventLog, MacroHost, StockOp};
/// use macro_vm::{Instruction, Signal};
///
/// let mut log = EventLog::new().failing_on(StockOp::Iap);
/// assert_eq!(log.execute(StockOp::Clr, &Instruction::default()), Signal::Ok);
/// assert_eq!(log.execute(StockOp::Iap, &Instruction::default()), Signal::Error);
/// assert_eq!(log.ops(), vec![StockOp::Clr, StockOp::Iap]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
    fail_on: Option<StockOp>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns this log configured to answer [`Signal::Error`] for `op`.
    pub fn failing_on(mut self, op: StockOp) -> Self {
        self.fail_on = Some(op);
        self
    }

    /// Recorded events, oldest first.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Recorded opcodes, oldest first.
    pub fn ops(&self) -> Vec<StockOp> {
        self.events.iter().map(|event| event.op).collect()
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Forgets all recorded events.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl MacroHost for EventLog {
    fn execute(&mut self, op: StockOp, instr: &Instruction) -> Signal {
        self.events.push(Event {
            op,
            instruction: *instr,
        });

        if self.fail_on == Some(op) {
            Signal::Error
        } else {
            Signal::Ok
        }
    }
}
