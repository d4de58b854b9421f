//! # Control Flow Instructions
//!
//! This module implements the two stock instructions the interpreter handles
//! without the host:
//! - NOP: do nothing
//! - JMP: jump to an offset within the program
//!
//! JMP is a narrow instruction. Its single operand byte is the absolute target
//! offset, so stock programs can only jump within their first 256 bytes, which
//! is also the size of a per-key macro slot.

use crate::vm::{Context, Signal};
use crate::Instruction;

/// Executes the NOP instruction.
pub(crate) fn execute_nop<H>(_ctx: &mut Context<'_, H>, _instr: &Instruction) -> Signal {
    Signal::Ok
}

/// Executes the JMP instruction.
///
/// Loads the jump register with the 8-bit target. The interpreter validates
/// the target and moves the program counter once this handler returns.
pub(crate) fn execute_jmp<H>(ctx: &mut Context<'_, H>, instr: &Instruction) -> Signal {
    ctx.request_jump(instr.imm8() as usize);
    Signal::Ok
}
