//! # Execution Engine
//!
//! This module contains the [`Interpreter`], which owns all run-time state of
//! the macro VM, and the fetch-decode-execute loop that drives it.
//!
//! ## Interpreter State
//!
//! The interpreter maintains:
//! - **Program counter**: byte offset of the next instruction, 0 at run start
//! - **Jump register**: a pending jump target, consumed in the cycle it is set
//! - **Stop flag**: cooperative termination request, checked once per cycle
//! - **Watchdog hook**: optional per-cycle callback, kept across runs
//! - **Last error**: record of the most recent abort, cleared at run start
//!
//! ## Execution Model
//!
//! Each cycle of [`Interpreter::run`]:
//! 1. Feed the watchdog (abort if it expired)
//! 2. Honor a stop request
//! 3. Size the instruction and check it fits in the program
//! 4. Parse and dispatch it
//! 5. Apply a pending jump, which overrides the handler's signal, or else
//!    apply the signal (end, reset, advance)

use crate::decoder;
use crate::dispatch::DispatchTable;
use crate::format::{ConfigError, VmConfig};
use crate::instruction::Instruction;
use crate::{ErrorKind, ExecutionError};
use log::{debug, trace, warn};

/// Value returned by a handler to steer the execution loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Advance to the next instruction.
    Ok,

    /// Abort the run with [`ErrorKind::Handler`].
    Error,

    /// Finish the run successfully.
    End,

    /// Restart the program from offset 0.
    Reset,
}

/// How a successful run finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The program counter reached the end of the program.
    Completed,

    /// A handler returned [`Signal::End`].
    Ended,

    /// A stop was requested through [`Context::request_stop`].
    Stopped,
}

/// Verdict of the watchdog hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchdogStatus {
    /// Keep running.
    Fed,

    /// Abort the run with [`ErrorKind::Watchdog`].
    Expired,
}

/// Per-cycle watchdog hook.
pub type Watchdog = Box<dyn FnMut() -> WatchdogStatus>;

/// Handler view of the interpreter.
///
/// A handler can reach host state and request control transfers, but cannot
/// touch the program counter or start a nested run.
pub struct Context<'a, H> {
    host: &'a mut H,
    pc: usize,
    jump: &'a mut Option<usize>,
    stop: &'a mut bool,
}

impl<'a, H> Context<'a, H> {
    /// Returns the host state.
    pub fn host(&self) -> &H {
        self.host
    }

    /// Returns the host state mutably.
    pub fn host_mut(&mut self) -> &mut H {
        self.host
    }

    /// Offset of the instruction being executed.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Requests a jump to `target` once the current handler returns.
    ///
    /// The jump takes priority over whatever signal the handler returns. A
    /// target outside the program aborts the run with [`ErrorKind::Jump`].
    pub fn request_jump(&mut self, target: usize) {
        *self.jump = Some(target);
    }

    /// Returns the pending jump target, if any.
    pub fn pending_jump(&self) -> Option<usize> {
        *self.jump
    }

    /// Requests the run to stop at the start of the next cycle.
    ///
    /// The stop is graceful: the run returns [`Outcome::Stopped`].
    pub fn request_stop(&mut self) {
        *self.stop = true;
    }
}

/// Macro bytecode interpreter.
///
/// Generic over the host state `H` that handlers operate on (key reports, LED
/// colors, EEPROM, ...). One interpreter runs one program at a time.
///
/// # Examples
///
/// ```
/// use macro_vm::instructions::{stock_table, EventLog, StockOp};
/// use macro_vm::{Interpreter, Outcome, VmConfig};
///
/// let mut vm = Interpreter::new(EventLog::new(), stock_table().unwrap(), VmConfig::compact()).unwrap();
///
/// // clr ; hidp
/// let program = [StockOp::Clr.opcode(), StockOp::Hidp.opcode()];
/// assert_eq!(vm.run(&program), Ok(Outcome::Completed));
/// assert_eq!(vm.host().len(), 2);
/// assert!(vm.last_error().is_none());
/// ```
pub struct Interpreter<H> {
    /// Host state handed to handlers
    host: H,

    /// Opcode dispatch table
    table: DispatchTable<H>,

    /// Operand width and length mode
    config: VmConfig,

    /// Offset of the current instruction
    pc: usize,

    /// Pending jump target
    jump: Option<usize>,

    /// Stop requested
    stop: bool,

    /// Per-cycle hook
    watchdog: Option<Watchdog>,

    /// Most recent abort
    last_error: Option<ExecutionError>,
}

impl<H> Interpreter<H> {
    /// Creates an interpreter over the given host state and dispatch table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the table uses a length class or opcode space
    /// the configured operand width cannot encode.
    pub fn new(host: H, table: DispatchTable<H>, config: VmConfig) -> Result<Self, ConfigError> {
        table.check_config(config)?;

        Ok(Self {
            host,
            table,
            config,
            pc: 0,
            jump: None,
            stop: false,
            watchdog: None,
            last_error: None,
        })
    }

    /// Runs a whole program.
    ///
    /// Equivalent to `run_len(program, program.len())`.
    pub fn run(&mut self, program: &[u8]) -> Result<Outcome, ExecutionError> {
        self.run_len(program, program.len())
    }

    /// Runs the first `length` bytes of `program`.
    ///
    /// All run state except the watchdog hook is reset first. On abort the
    /// error is returned and also kept for [`Interpreter::last_error`].
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Length`] if an instruction extends past `length`, or if
    ///   `length` exceeds the buffer
    /// - [`ErrorKind::InvalidOpcode`] if an opcode has no table entry
    /// - [`ErrorKind::Handler`] if a handler returns [`Signal::Error`]
    /// - [`ErrorKind::Anomaly`] if the program counter left the program
    /// - [`ErrorKind::Jump`] if a requested jump target is outside the program
    /// - [`ErrorKind::Watchdog`] if the watchdog hook expired
    pub fn run_len(&mut self, program: &[u8], length: usize) -> Result<Outcome, ExecutionError> {
        self.stop = false;
        self.pc = 0;
        self.jump = None;
        self.last_error = None;

        debug!("running {}-byte macro", length);

        if length > program.len() {
            return Err(self.abort(ErrorKind::Length, Instruction::default()));
        }

        let outcome = loop {
            if self.pc >= length {
                break Outcome::Completed;
            }

            if let Some(watchdog) = self.watchdog.as_mut() {
                if watchdog() == WatchdogStatus::Expired {
                    return Err(self.abort(ErrorKind::Watchdog, Instruction::default()));
                }
            }

            if self.stop {
                self.stop = false;
                break Outcome::Stopped;
            }

            let code = &program[self.pc..length];
            let Some(op_length) = decoder::length_of(code, &self.table, self.config) else {
                return Err(self.abort(ErrorKind::InvalidOpcode, Instruction::default()));
            };
            if self.pc + op_length > length {
                return Err(self.abort(ErrorKind::Length, Instruction::default()));
            }

            let instr = decoder::parse(code, op_length, self.config.width);

            let Some((index, entry)) = self.table.resolve(&instr, self.config.length_mode) else {
                return Err(self.abort(ErrorKind::InvalidOpcode, instr));
            };
            let handler = entry.handler;
            trace!("{:04X}: {} (index 0x{:03X})", self.pc, entry.mnemonic, index);

            let mut ctx = Context {
                host: &mut self.host,
                pc: self.pc,
                jump: &mut self.jump,
                stop: &mut self.stop,
            };
            let signal = handler(&mut ctx, &instr);

            if signal == Signal::Error {
                return Err(self.abort(ErrorKind::Handler, instr));
            }

            if self.pc >= length {
                return Err(self.abort(ErrorKind::Anomaly, Instruction::default()));
            }

            if let Some(target) = self.jump.take() {
                if target >= length {
                    return Err(self.abort(ErrorKind::Jump, instr));
                }
                self.pc = target;
                continue;
            }

            match signal {
                Signal::End => break Outcome::Ended,
                Signal::Reset => self.pc = 0,
                Signal::Ok | Signal::Error => self.pc += op_length,
            }
        };

        debug!("macro finished: {:?} at 0x{:04X}", outcome, self.pc);
        Ok(outcome)
    }

    /// Records an abort at the current program counter.
    fn abort(&mut self, kind: ErrorKind, instruction: Instruction) -> ExecutionError {
        let error = ExecutionError {
            kind,
            address: self.pc,
            instruction,
        };
        warn!("macro aborted: {}", error);
        self.last_error = Some(error.clone());
        error
    }

    /// Installs or replaces the watchdog hook. `None` disables it.
    ///
    /// The hook runs once per cycle, before the instruction is fetched, and
    /// stays installed across runs.
    pub fn set_watchdog(&mut self, hook: Option<Watchdog>) {
        self.watchdog = hook;
    }

    /// Returns true if a watchdog hook is installed.
    pub fn has_watchdog(&self) -> bool {
        self.watchdog.is_some()
    }

    /// Error record of the most recent run, or `None` if it succeeded (or no
    /// run has happened yet).
    pub fn last_error(&self) -> Option<&ExecutionError> {
        self.last_error.as_ref()
    }

    /// Program counter where the last run stopped.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Returns the host state.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Returns the host state mutably.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Consumes the interpreter and returns the host state.
    pub fn into_host(self) -> H {
        self.host
    }

    /// Returns the dispatch table.
    pub fn table(&self) -> &DispatchTable<H> {
        &self.table
    }

    /// Returns the configuration.
    pub fn config(&self) -> VmConfig {
        self.config
    }
}
