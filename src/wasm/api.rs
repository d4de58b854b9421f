//! WASM API for the macro interpreter.
//!
//! Provides JavaScript-callable interfaces for running macro programs against
//! the stock instruction set and inspecting what they did.

use crate::disassembler::{disassemble, format_listing};
use crate::instructions::{stock_table, EventLog};
use crate::{Interpreter, Outcome, VmConfig, WatchdogStatus};
use std::cell::Cell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;

/// JavaScript-compatible error wrapper
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct JsError {
    message: String,
}

#[wasm_bindgen]
impl JsError {
    #[wasm_bindgen(constructor)]
    pub fn new(message: &str) -> JsError {
        JsError {
            message: message.to_string(),
        }
    }

    #[wasm_bindgen(getter)]
    pub fn message(&self) -> String {
        self.message.clone()
    }
}

/// One line of a program listing
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct DisassemblyLine {
    address: usize,
    bytes: Vec<u8>,
    mnemonic: String,
    text: String,
}

#[wasm_bindgen]
impl DisassemblyLine {
    #[wasm_bindgen(getter)]
    pub fn address(&self) -> usize {
        self.address
    }

    #[wasm_bindgen(getter)]
    pub fn bytes(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn mnemonic(&self) -> String {
        self.mnemonic.clone()
    }

    #[wasm_bindgen(getter)]
    pub fn text(&self) -> String {
        self.text.clone()
    }
}

/// Main interpreter interface for JavaScript
#[wasm_bindgen]
pub struct MacroVm {
    vm: Interpreter<EventLog>,
    cycles: Rc<Cell<u32>>,
}

#[wasm_bindgen]
impl MacroVm {
    /// Create an interpreter with the stock compact instruction set
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<MacroVm, JsError> {
        let table = stock_table().map_err(|e| JsError::new(&e.to_string()))?;
        let vm = Interpreter::new(EventLog::new(), table, VmConfig::compact())
            .map_err(|e| JsError::new(&e.to_string()))?;

        Ok(MacroVm {
            vm,
            cycles: Rc::new(Cell::new(0)),
        })
    }

    /// Run a program and return how it finished ("completed", "ended", "stopped")
    ///
    /// Events recorded by earlier runs are discarded.
    pub fn run(&mut self, program: &[u8]) -> Result<String, JsError> {
        self.vm.host_mut().clear();
        self.cycles.set(0);

        match self.vm.run(program) {
            Ok(Outcome::Completed) => Ok("completed".to_string()),
            Ok(Outcome::Ended) => Ok("ended".to_string()),
            Ok(Outcome::Stopped) => Ok("stopped".to_string()),
            Err(e) => Err(JsError::new(&e.to_string())),
        }
    }

    /// Abort runs that execute more than `limit` instructions (0 disables)
    pub fn set_step_limit(&mut self, limit: u32) {
        if limit == 0 {
            self.vm.set_watchdog(None);
            return;
        }

        let cycles = Rc::clone(&self.cycles);
        self.vm.set_watchdog(Some(Box::new(move || {
            let count = cycles.get() + 1;
            cycles.set(count);
            if count > limit {
                WatchdogStatus::Expired
            } else {
                WatchdogStatus::Fed
            }
        })));
    }

    /// Mnemonics of the peripheral instructions the last run executed
    pub fn events(&self) -> js_sys::Array {
        self.vm
            .host()
            .ops()
            .into_iter()
            .map(|op| JsValue::from_str(op.mnemonic()))
            .collect()
    }

    /// One-letter tag and offset of the last abort, e.g. "E@0x000A"
    pub fn last_error(&self) -> Option<String> {
        self.vm
            .last_error()
            .map(|e| format!("{}@0x{:04X}", e.kind.tag(), e.address))
    }

    /// Disassemble a program with the stock instruction set
    pub fn disassemble(&self, program: &[u8]) -> Vec<JsValue> {
        disassemble(program, self.vm.table(), self.vm.config())
            .iter()
            .map(|listing| {
                let line = DisassemblyLine {
                    address: listing.address,
                    bytes: listing.bytes.clone(),
                    mnemonic: listing.mnemonic.to_string(),
                    text: format_listing(listing),
                };
                JsValue::from(line)
            })
            .collect()
    }
}
