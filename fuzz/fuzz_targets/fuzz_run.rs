//! Fuzz target for the execution loop.
//!
//! This target runs arbitrary byte images under every operand width and
//! length mode, with a watchdog bounding runaway loops.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use macro_vm::instructions::{stock_table, EventLog};
use macro_vm::{Interpreter, VmConfig, WatchdogStatus};

/// Interpreter configuration for fuzzing
#[derive(Debug, Arbitrary)]
struct FuzzConfig {
    /// Use 32-bit operand values
    extended: bool,
    /// Use fixed-length records
    fixed: bool,
    /// Cycles before the watchdog expires
    cycle_limit: u16,
}

/// Complete fuzz input
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    program: Vec<u8>,
    /// Bytes to run; anything past the program must be rejected
    length: u16,
    config: FuzzConfig,
}

fuzz_target!(|input: FuzzInput| {
    // Limit input size to prevent OOM
    if input.program.len() > 4096 {
        return;
    }

    let mut config = if input.config.extended {
        VmConfig::extended()
    } else {
        VmConfig::compact()
    };
    if input.config.fixed {
        config = config.fixed();
    }

    let table = stock_table().expect("stock table is valid");
    let mut vm = Interpreter::new(EventLog::new(), table, config).expect("stock table fits");

    let mut remaining = input.config.cycle_limit;
    vm.set_watchdog(Some(Box::new(move || {
        if remaining == 0 {
            return WatchdogStatus::Expired;
        }
        remaining -= 1;
        WatchdogStatus::Fed
    })));

    let length = input.length as usize;
    match vm.run_len(&input.program, length) {
        Ok(_) => {
            assert!(vm.last_error().is_none());
            assert!(vm.pc() <= length);
        }
        Err(err) => {
            // Every abort is recorded and points inside the program.
            assert_eq!(vm.last_error(), Some(&err));
            if length <= input.program.len() {
                assert!(err.address < length);
            }
        }
    }
});
