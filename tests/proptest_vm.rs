//! Property-based tests for interpreter invariants.
//!
//! These tests use proptest to check that the execution loop stays within
//! the program, terminates, and reports errors consistently for arbitrary
//! byte images and generated programs.

use macro_vm::instructions::{stock_table, EventLog, StockOp};
use macro_vm::{
    fold_index, ErrorKind, Interpreter, LengthClass, OpcodeSpace, Outcome, ProgramBuilder,
    VmConfig, WatchdogStatus,
};
use proptest::prelude::*;
use std::cell::Cell;
use std::rc::Rc;

/// Upper bound on cycles per run; arbitrary images may loop forever.
const CYCLE_LIMIT: u32 = 2_000;

/// Helper function to create a stock interpreter with a cycle counter
fn setup_vm(config: VmConfig) -> (Interpreter<EventLog>, Rc<Cell<u32>>) {
    let mut vm = Interpreter::new(EventLog::new(), stock_table().unwrap(), config).unwrap();
    let cycles = Rc::new(Cell::new(0u32));
    let counter = Rc::clone(&cycles);
    vm.set_watchdog(Some(Box::new(move || {
        counter.set(counter.get() + 1);
        if counter.get() > CYCLE_LIMIT {
            WatchdogStatus::Expired
        } else {
            WatchdogStatus::Fed
        }
    })));
    (vm, cycles)
}

/// Stock opcodes that never transfer control
fn straight_line_ops() -> Vec<StockOp> {
    StockOp::ALL
        .iter()
        .copied()
        .filter(|op| *op != StockOp::Jmp)
        .collect()
}

/// Stock opcodes whose instructions are longer than two bytes
fn wide_ops() -> Vec<StockOp> {
    StockOp::ALL
        .iter()
        .copied()
        .filter(|op| matches!(op.class(), LengthClass::Single | LengthClass::Dual))
        .collect()
}

/// An opcode plus raw operand material
type OpSpec = (StockOp, u8, u16, u8, u16);

fn op_spec(ops: Vec<StockOp>) -> impl Strategy<Value = OpSpec> {
    (
        prop::sample::select(ops),
        any::<u8>(),
        any::<u16>(),
        any::<u8>(),
        any::<u16>(),
    )
}

fn encode(builder: &mut ProgramBuilder, (op, t1, v1, t2, v2): OpSpec) {
    let opcode = op.opcode();
    match op.class() {
        LengthClass::NoOperand => {
            builder.no_operand(opcode);
        }
        LengthClass::Narrow => {
            builder.narrow(opcode, t1);
        }
        LengthClass::Single => {
            builder.single(opcode, t1, v1 as u32).unwrap();
        }
        LengthClass::Dual => {
            builder.dual(opcode, (t1, v1 as u32), (t2, v2 as u32)).unwrap();
        }
        LengthClass::DualExt => unreachable!("no stock opcode uses the extension pair"),
    }
}

fn config_for(extended: bool, fixed: bool) -> VmConfig {
    let config = if extended {
        VmConfig::extended()
    } else {
        VmConfig::compact()
    };
    if fixed {
        config.fixed()
    } else {
        config
    }
}

fn space() -> impl Strategy<Value = OpcodeSpace> {
    prop_oneof![
        Just(OpcodeSpace::Base256),
        Just(OpcodeSpace::Ext512),
        Just(OpcodeSpace::Ext1024),
        Just(OpcodeSpace::Ext2048),
    ]
}

// ========== Safety Property Tests ==========

proptest! {
    /// Property: Any byte image runs without panicking, and every abort points
    /// inside the program and is mirrored by `last_error`
    #[test]
    fn prop_arbitrary_bytes_stay_in_bounds(
        bytes in prop::collection::vec(any::<u8>(), 0..128),
        extended in any::<bool>(),
        fixed in any::<bool>(),
    ) {
        let (mut vm, cycles) = setup_vm(config_for(extended, fixed));

        match vm.run(&bytes) {
            Ok(outcome) => {
                prop_assert_ne!(outcome, Outcome::Stopped);
                prop_assert!(vm.last_error().is_none());
            }
            Err(err) => {
                prop_assert!(
                    err.address < bytes.len(),
                    "abort address 0x{:04X} outside a {}-byte program",
                    err.address,
                    bytes.len()
                );
                prop_assert_eq!(vm.last_error(), Some(&err));
                if err.kind == ErrorKind::Watchdog {
                    prop_assert_eq!(cycles.get(), CYCLE_LIMIT + 1);
                }
            }
        }
    }

    /// Property: run_len never reads past the requested length
    #[test]
    fn prop_run_len_ignores_tail(
        bytes in prop::collection::vec(any::<u8>(), 0..64),
        tail in prop::collection::vec(any::<u8>(), 0..16),
    ) {
        let (mut short, _) = setup_vm(VmConfig::compact());
        let (mut padded, _) = setup_vm(VmConfig::compact());

        let mut image = bytes.clone();
        image.extend_from_slice(&tail);

        prop_assert_eq!(short.run(&bytes), padded.run_len(&image, bytes.len()));
        prop_assert_eq!(short.host().events(), padded.host().events());
    }
}

// ========== Termination Property Tests ==========

proptest! {
    /// Property: A program without jumps executes each instruction exactly
    /// once and completes at the end of the program
    #[test]
    fn prop_straight_line_program_runs_each_instruction_once(
        specs in prop::collection::vec(op_spec(straight_line_ops()), 0..40),
    ) {
        let mut builder = ProgramBuilder::new(VmConfig::compact().width);
        for spec in &specs {
            encode(&mut builder, *spec);
        }
        let program = builder.build();

        let (mut vm, cycles) = setup_vm(VmConfig::compact());
        prop_assert_eq!(vm.run(&program), Ok(Outcome::Completed));
        prop_assert_eq!(cycles.get() as usize, specs.len());
        prop_assert_eq!(vm.pc(), program.len());

        let forwarded: Vec<StockOp> = specs
            .iter()
            .map(|spec| spec.0)
            .filter(|op| *op != StockOp::Nop)
            .collect();
        prop_assert_eq!(vm.host().ops(), forwarded);
    }

    /// Property: Cutting bytes off the last instruction is a length error at
    /// that instruction, and nothing after the last complete one runs
    #[test]
    fn prop_truncated_instruction_is_length_error(
        specs in prop::collection::vec(op_spec(straight_line_ops()), 0..20),
        last in op_spec(wide_ops()),
        cut in 1usize..4,
    ) {
        let mut builder = ProgramBuilder::new(VmConfig::compact().width);
        for spec in &specs {
            encode(&mut builder, *spec);
        }
        let offset = builder.len();
        encode(&mut builder, last);
        let mut program = builder.build();
        program.truncate(program.len() - cut);

        let (mut vm, _) = setup_vm(VmConfig::compact());
        let err = vm.run(&program).unwrap_err();
        prop_assert_eq!(err.kind, ErrorKind::Length);
        prop_assert_eq!(err.address, offset);
        prop_assert_eq!(err.instruction, macro_vm::Instruction::default());
    }
}

// ========== Restart Property Tests ==========

proptest! {
    /// Property: A run is unaffected by whatever the previous run left behind
    #[test]
    fn prop_runs_are_independent(
        first in prop::collection::vec(any::<u8>(), 0..64),
        specs in prop::collection::vec(op_spec(straight_line_ops()), 0..20),
    ) {
        let mut builder = ProgramBuilder::new(VmConfig::compact().width);
        for spec in &specs {
            encode(&mut builder, *spec);
        }
        let second = builder.build();

        let (mut reused, cycles) = setup_vm(VmConfig::compact());
        let _ = reused.run(&first);
        reused.host_mut().clear();
        cycles.set(0);
        let reused_result = reused.run(&second);

        let (mut fresh, _) = setup_vm(VmConfig::compact());
        let fresh_result = fresh.run(&second);

        prop_assert_eq!(reused_result, fresh_result);
        prop_assert_eq!(reused.pc(), fresh.pc());
        prop_assert_eq!(reused.last_error(), fresh.last_error());
        prop_assert_eq!(reused.host().events(), fresh.host().events());
    }
}

// ========== Folding Property Tests ==========

proptest! {
    /// Property: Folded indices stay inside the space and keep the base byte
    #[test]
    fn prop_fold_index_within_space(
        opcode in any::<u8>(),
        types in any::<[u8; 3]>(),
        space in space(),
    ) {
        let index = fold_index(opcode, types, space);
        prop_assert!((index as usize) < space.size());
        prop_assert_eq!(index & 0xFF, opcode as u16);
    }

    /// Property: Only the high bit of a type byte matters
    #[test]
    fn prop_fold_index_ignores_low_bits(
        opcode in any::<u8>(),
        types in any::<[u8; 3]>(),
        space in space(),
    ) {
        let masked = [types[0] & 0x80, types[1] & 0x80, types[2] & 0x80];
        prop_assert_eq!(
            fold_index(opcode, types, space),
            fold_index(opcode, masked, space)
        );
    }
}
