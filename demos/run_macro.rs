//! Key macro example
//!
//! Demonstrates assembling, listing and running a macro program with the
//! stock instruction set.
//!
//! This example shows:
//! - Building a program with `ProgramBuilder`
//! - Printing a disassembly listing
//! - Running it against a recording host
//! - Inspecting the error record of an aborted run

use macro_vm::disassembler::format_program;
use macro_vm::instructions::{stock_table, EventLog, StockOp};
use macro_vm::{disassemble, Interpreter, ProgramBuilder, VmConfig};

fn main() {
    println!("Macro VM - Key Macro Example");
    println!("============================\n");

    let config = VmConfig::compact();

    // Press 'a' (HID 0x04), wait, release, then light LED 1
    let mut builder = ProgramBuilder::new(config.width);
    builder
        .no_operand(StockOp::Clr.opcode())
        .narrow(StockOp::Prt.opcode(), 0x04)
        .no_operand(StockOp::Hidp.opcode());
    builder
        .single(StockOp::Sleep.opcode(), 0x00, 50)
        .expect("value fits")
        .no_operand(StockOp::Clr.opcode())
        .no_operand(StockOp::Hidp.opcode());
    builder
        .dual(StockOp::Led.opcode(), (0x01, 0x0001), (0x00, 0xF800))
        .expect("values fit");
    let program = builder.build();

    let table = stock_table().expect("stock table is valid");
    println!("Program ({} bytes):", program.len());
    println!("-----------------");
    println!("{}\n", format_program(&disassemble(&program, &table, config)));

    let mut vm = Interpreter::new(EventLog::new(), table, config).expect("compact table");

    match vm.run(&program) {
        Ok(outcome) => println!("Run finished: {:?}", outcome),
        Err(err) => println!("Run aborted: {}", err),
    }

    println!("Forwarded to the host:");
    for event in vm.host().events() {
        println!(
            "  {:<6} dst_type=0x{:02X} dst=0x{:04X}",
            event.op.mnemonic(),
            event.instruction.dst_type,
            event.instruction.dst
        );
    }

    // A truncated copy aborts with a length error
    let truncated = &program[..program.len() - 3];
    println!("\nRunning a truncated copy:");
    if let Err(err) = vm.run(truncated) {
        println!(
            "  [{}] {} (snapshot opcode 0x{:02X})",
            err.kind.tag(),
            err,
            err.instruction.opcode
        );
    }
}
