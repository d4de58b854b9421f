//! Fuzz target for the disassembler.
//!
//! This target feeds arbitrary byte sequences to the disassembler
//! to find edge cases and crashes in instruction sizing and decoding.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use macro_vm::disassembler::format_listing;
use macro_vm::instructions::{stock_table, EventLog};
use macro_vm::{disassemble, VmConfig};

/// Complete fuzz input
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    bytes: Vec<u8>,
    extended: bool,
    fixed: bool,
}

fuzz_target!(|input: FuzzInput| {
    // Limit input size to prevent OOM
    if input.bytes.len() > 65536 {
        return;
    }

    let mut config = if input.extended {
        VmConfig::extended()
    } else {
        VmConfig::compact()
    };
    if input.fixed {
        config = config.fixed();
    }

    let table = stock_table::<EventLog>().expect("stock table is valid");
    let listings = disassemble(&input.bytes, &table, config);

    // Verify invariants
    let mut expected_address = 0;

    for listing in &listings {
        // Listings are contiguous
        assert_eq!(listing.address, expected_address);

        // Size is 1 byte for data, otherwise the class or record length
        assert!(!listing.bytes.is_empty());
        assert!(listing.bytes.len() <= config.width.fixed_length());
        assert_eq!(
            &input.bytes[listing.address..listing.address + listing.bytes.len()],
            listing.bytes.as_slice()
        );

        let _ = format_listing(listing);
        expected_address += listing.bytes.len();
    }

    // Total size should equal input size
    assert_eq!(expected_address, input.bytes.len());
});
