//! WebAssembly bindings for the macro interpreter.
//!
//! This module provides JavaScript-callable interfaces for running and
//! disassembling macro programs in the browser.

#[cfg(feature = "wasm")]
pub mod api;

#[cfg(feature = "wasm")]
pub use api::MacroVm;
