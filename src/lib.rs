//! Veld Runtime - native call convention layer for the Veld language
//!
//! This crate provides the boundary compiled native functions program
//! against when the Veld interpreter calls them: arity validation, typed
//! extraction from tagged values, panic propagation back to the calling
//! fiber's checkpoint, scratch allocation bounded by the collection
//! cycle, and the value-aware message formatter.

pub mod convention;
pub mod fiber;
pub mod format;
pub mod logging;
pub mod panic;
pub mod runtime;
pub mod scratch;
pub mod value;

// Re-export the closed surface native authors enumerate against
pub use convention::{check_exact, check_range, flags, half_range, ring_index, Args, FromValue};
pub use fiber::{CallCtx, Fiber, FiberState, NativeBody, NativeFunction};
pub use format::{canonical, describe, pretty, to_string, vformat, PrettyOptions};
pub use panic::{Panic, PanicKind};
pub use runtime::{Runtime, RuntimeConfig, RuntimeStats};
pub use scratch::{ScratchPool, ScratchStats};
pub use value::{AbstractValue, Kind, SharedArray, SharedBuffer, SharedStruct, SharedTable, Value};

/// Runtime-wide initialization (logging); idempotent
pub fn init() {
    logging::init();
}
