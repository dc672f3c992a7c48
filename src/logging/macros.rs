//! Macro re-exports so call sites can import every logging macro from
//! `crate::logging` alongside the layer-specific helpers.

pub use tracing::{debug, error, info, trace, warn};
