//! Panic values - error propagation across the native boundary
//!
//! Design: The host runtime signals failure by transferring control to the
//! nearest checkpoint instead of unwinding. On the Rust side that transfer
//! is an ordinary `Err(Panic)` carried through `?`, so every call boundary
//! that can observe it is a guaranteed-release block. No cleanup handler
//! runs besides what the propagation path itself performs (see
//! `Fiber::invoke` for scratch reclamation on the panic path).

use std::fmt;

use crate::format;
use crate::value::Value;

/// Failure taxonomy of the call convention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PanicKind {
    /// Argument count out of the allowed range
    Arity,
    /// Value present but of the wrong kind
    Type,
    /// Value of the correct kind but an invalid position
    Index,
    /// Value of the correct kind but an invalid shape
    Value,
    /// Raised explicitly by native logic
    User,
}

impl PanicKind {
    /// Label used as the message prefix
    #[inline]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Arity => "arity error",
            Self::Type => "type error",
            Self::Index => "index error",
            Self::Value => "value error",
            Self::User => "error",
        }
    }
}

/// A raised error value in flight toward the nearest checkpoint
#[derive(Debug, Clone, PartialEq)]
pub struct Panic {
    kind: PanicKind,
    payload: Value,
}

impl Panic {
    /// Raise an arbitrary value (user panic by value)
    #[inline]
    pub fn raise(value: Value) -> Self {
        Self { kind: PanicKind::User, payload: value }
    }

    /// Raise a plain message (user panic by message)
    #[inline]
    pub fn message(msg: impl Into<String>) -> Self {
        Self { kind: PanicKind::User, payload: Value::from(msg.into()) }
    }

    /// Raise a formatted message built with the conversion table.
    ///
    /// A malformed format spec surfaces as the formatter's own panic
    /// rather than a partially rendered message.
    pub fn formatted(spec: &str, args: &[Value]) -> Self {
        match format::vformat(spec, args) {
            Ok(msg) => Self::message(msg),
            Err(p) => p,
        }
    }

    /// Arity violation detected by the validator
    #[inline]
    pub fn arity(msg: impl Into<String>) -> Self {
        Self { kind: PanicKind::Arity, payload: Value::from(msg.into()) }
    }

    /// Kind mismatch detected by an accessor
    #[inline]
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self { kind: PanicKind::Type, payload: Value::from(msg.into()) }
    }

    /// Invalid position detected by a normalizer
    #[inline]
    pub fn index(msg: impl Into<String>) -> Self {
        Self { kind: PanicKind::Index, payload: Value::from(msg.into()) }
    }

    /// Invalid shape detected by a normalizer or the formatter
    #[inline]
    pub fn value_error(msg: impl Into<String>) -> Self {
        Self { kind: PanicKind::Value, payload: Value::from(msg.into()) }
    }

    #[inline]
    pub fn kind(&self) -> PanicKind {
        self.kind
    }

    /// The raised value, usually a message string
    #[inline]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Consume the panic, yielding the raised value to a supervisor
    #[inline]
    pub fn into_payload(self) -> Value {
        self.payload
    }
}

impl fmt::Display for Panic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Value::Str(s) => write!(f, "{}: {}", self.kind.label(), s),
            other => write!(f, "{}: {}", self.kind.label(), format::describe(other)),
        }
    }
}

impl std::error::Error for Panic {}
