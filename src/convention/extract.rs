//! Typed extraction - one generic core, an enumerable named surface
//!
//! Design: A single `FromValue` decode parameterized over the target
//! kind, backed by a tagged-union match, instead of one hand-written
//! getter per kind. The named accessors are thin wrappers kept for the
//! closed surface native authors enumerate against.
//!
//! Required getters assume the arity validator already ran: slot bounds
//! are the caller's contract, checked only in debug builds.

use std::cell::RefCell;
use std::rc::Rc;

use crate::fiber::{Fiber, NativeFunction};
use crate::format::describe;
use crate::panic::Panic;
use crate::value::{
    AbstractValue, SharedArray, SharedBuffer, SharedStruct, SharedTable, Value,
};

use super::arity;

/// Exact integral range of f64 (2^53)
const EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Decode a tagged value into a native type
pub trait FromValue: Sized {
    /// Kind text used in mismatch messages
    fn expected() -> &'static str;

    /// Convert; `None` on kind mismatch or unrepresentable value
    fn from_value(v: &Value) -> Option<Self>;
}

impl FromValue for Value {
    fn expected() -> &'static str {
        "value"
    }
    fn from_value(v: &Value) -> Option<Self> {
        Some(v.clone())
    }
}

impl FromValue for bool {
    fn expected() -> &'static str {
        "boolean"
    }
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromValue for f64 {
    fn expected() -> &'static str {
        "number"
    }
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl FromValue for i32 {
    fn expected() -> &'static str {
        "32 bit integer"
    }
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n)
                if n.fract() == 0.0 && *n >= i32::MIN as f64 && *n <= i32::MAX as f64 =>
            {
                Some(*n as i32)
            }
            _ => None,
        }
    }
}

impl FromValue for i64 {
    fn expected() -> &'static str {
        "64 bit integer"
    }
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) if n.fract() == 0.0 && n.abs() <= EXACT_INT => Some(*n as i64),
            _ => None,
        }
    }
}

impl FromValue for usize {
    fn expected() -> &'static str {
        "size"
    }
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) if n.fract() == 0.0 && *n >= 0.0 && *n <= EXACT_INT => {
                Some(*n as usize)
            }
            _ => None,
        }
    }
}

impl FromValue for Rc<str> {
    fn expected() -> &'static str {
        "string"
    }
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for SharedBuffer {
    fn expected() -> &'static str {
        "buffer"
    }
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Buffer(b) => Some(b.clone()),
            _ => None,
        }
    }
}

impl FromValue for SharedArray {
    fn expected() -> &'static str {
        "array"
    }
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Array(a) => Some(a.clone()),
            _ => None,
        }
    }
}

impl FromValue for SharedTable {
    fn expected() -> &'static str {
        "table"
    }
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Table(t) => Some(t.clone()),
            _ => None,
        }
    }
}

impl FromValue for SharedStruct {
    fn expected() -> &'static str {
        "struct"
    }
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Struct(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromValue for Rc<NativeFunction> {
    fn expected() -> &'static str {
        "function"
    }
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Function(f) => Some(f.clone()),
            _ => None,
        }
    }
}

impl FromValue for Rc<RefCell<Fiber>> {
    fn expected() -> &'static str {
        "fiber"
    }
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Fiber(f) => Some(f.clone()),
            _ => None,
        }
    }
}

impl FromValue for Rc<dyn AbstractValue> {
    fn expected() -> &'static str {
        "abstract"
    }
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Abstract(a) => Some(a.clone()),
            _ => None,
        }
    }
}

impl FromValue for *const () {
    fn expected() -> &'static str {
        "pointer"
    }
    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Pointer(p) => Some(*p),
            _ => None,
        }
    }
}

fn bad_slot(n: usize, expected: &str, got: &Value) -> Panic {
    let msg = match got {
        // the kind name and the dump coincide for nil
        Value::Nil => format!("bad slot #{n}, expected {expected}, got nil"),
        other => format!(
            "bad slot #{n}, expected {expected}, got {} {}",
            other.kind().name(),
            describe(other)
        ),
    };
    Panic::type_error(msg)
}

/// Borrowed view of a call's argument vector.
///
/// The borrow ends with the native body, so no reference into the vector
/// can outlive the call that produced it.
#[derive(Debug, Clone, Copy)]
pub struct Args<'a> {
    values: &'a [Value],
}

impl<'a> Args<'a> {
    #[inline]
    pub fn new(values: &'a [Value]) -> Self {
        Self { values }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The underlying vector, for re-dispatch and varargs tails
    #[inline]
    pub fn raw(&self) -> &'a [Value] {
        self.values
    }

    /// Raw slot access. Caller guarantees `n < count()`.
    #[inline]
    pub fn slot(&self, n: usize) -> &'a Value {
        debug_assert!(n < self.values.len(), "slot index past validated arity");
        &self.values[n]
    }

    /// `check_exact` against this vector's count
    #[inline]
    pub fn arity_exact(&self, expected: usize) -> Result<(), Panic> {
        arity::check_exact(self.count(), expected)
    }

    /// `check_range` against this vector's count
    #[inline]
    pub fn arity(&self, min: usize, max: Option<usize>) -> Result<(), Panic> {
        arity::check_range(self.count(), min, max)
    }

    /// Required extraction. Caller guarantees `n < count()`.
    pub fn get<T: FromValue>(&self, n: usize) -> Result<T, Panic> {
        let v = self.slot(n);
        T::from_value(v).ok_or_else(|| bad_slot(n, T::expected(), v))
    }

    /// Optional extraction: `default` when the slot is absent or nil,
    /// otherwise exactly the required behavior.
    pub fn opt<T: FromValue>(&self, n: usize, default: T) -> Result<T, Panic> {
        match self.values.get(n) {
            None => Ok(default),
            Some(Value::Nil) => Ok(default),
            Some(v) => T::from_value(v).ok_or_else(|| bad_slot(n, T::expected(), v)),
        }
    }

    #[inline]
    pub fn boolean(&self, n: usize) -> Result<bool, Panic> {
        self.get(n)
    }

    #[inline]
    pub fn number(&self, n: usize) -> Result<f64, Panic> {
        self.get(n)
    }

    #[inline]
    pub fn int32(&self, n: usize) -> Result<i32, Panic> {
        self.get(n)
    }

    #[inline]
    pub fn int64(&self, n: usize) -> Result<i64, Panic> {
        self.get(n)
    }

    #[inline]
    pub fn size(&self, n: usize) -> Result<usize, Panic> {
        self.get(n)
    }

    /// Natural number: a non-negative 64 bit integer
    pub fn nat(&self, n: usize) -> Result<i64, Panic> {
        let x = self.get::<i64>(n)?;
        if x < 0 {
            return Err(Panic::type_error(format!(
                "bad slot #{n}, expected non-negative 64 bit integer, got {x}"
            )));
        }
        Ok(x)
    }

    /// Optional natural number with a default
    pub fn opt_nat(&self, n: usize, default: i64) -> Result<i64, Panic> {
        debug_assert!(default >= 0);
        match self.values.get(n) {
            None | Some(Value::Nil) => Ok(default),
            Some(_) => self.nat(n),
        }
    }

    #[inline]
    pub fn string(&self, n: usize) -> Result<Rc<str>, Panic> {
        self.get(n)
    }

    #[inline]
    pub fn buffer(&self, n: usize) -> Result<SharedBuffer, Panic> {
        self.get(n)
    }

    #[inline]
    pub fn array(&self, n: usize) -> Result<SharedArray, Panic> {
        self.get(n)
    }

    #[inline]
    pub fn table(&self, n: usize) -> Result<SharedTable, Panic> {
        self.get(n)
    }

    #[inline]
    pub fn structure(&self, n: usize) -> Result<SharedStruct, Panic> {
        self.get(n)
    }

    #[inline]
    pub fn function(&self, n: usize) -> Result<Rc<NativeFunction>, Panic> {
        self.get(n)
    }

    #[inline]
    pub fn fiber(&self, n: usize) -> Result<Rc<RefCell<Fiber>>, Panic> {
        self.get(n)
    }

    #[inline]
    pub fn abstract_ref(&self, n: usize) -> Result<Rc<dyn AbstractValue>, Panic> {
        self.get(n)
    }

    #[inline]
    pub fn pointer(&self, n: usize) -> Result<*const (), Panic> {
        self.get(n)
    }

    /// Optional array; absent or nil yields a fresh instance sized from
    /// `hint`. Never a shared default: each call site gets its own.
    pub fn opt_array(&self, n: usize, hint: usize) -> Result<SharedArray, Panic> {
        match self.values.get(n) {
            None | Some(Value::Nil) => Ok(Rc::new(RefCell::new(Vec::with_capacity(hint)))),
            Some(_) => self.get(n),
        }
    }

    /// Optional buffer with a fresh sized instance as the default
    pub fn opt_buffer(&self, n: usize, hint: usize) -> Result<SharedBuffer, Panic> {
        match self.values.get(n) {
            None | Some(Value::Nil) => Ok(Rc::new(RefCell::new(Vec::with_capacity(hint)))),
            Some(_) => self.get(n),
        }
    }

    /// Optional table with a fresh sized instance as the default
    pub fn opt_table(&self, n: usize, hint: usize) -> Result<SharedTable, Panic> {
        match self.values.get(n) {
            None | Some(Value::Nil) => Ok(Rc::new(RefCell::new(
                std::collections::HashMap::with_capacity(hint),
            ))),
            Some(_) => self.get(n),
        }
    }
}
