//! Fibers and checkpoints - where panics are delivered
//!
//! Design: Each fiber owns a stack of checkpoints, one per active native
//! call. `Fiber::invoke` is the only place that pushes and pops, and it
//! does both on the `Ok` and `Err` paths alike, so the stack depth after
//! a call always equals the depth before it. A panic is an ordinary
//! `Err` in flight; no destructor discipline is assumed across it.
//! Scratch blocks allocated through the call context are recorded in the
//! owning checkpoint and released when that frame unwinds, tightening
//! the sweep bound to the frame boundary for tracked blocks.

use std::fmt;
use std::ptr::NonNull;

use crate::convention::{check_range, Args};
use crate::logging::{log_native_call, log_native_panic};
use crate::panic::Panic;
use crate::runtime::Runtime;
use crate::value::Value;

/// Body signature of a native function
pub type NativeBody = fn(&mut CallCtx<'_>) -> Result<Value, Panic>;

/// A named native function with its declared arity
pub struct NativeFunction {
    pub name: &'static str,
    pub min_arity: usize,
    pub max_arity: Option<usize>,
    pub body: NativeBody,
}

impl NativeFunction {
    #[inline]
    pub const fn new(
        name: &'static str,
        min_arity: usize,
        max_arity: Option<usize>,
        body: NativeBody,
    ) -> Self {
        Self { name, min_arity, max_arity, body }
    }

    /// Fixed-arity convenience constructor
    #[inline]
    pub const fn fixed(name: &'static str, arity: usize, body: NativeBody) -> Self {
        Self::new(name, arity, Some(arity), body)
    }

    /// Variadic convenience constructor (no upper bound)
    #[inline]
    pub const fn variadic(name: &'static str, min_arity: usize, body: NativeBody) -> Self {
        Self::new(name, min_arity, None, body)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("min_arity", &self.min_arity)
            .field("max_arity", &self.max_arity)
            .finish()
    }
}

/// Panic-engine state of a fiber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiberState {
    /// Executing normally
    Running,
    /// A panic is in flight toward an outer checkpoint
    Panicking,
    /// A panic was observed and absorbed by a supervising call
    Recovered,
    /// A panic left the outermost checkpoint
    Unwound,
}

/// One active native call: the place a panic returns control to
#[derive(Debug)]
struct Checkpoint {
    function: &'static str,
    scratch: Vec<usize>,
}

/// An execution context with its own checkpoint stack
#[derive(Debug)]
pub struct Fiber {
    checkpoints: Vec<Checkpoint>,
    state: FiberState,
}

impl Fiber {
    pub fn new() -> Self {
        Self { checkpoints: Vec::new(), state: FiberState::Running }
    }

    /// Current checkpoint stack depth
    #[inline]
    pub fn depth(&self) -> usize {
        self.checkpoints.len()
    }

    #[inline]
    pub fn state(&self) -> FiberState {
        self.state
    }

    /// Name of the function owning the top checkpoint, if any
    pub fn current_function(&self) -> Option<&'static str> {
        self.checkpoints.last().map(|c| c.function)
    }

    /// Acknowledge a delivered panic and mark the fiber recovered
    pub fn recover(&mut self) {
        if matches!(self.state, FiberState::Panicking | FiberState::Unwound) {
            self.state = FiberState::Recovered;
        }
    }

    /// Checkpointed entry into a native function.
    ///
    /// Gates the declared arity, pushes a checkpoint, runs the body, and
    /// pops the checkpoint on both exits. On the panic path the frame's
    /// tracked scratch blocks are released before the error continues
    /// outward.
    pub fn invoke(
        &mut self,
        func: &NativeFunction,
        args: &[Value],
        rt: &Runtime,
    ) -> Result<Value, Panic> {
        check_range(args.len(), func.min_arity, func.max_arity)?;
        log_native_call(func.name, args.len());

        self.checkpoints.push(Checkpoint { function: func.name, scratch: Vec::new() });
        self.state = FiberState::Running;

        let result = {
            let mut ctx = CallCtx { args: Args::new(args), fiber: &mut *self, rt };
            (func.body)(&mut ctx)
        };

        let frame = self.checkpoints.pop();
        debug_assert!(frame.is_some(), "checkpoint stack underflow");

        match result {
            Ok(value) => {
                if self.state == FiberState::Panicking {
                    // The body absorbed a nested panic and returned normally
                    self.state = FiberState::Recovered;
                }
                Ok(value)
            }
            Err(panic) => {
                if let Some(frame) = frame {
                    for addr in frame.scratch {
                        rt.scratch().release_addr(addr);
                    }
                }
                self.state = if self.checkpoints.is_empty() {
                    FiberState::Unwound
                } else {
                    FiberState::Panicking
                };
                log_native_panic(func.name, panic.kind());
                Err(panic)
            }
        }
    }
}

impl Default for Fiber {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-call view handed to a native body: the argument vector, the
/// owning fiber, and the runtime context.
pub struct CallCtx<'a> {
    pub args: Args<'a>,
    fiber: &'a mut Fiber,
    rt: &'a Runtime,
}

impl CallCtx<'_> {
    #[inline]
    pub fn runtime(&self) -> &Runtime {
        self.rt
    }

    /// Checkpoint depth including this call's own frame
    #[inline]
    pub fn depth(&self) -> usize {
        self.fiber.depth()
    }

    /// Invoke another native on the same fiber
    pub fn call(&mut self, func: &NativeFunction, args: &[Value]) -> Result<Value, Panic> {
        self.fiber.invoke(func, args, self.rt)
    }

    /// Scratch allocation tracked by this call's checkpoint: released on
    /// unwind if the body never releases it, swept otherwise.
    pub fn scratch_alloc(&mut self, size: usize) -> NonNull<u8> {
        let ptr = self.rt.scratch().alloc(size);
        if size > 0 {
            self.track(ptr.as_ptr() as usize);
        }
        ptr
    }

    /// Resize a tracked block, keeping the frame's record current
    pub fn scratch_realloc(&mut self, ptr: NonNull<u8>, new_size: usize) -> NonNull<u8> {
        let old = ptr.as_ptr() as usize;
        let new_ptr = self.rt.scratch().realloc(ptr, new_size);
        let new = new_ptr.as_ptr() as usize;
        if new_size == 0 {
            self.untrack(old);
        } else if !self.retrack(old, new) {
            self.track(new);
        }
        new_ptr
    }

    /// Release a tracked block early
    pub fn scratch_release(&mut self, ptr: NonNull<u8>) {
        self.untrack(ptr.as_ptr() as usize);
        self.rt.scratch().release(ptr);
    }

    fn track(&mut self, addr: usize) {
        if let Some(frame) = self.fiber.checkpoints.last_mut() {
            frame.scratch.push(addr);
        }
    }

    /// Update a recorded address in place, innermost frame first
    fn retrack(&mut self, old: usize, new: usize) -> bool {
        for frame in self.fiber.checkpoints.iter_mut().rev() {
            if let Some(slot) = frame.scratch.iter_mut().find(|a| **a == old) {
                *slot = new;
                return true;
            }
        }
        false
    }

    fn untrack(&mut self, addr: usize) {
        for frame in self.fiber.checkpoints.iter_mut().rev() {
            let before = frame.scratch.len();
            frame.scratch.retain(|a| *a != addr);
            if frame.scratch.len() != before {
                return;
            }
        }
    }
}
