//! Scratch allocation - transient blocks bounded by the collection cycle
//!
//! Design: Raw blocks from the global allocator, registered in a
//! process-wide concurrent map keyed by address. `release` is the fast
//! path; anything still registered when a sweep runs is reclaimed then.
//! This bound is what keeps the panic path safe without cleanup
//! handlers: a block orphaned by an unwinding call survives at most one
//! collection cycle, never indefinitely.
//!
//! Blocks are raw memory; staying within the requested size is the
//! native author's contract, as it is for the host's own allocator.


use std::alloc::{alloc, dealloc, handle_alloc_error, realloc, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::logging::{log_scratch_alloc, log_scratch_release, log_sweep_complete, warn};

/// Alignment of every scratch block
const SCRATCH_ALIGN: usize = 8;

/// Process-wide scratch registry with sweep-based reclamation
pub struct ScratchPool {
    blocks: DashMap<usize, Layout>,
    live_bytes: AtomicUsize,
    cycles: AtomicUsize,
    sweep_gate: Mutex<()>,
}

impl ScratchPool {
    pub fn new() -> Self {
        Self {
            blocks: DashMap::with_capacity(64),
            live_bytes: AtomicUsize::new(0),
            cycles: AtomicUsize::new(0),
            sweep_gate: Mutex::new(()),
        }
    }

    /// Allocate a block and register it for the current cycle.
    ///
    /// Zero-size requests return a dangling, well-aligned pointer that is
    /// never registered; `release` accepts it as a no-op.
    pub fn alloc(&self, size: usize) -> NonNull<u8> {
        if size == 0 {
            return NonNull::dangling();
        }
        let layout = match Layout::from_size_align(size, SCRATCH_ALIGN) {
            Ok(layout) => layout,
            Err(_) => panic!("scratch allocation of {size} bytes exceeds layout limits"),
        };
        let raw = unsafe { alloc(layout) };
        let Some(ptr) = NonNull::new(raw) else {
            handle_alloc_error(layout);
        };

        self.blocks.insert(ptr.as_ptr() as usize, layout);
        self.live_bytes.fetch_add(size, Ordering::Relaxed);
        log_scratch_alloc(size, ptr.as_ptr() as usize);
        ptr
    }

    /// Resize a registered block, preserving its prefix.
    ///
    /// An unregistered address is a usage error: it is logged and
    /// answered with a fresh allocation so the caller still gets usable
    /// memory. Resizing to zero releases the block.
    pub fn realloc(&self, ptr: NonNull<u8>, new_size: usize) -> NonNull<u8> {
        if new_size == 0 {
            self.release(ptr);
            return NonNull::dangling();
        }
        let addr = ptr.as_ptr() as usize;
        let Some((_, old_layout)) = self.blocks.remove(&addr) else {
            warn!(event = "scratch_realloc_untracked", address = addr, "realloc of untracked scratch block");
            return self.alloc(new_size);
        };

        let raw = unsafe { realloc(ptr.as_ptr(), old_layout, new_size) };
        let new_layout = match Layout::from_size_align(new_size, SCRATCH_ALIGN) {
            Ok(layout) => layout,
            Err(_) => panic!("scratch allocation of {new_size} bytes exceeds layout limits"),
        };
        let Some(new_ptr) = NonNull::new(raw) else {
            handle_alloc_error(new_layout);
        };

        self.blocks.insert(new_ptr.as_ptr() as usize, new_layout);
        self.live_bytes.fetch_add(new_size, Ordering::Relaxed);
        self.live_bytes.fetch_sub(old_layout.size(), Ordering::Relaxed);
        new_ptr
    }

    /// Release a block before the sweep would reclaim it.
    ///
    /// Releasing an address the pool does not own is never silent: the
    /// double release is logged and the memory is left untouched.
    pub fn release(&self, ptr: NonNull<u8>) {
        let addr = ptr.as_ptr() as usize;
        if self.release_addr(addr) {
            return;
        }
        if addr == NonNull::<u8>::dangling().as_ptr() as usize {
            return; // zero-size block, never registered
        }
        warn!(event = "scratch_release_untracked", address = addr, "release of untracked scratch block");
    }

    /// Release by raw address; used by the unwind path, which may hold
    /// addresses the native already released. Returns whether the pool
    /// owned the block.
    pub(crate) fn release_addr(&self, addr: usize) -> bool {
        match self.blocks.remove(&addr) {
            Some((_, layout)) => {
                unsafe { dealloc(addr as *mut u8, layout) };
                self.live_bytes.fetch_sub(layout.size(), Ordering::Relaxed);
                log_scratch_release(addr);
                true
            }
            None => false,
        }
    }

    /// Collection sweep: reclaim every block still registered.
    ///
    /// Sweeps are serialized; allocation during a sweep is assumed
    /// externally quiesced (stop-the-world), matching the host collector.
    pub fn sweep(&self) -> usize {
        let _gate = self.sweep_gate.lock();
        let start = Instant::now();

        let addrs: Vec<usize> = self.blocks.iter().map(|entry| *entry.key()).collect();
        let mut reclaimed = 0;
        for addr in addrs {
            if self.release_addr(addr) {
                reclaimed += 1;
            }
        }

        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        log_sweep_complete(start.elapsed().as_micros() as u64, reclaimed, cycle);
        reclaimed
    }

    /// Blocks currently registered (and therefore still valid)
    #[inline]
    pub fn registered(&self) -> usize {
        self.blocks.len()
    }

    /// Bytes held by registered blocks
    #[inline]
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::Relaxed)
    }

    /// Completed collection cycles
    #[inline]
    pub fn cycle(&self) -> usize {
        self.cycles.load(Ordering::Relaxed)
    }

    /// Snapshot for monitoring and tests
    pub fn stats(&self) -> ScratchStats {
        ScratchStats {
            registered_blocks: self.registered(),
            live_bytes: self.live_bytes(),
            cycles: self.cycle(),
        }
    }
}

impl Default for ScratchPool {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScratchPool {
    fn drop(&mut self) {
        // Final sweep so pool teardown can never leak registered blocks
        self.sweep();
    }
}

/// Scratch pool statistics for monitoring
#[derive(Debug, Clone, Copy)]
pub struct ScratchStats {
    pub registered_blocks: usize,
    pub live_bytes: usize,
    pub cycles: usize,
}
