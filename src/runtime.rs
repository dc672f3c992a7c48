//! Runtime context - process-wide collector state, explicitly threaded
//!
//! Design: One `Runtime` owns the scratch pool and its collection
//! policy. It is passed down the call path (or injected once at process
//! start) instead of living in ambient global state, so tests and
//! embedders can hold several isolated runtimes.

use crate::logging::{debug, info};
use crate::scratch::{ScratchPool, ScratchStats};

/// Collection policy knobs
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Registered-block count that triggers `maybe_collect`
    pub sweep_threshold: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self { sweep_threshold: 256 }
    }
}

impl RuntimeConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // VELD_SCRATCH_SWEEP_THRESHOLD: block count before an automatic sweep
        if let Ok(raw) = std::env::var("VELD_SCRATCH_SWEEP_THRESHOLD") {
            if let Ok(threshold) = raw.parse::<usize>() {
                config.sweep_threshold = threshold.max(1);
            }
        }

        config
    }
}

/// Owner of the shared collector-side state of this layer
pub struct Runtime {
    scratch: ScratchPool,
    config: RuntimeConfig,
}

impl Runtime {
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    /// Runtime configured from `VELD_*` environment variables
    pub fn from_env() -> Self {
        Self::with_config(RuntimeConfig::from_env())
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        info!(
            event = "runtime_init",
            sweep_threshold = config.sweep_threshold,
            "Veld runtime context created"
        );
        Self { scratch: ScratchPool::new(), config }
    }

    #[inline]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The process-wide scratch pool
    #[inline]
    pub fn scratch(&self) -> &ScratchPool {
        &self.scratch
    }

    /// Run a collection sweep now; returns reclaimed block count
    pub fn collect(&self) -> usize {
        self.scratch.sweep()
    }

    /// Sweep if the registered block count crossed the threshold
    /// (called after allocation bursts)
    #[inline]
    pub fn maybe_collect(&self) -> bool {
        if self.scratch.registered() >= self.config.sweep_threshold {
            debug!(
                event = "sweep_threshold",
                registered = self.scratch.registered(),
                threshold = self.config.sweep_threshold,
                "scratch threshold exceeded, sweeping"
            );
            self.collect();
            true
        } else {
            false
        }
    }

    /// Snapshot for monitoring
    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats { scratch: self.scratch.stats() }
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Runtime statistics for monitoring
#[derive(Debug, Clone, Copy)]
pub struct RuntimeStats {
    pub scratch: ScratchStats,
}
