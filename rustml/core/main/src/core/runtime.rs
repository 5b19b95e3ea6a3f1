use std::sync::atomic::{AtomicUsize, Ordering};

/// Global threshold for switching softmax from sequential to parallel (rayon).
pub(crate) static SOFTMAX_PAR_THRESHOLD: AtomicUsize = AtomicUsize::new(4096);

/// Runtime configuration for parallelism and thread management.
/// Must be applied (via `apply()`) before any computation to take effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Number of threads for rayon parallelism.
    /// 0 means auto-detect (use all available cores).
    pub num_threads: usize,
    /// Element count below which softmax uses a sequential path (default 4096).
    pub softmax_par_threshold: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            num_threads: 0,
            softmax_par_threshold: 4096,
        }
    }
}

impl RuntimeConfig {
    /// Configuration that keeps every operation on the calling thread.
    pub fn sequential() -> Self {
        Self {
            num_threads: 1,
            softmax_par_threshold: usize::MAX,
        }
    }

    /// Apply this runtime configuration globally.
    ///
    /// Configures rayon's global thread pool when `num_threads > 0` and
    /// stores the parallel thresholds. The rayon pool can only be built once
    /// per process; a second attempt returns an error.
    pub fn apply(&self) -> Result<(), crate::api::error::TensorError> {
        if self.num_threads > 0 {
            rayon::ThreadPoolBuilder::new()
                .num_threads(self.num_threads)
                .build_global()
                .map_err(|e| crate::api::error::TensorError::InvalidOperation(
                    format!("Failed to set rayon thread pool: {}", e)
                ))?;
        }

        SOFTMAX_PAR_THRESHOLD.store(self.softmax_par_threshold, Ordering::Relaxed);

        log::info!(
            "[runtime] rayon threads: {}, softmax parallel threshold: {}",
            rayon::current_num_threads(),
            self.softmax_par_threshold
        );

        Ok(())
    }

    /// Currently active softmax parallel threshold.
    pub fn softmax_par_threshold() -> usize {
        SOFTMAX_PAR_THRESHOLD.load(Ordering::Relaxed)
    }
}
