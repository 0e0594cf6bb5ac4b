use std::time::Instant;

use log::Level;

/// Logs how long an evaluation phase took when dropped.
///
/// Does nothing unless debug logging is enabled, so the label is only formatted when
/// it will actually be printed.
pub struct PhaseTimer {
    label: Option<String>,
    start: Instant,
}

impl PhaseTimer {
    pub fn debug_lazy<F>(label_gen: F) -> Self
    where
        F: FnOnce() -> String,
    {
        let label = log::log_enabled!(Level::Debug).then(label_gen);
        Self {
            label,
            start: Instant::now(),
        }
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        if let Some(label) = &self.label {
            log::debug!("{} took {:?}", label, self.start.elapsed());
        }
    }
}

/// Run `f`, logging its duration at debug level under a lazily built label.
pub fn measure_phase<T, F, L>(label_gen: L, f: F) -> T
where
    F: FnOnce() -> T,
    L: FnOnce() -> String,
{
    let _timer = PhaseTimer::debug_lazy(label_gen);
    f()
}
