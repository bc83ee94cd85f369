//! Phase timing for the evaluation pipeline.

use std::time::Instant;

/// RAII timer that adds the elapsed wall-clock time, in milliseconds, to a
/// slot when dropped.
///
/// ```rust,ignore
/// let mut decode_ms = 0.0;
/// {
///     let _timer = PhaseTimer::new(&mut decode_ms);
///     // ... decode ...
/// }
/// ```
pub struct PhaseTimer<'a> {
    start: Instant,
    slot_ms: &'a mut f64,
}

impl<'a> PhaseTimer<'a> {
    pub fn new(slot_ms: &'a mut f64) -> Self {
        Self {
            start: Instant::now(),
            slot_ms,
        }
    }
}

impl Drop for PhaseTimer<'_> {
    fn drop(&mut self) {
        *self.slot_ms += elapsed_ms(self.start);
    }
}

/// Milliseconds since `start`, with sub-millisecond precision.
pub(crate) fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
