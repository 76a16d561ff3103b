//! Cooperative stop signal the engine checks between events, per spec.md
//! §5. Modeled on the teacher's `BarrierFlag`.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
pub struct StopSignal(AtomicBool);

impl StopSignal {
    #[inline]
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
