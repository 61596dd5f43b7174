//! Shared handles injected into both the audio callback and the render loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{Exchange, Mode, SharedControl, SharedMode};

/// One analysis session: fixed frame size, zeroed buffers, shared state.
///
/// Cloning is cheap and yields handles to the same session.
#[derive(Debug, Clone)]
pub struct Session {
    pub exchange: Arc<Exchange>,
    pub mode: Arc<SharedMode>,
    pub control: Arc<SharedControl>,
    fault: Arc<AtomicBool>,
}

impl Session {
    pub fn new(frame_size: usize, mode: Mode) -> Self {
        Self {
            exchange: Arc::new(Exchange::new(frame_size)),
            mode: Arc::new(SharedMode::new(mode)),
            control: Arc::new(SharedControl::default()),
            fault: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark the session as unrecoverable; the render loop shuts down
    pub fn raise_fault(&self) {
        self.fault.store(true, Ordering::Release);
    }

    pub fn is_faulted(&self) -> bool {
        self.fault.load(Ordering::Acquire)
    }
}
