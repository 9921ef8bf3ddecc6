//! A continuous frame loop as an explicit task handle.
//!
//! The host delivers one frame callback per display refresh while a loop is
//! active. Each callback carries the handle it was scheduled for; a callback
//! for a handle that has since been stopped is rejected, so no tick outlives
//! its loop even when the host's frame source fires once more.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopHandle(u64);

impl LoopHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Default)]
pub struct FrameLoop {
    next_id: u64,
    active: Option<LoopHandle>,
    ticks: u64,
}

impl FrameLoop {
    /// Starts the loop, or returns the running handle if it is already active.
    pub fn start(&mut self) -> LoopHandle {
        if let Some(handle) = self.active {
            return handle;
        }
        self.next_id += 1;
        let handle = LoopHandle(self.next_id);
        self.active = Some(handle);
        tracing::debug!(handle = handle.0, "frame loop started");
        handle
    }

    /// Returns the handle that was stopped, if any.
    pub fn stop(&mut self) -> Option<LoopHandle> {
        let stopped = self.active.take();
        if let Some(handle) = stopped {
            tracing::debug!(handle = handle.0, ticks = self.ticks, "frame loop stopped");
        }
        stopped
    }

    pub fn active(&self) -> Option<LoopHandle> {
        self.active
    }

    /// Accepts a frame callback for `handle` and counts it as a tick. Returns
    /// false for stale or foreign handles.
    pub fn accept(&mut self, handle: LoopHandle) -> bool {
        if self.active == Some(handle) {
            self.ticks += 1;
            true
        } else {
            false
        }
    }

    /// Ticks accepted over the lifetime of this loop, across restarts.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_is_idempotent_while_running() {
        let mut frames = FrameLoop::default();
        let a = frames.start();
        let b = frames.start();
        assert_eq!(a, b);
    }

    #[test]
    fn restart_issues_a_fresh_handle_and_rejects_the_old_one() {
        let mut frames = FrameLoop::default();
        let first = frames.start();
        assert!(frames.accept(first));

        assert_eq!(frames.stop(), Some(first));
        assert!(!frames.accept(first));

        let second = frames.start();
        assert_ne!(first, second);
        assert!(!frames.accept(first));
        assert!(frames.accept(second));
        assert_eq!(frames.ticks(), 2);
    }

    #[test]
    fn stop_when_idle_is_harmless() {
        let mut frames = FrameLoop::default();
        assert_eq!(frames.stop(), None);
        assert_eq!(frames.active(), None);
    }
}
