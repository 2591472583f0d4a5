// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Progress reporting seam between the engine and its driver.

/// Receives the engine's round counter on every tick.
///
/// The round counter is the minimum round reached by any live particle,
/// so it only advances once the slowest particle has been through a
/// scheduling cycle.
pub trait ProgressSink: Send + Sync {
    /// Called once per tick with the current round.
    fn on_round(&self, round: u64);
}

/// Sink that discards all progress events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_round(&self, _round: u64) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Latest(AtomicU64);

    impl ProgressSink for Latest {
        fn on_round(&self, round: u64) {
            self.0.store(round, Ordering::SeqCst);
        }
    }

    #[test]
    fn sinks_are_object_safe_and_shareable() {
        let latest = Arc::new(Latest::default());
        let sink: Arc<dyn ProgressSink> = latest.clone();
        sink.on_round(3);
        assert_eq!(latest.0.load(Ordering::SeqCst), 3);
        NullProgressSink.on_round(42);
    }
}
