//! Router event bus (spec §4.9). Every store/retrieve/search/update/delete/
//! cleanup/migrate emits a synchronous, best-effort event; handler failures
//! are logged but never affect the operation itself.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Tier;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RouterEvent {
    Stored { item_id: String, tier: Tier, at: DateTime<Utc> },
    Retrieved { item_id: String, tier: Tier, at: DateTime<Utc> },
    Searched { query: String, result_count: usize, at: DateTime<Utc> },
    Updated { item_id: String, tier: Tier, at: DateTime<Utc> },
    Deleted { item_id: String, tier: Tier, at: DateTime<Utc> },
    CleanedUp { tier: Tier, removed: usize, at: DateTime<Utc> },
    Migrated { from: Tier, to: Tier, moved: usize, at: DateTime<Utc> },
    Promoted { item_id: String, from: Tier, to: Tier, at: DateTime<Utc> },
}

/// Implemented by the excluded telemetry/monitoring layer. The default
/// `NullEventSink` makes the router usable with no sink configured.
pub trait EventSink: Send + Sync {
    /// Must not panic; failures here are the sink's own problem and never
    /// propagate back into the operation that raised the event.
    fn handle(&self, event: &RouterEvent);
}

#[derive(Debug, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn handle(&self, _event: &RouterEvent) {}
}

/// A sink that forwards every event through `tracing` at debug level —
/// useful as the default "ambient" sink so events are at least visible in
/// logs even with no telemetry backend wired up.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn handle(&self, event: &RouterEvent) {
        tracing::debug!(?event, "router event");
    }
}

/// Dispatches to zero or more sinks, catching nothing special because sinks
/// are expected to be infallible (`handle` returns `()`); a sink that wants
/// fallible delivery (e.g. over the network) should swallow its own errors.
#[derive(Clone, Default)]
pub struct EventBus {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn emit(&self, event: RouterEvent) {
        for sink in &self.sinks {
            sink.handle(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink(AtomicUsize);

    impl EventSink for CountingSink {
        fn handle(&self, _event: &RouterEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn bus_fans_out_to_all_sinks() {
        let sink = Arc::new(CountingSink(AtomicUsize::new(0)));
        let bus = EventBus::new().with_sink(sink.clone());
        bus.emit(RouterEvent::Stored {
            item_id: "a".into(),
            tier: Tier::Session,
            at: Utc::now(),
        });
        assert_eq!(sink.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn null_sink_is_inert() {
        let bus = EventBus::new().with_sink(Arc::new(NullEventSink));
        bus.emit(RouterEvent::Deleted {
            item_id: "a".into(),
            tier: Tier::Session,
            at: Utc::now(),
        });
    }
}
