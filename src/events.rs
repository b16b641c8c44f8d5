//! Governor event notifications.
//!
//! Fire-and-forget observability hooks. A host application (e.g. a status
//! indicator) can subscribe by supplying an [`EventSink`] at construction
//! time; there is no process-wide sink, each governor owns its own.

use crate::Result;
use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Events the governor emits for interested observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GovernorEvent {
    /// The remote service explicitly signaled rate-limit-exceeded; the
    /// governor is pausing outbound requests for `wait`.
    RateLimitExceeded { wait: Duration },
}

/// Destination for governor events.
///
/// Emission is fire-and-forget: a failing sink never affects the
/// caller-facing request path.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn report(&self, event: GovernorEvent) -> Result<()>;
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Default sink: discards everything.
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn report(&self, _event: GovernorEvent) -> Result<()> {
        Ok(())
    }
}

pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoopEventSink)
}

/// In-memory sink for testing.
pub struct InMemoryEventSink {
    events: Arc<RwLock<Vec<GovernorEvent>>>,
    max_events: usize,
}

impl InMemoryEventSink {
    pub fn new(max: usize) -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            max_events: max,
        }
    }

    pub fn events(&self) -> Vec<GovernorEvent> {
        self.events.read().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.write().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.events.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventSink for InMemoryEventSink {
    async fn report(&self, event: GovernorEvent) -> Result<()> {
        let mut events = self.events.write().unwrap();
        events.push(event);
        if events.len() > self.max_events {
            events.remove(0);
        }
        Ok(())
    }
}

/// Composite sink for multiple destinations.
pub struct CompositeEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Default for CompositeEventSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn report(&self, event: GovernorEvent) -> Result<()> {
        for s in &self.sinks {
            let _ = s.report(event.clone()).await;
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        for s in &self.sinks {
            let _ = s.close().await;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_sink_records_events() {
        let sink = InMemoryEventSink::new(8);
        assert!(sink.is_empty());

        sink.report(GovernorEvent::RateLimitExceeded {
            wait: Duration::from_secs(30),
        })
        .await
        .unwrap();

        assert_eq!(sink.len(), 1);
        assert_eq!(
            sink.events()[0],
            GovernorEvent::RateLimitExceeded {
                wait: Duration::from_secs(30)
            }
        );
    }

    #[tokio::test]
    async fn test_in_memory_sink_bounds_buffer() {
        let sink = InMemoryEventSink::new(2);
        for secs in 1..=3u64 {
            sink.report(GovernorEvent::RateLimitExceeded {
                wait: Duration::from_secs(secs),
            })
            .await
            .unwrap();
        }
        let events = sink.events();
        assert_eq!(events.len(), 2);
        // oldest event was evicted
        assert_eq!(
            events[0],
            GovernorEvent::RateLimitExceeded {
                wait: Duration::from_secs(2)
            }
        );
    }

    #[tokio::test]
    async fn test_composite_sink_fans_out() {
        let a = Arc::new(InMemoryEventSink::new(4));
        let b = Arc::new(InMemoryEventSink::new(4));
        let composite = CompositeEventSink::new()
            .add_sink(a.clone())
            .add_sink(b.clone());

        composite
            .report(GovernorEvent::RateLimitExceeded {
                wait: Duration::from_secs(5),
            })
            .await
            .unwrap();

        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }
}
