use std::sync::{Arc, Mutex};

use crate::data::FetchEvent;

/// Receives the engine's begin/tick/error notifications.
///
/// Ticks may arrive many times per second; the engine does no coalescing,
/// so throttling display work is up to the sink.
pub trait EventSink: Send + Sync {
    fn fetch_begin(&self, url: &str);

    fn progress_start(&self);

    fn progress_tick(&self, current: u64, total: u64);

    fn error(&self, message: &str);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn fetch_begin(&self, url: &str) { (**self).fetch_begin(url) }

    fn progress_start(&self) { (**self).progress_start() }

    fn progress_tick(&self, current: u64, total: u64) { (**self).progress_tick(current, total) }

    fn error(&self, message: &str) { (**self).error(message) }
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn fetch_begin(&self, url: &str) { tracing::info!(url, "fetch started") }

    fn progress_start(&self) {}

    fn progress_tick(&self, current: u64, total: u64) { tracing::trace!(current, total, "progress") }

    fn error(&self, message: &str) { tracing::error!("{message}") }
}

/// Records every event in order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<FetchEvent>>,
}

impl EventLog {
    pub fn new() -> Self { Self::default() }

    /// A copy of everything recorded so far.
    pub fn events(&self) -> Vec<FetchEvent> { self.lock().clone() }

    pub fn count(&self, pred: impl Fn(&FetchEvent) -> bool) -> usize {
        self.lock().iter().filter(|e| pred(e)).count()
    }

    pub fn errors(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                FetchEvent::Error(msg) => Some(msg.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) { self.lock().clear() }

    fn push(&self, event: FetchEvent) { self.lock().push(event) }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<FetchEvent>> {
        // A panic while holding the lock leaves the log usable.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSink for EventLog {
    fn fetch_begin(&self, url: &str) { self.push(FetchEvent::Begin { url: url.to_string() }) }

    fn progress_start(&self) { self.push(FetchEvent::ProgressStart) }

    fn progress_tick(&self, current: u64, total: u64) { self.push(FetchEvent::Tick { current, total }) }

    fn error(&self, message: &str) { self.push(FetchEvent::Error(message.to_string())) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_log_records_in_order() {
        let log = Arc::new(EventLog::new());
        let sink: Arc<dyn EventSink> = log.clone();

        sink.fetch_begin("http://mirror/pkg.txz");
        sink.progress_start();
        sink.progress_tick(10, 20);
        sink.error("boom");

        assert_eq!(log.events(), vec![
            FetchEvent::Begin {
                url: "http://mirror/pkg.txz".to_string(),
            },
            FetchEvent::ProgressStart,
            FetchEvent::Tick {
                current: 10,
                total:   20,
            },
            FetchEvent::Error("boom".to_string()),
        ]);
        assert_eq!(log.errors(), vec!["boom".to_string()]);
        assert_eq!(log.count(|e| matches!(e, FetchEvent::Tick { .. })), 1);

        log.clear();
        assert!(log.events().is_empty());
    }
}
