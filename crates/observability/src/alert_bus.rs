//! Process-wide alert bus.
//!
//! Listeners are registered per (level, kind) pair. The registry is
//! pre-populated for every pair so publishing never mutates the map,
//! and dispatch works on a cloned listener list so a slow listener
//! never blocks subscription changes.

use std::sync::{Arc, OnceLock, RwLock};

use tracing::error;

use flexpool_domain::events::{AlertEvent, AlertKind, AlertLevel, AlertMetadata};
use flexpool_domain::ports::AlertListener;

type ListenerRef = Arc<dyn AlertListener>;

/// Listener identity is the allocation address of the Arc, ignoring the
/// vtable half of the fat pointer.
fn same_listener(a: &ListenerRef, b: &ListenerRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// A registered listener, either plain or wrapped in a pool filter.
///
/// The pool filter forwards only events whose `metadata["poolName"]`
/// matches; its identity for unsubscription is (delegate, pool name).
#[derive(Clone)]
enum RegisteredListener {
    Plain(ListenerRef),
    PoolFiltered {
        delegate: ListenerRef,
        pool_name: String,
    },
}

impl RegisteredListener {
    fn delegate(&self) -> &ListenerRef {
        match self {
            RegisteredListener::Plain(listener) => listener,
            RegisteredListener::PoolFiltered { delegate, .. } => delegate,
        }
    }

    fn has_delegate(&self, listener: &ListenerRef) -> bool {
        same_listener(self.delegate(), listener)
    }

    fn is_exactly(&self, listener: &ListenerRef, pool: &str) -> bool {
        match self {
            RegisteredListener::PoolFiltered {
                delegate,
                pool_name,
            } => same_listener(delegate, listener) && pool_name == pool,
            RegisteredListener::Plain(_) => false,
        }
    }

    fn deliver(&self, event: &AlertEvent) -> anyhow::Result<()> {
        match self {
            RegisteredListener::Plain(listener) => listener.on_alert(event),
            RegisteredListener::PoolFiltered {
                delegate,
                pool_name,
            } => {
                if event.pool_name() == Some(pool_name.as_str()) {
                    delegate.on_alert(event)
                } else {
                    Ok(())
                }
            }
        }
    }
}

fn level_index(level: AlertLevel) -> usize {
    match level {
        AlertLevel::Info => 0,
        AlertLevel::Warning => 1,
        AlertLevel::Error => 2,
        AlertLevel::Critical => 3,
    }
}

fn kind_index(kind: AlertKind) -> usize {
    match kind {
        AlertKind::Scaling => 0,
        AlertKind::Monitoring => 1,
    }
}

pub struct AlertBus {
    listeners: [[RwLock<Vec<RegisteredListener>>; AlertKind::ALL.len()]; AlertLevel::ALL.len()],
}

static GLOBAL_BUS: OnceLock<Arc<AlertBus>> = OnceLock::new();

impl AlertBus {
    pub fn new() -> Self {
        Self {
            listeners: std::array::from_fn(|_| std::array::from_fn(|_| RwLock::new(Vec::new()))),
        }
    }

    /// The lazily constructed process-wide bus.
    pub fn global() -> Arc<AlertBus> {
        Arc::clone(GLOBAL_BUS.get_or_init(|| Arc::new(AlertBus::new())))
    }

    fn slot(&self, level: AlertLevel, kind: AlertKind) -> &RwLock<Vec<RegisteredListener>> {
        &self.listeners[level_index(level)][kind_index(kind)]
    }

    pub fn subscribe(&self, level: AlertLevel, kind: AlertKind, listener: ListenerRef) {
        self.slot(level, kind)
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(RegisteredListener::Plain(listener));
    }

    /// Subscribe for alerts of a single pool only.
    pub fn subscribe_for_pool(
        &self,
        level: AlertLevel,
        kind: AlertKind,
        listener: ListenerRef,
        pool_name: &str,
    ) {
        self.slot(level, kind)
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(RegisteredListener::PoolFiltered {
                delegate: listener,
                pool_name: pool_name.to_string(),
            });
    }

    pub fn subscribe_all_kinds(&self, level: AlertLevel, listener: ListenerRef) {
        for kind in AlertKind::ALL {
            self.subscribe(level, kind, Arc::clone(&listener));
        }
    }

    pub fn subscribe_all(&self, listener: ListenerRef) {
        for level in AlertLevel::ALL {
            for kind in AlertKind::ALL {
                self.subscribe(level, kind, Arc::clone(&listener));
            }
        }
    }

    /// Removes every entry whose undecorated delegate is the given listener.
    pub fn unsubscribe(&self, level: AlertLevel, kind: AlertKind, listener: &ListenerRef) {
        self.slot(level, kind)
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|registered| !registered.has_delegate(listener));
    }

    /// Removes exactly the pool-filtered entry registered with the same
    /// (listener, pool name) pair.
    pub fn unsubscribe_for_pool(
        &self,
        level: AlertLevel,
        kind: AlertKind,
        listener: &ListenerRef,
        pool_name: &str,
    ) {
        let mut list = self
            .slot(level, kind)
            .write()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(pos) = list
            .iter()
            .position(|registered| registered.is_exactly(listener, pool_name))
        {
            list.remove(pos);
        }
    }

    pub fn unsubscribe_all_kinds(&self, level: AlertLevel, listener: &ListenerRef) {
        for kind in AlertKind::ALL {
            self.unsubscribe(level, kind, listener);
        }
    }

    pub fn unsubscribe_all(&self, listener: &ListenerRef) {
        for level in AlertLevel::ALL {
            for kind in AlertKind::ALL {
                self.unsubscribe(level, kind, listener);
            }
        }
    }

    /// Publishes an alert to every listener registered for exactly
    /// (level, kind). Listener failures are logged and never abort the
    /// dispatch loop.
    pub fn publish_alert<S: Into<String>>(
        &self,
        message: S,
        level: AlertLevel,
        kind: AlertKind,
        metadata: AlertMetadata,
    ) {
        let event = AlertEvent::new(message, level, kind, metadata);
        let recipients: Vec<RegisteredListener> = self
            .slot(level, kind)
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        for listener in recipients {
            if let Err(e) = listener.deliver(&event) {
                error!(
                    level = level.as_str(),
                    kind = kind.as_str(),
                    "Error notifying alert listener: {e}"
                );
            }
        }
    }

    pub fn listener_count(&self, level: AlertLevel, kind: AlertKind) -> usize {
        self.slot(level, kind)
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Drops every subscription. Test teardown only.
    pub fn clear(&self) {
        for level in AlertLevel::ALL {
            for kind in AlertKind::ALL {
                self.slot(level, kind)
                    .write()
                    .unwrap_or_else(|e| e.into_inner())
                    .clear();
            }
        }
    }
}

impl Default for AlertBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flexpool_domain::events::metadata_keys;
    use std::sync::Mutex;

    struct RecordingListener {
        received: Mutex<Vec<String>>,
    }

    impl RecordingListener {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                received: Mutex::new(Vec::new()),
            })
        }

        fn messages(&self) -> Vec<String> {
            self.received.lock().unwrap().clone()
        }
    }

    impl AlertListener for RecordingListener {
        fn on_alert(&self, event: &AlertEvent) -> anyhow::Result<()> {
            self.received.lock().unwrap().push(event.message().to_string());
            Ok(())
        }
    }

    struct FailingListener;

    impl AlertListener for FailingListener {
        fn on_alert(&self, _event: &AlertEvent) -> anyhow::Result<()> {
            anyhow::bail!("listener exploded")
        }
    }

    #[test]
    fn test_exact_level_kind_routing() {
        let bus = AlertBus::new();
        let warn_monitoring = RecordingListener::new();
        let info_scaling = RecordingListener::new();

        bus.subscribe(
            AlertLevel::Warning,
            AlertKind::Monitoring,
            warn_monitoring.clone(),
        );
        bus.subscribe(AlertLevel::Info, AlertKind::Scaling, info_scaling.clone());

        bus.publish_alert(
            "queue high",
            AlertLevel::Warning,
            AlertKind::Monitoring,
            AlertMetadata::new(),
        );

        assert_eq!(warn_monitoring.messages(), vec!["queue high".to_string()]);
        assert!(info_scaling.messages().is_empty());
    }

    #[test]
    fn test_subscribe_then_unsubscribe_is_identity() {
        let bus = AlertBus::new();
        let listener = RecordingListener::new();
        let listener_ref: ListenerRef = listener.clone();

        let before = bus.listener_count(AlertLevel::Error, AlertKind::Scaling);
        bus.subscribe(AlertLevel::Error, AlertKind::Scaling, listener.clone());
        bus.unsubscribe(AlertLevel::Error, AlertKind::Scaling, &listener_ref);
        assert_eq!(bus.listener_count(AlertLevel::Error, AlertKind::Scaling), before);
    }

    #[test]
    fn test_pool_filtered_delivery() {
        let bus = AlertBus::new();
        let listener = RecordingListener::new();
        bus.subscribe_for_pool(
            AlertLevel::Info,
            AlertKind::Monitoring,
            listener.clone(),
            "orders",
        );

        bus.publish_alert(
            "for orders",
            AlertLevel::Info,
            AlertKind::Monitoring,
            AlertMetadata::new().with(metadata_keys::POOL_NAME, "orders"),
        );
        bus.publish_alert(
            "for payments",
            AlertLevel::Info,
            AlertKind::Monitoring,
            AlertMetadata::new().with(metadata_keys::POOL_NAME, "payments"),
        );
        bus.publish_alert(
            "unnamed",
            AlertLevel::Info,
            AlertKind::Monitoring,
            AlertMetadata::new(),
        );

        assert_eq!(listener.messages(), vec!["for orders".to_string()]);
    }

    #[test]
    fn test_pool_filtered_unsubscribe_removes_exact_entry() {
        let bus = AlertBus::new();
        let listener = RecordingListener::new();
        let listener_ref: ListenerRef = listener.clone();

        bus.subscribe_for_pool(
            AlertLevel::Info,
            AlertKind::Monitoring,
            listener.clone(),
            "orders",
        );
        bus.subscribe_for_pool(
            AlertLevel::Info,
            AlertKind::Monitoring,
            listener.clone(),
            "payments",
        );

        bus.unsubscribe_for_pool(
            AlertLevel::Info,
            AlertKind::Monitoring,
            &listener_ref,
            "orders",
        );
        assert_eq!(bus.listener_count(AlertLevel::Info, AlertKind::Monitoring), 1);

        bus.publish_alert(
            "still here",
            AlertLevel::Info,
            AlertKind::Monitoring,
            AlertMetadata::new().with(metadata_keys::POOL_NAME, "payments"),
        );
        assert_eq!(listener.messages(), vec!["still here".to_string()]);
    }

    #[test]
    fn test_unsubscribe_removes_filtered_by_delegate() {
        let bus = AlertBus::new();
        let listener = RecordingListener::new();
        let listener_ref: ListenerRef = listener.clone();

        bus.subscribe_for_pool(
            AlertLevel::Warning,
            AlertKind::Scaling,
            listener.clone(),
            "orders",
        );
        bus.unsubscribe(AlertLevel::Warning, AlertKind::Scaling, &listener_ref);
        assert_eq!(bus.listener_count(AlertLevel::Warning, AlertKind::Scaling), 0);
    }

    #[test]
    fn test_failing_listener_does_not_abort_dispatch() {
        let bus = AlertBus::new();
        let failing: ListenerRef = Arc::new(FailingListener);
        let recording = RecordingListener::new();

        bus.subscribe(AlertLevel::Critical, AlertKind::Monitoring, failing);
        bus.subscribe(AlertLevel::Critical, AlertKind::Monitoring, recording.clone());

        bus.publish_alert(
            "both get it",
            AlertLevel::Critical,
            AlertKind::Monitoring,
            AlertMetadata::new(),
        );
        assert_eq!(recording.messages(), vec!["both get it".to_string()]);
    }

    #[test]
    fn test_subscribe_all_fans_out() {
        let bus = AlertBus::new();
        let listener = RecordingListener::new();
        bus.subscribe_all(listener.clone());

        for level in AlertLevel::ALL {
            for kind in AlertKind::ALL {
                assert_eq!(bus.listener_count(level, kind), 1);
            }
        }

        let listener_ref: ListenerRef = listener.clone();
        bus.unsubscribe_all(&listener_ref);
        for level in AlertLevel::ALL {
            for kind in AlertKind::ALL {
                assert_eq!(bus.listener_count(level, kind), 0);
            }
        }
    }
}
