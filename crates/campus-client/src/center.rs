//! Per-session notification cache, kept live by the change feed.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use uuid::Uuid;

use campus_core::result::AppResult;
use campus_core::types::pagination::PageRequest;
use campus_entity::notification::Notification;
use campus_feed::source::FeedSource;

use crate::gateway::NotificationGateway;
use crate::presentation::{Alert, AlertSink};

/// Default size of the initial fetch.
const DEFAULT_PAGE_SIZE: u64 = 25;

/// Cached view of one user's notifications.
#[derive(Debug, Default)]
struct CenterState {
    /// Mirrored notifications, newest first.
    notifications: Vec<Notification>,
    /// Unread counter, reconciled against the server.
    unread_count: u64,
    /// Whether an initial fetch is in flight.
    loading: bool,
}

/// Running feed pump for the current subscription.
struct Pump {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// The notification client state: one owned cache per authenticated
/// session.
///
/// The cache is a disposable projection of the store: every user mutation
/// calls the server and only reconciles locally after success, while
/// feed-delivered inserts apply optimistically (deduplicated by id) and
/// never call back. Discarding and re-running [`initialize`] rebuilds
/// exact state at any time.
///
/// [`initialize`]: NotificationCenter::initialize
pub struct NotificationCenter {
    user_id: Uuid,
    page_size: u64,
    gateway: Arc<dyn NotificationGateway>,
    feed: Arc<dyn FeedSource>,
    alerts: Arc<dyn AlertSink>,
    state: Arc<Mutex<CenterState>>,
    pump: Mutex<Option<Pump>>,
}

impl NotificationCenter {
    /// Create a center for the given user.
    ///
    /// The identity is explicit: switching users means shutting this
    /// center down and constructing a new one (or re-running
    /// [`NotificationCenter::initialize`], which tears down the previous
    /// subscription first).
    pub fn new(
        user_id: Uuid,
        gateway: Arc<dyn NotificationGateway>,
        feed: Arc<dyn FeedSource>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            user_id,
            page_size: DEFAULT_PAGE_SIZE,
            gateway,
            feed,
            alerts,
            state: Arc::new(Mutex::new(CenterState::default())),
            pump: Mutex::new(None),
        }
    }

    /// Override the initial fetch size.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// The user this center is bound to.
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Fetch the first page and unread count, subscribe to the feed, and
    /// start the event pump. Any previous subscription is torn down first
    /// so identity changes never leak a live subscription.
    pub async fn initialize(&self) -> AppResult<()> {
        self.stop_pump().await;
        self.lock_state(|s| s.loading = true);

        // Subscribe before fetching: an insert racing the fetch is either
        // in the page or in the subscription buffer, and the id dedupe
        // collapses the overlap.
        let mut subscription = self.feed.subscribe(self.user_id).await;

        let page = match self
            .gateway
            .fetch_page(PageRequest::new(1, self.page_size))
            .await
        {
            Ok(page) => page,
            Err(e) => {
                self.lock_state(|s| s.loading = false);
                return Err(e);
            }
        };
        let unread = match self.gateway.unread_count().await {
            Ok(count) => count,
            Err(e) => {
                self.lock_state(|s| s.loading = false);
                return Err(e);
            }
        };

        self.lock_state(|s| {
            s.notifications = page.items;
            s.unread_count = unread;
            s.loading = false;
        });

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let state = Arc::clone(&self.state);
        let alerts = Arc::clone(&self.alerts);
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            subscription.unsubscribe();
                            break;
                        }
                    }
                    event = subscription.recv() => match event {
                        Some(notification) => {
                            apply_feed_event(&state, alerts.as_ref(), notification);
                        }
                        None => break,
                    }
                }
            }
        });

        let previous = {
            let mut pump = self.pump.lock().unwrap_or_else(|e| e.into_inner());
            pump.replace(Pump {
                stop: stop_tx,
                handle,
            })
        };
        debug_assert!(previous.is_none(), "pump torn down at entry");
        drop(previous);

        debug!(user_id = %self.user_id, "Notification center initialized");
        Ok(())
    }

    /// Apply one feed-delivered insert. Exposed for transports that pump
    /// events themselves; the built-in pump calls the same path.
    pub fn handle_feed_event(&self, notification: Notification) {
        apply_feed_event(&self.state, self.alerts.as_ref(), notification);
    }

    /// Mark one notification read: server first, cache second.
    ///
    /// The decrement is skipped when the cached entry was already read
    /// (a race with `mark_all_as_read` must not double-decrement) and the
    /// counter never goes below zero.
    pub async fn mark_as_read(&self, id: Uuid) -> AppResult<()> {
        self.gateway.mark_read(id).await?;
        self.lock_state(|s| {
            if let Some(entry) = s.notifications.iter_mut().find(|n| n.id == id) {
                if entry.is_unread() {
                    entry.is_read = true;
                    s.unread_count = s.unread_count.saturating_sub(1);
                }
            }
        });
        Ok(())
    }

    /// Mark everything read: server first, cache second. Returns the
    /// server-reported count affected (0 when already fully read).
    pub async fn mark_all_as_read(&self) -> AppResult<u64> {
        let marked = self.gateway.mark_all_read().await?;
        self.lock_state(|s| {
            for entry in &mut s.notifications {
                entry.is_read = true;
            }
            s.unread_count = 0;
        });
        Ok(marked)
    }

    /// Delete one notification: server first, cache second. The counter
    /// drops only if the removed entry was unread.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.gateway.delete(id).await?;
        self.lock_state(|s| {
            if let Some(pos) = s.notifications.iter().position(|n| n.id == id) {
                let removed = s.notifications.remove(pos);
                if removed.is_unread() {
                    s.unread_count = s.unread_count.saturating_sub(1);
                }
            }
        });
        Ok(())
    }

    /// Unsubscribe from the feed and discard the cache.
    pub async fn shutdown(&self) {
        self.stop_pump().await;
        self.lock_state(|s| {
            s.notifications.clear();
            s.unread_count = 0;
            s.loading = false;
        });
        debug!(user_id = %self.user_id, "Notification center shut down");
    }

    /// Snapshot of the cached notifications, newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .notifications
            .clone()
    }

    /// Current unread counter.
    pub fn unread_count(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .unread_count
    }

    /// Whether an initial fetch is in flight.
    pub fn is_loading(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).loading
    }

    fn lock_state(&self, f: impl FnOnce(&mut CenterState)) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state);
    }

    /// Stop the pump and wait for it to finish, so no event is applied
    /// after this returns.
    async fn stop_pump(&self) {
        let pump = {
            let mut slot = self.pump.lock().unwrap_or_else(|e| e.into_inner());
            slot.take()
        };
        if let Some(pump) = pump {
            let _ = pump.stop.send(true);
            let _ = pump.handle.await;
        }
    }
}

impl std::fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("user_id", &self.user_id)
            .field("unread_count", &self.unread_count())
            .finish_non_exhaustive()
    }
}

/// Merge a feed-delivered insert into the cache.
///
/// Delivery is at-least-once, so an id already present is a no-op. New
/// entries prepend (feed order matches insertion order), bump the unread
/// counter, and emit an alert; this path never calls the server.
fn apply_feed_event(state: &Mutex<CenterState>, alerts: &dyn AlertSink, event: Notification) {
    let alert = {
        let mut s = state.lock().unwrap_or_else(|e| e.into_inner());
        if s.notifications.iter().any(|n| n.id == event.id) {
            debug!(id = %event.id, "Duplicate feed event ignored");
            return;
        }
        let alert = Alert::from_notification(&event);
        if event.is_unread() {
            s.unread_count += 1;
        }
        s.notifications.insert(0, event);
        alert
    };
    // Lock released before the presentation side effect runs.
    alerts.alert(alert);
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use campus_core::error::AppError;
    use campus_core::types::pagination::{PageRequest, PageResponse};
    use campus_entity::notification::NotificationKind;
    use campus_feed::hub::FeedHub;

    /// In-memory gateway over a vector of rows, with fault injection.
    struct MockGateway {
        rows: Mutex<Vec<Notification>>,
        fail: AtomicBool,
    }

    impl MockGateway {
        fn new(rows: Vec<Notification>) -> Arc<Self> {
            Arc::new(Self {
                rows: Mutex::new(rows),
                fail: AtomicBool::new(false),
            })
        }

        fn set_fail(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        fn check_fail(&self) -> AppResult<()> {
            if self.fail.load(Ordering::SeqCst) {
                Err(AppError::database("injected failure"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl NotificationGateway for MockGateway {
        async fn fetch_page(&self, page: PageRequest) -> AppResult<PageResponse<Notification>> {
            self.check_fail()?;
            let mut rows = self.rows.lock().unwrap().clone();
            rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            let total = rows.len() as u64;
            let items = rows
                .into_iter()
                .skip(page.offset() as usize)
                .take(page.limit() as usize)
                .collect();
            Ok(PageResponse::new(items, page.page, page.page_size, total))
        }

        async fn unread_count(&self) -> AppResult<u64> {
            self.check_fail()?;
            Ok(self.rows.lock().unwrap().iter().filter(|n| n.is_unread()).count() as u64)
        }

        async fn mark_read(&self, id: Uuid) -> AppResult<()> {
            self.check_fail()?;
            let mut rows = self.rows.lock().unwrap();
            let entry = rows
                .iter_mut()
                .find(|n| n.id == id)
                .ok_or_else(|| AppError::not_found("Notification not found"))?;
            entry.is_read = true;
            Ok(())
        }

        async fn mark_all_read(&self) -> AppResult<u64> {
            self.check_fail()?;
            let mut rows = self.rows.lock().unwrap();
            let mut marked = 0;
            for entry in rows.iter_mut().filter(|n| n.is_unread()) {
                entry.is_read = true;
                marked += 1;
            }
            Ok(marked)
        }

        async fn delete(&self, id: Uuid) -> AppResult<()> {
            self.check_fail()?;
            let mut rows = self.rows.lock().unwrap();
            let pos = rows
                .iter()
                .position(|n| n.id == id)
                .ok_or_else(|| AppError::not_found("Notification not found"))?;
            rows.remove(pos);
            Ok(())
        }
    }

    /// Alert sink that records into a buffer.
    #[derive(Default)]
    struct RecordingSink {
        alerts: Mutex<Vec<Alert>>,
    }

    impl RecordingSink {
        fn count(&self) -> usize {
            self.alerts.lock().unwrap().len()
        }
    }

    impl AlertSink for RecordingSink {
        fn alert(&self, alert: Alert) {
            self.alerts.lock().unwrap().push(alert);
        }
    }

    fn notification(user_id: Uuid, seq: i64, is_read: bool) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id,
            kind: NotificationKind::AssignmentCreated,
            title: format!("notification {seq}"),
            message: "body".to_string(),
            reference_id: Some(Uuid::new_v4()),
            is_read,
            read_at: None,
            created_at: Utc.timestamp_opt(1_700_000_000 + seq, 0).unwrap(),
        }
    }

    fn center_with(
        user_id: Uuid,
        gateway: Arc<MockGateway>,
        hub: Arc<FeedHub>,
        sink: Arc<RecordingSink>,
    ) -> NotificationCenter {
        NotificationCenter::new(user_id, gateway, hub, sink)
    }

    /// Poll until `cond` holds or a second elapses.
    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..100 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within timeout");
    }

    #[tokio::test]
    async fn test_initialize_loads_page_and_count() {
        let user = Uuid::new_v4();
        let gateway = MockGateway::new(vec![
            notification(user, 1, true),
            notification(user, 2, false),
            notification(user, 3, false),
        ]);
        let hub = Arc::new(FeedHub::new(16));
        let sink = Arc::new(RecordingSink::default());
        let center = center_with(user, gateway, hub, sink);

        center.initialize().await.unwrap();

        let cached = center.notifications();
        assert_eq!(cached.len(), 3);
        assert_eq!(cached[0].title, "notification 3"); // newest first
        assert_eq!(center.unread_count(), 2);
        assert!(!center.is_loading());
        center.shutdown().await;
    }

    #[tokio::test]
    async fn test_feed_event_prepends_counts_and_alerts() {
        let user = Uuid::new_v4();
        let gateway = MockGateway::new(vec![notification(user, 1, false)]);
        let hub = Arc::new(FeedHub::new(16));
        let sink = Arc::new(RecordingSink::default());
        let center = center_with(user, gateway, hub, Arc::clone(&sink));
        center.initialize().await.unwrap();

        let event = notification(user, 2, false);
        center.handle_feed_event(event.clone());

        assert_eq!(center.notifications()[0].id, event.id);
        assert_eq!(center.unread_count(), 2);
        assert_eq!(sink.count(), 1);
        center.shutdown().await;
    }

    #[tokio::test]
    async fn test_duplicate_feed_event_is_noop() {
        let user = Uuid::new_v4();
        let gateway = MockGateway::new(Vec::new());
        let hub = Arc::new(FeedHub::new(16));
        let sink = Arc::new(RecordingSink::default());
        let center = center_with(user, gateway, hub, Arc::clone(&sink));
        center.initialize().await.unwrap();

        let event = notification(user, 1, false);
        center.handle_feed_event(event.clone());
        center.handle_feed_event(event);

        assert_eq!(center.notifications().len(), 1);
        assert_eq!(center.unread_count(), 1);
        assert_eq!(sink.count(), 1);
        center.shutdown().await;
    }

    #[tokio::test]
    async fn test_double_mark_read_decrements_once() {
        let user = Uuid::new_v4();
        let rows = vec![notification(user, 1, false), notification(user, 2, false)];
        let target = rows[0].id;
        let gateway = MockGateway::new(rows);
        let hub = Arc::new(FeedHub::new(16));
        let sink = Arc::new(RecordingSink::default());
        let center = center_with(user, gateway, hub, sink);
        center.initialize().await.unwrap();

        center.mark_as_read(target).await.unwrap();
        center.mark_as_read(target).await.unwrap(); // idempotent re-mark

        assert_eq!(center.unread_count(), 1);
        let cached = center.notifications();
        assert!(cached.iter().find(|n| n.id == target).unwrap().is_read);
        center.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_mutation_leaves_cache_unchanged() {
        let user = Uuid::new_v4();
        let rows = vec![notification(user, 1, false)];
        let target = rows[0].id;
        let gateway = MockGateway::new(rows);
        let hub = Arc::new(FeedHub::new(16));
        let sink = Arc::new(RecordingSink::default());
        let center = center_with(user, Arc::clone(&gateway), hub, sink);
        center.initialize().await.unwrap();

        gateway.set_fail(true);
        assert!(center.mark_as_read(target).await.is_err());
        assert!(center.mark_all_as_read().await.is_err());
        assert!(center.delete(target).await.is_err());

        assert_eq!(center.unread_count(), 1);
        assert!(center.notifications()[0].is_unread());
        center.shutdown().await;
    }

    #[tokio::test]
    async fn test_mark_all_read_on_fully_read_is_noop() {
        let user = Uuid::new_v4();
        let gateway = MockGateway::new(vec![
            notification(user, 1, true),
            notification(user, 2, true),
        ]);
        let hub = Arc::new(FeedHub::new(16));
        let sink = Arc::new(RecordingSink::default());
        let center = center_with(user, gateway, hub, sink);
        center.initialize().await.unwrap();

        let before = center.notifications();
        let marked = center.mark_all_as_read().await.unwrap();

        assert_eq!(marked, 0);
        assert_eq!(center.unread_count(), 0);
        let after = center.notifications();
        assert_eq!(
            before.iter().map(|n| n.id).collect::<Vec<_>>(),
            after.iter().map(|n| n.id).collect::<Vec<_>>()
        );
        center.shutdown().await;
    }

    #[tokio::test]
    async fn test_delete_decrements_only_if_unread() {
        let user = Uuid::new_v4();
        let rows = vec![notification(user, 1, true), notification(user, 2, false)];
        let read_id = rows[0].id;
        let unread_id = rows[1].id;
        let gateway = MockGateway::new(rows);
        let hub = Arc::new(FeedHub::new(16));
        let sink = Arc::new(RecordingSink::default());
        let center = center_with(user, gateway, hub, sink);
        center.initialize().await.unwrap();
        assert_eq!(center.unread_count(), 1);

        center.delete(read_id).await.unwrap();
        assert_eq!(center.unread_count(), 1);

        center.delete(unread_id).await.unwrap();
        assert_eq!(center.unread_count(), 0);
        assert!(center.notifications().is_empty());
        center.shutdown().await;
    }

    /// The end-to-end reconciliation scenario: initial unread entry, feed
    /// insert, single mark-read, then mark-all.
    #[tokio::test]
    async fn test_reconciliation_scenario() {
        let user = Uuid::new_v4();
        let rows = vec![notification(user, 1, false)];
        let first = rows[0].id;
        let gateway = MockGateway::new(rows);
        let hub = Arc::new(FeedHub::new(16));
        let sink = Arc::new(RecordingSink::default());
        let center = center_with(user, gateway, hub, sink);
        center.initialize().await.unwrap();
        assert_eq!(center.unread_count(), 1);

        let second = notification(user, 2, false);
        center.handle_feed_event(second.clone());
        let cached = center.notifications();
        assert_eq!(cached[0].id, second.id);
        assert_eq!(cached[1].id, first);
        assert_eq!(center.unread_count(), 2);

        center.mark_as_read(first).await.unwrap();
        let cached = center.notifications();
        assert!(cached[0].is_unread());
        assert!(cached[1].is_read);
        assert_eq!(center.unread_count(), 1);

        center.mark_all_as_read().await.unwrap();
        let cached = center.notifications();
        assert!(cached.iter().all(|n| n.is_read));
        assert_eq!(center.unread_count(), 0);

        // No drift: counter equals the cached unread entries throughout.
        let unread = cached.iter().filter(|n| n.is_unread()).count() as u64;
        assert_eq!(center.unread_count(), unread);
        center.shutdown().await;
    }

    #[tokio::test]
    async fn test_pump_applies_hub_events() {
        let user = Uuid::new_v4();
        let gateway = MockGateway::new(Vec::new());
        let hub = Arc::new(FeedHub::new(16));
        let sink = Arc::new(RecordingSink::default());
        let center = center_with(user, gateway, Arc::clone(&hub), Arc::clone(&sink));
        center.initialize().await.unwrap();

        hub.publish(notification(user, 1, false));
        wait_until(|| center.notifications().len() == 1).await;
        assert_eq!(center.unread_count(), 1);
        assert_eq!(sink.count(), 1);
        center.shutdown().await;
    }

    #[tokio::test]
    async fn test_reinitialize_replaces_subscription() {
        let user = Uuid::new_v4();
        let gateway = MockGateway::new(Vec::new());
        let hub = Arc::new(FeedHub::new(16));
        let sink = Arc::new(RecordingSink::default());
        let center = center_with(user, gateway, Arc::clone(&hub), Arc::clone(&sink));

        center.initialize().await.unwrap();
        center.initialize().await.unwrap();
        assert_eq!(hub.active_users(), 1); // no leaked subscription

        hub.publish(notification(user, 1, false));
        wait_until(|| center.notifications().len() == 1).await;
        assert_eq!(sink.count(), 1); // delivered exactly once
        center.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_delivery_and_discards_cache() {
        let user = Uuid::new_v4();
        let gateway = MockGateway::new(vec![notification(user, 1, false)]);
        let hub = Arc::new(FeedHub::new(16));
        let sink = Arc::new(RecordingSink::default());
        let center = center_with(user, gateway, Arc::clone(&hub), sink);
        center.initialize().await.unwrap();

        center.shutdown().await;
        assert!(center.notifications().is_empty());
        assert_eq!(center.unread_count(), 0);

        // Publishing after shutdown reaches nobody.
        assert_eq!(hub.publish(notification(user, 2, false)), 0);
        assert_eq!(hub.active_users(), 0);
    }
}
