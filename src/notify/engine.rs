//! Notification lifecycle: authorization, delivery with group replacement,
//! removal and listing

use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::backend::NotificationBackend;
use super::error::{NotifyError, Result};
use super::protocol::{
    AuthorizationOptions, AuthorizationStatus, DeliveredItem, NotificationContent,
    NotificationRequest, NotificationSpec, ALL_GROUPS,
};

/// Delays around a delivery.
///
/// The backend offers no completion callback, so after scheduling we sleep
/// for `propagation_wait` to let its asynchronous pipeline finish before the
/// process exits. This is an approximation: a slow backend can still lose the
/// race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryTiming {
    pub trigger_delay: Duration,
    pub propagation_wait: Duration,
}

impl Default for DeliveryTiming {
    fn default() -> Self {
        Self {
            trigger_delay: Duration::from_millis(100),
            propagation_wait: Duration::from_millis(900),
        }
    }
}

impl DeliveryTiming {
    /// No delays at all
    pub fn immediate() -> Self {
        Self {
            trigger_delay: Duration::ZERO,
            propagation_wait: Duration::ZERO,
        }
    }
}

/// Drives a [`NotificationBackend`].
///
/// The backend sits behind a single mutex held for the whole of each
/// operation, so re-entrant calls within the process cannot interleave
/// backend mutations.
pub struct NotificationEngine<B> {
    backend: Mutex<B>,
    timing: DeliveryTiming,
}

impl<B: NotificationBackend> NotificationEngine<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Mutex::new(backend),
            timing: DeliveryTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: DeliveryTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn into_backend(self) -> B {
        self.backend.into_inner()
    }

    /// Ask for alert, sound and badge permission
    pub async fn request_authorization(&self) -> Result<()> {
        let mut backend = self.backend.lock().await;
        authorize(&mut *backend).await
    }

    /// Deliver a notification and return its identifier.
    ///
    /// With a group id set, earlier notifications in the same group are
    /// removed first.
    pub async fn deliver(&self, spec: &NotificationSpec) -> Result<String> {
        let mut backend = self.backend.lock().await;

        match backend.authorization_status().await {
            Ok(AuthorizationStatus::Denied) => return Err(NotifyError::PermissionDenied),
            Ok(AuthorizationStatus::NotDetermined) => {
                info!("{}, requesting it", NotifyError::PermissionNotDetermined);
                authorize(&mut *backend).await?;
            }
            Ok(AuthorizationStatus::Authorized) => {}
            Err(e) => {
                warn!("Failed to read notification settings: {:#}", e);
                return Err(NotifyError::PermissionDenied);
            }
        }

        // An empty tag would select nothing, treat it as no group
        let group_id = spec.group_id.as_deref().filter(|g| !g.is_empty());
        let identifier = group_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let mut content = NotificationContent::from(spec);
        content.thread_id = group_id.map(str::to_string);
        let request = NotificationRequest {
            identifier: identifier.clone(),
            content,
            trigger_delay: self.timing.trigger_delay,
        };

        match group_id {
            Some(group_id) => replace_group(&mut *backend, group_id, request).await?,
            None => schedule(&mut *backend, request).await?,
        }

        tokio::time::sleep(self.timing.propagation_wait).await;
        info!("Delivered notification {}", identifier);
        Ok(identifier)
    }

    /// Remove notifications matching `group_id` by identifier or group tag.
    /// `"ALL"` removes everything without enumerating first, so it also
    /// clears a backend whose listing is broken.
    pub async fn remove(&self, group_id: &str) -> Result<()> {
        let mut backend = self.backend.lock().await;

        if group_id == ALL_GROUPS {
            backend.remove_all_delivered().await?;
            info!("Removed all delivered notifications");
            return Ok(());
        }

        let identifiers: Vec<String> = backend
            .delivered()
            .await?
            .into_iter()
            .filter(|item| item.matches(group_id))
            .map(|item| item.identifier)
            .collect();

        if identifiers.is_empty() {
            debug!("No delivered notification matches {}", group_id);
            return Ok(());
        }

        backend.remove_delivered(&identifiers).await?;
        info!("Removed {} notification(s) for {}", identifiers.len(), group_id);
        Ok(())
    }

    /// Delivered notifications matching `group_id`, in backend order
    pub async fn list(&self, group_id: &str) -> Result<Vec<DeliveredItem>> {
        let mut backend = self.backend.lock().await;
        let items = backend.delivered().await?;
        Ok(items
            .iter()
            .filter(|item| item.matches(group_id))
            .map(DeliveredItem::from)
            .collect())
    }
}

async fn authorize<B: NotificationBackend>(backend: &mut B) -> Result<()> {
    match backend.request_authorization(AuthorizationOptions::ALL).await {
        Ok(true) => {
            info!("Notification permission granted");
            Ok(())
        }
        Ok(false) => Err(NotifyError::PermissionDenied),
        Err(e) => {
            warn!("Permission request failed, treating as denied: {:#}", e);
            Err(NotifyError::PermissionDenied)
        }
    }
}

/// Remove every delivered item tagged `group_id`, then add `request`.
///
/// Two separate backend calls, not an atomic replace: a concurrent lister can
/// briefly see the group empty.
async fn replace_group<B: NotificationBackend>(
    backend: &mut B,
    group_id: &str,
    request: NotificationRequest,
) -> Result<()> {
    let stale: Vec<String> = backend
        .delivered()
        .await?
        .into_iter()
        .filter(|item| !item.thread_id.is_empty() && item.thread_id == group_id)
        .map(|item| item.identifier)
        .collect();

    if !stale.is_empty() {
        debug!("Replacing {} notification(s) in group {}", stale.len(), group_id);
        backend.remove_delivered(&stale).await?;
    }

    schedule(backend, request).await
}

async fn schedule<B: NotificationBackend>(backend: &mut B, request: NotificationRequest) -> Result<()> {
    debug!(
        "Scheduling {} with {:?} trigger delay",
        request.identifier, request.trigger_delay
    );
    backend
        .schedule(request)
        .await
        .map_err(|e| NotifyError::DeliveryFailed(format!("{:#}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::backend::MemoryBackend;
    use crate::notify::protocol::{BackendItem, Sound};

    fn engine(backend: MemoryBackend) -> NotificationEngine<MemoryBackend> {
        NotificationEngine::new(backend).with_timing(DeliveryTiming::immediate())
    }

    fn backend_item(identifier: &str, thread_id: &str, body: &str) -> BackendItem {
        BackendItem {
            identifier: identifier.to_string(),
            thread_id: thread_id.to_string(),
            title: "Terminal".to_string(),
            subtitle: String::new(),
            body: body.to_string(),
            delivered_at: None,
        }
    }

    #[tokio::test]
    async fn test_deliver_authorized() {
        let engine = engine(MemoryBackend::new());
        let spec = NotificationSpec::new("Build done")
            .title("CI")
            .sound(Sound::Default);

        engine.deliver(&spec).await.unwrap();

        let items = engine.list("ALL").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].message.as_deref(), Some("Build done"));
        assert_eq!(items[0].title.as_deref(), Some("CI"));
        assert_eq!(items[0].group_id, None);
        assert!(items[0].delivered_at.is_some());
    }

    #[tokio::test]
    async fn test_ungrouped_identifiers_are_unique() {
        let engine = engine(MemoryBackend::new());
        let a = engine.deliver(&NotificationSpec::new("one")).await.unwrap();
        let b = engine.deliver(&NotificationSpec::new("two")).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(engine.list("ALL").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_group_replacement_keeps_one_item() {
        let engine = engine(MemoryBackend::new());
        engine
            .deliver(&NotificationSpec::new("first").group("build"))
            .await
            .unwrap();
        let id = engine
            .deliver(&NotificationSpec::new("second").group("build"))
            .await
            .unwrap();

        assert_eq!(id, "build");
        let items = engine.list("build").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].message.as_deref(), Some("second"));
        assert_eq!(items[0].group_id.as_deref(), Some("build"));
    }

    #[tokio::test]
    async fn test_group_replacement_removes_items_with_other_identifiers() {
        // Items tagged with the group but delivered under another identifier
        let backend = MemoryBackend::new().with_items(vec![
            backend_item("legacy-1", "build", "old"),
            backend_item("legacy-2", "deploy", "keep"),
        ]);
        let engine = engine(backend);

        engine
            .deliver(&NotificationSpec::new("new").group("build"))
            .await
            .unwrap();

        let backend = engine.into_backend();
        let ids: Vec<&str> = backend.items().iter().map(|i| i.identifier.as_str()).collect();
        assert_eq!(ids, vec!["legacy-2", "build"]);
    }

    #[tokio::test]
    async fn test_list_filters_by_identifier_or_group() {
        let backend = MemoryBackend::new().with_items(vec![
            backend_item("build", "build", "a"),
            backend_item("abc-123", "", "b"),
            backend_item("deploy", "deploy", "c"),
        ]);
        let engine = engine(backend);

        assert_eq!(engine.list("ALL").await.unwrap().len(), 3);

        let by_group = engine.list("deploy").await.unwrap();
        assert_eq!(by_group.len(), 1);
        assert_eq!(by_group[0].message.as_deref(), Some("c"));

        let by_id = engine.list("abc-123").await.unwrap();
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].group_id, None);

        assert!(engine.list("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_preserves_backend_order() {
        let backend = MemoryBackend::new().with_items(vec![
            backend_item("z", "", "last"),
            backend_item("a", "", "first"),
        ]);
        let engine = engine(backend);

        let ids: Vec<String> = engine
            .list("ALL")
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.identifier)
            .collect();
        assert_eq!(ids, vec!["z", "a"]);
    }

    #[tokio::test]
    async fn test_remove_all_then_list_is_empty() {
        let engine = engine(MemoryBackend::new());
        engine.deliver(&NotificationSpec::new("one")).await.unwrap();
        engine
            .deliver(&NotificationSpec::new("two").group("g"))
            .await
            .unwrap();

        engine.remove("ALL").await.unwrap();
        assert!(engine.list("ALL").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_all_does_not_need_enumeration() {
        let backend = MemoryBackend::new()
            .with_items(vec![backend_item("build", "build", "a")])
            .failing_enumeration();
        let engine = engine(backend);

        assert!(matches!(
            engine.list("ALL").await.unwrap_err(),
            NotifyError::Backend(_)
        ));
        assert!(engine.remove("build").await.is_err());

        engine.remove("ALL").await.unwrap();
        assert!(engine.into_backend().items().is_empty());
    }

    #[tokio::test]
    async fn test_empty_group_leaves_ungrouped_items_alone() {
        let backend = MemoryBackend::new().with_items(vec![
            backend_item("abc-123", "", "a"),
            backend_item("def-456", "", "b"),
        ]);
        let engine = engine(backend);

        assert!(engine.list("").await.unwrap().is_empty());
        engine.remove("").await.unwrap();

        let id = engine
            .deliver(&NotificationSpec::new("c").group(""))
            .await
            .unwrap();
        assert!(!id.is_empty());

        let items = engine.list("ALL").await.unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[2].group_id, None);
    }

    #[tokio::test]
    async fn test_remove_by_group_and_identifier() {
        let backend = MemoryBackend::new().with_items(vec![
            backend_item("build", "build", "a"),
            backend_item("abc-123", "", "b"),
            backend_item("deploy", "deploy", "c"),
        ]);
        let engine = engine(backend);

        engine.remove("build").await.unwrap();
        engine.remove("abc-123").await.unwrap();

        let remaining = engine.list("ALL").await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].identifier, "deploy");
    }

    #[tokio::test]
    async fn test_remove_without_match_is_noop() {
        let engine = engine(MemoryBackend::new());
        engine.deliver(&NotificationSpec::new("one")).await.unwrap();

        engine.remove("nothing").await.unwrap();
        assert_eq!(engine.list("ALL").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_denied_fails_without_request() {
        let engine = engine(MemoryBackend::new().with_status(AuthorizationStatus::Denied));

        let err = engine.deliver(&NotificationSpec::new("x")).await.unwrap_err();
        assert!(matches!(err, NotifyError::PermissionDenied));

        let backend = engine.into_backend();
        assert_eq!(backend.authorization_requests(), 0);
        assert!(backend.items().is_empty());
    }

    #[tokio::test]
    async fn test_not_determined_requests_and_proceeds() {
        let engine = engine(
            MemoryBackend::new()
                .with_status(AuthorizationStatus::NotDetermined)
                .granting(true),
        );

        engine.deliver(&NotificationSpec::new("x")).await.unwrap();

        let backend = engine.into_backend();
        assert_eq!(backend.authorization_requests(), 1);
        assert_eq!(backend.items().len(), 1);
    }

    #[tokio::test]
    async fn test_not_determined_refused_is_denied() {
        let engine = engine(
            MemoryBackend::new()
                .with_status(AuthorizationStatus::NotDetermined)
                .granting(false),
        );

        let err = engine.deliver(&NotificationSpec::new("x")).await.unwrap_err();
        assert!(matches!(err, NotifyError::PermissionDenied));
        assert!(engine.into_backend().items().is_empty());
    }

    #[tokio::test]
    async fn test_authorization_error_is_denied() {
        let engine = engine(MemoryBackend::new().failing_authorization());
        let err = engine.request_authorization().await.unwrap_err();
        assert!(matches!(err, NotifyError::PermissionDenied));
    }

    #[tokio::test]
    async fn test_schedule_failure_carries_reason() {
        let engine = engine(MemoryBackend::new().failing_schedule("quota exceeded"));

        let err = engine.deliver(&NotificationSpec::new("x")).await.unwrap_err();
        match err {
            NotifyError::DeliveryFailed(reason) => assert_eq!(reason, "quota exceeded"),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
