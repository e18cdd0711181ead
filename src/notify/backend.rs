//! Notification backend interface and an in-process implementation

use anyhow::Result;
use chrono::Utc;

use super::protocol::{
    AuthorizationOptions, AuthorizationStatus, BackendItem, NotificationRequest,
};

/// The platform notification service.
///
/// Every method is a suspension point. Implementations are driven through
/// [`NotificationEngine`](super::NotificationEngine), which serializes access.
#[allow(async_fn_in_trait)]
pub trait NotificationBackend {
    /// Current permission status
    async fn authorization_status(&mut self) -> Result<AuthorizationStatus>;

    /// Ask for permission, returns whether it was granted
    async fn request_authorization(&mut self, options: AuthorizationOptions) -> Result<bool>;

    /// Notifications currently delivered, in backend order
    async fn delivered(&mut self) -> Result<Vec<BackendItem>>;

    /// Schedule a notification. Reusing an identifier replaces the prior entry.
    async fn schedule(&mut self, request: NotificationRequest) -> Result<()>;

    /// Remove delivered notifications by identifier
    async fn remove_delivered(&mut self, identifiers: &[String]) -> Result<()>;

    /// Remove every delivered notification
    async fn remove_all_delivered(&mut self) -> Result<()>;
}

/// In-memory backend.
///
/// Delivers immediately and keeps items for the lifetime of the value. The
/// authorization answer and schedule failures are configurable.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    status: AuthorizationStatus,
    grant_on_request: bool,
    fail_authorization: bool,
    schedule_error: Option<String>,
    fail_enumeration: bool,
    items: Vec<BackendItem>,
    authorization_requests: usize,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Authorized backend with nothing delivered
    pub fn new() -> Self {
        Self {
            status: AuthorizationStatus::Authorized,
            grant_on_request: true,
            fail_authorization: false,
            schedule_error: None,
            fail_enumeration: false,
            items: Vec::new(),
            authorization_requests: 0,
        }
    }

    pub fn with_status(mut self, status: AuthorizationStatus) -> Self {
        self.status = status;
        self
    }

    /// Answer given to the next permission request
    pub fn granting(mut self, grant: bool) -> Self {
        self.grant_on_request = grant;
        self
    }

    /// Make permission requests fail with an error
    pub fn failing_authorization(mut self) -> Self {
        self.fail_authorization = true;
        self
    }

    /// Make every schedule call fail with `reason`
    pub fn failing_schedule(mut self, reason: impl Into<String>) -> Self {
        self.schedule_error = Some(reason.into());
        self
    }

    /// Make listing delivered items fail, as a corrupt store would
    pub fn failing_enumeration(mut self) -> Self {
        self.fail_enumeration = true;
        self
    }

    pub fn with_items(mut self, items: Vec<BackendItem>) -> Self {
        self.items = items;
        self
    }

    pub fn items(&self) -> &[BackendItem] {
        &self.items
    }

    pub fn authorization_requests(&self) -> usize {
        self.authorization_requests
    }
}

impl NotificationBackend for MemoryBackend {
    async fn authorization_status(&mut self) -> Result<AuthorizationStatus> {
        Ok(self.status)
    }

    async fn request_authorization(&mut self, _options: AuthorizationOptions) -> Result<bool> {
        self.authorization_requests += 1;
        if self.fail_authorization {
            anyhow::bail!("authorization service unavailable");
        }
        self.status = if self.grant_on_request {
            AuthorizationStatus::Authorized
        } else {
            AuthorizationStatus::Denied
        };
        Ok(self.grant_on_request)
    }

    async fn delivered(&mut self) -> Result<Vec<BackendItem>> {
        if self.fail_enumeration {
            anyhow::bail!("delivered notifications unavailable");
        }
        Ok(self.items.clone())
    }

    async fn schedule(&mut self, request: NotificationRequest) -> Result<()> {
        if let Some(reason) = &self.schedule_error {
            anyhow::bail!("{}", reason);
        }
        self.items.retain(|i| i.identifier != request.identifier);
        self.items.push(BackendItem::from_request(&request, Utc::now()));
        Ok(())
    }

    async fn remove_delivered(&mut self, identifiers: &[String]) -> Result<()> {
        self.items.retain(|i| !identifiers.contains(&i.identifier));
        Ok(())
    }

    async fn remove_all_delivered(&mut self) -> Result<()> {
        self.items.clear();
        Ok(())
    }
}
