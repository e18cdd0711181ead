//! Desktop notification backend built on notify-rust
//!
//! Desktop notification servers cannot enumerate what they are showing, so
//! this backend keeps a ledger of delivered notifications next to the log
//! file. The ledger is the source of truth for `--list` and `--remove`.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::backend::NotificationBackend;
use super::protocol::{
    AuthorizationOptions, AuthorizationStatus, BackendItem, NotificationContent,
    NotificationRequest, Sound,
};

/// Shows and closes notifications on the notification server.
///
/// Calls block, the backend runs them on tokio's blocking pool.
pub trait Presenter: Clone + Send + 'static {
    /// Show `content`, returning the server-side id if the server has one
    fn show(&self, content: &NotificationContent) -> Result<Option<u32>>;

    /// Close a notification previously returned by [`Presenter::show`]
    fn close(&self, server_id: u32) -> Result<()>;
}

/// notify-rust presenter: freedesktop on Linux/BSD, native on macOS
#[derive(Debug, Clone)]
pub struct DesktopPresenter {
    app_name: String,
}

impl DesktopPresenter {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    fn build(&self, content: &NotificationContent) -> notify_rust::Notification {
        let mut notification = notify_rust::Notification::new();
        notification.appname(&self.app_name).summary(&content.title);

        #[cfg(target_os = "macos")]
        {
            notification.body(&content.body);
            if let Some(subtitle) = &content.subtitle {
                notification.subtitle(subtitle);
            }
        }
        #[cfg(not(target_os = "macos"))]
        {
            // freedesktop has no subtitle field
            let body = match &content.subtitle {
                Some(subtitle) => format!("{}\n{}", subtitle, content.body),
                None => content.body.clone(),
            };
            notification.body(&body);
        }

        if let Some(sound) = &content.sound {
            notification.sound_name(&sound_name(sound));
        }
        notification
    }
}

#[cfg(all(unix, not(target_os = "macos")))]
impl Presenter for DesktopPresenter {
    fn show(&self, content: &NotificationContent) -> Result<Option<u32>> {
        let handle = self
            .build(content)
            .show()
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(Some(handle.id()))
    }

    /// notify-rust only closes through a handle, so take over the id with an
    /// empty notification and close that.
    fn close(&self, server_id: u32) -> Result<()> {
        let handle = notify_rust::Notification::new()
            .appname(&self.app_name)
            .id(server_id)
            .show()
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        handle.close();
        Ok(())
    }
}

#[cfg(not(all(unix, not(target_os = "macos"))))]
impl Presenter for DesktopPresenter {
    fn show(&self, content: &NotificationContent) -> Result<Option<u32>> {
        self.build(content)
            .show()
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(None)
    }

    // No server ids to close on this platform
    fn close(&self, _server_id: u32) -> Result<()> {
        Ok(())
    }
}

fn sound_name(sound: &Sound) -> String {
    match sound {
        Sound::Default if cfg!(target_os = "macos") => "Default".to_string(),
        Sound::Default => "message-new-instant".to_string(),
        Sound::Named(name) => name.clone(),
    }
}

/// A ledger row: the delivered item plus the server-side id, if any
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LedgerEntry {
    #[serde(flatten)]
    item: BackendItem,
    /// freedesktop notification id, used to close the bubble on removal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    server_id: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Ledger {
    #[serde(default)]
    items: Vec<LedgerEntry>,
}

/// Backend that shows notifications on the desktop
pub struct DesktopBackend<P = DesktopPresenter> {
    ledger_path: PathBuf,
    retention: Duration,
    presenter: P,
}

impl DesktopBackend {
    pub fn new(ledger_path: PathBuf, retention: Duration, app_name: impl Into<String>) -> Self {
        Self::with_presenter(ledger_path, retention, DesktopPresenter::new(app_name))
    }
}

impl<P: Presenter> DesktopBackend<P> {
    pub fn with_presenter(ledger_path: PathBuf, retention: Duration, presenter: P) -> Self {
        Self {
            ledger_path,
            retention,
            presenter,
        }
    }

    /// Load the ledger, dropping entries older than the retention window.
    ///
    /// An unparsable ledger is an error; it is never silently replaced.
    fn load(&self) -> Result<Ledger> {
        if !self.ledger_path.exists() {
            return Ok(Ledger::default());
        }

        let content = std::fs::read_to_string(&self.ledger_path).with_context(|| {
            format!("Failed to read ledger: {}", self.ledger_path.display())
        })?;
        let mut ledger: Ledger = serde_json::from_str(&content).with_context(|| {
            format!(
                "Failed to parse ledger {} (`--remove ALL` resets it)",
                self.ledger_path.display()
            )
        })?;

        let retention = chrono::Duration::from_std(self.retention)
            .unwrap_or_else(|_| chrono::Duration::days(1));
        let cutoff = Utc::now() - retention;
        ledger
            .items
            .retain(|e| e.item.delivered_at.map_or(true, |at| at >= cutoff));

        Ok(ledger)
    }

    /// Write to a temp file in the same directory and rename it over the
    /// ledger, so a concurrent reader sees either the old or the new file.
    fn save(&self, ledger: &Ledger) -> Result<()> {
        let parent = self
            .ledger_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent).context("Failed to create ledger directory")?;

        let mut file = tempfile::NamedTempFile::new_in(parent)
            .context("Failed to create temporary ledger")?;
        serde_json::to_writer_pretty(&mut file, ledger).context("Failed to serialize ledger")?;
        file.persist(&self.ledger_path).with_context(|| {
            format!("Failed to write ledger: {}", self.ledger_path.display())
        })?;
        Ok(())
    }

    /// Close bubbles on the server. A bubble may already have expired, so
    /// failures are only logged.
    async fn close_all(&self, server_ids: Vec<u32>) {
        for server_id in server_ids {
            let presenter = self.presenter.clone();
            match tokio::task::spawn_blocking(move || presenter.close(server_id)).await {
                Ok(Ok(())) => tracing::debug!("Closed notification {}", server_id),
                Ok(Err(e)) => tracing::warn!("Failed to close notification {}: {:#}", server_id, e),
                Err(e) => tracing::warn!("Close thread for {} panicked: {}", server_id, e),
            }
        }
    }
}

impl<P: Presenter> NotificationBackend for DesktopBackend<P> {
    // No permission model on freedesktop servers
    async fn authorization_status(&mut self) -> Result<AuthorizationStatus> {
        Ok(AuthorizationStatus::Authorized)
    }

    async fn request_authorization(&mut self, _options: AuthorizationOptions) -> Result<bool> {
        Ok(true)
    }

    async fn delivered(&mut self) -> Result<Vec<BackendItem>> {
        Ok(self.load()?.items.into_iter().map(|e| e.item).collect())
    }

    async fn schedule(&mut self, request: NotificationRequest) -> Result<()> {
        tokio::time::sleep(request.trigger_delay).await;

        // Fail before showing anything if the ledger cannot be updated
        let mut ledger = self.load()?;

        let content = request.content.clone();
        let presenter = self.presenter.clone();
        let server_id = tokio::task::spawn_blocking(move || presenter.show(&content))
            .await
            .context("Notification thread panicked")??;

        ledger.items.retain(|e| e.item.identifier != request.identifier);
        ledger.items.push(LedgerEntry {
            item: BackendItem::from_request(&request, Utc::now()),
            server_id,
        });
        self.save(&ledger)
    }

    async fn remove_delivered(&mut self, identifiers: &[String]) -> Result<()> {
        let mut ledger = self.load()?;
        let (removed, kept): (Vec<LedgerEntry>, Vec<LedgerEntry>) = ledger
            .items
            .into_iter()
            .partition(|e| identifiers.contains(&e.item.identifier));
        ledger.items = kept;

        self.close_all(removed.iter().filter_map(|e| e.server_id).collect())
            .await;
        self.save(&ledger)
    }

    async fn remove_all_delivered(&mut self) -> Result<()> {
        match self.load() {
            Ok(ledger) => {
                self.close_all(ledger.items.iter().filter_map(|e| e.server_id).collect())
                    .await
            }
            Err(e) => tracing::warn!("Resetting ledger without closing bubbles: {:#}", e),
        }
        self.save(&Ledger::default())
    }
}
