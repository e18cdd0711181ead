//! Desktop notification delivery
//!
//! The engine drives an opaque [`NotificationBackend`]: the real desktop
//! service in production, an in-memory one in tests.

pub mod backend;
pub mod desktop;
pub mod engine;
pub mod error;
pub mod protocol;

pub use backend::{MemoryBackend, NotificationBackend};
pub use desktop::{DesktopBackend, DesktopPresenter, Presenter};
pub use engine::{DeliveryTiming, NotificationEngine};
pub use error::NotifyError;
pub use protocol::{DeliveredItem, NotificationSpec, Sound, ALL_GROUPS};

/// Default path of the desktop backend's delivery ledger
pub fn ledger_path() -> std::path::PathBuf {
    directories::ProjectDirs::from("", "", "termnotify")
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("termnotify"))
        .join("delivered.json")
}
