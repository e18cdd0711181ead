//! Data types shared by the engine and its backends

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::time::Duration;

/// Group id that matches every delivered notification
pub const ALL_GROUPS: &str = "ALL";

/// Title used when none is given
pub const DEFAULT_TITLE: &str = "Terminal";

/// Notification sound
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sound {
    /// The platform's default sound
    Default,
    /// A named system sound resource
    Named(String),
}

impl Sound {
    /// `"default"` maps to the platform default, anything else is a sound name
    pub fn from_name(name: &str) -> Self {
        if name == "default" {
            Sound::Default
        } else {
            Sound::Named(name.to_string())
        }
    }
}

/// What the caller asked to deliver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSpec {
    pub message: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub sound: Option<Sound>,
    pub group_id: Option<String>,
}

impl NotificationSpec {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            title: DEFAULT_TITLE.to_string(),
            subtitle: None,
            sound: None,
            group_id: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn sound(mut self, sound: Sound) -> Self {
        self.sound = Some(sound);
        self
    }

    pub fn group(mut self, group_id: impl Into<String>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }
}

/// Permission status reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    Denied,
    Authorized,
}

/// Capabilities requested when asking for permission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizationOptions {
    pub alert: bool,
    pub sound: bool,
    pub badge: bool,
}

impl AuthorizationOptions {
    pub const ALL: Self = Self {
        alert: true,
        sound: true,
        badge: true,
    };
}

/// Platform payload built from a [`NotificationSpec`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub title: String,
    pub subtitle: Option<String>,
    pub body: String,
    pub sound: Option<Sound>,
    /// Group tag the backend stores alongside the notification
    pub thread_id: Option<String>,
}

impl From<&NotificationSpec> for NotificationContent {
    fn from(spec: &NotificationSpec) -> Self {
        Self {
            title: spec.title.clone(),
            subtitle: spec.subtitle.clone(),
            body: spec.message.clone(),
            sound: spec.sound.clone(),
            thread_id: spec.group_id.clone(),
        }
    }
}

/// A scheduled delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub identifier: String,
    pub content: NotificationContent,
    /// Delay before the backend posts the notification
    pub trigger_delay: Duration,
}

/// A delivered notification as the backend reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendItem {
    pub identifier: String,
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
}

impl BackendItem {
    pub fn from_request(request: &NotificationRequest, delivered_at: DateTime<Utc>) -> Self {
        let content = &request.content;
        Self {
            identifier: request.identifier.clone(),
            thread_id: content.thread_id.clone().unwrap_or_default(),
            title: content.title.clone(),
            subtitle: content.subtitle.clone().unwrap_or_default(),
            body: content.body.clone(),
            delivered_at: Some(delivered_at),
        }
    }

    /// Whether `group_id` selects this item, by identifier or group tag.
    /// [`ALL_GROUPS`] selects everything. An ungrouped item has an empty
    /// tag, which never matches.
    pub fn matches(&self, group_id: &str) -> bool {
        group_id == ALL_GROUPS
            || self.identifier == group_id
            || (!self.thread_id.is_empty() && self.thread_id == group_id)
    }
}

/// Read-only projection of a delivered notification, as printed by `--list`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveredItem {
    pub identifier: String,
    #[serde(rename = "groupID")]
    pub group_id: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub message: Option<String>,
    #[serde(rename = "deliveredAt", serialize_with = "serialize_timestamp")]
    pub delivered_at: Option<DateTime<Utc>>,
}

impl From<&BackendItem> for DeliveredItem {
    fn from(item: &BackendItem) -> Self {
        Self {
            identifier: item.identifier.clone(),
            group_id: non_empty(&item.thread_id),
            title: non_empty(&item.title),
            subtitle: non_empty(&item.subtitle),
            message: non_empty(&item.body),
            delivered_at: item.delivered_at,
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

fn serialize_timestamp<S: Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(ts) => serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(identifier: &str, thread_id: &str) -> BackendItem {
        BackendItem {
            identifier: identifier.to_string(),
            thread_id: thread_id.to_string(),
            title: "CI".to_string(),
            subtitle: String::new(),
            body: "Build done".to_string(),
            delivered_at: None,
        }
    }

    #[test]
    fn test_sound_from_name() {
        assert_eq!(Sound::from_name("default"), Sound::Default);
        assert_eq!(Sound::from_name("Glass"), Sound::Named("Glass".to_string()));
    }

    #[test]
    fn test_spec_defaults() {
        let spec = NotificationSpec::new("hello");
        assert_eq!(spec.title, "Terminal");
        assert!(spec.subtitle.is_none());
        assert!(spec.group_id.is_none());
    }

    #[test]
    fn test_matches_identifier_group_and_all() {
        let grouped = item("build", "build");
        let ungrouped = item("5f1c", "");

        assert!(grouped.matches("build"));
        assert!(grouped.matches("ALL"));
        assert!(!grouped.matches("deploy"));
        assert!(ungrouped.matches("5f1c"));
        assert!(ungrouped.matches("ALL"));
        assert!(!ungrouped.matches(""));
        assert!(!ungrouped.matches("all"));
    }

    #[test]
    fn test_empty_group_selects_nothing() {
        assert!(!item("build", "build").matches(""));
        assert!(!item("5f1c", "").matches(""));
    }

    #[test]
    fn test_empty_fields_collapse_to_none() {
        let delivered = DeliveredItem::from(&item("5f1c", ""));
        assert_eq!(delivered.group_id, None);
        assert_eq!(delivered.subtitle, None);
        assert_eq!(delivered.title.as_deref(), Some("CI"));
    }

    #[test]
    fn test_serialize_delivered_item() {
        let mut backend_item = item("build", "build");
        backend_item.delivered_at = Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap());

        let json = serde_json::to_value(DeliveredItem::from(&backend_item)).unwrap();
        let object = json.as_object().unwrap();

        assert_eq!(object.len(), 6);
        assert_eq!(json["identifier"], "build");
        assert_eq!(json["groupID"], "build");
        assert_eq!(json["subtitle"], serde_json::Value::Null);
        assert_eq!(json["deliveredAt"], "2024-03-01T12:30:05Z");
    }

    #[test]
    fn test_serialize_absent_fields_as_null() {
        let json = serde_json::to_string(&DeliveredItem {
            identifier: "x".to_string(),
            group_id: None,
            title: None,
            subtitle: None,
            message: None,
            delivered_at: None,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"identifier":"x","groupID":null,"title":null,"subtitle":null,"message":null,"deliveredAt":null}"#
        );
    }
}
