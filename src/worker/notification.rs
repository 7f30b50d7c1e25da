//! Push messages and notification clicks

use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Button shown on a notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Inbound push body. Every field is optional.
#[derive(Debug, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
    data: Option<Value>,
    #[serde(default)]
    actions: Option<Vec<NotificationAction>>,
}

/// Values filled in from configuration rather than the payload
#[derive(Debug, Clone)]
pub struct NotificationDefaults {
    pub app_name: String,
    pub icon: String,
    pub badge: String,
}

/// A user-visible notification to show
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// Passed through untouched to the click handler
    pub data: Value,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    /// Build a notification from a raw push body.
    ///
    /// Returns `None` for an absent body, invalid JSON, or JSON that is not
    /// an object.
    pub fn from_push(payload: Option<&[u8]>, defaults: &NotificationDefaults) -> Option<Self> {
        let bytes = payload?;

        let value: Value = match serde_json::from_slice(bytes) {
            Ok(v) => v,
            Err(e) => {
                log::debug!("Ignoring push with malformed payload: {}", e);
                return None;
            }
        };
        if !value.is_object() {
            log::debug!("Ignoring push whose payload is not a JSON object");
            return None;
        }
        let payload: PushPayload = match serde_json::from_value(value) {
            Ok(p) => p,
            Err(e) => {
                log::debug!("Ignoring push with unexpected payload shape: {}", e);
                return None;
            }
        };

        Some(Self {
            title: payload.title.unwrap_or_else(|| defaults.app_name.clone()),
            body: payload.body.unwrap_or_default(),
            icon: defaults.icon.clone(),
            badge: defaults.badge.clone(),
            data: match payload.data {
                Some(Value::Null) | None => Value::Object(Default::default()),
                Some(data) => data,
            },
            actions: payload.actions.unwrap_or_default(),
        })
    }
}

/// A click on a shown notification
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationClick {
    /// Id of the clicked action button; `None` for a click on the body
    pub action: Option<String>,
    /// The notification's attached data
    #[serde(default)]
    pub data: Value,
}

/// What the host should do after a click
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClickOutcome {
    /// Focus an open page at `url`, or open a new one
    OpenOrFocus { url: String },
    /// Close the notification without navigating
    Dismissed,
}

impl NotificationClick {
    /// Resolve the click against the app origin.
    pub fn resolve(&self, origin: &Url) -> ClickOutcome {
        match self.action.as_deref() {
            None | Some("") | Some("view") => {
                let target = self
                    .data
                    .get("url")
                    .and_then(Value::as_str)
                    .unwrap_or("/");
                let url = origin
                    .join(target)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|e| {
                        log::warn!("Notification url '{}' is invalid ({}), using /", target, e);
                        origin.as_str().to_string()
                    });
                ClickOutcome::OpenOrFocus { url }
            }
            Some("dismiss") => ClickOutcome::Dismissed,
            Some(other) => {
                log::debug!("Unknown notification action '{}', not navigating", other);
                ClickOutcome::Dismissed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> NotificationDefaults {
        NotificationDefaults {
            app_name: "Nearly".to_string(),
            icon: "/icon-192.png".to_string(),
            badge: "/icon-192.png".to_string(),
        }
    }

    fn push(payload: &str) -> Option<Notification> {
        Notification::from_push(Some(payload.as_bytes()), &defaults())
    }

    fn origin() -> Url {
        Url::parse("http://localhost:5173").unwrap()
    }

    #[test]
    fn test_push_title_and_body() {
        let n = push(r#"{"title":"Nearly","body":"Test"}"#).unwrap();
        assert_eq!(n.title, "Nearly");
        assert_eq!(n.body, "Test");
        assert!(n.actions.is_empty());
        assert_eq!(n.data, json!({}));
    }

    #[test]
    fn test_push_defaults_title_to_app_name() {
        let n = push(r#"{"body":"New event nearby"}"#).unwrap();
        assert_eq!(n.title, "Nearly");
        assert_eq!(n.icon, "/icon-192.png");
    }

    #[test]
    fn test_push_passes_data_and_actions() {
        let payload = json!({
            "title": "Poll closed",
            "data": {"url": "/polls/9", "pollId": 9},
            "actions": [
                {"action": "view", "title": "View"},
                {"action": "dismiss", "title": "Dismiss"}
            ]
        })
        .to_string();

        let n = push(&payload).unwrap();
        assert_eq!(n.data["pollId"], 9);
        assert_eq!(n.actions.len(), 2);
        assert_eq!(n.actions[0].action, "view");
    }

    #[test]
    fn test_push_without_payload_shows_nothing() {
        assert!(Notification::from_push(None, &defaults()).is_none());
    }

    #[test]
    fn test_push_malformed_payload_shows_nothing() {
        assert!(push("not json").is_none());
        assert!(push("[1,2]").is_none());
        assert!(push(r#"{"title":5}"#).is_none());
    }

    #[test]
    fn test_click_view_opens_data_url() {
        let click = NotificationClick {
            action: Some("view".to_string()),
            data: json!({"url": "/events"}),
        };
        assert_eq!(
            click.resolve(&origin()),
            ClickOutcome::OpenOrFocus {
                url: "http://localhost:5173/events".to_string()
            }
        );
    }

    #[test]
    fn test_click_without_action_behaves_like_view() {
        let click = NotificationClick {
            action: None,
            data: json!({}),
        };
        assert_eq!(
            click.resolve(&origin()),
            ClickOutcome::OpenOrFocus {
                url: "http://localhost:5173/".to_string()
            }
        );
    }

    #[test]
    fn test_click_dismiss_does_not_navigate() {
        let click = NotificationClick {
            action: Some("dismiss".to_string()),
            data: json!({"url": "/events"}),
        };
        assert_eq!(click.resolve(&origin()), ClickOutcome::Dismissed);
    }
}
