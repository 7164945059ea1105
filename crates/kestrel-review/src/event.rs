use std::path::Path;

use kestrel_core::KestrelError;
use serde::Deserialize;

/// The GitHub webhook payload, reduced to the fields this tool reads.
///
/// The full payload carries far more; unknown fields are ignored on decode.
///
/// # Examples
///
/// ```
/// use kestrel_review::event::{EventKind, WebhookEvent};
///
/// let payload = r#"{
///     "action": "opened",
///     "number": 7,
///     "repository": { "name": "demo", "owner": { "login": "octocat" } }
/// }"#;
/// let event: WebhookEvent = serde_json::from_str(payload).unwrap();
/// assert!(matches!(event.kind(), EventKind::Opened));
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Webhook action, e.g. `"opened"` or `"synchronize"`.
    pub action: Option<String>,
    /// Pull request number.
    pub number: Option<u64>,
    /// Base revision of a push, present on `"synchronize"`.
    pub before: Option<String>,
    /// Head revision of a push, present on `"synchronize"`.
    pub after: Option<String>,
    /// Repository the event fired on.
    pub repository: Option<RepositoryRef>,
}

/// Repository coordinates from the webhook payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryRef {
    /// Repository name.
    pub name: String,
    /// Repository owner.
    pub owner: OwnerRef,
}

/// Repository owner from the webhook payload.
#[derive(Debug, Clone, Deserialize)]
pub struct OwnerRef {
    /// Owner login.
    pub login: String,
}

/// How the run was triggered, derived from the webhook action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A pull request was opened; review its full diff.
    Opened,
    /// New commits were pushed; review the diff between the two revisions.
    Synchronize {
        /// Revision before the push.
        before: String,
        /// Revision after the push.
        after: String,
    },
    /// Any other trigger; the run is a no-op.
    Unsupported(String),
}

impl WebhookEvent {
    /// Read and decode a webhook payload from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`KestrelError::FileNotFound`] if the file does not exist,
    /// [`KestrelError::Io`] if it cannot be read, or
    /// [`KestrelError::Serialization`] if it is not valid JSON.
    pub fn from_file(path: &Path) -> Result<Self, KestrelError> {
        if !path.exists() {
            return Err(KestrelError::FileNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let event = serde_json::from_str(&content)?;
        Ok(event)
    }

    /// Classify the event into one of the two supported kinds.
    ///
    /// A `"synchronize"` action without both revision hashes is reported as
    /// unsupported rather than half-handled.
    pub fn kind(&self) -> EventKind {
        match self.action.as_deref() {
            Some("opened") => EventKind::Opened,
            Some("synchronize") => match (self.before.clone(), self.after.clone()) {
                (Some(before), Some(after)) => EventKind::Synchronize { before, after },
                _ => EventKind::Unsupported("synchronize without revision range".into()),
            },
            Some(other) => EventKind::Unsupported(other.to_string()),
            None => EventKind::Unsupported("<missing action>".into()),
        }
    }

    /// Extract `(owner, repo, number)` for API calls.
    ///
    /// # Errors
    ///
    /// Returns [`KestrelError::Github`] if the payload lacks repository
    /// coordinates or a pull request number.
    pub fn coordinates(&self) -> Result<(String, String, u64), KestrelError> {
        let repo = self
            .repository
            .as_ref()
            .ok_or_else(|| KestrelError::Github("event payload has no repository".into()))?;
        let number = self
            .number
            .ok_or_else(|| KestrelError::Github("event payload has no pull request number".into()))?;
        Ok((repo.owner.login.clone(), repo.name.clone(), number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(json: &str) -> WebhookEvent {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn opened_event_classified() {
        let e = event(r#"{"action": "opened", "number": 1}"#);
        assert_eq!(e.kind(), EventKind::Opened);
    }

    #[test]
    fn synchronize_event_carries_revisions() {
        let e = event(r#"{"action": "synchronize", "before": "abc", "after": "def"}"#);
        assert_eq!(
            e.kind(),
            EventKind::Synchronize {
                before: "abc".into(),
                after: "def".into()
            }
        );
    }

    #[test]
    fn synchronize_without_revisions_unsupported() {
        let e = event(r#"{"action": "synchronize"}"#);
        assert!(matches!(e.kind(), EventKind::Unsupported(_)));
    }

    #[test]
    fn other_actions_unsupported() {
        let e = event(r#"{"action": "labeled"}"#);
        assert_eq!(e.kind(), EventKind::Unsupported("labeled".into()));
    }

    #[test]
    fn coordinates_from_full_payload() {
        let e = event(
            r#"{
                "action": "opened",
                "number": 42,
                "repository": { "name": "demo", "owner": { "login": "octocat" } }
            }"#,
        );
        let (owner, repo, number) = e.coordinates().unwrap();
        assert_eq!(owner, "octocat");
        assert_eq!(repo, "demo");
        assert_eq!(number, 42);
    }

    #[test]
    fn coordinates_missing_repository_errors() {
        let e = event(r#"{"action": "opened", "number": 42}"#);
        assert!(e.coordinates().is_err());
    }

    #[test]
    fn from_file_missing_path_errors() {
        let err = WebhookEvent::from_file(Path::new("/nonexistent/event.json")).unwrap_err();
        assert!(matches!(err, KestrelError::FileNotFound(_)));
    }

    #[test]
    fn from_file_reads_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.json");
        std::fs::write(&path, r#"{"action": "opened", "number": 3}"#).unwrap();

        let e = WebhookEvent::from_file(&path).unwrap();
        assert_eq!(e.number, Some(3));
    }

    #[test]
    fn unknown_fields_ignored() {
        let e = event(r#"{"action": "opened", "sender": {"login": "x"}, "installation": {}}"#);
        assert_eq!(e.kind(), EventKind::Opened);
    }
}
