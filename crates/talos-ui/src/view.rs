//! Read-only record view.

use talos_core::{SecretRecord, record_name};

/// Stand-in shown for every password, hidden or not.
pub const PASSWORD_MASK: &str = "••••••••••••";

/// Description shown when a record has no note.
pub const EMPTY_DESCRIPTION: &str = "No description.";

/// Display projection of one record. Holds no password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordView {
    /// Store path.
    pub path: String,
    /// Last path segment.
    pub name: String,
    /// Site URL, empty when absent.
    pub url: String,
    /// Account name, empty when absent.
    pub username: String,
    /// Note, or [`EMPTY_DESCRIPTION`].
    pub description: String,
}

impl RecordView {
    /// Builds the view of `record` stored at `path`.
    pub fn from_record(path: &str, record: &SecretRecord) -> Self {
        let description = if record.note.is_empty() {
            EMPTY_DESCRIPTION.to_string()
        } else {
            record.note.clone()
        };

        Self {
            path: path.to_string(),
            name: record_name(path).to_string(),
            url: record.url.clone(),
            username: record.username.clone(),
            description,
        }
    }

    /// Label/value rows in display order: password, URL, user.
    pub fn rows(&self) -> Vec<(&'static str, &str)> {
        let mut rows = vec![("Password", PASSWORD_MASK)];
        if !self.url.is_empty() {
            rows.push(("URL", self.url.as_str()));
        }
        if !self.username.is_empty() {
            rows.push(("User", self.username.as_str()));
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use talos_core::{HIDDEN_SECRET_TOKEN, decode};

    use super::*;

    #[test]
    fn hidden_marker_never_reaches_the_view() {
        let record = decode(&format!("{HIDDEN_SECRET_TOKEN}\nUser: alice"));
        let view = RecordView::from_record("Social/forum", &record);

        assert_eq!(view.name, "forum");
        assert_eq!(view.description, EMPTY_DESCRIPTION);
        assert_eq!(view.rows(), vec![("Password", PASSWORD_MASK), ("User", "alice")]);
        assert!(!format!("{view:?}").contains(HIDDEN_SECRET_TOKEN));
    }
}
