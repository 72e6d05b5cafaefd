//! Record edit form and its save encoding.

use std::fmt;

use talos_contract::SaveRequest;
use talos_core::{
    PATH_SEPARATOR, Password, PasswordPolicy, RedactionMarker, SecretRecord, ValidationError,
    check_encodable, encode, generate_password, validate_category_path, validate_record_path,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Placeholder shown in the password input of a record whose secret was
/// withheld.
pub const HIDDEN_PASSWORD_PLACEHOLDER: &str = "(Unchanged) Leave empty to keep current password";

/// Create/edit form for one record.
///
/// The password input starts empty for a record loaded with a hidden
/// password; leaving it untouched saves the keep marker.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EditForm {
    /// Destination path.
    pub path: String,
    original_path: Option<String>,
    password: String,
    was_redacted: bool,
    password_touched: bool,
    /// Account name.
    pub username: String,
    /// Site URL.
    pub url: String,
    /// Free text.
    pub note: String,
}

impl EditForm {
    /// Empty form for a new record, optionally inside `category`.
    pub fn for_new(category: Option<&str>) -> Self {
        let path = category
            .and_then(|category| validate_category_path(category).ok())
            .map(|category| format!("{category}{PATH_SEPARATOR}"))
            .unwrap_or_default();

        Self {
            path,
            original_path: None,
            password: String::new(),
            was_redacted: false,
            password_touched: false,
            username: String::new(),
            url: String::new(),
            note: String::new(),
        }
    }

    /// Form prefilled from a decrypted record stored at `path`.
    pub fn from_record(path: &str, record: &SecretRecord) -> Self {
        Self {
            path: path.to_string(),
            original_path: Some(path.to_string()),
            password: record.password.as_literal().unwrap_or_default().to_string(),
            was_redacted: record.is_redacted(),
            password_touched: false,
            username: record.username.clone(),
            url: record.url.clone(),
            note: record.note.clone(),
        }
    }

    /// Path the record was loaded from; `None` for new records.
    pub fn original_path(&self) -> Option<&str> {
        self.original_path.as_deref()
    }

    /// Current password input.
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Placeholder to show while the stored secret is kept.
    pub fn password_placeholder(&self) -> Option<&'static str> {
        (self.was_redacted && !self.password_touched).then_some(HIDDEN_PASSWORD_PLACEHOLDER)
    }

    /// Returns `true` when saving would keep the stored secret.
    pub fn keeps_stored_password(&self) -> bool {
        self.was_redacted && !self.password_touched
    }

    /// Replaces the password input. Any call counts as an edit, including
    /// setting it to empty.
    pub fn set_password(&mut self, value: &str) {
        self.password.zeroize();
        self.password = value.to_string();
        self.password_touched = true;
    }

    /// Fills the password input with a generated passphrase.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidLength`] for an invalid policy.
    pub fn generate_password(&mut self, policy: &PasswordPolicy) -> Result<(), ValidationError> {
        let generated = generate_password(policy)?;
        self.set_password(&generated);
        Ok(())
    }

    /// Encodes the form into a save request.
    ///
    /// # Errors
    /// - Path errors from [`validate_record_path`].
    /// - [`ValidationError::ReservedMarker`] when the typed password equals a
    ///   marker token.
    /// - [`ValidationError::MultilinePassword`] and
    ///   [`ValidationError::TaggedNoteLine`] for input the line format cannot
    ///   hold.
    pub fn to_save_request(&self) -> Result<SaveRequest, ValidationError> {
        let path = validate_record_path(&self.path)?;

        let keep = self.keeps_stored_password();
        if !keep && RedactionMarker::from_token(&self.password).is_some() {
            return Err(ValidationError::ReservedMarker);
        }

        let password = if keep {
            Password::Hidden
        } else {
            Password::literal(self.password.as_str())
        };
        let record = SecretRecord::new(password)
            .with_username(self.username.trim())
            .with_url(self.url.trim())
            .with_note(self.note.trim());
        check_encodable(&record)?;

        Ok(SaveRequest {
            path: path.to_string(),
            content: encode(&record, self.was_redacted, self.password_touched),
            original_path: self.original_path.clone(),
        })
    }
}

impl fmt::Debug for EditForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditForm")
            .field("path", &self.path)
            .field("original_path", &self.original_path)
            .field("was_redacted", &self.was_redacted)
            .field("password_touched", &self.password_touched)
            .field("username", &self.username)
            .field("url", &self.url)
            .field("note_len", &self.note.len())
            .finish()
    }
}
