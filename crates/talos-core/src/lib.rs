#![warn(missing_docs)]
//! # talos-core
//!
//! ## Purpose
//! Defines the secret-record model and the line-oriented text codec shared by
//! every `talos-client` crate.
//!
//! ## Responsibilities
//! - Represent one credential record ([`SecretRecord`]) with redaction-aware
//!   password state ([`Password`]).
//! - Decode record blobs returned by the decrypt endpoint.
//! - Encode edited records for the save endpoint, including the keep-marker
//!   protocol for editing a record without ever fetching its secret.
//! - Generate passphrases and validate record/category paths before any
//!   request leaves the client.
//!
//! ## Data flow
//! Decrypt response text -> [`decode`] -> [`SecretRecord`] -> view/edit form ->
//! [`encode`] -> save request content.
//!
//! ## Ownership and lifetimes
//! Records own their strings and are built per read or per write. They are not
//! meant to be cached: dropping a record wipes its fields.
//!
//! ## Error model
//! Decoding never fails; any text decodes to some record. Client-side input
//! checks return [`ValidationError`].
//!
//! ## Security and privacy notes
//! - `Debug` output never prints the password or the note.
//! - The hidden marker is never surfaced as a literal password and never
//!   echoed back to the server.
//!
//! ## Example
//! ```rust
//! use talos_core::{decode, encode, Password};
//!
//! let record = decode("__TALOS_HIDDEN_SECRET__\nUser: bob");
//! assert_eq!(record.password, Password::Hidden);
//! assert_eq!(record.username, "bob");
//!
//! let blob = encode(&record, true, false);
//! assert_eq!(blob, "__TALOS_KEEP_SECRET__\nUser: bob");
//! ```

use std::fmt;

use thiserror::Error;
use zeroize::Zeroize;

mod generator;
mod path;

pub use generator::{
    DIGITS, LOWERCASE, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH, PasswordPolicy, SYMBOLS,
    UPPERCASE, generate_password, generate_password_with,
};
pub use path::{PATH_SEPARATOR, record_name, validate_category_path, validate_record_path};

/// Token the server substitutes for a withheld secret.
pub const HIDDEN_SECRET_TOKEN: &str = "__TALOS_HIDDEN_SECRET__";

/// Token the client sends to keep the stored secret unchanged.
pub const KEEP_SECRET_TOKEN: &str = "__TALOS_KEEP_SECRET__";

/// Metadata prefix carrying the username.
pub const USER_PREFIX: &str = "User: ";

/// Metadata prefix carrying the URL.
pub const URL_PREFIX: &str = "URL: ";

/// Sentinel tokens standing in for a secret value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedactionMarker {
    /// Server to client: the real secret was withheld.
    Hidden,
    /// Client to server: keep the stored secret, apply other edits only.
    Keep,
}

impl RedactionMarker {
    /// Returns the wire token for this marker.
    pub fn token(self) -> &'static str {
        match self {
            Self::Hidden => HIDDEN_SECRET_TOKEN,
            Self::Keep => KEEP_SECRET_TOKEN,
        }
    }

    /// Matches `value` exactly against both marker tokens.
    pub fn from_token(value: &str) -> Option<Self> {
        match value {
            HIDDEN_SECRET_TOKEN => Some(Self::Hidden),
            KEEP_SECRET_TOKEN => Some(Self::Keep),
            _ => None,
        }
    }
}

/// Password slot of a record.
#[derive(Clone, PartialEq, Eq)]
pub enum Password {
    /// Literal secret value (may be empty).
    Literal(String),
    /// Value intentionally withheld by the server.
    Hidden,
}

impl Password {
    /// Creates a literal password.
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    /// Returns `true` when the server withheld the value.
    pub fn is_hidden(&self) -> bool {
        matches!(self, Self::Hidden)
    }

    /// Returns the literal value, or `None` when hidden.
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Literal(value) => Some(value),
            Self::Hidden => None,
        }
    }
}

impl Default for Password {
    fn default() -> Self {
        Self::Literal(String::new())
    }
}

impl Zeroize for Password {
    fn zeroize(&mut self) {
        if let Self::Literal(value) = self {
            value.zeroize();
        }
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) if value.is_empty() => f.write_str("Literal(<empty>)"),
            Self::Literal(_) => f.write_str("Literal(<redacted>)"),
            Self::Hidden => f.write_str("Hidden"),
        }
    }
}

/// One credential entry.
///
/// Empty strings mean the optional field is absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretRecord {
    /// Secret value or hidden marker.
    pub password: Password,
    /// Optional account name.
    pub username: String,
    /// Optional site URL.
    pub url: String,
    /// Optional multi-line free text.
    pub note: String,
}

impl SecretRecord {
    /// Creates a record with only a password set.
    pub fn new(password: Password) -> Self {
        Self {
            password,
            username: String::new(),
            url: String::new(),
            note: String::new(),
        }
    }

    /// Sets the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Sets the URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }

    /// Returns `true` when the password was withheld by the server.
    pub fn is_redacted(&self) -> bool {
        self.password.is_hidden()
    }
}

impl Drop for SecretRecord {
    fn drop(&mut self) {
        self.password.zeroize();
        self.username.zeroize();
        self.url.zeroize();
        self.note.zeroize();
    }
}

impl fmt::Debug for SecretRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRecord")
            .field("password", &self.password)
            .field("username", &self.username)
            .field("url", &self.url)
            .field("note_len", &self.note.len())
            .finish()
    }
}

/// Metadata tags recognised on lines after the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTag {
    /// `User: ` line.
    User,
    /// `URL: ` line.
    Url,
}

impl FieldTag {
    /// Returns the line prefix for this tag.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::User => USER_PREFIX,
            Self::Url => URL_PREFIX,
        }
    }
}

/// Role of one blob line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// Line 0, whatever its content.
    Password(&'a str),
    /// Tagged metadata line with the prefix stripped.
    Field(FieldTag, &'a str),
    /// Any other line; part of the note.
    NoteLine(&'a str),
}

/// Classifies one blob line by position and prefix.
///
/// Line 0 is the password by position only; prefixes are never consulted
/// there.
pub fn classify_line(index: usize, line: &str) -> LineKind<'_> {
    if index == 0 {
        return LineKind::Password(line);
    }

    for tag in [FieldTag::User, FieldTag::Url] {
        if let Some(rest) = line.strip_prefix(tag.prefix()) {
            return LineKind::Field(tag, rest);
        }
    }

    LineKind::NoteLine(line)
}

/// Decodes a record blob as returned by the decrypt endpoint.
///
/// # Semantics
/// - Line 0 equal to [`HIDDEN_SECRET_TOKEN`] yields [`Password::Hidden`];
///   otherwise it is the literal password.
/// - Repeated `User: ` / `URL: ` lines overwrite earlier ones (last wins).
/// - Untagged lines are newline-joined in order and trimmed into the note.
pub fn decode(blob: &str) -> SecretRecord {
    let mut record = SecretRecord::default();
    let mut note_lines: Vec<&str> = Vec::new();

    for (index, line) in blob.split('\n').enumerate() {
        match classify_line(index, line) {
            LineKind::Password(value) => {
                record.password = match RedactionMarker::from_token(value) {
                    Some(RedactionMarker::Hidden) => Password::Hidden,
                    _ => Password::literal(value),
                };
            }
            LineKind::Field(FieldTag::User, value) => record.username = value.to_string(),
            LineKind::Field(FieldTag::Url, value) => record.url = value.to_string(),
            LineKind::NoteLine(value) => note_lines.push(value),
        }
    }

    record.note = note_lines.join("\n").trim().to_string();
    record
}

/// Encodes a record for the save endpoint.
///
/// # Semantics
/// - `was_redacted && !user_edited_password` emits [`KEEP_SECRET_TOKEN`] as
///   line 0, whatever the other fields hold.
/// - Otherwise line 0 is the literal password, including the empty string.
///   A hidden password on this path is emitted as an empty line.
/// - Non-empty URL, username and note follow, in that order. Line breaks
///   inside username/URL are flattened to spaces.
pub fn encode(record: &SecretRecord, was_redacted: bool, user_edited_password: bool) -> String {
    let mut blob = if was_redacted && !user_edited_password {
        RedactionMarker::Keep.token().to_string()
    } else {
        record.password.as_literal().unwrap_or_default().to_string()
    };

    if !record.url.is_empty() {
        blob.push('\n');
        blob.push_str(URL_PREFIX);
        blob.push_str(&single_line(&record.url));
    }
    if !record.username.is_empty() {
        blob.push('\n');
        blob.push_str(USER_PREFIX);
        blob.push_str(&single_line(&record.username));
    }
    if !record.note.is_empty() {
        blob.push('\n');
        blob.push_str(&record.note);
    }

    blob
}

/// Checks that [`encode`] output of `record` decodes back to the same fields.
///
/// # Errors
/// - [`ValidationError::MultilinePassword`] for a literal password with a
///   line break.
/// - [`ValidationError::TaggedNoteLine`] for a note line carrying a field
///   prefix.
pub fn check_encodable(record: &SecretRecord) -> Result<(), ValidationError> {
    if record
        .password
        .as_literal()
        .is_some_and(|password| password.contains('\n'))
    {
        return Err(ValidationError::MultilinePassword);
    }

    for line in record.note.split('\n') {
        if let LineKind::Field(tag, _) = classify_line(1, line) {
            return Err(ValidationError::TaggedNoteLine {
                prefix: tag.prefix(),
            });
        }
    }
    Ok(())
}

fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

/// Client-side input rejections raised before any request is sent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Record or category name is missing.
    #[error("a name for the secret is required")]
    EmptyName,
    /// Record path ends in a separator and names no record.
    #[error("record path must not end with '/'")]
    TrailingSeparator,
    /// Path starts at the root instead of inside the store.
    #[error("path must be relative to the store root")]
    AbsolutePath,
    /// Path contains a `..` segment.
    #[error("path must not contain '..' segments")]
    TraversalSegment,
    /// Literal password collides with a marker token.
    #[error("password collides with a reserved marker token")]
    ReservedMarker,
    /// Password spans several lines and would spill into the metadata.
    #[error("password must be a single line")]
    MultilinePassword,
    /// Note line would be read back as a metadata field.
    #[error("note lines must not start with {prefix:?}")]
    TaggedNoteLine {
        /// Colliding field prefix.
        prefix: &'static str,
    },
    /// Input required for the requested operation is blank.
    #[error("{0} must not be empty")]
    EmptyInput(&'static str),
    /// Generator length outside the supported range.
    #[error("password length must be between {min} and {max}, got {actual}")]
    InvalidLength {
        /// Smallest accepted length.
        min: usize,
        /// Largest accepted length.
        max: usize,
        /// Requested length.
        actual: usize,
    },
}
