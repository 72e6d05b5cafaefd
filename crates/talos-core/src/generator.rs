//! Passphrase generator used by first-run setup and the record editor.

use rand::Rng;
use zeroize::Zeroizing;

use crate::ValidationError;

/// Lowercase letters; always part of the alphabet.
pub const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
/// Uppercase letters.
pub const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
/// Decimal digits.
pub const DIGITS: &str = "0123456789";
/// Symbol characters.
pub const SYMBOLS: &str = "!@#$%^&*()_+~`|}{[]:;?><,./-=";

/// Shortest accepted passphrase.
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Longest accepted passphrase.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Length and character classes for one generated passphrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Number of characters to produce.
    pub length: usize,
    /// Include `A-Z`.
    pub uppercase: bool,
    /// Include `0-9`.
    pub digits: bool,
    /// Include [`SYMBOLS`].
    pub symbols: bool,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            length: 24,
            uppercase: true,
            digits: true,
            symbols: true,
        }
    }
}

impl PasswordPolicy {
    /// Checks the length bounds.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidLength`] outside
    /// [`MIN_PASSWORD_LENGTH`]..=[`MAX_PASSWORD_LENGTH`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&self.length) {
            return Err(ValidationError::InvalidLength {
                min: MIN_PASSWORD_LENGTH,
                max: MAX_PASSWORD_LENGTH,
                actual: self.length,
            });
        }
        Ok(())
    }

    /// Returns the characters this policy draws from.
    pub fn alphabet(&self) -> Vec<char> {
        let mut chars: Vec<char> = LOWERCASE.chars().collect();
        if self.uppercase {
            chars.extend(UPPERCASE.chars());
        }
        if self.digits {
            chars.extend(DIGITS.chars());
        }
        if self.symbols {
            chars.extend(SYMBOLS.chars());
        }
        chars
    }
}

/// Generates a passphrase from the thread-local RNG.
///
/// # Errors
/// Returns [`ValidationError::InvalidLength`] for out-of-range lengths.
pub fn generate_password(policy: &PasswordPolicy) -> Result<Zeroizing<String>, ValidationError> {
    generate_password_with(policy, &mut rand::rng())
}

/// Generates a passphrase from a caller-supplied RNG.
///
/// # Errors
/// Returns [`ValidationError::InvalidLength`] for out-of-range lengths.
pub fn generate_password_with<R: Rng + ?Sized>(
    policy: &PasswordPolicy,
    rng: &mut R,
) -> Result<Zeroizing<String>, ValidationError> {
    policy.validate()?;

    let alphabet = policy.alphabet();
    let mut output = Zeroizing::new(String::with_capacity(policy.length));
    for _ in 0..policy.length {
        output.push(alphabet[rng.random_range(0..alphabet.len())]);
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn respects_length_and_classes() {
        let policy = PasswordPolicy {
            length: 64,
            uppercase: false,
            digits: false,
            symbols: false,
        };
        let mut rng = StdRng::seed_from_u64(7);
        let generated = generate_password_with(&policy, &mut rng).expect("policy is valid");

        assert_eq!(generated.chars().count(), 64);
        assert!(generated.chars().all(|c| c.is_ascii_lowercase()));
    }

    #[test]
    fn rejects_out_of_range_length() {
        let policy = PasswordPolicy {
            length: 4,
            ..PasswordPolicy::default()
        };
        assert!(matches!(
            generate_password(&policy),
            Err(ValidationError::InvalidLength { actual: 4, .. })
        ));
    }
}
