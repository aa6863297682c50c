//! Institutional email policy.
//!
//! Only addresses on one of the institution's domains may be associated
//! with a card. Addresses are normalised (trimmed, lower-cased) before they
//! are checked so that uniqueness in the identity table is case-insensitive.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

/// Domains accepted when `ALLOWED_EMAIL_DOMAINS` is not configured.
pub const DEFAULT_ALLOWED_DOMAINS: &[&str] = &["epitech.eu", "epitech.digital"];

/// Local part and domain of an address, captured separately.
const ADDRESS_PATTERN: &str = r"^[a-z0-9._%+\-]+@([a-z0-9\-]+(?:\.[a-z0-9\-]+)+)$";

static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ADDRESS_PATTERN).expect("valid regex"));

#[derive(Debug, Clone)]
pub struct EmailPolicy {
    allowed_domains: Vec<String>,
}

impl Default for EmailPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOWED_DOMAINS.iter().copied())
    }
}

impl EmailPolicy {
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_domains = domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_start_matches('@').to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { allowed_domains }
    }

    /// Parse a comma-separated domain list, e.g. `epitech.eu,epitech.digital`.
    pub fn from_csv(csv: &str) -> Self {
        Self::new(csv.split(','))
    }

    pub fn allowed_domains(&self) -> &[String] {
        &self.allowed_domains
    }

    /// Validate and normalise an address.
    ///
    /// Returns the lower-cased address, or [`CoreError::Validation`] when the
    /// shape is wrong or the domain is not one of the allowed domains.
    pub fn normalize(&self, raw: &str) -> Result<String, CoreError> {
        let email = raw.trim().to_ascii_lowercase();
        if email.is_empty() {
            return Err(CoreError::Validation("email is required".to_string()));
        }

        let caps = ADDRESS_RE
            .captures(&email)
            .ok_or_else(|| CoreError::Validation(format!("'{email}' is not a valid email")))?;

        let domain = &caps[1];
        if !self.allowed_domains.iter().any(|d| d == domain) {
            return Err(CoreError::Validation(format!(
                "email domain must be one of: {}",
                self.allowed_domains.join(", ")
            )));
        }

        Ok(email)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
