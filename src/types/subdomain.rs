// ABOUTME: DNS-compatible subdomain label validation.
// ABOUTME: Ensures assigned subdomains follow RFC 1123 label requirements.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubdomainError {
    #[error("subdomain cannot be empty")]
    Empty,

    #[error("subdomain exceeds maximum length of 63 characters")]
    TooLong,

    #[error("subdomain cannot start with a hyphen")]
    StartsWithHyphen,

    #[error("subdomain cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("subdomain must be lowercase")]
    NotLowercase,

    #[error("invalid character in subdomain: '{0}'")]
    InvalidChar(char),
}

/// A validated subdomain label (the `myapp` in `myapp.example.com`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Subdomain(String);

impl Subdomain {
    pub fn new(value: &str) -> Result<Self, SubdomainError> {
        if value.is_empty() {
            return Err(SubdomainError::Empty);
        }

        if value.len() > 63 {
            return Err(SubdomainError::TooLong);
        }

        if value.starts_with('-') {
            return Err(SubdomainError::StartsWithHyphen);
        }

        if value.ends_with('-') {
            return Err(SubdomainError::EndsWithHyphen);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(SubdomainError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(SubdomainError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The fully qualified host under a base domain.
    pub fn fqdn(&self, base_domain: &str) -> String {
        format!("{}.{}", self.0, base_domain)
    }
}

impl fmt::Display for Subdomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Subdomain {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Subdomain::new(&value).map_err(serde::de::Error::custom)
    }
}
