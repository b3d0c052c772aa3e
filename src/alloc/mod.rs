// ABOUTME: Network identity allocator: unique subdomains and static host ports.
// ABOUTME: Sanitizes app names and reserves identities atomically through the store.

use crate::records::{RecordStore, StoreError};
use crate::types::{Subdomain, SubdomainError};
use rand::Rng;
use rand::distributions::Alphanumeric;

const MAX_SUBDOMAIN_LEN: usize = 63;
const SUFFIX_LEN: usize = 6;
const MAX_ATTEMPTS: usize = 16;

/// Errors from identity allocation.
#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error("no free ports available in the configured range")]
    NoPortsAvailable,

    #[error("could not find a free subdomain for {0}")]
    SubdomainExhausted(String),

    #[error("invalid subdomain candidate: {0}")]
    Invalid(#[from] SubdomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Turn an arbitrary application name into valid subdomain material.
///
/// Lowercases, maps anything outside `[a-z0-9-]` to a hyphen, collapses runs
/// of hyphens, and strips them from the ends. An input with nothing usable
/// left gets a random placeholder.
pub fn sanitize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_hyphen = true; // suppress leading hyphens

    for c in name.to_lowercase().chars() {
        let mapped = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            Some(c)
        } else {
            None
        };
        match mapped {
            Some(c) => {
                out.push(c);
                last_hyphen = false;
            }
            None => {
                if !last_hyphen {
                    out.push('-');
                    last_hyphen = true;
                }
            }
        }
    }

    while out.ends_with('-') {
        out.pop();
    }
    out.truncate(MAX_SUBDOMAIN_LEN);
    while out.ends_with('-') {
        out.pop();
    }

    if out.is_empty() {
        return format!("app-{}", random_suffix());
    }
    out
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .map(char::from)
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .take(SUFFIX_LEN)
        .collect()
}

/// Allocate a unique subdomain derived from the application name.
///
/// The first candidate is the sanitized name itself; collisions get a random
/// suffix. Reservation is a single store-level reserve-if-absent, never a
/// lookup followed by an insert.
pub async fn allocate_subdomain<S>(store: &S, base_name: &str) -> Result<Subdomain, AllocError>
where
    S: RecordStore + ?Sized,
{
    let base = sanitize(base_name);

    for attempt in 0..MAX_ATTEMPTS {
        let candidate = if attempt == 0 {
            base.clone()
        } else {
            let mut stem = base.clone();
            stem.truncate(MAX_SUBDOMAIN_LEN - SUFFIX_LEN - 1);
            while stem.ends_with('-') {
                stem.pop();
            }
            format!("{}-{}", stem, random_suffix())
        };

        let subdomain = Subdomain::new(&candidate)?;
        if store.reserve_subdomain(&subdomain).await? {
            return Ok(subdomain);
        }
    }

    Err(AllocError::SubdomainExhausted(base))
}

/// Allocate a free host port from the configured static range, lowest first.
pub async fn allocate_port<S>(store: &S, start: u16, end: u16) -> Result<u16, AllocError>
where
    S: RecordStore + ?Sized,
{
    for port in start..=end {
        if store.reserve_port(port).await? {
            return Ok(port);
        }
    }
    Err(AllocError::NoPortsAvailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::MemoryStore;

    #[test]
    fn sanitize_maps_punctuation_and_spaces() {
        assert_eq!(sanitize("My App!"), "my-app");
        assert_eq!(sanitize("  Hello   World  "), "hello-world");
        assert_eq!(sanitize("already-fine-123"), "already-fine-123");
    }

    #[test]
    fn sanitize_collapses_hyphen_runs() {
        assert_eq!(sanitize("a---b"), "a-b");
        assert_eq!(sanitize("--edge--"), "edge");
    }

    #[test]
    fn sanitize_empty_input_gets_placeholder() {
        let out = sanitize("!!!");
        assert!(out.starts_with("app-"));
        assert_eq!(out.len(), 4 + SUFFIX_LEN);
    }

    #[test]
    fn sanitize_truncates_to_subdomain_limit() {
        let long = "x".repeat(200);
        assert_eq!(sanitize(&long).len(), MAX_SUBDOMAIN_LEN);
    }

    #[tokio::test]
    async fn collision_gets_random_suffix() {
        let store = MemoryStore::new();
        let first = allocate_subdomain(&store, "blog").await.unwrap();
        assert_eq!(first.as_str(), "blog");

        let second = allocate_subdomain(&store, "blog").await.unwrap();
        assert_ne!(second.as_str(), "blog");
        assert!(second.as_str().starts_with("blog-"));
    }

    #[tokio::test]
    async fn ports_allocate_lowest_first_and_exhaust() {
        let store = MemoryStore::new();
        assert_eq!(allocate_port(&store, 9000, 9001).await.unwrap(), 9000);
        assert_eq!(allocate_port(&store, 9000, 9001).await.unwrap(), 9001);
        assert!(matches!(
            allocate_port(&store, 9000, 9001).await,
            Err(AllocError::NoPortsAvailable)
        ));
    }
}
