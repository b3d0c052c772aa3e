// ABOUTME: Container image tag parsing and validation.
// ABOUTME: Handles formats like myapp, myapp:tag, namespace/myapp:tag.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseImageTagError {
    #[error("image tag cannot be empty")]
    Empty,

    #[error("invalid character in image tag: {0}")]
    InvalidChar(char),

    #[error("invalid image tag format: {0}")]
    InvalidFormat(String),
}

/// A validated image name with an optional tag component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTag {
    name: String,
    tag: Option<String>,
}

impl ImageTag {
    pub fn parse(input: &str) -> Result<Self, ParseImageTagError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageTagError::Empty);
        }

        for c in input.chars() {
            if !c.is_ascii_alphanumeric()
                && c != '/'
                && c != ':'
                && c != '.'
                && c != '-'
                && c != '_'
            {
                return Err(ParseImageTagError::InvalidChar(c));
            }
        }

        let (name, tag) = match input.rsplit_once(':') {
            // A colon followed by a slash belongs to a registry port, not a tag
            Some((before, after)) if !after.contains('/') => {
                (before.to_string(), Some(after.to_string()))
            }
            _ => (input.to_string(), None),
        };

        if name.is_empty() {
            return Err(ParseImageTagError::InvalidFormat(input.to_string()));
        }

        Ok(Self { name, tag })
    }

    /// The deterministic tag for an application image built from a commit.
    ///
    /// The short commit hash becomes the tag so every successful build is
    /// addressable and re-running a build for the same commit re-creates the
    /// same tag.
    pub fn for_build(app_name: &str, commit_hash: &str) -> Self {
        let short = commit_hash.get(..8).unwrap_or(commit_hash);
        Self {
            name: format!("berth/{app_name}"),
            tag: Some(short.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }
}

impl fmt::Display for ImageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}:{}", self.name, tag),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_name_only() {
        let t = ImageTag::parse("myapp").unwrap();
        assert_eq!(t.name(), "myapp");
        assert_eq!(t.tag(), None);
    }

    #[test]
    fn parses_name_and_tag() {
        let t = ImageTag::parse("berth/myapp:abc12345").unwrap();
        assert_eq!(t.name(), "berth/myapp");
        assert_eq!(t.tag(), Some("abc12345"));
    }

    #[test]
    fn registry_port_is_not_a_tag() {
        let t = ImageTag::parse("registry.local:5000/myapp").unwrap();
        assert_eq!(t.name(), "registry.local:5000/myapp");
        assert_eq!(t.tag(), None);
    }

    #[test]
    fn rejects_invalid_input() {
        assert!(ImageTag::parse("").is_err());
        assert!(ImageTag::parse("my app").is_err());
    }

    #[test]
    fn build_tag_uses_short_hash() {
        let t = ImageTag::for_build("myapp", "0123456789abcdef");
        assert_eq!(t.to_string(), "berth/myapp:01234567");
    }
}
