//! `scheme://bucket/prefix` storage locations.

use crate::errors::{ExError, ExErrorKind};
use std::fmt;

/// Parsed storage location.
///
/// A string without `://` is treated as a local path (`file` scheme).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    scheme: String,
    bucket: String,
    prefix: String,
}

impl Location {
    /// # Errors
    ///
    /// `InvalidInput` for an empty location or a URL without a bucket.
    pub fn parse(location: &str) -> Result<Self, ExError> {
        let invalid = |reason: &str| {
            ExError::new(ExErrorKind::InvalidInput)
                .with_op("parse_location")
                .with_message(format!("invalid location '{}': {}", location, reason))
        };

        if location.trim().is_empty() {
            return Err(invalid("empty"));
        }

        let Some((scheme, rest)) = location.split_once("://") else {
            return Ok(Self {
                scheme: "file".to_string(),
                bucket: String::new(),
                prefix: location.trim_end_matches('/').to_string(),
            });
        };

        if scheme == "file" {
            return Ok(Self {
                scheme: scheme.to_string(),
                bucket: String::new(),
                prefix: trim_trailing(rest),
            });
        }

        let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(invalid("missing bucket"));
        }
        Ok(Self {
            scheme: scheme.to_string(),
            bucket: bucket.to_string(),
            prefix: prefix.trim_matches('/').to_string(),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Key prefix inside the bucket (no leading or trailing `/`), or the
    /// directory path for `file` locations.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Full key of `relative` under this location.
    pub fn key_for(&self, relative: &str) -> String {
        if self.prefix.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", self.prefix, relative)
        }
    }

    /// Part of `key` below this location, if it lies under it.
    pub fn relative<'a>(&self, key: &'a str) -> Option<&'a str> {
        if self.prefix.is_empty() {
            return Some(key);
        }
        key.strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
    }
}

fn trim_trailing(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.scheme == "file" {
            return write!(f, "file://{}", self.prefix);
        }
        write!(f, "{}://{}", self.scheme, self.bucket)?;
        if !self.prefix.is_empty() {
            write!(f, "/{}", self.prefix)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bucket_and_prefix() {
        let loc = Location::parse("mem://docs/neurips/2023/").unwrap();
        assert_eq!(loc.scheme(), "mem");
        assert_eq!(loc.bucket(), "docs");
        assert_eq!(loc.prefix(), "neurips/2023");
        assert_eq!(loc.to_string(), "mem://docs/neurips/2023");
        assert_eq!(loc.relative("neurips/2023/a.pdf"), Some("a.pdf"));
        assert_eq!(loc.relative("neurips/2023a.pdf"), None);
        assert_eq!(loc.key_for("a.pdf"), "neurips/2023/a.pdf");
    }

    #[test]
    fn test_plain_path_is_file_scheme() {
        let loc = Location::parse("/data/pdfs/").unwrap();
        assert_eq!(loc.scheme(), "file");
        assert_eq!(loc.prefix(), "/data/pdfs");
        assert_eq!(loc.to_string(), "file:///data/pdfs");
        assert_eq!(Location::parse("file:///data/pdfs").unwrap(), loc);
    }

    #[test]
    fn test_missing_bucket_is_invalid() {
        let err = Location::parse("mem:///x").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        assert!(Location::parse("").is_err());
    }
}
