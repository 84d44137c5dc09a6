use serde::{Deserialize, Serialize};

use crate::errors::{DocTrackError, Result};

/// Slash-separated document path, e.g. `stores/s1/products/p1`
///
/// Segments alternate collection name and document id, so a path naming a
/// document always has an even number of segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocPath(String);

impl DocPath {
    /// Parse and validate a path; leading and trailing slashes are tolerated
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Err(invalid(raw, "path is empty"));
        }
        if trimmed.split('/').any(str::is_empty) {
            return Err(invalid(raw, "path contains an empty segment"));
        }
        if trimmed.contains("[id=") {
            return Err(invalid(raw, "path contains a list selector"));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Parse a path that must name a document
    ///
    /// # Errors
    ///
    /// `InvalidPath` for malformed paths and for paths with an odd number of
    /// segments.
    pub fn document(raw: &str) -> Result<Self> {
        let path = Self::parse(raw)?;
        if !path.is_document() {
            return Err(invalid(raw, "path names a collection, not a document"));
        }
        Ok(path)
    }

    /// `<collection>/<id>` at the top level
    ///
    /// # Errors
    ///
    /// `InvalidPath` when either part is not a single segment.
    pub fn root(collection: &str, id: &str) -> Result<Self> {
        check_segment(collection)?;
        check_segment(id)?;
        Self::document(&format!("{}/{}", collection, id))
    }

    /// Append a relative path; the result must name a document
    pub fn join(&self, relative: &str) -> Result<Self> {
        Self::document(&format!("{}/{}", self.0, relative.trim_matches('/')))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Whether the path names a document rather than a collection
    pub fn is_document(&self) -> bool {
        self.segments().count() % 2 == 0
    }

    /// Number of documents from the root down to this one
    pub fn depth(&self) -> usize {
        self.segments().count() / 2
    }

    /// Last segment
    pub fn leaf(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Everything before the last segment
    pub fn parent(&self) -> Option<&str> {
        self.0.rsplit_once('/').map(|(head, _)| head)
    }

    /// Path of the document owning the collection this document lives in
    pub fn parent_document(&self) -> Option<&str> {
        self.parent()
            .and_then(|collection| collection.rsplit_once('/'))
            .map(|(head, _)| head)
    }
}

/// Reject values that would not stay one segment once placed in a path
///
/// # Errors
///
/// `InvalidPath` for empty values and values containing `/`.
pub fn check_segment(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(invalid(value, "segment is empty"));
    }
    if value.contains('/') {
        return Err(invalid(value, "segment contains '/'"));
    }
    Ok(())
}

fn invalid(path: &str, reason: &str) -> DocTrackError {
    DocTrackError::InvalidPath {
        path: path.to_string(),
        reason: reason.to_string(),
    }
}

impl std::fmt::Display for DocPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DocPath {
    type Error = DocTrackError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DocPath> for String {
    fn from(value: DocPath) -> Self {
        value.0
    }
}
