//! Document codec: parse and serialize guidance files, compute content IDs.
//!
//! A guidance file is a byte stream of:
//!
//! 1. the opening delimiter `---\n`,
//! 2. a YAML mapping with at least `title`, optionally `description` and
//!    `tags`,
//! 3. the closing delimiter `\n---\n`,
//! 4. the Markdown body, verbatim, to end of file.
//!
//! Parsing is strict: absence of either delimiter is a failure, and no
//! repair is attempted. The strictness lets hand-edited files be flagged as
//! malformed early instead of being silently truncated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Error, Result};

/// Opening delimiter: three dashes followed by LF.
pub const OPEN_DELIMITER: &str = "---\n";

/// Closing delimiter: LF, three dashes, LF. Located searching only after
/// the opening delimiter.
pub const CLOSE_DELIMITER: &str = "\n---\n";

/// The YAML frontmatter mapping at the head of a guidance file.
///
/// Standard fields default to empty and are omitted from serialized output
/// when empty; any additional mapping keys are captured in `custom`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frontmatter {
    /// Entity title.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    /// Entity description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Tag set, in source order. Sorting is the caller's responsibility.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Any additional frontmatter fields.
    #[serde(default, flatten)]
    pub custom: BTreeMap<String, serde_yaml::Value>,
}

/// A parsed guidance document: frontmatter plus verbatim body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    /// Parsed frontmatter mapping.
    pub frontmatter: Frontmatter,
    /// Markdown body after the closing delimiter, preserved byte-for-byte.
    pub body: String,
}

/// Parse a guidance file.
///
/// # Errors
///
/// Returns [`Error::MalformedDocument`] when the bytes are not UTF-8, the
/// opening delimiter is absent, the closing delimiter cannot be located
/// after the opening one, or the YAML block does not decode.
pub fn parse(bytes: &[u8]) -> Result<Document> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::MalformedDocument(format!("document is not valid UTF-8: {e}")))?;

    let Some(rest) = text.strip_prefix(OPEN_DELIMITER) else {
        return Err(Error::MalformedDocument(
            "missing opening frontmatter delimiter".into(),
        ));
    };

    let close = rest.find(CLOSE_DELIMITER).ok_or_else(|| {
        Error::MalformedDocument("missing closing frontmatter delimiter".into())
    })?;

    let yaml = &rest[..close];
    let body = &rest[close + CLOSE_DELIMITER.len()..];

    let frontmatter = if yaml.trim().is_empty() {
        Frontmatter::default()
    } else {
        serde_yaml::from_str(yaml)
            .map_err(|e| Error::MalformedDocument(format!("invalid frontmatter YAML: {e}")))?
    };

    Ok(Document {
        frontmatter,
        body: body.to_string(),
    })
}

/// Serialize a document back to its on-disk form.
///
/// Emits the frontmatter fields, the delimiter pair with exactly one
/// newline between the YAML block and the closing delimiter, then the body.
/// A non-empty body that does not end with a newline gets one appended.
pub fn serialize(doc: &Document) -> Result<String> {
    let mut yaml = serde_yaml::to_string(&doc.frontmatter)
        .map_err(|e| Error::Serialization(format!("failed to serialize frontmatter: {e}")))?;
    while yaml.ends_with('\n') {
        yaml.pop();
    }

    let mut out = String::with_capacity(OPEN_DELIMITER.len() + yaml.len() + doc.body.len() + 8);
    out.push_str(OPEN_DELIMITER);
    out.push_str(&yaml);
    out.push_str(CLOSE_DELIMITER);
    out.push_str(&doc.body);
    if !doc.body.is_empty() && !doc.body.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

/// Content ID of a body: SHA-256 of the body bytes as lowercase hex.
///
/// Deterministic, recomputed on every read, never trusted from external
/// metadata.
#[must_use]
pub fn content_id(body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body.as_bytes());
    format!("{:x}", hasher.finalize())
}
