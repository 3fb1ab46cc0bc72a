//! Decoding of the diary's name and location tags.
//!
//! Name tags read `#Name 'Variety'` or `#Name`; location tags read `#Label`.
//! The plant catalogue uses the same layout with a double quote around the
//! common name.

use serde::{Deserialize, Serialize};

use crate::garden::tools::error::{Result, ToolError};

/// Marker and quote characters of a tag family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagStyle {
    pub marker: char,
    pub quote: char,
}

impl TagStyle {
    /// `#Name 'Variety'`
    pub const VARIETY: TagStyle = TagStyle {
        marker: '#',
        quote: '\'',
    };

    /// `#Name "Common name"`
    pub const COMMON_NAME: TagStyle = TagStyle {
        marker: '#',
        quote: '"',
    };

    /// Separator between the name and its quoted qualifier.
    pub fn delimiter(&self) -> String {
        format!(" {}", self.quote)
    }

    /// Whether the tag carries a quoted qualifier.
    pub fn is_qualified(&self, tag: &str) -> bool {
        tag.contains(&self.delimiter())
    }
}

impl Default for TagStyle {
    fn default() -> Self {
        TagStyle::VARIETY
    }
}

/// What to do with a tag that fails to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodePolicy {
    /// Log the failure and leave the affected plant out of the run.
    Skip,
    /// Fail the run.
    #[default]
    Abort,
}

impl DecodePolicy {
    /// Applies the policy to a decode result: `Ok(None)` means skip.
    pub fn resolve<T>(self, result: Result<T>) -> Result<Option<T>> {
        match (result, self) {
            (Ok(value), _) => Ok(Some(value)),
            (Err(error @ ToolError::Decode { .. }), DecodePolicy::Skip) => {
                tracing::warn!(%error, "skipping entry with malformed tag");
                Ok(None)
            }
            (Err(error), _) => Err(error),
        }
    }
}

/// Splits a name tag into `(name, qualifier)`. The qualifier is empty when
/// the tag carries none.
pub fn decode_name_tag(tag: &str, style: TagStyle) -> Result<(String, String)> {
    let body = strip_marker(tag, style)?;
    let delimiter = style.delimiter();

    if !body.contains(&delimiter) {
        if body.trim().is_empty() {
            return Err(ToolError::decode(tag, "empty name"));
        }
        return Ok((body.to_string(), String::new()));
    }

    let body = body
        .strip_suffix(style.quote)
        .ok_or_else(|| ToolError::decode(tag, format!("missing closing {}", style.quote)))?;
    let (name, qualifier) = body
        .split_once(&delimiter)
        .ok_or_else(|| ToolError::decode(tag, "unterminated qualifier"))?;

    if name.trim().is_empty() {
        return Err(ToolError::decode(tag, "empty name"));
    }
    if qualifier.trim().is_empty() {
        return Err(ToolError::decode(tag, "empty qualifier"));
    }
    Ok((name.to_string(), qualifier.to_string()))
}

/// Strips the marker from a location tag.
pub fn decode_location_tag(tag: &str, style: TagStyle) -> Result<String> {
    let label = strip_marker(tag, style)?;
    if label.trim().is_empty() {
        return Err(ToolError::decode(tag, "empty location label"));
    }
    Ok(label.to_string())
}

/// Inverse of [`decode_name_tag`].
pub fn encode_name_tag(name: &str, qualifier: &str, style: TagStyle) -> String {
    if qualifier.is_empty() {
        format!("{}{name}", style.marker)
    } else {
        format!("{}{name} {q}{qualifier}{q}", style.marker, q = style.quote)
    }
}

/// Inverse of [`decode_location_tag`].
pub fn encode_location_tag(label: &str, style: TagStyle) -> String {
    format!("{}{label}", style.marker)
}

fn strip_marker(tag: &str, style: TagStyle) -> Result<&str> {
    tag.strip_prefix(style.marker)
        .ok_or_else(|| ToolError::decode(tag, format!("missing leading {}", style.marker)))
}
