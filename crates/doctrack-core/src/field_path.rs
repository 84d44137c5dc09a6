//! Dotted field paths used as UPDATE keys
//!
//! Segments are joined with `.`. A segment that is empty or holds `.`, `[`,
//! `` ` `` or `\` is wrapped in backticks, with `` ` `` and `\` escaped by a
//! backslash, so any map key reaches [`apply_command`](crate::apply::apply_command)
//! as the key it was in the snapshot.

use std::borrow::Cow;

/// Quote `segment` if it cannot appear bare in a dotted path
pub fn quote(segment: &str) -> Cow<'_, str> {
    if !segment.is_empty() && !segment.contains(['.', '[', '`', '\\']) {
        return Cow::Borrowed(segment);
    }
    let mut out = String::with_capacity(segment.len() + 2);
    out.push('`');
    for c in segment.chars() {
        if c == '`' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('`');
    Cow::Owned(out)
}

/// Append one raw segment to a dotted path
pub fn join(parent: &str, segment: &str) -> String {
    let segment = quote(segment);
    if parent.is_empty() {
        segment.into_owned()
    } else {
        format!("{}.{}", parent, segment)
    }
}

/// Split a dotted path into raw segments
pub fn split(path: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' if quoted => current.extend(chars.next()),
            '`' => quoted = !quoted,
            '.' if !quoted => segments.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    segments.push(current);
    segments
}

/// Whether `needle` occurs in `path` outside quoted segments
pub fn contains_unquoted(path: &str, needle: &str) -> bool {
    let mut outside = String::with_capacity(path.len());
    let mut quoted = false;
    let mut escaped = false;
    for c in path.chars() {
        if escaped {
            escaped = false;
            outside.push('`');
            continue;
        }
        match c {
            '\\' if quoted => {
                escaped = true;
                outside.push('`');
            }
            '`' => {
                quoted = !quoted;
                outside.push('`');
            }
            _ if quoted => outside.push('`'),
            other => outside.push(other),
        }
    }
    outside.contains(needle)
}
