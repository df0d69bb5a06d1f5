use crate::version::ROOT_VERSION;
use serde::Serialize;
use std::collections::BTreeMap;

/// Annotations parsed from one description, keyed by lower-cased name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Annotations(BTreeMap<String, String>);

impl Annotations {
    /// Case-insensitive lookup. Absent keys read as the empty string.
    #[must_use]
    pub fn value_of(&self, key: &str) -> &str {
        self.0
            .get(&key.to_lowercase())
            .map_or("", String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(&key.to_lowercase())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }
}

struct TrailingTag<'a> {
    key: &'a str,
    value: &'a str,
    rest: &'a str,
}

/// Matches one `[Key:Value]` tag at the end of `text`, ignoring trailing
/// whitespace. `Key` holds no `:` or `]`, `Value` holds no `]`, and both
/// are non-empty. When several `[` could open the tag the leftmost wins.
fn trailing_tag(text: &str) -> Option<TrailingTag<'_>> {
    let trimmed = text.trim_end();
    let body = trimmed.strip_suffix(']')?;
    let segment_start = body.rfind(']').map_or(0, |i| i + 1);
    let segment = &body[segment_start..];

    for (offset, _) in segment.match_indices('[') {
        let inner = &segment[offset + 1..];
        let colon = inner.find(':')?;
        let key = &inner[..colon];
        let value = &inner[colon + 1..];
        if key.is_empty() || value.is_empty() {
            continue;
        }
        return Some(TrailingTag {
            key,
            value,
            rest: trimmed[..segment_start + offset].trim_end(),
        });
    }
    None
}

/// Splits a description into its trailing annotations and the remaining text.
///
/// Tags are removed right to left; when a key repeats, the value removed
/// last (the leftmost tag) is the one kept.
#[must_use]
pub fn extract_annotations(description: &str) -> (Annotations, String) {
    let mut annotations = BTreeMap::new();
    let mut rest = description;

    while let Some(tag) = trailing_tag(rest) {
        annotations.insert(tag.key.to_lowercase(), tag.value.to_string());
        rest = tag.rest;
    }

    (Annotations(annotations), rest.to_string())
}

/// Re-appends the effective `since` to an already stripped description,
/// unless it is the root default.
#[must_use]
pub fn clean_description(stripped: &str, since: &str) -> String {
    if since == ROOT_VERSION {
        return stripped.to_string();
    }
    if stripped.is_empty() {
        format!("[Since:{since}]")
    } else {
        format!("{stripped} [Since:{since}]")
    }
}

/// Finds the first `[Key:Value]` tag anywhere in `text` whose key matches
/// `key` (ASCII case-insensitive) and returns its value, or `""`. Unlike
/// [`extract_annotations`] the tag need not be trailing; the value may be
/// empty but never spans a line break.
#[must_use]
pub fn find_value<'t>(text: &'t str, key: &str) -> &'t str {
    for (open, _) in text.match_indices('[') {
        let inner = &text[open + 1..];
        let Some(name) = inner.get(..key.len()) else {
            continue;
        };
        if !name.eq_ignore_ascii_case(key) {
            continue;
        }
        let Some(value) = inner[key.len()..].strip_prefix(':') else {
            continue;
        };
        if let Some(close) = value.find(']') {
            let value = &value[..close];
            if !value.contains('\n') {
                return value;
            }
        }
    }
    ""
}
