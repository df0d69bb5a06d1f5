use crate::error::{RamlError, Result};
use std::cmp::Ordering;

/// The version every node starts from when nothing above it says otherwise.
pub const ROOT_VERSION: &str = "0.0";

/// Splits a version into its numeric components with leading zeros
/// removed, so `007` and `7` compare equal. Components are unbounded.
fn components(version: &str) -> Result<Vec<&str>> {
    version
        .trim()
        .split('.')
        .map(|part| {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(RamlError::MalformedVersion {
                    version: version.to_string(),
                });
            }
            Ok(part.trim_start_matches('0'))
        })
        .collect()
}

// Both sides are digit strings without leading zeros.
fn compare_component(l: &str, r: &str) -> Ordering {
    l.len().cmp(&r.len()).then_with(|| l.cmp(r))
}

/// Compares two dotted versions component-wise as integers of any size.
/// Missing trailing components count as `0`, so `1.2` equals `1.2.0`.
///
/// # Errors
/// Returns `RamlError::MalformedVersion` if any component is not a run of
/// ASCII digits.
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering> {
    let left = components(a)?;
    let right = components(b)?;
    let len = left.len().max(right.len());

    for i in 0..len {
        let l = left.get(i).copied().unwrap_or("");
        let r = right.get(i).copied().unwrap_or("");
        match compare_component(l, r) {
            Ordering::Equal => continue,
            other => return Ok(other),
        }
    }
    Ok(Ordering::Equal)
}

/// Returns the greater of `local` and `inherited`. An empty `local`
/// means "not annotated" and yields `inherited`.
///
/// # Errors
/// Returns `RamlError::MalformedVersion` if either side is malformed.
pub fn max_version(local: &str, inherited: &str) -> Result<String> {
    let local = local.trim();
    if local.is_empty() {
        return Ok(inherited.to_string());
    }
    if compare_versions(local, inherited)? == Ordering::Greater {
        Ok(local.to_string())
    } else {
        Ok(inherited.to_string())
    }
}
