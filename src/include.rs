use crate::error::{RamlError, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

const DIRECTIVE: &str = "!include";

/// Returns the include target named on `line`, if the line is an include.
fn include_target(line: &str) -> Option<&str> {
    if line.trim_start().starts_with('#') {
        return None;
    }
    let start = line.find(DIRECTIVE)? + DIRECTIVE.len();
    let rest = &line[start..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let target = rest.trim();
    (!target.is_empty()).then_some(target)
}

/// Looks for `target` as given first, then next to the including document.
fn resolve_target(target: &str, base_dir: &Path) -> PathBuf {
    let as_given = PathBuf::from(target);
    if as_given.exists() {
        as_given
    } else {
        base_dir.join(target)
    }
}

/// Expands the include directives in `source`.
/// `document` is the path of the file `source` was read from.
///
/// # Errors
/// Returns `RamlError::IncludeNotFound` if an included file cannot be read.
pub fn expand_includes_in(source: &str, document: &Path) -> Result<String> {
    let base_dir = document.parent().unwrap_or_else(|| Path::new("."));
    let mut expanded = String::with_capacity(source.len());

    for line in source.split_inclusive('\n') {
        let Some(target) = include_target(line) else {
            expanded.push_str(line);
            continue;
        };

        let resolved = resolve_target(target, base_dir);
        debug!("including {} into {}", resolved.display(), document.display());
        let included =
            fs::read_to_string(&resolved).map_err(|source| RamlError::IncludeNotFound {
                target: target.to_string(),
                from: document.to_path_buf(),
                source,
            })?;

        expanded.push_str(&included);
        if !included.is_empty() && !included.ends_with('\n') && line.ends_with('\n') {
            expanded.push('\n');
        }
    }

    Ok(expanded)
}

/// Reads the document at `path` and expands its include directives.
///
/// # Errors
/// Returns `RamlError::Io` if the document cannot be read, or
/// `RamlError::IncludeNotFound` if an included file cannot be read.
pub fn expand_includes(path: &Path) -> Result<String> {
    let source = fs::read_to_string(path)?;
    expand_includes_in(&source, path)
}
