use crate::error::{RamlError, Result};
use crate::include;
use crate::node::{NodeKind, NodePath, Resource, HTTP_METHODS};
use crate::options::RamlOptions;
use crate::walker;
use log::debug;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;

/// A loaded RAML document.
///
/// Owns the raw tree. Typed views are borrowed from it through
/// [`Document::root`]; edits go through the `drop_*` methods and
/// [`Document::filter`], which take `&mut self` and therefore cannot
/// overlap with outstanding views.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Value,
    options: RamlOptions,
}

impl Document {
    /// Loads a document from disk with default options.
    ///
    /// # Errors
    /// Fails if the file or an included file cannot be read, if the YAML
    /// does not parse, or if its root is not a mapping.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_options(path, RamlOptions::default())
    }

    /// Loads a document from disk.
    ///
    /// # Errors
    /// See [`Document::load`].
    pub fn load_with_options(path: impl AsRef<Path>, options: RamlOptions) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading {}", path.display());
        let source = if options.expand_includes {
            include::expand_includes(path)?
        } else {
            fs::read_to_string(path)?
        };
        Self::parse_with_options(&source, options)
    }

    /// Parses document text that has already had its includes expanded.
    ///
    /// # Errors
    /// Fails if the YAML does not parse or its root is not a mapping.
    pub fn parse(source: &str) -> Result<Self> {
        Self::parse_with_options(source, RamlOptions::default())
    }

    /// # Errors
    /// See [`Document::parse`].
    pub fn parse_with_options(source: &str, options: RamlOptions) -> Result<Self> {
        let root: Value = serde_yaml::from_str(source)?;
        Self::from_value(root, options)
    }

    /// Wraps an already parsed tree.
    ///
    /// # Errors
    /// Returns `RamlError::NotAMapping` if `root` is not a mapping.
    pub fn from_value(root: Value, options: RamlOptions) -> Result<Self> {
        if !root.is_mapping() {
            return Err(RamlError::NotAMapping);
        }
        Ok(Self { root, options })
    }

    /// The root resource, at version `0.0` and public.
    ///
    /// # Errors
    /// Fails if the root description carries a malformed annotation.
    pub fn root(&self) -> Result<Resource<'_>> {
        Resource::root(&self.root)
    }

    #[must_use]
    pub fn raw(&self) -> &Value {
        &self.root
    }

    #[must_use]
    pub fn options(&self) -> &RamlOptions {
        &self.options
    }

    /// Visits every nested mapping in the document. See [`walker::walk`].
    pub fn walk<F>(&self, visitor: F)
    where
        F: FnMut(&Mapping, &NodePath),
    {
        if let Value::Mapping(mapping) = &self.root {
            walker::walk(mapping, visitor);
        }
    }

    /// Removes every nested mapping the visitor selects, in place.
    /// Returns how many entries were removed. See [`walker::filter`].
    pub fn filter<F>(&mut self, visitor: F) -> usize
    where
        F: FnMut(&Mapping, &NodePath) -> bool,
    {
        match &mut self.root {
            Value::Mapping(mapping) => walker::filter(mapping, visitor),
            _ => 0,
        }
    }

    /// Like [`Document::filter`], but returns a pruned copy.
    #[must_use]
    pub fn pruned<F>(&self, visitor: F) -> Document
    where
        F: FnMut(&Mapping, &NodePath) -> bool,
    {
        let root = match &self.root {
            Value::Mapping(mapping) => Value::Mapping(walker::pruned(mapping, visitor)),
            other => other.clone(),
        };
        Document {
            root,
            options: self.options.clone(),
        }
    }

    /// Removes the value at `path` from its parent mapping, keeping the
    /// order of the remaining keys. Returns the removed value, or `None`
    /// if the path no longer exists.
    pub fn remove(&mut self, path: &NodePath) -> Option<Value> {
        let (last, parents) = path.segments().split_last()?;
        let mut current = &mut self.root;
        for segment in parents {
            current = current.get_mut(segment)?;
        }
        let removed = current.as_mapping_mut()?.shift_remove(last);
        if removed.is_some() {
            debug!("dropped {path}");
        }
        removed
    }

    /// Drops a child resource, identified by its path.
    ///
    /// # Errors
    /// Returns `RamlError::WrongNodeKind` if `path` does not end in a resource segment.
    pub fn drop_resource(&mut self, path: &NodePath) -> Result<bool> {
        self.drop_node(path, NodeKind::Resource)
    }

    /// # Errors
    /// Returns `RamlError::WrongNodeKind` if `path` does not end in an HTTP method.
    pub fn drop_action(&mut self, path: &NodePath) -> Result<bool> {
        self.drop_node(path, NodeKind::Action)
    }

    /// # Errors
    /// Returns `RamlError::WrongNodeKind` if `path` is not inside a `headers` block.
    pub fn drop_header(&mut self, path: &NodePath) -> Result<bool> {
        self.drop_node(path, NodeKind::Header)
    }

    /// # Errors
    /// Returns `RamlError::WrongNodeKind` if `path` is not inside a `responses` block.
    pub fn drop_response(&mut self, path: &NodePath) -> Result<bool> {
        self.drop_node(path, NodeKind::Response)
    }

    fn drop_node(&mut self, path: &NodePath, kind: NodeKind) -> Result<bool> {
        if !path_is_kind(path, kind) {
            return Err(RamlError::WrongNodeKind {
                path: path.to_string(),
                expected: kind.as_str(),
            });
        }
        Ok(self.remove(path).is_some())
    }

    /// Renders the current tree as RAML text, with the configured header
    /// in place of the YAML document marker.
    ///
    /// # Errors
    /// Returns `RamlError::Yaml` if the tree cannot be serialized.
    pub fn serialize(&self) -> Result<String> {
        let yaml = serde_yaml::to_string(&self.root)?;
        let body = match yaml.split_once('\n') {
            Some((first, rest)) if first.trim_end() == "---" => rest,
            None if yaml.trim_end() == "---" => "",
            _ => yaml.as_str(),
        };
        debug!("serialized {} bytes", body.len());
        Ok(format!("{}\n{body}", self.options.header))
    }

    /// Renders the current tree as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns `RamlError::Json` if the tree holds keys JSON cannot represent.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.root)?)
    }
}

fn path_is_kind(path: &NodePath, kind: NodeKind) -> bool {
    let segments = path.segments();
    let Some(last) = segments.last() else {
        return false;
    };
    let container = segments
        .len()
        .checked_sub(2)
        .and_then(|i| segments[i].as_str());

    match kind {
        NodeKind::Resource => last.as_str().is_some_and(|k| k.starts_with('/')),
        NodeKind::Action => last.as_str().is_some_and(|k| HTTP_METHODS.contains(&k)),
        NodeKind::Header => container == Some("headers"),
        NodeKind::Response => container == Some("responses"),
    }
}

/// Loads a document from disk with default options.
///
/// # Errors
/// See [`Document::load`].
pub fn load(path: impl AsRef<Path>) -> Result<Document> {
    Document::load(path)
}
