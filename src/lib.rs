pub mod annotation;
pub mod api;
pub mod error;
pub mod include;
pub mod node;
pub mod options;
pub mod version;
pub mod walker;

pub use api::{load, Document};
pub use error::{RamlError, Result};
pub use node::{Action, Header, NodeKind, NodePath, RawNode, Resource, Response, TypedNode, Visibility};
pub use options::RamlOptions;
pub use version::compare_versions;
