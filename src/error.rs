use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum RamlError {
    #[error("Unknown attribute `{attribute}` on {node}")]
    #[diagnostic(
        code(node::unknown_attribute),
        help("Only keys present in the document (and `description`) can be read from a node.")
    )]
    UnknownAttribute { attribute: String, node: String },

    #[error("Malformed version `{version}`")]
    #[diagnostic(
        code(version::malformed),
        help("Versions are dotted numbers such as `1.2` or `3.14.15.9`.")
    )]
    MalformedVersion { version: String },

    #[error("Unknown visibility `{value}` on {node}")]
    #[diagnostic(
        code(node::unknown_visibility),
        help("A [Visibility:...] annotation must be `public` or `private`.")
    )]
    UnknownVisibility { value: String, node: String },

    #[error("`{path}` is not a {expected} node")]
    #[diagnostic(code(document::wrong_node_kind))]
    WrongNodeKind { path: String, expected: &'static str },

    #[error("The document root is not a mapping")]
    #[diagnostic(
        code(document::not_a_mapping),
        help("A RAML document must be a YAML mapping at the top level.")
    )]
    NotAMapping,

    #[error("Included file `{target}` not found (included from {})", from.display())]
    #[diagnostic(code(include::not_found))]
    IncludeNotFound {
        target: String,
        from: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(io))]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    #[diagnostic(code(yaml))]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    #[diagnostic(code(json))]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RamlError>;
