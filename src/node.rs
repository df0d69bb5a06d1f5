use crate::annotation::{self, Annotations};
use crate::error::{RamlError, Result};
use crate::version::{max_version, ROOT_VERSION};
use log::trace;
use serde::Serialize;
use serde_yaml::Value;
use std::cell::OnceCell;
use std::fmt::{self, Display};
use std::str::FromStr;

/// Generic, untyped document value.
pub type RawNode = Value;

/// HTTP methods recognised as actions on a resource.
pub const HTTP_METHODS: [&str; 4] = ["get", "put", "post", "delete"];

static EMPTY_DESCRIPTION: Value = Value::String(String::new());
static NO_KEY: Value = Value::Null;

/// Renders a raw mapping key for paths and messages.
#[must_use]
pub fn key_to_string(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "~".to_string(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// The raw keys leading from the document root to a node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct NodePath(Vec<Value>);

impl NodePath {
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn child(&self, key: impl Into<Value>) -> Self {
        let mut segments = self.0.clone();
        segments.push(key.into());
        Self(segments)
    }

    #[must_use]
    pub fn segments(&self) -> &[Value] {
        &self.0
    }

    #[must_use]
    pub fn last(&self) -> Option<&Value> {
        self.0.last()
    }

    /// Everything but the final segment.
    #[must_use]
    pub fn parent(&self) -> Option<&[Value]> {
        self.0.split_last().map(|(_, parent)| parent)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Value>> for NodePath {
    fn from(segments: Vec<Value>) -> Self {
        Self(segments)
    }
}

impl<S: AsRef<str>> FromIterator<S> for NodePath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|s| Value::String(s.as_ref().to_string()))
                .collect(),
        )
    }
}

impl Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        let parts: Vec<String> = self.0.iter().map(key_to_string).collect();
        write!(f, "{}", parts.join(" > "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

impl Visibility {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    /// Applies the inheritance rule: private is sticky, otherwise the local
    /// annotation wins, otherwise public.
    #[must_use]
    pub fn inherit(inherited: Visibility, local: Option<Visibility>) -> Visibility {
        if inherited == Visibility::Private {
            Visibility::Private
        } else {
            local.unwrap_or(Visibility::Public)
        }
    }
}

impl Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Resource,
    Action,
    Header,
    Response,
}

impl NodeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Resource => "resource",
            NodeKind::Action => "action",
            NodeKind::Header => "header",
            NodeKind::Response => "response",
        }
    }
}

/// Description, annotations and inherited metadata shared by every typed node.
#[derive(Debug, Clone)]
pub struct NodeInfo<'a> {
    raw: &'a Value,
    path: NodePath,
    since: String,
    visibility: Visibility,
    description: &'a str,
    stripped: String,
    annotations: Annotations,
    clean: OnceCell<String>,
}

impl<'a> NodeInfo<'a> {
    fn new(
        raw: &'a Value,
        path: NodePath,
        inherited_since: &str,
        inherited_visibility: Visibility,
    ) -> Result<Self> {
        let description = raw
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let (annotations, stripped) = annotation::extract_annotations(description);

        let since = max_version(annotations.value_of("since"), inherited_since)?;

        let local = annotations.value_of("visibility");
        let local_visibility = if local.trim().is_empty() {
            None
        } else {
            Some(
                local
                    .parse::<Visibility>()
                    .map_err(|()| RamlError::UnknownVisibility {
                        value: local.to_string(),
                        node: path.to_string(),
                    })?,
            )
        };
        let visibility = Visibility::inherit(inherited_visibility, local_visibility);

        trace!("{path}: since {since}, {visibility}");

        Ok(Self {
            raw,
            path,
            since,
            visibility,
            description,
            stripped,
            annotations,
            clean: OnceCell::new(),
        })
    }
}

/// Behaviour common to the four node variants.
pub trait TypedNode<'a> {
    fn info(&self) -> &NodeInfo<'a>;

    fn kind(&self) -> NodeKind;

    /// Whether `key` is part of this variant's schema rather than an extension.
    fn is_known_key(&self, key: &Value) -> bool;

    /// The raw sub-value this node wraps.
    fn raw(&self) -> &'a Value {
        self.info().raw
    }

    /// The identity key of this node in its parent mapping.
    fn key<'s>(&'s self) -> &'s Value
    where
        'a: 's,
    {
        self.info().path.last().unwrap_or(&NO_KEY)
    }

    fn path<'s>(&'s self) -> &'s NodePath
    where
        'a: 's,
    {
        &self.info().path
    }

    fn since<'s>(&'s self) -> &'s str
    where
        'a: 's,
    {
        &self.info().since
    }

    fn visibility(&self) -> Visibility {
        self.info().visibility
    }

    fn description(&self) -> &'a str {
        self.info().description
    }

    /// The description with annotations removed and the effective
    /// `[Since:...]` re-appended when it is not the root default.
    fn clean_description<'s>(&'s self) -> &'s str
    where
        'a: 's,
    {
        let info = self.info();
        info.clean
            .get_or_init(|| annotation::clean_description(&info.stripped, &info.since))
    }

    fn extended_attributes<'s>(&'s self) -> &'s Annotations
    where
        'a: 's,
    {
        &self.info().annotations
    }

    fn value_of<'s>(&'s self, key: &str) -> &'s str
    where
        'a: 's,
    {
        self.info().annotations.value_of(key)
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.info().raw.get(key)
    }

    /// Like [`TypedNode::get`], but a missing key other than `description`
    /// is an error.
    ///
    /// # Errors
    /// Returns `RamlError::UnknownAttribute` when the key is absent.
    fn attribute(&self, key: &str) -> Result<&'a Value> {
        match self.get(key) {
            Some(value) => Ok(value),
            None if key == "description" => Ok(&EMPTY_DESCRIPTION),
            None => Err(RamlError::UnknownAttribute {
                attribute: key.to_string(),
                node: format!("{} {}", self.kind().as_str(), self.path()),
            }),
        }
    }

    /// Keys outside the variant's schema, in document order.
    fn extensions(&self) -> Vec<(&'a Value, &'a Value)> {
        match self.info().raw.as_mapping() {
            Some(mapping) => mapping
                .iter()
                .filter(|(k, _)| !self.is_known_key(k))
                .collect(),
            None => Vec::new(),
        }
    }
}

fn key_in(key: &Value, known: &[&str]) -> bool {
    key.as_str().is_some_and(|k| known.contains(&k))
}

const RESOURCE_KEYS: [&str; 7] = [
    "description",
    "displayName",
    "uriParameters",
    "baseUriParameters",
    "type",
    "is",
    "securedBy",
];

const ACTION_KEYS: [&str; 9] = [
    "description",
    "displayName",
    "headers",
    "responses",
    "body",
    "queryParameters",
    "protocols",
    "is",
    "securedBy",
];

const PARAMETER_KEYS: [&str; 13] = [
    "description",
    "displayName",
    "type",
    "enum",
    "pattern",
    "minLength",
    "maxLength",
    "minimum",
    "maximum",
    "example",
    "repeat",
    "required",
    "default",
];

const RESPONSE_KEYS: [&str; 3] = ["description", "headers", "body"];

#[derive(Debug, Clone)]
pub struct Resource<'a> {
    info: NodeInfo<'a>,
    uri: String,
}

impl<'a> Resource<'a> {
    /// Wraps the document root. It inherits the root version and public visibility.
    pub(crate) fn root(raw: &'a Value) -> Result<Self> {
        Ok(Self {
            info: NodeInfo::new(raw, NodePath::root(), ROOT_VERSION, Visibility::Public)?,
            uri: String::new(),
        })
    }

    /// The full URI, joined from every ancestor's path segment.
    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn display_name(&self) -> Option<&'a str> {
        self.get("displayName").and_then(Value::as_str)
    }

    /// Direct child resources: every key starting with `/`.
    ///
    /// # Errors
    /// Fails if a child carries a malformed since or visibility annotation.
    pub fn children(&self) -> Result<Vec<Resource<'a>>> {
        let Some(mapping) = self.info.raw.as_mapping() else {
            return Ok(Vec::new());
        };

        mapping
            .iter()
            .filter_map(|(key, value)| {
                key.as_str()
                    .filter(|k| k.starts_with('/'))
                    .map(|k| (k, value))
            })
            .map(|(segment, value)| -> Result<Resource<'a>> {
                Ok(Resource {
                    info: NodeInfo::new(
                        value,
                        self.info.path.child(segment),
                        &self.info.since,
                        self.info.visibility,
                    )?,
                    uri: format!("{}{}", self.uri.trim_end_matches('/'), segment),
                })
            })
            .collect()
    }

    /// Every resource below this one, pre-order, excluding `self`.
    ///
    /// # Errors
    /// Fails if any descendant carries a malformed annotation.
    pub fn all_descendants(&self) -> Result<Vec<Resource<'a>>> {
        let mut list = Vec::new();
        for child in self.children()? {
            let below = child.all_descendants()?;
            list.push(child);
            list.extend(below);
        }
        Ok(list)
    }

    /// Actions keyed by one of [`HTTP_METHODS`].
    ///
    /// # Errors
    /// Fails if an action carries a malformed annotation.
    pub fn actions(&self) -> Result<Vec<Action<'a>>> {
        let Some(mapping) = self.info.raw.as_mapping() else {
            return Ok(Vec::new());
        };

        mapping
            .iter()
            .filter_map(|(key, value)| {
                key.as_str()
                    .filter(|k| HTTP_METHODS.contains(k))
                    .map(|k| (k, value))
            })
            .map(|(method, value)| -> Result<Action<'a>> {
                Ok(Action {
                    info: NodeInfo::new(
                        value,
                        self.info.path.child(method),
                        &self.info.since,
                        self.info.visibility,
                    )?,
                })
            })
            .collect()
    }
}

impl<'a> TypedNode<'a> for Resource<'a> {
    fn info(&self) -> &NodeInfo<'a> {
        &self.info
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Resource
    }

    fn is_known_key(&self, key: &Value) -> bool {
        key_in(key, &RESOURCE_KEYS)
            || key_in(key, &HTTP_METHODS)
            || key.as_str().is_some_and(|k| k.starts_with('/'))
    }
}

#[derive(Debug, Clone)]
pub struct Action<'a> {
    info: NodeInfo<'a>,
}

impl<'a> Action<'a> {
    /// The HTTP method, e.g. `get`.
    #[must_use]
    pub fn method(&self) -> &str {
        self.key().as_str().unwrap_or_default()
    }

    #[must_use]
    pub fn body(&self) -> Option<&'a Value> {
        self.get("body")
    }

    /// One header per key of a `headers` mapping. Any other `headers`
    /// value yields no headers.
    ///
    /// # Errors
    /// Fails if a header carries a malformed annotation.
    pub fn headers(&self) -> Result<Vec<Header<'a>>> {
        let Some(headers) = self.get("headers").and_then(Value::as_mapping) else {
            return Ok(Vec::new());
        };
        let base = self.info.path.child("headers");

        headers
            .iter()
            .map(|(name, value)| -> Result<Header<'a>> {
                Ok(Header {
                    info: NodeInfo::new(
                        value,
                        base.child(name.clone()),
                        &self.info.since,
                        self.info.visibility,
                    )?,
                })
            })
            .collect()
    }

    /// One response per status code, whatever the response value holds.
    ///
    /// # Errors
    /// Fails if a response carries a malformed annotation.
    pub fn responses(&self) -> Result<Vec<Response<'a>>> {
        let Some(responses) = self.get("responses").and_then(Value::as_mapping) else {
            return Ok(Vec::new());
        };
        let base = self.info.path.child("responses");

        responses
            .iter()
            .map(|(code, value)| -> Result<Response<'a>> {
                Ok(Response {
                    info: NodeInfo::new(
                        value,
                        base.child(code.clone()),
                        &self.info.since,
                        self.info.visibility,
                    )?,
                })
            })
            .collect()
    }
}

impl<'a> TypedNode<'a> for Action<'a> {
    fn info(&self) -> &NodeInfo<'a> {
        &self.info
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn is_known_key(&self, key: &Value) -> bool {
        key_in(key, &ACTION_KEYS)
    }
}

#[derive(Debug, Clone)]
pub struct Header<'a> {
    info: NodeInfo<'a>,
}

impl<'a> Header<'a> {
    #[must_use]
    pub fn name(&self) -> String {
        key_to_string(self.key())
    }

    /// The declared parameter type (`string`, `integer`, ...).
    #[must_use]
    pub fn header_type(&self) -> Option<&'a str> {
        self.get("type").and_then(Value::as_str)
    }

    #[must_use]
    pub fn required(&self) -> Option<bool> {
        self.get("required").and_then(Value::as_bool)
    }
}

impl<'a> TypedNode<'a> for Header<'a> {
    fn info(&self) -> &NodeInfo<'a> {
        &self.info
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Header
    }

    fn is_known_key(&self, key: &Value) -> bool {
        key_in(key, &PARAMETER_KEYS)
    }
}

#[derive(Debug, Clone)]
pub struct Response<'a> {
    info: NodeInfo<'a>,
}

impl<'a> Response<'a> {
    /// The status code as written in the document.
    #[must_use]
    pub fn code(&self) -> String {
        key_to_string(self.key())
    }

    /// The status code as a number, when it is one.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self.key() {
            Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn body(&self) -> Option<&'a Value> {
        self.get("body")
    }
}

impl<'a> TypedNode<'a> for Response<'a> {
    fn info(&self) -> &NodeInfo<'a> {
        &self.info
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Response
    }

    fn is_known_key(&self, key: &Value) -> bool {
        key_in(key, &RESPONSE_KEYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(source: &str) -> Value {
        serde_yaml::from_str(source).unwrap()
    }

    const WIDGETS: &str = r"
title: Widgets
/widgets:
  description: Widget list. [Since:1.2][Visibility:private]
  get:
    description: List them.
    headers:
      X-Trace:
        type: string
        required: true
    responses:
      200:
        body:
          application/json: {}
      404:
  /{id}:
    description: One widget. [Visibility:public]
    delete:
/gadgets:
  description: Gadgets [Since:1.0]
  put:
    description: Replace [Since:1.5]
";

    #[test]
    fn test_widget_list_example() {
        let raw = yaml(WIDGETS);
        let root = Resource::root(&raw).unwrap();
        let top = root.children().unwrap();
        let widgets = &top[0];

        assert_eq!(widgets.uri(), "/widgets");
        assert_eq!(widgets.since(), "1.2");
        assert_eq!(widgets.visibility(), Visibility::Private);
        assert_eq!(widgets.clean_description(), "Widget list. [Since:1.2]");
        assert_eq!(widgets.description(), "Widget list. [Since:1.2][Visibility:private]");
    }

    #[test]
    fn test_private_is_sticky_and_since_inherited() {
        let raw = yaml(WIDGETS);
        let root = Resource::root(&raw).unwrap();
        let top = root.children().unwrap();
        let widgets = &top[0];
        let nested = widgets.children().unwrap();
        let by_id = &nested[0];

        assert_eq!(by_id.uri(), "/widgets/{id}");
        assert_eq!(by_id.visibility(), Visibility::Private);
        assert_eq!(by_id.since(), "1.2");
        assert_eq!(by_id.clean_description(), "One widget. [Since:1.2]");
    }

    #[test]
    fn test_since_never_decreases() {
        let raw = yaml("/a:\n  description: x [Since:2.0]\n  /b:\n    description: y [Since:1.0]\n");
        let root = Resource::root(&raw).unwrap();
        let resources = root.all_descendants().unwrap();
        let b = &resources[1];
        assert_eq!(b.uri(), "/a/b");
        assert_eq!(b.since(), "2.0");
    }

    #[test]
    fn test_root_defaults() {
        let raw = yaml("title: t\n");
        let root = Resource::root(&raw).unwrap();
        assert_eq!(root.since(), ROOT_VERSION);
        assert_eq!(root.visibility(), Visibility::Public);
        assert_eq!(root.clean_description(), "");
        assert!(root.path().is_empty());
    }

    #[test]
    fn test_actions_headers_responses() {
        let raw = yaml(WIDGETS);
        let root = Resource::root(&raw).unwrap();
        let top = root.children().unwrap();
        let widgets = &top[0];
        let actions = widgets.actions().unwrap();
        assert_eq!(actions.len(), 1);

        let get = &actions[0];
        assert_eq!(get.method(), "get");
        assert_eq!(get.visibility(), Visibility::Private);

        let headers = get.headers().unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].name(), "X-Trace");
        assert_eq!(headers[0].header_type(), Some("string"));
        assert_eq!(headers[0].required(), Some(true));

        let responses = get.responses().unwrap();
        let codes: Vec<String> = responses.iter().map(Response::code).collect();
        assert_eq!(codes, vec!["200", "404"]);
        assert_eq!(responses[0].status(), Some(200));
        assert!(responses[0].body().is_some());
        assert!(responses[1].body().is_none());
        assert_eq!(responses[1].since(), "1.2");
    }

    #[test]
    fn test_action_since_overrides_resource() {
        let raw = yaml(WIDGETS);
        let root = Resource::root(&raw).unwrap();
        let top = root.children().unwrap();
        let gadgets = &top[1];
        let actions = gadgets.actions().unwrap();
        let put = &actions[0];
        assert_eq!(put.since(), "1.5");
        assert_eq!(put.clean_description(), "Replace [Since:1.5]");
    }

    #[test]
    fn test_headers_must_be_mapping() {
        let raw = yaml("get:\n  headers: [a, b]\n  description: d\n");
        let root = Resource::root(&raw).unwrap();
        let actions = root.actions().unwrap();
        let get = &actions[0];
        assert!(get.headers().unwrap().is_empty());
        assert!(get.responses().unwrap().is_empty());
    }

    #[test]
    fn test_attribute_access() {
        let raw = yaml(WIDGETS);
        let root = Resource::root(&raw).unwrap();
        let nested = root.all_descendants().unwrap();
        let by_id = &nested[1];
        let actions = by_id.actions().unwrap();
        let delete = &actions[0];

        assert_eq!(root.attribute("title").unwrap(), &Value::from("Widgets"));
        assert_eq!(delete.attribute("description").unwrap(), &Value::from(""));
        let err = delete.attribute("queryParameters").unwrap_err();
        assert!(matches!(err, RamlError::UnknownAttribute { attribute, .. } if attribute == "queryParameters"));
        assert!(root.get("missing").is_none());
    }

    #[test]
    fn test_extensions_exclude_schema_keys() {
        let raw = yaml(WIDGETS);
        let root = Resource::root(&raw).unwrap();
        let ext: Vec<String> = root.extensions().iter().map(|(k, _)| key_to_string(k)).collect();
        assert_eq!(ext, vec!["title"]);
    }

    #[test]
    fn test_unknown_visibility_is_rejected() {
        let raw = yaml("/a:\n  description: x [Visibility:internal]\n");
        let root = Resource::root(&raw).unwrap();
        let err = root.children().unwrap_err();
        assert!(matches!(err, RamlError::UnknownVisibility { value, .. } if value == "internal"));
    }

    #[test]
    fn test_malformed_since_is_rejected() {
        let raw = yaml("/a:\n  description: x [Since:one]\n");
        let root = Resource::root(&raw).unwrap();
        assert!(matches!(
            root.children().unwrap_err(),
            RamlError::MalformedVersion { .. }
        ));

        let raw = yaml("/a:\n  description: x [Since:+3]\n");
        let root = Resource::root(&raw).unwrap();
        assert!(matches!(
            root.children().unwrap_err(),
            RamlError::MalformedVersion { version } if version == "+3"
        ));
    }

    #[test]
    fn test_children_are_fresh_views() {
        let raw = yaml(WIDGETS);
        let root = Resource::root(&raw).unwrap();
        let first = root.children().unwrap();
        let second = root.children().unwrap();
        assert!(std::ptr::eq(first[0].raw(), second[0].raw()));
        assert_eq!(first[0].path(), second[0].path());
    }

    #[test]
    fn test_node_path_display() {
        let path = NodePath::root().child("/widgets").child("get").child(200);
        assert_eq!(path.to_string(), "/widgets > get > 200");
        assert_eq!(path.parent().map(<[Value]>::len), Some(2));
    }

    fn summary<'a, N: TypedNode<'a>>(node: &N) -> String {
        format!(
            "{} {} key={} since={} {} {:?} {}",
            node.kind().as_str(),
            node.path(),
            key_to_string(node.key()),
            node.since(),
            node.visibility(),
            node.clean_description(),
            node.extended_attributes().len(),
        )
    }

    #[test]
    fn test_shared_accessors_through_trait() {
        let raw = yaml(WIDGETS);
        let root = Resource::root(&raw).unwrap();
        let top = root.children().unwrap();
        let actions = top[0].actions().unwrap();
        let responses = actions[0].responses().unwrap();

        assert_eq!(
            summary(&top[0]),
            "resource /widgets key=/widgets since=1.2 private \"Widget list. [Since:1.2]\" 2"
        );
        assert_eq!(
            summary(&responses[0]),
            "response /widgets > get > responses > 200 key=200 since=1.2 private \"[Since:1.2]\" 0"
        );
        assert_eq!(top[1].value_of("Since"), "1.0");
        let description: &str = {
            let gadgets = &top[1];
            gadgets.description()
        };
        assert_eq!(description, "Gadgets [Since:1.0]");
    }
}
