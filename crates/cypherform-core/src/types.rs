//! Graph entity model
//!
//! Defines the building blocks of a pattern: labels, nodes, relationships,
//! traversal depths and identity binding.

use crate::error::{Error, Result};
use crate::expression::PropertyRef;
use crate::params::Parameters;
use crate::property::Property;
use crate::set_once::SetOnce;
use crate::value::PropertyValue;
use std::fmt;
use std::sync::Arc;

/// Variable used for nodes that were never given one
pub const DEFAULT_NODE_VAR: &str = "node";

/// Variable used for relationships that were never given one
pub const DEFAULT_REL_VAR: &str = "rel";

/// A label for nodes or relationship types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Label(String);

impl Label {
    /// Create a new label
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    /// Get the label name
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Backtick-quoted form used inside patterns
    pub fn quoted(&self) -> String {
        format!("`{}`", self.0)
    }
}

impl From<&str> for Label {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Label {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Variable-length traversal specifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Depth {
    /// Single hop
    #[default]
    None,
    /// Any number of hops (`*`)
    Unbounded,
    /// Exactly `n` hops (`*n`)
    Exact(u32),
    /// Between `min` and `max` hops (`*min..max`)
    Range(u32, u32),
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Depth::None => Ok(()),
            Depth::Unbounded => write!(f, "*"),
            Depth::Exact(n) => write!(f, "*{}", n),
            Depth::Range(min, max) => write!(f, "*{}..{}", min, max),
        }
    }
}

/// Which properties identify an entity
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Binding {
    /// No identity chosen; writes against this entity are unbounded
    #[default]
    Unbound,
    /// Bound to these keys; an empty list matches everything
    Keys(Vec<String>),
}

/// Shared behavior of nodes and relationships
pub trait GraphObject {
    /// Name used in error messages
    fn object_name(&self) -> &'static str;

    fn var(&self) -> &str;

    fn properties(&self) -> &[Property];

    fn properties_mut(&mut self) -> &mut Vec<Property>;

    fn binding(&self) -> &Binding;

    fn binding_mut(&mut self) -> &mut Binding;

    fn property(&self, name: &str) -> Option<&Property> {
        self.properties().iter().find(|p| p.name() == Some(name))
    }

    fn has_property(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    fn get(&self, name: &str) -> Result<&PropertyValue> {
        self.property(name)
            .map(Property::value)
            .ok_or_else(|| Error::UnknownProperty(name.to_string()))
    }

    /// Set a property's value through its coercion
    fn set(&mut self, name: &str, value: PropertyValue) -> Result<()> {
        self.properties_mut()
            .iter_mut()
            .find(|p| p.name() == Some(name))
            .ok_or_else(|| Error::UnknownProperty(name.to_string()))?
            .set_value(value)
    }

    /// Reference to a property for building expressions
    fn prop(&self, name: &str) -> Result<PropertyRef> {
        let property = self
            .property(name)
            .ok_or_else(|| Error::UnknownProperty(name.to_string()))?;
        Ok(PropertyRef::new(self.var(), name, property.kind().clone()))
    }

    /// Attach a property under `name`
    fn add_property(&mut self, name: &str, mut property: Property) -> Result<()> {
        if self.has_property(name) {
            return Err(Error::DuplicateProperty(name.to_string()));
        }
        match property.name() {
            Some(existing) if existing != name => {
                return Err(Error::immutable("name", "Property"));
            }
            Some(_) => {}
            None => property.set_name(name)?,
        }
        self.properties_mut().push(property);
        Ok(())
    }

    /// Bind to explicit keys; each must name an existing property
    fn bind<I, S>(&mut self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        Self: Sized,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        if let Some(missing) = keys.iter().find(|k| !self.has_property(k)) {
            return Err(Error::UnknownProperty(missing.clone()));
        }
        *self.binding_mut() = Binding::Keys(keys);
        Ok(())
    }

    /// Bind to every primary-key property
    fn bind_primary_keys(&mut self) {
        let keys = self
            .properties()
            .iter()
            .filter(|p| p.is_primary_key())
            .filter_map(|p| p.name().map(str::to_string))
            .collect();
        *self.binding_mut() = Binding::Keys(keys);
    }

    /// Bind to nothing: matches every entity with this shape
    fn bind_none(&mut self) {
        *self.binding_mut() = Binding::Keys(Vec::new());
    }

    fn unbind(&mut self) {
        *self.binding_mut() = Binding::Unbound;
    }

    fn is_bound(&self) -> bool {
        matches!(self.binding(), Binding::Keys(_))
    }

    fn bound_keys(&self) -> &[String] {
        match self.binding() {
            Binding::Unbound => &[],
            Binding::Keys(keys) => keys,
        }
    }

    /// Parameter name requested for one of this object's properties
    fn param_key(&self, name: &str) -> String {
        format!("{}_{}", self.var(), name)
    }

    /// `{a: {var_a}, ...}` over the bound keys, or empty when there are none
    fn inline_properties(&self, params: &mut Parameters) -> String {
        let entries: Vec<String> = self
            .bound_keys()
            .iter()
            .filter_map(|key| self.property(key))
            .filter_map(|p| {
                let name = p.name()?;
                let key = self.param_key(name);
                let param = params.insert(Some(key.as_str()), p.value().clone());
                Some(format!("{}: {{{}}}", name, param))
            })
            .collect();
        if entries.is_empty() {
            String::new()
        } else {
            format!(" {{{}}}", entries.join(", "))
        }
    }
}

/// A labeled vertex
#[derive(Debug, Clone)]
pub struct Node {
    labels: Vec<Label>,
    node_type: Label,
    var: String,
    properties: Vec<Property>,
    binding: Binding,
}

impl Node {
    /// Start building a node; at least one label is required
    pub fn builder<I, L>(labels: I) -> NodeBuilder
    where
        I: IntoIterator<Item = L>,
        L: Into<Label>,
    {
        NodeBuilder {
            labels: labels.into_iter().map(Into::into).collect(),
            var: None,
            properties: Vec::new(),
            bind: None,
        }
    }

    /// Labels in first-seen order without duplicates
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// The last label given at construction
    pub fn node_type(&self) -> &str {
        self.node_type.name()
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l.name() == label)
    }

    pub fn set_var(&mut self, var: impl Into<String>) {
        self.var = var.into();
    }

    /// `(var:`L1`:`L2`)`
    pub fn pattern(&self) -> String {
        format!("({}{})", self.var, self.label_text())
    }

    /// Pattern with bound properties inlined as parameters
    pub fn inline_pattern(&self, params: &mut Parameters) -> String {
        format!(
            "({}{}{})",
            self.var,
            self.label_text(),
            self.inline_properties(params)
        )
    }

    fn label_text(&self) -> String {
        self.labels
            .iter()
            .map(|l| format!(":{}", l.quoted()))
            .collect()
    }

    /// Independent copy; property values are not shared
    pub fn copy(&self) -> Node {
        self.clone()
    }

    /// Copy under another variable, overriding some property values
    pub fn copy_as<I, K, V>(&self, var: &str, overrides: I) -> Result<Node>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<PropertyValue>,
    {
        let mut node = self.clone();
        node.var = var.to_string();
        for (name, value) in overrides {
            node.set(name.as_ref(), value.into())?;
        }
        Ok(node)
    }
}

impl GraphObject for Node {
    fn object_name(&self) -> &'static str {
        "Node"
    }

    fn var(&self) -> &str {
        &self.var
    }

    fn properties(&self) -> &[Property] {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Vec<Property> {
        &mut self.properties
    }

    fn binding(&self) -> &Binding {
        &self.binding
    }

    fn binding_mut(&mut self) -> &mut Binding {
        &mut self.binding
    }
}

enum BindRequest {
    Keys(Vec<String>),
    PrimaryKeys,
    Nothing,
}

/// Builder for [`Node`]
pub struct NodeBuilder {
    labels: Vec<Label>,
    var: Option<String>,
    properties: Vec<(String, Result<Property>)>,
    bind: Option<BindRequest>,
}

impl NodeBuilder {
    pub fn var(mut self, var: impl Into<String>) -> Self {
        self.var = Some(var.into());
        self
    }

    pub fn property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.push((name.into(), Ok(property)));
        self
    }

    /// Shorthand for a string property holding `value`
    pub fn value(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        let property = Property::builder().value(value).build();
        self.properties.push((name.into(), property));
        self
    }

    pub fn bind<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bind = Some(BindRequest::Keys(keys.into_iter().map(Into::into).collect()));
        self
    }

    pub fn bind_primary_keys(mut self) -> Self {
        self.bind = Some(BindRequest::PrimaryKeys);
        self
    }

    pub fn bind_none(mut self) -> Self {
        self.bind = Some(BindRequest::Nothing);
        self
    }

    pub fn build(self) -> Result<Node> {
        let node_type = self
            .labels
            .last()
            .cloned()
            .ok_or_else(|| Error::InvalidPattern("a node needs at least one label".to_string()))?;

        let mut labels: Vec<Label> = Vec::with_capacity(self.labels.len());
        for label in self.labels {
            if !labels.contains(&label) {
                labels.push(label);
            }
        }

        let mut node = Node {
            labels,
            node_type,
            var: self.var.unwrap_or_else(|| DEFAULT_NODE_VAR.to_string()),
            properties: Vec::new(),
            binding: Binding::Unbound,
        };
        for (name, property) in self.properties {
            node.add_property(&name, property?)?;
        }

        match self.bind {
            Some(BindRequest::Keys(keys)) => node.bind(keys)?,
            Some(BindRequest::PrimaryKeys) => node.bind_primary_keys(),
            Some(BindRequest::Nothing) => node.bind_none(),
            None => {}
        }
        Ok(node)
    }
}

const REL_OWNER: &str = "Relationship";

/// A typed edge between two shared nodes
#[derive(Debug, Clone)]
pub struct Relationship {
    rel_type: SetOnce<String>,
    start: SetOnce<Arc<Node>>,
    end: SetOnce<Arc<Node>>,
    directed: SetOnce<bool>,
    depth: Depth,
    var: String,
    properties: Vec<Property>,
    binding: Binding,
}

impl Relationship {
    /// Start building a relationship; `None` leaves it anonymous
    pub fn builder<S: Into<String>>(rel_type: Option<S>) -> RelationshipBuilder {
        RelationshipBuilder {
            rel_type: rel_type.map(Into::into),
            start: None,
            end: None,
            directed: None,
            depth: Depth::None,
            var: None,
            properties: Vec::new(),
            bind: None,
        }
    }

    pub fn rel_type(&self) -> Option<&str> {
        self.rel_type.get().map(String::as_str)
    }

    pub fn set_type(&mut self, rel_type: impl Into<String>) -> Result<()> {
        self.rel_type.set(rel_type.into(), REL_OWNER)
    }

    pub fn start_node(&self) -> Option<&Arc<Node>> {
        self.start.get()
    }

    pub fn set_start_node(&mut self, node: Arc<Node>) -> Result<()> {
        self.start.set(node, REL_OWNER)
    }

    pub fn end_node(&self) -> Option<&Arc<Node>> {
        self.end.get()
    }

    pub fn set_end_node(&mut self, node: Arc<Node>) -> Result<()> {
        self.end.set(node, REL_OWNER)
    }

    pub fn is_directed(&self) -> bool {
        self.directed.get().copied().unwrap_or(true)
    }

    pub fn set_directed(&mut self, directed: bool) -> Result<()> {
        self.directed.set(directed, REL_OWNER)
    }

    pub fn depth(&self) -> Depth {
        self.depth
    }

    pub fn set_var(&mut self, var: impl Into<String>) {
        self.var = var.into();
    }

    fn endpoints(&self) -> Result<(&Arc<Node>, &Arc<Node>)> {
        let detached = |endpoint: &str| Error::DetachedRelationship {
            var: self.var.clone(),
            endpoint: endpoint.to_string(),
        };
        let start = self.start.get().ok_or_else(|| detached("start"))?;
        let end = self.end.get().ok_or_else(|| detached("end"))?;
        if start.var() == end.var() && !Arc::ptr_eq(start, end) {
            return Err(Error::InvalidPattern(format!(
                "start and end nodes of '{}' share the variable '{}'",
                self.var,
                start.var()
            )));
        }
        Ok((start, end))
    }

    /// Check that the pattern can be rendered
    pub fn validate(&self) -> Result<()> {
        self.endpoints().map(|_| ())
    }

    /// `(start)-[var:`TYPE`depth]->(end)`
    pub fn pattern(&self) -> Result<String> {
        self.render(String::new())
    }

    /// Pattern with bound properties inlined as parameters
    pub fn inline_pattern(&self, params: &mut Parameters) -> Result<String> {
        self.validate()?;
        let inline = self.inline_properties(params);
        self.render(inline)
    }

    fn render(&self, inline: String) -> Result<String> {
        let (start, end) = self.endpoints()?;
        let rel_type = self
            .rel_type()
            .map(|t| format!(":`{}`", t))
            .unwrap_or_default();
        let arrow = if self.is_directed() { "->" } else { "-" };
        Ok(format!(
            "({})-[{}{}{}{}]{}({})",
            start.var(),
            self.var,
            rel_type,
            self.depth,
            inline,
            arrow,
            end.var()
        ))
    }
}

impl GraphObject for Relationship {
    fn object_name(&self) -> &'static str {
        REL_OWNER
    }

    fn var(&self) -> &str {
        &self.var
    }

    fn properties(&self) -> &[Property] {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Vec<Property> {
        &mut self.properties
    }

    fn binding(&self) -> &Binding {
        &self.binding
    }

    fn binding_mut(&mut self) -> &mut Binding {
        &mut self.binding
    }
}

/// Builder for [`Relationship`]
pub struct RelationshipBuilder {
    rel_type: Option<String>,
    start: Option<Arc<Node>>,
    end: Option<Arc<Node>>,
    directed: Option<bool>,
    depth: Depth,
    var: Option<String>,
    properties: Vec<(String, Result<Property>)>,
    bind: Option<Vec<String>>,
}

impl RelationshipBuilder {
    pub fn start(mut self, node: Arc<Node>) -> Self {
        self.start = Some(node);
        self
    }

    pub fn end(mut self, node: Arc<Node>) -> Self {
        self.end = Some(node);
        self
    }

    pub fn var(mut self, var: impl Into<String>) -> Self {
        self.var = Some(var.into());
        self
    }

    pub fn depth(mut self, depth: Depth) -> Self {
        self.depth = depth;
        self
    }

    pub fn undirected(mut self) -> Self {
        self.directed = Some(false);
        self
    }

    pub fn property(mut self, name: impl Into<String>, property: Property) -> Self {
        self.properties.push((name.into(), Ok(property)));
        self
    }

    pub fn value(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        let property = Property::builder().value(value).build();
        self.properties.push((name.into(), property));
        self
    }

    pub fn bind<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bind = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> Result<Relationship> {
        let mut rel = Relationship {
            rel_type: SetOnce::from_option("type", self.rel_type),
            start: SetOnce::from_option("start_node", self.start),
            end: SetOnce::from_option("end_node", self.end),
            directed: SetOnce::from_option("directed", self.directed),
            depth: self.depth,
            var: self.var.unwrap_or_else(|| DEFAULT_REL_VAR.to_string()),
            properties: Vec::new(),
            binding: Binding::Unbound,
        };
        for (name, property) in self.properties {
            rel.add_property(&name, property?)?;
        }
        if let Some(keys) = self.bind {
            rel.bind(keys)?;
        }
        Ok(rel)
    }
}

/// Either kind of graph object, as accepted by the query verbs
#[derive(Debug, Clone)]
pub enum Entity {
    Node(Node),
    Relationship(Relationship),
}

impl Entity {
    pub fn as_object(&self) -> &dyn GraphObject {
        match self {
            Entity::Node(node) => node,
            Entity::Relationship(rel) => rel,
        }
    }

    pub fn var(&self) -> &str {
        self.as_object().var()
    }

    /// Pattern text, optionally with bound properties inlined
    pub fn render_pattern(&self, inline: bool, params: &mut Parameters) -> Result<String> {
        match (self, inline) {
            (Entity::Node(node), false) => Ok(node.pattern()),
            (Entity::Node(node), true) => Ok(node.inline_pattern(params)),
            (Entity::Relationship(rel), false) => rel.pattern(),
            (Entity::Relationship(rel), true) => rel.inline_pattern(params),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Entity::Node(_) => Ok(()),
            Entity::Relationship(rel) => rel.validate(),
        }
    }
}

impl From<Node> for Entity {
    fn from(node: Node) -> Self {
        Entity::Node(node)
    }
}

impl From<&Node> for Entity {
    fn from(node: &Node) -> Self {
        Entity::Node(node.clone())
    }
}

impl From<Relationship> for Entity {
    fn from(rel: Relationship) -> Self {
        Entity::Relationship(rel)
    }
}

impl From<&Relationship> for Entity {
    fn from(rel: &Relationship) -> Self {
        Entity::Relationship(rel.clone())
    }
}
