//! Model descriptors
//!
//! A [`Model`] is the description of a mapped node type: its labels, its
//! properties, its relations and the graph it lives in. Instances are
//! [`Object`]s built from the model's template node.

use crate::object::Object;
use crate::relation::Relation;
use cypherform_core::{
    DEFAULT_NODE_VAR, Error, GraphObject, Node, Property, PropertyValue, Result,
};
use cypherform_graph::Graph;
use cypherform_protocol::Record;
use cypherform_query::Query;
use std::sync::{Arc, RwLock, RwLockReadGuard};
use tracing::debug;

/// Describes a mapped node type
#[derive(Debug)]
pub struct Model {
    name: String,
    labels: Vec<String>,
    properties: Vec<(String, Property)>,
    relations: Vec<(String, Relation)>,
    /// Reverse relations registered by models that point here
    backrefs: RwLock<Vec<(String, Relation)>>,
    var: String,
    is_abstract: bool,
    graph: Option<Arc<Graph>>,
}

impl Model {
    pub fn builder(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Labels in declaration order, inherited ones first
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn var(&self) -> &str {
        &self.var
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn graph(&self) -> Option<&Arc<Graph>> {
        self.graph.as_ref()
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(name, _)| name.as_str())
    }

    /// Look up a declared relation or a registered backref
    pub fn relation(&self, name: &str) -> Result<Relation> {
        if let Some((_, relation)) = self.relations.iter().find(|(n, _)| n == name) {
            return Ok(relation.clone());
        }
        self.read_backrefs()?
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, relation)| relation.clone())
            .ok_or_else(|| {
                Error::InvalidRelation(format!("{} has no relation '{}'", self.name, name))
            })
    }

    /// Names of declared relations followed by registered backrefs
    pub fn relation_names(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = self.relations.iter().map(|(n, _)| n.clone()).collect();
        names.extend(self.read_backrefs()?.iter().map(|(n, _)| n.clone()));
        Ok(names)
    }

    fn read_backrefs(&self) -> Result<RwLockReadGuard<'_, Vec<(String, Relation)>>> {
        self.backrefs
            .read()
            .map_err(|_| Error::Internal("model backref lock poisoned".to_string()))
    }

    pub(crate) fn register_backref(&self, name: String, relation: Relation) -> Result<()> {
        let mut backrefs = self
            .backrefs
            .write()
            .map_err(|_| Error::Internal("model backref lock poisoned".to_string()))?;
        let taken = self.relations.iter().any(|(n, _)| *n == name)
            || backrefs.iter().any(|(n, _)| *n == name)
            || self.properties.iter().any(|(n, _)| *n == name);
        if taken {
            return Err(Error::InvalidRelation(format!(
                "{} already has a member named '{}'",
                self.name, name
            )));
        }
        debug!(
            "Registered backref {}.{} over {}",
            self.name,
            name,
            relation.rel_type()
        );
        backrefs.push((name, relation));
        Ok(())
    }

    pub(crate) fn graph_for(&self, action: &str) -> Result<&Arc<Graph>> {
        self.graph
            .as_ref()
            .ok_or_else(|| Error::detached(action, &self.name))
    }

    /// Node carrying the model's labels and fresh copies of its properties
    pub fn template(&self) -> Result<Node> {
        let mut builder = Node::builder(self.labels.iter().map(String::as_str)).var(&self.var);
        for (name, property) in &self.properties {
            builder = builder.property(name, property.clone());
        }
        builder.build()
    }

    /// New unsaved instance with defaults applied
    pub fn instance(self: &Arc<Self>) -> Result<Object> {
        let mut node = self.template()?;
        for (name, _) in &self.properties {
            if node.get(name)?.is_null() {
                node.set(name, PropertyValue::Null)?;
            }
        }
        Ok(Object::new(Arc::clone(self), node))
    }

    /// New instance holding `values`; nothing is recorded as changed
    pub fn instance_with<I, K, V>(self: &Arc<Self>, values: I) -> Result<Object>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<PropertyValue>,
    {
        let mut object = self.instance()?;
        for (name, value) in values {
            object.node_mut().set(name.as_ref(), value.into())?;
        }
        Ok(object)
    }

    /// Instance from a map returned by the database
    ///
    /// Unknown keys are ignored; the instance is bound to its primary keys.
    pub fn load(self: &Arc<Self>, value: &PropertyValue) -> Result<Object> {
        let PropertyValue::Map(map) = value else {
            return Err(Error::Validation(format!(
                "cannot load {} from {}",
                self.name, value
            )));
        };
        let mut object = self.instance()?;
        for (name, value) in map {
            if object.node().has_property(name) {
                object.node_mut().set(name, value.clone())?;
            }
        }
        object.bind_primary_keys();
        Ok(object)
    }

    /// Match instances whose properties equal `properties`
    pub fn find<I, K, V>(&self, properties: I) -> Result<Vec<Record>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<PropertyValue>,
    {
        let graph = self.graph_for("match")?;
        let mut node = self.template()?;
        let mut keys = Vec::new();
        for (name, value) in properties {
            node.set(name.as_ref(), value.into())?;
            keys.push(name.as_ref().to_string());
        }
        node.bind(keys)?;

        let query = Query::matching(&node)?.returning([&node]);
        graph.run_query(&query)
    }
}

/// Builder for [`Model`]
#[derive(Debug)]
pub struct ModelBuilder {
    name: String,
    label: Option<String>,
    inherited: Vec<String>,
    properties: Vec<(String, Property)>,
    relations: Vec<(String, Relation)>,
    var: Option<String>,
    is_abstract: bool,
    graph: Option<Arc<Graph>>,
}

impl ModelBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            inherited: Vec::new(),
            properties: Vec::new(),
            relations: Vec::new(),
            var: None,
            is_abstract: false,
            graph: None,
        }
    }

    /// Own label; defaults to the model name
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Inherit labels, properties, relations and graph from `parent`
    pub fn extends(mut self, parent: &Model) -> Self {
        self.inherited.extend(parent.labels.iter().cloned());
        for (name, property) in &parent.properties {
            self = self.property(name.clone(), property.clone());
        }
        // the parent already registered its backrefs
        self.relations.extend(
            parent
                .relations
                .iter()
                .map(|(name, relation)| (name.clone(), relation.without_backref())),
        );
        if self.graph.is_none() {
            self.graph = parent.graph.clone();
        }
        self
    }

    /// Contribute no label of its own
    pub fn abstract_model(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Declare a property; a later declaration replaces an earlier one
    pub fn property(mut self, name: impl Into<String>, property: Property) -> Self {
        let name = name.into();
        match self.properties.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = property,
            None => self.properties.push((name, property)),
        }
        self
    }

    /// Declare a relation; a backref on it is registered on its target at build
    pub fn relation(mut self, name: impl Into<String>, relation: Relation) -> Self {
        self.relations.push((name.into(), relation));
        self
    }

    /// Display variable of instances
    pub fn var(mut self, var: impl Into<String>) -> Self {
        self.var = Some(var.into());
        self
    }

    /// Attach to a graph; the model's schema is registered on build
    pub fn graph(mut self, graph: Arc<Graph>) -> Self {
        self.graph = Some(graph);
        self
    }

    pub fn build(self) -> Result<Arc<Model>> {
        let mut labels: Vec<String> = Vec::new();
        let own = (!self.is_abstract).then(|| self.label.clone().unwrap_or(self.name.clone()));
        for label in self.inherited.into_iter().chain(own) {
            if !labels.contains(&label) {
                labels.push(label);
            }
        }

        let model = Model {
            name: self.name,
            labels,
            properties: self.properties,
            relations: self.relations,
            backrefs: RwLock::new(Vec::new()),
            var: self.var.unwrap_or_else(|| DEFAULT_NODE_VAR.to_string()),
            is_abstract: self.is_abstract,
            graph: self.graph,
        };

        if !model.labels.is_empty() {
            let template = model.template()?;
            if let (Some(graph), false) = (&model.graph, model.is_abstract) {
                graph.add_schema(&template, false)?;
            }
        }

        for (_, relation) in &model.relations {
            if let Some((target, name, reverse)) = relation.reverse_for(&model.labels) {
                target.register_backref(name, reverse)?;
            }
        }

        debug!(
            "Built model {} with labels {:?} and {} propert(ies)",
            model.name,
            model.labels,
            model.properties.len()
        );
        Ok(Arc::new(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cypherform_core::PropertyType;
    use cypherform_graph::memory::record;
    use cypherform_graph::{GraphConfig, MemoryExecutor};

    fn graph() -> (Arc<MemoryExecutor>, Arc<Graph>) {
        let executor = Arc::new(MemoryExecutor::new());
        let graph = Graph::with_config(executor.clone(), GraphConfig::for_testing());
        (executor, Arc::new(graph))
    }

    fn entity() -> Arc<Model> {
        Model::builder("Entity")
            .abstract_model()
            .property(
                "id",
                Property::builder()
                    .kind(PropertyType::uuid())
                    .default_with(|| uuid::Uuid::new_v4().into())
                    .primary_key()
                    .read_only()
                    .build()
                    .unwrap(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_labels_and_inheritance() {
        let base = entity();
        assert!(base.labels().is_empty());
        assert!(base.template().is_err());

        let customer = Model::builder("Customer")
            .extends(&base)
            .property("name", Property::new())
            .build()
            .unwrap();
        assert_eq!(customer.labels(), ["Customer"]);
        assert_eq!(customer.property_names().collect::<Vec<_>>(), ["id", "name"]);

        let vip = Model::builder("Vip")
            .extends(&customer)
            .label("VipCustomer")
            .build()
            .unwrap();
        assert_eq!(vip.labels(), ["Customer", "VipCustomer"]);
        assert_eq!(vip.template().unwrap().node_type(), "VipCustomer");
    }

    #[test]
    fn test_property_override() {
        let base = Model::builder("Person")
            .property("age", Property::new())
            .build()
            .unwrap();
        let child = Model::builder("Child")
            .extends(&base)
            .property("age", Property::of(PropertyType::integer()))
            .build()
            .unwrap();
        let mut object = child.instance().unwrap();
        object.set("age", "7").unwrap();
        assert_eq!(object.get("age").unwrap(), &PropertyValue::Integer(7));
    }

    #[test]
    fn test_instance_applies_defaults() {
        let customer = Model::builder("Customer").extends(&entity()).build().unwrap();
        let a = customer.instance().unwrap();
        let b = customer.instance().unwrap();
        assert!(!a.get("id").unwrap().is_null());
        assert_ne!(a.get("id").unwrap(), b.get("id").unwrap());
        assert!(!a.is_changed());
    }

    #[test]
    fn test_schema_registered_on_build() {
        let (executor, graph) = graph();
        Model::builder("Customer")
            .property("email", Property::builder().unique().build().unwrap())
            .graph(graph.clone())
            .build()
            .unwrap();

        assert!(graph.has_schema("Customer").unwrap());
        assert!(
            executor
                .statements()
                .contains(&"CREATE CONSTRAINT ON ( customer:Customer ) ASSERT customer.email IS UNIQUE".to_string())
        );
    }

    #[test]
    fn test_find() {
        let (executor, graph) = graph();
        let customer = Model::builder("Customer")
            .property("name", Property::new())
            .property("city", Property::new())
            .graph(graph)
            .build()
            .unwrap();

        customer.find([("city", "Oslo")]).unwrap();
        let request = executor.last().unwrap();
        assert_eq!(
            request.statement,
            "MATCH (node:`Customer`)\n    WHERE node.city = {node_city}\nRETURN node"
        );
        assert_eq!(
            request.parameters.get("node_city"),
            Some(&PropertyValue::from("Oslo"))
        );
    }

    #[test]
    fn test_find_detached() {
        let customer = Model::builder("Customer").build().unwrap();
        let err = customer.find([("name", "x")]).unwrap_err();
        assert!(matches!(err, Error::DetachedObject { .. }));
    }

    #[test]
    fn test_load() {
        let customer = Model::builder("Customer")
            .property("email", Property::builder().primary_key().build().unwrap())
            .property("visits", Property::of(PropertyType::integer()))
            .build()
            .unwrap();
        let row = record([
            ("email", PropertyValue::from("a@b.c")),
            ("visits", PropertyValue::Integer(3)),
            ("extra", PropertyValue::Integer(1)),
        ]);
        let object = customer.load(&PropertyValue::Map(row)).unwrap();
        assert_eq!(object.get("visits").unwrap(), &PropertyValue::Integer(3));
        assert_eq!(object.bound_keys(), ["email"]);

        assert!(customer.load(&PropertyValue::from("nope")).is_err());
    }

    #[test]
    fn test_unknown_relation() {
        let customer = Model::builder("Customer").build().unwrap();
        assert!(matches!(
            customer.relation("orders"),
            Err(Error::InvalidRelation(_))
        ));
    }
}
