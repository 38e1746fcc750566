//! Mapped objects
//!
//! An [`Object`] is one instance of a [`Model`]. Writes through [`Object::set`]
//! are tracked as `(old, new)` pairs so a MERGE only rewrites what changed.

use crate::model::Model;
use cypherform_core::{Error, Expression, GraphObject, Node, PropertyValue, Result};
use cypherform_graph::Graph;
use cypherform_protocol::Record;
use cypherform_query::Query;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Old and new value of a changed property
pub type Change = (PropertyValue, PropertyValue);

#[derive(Debug, Clone)]
pub struct Object {
    model: Arc<Model>,
    node: Node,
    changed: BTreeMap<String, Change>,
}

impl Object {
    pub(crate) fn new(model: Arc<Model>, node: Node) -> Self {
        Self {
            model,
            node,
            changed: BTreeMap::new(),
        }
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub(crate) fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    pub fn var(&self) -> &str {
        self.node.var()
    }

    pub fn get(&self, name: &str) -> Result<&PropertyValue> {
        self.node.get(name)
    }

    /// Set a property through its coercion, recording the change
    ///
    /// A read-only property that already holds a value refuses new ones.
    pub fn set(&mut self, name: &str, value: impl Into<PropertyValue>) -> Result<()> {
        let property = self
            .node
            .property(name)
            .ok_or_else(|| Error::UnknownProperty(name.to_string()))?;
        let old = property.value().clone();
        if property.is_read_only() && !old.is_null() {
            return Err(Error::immutable(name, self.model.name()));
        }

        self.node.set(name, value.into())?;
        let new = self.node.get(name)?.clone();
        if old == new {
            return Ok(());
        }

        let original = self
            .changed
            .remove(name)
            .map(|(original, _)| original)
            .unwrap_or(old);
        if original != new {
            self.changed.insert(name.to_string(), (original, new));
        }
        Ok(())
    }

    /// Properties changed since the object was built or last written
    pub fn changed(&self) -> &BTreeMap<String, Change> {
        &self.changed
    }

    pub fn is_changed(&self) -> bool {
        !self.changed.is_empty()
    }

    /// Current values by property name
    pub fn values(&self) -> BTreeMap<String, PropertyValue> {
        self.node
            .properties()
            .iter()
            .filter_map(|p| p.name().map(|name| (name.to_string(), p.value().clone())))
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.values()).map_err(|e| Error::Serialization(e.to_string()))
    }

    // ========== Binding ==========

    pub fn bind<I, S>(&mut self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node.bind(keys)
    }

    pub fn bind_primary_keys(&mut self) {
        self.node.bind_primary_keys();
    }

    pub fn bind_none(&mut self) {
        self.node.bind_none();
    }

    pub fn unbind(&mut self) {
        self.node.unbind();
    }

    pub fn is_bound(&self) -> bool {
        self.node.is_bound()
    }

    pub fn bound_keys(&self) -> &[String] {
        self.node.bound_keys()
    }

    /// Copy of the node under `var`, bound for a write
    ///
    /// An unbound object falls back to its primary keys. Binding to
    /// nothing is refused unless `unbounded` is allowed.
    pub(crate) fn bound_node(
        &self,
        var: Option<&str>,
        action: &str,
        unbounded: bool,
        hint: &str,
    ) -> Result<Node> {
        let mut node = self.node.copy();
        if let Some(var) = var {
            node.set_var(var);
        }
        if !node.is_bound() {
            node.bind_primary_keys();
        }
        if node.bound_keys().is_empty() && !unbounded {
            return Err(Error::UnboundedWrite {
                action: action.to_string(),
                object: self.model.name().to_string(),
                hint: hint.to_string(),
            });
        }
        Ok(node)
    }

    fn graph(&self, action: &str) -> Result<Arc<Graph>> {
        self.model.graph_for(action).cloned()
    }

    fn assignments<'a, I>(node: &Node, names: I) -> Result<Vec<Expression>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names
            .into_iter()
            .map(|name| Ok(node.prop(name)?.eq(node.get(name)?.clone())))
            .collect()
    }

    // ========== Writes ==========

    /// `CREATE` the object with every property
    pub fn create(&mut self) -> Result<Vec<Record>> {
        let graph = self.graph("create")?;
        let records = graph.run_query(&Query::create(&self.node)?)?;
        debug!("Created {} object", self.model.name());
        self.changed.clear();
        Ok(records)
    }

    /// `MATCH` the object by its bound keys and delete it
    ///
    /// Without bound keys the write is refused unless `force` is set.
    pub fn delete(&self, detach: bool, force: bool) -> Result<Vec<Record>> {
        let graph = self.graph("delete")?;
        let node = self.bound_node(
            None,
            "delete",
            force,
            "Use delete_all() or delete(detach, true).",
        )?;

        self.run_delete(&graph, &node, detach)
    }

    /// Delete every node with this object's labels
    ///
    /// The object keeps its own binding.
    pub fn delete_all(&self) -> Result<Vec<Record>> {
        let graph = self.graph("delete")?;
        let mut node = self.node.copy();
        node.bind_none();
        self.run_delete(&graph, &node, true)
    }

    fn run_delete(&self, graph: &Graph, node: &Node, detach: bool) -> Result<Vec<Record>> {
        let query = Query::matching(node)?;
        let query = if detach {
            query.detach_delete([node])
        } else {
            query.delete([node])
        };
        let records = graph.run_query(&query)?;
        debug!("Deleted {} object", self.model.name());
        Ok(records)
    }

    /// `MERGE` on the bound keys
    ///
    /// Every property is written on create, changed properties on match.
    /// Without bound keys the write is refused unless `singleton` is set.
    pub fn merge(&mut self, singleton: bool) -> Result<Vec<Record>> {
        let graph = self.graph("merge")?;
        let node = self.bound_node(
            None,
            "merge",
            singleton,
            "To merge a singleton pass singleton = true.",
        )?;

        let all = Self::assignments(&node, node.properties().iter().filter_map(|p| p.name()))?;
        let changed = Self::assignments(&node, self.changed.keys().map(String::as_str))?;

        let mut query = Query::merge(&node)?;
        if !all.is_empty() {
            query = query.on_create().set_all(all);
        }
        if !changed.is_empty() {
            query = query.on_match().set_all(changed);
        }
        let query = query.returning([&node]);

        let records = graph.run_query(&query)?;
        debug!("Merged {} object", self.model.name());
        self.changed.clear();
        Ok(records)
    }

    // ========== Relations ==========

    /// Connect to `other` through the named relation
    pub fn relate(&self, relation: &str, other: &Object) -> Result<Vec<Record>> {
        self.model.relation(relation)?.relate(self, other)
    }

    /// Remove the named relation to `other`
    pub fn unrelate(&self, relation: &str, other: &Object) -> Result<Vec<Record>> {
        self.model.relation(relation)?.unrelate(self, other)
    }

    /// Instances of `target` reached through the named relation
    pub fn related(&self, relation: &str, target: &Model) -> Result<Vec<Record>> {
        self.model.relation(relation)?.related(self, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cypherform_core::{Property, PropertyType};
    use cypherform_graph::{GraphConfig, MemoryExecutor};
    use proptest::prelude::*;

    fn graph() -> (Arc<MemoryExecutor>, Arc<Graph>) {
        let executor = Arc::new(MemoryExecutor::new());
        let graph = Graph::with_config(executor.clone(), GraphConfig::for_testing());
        (executor, Arc::new(graph))
    }

    fn customer(graph: Option<Arc<Graph>>) -> Arc<Model> {
        let mut builder = Model::builder("Customer")
            .property("email", Property::builder().primary_key().build().unwrap())
            .property("name", Property::new())
            .property("visits", Property::of(PropertyType::integer()));
        if let Some(graph) = graph {
            builder = builder.graph(graph);
        }
        builder.build().unwrap()
    }

    fn tag(graph: Arc<Graph>) -> Arc<Model> {
        Model::builder("Tag")
            .property("name", Property::new())
            .graph(graph)
            .build()
            .unwrap()
    }

    #[test]
    fn test_change_tracking() {
        let mut object = customer(None).instance().unwrap();
        object.set("name", "Frank").unwrap();
        object.set("name", "Francis").unwrap();
        assert_eq!(
            object.changed()["name"],
            (PropertyValue::Null, PropertyValue::from("Francis"))
        );

        object.set("visits", "3").unwrap();
        assert_eq!(object.get("visits").unwrap(), &PropertyValue::Integer(3));
        object.set("visits", 3).unwrap();
        assert_eq!(object.changed().len(), 2);

        assert!(matches!(
            object.set("missing", 1),
            Err(Error::UnknownProperty(_))
        ));
    }

    #[test]
    fn test_revert_clears_change() {
        let model = customer(None);
        let mut object = model.instance_with([("name", "Frank")]).unwrap();
        assert!(!object.is_changed());
        object.set("name", "Bob").unwrap();
        object.set("name", "Frank").unwrap();
        assert!(!object.is_changed());
    }

    #[test]
    fn test_read_only() {
        let model = Model::builder("Account")
            .property("id", Property::builder().read_only().build().unwrap())
            .build()
            .unwrap();
        let mut object = model.instance().unwrap();
        object.set("id", "a1").unwrap();
        let err = object.set("id", "a2").unwrap_err();
        assert!(err.is_immutability());
        assert_eq!(object.get("id").unwrap(), &PropertyValue::from("a1"));
    }

    #[test]
    fn test_detached_object() {
        let mut object = customer(None).instance().unwrap();
        for err in [
            object.create().unwrap_err(),
            object.merge(true).unwrap_err(),
            object.delete(true, true).unwrap_err(),
        ] {
            assert!(matches!(err, Error::DetachedObject { .. }));
        }
    }

    #[test]
    fn test_create() {
        let (executor, graph) = graph();
        let mut object = customer(Some(graph))
            .instance_with([("email", "f@x.io"), ("name", "Frank")])
            .unwrap();
        object.set("visits", 1).unwrap();
        object.create().unwrap();

        let request = executor.last().unwrap();
        assert_eq!(
            request.statement,
            "CREATE (node:`Customer`)\n    SET node.email = {node_email}, node.name = {node_name}, node.visits = {node_visits}"
        );
        assert_eq!(
            request.parameters.get("node_visits"),
            Some(&PropertyValue::Integer(1))
        );
        assert!(!object.is_changed());
    }

    #[test]
    fn test_delete_by_primary_key() {
        let (executor, graph) = graph();
        let object = customer(Some(graph))
            .instance_with([("email", "f@x.io")])
            .unwrap();
        object.delete(false, false).unwrap();
        assert_eq!(
            executor.last().unwrap().statement,
            "MATCH (node:`Customer`)\n    WHERE node.email = {node_email}\n    DELETE node"
        );
    }

    #[test]
    fn test_unbounded_delete() {
        let (executor, graph) = graph();
        let object = tag(graph).instance().unwrap();
        let err = object.delete(true, false).unwrap_err();
        assert!(err.is_unbounded_write());
        assert!(executor.requests().is_empty());

        object.delete_all().unwrap();
        assert_eq!(
            executor.last().unwrap().statement,
            "MATCH (node:`Tag`)\n    DETACH DELETE node"
        );
    }

    #[test]
    fn test_delete_all_keeps_binding() {
        let (executor, graph) = graph();
        let mut object = customer(Some(graph))
            .instance_with([("email", "f@x.io")])
            .unwrap();
        object.bind_primary_keys();

        object.delete_all().unwrap();
        assert_eq!(
            executor.last().unwrap().statement,
            "MATCH (node:`Customer`)\n    DETACH DELETE node"
        );
        assert_eq!(object.bound_keys(), ["email"]);

        object.set("visits", 4).unwrap();
        object.merge(false).unwrap();
        assert!(
            executor
                .last()
                .unwrap()
                .statement
                .starts_with("MERGE (node:`Customer` {email: {node_email}})")
        );
    }

    #[test]
    fn test_merge() {
        let (executor, graph) = graph();
        let mut object = customer(Some(graph))
            .instance_with([("email", "f@x.io"), ("name", "Frank")])
            .unwrap();
        object.set("visits", 2).unwrap();
        object.merge(false).unwrap();

        let request = executor.last().unwrap();
        assert_eq!(
            request.statement,
            "MERGE (node:`Customer` {email: {node_email}})\n\
             ON CREATE\n    SET node.email = {param0}, node.name = {node_name}, node.visits = {node_visits}\n\
             ON MATCH\n    SET node.visits = {param1}\n\
             RETURN node"
        );
        assert_eq!(request.parameters.len(), 5);
        assert_eq!(
            request.parameters.get("param1"),
            Some(&PropertyValue::Integer(2))
        );
        assert!(!object.is_changed());
    }

    #[test]
    fn test_merge_singleton() {
        let (executor, graph) = graph();
        let mut object = tag(graph).instance().unwrap();
        assert!(object.merge(false).unwrap_err().is_unbounded_write());

        object.merge(true).unwrap();
        assert_eq!(
            executor.last().unwrap().statement,
            "MERGE (node:`Tag`)\nON CREATE\n    SET node.name = {node_name}\nRETURN node"
        );
    }

    #[test]
    fn test_to_json() {
        let object = customer(None)
            .instance_with([("email", "f@x.io")])
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&object.to_json().unwrap()).unwrap();
        assert_eq!(json["email"], "f@x.io");
        assert!(json["name"].is_null());
    }

    proptest! {
        #[test]
        fn test_changed_tracks_first_and_last(values in proptest::collection::vec(0i64..5, 1..10)) {
            let mut object = customer(None).instance().unwrap();
            for v in &values {
                object.set("visits", *v).unwrap();
            }
            let last = PropertyValue::Integer(*values.last().unwrap());
            match object.changed().get("visits") {
                Some((old, new)) => {
                    prop_assert_eq!(old, &PropertyValue::Null);
                    prop_assert_eq!(new, &last);
                }
                None => prop_assert!(false, "null to integer is always a change"),
            }
        }
    }
}
