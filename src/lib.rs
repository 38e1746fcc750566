//! cypherform - object-graph mapping for Cypher databases
//!
//! This is the main library crate that re-exports all cypherform components.

pub use cypherform_core as core;
pub use cypherform_graph as graph;
pub use cypherform_ogm as ogm;
pub use cypherform_protocol as protocol;
pub use cypherform_query as query;

// Re-export commonly used types
pub use cypherform_core::{
    Depth, Error, Expression, Func, FunctionCall, GraphObject, Node, Parameters, Predicate,
    Property, PropertyType, PropertyValue, Relationship, Result,
};

pub use cypherform_graph::{Graph, GraphConfig, MemoryExecutor};
pub use cypherform_ogm::{Direction, Model, Object, Relation};
pub use cypherform_protocol::{Executor, Record, Request};
pub use cypherform_query::{CompiledQuery, Projection, Query};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_end_to_end() {
        let executor = Arc::new(MemoryExecutor::new());
        let graph = Arc::new(Graph::with_config(
            executor.clone(),
            GraphConfig::for_testing(),
        ));

        let person = Model::builder("Person")
            .property("name", Property::builder().primary_key().indexed().build().unwrap())
            .property("age", Property::of(PropertyType::integer()))
            .relation("friends", Relation::many_to_many("KNOWS"))
            .graph(graph.clone())
            .build()
            .unwrap();

        let mut alice = person.instance_with([("name", "Alice")]).unwrap();
        alice.set("age", "29").unwrap();
        alice.create().unwrap();

        let bob = person.instance_with([("name", "Bob")]).unwrap();
        alice.relate("friends", &bob).unwrap();

        let statements = executor.statements();
        assert_eq!(statements[0], "CREATE INDEX ON :Person(name)");
        assert_eq!(
            statements[1],
            "CREATE (node:`Person`)\n    SET node.name = {node_name}, node.age = {node_age}"
        );
        assert!(statements[2].ends_with("MERGE (origin)-[rel:`KNOWS`]->(target)"));

        let payload: serde_json::Value =
            serde_json::from_str(&executor.requests()[1].to_http_payload().unwrap()).unwrap();
        assert_eq!(payload["statements"][0]["parameters"]["node_age"], 29);
        assert_eq!(graph.log().unwrap().len(), 3);
    }

    #[test]
    fn test_query_builder() {
        let node = Node::builder(["Person"])
            .var("n")
            .property("age", Property::of(PropertyType::integer()))
            .build()
            .unwrap();
        let query = Query::matching(&node)
            .unwrap()
            .and_where(node.prop("age").unwrap().ge(18))
            .returning([&node])
            .limit(10);
        let compiled = query.compile().unwrap();
        assert_eq!(
            compiled.statement,
            "MATCH (n:`Person`)\n    WHERE n.age >= {n_age}\nRETURN n\nLIMIT 10"
        );
        assert_eq!(compiled.params.get("n_age"), Some(&PropertyValue::Integer(18)));
    }
}
