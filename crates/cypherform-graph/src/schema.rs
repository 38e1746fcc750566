//! Schema statements and the per-graph schema registry

use cypherform_core::{Error, GraphObject, Node, Property, PropertyValue, Result};
use cypherform_protocol::{Executor, Record, Request};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use tracing::{debug, info, warn};

/// Kind of schema statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaKind {
    /// Single-property index
    Index,
    /// Unique property value within a label
    Unique,
    /// Property must exist
    Exists,
}

/// An index or constraint on one property of a label
///
/// Equality and hashing use the rendered text, so two statements that
/// render the same are the same statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaStatement {
    /// Type of statement
    pub kind: SchemaKind,

    /// Label this statement applies to
    pub label: String,

    /// Property name
    pub property: String,
}

impl SchemaStatement {
    /// Create an index statement
    pub fn index(label: &str, property: &str) -> Self {
        Self::new(SchemaKind::Index, label, property)
    }

    /// Create a unique constraint statement
    pub fn unique(label: &str, property: &str) -> Self {
        Self::new(SchemaKind::Unique, label, property)
    }

    /// Create an existence constraint statement
    pub fn exists(label: &str, property: &str) -> Self {
        Self::new(SchemaKind::Exists, label, property)
    }

    fn new(kind: SchemaKind, label: &str, property: &str) -> Self {
        Self {
            kind,
            label: label.to_string(),
            property: property.to_string(),
        }
    }

    /// Statement body without a CREATE/DROP prefix
    pub fn text(&self) -> String {
        let var = self.label.to_lowercase();
        match self.kind {
            SchemaKind::Index => format!("INDEX ON :{}({})", self.label, self.property),
            SchemaKind::Unique => format!(
                "CONSTRAINT ON ( {var}:{} ) ASSERT {var}.{} IS UNIQUE",
                self.label, self.property
            ),
            SchemaKind::Exists => format!(
                "CONSTRAINT ON ( {var}:{} ) ASSERT exists({var}.{})",
                self.label, self.property
            ),
        }
    }

    pub fn create(&self) -> String {
        format!("CREATE {}", self.text())
    }

    pub fn drop(&self) -> String {
        format!("DROP {}", self.text())
    }
}

impl fmt::Display for SchemaStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl PartialEq for SchemaStatement {
    fn eq(&self, other: &Self) -> bool {
        self.text() == other.text()
    }
}

impl Eq for SchemaStatement {}

impl Hash for SchemaStatement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text().hash(state);
    }
}

/// Schema statements implied by one property of `label`
///
/// A unique property gets a unique constraint, otherwise an indexed one
/// gets an index. A required property additionally gets an existence
/// constraint.
pub fn property_schema(label: &str, property: &Property) -> Result<Vec<SchemaStatement>> {
    let name = property.name().ok_or_else(|| {
        Error::Validation(format!(
            "cannot build schema for an unnamed property of '{}'",
            label
        ))
    })?;

    let mut statements = Vec::new();
    if property.is_unique() {
        statements.push(SchemaStatement::unique(label, name));
    } else if property.is_indexed() {
        statements.push(SchemaStatement::index(label, name));
    }
    if property.is_required() {
        statements.push(SchemaStatement::exists(label, name));
    }
    Ok(statements)
}

/// Schema statements for every property of `node`, keyed on its type
pub fn node_schema(node: &Node) -> Result<Vec<SchemaStatement>> {
    let mut statements = Vec::new();
    for property in node.properties() {
        statements.extend(property_schema(node.node_type(), property)?);
    }
    Ok(statements)
}

/// What the database reports as live
#[derive(Debug, Clone, Default)]
struct Reflection {
    labels: HashSet<String>,
    statements: HashSet<String>,
}

impl Reflection {
    fn load<E: Executor + ?Sized>(executor: &E) -> Result<Self> {
        let mut reflection = Self::default();
        for record in executor.run(&Request::query("CALL db.labels()"))? {
            if let Some(label) = column(&record, &["label"]) {
                reflection.labels.insert(label.to_string());
            }
        }
        for record in executor.run(&Request::query("CALL db.constraints()"))? {
            if let Some(text) = column(&record, &["description", "constraint"]) {
                reflection.statements.insert(text.trim().to_string());
            }
        }
        for record in executor.run(&Request::query("CALL db.indexes()"))? {
            if let Some(text) = column(&record, &["description", "index"]) {
                reflection.statements.insert(text.trim().to_string());
            }
        }
        debug!(
            "Reflected {} label(s) and {} schema statement(s)",
            reflection.labels.len(),
            reflection.statements.len()
        );
        Ok(reflection)
    }
}

fn column<'a>(record: &'a Record, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| match record.get(*key) {
        Some(PropertyValue::String(s)) => Some(s.as_str()),
        _ => None,
    })
}

/// Registry of schema statements by label
#[derive(Debug, Clone)]
pub struct Schema {
    /// Statements by label
    registered: BTreeMap<String, Vec<SchemaStatement>>,

    /// Query the database for live schema before writing
    reflect: bool,

    /// Cached reflection, cleared by `refresh`
    reflection: Option<Reflection>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Schema {
    /// Create an empty registry
    pub fn new(reflect: bool) -> Self {
        Self {
            registered: BTreeMap::new(),
            reflect,
            reflection: None,
        }
    }

    /// Check if a label is registered
    pub fn contains(&self, label: &str) -> bool {
        self.registered.contains_key(label)
    }

    /// Statements registered for a label
    pub fn statements(&self, label: &str) -> Option<&[SchemaStatement]> {
        self.registered.get(label).map(Vec::as_slice)
    }

    /// Every registered statement, grouped by label
    pub fn ls(&self) -> Vec<&SchemaStatement> {
        self.registered.values().flatten().collect()
    }

    /// Check if the database reported `label` at the last reflection
    pub fn has_live_label(&self, label: &str) -> bool {
        self.reflection
            .as_ref()
            .is_some_and(|r| r.labels.contains(label))
    }

    /// Forget cached reflection; the next write reflects again
    pub fn refresh(&mut self) {
        self.reflection = None;
    }

    fn reflection<E: Executor + ?Sized>(&mut self, executor: &E) -> Result<&mut Reflection> {
        if self.reflection.is_none() {
            let loaded = if self.reflect {
                Reflection::load(executor)?
            } else {
                Reflection::default()
            };
            self.reflection = Some(loaded);
        }
        Ok(self.reflection.get_or_insert_with(Reflection::default))
    }

    /// Register the schema of `node`'s type and write what is missing
    ///
    /// A label is registered once; later calls for the same label do
    /// nothing. With `overwrite`, live statements are dropped and
    /// recreated. Returns the statements that were created.
    pub fn add<E: Executor + ?Sized>(
        &mut self,
        executor: &E,
        node: &Node,
        overwrite: bool,
    ) -> Result<Vec<SchemaStatement>> {
        let label = node.node_type().to_string();
        if self.contains(&label) {
            debug!("Schema for label {} already registered", label);
            return Ok(Vec::new());
        }

        let statements = node_schema(node)?;
        let reflect = self.reflect;
        let live = self.reflection(executor)?;

        if overwrite {
            for statement in &statements {
                let text = statement.text();
                if live.statements.contains(&text) || !reflect {
                    warn!("Dropping {}", text);
                    executor.run(&Request::query(statement.drop()))?;
                    live.statements.remove(&text);
                }
            }
        }

        let mut created = Vec::new();
        for statement in &statements {
            let text = statement.text();
            if live.statements.contains(&text) {
                continue;
            }
            executor.run(&Request::query(statement.create()))?;
            live.statements.insert(text);
            created.push(statement.clone());
        }
        live.labels.insert(label.clone());

        info!(
            "Registered schema for label {} ({} statement(s), {} created)",
            label,
            statements.len(),
            created.len()
        );
        self.registered.insert(label, statements);
        Ok(created)
    }

    /// Drop every registered statement that is live and clear the registry
    pub fn drop_all<E: Executor + ?Sized>(&mut self, executor: &E) -> Result<usize> {
        let registered = std::mem::take(&mut self.registered);
        let live = self.reflection(executor)?;

        let mut dropped = 0;
        for statement in registered.values().flatten() {
            let text = statement.text();
            if !live.statements.remove(&text) {
                continue;
            }
            warn!("Dropping {}", text);
            executor.run(&Request::query(statement.drop()))?;
            dropped += 1;
        }
        Ok(dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryExecutor, record};

    fn person() -> Node {
        Node::builder(["Person"])
            .property("name", Property::builder().indexed().build().unwrap())
            .property("SSN", Property::builder().unique().required().build().unwrap())
            .property("nickname", Property::new())
            .build()
            .unwrap()
    }

    #[test]
    fn test_property_schema() {
        let mut prop = Property::builder().unique().required().build().unwrap();
        assert!(property_schema("Person", &prop).is_err());

        prop.set_name("SSN").unwrap();
        let statements = property_schema("Person", &prop).unwrap();
        assert_eq!(
            statements[0].text(),
            "CONSTRAINT ON ( person:Person ) ASSERT person.SSN IS UNIQUE"
        );
        assert_eq!(
            statements[1].text(),
            "CONSTRAINT ON ( person:Person ) ASSERT exists(person.SSN)"
        );
    }

    #[test]
    fn test_index_statement() {
        let index = SchemaStatement::index("Person", "name");
        assert_eq!(index.create(), "CREATE INDEX ON :Person(name)");
        assert_eq!(index.drop(), "DROP INDEX ON :Person(name)");
        assert_eq!(index.to_string(), "INDEX ON :Person(name)");
    }

    #[test]
    fn test_node_schema() {
        let statements = node_schema(&person()).unwrap();
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0], SchemaStatement::index("Person", "name"));

        let unique: HashSet<_> = statements.iter().cloned().collect();
        assert!(unique.contains(&SchemaStatement::exists("Person", "SSN")));
    }

    #[test]
    fn test_schema_registers_once() {
        let executor = MemoryExecutor::new();
        let mut schema = Schema::default();

        let created = schema.add(&executor, &person(), false).unwrap();
        assert_eq!(created.len(), 3);
        assert!(schema.contains("Person"));

        let created = schema.add(&executor, &person(), false).unwrap();
        assert!(created.is_empty());
        assert_eq!(schema.ls().len(), 3);

        let creates = executor
            .statements()
            .into_iter()
            .filter(|s| s.starts_with("CREATE"))
            .count();
        assert_eq!(creates, 3);
    }

    #[test]
    fn test_reflection_skips_live_statements() {
        let executor = MemoryExecutor::new();
        executor.respond(
            "CALL db.indexes()",
            vec![record([("description", "INDEX ON :Person(name)")])],
        ).unwrap();
        executor.respond("CALL db.labels()", vec![record([("label", "Person")])]).unwrap();

        let mut schema = Schema::default();
        let created = schema.add(&executor, &person(), false).unwrap();
        assert_eq!(created.len(), 2);
        assert!(schema.has_live_label("Person"));
        assert!(
            !executor
                .statements()
                .contains(&"CREATE INDEX ON :Person(name)".to_string())
        );
    }

    #[test]
    fn test_reflection_is_cached_until_refresh() {
        let executor = MemoryExecutor::new();
        let mut schema = Schema::default();
        let company = Node::builder(["Company"]).build().unwrap();

        schema.add(&executor, &person(), false).unwrap();
        schema.add(&executor, &company, false).unwrap();
        let reflections = |e: &MemoryExecutor| {
            e.statements()
                .iter()
                .filter(|s| s.as_str() == "CALL db.labels()")
                .count()
        };
        assert_eq!(reflections(&executor), 1);

        schema.refresh();
        let order = Node::builder(["Order"]).build().unwrap();
        schema.add(&executor, &order, false).unwrap();
        assert_eq!(reflections(&executor), 2);
    }

    #[test]
    fn test_overwrite_drops_live_statements() {
        let executor = MemoryExecutor::new();
        executor.respond(
            "CALL db.constraints()",
            vec![record([(
                "description",
                "CONSTRAINT ON ( person:Person ) ASSERT person.SSN IS UNIQUE",
            )])],
        ).unwrap();
        let mut schema = Schema::default();
        let created = schema.add(&executor, &person(), true).unwrap();
        assert_eq!(created.len(), 3);

        let statements = executor.statements();
        let drop = statements
            .iter()
            .position(|s| s.starts_with("DROP CONSTRAINT ON ( person:Person ) ASSERT person.SSN IS UNIQUE"))
            .unwrap();
        let create = statements
            .iter()
            .position(|s| s.starts_with("CREATE CONSTRAINT ON ( person:Person ) ASSERT person.SSN IS UNIQUE"))
            .unwrap();
        assert!(drop < create);
        assert_eq!(statements.iter().filter(|s| s.starts_with("DROP")).count(), 1);
    }

    #[test]
    fn test_without_reflection() {
        let executor = MemoryExecutor::new();
        let mut schema = Schema::new(false);
        schema.add(&executor, &person(), false).unwrap();
        assert!(
            executor
                .statements()
                .iter()
                .all(|s| !s.starts_with("CALL"))
        );
    }

    #[test]
    fn test_drop_all() {
        let executor = MemoryExecutor::new();
        let mut schema = Schema::default();
        schema.add(&executor, &person(), false).unwrap();

        let dropped = schema.drop_all(&executor).unwrap();
        assert_eq!(dropped, 3);
        assert!(schema.ls().is_empty());
        assert!(
            executor
                .statements()
                .contains(&"DROP INDEX ON :Person(name)".to_string())
        );
    }
}
