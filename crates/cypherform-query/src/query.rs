//! Query sequences
//!
//! A [`Query`] is an ordered list of statements separated by nothing
//! (sequencing), `UNION` or `UNION ALL`. Every statement compiles into the
//! same parameter table, so names never collide across statements.

use crate::statement::{Clause, Projection, SetScope, Statement, Verb};
use cypherform_core::{Entity, Error, Expression, Node, Parameters, Predicate, Result};
use serde::Serialize;
use std::ops::BitAnd;
use std::sync::OnceLock;
use tracing::debug;

/// Statement text with its parameter table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub statement: String,
    #[serde(rename = "parameters")]
    pub params: Parameters,
}

#[derive(Debug, Clone)]
enum Part {
    Statement(Statement),
    Union { all: bool },
}

/// A fluent, compilable Cypher query
#[derive(Debug, Clone)]
pub struct Query {
    parts: Vec<Part>,
    compiled: OnceLock<CompiledQuery>,
}

impl Query {
    fn single(verb: Verb, entity: impl Into<Entity>) -> Result<Self> {
        let statement = Statement::new(verb, entity.into())?;
        Ok(Self {
            parts: vec![Part::Statement(statement)],
            compiled: OnceLock::new(),
        })
    }

    /// `CREATE pattern`, writing every property
    pub fn create(entity: impl Into<Entity>) -> Result<Self> {
        Self::single(Verb::Create, entity)
    }

    pub fn create_unique(entity: impl Into<Entity>) -> Result<Self> {
        Self::single(Verb::CreateUnique, entity)
    }

    /// `MATCH pattern`, filtering on bound properties
    pub fn matching(entity: impl Into<Entity>) -> Result<Self> {
        Self::single(Verb::Match, entity)
    }

    pub fn optional_match(entity: impl Into<Entity>) -> Result<Self> {
        Self::single(Verb::OptionalMatch, entity)
    }

    /// `MERGE pattern`, inlining bound properties
    pub fn merge(entity: impl Into<Entity>) -> Result<Self> {
        Self::single(Verb::Merge, entity)
    }

    fn edit(mut self, f: impl FnOnce(&mut Statement)) -> Self {
        self.compiled = OnceLock::new();
        if let Some(statement) = self.last_statement_mut() {
            f(statement);
        }
        self
    }

    fn last_statement_mut(&mut self) -> Option<&mut Statement> {
        self.parts.iter_mut().rev().find_map(|part| match part {
            Part::Statement(statement) => Some(statement),
            Part::Union { .. } => None,
        })
    }

    /// Statements in order, without separators
    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.parts.iter().filter_map(|part| match part {
            Part::Statement(statement) => Some(statement),
            Part::Union { .. } => None,
        })
    }

    /// Open a relationship leg of the given type
    pub fn rel(self, rel_type: impl Into<String>) -> Self {
        let rel_type = rel_type.into();
        self.edit(|s| s.open_leg(Some(rel_type)))
    }

    /// Close the open leg at `node`, or add an anonymous leg
    pub fn to(self, node: impl Into<Node>) -> Self {
        let node = node.into();
        self.edit(|s| s.close_leg(node))
    }

    /// Add a WHERE group joined with AND
    pub fn and_where(self, predicate: impl Into<Predicate>) -> Self {
        let predicate = predicate.into();
        self.edit(|s| s.push(Clause::Where(vec![predicate])))
    }

    /// Add a WHERE group joined with OR to the previous group
    pub fn or_where(self, predicate: impl Into<Predicate>) -> Self {
        let predicate = predicate.into();
        self.edit(|s| s.push(Clause::OrWhere(vec![predicate])))
    }

    /// Several predicates joined with AND on one line
    pub fn where_all<I, P>(self, predicates: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Predicate>,
    {
        let predicates = predicates.into_iter().map(Into::into).collect();
        self.edit(|s| s.push(Clause::Where(predicates)))
    }

    /// One SET line in the current scope
    pub fn set(self, assignment: Expression) -> Self {
        self.edit(|s| s.push_set(vec![assignment]))
    }

    /// Several assignments on one SET line
    pub fn set_all<I: IntoIterator<Item = Expression>>(self, assignments: I) -> Self {
        let items = assignments.into_iter().collect();
        self.edit(|s| s.push_set(items))
    }

    /// Direct later `set` calls to `ON CREATE` (MERGE only)
    pub fn on_create(self) -> Self {
        self.edit(|s| s.switch_scope(SetScope::OnCreate))
    }

    /// Direct later `set` calls to `ON MATCH` (MERGE only)
    pub fn on_match(self) -> Self {
        self.edit(|s| s.switch_scope(SetScope::OnMatch))
    }

    pub fn remove<I, P>(self, items: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Projection>,
    {
        let items = items.into_iter().map(Into::into).collect();
        self.edit(|s| s.push(Clause::Remove(items)))
    }

    pub fn delete<I, P>(self, items: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Projection>,
    {
        let items = items.into_iter().map(Into::into).collect();
        self.edit(|s| {
            s.push(Clause::Delete {
                items,
                detach: false,
            })
        })
    }

    pub fn detach_delete<I, P>(self, items: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Projection>,
    {
        let items = items.into_iter().map(Into::into).collect();
        self.edit(|s| s.push(Clause::Delete { items, detach: true }))
    }

    pub fn with<I, P>(self, items: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Projection>,
    {
        let items = items.into_iter().map(Into::into).collect();
        self.edit(|s| s.push(Clause::With(items)))
    }

    pub fn returning<I, P>(self, items: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Projection>,
    {
        let items = items.into_iter().map(Into::into).collect();
        self.edit(|s| s.push(Clause::Return(items)))
    }

    /// `RETURN *`
    pub fn return_all(self) -> Self {
        self.edit(|s| s.push(Clause::Return(Vec::new())))
    }

    pub fn order_by<I, P>(self, items: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Projection>,
    {
        let items = items.into_iter().map(Into::into).collect();
        self.edit(|s| {
            s.push(Clause::OrderBy {
                items,
                descending: false,
            })
        })
    }

    pub fn order_by_desc<I, P>(self, items: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Projection>,
    {
        let items = items.into_iter().map(Into::into).collect();
        self.edit(|s| {
            s.push(Clause::OrderBy {
                items,
                descending: true,
            })
        })
    }

    pub fn skip(self, n: u64) -> Self {
        self.edit(|s| s.push(Clause::Skip(n)))
    }

    pub fn limit(self, n: u64) -> Self {
        self.edit(|s| s.push(Clause::Limit(n)))
    }

    /// Remove the most recently appended clause of the last statement
    pub fn pop(&mut self) -> Option<Clause> {
        self.compiled = OnceLock::new();
        self.last_statement_mut().and_then(Statement::pop)
    }

    /// Run `other` after this query
    pub fn then(mut self, other: Query) -> Self {
        self.compiled = OnceLock::new();
        self.parts.extend(other.parts);
        self
    }

    pub fn union(self, other: Query) -> Self {
        self.join(other, false)
    }

    pub fn union_all(self, other: Query) -> Self {
        self.join(other, true)
    }

    fn join(mut self, other: Query, all: bool) -> Self {
        self.compiled = OnceLock::new();
        self.parts.push(Part::Union { all });
        self.parts.extend(other.parts);
        self
    }

    /// Compile on first use; the result is kept until the query changes
    pub fn compile(&self) -> Result<&CompiledQuery> {
        if let Some(compiled) = self.compiled.get() {
            return Ok(compiled);
        }
        let built = self.build()?;
        Ok(self.compiled.get_or_init(|| built))
    }

    /// Compiled statement text
    pub fn statement(&self) -> Result<&str> {
        Ok(self.compile()?.statement.as_str())
    }

    /// Compiled parameter table
    pub fn params(&self) -> Result<&Parameters> {
        Ok(&self.compile()?.params)
    }

    fn build(&self) -> Result<CompiledQuery> {
        let mut params = Parameters::new();
        let mut lines: Vec<String> = Vec::new();
        for part in &self.parts {
            match part {
                Part::Statement(statement) => lines.extend(statement.compile_into(&mut params)?),
                Part::Union { all: false } => lines.push("UNION".to_string()),
                Part::Union { all: true } => lines.push("UNION ALL".to_string()),
            }
        }
        if lines.is_empty() {
            return Err(Error::InvalidQuery("query has no statements".to_string()));
        }

        debug!(
            "Compiled query with {} statement(s) and {} parameter(s)",
            self.statements().count(),
            params.len()
        );
        Ok(CompiledQuery {
            statement: lines.join("\n"),
            params,
        })
    }
}

impl BitAnd for Query {
    type Output = Query;

    fn bitand(self, rhs: Query) -> Query {
        self.then(rhs)
    }
}
