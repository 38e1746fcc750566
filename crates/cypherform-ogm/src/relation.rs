//! Relations between mapped objects

use crate::model::Model;
use crate::object::Object;
use cypherform_core::{Error, GraphObject, Node, Relationship, Result};
use cypherform_protocol::Record;
use cypherform_query::Query;
use std::sync::Arc;
use tracing::debug;

const ORIGIN: &str = "origin";
const TARGET: &str = "target";
const UNBOUNDED_HINT: &str = "Bind the object or declare the relation unbound.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    OneToMany,
    /// Reverse side of a one-to-many relation
    ManyToOne,
    ManyToMany,
}

impl Cardinality {
    fn reversed(self) -> Self {
        match self {
            Cardinality::OneToMany => Cardinality::ManyToOne,
            Cardinality::ManyToOne => Cardinality::OneToMany,
            Cardinality::ManyToMany => Cardinality::ManyToMany,
        }
    }
}

/// Which way the stored relationship points, seen from the owning object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Outgoing,
    Incoming,
}

/// Reverse relation to register on the related model
#[derive(Debug, Clone)]
struct Backref {
    name: String,
    target: Arc<Model>,
}

/// A typed relation from one model to others
#[derive(Debug, Clone)]
pub struct Relation {
    rel_type: String,
    cardinality: Cardinality,
    direction: Direction,
    restricted_types: Vec<String>,
    unbound_start: bool,
    unbound_end: bool,
    backref: Option<Backref>,
}

impl Relation {
    /// The start object is always matched by its keys
    pub fn one_to_many(rel_type: impl Into<String>) -> Self {
        Self::new(rel_type, Cardinality::OneToMany)
    }

    pub fn many_to_many(rel_type: impl Into<String>) -> Self {
        Self::new(rel_type, Cardinality::ManyToMany)
    }

    fn new(rel_type: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            rel_type: rel_type.into(),
            cardinality,
            direction: Direction::Outgoing,
            restricted_types: Vec::new(),
            unbound_start: false,
            unbound_end: false,
            backref: None,
        }
    }

    /// Related objects must carry at least one of `labels`
    pub fn restrict_types<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.restricted_types = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Allow both ends to match without keys
    pub fn unbound(self) -> Self {
        self.unbound_start().unbound_end()
    }

    /// Ignored on the single side of a one-to-many relation
    pub fn unbound_start(mut self) -> Self {
        self.unbound_start = self.cardinality != Cardinality::OneToMany;
        self
    }

    /// Ignored on the single side of a many-to-one relation
    pub fn unbound_end(mut self) -> Self {
        self.unbound_end = self.cardinality != Cardinality::ManyToOne;
        self
    }

    /// Register the reverse relation on `target` under `name` when the
    /// owning model is built
    pub fn backref(mut self, target: &Arc<Model>, name: impl Into<String>) -> Self {
        self.backref = Some(Backref {
            name: name.into(),
            target: Arc::clone(target),
        });
        self
    }

    pub fn rel_type(&self) -> &str {
        &self.rel_type
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn restricted_types(&self) -> &[String] {
        &self.restricted_types
    }

    pub fn backref_name(&self) -> Option<&str> {
        self.backref.as_ref().map(|b| b.name.as_str())
    }

    pub(crate) fn without_backref(&self) -> Self {
        Self {
            backref: None,
            ..self.clone()
        }
    }

    /// Target model and reverse relation to register, if any
    pub(crate) fn reverse_for(
        &self,
        owner_labels: &[String],
    ) -> Option<(Arc<Model>, String, Relation)> {
        let backref = self.backref.as_ref()?;
        let reverse = Relation {
            rel_type: self.rel_type.clone(),
            cardinality: self.cardinality.reversed(),
            direction: match self.direction {
                Direction::Outgoing => Direction::Incoming,
                Direction::Incoming => Direction::Outgoing,
            },
            restricted_types: owner_labels.to_vec(),
            unbound_start: self.unbound_end,
            unbound_end: self.unbound_start,
            backref: None,
        };
        Some((Arc::clone(&backref.target), backref.name.clone(), reverse))
    }

    fn check<'a, I>(&self, labels: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        if self.restricted_types.is_empty() {
            return Ok(());
        }
        let labels: Vec<&str> = labels.into_iter().collect();
        if labels
            .iter()
            .any(|label| self.restricted_types.iter().any(|r| r == label))
        {
            return Ok(());
        }
        Err(Error::InvalidRelation(format!(
            "related object is {:?} but must be one of: {}",
            labels,
            self.restricted_types.join(", ")
        )))
    }

    fn endpoints(&self, from: &Object, to: &Object, action: &str) -> Result<(Node, Node)> {
        self.check(to.node().labels().iter().map(|l| l.name()))?;
        let origin = from.bound_node(Some(ORIGIN), action, self.unbound_start, UNBOUNDED_HINT)?;
        let target = to.bound_node(Some(TARGET), action, self.unbound_end, UNBOUNDED_HINT)?;
        Ok((origin, target))
    }

    /// Relationship between the two endpoints, pointing the stored way
    fn link(&self, origin: Node, target: Node) -> Result<Relationship> {
        let (start, end) = match self.direction {
            Direction::Outgoing => (origin, target),
            Direction::Incoming => (target, origin),
        };
        Relationship::builder(Some(self.rel_type.clone()))
            .start(Arc::new(start))
            .end(Arc::new(end))
            .build()
    }

    /// `MERGE` a relationship between `from` and `to`
    pub fn relate(&self, from: &Object, to: &Object) -> Result<Vec<Record>> {
        let graph = from.model().graph_for("relate")?;
        let (origin, target) = self.endpoints(from, to, "relate")?;

        let query = Query::matching(&origin)?
            .then(Query::matching(&target)?)
            .then(Query::merge(self.link(origin, target)?)?);
        let records = graph.run_query(&query)?;
        debug!("Related {} -[{}]- {}", from.model().name(), self.rel_type, to.model().name());
        Ok(records)
    }

    /// Delete the relationship between `from` and `to`
    pub fn unrelate(&self, from: &Object, to: &Object) -> Result<Vec<Record>> {
        let graph = from.model().graph_for("unrelate")?;
        let (origin, target) = self.endpoints(from, to, "unrelate")?;

        let rel = self.link(origin.clone(), target.clone())?;
        let rel_var = rel.var().to_string();
        let query = Query::matching(&origin)?
            .then(Query::matching(&target)?)
            .then(Query::matching(rel)?.delete([rel_var]));
        let records = graph.run_query(&query)?;
        debug!("Unrelated {} -[{}]- {}", from.model().name(), self.rel_type, to.model().name());
        Ok(records)
    }

    /// `MATCH` instances of `target` reached from `from`
    pub fn related(&self, from: &Object, target: &Model) -> Result<Vec<Record>> {
        let graph = from.model().graph_for("match")?;
        self.check(target.labels().iter().map(String::as_str))?;
        let origin = from.bound_node(Some(ORIGIN), "match", self.unbound_start, UNBOUNDED_HINT)?;

        let mut end = target.template()?;
        end.set_var(TARGET);
        let query = match self.direction {
            Direction::Outgoing => Query::matching(&origin)?
                .rel(self.rel_type.clone())
                .to(end)
                .returning([TARGET]),
            // legs only point outward, so incoming traversals match both ends first
            Direction::Incoming => Query::matching(&origin)?
                .then(Query::matching(&end)?)
                .then(Query::matching(self.link(origin, end)?)?.returning([TARGET])),
        };
        graph.run_query(&query)
    }
}
