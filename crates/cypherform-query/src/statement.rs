//! Single-verb statement compiler
//!
//! A [`Statement`] wraps one entity in a verb, chains relationship legs
//! off it and collects clauses. Compiling renders the lines of the
//! statement into a shared parameter table.

use cypherform_core::{
    DEFAULT_NODE_VAR, Entity, Error, Expression, FunctionCall, GraphObject, Node, Parameters,
    Predicate, PropertyRef, PropertyValue, Relationship, Result,
};
use std::collections::{HashMap, HashSet};

/// Statement verbs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Create,
    CreateUnique,
    Match,
    OptionalMatch,
    Merge,
}

impl Verb {
    pub fn keyword(self) -> &'static str {
        match self {
            Verb::Create => "CREATE",
            Verb::CreateUnique => "CREATE UNIQUE",
            Verb::Match => "MATCH",
            Verb::OptionalMatch => "OPTIONAL MATCH",
            Verb::Merge => "MERGE",
        }
    }

    fn writes_all(self) -> bool {
        matches!(self, Verb::Create | Verb::CreateUnique)
    }

    fn matches_bound(self) -> bool {
        matches!(self, Verb::Match | Verb::OptionalMatch)
    }
}

/// Target of `set()` calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetScope {
    #[default]
    Main,
    OnCreate,
    OnMatch,
}

/// An item of a RETURN, WITH, ORDER BY, REMOVE or DELETE list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection(String);

impl Projection {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `EXISTS(pattern) AS <rel>_exists`
    pub fn exists(rel: &Relationship) -> Result<Self> {
        Ok(Projection(format!(
            "EXISTS({}) AS {}_exists",
            rel.pattern()?,
            rel.var()
        )))
    }

    /// `NOT EXISTS(pattern) AS <rel>_exists`
    pub fn not_exists(rel: &Relationship) -> Result<Self> {
        Ok(Projection(format!(
            "NOT EXISTS({}) AS {}_exists",
            rel.pattern()?,
            rel.var()
        )))
    }
}

impl From<&str> for Projection {
    fn from(s: &str) -> Self {
        Projection(s.to_string())
    }
}

impl From<String> for Projection {
    fn from(s: String) -> Self {
        Projection(s)
    }
}

impl From<&PropertyRef> for Projection {
    fn from(prop: &PropertyRef) -> Self {
        Projection(prop.path())
    }
}

impl From<PropertyRef> for Projection {
    fn from(prop: PropertyRef) -> Self {
        Projection(prop.path())
    }
}

impl From<FunctionCall> for Projection {
    fn from(call: FunctionCall) -> Self {
        Projection(call.to_string())
    }
}

impl From<&FunctionCall> for Projection {
    fn from(call: &FunctionCall) -> Self {
        Projection(call.to_string())
    }
}

impl From<&Node> for Projection {
    fn from(node: &Node) -> Self {
        Projection(node.var().to_string())
    }
}

/// One appended clause, in insertion order
#[derive(Debug, Clone)]
pub enum Clause {
    /// A WHERE group joined with AND to what precedes it
    Where(Vec<Predicate>),
    /// A WHERE group joined with OR to the previous group only
    OrWhere(Vec<Predicate>),
    Set {
        scope: SetScope,
        items: Vec<Expression>,
    },
    Remove(Vec<Projection>),
    Delete {
        items: Vec<Projection>,
        detach: bool,
    },
    With(Vec<Projection>),
    Return(Vec<Projection>),
    OrderBy {
        items: Vec<Projection>,
        descending: bool,
    },
    Skip(u64),
    Limit(u64),
}

/// A relationship hop off the primary pattern
#[derive(Debug, Clone)]
pub(crate) struct Leg {
    pub(crate) rel_type: Option<String>,
    pub(crate) end: Option<Node>,
}

/// One verb applied to one entity
#[derive(Debug, Clone)]
pub struct Statement {
    verb: Verb,
    entity: Entity,
    legs: Vec<Leg>,
    clauses: Vec<Clause>,
    scope: SetScope,
    misuse: Option<String>,
}

impl Statement {
    /// Wrap an entity; its pattern is checked immediately
    pub fn new(verb: Verb, entity: Entity) -> Result<Self> {
        entity.validate()?;
        Ok(Self {
            verb,
            entity,
            legs: Vec::new(),
            clauses: Vec::new(),
            scope: SetScope::Main,
            misuse: None,
        })
    }

    pub fn verb(&self) -> Verb {
        self.verb
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub(crate) fn push(&mut self, clause: Clause) {
        self.clauses.push(clause);
    }

    pub(crate) fn pop(&mut self) -> Option<Clause> {
        self.clauses.pop()
    }

    pub(crate) fn push_set(&mut self, items: Vec<Expression>) {
        let scope = self.scope;
        self.clauses.push(Clause::Set { scope, items });
    }

    pub(crate) fn switch_scope(&mut self, scope: SetScope) {
        if self.verb != Verb::Merge && self.misuse.is_none() {
            let name = match scope {
                SetScope::OnCreate => "ON CREATE",
                SetScope::OnMatch => "ON MATCH",
                SetScope::Main => "SET",
            };
            self.misuse = Some(format!(
                "{} is only valid on MERGE, not {}",
                name,
                self.verb.keyword()
            ));
        }
        self.scope = scope;
    }

    pub(crate) fn open_leg(&mut self, rel_type: Option<String>) {
        self.legs.push(Leg { rel_type, end: None });
    }

    /// Close the open leg, or add an anonymous one
    pub(crate) fn close_leg(&mut self, node: Node) {
        match self.legs.last_mut() {
            Some(leg) if leg.end.is_none() => leg.end = Some(node),
            _ => self.legs.push(Leg {
                rel_type: None,
                end: Some(node),
            }),
        }
    }

    /// Render this statement's lines, allocating names in `params`
    pub fn compile_into(&self, params: &mut Parameters) -> Result<Vec<String>> {
        if let Some(reason) = &self.misuse {
            return Err(Error::InvalidQuery(reason.clone()));
        }

        let primary = self.entity.as_object();
        let mut used: HashSet<String> = HashSet::new();
        used.insert(primary.var().to_string());
        if let Entity::Relationship(rel) = &self.entity {
            for node in [rel.start_node(), rel.end_node()].into_iter().flatten() {
                used.insert(node.var().to_string());
            }
        }

        let inline = self.verb == Verb::Merge;
        let mut head = format!(
            "{} {}",
            self.verb.keyword(),
            self.entity.render_pattern(inline, params)?
        );

        let mut ends: Vec<Node> = Vec::with_capacity(self.legs.len());
        for (i, leg) in self.legs.iter().enumerate() {
            let index = i + 1;
            let node = leg.end.as_ref().ok_or_else(|| {
                Error::IncompleteRelationship(format!(
                    "leg {} ({}) has no end node",
                    index,
                    leg.rel_type.as_deref().unwrap_or("anonymous")
                ))
            })?;

            // A leg end keeps its own variable unless it is the default or
            // already taken; otherwise its variable gets the leg index appended
            // (`node2`, `n1`, `m2`).
            let mut end = node.clone();
            let var = if end.var() != DEFAULT_NODE_VAR && !used.contains(end.var()) {
                end.var().to_string()
            } else {
                format!("{}{}", end.var(), index)
            };
            end.set_var(var.clone());
            used.insert(var);

            match &leg.rel_type {
                Some(rel_type) => head.push_str(&format!("-[r{}:`{}`]->", index, rel_type)),
                None => head.push_str(&format!("-[r{}]->", index)),
            }
            if inline {
                head.push_str(&end.inline_pattern(params));
            } else {
                head.push_str(&end.pattern());
            }
            ends.push(end);
        }

        let mut objects: Vec<&dyn GraphObject> = vec![primary];
        objects.extend(ends.iter().map(|n| n as &dyn GraphObject));

        let mut lines = vec![head];
        self.render_where(&objects, params, &mut lines)?;
        self.render_sets(&objects, params, &mut lines)?;
        self.render_tail(&mut lines);
        Ok(lines)
    }

    fn render_where(
        &self,
        objects: &[&dyn GraphObject],
        params: &mut Parameters,
        lines: &mut Vec<String>,
    ) -> Result<()> {
        let mut groups: Vec<(bool, String)> = Vec::new();

        if self.verb.matches_bound() {
            let mut implicit = Vec::new();
            for object in objects {
                for key in object.bound_keys() {
                    let expr = object.prop(key)?.eq(object.get(key)?.clone());
                    implicit.push(expr.compile()?.render(params));
                }
            }
            if !implicit.is_empty() {
                groups.push((false, implicit.join(" AND ")));
            }
        }

        for clause in &self.clauses {
            let (or, predicates) = match clause {
                Clause::Where(p) => (false, p),
                Clause::OrWhere(p) => (true, p),
                _ => continue,
            };
            if predicates.is_empty() {
                continue;
            }
            let rendered = predicates
                .iter()
                .map(|p| p.render(params))
                .collect::<Result<Vec<_>>>()?;
            groups.push((or, rendered.join(" AND ")));
        }

        for (i, (or, text)) in groups.into_iter().enumerate() {
            let keyword = match (i, or) {
                (0, _) => "    WHERE",
                (_, false) => "      AND",
                (_, true) => "       OR",
            };
            lines.push(format!("{} {}", keyword, text));
        }
        Ok(())
    }

    fn render_sets(
        &self,
        objects: &[&dyn GraphObject],
        params: &mut Parameters,
        lines: &mut Vec<String>,
    ) -> Result<()> {
        // explicit plain assignments that replace part of CREATE's full write
        let mut overrides: HashMap<(String, String), PropertyValue> = HashMap::new();
        let mut consumed: HashSet<(usize, usize)> = HashSet::new();

        if self.verb.writes_all() {
            for (ci, clause) in self.clauses.iter().enumerate() {
                let Clause::Set {
                    scope: SetScope::Main,
                    items,
                } = clause
                else {
                    continue;
                };
                for (ii, expr) in items.iter().enumerate() {
                    let Some((prop, value)) = expr.assignment() else {
                        continue;
                    };
                    let covered = objects
                        .iter()
                        .any(|o| o.var() == prop.var() && o.has_property(prop.name()));
                    if covered {
                        overrides.insert(
                            (prop.var().to_string(), prop.name().to_string()),
                            value.clone(),
                        );
                        consumed.insert((ci, ii));
                    }
                }
            }

            for object in objects {
                let mut assignments = Vec::new();
                for property in object.properties() {
                    let Some(name) = property.name() else {
                        continue;
                    };
                    let value = overrides
                        .get(&(object.var().to_string(), name.to_string()))
                        .cloned()
                        .unwrap_or_else(|| property.value().clone());
                    let expr = object.prop(name)?.eq(value);
                    assignments.push(expr.compile()?.render(params));
                }
                if !assignments.is_empty() {
                    lines.push(format!("    SET {}", assignments.join(", ")));
                }
            }
        }

        for scope in [SetScope::Main, SetScope::OnCreate, SetScope::OnMatch] {
            let mut scoped = Vec::new();
            for (ci, clause) in self.clauses.iter().enumerate() {
                let Clause::Set { scope: s, items } = clause else {
                    continue;
                };
                if *s != scope {
                    continue;
                }
                let mut rendered = Vec::new();
                for (ii, expr) in items.iter().enumerate() {
                    if consumed.contains(&(ci, ii)) {
                        continue;
                    }
                    rendered.push(expr.compile()?.render(params));
                }
                if !rendered.is_empty() {
                    scoped.push(format!("    SET {}", rendered.join(", ")));
                }
            }
            if scoped.is_empty() {
                continue;
            }
            match scope {
                SetScope::Main => {}
                SetScope::OnCreate => lines.push("ON CREATE".to_string()),
                SetScope::OnMatch => lines.push("ON MATCH".to_string()),
            }
            lines.extend(scoped);
        }
        Ok(())
    }

    fn render_tail(&self, lines: &mut Vec<String>) {
        let mut remove = Vec::new();
        let mut delete = Vec::new();
        let mut detach = false;
        let mut with = Vec::new();
        let mut returning: Option<Vec<&str>> = None;
        let mut order = Vec::new();
        let mut skip = None;
        let mut limit = None;

        for clause in &self.clauses {
            match clause {
                Clause::Remove(items) => remove.extend(items.iter().map(Projection::as_str)),
                Clause::Delete { items, detach: d } => {
                    delete.extend(items.iter().map(Projection::as_str));
                    detach |= *d;
                }
                Clause::With(items) => with.extend(items.iter().map(Projection::as_str)),
                Clause::Return(items) => returning
                    .get_or_insert_with(Vec::new)
                    .extend(items.iter().map(Projection::as_str)),
                Clause::OrderBy { items, descending } => {
                    order.extend(items.iter().map(|item| {
                        if *descending {
                            format!("{} DESC", item.as_str())
                        } else {
                            item.as_str().to_string()
                        }
                    }));
                }
                Clause::Skip(n) => skip = Some(*n),
                Clause::Limit(n) => limit = Some(*n),
                Clause::Where(_) | Clause::OrWhere(_) | Clause::Set { .. } => {}
            }
        }

        if !remove.is_empty() {
            lines.push(format!("    REMOVE {}", remove.join(", ")));
        }
        if !delete.is_empty() {
            let keyword = if detach { "DETACH DELETE" } else { "DELETE" };
            lines.push(format!("    {} {}", keyword, delete.join(", ")));
        }
        if !with.is_empty() {
            lines.push(format!("WITH {}", with.join(", ")));
        }
        if let Some(items) = returning {
            if items.is_empty() {
                lines.push("RETURN *".to_string());
            } else {
                lines.push(format!("RETURN {}", items.join(", ")));
            }
        }
        if !order.is_empty() {
            lines.push(format!("ORDER BY {}", order.join(", ")));
        }
        if let Some(n) = skip {
            lines.push(format!("SKIP {}", n));
        }
        if let Some(n) = limit {
            lines.push(format!("LIMIT {}", n));
        }
    }
}
