//! cypherform core library
//!
//! Values, typed properties, the node/relationship entity model and the
//! expression algebra that the query compiler renders into Cypher.
//!
//! # Modules
//!
//! - `error` - Error types and result aliases
//! - `value` - Property values carried as statement parameters
//! - `property` - Named, typed property slots
//! - `coerce` / `validators` - Property type coercions
//! - `types` - Labels, nodes, relationships and binding
//! - `expression` - Expression algebra and predicates
//! - `function` - Function projections for RETURN and WITH
//! - `params` - Statement parameter table

pub mod coerce;
pub mod error;
pub mod expression;
pub mod function;
pub mod params;
pub mod property;
pub mod set_once;
pub mod types;
pub mod validators;
pub mod value;

pub use coerce::PropertyType;
pub use error::{Error, Result};
pub use expression::{
    CompiledExpression, Expression, Fragment, Operand, Operator, ParamSlot, Predicate,
    PropertyRef, Term,
};
pub use function::{Func, FunctionArg, FunctionCall};
pub use params::Parameters;
pub use property::{DefaultValue, Property, PropertyBuilder};
pub use set_once::SetOnce;
pub use types::{
    Binding, DEFAULT_NODE_VAR, DEFAULT_REL_VAR, Depth, Entity, GraphObject, Label, Node,
    NodeBuilder, Relationship, RelationshipBuilder,
};
pub use value::PropertyValue;
