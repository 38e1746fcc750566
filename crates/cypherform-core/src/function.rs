//! Cypher function projections
//!
//! A [`FunctionCall`] wraps a property, a node variable or another call in
//! an aggregate or list function. It renders as `FUNC(x) AS x_func` so the
//! result column has a predictable name.

use crate::expression::PropertyRef;
use crate::types::{GraphObject, Node};
use std::fmt;

/// Functions usable in RETURN and WITH
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Func {
    All,
    Any,
    Avg,
    Collect,
    Count,
    Distinct,
    Max,
    Min,
    None,
    Single,
    Sum,
    Unwind,
}

impl Func {
    pub const VARIANTS: [Func; 12] = [
        Func::All,
        Func::Any,
        Func::Avg,
        Func::Collect,
        Func::Count,
        Func::Distinct,
        Func::Max,
        Func::Min,
        Func::None,
        Func::Single,
        Func::Sum,
        Func::Unwind,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Func::All => "ALL",
            Func::Any => "ANY",
            Func::Avg => "AVG",
            Func::Collect => "COLLECT",
            Func::Count => "COUNT",
            Func::Distinct => "DISTINCT",
            Func::Max => "MAX",
            Func::Min => "MIN",
            Func::None => "NONE",
            Func::Single => "SINGLE",
            Func::Sum => "SUM",
            Func::Unwind => "UNWIND",
        }
    }

    /// Suffix appended to the alias stem
    pub fn suffix(self) -> String {
        self.keyword().to_lowercase()
    }

    /// `FUNC(arg)`; a nested call keeps the innermost alias stem
    pub fn call(self, arg: impl Into<FunctionArg>) -> FunctionCall {
        let arg = arg.into();
        FunctionCall {
            func: self,
            text: format!("{}({})", self.keyword(), arg.text),
            stem: Some(arg.stem),
        }
    }

    /// `FUNC(*)`, aliased by the function name alone
    pub fn star(self) -> FunctionCall {
        FunctionCall {
            func: self,
            text: format!("{}(*)", self.keyword()),
            stem: None,
        }
    }
}

/// Argument text and the stem its alias is built from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionArg {
    text: String,
    stem: String,
}

impl From<&PropertyRef> for FunctionArg {
    fn from(prop: &PropertyRef) -> Self {
        FunctionArg {
            text: prop.path(),
            stem: prop.param_key(),
        }
    }
}

impl From<PropertyRef> for FunctionArg {
    fn from(prop: PropertyRef) -> Self {
        FunctionArg::from(&prop)
    }
}

impl From<&Node> for FunctionArg {
    fn from(node: &Node) -> Self {
        FunctionArg {
            text: node.var().to_string(),
            stem: node.var().to_string(),
        }
    }
}

// Dots become underscores in the alias stem
impl From<&str> for FunctionArg {
    fn from(s: &str) -> Self {
        FunctionArg {
            text: s.to_string(),
            stem: s.replace('.', "_"),
        }
    }
}

impl From<String> for FunctionArg {
    fn from(s: String) -> Self {
        FunctionArg::from(s.as_str())
    }
}

impl From<FunctionCall> for FunctionArg {
    fn from(call: FunctionCall) -> Self {
        let stem = call.stem.unwrap_or_else(|| call.func.suffix());
        FunctionArg {
            text: call.text,
            stem,
        }
    }
}

/// A function applied to an argument, ready to project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionCall {
    func: Func,
    text: String,
    stem: Option<String>,
}

impl FunctionCall {
    pub fn func(&self) -> Func {
        self.func
    }

    /// Call text without the alias
    pub fn expression(&self) -> &str {
        &self.text
    }

    pub fn alias(&self) -> String {
        match &self.stem {
            Some(stem) => format!("{}_{}", stem, self.func.suffix()),
            None => self.func.suffix(),
        }
    }
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} AS {}", self.text, self.alias())
    }
}
