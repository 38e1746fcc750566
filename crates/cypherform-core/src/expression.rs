//! Expression algebra over entity properties
//!
//! Expressions are built from a [`PropertyRef`] with named builder methods
//! (`eq`, `add`, `rsub`, ...). They compile lazily into text fragments and
//! parameter slots; names for the slots are only chosen when the fragments
//! are rendered against a statement's [`Parameters`].

use crate::coerce::PropertyType;
use crate::error::Result;
use crate::params::Parameters;
use crate::set_once::SetOnce;
use crate::types::Relationship;
use crate::value::PropertyValue;
use std::sync::OnceLock;

/// Binary operators and their Cypher symbols
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

impl Operator {
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Le => "<=",
            Operator::Ge => ">=",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Rem => "%",
            Operator::Pow => "^",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::Ne | Operator::Lt | Operator::Gt | Operator::Le | Operator::Ge
        )
    }
}

/// A property of a specific entity variable
#[derive(Debug, Clone)]
pub struct PropertyRef {
    var: String,
    name: String,
    kind: PropertyType,
}

impl PropertyRef {
    pub fn new(var: impl Into<String>, name: impl Into<String>, kind: PropertyType) -> Self {
        Self {
            var: var.into(),
            name: name.into(),
            kind,
        }
    }

    pub fn var(&self) -> &str {
        &self.var
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &PropertyType {
        &self.kind
    }

    /// `var.name`
    pub fn path(&self) -> String {
        format!("{}.{}", self.var, self.name)
    }

    /// `var_name`
    pub fn param_key(&self) -> String {
        format!("{}_{}", self.var, self.name)
    }

    fn operand(&self) -> Operand {
        Operand::Property(self.clone())
    }

    /// Compare against another property: `n.age > m.age`
    pub fn compare(&self, op: Operator, other: &PropertyRef) -> Expression {
        Expression::new(
            self.operand(),
            op,
            Term::Property(other.clone()),
            false,
        )
    }
}

/// Left-hand side of an expression
#[derive(Debug, Clone)]
pub enum Operand {
    Property(PropertyRef),
    Expression(Box<Expression>),
}

/// Right-hand side of an expression
#[derive(Debug, Clone)]
pub enum Term {
    Value(PropertyValue),
    Property(PropertyRef),
}

macro_rules! operator_builders {
    ($recv:ty) => {
        pub fn eq(self: $recv, value: impl Into<PropertyValue>) -> Expression {
            Expression::literal(self.operand(), Operator::Eq, value.into(), false)
        }

        pub fn ne(self: $recv, value: impl Into<PropertyValue>) -> Expression {
            Expression::literal(self.operand(), Operator::Ne, value.into(), false)
        }

        pub fn lt(self: $recv, value: impl Into<PropertyValue>) -> Expression {
            Expression::literal(self.operand(), Operator::Lt, value.into(), false)
        }

        pub fn gt(self: $recv, value: impl Into<PropertyValue>) -> Expression {
            Expression::literal(self.operand(), Operator::Gt, value.into(), false)
        }

        pub fn le(self: $recv, value: impl Into<PropertyValue>) -> Expression {
            Expression::literal(self.operand(), Operator::Le, value.into(), false)
        }

        pub fn ge(self: $recv, value: impl Into<PropertyValue>) -> Expression {
            Expression::literal(self.operand(), Operator::Ge, value.into(), false)
        }

        pub fn add(self: $recv, value: impl Into<PropertyValue>) -> Expression {
            Expression::literal(self.operand(), Operator::Add, value.into(), false)
        }

        pub fn sub(self: $recv, value: impl Into<PropertyValue>) -> Expression {
            Expression::literal(self.operand(), Operator::Sub, value.into(), false)
        }

        pub fn mul(self: $recv, value: impl Into<PropertyValue>) -> Expression {
            Expression::literal(self.operand(), Operator::Mul, value.into(), false)
        }

        pub fn div(self: $recv, value: impl Into<PropertyValue>) -> Expression {
            Expression::literal(self.operand(), Operator::Div, value.into(), false)
        }

        pub fn rem(self: $recv, value: impl Into<PropertyValue>) -> Expression {
            Expression::literal(self.operand(), Operator::Rem, value.into(), false)
        }

        pub fn pow(self: $recv, value: impl Into<PropertyValue>) -> Expression {
            Expression::literal(self.operand(), Operator::Pow, value.into(), false)
        }

        /// `value + self`
        pub fn radd(self: $recv, value: impl Into<PropertyValue>) -> Expression {
            Expression::literal(self.operand(), Operator::Add, value.into(), false)
        }

        /// `value - self`
        pub fn rsub(self: $recv, value: impl Into<PropertyValue>) -> Expression {
            Expression::literal(self.operand(), Operator::Sub, value.into(), true)
        }

        /// `value * self`
        pub fn rmul(self: $recv, value: impl Into<PropertyValue>) -> Expression {
            Expression::literal(self.operand(), Operator::Mul, value.into(), false)
        }

        /// `value / self`
        pub fn rdiv(self: $recv, value: impl Into<PropertyValue>) -> Expression {
            Expression::literal(self.operand(), Operator::Div, value.into(), true)
        }

        /// `value % self`
        pub fn rrem(self: $recv, value: impl Into<PropertyValue>) -> Expression {
            Expression::literal(self.operand(), Operator::Rem, value.into(), true)
        }

        /// `value ^ self`
        pub fn rpow(self: $recv, value: impl Into<PropertyValue>) -> Expression {
            Expression::literal(self.operand(), Operator::Pow, value.into(), true)
        }
    };
}

#[allow(clippy::should_implement_trait)]
impl PropertyRef {
    operator_builders!(&Self);
}

/// Piece of rendered expression text
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Text(String),
    /// Placeholder for the slot at this index
    Param(usize),
}

/// A literal waiting for a parameter name
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSlot {
    /// Requested name; `None` takes the next counter name
    pub key: Option<String>,
    pub value: PropertyValue,
}

/// Frozen structure of a compiled expression
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledExpression {
    fragments: Vec<Fragment>,
    slots: Vec<ParamSlot>,
    top: Option<usize>,
}

impl CompiledExpression {
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn slots(&self) -> &[ParamSlot] {
        &self.slots
    }

    fn text(&mut self, text: impl Into<String>) {
        self.fragments.push(Fragment::Text(text.into()));
    }

    fn slot(&mut self, key: Option<String>, value: PropertyValue) -> usize {
        let index = self.slots.len();
        self.slots.push(ParamSlot { key, value });
        self.fragments.push(Fragment::Param(index));
        index
    }

    fn append(&mut self, other: &CompiledExpression) {
        let offset = self.slots.len();
        self.slots.extend(other.slots.iter().cloned());
        self.fragments
            .extend(other.fragments.iter().map(|fragment| match fragment {
                Fragment::Param(i) => Fragment::Param(i + offset),
                Fragment::Text(t) => Fragment::Text(t.clone()),
            }));
    }

    /// Produce the final text, naming each slot in the order it appears
    pub fn render(&self, params: &mut Parameters) -> String {
        let mut names: Vec<Option<String>> = vec![None; self.slots.len()];
        let mut out = String::new();
        for fragment in &self.fragments {
            match fragment {
                Fragment::Text(text) => out.push_str(text),
                Fragment::Param(i) => {
                    let slot = &self.slots[*i];
                    let name = names[*i].get_or_insert_with(|| {
                        params.insert(slot.key.as_deref(), slot.value.clone())
                    });
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            }
        }
        out
    }
}

/// An operator applied to a left operand and a right term
#[derive(Debug, Clone)]
pub struct Expression {
    op: Operator,
    left: Operand,
    right: Term,
    reverse: bool,
    rename: SetOnce<String>,
    compiled: OnceLock<CompiledExpression>,
}

#[allow(clippy::should_implement_trait)]
impl Expression {
    pub fn new(left: Operand, op: Operator, right: Term, reverse: bool) -> Self {
        Self {
            op,
            left,
            right,
            reverse,
            rename: SetOnce::empty("param"),
            compiled: OnceLock::new(),
        }
    }

    fn literal(left: Operand, op: Operator, value: PropertyValue, reverse: bool) -> Self {
        Self::new(left, op, Term::Value(value), reverse)
    }

    fn operand(self) -> Operand {
        Operand::Expression(Box::new(self))
    }

    operator_builders!(Self);

    pub fn op(&self) -> Operator {
        self.op
    }

    pub fn left(&self) -> &Operand {
        &self.left
    }

    pub fn right(&self) -> &Term {
        &self.right
    }

    pub fn is_reversed(&self) -> bool {
        self.reverse
    }

    /// `prop = literal` in its plain form, as used by SET
    pub fn assignment(&self) -> Option<(&PropertyRef, &PropertyValue)> {
        match (&self.left, &self.right) {
            (Operand::Property(prop), Term::Value(value))
                if self.op == Operator::Eq && !self.reverse =>
            {
                Some((prop, value))
            }
            _ => None,
        }
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.get().is_some()
    }

    /// Compile on first use; later calls return the same structure
    pub fn compile(&self) -> Result<&CompiledExpression> {
        if let Some(compiled) = self.compiled.get() {
            return Ok(compiled);
        }
        let built = self.build()?;
        Ok(self.compiled.get_or_init(|| built))
    }

    /// Rename the top-level parameter; allowed once, before or after compiling
    pub fn rename_param(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.rename.set(name.clone(), "Expression")?;
        if let Some(compiled) = self.compiled.get_mut() {
            if let Some(top) = compiled.top {
                compiled.slots[top].key = Some(name);
            }
        }
        Ok(())
    }

    /// Render on its own with a fresh parameter table
    pub fn cypher(&self) -> Result<(String, Parameters)> {
        let mut params = Parameters::new();
        let text = self.compile()?.render(&mut params);
        Ok((text, params))
    }

    fn build(&self) -> Result<CompiledExpression> {
        let mut left = CompiledExpression::default();
        let kind = match &self.left {
            Operand::Property(prop) => {
                left.text(prop.path());
                Some(prop.kind())
            }
            Operand::Expression(inner) => {
                let nested = inner.compile()?;
                // Arithmetic inside arithmetic keeps its grouping
                let group = !self.op.is_comparison() && !inner.op.is_comparison();
                if group {
                    left.text("(");
                }
                left.append(nested);
                if group {
                    left.text(")");
                }
                None
            }
        };

        let mut right = CompiledExpression::default();
        match &self.right {
            Term::Property(prop) => right.text(prop.path()),
            Term::Value(value) => {
                let value = match kind {
                    Some(kind) => kind.coerce(value.clone())?,
                    None => value.clone(),
                };
                let key = self.rename.get().cloned().or_else(|| match &self.left {
                    Operand::Property(prop) if self.op.is_comparison() => Some(prop.param_key()),
                    _ => None,
                });
                right.top = Some(right.slot(key, value));
            }
        }

        let (first, second) = if self.reverse {
            (right, left)
        } else {
            (left, right)
        };
        let mut out = CompiledExpression::default();
        let offset = first.slots.len();
        out.append(&first);
        out.text(format!(" {} ", self.op.symbol()));
        out.append(&second);
        out.top = first.top.or(second.top.map(|i| i + offset));
        Ok(out)
    }
}

/// A WHERE predicate
#[derive(Debug, Clone)]
pub enum Predicate {
    Expression(Expression),
    Exists { pattern: String, negated: bool },
}

impl Predicate {
    /// `EXISTS((a)-[r:T]->(b))`
    pub fn exists(rel: &Relationship) -> Result<Self> {
        Ok(Predicate::Exists {
            pattern: rel.pattern()?,
            negated: false,
        })
    }

    /// `NOT EXISTS((a)-[r:T]->(b))`
    pub fn not_exists(rel: &Relationship) -> Result<Self> {
        Ok(Predicate::Exists {
            pattern: rel.pattern()?,
            negated: true,
        })
    }

    pub fn render(&self, params: &mut Parameters) -> Result<String> {
        match self {
            Predicate::Expression(expr) => Ok(expr.compile()?.render(params)),
            Predicate::Exists { pattern, negated } => Ok(format!(
                "{}EXISTS({})",
                if *negated { "NOT " } else { "" },
                pattern
            )),
        }
    }
}

impl From<Expression> for Predicate {
    fn from(expr: Expression) -> Self {
        Predicate::Expression(expr)
    }
}
