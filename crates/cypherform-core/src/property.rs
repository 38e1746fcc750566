//! Typed property slots
//!
//! A [`Property`] is created unbound and becomes bound when an entity gives
//! it a name. Its type and flags are fixed at construction; its name and
//! default may each be assigned once.

use crate::coerce::PropertyType;
use crate::error::Result;
use crate::set_once::SetOnce;
use crate::value::PropertyValue;
use std::fmt;
use std::sync::Arc;

const OWNER: &str = "Property";

/// Value substituted when a property is set to null
#[derive(Clone, Default)]
pub enum DefaultValue {
    #[default]
    None,
    Value(PropertyValue),
    Factory(Arc<dyn Fn() -> PropertyValue + Send + Sync>),
}

impl DefaultValue {
    /// Wrap a zero-argument factory invoked on every substitution
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn() -> PropertyValue + Send + Sync + 'static,
    {
        DefaultValue::Factory(Arc::new(f))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, DefaultValue::None)
    }

    /// Produce the default, invoking the factory if there is one
    pub fn resolve(&self) -> PropertyValue {
        match self {
            DefaultValue::None => PropertyValue::Null,
            DefaultValue::Value(v) => v.clone(),
            DefaultValue::Factory(f) => f(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::None => write!(f, "None"),
            DefaultValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            DefaultValue::Factory(_) => write!(f, "Factory(..)"),
        }
    }
}

/// A named, typed value slot
#[derive(Debug, Clone)]
pub struct Property {
    name: SetOnce<String>,
    kind: PropertyType,
    default: SetOnce<DefaultValue>,
    value: PropertyValue,
    unique: bool,
    indexed: bool,
    required: bool,
    primary_key: bool,
    read_only: bool,
}

impl Property {
    /// An unbound string property with no default and no flags
    pub fn new() -> Self {
        Self::of(PropertyType::string())
    }

    /// An unbound property of the given type
    pub fn of(kind: PropertyType) -> Self {
        Self {
            name: SetOnce::empty("name"),
            kind,
            default: SetOnce::empty("default"),
            value: PropertyValue::Null,
            unique: false,
            indexed: false,
            required: false,
            primary_key: false,
            read_only: false,
        }
    }

    pub fn builder() -> PropertyBuilder {
        <PropertyBuilder as Default>::default()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.get().map(String::as_str)
    }

    /// Assign the name; a property can be named only once
    pub fn set_name(&mut self, name: impl Into<String>) -> Result<()> {
        self.name.set(name.into(), OWNER)
    }

    /// True once the property has been attached to an entity
    pub fn is_bound(&self) -> bool {
        self.name.is_set()
    }

    pub fn kind(&self) -> &PropertyType {
        &self.kind
    }

    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default.get()
    }

    pub fn set_default(&mut self, default: DefaultValue) -> Result<()> {
        self.default.set(default, OWNER)
    }

    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    /// Store a value: null resolves to the default, anything else is coerced
    pub fn set_value(&mut self, value: impl Into<PropertyValue>) -> Result<()> {
        let mut value = value.into();
        if value.is_null() {
            value = self
                .default
                .get()
                .map(DefaultValue::resolve)
                .unwrap_or_default();
        }
        self.value = self.kind.coerce(value)?;
        Ok(())
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

impl Default for Property {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for [`Property`]
#[derive(Debug, Clone, Default)]
pub struct PropertyBuilder {
    name: Option<String>,
    kind: Option<PropertyType>,
    default: DefaultValue,
    value: PropertyValue,
    unique: bool,
    indexed: bool,
    required: bool,
    primary_key: bool,
    read_only: bool,
}

impl PropertyBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn kind(mut self, kind: PropertyType) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn default(mut self, value: impl Into<PropertyValue>) -> Self {
        self.default = DefaultValue::Value(value.into());
        self
    }

    pub fn default_with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> PropertyValue + Send + Sync + 'static,
    {
        self.default = DefaultValue::factory(factory);
        self
    }

    pub fn value(mut self, value: impl Into<PropertyValue>) -> Self {
        self.value = value.into();
        self
    }

    /// Unique properties are always indexed
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self.indexed = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// Build the property, resolving the default and coercing the initial value
    pub fn build(self) -> Result<Property> {
        let mut property = Property::of(self.kind.unwrap_or_default());
        property.unique = self.unique;
        property.indexed = self.indexed || self.unique;
        property.required = self.required;
        property.primary_key = self.primary_key;
        property.read_only = self.read_only;

        if let Some(name) = self.name {
            property.set_name(name)?;
        }
        if !self.default.is_none() {
            property.set_default(self.default)?;
        }
        property.set_value(self.value)?;
        Ok(property)
    }
}
