//! Bean definitions: one record per `<bean>` declaration.

use crate::value::{ArrayValue, Value};

/// Reserved `impl` keyword for scalar beans.
pub const STRING_IMPLEMENTATION: &str = "string";
/// Reserved `impl` keyword for computed beans.
pub const EVALUATE_IMPLEMENTATION: &str = "evaluate";
/// Reserved `impl` keyword for array beans.
pub const ARRAY_IMPLEMENTATION: &str = "array";
/// The only legal non-empty `type` value.
pub const SINGLETON_SCOPE: &str = "singleton";

/// How a bean is turned into an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImplementationKind {
    String,
    Evaluate,
    Array,
    /// Any non-reserved `impl` text; resolved through the type registry.
    ClassName,
}

impl ImplementationKind {
    /// Classifies `impl` text. Reserved keywords match case-insensitively.
    pub fn classify(implementation: &str) -> Self {
        if implementation.eq_ignore_ascii_case(STRING_IMPLEMENTATION) {
            ImplementationKind::String
        } else if implementation.eq_ignore_ascii_case(EVALUATE_IMPLEMENTATION) {
            ImplementationKind::Evaluate
        } else if implementation.eq_ignore_ascii_case(ARRAY_IMPLEMENTATION) {
            ImplementationKind::Array
        } else {
            ImplementationKind::ClassName
        }
    }
}

/// Lifetime of a bean's instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Scope {
    /// One instance per (context, bean name).
    Singleton,
    /// A new instance per request.
    #[default]
    Unspecified,
}

impl Scope {
    /// Parses a `type` attribute. Returns `None` for unhandled values.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "" => Some(Scope::Unspecified),
            SINGLETON_SCOPE => Some(Scope::Singleton),
            _ => None,
        }
    }
}

/// A configured bean.
///
/// Built once by the context loader; the implementation kind is fixed at
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub struct BeanDefinition {
    name: String,
    implementation: String,
    kind: ImplementationKind,
    scope: Scope,
    value: Value,
    values: ArrayValue,
    properties: Vec<(String, Value)>,
}

impl BeanDefinition {
    pub fn new(name: impl Into<String>, implementation: impl Into<String>) -> Self {
        let implementation = implementation.into();
        Self {
            name: name.into(),
            kind: ImplementationKind::classify(&implementation),
            implementation,
            scope: Scope::Unspecified,
            value: Value::Null,
            values: ArrayValue::new(),
            properties: Vec::new(),
        }
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = value;
        self
    }

    pub fn with_values(mut self, values: ArrayValue) -> Self {
        self.values = values;
        self
    }

    /// Adds a property under its setter name, replacing an earlier one of the
    /// same name.
    pub fn with_property(mut self, setter: impl Into<String>, value: Value) -> Self {
        let setter = setter.into();
        match self.properties.iter_mut().find(|(name, _)| *name == setter) {
            Some((_, slot)) => *slot = value,
            None => self.properties.push((setter, value)),
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw `impl` text.
    pub fn implementation(&self) -> &str {
        &self.implementation
    }

    pub fn kind(&self) -> ImplementationKind {
        self.kind
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// The substituted `value` attribute.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Structure built from the bean's `<value>` children.
    pub fn values(&self) -> &ArrayValue {
        &self.values
    }

    /// Properties keyed by setter name, in declaration order.
    pub fn properties(&self) -> &[(String, Value)] {
        &self.properties
    }

    pub fn is_singleton(&self) -> bool {
        self.scope == Scope::Singleton
    }

    pub fn has_implementation(&self) -> bool {
        !self.implementation.is_empty()
    }

    pub fn implementation_kind_is(&self, kind: ImplementationKind) -> bool {
        self.kind == kind
    }

    pub fn has_type(&self) -> bool {
        self.scope != Scope::Unspecified
    }

    /// The scalar value of a `string` bean; `None` for other kinds and for an
    /// empty value.
    pub fn string_value(&self) -> Option<&Value> {
        if self.kind != ImplementationKind::String || self.value.is_empty() {
            return None;
        }
        Some(&self.value)
    }
}

/// Converts a property name into its setter identifier: `title` → `setTitle`.
pub fn setter_name(property: &str) -> String {
    let mut chars = property.chars();
    let mut setter = String::with_capacity(property.len() + 3);
    setter.push_str("set");
    if let Some(first) = chars.next() {
        setter.extend(first.to_uppercase());
        setter.push_str(chars.as_str());
    }
    setter
}
