//! Constructible types, looked up by the `impl` text of a bean.
//!
//! ```
//! use bean_factory::{Component, ComponentError, TypeRegistry, Value};
//!
//! #[derive(Default)]
//! struct Mailer {
//!     host: String,
//! }
//!
//! impl Component for Mailer {
//!     fn set_property(&mut self, setter: &str, value: &Value) -> Result<(), ComponentError> {
//!         match setter {
//!             "setHost" => self.host = value.to_string(),
//!             _ => return Err(ComponentError::NoSuchSetter),
//!         }
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = TypeRegistry::new();
//! registry.register::<Mailer>("app.Mailer");
//! assert!(registry.contains("app.Mailer"));
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::value::Value;

/// Why a component refused a property or its initialization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComponentError {
    #[error("no such setter")]
    NoSuchSetter,

    #[error("{0}")]
    Rejected(String),
}

/// Upcast to [`Any`], implemented for every `'static` type.
pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// An object the factory can construct and wire.
pub trait Component: AsAny {
    /// Applies a property through its setter name (`title` arrives as
    /// `setTitle`). Unknown setters return [`ComponentError::NoSuchSetter`].
    fn set_property(&mut self, setter: &str, value: &Value) -> Result<(), ComponentError>;

    /// Called once after all properties have been applied.
    fn after_bean_initialized(&mut self) -> Result<(), ComponentError> {
        Ok(())
    }
}

/// A shared, mutable component instance.
pub type ComponentRef = Rc<RefCell<dyn Component>>;

type Constructor = Rc<dyn Fn() -> ComponentRef>;

/// Maps implementation names to constructors.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    constructors: HashMap<String, Constructor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T`, constructed through [`Default`].
    pub fn register<T>(&mut self, name: impl Into<String>) -> &mut Self
    where
        T: Component + Default + 'static,
    {
        self.register_with(name, || Rc::new(RefCell::new(T::default())) as ComponentRef)
    }

    /// Registers a custom constructor.
    pub fn register_with<F>(&mut self, name: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn() -> ComponentRef + 'static,
    {
        self.constructors.insert(name.into(), Rc::new(constructor));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Constructs a new instance of `name`, if registered.
    pub fn resolve(&self, name: &str) -> Option<ComponentRef> {
        self.constructors.get(name).map(|construct| construct())
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.constructors.keys().collect();
        names.sort();
        f.debug_struct("TypeRegistry").field("types", &names).finish()
    }
}
