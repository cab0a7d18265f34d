use std::cell::{Ref, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::registry::{Component, ComponentRef};
use crate::value::Value;

/// A live bean: a value (`string`, `evaluate` and `array` beans) or a
/// constructed component.
///
/// Cloning shares the underlying instance; singletons are handed out as
/// clones of the cached instance, so [`Instance::ptr_eq`] holds between them.
#[derive(Clone)]
pub enum Instance {
    Value(Rc<Value>),
    Component(ComponentRef),
}

impl Instance {
    pub fn value(value: Value) -> Self {
        Instance::Value(Rc::new(value))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Instance::Value(value) => Some(value),
            Instance::Component(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_component(&self) -> Option<&ComponentRef> {
        match self {
            Instance::Component(component) => Some(component),
            Instance::Value(_) => None,
        }
    }

    pub fn is_component(&self) -> bool {
        matches!(self, Instance::Component(_))
    }

    /// Borrows the component as `T`.
    ///
    /// Returns `None` for values and for components of another type.
    ///
    /// # Panics
    ///
    /// Panics if the component is currently mutably borrowed.
    pub fn downcast_ref<T: Component>(&self) -> Option<Ref<'_, T>> {
        let component = self.as_component()?;
        Ref::filter_map(component.borrow(), |c| (*c).as_any().downcast_ref::<T>()).ok()
    }

    /// Mutably borrows the component as `T`.
    ///
    /// # Panics
    ///
    /// Panics if the component is currently borrowed.
    pub fn downcast_mut<T: Component>(&self) -> Option<RefMut<'_, T>> {
        let component = self.as_component()?;
        RefMut::filter_map(component.borrow_mut(), |c| {
            (*c).as_any_mut().downcast_mut::<T>()
        })
        .ok()
    }

    /// True when both handles point at the same instance.
    pub fn ptr_eq(&self, other: &Instance) -> bool {
        match (self, other) {
            (Instance::Value(a), Instance::Value(b)) => Rc::ptr_eq(a, b),
            (Instance::Component(a), Instance::Component(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instance::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Instance::Component(component) => f
                .debug_tuple("Component")
                .field(&Rc::as_ptr(component))
                .finish(),
        }
    }
}

impl PartialEq<Value> for Instance {
    fn eq(&self, other: &Value) -> bool {
        self.as_value() == Some(other)
    }
}

impl PartialEq<&str> for Instance {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == Some(*other)
    }
}
