//! The bean factory: loads a context and turns definitions into instances.
//!
//! ```no_run
//! use bean_factory::{BeanFactory, TypeRegistry};
//!
//! let mut factory = BeanFactory::builder()
//!     .with_registry(TypeRegistry::new())
//!     .build()?;
//! factory.set_application_context("config/beans.xml", false)?;
//! let greeting = factory.get_bean("greeting")?;
//! println!("{:?}", greeting.as_str());
//! # Ok::<(), bean_factory::Error>(())
//! ```

mod builder;
mod instance;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, trace};

pub use builder::BeanFactoryBuilder;
pub use instance::Instance;

use crate::array::ArrayBuilder;
use crate::definition::{BeanDefinition, ImplementationKind};
use crate::environment::Environment;
use crate::evaluator::{EvalError, Evaluator};
use crate::loader::{ContextLoader, Definitions};
use crate::registry::{ComponentError, TypeRegistry};
use crate::value::Value;
use crate::variables::VariableTable;
use crate::{Error, Result};

/// Instantiated singletons, keyed by context then bean name.
#[derive(Debug, Default)]
pub struct SingletonCache {
    contexts: HashMap<PathBuf, HashMap<String, Instance>>,
}

impl SingletonCache {
    pub fn get(&self, context: &Path, bean: &str) -> Option<&Instance> {
        self.contexts.get(context)?.get(bean)
    }

    pub fn insert(&mut self, context: &Path, bean: &str, instance: Instance) {
        self.contexts
            .entry(context.to_path_buf())
            .or_default()
            .insert(bean.to_string(), instance);
    }

    /// Drops every singleton of `context`.
    pub fn invalidate(&mut self, context: &Path) -> usize {
        self.contexts.remove(context).map_or(0, |beans| beans.len())
    }

    pub fn clear(&mut self) {
        self.contexts.clear();
    }

    pub fn len(&self) -> usize {
        self.contexts.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Loads bean definitions and instantiates beans on request.
///
/// The factory owns the variable table and the singleton cache; nothing is
/// shared between factories. It is single-threaded: instances are
/// reference-counted, not synchronised.
pub struct BeanFactory {
    registry: TypeRegistry,
    evaluator: Box<dyn Evaluator>,
    environment: Box<dyn Environment>,
    variables: VariableTable,
    context: Option<PathBuf>,
    definitions: Definitions,
    singletons: SingletonCache,
}

impl BeanFactory {
    pub fn builder() -> BeanFactoryBuilder {
        BeanFactoryBuilder::new()
    }

    /// Loads the context rooted at `path`.
    ///
    /// Does nothing when `path` is already the active context, unless
    /// `force_reload` is set. Otherwise the definitions are parsed from
    /// scratch, replacing the previous ones, and the singletons cached for
    /// `path` are dropped. After an error the factory holds no definitions.
    pub fn set_application_context(
        &mut self,
        path: impl AsRef<Path>,
        force_reload: bool,
    ) -> Result<()> {
        let path = path.as_ref();
        if !force_reload && self.context.as_deref() == Some(path) {
            trace!(context = %path.display(), "context already loaded");
            return Ok(());
        }

        self.context = Some(path.to_path_buf());
        self.definitions.clear();
        let dropped = self.singletons.invalidate(path);

        let mut loader = ContextLoader::new(
            &mut self.variables,
            self.environment.as_ref(),
            self.evaluator.as_ref(),
        );
        self.definitions = loader.load(path)?;
        debug!(
            context = %path.display(),
            beans = self.definitions.len(),
            dropped_singletons = dropped,
            "loaded application context"
        );
        Ok(())
    }

    /// Returns the instance of bean `name`.
    ///
    /// Singletons are built once per context and then served from the cache.
    /// Other beans are built on every call.
    pub fn get_bean(&mut self, name: &str) -> Result<Instance> {
        let definition = self
            .definitions
            .get(name)
            .ok_or_else(|| Error::NoSuchBean(name.to_string()))?;

        if definition.is_singleton() {
            if let Some(instance) = self.cached_singleton(name) {
                trace!(bean = name, "singleton cache hit");
                return Ok(instance);
            }
        }

        let instance = self.instantiate(definition)?;

        if definition.is_singleton() {
            if let Some(context) = &self.context {
                self.singletons.insert(context, name, instance.clone());
            }
        }

        if definition.kind() == ImplementationKind::ClassName {
            if let Instance::Component(component) = &instance {
                component
                    .borrow_mut()
                    .after_bean_initialized()
                    .map_err(|e| Error::Initialization {
                        bean: name.to_string(),
                        reason: e.to_string(),
                    })?;
            }
        }

        debug!(bean = name, implementation = definition.implementation(), "instantiated bean");
        Ok(instance)
    }

    fn cached_singleton(&self, name: &str) -> Option<Instance> {
        let context = self.context.as_deref()?;
        self.singletons.get(context, name).cloned()
    }

    fn instantiate(&self, definition: &BeanDefinition) -> Result<Instance> {
        match definition.kind() {
            ImplementationKind::String => definition
                .string_value()
                .map(|value| Instance::value(value.clone()))
                .ok_or_else(|| Error::MissingStringValue {
                    bean: definition.name().to_string(),
                }),
            ImplementationKind::Evaluate => {
                let expression = match definition.value() {
                    Value::Str(expression) => expression,
                    other => {
                        return Err(Error::Evaluation {
                            expression: other.to_string(),
                            source: EvalError::runtime("expression must be text"),
                        })
                    }
                };
                let value = self.evaluator.evaluate(expression).map_err(|source| {
                    Error::Evaluation {
                        expression: expression.clone(),
                        source,
                    }
                })?;
                Ok(Instance::value(value))
            }
            ImplementationKind::Array => {
                Ok(Instance::value(Value::Array(definition.values().clone())))
            }
            ImplementationKind::ClassName => self.construct(definition),
        }
    }

    /// Constructs a registered type and applies the bean's properties.
    fn construct(&self, definition: &BeanDefinition) -> Result<Instance> {
        let bean = definition.name();
        let component = self.registry.resolve(definition.implementation()).ok_or_else(|| {
            Error::ImplementationNotFound {
                bean: bean.to_string(),
                implementation: definition.implementation().to_string(),
            }
        })?;

        {
            let mut target = component.borrow_mut();
            for (setter, value) in definition.properties() {
                if matches!(value, Value::Null) || value.as_str() == Some("") {
                    return Err(Error::MissingPropertyValue {
                        bean: bean.to_string(),
                        property: setter.clone(),
                    });
                }
                target.set_property(setter, value).map_err(|e| match e {
                    ComponentError::NoSuchSetter => Error::SetterNotFound {
                        bean: bean.to_string(),
                        property: setter.clone(),
                    },
                    ComponentError::Rejected(reason) => Error::PropertyRejected {
                        bean: bean.to_string(),
                        property: setter.clone(),
                        reason,
                    },
                })?;
            }
        }

        Ok(Instance::Component(component))
    }

    /// Looks a variable up by name, without the `$` marker.
    pub fn get_var(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Evaluates an expression with the factory's evaluator, after
    /// substituting variables into it.
    pub fn evaluate(&self, expression: &str) -> Result<Value> {
        ArrayBuilder::new(&self.variables, self.evaluator.as_ref()).evaluate(expression)
    }

    /// The active context, if one was set.
    pub fn context(&self) -> Option<&Path> {
        self.context.as_deref()
    }

    pub fn definition(&self, name: &str) -> Option<&BeanDefinition> {
        self.definitions.get(name)
    }

    pub fn definitions(&self) -> &Definitions {
        &self.definitions
    }

    /// Names of the loaded beans, sorted.
    pub fn bean_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn contains_bean(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn variables(&self) -> &VariableTable {
        &self.variables
    }

    /// Forgets every variable. Definitions already loaded keep their
    /// substituted values.
    pub fn clear_variables(&mut self) {
        self.variables.clear();
    }

    /// Drops every cached singleton of every context.
    pub fn clear_singletons(&mut self) {
        self.singletons.clear();
    }

    pub fn singletons(&self) -> &SingletonCache {
        &self.singletons
    }
}

impl std::fmt::Debug for BeanFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanFactory")
            .field("context", &self.context)
            .field("beans", &self.bean_names())
            .field("variables", &self.variables.len())
            .field("singletons", &self.singletons.len())
            .field("registry", &self.registry)
            .finish()
    }
}
