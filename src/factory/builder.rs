use crate::environment::{Environment, ProcessEnvironment};
use crate::evaluator::{DisabledEvaluator, Evaluator, ExpressionEvaluator};
use crate::loader::Definitions;
use crate::registry::TypeRegistry;
use crate::settings::FactorySettings;
use crate::variables::VariableTable;
use crate::Result;

use super::{BeanFactory, SingletonCache};

/// Builder for a [`BeanFactory`].
///
/// Defaults: an empty registry, the built-in [`ExpressionEvaluator`], the
/// process environment and [`FactorySettings::default`]. An evaluator set
/// with [`with_evaluator`](Self::with_evaluator) takes precedence over the
/// evaluator settings.
///
/// ```no_run
/// use bean_factory::settings::SettingsBuilder;
/// use bean_factory::{BeanFactory, TypeRegistry};
///
/// let settings = SettingsBuilder::new()
///     .with_file("factory.toml", false)
///     .with_env("BEANS", "__")
///     .build()?;
/// let factory = BeanFactory::builder()
///     .with_registry(TypeRegistry::new())
///     .with_settings(settings)
///     .build()?;
/// # Ok::<(), bean_factory::Error>(())
/// ```
#[must_use = "builders do nothing until .build() is called"]
pub struct BeanFactoryBuilder {
    registry: TypeRegistry,
    evaluator: Option<Box<dyn Evaluator>>,
    environment: Box<dyn Environment>,
    settings: FactorySettings,
}

impl BeanFactoryBuilder {
    pub fn new() -> Self {
        Self {
            registry: TypeRegistry::new(),
            evaluator: None,
            environment: Box::new(ProcessEnvironment),
            settings: FactorySettings::default(),
        }
    }

    pub fn with_registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_evaluator(mut self, evaluator: impl Evaluator + 'static) -> Self {
        self.evaluator = Some(Box::new(evaluator));
        self
    }

    pub fn with_environment(mut self, environment: impl Environment + 'static) -> Self {
        self.environment = Box::new(environment);
        self
    }

    pub fn with_settings(mut self, settings: FactorySettings) -> Self {
        self.settings = settings;
        self
    }

    /// Builds the factory, loading `settings.context.path` when set.
    pub fn build(self) -> Result<BeanFactory> {
        let evaluator: Box<dyn Evaluator> = match self.evaluator {
            Some(evaluator) => evaluator,
            None if self.settings.evaluator.enabled => Box::new(
                ExpressionEvaluator::with_max_depth(self.settings.evaluator.max_depth),
            ),
            None => Box::new(DisabledEvaluator),
        };

        let mut factory = BeanFactory {
            registry: self.registry,
            evaluator,
            environment: self.environment,
            variables: VariableTable::with_policy(self.settings.variables.ambiguity),
            context: None,
            definitions: Definitions::new(),
            singletons: SingletonCache::default(),
        };

        if let Some(path) = &self.settings.context.path {
            factory.set_application_context(path, self.settings.context.force_reload)?;
        }
        Ok(factory)
    }
}

impl Default for BeanFactoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
