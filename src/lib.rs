//! Declarative object wiring from XML context documents.
//!
//! A context document declares variables, environment references, includes
//! and beans:
//!
//! ```xml
//! <beans>
//!     <variable name="name" value="world"/>
//!     <environment>HOME</environment>
//!     <include filename="services.xml"/>
//!
//!     <bean name="greeting" impl="string" value="hello $name"/>
//!     <bean name="cacheSize" impl="evaluate" value="64 * 1024"/>
//!     <bean name="mailer" impl="app.Mailer" type="singleton">
//!         <property name="host" value="smtp.example.com"/>
//!     </bean>
//! </beans>
//! ```
//!
//! [`BeanFactory`] loads the context and builds beans on request: `string`,
//! `evaluate` and `array` beans become [`Value`]s, any other `impl` is looked
//! up in the [`TypeRegistry`] and wired through [`Component::set_property`].

pub mod array;
pub mod definition;
pub mod document;
pub mod environment;
mod error;
pub mod evaluator;
pub mod factory;
pub mod loader;
pub mod registry;
pub mod settings;
pub mod value;
pub mod variables;

pub use definition::{BeanDefinition, ImplementationKind, Scope};
pub use environment::{Environment, ProcessEnvironment};
pub use error::{Error, Result};
pub use evaluator::{EvalError, Evaluator, ExpressionEvaluator};
pub use factory::{BeanFactory, BeanFactoryBuilder, Instance};
pub use registry::{Component, ComponentError, ComponentRef, TypeRegistry};
pub use settings::{FactorySettings, SettingsBuilder};
pub use value::{ArrayKey, ArrayValue, Value};
pub use variables::{AmbiguityPolicy, VariableTable};
