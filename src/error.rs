use std::path::PathBuf;

use thiserror::Error;

use crate::document::DocumentError;
use crate::evaluator::EvalError;
use crate::settings::SettingsError;

/// Result type for bean-factory operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration and wiring errors.
///
/// Every variant is fatal for the load or instantiation that raised it.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("file '{0}' could not be found")]
    FileNotFound(PathBuf),

    #[error("file '{0}' was already loaded")]
    AlreadyLoaded(PathBuf),

    #[error("failed to read file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid document '{path}': {source}")]
    InvalidDocument {
        path: PathBuf,
        source: DocumentError,
    },

    #[error("include file '{0}' could not be found")]
    IncludeNotFound(PathBuf),

    #[error("include in '{path}' must name a file, got '{value}'")]
    InvalidInclude { path: PathBuf, value: String },

    #[error("'impl' attribute could not be found for bean '{bean}'")]
    MissingImplementation { bean: String },

    #[error("type '{scope}' specified for bean '{bean}' is not handled")]
    UnhandledScope { bean: String, scope: String },

    #[error("bean '{bean}' definition is already defined")]
    DuplicateBean { bean: String },

    #[error("property declared without a name in bean '{bean}'")]
    InvalidProperty { bean: String },

    #[error("undefined environment variable '{0}'")]
    UndefinedEnvironment(String),

    #[error("ambiguous variable definition in '{input}': unable to determine which variable to use among {candidates:?}")]
    AmbiguousVariable {
        input: String,
        candidates: Vec<String>,
    },

    #[error("invalid array definition: {0}")]
    InvalidArray(String),

    #[error("implementation must be an array or an expression to evaluate but not '{0}'")]
    InvalidNestedImplementation(String),

    #[error("no such bean name '{0}'")]
    NoSuchBean(String),

    #[error("bean '{bean}' has no value (expecting a string value)")]
    MissingStringValue { bean: String },

    #[error("implementation '{implementation}' could not be found for bean '{bean}'; be sure it is loaded into the type registry")]
    ImplementationNotFound {
        bean: String,
        implementation: String,
    },

    #[error("property '{property}' has no value specified for bean '{bean}'")]
    MissingPropertyValue { bean: String, property: String },

    #[error("could not find setter method '{property}' in implementation of bean '{bean}'")]
    SetterNotFound { bean: String, property: String },

    #[error("setter '{property}' of bean '{bean}' rejected its value: {reason}")]
    PropertyRejected {
        bean: String,
        property: String,
        reason: String,
    },

    #[error("bean '{bean}' failed after initialization: {reason}")]
    Initialization { bean: String, reason: String },

    #[error("failed to evaluate '{expression}': {source}")]
    Evaluation {
        expression: String,
        source: EvalError,
    },

    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
}
