use std::sync::Arc;

use sprig_config::PropertyError;
use thiserror::Error;

use crate::{
    convert::ConversionError,
    definition::DefinitionError,
    dependency_graph::DependencyGraphErrors,
    resolver::InjectionSite,
    types::{DynError, TypeInfo},
};

/// Errors while registering, resolving or creating beans
#[derive(Error, Debug, Clone)]
pub enum BeanError {
    /// The name is taken and definition overriding is disabled
    #[error("A bean named '{name}' is already registered and overriding is disabled")]
    DuplicateDefinition { name: String },

    /// No definition is registered under this name or alias
    #[error("No bean named '{name}' is registered")]
    NoSuchBean { name: String },

    /// No candidate for a required dependency
    #[error("No bean of type '{required}' available for {site} of '{bean}'")]
    UnsatisfiedDependency {
        bean: String,
        site: InjectionSite,
        required: TypeInfo,
    },

    /// More than one candidate survived all disambiguation
    #[error(
        "Expected a single bean of type '{required}' for {site} of '{bean}' but found {}: {}",
        .candidates.len(),
        .candidates.join(", ")
    )]
    AmbiguousDependency {
        bean: String,
        site: InjectionSite,
        required: TypeInfo,
        candidates: Vec<String>,
    },

    /// A literal value could not be converted to the required type
    #[error("Invalid value for {site} of '{bean}': {source}")]
    Conversion {
        bean: String,
        site: InjectionSite,
        source: ConversionError,
    },

    /// Beans require each other while being constructed
    #[error("Circular dependency between beans: {}", .chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },

    /// None of the constructors accepts the declared constructor arguments
    #[error("No constructor of '{bean}' matches its declared arguments: {reason}")]
    NoMatchingConstructor { bean: String, reason: String },

    /// The bean does not expose the requested type
    #[error("Bean '{bean}' is not of the required type '{required}'")]
    TypeMismatch { bean: String, required: &'static str },

    /// A resolved argument was accessed with the wrong index or kind
    #[error("Argument {index}: {reason}")]
    InvalidArgument { index: usize, reason: String },

    /// The constructor or factory method returned an error
    #[error("Factory for bean '{bean}' failed - error: {error}")]
    FactoryFailed { bean: String, error: Arc<DynError> },

    /// A property setter returned an error
    #[error("Failed to inject property '{property}' of bean '{bean}' - error: {error}")]
    PropertyFailed {
        bean: String,
        property: String,
        error: Arc<DynError>,
    },

    /// An init callback returned an error
    #[error("Init callback of bean '{bean}' failed - error: {error}")]
    CallbackFailed { bean: String, error: Arc<DynError> },

    /// The bean declares a custom scope nobody registered
    #[error("No scope named '{scope}' is registered, required by bean '{bean}'")]
    UnknownScope { bean: String, scope: String },

    /// A definition violated its own invariants
    #[error("Invalid definition for bean '{name}': {source}")]
    InvalidDefinition {
        name: String,
        source: DefinitionError,
    },

    /// Static checks on the registered definitions failed
    #[error(transparent)]
    DependencyGraph(#[from] DependencyGraphErrors),

    /// A placeholder in a literal value could not be resolved
    #[error(transparent)]
    Property(#[from] PropertyError),

    /// The container has been shut down
    #[error("The container has been shut down")]
    ContainerClosed,

    /// Wraps the error that aborted creation with the chain of beans being built at that point
    #[error("Error creating bean '{bean}' [{}]: {source}", .chain.join(" -> "))]
    Creation {
        bean: String,
        chain: Vec<String>,
        source: Box<BeanError>,
    },
}

impl BeanError {
    /// The innermost error, skipping [`BeanError::Creation`] wrappers
    pub fn root_cause(&self) -> &BeanError {
        match self {
            BeanError::Creation { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Beans that were under construction when the error happened, outermost first
    pub fn chain(&self) -> Option<&[String]> {
        match self {
            BeanError::Creation { chain, .. } => Some(chain),
            _ => None,
        }
    }

    pub(crate) fn factory_failed(bean: &str, error: DynError) -> Self {
        BeanError::FactoryFailed {
            bean: bean.to_string(),
            error: Arc::new(error),
        }
    }
}
