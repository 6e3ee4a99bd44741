/// Errors when reading properties or resolving placeholders
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// A placeholder names a key no source defines and carries no default
    #[error("Could not resolve placeholder '{key}' in value \"{text}\"")]
    UnresolvablePlaceholder { key: String, text: String },

    /// Resolving a placeholder led back to itself
    #[error("Circular placeholder reference '{key}' through {chain:?}")]
    CircularPlaceholder { key: String, chain: Vec<String> },

    /// A `${` without a matching `}`
    #[error("Unterminated placeholder in value \"{0}\"")]
    Unterminated(String),

    /// The value of a property could not be parsed into the requested type
    #[error("Property '{key}' has invalid value \"{value}\": {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Errors when trying to register a property source
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterSourceError {
    /// A source with the same name is already registered
    #[error("A property source named '{0}' is already registered")]
    AlreadyRegistered(String),
}
