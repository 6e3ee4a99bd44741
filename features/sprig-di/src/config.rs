use sprig_config::{PropertyError, PropertySources};

/// Container behaviour switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerConfig {
    /// Registering a name twice replaces the earlier definition instead of failing
    pub allow_definition_overriding: bool,
    /// Property injection may receive early references to singletons still being populated
    pub allow_circular_references: bool,
    /// A bean may be autowired into itself when it is the only candidate
    pub allow_self_injection: bool,
    /// Singletons without an explicit lazy flag are created on first use instead of at start
    pub lazy_initialization: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        ContainerConfig {
            allow_definition_overriding: false,
            allow_circular_references: true,
            allow_self_injection: false,
            lazy_initialization: false,
        }
    }
}

impl ContainerConfig {
    pub const ALLOW_DEFINITION_OVERRIDING: &'static str = "container.allow-definition-overriding";
    pub const ALLOW_CIRCULAR_REFERENCES: &'static str = "container.allow-circular-references";
    pub const ALLOW_SELF_INJECTION: &'static str = "container.allow-self-injection";
    pub const LAZY_INITIALIZATION: &'static str = "container.lazy-initialization";

    /// Reads the configuration from properties, missing keys keep their default
    pub fn from_properties(properties: &PropertySources) -> Result<Self, PropertyError> {
        let defaults = ContainerConfig::default();
        let flag = |key: &str, default: bool| {
            properties
                .get_parsed::<bool>(key)
                .map(|value| value.unwrap_or(default))
        };

        Ok(ContainerConfig {
            allow_definition_overriding: flag(
                Self::ALLOW_DEFINITION_OVERRIDING,
                defaults.allow_definition_overriding,
            )?,
            allow_circular_references: flag(
                Self::ALLOW_CIRCULAR_REFERENCES,
                defaults.allow_circular_references,
            )?,
            allow_self_injection: flag(Self::ALLOW_SELF_INJECTION, defaults.allow_self_injection)?,
            lazy_initialization: flag(Self::LAZY_INITIALIZATION, defaults.lazy_initialization)?,
        })
    }
}
