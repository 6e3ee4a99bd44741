use std::{collections::HashMap, sync::Arc};

use sprig_config::{PropertyError, PropertySources};

use crate::{
    config::ContainerConfig,
    container::Container,
    convert::{Converter, DefaultConverter},
    definition::{BeanDefinition, BeanDefinitionBuilder},
    dependency_graph::DependencyGraph,
    errors::BeanError,
    scope::CustomScope,
    store::BeanDefinitionStore,
    types::Injectable,
};

/// Source of bean definitions, e.g. a parsed configuration file
pub trait ConfigurationLoader {
    fn load(&self, builder: &mut ContainerBuilder) -> Result<(), BeanError>;
}

/// The container is set up in two steps.
/// 1. The ContainerBuilder where one registers definitions, aliases and scopes
/// 2. [`ContainerBuilder::build`] checks the definitions and hands out the [`Container`]
pub struct ContainerBuilder {
    store: BeanDefinitionStore,
    scopes: HashMap<String, Arc<dyn CustomScope>>,
    converter: Arc<dyn Converter>,
    properties: PropertySources,
    config: ContainerConfig,
}
impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    pub fn with_config(config: ContainerConfig) -> Self {
        ContainerBuilder {
            store: BeanDefinitionStore::new(config.allow_definition_overriding),
            scopes: HashMap::new(),
            converter: Arc::new(DefaultConverter),
            properties: PropertySources::new(),
            config,
        }
    }

    /// Reads the container configuration from `properties`, which also serve placeholders
    pub fn from_properties(properties: PropertySources) -> Result<Self, PropertyError> {
        let config = ContainerConfig::from_properties(&properties)?;
        let mut builder = Self::with_config(config);
        builder.properties = properties;
        Ok(builder)
    }
}

impl ContainerBuilder {
    pub fn register(
        &mut self,
        name: &str,
        definition: BeanDefinition,
    ) -> Result<&mut Self, BeanError> {
        self.store.register(name, definition)?;
        Ok(self)
    }

    /// Builds and registers a definition
    pub fn bean<T: Injectable>(
        &mut self,
        name: &str,
        definition: BeanDefinitionBuilder<T>,
    ) -> Result<&mut Self, BeanError> {
        let definition = definition
            .build()
            .map_err(|source| BeanError::InvalidDefinition {
                name: name.to_string(),
                source,
            })?;
        self.register(name, definition)
    }

    /// Registers an already created singleton
    pub fn instance<T: Injectable>(&mut self, name: &str, instance: T) -> Result<&mut Self, BeanError> {
        self.register(name, BeanDefinition::instance(instance))
    }

    pub fn alias(&mut self, name: &str, alias: &str) -> Result<&mut Self, BeanError> {
        self.store.register_alias(name, alias)?;
        Ok(self)
    }

    pub fn scope(&mut self, name: &str, scope: Arc<dyn CustomScope>) -> &mut Self {
        if self.scopes.insert(name.to_string(), scope).is_some() {
            tracing::info!("Replaced scope '{name}'");
        }
        self
    }

    pub fn converter(&mut self, converter: impl Converter + 'static) -> &mut Self {
        self.converter = Arc::new(converter);
        self
    }

    /// Sources for `${...}` placeholders in literal values
    pub fn properties(&mut self, properties: PropertySources) -> &mut Self {
        self.properties = properties;
        self
    }

    pub fn load(&mut self, loader: &dyn ConfigurationLoader) -> Result<&mut Self, BeanError> {
        loader.load(self)?;
        Ok(self)
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Checks the `depends_on` declarations and creates the container.
    /// No bean is created until [`Container::start`] or the first lookup.
    pub fn build(self) -> Result<Container, BeanError> {
        let graph = DependencyGraph::new(&self.store);
        graph.check()?;

        tracing::debug!(
            "Built container with {} bean definitions and {} custom scopes",
            self.store.len(),
            self.scopes.len()
        );

        Ok(Container::new(
            self.store,
            graph,
            self.scopes,
            self.converter,
            self.properties,
            self.config,
        ))
    }
}
