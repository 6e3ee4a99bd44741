use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use sprig_config::PropertySources;

use crate::{
    builder::ContainerBuilder,
    config::ContainerConfig,
    convert::Converter,
    definition::BeanDefinition,
    dependency_graph::DependencyGraph,
    errors::BeanError,
    instantiation::CreationRequest,
    resolver::{constructor::BindContext, DependencyDescriptor, DependencyResolver},
    scope::CustomScope,
    singletons::SingletonRegistry,
    store::BeanDefinitionStore,
    types::{BeanRef, TypeInfo},
};

/// Container creating and holding beans
///
/// Cheap to clone, all clones share the same beans.
#[derive(Clone)]
pub struct Container(Arc<ContainerInner>);

pub(crate) struct ContainerInner {
    pub(crate) store: BeanDefinitionStore,
    pub(crate) singletons: SingletonRegistry,
    pub(crate) graph: DependencyGraph,
    pub(crate) scopes: HashMap<String, Arc<dyn CustomScope>>,
    pub(crate) converter: Arc<dyn Converter>,
    pub(crate) properties: PropertySources,
    pub(crate) config: ContainerConfig,
    started: AtomicBool,
}

impl ContainerInner {
    pub(crate) fn resolver(&self) -> DependencyResolver<'_> {
        DependencyResolver::new(&self.store, self.config.allow_self_injection)
    }

    pub(crate) fn bind_context(&self) -> BindContext<'_> {
        BindContext {
            store: &self.store,
            converter: self.converter.as_ref(),
            properties: &self.properties,
        }
    }
}

impl Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for bean in self.0.store.iter() {
            let scope = bean.definition.scope();
            let state = if self.0.singletons.contains(&bean.name) {
                "created".to_string()
            } else if scope.is_singleton() {
                "not created".to_string()
            } else {
                scope.to_string()
            };
            map.entry(&bean.name, &state);
        }
        map.finish()
    }
}

impl Container {
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub(crate) fn new(
        store: BeanDefinitionStore,
        graph: DependencyGraph,
        scopes: HashMap<String, Arc<dyn CustomScope>>,
        converter: Arc<dyn Converter>,
        properties: PropertySources,
        config: ContainerConfig,
    ) -> Self {
        Self(Arc::new(ContainerInner {
            store,
            singletons: SingletonRegistry::new(),
            graph,
            scopes,
            converter,
            properties,
            config,
            started: AtomicBool::new(false),
        }))
    }

    /// Creates all singletons that are not lazy, in registration order.
    ///
    /// Calling it again does nothing. If a bean fails the created singletons are destroyed
    /// and the container is shut down.
    pub fn start(&self) -> Result<(), BeanError> {
        let inner = &self.0;
        if inner.singletons.is_closed() {
            return Err(BeanError::ContainerClosed);
        }
        if inner.started.load(Ordering::Acquire) {
            tracing::debug!("Container already started");
            return Ok(());
        }

        let lazy_by_default = inner.config.lazy_initialization;
        let eager: Vec<&str> = inner
            .store
            .iter()
            .filter(|bean| {
                let definition = &bean.definition;
                definition.scope().is_singleton()
                    && !definition.lazy_init().unwrap_or(lazy_by_default)
            })
            .map(|bean| bean.name.as_str())
            .collect();

        tracing::info!(
            "Starting container, creating {} of {} beans",
            eager.len(),
            inner.store.len()
        );
        for name in eager {
            if let Err(error) = self.get(name) {
                tracing::error!("Starting the container failed: {error}");
                self.shutdown();
                return Err(error);
            }
        }

        inner.started.store(true, Ordering::Release);
        tracing::info!("Container started with {} singletons", inner.singletons.len());
        Ok(())
    }

    /// Returns the bean registered under `name` or one of its aliases, creating it if needed
    pub fn get(&self, name: &str) -> Result<BeanRef, BeanError> {
        let inner = &self.0;
        if inner.singletons.is_closed() {
            return Err(BeanError::ContainerClosed);
        }
        if let Some(existing) = inner.singletons.get(inner.store.canonical_name(name)) {
            return Ok(existing);
        }
        CreationRequest::run(inner, name)
    }

    /// Like [`Container::get`] but typed
    pub fn get_as<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, BeanError> {
        self.get(name)?.get::<T>()
    }

    /// Returns the single bean of type `T`, primary and fallback markers decide between several
    pub fn get_by_type<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, BeanError> {
        let descriptor = DependencyDescriptor::lookup::<T>();
        self.resolve(&descriptor)?
            .ok_or_else(|| BeanError::UnsatisfiedDependency {
                bean: "<container>".to_string(),
                site: descriptor.site.clone(),
                required: descriptor.required,
            })?
            .get::<T>()
    }

    /// Resolves a descriptor the way an injection point would be resolved
    pub fn resolve(&self, descriptor: &DependencyDescriptor) -> Result<Option<BeanRef>, BeanError> {
        match self.0.resolver().resolve(descriptor, None)? {
            Some(bean) => self.get(&bean.name).map(Some),
            None => Ok(None),
        }
    }

    /// All beans that can be injected as `T`, in registration order
    pub fn beans_of_type<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Vec<(String, Arc<T>)>, BeanError> {
        let required = TypeInfo::of::<T>();
        self.0
            .store
            .definitions_assignable_to(&required)
            .map(|bean| -> Result<(String, Arc<T>), BeanError> {
                Ok((bean.name.clone(), self.get(&bean.name)?.get::<T>()?))
            })
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.store.contains(name)
    }

    /// Names of all definitions in registration order
    pub fn definition_names(&self) -> Vec<String> {
        self.0.store.names().map(str::to_string).collect()
    }

    pub fn definition(&self, name: &str) -> Result<&BeanDefinition, BeanError> {
        self.0.store.lookup(name).map(|bean| &bean.definition)
    }

    pub fn aliases(&self, name: &str) -> Vec<String> {
        let store = &self.0.store;
        let mut aliases: Vec<String> = store
            .aliases_of(store.canonical_name(name))
            .map(str::to_string)
            .collect();
        aliases.sort();
        aliases
    }

    /// True if the singleton `name` has been created
    pub fn is_created(&self, name: &str) -> bool {
        self.0.singletons.contains(self.0.store.canonical_name(name))
    }

    /// Beans that were injected into `name`
    pub fn dependencies_of(&self, name: &str) -> Vec<String> {
        self.0.graph.dependencies_of(self.0.store.canonical_name(name))
    }

    /// Beans `name` was injected into
    pub fn dependents_of(&self, name: &str) -> Vec<String> {
        self.0.graph.dependents_of(self.0.store.canonical_name(name))
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.0.config
    }

    pub fn properties(&self) -> &PropertySources {
        &self.0.properties
    }

    pub fn is_active(&self) -> bool {
        !self.0.singletons.is_closed()
    }

    /// Destroys all singletons, most recently created first, and closes custom scopes.
    /// Later lookups fail with [`BeanError::ContainerClosed`].
    pub fn shutdown(&self) {
        let inner = &self.0;
        if inner.singletons.is_closed() {
            return;
        }

        let singletons = inner.singletons.close();
        tracing::info!("Shutting down container, destroying {} singletons", singletons.len());
        for bean in singletons {
            match bean.destroy() {
                Ok(()) => tracing::trace!("Destroyed bean '{}'", bean.name()),
                Err(error) => {
                    tracing::warn!("Destroy callback of bean '{}' failed: {error}", bean.name())
                }
            }
        }

        for scope in inner.scopes.values() {
            scope.close();
        }
    }
}
