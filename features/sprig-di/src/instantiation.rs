use std::{collections::HashMap, sync::Arc};

use parking_lot::ReentrantMutexGuard;

use crate::{
    container::ContainerInner,
    convert::ConversionError,
    definition::{ParamType, Parameter, PropertySpec, Scope, ValueSpec},
    errors::BeanError,
    factories::{Arguments, CreationStrategy, Injected},
    resolver::{
        constructor::{self, Binding},
        DependencyDescriptor, InjectionSite,
    },
    scope::CustomScope,
    store::RegisteredBean,
    types::{AnyInstance, BeanRef, InstanceState},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Dependencies of the constructor or factory method are being resolved
    Constructing,
    /// The instance exists, properties are being injected
    Populating,
}

#[derive(Debug, Clone, Copy)]
enum Record {
    InProgress(Phase),
    /// Singleton created by this request, not yet published
    Completed,
}

/// State of one top-level lookup.
///
/// Tracks every bean under construction so circular references are detected, hands out
/// early references to singletons that are being populated, and collects the singletons
/// it created. They are only published to the container once the whole lookup succeeded.
pub(crate) struct CreationRequest<'c> {
    container: &'c ContainerInner,
    records: HashMap<String, Record>,
    /// Beans currently being created, outermost first
    stack: Vec<String>,
    early: HashMap<String, BeanRef>,
    pending: Vec<BeanRef>,
    /// Beans this request put into custom scopes
    scoped: Vec<(&'c Arc<dyn CustomScope>, BeanRef)>,
    /// dependent -> dependency
    edges: Vec<(String, String)>,
    creation_guard: Option<ReentrantMutexGuard<'c, ()>>,
}

impl<'c> CreationRequest<'c> {
    fn new(container: &'c ContainerInner) -> Self {
        CreationRequest {
            container,
            records: HashMap::new(),
            stack: Vec::new(),
            early: HashMap::new(),
            pending: Vec::new(),
            scoped: Vec::new(),
            edges: Vec::new(),
            creation_guard: None,
        }
    }

    /// Looks up `name`, creating it and everything it needs
    pub(crate) fn run(container: &'c ContainerInner, name: &str) -> Result<BeanRef, BeanError> {
        let mut request = CreationRequest::new(container);
        let result = request.get_or_create(name, &InjectionSite::Lookup);
        request.finish(result)
    }

    fn finish(mut self, result: Result<BeanRef, BeanError>) -> Result<BeanRef, BeanError> {
        let container = self.container;
        match &result {
            Ok(_) => {
                container.graph.record(&self.edges);
                if !self.pending.is_empty() {
                    tracing::debug!("Publishing {} new singletons", self.pending.len());
                    container.singletons.commit(std::mem::take(&mut self.pending));
                }
            }
            Err(error) => {
                // Still holding the lock, threads waiting for these beans get the error
                if self.creation_guard.is_some() {
                    let failed = error.chain().unwrap_or_default().iter().filter(|name| {
                        container
                            .store
                            .lookup(name)
                            .is_ok_and(|bean| bean.definition.scope().is_singleton())
                    });
                    container
                        .singletons
                        .record_failure(failed.map(String::as_str), error);
                }

                tracing::warn!("Bean creation failed: {error}");
                for bean in self.pending.drain(..).rev() {
                    tracing::debug!("Discarding singleton '{}'", bean.name());
                    if let Err(destroy_error) = bean.destroy() {
                        tracing::warn!(
                            "Destroying discarded singleton '{}' failed: {destroy_error}",
                            bean.name()
                        );
                    }
                }
                for (scope, bean) in self.scoped.drain(..).rev() {
                    tracing::debug!("Discarding scoped bean '{}'", bean.name());
                    scope.remove(bean.name());
                    if let Err(destroy_error) = bean.destroy() {
                        tracing::warn!(
                            "Destroying discarded scoped bean '{}' failed: {destroy_error}",
                            bean.name()
                        );
                    }
                }
            }
        }
        result
    }

    /// Returns the bean for `name`, creating it if its scope requires
    pub(crate) fn get_or_create(
        &mut self,
        name: &str,
        site: &InjectionSite,
    ) -> Result<BeanRef, BeanError> {
        let container = self.container;
        let bean = container.store.lookup(name)?;

        match bean.definition.scope() {
            Scope::Singleton => {
                if let Some(existing) = container.singletons.get(&bean.name) {
                    return Ok(existing);
                }
                if let Some(found) = self.reentry(bean, site) {
                    return found;
                }

                self.lock_creation(&bean.name)?;
                // Another thread may have finished it while we waited
                if let Some(existing) = container.singletons.get(&bean.name) {
                    return Ok(existing);
                }
                self.create(bean)
            }
            Scope::Prototype => {
                if let Some(found) = self.reentry(bean, site) {
                    return found;
                }
                self.create(bean)
            }
            Scope::Custom(scope_name) => {
                if let Some(found) = self.reentry(bean, site) {
                    return found;
                }
                let scope = container
                    .scopes
                    .get(scope_name)
                    .ok_or_else(|| BeanError::UnknownScope {
                        bean: bean.name.clone(),
                        scope: scope_name.clone(),
                    })?;
                let mut created = false;
                let scoped = scope.get(&bean.name, &mut || {
                    created = true;
                    self.create(bean)
                })?;
                if created {
                    self.scoped.push((scope, scoped.clone()));
                }
                Ok(scoped)
            }
        }
    }

    /// Handles a bean this request has already seen.
    ///
    /// `None` if the bean is neither in progress nor completed by this request.
    fn reentry(
        &self,
        bean: &RegisteredBean,
        site: &InjectionSite,
    ) -> Option<Result<BeanRef, BeanError>> {
        let name = &bean.name;
        let phase = match self.records.get(name)? {
            Record::Completed => {
                return self.pending.iter().find(|b| b.name() == name.as_str()).cloned().map(Ok)
            }
            Record::InProgress(phase) => *phase,
        };

        let early_allowed = phase == Phase::Populating
            && !site.is_constructor_phase()
            && bean.definition.scope().is_singleton()
            && self.container.config.allow_circular_references;
        if early_allowed {
            if let Some(early) = self.early.get(name) {
                tracing::trace!("Injecting early reference to singleton '{name}'");
                return Some(Ok(early.clone()));
            }
        }

        let start = self.stack.iter().position(|n| n == name).unwrap_or(0);
        let mut chain = self.stack[start..].to_vec();
        chain.push(name.clone());
        Some(Err(BeanError::CircularDependency { chain }))
    }

    /// Takes the singleton creation lock once per request
    fn lock_creation(&mut self, name: &str) -> Result<(), BeanError> {
        if self.creation_guard.is_some() {
            return Ok(());
        }

        let container = self.container;
        let singletons = &container.singletons;
        let epoch = singletons.epoch();
        self.creation_guard = Some(singletons.lock_creation());

        if singletons.is_closed() {
            return Err(BeanError::ContainerClosed);
        }
        if let Some(error) = singletons.failure_since(name, epoch) {
            tracing::debug!("Singleton '{name}' failed in another thread while waiting for it");
            return Err(error);
        }
        Ok(())
    }

    fn create(&mut self, bean: &'c RegisteredBean) -> Result<BeanRef, BeanError> {
        let name = bean.name.clone();
        tracing::trace!("Creating bean '{name}'");

        self.stack.push(name.clone());
        self.records
            .insert(name.clone(), Record::InProgress(Phase::Constructing));

        let result = self.build(bean).map_err(|error| match error {
            BeanError::Creation { .. } => error,
            cause => BeanError::Creation {
                bean: name.clone(),
                chain: self.stack.clone(),
                source: Box::new(cause),
            },
        });

        self.stack.pop();
        self.early.remove(&name);
        match &result {
            Ok(created) if bean.definition.scope().is_singleton() => {
                self.records.insert(name, Record::Completed);
                self.pending.push(created.clone());
            }
            _ => {
                self.records.remove(&name);
            }
        }
        result
    }

    fn build(&mut self, bean: &'c RegisteredBean) -> Result<BeanRef, BeanError> {
        let definition = &bean.definition;
        let name = bean.name.as_str();

        for dependency in definition.depends_on() {
            let created = self.get_or_create(dependency, &InjectionSite::DependsOn)?;
            self.edge(name, &created);
        }

        let instance = self.instantiate(bean)?;
        let created = BeanRef::new(
            name,
            instance,
            definition.exposes.clone(),
            definition.destroy.clone(),
        );

        self.records
            .insert(name.to_string(), Record::InProgress(Phase::Populating));
        if definition.scope().is_singleton() {
            self.early.insert(name.to_string(), created.clone());
        }

        for property in definition.properties() {
            let injected = self.resolve_property(bean, property)?;
            (property.setter)(created.instance(), injected).map_err(|error| {
                BeanError::PropertyFailed {
                    bean: name.to_string(),
                    property: property.name.clone(),
                    error: Arc::new(error),
                }
            })?;
        }
        created.set_state(InstanceState::Populated);

        if let Some(init) = &definition.init {
            init(created.instance()).map_err(|error| BeanError::CallbackFailed {
                bean: name.to_string(),
                error: Arc::new(error),
            })?;
        }
        created.set_state(InstanceState::Initialized);

        tracing::debug!("Created bean '{name}' ({})", definition.scope());
        Ok(created)
    }

    fn instantiate(&mut self, bean: &'c RegisteredBean) -> Result<AnyInstance, BeanError> {
        let container = self.container;
        let definition = &bean.definition;
        let name = bean.name.as_str();

        match definition.strategy() {
            CreationStrategy::Instance(instance) => Ok(instance.clone()),
            CreationStrategy::Constructors(constructors) => {
                let (constructor, bindings) = constructor::select(
                    name,
                    constructors,
                    definition.constructor_args(),
                    &container.bind_context(),
                    &container.resolver(),
                )?;
                let args = self.resolve_arguments(bean, &constructor.params, &bindings, false)?;
                (constructor.invoke)(&args).map_err(|error| BeanError::factory_failed(name, error))
            }
            CreationStrategy::FactoryMethod(method) => {
                let factory = match &method.factory_bean {
                    Some(factory_bean) => {
                        let factory = self.get_or_create(factory_bean, &InjectionSite::FactoryBean)?;
                        self.edge(name, &factory);
                        Some(factory)
                    }
                    None => None,
                };

                let bindings = constructor::bind(
                    &method.params,
                    definition.constructor_args(),
                    &container.bind_context(),
                )
                .map_err(|reason| BeanError::NoMatchingConstructor {
                    bean: name.to_string(),
                    reason: format!("factory method '{}': {reason}", method.method_name),
                })?;
                let args = self.resolve_arguments(bean, &method.params, &bindings, true)?;
                (method.invoke)(factory.as_ref(), &args)
                    .map_err(|error| BeanError::factory_failed(name, error))
            }
        }
    }

    fn resolve_arguments(
        &mut self,
        bean: &'c RegisteredBean,
        params: &[Parameter],
        bindings: &[Binding],
        factory_method: bool,
    ) -> Result<Arguments, BeanError> {
        let mut values = Vec::with_capacity(params.len());
        for (index, (param, binding)) in params.iter().zip(bindings).enumerate() {
            let name = param.name.clone();
            let site = if factory_method {
                InjectionSite::FactoryParameter { index, name }
            } else {
                InjectionSite::ConstructorParameter { index, name }
            };

            let injected = match binding {
                Binding::Declared(arg) => self.resolve_value(bean, &arg.value, param.kind, &site)?,
                Binding::Autowired => {
                    self.autowire(bean, DependencyDescriptor::for_parameter(param, site))?
                }
            };
            values.push(injected);
        }

        let names = params.iter().map(|p| p.name.clone()).collect();
        Ok(Arguments::new(values, names))
    }

    fn resolve_property(
        &mut self,
        bean: &'c RegisteredBean,
        property: &PropertySpec,
    ) -> Result<Injected, BeanError> {
        let site = InjectionSite::Property {
            name: property.name.clone(),
        };
        match (&property.value, property.kind) {
            (Some(value), kind) => self.resolve_value(bean, value, kind, &site),
            (None, ParamType::Bean(required)) => {
                let descriptor = DependencyDescriptor {
                    required,
                    qualifier: property.qualifier.clone(),
                    name_hint: Some(property.name.clone()),
                    optional: property.optional,
                    site,
                };
                self.autowire(bean, Some(descriptor))
            }
            (None, ParamType::Value(_)) => Ok(Injected::Absent),
        }
    }

    /// Resolves a dependency by type. `None` stands for an optional value parameter.
    fn autowire(
        &mut self,
        bean: &'c RegisteredBean,
        descriptor: Option<DependencyDescriptor>,
    ) -> Result<Injected, BeanError> {
        let Some(descriptor) = descriptor else {
            return Ok(Injected::Absent);
        };

        let container = self.container;
        let Some(candidate) = container
            .resolver()
            .resolve(&descriptor, Some(bean.name.as_str()))?
        else {
            return Ok(Injected::Absent);
        };

        let created = self.get_or_create(&candidate.name, &descriptor.site)?;
        self.edge(&bean.name, &created);
        Ok(Injected::Bean(created))
    }

    /// Resolves an explicitly declared reference or literal
    fn resolve_value(
        &mut self,
        bean: &'c RegisteredBean,
        value: &ValueSpec,
        kind: ParamType,
        site: &InjectionSite,
    ) -> Result<Injected, BeanError> {
        let container = self.container;
        match (value, kind) {
            (ValueSpec::Reference(target), ParamType::Bean(required)) => {
                let created = self.get_or_create(target, site)?;
                if !created.exposes(&required) {
                    return Err(BeanError::TypeMismatch {
                        bean: created.name().to_string(),
                        required: required.type_name,
                    });
                }
                self.edge(&bean.name, &created);
                Ok(Injected::Bean(created))
            }
            (ValueSpec::Reference(target), ParamType::Value(value_type)) => {
                Err(BeanError::TypeMismatch {
                    bean: target.clone(),
                    required: value_type.name(),
                })
            }
            (ValueSpec::Literal(raw), ParamType::Value(value_type)) => {
                let text = container.properties.resolve_placeholders(raw)?;
                container
                    .converter
                    .convert(&text, value_type)
                    .map(Injected::Value)
                    .map_err(|source| BeanError::Conversion {
                        bean: bean.name.clone(),
                        site: site.clone(),
                        source,
                    })
            }
            (ValueSpec::Literal(raw), ParamType::Bean(required)) => Err(BeanError::Conversion {
                bean: bean.name.clone(),
                site: site.clone(),
                source: ConversionError::NotABean {
                    raw: raw.clone(),
                    required: required.type_name,
                },
            }),
        }
    }

    fn edge(&mut self, dependent: &str, dependency: &BeanRef) {
        self.edges
            .push((dependent.to_string(), dependency.name().to_string()));
    }
}
