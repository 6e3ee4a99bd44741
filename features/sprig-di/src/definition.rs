use std::{collections::HashSet, fmt::Display, marker::PhantomData, sync::Arc};

use thiserror::Error;

use crate::{
    convert::{FromLiteral, ValueType},
    factories::{Arguments, Component, Constructor, CreationStrategy, FactoryMethod, Injected},
    types::{AnyInstance, BeanRef, DynError, ExposedType, Injectable, LifecycleFn, TypeInfo},
};

/// Lifetime of the instances created from a definition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// One shared instance per container
    #[default]
    Singleton,
    /// A fresh instance for every lookup or injection
    Prototype,
    /// Instances are managed by a registered [`CustomScope`](crate::scope::CustomScope)
    Custom(String),
}
impl Scope {
    pub fn custom(name: impl Into<String>) -> Self {
        Scope::Custom(name.into())
    }

    pub fn is_singleton(&self) -> bool {
        matches!(self, Scope::Singleton)
    }
}
impl Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Singleton => f.write_str("singleton"),
            Scope::Prototype => f.write_str("prototype"),
            Scope::Custom(name) => f.write_str(name),
        }
    }
}

/// Value of a constructor argument or property
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSpec {
    /// Another bean, by name or alias
    Reference(String),
    /// Literal text, placeholder-resolved and converted to the target type
    Literal(String),
}

/// What a parameter or property accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    Bean(TypeInfo),
    Value(ValueType),
}
impl ParamType {
    pub fn bean<T: ?Sized + 'static>() -> Self {
        ParamType::Bean(TypeInfo::of::<T>())
    }

    pub fn value<V: FromLiteral>() -> Self {
        ParamType::Value(V::VALUE_TYPE)
    }
}
impl Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParamType::Bean(info) => info.fmt(f),
            ParamType::Value(value_type) => value_type.fmt(f),
        }
    }
}

/// A declared constructor or factory-method parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub kind: ParamType,
    /// Resolves to [`Injected::Absent`] instead of failing when nothing matches
    pub optional: bool,
    pub qualifier: Option<String>,
}
impl Parameter {
    pub fn bean<T: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Parameter {
            name: name.into(),
            kind: ParamType::bean::<T>(),
            optional: false,
            qualifier: None,
        }
    }

    pub fn value<V: FromLiteral>(name: impl Into<String>) -> Self {
        Parameter {
            name: name.into(),
            kind: ParamType::value::<V>(),
            optional: false,
            qualifier: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }
}

/// A declared constructor argument.
///
/// Hints decide which parameter the argument is bound to, in order of precedence:
/// explicit index, explicit name, explicit type, then type-based matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstructorArg {
    pub index: Option<usize>,
    pub name: Option<String>,
    pub declared_type: Option<ParamType>,
    pub value: ValueSpec,
}
impl ConstructorArg {
    pub fn reference(bean_name: impl Into<String>) -> Self {
        Self::new(ValueSpec::Reference(bean_name.into()))
    }

    pub fn value(raw: impl Into<String>) -> Self {
        Self::new(ValueSpec::Literal(raw.into()))
    }

    fn new(value: ValueSpec) -> Self {
        ConstructorArg {
            index: None,
            name: None,
            declared_type: None,
            value,
        }
    }

    pub fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn typed(mut self, declared_type: ParamType) -> Self {
        self.declared_type = Some(declared_type);
        self
    }
}

pub(crate) type SetterFn = Arc<dyn Fn(&AnyInstance, Injected) -> Result<(), DynError> + Send + Sync>;

/// A property injected after construction
#[derive(Clone)]
pub struct PropertySpec {
    pub(crate) name: String,
    pub(crate) kind: ParamType,
    /// `None` autowires by type
    pub(crate) value: Option<ValueSpec>,
    pub(crate) optional: bool,
    pub(crate) qualifier: Option<String>,
    pub(crate) setter: SetterFn,
}
impl std::fmt::Debug for PropertySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertySpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("optional", &self.optional)
            .field("qualifier", &self.qualifier)
            .finish()
    }
}
impl PropertySpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ParamType {
        self.kind
    }

    pub fn value(&self) -> Option<&ValueSpec> {
        self.value.as_ref()
    }
}

/// Errors in a definition itself, independent of other beans
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("bean names must not be empty")]
    EmptyName,
    #[error("no constructor, factory method or instance was given")]
    MissingCreationStrategy,
    #[error("both constructors and a factory method were given")]
    ConflictingCreationStrategies,
    #[error("constructor argument index {0} is declared twice")]
    DuplicateArgumentIndex(usize),
    #[error("property '{0}' is declared twice")]
    DuplicateProperty(String),
    #[error("a bean cannot be both primary and fallback")]
    PrimaryAndFallback,
}

/// Optional hooks a bean type can implement, registered with [`BeanDefinitionBuilder::lifecycle`]
pub trait Lifecycle: Injectable {
    /// Called once after all properties are injected
    fn init(&self) -> Result<(), DynError> {
        Ok(())
    }

    /// Called once when the owning scope or container shuts down
    fn destroy(&self) -> Result<(), DynError> {
        Ok(())
    }
}

/// Declarative description of how to create and wire one bean
pub struct BeanDefinition {
    pub(crate) strategy: CreationStrategy,
    pub(crate) constructor_args: Vec<ConstructorArg>,
    pub(crate) properties: Vec<PropertySpec>,
    pub(crate) scope: Scope,
    pub(crate) primary: bool,
    pub(crate) fallback: bool,
    /// `None` follows the container default
    pub(crate) lazy_init: Option<bool>,
    pub(crate) autowire_candidate: bool,
    pub(crate) aliases: Vec<String>,
    pub(crate) qualifiers: Vec<String>,
    pub(crate) depends_on: Vec<String>,
    pub(crate) exposes: Arc<[ExposedType]>,
    pub(crate) init: Option<LifecycleFn>,
    pub(crate) destroy: Option<LifecycleFn>,
}
impl std::fmt::Debug for BeanDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanDefinition")
            .field("type", &self.bean_type().type_name)
            .field("strategy", &self.strategy)
            .field("scope", &self.scope)
            .field("primary", &self.primary)
            .field("fallback", &self.fallback)
            .field("lazy_init", &self.lazy_init)
            .field("aliases", &self.aliases)
            .field("depends_on", &self.depends_on)
            .field("constructor_args", &self.constructor_args)
            .field("properties", &self.properties)
            .finish()
    }
}

impl BeanDefinition {
    /// Starts a definition for beans of type `T`
    pub fn builder<T: Injectable>() -> BeanDefinitionBuilder<T> {
        BeanDefinitionBuilder::new()
    }

    /// Definition for a type implementing [`Component`]
    pub fn component<T: Component>() -> BeanDefinitionBuilder<T> {
        BeanDefinitionBuilder::new().constructor(T::parameters(), T::construct)
    }

    /// A pre-built singleton
    pub fn instance<T: Injectable>(instance: T) -> BeanDefinition {
        BeanDefinition {
            strategy: CreationStrategy::Instance(Arc::new(instance)),
            constructor_args: Vec::new(),
            properties: Vec::new(),
            scope: Scope::Singleton,
            primary: false,
            fallback: false,
            lazy_init: Some(false),
            autowire_candidate: true,
            aliases: Vec::new(),
            qualifiers: Vec::new(),
            depends_on: Vec::new(),
            exposes: Arc::from(vec![ExposedType::concrete::<T>()]),
            init: None,
            destroy: None,
        }
    }

    /// The concrete type of the created instances
    pub fn bean_type(&self) -> TypeInfo {
        self.exposes[0].info
    }

    /// True if beans of this definition can be injected as `info`
    pub fn exposes(&self, info: &TypeInfo) -> bool {
        self.exposes.iter().any(|e| e.info.type_id == info.type_id)
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    pub fn lazy_init(&self) -> Option<bool> {
        self.lazy_init
    }

    pub fn is_autowire_candidate(&self) -> bool {
        self.autowire_candidate
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn qualifiers(&self) -> &[String] {
        &self.qualifiers
    }

    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    pub fn constructor_args(&self) -> &[ConstructorArg] {
        &self.constructor_args
    }

    pub fn properties(&self) -> &[PropertySpec] {
        &self.properties
    }

    pub fn strategy(&self) -> &CreationStrategy {
        &self.strategy
    }
}

/// Builder for [`BeanDefinition`]s of beans of type `T`
pub struct BeanDefinitionBuilder<T: Injectable> {
    constructors: Vec<Constructor>,
    factory_method: Option<FactoryMethod>,
    constructor_args: Vec<ConstructorArg>,
    properties: Vec<PropertySpec>,
    scope: Scope,
    primary: bool,
    fallback: bool,
    lazy_init: Option<bool>,
    autowire_candidate: bool,
    aliases: Vec<String>,
    qualifiers: Vec<String>,
    depends_on: Vec<String>,
    exposes: Vec<ExposedType>,
    init: Option<LifecycleFn>,
    destroy: Option<LifecycleFn>,
    _type: PhantomData<fn() -> T>,
}

impl<T: Injectable> BeanDefinitionBuilder<T> {
    fn new() -> Self {
        BeanDefinitionBuilder {
            constructors: Vec::new(),
            factory_method: None,
            constructor_args: Vec::new(),
            properties: Vec::new(),
            scope: Scope::Singleton,
            primary: false,
            fallback: false,
            lazy_init: None,
            autowire_candidate: true,
            aliases: Vec::new(),
            qualifiers: Vec::new(),
            depends_on: Vec::new(),
            exposes: vec![ExposedType::concrete::<T>()],
            init: None,
            destroy: None,
            _type: PhantomData,
        }
    }

    /// Adds a constructor. A type may declare several, the greediest satisfiable one is used.
    pub fn constructor<F>(mut self, params: impl IntoIterator<Item = Parameter>, construct: F) -> Self
    where
        F: Fn(&Arguments) -> Result<T, DynError> + Send + Sync + 'static,
    {
        self.constructors.push(Constructor::new(
            params.into_iter().collect(),
            Arc::new(move |args: &Arguments| {
                construct(args).map(|instance| Arc::new(instance) as AnyInstance)
            }),
        ));
        self
    }

    /// Adds a constructor without parameters
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor([], |_| Ok(T::default()))
    }

    /// Creates instances through a static factory method
    pub fn factory_method<F>(
        mut self,
        method_name: impl Into<String>,
        params: impl IntoIterator<Item = Parameter>,
        produce: F,
    ) -> Self
    where
        F: Fn(&Arguments) -> Result<T, DynError> + Send + Sync + 'static,
    {
        self.factory_method = Some(FactoryMethod::new(
            method_name.into(),
            None,
            params.into_iter().collect(),
            Arc::new(move |_: Option<&BeanRef>, args: &Arguments| {
                produce(args).map(|instance| Arc::new(instance) as AnyInstance)
            }),
        ));
        self
    }

    /// Creates instances through a method of another bean, the factory bean
    pub fn instance_factory<Factory, F>(
        mut self,
        factory_bean: impl Into<String>,
        method_name: impl Into<String>,
        params: impl IntoIterator<Item = Parameter>,
        produce: F,
    ) -> Self
    where
        Factory: ?Sized + Send + Sync + 'static,
        F: Fn(&Factory, &Arguments) -> Result<T, DynError> + Send + Sync + 'static,
    {
        self.factory_method = Some(FactoryMethod::new(
            method_name.into(),
            Some(factory_bean.into()),
            params.into_iter().collect(),
            Arc::new(move |factory: Option<&BeanRef>, args: &Arguments| {
                let factory = factory
                    .ok_or("instance factory method invoked without its factory bean")?
                    .get::<Factory>()?;
                produce(&factory, args).map(|instance| Arc::new(instance) as AnyInstance)
            }),
        ));
        self
    }

    pub fn arg(mut self, arg: ConstructorArg) -> Self {
        self.constructor_args.push(arg);
        self
    }

    pub fn args(mut self, args: impl IntoIterator<Item = ConstructorArg>) -> Self {
        self.constructor_args.extend(args);
        self
    }

    /// Property set from a literal value
    pub fn property_value<V, F>(self, name: impl Into<String>, raw: impl Into<String>, set: F) -> Self
    where
        V: FromLiteral,
        F: Fn(&T, V) -> Result<(), DynError> + Send + Sync + 'static,
    {
        self.push_property(
            name.into(),
            ParamType::value::<V>(),
            Some(ValueSpec::Literal(raw.into())),
            false,
            None,
            move |bean, injected| set(bean, injected.value::<V>()?),
        )
    }

    /// Property set to another bean, by name
    pub fn property_ref<U, F>(self, name: impl Into<String>, bean_name: impl Into<String>, set: F) -> Self
    where
        U: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Arc<U>) -> Result<(), DynError> + Send + Sync + 'static,
    {
        self.push_property(
            name.into(),
            ParamType::bean::<U>(),
            Some(ValueSpec::Reference(bean_name.into())),
            false,
            None,
            move |bean, injected| set(bean, injected.bean::<U>()?),
        )
    }

    /// Property set to the single bean of type `U`, the property name is used as name hint
    pub fn property_autowired<U, F>(self, name: impl Into<String>, set: F) -> Self
    where
        U: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Arc<U>) -> Result<(), DynError> + Send + Sync + 'static,
    {
        self.push_property(
            name.into(),
            ParamType::bean::<U>(),
            None,
            false,
            None,
            move |bean, injected| set(bean, injected.bean::<U>()?),
        )
    }

    /// Like [`Self::property_autowired`] but restricted to beans matching `qualifier`
    pub fn property_qualified<U, F>(
        self,
        name: impl Into<String>,
        qualifier: impl Into<String>,
        set: F,
    ) -> Self
    where
        U: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Arc<U>) -> Result<(), DynError> + Send + Sync + 'static,
    {
        self.push_property(
            name.into(),
            ParamType::bean::<U>(),
            None,
            false,
            Some(qualifier.into()),
            move |bean, injected| set(bean, injected.bean::<U>()?),
        )
    }

    /// Autowired property that is left alone if no bean of type `U` exists
    pub fn property_optional<U, F>(self, name: impl Into<String>, set: F) -> Self
    where
        U: ?Sized + Send + Sync + 'static,
        F: Fn(&T, Option<Arc<U>>) -> Result<(), DynError> + Send + Sync + 'static,
    {
        self.push_property(
            name.into(),
            ParamType::bean::<U>(),
            None,
            true,
            None,
            move |bean, injected| set(bean, injected.optional_bean::<U>()?),
        )
    }

    fn push_property<F>(
        mut self,
        name: String,
        kind: ParamType,
        value: Option<ValueSpec>,
        optional: bool,
        qualifier: Option<String>,
        set: F,
    ) -> Self
    where
        F: Fn(&T, Injected) -> Result<(), DynError> + Send + Sync + 'static,
    {
        self.properties.push(PropertySpec {
            name,
            kind,
            value,
            optional,
            qualifier,
            setter: Arc::new(move |instance: &AnyInstance, injected| {
                let bean = instance
                    .downcast_ref::<T>()
                    .ok_or("property target has an unexpected type")?;
                set(bean, injected)
            }),
        });
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn prototype(self) -> Self {
        self.scope(Scope::Prototype)
    }

    /// Preferred candidate when several beans match a single-valued dependency
    pub fn primary(mut self) -> Self {
        self.primary = true;
        self
    }

    /// Only used when no other candidate matches
    pub fn fallback(mut self) -> Self {
        self.fallback = true;
        self
    }

    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy_init = Some(lazy);
        self
    }

    /// Excluded from type-based autowiring, still available by name
    pub fn autowire_candidate(mut self, candidate: bool) -> Self {
        self.autowire_candidate = candidate;
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifiers.push(qualifier.into());
        self
    }

    /// Beans that must be created before this one, without being injected
    pub fn depends_on(mut self, bean_name: impl Into<String>) -> Self {
        self.depends_on.push(bean_name.into());
        self
    }

    /// Makes the bean injectable as `I`, usually a `dyn Trait`
    pub fn exposes<I, F>(mut self, cast: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        self.exposes.push(ExposedType::interface::<T, I, F>(cast));
        self
    }

    /// Callback invoked after all properties are injected
    pub fn init<F>(mut self, init: F) -> Self
    where
        F: Fn(&T) -> Result<(), DynError> + Send + Sync + 'static,
    {
        self.init = Some(lifecycle_fn(init));
        self
    }

    /// Callback invoked when the bean is destroyed
    pub fn destroy<F>(mut self, destroy: F) -> Self
    where
        F: Fn(&T) -> Result<(), DynError> + Send + Sync + 'static,
    {
        self.destroy = Some(lifecycle_fn(destroy));
        self
    }

    /// Registers the [`Lifecycle`] hooks of `T`
    pub fn lifecycle(self) -> Self
    where
        T: Lifecycle,
    {
        self.init(T::init).destroy(T::destroy)
    }

    pub fn build(self) -> Result<BeanDefinition, DefinitionError> {
        let strategy = match (self.constructors.is_empty(), self.factory_method) {
            (true, None) => return Err(DefinitionError::MissingCreationStrategy),
            (false, Some(_)) => return Err(DefinitionError::ConflictingCreationStrategies),
            (false, None) => CreationStrategy::Constructors(self.constructors),
            (true, Some(factory_method)) => CreationStrategy::FactoryMethod(factory_method),
        };

        if self.primary && self.fallback {
            return Err(DefinitionError::PrimaryAndFallback);
        }

        let mut indexes = HashSet::new();
        for index in self.constructor_args.iter().filter_map(|a| a.index) {
            if !indexes.insert(index) {
                return Err(DefinitionError::DuplicateArgumentIndex(index));
            }
        }

        let mut property_names = HashSet::new();
        for property in &self.properties {
            if !property_names.insert(property.name.as_str()) {
                return Err(DefinitionError::DuplicateProperty(property.name.clone()));
            }
        }

        Ok(BeanDefinition {
            strategy,
            constructor_args: self.constructor_args,
            properties: self.properties,
            scope: self.scope,
            primary: self.primary,
            fallback: self.fallback,
            lazy_init: self.lazy_init,
            autowire_candidate: self.autowire_candidate,
            aliases: self.aliases,
            qualifiers: self.qualifiers,
            depends_on: self.depends_on,
            exposes: Arc::from(self.exposes),
            init: self.init,
            destroy: self.destroy,
        })
    }
}

fn lifecycle_fn<T, F>(callback: F) -> LifecycleFn
where
    T: Injectable,
    F: Fn(&T) -> Result<(), DynError> + Send + Sync + 'static,
{
    Arc::new(move |instance: &AnyInstance| {
        let bean = instance
            .downcast_ref::<T>()
            .ok_or("lifecycle callback target has an unexpected type")?;
        callback(bean)
    })
}
