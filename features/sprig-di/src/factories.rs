use std::{fmt::Debug, sync::Arc};

use crate::{
    convert::{FromLiteral, Literal},
    definition::Parameter,
    errors::BeanError,
    types::{AnyInstance, BeanRef, DynError, Injectable},
};

/// A type that describes its own constructor
///
/// Register it with [`BeanDefinition::component`](crate::definition::BeanDefinition::component).
pub trait Component: Injectable + Sized {
    /// Parameters of the constructor, in order
    fn parameters() -> Vec<Parameter>;

    /// Constructs a new instance from the resolved arguments
    fn construct(args: &Arguments) -> Result<Self, DynError>;
}

pub(crate) type ConstructFn = Arc<dyn Fn(&Arguments) -> Result<AnyInstance, DynError> + Send + Sync>;
pub(crate) type FactoryFn =
    Arc<dyn Fn(Option<&BeanRef>, &Arguments) -> Result<AnyInstance, DynError> + Send + Sync>;

/// A constructor of a bean type
#[derive(Clone)]
pub struct Constructor {
    pub(crate) params: Vec<Parameter>,
    pub(crate) invoke: ConstructFn,
}
impl Debug for Constructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constructor")
            .field("params", &self.params)
            .finish()
    }
}
impl Constructor {
    pub(crate) fn new(params: Vec<Parameter>, invoke: ConstructFn) -> Self {
        Constructor { params, invoke }
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }
}

/// A static factory method, or a method of a factory bean
#[derive(Clone)]
pub struct FactoryMethod {
    pub(crate) method_name: String,
    pub(crate) factory_bean: Option<String>,
    pub(crate) params: Vec<Parameter>,
    pub(crate) invoke: FactoryFn,
}
impl Debug for FactoryMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FactoryMethod")
            .field("method_name", &self.method_name)
            .field("factory_bean", &self.factory_bean)
            .field("params", &self.params)
            .finish()
    }
}
impl FactoryMethod {
    pub(crate) fn new(
        method_name: String,
        factory_bean: Option<String>,
        params: Vec<Parameter>,
        invoke: FactoryFn,
    ) -> Self {
        FactoryMethod {
            method_name,
            factory_bean,
            params,
            invoke,
        }
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn factory_bean(&self) -> Option<&str> {
        self.factory_bean.as_deref()
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }
}

/// How instances of a definition are obtained
#[derive(Clone)]
pub enum CreationStrategy {
    /// One or more constructors, the greediest satisfiable one wins
    Constructors(Vec<Constructor>),
    FactoryMethod(FactoryMethod),
    /// A pre-built instance
    Instance(AnyInstance),
}
impl Debug for CreationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreationStrategy::Constructors(constructors) => {
                f.debug_tuple("Constructors").field(constructors).finish()
            }
            CreationStrategy::FactoryMethod(method) => {
                f.debug_tuple("FactoryMethod").field(method).finish()
            }
            CreationStrategy::Instance(_) => f.write_str("Instance"),
        }
    }
}

/// A resolved value for one parameter or property
#[derive(Debug, Clone)]
pub enum Injected {
    Bean(BeanRef),
    Value(Literal),
    /// Optional dependency without a candidate
    Absent,
}
impl Injected {
    pub fn is_absent(&self) -> bool {
        matches!(self, Injected::Absent)
    }

    /// The injected bean as `T`
    pub fn bean<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, BeanError> {
        match self {
            Injected::Bean(bean) => bean.get::<T>(),
            Injected::Value(literal) => Err(invalid(format!(
                "expected a bean of type '{}' but got the value {literal:?}",
                std::any::type_name::<T>()
            ))),
            Injected::Absent => Err(invalid(format!(
                "no bean of type '{}' was injected",
                std::any::type_name::<T>()
            ))),
        }
    }

    /// Like [`Injected::bean`] but `None` when absent
    pub fn optional_bean<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Option<Arc<T>>, BeanError> {
        match self {
            Injected::Absent => Ok(None),
            other => other.bean::<T>().map(Some),
        }
    }

    /// The injected literal as `V`
    pub fn value<V: FromLiteral>(&self) -> Result<V, BeanError> {
        match self {
            Injected::Value(literal) => V::from_literal(literal).ok_or_else(|| {
                invalid(format!(
                    "expected a value of type {} but got {literal:?}",
                    V::VALUE_TYPE
                ))
            }),
            Injected::Bean(bean) => Err(invalid(format!(
                "expected a value of type {} but got bean '{}'",
                V::VALUE_TYPE,
                bean.name()
            ))),
            Injected::Absent => Err(invalid(format!(
                "no value of type {} was injected",
                V::VALUE_TYPE
            ))),
        }
    }
}

fn invalid(reason: String) -> BeanError {
    BeanError::InvalidArgument { index: 0, reason }
}

/// Resolved arguments handed to a constructor or factory method
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<Injected>,
    names: Vec<String>,
}
impl Arguments {
    pub(crate) fn new(values: Vec<Injected>, names: Vec<String>) -> Self {
        Arguments { values, names }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&Injected, BeanError> {
        self.values
            .get(index)
            .ok_or_else(|| BeanError::InvalidArgument {
                index,
                reason: format!("only {} arguments were resolved", self.values.len()),
            })
    }

    /// Looks up an argument by its parameter name
    pub fn by_name(&self, name: &str) -> Option<&Injected> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|index| self.values.get(index))
    }

    pub fn bean<T: ?Sized + Send + Sync + 'static>(&self, index: usize) -> Result<Arc<T>, BeanError> {
        self.get(index)?.bean::<T>().map_err(|e| at_index(e, index))
    }

    pub fn optional_bean<T: ?Sized + Send + Sync + 'static>(
        &self,
        index: usize,
    ) -> Result<Option<Arc<T>>, BeanError> {
        self.get(index)?
            .optional_bean::<T>()
            .map_err(|e| at_index(e, index))
    }

    pub fn value<V: FromLiteral>(&self, index: usize) -> Result<V, BeanError> {
        self.get(index)?.value::<V>().map_err(|e| at_index(e, index))
    }
}

fn at_index(error: BeanError, index: usize) -> BeanError {
    match error {
        BeanError::InvalidArgument { reason, .. } => BeanError::InvalidArgument { index, reason },
        other => other,
    }
}
