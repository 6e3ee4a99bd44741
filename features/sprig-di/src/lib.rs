//! Sprig DI is a bean container: it creates objects from declarative definitions,
//! wires them together and manages their lifecycle.
//!
//! Sprig DI is split into two major parts:
//! 1. Registration: [`ContainerBuilder`] collects [`BeanDefinition`]s, aliases and scopes
//! 2. Instantiation: the [`Container`] creates beans on demand, resolving constructor
//!    arguments, properties and `depends_on` declarations
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use sprig_di::{BeanDefinition, Container, ConstructorArg, Parameter};
//!
//! struct Pool {
//!     size: u32,
//! }
//! struct Repository {
//!     pool: Arc<Pool>,
//! }
//!
//! let mut builder = Container::builder();
//! builder
//!     .bean(
//!         "pool",
//!         BeanDefinition::builder::<Pool>()
//!             .constructor([Parameter::value::<u32>("size")], |args| {
//!                 Ok(Pool { size: args.value(0)? })
//!             })
//!             .arg(ConstructorArg::value("8")),
//!     )
//!     .unwrap()
//!     .bean(
//!         "repository",
//!         BeanDefinition::builder::<Repository>()
//!             .constructor([Parameter::bean::<Pool>("pool")], |args| {
//!                 Ok(Repository { pool: args.bean(0)? })
//!             }),
//!     )
//!     .unwrap();
//!
//! let container = builder.build().unwrap();
//! container.start().unwrap();
//!
//! let repository = container.get_as::<Repository>("repository").unwrap();
//! assert_eq!(repository.pool.size, 8);
//! container.shutdown();
//! ```
//!
//! Sprig DI consists of the following components:
//!
//! 1. Definition - declarative bean descriptions and their builder
//! 2. Store - registered definitions and aliases
//! 3. Convert - conversion of literal values
//! 4. Resolver - picking the bean for a dependency and the constructor to call
//! 5. Instantiation - creating beans, detecting circular references
//! 6. Container - lookups, start and shutdown
//! 7. Scope - custom scopes such as the request scope

pub mod builder;
pub mod config;
pub mod container;
pub mod convert;
pub mod definition;
pub mod dependency_graph;
pub mod errors;
pub mod factories;
mod instantiation;
pub mod resolver;
pub mod scope;
mod singletons;
pub mod slot;
pub mod store;
pub mod types;

pub use builder::{ConfigurationLoader, ContainerBuilder};
pub use config::ContainerConfig;
pub use container::Container;
pub use convert::{ConversionError, Converter, DefaultConverter, FromLiteral, Literal, ValueType};
pub use definition::{
    BeanDefinition, BeanDefinitionBuilder, ConstructorArg, DefinitionError, Lifecycle, ParamType,
    Parameter, PropertySpec, Scope, ValueSpec,
};
pub use dependency_graph::{DependencyGraphError, DependencyGraphErrors};
pub use errors::BeanError;
pub use factories::{Arguments, Component, Injected};
pub use resolver::{DependencyDescriptor, DependencyResolver, InjectionSite};
pub use scope::{CustomScope, RequestScope};
pub use slot::{Slot, SlotError};
pub use sprig_config::{PropertySource, PropertySources};
pub use types::{BeanRef, DynError, Injectable, InstanceState, TypeInfo};
