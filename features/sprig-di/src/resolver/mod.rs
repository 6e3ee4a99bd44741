use std::{fmt::Display, sync::Arc};

use crate::{
    definition::{ParamType, Parameter},
    errors::BeanError,
    store::{BeanDefinitionStore, RegisteredBean},
    types::TypeInfo,
};

pub(crate) mod constructor;

/// Where a dependency is injected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectionSite {
    ConstructorParameter { index: usize, name: String },
    FactoryParameter { index: usize, name: String },
    Property { name: String },
    DependsOn,
    /// The bean owning an instance factory method
    FactoryBean,
    /// A lookup through the container
    Lookup,
}
impl InjectionSite {
    /// Sites resolved before the dependent instance exists.
    /// Circular references through these can never be satisfied.
    pub fn is_constructor_phase(&self) -> bool {
        !matches!(self, InjectionSite::Property { .. })
    }
}
impl Display for InjectionSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InjectionSite::ConstructorParameter { index, name } => {
                write!(f, "constructor parameter {index} '{name}'")
            }
            InjectionSite::FactoryParameter { index, name } => {
                write!(f, "factory method parameter {index} '{name}'")
            }
            InjectionSite::Property { name } => write!(f, "property '{name}'"),
            InjectionSite::DependsOn => f.write_str("depends-on"),
            InjectionSite::FactoryBean => f.write_str("factory bean"),
            InjectionSite::Lookup => f.write_str("lookup"),
        }
    }
}

/// A dependency to be resolved by type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDescriptor {
    pub required: TypeInfo,
    /// Hard filter: only beans with this name, alias or qualifier are candidates
    pub qualifier: Option<String>,
    /// Soft filter: preferred when several candidates remain
    pub name_hint: Option<String>,
    pub optional: bool,
    pub site: InjectionSite,
}
impl DependencyDescriptor {
    pub fn new(required: TypeInfo, site: InjectionSite) -> Self {
        DependencyDescriptor {
            required,
            qualifier: None,
            name_hint: None,
            optional: false,
            site,
        }
    }

    /// Descriptor for a container lookup of `T`
    pub fn lookup<T: ?Sized + 'static>() -> Self {
        Self::new(TypeInfo::of::<T>(), InjectionSite::Lookup)
    }

    /// Descriptor for a bean parameter, `None` for value parameters
    pub(crate) fn for_parameter(param: &Parameter, site: InjectionSite) -> Option<Self> {
        let ParamType::Bean(required) = param.kind else {
            return None;
        };
        Some(DependencyDescriptor {
            required,
            qualifier: param.qualifier.clone(),
            name_hint: Some(param.name.clone()),
            optional: param.optional,
            site,
        })
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn with_name_hint(mut self, name: impl Into<String>) -> Self {
        self.name_hint = Some(name.into());
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

/// Definitions matching a descriptor, in registration order
#[derive(Debug, Clone, Default)]
pub struct CandidateSet<'a> {
    candidates: Vec<&'a Arc<RegisteredBean>>,
}
impl<'a> CandidateSet<'a> {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Arc<RegisteredBean>> + '_ {
        self.candidates.iter().copied()
    }

    pub fn names(&self) -> Vec<String> {
        self.candidates.iter().map(|c| c.name.clone()).collect()
    }
}

/// Selects the definition that satisfies a dependency
pub struct DependencyResolver<'a> {
    store: &'a BeanDefinitionStore,
    allow_self_injection: bool,
}

impl<'a> DependencyResolver<'a> {
    pub fn new(store: &'a BeanDefinitionStore, allow_self_injection: bool) -> Self {
        DependencyResolver {
            store,
            allow_self_injection,
        }
    }

    /// All definitions assignable to the required type that pass the qualifier.
    ///
    /// `requesting` is never a candidate for its own dependencies,
    /// unless self injection is allowed and nothing else matches.
    pub fn candidates(
        &self,
        descriptor: &DependencyDescriptor,
        requesting: Option<&str>,
    ) -> CandidateSet<'a> {
        let store = self.store;
        let mut itself = None;
        let mut candidates = Vec::new();

        for bean in store.definitions_assignable_to(&descriptor.required) {
            if !bean.definition.is_autowire_candidate() {
                continue;
            }
            if let Some(qualifier) = &descriptor.qualifier {
                if !store.matches_qualifier(bean, qualifier) {
                    continue;
                }
            }
            if requesting == Some(bean.name.as_str()) {
                itself = Some(bean);
                continue;
            }
            candidates.push(bean);
        }

        if candidates.is_empty() && self.allow_self_injection {
            candidates.extend(itself);
        }

        CandidateSet { candidates }
    }

    /// Resolves a descriptor to a single definition.
    ///
    /// With several candidates the name hint is tried first, then a single primary bean,
    /// then the only candidate not marked as fallback.
    /// A single primary bean is chosen even when fallbacks and plain candidates compete,
    /// fallback filtering only applies without one.
    /// Returns `None` only for optional dependencies without any candidate.
    pub fn resolve(
        &self,
        descriptor: &DependencyDescriptor,
        requesting: Option<&str>,
    ) -> Result<Option<&'a Arc<RegisteredBean>>, BeanError> {
        let candidates = self.candidates(descriptor, requesting);
        let dependent = || requesting.unwrap_or("<container>").to_string();

        match candidates.len() {
            0 if descriptor.optional => Ok(None),
            0 => Err(BeanError::UnsatisfiedDependency {
                bean: dependent(),
                site: descriptor.site.clone(),
                required: descriptor.required,
            }),
            1 => Ok(candidates.iter().next()),
            _ => self
                .disambiguate(descriptor, candidates.candidates)
                .map(Some)
                .map_err(|remaining| BeanError::AmbiguousDependency {
                    bean: dependent(),
                    site: descriptor.site.clone(),
                    required: descriptor.required,
                    candidates: remaining,
                }),
        }
    }

    fn disambiguate(
        &self,
        descriptor: &DependencyDescriptor,
        mut remaining: Vec<&'a Arc<RegisteredBean>>,
    ) -> Result<&'a Arc<RegisteredBean>, Vec<String>> {
        if let Some(hint) = &descriptor.name_hint {
            let named: Vec<_> = remaining
                .iter()
                .copied()
                .filter(|bean| self.store.is_named(bean, hint))
                .collect();
            if !named.is_empty() {
                remaining = named;
            }
        }
        if let [only] = remaining.as_slice() {
            return Ok(*only);
        }

        let primaries: Vec<_> = remaining
            .iter()
            .copied()
            .filter(|bean| bean.definition.is_primary())
            .collect();
        if let [primary] = primaries.as_slice() {
            return Ok(*primary);
        }

        let regular: Vec<_> = remaining
            .iter()
            .copied()
            .filter(|bean| !bean.definition.is_fallback())
            .collect();
        if let [only] = regular.as_slice() {
            return Ok(*only);
        }

        let ambiguous = if regular.is_empty() { remaining } else { regular };
        Err(ambiguous.iter().map(|bean| bean.name.clone()).collect())
    }
}
