use std::{collections::HashMap, sync::Arc};

use crate::{
    definition::{BeanDefinition, DefinitionError},
    errors::BeanError,
    types::TypeInfo,
};

/// A definition together with the name it was registered under
#[derive(Debug)]
pub struct RegisteredBean {
    pub name: String,
    pub definition: BeanDefinition,
}

/// Holds all bean definitions in registration order
#[derive(Debug, Default)]
pub struct BeanDefinitionStore {
    beans: Vec<Arc<RegisteredBean>>,
    by_name: HashMap<String, usize>,
    /// alias -> canonical name
    aliases: HashMap<String, String>,
    allow_overriding: bool,
}

impl BeanDefinitionStore {
    pub fn new(allow_overriding: bool) -> Self {
        BeanDefinitionStore {
            allow_overriding,
            ..Default::default()
        }
    }

    /// Registers a definition together with the aliases it declares
    pub fn register(&mut self, name: &str, definition: BeanDefinition) -> Result<(), BeanError> {
        if name.is_empty() {
            return Err(BeanError::InvalidDefinition {
                name: name.to_string(),
                source: DefinitionError::EmptyName,
            });
        }

        let taken = self.by_name.contains_key(name) || self.aliases.contains_key(name);
        if taken && !self.allow_overriding {
            return Err(BeanError::DuplicateDefinition {
                name: name.to_string(),
            });
        }
        for alias in &definition.aliases {
            self.check_alias(name, alias)?;
        }

        let aliases = definition.aliases.clone();
        let bean = Arc::new(RegisteredBean {
            name: name.to_string(),
            definition,
        });

        self.aliases.remove(name);
        let existing = self.by_name.get(name).copied();
        match existing {
            Some(index) => {
                tracing::info!(
                    "Overriding definition of bean '{name}' with a definition for '{}'",
                    bean.definition.bean_type()
                );
                self.beans[index] = bean;
            }
            None => {
                tracing::debug!(
                    "Registered bean '{name}' of type '{}'",
                    bean.definition.bean_type()
                );
                self.by_name.insert(name.to_string(), self.beans.len());
                self.beans.push(bean);
            }
        }

        for alias in aliases {
            if alias != name {
                self.aliases.insert(alias, name.to_string());
            }
        }

        Ok(())
    }

    /// Adds an alias for an already registered bean
    pub fn register_alias(&mut self, name: &str, alias: &str) -> Result<(), BeanError> {
        let canonical = self.canonical_name(name).to_string();
        if !self.by_name.contains_key(&canonical) {
            return Err(BeanError::NoSuchBean {
                name: name.to_string(),
            });
        }
        if alias == canonical {
            return Ok(());
        }
        self.check_alias(&canonical, alias)?;

        tracing::debug!("Registered alias '{alias}' for bean '{canonical}'");
        self.aliases.insert(alias.to_string(), canonical);
        Ok(())
    }

    fn check_alias(&self, name: &str, alias: &str) -> Result<(), BeanError> {
        let duplicate = || BeanError::DuplicateDefinition {
            name: alias.to_string(),
        };

        if alias != name && self.by_name.contains_key(alias) {
            return Err(duplicate());
        }
        match self.aliases.get(alias) {
            Some(target) if target != name && !self.allow_overriding => Err(duplicate()),
            _ => Ok(()),
        }
    }

    /// Resolves an alias to the name the bean was registered under
    pub fn canonical_name<'a>(&'a self, name: &'a str) -> &'a str {
        self.aliases.get(name).map(String::as_str).unwrap_or(name)
    }

    pub fn lookup(&self, name: &str) -> Result<&Arc<RegisteredBean>, BeanError> {
        self.by_name
            .get(self.canonical_name(name))
            .map(|&index| &self.beans[index])
            .ok_or_else(|| BeanError::NoSuchBean {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(self.canonical_name(name))
    }

    /// All definitions in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<RegisteredBean>> {
        self.beans.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.beans.iter().map(|bean| bean.name.as_str())
    }

    pub fn aliases_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.aliases
            .iter()
            .filter(move |(_, target)| target.as_str() == name)
            .map(|(alias, _)| alias.as_str())
    }

    /// Definitions whose beans can be injected as `info`, in registration order
    pub fn definitions_assignable_to(
        &self,
        info: &TypeInfo,
    ) -> impl Iterator<Item = &Arc<RegisteredBean>> {
        let info = *info;
        self.beans
            .iter()
            .filter(move |bean| bean.definition.exposes(&info))
    }

    /// True if `name` is the bean's name or one of its aliases
    pub fn is_named(&self, bean: &RegisteredBean, name: &str) -> bool {
        bean.name == name || self.aliases.get(name).is_some_and(|target| *target == bean.name)
    }

    /// True if `qualifier` is the bean's name, one of its aliases or one of its qualifiers
    pub fn matches_qualifier(&self, bean: &RegisteredBean, qualifier: &str) -> bool {
        self.is_named(bean, qualifier)
            || bean.definition.qualifiers.iter().any(|q| q == qualifier)
    }

    pub fn len(&self) -> usize {
        self.beans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beans.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Service;

    fn service() -> BeanDefinition {
        BeanDefinition::builder::<Service>()
            .default_constructor()
            .build()
            .unwrap()
    }

    #[test]
    fn rejects_duplicates_without_overriding() {
        let mut store = BeanDefinitionStore::new(false);
        store.register("service", service()).unwrap();
        assert!(matches!(
            store.register("service", service()),
            Err(BeanError::DuplicateDefinition { name }) if name == "service"
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn overriding_keeps_registration_position() {
        let mut store = BeanDefinitionStore::new(true);
        store.register("first", service()).unwrap();
        store.register("second", service()).unwrap();
        store
            .register(
                "first",
                BeanDefinition::builder::<Service>()
                    .default_constructor()
                    .prototype()
                    .build()
                    .unwrap(),
            )
            .unwrap();

        assert_eq!(store.names().collect::<Vec<_>>(), vec!["first", "second"]);
        assert!(!store.lookup("first").unwrap().definition.scope().is_singleton());
    }

    #[test]
    fn aliases_resolve_to_the_same_definition() {
        let mut store = BeanDefinitionStore::new(false);
        let definition = BeanDefinition::builder::<Service>()
            .default_constructor()
            .alias("svc")
            .build()
            .unwrap();
        store.register("service", definition).unwrap();
        store.register_alias("svc", "the-service").unwrap();

        let direct = store.lookup("service").unwrap();
        assert!(Arc::ptr_eq(direct, store.lookup("svc").unwrap()));
        assert!(Arc::ptr_eq(direct, store.lookup("the-service").unwrap()));
        assert_eq!(store.canonical_name("the-service"), "service");

        let mut aliases = store.aliases_of("service").collect::<Vec<_>>();
        aliases.sort();
        assert_eq!(aliases, vec!["svc", "the-service"]);
    }

    #[test]
    fn alias_collisions() {
        let mut store = BeanDefinitionStore::new(false);
        store.register("one", service()).unwrap();
        store.register("two", service()).unwrap();
        store.register_alias("one", "shared").unwrap();

        assert!(matches!(
            store.register_alias("two", "shared"),
            Err(BeanError::DuplicateDefinition { .. })
        ));
        assert!(matches!(
            store.register_alias("two", "one"),
            Err(BeanError::DuplicateDefinition { .. })
        ));
        assert!(matches!(
            store.register("shared", service()),
            Err(BeanError::DuplicateDefinition { .. })
        ));
        assert!(matches!(
            store.register_alias("missing", "other"),
            Err(BeanError::NoSuchBean { .. })
        ));
    }

    #[test]
    fn unknown_names() {
        let store = BeanDefinitionStore::new(false);
        assert!(matches!(
            store.lookup("nope"),
            Err(BeanError::NoSuchBean { name }) if name == "nope"
        ));
        assert!(!store.contains("nope"));
    }
}
