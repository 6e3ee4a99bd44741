use std::{collections::HashMap, fmt::Display, str::FromStr};

use crate::{
    errors::{PropertyError, RegisterSourceError},
    placeholder,
};

/// A single named set of properties.
///
/// Keys use the dotted form, e.g. `container.allow-circular-references`.
#[derive(Debug, Clone)]
pub struct PropertySource {
    name: String,
    kind: SourceKind,
}

#[derive(Debug, Clone)]
enum SourceKind {
    Map(HashMap<String, String>),
    /// Keys are looked up in relaxed form: `a.b-c` also matches `A_B_C`
    Environment(HashMap<String, String>),
}

impl PropertySource {
    /// Creates a source from key/value pairs
    pub fn from_pairs<K, V>(name: impl Into<String>, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            name: name.into(),
            kind: SourceKind::Map(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Snapshot of the process environment.
    ///
    /// Only variables starting with `prefix` are kept, with the prefix stripped.
    /// An empty prefix keeps every variable.
    pub fn from_env(prefix: &str) -> Self {
        Self::from_env_vars(prefix, std::env::vars())
    }

    /// Same as [`PropertySource::from_env`] but over an explicit set of variables
    pub fn from_env_vars(prefix: &str, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let values = vars
            .into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(prefix)
                    .map(|stripped| (stripped.trim_start_matches('_').to_string(), value))
            })
            .collect();

        Self {
            name: "environment".to_string(),
            kind: SourceKind::Environment(values),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks up a single key in this source
    pub fn get(&self, key: &str) -> Option<&str> {
        match &self.kind {
            SourceKind::Map(values) => values.get(key).map(String::as_str),
            SourceKind::Environment(values) => values
                .get(key)
                .or_else(|| values.get(&env_key(key)))
                .map(String::as_str),
        }
    }
}

/// `container.allow-circular-references` -> `CONTAINER_ALLOW_CIRCULAR_REFERENCES`
fn env_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            '.' | '-' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

/// An ordered set of property sources.
///
/// Lookups go through the sources in precedence order, the first source containing a key wins.
#[derive(Debug, Clone, Default)]
pub struct PropertySources {
    sources: Vec<PropertySource>,
}

impl PropertySources {
    /// Initializes an empty set of sources
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source with the lowest precedence.
    ///
    /// If a source with the same name is registered, it will return a
    /// [`RegisterSourceError`]
    pub fn add_last(&mut self, source: PropertySource) -> Result<&mut Self, RegisterSourceError> {
        self.ensure_unique(source.name())?;
        self.sources.push(source);
        Ok(self)
    }

    /// Adds a source with the highest precedence
    pub fn add_first(&mut self, source: PropertySource) -> Result<&mut Self, RegisterSourceError> {
        self.ensure_unique(source.name())?;
        self.sources.insert(0, source);
        Ok(self)
    }

    fn ensure_unique(&self, name: &str) -> Result<(), RegisterSourceError> {
        if self.sources.iter().any(|s| s.name() == name) {
            return Err(RegisterSourceError::AlreadyRegistered(name.to_string()));
        }
        Ok(())
    }

    /// Names of all sources, highest precedence first
    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(PropertySource::name)
    }

    /// Raw value of a key, without placeholder resolution
    pub fn get_raw(&self, key: &str) -> Option<&str> {
        self.sources.iter().find_map(|source| source.get(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get_raw(key).is_some()
    }

    /// Value of a key with all placeholders in it resolved
    pub fn get(&self, key: &str) -> Result<Option<String>, PropertyError> {
        match self.get_raw(key) {
            Some(raw) => placeholder::resolve_for_key(key, raw, self).map(Some),
            None => Ok(None),
        }
    }

    /// Value of a key parsed into `T`.
    ///
    /// Returns `Ok(None)` if the key is missing.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>, PropertyError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let Some(value) = self.get(key)? else {
            return Ok(None);
        };

        let parsed = value.trim().parse::<T>();
        parsed.map(Some).map_err(|e| PropertyError::InvalidValue {
            key: key.to_string(),
            value,
            reason: e.to_string(),
        })
    }

    /// Resolves all `${key}` and `${key:default}` placeholders in `text`
    pub fn resolve_placeholders(&self, text: &str) -> Result<String, PropertyError> {
        placeholder::resolve(text, self)
    }
}
