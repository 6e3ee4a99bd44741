use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard, RwLock};

use crate::{errors::BeanError, types::BeanRef};

#[derive(Default)]
struct Instances {
    by_name: HashMap<String, BeanRef>,
    /// Names in the order their beans completed
    completion_order: Vec<String>,
}

/// Cache of fully initialized singletons.
///
/// Creation of singletons is serialized through one reentrant lock. A thread that waited
/// on the lock while another thread failed to create the bean it wants receives that
/// failure instead of retrying. Failures are matched through an epoch counter read before
/// waiting on the lock.
pub(crate) struct SingletonRegistry {
    instances: RwLock<Instances>,
    creation: ReentrantMutex<()>,
    failures: Mutex<HashMap<String, (u64, BeanError)>>,
    epoch: AtomicU64,
    closed: AtomicBool,
}

impl SingletonRegistry {
    pub(crate) fn new() -> Self {
        SingletonRegistry {
            instances: RwLock::new(Instances::default()),
            creation: ReentrantMutex::new(()),
            failures: Mutex::new(HashMap::new()),
            epoch: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn get(&self, name: &str) -> Option<BeanRef> {
        self.instances.read().by_name.get(name).cloned()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.instances.read().by_name.contains_key(name)
    }

    pub(crate) fn len(&self) -> usize {
        self.instances.read().by_name.len()
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Blocks until no other thread is creating singletons
    pub(crate) fn lock_creation(&self) -> ReentrantMutexGuard<'_, ()> {
        self.creation.lock()
    }

    /// A failure recorded for `name` after `since`
    pub(crate) fn failure_since(&self, name: &str, since: u64) -> Option<BeanError> {
        self.failures
            .lock()
            .get(name)
            .filter(|(epoch, _)| *epoch > since)
            .map(|(_, error)| error.clone())
    }

    /// Records a failed creation for every bean that was being created.
    /// Must be called while holding the creation lock.
    pub(crate) fn record_failure<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
        error: &BeanError,
    ) {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let mut failures = self.failures.lock();
        for name in names {
            failures.insert(name.to_string(), (epoch, error.clone()));
        }
    }

    /// Publishes completed singletons, in completion order
    pub(crate) fn commit(&self, beans: Vec<BeanRef>) {
        let mut instances = self.instances.write();
        let mut failures = self.failures.lock();
        for bean in beans {
            let name = bean.name().to_string();
            if instances.by_name.contains_key(&name) {
                tracing::warn!("Singleton '{name}' was already registered, keeping the existing instance");
                continue;
            }
            failures.remove(&name);
            instances.completion_order.push(name.clone());
            instances.by_name.insert(name, bean);
        }
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Closes the registry and hands out all singletons, latest completed first
    pub(crate) fn close(&self) -> Vec<BeanRef> {
        let _creation = self.creation.lock();
        self.closed.store(true, Ordering::Release);

        let mut instances = self.instances.write();
        let mut by_name = std::mem::take(&mut instances.by_name);
        let order = std::mem::take(&mut instances.completion_order);
        self.failures.lock().clear();

        order
            .iter()
            .rev()
            .filter_map(|name| by_name.remove(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::ExposedType;

    fn bean(name: &str) -> BeanRef {
        BeanRef::new(
            name,
            Arc::new(name.to_string()),
            Arc::from(vec![ExposedType::concrete::<String>()]),
            None,
        )
    }

    #[test]
    fn close_returns_reverse_completion_order() {
        let registry = SingletonRegistry::new();
        registry.commit(vec![bean("a"), bean("b")]);
        registry.commit(vec![bean("c")]);
        assert_eq!(registry.len(), 3);

        let closed: Vec<_> = registry.close().iter().map(|b| b.name().to_string()).collect();
        assert_eq!(closed, vec!["c", "b", "a"]);
        assert!(registry.is_closed());
        assert!(!registry.contains("a"));
    }

    #[test]
    fn first_commit_wins() {
        let registry = SingletonRegistry::new();
        let first = bean("a");
        registry.commit(vec![first.clone()]);
        registry.commit(vec![bean("a")]);
        assert!(registry.get("a").unwrap().ptr_eq(&first));
    }

    #[test]
    fn failures_are_visible_to_earlier_epochs_only() {
        let registry = SingletonRegistry::new();
        let before = registry.epoch();
        registry.record_failure(["a", "b"], &BeanError::ContainerClosed);
        let after = registry.epoch();

        assert!(registry.failure_since("a", before).is_some());
        assert!(registry.failure_since("b", before).is_some());
        assert!(registry.failure_since("a", after).is_none());
        assert!(registry.failure_since("c", before).is_none());

        registry.commit(vec![bean("a")]);
        assert!(registry.failure_since("a", before).is_none());
    }
}
