use std::{
    collections::HashMap,
    thread::{self, ThreadId},
};

use parking_lot::Mutex;

use crate::{errors::BeanError, types::BeanRef};

/// Creation callback handed to a [`CustomScope`]
pub type ObjectFactory<'a> = dyn FnMut() -> Result<BeanRef, BeanError> + 'a;

/// A scope managing bean instances outside the container, e.g. one instance per request
///
/// If a lookup fails after `create` produced an instance, the container removes that
/// instance again and destroys it.
pub trait CustomScope: Send + Sync {
    /// Returns the scoped instance for `name`, using `create` if there is none yet
    fn get(&self, name: &str, create: &mut ObjectFactory<'_>) -> Result<BeanRef, BeanError>;

    /// Removes the scoped instance without destroying it
    fn remove(&self, name: &str) -> Option<BeanRef>;

    /// Called when the container shuts down
    fn close(&self) {}
}

/// One instance per bean and thread, until the thread ends its request.
///
/// A thread stands for a request. Call [`RequestScope::end_request`] when the request is done.
#[derive(Default)]
pub struct RequestScope {
    requests: Mutex<HashMap<ThreadId, HashMap<String, BeanRef>>>,
}

impl RequestScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Destroys and forgets all instances of the calling thread's request
    pub fn end_request(&self) {
        let beans = self.requests.lock().remove(&thread::current().id());
        for bean in beans.into_iter().flat_map(HashMap::into_values) {
            destroy(&bean);
        }
    }

    /// Number of instances held for the calling thread
    pub fn active_beans(&self) -> usize {
        self.requests
            .lock()
            .get(&thread::current().id())
            .map_or(0, HashMap::len)
    }
}

impl CustomScope for RequestScope {
    fn get(&self, name: &str, create: &mut ObjectFactory<'_>) -> Result<BeanRef, BeanError> {
        let request = thread::current().id();
        if let Some(bean) = self
            .requests
            .lock()
            .get(&request)
            .and_then(|beans| beans.get(name))
        {
            return Ok(bean.clone());
        }

        // Created without holding the lock, creation may resolve other request beans
        let created = create()?;
        let mut requests = self.requests.lock();
        let bean = requests
            .entry(request)
            .or_default()
            .entry(name.to_string())
            .or_insert(created);
        Ok(bean.clone())
    }

    fn remove(&self, name: &str) -> Option<BeanRef> {
        self.requests
            .lock()
            .get_mut(&thread::current().id())
            .and_then(|beans| beans.remove(name))
    }

    fn close(&self) {
        let requests = std::mem::take(&mut *self.requests.lock());
        for bean in requests.into_values().flat_map(HashMap::into_values) {
            destroy(&bean);
        }
    }
}

fn destroy(bean: &BeanRef) {
    if let Err(error) = bean.destroy() {
        tracing::warn!("Destroying request bean '{}' failed: {error}", bean.name());
    }
}
