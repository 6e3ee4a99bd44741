use std::{
    fmt::Debug,
    sync::{Arc, OnceLock},
};

use thiserror::Error;

/// Target for a bean injected after construction
///
/// Beans use it as field type for property injection, the container sets it once
/// before the bean's init callback runs.
pub struct Slot<T: ?Sized>(OnceLock<Arc<T>>);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlotError {
    #[error("Slot of type '{0}' is already set")]
    AlreadySet(&'static str),
    #[error("Slot of type '{0}' was accessed before it was set")]
    Empty(&'static str),
}

impl<T: ?Sized> Default for Slot<T> {
    fn default() -> Self {
        Slot(OnceLock::new())
    }
}
impl<T: ?Sized + Debug> Debug for Slot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.get() {
            Some(value) => f.debug_tuple("Slot").field(value).finish(),
            None => f.debug_tuple("Slot").field(&"<empty>").finish(),
        }
    }
}

impl<T: ?Sized> Slot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: Arc<T>) -> Result<(), SlotError> {
        self.0
            .set(value)
            .map_err(|_| SlotError::AlreadySet(std::any::type_name::<T>()))
    }

    pub fn get(&self) -> Option<&Arc<T>> {
        self.0.get()
    }

    /// Like [`Slot::get`] but an error if nothing was injected yet
    pub fn require(&self) -> Result<&Arc<T>, SlotError> {
        self.0
            .get()
            .ok_or(SlotError::Empty(std::any::type_name::<T>()))
    }

    pub fn is_set(&self) -> bool {
        self.0.get().is_some()
    }
}
