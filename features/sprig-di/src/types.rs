use std::{
    any::{Any, TypeId},
    fmt::Debug,
    sync::{
        atomic::{AtomicU8, Ordering},
        Arc,
    },
};

use crate::errors::BeanError;

/// All errors must be clone
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Anything managed by the container can be shared between threads,
/// so beans need to be Send + Sync + 'static
pub trait Injectable: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Injectable for T {}

/// A type erased bean instance
pub type AnyInstance = Arc<dyn Any + Send + Sync + 'static>;

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }
}

type UpcastFn = dyn Fn(AnyInstance) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync;

/// A type a bean can be injected as.
///
/// The upcast turns the erased instance into a boxed `Arc<T>` of the exposed type.
#[derive(Clone)]
pub struct ExposedType {
    pub info: TypeInfo,
    upcast: Arc<UpcastFn>,
}
impl Debug for ExposedType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.info.type_name)
    }
}
impl ExposedType {
    /// The concrete type itself
    pub(crate) fn concrete<T: Injectable>() -> Self {
        ExposedType {
            info: TypeInfo::of::<T>(),
            upcast: Arc::new(|instance: AnyInstance| {
                Arc::downcast::<T>(instance)
                    .ok()
                    .map(|concrete| Box::new(concrete) as Box<dyn Any + Send + Sync>)
            }),
        }
    }

    /// An interface `I` implemented by the concrete type `T`
    pub(crate) fn interface<T, I, F>(cast: F) -> Self
    where
        T: Injectable,
        I: ?Sized + Send + Sync + 'static,
        F: Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static,
    {
        ExposedType {
            info: TypeInfo::of::<I>(),
            upcast: Arc::new(move |instance: AnyInstance| {
                Arc::downcast::<T>(instance)
                    .ok()
                    .map(|concrete| Box::new(cast(concrete)) as Box<dyn Any + Send + Sync>)
            }),
        }
    }
}

/// Lifecycle state of a single bean instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum InstanceState {
    /// Constructed, properties not yet injected. Early references are handed out in this state.
    Raw = 0,
    /// All properties injected, init callback not yet run
    Populated = 1,
    /// Fully initialized
    Initialized = 2,
    /// Destroy callback has run
    Destroyed = 3,
}
impl InstanceState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => InstanceState::Raw,
            1 => InstanceState::Populated,
            2 => InstanceState::Initialized,
            _ => InstanceState::Destroyed,
        }
    }
}

pub(crate) type LifecycleFn = Arc<dyn Fn(&AnyInstance) -> Result<(), DynError> + Send + Sync>;

/// Handle to a bean instance
///
/// Cheap to clone, all clones share the same instance and lifecycle state.
#[derive(Clone)]
pub struct BeanRef(Arc<BeanRefInner>);
struct BeanRefInner {
    name: String,
    instance: AnyInstance,
    exposes: Arc<[ExposedType]>,
    state: AtomicU8,
    destroy: Option<LifecycleFn>,
}
impl Debug for BeanRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanRef")
            .field("name", &self.0.name)
            .field("state", &self.state())
            .field("exposes", &self.0.exposes)
            .finish()
    }
}

impl BeanRef {
    pub(crate) fn new(
        name: &str,
        instance: AnyInstance,
        exposes: Arc<[ExposedType]>,
        destroy: Option<LifecycleFn>,
    ) -> Self {
        BeanRef(Arc::new(BeanRefInner {
            name: name.to_string(),
            instance,
            exposes,
            state: AtomicU8::new(InstanceState::Raw as u8),
            destroy,
        }))
    }

    /// Name of the bean this instance was created for
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn state(&self) -> InstanceState {
        InstanceState::from_u8(self.0.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: InstanceState) {
        self.0.state.store(state as u8, Ordering::Release);
    }

    /// The type erased instance
    pub fn instance(&self) -> &AnyInstance {
        &self.0.instance
    }

    pub fn exposes(&self, info: &TypeInfo) -> bool {
        self.0.exposes.iter().any(|e| e.info.type_id == info.type_id)
    }

    /// Types this bean can be injected as
    pub fn exposed_types(&self) -> impl Iterator<Item = &TypeInfo> {
        self.0.exposes.iter().map(|e| &e.info)
    }

    /// Returns the instance as any of its exposed types, concrete or `dyn Trait`
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>, BeanError> {
        let wanted = TypeId::of::<T>();
        self.0
            .exposes
            .iter()
            .find(|e| e.info.type_id == wanted)
            .and_then(|e| (e.upcast)(self.0.instance.clone()))
            .and_then(|boxed| boxed.downcast::<Arc<T>>().ok())
            .map(|arc| *arc)
            .ok_or_else(|| BeanError::TypeMismatch {
                bean: self.0.name.clone(),
                required: std::any::type_name::<T>(),
            })
    }

    /// True if both handles point to the same instance
    pub fn ptr_eq(&self, other: &BeanRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Runs the destroy callback once, later calls do nothing
    pub(crate) fn destroy(&self) -> Result<(), DynError> {
        let previous = self
            .0
            .state
            .swap(InstanceState::Destroyed as u8, Ordering::AcqRel);
        if previous == InstanceState::Destroyed as u8 {
            return Ok(());
        }
        match &self.0.destroy {
            Some(destroy) => destroy(&self.0.instance),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;
    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    fn english_ref() -> BeanRef {
        let exposes: Arc<[ExposedType]> = Arc::from(vec![
            ExposedType::concrete::<English>(),
            ExposedType::interface::<English, dyn Greeter, _>(|e| e as Arc<dyn Greeter>),
        ]);
        BeanRef::new("english", Arc::new(English), exposes, None)
    }

    #[test]
    fn get_as_concrete_and_interface() {
        let bean = english_ref();
        assert!(bean.get::<English>().is_ok());
        assert_eq!(bean.get::<dyn Greeter>().unwrap().greet(), "hello");
        assert!(matches!(
            bean.get::<String>(),
            Err(BeanError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn destroy_runs_once() {
        use std::sync::atomic::AtomicUsize;

        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let destroy: LifecycleFn = Arc::new(move |_: &AnyInstance| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let bean = BeanRef::new(
            "english",
            Arc::new(English),
            Arc::from(vec![ExposedType::concrete::<English>()]),
            Some(destroy),
        );

        bean.destroy().unwrap();
        bean.destroy().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bean.state(), InstanceState::Destroyed);
    }
}
