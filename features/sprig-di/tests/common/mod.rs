#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use sprig_di::{BeanDefinition, BeanDefinitionBuilder};
use tracing_subscriber::EnvFilter;

/// Log output is only shown for failing tests, set `RUST_LOG` to see it
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Shared record of lifecycle events, in the order they happened
pub type Events = Arc<Mutex<Vec<String>>>;

pub fn events() -> Events {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn snapshot(events: &Events) -> Vec<String> {
    events.lock().clone()
}

/// A bean that records its init and destroy callbacks
#[derive(Debug)]
pub struct Tracked(pub &'static str);

pub fn tracked(name: &'static str, events: &Events) -> BeanDefinitionBuilder<Tracked> {
    let on_init = events.clone();
    let on_destroy = events.clone();
    BeanDefinition::builder::<Tracked>()
        .constructor([], move |_| Ok(Tracked(name)))
        .init(move |bean| {
            on_init.lock().push(format!("init {}", bean.0));
            Ok(())
        })
        .destroy(move |bean| {
            on_destroy.lock().push(format!("destroy {}", bean.0));
            Ok(())
        })
}
