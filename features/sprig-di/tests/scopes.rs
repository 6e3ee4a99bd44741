mod common;

use std::{sync::Arc, thread};

use common::{events, snapshot, tracked, Tracked};
use sprig_di::*;

struct Session {
    user: Arc<Tracked>,
}

fn session() -> BeanDefinitionBuilder<Session> {
    BeanDefinition::builder::<Session>().constructor([Parameter::bean::<Tracked>("user")], |args| {
        Ok(Session {
            user: args.bean(0)?,
        })
    })
}

#[test]
fn test_prototypes_are_fresh_but_share_singletons() {
    common::init_tracing();
    let events = events();

    let mut builder = Container::builder();
    builder
        .bean("user", tracked("user", &events))
        .unwrap()
        .bean("session", session().prototype())
        .unwrap();
    let container = builder.build().unwrap();
    container.start().unwrap();

    let first = container.get_as::<Session>("session").unwrap();
    let second = container.get_as::<Session>("session").unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first.user, &second.user));
    assert!(!container.is_created("session"));

    container.shutdown();
    assert_eq!(snapshot(&events), vec!["init user", "destroy user"]);
}

#[test]
fn test_prototype_lifecycle_is_not_managed_after_creation() {
    common::init_tracing();
    let events = events();

    let mut builder = Container::builder();
    builder
        .bean("temporary", tracked("temporary", &events).prototype())
        .unwrap();
    let container = builder.build().unwrap();

    container.get("temporary").unwrap();
    container.get("temporary").unwrap();
    container.shutdown();
    assert_eq!(
        snapshot(&events),
        vec!["init temporary", "init temporary"]
    );
}

#[test]
fn test_request_scope() {
    common::init_tracing();
    let events = events();
    let requests = Arc::new(RequestScope::new());

    let mut builder = Container::builder();
    builder
        .scope("request", requests.clone())
        .bean(
            "user",
            tracked("user", &events).scope(Scope::custom("request")),
        )
        .unwrap()
        .bean("session", session().scope(Scope::custom("request")))
        .unwrap();
    let container = builder.build().unwrap();
    container.start().unwrap();
    assert!(snapshot(&events).is_empty());

    let first = container.get("session").unwrap();
    let again = container.get("session").unwrap();
    assert!(first.ptr_eq(&again));
    assert_eq!(requests.active_beans(), 2);

    let other_thread = {
        let container = container.clone();
        thread::spawn(move || {
            let session = container.get("session").unwrap();
            let user = container.get("user").unwrap();
            assert!(Arc::ptr_eq(
                &session.get::<Session>().unwrap().user,
                &user.get::<Tracked>().unwrap()
            ));
            session
        })
        .join()
        .unwrap()
    };
    assert!(!first.ptr_eq(&other_thread));

    requests.end_request();
    assert_eq!(requests.active_beans(), 0);
    assert_eq!(first.state(), InstanceState::Destroyed);
    assert_eq!(
        snapshot(&events),
        vec!["init user", "init user", "destroy user"]
    );

    let next = container.get("session").unwrap();
    assert!(!next.ptr_eq(&first));

    container.shutdown();
    assert_eq!(requests.active_beans(), 0);
}

#[test]
fn test_unknown_scope_fails() {
    common::init_tracing();

    let mut builder = Container::builder();
    builder
        .bean("session", session().scope(Scope::custom("conversation")))
        .unwrap();
    let container = builder.build().unwrap();

    match container.get("session").unwrap_err().root_cause() {
        BeanError::UnknownScope { bean, scope } => {
            assert_eq!(bean, "session");
            assert_eq!(scope, "conversation");
        }
        other => panic!("expected an unknown scope, got {other:?}"),
    }
}

struct Holder;

#[test]
fn test_failed_lookup_discards_request_beans() {
    common::init_tracing();
    let events = events();
    let requests = Arc::new(RequestScope::new());

    let mut builder = Container::builder();
    builder
        .scope("request", requests.clone())
        .bean(
            "user",
            tracked("user", &events).scope(Scope::custom("request")),
        )
        .unwrap()
        .bean(
            "holder",
            BeanDefinition::builder::<Holder>()
                .constructor([Parameter::bean::<Tracked>("user")], |_| {
                    Err("no session available".into())
                })
                .lazy(true),
        )
        .unwrap();
    let container = builder.build().unwrap();

    let err = container.get("holder").unwrap_err();
    assert!(matches!(
        err.root_cause(),
        BeanError::FactoryFailed { bean, .. } if bean == "holder"
    ));
    assert_eq!(requests.active_beans(), 0);
    assert_eq!(snapshot(&events), vec!["init user", "destroy user"]);

    // The scope hands out a fresh instance afterwards
    let user = container.get("user").unwrap();
    assert_eq!(user.state(), InstanceState::Initialized);
    assert_eq!(requests.active_beans(), 1);
}
