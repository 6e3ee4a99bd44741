mod common;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use sprig_di::*;

struct A {
    _b: Arc<B>,
}
struct B {
    _a: Arc<A>,
}

fn a_needs_b() -> BeanDefinitionBuilder<A> {
    BeanDefinition::builder::<A>()
        .constructor([Parameter::bean::<B>("b")], |args| Ok(A { _b: args.bean(0)? }))
        .arg(ConstructorArg::reference("b"))
}

fn b_needs_a() -> BeanDefinitionBuilder<B> {
    BeanDefinition::builder::<B>()
        .constructor([Parameter::bean::<A>("a")], |args| Ok(B { _a: args.bean(0)? }))
        .arg(ConstructorArg::reference("a"))
}

fn assert_circular(err: &BeanError, names: &[&str]) {
    match err.root_cause() {
        BeanError::CircularDependency { chain } => {
            for name in names {
                assert!(chain.iter().any(|n| n == name), "{name} missing in {chain:?}");
            }
            assert_eq!(chain.first(), chain.last());
        }
        other => panic!("expected a circular dependency, got {other:?}"),
    }
}

#[test]
fn test_constructor_cycle_fails_in_any_registration_order() {
    common::init_tracing();

    for a_first in [true, false] {
        let mut builder = Container::builder();
        if a_first {
            builder.bean("a", a_needs_b()).unwrap();
            builder.bean("b", b_needs_a()).unwrap();
        } else {
            builder.bean("b", b_needs_a()).unwrap();
            builder.bean("a", a_needs_b()).unwrap();
        }
        let container = builder.build().unwrap();

        let err = container.start().unwrap_err();
        assert_circular(&err, &["a", "b"]);

        let chain = err.chain().unwrap();
        assert!(chain.contains(&"a".to_string()));
        assert!(chain.contains(&"b".to_string()));
        assert!(err.to_string().contains("Circular dependency"));

        assert!(!container.is_active());
        assert!(matches!(container.get("a"), Err(BeanError::ContainerClosed)));
    }
}

#[test]
fn test_self_reference_through_constructor_fails() {
    common::init_tracing();

    struct Node;
    let mut builder = Container::builder();
    builder
        .bean(
            "node",
            BeanDefinition::builder::<Node>()
                .constructor([Parameter::bean::<Node>("next")], |_| Ok(Node))
                .arg(ConstructorArg::reference("node")),
        )
        .unwrap();
    let container = builder.build().unwrap();

    let err = container.get("node").unwrap_err();
    match err.root_cause() {
        BeanError::CircularDependency { chain } => assert_eq!(chain, &vec!["node", "node"]),
        other => panic!("expected a circular dependency, got {other:?}"),
    }
}

struct Left {
    right: Slot<Right>,
    initialized: AtomicBool,
    saw_early_right: AtomicBool,
}
struct Right {
    left: Slot<Left>,
    initialized: AtomicBool,
    saw_early_left: AtomicBool,
}

fn left() -> BeanDefinitionBuilder<Left> {
    BeanDefinition::builder::<Left>()
        .constructor([], |_| {
            Ok(Left {
                right: Slot::new(),
                initialized: AtomicBool::new(false),
                saw_early_right: AtomicBool::new(false),
            })
        })
        .property_ref::<Right, _>("right", "right", |left, right| {
            if !right.initialized.load(Ordering::SeqCst) {
                left.saw_early_right.store(true, Ordering::SeqCst);
            }
            left.right.set(right)?;
            Ok(())
        })
        .init(|left| {
            left.initialized.store(true, Ordering::SeqCst);
            Ok(())
        })
}

fn right() -> BeanDefinitionBuilder<Right> {
    BeanDefinition::builder::<Right>()
        .constructor([], |_| {
            Ok(Right {
                left: Slot::new(),
                initialized: AtomicBool::new(false),
                saw_early_left: AtomicBool::new(false),
            })
        })
        .property_autowired::<Left, _>("left", |right, left| {
            if !left.initialized.load(Ordering::SeqCst) {
                right.saw_early_left.store(true, Ordering::SeqCst);
            }
            right.left.set(left)?;
            Ok(())
        })
        .init(|right| {
            right.initialized.store(true, Ordering::SeqCst);
            Ok(())
        })
}

#[test]
fn test_setter_cycle_uses_an_early_reference() {
    common::init_tracing();

    let mut builder = Container::builder();
    builder
        .bean("left", left())
        .unwrap()
        .bean("right", right())
        .unwrap();
    let container = builder.build().unwrap();
    container.start().unwrap();

    let left = container.get_as::<Left>("left").unwrap();
    let right = container.get_as::<Right>("right").unwrap();

    assert!(Arc::ptr_eq(left.right.require().unwrap(), &right));
    assert!(Arc::ptr_eq(right.left.require().unwrap(), &left));

    // left was requested first, so right got it before its init ran
    assert!(right.saw_early_left.load(Ordering::SeqCst));
    assert!(!left.saw_early_right.load(Ordering::SeqCst));

    assert_eq!(container.get("left").unwrap().state(), InstanceState::Initialized);
    assert_eq!(container.get("right").unwrap().state(), InstanceState::Initialized);
    assert_eq!(container.dependencies_of("left"), vec!["right"]);
    assert_eq!(container.dependencies_of("right"), vec!["left"]);
}

#[test]
fn test_setter_cycle_fails_when_circular_references_are_disabled() {
    common::init_tracing();

    let mut builder = ContainerBuilder::with_config(ContainerConfig {
        allow_circular_references: false,
        ..Default::default()
    });
    builder
        .bean("left", left())
        .unwrap()
        .bean("right", right())
        .unwrap();
    let container = builder.build().unwrap();

    let err = container.get("left").unwrap_err();
    assert_circular(&err, &["left", "right"]);
    assert!(!container.is_created("left"));
    assert!(!container.is_created("right"));
}

#[test]
fn test_prototype_setter_cycle_fails() {
    common::init_tracing();

    let mut builder = Container::builder();
    builder
        .bean("left", left().prototype())
        .unwrap()
        .bean("right", right().prototype())
        .unwrap();
    let container = builder.build().unwrap();

    let err = container.get("left").unwrap_err();
    assert_circular(&err, &["left", "right"]);
}

struct Owner {
    _part: Arc<Part>,
}
struct Part {
    owner: Slot<Owner>,
}

#[test]
fn test_constructor_reentry_from_a_property_fails() {
    common::init_tracing();

    let mut builder = Container::builder();
    builder
        .bean(
            "owner",
            BeanDefinition::builder::<Owner>()
                .constructor([Parameter::bean::<Part>("part")], |args| {
                    Ok(Owner {
                        _part: args.bean(0)?,
                    })
                }),
        )
        .unwrap()
        .bean(
            "part",
            BeanDefinition::builder::<Part>()
                .constructor([], |_| Ok(Part { owner: Slot::new() }))
                .property_autowired::<Owner, _>("owner", |part, owner| {
                    part.owner.set(owner)?;
                    Ok(())
                }),
        )
        .unwrap();
    let container = builder.build().unwrap();

    // owner is still resolving its constructor when part asks for it
    let err = container.get("owner").unwrap_err();
    assert_circular(&err, &["owner", "part"]);

    // part is past its constructor, but owner's constructor needs it
    let err = container.get("part").unwrap_err();
    assert_circular(&err, &["owner", "part"]);
}

#[test]
fn test_depends_on_cycle_is_rejected_at_build() {
    common::init_tracing();

    struct Marker;
    let marker = || BeanDefinition::builder::<Marker>().constructor([], |_| Ok(Marker));

    let mut builder = Container::builder();
    builder
        .bean("first", marker().depends_on("second"))
        .unwrap()
        .bean("second", marker().depends_on("third"))
        .unwrap()
        .bean("third", marker().depends_on("first"))
        .unwrap()
        .bean("orphan", marker().depends_on("missing"))
        .unwrap();

    let errors = match builder.build() {
        Err(BeanError::DependencyGraph(errors)) => errors,
        Err(other) => panic!("expected dependency graph errors, got {other:?}"),
        Ok(_) => panic!("expected dependency graph errors"),
    };
    assert!(errors.errors.iter().any(|error| matches!(
        error,
        DependencyGraphError::CircularDependsOn { chain } if chain.len() == 4
    )));
    assert!(errors.errors.contains(&DependencyGraphError::MissingDependency {
        dependency: "missing".into(),
        required_by: "orphan".into(),
    }));
}
