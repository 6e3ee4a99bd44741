//! Binding of declared constructor arguments to parameters, and selection among several constructors.

use std::cmp::Reverse;

use sprig_config::PropertySources;

use super::{DependencyDescriptor, DependencyResolver, InjectionSite};
use crate::{
    convert::{Converter, ValueType},
    definition::{ConstructorArg, ParamType, Parameter, ValueSpec},
    errors::BeanError,
    factories::Constructor,
    store::BeanDefinitionStore,
    types::TypeInfo,
};

/// How a single parameter gets its value
#[derive(Debug, Clone, Copy)]
pub(crate) enum Binding<'d> {
    Declared(&'d ConstructorArg),
    Autowired,
}

pub(crate) struct BindContext<'a> {
    pub store: &'a BeanDefinitionStore,
    pub converter: &'a dyn Converter,
    pub properties: &'a PropertySources,
}

impl BindContext<'_> {
    fn accepts(&self, value: &ValueSpec, kind: &ParamType) -> bool {
        match (value, kind) {
            (ValueSpec::Reference(name), ParamType::Bean(required)) => {
                self.reference_fits(name, required)
            }
            (ValueSpec::Literal(raw), ParamType::Value(target)) => self.literal_fits(raw, *target),
            _ => false,
        }
    }

    fn reference_fits(&self, name: &str, required: &TypeInfo) -> bool {
        self.store
            .lookup(name)
            .is_ok_and(|bean| bean.definition.exposes(required))
    }

    fn literal_fits(&self, raw: &str, target: ValueType) -> bool {
        self.properties
            .resolve_placeholders(raw)
            .is_ok_and(|text| self.converter.convert(&text, target).is_ok())
    }
}

/// Assigns every declared argument to a parameter.
///
/// Precedence: explicit index, explicit name, explicit type, then the first unbound
/// parameter whose type accepts the value. Parameters left over are autowired.
pub(crate) fn bind<'d>(
    params: &[Parameter],
    args: &'d [ConstructorArg],
    ctx: &BindContext,
) -> Result<Vec<Binding<'d>>, String> {
    if args.len() > params.len() {
        return Err(format!(
            "{} arguments declared but only {} parameters exist",
            args.len(),
            params.len()
        ));
    }

    let mut slots: Vec<Option<&'d ConstructorArg>> = vec![None; params.len()];

    for arg in args {
        let Some(index) = arg.index else { continue };
        match slots.get_mut(index) {
            None => {
                return Err(format!(
                    "argument index {index} is out of range for {} parameters",
                    params.len()
                ))
            }
            Some(Some(_)) => return Err(format!("argument index {index} is declared twice")),
            Some(slot) => *slot = Some(arg),
        }
    }

    for arg in args.iter().filter(|a| a.index.is_none()) {
        let Some(name) = &arg.name else { continue };
        let position = params
            .iter()
            .zip(&slots)
            .position(|(param, slot)| slot.is_none() && param.name == *name)
            .ok_or_else(|| format!("no free parameter is named '{name}'"))?;
        slots[position] = Some(arg);
    }

    for arg in args.iter().filter(|a| a.index.is_none() && a.name.is_none()) {
        let Some(declared) = &arg.declared_type else { continue };
        let position = params
            .iter()
            .zip(&slots)
            .position(|(param, slot)| slot.is_none() && param.kind == *declared)
            .ok_or_else(|| format!("no free parameter has type '{declared}'"))?;
        slots[position] = Some(arg);
    }

    let untyped = args
        .iter()
        .filter(|a| a.index.is_none() && a.name.is_none() && a.declared_type.is_none());
    for arg in untyped {
        let position = params
            .iter()
            .zip(&slots)
            .position(|(param, slot)| slot.is_none() && ctx.accepts(&arg.value, &param.kind))
            .ok_or_else(|| format!("no free parameter accepts {:?}", arg.value))?;
        slots[position] = Some(arg);
    }

    params
        .iter()
        .zip(slots)
        .map(|(param, slot)| match (slot, param.kind) {
            (Some(arg), _) => Ok(Binding::Declared(arg)),
            (None, ParamType::Bean(_)) => Ok(Binding::Autowired),
            (None, ParamType::Value(_)) if param.optional => Ok(Binding::Autowired),
            (None, ParamType::Value(value_type)) => Err(format!(
                "no value given for parameter '{}' of type {value_type}",
                param.name
            )),
        })
        .collect()
}

/// Picks the constructor to use and binds its arguments.
///
/// A single constructor is always used. With several, the ones with most parameters are
/// tried first and the first one whose arguments bind and whose autowired parameters
/// all resolve wins.
pub(crate) fn select<'c, 'd>(
    bean: &str,
    constructors: &'c [Constructor],
    args: &'d [ConstructorArg],
    ctx: &BindContext,
    resolver: &DependencyResolver,
) -> Result<(&'c Constructor, Vec<Binding<'d>>), BeanError> {
    let no_match = |reason: String| BeanError::NoMatchingConstructor {
        bean: bean.to_string(),
        reason,
    };

    if let [only] = constructors {
        return bind(&only.params, args, ctx)
            .map(|bindings| (only, bindings))
            .map_err(no_match);
    }

    let mut ordered: Vec<&Constructor> = constructors.iter().collect();
    ordered.sort_by_key(|constructor| Reverse(constructor.params.len()));

    let mut reasons = Vec::new();
    for constructor in ordered {
        let bindings = match bind(&constructor.params, args, ctx) {
            Ok(bindings) => bindings,
            Err(reason) => {
                reasons.push(format!("({} parameters) {reason}", constructor.params.len()));
                continue;
            }
        };

        match unresolvable(bean, constructor, &bindings, resolver) {
            None => {
                tracing::trace!(
                    "Selected constructor with {} parameters for bean '{bean}'",
                    constructor.params.len()
                );
                return Ok((constructor, bindings));
            }
            Some(reason) => {
                reasons.push(format!("({} parameters) {reason}", constructor.params.len()))
            }
        }
    }

    Err(no_match(reasons.join("; ")))
}

/// First autowired parameter that cannot be resolved
fn unresolvable(
    bean: &str,
    constructor: &Constructor,
    bindings: &[Binding],
    resolver: &DependencyResolver,
) -> Option<String> {
    constructor
        .params
        .iter()
        .zip(bindings)
        .enumerate()
        .filter(|(_, (_, binding))| matches!(binding, Binding::Autowired))
        .find_map(|(index, (param, _))| {
            let site = InjectionSite::ConstructorParameter {
                index,
                name: param.name.clone(),
            };
            let descriptor = DependencyDescriptor::for_parameter(param, site)?;
            resolver
                .resolve(&descriptor, Some(bean))
                .err()
                .map(|e| e.to_string())
        })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        convert::DefaultConverter,
        definition::BeanDefinition,
        factories::{Arguments, ConstructFn},
        types::{AnyInstance, DynError},
    };

    #[derive(Default)]
    struct Pool;

    fn with_context<R>(run: impl FnOnce(&BindContext) -> R) -> R {
        let mut store = BeanDefinitionStore::new(false);
        store
            .register(
                "pool",
                BeanDefinition::builder::<Pool>()
                    .default_constructor()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let properties = PropertySources::new();
        run(&BindContext {
            store: &store,
            converter: &DefaultConverter,
            properties: &properties,
        })
    }

    fn params() -> Vec<Parameter> {
        vec![
            Parameter::value::<u32>("size"),
            Parameter::value::<String>("label"),
            Parameter::bean::<Pool>("pool"),
        ]
    }

    fn declared(bindings: &[Binding]) -> Vec<Option<ValueSpec>> {
        bindings
            .iter()
            .map(|binding| match binding {
                Binding::Declared(arg) => Some(arg.value.clone()),
                Binding::Autowired => None,
            })
            .collect()
    }

    #[test]
    fn index_beats_name_and_type_order() {
        with_context(|ctx| {
            let args = vec![
                ConstructorArg::value("first").named("label"),
                ConstructorArg::value("10").at(0),
            ];
            let bindings = bind(&params(), &args, ctx).unwrap();
            assert_eq!(
                declared(&bindings),
                vec![
                    Some(ValueSpec::Literal("10".into())),
                    Some(ValueSpec::Literal("first".into())),
                    None
                ]
            );
        });
    }

    #[test]
    fn untyped_values_go_to_the_first_accepting_parameter() {
        with_context(|ctx| {
            // "abc" is not a u32, so it skips `size`
            let args = vec![
                ConstructorArg::value("abc"),
                ConstructorArg::value("12"),
                ConstructorArg::reference("pool"),
            ];
            let bindings = bind(&params(), &args, ctx).unwrap();
            assert_eq!(
                declared(&bindings),
                vec![
                    Some(ValueSpec::Literal("12".into())),
                    Some(ValueSpec::Literal("abc".into())),
                    Some(ValueSpec::Reference("pool".into())),
                ]
            );
        });
    }

    #[test]
    fn missing_values_fail_binding() {
        with_context(|ctx| {
            let err = bind(&params(), &[ConstructorArg::value("1")], ctx).unwrap_err();
            assert!(err.contains("label"), "{err}");

            let err = bind(&params(), &[ConstructorArg::value("1").at(5)], ctx).unwrap_err();
            assert!(err.contains("out of range"), "{err}");
        });
    }

    #[test]
    fn greediest_satisfiable_constructor_wins() {
        let mut store = BeanDefinitionStore::new(false);
        store
            .register(
                "pool",
                BeanDefinition::builder::<Pool>()
                    .default_constructor()
                    .build()
                    .unwrap(),
            )
            .unwrap();
        let properties = PropertySources::new();
        let ctx = BindContext {
            store: &store,
            converter: &DefaultConverter,
            properties: &properties,
        };
        let resolver = DependencyResolver::new(&store, false);

        let construct: ConstructFn =
            Arc::new(|_: &Arguments| Ok::<AnyInstance, DynError>(Arc::new(())));
        let constructors = vec![
            Constructor::new(vec![Parameter::bean::<Pool>("pool")], construct.clone()),
            Constructor::new(
                vec![
                    Parameter::bean::<Pool>("pool"),
                    Parameter::bean::<String>("missing"),
                ],
                construct.clone(),
            ),
            Constructor::new(vec![], construct),
        ];

        let (chosen, bindings) = select("bean", &constructors, &[], &ctx, &resolver).unwrap();
        assert_eq!(chosen.params.len(), 1);
        assert_eq!(bindings.len(), 1);
    }
}
