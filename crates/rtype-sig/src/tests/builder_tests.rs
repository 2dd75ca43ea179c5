use super::*;
use rtype_solver::TypeInterner;

fn loc() -> SourceLocation {
    SourceLocation::new("lib/foo.rb", 10)
}

fn sig() -> SigBuilder {
    SigBuilder::new(loc())
}

fn message(result: Result<SigBuilder, DeclarationError>) -> String {
    result.unwrap_err().message
}

fn def(params: Vec<MethodParam>) -> MethodDef {
    MethodDef::stub("foo", params, SourceLocation::new("lib/foo.rb", 11))
}

// =============================================================================
// Mode state machine
// =============================================================================

#[test]
fn test_mode_transitions() {
    assert_eq!(sig().abstract_().unwrap().mode, Mode::Abstract);
    assert_eq!(sig().overridable().unwrap().mode, Mode::Overridable);
    assert_eq!(sig().override_().unwrap().mode, Mode::Override);
    assert_eq!(sig().implementation().unwrap().mode, Mode::Implementation);
    assert_eq!(
        sig().overridable().unwrap().override_().unwrap().mode,
        Mode::OverridableOverride
    );
    assert_eq!(
        sig().override_().unwrap().overridable().unwrap().mode,
        Mode::OverridableOverride
    );
    assert_eq!(
        sig().implementation().unwrap().overridable().unwrap().mode,
        Mode::OverridableImplementation
    );
}

#[test]
fn test_mode_conflicts() {
    assert_eq!(
        message(sig().abstract_().and_then(SigBuilder::abstract_)),
        ".abstract cannot be repeated in a single signature"
    );
    assert_eq!(
        message(sig().override_().and_then(SigBuilder::abstract_)),
        "`.abstract` cannot be combined with `.override`, `.overridable` or `.implementation`"
    );
    assert_eq!(
        message(sig().override_().and_then(SigBuilder::override_)),
        ".override cannot be repeated in a single signature"
    );
    assert_eq!(
        message(sig().abstract_().and_then(SigBuilder::override_)),
        "`.override` cannot be combined with `.abstract`"
    );
    assert_eq!(
        message(sig().overridable().and_then(SigBuilder::overridable)),
        ".overridable cannot be repeated in a single signature"
    );
    assert_eq!(
        message(sig().abstract_().and_then(SigBuilder::overridable)),
        "`.overridable` cannot be combined with `.abstract`"
    );
    assert_eq!(
        message(sig().implementation().and_then(SigBuilder::implementation)),
        ".implementation cannot be repeated in a single signature"
    );
    assert_eq!(
        message(sig().abstract_().and_then(SigBuilder::implementation)),
        "`.implementation` cannot be combined with `.abstract`"
    );
    assert_eq!(
        message(sig().override_().and_then(SigBuilder::implementation)),
        "`.implementation` cannot be combined with `.override`"
    );
}

#[test]
fn test_allow_incompatible_is_recorded() {
    let builder = sig().override_allow_incompatible().unwrap();
    assert_eq!(builder.mode, Mode::Override);
    assert_eq!(builder.allow_incompatible, AllowIncompatible::All);
    let builder = sig().override_allow_incompatible_visibility().unwrap();
    assert_eq!(builder.allow_incompatible, AllowIncompatible::Visibility);
    assert_eq!(builder.mode, Mode::Override);
}

#[test]
fn test_error_carries_location() {
    let err = sig().abstract_().and_then(SigBuilder::abstract_).unwrap_err();
    assert_eq!(err.location, loc());
    assert_eq!(
        err.to_string(),
        "lib/foo.rb:10: Error interpreting `sig`:\n  .abstract cannot be repeated in a single signature"
    );
}

// =============================================================================
// Params / returns / modifiers
// =============================================================================

#[test]
fn test_params_twice() {
    let result = sig()
        .params([("x", "Integer")])
        .and_then(|b| b.params([("y", "Integer")]));
    assert_eq!(message(result), "You can't call .params twice");
}

#[test]
fn test_params_after_returns() {
    let result = sig()
        .returns("Integer")
        .and_then(|b| b.params([("x", "Integer")]));
    assert_eq!(message(result), "You must declare .params before .returns");
}

#[test]
fn test_empty_params() {
    let result = sig().params(Vec::<(&str, &str)>::new());
    assert!(message(result).starts_with("'params' was called without any arguments"));
}

#[test]
fn test_returns_and_void_exclusive() {
    assert_eq!(
        message(sig().returns("Integer").and_then(|b| b.returns("String"))),
        "You can't call .returns multiple times in a signature."
    );
    assert_eq!(
        message(sig().returns("Integer").and_then(SigBuilder::void)),
        "You can't call .void after calling .returns."
    );
    assert_eq!(
        message(sig().void().and_then(|b| b.returns("Integer"))),
        "You can't call .returns after calling .void."
    );
}

#[test]
fn test_checked_and_on_failure() {
    assert_eq!(
        message(
            sig()
                .checked(CheckedLevel::Always)
                .and_then(|b| b.checked(CheckedLevel::Tests))
        ),
        "You can't call .checked multiple times in a signature."
    );
    let soft = FailurePolicy::Soft {
        notify: "team".into(),
    };
    assert_eq!(
        message(
            sig()
                .on_failure(soft.clone())
                .and_then(|b| b.on_failure(soft.clone()))
        ),
        "You can't call .on_failure multiple times in a signature."
    );
    assert_eq!(
        message(
            sig()
                .on_failure(soft.clone())
                .and_then(|b| b.checked(CheckedLevel::Never))
        ),
        "You can't use .checked(:never) with .on_failure because .on_failure will have no effect."
    );
    assert_eq!(
        message(
            sig()
                .checked(CheckedLevel::Never)
                .and_then(|b| b.on_failure(soft.clone()))
        ),
        "You can't use .on_failure with .checked(:never) because .on_failure will have no effect."
    );
}

#[test]
fn test_single_use_modifiers() {
    assert_eq!(
        message(sig().generated().and_then(SigBuilder::generated)),
        "You can't call .generated multiple times in a signature."
    );
    assert_eq!(
        message(sig().final_().and_then(SigBuilder::final_)),
        "You can't call .final multiple times in a signature."
    );
    assert_eq!(
        message(
            sig()
                .type_parameters(["U"])
                .and_then(|b| b.type_parameters(["V"]))
        ),
        "You can't call .type_parameters multiple times in a signature."
    );
    assert_eq!(
        message(sig().bind("String").and_then(|b| b.bind("Integer"))),
        "You can't call .bind multiple times in a signature."
    );
}

// =============================================================================
// Finalize
// =============================================================================

#[test]
fn test_finalize_requires_return() {
    let err = sig().finalize(CheckedLevel::Always).unwrap_err();
    assert_eq!(
        err.message,
        "You must provide a return type; use the `.returns` or `.void` builder methods."
    );
}

#[test]
fn test_abstract_defaults_to_void() {
    let decl = sig()
        .abstract_()
        .unwrap()
        .finalize(CheckedLevel::Always)
        .unwrap();
    assert!(decl.returns.is_none());
}

#[test]
fn test_finalize_applies_default_checked() {
    let decl = sig().void().unwrap().finalize(CheckedLevel::Tests).unwrap();
    assert_eq!(decl.checked, CheckedLevel::Tests);

    let decl = sig()
        .checked(CheckedLevel::Always)
        .and_then(SigBuilder::void)
        .unwrap()
        .finalize(CheckedLevel::Never)
        .unwrap();
    assert_eq!(decl.checked, CheckedLevel::Always);
}

#[test]
fn test_on_failure_needs_checked_when_default_is_never() {
    let err = sig()
        .on_failure(FailurePolicy::Soft {
            notify: "team".into(),
        })
        .and_then(SigBuilder::void)
        .unwrap()
        .finalize(CheckedLevel::Never)
        .unwrap_err();
    assert!(err.message.starts_with("To use .on_failure you must additionally call .checked"));
}

// =============================================================================
// Build against a method
// =============================================================================

#[test]
fn test_build_resolves_types_in_definition_order() {
    let db = TypeInterner::new();
    let decl = sig()
        .params([("a", "Integer"), ("b", "T.nilable(String)")])
        .and_then(|b| b.returns("String"))
        .unwrap()
        .finalize(CheckedLevel::Always)
        .unwrap();
    let signature = decl
        .build(&db, ClassId::OBJECT, &def(vec![MethodParam::req("a"), MethodParam::opt("b")]))
        .unwrap();
    assert_eq!(signature.params.len(), 2);
    assert_eq!(signature.params[0].ty, TypeId::INTEGER);
    assert_eq!(db.name_of(signature.params[1].ty).as_ref(), "T.nilable(String)");
    assert_eq!(signature.params[1].kind, ParamKind::Optional);
    assert_eq!(signature.returns, TypeId::STRING);
    assert_eq!(&*signature.owner_name, "Object");
}

#[test]
fn test_build_void_return() {
    let db = TypeInterner::new();
    let signature = sig()
        .void()
        .unwrap()
        .finalize(CheckedLevel::Always)
        .unwrap()
        .build(&db, ClassId::OBJECT, &def(Vec::new()))
        .unwrap();
    assert_eq!(signature.returns, TypeId::VOID);
}

#[test]
fn test_build_missing_and_extra_params() {
    let db = TypeInterner::new();
    let decl = sig()
        .params([("a", "Integer")])
        .and_then(SigBuilder::void)
        .unwrap()
        .finalize(CheckedLevel::Always)
        .unwrap();

    let err = decl
        .clone()
        .build(&db, ClassId::OBJECT, &def(vec![MethodParam::req("a"), MethodParam::req("b")]))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "The declaration for `foo` is missing parameter(s): b"
    );

    let err = decl
        .build(&db, ClassId::OBJECT, &def(Vec::new()))
        .unwrap_err();
    assert_eq!(err.to_string(), "The declaration for `foo` has extra parameter(s): a");
}

#[test]
fn test_build_out_of_order() {
    let db = TypeInterner::new();
    let err = sig()
        .params([("b", "Integer"), ("a", "Integer")])
        .and_then(SigBuilder::void)
        .unwrap()
        .finalize(CheckedLevel::Always)
        .unwrap()
        .build(&db, ClassId::OBJECT, &def(vec![MethodParam::req("a"), MethodParam::req("b")]))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Parameter `b` is declared out of order (declared as arg number 1, defined in the method as arg number 2).\nMethod: Object#foo at lib/foo.rb:11"
    );
}

#[test]
fn test_build_required_after_optional() {
    let db = TypeInterner::new();
    let err = sig()
        .params([("a", "Integer"), ("b", "Integer")])
        .and_then(SigBuilder::void)
        .unwrap()
        .finalize(CheckedLevel::Always)
        .unwrap()
        .build(&db, ClassId::OBJECT, &def(vec![MethodParam::opt("a"), MethodParam::req("b")]))
        .unwrap_err();
    assert!(matches!(err, SigBuildError::RequiredAfterOptional { .. }));
    assert!(err
        .to_string()
        .starts_with("Required params after optional params are not supported"));
}

#[test]
fn test_build_invalid_type() {
    let db = TypeInterner::new();
    let err = sig()
        .params([("a", "Nope")])
        .and_then(SigBuilder::void)
        .unwrap()
        .finalize(CheckedLevel::Always)
        .unwrap()
        .build(&db, ClassId::OBJECT, &def(vec![MethodParam::req("a")]))
        .unwrap_err();
    assert!(matches!(err, SigBuildError::InvalidType { .. }));
}
