use super::*;
use crate::error::{ContractKind, DeclarationError};
use crate::signature::CheckedLevel;

fn loc(file: &str, line: u32) -> SourceLocation {
    SourceLocation::new(file, line)
}

fn sig(line: u32) -> SigBuilder {
    SigBuilder::new(loc("lib/shapes.rb", line))
}

fn area_def(line: u32, value: f64) -> MethodDef {
    MethodDef::new("area", Vec::new(), loc("lib/shapes.rb", line), move |_, _| {
        Ok(Value::Float(value))
    })
}

#[test]
fn test_define_and_call_signed_method() {
    let rt = Runtime::new();
    let class = rt.define_class("Square", None, loc("lib/shapes.rb", 1)).unwrap();
    rt.define_method(class, area_def(3, 4.0), Some(sig(2).returns("Float")))
        .unwrap();

    let square = rt.instantiate(class).unwrap();
    let args = Args::new(loc("app.rb", 1));
    assert_eq!(rt.call(&square, "area", &args).unwrap(), Value::Float(4.0));
    assert!(rt.signature_for(class, "area").is_some());
    assert!(rt.resolve(class, "perimeter").is_none());
}

#[test]
fn test_no_method() {
    let rt = Runtime::new();
    let err = rt
        .call(&Value::Integer(3), "area", &Args::new(SourceLocation::unknown()))
        .unwrap_err();
    assert_eq!(err.to_string(), "undefined method `area' for 3");
}

#[test]
fn test_methods_are_inherited() {
    let rt = Runtime::new();
    let base = rt.define_class("Shape", None, loc("lib/shapes.rb", 1)).unwrap();
    let child = rt.define_class("Circle", Some(base), loc("lib/shapes.rb", 10)).unwrap();
    rt.define_unsigned(base, area_def(2, 1.0)).unwrap();
    let circle = rt.instantiate(child).unwrap();
    let value = rt
        .call(&circle, "area", &Args::new(SourceLocation::unknown()))
        .unwrap();
    assert_eq!(value, Value::Float(1.0));
}

#[test]
fn test_override_contract_is_checked_on_definition() {
    let rt = Runtime::new();
    let base = rt.define_class("Shape", None, loc("lib/shapes.rb", 1)).unwrap();
    let child = rt.define_class("Circle", Some(base), loc("lib/shapes.rb", 10)).unwrap();
    rt.define_method(base, area_def(3, 0.0), Some(sig(2).returns("Float")))
        .unwrap();

    let err = rt
        .define_method(child, area_def(12, 1.0), Some(sig(11).override_().and_then(|b| b.returns("Float"))))
        .unwrap_err();
    let Error::Contract(err) = err else {
        panic!("expected a contract error, got {err:?}");
    };
    assert_eq!(err.kind, ContractKind::Mode);
    assert!(err.message.contains("Parent definition: Shape at lib/shapes.rb:3"));
}

#[test]
fn test_final_method_cannot_be_redefined() {
    let rt = Runtime::new();
    let class = rt.define_class("Shape", None, loc("lib/shapes.rb", 1)).unwrap();
    rt.define_method(class, area_def(3, 0.0), Some(sig(2).final_().and_then(|b| b.returns("Float"))))
        .unwrap();
    let err = rt.define_unsigned(class, area_def(9, 1.0)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "The method `area` on Shape was declared as final and cannot be redefined\n  \
         Made final here: lib/shapes.rb:3\n  \
         Redefined here: lib/shapes.rb:9"
    );
}

#[test]
fn test_unsigned_child_of_final_method() {
    let rt = Runtime::new();
    let base = rt.define_class("Shape", None, loc("lib/shapes.rb", 1)).unwrap();
    let child = rt.define_class("Circle", Some(base), loc("lib/circle.rb", 1)).unwrap();
    rt.define_method(base, area_def(3, 0.0), Some(sig(2).final_().and_then(|b| b.returns("Float"))))
        .unwrap();
    let err = rt.define_unsigned(child, area_def(4, 1.0)).unwrap_err();
    assert!(err.to_string().starts_with(
        "The method `area` on Shape was declared as final and cannot be overridden in Circle"
    ));
}

#[test]
fn test_abstract_method_needs_abstract_owner() {
    let rt = Runtime::new();
    let class = rt.define_class("Shape", None, loc("lib/shapes.rb", 1)).unwrap();
    let def = MethodDef::stub("area", Vec::new(), loc("lib/shapes.rb", 3));
    let err = rt
        .define_method(class, def.clone(), Some(sig(2).abstract_().and_then(|b| b.returns("Float"))))
        .unwrap_err();
    assert!(matches!(err, Error::Contract(ref e) if e.kind == ContractKind::AbstractOwner));

    rt.abstract_(class).unwrap();
    rt.define_method(class, def, Some(sig(2).abstract_().and_then(|b| b.returns("Float"))))
        .unwrap();
    assert!(rt.resolve(class, "area").unwrap().is_abstract());
}

#[test]
fn test_missing_implementations_on_instantiate() {
    let rt = Runtime::new();
    let shape = rt.define_class("Shape", None, loc("lib/shapes.rb", 1)).unwrap();
    rt.abstract_(shape).unwrap();
    for (line, name) in [(3, "perimeter"), (6, "area")] {
        rt.define_method(
            shape,
            MethodDef::stub(name, Vec::new(), loc("lib/shapes.rb", line)),
            Some(sig(line - 1).abstract_().and_then(|b| b.returns("Float"))),
        )
        .unwrap();
    }
    assert_eq!(
        rt.instantiate(shape).unwrap_err(),
        HierarchyError::AbstractInstantiation("Shape".into())
    );

    let square = rt.define_class("Square", Some(shape), loc("lib/square.rb", 1)).unwrap();
    rt.define_method(
        square,
        area_def(3, 4.0),
        Some(sig(2).implementation().and_then(|b| b.returns("Float"))),
    )
    .unwrap();
    assert_eq!(
        rt.instantiate(square).unwrap_err().to_string(),
        "Missing implementation for abstract method(s) in Square:\n  \
         `perimeter` declared in Shape at lib/shapes.rb:3"
    );
}

#[test]
fn test_interface_modules() {
    let rt = Runtime::new();
    let class = rt.define_class("Shape", None, loc("lib/shapes.rb", 1)).unwrap();
    assert_eq!(
        rt.interface(class).unwrap_err(),
        HierarchyError::InterfaceOnClass("Shape".into())
    );

    let module = rt.define_module("Drawable", loc("lib/drawable.rb", 1)).unwrap();
    rt.interface(module).unwrap();
    let err = rt
        .define_unsigned(module, MethodDef::stub("draw", Vec::new(), loc("lib/drawable.rb", 3)))
        .unwrap_err();
    assert!(matches!(err, Error::Contract(ref e) if e.kind == ContractKind::Interface));
    assert_eq!(
        rt.instantiate(module).unwrap_err(),
        HierarchyError::ModuleInstantiation("Drawable".into())
    );
}

#[test]
fn test_final_and_sealed_are_exclusive() {
    let rt = Runtime::new();
    let a = rt.define_class("A", None, loc("a.rb", 1)).unwrap();
    rt.final_(a).unwrap();
    assert_eq!(rt.final_(a).unwrap_err(), HierarchyError::FinalTwice("A".into()));
    assert_eq!(
        rt.sealed(a, loc("a.rb", 2)).unwrap_err(),
        HierarchyError::SealedAfterFinal("A".into())
    );

    let b = rt.define_class("B", None, loc("b.rb", 1)).unwrap();
    rt.sealed(b, loc("b.rb", 2)).unwrap();
    assert_eq!(
        rt.sealed(b, loc("b.rb", 3)).unwrap_err(),
        HierarchyError::SealedTwice("B".into())
    );
    assert_eq!(rt.final_(b).unwrap_err(), HierarchyError::FinalAfterSealed("B".into()));
}

#[test]
fn test_sealed_subclasses_are_recorded() {
    let rt = Runtime::new();
    let parent = rt.define_class("Result", None, loc("lib/result.rb", 1)).unwrap();
    rt.sealed(parent, loc("lib/result.rb", 2)).unwrap();
    let ok = rt.define_class("Ok", Some(parent), loc("lib/result.rb", 5)).unwrap();
    let err = rt.define_class("Err", Some(parent), loc("lib/result.rb", 9)).unwrap();
    assert_eq!(rt.sealed_subclasses(parent), vec![ok, err]);
    assert!(rt.sealed_subclasses(ok).is_empty());
}

#[test]
fn test_enum_members() {
    let rt = Runtime::new();
    let (suit, members) = rt
        .define_enum("Suit", &["Spades", "Hearts"], loc("lib/suit.rb", 1))
        .unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(rt.inspect(&Value::Object(members[1].clone())), "#<Suit::Hearts>");
    assert_eq!(
        rt.instantiate(suit).unwrap_err(),
        HierarchyError::EnumInstantiation("Suit".into())
    );
    assert!(matches!(
        rt.define_class("Jokers", Some(suit), loc("lib/suit.rb", 20)),
        Err(HierarchyError::Final { .. })
    ));
}

#[test]
fn test_build_error_handler_installs_unvalidated() {
    let rt = Runtime::new();
    let class = rt.define_class("Box", None, loc("lib/box.rb", 1)).unwrap();
    rt.handlers().set_sig_build_error_handler(|_| Ok(()));
    let def = MethodDef::new(
        "put",
        vec![MethodParam::req("x")],
        loc("lib/box.rb", 3),
        |_, args| Ok(args.get(0).cloned().unwrap_or(Value::Nil)),
    );
    // `y` does not exist on the method.
    rt.define_method(class, def, Some(sig(2).params([("y", "Integer")]).and_then(|b| b.returns("Integer"))))
        .unwrap();
    assert!(rt.signature_for(class, "put").is_none());
    let boxed = rt.instantiate(class).unwrap();
    let args = Args::positional(SourceLocation::unknown(), [Value::string("s")]);
    assert_eq!(rt.call(&boxed, "put", &args).unwrap(), Value::string("s"));
}

#[test]
fn test_declaration_errors_reach_the_observer() {
    use std::sync::{Arc, Mutex};

    let rt = Runtime::new();
    let seen: Arc<Mutex<Vec<DeclarationError>>> = Arc::default();
    let sink = seen.clone();
    rt.handlers()
        .set_sig_decl_error_handler(move |e| sink.lock().unwrap().push(e.clone()));
    let class = rt.define_class("Box", None, loc("lib/box.rb", 1)).unwrap();
    let err = rt
        .define_method(class, area_def(3, 0.0), Some(sig(2).void().and_then(|b| b.returns("Float"))))
        .unwrap_err();
    assert!(matches!(err, Error::Declaration(_)));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn test_default_checked_level_comes_from_config() {
    let mut config = ValidationConfig::default();
    config.default_checked_level = CheckedLevel::Never;
    let rt = Runtime::with_config(config);
    let class = rt.define_class("Box", None, loc("lib/box.rb", 1)).unwrap();
    rt.define_method(class, area_def(3, 0.0), Some(sig(2).returns("String")))
        .unwrap();
    let boxed = rt.instantiate(class).unwrap();
    assert_eq!(
        rt.call(&boxed, "area", &Args::new(SourceLocation::unknown())).unwrap(),
        Value::Float(0.0)
    );
    assert_eq!(
        rt.signature_for(class, "area").unwrap().checked,
        CheckedLevel::Never
    );
}

#[test]
fn test_dropped_body_reports_its_pending_sig() {
    use std::sync::{Arc, Mutex};

    let rt = Runtime::new();
    let seen: Arc<Mutex<Vec<DeclarationError>>> = Arc::default();
    let sink = seen.clone();
    rt.handlers()
        .set_sig_decl_error_handler(move |e| sink.lock().unwrap().push(e.clone()));
    let class = rt.define_class("Box", None, loc("lib/box.rb", 1)).unwrap();
    {
        let mut body = rt.class_body(class);
        body.sig(sig(2).void()).unwrap();
    }
    let captured = seen.lock().unwrap().clone();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].message, "sig with no following method");
    assert_eq!(captured[0].location, loc("lib/shapes.rb", 2));

    rt.class_body(class).finish().unwrap();
    assert_eq!(seen.lock().unwrap().len(), 1);
}
