use super::*;

fn loc(file: &str, line: u32) -> Option<SourceLocation> {
    Some(SourceLocation::new(file, line))
}

#[test]
fn test_builtins_are_registered() {
    let table = ClassTable::new();
    assert_eq!(table.len(), ClassId::FIRST_USER as usize);
    assert_eq!(table.lookup("Integer"), Some(ClassId::INTEGER));
    assert_eq!(&*table.name(ClassId::NIL_CLASS), "NilClass");
    assert_eq!(table.kind(ClassId::ENUMERABLE), Some(ClassKind::Module));
    assert!(ClassId::CLASS.is_builtin());
}

#[test]
fn test_builtin_ancestry() {
    let table = ClassTable::new();
    assert!(table.is_subclass_of(ClassId::INTEGER, ClassId::NUMERIC));
    assert!(table.is_subclass_of(ClassId::INTEGER, ClassId::COMPARABLE));
    assert!(table.is_subclass_of(ClassId::INTEGER, ClassId::KERNEL));
    assert!(table.is_subclass_of(ClassId::INTEGER, ClassId::BASIC_OBJECT));
    assert!(table.is_subclass_of(ClassId::ARRAY, ClassId::ENUMERABLE));
    assert!(table.is_subclass_of(ClassId::CLASS, ClassId::MODULE));
    assert!(!table.is_subclass_of(ClassId::STRING, ClassId::NUMERIC));
    assert!(!table.is_subclass_of(ClassId::NUMERIC, ClassId::INTEGER));
}

#[test]
fn test_linearisation_order() {
    let table = ClassTable::new();
    let m1 = table.define_module("M1", None).unwrap();
    let m2 = table.define_module("M2", None).unwrap();
    let base = table.define_class("Base", None, None).unwrap();
    let child = table.define_class("Child", Some(base), None).unwrap();
    table.add_include(child, m1).unwrap();
    table.add_include(child, m2).unwrap();

    let ancestors = table.ancestors(child);
    // Most recently included module comes first.
    assert_eq!(&ancestors[..4], &[child, m2, m1, base]);
    assert_eq!(ancestors.last(), Some(&ClassId::BASIC_OBJECT));
}

#[test]
fn test_module_in_superclass_chain_not_repeated() {
    let table = ClassTable::new();
    let m = table.define_module("M", None).unwrap();
    let base = table.define_class("Base", None, None).unwrap();
    table.add_include(base, m).unwrap();
    let child = table.define_class("Child", Some(base), None).unwrap();
    table.add_include(child, m).unwrap();

    let ancestors = table.ancestors(child);
    assert_eq!(ancestors.iter().filter(|&&a| a == m).count(), 1);
    assert_eq!(&ancestors[..3], &[child, base, m]);
}

#[test]
fn test_ancestor_cache_invalidated_by_include() {
    let table = ClassTable::new();
    let m = table.define_module("M", None).unwrap();
    let foo = table.define_class("Foo", None, None).unwrap();
    assert!(!table.is_subclass_of(foo, m));
    table.add_include(foo, m).unwrap();
    assert!(table.is_subclass_of(foo, m));
}

#[test]
fn test_definition_errors() {
    let table = ClassTable::new();
    let m = table.define_module("M", None).unwrap();
    let foo = table.define_class("Foo", None, None).unwrap();

    assert_eq!(
        table.define_class("Foo", None, None),
        Err(ClassTableError::DuplicateName("Foo".into()))
    );
    assert_eq!(
        table.define_class("Bar", Some(m), None),
        Err(ClassTableError::SuperclassNotAClass("M".into()))
    );
    assert_eq!(
        table.add_include(m, foo),
        Err(ClassTableError::NotAModule("Foo".into()))
    );
    assert!(matches!(
        table.add_include(m, m),
        Err(ClassTableError::CyclicInclude { .. })
    ));
    assert_eq!(
        table.add_flags(ClassId(9999), ClassFlags::FINAL),
        Err(ClassTableError::UnknownClass(ClassId(9999)))
    );
}

#[test]
fn test_include_cycle_rejected() {
    let table = ClassTable::new();
    let a = table.define_module("A", None).unwrap();
    let b = table.define_module("B", None).unwrap();
    table.add_include(a, b).unwrap();
    assert!(matches!(
        table.add_include(b, a),
        Err(ClassTableError::CyclicInclude { .. })
    ));
}

#[test]
fn test_flags_and_location() {
    let table = ClassTable::new();
    let foo = table.define_class("Foo", None, loc("foo.rb", 3)).unwrap();
    table.add_flags(foo, ClassFlags::ABSTRACT).unwrap();
    table.add_flags(foo, ClassFlags::SEALED).unwrap();

    let info = table.get(foo).unwrap();
    assert!(info.is_abstract());
    assert!(info.flags.contains(ClassFlags::SEALED));
    assert_eq!(table.location(foo).unwrap().to_string(), "foo.rb:3");
    assert_eq!(table.location(ClassId::INTEGER), None);
}

#[test]
fn test_singleton_ancestors_include_extended_modules() {
    let table = ClassTable::new();
    let helpers = table.define_module("Helpers", None).unwrap();
    let base = table.define_class("Base", None, None).unwrap();
    table.add_extend(base, helpers).unwrap();
    let child = table.define_class("Child", Some(base), None).unwrap();

    let singleton = table.singleton_ancestors(child);
    assert!(singleton.contains(&helpers));
    assert!(singleton.contains(&ClassId::CLASS));
    assert!(singleton.contains(&ClassId::MODULE));

    let module_singleton = table.singleton_ancestors(helpers);
    assert!(module_singleton.contains(&ClassId::MODULE));
    assert!(!module_singleton.contains(&ClassId::CLASS));
}

#[test]
fn test_enum_value_lookup_by_label() {
    let table = ClassTable::new();
    let suit = table.define_class("Suit", None, None).unwrap();
    let spades = ObjectRef::labelled(suit, "Suit::Spades");
    let hearts = ObjectRef::labelled(suit, "Suit::Hearts");
    table.register_enum_value(suit, spades.clone()).unwrap();
    table.register_enum_value(suit, hearts).unwrap();

    assert_eq!(table.enum_values(suit).len(), 2);
    assert_eq!(table.enum_value_by_label(suit, "Spades"), Some(spades));
    assert_eq!(table.enum_value_by_label(suit, "Clubs"), None);
}

#[test]
fn test_enum_serialization_defaults_to_lowercased_label() {
    let table = ClassTable::new();
    let suit = table.define_class("Suit", None, None).unwrap();
    let spades = ObjectRef::labelled(suit, "Suit::Spades");
    table.register_enum_value(suit, spades.clone()).unwrap();

    assert_eq!(table.serialize(&spades), Some(Value::string("spades")));
    assert_eq!(table.deserialize(suit, &Value::string("spades")), Ok(spades.clone()));
    assert!(table.has_serialized(suit, &Value::string("spades")));
    assert!(!table.has_serialized(suit, &Value::string("Spades")));
    assert_eq!(table.try_deserialize(suit, &Value::string("clubs")), None);
    assert_eq!(table.serialize(&ObjectRef::new(suit)), None);
}

#[test]
fn test_enum_deserialize_unknown_value() {
    let table = ClassTable::new();
    let suit = table.define_class("Suit", None, None).unwrap();
    table
        .register_enum_value(suit, ObjectRef::labelled(suit, "Suit::Hearts"))
        .unwrap();
    let err = table.deserialize(suit, &Value::string("joker")).unwrap_err();
    assert_eq!(err.to_string(), "Enum Suit key not found: \"joker\"");
    let err = table.deserialize(suit, &Value::Integer(3)).unwrap_err();
    assert_eq!(err.to_string(), "Enum Suit key not found: 3");
}

#[test]
fn test_enum_explicit_serializations_are_unique() {
    let table = ClassTable::new();
    let level = table.define_class("Level", None, None).unwrap();
    let low = ObjectRef::labelled(level, "Level::Low");
    table
        .register_enum_value_serialized(level, low.clone(), Value::Integer(1))
        .unwrap();
    assert_eq!(table.deserialize(level, &Value::Integer(1)), Ok(low));

    let err = table
        .register_enum_value_serialized(level, ObjectRef::labelled(level, "Level::Min"), Value::Integer(1))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Enum values must have unique serializations. Value '1' is repeated on Level."
    );
    assert_eq!(table.enum_values(level).len(), 1);
}
