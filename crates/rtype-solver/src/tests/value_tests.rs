use super::*;

#[test]
fn test_class_of_scalars() {
    let classes = ClassTable::new();
    assert_eq!(Value::Nil.class_id(&classes), ClassId::NIL_CLASS);
    assert_eq!(Value::Bool(true).class_id(&classes), ClassId::TRUE_CLASS);
    assert_eq!(Value::Integer(3).class_id(&classes), ClassId::INTEGER);
    assert_eq!(Value::from(1.5).class_id(&classes), ClassId::FLOAT);
    assert_eq!(Value::symbol("a").class_id(&classes), ClassId::SYMBOL);
    assert_eq!(Value::Class(ClassId::INTEGER).class_id(&classes), ClassId::CLASS);
    assert_eq!(Value::Class(ClassId::KERNEL).class_id(&classes), ClassId::MODULE);
}

#[test]
fn test_is_a_follows_ancestry() {
    let classes = ClassTable::new();
    assert!(Value::Integer(3).is_a(ClassId::NUMERIC, &classes));
    assert!(Value::Integer(3).is_a(ClassId::COMPARABLE, &classes));
    assert!(!Value::from("x").is_a(ClassId::NUMERIC, &classes));
    assert!(Value::array([]).is_a(ClassId::ENUMERABLE, &classes));
    // Class objects are instances of Class (and Module).
    assert!(Value::Class(ClassId::STRING).is_a(ClassId::MODULE, &classes));
}

#[test]
fn test_set_deduplicates() {
    let set = Value::set([Value::Integer(1), Value::Integer(1), Value::Integer(2)]);
    assert_eq!(set.elements().map(<[Value]>::len), Some(2));
}

#[test]
fn test_object_identity() {
    let classes = ClassTable::new();
    let foo = classes.define_class("Foo", None, None).unwrap();
    let a = ObjectRef::new(foo);
    let b = ObjectRef::new(foo);
    assert_ne!(a, b);
    assert_eq!(a, a.clone());
    assert_eq!(Value::from(a.clone()).class_id(&classes), foo);
    assert_ne!(ProcRef::new(1), ProcRef::new(1));
}

#[test]
fn test_from_json() {
    let json: serde_json::Value =
        serde_json::from_str(r#"{"a": [1, 2.5, null, true], "b": "x"}"#).unwrap();
    let value = Value::from_json(&json);
    let expected = Value::hash([
        (
            Value::string("a"),
            Value::array([
                Value::Integer(1),
                Value::Float(2.5),
                Value::Nil,
                Value::Bool(true),
            ]),
        ),
        (Value::string("b"), Value::string("x")),
    ]);
    assert_eq!(value, expected);
}

#[test]
fn test_inspect_scalars_and_containers() {
    let classes = ClassTable::new();
    let opts = InspectOptions::default();
    assert_eq!(Value::Nil.inspect(&classes, &opts), "nil");
    assert_eq!(Value::from(2.0).inspect(&classes, &opts), "2.0");
    assert_eq!(Value::from("hi").inspect(&classes, &opts), "\"hi\"");
    assert_eq!(Value::symbol("ok").inspect(&classes, &opts), ":ok");
    assert_eq!(
        Value::array([Value::Integer(1), Value::from("a")]).inspect(&classes, &opts),
        "[1, \"a\"]"
    );
    assert_eq!(
        Value::hash([(Value::symbol("k"), Value::Integer(1))]).inspect(&classes, &opts),
        "{:k => 1}"
    );
    assert_eq!(
        Value::range(Value::Integer(1), Value::Nil).inspect(&classes, &opts),
        "1.."
    );
    assert_eq!(Value::Class(ClassId::STRING).inspect(&classes, &opts), "String");
}

#[test]
fn test_inspect_respects_limits() {
    let classes = ClassTable::new();
    let opts = InspectOptions {
        max_length: 64,
        max_depth: 1,
        max_elements: 2,
    };
    let wide = Value::array((0..5).map(Value::Integer));
    assert_eq!(wide.inspect(&classes, &opts), "[0, 1, ...]");

    let nested = Value::array([Value::array([Value::Integer(1)])]);
    assert_eq!(nested.inspect(&classes, &opts), "[[...]]");

    let short = InspectOptions {
        max_length: 10,
        ..opts
    };
    let long = Value::string("abcdefghijklmnop");
    assert_eq!(long.inspect(&classes, &short), "\"abcdefghi...");
}

#[test]
fn test_inspect_of_huge_string_is_capped() {
    let classes = ClassTable::new();
    let opts = InspectOptions::default();
    let huge = Value::string("\"x\n".repeat(2 * 1024 * 1024));
    let rendered = huge.inspect(&classes, &opts);
    assert_eq!(rendered.chars().count(), opts.max_length + 3);
    assert!(rendered.starts_with("\"\\\"x\\n\\\"x"));
    assert!(rendered.ends_with("..."));

    let many = Value::array(std::iter::repeat_n(huge, 1000));
    let rendered = many.inspect(&classes, &opts);
    assert_eq!(rendered.chars().count(), opts.max_length + 3);
}

#[test]
fn test_inspect_escapes_like_debug() {
    let classes = ClassTable::new();
    let opts = InspectOptions::default();
    for s in ["tab\there", "quote\"d", "it's", "caf\u{e9}", "nul\0"] {
        assert_eq!(Value::from(s).inspect(&classes, &opts), format!("{s:?}"));
    }
}

#[test]
fn test_inspect_at_exact_limit_is_not_truncated() {
    let classes = ClassTable::new();
    let opts = InspectOptions {
        max_length: 5,
        ..InspectOptions::default()
    };
    assert_eq!(Value::from("abc").inspect(&classes, &opts), "\"abc\"");
    assert_eq!(Value::from("abcd").inspect(&classes, &opts), "\"abcd...");
}

#[test]
fn test_inspect_options_deserialize_with_defaults() {
    let opts: InspectOptions = serde_json::from_str(r#"{"max_length": 40}"#).unwrap();
    assert_eq!(opts.max_length, 40);
    assert_eq!(opts.max_depth, InspectOptions::default().max_depth);
}
