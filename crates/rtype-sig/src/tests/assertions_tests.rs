use super::*;
use crate::error::InlineTypeError;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn test_let_type_accepts_valid_value() {
    let rt = Runtime::new();
    let value = rt.let_type(Value::Integer(3), "T.nilable(Integer)").unwrap();
    assert_eq!(value, Value::Integer(3));
    assert!(rt.let_type(Value::Nil, "T.nilable(Integer)").is_ok());
}

#[test]
fn test_let_type_rejects_invalid_value() {
    let rt = Runtime::new();
    let err = rt.let_type(Value::string("3"), "Integer").unwrap_err();
    assert_eq!(
        err.message,
        "T.let: Expected type Integer, got type String with value \"3\""
    );
}

#[test]
fn test_cast_is_checked() {
    let rt = Runtime::new();
    assert!(rt.cast(Value::Float(1.0), "Float").is_ok());
    let err = rt.cast(Value::Float(1.0), "String").unwrap_err();
    assert!(err.message.starts_with("T.cast: Expected type String"));
}

#[test]
fn test_unknown_type_name() {
    let rt = Runtime::new();
    let err = rt.let_type(Value::Nil, "Nope").unwrap_err();
    assert!(err.message.starts_with("T.let: "));
}

#[test]
fn test_must() {
    let rt = Runtime::new();
    assert_eq!(rt.must(Value::Bool(false)).unwrap(), Value::Bool(false));
    assert_eq!(
        rt.must(Value::Nil).unwrap_err(),
        InlineTypeError {
            message: "Passed `nil` into T.must".to_string()
        }
    );
}

#[test]
fn test_handler_can_let_assertions_pass() {
    let rt = Runtime::new();
    let count = Arc::new(AtomicUsize::new(0));
    let counter = count.clone();
    rt.handlers().set_type_error_handler(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    assert!(rt.let_type(Value::string("x"), "Integer").is_ok());
    assert!(rt.must(Value::Nil).is_ok());
    assert_eq!(count.load(Ordering::SeqCst), 2);

    rt.handlers().reset();
    assert!(rt.must(Value::Nil).is_err());
}
