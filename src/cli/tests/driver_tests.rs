use super::args::Command;
use super::driver::{Outcome, execute};
use rtype_sig::ValidationConfig;

fn run(command: Command) -> Outcome {
    execute(&command, ValidationConfig::default()).unwrap()
}

#[test]
fn subtype_holds() {
    let outcome = run(Command::Subtype {
        sub: "Integer".into(),
        sup: "T.nilable(Numeric)".into(),
    });
    assert_eq!(
        outcome,
        Outcome::Subtype {
            sub: "Integer".into(),
            sup: "T.nilable(Numeric)".into(),
            holds: true,
            equivalent: false,
        }
    );
    assert_eq!(outcome.exit_code(), 0);
}

#[test]
fn subtype_fails() {
    let outcome = run(Command::Subtype {
        sub: "T.nilable(Integer)".into(),
        sup: "Integer".into(),
    });
    assert!(matches!(outcome, Outcome::Subtype { holds: false, .. }));
    assert_eq!(outcome.exit_code(), 1);
}

#[test]
fn name_is_canonical() {
    let outcome = run(Command::Name {
        expr: "T.any(NilClass, Integer)".into(),
    });
    assert_eq!(outcome, Outcome::Name("T.nilable(Integer)".into()));
}

#[test]
fn shallow_and_deep_validation() {
    let shallow = run(Command::Valid {
        expr: "T::Array[Integer]".into(),
        json: r#"[1, "two"]"#.into(),
        deep: false,
    });
    assert_eq!(shallow.exit_code(), 0);

    let deep = run(Command::Valid {
        expr: "T::Array[Integer]".into(),
        json: r#"[1, "two"]"#.into(),
        deep: true,
    });
    let Outcome::Valid { mismatch: Some(message), .. } = &deep else {
        panic!("expected a mismatch, got {deep:?}");
    };
    assert_eq!(
        message,
        "Expected type T::Array[Integer], got T::Array[T.any(Integer, String)]"
    );
}

#[test]
fn bad_inputs_are_errors() {
    let err = execute(
        &Command::Name { expr: "T.nilable(".into() },
        ValidationConfig::default(),
    )
    .unwrap_err();
    assert!(err.to_string().starts_with("cannot parse type `T.nilable(`"));

    let err = execute(
        &Command::Valid {
            expr: "Integer".into(),
            json: "{oops".into(),
            deep: false,
        },
        ValidationConfig::default(),
    )
    .unwrap_err();
    assert!(err.to_string().starts_with("invalid JSON"));
}
