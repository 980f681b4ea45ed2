use super::*;

#[test]
fn arity_accepts() {
    assert!(Arity::Exact(2).accepts(2));
    assert!(!Arity::Exact(2).accepts(3));
    assert!(Arity::AtLeast(0).accepts(0));
    assert!(Arity::AtLeast(1).accepts(7));
    assert!(Arity::Between(1, 2).accepts(2));
    assert!(!Arity::Between(1, 2).accepts(0));
}

#[test]
fn arity_display() {
    assert_eq!(Arity::Exact(1).to_string(), "1");
    assert_eq!(Arity::AtLeast(1).to_string(), "1 or more");
    assert_eq!(Arity::Between(1, 2).to_string(), "1 or 2");
    assert_eq!(Arity::Between(0, 3).to_string(), "0 to 3");
}

#[test]
fn native_display() {
    let native = NativeFunction::forced("is_number", Arity::Exact(1), |_, args| {
        Ok(Value::Bool(matches!(args[0], Value::Number(_))).into())
    });
    assert_eq!(
        Value::Native(Rc::new(native)).to_string(),
        "function is_number() { [native code] }"
    );
}
