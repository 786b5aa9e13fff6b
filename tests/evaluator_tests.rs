use kestrel::value::HashKeyType;
use kestrel::{parse, Builtins, Environment, Evaluator, HashKey, Io, KestrelError, Span, Value};
use pretty_assertions::assert_eq;
use std::io;

fn evaluator() -> Evaluator {
    Evaluator::with_io(
        Builtins::standard(),
        Io::new(Box::new(io::sink()), Box::new(io::empty())),
    )
}

fn eval_in(input: &str, env: &Environment) -> Result<Option<Value>, KestrelError> {
    let (program, errors) = parse(input);
    assert!(errors.is_empty(), "parse errors for {:?}: {:?}", input, errors);
    evaluator().evaluate_program(&program, env)
}

fn eval(input: &str) -> Value {
    match eval_in(input, &Environment::new()) {
        Ok(Some(value)) => value,
        Ok(None) => panic!("{:?} produced no value", input),
        Err(error) => panic!("{:?} failed: {}", input, error),
    }
}

fn eval_error(input: &str) -> String {
    match eval_in(input, &Environment::new()) {
        Err(error) => error.message,
        Ok(value) => panic!("{:?} should fail, got {:?}", input, value),
    }
}

#[test]
fn integer_arithmetic() {
    let cases = [
        ("5", 5),
        ("10", 10),
        ("-5", -5),
        ("-10", -10),
        ("5 + 5 + 5 + 5 - 10", 10),
        ("2 * 2 * 2 * 2 * 2", 32),
        ("-50 + 100 + -50", 0),
        ("5 * 2 + 10", 20),
        ("5 + 2 * 10", 25),
        ("20 + 2 * -10", 0),
        ("50 / 2 * 2 + 10", 60),
        ("2 * (5 + 10)", 30),
        ("3 * 3 * 3 + 10", 37),
        ("3 * (3 * 3) + 10", 37),
        ("(5 + 10 * 2 + 15 / 3) * 2 + -10", 50),
        ("7 / 2", 3),
        ("-7 / 2", -3),
    ];

    for (input, expected) in cases {
        assert_eq!(eval(input), Value::Integer(expected), "input: {}", input);
    }
}

#[test]
fn integer_arithmetic_wraps() {
    assert_eq!(eval("9223372036854775807 + 1"), Value::Integer(i64::MIN));
    assert_eq!(eval("-9223372036854775807 - 2"), Value::Integer(i64::MAX));
}

#[test]
fn boolean_expressions() {
    let cases = [
        ("true", true),
        ("false", false),
        ("1 < 2", true),
        ("1 > 2", false),
        ("1 < 1", false),
        ("1 > 1", false),
        ("1 == 1", true),
        ("1 != 1", false),
        ("1 == 2", false),
        ("1 != 2", true),
        ("true == true", true),
        ("false == false", true),
        ("true == false", false),
        ("true != false", true),
        ("false != true", true),
        ("(1 < 2) == true", true),
        ("(1 < 2) == false", false),
        ("(1 > 2) == true", false),
        ("(1 > 2) == false", true),
    ];

    for (input, expected) in cases {
        assert_eq!(eval(input), Value::Boolean(expected), "input: {}", input);
    }
}

#[test]
fn bang_operator() {
    let cases = [
        ("!true", false),
        ("!false", true),
        ("!5", false),
        ("!!true", true),
        ("!!false", false),
        ("!!5", true),
        ("!\"\"", false),
        ("!if (false) { 1 }", true),
    ];

    for (input, expected) in cases {
        assert_eq!(eval(input), Value::Boolean(expected), "input: {}", input);
    }
}

#[test]
fn if_else_expressions() {
    let cases = [
        ("if (true) { 10 }", Value::Integer(10)),
        ("if (false) { 10 }", Value::Null),
        ("if (1) { 10 }", Value::Integer(10)),
        ("if (1 < 2) { 10 }", Value::Integer(10)),
        ("if (1 > 2) { 10 }", Value::Null),
        ("if (1 > 2) { 10 } else { 20 }", Value::Integer(20)),
        ("if (1 < 2) { 10 } else { 20 }", Value::Integer(10)),
        ("if (0) { 10 } else { 20 }", Value::Integer(10)),
        ("if (\"\") { 10 } else { 20 }", Value::Integer(10)),
        ("if (true) { }", Value::Null),
    ];

    for (input, expected) in cases {
        assert_eq!(eval(input), expected, "input: {}", input);
    }
}

#[test]
fn return_statements() {
    let cases = [
        ("return 10;", 10),
        ("return 10; 9;", 10),
        ("return 2 * 5; 9;", 10),
        ("9; return 2 * 5; 9;", 10),
        (
            "if (10 > 1) { if (10 > 1) { return 10; } return 1; }",
            10,
        ),
        (
            "let f = fn(x) { return x; x + 10; }; f(10);",
            10,
        ),
        (
            "let f = fn(x) { let result = x + 10; return result; return 10; }; f(10);",
            20,
        ),
    ];

    for (input, expected) in cases {
        assert_eq!(eval(input), Value::Integer(expected), "input: {}", input);
    }
}

#[test]
fn blocks_share_the_enclosing_scope() {
    assert_eq!(eval("if (true) { let a = 5; } a"), Value::Integer(5));
}

#[test]
fn runtime_error_messages() {
    let cases = [
        ("5 + true;", "type mismatch: INTEGER + BOOLEAN"),
        ("5 + true; 5;", "type mismatch: INTEGER + BOOLEAN"),
        ("-true", "unknown operator: -BOOLEAN"),
        ("true + false;", "unknown operator: BOOLEAN + BOOLEAN"),
        ("true > false;", "unknown operator: BOOLEAN > BOOLEAN"),
        ("5; true + false; 5", "unknown operator: BOOLEAN + BOOLEAN"),
        (
            "if (10 > 1) { true + false; }",
            "unknown operator: BOOLEAN + BOOLEAN",
        ),
        (
            "if (10 > 1) { if (10 > 1) { return true + false; } return 1; }",
            "unknown operator: BOOLEAN + BOOLEAN",
        ),
        ("foobar", "identifier not found: foobar"),
        (r#""Hello" - "World""#, "unknown operator: STRING - STRING"),
        (r#""a" < "b""#, "unknown operator: STRING < STRING"),
        (r#""a" == "a""#, "unknown operator: STRING == STRING"),
        (r#""a" != "b""#, "unknown operator: STRING != STRING"),
        (r#""a" == 1"#, "type mismatch: STRING == INTEGER"),
        (
            r#"{"name": "Kestrel"}[fn(x) { x }];"#,
            "unusable as hash key: FUNCTION",
        ),
        ("{[1]: 2}", "unusable as hash key: ARRAY"),
        ("[1, 2][true]", "index operator not supported: ARRAY"),
        ("1[0]", "index operator not supported: INTEGER"),
        ("5()", "not a function: INTEGER"),
        ("10 / 0", "division by zero: INTEGER / INTEGER"),
        ("[1] + [2]", "unknown operator: ARRAY + ARRAY"),
    ];

    for (input, expected) in cases {
        assert_eq!(eval_error(input), expected, "input: {}", input);
    }
}

#[test]
fn errors_stop_evaluation_immediately() {
    let env = Environment::new();
    let result = eval_in("let a = 1; let b = c; let d = 2;", &env);
    assert!(result.is_err());
    assert_eq!(env.get("a"), Some(Value::Integer(1)));
    assert_eq!(env.get("b"), None);
    assert_eq!(env.get("d"), None);

    assert_eq!(
        eval_error("let f = fn(x) { x }; f(missing, 1 / 0)"),
        "identifier not found: missing"
    );
}

#[test]
fn runtime_errors_point_at_the_failing_statement() {
    let result = eval_in("5;\nfoo;", &Environment::new());
    let error = result.expect_err("lookup should fail");
    assert_eq!(error.span, Span::new(3, 7));
}

#[test]
fn let_bindings() {
    let cases = [
        ("let a = 5; a;", 5),
        ("let a = 5 * 5; a;", 25),
        ("let a = 5; let b = a; b;", 5),
        ("let a = 5; let b = a; let c = a + b + 5; c;", 15),
        ("var a = 3; a;", 3),
        ("let a = 1; let a = a + 1; a", 2),
    ];

    for (input, expected) in cases {
        assert_eq!(eval(input), Value::Integer(expected), "input: {}", input);
    }
}

#[test]
fn let_produces_no_value() {
    assert_eq!(eval_in("let a = 5;", &Environment::new()), Ok(None));
    assert_eq!(eval_in("", &Environment::new()), Ok(None));
    assert_eq!(
        eval_in("1; let a = 5;", &Environment::new()),
        Ok(None)
    );
}

#[test]
fn function_values() {
    match eval("fn(x) { x + 2; };") {
        Value::Function(function) => {
            assert_eq!(function.literal.parameters.len(), 1);
            assert_eq!(function.literal.parameters[0].value, "x");
            assert_eq!(function.literal.body.to_string(), "(x + 2)");
        }
        other => panic!("expected a function, got {:?}", other),
    }
}

#[test]
fn function_application() {
    let cases = [
        ("let identity = fn(x) { x; }; identity(5);", 5),
        ("let identity = fn(x) { return x; }; identity(5);", 5),
        ("let double = fn(x) { x * 2; }; double(5);", 10),
        ("let add = fn(x, y) { x + y; }; add(5, 5);", 10),
        ("let add = fn(x, y) { x + y; }; add(5 + 5, add(5, 5));", 20),
        ("fn(x) { x; }(5)", 5),
    ];

    for (input, expected) in cases {
        assert_eq!(eval(input), Value::Integer(expected), "input: {}", input);
    }
}

#[test]
fn empty_function_body_returns_null() {
    assert_eq!(eval("fn() {}()"), Value::Null);
    assert_eq!(eval("let f = fn() { let x = 1; }; f()"), Value::Null);
}

#[test]
fn closures() {
    let input = "
let newAdder = fn(x) {
  fn(y) { x + y };
};

let addTwo = newAdder(2);
addTwo(2);";
    assert_eq!(eval(input), Value::Integer(4));
}

#[test]
fn closures_see_later_bindings() {
    assert_eq!(eval("let f = fn() { y }; let y = 5; f();"), Value::Integer(5));
}

#[test]
fn enclosed_environments_read_outward_and_write_locally() {
    let global = Environment::new();
    global.set("a", Value::Integer(1));

    let inner = global.enclosed();
    assert!(inner.outer().expect("has outer").ptr_eq(&global));
    assert!(global.outer().is_none());
    assert_eq!(inner.get("a"), Some(Value::Integer(1)));

    inner.set("a", Value::Integer(2));
    inner.set("b", Value::Integer(3));
    assert_eq!(inner.get("a"), Some(Value::Integer(2)));
    assert_eq!(global.get("a"), Some(Value::Integer(1)));
    assert_eq!(global.get("b"), None);

    // clones are handles to the same frame
    let alias = global.clone();
    alias.set("c", Value::Integer(4));
    assert!(alias.ptr_eq(&global));
    assert_eq!(inner.get("c"), Some(Value::Integer(4)));
}

#[test]
fn frames_held_only_by_their_own_closures_are_freed() {
    let env = Environment::new();
    eval_in("let h = fn(n) { let g = fn() { n }; g }; let c = h(1);", &env)
        .expect("runs");

    let call_frame = match env.get("c") {
        Some(Value::Function(function)) => function.env.downgrade(),
        other => panic!("expected a function, got {:?}", other),
    };

    // still reachable through `c`
    Environment::collect_cycles();
    assert!(call_frame.upgrade().is_some());
    assert_eq!(eval_in("c()", &env), Ok(Some(Value::Integer(1))));

    // rebinding `c` leaves the frame and `g` referencing only each other
    eval_in("let c = 2;", &env).expect("runs");
    assert!(call_frame.upgrade().is_none());
    assert_eq!(eval_in("h(5)()", &env), Ok(Some(Value::Integer(5))));

    let global = env.downgrade();
    eval_in("let f = fn() { 1 };", &env).expect("runs");
    drop(env);
    assert!(global.upgrade().is_some());
    assert!(Environment::collect_cycles() >= 1);
    assert!(global.upgrade().is_none());
}

#[test]
fn values_in_hand_keep_their_frames_alive() {
    let env = Environment::new();
    eval_in("let make = fn(n) { let get = fn() { n }; [get] };", &env).expect("runs");
    let held = eval_in("make(7)", &env)
        .expect("runs")
        .expect("an array");
    eval_in("let make = 0;", &env).expect("runs");
    Environment::collect_cycles();

    let other = Environment::new();
    other.set("held", held);
    assert_eq!(eval_in("held[0]()", &other), Ok(Some(Value::Integer(7))));
}

#[test]
fn calls_do_not_leak_bindings() {
    let env = Environment::new();
    let result = eval_in("let f = fn(x) { let inner = x; inner }; f(3)", &env);
    assert_eq!(result, Ok(Some(Value::Integer(3))));
    assert_eq!(env.get("inner"), None);
    assert_eq!(env.get("x"), None);
}

#[test]
fn recursion() {
    let input = "
let fib = fn(n) {
  if (n < 2) { n } else { fib(n - 1) + fib(n - 2) }
};
fib(15);";
    assert_eq!(eval(input), Value::Integer(610));
}

#[test]
fn arity_is_not_checked() {
    assert_eq!(eval("let f = fn(a, b) { a }; f(1)"), Value::Integer(1));
    assert_eq!(eval("let f = fn(a) { a }; f(1, 2, 3)"), Value::Integer(1));
    assert_eq!(
        eval_error("let f = fn(a, b) { b }; f(1)"),
        "identifier not found: b"
    );
}

#[test]
fn builtins_take_precedence_over_bindings() {
    assert_eq!(
        eval(r#"let len = fn(x) { 0 }; len("four")"#),
        Value::Integer(4)
    );
}

#[test]
fn string_literals_and_concatenation() {
    assert_eq!(eval(r#""Hello World!""#), Value::from("Hello World!"));
    assert_eq!(
        eval(r#""Hello" + " " + "World!""#),
        Value::from("Hello World!")
    );
}

#[test]
fn array_literals() {
    assert_eq!(
        eval("[1, 2 * 2, 3 + 3]"),
        Value::from(vec![
            Value::Integer(1),
            Value::Integer(4),
            Value::Integer(6)
        ])
    );
    assert_eq!(eval("[]"), Value::from(Vec::<Value>::new()));
}

#[test]
fn array_index_expressions() {
    let cases = [
        ("[1, 2, 3][0]", Value::Integer(1)),
        ("[1, 2, 3][1]", Value::Integer(2)),
        ("[1, 2, 3][2]", Value::Integer(3)),
        ("let i = 0; [1][i];", Value::Integer(1)),
        ("[1, 2, 3][1 + 1];", Value::Integer(3)),
        ("let myArray = [1, 2, 3]; myArray[2];", Value::Integer(3)),
        (
            "let myArray = [1, 2, 3]; myArray[0] + myArray[1] + myArray[2];",
            Value::Integer(6),
        ),
        (
            "let myArray = [1, 2, 3]; let i = myArray[0]; myArray[i]",
            Value::Integer(2),
        ),
        ("[1, 2, 3][3]", Value::Null),
        ("[1, 2, 3][-1]", Value::Null),
    ];

    for (input, expected) in cases {
        assert_eq!(eval(input), expected, "input: {}", input);
    }
}

#[test]
fn hash_literals() {
    let input = r#"
let two = "two";
{
  "one": 10 - 9,
  two: 1 + 1,
  "thr" + "ee": 6 / 2,
  4: 4,
  true: 5,
  false: 6
}"#;

    let pairs = match eval(input) {
        Value::Hash(pairs) => pairs,
        other => panic!("expected a hash, got {:?}", other),
    };

    let expected = [
        (Value::from("one"), 1),
        (Value::from("two"), 2),
        (Value::from("three"), 3),
        (Value::Integer(4), 4),
        (Value::Boolean(true), 5),
        (Value::Boolean(false), 6),
    ];
    assert_eq!(pairs.len(), expected.len());

    for (key, value) in expected {
        let hash_key = key.hash_key().expect("hashable key");
        let pair = pairs.get(&hash_key).expect("key present");
        assert_eq!(pair.key, key);
        assert_eq!(pair.value, Value::Integer(value));
    }
}

#[test]
fn later_hash_entries_win() {
    assert_eq!(eval(r#"{"a": 1, "a": 2}["a"]"#), Value::Integer(2));
    assert_eq!(eval(r#"{"a": 1, "a": 2}"#).to_string(), "{a: 2}");
}

#[test]
fn hash_index_expressions() {
    let cases = [
        (r#"{"foo": 5}["foo"]"#, Value::Integer(5)),
        (r#"{"foo": 5}["bar"]"#, Value::Null),
        (r#"let key = "foo"; {"foo": 5}[key]"#, Value::Integer(5)),
        (r#"{}["foo"]"#, Value::Null),
        ("{5: 5}[5]", Value::Integer(5)),
        ("{true: 5}[true]", Value::Integer(5)),
        ("{false: 5}[false]", Value::Integer(5)),
        ("{1: 5}[true]", Value::Null),
    ];

    for (input, expected) in cases {
        assert_eq!(eval(input), expected, "input: {}", input);
    }
}

#[test]
fn containers_compare_by_identity() {
    let cases = [
        ("let a = [1]; a == a", true),
        ("[1] == [1]", false),
        ("[1] != [1]", true),
        ("let h = {1: 2}; h == h", true),
        ("{1: 2} == {1: 2}", false),
        ("let f = fn() { 1 }; f == f", true),
        ("fn() { 1 } == fn() { 1 }", false),
        ("len == len", true),
        ("first == last", false),
        ("if (false) { 1 } == if (false) { 2 }", true),
    ];

    for (input, expected) in cases {
        assert_eq!(eval(input), Value::Boolean(expected), "input: {}", input);
    }
}

#[test]
fn hash_keys() {
    assert_eq!(
        Value::Integer(5).hash_key(),
        Ok(HashKey {
            key_type: HashKeyType::Integer,
            value: 5
        })
    );
    assert_eq!(
        Value::Boolean(true).hash_key(),
        Ok(HashKey {
            key_type: HashKeyType::Boolean,
            value: 1
        })
    );
    assert_eq!(
        Value::Boolean(false).hash_key().map(|key| key.value),
        Ok(0)
    );

    let hello = Value::from("Hello World").hash_key();
    assert_eq!(hello, Value::from("Hello World").hash_key());
    assert_eq!(hello.map(|key| key.value), Ok(2582));
    assert_eq!(
        Value::from("My name is johnny").hash_key().map(|key| key.value),
        Ok(2732)
    );

    // the integer 1 and `true` share a value but not a type
    assert_ne!(Value::Integer(1).hash_key(), Value::Boolean(true).hash_key());

    assert!(Value::Null.hash_key().is_err());
    assert!(Value::from(Vec::<Value>::new()).hash_key().is_err());
}

#[test]
fn distinct_strings_can_share_a_hash_key() {
    assert_eq!(
        Value::from("k6").hash_key(),
        Value::from("k20").hash_key()
    );
    assert_eq!(eval(r#"{"k6": 1}["k20"]"#), Value::Integer(1));
}

#[test]
fn programs_are_repeatable() {
    let input = "let a = [1, 2]; let f = fn(x) { x * 3 }; f(a[1])";
    let (program, errors) = parse(input);
    assert!(errors.is_empty());

    let mut evaluator = evaluator();
    let first = evaluator.evaluate_program(&program, &Environment::new());
    let second = evaluator.evaluate_program(&program, &Environment::new());
    assert_eq!(first, Ok(Some(Value::Integer(6))));
    assert_eq!(first, second);
}

#[test]
fn inspect_formats() {
    let cases = [
        ("5", "5"),
        ("-5", "-5"),
        ("true", "true"),
        ("if (false) { 1 }", "null"),
        (r#""plain text""#, "plain text"),
        (r#"[1, "two", [true]]"#, "[1, two, [true]]"),
        (r#"{2: "b", 1: "a"}"#, "{1: a, 2: b}"),
        ("{}", "{}"),
        ("fn(x, y) { x + y; }", "fn(x, y) {\n(x + y)\n}"),
        ("len", "builtin function"),
    ];

    for (input, expected) in cases {
        assert_eq!(eval(input).to_string(), expected, "input: {}", input);
    }
}

#[test]
fn type_names() {
    let cases = [
        ("1", "INTEGER"),
        ("true", "BOOLEAN"),
        (r#""s""#, "STRING"),
        ("if (false) { 1 }", "NULL"),
        ("[]", "ARRAY"),
        ("{}", "HASH"),
        ("fn() {}", "FUNCTION"),
        ("puts", "BUILTIN"),
    ];

    for (input, expected) in cases {
        assert_eq!(eval(input).type_name(), expected, "input: {}", input);
    }
}
