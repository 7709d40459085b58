use std::io;

use eldr::{
    builtins::{Host, SharedBuffer},
    Config, ErrorKind, Outcome, Session,
};

fn session_with_input(input: &str) -> (Session, SharedBuffer) {
    let output = SharedBuffer::default();
    let host = Host::with_io(
        Box::new(output.clone()),
        Box::new(io::Cursor::new(input.as_bytes().to_vec())),
    );
    (Session::with_host(Config::default(), host), output)
}

fn session() -> Session {
    session_with_input("").0
}

fn value(session: &mut Session, source: &str) -> String {
    match session.run(source) {
        Outcome::Value(value) => value.map(|v| v.to_string()).unwrap_or_default(),
        other => panic!("{:?} failed:\n{}", source, other),
    }
}

fn runtime_errors(session: &mut Session, source: &str) -> Vec<ErrorKind> {
    match session.run(source) {
        Outcome::RuntimeErrors(errors) => errors.iter().map(|e| e.kind.clone()).collect(),
        other => panic!("{:?} did not fail at runtime: {}", source, other),
    }
}

#[test]
fn evaluates_basic_statements() {
    let cases = [
        ("1+1;", "2"),
        ("10/2;", "5"),
        ("true==true;", "true"),
        ("var a=1; a;", "1"),
        (
            "var abc=\"hello\"; abc=abc+\" world\"; abc;",
            "hello world",
        ),
        (
            "fun hello(second){ return \"hello \" + second; } hello(\"world\");",
            "hello world",
        ),
    ];

    for (source, expected) in cases {
        assert_eq!(value(&mut session(), source), expected, "{}", source);
    }
}

#[test]
fn bindings_survive_between_runs() {
    let mut session = session();
    assert_eq!(value(&mut session, "var a = 40;"), "");
    assert_eq!(value(&mut session, "fun add(x, y) { return x + y; }"), "");
    assert_eq!(value(&mut session, "add(a, 2);"), "42");
}

#[test]
fn block_locals_are_gone_after_the_block() {
    let mut session = session();
    assert_eq!(
        runtime_errors(&mut session, "{ var b = -1; b; } b;"),
        vec![ErrorKind::IdentNotFound("b".into())]
    );
}

#[test]
fn parameters_do_not_leak_to_the_caller() {
    let mut session = session();
    value(&mut session, "fun f(p) { return p; } f(1);");
    assert_eq!(
        runtime_errors(&mut session, "p;"),
        vec![ErrorKind::IdentNotFound("p".into())]
    );
}

#[test]
fn assigning_an_undeclared_name_creates_nothing() {
    let mut session = session();
    assert_eq!(
        runtime_errors(&mut session, "x = 5;"),
        vec![ErrorKind::IdentNotFound("x".into())]
    );
    assert_eq!(
        runtime_errors(&mut session, "x;"),
        vec![ErrorKind::IdentNotFound("x".into())]
    );
}

#[test]
fn wrong_arity_never_runs_the_body() {
    let (mut session, output) = session_with_input("");
    value(&mut session, "fun pair(a, b) { print(\"ran\"); }");

    for source in ["pair(1);", "pair(1, 2, 3);"] {
        let errors = session.run(source);
        let kinds: Vec<ErrorKind> = errors
            .errors()
            .map(|errors| errors.iter().map(|e| e.kind.clone()).collect())
            .unwrap_or_default();
        assert_eq!(kinds.len(), 1, "{}", source);
        assert!(matches!(
            kinds[0],
            ErrorKind::ArityMismatch { expected: 2, .. }
        ));
    }
    assert_eq!(output.contents(), "");

    value(&mut session, "pair(1, 2);");
    assert_eq!(output.contents(), "ran");
}

#[test]
fn string_equality_is_not_supported() {
    let mut session = session();
    assert_eq!(
        runtime_errors(&mut session, "\"a\" == \"a\";"),
        vec![ErrorKind::InvalidOperator]
    );
}

#[test]
fn division_by_zero_is_an_error() {
    let mut session = session();
    let outcome = session.run("1 / 0;");
    assert_eq!(outcome.to_string(), "* Error at L1 division by zero");
}

#[test]
fn parse_errors_skip_evaluation() {
    let (mut session, output) = session_with_input("");
    let outcome = session.run("print(\"side effect\");\nvar = 1;");

    assert!(matches!(outcome, Outcome::ParseErrors(_)));
    assert_eq!(
        outcome.to_string(),
        "* Error at L2 expected name declaration but got \"=\""
    );
    assert_eq!(output.contents(), "");
}

#[test]
fn runtime_errors_report_their_line() {
    let mut session = session();
    let outcome = session.run("var a = 1;\n\na + missing;");
    assert_eq!(outcome.to_string(), "* Error at L3 identifier not found: missing");
}

#[test]
fn loops_count_and_break() {
    let (mut session, output) = session_with_input("");
    value(
        &mut session,
        "loop (var i = 0; i < 5; i = i + 1) { if (i == 3) { break; } print(i, \" \"); }",
    );
    assert_eq!(output.contents(), "0 1 2 ");

    assert_eq!(
        value(
            &mut session,
            "var n = 0; loop { n = n + 2; if (n > 9) { break; } } n;"
        ),
        "10"
    );
}

#[test]
fn functions_declared_inside_functions() {
    let mut session = session();
    assert_eq!(
        value(
            &mut session,
            "fun outer() { fun fact(n) { if (n < 2) { return 1; } return n * fact(n - 1); } return fact(4); } outer();"
        ),
        "24"
    );
    assert_eq!(
        value(
            &mut session,
            "{ var base = 10; fun add(x) { return x + base; } add(1); }"
        ),
        "11"
    );
}

#[test]
fn recursive_functions() {
    let mut session = session();
    value(
        &mut session,
        "fun fact(n) { if (n < 2) { return 1; } return n * fact(n - 1); }",
    );
    assert_eq!(value(&mut session, "fact(10);"), "3628800");
}

#[test]
fn runaway_recursion_is_stopped() {
    let config = Config {
        max_call_depth: 25,
        ..Config::default()
    };
    let mut session = Session::with_config(config);
    assert_eq!(
        runtime_errors(&mut session, "fun down(n) { return down(n - 1); } down(0);"),
        vec![ErrorKind::CallDepthExceeded(25)]
    );
    assert_eq!(value(&mut session, "1;"), "1");
}

#[test]
fn scan_reads_typed_input() {
    let (mut session, output) = session_with_input("Ada\n36\n");
    value(
        &mut session,
        "var name = scan(\"\"); var age = scan(0); println(name, \" is \", age + 1);",
    );
    assert_eq!(output.contents(), "Ada is 37\n");
}

#[test]
fn scan_stores_into_its_variable() {
    let (mut session, output) = session_with_input("typed\n42\n");
    assert_eq!(value(&mut session, "var x = \"\"; scan(x); x;"), "typed");
    assert_eq!(value(&mut session, "var n = 0; scan(n); n + 1;"), "43");
    assert_eq!(output.contents(), "");
}

#[test]
fn len_counts_utf8_bytes() {
    let mut session = session();
    assert_eq!(value(&mut session, "len(\"h\u{e9}llo\");"), "6");
    assert_eq!(value(&mut session, "len(\"hello\");"), "5");
}

#[test]
fn print_writes_only_textual_values() {
    let (mut session, output) = session_with_input("");
    value(
        &mut session,
        "var nothing; fun f() { return 1; } print(\"a\", nothing, 1, f, len, false); println();",
    );
    assert_eq!(output.contents(), "a1false\n");
}

#[test]
fn files_can_be_written_and_read_back() {
    let path = std::env::temp_dir().join(format!("eldr-session-{}.txt", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let path = path.to_string_lossy().into_owned();

    let mut session = session();
    value(
        &mut session,
        &format!(
            "var f = fopen(\"{}\"); fwrite(f, \"first\"); fwrite(f, \" second\"); fclose(f);",
            path
        ),
    );
    assert_eq!(session.host().open_files(), 0);

    let contents = value(
        &mut session,
        &format!(
            "var g = fopen(\"{}\"); var text = fread(g); fclose(g); text;",
            path
        ),
    );
    assert_eq!(contents, "first second");

    let _ = std::fs::remove_file(&path);
}

#[test]
fn builtin_failures_are_runtime_errors() {
    let mut session = session();
    let outcome = session.run("len(5);");
    assert_eq!(
        outcome.to_string(),
        "* Error at L1 len: expected string argument but got integer"
    );
    assert_eq!(
        runtime_errors(&mut session, "fclose(99);"),
        vec![ErrorKind::Builtin {
            builtin: "fclose",
            message: "invalid file handle 99".into()
        }]
    );
}

#[test]
fn namespace_is_taken_from_config() {
    let config = Config {
        namespace: "scratch".to_string(),
        ..Config::default()
    };
    let session = Session::with_config(config);
    let (package, errors) = session.parse("1;");
    assert!(errors.is_empty());
    assert_eq!(package.namespace, "scratch");
}
