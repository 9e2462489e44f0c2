//! End-to-end interpreter tests: complete programs through the parser
//! and evaluator with captured output.

use std::sync::Arc;

use hemlock_core::{HemlockError, Output, Session, Value};
use parking_lot::Mutex;

fn run(source: &str) -> (Result<Value, HemlockError>, String) {
    let buf: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let out: Output = buf.clone();
    let mut session = Session::with_output(out, &[]);
    let result = session.eval(source);
    let output = String::from_utf8(buf.lock().clone()).unwrap();
    (result, output)
}

fn run_ok(source: &str) -> String {
    let (result, output) = run(source);
    if let Err(e) = result {
        panic!("program failed: {}\noutput so far: {}", e, output);
    }
    output
}

#[test]
fn factorial() {
    let output = run_ok(
        r#"
        fn f(n) { if (n <= 1) { return 1; } return n * f(n - 1); }
        print(f(10));
        "#,
    );
    assert_eq!(output, "3628800\n");
}

#[test]
fn exception_with_finally() {
    let output = run_ok(
        r#"
        try { throw "oops"; } catch (e) { print("caught " + e); } finally { print("cleanup"); }
        "#,
    );
    assert_eq!(output, "caught oops\ncleanup\n");
}

#[test]
fn defer_runs_lifo() {
    let output = run_ok(
        r#"
        fn g() { defer print("a"); defer print("b"); print("c"); }
        g();
        "#,
    );
    assert_eq!(output, "c\nb\na\n");
}

#[test]
fn duck_type_conversion() {
    let output = run_ok(
        r#"
        define P { name: string, active?: true }
        let p: P = { name: "x" };
        print(typeof(p));
        print(p.active);
        "#,
    );
    assert_eq!(output, "P\ntrue\n");
}

#[test]
fn duck_type_missing_required_field_throws() {
    let (result, _) = run(
        r#"
        define P { name: string }
        let p: P = { other: 1 };
        "#,
    );
    match result {
        Err(HemlockError::Uncaught { message, .. }) => {
            assert!(message.contains("name"), "message was: {}", message);
        }
        other => panic!("expected uncaught, got {:?}", other.map(|v| v.render())),
    }
}

#[test]
fn type_promotion() {
    let output = run_ok(
        r#"
        print(1 + 2.5);
        print(typeof(1 + 2.5));
        "#,
    );
    assert_eq!(output, "3.5\nf64\n");
}

#[test]
fn annotated_assignment_range_error() {
    let (result, _) = run("let x: i8 = 300;");
    assert!(matches!(result, Err(HemlockError::Uncaught { .. })));
}

#[test]
fn annotated_assignment_converts() {
    let output = run_ok(
        r#"
        let x: i8 = 100;
        print(typeof(x));
        let f: f32 = 2;
        print(typeof(f));
        "#,
    );
    assert_eq!(output, "i8\nf32\n");
}

#[test]
fn integer_division_by_zero_is_catchable() {
    let output = run_ok(
        r#"
        try { let x = 1 / 0; } catch (e) { print("caught: " + e); }
        "#,
    );
    assert!(output.starts_with("caught: "));
}

#[test]
fn short_circuit_skips_right_operand() {
    let output = run_ok(
        r#"
        fn boom() { throw "should not run"; }
        print(false && boom());
        print(true || boom());
        "#,
    );
    assert_eq!(output, "false\ntrue\n");
}

#[test]
fn closures_share_their_environment() {
    let output = run_ok(
        r#"
        fn make_counter() {
            let n = 0;
            let bump = fn () { n = n + 1; return n; };
            let peek = fn () { return n; };
            return [bump, peek];
        }
        let pair = make_counter();
        let bump = pair[0];
        let peek = pair[1];
        bump(); bump();
        print(peek());
        "#,
    );
    assert_eq!(output, "2\n");
}

#[test]
fn default_parameters_apply() {
    let output = run_ok(
        r#"
        fn greet(name, prefix = "hi ") { return prefix + name; }
        print(greet("x"));
        print(greet("y", "yo "));
        "#,
    );
    assert_eq!(output, "hi x\nyo y\n");
}

#[test]
fn method_call_binds_self_per_activation() {
    let output = run_ok(
        r#"
        let counter = {
            n: 0,
            bump: fn () { self.n = self.n + 1; return self.n; }
        };
        counter.bump();
        counter.bump();
        print(counter.n);
        "#,
    );
    assert_eq!(output, "2\n");
}

#[test]
fn for_in_iterates_object_in_insertion_order() {
    let output = run_ok(
        r#"
        let obj = { b: 1, a: 2, c: 3 };
        for (k, v in obj) { print(k + "=" + v); }
        "#,
    );
    assert_eq!(output, "b=1\na=2\nc=3\n");
}

#[test]
fn for_in_iterates_array_with_indices() {
    let output = run_ok(
        r#"
        for (i, v in [10, 20]) { print(i + ":" + v); }
        "#,
    );
    assert_eq!(output, "0:10\n1:20\n");
}

#[test]
fn switch_matches_by_equality_without_fallthrough() {
    let output = run_ok(
        r#"
        fn pick(x) {
            switch (x) {
                case 1: print("one");
                case "a": print("letter");
                default: print("other");
            }
        }
        pick(1); pick("a"); pick(9);
        "#,
    );
    assert_eq!(output, "one\nletter\nother\n");
}

#[test]
fn break_and_continue() {
    let output = run_ok(
        r#"
        for (let i = 0; i < 10; i += 1) {
            if (i == 1) { continue; }
            if (i == 3) { break; }
            print(i);
        }
        "#,
    );
    assert_eq!(output, "0\n2\n");
}

#[test]
fn while_loop_counts() {
    let output = run_ok(
        r#"
        let i = 0;
        while (i < 3) { print(i); i += 1; }
        "#,
    );
    assert_eq!(output, "0\n1\n2\n");
}

#[test]
fn finally_runs_through_return() {
    let output = run_ok(
        r#"
        fn f() {
            try { return "value"; } finally { print("finally"); }
        }
        print(f());
        "#,
    );
    assert_eq!(output, "finally\nvalue\n");
}

#[test]
fn rethrow_propagates_after_finally() {
    let (result, output) = run(
        r#"
        try { throw "inner"; } finally { print("cleanup"); }
        "#,
    );
    assert_eq!(output, "cleanup\n");
    match result {
        Err(HemlockError::Uncaught { message, .. }) => assert_eq!(message, "inner"),
        other => panic!("expected uncaught, got {:?}", other.map(|v| v.render())),
    }
}

#[test]
fn defer_exception_overrides_pending_unwind() {
    let (result, _) = run(
        r#"
        fn f() {
            defer panic_free();
            throw "original";
        }
        fn panic_free() { throw "from defer"; }
        f();
        "#,
    );
    match result {
        Err(HemlockError::Uncaught { message, .. }) => assert_eq!(message, "from defer"),
        other => panic!("expected uncaught, got {:?}", other.map(|v| v.render())),
    }
}

#[test]
fn defer_captures_its_environment() {
    let output = run_ok(
        r#"
        fn f() {
            for (let i = 0; i < 3; i += 1) {
                let captured = i;
                defer print(captured);
            }
        }
        f();
        "#,
    );
    // LIFO over loop iterations.
    assert_eq!(output, "2\n1\n0\n");
}

#[test]
fn string_indexing_is_codepoint_based() {
    let output = run_ok(
        r#"
        let s = "héllo";
        print(s.length);
        print(s.byte_length);
        print(s[1]);
        "#,
    );
    assert_eq!(output, "5\n6\né\n");
}

#[test]
fn array_out_of_bounds_throws() {
    let output = run_ok(
        r#"
        let a = [1];
        try { print(a[5]); } catch (e) { print("caught"); }
        "#,
    );
    assert_eq!(output, "caught\n");
}

#[test]
fn empty_pop_returns_null() {
    let output = run_ok(
        r#"
        let a = [];
        print(a.pop());
        "#,
    );
    assert_eq!(output, "null\n");
}

#[test]
fn slice_boundary_clamps() {
    let output = run_ok(
        r#"
        print("hello".slice(-1, 1000000));
        "#,
    );
    assert_eq!(output, "hello\n");
}

#[test]
fn higher_order_array_methods() {
    let output = run_ok(
        r#"
        let a = [1, 2, 3, 4];
        let doubled = a.map(fn (x) { return x * 2; });
        print(doubled.join(","));
        let evens = a.filter(fn (x) { return x % 2 == 0; });
        print(evens.join(","));
        print(a.reduce(fn (acc, x) { return acc + x; }, 0));
        "#,
    );
    assert_eq!(output, "2,4,6,8\n2,4\n10\n");
}

#[test]
fn callback_exception_aborts_traversal() {
    let output = run_ok(
        r#"
        let seen = [];
        try {
            [1, 2, 3].map(fn (x) {
                seen.push(x);
                if (x == 2) { throw "stop"; }
                return x;
            });
        } catch (e) {
            print(e);
        }
        print(seen.join(","));
        "#,
    );
    assert_eq!(output, "stop\n1,2\n");
}

#[test]
fn buffer_construction_and_memset() {
    let output = run_ok(
        r#"
        let b = buffer(4);
        memset(b, 0, 4);
        print(b[0] + b[1] + b[2] + b[3]);
        b[2] = 7;
        print(b[2]);
        try { let x = b[9]; } catch (e) { print("bounds"); }
        "#,
    );
    assert_eq!(output, "0\n7\nbounds\n");
}

#[test]
fn typed_array_enforces_constraint() {
    let output = run_ok(
        r#"
        let a = typed_array(i32);
        a.push(1);
        try { a.push("nope"); } catch (e) { print("rejected"); }
        print(a.length);
        "#,
    );
    assert_eq!(output, "rejected\n1\n");
}

#[test]
fn free_empties_surviving_references() {
    let output = run_ok(
        r#"
        let a = [1, 2, 3];
        let alias = a;
        free(a);
        print(alias.length);
        free(a);
        print("ok");
        "#,
    );
    assert_eq!(output, "0\nok\n");
}

#[test]
fn const_rejects_reassignment() {
    let output = run_ok(
        r#"
        const k = 1;
        try { k = 2; } catch (e) { print("const"); }
        "#,
    );
    assert_eq!(output, "const\n");
}

#[test]
fn type_kind_call_converts() {
    let output = run_ok(
        r#"
        let x = i64(7);
        print(typeof(x));
        try { let y = u8(-1); } catch (e) { print("range"); }
        "#,
    );
    assert_eq!(output, "i64\nrange\n");
}

#[test]
fn equality_rules() {
    let output = run_ok(
        r#"
        print(null == null);
        print(1 == 1.0);
        print("a" == "a");
        print([1] == [1]);
        let a = [1];
        let b = a;
        print(a == b);
        print("1" == 1);
        "#,
    );
    assert_eq!(output, "true\ntrue\ntrue\nfalse\ntrue\nfalse\n");
}

#[test]
fn truthiness_rules() {
    let output = run_ok(
        r#"
        fn check(v) { if (v) { print("t"); } else { print("f"); } }
        check(null); check(false); check(0); check(""); check([]);
        check(1); check("x"); check([0]);
        "#,
    );
    assert_eq!(output, "f\nf\nf\nf\nf\nt\nt\nt\n");
}

#[test]
fn stray_break_is_an_error() {
    let (result, _) = run("fn f() { break; } f();");
    assert!(matches!(result, Err(HemlockError::Uncaught { .. })));
}

#[test]
fn deep_recursion_throws_instead_of_crashing() {
    let (result, _) = run("fn f(n) { return f(n + 1); } f(0);");
    match result {
        Err(HemlockError::Uncaught { message, .. }) => {
            assert!(message.contains("stack overflow"), "message: {}", message);
        }
        other => panic!("expected stack overflow, got {:?}", other.map(|v| v.render())),
    }
}

#[test]
fn panic_is_uncatchable() {
    let (result, output) = run(
        r#"
        try { panic("fatal"); } catch (e) { print("caught"); }
        "#,
    );
    assert_eq!(output, "");
    assert!(matches!(result, Err(HemlockError::Panic { .. })));
}

#[test]
fn program_args_are_bound() {
    let buf: Arc<Mutex<Vec<u8>>> = Arc::new(Mutex::new(Vec::new()));
    let out: Output = buf.clone();
    let mut session = Session::with_output(
        out,
        &["script.hml".to_string(), "alpha".to_string()],
    );
    session.eval("print(args[0]); print(args[1]);").unwrap();
    let output = String::from_utf8(buf.lock().clone()).unwrap();
    assert_eq!(output, "script.hml\nalpha\n");
}

#[test]
fn string_methods_work_end_to_end() {
    let output = run_ok(
        r#"
        let s = "Hello, World";
        print(s.to_upper());
        print(s.find("World"));
        print(s.contains("lo,"));
        print(s.replace("l", "L"));
        print(s.split(", ").join("|"));
        print("  pad  ".trim());
        print("ab".repeat(3));
        print(s.starts_with("Hell"));
        print(s.ends_with("ld"));
        "#,
    );
    assert_eq!(
        output,
        "HELLO, WORLD\n7\ntrue\nHeLlo, World\nHello|World\npad\nababab\ntrue\ntrue\n"
    );
}

#[test]
fn bytes_round_trip_for_ascii() {
    let output = run_ok(
        r#"
        let s = "hemlock";
        print(s.bytes().join_as_string());
        "#,
    );
    assert_eq!(output, "hemlock\n");
}

#[test]
fn double_reverse_is_identity() {
    let output = run_ok(
        r#"
        let a = [1, 2, 3];
        a.reverse();
        a.reverse();
        print(a.join(","));
        "#,
    );
    assert_eq!(output, "1,2,3\n");
}
