//! JSON serialize/deserialize through the language surface.

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
fn object_serializes_to_json() {
    let output = run_ok(
        r#"
        let obj = { name: "x", n: 3, ok: true, none: null, tags: ["a", "b"] };
        print(obj.serialize());
        "#,
    );
    assert_eq!(
        output,
        "{\"name\":\"x\",\"n\":3,\"ok\":true,\"none\":null,\"tags\":[\"a\",\"b\"]}\n"
    );
}

#[test]
fn serialize_then_deserialize_round_trips() {
    let output = run_ok(
        r#"
        let obj = { a: 1, b: "two", c: [true, null, 2.5] };
        let json = obj.serialize();
        let back = json.deserialize();
        print(back.a);
        print(back.b);
        print(back.c[2]);
        // The canonical form is stable across a second round trip.
        print(back.serialize() == json);
        "#,
    );
    assert_eq!(output, "1\ntwo\n2.5\ntrue\n");
}

#[test]
fn deserialize_rejects_trailing_input() {
    let output = run_ok(
        r#"
        try { "{} junk".deserialize(); } catch (e) { print("caught"); }
        "#,
    );
    assert_eq!(output, "caught\n");
}

#[test]
fn deserialize_malformed_is_catchable() {
    let output = run_ok(
        r#"
        try { "{\"a\": }".deserialize(); } catch (e) { print("caught"); }
        "#,
    );
    assert_eq!(output, "caught\n");
}

#[test]
fn cyclic_object_serialize_throws() {
    let output = run_ok(
        r#"
        let obj = { a: 1 };
        obj.me = obj;
        try { obj.serialize(); } catch (e) { print("cycle"); }
        "#,
    );
    assert_eq!(output, "cycle\n");
}

#[test]
fn nested_structures_survive_round_trip() {
    let output = run_ok(
        r#"
        let json = "{\"rows\": [{\"id\": 1}, {\"id\": 2}]}";
        let data = json.deserialize();
        print(data.rows.length);
        print(data.rows[1].id);
        "#,
    );
    assert_eq!(output, "2\n2\n");
}

#[test]
fn unicode_strings_round_trip() {
    let output = run_ok(
        r#"
        let obj = { s: "héllo \u{1F600}" };
        let back = obj.serialize().deserialize();
        print(back.s == obj.s);
        "#,
    );
    assert_eq!(output, "true\n");
}
