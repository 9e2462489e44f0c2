//! File and socket builtins exercised through complete programs.

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
fn file_write_then_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.txt");
    let path = path.to_str().unwrap();

    let source = format!(
        r#"
        let f = open("{path}", "w");
        print(f.write("line one\n"));
        f.close();
        print(f.closed);

        let r = open("{path}", "r");
        print(r.read());
        r.close();
        "#
    );
    let output = run_ok(&source);
    assert_eq!(output, "9\ntrue\nline one\n\n");
}

#[test]
fn file_seek_and_tell() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.txt");
    std::fs::write(&path, "abcdef").unwrap();
    let path = path.to_str().unwrap();

    let source = format!(
        r#"
        let f = open("{path}", "r");
        f.seek(2);
        print(f.read(3));
        print(f.tell());
        f.close();
        "#
    );
    let output = run_ok(&source);
    assert_eq!(output, "cde\n5\n");
}

#[test]
fn operations_on_closed_file_are_catchable() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.txt");
    std::fs::write(&path, "x").unwrap();
    let path = path.to_str().unwrap();

    let source = format!(
        r#"
        let f = open("{path}", "r");
        f.close();
        f.close();
        try {{ f.read(); }} catch (e) {{ print("caught"); }}
        "#
    );
    let output = run_ok(&source);
    assert_eq!(output, "caught\n");
}

#[test]
fn open_missing_file_throws() {
    let output = run_ok(
        r#"
        try { open("/definitely/not/here.txt", "r"); } catch (e) { print("caught"); }
        "#,
    );
    assert_eq!(output, "caught\n");
}

#[test]
fn file_properties() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("p.txt");
    std::fs::write(&path, "").unwrap();
    let path = path.to_str().unwrap();

    let source = format!(
        r#"
        let f = open("{path}", "r");
        print(f.mode);
        print(f.closed);
        print(f.path == "{path}");
        f.close();
        "#
    );
    let output = run_ok(&source);
    assert_eq!(output, "r\nfalse\ntrue\n");
}

#[test]
fn tcp_sockets_talk_over_loopback() {
    // Server task accepts one connection and echoes a greeting.
    let output = run_ok(
        r#"
        let ready = channel(1);
        fn server(ready_ch) {
            let srv = socket(AF_INET, SOCK_STREAM);
            srv.setsockopt("reuseaddr", true);
            srv.bind("127.0.0.1", 47113);
            srv.listen(4);
            ready_ch.send(true);
            let conn = srv.accept();
            let msg = conn.recv(64);
            conn.send("echo: " + msg);
            conn.close();
            srv.close();
        }
        let t = spawn(server, ready);
        ready.recv();
        let c = socket(AF_INET, SOCK_STREAM);
        c.connect("127.0.0.1", 47113);
        c.send("hi");
        print(c.recv(64));
        c.close();
        join(t);
        "#,
    );
    assert_eq!(output, "echo: hi\n");
}

#[test]
fn udp_sendto_recvfrom() {
    let output = run_ok(
        r#"
        let a = socket(AF_INET, SOCK_DGRAM);
        a.bind("127.0.0.1", 47114);
        let b = socket(AF_INET, SOCK_DGRAM);
        b.bind("127.0.0.1", 47115);
        b.sendto("ping", "127.0.0.1", 47114);
        let got = a.recvfrom(32);
        print(got.data);
        a.close();
        b.close();
        "#,
    );
    assert_eq!(output, "ping\n");
}

#[test]
fn closed_socket_send_is_catchable() {
    let output = run_ok(
        r#"
        let s = socket(AF_INET, SOCK_STREAM);
        s.close();
        print(s.closed);
        try { s.send("x"); } catch (e) { print("caught"); }
        "#,
    );
    assert_eq!(output, "true\ncaught\n");
}
