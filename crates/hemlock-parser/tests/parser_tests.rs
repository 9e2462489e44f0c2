//! Whole-program parse tests.

use hemlock_parser::ast::*;
use hemlock_parser::{parse, ParseError};

#[test]
fn parses_a_realistic_program() {
    let source = r#"
        // Producer/consumer over a buffered channel.
        define Job { id: i32, retries?: 0 }

        fn producer(ch, count) {
            for (let i = 0; i < count; i += 1) {
                let job: Job = { id: i };
                ch.send(job);
            }
            ch.close();
        }

        fn main() {
            let ch = channel(2);
            let t = spawn(producer, ch, 5);
            let job = ch.recv();
            while (job != null) {
                print(job.id);
                job = ch.recv();
            }
            join(t);
        }

        main();
    "#;
    let program = parse(source).unwrap();
    assert_eq!(program.statements.len(), 4);
    assert!(matches!(program.statements[0].kind, StmtKind::Define { .. }));
    assert!(matches!(program.statements[1].kind, StmtKind::FnDecl { .. }));
}

#[test]
fn parses_try_defer_throw() {
    let source = r#"
        fn guarded() {
            defer cleanup();
            try {
                throw "nope";
            } catch (e) {
                return e;
            } finally {
                log("done");
            }
        }
    "#;
    let program = parse(source).unwrap();
    match &program.statements[0].kind {
        StmtKind::FnDecl { func, .. } => {
            assert!(matches!(func.body[0].kind, StmtKind::Defer(_)));
            assert!(matches!(func.body[1].kind, StmtKind::Try { .. }));
        }
        other => panic!("expected fn, got {:?}", other),
    }
}

#[test]
fn spans_point_into_the_source() {
    let source = "let x = 1;\nlet y = oops;\n";
    let program = parse(source).unwrap();
    let second = &program.statements[1];
    assert_eq!(second.span.line, 2);
}

#[test]
fn parse_errors_carry_positions() {
    let err = parse("let = 5;").unwrap_err();
    match err {
        ParseError::UnexpectedToken { line, column, .. } => {
            assert_eq!(line, 1);
            assert!(column > 1);
        }
        other => panic!("expected unexpected-token, got {:?}", other),
    }
}

#[test]
fn incomplete_input_is_distinguished_for_the_repl() {
    assert!(parse("fn f() {").unwrap_err().is_incomplete());
    assert!(parse("let a = [1,").unwrap_err().is_incomplete());
    assert!(!parse("let = 1;").unwrap_err().is_incomplete());
}

#[test]
fn object_and_array_literals_nest() {
    let program = parse(r#"let cfg = { ports: [80, 443], tls: { on: true } };"#).unwrap();
    match &program.statements[0].kind {
        StmtKind::Let { init, .. } => match &init.kind {
            ExprKind::Object(fields) => {
                assert_eq!(fields.len(), 2);
                assert!(matches!(fields[0].1.kind, ExprKind::Array(_)));
                assert!(matches!(fields[1].1.kind, ExprKind::Object(_)));
            }
            other => panic!("expected object literal, got {:?}", other),
        },
        other => panic!("expected let, got {:?}", other),
    }
}

#[test]
fn operators_nest_by_precedence() {
    let program = parse("let v = 1 | 2 ^ 3 & 4 == 5 < 6 << 7 + 8 * 9;").unwrap();
    // Outermost operator is the loosest one.
    match &program.statements[0].kind {
        StmtKind::Let { init, .. } => match &init.kind {
            ExprKind::Binary { op, .. } => assert_eq!(*op, BinaryOp::BitOr),
            other => panic!("expected binary, got {:?}", other),
        },
        other => panic!("expected let, got {:?}", other),
    }
}

#[test]
fn export_wraps_declarations() {
    let program = parse("export fn api() { } export let version = 1;").unwrap();
    assert!(matches!(program.statements[0].kind, StmtKind::Export(_)));
    assert!(matches!(program.statements[1].kind, StmtKind::Export(_)));
}

#[test]
fn import_takes_a_path() {
    let program = parse(r#"import "lib/util.hml";"#).unwrap();
    match &program.statements[0].kind {
        StmtKind::Import(path) => assert_eq!(path, "lib/util.hml"),
        other => panic!("expected import, got {:?}", other),
    }
}
