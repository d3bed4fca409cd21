//! End-to-end runs against a real `node`. Every test returns early when no
//! node executable is available.

use nodejs_repl::*;
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

// Initialize logger for this integration test binary so `RUST_LOG` is honored.
// Using `ctor` ensures initialization runs before tests start.
#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

const WAIT: Duration = Duration::from_secs(20);

fn node_available() -> bool {
    let node = EngineConfig::default().node;
    let found = Command::new(&node).arg("--version").output().is_ok_and(|out| out.status.success());
    if !found {
        eprintln!("skipping: {} not runnable", node.display());
    }
    found
}

fn node_evaluator(config: EngineConfig) -> (ReplEvaluator, MemorySurface) {
    let surface = MemorySurface::new();
    let evaluator = ReplEvaluator::new(config, Arc::new(surface.clone()));
    (evaluator, surface)
}

fn run(evaluator: &ReplEvaluator, code: &str) -> SubmissionResult {
    evaluator.execute_text(code).wait_timeout(WAIT).expect("node did not answer")
}

/// Poll until `done` holds for the surface, for output that arrives after
/// the submission resolved.
fn eventually(surface: &MemorySurface, done: impl Fn(&MemorySurface) -> bool) -> bool {
    let deadline = std::time::Instant::now() + WAIT;
    while std::time::Instant::now() < deadline {
        if done(surface) {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[cfg(test)]
mod node_engine_tests {
    use super::*;

    #[test]
    fn test_number_and_function() {
        if !node_available() {
            return;
        }
        let (eval, surface) = node_evaluator(EngineConfig::default());
        run(&eval, "42").unwrap();
        assert_eq!(surface.output(), "42");
        surface.clear();

        run(&eval, "\r\n    function f() { }").unwrap();
        assert_eq!(surface.output(), "undefined");
        surface.clear();
        run(&eval, "f").unwrap();
        assert_eq!(surface.output(), "[Function: f]");
    }

    #[test]
    fn test_console_streams() {
        if !node_available() {
            return;
        }
        let (eval, surface) = node_evaluator(EngineConfig::default());
        run(&eval, "console.log('hi')").unwrap();
        assert_eq!(surface.output(), "hi\r\nundefined");
        surface.clear();

        run(&eval, "console.warn('hi')").unwrap();
        assert_eq!(surface.error(), "hi\r\n");
        surface.clear();

        run(&eval, "console.error('hi')").unwrap();
        assert_eq!(surface.error(), "hi\r\n");
    }

    #[test]
    fn test_exceptions() {
        if !node_available() {
            return;
        }
        let (eval, surface) = node_evaluator(EngineConfig::default());
        assert!(matches!(run(&eval, "throw 'an error';"), Err(ReplError::Thrown { .. })));
        assert_eq!(surface.error(), "an error");
        surface.clear();

        run(&eval, "i").unwrap_err();
        assert_eq!(surface.error(), "ReferenceError: i is not defined");
        run(&eval, "var i = 987654;").unwrap();
        run(&eval, "i").unwrap();
        assert_eq!(surface.output(), "undefined987654");
    }

    #[test]
    fn test_object_literal() {
        if !node_available() {
            return;
        }
        let (eval, surface) = node_evaluator(EngineConfig::default());
        run(&eval, "{x:42}").unwrap();
        assert_eq!(surface.output(), "{ x: 42 }");
    }

    #[test]
    fn test_process_exit_then_reset() {
        if !node_available() {
            return;
        }
        let (eval, surface) = node_evaluator(EngineConfig::default());
        run(&eval, "process.exit(0);").unwrap_err();
        assert_eq!(surface.error(), "The process has exited");
        surface.clear();

        assert_eq!(run(&eval, "42"), Err(ReplError::Disconnected));
        assert_eq!(surface.error(), "Current interactive window is disconnected - please reset the process.\r\n");

        eval.reset().unwrap();
        assert_eq!(surface.error(), "The process has exited");
        surface.clear();
        run(&eval, "var a = 1").unwrap();
        run(&eval, "a").unwrap();
        assert_eq!(surface.output(), "undefined1");
    }

    #[test]
    fn test_reset_drops_bindings() {
        if !node_available() {
            return;
        }
        let (eval, surface) = node_evaluator(EngineConfig::default());
        run(&eval, "var b = 2").unwrap();
        eval.reset().unwrap();
        surface.clear();
        run(&eval, "b").unwrap_err();
        assert_eq!(surface.error(), "ReferenceError: b is not defined");
    }

    #[test]
    fn test_console_dir_nested() {
        if !node_available() {
            return;
        }
        let (eval, surface) = node_evaluator(EngineConfig::default());
        run(&eval, "var x = {abc: {foo: []}}; for (var n = 1; n <= 40; n++) x.abc.foo.push(n); console.dir(x)").unwrap();
        let output = surface.output();
        assert!(output.starts_with("{ abc: \r\n   { foo: \r\n      [ 1,\r\n        2,\r\n"), "{output}");
        assert!(output.ends_with("        40 ] } }\r\nundefined"), "{output}");
    }

    #[test]
    fn test_builtin_require() {
        if !node_available() {
            return;
        }
        let (eval, surface) = node_evaluator(EngineConfig::default());
        run(&eval, "require('http').constructor").unwrap();
        assert_eq!(surface.output(), "[Function: Object]");
    }

    #[test]
    fn test_project_require() {
        if !node_available() {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("node_modules").join("foo.js"), "exports.foo = function () {};\n");
        write(&dir.path().join("bar.js"), "exports.bar = function () {};\n");

        let (eval, surface) = node_evaluator(EngineConfig::for_project(dir.path()));
        run(&eval, "require('foo.js');").unwrap();
        assert_eq!(surface.output(), "{ foo: [Function] }");
        surface.clear();

        run(&eval, "require('./bar.js');").unwrap();
        assert_eq!(surface.output(), "{ bar: [Function] }");
    }

    #[test]
    fn test_large_output() {
        if !node_available() {
            return;
        }
        let (eval, surface) = node_evaluator(EngineConfig::default());
        run(&eval, "var x = 'abc'; for (var i = 0; i < 12; i++) { x += x; } x").unwrap();
        let expected = format!("'{}'", "abc".repeat(1 << 12));
        assert_eq!(surface.output(), expected);
    }

    #[test]
    fn test_console_format_specifiers() {
        if !node_available() {
            return;
        }
        let (eval, surface) = node_evaluator(EngineConfig::default());
        run(&eval, "console.log('%d items', 5)").unwrap();
        assert_eq!(surface.output(), "5 items\r\nundefined");
        surface.clear();

        run(&eval, "console.log('%s and', 'a', {b: 1})").unwrap();
        assert_eq!(surface.output(), "a and { b: 1 }\r\nundefined");
    }

    #[test]
    fn test_sparse_array_keeps_session() {
        if !node_available() {
            return;
        }
        let (eval, surface) = node_evaluator(EngineConfig::default());
        run(&eval, "new Array(3)").unwrap();
        assert_eq!(surface.output(), "[ undefined, undefined, undefined ]");
        assert_eq!(eval.state(), SessionState::Ready);
    }

    #[test]
    fn test_lone_surrogate_keeps_session() {
        if !node_available() {
            return;
        }
        let (eval, surface) = node_evaluator(EngineConfig::default());
        run(&eval, "'\\ud800'").unwrap();
        assert_eq!(surface.output(), "'\u{fffd}'");
        surface.clear();

        run(&eval, "console.log('a\\udc00b')").unwrap();
        assert_eq!(surface.output(), "a\u{fffd}b\r\nundefined");
        assert_eq!(eval.state(), SessionState::Ready);
    }

    #[test]
    fn test_own_proto_key_is_shown() {
        if !node_available() {
            return;
        }
        let (eval, surface) = node_evaluator(EngineConfig::default());
        run(&eval, "JSON.parse('{\"__proto__\":1,\"a\":2}')").unwrap();
        assert_eq!(surface.output(), "{ __proto__: 1, a: 2 }");
    }

    #[test]
    fn test_unhandled_rejection_is_not_fatal() {
        if !node_available() {
            return;
        }
        let (eval, surface) = node_evaluator(EngineConfig::default());
        run(&eval, "Promise.reject(new Error('boom')); 1").unwrap();
        assert!(eventually(&surface, |s| s.error().contains("Error: boom\r\n")), "{}", surface.error());
        assert!(!surface.error().contains("The process has exited"));
        assert_eq!(eval.state(), SessionState::Ready);

        surface.clear();
        run(&eval, "2").unwrap();
        assert_eq!(surface.output(), "2");
    }

    #[test]
    fn test_async_throw_is_not_fatal() {
        if !node_available() {
            return;
        }
        let (eval, surface) = node_evaluator(EngineConfig::default());
        run(&eval, "setTimeout(function(){throw new Error('late')},10); 1").unwrap();
        assert_eq!(surface.output(), "1");
        assert!(eventually(&surface, |s| s.error().contains("Error: late\r\n")), "{}", surface.error());
        assert!(!surface.error().contains("The process has exited"));
        assert_eq!(eval.state(), SessionState::Ready);

        run(&eval, "2").unwrap();
        assert_eq!(surface.output(), "12");
    }

    #[test]
    fn test_missing_node_fails_to_start() {
        let (eval, surface) = node_evaluator(EngineConfig::default().with_node("/nonexistent/node-binary"));
        assert!(matches!(run(&eval, "1"), Err(ReplError::Spawn { .. })));
        assert_eq!(eval.state(), SessionState::ProcessExited);
        assert!(surface.error().starts_with("Failed to start interactive process"));
    }
}
