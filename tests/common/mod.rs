#![allow(dead_code)]

use nodejs_repl::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub const WAIT: Duration = Duration::from_secs(10);

#[derive(Default)]
struct ControlState {
    events: Option<EngineEvents>,
    held: Option<u64>,
    submitted: Vec<String>,
    starts: usize,
    stops: usize,
    fail_start: bool,
}

/// Test-side handle on every engine a fake factory builds.
#[derive(Clone, Default)]
pub struct FakeControl {
    state: Arc<Mutex<ControlState>>,
}

impl FakeControl {
    fn lock(&self) -> MutexGuard<'_, ControlState> {
        self.state.lock().unwrap()
    }

    /// Code the engines actually received, in order.
    pub fn submitted(&self) -> Vec<String> {
        self.lock().submitted.clone()
    }

    pub fn starts(&self) -> usize {
        self.lock().starts
    }

    pub fn stops(&self) -> usize {
        self.lock().stops
    }

    pub fn fail_next_starts(&self, fail: bool) {
        self.lock().fail_start = fail;
    }

    /// Event sender of the most recently started engine.
    pub fn events(&self) -> EngineEvents {
        self.lock().events.clone().expect("no engine started")
    }

    pub fn held_id(&self) -> Option<u64> {
        self.lock().held
    }

    /// Finish the submission parked by `hang`.
    pub fn complete_held(&self, outcome: Outcome) {
        let (events, id) = {
            let mut st = self.lock();
            (st.events.clone().expect("no engine started"), st.held.take().expect("nothing held"))
        };
        events.send(EngineEvent::Completed { id, outcome });
    }

    pub fn emit(&self, event: EngineEvent) {
        self.events().send(event);
    }
}

/// A scripted engine understanding a handful of statement shapes:
/// numbers, quoted strings, `var x = <literal>`, `function name() { }`,
/// `console.log/warn/error('text')`, `throw 'text'`, `process.exit(n)`,
/// bare names, plus `hang` (never completes until released) and `crash`
/// (channel failure). Statements are separated by `;`.
pub struct FakeEngine {
    control: FakeControl,
    events: Option<EngineEvents>,
    bindings: HashMap<String, RemoteValue>,
}

impl FakeEngine {
    pub fn new(control: FakeControl) -> Self {
        FakeEngine {
            control,
            events: None,
            bindings: HashMap::new(),
        }
    }

    fn evaluate(&mut self, id: u64, code: &str) -> Vec<EngineEvent> {
        let mut events = Vec::new();
        let mut result = RemoteValue::Undefined;
        for statement in code.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            if statement == "hang" {
                self.control.lock().held = Some(id);
                return events;
            }
            if statement == "crash" {
                events.push(EngineEvent::TransportFailed {
                    reason: "pipe closed".to_string(),
                });
                return events;
            }
            if let Some(rest) = statement.strip_prefix("process.exit(") {
                let code = rest.trim_end_matches(')').parse().ok();
                events.push(EngineEvent::Exited { code });
                return events;
            }
            if let Some(text) = statement.strip_prefix("throw ") {
                let text = unquote(text);
                events.push(EngineEvent::Completed {
                    id,
                    outcome: Outcome::Thrown {
                        value: RemoteValue::string(text.clone()),
                        text,
                    },
                });
                return events;
            }
            if let Some((stream, arg)) = console_call(statement) {
                events.push(EngineEvent::Console {
                    stream,
                    args: vec![RemoteValue::string(unquote(arg))],
                });
                result = RemoteValue::Undefined;
                continue;
            }
            if let Some(rest) = statement.strip_prefix("function ") {
                let name = rest.split('(').next().unwrap_or_default().trim();
                self.bindings.insert(name.to_string(), RemoteValue::function(Some(name)));
                result = RemoteValue::Undefined;
                continue;
            }
            if let Some((name, value)) = statement.strip_prefix("var ").and_then(|rest| rest.split_once('=')) {
                self.bindings.insert(name.trim().to_string(), literal(value.trim()));
                result = RemoteValue::Undefined;
                continue;
            }
            if let Some(value) = self.bindings.get(statement) {
                result = value.clone();
                continue;
            }
            if statement.chars().all(|c| c.is_alphanumeric() || c == '_') && !statement.starts_with(|c: char| c.is_ascii_digit()) {
                let message = format!("{statement} is not defined");
                events.push(EngineEvent::Completed {
                    id,
                    outcome: Outcome::Thrown {
                        value: RemoteValue::error("ReferenceError", message.clone()),
                        text: format!("ReferenceError: {message}"),
                    },
                });
                return events;
            }
            result = literal(statement);
        }
        events.push(EngineEvent::Completed {
            id,
            outcome: Outcome::Value(result),
        });
        events
    }
}

impl Engine for FakeEngine {
    fn start(&mut self, _config: &EngineConfig, events: EngineEvents) -> Result<(), ReplError> {
        let mut st = self.control.lock();
        st.starts += 1;
        if st.fail_start {
            return Err(ReplError::Spawn {
                program: "fake".to_string(),
                message: "refused to start".to_string(),
            });
        }
        st.events = Some(events.clone());
        self.events = Some(events);
        Ok(())
    }

    fn submit(&mut self, id: u64, code: &str) -> Result<(), ReplError> {
        self.control.lock().submitted.push(code.to_string());
        let events = self.events.clone().ok_or(ReplError::Disconnected)?;
        for event in self.evaluate(id, code) {
            events.send(event);
        }
        Ok(())
    }

    fn stop(&mut self) {
        if self.events.take().is_some() {
            self.control.lock().stops += 1;
        }
    }
}

fn console_call(statement: &str) -> Option<(Stream, &str)> {
    let (callee, rest) = statement.split_once('(')?;
    let arg = rest.strip_suffix(')')?;
    match callee {
        "console.log" | "console.info" => Some((Stream::Output, arg)),
        "console.warn" | "console.error" => Some((Stream::Error, arg)),
        _ => None,
    }
}

fn unquote(text: &str) -> String {
    let text = text.trim();
    text.strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .or_else(|| text.strip_prefix('"').and_then(|t| t.strip_suffix('"')))
        .unwrap_or(text)
        .to_string()
}

fn literal(text: &str) -> RemoteValue {
    if text.parse::<f64>().is_ok() {
        RemoteValue::number(text)
    } else if text.starts_with('\'') || text.starts_with('"') {
        RemoteValue::string(unquote(text))
    } else {
        RemoteValue::Undefined
    }
}

pub fn fake_factory(control: &FakeControl) -> EngineFactory {
    let control = control.clone();
    Arc::new(move || Box::new(FakeEngine::new(control.clone())) as Box<dyn Engine>)
}

pub fn fake_evaluator() -> (ReplEvaluator, MemorySurface, FakeControl) {
    let control = FakeControl::default();
    let surface = MemorySurface::new();
    let evaluator = ReplEvaluator::with_engine(
        EngineConfig::default(),
        Arc::new(surface.clone()),
        fake_factory(&control),
        Arc::new(NodeInspector::new()),
    );
    (evaluator, surface, control)
}

/// Submit `code` and wait for it, failing the test on timeout.
pub fn run(evaluator: &ReplEvaluator, code: &str) -> SubmissionResult {
    evaluator.execute_text(code).wait_timeout(WAIT).expect("submission timed out")
}
