//! The session state machine between the display and the execution engine.
//!
//! One [`ReplEvaluator`] owns at most one engine at a time. Everything that
//! changes session state (submissions, engine events, reset, dispose) takes
//! the same lock, and every engine session carries a generation number: once
//! a session is replaced or torn down, events still in flight from it are
//! dropped, so a reset always wins over a late result.

use crate::completeness;
use crate::config::EngineConfig;
use crate::engine::{Engine, EngineEvent, EngineEvents, EngineFactory, Outcome, node_engine_factory};
use crate::error::ReplError;
use crate::format::{DISCONNECTED_MESSAGE, Formatter, LINE_TERMINATOR, NodeInspector, PROCESS_EXITED_MESSAGE, to_display_newlines};
use crate::surface::{Stream, Surface};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded, unbounded};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Starting,
    Ready,
    Evaluating,
    ProcessExited,
    Disposed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Starting => "starting",
            SessionState::Ready => "ready",
            SessionState::Evaluating => "evaluating",
            SessionState::ProcessExited => "process exited",
            SessionState::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

pub type SubmissionResult = Result<(), ReplError>;

/// Waiting side of a submission. Resolves exactly once: `Ok(())` when the
/// engine produced a value, `Err` for thrown values, exits, resets and
/// disposal.
#[derive(Debug)]
pub struct PendingSubmission {
    rx: Receiver<SubmissionResult>,
}

impl PendingSubmission {
    fn resolved(result: SubmissionResult) -> Self {
        let (completion, pending) = completion_pair();
        completion.resolve(result);
        pending
    }

    /// Block until the submission resolves.
    pub fn wait(self) -> SubmissionResult {
        self.rx.recv().unwrap_or_else(|_| Err(ReplError::cancelled("submission dropped")))
    }

    /// Block for at most `timeout`; `None` if still pending.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<SubmissionResult> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(ReplError::cancelled("submission dropped"))),
        }
    }

    /// The result if already resolved.
    pub fn try_result(&self) -> Option<SubmissionResult> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(ReplError::cancelled("submission dropped"))),
        }
    }
}

/// Resolving side of a submission; consumed on resolve so it can only fire once.
struct Completion {
    tx: Sender<SubmissionResult>,
}

impl Completion {
    fn resolve(self, result: SubmissionResult) {
        // the caller may have stopped waiting
        let _ = self.tx.send(result);
    }
}

fn completion_pair() -> (Completion, PendingSubmission) {
    let (tx, rx) = bounded(1);
    (Completion { tx }, PendingSubmission { rx })
}

struct Submission {
    id: u64,
    code: String,
    done: Completion,
}

struct Inner {
    state: SessionState,
    config: EngineConfig,
    engine: Option<Box<dyn Engine>>,
    generation: u64,
    next_id: u64,
    in_flight: Option<Submission>,
    queue: VecDeque<Submission>,
    history: Vec<String>,
}

struct Shared {
    inner: Mutex<Inner>,
    surface: Arc<dyn Surface>,
    formatter: Arc<dyn Formatter>,
    factory: EngineFactory,
}

/// Evaluates submitted text in an out-of-process engine and writes results
/// to a [`Surface`].
///
/// Submissions made while another one is evaluating are queued and sent in
/// order. The engine is started lazily by the first submission (or
/// [`start`](Self::start)) and stopped by [`dispose`](Self::dispose) or drop.
pub struct ReplEvaluator {
    shared: Arc<Shared>,
}

impl ReplEvaluator {
    /// An evaluator backed by a Node.js child process.
    pub fn new(config: EngineConfig, surface: Arc<dyn Surface>) -> Self {
        Self::with_engine(config, surface, node_engine_factory(), Arc::new(NodeInspector::new()))
    }

    pub fn with_engine(config: EngineConfig, surface: Arc<dyn Surface>, factory: EngineFactory, formatter: Arc<dyn Formatter>) -> Self {
        let inner = Inner {
            state: SessionState::Uninitialized,
            config,
            engine: None,
            generation: 0,
            next_id: 1,
            in_flight: None,
            queue: VecDeque::new(),
            history: Vec::new(),
        };
        ReplEvaluator {
            shared: Arc::new(Shared {
                inner: Mutex::new(inner),
                surface,
                formatter,
                factory,
            }),
        }
    }

    /// Whether `text` is a complete fragment. Never touches the session.
    pub fn can_execute_text(&self, text: &str) -> bool {
        completeness::can_execute(text)
    }

    /// Submit `text` for evaluation.
    ///
    /// After the engine has exited (or the evaluator was disposed) this fails
    /// immediately with [`ReplError::Disconnected`] and writes the
    /// disconnected message to `Error`; the engine is not contacted.
    pub fn execute_text(&self, text: &str) -> PendingSubmission {
        let shared = &self.shared;
        let mut inner = shared.lock();
        match inner.state {
            SessionState::ProcessExited | SessionState::Disposed => {
                shared.surface.append(DISCONNECTED_MESSAGE, Stream::Error);
                return PendingSubmission::resolved(Err(ReplError::Disconnected));
            }
            SessionState::Uninitialized => {
                if let Err(e) = shared.start_engine(&mut inner) {
                    return PendingSubmission::resolved(Err(e));
                }
            }
            SessionState::Starting | SessionState::Ready | SessionState::Evaluating => {}
        }

        let (done, pending) = completion_pair();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.history.push(text.to_string());
        let submission = Submission {
            id,
            code: text.to_string(),
            done,
        };
        if inner.in_flight.is_some() {
            log::debug!("Queueing submission {id} behind {} pending", inner.queue.len() + 1);
            inner.queue.push_back(submission);
        } else {
            shared.dispatch(&mut inner, submission);
        }
        pending
    }

    /// Start the engine now rather than on first submission.
    pub fn start(&self) -> Result<(), ReplError> {
        let mut inner = self.shared.lock();
        match inner.state {
            SessionState::Uninitialized => self.shared.start_engine(&mut inner),
            SessionState::ProcessExited | SessionState::Disposed => Err(ReplError::Disconnected),
            SessionState::Starting | SessionState::Ready | SessionState::Evaluating => Ok(()),
        }
    }

    /// Throw the current session away and start a fresh one.
    ///
    /// Pending and queued submissions fail with [`ReplError::Cancelled`], the
    /// display is cleared and the exit message written, and history is
    /// discarded. Works from any state except disposed, including while an
    /// evaluation is in flight.
    pub fn reset(&self) -> Result<(), ReplError> {
        let shared = &self.shared;
        let mut inner = shared.lock();
        if inner.state == SessionState::Disposed {
            return Err(ReplError::Disconnected);
        }
        log::debug!("Resetting session (was {})", inner.state);
        shared.teardown(&mut inner, ReplError::cancelled("session reset"));
        inner.history.clear();
        shared.surface.clear();
        shared.surface.append(PROCESS_EXITED_MESSAGE, Stream::Error);
        inner.state = SessionState::Uninitialized;
        shared.start_engine(&mut inner)
    }

    /// Stop the engine for good. Pending submissions fail with
    /// [`ReplError::Cancelled`]; later submissions fail as disconnected.
    pub fn dispose(&self) {
        let shared = &self.shared;
        let mut inner = shared.lock();
        if inner.state == SessionState::Disposed {
            return;
        }
        shared.teardown(&mut inner, ReplError::cancelled("session disposed"));
        inner.state = SessionState::Disposed;
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    /// Text of every accepted submission in this session, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.shared.lock().history.clone()
    }

    pub fn config(&self) -> EngineConfig {
        self.shared.lock().config.clone()
    }

    /// Replace the configuration used by the next start or reset.
    pub fn set_config(&self, config: EngineConfig) {
        self.shared.lock().config = config;
    }

    pub fn surface(&self) -> &Arc<dyn Surface> {
        &self.shared.surface
    }
}

impl Drop for ReplEvaluator {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn start_engine(self: &Arc<Self>, inner: &mut Inner) -> Result<(), ReplError> {
        inner.state = SessionState::Starting;
        inner.generation += 1;
        let generation = inner.generation;

        let (tx, rx) = unbounded();
        let mut engine = (self.factory)();
        let started = engine.start(&inner.config, EngineEvents::new(tx)).and_then(|()| {
            let weak = Arc::downgrade(self);
            thread::Builder::new()
                .name(format!("repl-events-{generation}"))
                .spawn(move || dispatch_events(weak, generation, rx))
                .map(|_| ())
                .map_err(ReplError::from)
        });

        match started {
            Ok(()) => {
                log::debug!("Session {generation} ready");
                inner.engine = Some(engine);
                inner.state = SessionState::Ready;
                Ok(())
            }
            Err(e) => {
                log::warn!("Session {generation} failed to start: {e}");
                engine.stop();
                inner.state = SessionState::ProcessExited;
                self.surface.append(&format!("{e}{LINE_TERMINATOR}"), Stream::Error);
                Err(e)
            }
        }
    }

    fn dispatch(&self, inner: &mut Inner, submission: Submission) {
        let Some(engine) = inner.engine.as_mut() else {
            submission.done.resolve(Err(ReplError::Disconnected));
            return;
        };
        match engine.submit(submission.id, &submission.code) {
            Ok(()) => {
                inner.state = SessionState::Evaluating;
                inner.in_flight = Some(submission);
            }
            Err(e) => {
                log::warn!("Submission {} could not be sent: {e}", submission.id);
                submission.done.resolve(Err(e.clone()));
                self.connection_lost(inner, e);
            }
        }
    }

    fn dispatch_next(&self, inner: &mut Inner) {
        while inner.in_flight.is_none() && inner.state == SessionState::Ready {
            let Some(next) = inner.queue.pop_front() else {
                break;
            };
            self.dispatch(inner, next);
        }
    }

    /// Stop the engine and fail everything waiting on it. Bumps the
    /// generation so events still queued from the old engine are ignored.
    fn teardown(&self, inner: &mut Inner, reason: ReplError) {
        inner.generation += 1;
        if let Some(mut engine) = inner.engine.take() {
            engine.stop();
        }
        if let Some(submission) = inner.in_flight.take() {
            submission.done.resolve(Err(reason.clone()));
        }
        for submission in inner.queue.drain(..) {
            submission.done.resolve(Err(reason.clone()));
        }
    }

    /// The engine went away on its own (exit, crash, broken channel).
    fn connection_lost(&self, inner: &mut Inner, reason: ReplError) {
        if matches!(inner.state, SessionState::ProcessExited | SessionState::Disposed) {
            return;
        }
        log::debug!("Session {} lost: {reason}", inner.generation);
        self.teardown(inner, reason);
        inner.state = SessionState::ProcessExited;
        self.surface.append(PROCESS_EXITED_MESSAGE, Stream::Error);
    }

    fn handle_event(&self, generation: u64, event: EngineEvent) {
        let mut inner = self.lock();
        if inner.generation != generation {
            log::debug!("Dropping event from stale session {generation}: {event:?}");
            return;
        }
        match event {
            EngineEvent::Console { stream, args } => {
                self.surface.append(&self.formatter.format_console(&args), stream);
            }
            EngineEvent::Text { stream, text } => {
                self.surface.append(&to_display_newlines(&text), stream);
            }
            EngineEvent::Completed { id, outcome } => match inner.in_flight.take() {
                Some(submission) if submission.id == id => {
                    let result = match outcome {
                        Outcome::Value(value) => {
                            self.surface.append(&self.formatter.format_result(&value), Stream::Output);
                            Ok(())
                        }
                        Outcome::Thrown { value, text } => {
                            let text = self.formatter.format_thrown(&value, &text);
                            self.surface.append(&text, Stream::Error);
                            Err(ReplError::Thrown { text })
                        }
                    };
                    submission.done.resolve(result);
                    inner.state = SessionState::Ready;
                    self.dispatch_next(&mut inner);
                }
                other => {
                    log::warn!("Completion for unknown submission {id}");
                    inner.in_flight = other;
                }
            },
            EngineEvent::Exited { code } => self.connection_lost(&mut inner, ReplError::ProcessExited { code }),
            EngineEvent::TransportFailed { reason } => self.connection_lost(&mut inner, ReplError::Transport { reason }),
        }
    }
}

fn dispatch_events(shared: Weak<Shared>, generation: u64, rx: Receiver<EngineEvent>) {
    for event in rx.iter() {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.handle_event(generation, event);
    }
    log::debug!("Event dispatcher for session {generation} finished");
}
