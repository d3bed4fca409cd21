//! The execution engine seam.
//!
//! An [`Engine`] runs submitted code somewhere else (normally a child
//! process) and reports back through [`EngineEvents`]. The evaluator never
//! blocks on an engine: `submit` only hands the code over, and results arrive
//! later as events on another thread.

mod node;
pub mod protocol;

pub use node::NodeEngine;

use crate::config::EngineConfig;
use crate::error::ReplError;
use crate::surface::Stream;
use crate::value::RemoteValue;
use crossbeam_channel::Sender;
use std::sync::Arc;

/// How an evaluation finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Value(RemoteValue),
    /// `text` is the engine's string conversion of the thrown value.
    Thrown { value: RemoteValue, text: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A console call made by evaluated code.
    Console { stream: Stream, args: Vec<RemoteValue> },
    /// Raw text the engine wrote outside the console API.
    Text { stream: Stream, text: String },
    Completed { id: u64, outcome: Outcome },
    /// The engine process ended.
    Exited { code: Option<i32> },
    /// The channel to the engine broke without a clean exit.
    TransportFailed { reason: String },
}

/// Sending half of an engine's event channel.
#[derive(Debug, Clone)]
pub struct EngineEvents {
    tx: Sender<EngineEvent>,
}

impl EngineEvents {
    pub fn new(tx: Sender<EngineEvent>) -> Self {
        EngineEvents { tx }
    }

    /// Deliver an event. Returns false once nobody is listening any more.
    pub fn send(&self, event: EngineEvent) -> bool {
        match self.tx.send(event) {
            Ok(()) => true,
            Err(e) => {
                log::debug!("Engine event dropped, session gone: {:?}", e.into_inner());
                false
            }
        }
    }
}

pub trait Engine: Send {
    /// Launch the engine. Events for this session go to `events` until `stop`.
    fn start(&mut self, config: &EngineConfig, events: EngineEvents) -> Result<(), ReplError>;

    /// Hand `code` to the engine; its completion arrives as
    /// `EngineEvent::Completed { id, .. }`.
    fn submit(&mut self, id: u64, code: &str) -> Result<(), ReplError>;

    /// Tear the engine down. Must be safe to call more than once.
    fn stop(&mut self);
}

/// Builds a fresh engine for every session (first start and each reset).
pub type EngineFactory = Arc<dyn Fn() -> Box<dyn Engine> + Send + Sync>;

/// The default factory: a Node.js child process per session.
pub fn node_engine_factory() -> EngineFactory {
    Arc::new(|| Box::new(NodeEngine::new()) as Box<dyn Engine>)
}
