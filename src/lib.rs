//! Interactive JavaScript evaluation against an out-of-process Node.js
//! runtime.
//!
//! - [`can_execute`] decides whether typed text is a complete fragment or
//!   the prompt should keep reading lines.
//! - [`ReplEvaluator`] owns the engine session: it starts the runtime,
//!   submits fragments, and writes console output, results and errors to a
//!   [`Surface`], surviving runtime exits until reset.
//! - [`Formatter`] turns the runtime's values into display text;
//!   [`NodeInspector`] is the classic Node rendering.

pub mod balance;
pub mod command;
pub mod completeness;
pub mod config;
pub mod engine;
pub(crate) mod error;
pub mod evaluator;
pub mod format;
pub mod save;
pub mod surface;
pub(crate) mod value;

pub use balance::{Balance, scan};
pub use command::{CommandFlow, ReplCommand, parse_command, run_command};
pub use completeness::can_execute;
pub use config::EngineConfig;
pub use engine::{Engine, EngineEvent, EngineEvents, EngineFactory, NodeEngine, Outcome, node_engine_factory};
pub use error::ReplError;
pub use evaluator::{PendingSubmission, ReplEvaluator, SessionState, SubmissionResult};
pub use format::{DISCONNECTED_MESSAGE, Formatter, LINE_TERMINATOR, NodeInspector, PROCESS_EXITED_MESSAGE};
pub use save::save_session;
pub use surface::{MemorySurface, Stream, Surface, TerminalSurface};
pub use value::RemoteValue;
