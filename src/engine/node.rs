use super::protocol::{self, EngineMessage, HostMessage};
use super::{Engine, EngineEvent, EngineEvents};
use crate::config::EngineConfig;
use crate::error::ReplError;
use crate::surface::Stream;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded};
use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

const BOOTSTRAP: &str = include_str!("bootstrap.js");

/// Environment variable carrying the `require` search paths to the bootstrap.
const SEARCH_PATHS_ENV: &str = "NODE_REPL_SEARCH_PATHS";

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(20);
const EXIT_POLL_ATTEMPTS: usize = 50;

/// A Node.js child process running the bootstrap script.
///
/// Requests go to the child's stdin as JSON lines. Its stdout carries JSON
/// lines back and is read on a dedicated thread; stderr is forwarded as raw
/// `Error` text on another. End of stdout is reported as `Exited`, anything
/// unreadable as `TransportFailed`.
#[derive(Default)]
pub struct NodeEngine {
    child: Option<Arc<Mutex<Child>>>,
    stdin: Option<ChildStdin>,
}

impl NodeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn command(config: &EngineConfig) -> Result<Command, ReplError> {
        let mut cmd = Command::new(&config.node);
        cmd.arg("-e").arg(BOOTSTRAP);
        if let Some(dir) = &config.working_dir {
            cmd.current_dir(dir);
        }
        let paths = std::env::join_paths(config.search_paths()).map_err(|e| ReplError::Spawn {
            program: config.node.display().to_string(),
            message: e.to_string(),
        })?;
        cmd.env(SEARCH_PATHS_ENV, paths);
        cmd.envs(config.env.iter().map(|(k, v)| (k, v)));
        cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
        Ok(cmd)
    }
}

impl Engine for NodeEngine {
    fn start(&mut self, config: &EngineConfig, events: EngineEvents) -> Result<(), ReplError> {
        let program = config.node.display().to_string();
        let spawn_error = |message: String| ReplError::Spawn {
            program: program.clone(),
            message,
        };

        let mut child = Self::command(config)?.spawn().map_err(|e| spawn_error(e.to_string()))?;
        log::debug!("Started {} (pid {})", program, child.id());

        let (Some(stdin), Some(stdout), Some(stderr)) = (child.stdin.take(), child.stdout.take(), child.stderr.take()) else {
            let _ = child.kill();
            return Err(spawn_error("child process pipes unavailable".to_string()));
        };
        let child = Arc::new(Mutex::new(child));
        self.child = Some(child.clone());
        self.stdin = Some(stdin);

        let (ready_tx, ready_rx) = bounded::<()>(1);
        let out_events = events.clone();
        let out_child = child.clone();
        thread::Builder::new()
            .name("node-repl-stdout".to_string())
            .spawn(move || read_messages(stdout, out_events, out_child, ready_tx))
            .map_err(|e| spawn_error(e.to_string()))?;
        thread::Builder::new()
            .name("node-repl-stderr".to_string())
            .spawn(move || read_stderr(stderr, events))
            .map_err(|e| spawn_error(e.to_string()))?;

        match wait_ready(&ready_rx, config.startup_timeout) {
            Ok(()) => Ok(()),
            Err(message) => {
                self.stop();
                Err(spawn_error(message))
            }
        }
    }

    fn submit(&mut self, id: u64, code: &str) -> Result<(), ReplError> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ReplError::Disconnected);
        };
        let line = protocol::encode(&HostMessage::Execute { id, code })?;
        stdin
            .write_all(line.as_bytes())
            .and_then(|_| stdin.flush())
            .map_err(ReplError::transport)
    }

    fn stop(&mut self) {
        // closing stdin lets the bootstrap exit on its own if it still can
        self.stdin.take();
        if let Some(child) = self.child.take() {
            let mut child = child.lock().unwrap_or_else(PoisonError::into_inner);
            if let Err(e) = child.kill() {
                log::debug!("kill: {e}");
            }
            match child.wait() {
                Ok(status) => log::debug!("Node process {} stopped: {status}", child.id()),
                Err(e) => log::warn!("Failed to reap node process {}: {e}", child.id()),
            }
        }
    }
}

impl Drop for NodeEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn wait_ready(ready_rx: &Receiver<()>, timeout: Duration) -> Result<(), String> {
    match ready_rx.recv_timeout(timeout) {
        Ok(()) => Ok(()),
        Err(RecvTimeoutError::Timeout) => Err(format!("no response within {timeout:?}")),
        Err(RecvTimeoutError::Disconnected) => Err("process exited during startup".to_string()),
    }
}

fn read_messages(stdout: impl Read, events: EngineEvents, child: Arc<Mutex<Child>>, ready_tx: Sender<()>) {
    let reader = BufReader::new(stdout);
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                events.send(EngineEvent::TransportFailed { reason: e.to_string() });
                return;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match protocol::decode(&line) {
            Ok(EngineMessage::Ready) => {
                let _ = ready_tx.try_send(());
            }
            Ok(message) => {
                if let Some(event) = message.into_event()
                    && !events.send(event)
                {
                    return;
                }
            }
            Err(e) => {
                log::warn!("Unreadable message from node: {line:?}");
                events.send(EngineEvent::TransportFailed { reason: e.to_string() });
                return;
            }
        }
    }
    let code = exit_code(&child);
    log::debug!("Node stdout closed, exit code {code:?}");
    events.send(EngineEvent::Exited { code });
}

fn read_stderr(mut stderr: impl Read, events: EngineEvents) {
    let mut buf = [0u8; 4096];
    loop {
        match stderr.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => {
                let text = String::from_utf8_lossy(&buf[..n]).into_owned();
                if !events.send(EngineEvent::Text { stream: Stream::Error, text }) {
                    return;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::debug!("Node stderr closed: {e}");
                return;
            }
        }
    }
}

/// Exit code of a child whose stdout has closed. Polls rather than blocking
/// in `wait` so `stop` can still get at the child.
fn exit_code(child: &Mutex<Child>) -> Option<i32> {
    for _ in 0..EXIT_POLL_ATTEMPTS {
        match child.lock().unwrap_or_else(PoisonError::into_inner).try_wait() {
            Ok(Some(status)) => return status.code(),
            Ok(None) => thread::sleep(EXIT_POLL_INTERVAL),
            Err(e) => {
                log::debug!("try_wait: {e}");
                return None;
            }
        }
    }
    None
}
