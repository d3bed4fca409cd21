use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the default node executable.
pub const NODE_ENV_VAR: &str = "NODE_REPL_NODE";

const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);

/// How to launch the execution engine for a session.
///
/// Search paths are computed each time a session starts, so a `node_modules`
/// directory created after the evaluator was built is picked up on reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub node: PathBuf,
    pub working_dir: Option<PathBuf>,
    /// Project root whose `node_modules` is searched before relative resolution.
    pub project_root: Option<PathBuf>,
    pub extra_search_paths: Vec<PathBuf>,
    pub env: Vec<(OsString, OsString)>,
    pub startup_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let node = std::env::var_os(NODE_ENV_VAR).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("node"));
        EngineConfig {
            node,
            working_dir: None,
            project_root: None,
            extra_search_paths: Vec::new(),
            env: Vec::new(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }
}

impl EngineConfig {
    /// A session rooted at `root`: runs in `root` and resolves `require`
    /// through `<root>/node_modules` first.
    pub fn for_project(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        EngineConfig {
            working_dir: Some(root.clone()),
            project_root: Some(root),
            ..Self::default()
        }
    }

    pub fn with_node(mut self, node: impl Into<PathBuf>) -> Self {
        self.node = node.into();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_search_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.extra_search_paths.push(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Directories `require` searches before falling back to resolution
    /// relative to the working directory, in order.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(root) = &self.project_root {
            paths.push(root.join("node_modules"));
        }
        paths.extend(self.extra_search_paths.iter().cloned());
        paths
    }

    /// Directory relative paths are resolved against (the working directory,
    /// or the current directory of this process).
    pub fn base_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }
}
