use nodejs_repl::*;
use std::sync::Arc;
use std::time::Duration;

#[derive(clap::Parser)]
#[command(name = "noderepl", version, about = "Interactive JavaScript evaluator backed by Node.js")]
struct Cli {
    /// Evaluate a fragment, print the result and exit
    #[arg(short, long)]
    eval: Option<String>,

    /// Project root: working directory and first place `require` looks (node_modules)
    #[arg(short, long)]
    project: Option<std::path::PathBuf>,

    /// Node executable to run
    #[arg(long)]
    node: Option<std::path::PathBuf>,

    /// Seconds to wait for the runtime to start
    #[arg(long, default_value_t = 10)]
    startup_timeout: u64,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    // Initialize logger (controlled by RUST_LOG)
    env_logger::init();

    let cli = <Cli as clap::Parser>::parse();

    let mut config = match &cli.project {
        Some(root) => EngineConfig::for_project(root),
        None => EngineConfig::default(),
    };
    if let Some(node) = &cli.node {
        config = config.with_node(node);
    }
    config = config.with_startup_timeout(Duration::from_secs(cli.startup_timeout));

    let surface = Arc::new(TerminalSurface::new());
    let evaluator = ReplEvaluator::new(config, surface.clone());

    if let Some(code) = cli.eval {
        let result = evaluator.execute_text(&code).wait();
        surface.finish_line();
        if let Err(e) = result {
            log::debug!("evaluation failed: {e}");
            std::process::exit(1);
        }
        return Ok(());
    }

    run_persistent_repl(&evaluator, &surface)
}

// rustyline-driven loop: accumulate lines until the fragment is complete, then submit it.
#[allow(clippy::println_empty_string)]
fn run_persistent_repl(
    evaluator: &ReplEvaluator,
    surface: &TerminalSurface,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    use rustyline::Editor;
    use rustyline::error::ReadlineError;
    use std::path::PathBuf;

    let ver = clap::crate_version!();
    println!("Node.js interactive window v{ver}. Type .help for commands, .exit or Ctrl-D to quit.");

    let mut rl = match Editor::<(), rustyline::history::FileHistory>::new() {
        Ok(e) => e,
        Err(err) => {
            eprintln!("Failed to initialize line editor: {err}");
            std::process::exit(1);
        }
    };

    let history_path: Option<PathBuf> = std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".noderepl_history"));
    if let Some(ref p) = history_path
        && let Err(e) = rl.load_history(p)
    {
        log::debug!("no history loaded from {}: {e}", p.display());
    }

    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "> " } else { "... " };

        match rl.readline(prompt) {
            Ok(line) => {
                if buffer.is_empty()
                    && let Some(command) = parse_command(&line)
                {
                    rl.add_history_entry(line.as_str())?;
                    let flow = run_command(command, evaluator);
                    surface.finish_line();
                    if flow == CommandFlow::Exit {
                        break;
                    }
                    continue;
                }

                if buffer.is_empty() {
                    buffer = line;
                } else {
                    buffer.push_str("\r\n");
                    buffer.push_str(&line);
                }

                if !evaluator.can_execute_text(&buffer) {
                    continue;
                }

                if buffer.trim().is_empty() {
                    buffer.clear();
                    continue;
                }

                rl.add_history_entry(buffer.as_str())?;

                let pending = evaluator.execute_text(&buffer);
                buffer.clear();
                if let Err(e) = pending.wait() {
                    log::debug!("submission failed: {e}");
                }
                surface.finish_line();
            }
            Err(ReadlineError::Interrupted) => {
                println!("");
                buffer.clear();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye");
                break;
            }
            Err(err) => {
                eprintln!("Readline error: {err}");
                break;
            }
        }
    }

    if let Some(ref p) = history_path {
        rl.save_history(p)?;
    }
    evaluator.dispose();
    Ok(())
}
