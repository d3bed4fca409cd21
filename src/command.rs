//! Dot-commands typed at the prompt (`.reset`, `.save file.js`, ...).

use crate::evaluator::ReplEvaluator;
use crate::format::LINE_TERMINATOR;
use crate::save::save_session;
use crate::surface::Stream;

pub const HELP_TEXT: &str = "\
.clear    Clear the display\r\n\
.exit     Leave the interactive session\r\n\
.help     Show this list\r\n\
.history  Show the submissions made in this session\r\n\
.reset    Restart the interactive process\r\n\
.save     Save the session's submissions to a file: .save <file>\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplCommand<'a> {
    Clear,
    Exit,
    Help,
    History,
    Reset,
    Save(&'a str),
    Unknown(&'a str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandFlow {
    Continue,
    Exit,
}

/// Recognize a dot-command. `.5 + 1` and other code starting with a dot is
/// left alone.
pub fn parse_command(line: &str) -> Option<ReplCommand<'_>> {
    let rest = line.trim().strip_prefix('.')?;
    if !rest.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    let command = match name {
        "clear" | "cls" => ReplCommand::Clear,
        "exit" | "quit" => ReplCommand::Exit,
        "help" => ReplCommand::Help,
        "history" => ReplCommand::History,
        "reset" => ReplCommand::Reset,
        "save" => ReplCommand::Save(args),
        other => ReplCommand::Unknown(other),
    };
    Some(command)
}

/// Run `command` against `evaluator`, reporting to its surface.
pub fn run_command(command: ReplCommand<'_>, evaluator: &ReplEvaluator) -> CommandFlow {
    let surface = evaluator.surface();
    match command {
        ReplCommand::Clear => surface.clear(),
        ReplCommand::Exit => return CommandFlow::Exit,
        ReplCommand::Help => surface.append(HELP_TEXT, Stream::Output),
        ReplCommand::History => {
            for entry in evaluator.history() {
                surface.append(&format!("{entry}{LINE_TERMINATOR}"), Stream::Output);
            }
        }
        ReplCommand::Reset => {
            if let Err(e) = evaluator.reset() {
                log::warn!("Reset failed: {e}");
            }
        }
        ReplCommand::Save(filename) => {
            let config = evaluator.config();
            match save_session(&evaluator.history(), filename, config.base_dir()) {
                Ok(path) => surface.append(&format!("Session saved to: {}{LINE_TERMINATOR}", path.display()), Stream::Output),
                Err(e) => surface.append(&format!("{e}{LINE_TERMINATOR}"), Stream::Error),
            }
        }
        ReplCommand::Unknown(name) => {
            surface.append(&format!("Unknown command: .{name}{LINE_TERMINATOR}"), Stream::Error);
        }
    }
    CommandFlow::Continue
}
