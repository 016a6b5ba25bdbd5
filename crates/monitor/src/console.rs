//! Line commands accepted by the `triageq-monitor` console.

use std::str::FromStr;

use triageq_core::error::CoreError;
use triageq_core::profile::Profile;
use triageq_core::vitals::VitalLabel;

pub const HELP: &str = "\
commands:
  hold | resume        pause or resume sampling
  vot                  vascular occlusion test (protocol step 3 only)
  start | reset        start or reset the assessment protocol
  profile <name>       switch the simulation profile
  inspect <vital>      show definition, interpretation and trend
  status               print the current state
  quit                 exit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Hold,
    Resume,
    Vot,
    Start,
    Reset,
    Profile(Profile),
    Inspect(VitalLabel),
    Status,
    Quit,
    Help,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConsoleError {
    #[error("Unknown command: {0} (try `help`)")]
    Unknown(String),

    #[error("`{0}` needs an argument")]
    MissingArgument(&'static str),

    #[error("`{0}` takes no argument")]
    UnexpectedArgument(&'static str),

    #[error(transparent)]
    Invalid(#[from] CoreError),
}

impl FromStr for ConsoleCommand {
    type Err = ConsoleError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let bare = |command: &'static str, parsed: ConsoleCommand| {
            if rest.is_empty() {
                Ok(parsed)
            } else {
                Err(ConsoleError::UnexpectedArgument(command))
            }
        };

        match word.to_ascii_lowercase().as_str() {
            "hold" => bare("hold", ConsoleCommand::Hold),
            "resume" => bare("resume", ConsoleCommand::Resume),
            "vot" => bare("vot", ConsoleCommand::Vot),
            "start" => bare("start", ConsoleCommand::Start),
            "reset" => bare("reset", ConsoleCommand::Reset),
            "status" => bare("status", ConsoleCommand::Status),
            "quit" | "exit" => bare("quit", ConsoleCommand::Quit),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "profile" if rest.is_empty() => Err(ConsoleError::MissingArgument("profile")),
            "profile" => Ok(ConsoleCommand::Profile(rest.parse()?)),
            "inspect" if rest.is_empty() => Err(ConsoleError::MissingArgument("inspect")),
            "inspect" => Ok(ConsoleCommand::Inspect(rest.parse()?)),
            _ => Err(ConsoleError::Unknown(word.to_string())),
        }
    }
}
