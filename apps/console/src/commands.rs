//! Line commands read from stdin.

use std::str::FromStr;
use welfare_input::{InputError, KeyChord};

pub const HELP: &str = "\
commands:
  login <username> <password>   start a session
  lock                          lock now
  unlock <password>             unlock the current session
  logout                        end the session
  activity                      simulate pointer movement
  key <chord>                   simulate a key press, e.g. key ctrl+shift+l
  click                         simulate a click (pointer down + click)
  refresh                       fetch notifications now
  list                          show the current notifications
  read <id>                     mark a notification read
  status                        show the session status
  help                          show this help
  quit                          tear down and exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { username: String, password: String },
    Lock,
    Unlock { password: String },
    Logout,
    Activity,
    Key(KeyChord),
    Click,
    Refresh,
    List,
    Read { id: String },
    Status,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("'{command}' needs <{arg}>")]
    MissingArgument {
        command: &'static str,
        arg: &'static str,
    },
    #[error("invalid key chord: {0}")]
    Chord(#[from] InputError),
}

impl FromStr for Command {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let name = words.next().ok_or(ParseError::Empty)?;
        let mut arg = |command: &'static str, arg: &'static str| {
            words
                .next()
                .map(str::to_string)
                .ok_or(ParseError::MissingArgument { command, arg })
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "login" => Command::Login {
                username: arg("login", "username")?,
                password: arg("login", "password")?,
            },
            "lock" => Command::Lock,
            "unlock" => Command::Unlock {
                password: arg("unlock", "password")?,
            },
            "logout" => Command::Logout,
            "activity" | "move" => Command::Activity,
            "key" => Command::Key(arg("key", "chord")?.parse()?),
            "click" => Command::Click,
            "refresh" => Command::Refresh,
            "list" | "ls" => Command::List,
            "read" => Command::Read {
                id: arg("read", "id")?,
            },
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            other => return Err(ParseError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}
