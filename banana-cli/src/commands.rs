//! Line commands understood by the REPL.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Load(PathBuf),
    Edit(String),
    Undo,
    /// Entry index (0 = current) or a unique id prefix.
    Rewind(String),
    History,
    Status,
    Save(PathBuf),
    Clear,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  load <path>          start over from an image file
  edit <instruction>   describe a change, e.g. `edit add a retro film filter`
  undo                 drop the current version and go back one
  rewind <n|id>        go back to entry n (0 = current) or an id prefix; newer versions are discarded
  history              list versions, most recent first
  status               show edit status and last error
  save <path>          write the current image to a file
  clear                discard everything
  help                 show this text
  quit                 exit";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command '{0}' (try `help`)")]
    Unknown(String),

    #[error("`{command}` needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },

    #[error("`{0}` takes no arguments")]
    UnexpectedArgument(&'static str),
}

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "load" | "open" => Command::Load(path_arg("load", rest)?),
        "edit" | "e" => {
            if rest.is_empty() {
                return Err(ParseError::MissingArgument {
                    command: "edit",
                    what: "an instruction",
                });
            }
            Command::Edit(rest.to_string())
        }
        "undo" | "u" => no_args("undo", rest, Command::Undo)?,
        "rewind" | "r" => {
            if rest.is_empty() {
                return Err(ParseError::MissingArgument {
                    command: "rewind",
                    what: "an entry number or id",
                });
            }
            Command::Rewind(rest.to_string())
        }
        "history" | "h" | "ls" => no_args("history", rest, Command::History)?,
        "status" => no_args("status", rest, Command::Status)?,
        "save" => Command::Save(path_arg("save", rest)?),
        "clear" | "reset" => no_args("clear", rest, Command::Clear)?,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };

    Ok(Some(command))
}

fn path_arg(command: &'static str, rest: &str) -> Result<PathBuf, ParseError> {
    let rest = rest.trim_matches(|c| c == '"' || c == '\'');
    if rest.is_empty() {
        return Err(ParseError::MissingArgument {
            command,
            what: "a file path",
        });
    }
    Ok(PathBuf::from(rest))
}

fn no_args(command: &'static str, rest: &str, cmd: Command) -> Result<Command, ParseError> {
    if rest.is_empty() {
        Ok(cmd)
    } else {
        Err(ParseError::UnexpectedArgument(command))
    }
}

/// Guess a MIME type from the file extension. Unknown extensions fall back to PNG,
/// which is what the editor assumed for every upload.
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        Some("heic") => "image/heic",
        Some("heif") => "image/heif",
        _ => "image/png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_keeps_full_instruction() {
        assert_eq!(
            parse("edit   Make it look like a rainy cyberpunk night ").unwrap(),
            Some(Command::Edit(
                "Make it look like a rainy cyberpunk night".into()
            ))
        );
    }

    #[test]
    fn test_blank_and_comment_lines() {
        assert_eq!(parse("   ").unwrap(), None);
        assert_eq!(parse("# just a note").unwrap(), None);
    }

    #[test]
    fn test_aliases_and_case() {
        assert_eq!(parse("U").unwrap(), Some(Command::Undo));
        assert_eq!(parse("ls").unwrap(), Some(Command::History));
        assert_eq!(parse("Exit").unwrap(), Some(Command::Quit));
        assert_eq!(parse("r 2").unwrap(), Some(Command::Rewind("2".into())));
    }

    #[test]
    fn test_paths_strip_quotes() {
        assert_eq!(
            parse("load \"my photo.png\"").unwrap(),
            Some(Command::Load(PathBuf::from("my photo.png")))
        );
        assert_eq!(
            parse("save out.jpg").unwrap(),
            Some(Command::Save(PathBuf::from("out.jpg")))
        );
    }

    #[test]
    fn test_argument_errors() {
        assert!(matches!(
            parse("edit"),
            Err(ParseError::MissingArgument { command: "edit", .. })
        ));
        assert!(matches!(
            parse("load ''"),
            Err(ParseError::MissingArgument { command: "load", .. })
        ));
        assert_eq!(
            parse("undo twice"),
            Err(ParseError::UnexpectedArgument("undo"))
        );
        assert_eq!(
            parse("paint red"),
            Err(ParseError::Unknown("paint".into()))
        );
    }

    #[test]
    fn test_mime_guess() {
        assert_eq!(mime_for_path(Path::new("a/b/photo.JPG")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("x.webp")), "image/webp");
        assert_eq!(mime_for_path(Path::new("noext")), "image/png");
    }
}
