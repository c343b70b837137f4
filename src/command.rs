//! Operation descriptors and the line protocol they travel in.
//!
//! ```text
//! c <path> f|d      create a file or directory
//! d <path>          delete
//! l <path>          lookup
//! m <src> <dst>     move
//! p <outfile>       print the tree to a file
//! ```
//!
//! Blank lines and lines starting with `#` carry no command.

use crate::error::ApiError;
use crate::types::NodeKind;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// One parsed operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create { path: String, kind: NodeKind },
    Delete { path: String },
    Lookup { path: String },
    Move { src: String, dst: String },
    Print { output: PathBuf },
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let (op, args) = tokens
            .split_first()
            .ok_or_else(|| "empty command".to_string())?;

        let expect = |count: usize| {
            if args.len() == count {
                Ok(())
            } else {
                Err(format!(
                    "'{}' takes {} argument(s), got {}",
                    op,
                    count,
                    args.len()
                ))
            }
        };

        match *op {
            "c" => {
                expect(2)?;
                let kind = NodeKind::from_tag(args[1])
                    .ok_or_else(|| format!("invalid node type '{}'", args[1]))?;
                Ok(Command::Create {
                    path: args[0].to_string(),
                    kind,
                })
            }
            "d" => {
                expect(1)?;
                Ok(Command::Delete {
                    path: args[0].to_string(),
                })
            }
            "l" => {
                expect(1)?;
                Ok(Command::Lookup {
                    path: args[0].to_string(),
                })
            }
            "m" => {
                expect(2)?;
                Ok(Command::Move {
                    src: args[0].to_string(),
                    dst: args[1].to_string(),
                })
            }
            "p" => {
                expect(1)?;
                Ok(Command::Print {
                    output: PathBuf::from(args[0]),
                })
            }
            other => Err(format!("unknown operation '{}'", other)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Create { path, kind } => write!(f, "c {} {}", path, kind.tag()),
            Command::Delete { path } => write!(f, "d {}", path),
            Command::Lookup { path } => write!(f, "l {}", path),
            Command::Move { src, dst } => write!(f, "m {} {}", src, dst),
            Command::Print { output } => write!(f, "p {}", output.display()),
        }
    }
}

/// Parse one input line. `line_number` is 1-based and only used in errors.
pub fn parse_line(line: &str, line_number: usize) -> Result<Option<Command>, ApiError> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }
    trimmed
        .parse()
        .map(Some)
        .map_err(|reason| ApiError::Parse {
            line: line_number,
            reason,
        })
}
