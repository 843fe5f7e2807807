//! Trace parser using nom
//!
//! Trace format, one operation per line:
//! ```text
//! # comment
//! PUT <key> <value>
//! GET <key>
//! REMOVE <key>
//! OLDEST
//! LEN
//! CLEAR
//! ```
//!
//! Verbs are case-insensitive. Keys and values are whitespace-free tokens.

use nom::{
    bytes::complete::take_till1,
    character::complete::{alpha1, space0, space1},
    combinator::all_consuming,
    multi::many0,
    sequence::{delimited, pair, preceded},
    IResult,
};

use crate::error::{Error, Result};

/// One cache operation from a trace
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Insert or update a key
    Put(String, String),
    /// Look up a key, touching it on a hit
    Get(String),
    /// Remove a key
    Remove(String),
    /// Remove the least recently used entry
    Oldest,
    /// Report the number of resident entries
    Len,
    /// Drop every entry
    Clear,
}

/// A command together with the trace line it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine {
    /// 1-based line number
    pub line: usize,
    /// Parsed operation
    pub command: Command,
}

fn token(input: &str) -> IResult<&str, &str> {
    take_till1(char::is_whitespace)(input)
}

/// Split a line into its verb and argument tokens
fn words(input: &str) -> IResult<&str, (&str, Vec<&str>)> {
    all_consuming(delimited(
        space0,
        pair(alpha1, many0(preceded(space1, token))),
        space0,
    ))(input)
}

fn expect_args(line: usize, verb: &str, args: &[&str], expected: usize) -> Result<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(Error::WrongArity {
            line,
            verb: verb.to_string(),
            expected,
            found: args.len(),
        })
    }
}

/// Parse a single trace line
///
/// Returns `Ok(None)` for blank lines and `#` comments.
pub fn parse_line(line: usize, text: &str) -> Result<Option<Command>> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Ok(None);
    }

    let (_, (verb, args)) = words(trimmed).map_err(|_| Error::Syntax {
        line,
        text: trimmed.to_string(),
    })?;
    let verb = verb.to_ascii_uppercase();

    let command = match verb.as_str() {
        "PUT" => {
            expect_args(line, &verb, &args, 2)?;
            Command::Put(args[0].to_string(), args[1].to_string())
        }
        "GET" => {
            expect_args(line, &verb, &args, 1)?;
            Command::Get(args[0].to_string())
        }
        "REMOVE" => {
            expect_args(line, &verb, &args, 1)?;
            Command::Remove(args[0].to_string())
        }
        "OLDEST" => {
            expect_args(line, &verb, &args, 0)?;
            Command::Oldest
        }
        "LEN" => {
            expect_args(line, &verb, &args, 0)?;
            Command::Len
        }
        "CLEAR" => {
            expect_args(line, &verb, &args, 0)?;
            Command::Clear
        }
        _ => {
            return Err(Error::UnknownCommand {
                line,
                verb: verb.clone(),
            })
        }
    };

    Ok(Some(command))
}

/// Parse a whole trace, stopping at the first bad line
pub fn parse_trace(input: &str) -> Result<Vec<TraceLine>> {
    let mut commands = Vec::new();
    for (idx, text) in input.lines().enumerate() {
        if let Some(command) = parse_line(idx + 1, text)? {
            commands.push(TraceLine {
                line: idx + 1,
                command,
            });
        }
    }
    Ok(commands)
}
