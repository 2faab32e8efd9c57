//! Command parsing for the line protocol.
//!
//! A command is a case-insensitive verb followed by whitespace-separated
//! arguments. An argument may be double-quoted, with `\"` and `\\`
//! escapes, which is how values containing whitespace travel on the
//! wire and in the append log.
//!
//! Unknown verbs are not parse errors; they come back as
//! [`Command::Unknown`] so the dispatcher can count the request and
//! reject it. Parsing only fails on a recognized verb with bad
//! arguments (missing ones, or a non-integer where seconds belong).

use std::borrow::Cow;

use thiserror::Error;

/// A parsed client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ping,
    Set { key: String, value: String },
    Get { key: String },
    Del { key: String },
    Expire { key: String, seconds: i64 },
    Ttl { key: String },
    Stats,
    /// A verb this server doesn't know, carried through for rejection.
    Unknown(String),
}

/// Argument validation failures for recognized verbs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("wrong number of arguments for '{command}' command")]
    WrongArity { command: &'static str },

    #[error("value is not an integer or out of range")]
    NotAnInteger,
}

impl Command {
    /// Parses one input line. Leading and trailing whitespace is
    /// ignored; surplus arguments after a complete command are too.
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let tokens = tokenize(line);
        let Some(verb) = tokens.first() else {
            return Ok(Command::Unknown(String::new()));
        };

        let mut args = tokens.iter().skip(1);
        let mut arg = |command: &'static str| {
            args.next()
                .cloned()
                .ok_or(CommandError::WrongArity { command })
        };

        match verb.to_ascii_uppercase().as_str() {
            "PING" => Ok(Command::Ping),
            "SET" => Ok(Command::Set {
                key: arg("set")?,
                value: arg("set")?,
            }),
            "GET" => Ok(Command::Get { key: arg("get")? }),
            "DEL" => Ok(Command::Del { key: arg("del")? }),
            "EXPIRE" => {
                let key = arg("expire")?;
                let seconds = arg("expire")?
                    .parse::<i64>()
                    .map_err(|_| CommandError::NotAnInteger)?;
                Ok(Command::Expire { key, seconds })
            }
            "TTL" => Ok(Command::Ttl { key: arg("ttl")? }),
            "STATS" => Ok(Command::Stats),
            _ => Ok(Command::Unknown(verb.clone())),
        }
    }
}

/// Splits a line into tokens: runs of non-whitespace, or double-quoted
/// strings in which a backslash escapes the next character. Empty
/// tokens (from `""`) are dropped.
fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let mut token = String::new();
        if c == '"' {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '"' => break,
                    '\\' => {
                        if let Some(escaped) = chars.next() {
                            token.push(escaped);
                        }
                    }
                    other => token.push(other),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
        }

        if !token.is_empty() {
            tokens.push(token);
        }
    }

    tokens
}

/// Encodes a field for the wire/log grammar: returned as-is unless it
/// contains whitespace, a quote, or a backslash, in which case it is
/// wrapped in double quotes with `"` and `\` backslash-escaped.
///
/// The inverse of the tokenizer's quoted-string handling, so any field
/// survives a round trip through [`Command::parse`].
pub fn quote(field: &str) -> Cow<'_, str> {
    if !field.contains([' ', '\t', '"', '\\']) {
        return Cow::Borrowed(field);
    }
    let mut quoted = String::with_capacity(field.len() + 2);
    quoted.push('"');
    for c in field.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Cow::Owned(quoted)
}
