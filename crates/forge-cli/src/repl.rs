//! Interactive REPL.
//!
//! Uses rustyline for line editing and history. Input lines are sent to
//! the server verbatim, with no client-side validation; the server's
//! parser is the only authority.

use std::path::PathBuf;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::connection::Connection;
use crate::format::format_reply;

/// Runs the interactive loop until quit/exit, ctrl-c, or ctrl-d.
///
/// Blocks the calling thread; a private runtime drives the socket
/// because rustyline needs the main thread for terminal I/O.
pub fn run_repl(host: &str, port: u16) {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}", format!("failed to create runtime: {e}").red());
            return;
        }
    };

    let mut conn = match rt.block_on(Connection::connect(host, port)) {
        Ok(conn) => conn,
        Err(e) => {
            eprintln!(
                "{}",
                format!("could not connect to {host}:{port}: {e}").red()
            );
            return;
        }
    };

    let mut editor = match DefaultEditor::new() {
        Ok(editor) => editor,
        Err(e) => {
            eprintln!("{}", format!("failed to create editor: {e}").red());
            return;
        }
    };

    let history_path = history_file();
    if let Some(ref path) = history_path {
        let _ = editor.load_history(path);
    }

    let prompt = format!("{host}:{port}> ");
    loop {
        match editor.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
                    break;
                }
                let _ = editor.add_history_entry(trimmed);

                match rt.block_on(conn.send_line(trimmed)) {
                    Ok(reply) => println!("{}", format_reply(&reply)),
                    Err(e) => {
                        eprintln!("{}", format!("{e}").red());
                        break;
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}", format!("readline error: {e}").red());
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        let _ = editor.save_history(path);
    }
}

/// Location of the persistent history file, if a home directory exists.
fn history_file() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".forge_history"))
}
