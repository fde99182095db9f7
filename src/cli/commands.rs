//! CLI command implementations.

use std::path::Path;
use std::sync::Arc;

use log::info;
use tokio::io::AsyncBufReadExt;

use super::serve::{ReplySink, SessionQueues};
use crate::config::Config;
use crate::engine::{DiagramEngine, Reply};
use crate::graph::{GraphLimits, Snapshot};
use crate::parser::parse;
use crate::render::{compile, GraphvizEngine};
use crate::session::{spawn_eviction_sweeper, Session, SessionId};
use crate::types::{Command, DotbotError, DotbotResult, DEFAULT_HISTORY_DEPTH};

/// Apply a command script to a fresh session and return the final graph.
///
/// One command per line; blank lines and lines starting with `#` are
/// skipped, as are `render` and `help`. The first failing line aborts.
pub fn run_script(script: &str) -> DotbotResult<Snapshot> {
    let mut session = Session::new(
        SessionId::new("script"),
        GraphLimits::unbounded(),
        DEFAULT_HISTORY_DEPTH,
    );

    for (index, line) in script.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let result = parse(line)
            .map_err(DotbotError::from)
            .and_then(|command| match command {
                Command::Edit(edit) => session.apply(&edit).map(|_| ()),
                Command::Reset => {
                    session.reset();
                    Ok(())
                }
                Command::Undo => session.undo(),
                Command::Render { .. } | Command::Help => Ok(()),
            });
        if let Err(e) = result {
            eprintln!("line {}: {e}", index + 1);
            return Err(e);
        }
    }

    Ok(session.snapshot())
}

/// Compile a command script to DOT and print it.
pub fn cmd_compile(path: &Path, json: bool) -> DotbotResult<()> {
    let script = std::fs::read_to_string(path)?;
    let snapshot = run_script(&script)?;
    let description = compile(&snapshot);

    if json {
        let out = serde_json::json!({
            "file": path.display().to_string(),
            "nodes": description.node_count(),
            "edges": description.edge_count(),
            "dot": description.as_str(),
            "snapshot": snapshot,
        });
        println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
    } else {
        print!("{description}");
    }
    Ok(())
}

/// Read `<session-id>\t<command>` lines from stdin and answer each one.
///
/// Every session gets its own worker, so commands for one session apply in
/// arrival order while different sessions proceed in parallel. Workers exit
/// once their session has been idle for the session idle timeout.
pub fn cmd_serve(config: &Config, out_dir: &Path, json: bool) -> DotbotResult<()> {
    std::fs::create_dir_all(out_dir)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let engine = Arc::new(DiagramEngine::from_config(config, graphviz(config)));
        let sweeper = spawn_eviction_sweeper(
            engine.store().clone(),
            config.sweep_interval(),
            config.idle_timeout(),
        );
        info!("Serving; renders go to {}", out_dir.display());

        let sink_dir = out_dir.to_path_buf();
        let sink: ReplySink = Arc::new(move |seq: usize, session_id: &str, reply: &Reply| {
            emit(seq, session_id, reply, &sink_dir, json)
        });
        let mut queues = SessionQueues::new(engine, config.idle_timeout(), sink);
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        let mut line_no = 0;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            if let Some((session_id, text)) = split_message(&line) {
                queues.dispatch(line_no, session_id, text);
            }
        }

        queues.finish().await;
        sweeper.abort();
        Ok::<(), DotbotError>(())
    })
}

/// Interactive single-session loop.
pub fn cmd_repl(config: &Config, session_id: &str, out_dir: &Path, json: bool) -> DotbotResult<()> {
    std::fs::create_dir_all(out_dir)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let engine = DiagramEngine::from_config(config, graphviz(config));
    let mut editor = rustyline::DefaultEditor::new().map_err(readline_error)?;

    eprintln!("  dotbot session '{session_id}'. Type help for commands, exit to quit.");

    let mut counter = 0;
    loop {
        let line = match editor.readline("dotbot> ") {
            Ok(line) => line,
            Err(rustyline::error::ReadlineError::Interrupted)
            | Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => return Err(readline_error(e)),
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }
        let _ = editor.add_history_entry(line);

        counter += 1;
        let reply = runtime.block_on(engine.handle(session_id, line));
        emit(counter, session_id, &reply, out_dir, json);
    }
    Ok(())
}

/// Print a reply; images are written to `out_dir`.
fn emit(seq: usize, session_id: &str, reply: &Reply, out_dir: &Path, json: bool) {
    let saved = match reply {
        Reply::Image { format, bytes } => {
            let path = out_dir.join(format!(
                "{}-{seq}.{}",
                file_stem(session_id),
                format.extension()
            ));
            match std::fs::write(&path, bytes) {
                Ok(()) => Some(path),
                Err(e) => {
                    eprintln!("[{session_id}] #{seq} failed to save image: {e}");
                    None
                }
            }
        }
        _ => None,
    };

    if json {
        let out = serde_json::json!({
            "seq": seq,
            "session": session_id,
            "reply": reply,
            "mime": match reply {
                Reply::Image { format, .. } => Some(format.mime_type()),
                _ => None,
            },
            "path": saved.as_ref().map(|p| p.display().to_string()),
        });
        println!("{out}");
        return;
    }

    match reply {
        Reply::Image { bytes, .. } => match &saved {
            Some(path) => println!(
                "[{session_id}] #{seq} image saved to {} ({} bytes)",
                path.display(),
                bytes.len()
            ),
            None => println!("[{session_id}] #{seq} image not saved"),
        },
        Reply::Text { message } => println!("[{session_id}] #{seq} {message}"),
        Reply::Error { message } => println!("[{session_id}] #{seq} error: {message}"),
    }
}

fn graphviz(config: &Config) -> GraphvizEngine {
    GraphvizEngine::new(&config.render.program, &config.render.layout)
}

/// Split `<session-id>\t<command>` (a space also works as separator).
fn split_message(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let (session_id, text) = line
        .split_once('\t')
        .or_else(|| line.split_once(' '))
        .unwrap_or((line, ""));
    Some((session_id.trim(), text.trim()))
}

/// Session ids are opaque; keep file names portable.
fn file_stem(session_id: &str) -> String {
    session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn readline_error(e: rustyline::error::ReadlineError) -> DotbotError {
    DotbotError::Io(std::io::Error::other(e.to_string()))
}
