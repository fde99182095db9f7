//! Phase 5 tests: end-to-end message handling, config and CLI.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dotbot::cli::commands::run_script;
use dotbot::cli::serve::{ReplySink, SessionQueues};
use dotbot::config::{load_config, Config};
use dotbot::engine::{DiagramEngine, Reply};
use dotbot::render::{LayoutEngine, RenderLimits, RenderPipeline};
use dotbot::session::SessionStore;
use dotbot::types::{DotbotError, DotbotResult, OutputFormat};

use tempfile::{NamedTempFile, TempDir};

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

/// Fake layout engine: optional delay, optional failure, counts calls.
#[derive(Default)]
struct FakeEngine {
    delay: Duration,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeEngine {
    fn slow(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }
}

impl LayoutEngine for FakeEngine {
    fn name(&self) -> &str {
        "fake"
    }

    async fn layout(&self, _description: &str, _format: OutputFormat) -> DotbotResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(DotbotError::RenderFailure {
                diagnostic: "Error: syntax error in line 3".to_string(),
            });
        }
        Ok(PNG.to_vec())
    }
}

fn engine_with(fake: FakeEngine) -> DiagramEngine<FakeEngine> {
    DiagramEngine::new(
        Arc::new(SessionStore::default()),
        RenderPipeline::new(fake, RenderLimits::default()),
        OutputFormat::Png,
    )
}

fn calls(engine: &DiagramEngine<FakeEngine>) -> usize {
    engine.pipeline().engine().calls.load(Ordering::SeqCst)
}

async fn send(engine: &DiagramEngine<FakeEngine>, session: &str, text: &str) -> Reply {
    engine.handle(session, text).await
}

fn text(reply: &Reply) -> &str {
    match reply {
        Reply::Text { message } => message,
        other => panic!("expected text reply, got {other:?}"),
    }
}

fn error(reply: &Reply) -> &str {
    match reply {
        Reply::Error { message } => message,
        other => panic!("expected error reply, got {other:?}"),
    }
}

async fn node_count(engine: &DiagramEngine<FakeEngine>, session: &str) -> usize {
    let handle = engine.store().get(session).expect("session exists");
    let session = handle.lock().await;
    session.graph().node_count()
}

// ==================== Message handling ====================

#[tokio::test]
async fn test_build_and_render() {
    let engine = engine_with(FakeEngine::default());

    assert_eq!(text(&send(&engine, "s", "add-node A").await), "Added node A");
    assert_eq!(text(&send(&engine, "s", "add-node B").await), "Added node B");
    assert_eq!(
        text(&send(&engine, "s", "add-edge A B \"calls\"").await),
        "Added edge A -> B"
    );

    let reply = send(&engine, "s", "render").await;
    assert_eq!(reply.image_bytes(), Some(PNG));
    assert!(matches!(
        reply,
        Reply::Image {
            format: OutputFormat::Png,
            ..
        }
    ));
}

#[tokio::test]
async fn test_unknown_endpoint_rejected() {
    let engine = engine_with(FakeEngine::default());
    send(&engine, "s", "add-node A").await;

    let reply = send(&engine, "s", "add-edge A B").await;
    assert!(reply.is_error());
    assert_eq!(error(&reply), "Unknown node 'B'");
    assert_eq!(node_count(&engine, "s").await, 1);
}

#[tokio::test]
async fn test_cascade_through_messages() {
    let engine = engine_with(FakeEngine::default());
    for line in ["add-node A", "add-node B", "add-edge A B calls"] {
        send(&engine, "s", line).await;
    }
    assert_eq!(
        text(&send(&engine, "s", "remove-node A").await),
        "Removed node A and 1 edge"
    );
    let handle = engine.store().get("s").unwrap();
    let session = handle.lock().await;
    assert_eq!(session.graph().node_count(), 1);
    assert_eq!(session.graph().edge_count(), 0);
}

#[tokio::test]
async fn test_parse_error_reply_has_caret() {
    let engine = engine_with(FakeEngine::default());
    let reply = send(&engine, "s", "add-edge A").await;
    let message = error(&reply);
    assert!(message.starts_with("\"add-edge A\"\n"));
    assert!(message.contains('^'));
    assert!(message.contains("usage: add-edge"));

    let reply = send(&engine, "s", "rendr").await;
    assert!(error(&reply).contains("did you mean 'render'?"));
}

#[tokio::test]
async fn test_oversized_render_skips_engine() {
    let engine = engine_with(FakeEngine::default());
    for i in 0..600 {
        let reply = send(&engine, "s", &format!("add-node n{i}")).await;
        assert!(!reply.is_error());
    }

    let reply = send(&engine, "s", "render").await;
    assert_eq!(error(&reply), "Too many nodes: 600 > 500");
    assert_eq!(calls(&engine), 0);
    assert_eq!(node_count(&engine, "s").await, 600);
}

#[tokio::test]
async fn test_render_cache_reused_until_graph_changes() {
    let engine = engine_with(FakeEngine::default());
    send(&engine, "s", "add-node A").await;

    assert!(send(&engine, "s", "render").await.image_bytes().is_some());
    assert!(send(&engine, "s", "render png").await.image_bytes().is_some());
    assert_eq!(calls(&engine), 1);

    send(&engine, "s", "set-attribute node A color red").await;
    assert!(send(&engine, "s", "render").await.image_bytes().is_some());
    assert_eq!(calls(&engine), 2);
}

#[tokio::test]
async fn test_empty_render_and_control_replies() {
    let engine = engine_with(FakeEngine::default());
    assert_eq!(
        text(&send(&engine, "s", "render").await),
        "Nothing to draw yet; add a node first"
    );
    assert_eq!(calls(&engine), 0);

    assert_eq!(error(&send(&engine, "s", "undo").await), "Nothing to undo");
    assert_eq!(
        text(&send(&engine, "s", "reset").await),
        "Diagram is already empty"
    );

    send(&engine, "s", "add-node A").await;
    send(&engine, "s", "add-node B").await;
    assert_eq!(
        text(&send(&engine, "s", "undo").await),
        "Undone; 1 nodes, 0 edges"
    );
    assert_eq!(text(&send(&engine, "s", "clear").await), "Diagram cleared");
    assert!(text(&send(&engine, "s", "help").await).contains("add-node"));
}

#[tokio::test]
async fn test_render_failure_keeps_session() {
    let engine = engine_with(FakeEngine::failing());
    send(&engine, "s", "add-node A").await;

    let reply = send(&engine, "s", "render").await;
    assert!(error(&reply).contains("syntax error in line 3"));

    assert_eq!(text(&send(&engine, "s", "add-node B").await), "Added node B");
    assert_eq!(node_count(&engine, "s").await, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sessions_are_isolated() {
    let engine = Arc::new(engine_with(FakeEngine::default()));
    let mut tasks = Vec::new();
    for s in 0..20 {
        let engine = engine.clone();
        tasks.push(tokio::spawn(async move {
            let session = format!("chat-{s}");
            for n in 0..10 {
                let reply = engine.handle(&session, &format!("add-node n{n}")).await;
                assert!(!reply.is_error());
            }
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    assert_eq!(engine.store().len(), 20);
    for s in 0..20 {
        assert_eq!(node_count(&engine, &format!("chat-{s}")).await, 10);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_edits_proceed_while_rendering() {
    let engine = Arc::new(engine_with(FakeEngine::slow(Duration::from_millis(500))));
    send(&engine, "s", "add-node A").await;

    let render = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.handle("s", "render").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let edit = tokio::time::timeout(Duration::from_millis(200), engine.handle("s", "add-node B"))
        .await
        .expect("edit blocked behind the render");
    assert_eq!(text(&edit), "Added node B");

    assert!(render.await.unwrap().image_bytes().is_some());
}

#[tokio::test]
async fn test_render_timeout_reply() {
    let engine = DiagramEngine::new(
        Arc::new(SessionStore::default()),
        RenderPipeline::new(
            FakeEngine::slow(Duration::from_secs(5)),
            RenderLimits {
                timeout: Duration::from_millis(50),
                ..RenderLimits::default()
            },
        ),
        OutputFormat::Png,
    );
    engine.handle("s", "add-node A").await;
    let reply = engine.handle("s", "render").await;
    assert_eq!(error(&reply), "Render failed: timed out after 50ms");
}

// ==================== Serve queues ====================

type ReplyLog = Arc<Mutex<Vec<(usize, String, String)>>>;

fn recording_sink() -> (ReplySink, ReplyLog) {
    let log: ReplyLog = Arc::default();
    let sink_log = log.clone();
    let sink: ReplySink = Arc::new(move |seq: usize, session: &str, reply: &Reply| {
        let message = match reply {
            Reply::Text { message } | Reply::Error { message } => message.clone(),
            Reply::Image { .. } => "image".to_string(),
        };
        sink_log
            .lock()
            .unwrap()
            .push((seq, session.to_string(), message));
    });
    (sink, log)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_serve_worker_exits_when_idle() {
    let engine = Arc::new(engine_with(FakeEngine::default()));
    let (sink, log) = recording_sink();
    let mut queues = SessionQueues::new(engine.clone(), Duration::from_millis(200), sink);

    queues.dispatch(1, "s", "add-node A");
    queues.dispatch(2, "t", "add-node A");
    assert_eq!(queues.active(), 2);

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(queues.active(), 0);

    // A later line for the same session starts a new worker on the same graph.
    queues.dispatch(3, "s", "add-node B");
    assert_eq!(queues.active(), 1);
    queues.finish().await;

    assert_eq!(node_count(&engine, "s").await, 2);
    assert_eq!(log.lock().unwrap().len(), 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_serve_queue_keeps_session_order() {
    let engine = Arc::new(engine_with(FakeEngine::default()));
    let (sink, log) = recording_sink();
    let mut queues = SessionQueues::new(engine.clone(), Duration::from_secs(60), sink);

    queues.dispatch(1, "s", "add-node A");
    queues.dispatch(2, "s", "add-node B");
    queues.dispatch(3, "s", "add-edge A B");
    queues.dispatch(4, "s", "remove-node B");
    queues.finish().await;
    assert_eq!(node_count(&engine, "s").await, 1);

    let log = log.lock().unwrap();
    let seqs: Vec<usize> = log.iter().map(|(seq, _, _)| *seq).collect();
    assert_eq!(seqs, vec![1, 2, 3, 4]);
    assert_eq!(log[2].2, "Added edge A -> B");
}

// ==================== Config ====================

#[test]
fn test_config_defaults() {
    let config = Config::default();
    assert_eq!(config.idle_timeout(), Duration::from_secs(1800));
    assert_eq!(config.render_limits(), RenderLimits::default());
    assert_eq!(config.render.format, OutputFormat::Png);
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_from_toml() {
    let config = Config::from_toml_str(
        r#"
        log_level = "debug"

        [session]
        idle_timeout_secs = 60
        history_depth = 4

        [render]
        format = "svg"
        max_nodes = 10
        timeout_ms = 2500
        "#,
    )
    .unwrap();

    assert_eq!(config.log_level, "debug");
    assert_eq!(config.idle_timeout(), Duration::from_secs(60));
    assert_eq!(config.session.history_depth, 4);
    assert_eq!(config.session.sweep_interval_secs, 60);
    assert_eq!(config.render.format, OutputFormat::Svg);
    assert_eq!(config.render_limits().max_nodes, 10);
    assert_eq!(config.render_limits().timeout, Duration::from_millis(2500));
    assert_eq!(config.render.program, "dot");
}

#[test]
fn test_config_rejects_bad_toml() {
    let err = Config::from_toml_str("[render]\nformat = \"gif\"").unwrap_err();
    assert!(matches!(err, DotbotError::Config(_)));
}

#[test]
fn test_config_overrides() {
    let mut config = Config::default();
    config
        .apply_overrides(|name| match name {
            "DOTBOT_MAX_NODES" => Some("42".to_string()),
            "DOTBOT_OUTPUT_FORMAT" => Some("PDF".to_string()),
            "DOTBOT_DOT_PROGRAM" => Some("/opt/graphviz/bin/dot".to_string()),
            _ => None,
        })
        .unwrap();
    assert_eq!(config.render.max_nodes, 42);
    assert_eq!(config.render.format, OutputFormat::Pdf);
    assert_eq!(config.render.program, "/opt/graphviz/bin/dot");

    let err = config
        .apply_overrides(|name| (name == "DOTBOT_RENDER_TIMEOUT_MS").then(|| "soon".to_string()))
        .unwrap_err();
    assert!(err.to_string().contains("DOTBOT_RENDER_TIMEOUT_MS"));
}

#[test]
fn test_config_validation() {
    let mut config = Config::default();
    config.render.timeout_ms = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.render.program = "  ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_load_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[session]\nmax_nodes = 5").unwrap();

    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.graph_limits().max_nodes, 5);

    let err = load_config(Some(std::path::Path::new("/nonexistent/dotbot.toml"))).unwrap_err();
    assert!(matches!(err, DotbotError::Config(_)));
}

#[tokio::test]
async fn test_engine_from_config_uses_limits() {
    let mut config = Config::default();
    config.session.max_nodes = 2;
    let engine = DiagramEngine::from_config(&config, FakeEngine::default());

    engine.handle("s", "add-node A").await;
    engine.handle("s", "add-node B").await;
    let reply = engine.handle("s", "add-node C").await;
    assert_eq!(error(&reply), "Too many nodes: 3 > 2");
}

// ==================== Scripts ====================

#[test]
fn test_run_script() {
    let snapshot = run_script(
        "# services\n\
         add-node api\n\
         add-node db \"Database\"\n\
         \n\
         add-edge api db reads\n\
         add-node tmp\n\
         undo\n\
         render\n",
    )
    .unwrap();
    assert_eq!(snapshot.node_count(), 2);
    assert_eq!(snapshot.edge_count(), 1);
    assert_eq!(snapshot.node("db").unwrap().label, "Database");
}

#[test]
fn test_run_script_stops_at_first_error() {
    let err = run_script("add-node A\nadd-edge A B\nadd-node C\n").unwrap_err();
    assert!(matches!(err, DotbotError::UnknownNode(id) if id == "B"));
}

// ==================== CLI ====================

fn dotbot_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_dotbot"))
}

fn run_dotbot(args: &[&str]) -> Output {
    Command::new(dotbot_bin())
        .args(args)
        .output()
        .expect("Failed to run dotbot")
}

fn script(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_cli_compile() {
    let file = script("add-node A\nadd-node B\nadd-edge A B calls\n");
    let output = run_dotbot(&["compile", file.path().to_str().unwrap()]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "digraph \"diagram\" {\n  \"A\" [label=\"A\"];\n  \"B\" [label=\"B\"];\n  \"A\" -> \"B\" [label=\"calls\"];\n}\n"
    );
}

#[test]
fn test_cli_compile_json() {
    let file = script("add-node A\nadd-node B\nadd-edge A B\n");
    let output = run_dotbot(&["--format", "json", "compile", file.path().to_str().unwrap()]);
    assert!(output.status.success(), "{output:?}");

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["nodes"], 2);
    assert_eq!(json["edges"], 1);
    assert!(json["dot"].as_str().unwrap().starts_with("digraph"));
}

#[test]
fn test_cli_exit_codes() {
    let parse_error = script("add-edge A\n");
    let output = run_dotbot(&["compile", parse_error.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(3));

    let unknown_node = script("add-node A\nadd-edge A B\n");
    let output = run_dotbot(&["compile", unknown_node.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(4));
    assert!(String::from_utf8_lossy(&output.stderr).contains("line 2"));

    let output = run_dotbot(&["compile", "/nonexistent/script.txt"]);
    assert_eq!(output.status.code(), Some(1));

    let output = run_dotbot(&["--config", "/nonexistent/dotbot.toml", "compile", "x"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_serve() {
    let out_dir = TempDir::new().unwrap();
    let mut child = Command::new(dotbot_bin())
        .args(["--format", "json", "serve", "--out-dir"])
        .arg(out_dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to run dotbot");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"s1\tadd-node A\ns2\tadd-node A\ns1\tadd-edge A B\ns1\tadd-node B\ns1\tadd-edge A B\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success(), "{output:?}");

    let replies: Vec<serde_json::Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(replies.len(), 5);

    let reply = |seq: u64| {
        replies
            .iter()
            .find(|r| r["seq"] == seq)
            .map(|r| r["reply"].clone())
            .unwrap()
    };
    assert_eq!(reply(3)["kind"], "error");
    assert_eq!(reply(3)["message"], "Unknown node 'B'");
    assert_eq!(reply(5)["kind"], "text");
    assert_eq!(reply(5)["message"], "Added edge A -> B");
}
