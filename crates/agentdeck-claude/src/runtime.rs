//! [`AgentRuntime`] backed by a `claude` child process.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};

use agentdeck_core::{
    AgentError, AgentMessage, AgentRuntime, CanUseTool, PermissionResult, Query, QueryControl,
    QueryRequest, ToolUseContext,
};
use async_trait::async_trait;
use futures::StreamExt;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::args::{build_args, child_env};
use crate::protocol::{self, CAN_USE_TOOL, ControlRequestBody, Inbound};

/// Default executable name, resolved through `PATH`.
pub const DEFAULT_EXECUTABLE: &str = "claude";

/// Lines of stderr kept for error reports.
const STDERR_TAIL_LINES: usize = 20;

/// Runs each query as a fresh `claude` process speaking stream-json.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaudeCliRuntime {
    executable: PathBuf,
}

impl Default for ClaudeCliRuntime {
    fn default() -> Self {
        Self::new(DEFAULT_EXECUTABLE)
    }
}

impl ClaudeCliRuntime {
    /// Runtime launching `executable`.
    #[must_use]
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// The executable this runtime launches.
    #[must_use]
    pub fn executable(&self) -> &Path {
        &self.executable
    }

    fn spawn(&self, request: &QueryRequest) -> Result<Child, AgentError> {
        let options = &request.options;
        let args = build_args(options, request.can_use_tool.is_some());
        debug!(executable = %self.executable.display(), ?args, "Spawning claude process");

        let mut cmd = Command::new(&self.executable);
        cmd.args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in child_env(options) {
            cmd.env(key, value);
        }
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }

        cmd.spawn().map_err(|e| {
            AgentError::Spawn(format!("{}: {e}", self.executable.display()))
        })
    }
}

#[async_trait]
impl AgentRuntime for ClaudeCliRuntime {
    async fn query(&self, request: QueryRequest) -> Result<Query, AgentError> {
        let mut child = self.spawn(&request)?;
        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            return Err(AgentError::Spawn("child stdio was not captured".to_string()));
        };

        let stdin = Arc::new(StdinWriter::new(stdin));
        stdin
            .write(&protocol::initialize_request(&Uuid::new_v4().to_string()))
            .await?;
        stdin.write(&protocol::user_message(&request.prompt)).await?;
        info!(pid = ?child.id(), "Claude process started");

        // Capacity 1 keeps the process at most one message ahead of the consumer.
        let (tx, rx) = mpsc::channel(1);
        let kill = CancellationToken::new();
        let reader = Reader {
            stdin: Arc::clone(&stdin),
            gate: request.can_use_tool,
            pending: Arc::new(Mutex::new(HashMap::new())),
            tx,
        };
        tokio::spawn(reader.run(child, stdout, spawn_stderr_tail(stderr), kill.clone()));

        let messages = futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        })
        .boxed();

        Ok(Query {
            messages,
            control: Arc::new(ClaudeControl { stdin, kill }),
        })
    }
}

/// Serialized, closable access to the child's stdin.
struct StdinWriter {
    inner: tokio::sync::Mutex<Option<ChildStdin>>,
}

impl StdinWriter {
    fn new(stdin: ChildStdin) -> Self {
        Self {
            inner: tokio::sync::Mutex::new(Some(stdin)),
        }
    }

    async fn write(&self, value: &Value) -> Result<(), AgentError> {
        let mut line = serde_json::to_vec(value)?;
        line.push(b'\n');

        let mut guard = self.inner.lock().await;
        let stdin = guard
            .as_mut()
            .ok_or_else(|| AgentError::Protocol("stdin already closed".to_string()))?;
        stdin.write_all(&line).await?;
        stdin.flush().await?;
        Ok(())
    }

    async fn is_open(&self) -> bool {
        self.inner.lock().await.is_some()
    }

    async fn close(&self) {
        if let Some(mut stdin) = self.inner.lock().await.take()
            && let Err(e) = stdin.shutdown().await
        {
            debug!(error = %e, "Closing claude stdin failed");
        }
    }
}

type PendingTokens = Arc<Mutex<HashMap<String, CancellationToken>>>;

struct Reader {
    stdin: Arc<StdinWriter>,
    gate: Option<Arc<dyn CanUseTool>>,
    pending: PendingTokens,
    tx: mpsc::Sender<Result<AgentMessage, AgentError>>,
}

impl Reader {
    async fn run(
        self,
        mut child: Child,
        stdout: ChildStdout,
        stderr_tail: tokio::task::JoinHandle<VecDeque<String>>,
        kill: CancellationToken,
    ) {
        let mut lines = BufReader::new(stdout).lines();
        let mut killed = false;

        loop {
            let line = tokio::select! {
                line = lines.next_line() => line,
                () = kill.cancelled() => {
                    if let Err(e) = child.start_kill() {
                        warn!(error = %e, "Failed to kill claude process");
                    }
                    killed = true;
                    break;
                },
            };

            match line {
                Ok(Some(line)) => {
                    if !self.handle_line(&line).await {
                        // Consumer went away; dropping the child kills it.
                        self.cancel_pending();
                        return;
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    let _ = self.tx.send(Err(AgentError::Io(e))).await;
                    self.cancel_pending();
                    return;
                },
            }
        }

        self.cancel_pending();
        self.stdin.close().await;
        match child.wait().await {
            Ok(status) if status.success() || killed => {
                debug!(code = ?status.code(), "Claude process exited");
            },
            Ok(status) => {
                let tail = stderr_tail.await.unwrap_or_default();
                let stderr = tail.into_iter().collect::<Vec<_>>().join("\n");
                warn!(code = ?status.code(), "Claude process failed");
                let _ = self
                    .tx
                    .send(Err(AgentError::Exited {
                        code: status.code(),
                        stderr,
                    }))
                    .await;
            },
            Err(e) => {
                let _ = self.tx.send(Err(AgentError::Io(e))).await;
            },
        }
    }

    /// Returns `false` once the consumer has dropped the stream.
    async fn handle_line(&self, line: &str) -> bool {
        let inbound = match protocol::parse_line(line) {
            Ok(Some(inbound)) => inbound,
            Ok(None) => return true,
            Err(e) => {
                debug!(error = %e, line, "Skipping unparseable claude output");
                return true;
            },
        };

        match inbound {
            Inbound::ControlRequest {
                request_id,
                request,
            } => self.handle_control_request(request_id, request),
            Inbound::ControlCancel { request_id } => {
                let token = self
                    .pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&request_id);
                if let Some(token) = token {
                    debug!(request_id = %request_id, "Tool permission request withdrawn");
                    token.cancel();
                }
            },
            Inbound::ControlResponse(response) => {
                debug!(?response, "Control response from claude");
            },
            Inbound::Message(message) => {
                let is_result = message.is_result();
                if self.tx.send(Ok(message)).await.is_err() {
                    return false;
                }
                if is_result {
                    self.stdin.close().await;
                }
            },
        }
        true
    }

    fn handle_control_request(&self, request_id: String, request: ControlRequestBody) {
        if request.subtype != CAN_USE_TOOL {
            warn!(request_id = %request_id, subtype = %request.subtype, "Unsupported control request");
            let stdin = Arc::clone(&self.stdin);
            let reply = protocol::error_response(
                &request_id,
                &format!("Unsupported control request: {}", request.subtype),
            );
            tokio::spawn(async move {
                if let Err(e) = stdin.write(&reply).await {
                    debug!(error = %e, "Failed to reply to control request");
                }
            });
            return;
        }

        let token = CancellationToken::new();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(request_id.clone(), token.clone());

        let gate = self.gate.clone();
        let stdin = Arc::clone(&self.stdin);
        let pending = Arc::clone(&self.pending);
        let tool_name = request.tool_name.unwrap_or_default();
        let input = request.input.unwrap_or(Value::Null);
        let context = ToolUseContext::new(token);

        // Gates may wait on a human for minutes; never block the reader on them.
        tokio::spawn(async move {
            let result = match gate {
                Some(gate) => gate.can_use_tool(&tool_name, input, context).await,
                None => PermissionResult::allow(input),
            };
            pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&request_id);

            debug!(request_id = %request_id, tool = %tool_name, allowed = result.is_allowed(), "Answering tool permission request");
            if let Err(e) = stdin
                .write(&protocol::permission_response(&request_id, &result))
                .await
            {
                warn!(request_id = %request_id, error = %e, "Failed to deliver permission verdict");
            }
        });
    }

    fn cancel_pending(&self) {
        let tokens: Vec<_> = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, token)| token)
            .collect();
        for token in tokens {
            token.cancel();
        }
    }
}

fn spawn_stderr_tail(stderr: ChildStderr) -> tokio::task::JoinHandle<VecDeque<String>> {
    tokio::spawn(async move {
        let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if line.trim().is_empty() {
                continue;
            }
            debug!(target: "agentdeck_claude::stderr", "{line}");
            if tail.len() == STDERR_TAIL_LINES {
                tail.pop_front();
            }
            tail.push_back(line);
        }
        tail
    })
}

/// Interrupt handle for one process.
struct ClaudeControl {
    stdin: Arc<StdinWriter>,
    kill: CancellationToken,
}

#[async_trait]
impl QueryControl for ClaudeControl {
    async fn interrupt(&self) -> Result<(), AgentError> {
        if !self.stdin.is_open().await {
            debug!("Stdin closed, killing claude process");
            self.kill.cancel();
            return Ok(());
        }
        self.stdin
            .write(&protocol::interrupt_request(&Uuid::new_v4().to_string()))
            .await
            .map_err(|e| AgentError::Interrupt(e.to_string()))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use agentdeck_core::RuntimeOptions;
    use serde_json::json;
    use std::os::unix::fs::PermissionsExt;

    struct DenyAll;

    #[async_trait]
    impl CanUseTool for DenyAll {
        async fn can_use_tool(
            &self,
            _tool_name: &str,
            _input: Value,
            _context: ToolUseContext,
        ) -> PermissionResult {
            PermissionResult::deny("not today")
        }
    }

    fn fake_claude(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("claude");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn request(gate: Option<Arc<dyn CanUseTool>>) -> QueryRequest {
        QueryRequest {
            prompt: "hello".into(),
            options: RuntimeOptions::default(),
            can_use_tool: gate,
        }
    }

    #[tokio::test]
    async fn test_streams_messages_and_echoes_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_claude(
            dir.path(),
            r#"read -r init
read -r user
echo '{"type":"system","subtype":"init","session_id":"s1"}'
printf '{"type":"assistant","session_id":"s1","echo":%s}\n' "$user"
echo '{"type":"result","session_id":"s1"}'"#,
        );

        let query = ClaudeCliRuntime::new(exe).query(request(None)).await.unwrap();
        let messages: Vec<_> = query.messages.collect().await;

        assert_eq!(messages.len(), 3);
        let echo = messages[1].as_ref().unwrap();
        assert_eq!(echo.get("echo").unwrap()["message"]["content"], "hello");
        assert!(messages[2].as_ref().unwrap().is_result());
    }

    #[tokio::test]
    async fn test_permission_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_claude(
            dir.path(),
            r#"read -r init
read -r user
echo '{"type":"control_request","request_id":"c1","request":{"subtype":"can_use_tool","tool_name":"Bash","input":{"command":"ls"}}}'
read -r reply
printf '{"type":"assistant","session_id":"s1","reply":%s}\n' "$reply"
echo '{"type":"result","session_id":"s1"}'"#,
        );

        let query = ClaudeCliRuntime::new(exe)
            .query(request(Some(Arc::new(DenyAll))))
            .await
            .unwrap();
        let messages: Vec<_> = query.messages.collect().await;

        let reply = messages[0].as_ref().unwrap().get("reply").unwrap().clone();
        assert_eq!(reply["type"], "control_response");
        assert_eq!(reply["response"]["request_id"], "c1");
        assert_eq!(
            reply["response"]["response"],
            json!({"behavior": "deny", "message": "not today"})
        );
    }

    #[tokio::test]
    async fn test_interrupt_writes_control_request() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_claude(
            dir.path(),
            r#"read -r init
read -r user
echo '{"type":"system","subtype":"init","session_id":"s1"}'
read -r interrupt
printf '{"type":"result","session_id":"s1","interrupt":%s}\n' "$interrupt""#,
        );

        let mut query = ClaudeCliRuntime::new(exe).query(request(None)).await.unwrap();
        let first = query.messages.next().await.unwrap().unwrap();
        assert_eq!(first.session_id(), Some("s1"));

        query.control.interrupt().await.unwrap();
        let result = query.messages.next().await.unwrap().unwrap();
        assert_eq!(result.get("interrupt").unwrap()["request"]["subtype"], "interrupt");
        assert!(query.messages.next().await.is_none());
    }

    #[tokio::test]
    async fn test_failure_reports_stderr_tail() {
        let dir = tempfile::tempdir().unwrap();
        let exe = fake_claude(
            dir.path(),
            "read -r init\nread -r user\necho 'model overloaded' >&2\nexit 3",
        );

        let query = ClaudeCliRuntime::new(exe).query(request(None)).await.unwrap();
        let messages: Vec<_> = query.messages.collect().await;

        assert_eq!(messages.len(), 1);
        match &messages[0] {
            Err(AgentError::Exited { code, stderr }) => {
                assert_eq!(*code, Some(3));
                assert!(stderr.contains("model overloaded"));
            },
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let result = ClaudeCliRuntime::new("/nonexistent/agentdeck/claude")
            .query(request(None))
            .await;
        assert!(matches!(result, Err(AgentError::Spawn(_))));
    }
}
