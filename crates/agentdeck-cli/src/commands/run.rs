//! `agentdeck run`: one prompt, events on stdout, answers on stdin.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use agentdeck_approval::Decision;
use agentdeck_claude::ClaudeCliRuntime;
use agentdeck_config::Config;
use agentdeck_core::{ArcChannel, PermissionMode, PermissionResponse};
use agentdeck_runtime::config_bridge::to_orchestrator_config;
use agentdeck_runtime::{
    ImageAttachment, InvocationRequest, RuntimeResult, SessionOrchestrator, ToolsSettings,
};
use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use crate::channel::JsonLinesChannel;

/// How long an interrupted run gets to wind down after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Parsed `run` arguments.
pub(crate) struct RunArgs {
    pub(crate) cwd: Option<PathBuf>,
    pub(crate) resume: Option<String>,
    pub(crate) model: Option<String>,
    pub(crate) permission_mode: Option<PermissionMode>,
    pub(crate) allow: Vec<String>,
    pub(crate) deny: Vec<String>,
    pub(crate) skip_permissions: bool,
    pub(crate) images: Vec<PathBuf>,
    pub(crate) prompt: String,
}

/// Run one prompt to completion.
pub(crate) async fn run_session(config: &Config, args: RunArgs) -> Result<()> {
    let cwd = match args.cwd {
        Some(cwd) => cwd,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    let mut request = InvocationRequest::new(&cwd).tools(ToolsSettings {
        allowed_tools: args.allow,
        disallowed_tools: args.deny,
        skip_permissions: args.skip_permissions,
    });
    request.model = args.model;
    if let Some(session_id) = args.resume {
        request = request.resume(session_id);
    }
    if let Some(mode) = args.permission_mode {
        request = request.permission_mode(mode);
    }
    for path in &args.images {
        request = request.image(read_image(path).await?);
    }

    let runtime = Arc::new(ClaudeCliRuntime::new(&config.runtime.executable));
    let orchestrator = Arc::new(SessionOrchestrator::new(
        runtime,
        to_orchestrator_config(config),
    ));
    let events = Arc::new(JsonLinesChannel::new(tokio::io::stdout()));
    let channel: ArcChannel = Arc::clone(&events) as ArcChannel;

    let answers = tokio::spawn(answer_from_stdin(Arc::clone(&orchestrator)));

    let mut run = Box::pin(orchestrator.run(&args.prompt, request, channel));
    let interrupted = tokio::select! {
        result = &mut run => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };
    let result = match interrupted {
        Some(result) => result.map_err(Into::into),
        None => stop(&orchestrator, run, &events).await,
    };

    answers.abort();
    let dropped = orchestrator.approvals().cancel_all();
    if dropped > 0 {
        debug!(dropped, "Dropped unanswered permission requests");
    }

    result
}

/// Ctrl-C: abort what is registered and let the run wind down. A run that
/// has no session yet, or does not stop within the grace period, is dropped;
/// dropping it releases its resources and reports `claude-error`.
async fn stop<F, W>(
    orchestrator: &SessionOrchestrator,
    mut run: Pin<Box<F>>,
    events: &JsonLinesChannel<W>,
) -> Result<()>
where
    F: Future<Output = RuntimeResult<()>>,
{
    info!("Interrupted, aborting active sessions");
    let mut aborted = false;
    for session_id in orchestrator.active_session_ids().await {
        if orchestrator.abort(&session_id).await {
            aborted = true;
        } else {
            warn!(session_id, "Failed to abort session");
        }
    }

    if aborted && let Ok(result) = tokio::time::timeout(SHUTDOWN_GRACE, &mut run).await {
        return result.map_err(Into::into);
    }

    warn!("Session did not stop, dropping it");
    drop(run);
    if tokio::time::timeout(SHUTDOWN_GRACE, events.terminated()).await.is_err() {
        warn!("Client was not told the session ended");
    }
    bail!("Session interrupted before it finished")
}

/// Feed `PermissionResponse` lines from stdin into the approval registry.
async fn answer_from_stdin(orchestrator: Arc<SessionOrchestrator>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read stdin");
                break;
            },
        };
        if line.trim().is_empty() {
            continue;
        }

        let response: PermissionResponse = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Ignoring malformed permission response");
                continue;
            },
        };
        let request_id = response.request_id.clone();
        if !orchestrator.resolve_tool_approval(&request_id, Decision::from(response)) {
            warn!(request_id, "No pending permission request with this id");
        }
    }
}

/// Read an image file into a data URI attachment.
async fn read_image(path: &Path) -> Result<ImageAttachment> {
    let Some(mime) = mime_for(path) else {
        bail!("Unsupported image type: {}", path.display());
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {}", path.display()))?;

    let mut image = ImageAttachment::new(format!("data:{mime};base64,{}", STANDARD.encode(bytes)));
    image.name = path.file_name().map(|n| n.to_string_lossy().into_owned());
    Ok(image)
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_from_extension() {
        assert_eq!(mime_for(Path::new("a.PNG")), Some("image/png"));
        assert_eq!(mime_for(Path::new("dir/b.jpeg")), Some("image/jpeg"));
        assert_eq!(mime_for(Path::new("c.webp")), Some("image/webp"));
        assert_eq!(mime_for(Path::new("notes.txt")), None);
        assert_eq!(mime_for(Path::new("no_extension")), None);
    }

    #[tokio::test]
    async fn test_read_image_builds_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shot.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let image = read_image(&path).await.unwrap();
        assert_eq!(image.data, "data:image/png;base64,AQID");
        assert_eq!(image.name.as_deref(), Some("shot.png"));
    }

    #[tokio::test]
    async fn test_read_image_rejects_unknown_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "hi").unwrap();
        assert!(read_image(&path).await.is_err());
    }
}
