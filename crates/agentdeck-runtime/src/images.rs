//! Request-scoped staging of inline image attachments.
//!
//! Images arrive as base64 data URIs. The runtime only reads files, so each
//! image is written under `<cwd>/.tmp/images/<unix-millis>/` and the prompt is
//! extended with the list of paths. Staging never fails the request: problems
//! are logged and the original prompt is used.

use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::{debug, warn};

use crate::request::ImageAttachment;

const DEFAULT_EXTENSION: &str = "png";

/// Result of staging a request's images.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedImages {
    /// The prompt to send, possibly extended with the path list.
    pub prompt: String,
    /// Files written, in input order.
    pub paths: Vec<PathBuf>,
    /// Directory holding the files.
    pub dir: Option<PathBuf>,
}

/// Write `images` to disk and rewrite `prompt` to reference them.
///
/// Entries that are not valid base64 data URIs are skipped. On an I/O failure
/// the original prompt is returned along with whatever was already written, so
/// the caller can still clean up.
pub async fn stage(prompt: &str, images: &[ImageAttachment], cwd: &Path) -> StagedImages {
    if images.is_empty() {
        return StagedImages {
            prompt: prompt.to_string(),
            ..StagedImages::default()
        };
    }

    let dir = cwd
        .join(".tmp")
        .join("images")
        .join(chrono::Utc::now().timestamp_millis().to_string());
    let mut staged = StagedImages {
        prompt: prompt.to_string(),
        paths: Vec::new(),
        dir: Some(dir.clone()),
    };

    if let Err(e) = write_all(images, &dir, &mut staged.paths).await {
        warn!(error = %e, dir = %dir.display(), "Failed to stage images, sending prompt without them");
        return staged;
    }

    if !staged.paths.is_empty() && !prompt.trim().is_empty() {
        staged.prompt = with_path_note(prompt, &staged.paths);
    }
    debug!(count = staged.paths.len(), dir = %dir.display(), "Staged images");
    staged
}

async fn write_all(
    images: &[ImageAttachment],
    dir: &Path,
    paths: &mut Vec<PathBuf>,
) -> io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;

    for (index, image) in images.iter().enumerate() {
        let Some((mime, payload)) = parse_data_uri(&image.data) else {
            warn!(index, name = ?image.name, "Skipping image with malformed data URI");
            continue;
        };
        let bytes = match STANDARD.decode(payload) {
            Ok(b) => b,
            Err(e) => {
                warn!(index, name = ?image.name, error = %e, "Skipping image with invalid base64");
                continue;
            },
        };

        let path = dir.join(format!("image_{index}.{}", extension_for(mime)));
        tokio::fs::write(&path, bytes).await?;
        paths.push(path);
    }
    Ok(())
}

/// Split `data:<mime>;base64,<payload>` into mime and payload.
fn parse_data_uri(uri: &str) -> Option<(&str, &str)> {
    let (mime, payload) = uri.strip_prefix("data:")?.split_once(";base64,")?;
    if mime.is_empty() || mime.contains(';') || payload.is_empty() {
        return None;
    }
    Some((mime, payload))
}

/// File extension from the mime subtype, `png` when there is none usable.
fn extension_for(mime: &str) -> &str {
    mime.split_once('/')
        .map(|(_, subtype)| subtype)
        .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or(DEFAULT_EXTENSION)
}

fn with_path_note(prompt: &str, paths: &[PathBuf]) -> String {
    let mut out = format!("{prompt}\n\n[Images provided at the following paths:]");
    for (i, path) in paths.iter().enumerate() {
        let _ = write!(out, "\n{}. {}", i.saturating_add(1), path.display());
    }
    out
}

/// Delete staged files, then their directory.
///
/// Each step is independent; failures are logged and never returned.
pub async fn cleanup(paths: &[PathBuf], dir: Option<&Path>) {
    for path in paths {
        log_file_removal(path, tokio::fs::remove_file(path).await);
    }
    if let Some(dir) = dir {
        log_dir_removal(dir, tokio::fs::remove_dir_all(dir).await);
    }
}

/// Blocking variant of [`cleanup`], for contexts that cannot await such as
/// `Drop`.
pub fn cleanup_blocking(paths: &[PathBuf], dir: Option<&Path>) {
    for path in paths {
        log_file_removal(path, std::fs::remove_file(path));
    }
    if let Some(dir) = dir {
        log_dir_removal(dir, std::fs::remove_dir_all(dir));
    }
}

fn log_file_removal(path: &Path, result: io::Result<()>) {
    match result {
        Ok(()) => {},
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "Staged image already removed");
        },
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove staged image"),
    }
}

fn log_dir_removal(dir: &Path, result: io::Result<()>) {
    match result {
        Ok(()) => debug!(dir = %dir.display(), "Removed image staging directory"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {},
        Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to remove image staging directory"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    fn png() -> ImageAttachment {
        ImageAttachment::new(format!("data:image/png;base64,{PIXEL}"))
    }

    #[tokio::test]
    async fn test_no_images_is_passthrough() {
        let dir = tempfile::tempdir().unwrap();
        let staged = stage("hello", &[], dir.path()).await;
        assert_eq!(staged.prompt, "hello");
        assert!(staged.paths.is_empty());
        assert!(staged.dir.is_none());
        assert!(!dir.path().join(".tmp").exists());
    }

    #[tokio::test]
    async fn test_stage_and_cleanup() {
        let cwd = tempfile::tempdir().unwrap();
        let staged = stage("describe", &[png(), png()], cwd.path()).await;

        assert_eq!(staged.paths.len(), 2);
        assert!(staged.paths[0].ends_with("image_0.png"));
        assert!(staged.paths[1].ends_with("image_1.png"));
        for path in &staged.paths {
            assert!(path.exists());
        }
        let dir = staged.dir.clone().unwrap();
        assert!(dir.starts_with(cwd.path().join(".tmp").join("images")));

        let expected = format!(
            "describe\n\n[Images provided at the following paths:]\n1. {}\n2. {}",
            staged.paths[0].display(),
            staged.paths[1].display()
        );
        assert_eq!(staged.prompt, expected);

        cleanup(&staged.paths, staged.dir.as_deref()).await;
        for path in &staged.paths {
            assert!(!path.exists());
        }
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn test_malformed_entries_skipped() {
        let cwd = tempfile::tempdir().unwrap();
        let images = [
            ImageAttachment::new("not a data uri"),
            ImageAttachment::new("data:image/png;base64,!!!notbase64!!!"),
            png(),
        ];
        let staged = stage("look", &images, cwd.path()).await;

        assert_eq!(staged.paths.len(), 1);
        assert!(staged.paths[0].ends_with("image_2.png"));
        assert!(staged.prompt.contains("1. "));
        assert!(!staged.prompt.contains("2. "));

        cleanup(&staged.paths, staged.dir.as_deref()).await;
    }

    #[tokio::test]
    async fn test_all_malformed_keeps_prompt() {
        let cwd = tempfile::tempdir().unwrap();
        let staged = stage("look", &[ImageAttachment::new("garbage")], cwd.path()).await;
        assert_eq!(staged.prompt, "look");
        assert!(staged.paths.is_empty());
        cleanup(&staged.paths, staged.dir.as_deref()).await;
        assert!(!staged.dir.unwrap().exists());
    }

    #[tokio::test]
    async fn test_blank_prompt_not_annotated() {
        let cwd = tempfile::tempdir().unwrap();
        let staged = stage("   ", &[png()], cwd.path()).await;
        assert_eq!(staged.prompt, "   ");
        assert_eq!(staged.paths.len(), 1);
        cleanup(&staged.paths, staged.dir.as_deref()).await;
    }

    #[tokio::test]
    async fn test_unwritable_dir_fails_soft() {
        let cwd = tempfile::tempdir().unwrap();
        // A file where the staging directory tree needs to go.
        std::fs::write(cwd.path().join(".tmp"), b"blocker").unwrap();

        let staged = stage("prompt", &[png()], cwd.path()).await;
        assert_eq!(staged.prompt, "prompt");
        assert!(staged.paths.is_empty());
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/jpeg"), "jpeg");
        assert_eq!(extension_for("image/webp"), "webp");
        assert_eq!(extension_for("image/svg+xml"), "png");
        assert_eq!(extension_for("image"), "png");
        assert_eq!(extension_for("image/"), "png");
    }

    #[test]
    fn test_parse_data_uri() {
        assert_eq!(
            parse_data_uri("data:image/gif;base64,R0lG"),
            Some(("image/gif", "R0lG"))
        );
        assert_eq!(parse_data_uri("data:;base64,AA"), None);
        assert_eq!(parse_data_uri("data:image/png;base64,"), None);
        assert_eq!(parse_data_uri("image/png;base64,AA"), None);
    }

    #[tokio::test]
    async fn test_cleanup_blocking_removes_everything() {
        let dir = tempfile::tempdir().unwrap();
        let staged = stage("look", &[png()], dir.path()).await;
        assert_eq!(staged.paths.len(), 1);

        cleanup_blocking(&staged.paths, staged.dir.as_deref());
        assert!(!staged.paths[0].exists());
        assert!(!staged.dir.unwrap().exists());
    }

    #[tokio::test]
    async fn test_cleanup_noop() {
        cleanup(&[], None).await;
        cleanup(&[PathBuf::from("/nonexistent/agentdeck/image_0.png")], None).await;
    }
}
