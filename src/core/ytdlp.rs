use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;

use reelgrab_core::fs_paths::{AppPaths, DesktopPaths};
use reelgrab_core::models::media::RetrievalOutcome;
use reelgrab_core::models::settings::AppSettings;

use crate::core::error::FetchError;
use crate::core::process;
use crate::core::retriever::Retriever;

fn bin_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "yt-dlp.exe"
    } else {
        "yt-dlp"
    }
}

fn managed_ytdlp_path() -> Option<PathBuf> {
    DesktopPaths.bin_dir().map(|d| d.join(bin_name()))
}

async fn responds_to_version(candidate: &Path) -> bool {
    process::command(candidate)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Looks for a working yt-dlp: the configured binary, then PATH, then the
/// managed bin dir.
pub async fn find_ytdlp(configured: Option<&Path>) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(path) = configured {
        candidates.push(path.to_path_buf());
    }
    candidates.push(PathBuf::from(bin_name()));
    if let Some(managed) = managed_ytdlp_path() {
        candidates.push(managed);
    }

    for candidate in candidates {
        if responds_to_version(&candidate).await {
            return Some(candidate);
        }
    }
    None
}

/// Retrieval through the yt-dlp command line, for platforms no resolver covers.
pub struct YtdlpRetriever {
    binary: PathBuf,
    format: String,
    max_filesize: String,
    extra_flags: Vec<String>,
    timeout: Duration,
    min_bytes: u64,
    max_bytes: u64,
}

impl YtdlpRetriever {
    pub fn new(binary: PathBuf, settings: &AppSettings) -> Self {
        Self {
            binary,
            format: settings.ytdlp.format.clone(),
            max_filesize: settings.ytdlp.max_filesize.clone(),
            extra_flags: settings.ytdlp.extra_flags.clone(),
            timeout: Duration::from_secs(settings.ytdlp.timeout_secs),
            min_bytes: settings.download.min_file_bytes,
            max_bytes: settings.download.max_file_bytes,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[cfg(test)]
    pub(crate) fn binary(&self) -> &Path {
        &self.binary
    }

    fn build_args(&self, url: &str, output: &Path) -> Vec<String> {
        let mut args = self.extra_flags.clone();
        args.extend([
            "-f".to_string(),
            self.format.clone(),
            "--max-filesize".to_string(),
            self.max_filesize.clone(),
            "--no-playlist".to_string(),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
            "-o".to_string(),
            output_template(output),
            url.to_string(),
        ]);
        args
    }

    async fn run(&self, url: &str, output: &Path) -> Result<String, FetchError> {
        let mut child = process::command(&self.binary)
            .args(self.build_args(url, output))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| FetchError::ToolUnavailable(format!("{}: {}", self.binary.display(), e)))?;

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let collector = tokio::spawn(async move {
            let mut out = String::new();
            let mut err = String::new();
            let read_out = async {
                if let Some(pipe) = stdout.as_mut() {
                    let _ = pipe.read_to_string(&mut out).await;
                }
            };
            let read_err = async {
                if let Some(pipe) = stderr.as_mut() {
                    let _ = pipe.read_to_string(&mut err).await;
                }
            };
            tokio::join!(read_out, read_err);
            out.push_str(&err);
            out
        });

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(status) => status.map_err(|e| FetchError::io(&self.binary, e))?,
            Err(_) => {
                tracing::warn!(
                    "[ytdlp] no result after {}s, killing process",
                    self.timeout.as_secs()
                );
                let _ = child.kill().await;
                collector.abort();
                return Err(FetchError::Timeout(format!(
                    "yt-dlp ran longer than {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        let log = collector.await.unwrap_or_default();
        if !status.success() {
            let tail = log.lines().last().unwrap_or_default();
            return Err(FetchError::Network(format!("yt-dlp exited with {}: {}", status, tail)));
        }
        Ok(log)
    }
}

#[async_trait]
impl Retriever for YtdlpRetriever {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn retrieve(&self, media_url: &str, output: &Path) -> Result<RetrievalOutcome, FetchError> {
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::io(parent, e))?;
        }

        let result = self.run(media_url, output).await;
        let produced = find_produced_file(output).await;

        let log = match result {
            Ok(log) => log,
            Err(e) => {
                if let Some(path) = produced {
                    let _ = tokio::fs::remove_file(path).await;
                }
                remove_leftovers(output).await;
                return Err(e);
            }
        };

        let Some(path) = produced else {
            remove_leftovers(output).await;
            if log.contains("max-filesize") {
                return Err(FetchError::SizeExceeded {
                    bytes: 0,
                    limit: self.max_bytes,
                });
            }
            return Err(FetchError::NoMediaUrlFound {
                provider: "yt-dlp".to_string(),
            });
        };

        let size = tokio::fs::metadata(&path)
            .await
            .map_err(|e| FetchError::io(&path, e))?
            .len();

        if size < self.min_bytes || size > self.max_bytes {
            let _ = tokio::fs::remove_file(&path).await;
            if size > self.max_bytes {
                return Err(FetchError::SizeExceeded {
                    bytes: size,
                    limit: self.max_bytes,
                });
            }
            return Err(FetchError::ContentImplausible {
                content_type: None,
                bytes: Some(size),
            });
        }

        tracing::debug!("[ytdlp] {} bytes saved to {}", size, path.display());
        Ok(RetrievalOutcome {
            local_path: path,
            byte_size: size,
            content_type: Some("video/mp4".to_string()),
        })
    }
}

fn output_template(output: &Path) -> String {
    format!("{}.%(ext)s", output.with_extension("").to_string_lossy())
}

fn is_scratch_file(name: &str) -> bool {
    name.ends_with(".part") || name.ends_with(".ytdl") || name.starts_with('.')
}

/// yt-dlp picks the final extension itself, so the produced file is found by
/// its stem. The newest match wins.
async fn find_produced_file(output: &Path) -> Option<PathBuf> {
    let dir = output.parent()?;
    let stem = output.file_stem()?.to_str()?;
    let prefix = format!("{}.", stem);

    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut best: Option<(PathBuf, std::time::SystemTime)> = None;

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(&prefix) || is_scratch_file(name) {
            continue;
        }
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified().unwrap_or(std::time::UNIX_EPOCH);
        match &best {
            Some((_, best_time)) if modified <= *best_time => {}
            _ => best = Some((path, modified)),
        }
    }

    best.map(|(p, _)| p)
}

async fn remove_leftovers(output: &Path) {
    let (Some(dir), Some(stem)) = (output.parent(), output.file_stem().and_then(|s| s.to_str()))
    else {
        return;
    };
    let prefix = format!("{}.", stem);
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        if name.to_str().is_some_and(|n| n.starts_with(&prefix)) {
            let _ = tokio::fs::remove_file(entry.path()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retriever_with(binary: &str, flags: Vec<String>) -> YtdlpRetriever {
        let mut settings = AppSettings::default();
        settings.ytdlp.extra_flags = flags;
        YtdlpRetriever::new(PathBuf::from(binary), &settings)
    }

    #[test]
    fn args_carry_format_ceiling_and_template() {
        let r = retriever_with("yt-dlp", Vec::new());
        let args = r.build_args(
            "https://youtube.com/shorts/abcdefghijk",
            Path::new("/tmp/ws/42/youtube_42_x.mp4"),
        );
        assert_eq!(args[0], "-f");
        assert_eq!(args[1], "best[ext=mp4][filesize<50M]/best[filesize<50M]/best");
        assert!(args.windows(2).any(|w| w[0] == "--max-filesize" && w[1] == "50M"));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args
            .windows(2)
            .any(|w| w[0] == "-o" && w[1] == "/tmp/ws/42/youtube_42_x.%(ext)s"));
        assert_eq!(args.last().unwrap(), "https://youtube.com/shorts/abcdefghijk");
    }

    #[test]
    fn extra_flags_come_first() {
        let r = retriever_with("yt-dlp", vec!["--cookies".into(), "c.txt".into()]);
        let args = r.build_args("u", Path::new("a.mp4"));
        assert_eq!(&args[..2], &["--cookies".to_string(), "c.txt".to_string()]);
    }

    #[test]
    fn scratch_files_are_ignored() {
        assert!(is_scratch_file("a.mp4.part"));
        assert!(is_scratch_file("a.f137.mp4.ytdl"));
        assert!(is_scratch_file(".hidden"));
        assert!(!is_scratch_file("a.mp4"));
    }

    #[tokio::test]
    async fn produced_file_is_found_by_stem() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("youtube_1_abc.mp4");
        std::fs::write(dir.path().join("youtube_1_abc.webm"), b"data").unwrap();
        std::fs::write(dir.path().join("youtube_1_abc.webm.part"), b"data").unwrap();
        std::fs::write(dir.path().join("youtube_1_other.mp4"), b"data").unwrap();

        let found = find_produced_file(&output).await.unwrap();
        assert_eq!(found, dir.path().join("youtube_1_abc.webm"));
    }

    #[tokio::test]
    async fn missing_binary_is_tool_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let r = retriever_with("/nonexistent/yt-dlp-binary", Vec::new());
        let err = r
            .retrieve("https://youtube.com/shorts/abcdefghijk", &dir.path().join("a.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::ToolUnavailable(_)));
    }

    #[cfg(unix)]
    fn fake_tool(dir: &Path, body: &str) -> Vec<String> {
        let script = dir.join("fake-ytdlp.sh");
        let text = format!(
            "out=''\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"-o\" ]; then out=\"$2\"; fi\n  shift\ndone\nout=$(printf '%s' \"$out\" | sed 's/%(ext)s/mp4/')\n{}\n",
            body
        );
        std::fs::write(&script, text).unwrap();
        vec![script.to_string_lossy().to_string()]
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_tool_and_reports_file() {
        let dir = tempfile::tempdir().unwrap();
        let flags = fake_tool(dir.path(), "head -c 4096 /dev/zero > \"$out\"");
        let r = retriever_with("sh", flags);
        let output = dir.path().join("ws").join("youtube_7_x.mp4");

        let outcome = r
            .retrieve("https://youtube.com/shorts/abcdefghijk", &output)
            .await
            .unwrap();
        assert_eq!(outcome.local_path, output);
        assert_eq!(outcome.byte_size, 4096);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tiny_output_is_rejected_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let flags = fake_tool(dir.path(), "printf 'x' > \"$out\"");
        let r = retriever_with("sh", flags);
        let output = dir.path().join("youtube_7_y.mp4");

        let err = r.retrieve("u", &output).await.unwrap_err();
        assert!(matches!(err, FetchError::ContentImplausible { .. }));
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn slow_tool_is_killed() {
        let dir = tempfile::tempdir().unwrap();
        let flags = fake_tool(dir.path(), "sleep 30");
        let r = retriever_with("sh", flags).with_timeout(Duration::from_millis(300));
        let started = std::time::Instant::now();

        let err = r
            .retrieve("u", &dir.path().join("youtube_7_z.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
