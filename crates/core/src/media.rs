use std::{
    fmt,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::{fs, process::Command};
use tracing::{debug, info};
use url::{ParseError, Url};

use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    TikTok,
    Instagram,
    XTwitter,
}

impl Platform {
    fn domains(&self) -> &'static [&'static str] {
        match self {
            Platform::TikTok => &["tiktok.com"],
            Platform::Instagram => &["instagram.com"],
            Platform::XTwitter => &["twitter.com", "x.com"],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::TikTok => "TikTok",
            Platform::Instagram => "Instagram",
            Platform::XTwitter => "X/Twitter",
        };
        f.write_str(name)
    }
}

/// Identify the source platform from the URL host. Makes no network call.
pub fn detect_platform(url: &str) -> Result<Platform> {
    let unsupported = || Error::UnsupportedSource {
        url: url.to_string(),
    };

    let trimmed = url.trim();
    let parsed = match Url::parse(trimmed) {
        Err(ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{trimmed}")),
        other => other,
    }
    .map_err(|_| unsupported())?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(unsupported());
    }
    let host = parsed.host_str().ok_or_else(unsupported)?.to_ascii_lowercase();

    [Platform::TikTok, Platform::Instagram, Platform::XTwitter]
        .into_iter()
        .find(|platform| {
            platform
                .domains()
                .iter()
                .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
        })
        .ok_or_else(unsupported)
}

#[async_trait]
pub trait Downloader: Send + Sync {
    /// Fetch a single media item to `dest`, returning the written path.
    async fn download(&self, url: &str, dest: &Path) -> Result<PathBuf>;
}

#[async_trait]
pub trait AudioExtractor: Send + Sync {
    async fn extract(&self, video_path: &Path, audio_path: &Path) -> Result<()>;
}

/// Validate the platform, then download. Unsupported URLs never reach the downloader.
pub async fn acquire(downloader: &dyn Downloader, url: &str, dest: &Path) -> Result<PathBuf> {
    let platform = detect_platform(url)?;
    info!(%platform, url, "downloading video");
    downloader.download(url, dest).await
}

/// Downloads through the `yt-dlp` binary.
#[derive(Clone, Debug)]
pub struct YtDlp {
    pub binary: PathBuf,
}

impl Default for YtDlp {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("yt-dlp"),
        }
    }
}

#[async_trait]
impl Downloader for YtDlp {
    async fn download(&self, url: &str, dest: &Path) -> Result<PathBuf> {
        let failed = |reason: String| Error::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        let output = Command::new(&self.binary)
            .arg(url)
            .arg("--no-playlist")
            .arg("-f")
            .arg("mp4/best")
            .arg("-o")
            .arg(dest)
            .arg("--print")
            .arg("after_move:filepath")
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| failed(format!("could not run {}: {e}", self.binary.display())))?;

        if !output.status.success() {
            return Err(failed(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }

        let stdout_str = String::from_utf8_lossy(&output.stdout);
        let path = stdout_str
            .lines()
            .map(str::trim)
            .rfind(|line| !line.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| dest.to_path_buf());

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(failed(format!("no file written at {}", path.display())));
        }

        debug!(path = %path.display(), "video downloaded");
        Ok(path)
    }
}

/// Extracts audio through the `ffmpeg` binary.
#[derive(Clone, Debug)]
pub struct Ffmpeg {
    pub binary: PathBuf,
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
        }
    }
}

#[async_trait]
impl AudioExtractor for Ffmpeg {
    async fn extract(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        let failed = |reason: String| Error::AudioExtractionFailed {
            video_path: video_path.to_path_buf(),
            reason,
        };

        if !fs::try_exists(video_path).await.unwrap_or(false) {
            return Err(failed("video file does not exist".to_string()));
        }

        // kill_on_drop: the child never outlives this call, whichever way it ends
        let output = Command::new(&self.binary)
            .arg("-y")
            .arg("-i")
            .arg(video_path)
            .arg("-vn")
            .arg("-acodec")
            .arg("libmp3lame")
            .arg(audio_path)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| failed(format!("could not run {}: {e}", self.binary.display())))?;

        if !output.status.success() {
            return Err(failed(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }

        let written = fs::metadata(audio_path).await.map(|m| m.len()).unwrap_or(0);
        if written == 0 {
            return Err(failed("no audio stream in video".to_string()));
        }

        debug!(path = %audio_path.display(), bytes = written, "audio extracted");
        Ok(())
    }
}
