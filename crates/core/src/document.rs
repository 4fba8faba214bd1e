use std::path::{Path, PathBuf};

use chardetng::EncodingDetector;
use tokio::{fs, process::Command};
use tracing::debug;

use crate::error::{Error, Result};

/// Pulls plain text out of uploaded documents.
#[derive(Clone, Debug)]
pub struct DocumentReader {
    pub pdftotext: PathBuf,
}

impl Default for DocumentReader {
    fn default() -> Self {
        Self {
            pdftotext: PathBuf::from("pdftotext"),
        }
    }
}

impl DocumentReader {
    pub async fn read_text(&self, path: &Path) -> Result<String> {
        let unreadable = |reason: String| Error::DocumentUnreadable {
            path: path.to_path_buf(),
            reason,
        };

        if !fs::try_exists(path).await.unwrap_or(false) {
            return Err(unreadable("file does not exist".to_string()));
        }

        if is_pdf(path) {
            let output = Command::new(&self.pdftotext)
                .arg("-enc")
                .arg("UTF-8")
                .arg(path)
                .arg("-")
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|e| unreadable(format!("could not run {}: {e}", self.pdftotext.display())))?;

            if !output.status.success() {
                return Err(unreadable(String::from_utf8_lossy(&output.stderr).trim().to_string()));
            }
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }

        let bytes = fs::read(path).await?;
        Ok(decode_text(&bytes))
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Decode bytes of unknown encoding. A BOM wins; otherwise the encoding is guessed.
pub fn decode_text(bytes: &[u8]) -> String {
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guessed = detector.guess(None, true);
    let (text, used, had_errors) = guessed.decode(bytes);
    debug!(encoding = used.name(), had_errors, "decoded document");
    text.into_owned()
}
