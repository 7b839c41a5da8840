// src/media.rs

//! Location image capture.
//!
//! One image per listing, downloaded next to the database so the
//! stored `path` column stays meaningful across restarts.

use std::path::{Path, PathBuf};

use reqwest::Client;

use crate::error::Result;
use crate::normalize::encoded_title;

/// Length bound for the encoded-title part of the file name; encoding
/// triples non-ASCII bytes, and file names cap out at 255 bytes.
const MAX_NAME_LEN: usize = 150;

/// Local capture path for a listing's location image.
///
/// The file name reuses the encoded title, bounded the same way the
/// identity key is; path separators the encoding keeps are not valid
/// in file names and get replaced.
pub fn capture_path(image_dir: &str, title: &str) -> PathBuf {
    let mut name = encoded_title(title).replace(['/', '\\'], "_");
    // Encoded output is ASCII, so byte truncation is char-safe.
    name.truncate(MAX_NAME_LEN);
    Path::new(image_dir).join(format!("location-{name}.png"))
}

/// Download an image to a local file.
///
/// The parent directory is created on demand; a file left behind by a
/// failed write is removed.
pub async fn download(client: &Client, url: &str, dest: &Path) -> Result<()> {
    let bytes = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    if let Err(e) = tokio::fs::write(dest, &bytes).await {
        let _ = tokio::fs::remove_file(dest).await;
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_path_is_deterministic() {
        let a = capture_path("images", "Schöne Wohnung");
        let b = capture_path("images", "Schöne Wohnung");
        assert_eq!(a, b);
        assert_eq!(a, Path::new("images/location-Sch%C3%B6ne%20Wohnung.png"));
    }

    #[test]
    fn test_capture_path_bounds_long_titles() {
        // 200 umlauts encode to 1200 bytes; the name must stay under
        // the 255-byte file-name limit.
        let long_title = "ü".repeat(200);
        let path = capture_path("images", &long_title);
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.len() <= 255);
        assert_eq!(path, capture_path("images", &long_title));
    }

    #[test]
    fn test_capture_path_sanitizes_separators() {
        let path = capture_path("images", "2 Zi/Küche/Bad");
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "location-2%20Zi_K%C3%BCche_Bad.png"
        );
    }
}
