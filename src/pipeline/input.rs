//! Input resolution: load a user-supplied path or URL into memory and
//! decide what kind of file it is.
//!
//! Every check here runs before any model call: a missing file, a file over
//! the size limit, or content that is neither a PDF nor a JPEG/PNG/WebP
//! image is rejected immediately. The type is sniffed from magic bytes, not
//! from the file extension, so a mislabelled upload is still caught.

use crate::error::SheetError;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Accepted input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Jpeg,
    Png,
    Webp,
}

impl FileKind {
    pub fn mime(self) -> &'static str {
        match self {
            FileKind::Pdf => "application/pdf",
            FileKind::Jpeg => "image/jpeg",
            FileKind::Png => "image/png",
            FileKind::Webp => "image/webp",
        }
    }

    pub fn is_image(self) -> bool {
        !matches!(self, FileKind::Pdf)
    }
}

/// Identify a file from its first bytes.
pub fn sniff(bytes: &[u8]) -> Option<FileKind> {
    if bytes.starts_with(b"%PDF") {
        Some(FileKind::Pdf)
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(FileKind::Jpeg)
    } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(FileKind::Png)
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some(FileKind::Webp)
    } else {
        None
    }
}

/// A validated input file held in memory.
#[derive(Clone)]
pub struct InputFile {
    /// File name as given (last path or URL segment).
    pub name: String,
    pub kind: FileKind,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for InputFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputFile")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("size", &self.bytes.len())
            .finish()
    }
}

impl InputFile {
    /// Validate in-memory content (size limit, then type).
    pub fn from_bytes(
        name: impl Into<String>,
        bytes: Vec<u8>,
        max_bytes: u64,
    ) -> Result<Self, SheetError> {
        let name = name.into();
        check_size(&name, bytes.len() as u64, max_bytes)?;
        let kind = sniff(&bytes).ok_or_else(|| SheetError::UnsupportedFileType {
            name: name.clone(),
            detected: describe_magic(&bytes),
        })?;
        debug!("{}: {} ({} bytes)", name, kind.mime(), bytes.len());
        Ok(Self { name, kind, bytes })
    }

    /// File name without its extension, used for sheet titles.
    pub fn stem(&self) -> String {
        Path::new(&self.name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load a local path or HTTP/HTTPS URL and validate it.
pub async fn load_input(
    input: &str,
    max_bytes: u64,
    timeout_secs: u64,
) -> Result<InputFile, SheetError> {
    if is_url(input) {
        download_url(input, max_bytes, timeout_secs).await
    } else {
        load_local(input, max_bytes).await
    }
}

async fn load_local(path_str: &str, max_bytes: u64) -> Result<InputFile, SheetError> {
    let path = PathBuf::from(path_str);
    let name = file_name(&path);

    let metadata = match tokio::fs::metadata(&path).await {
        Ok(m) if m.is_file() => m,
        Ok(_) => {
            return Err(SheetError::InvalidInput {
                input: path_str.to_string(),
            })
        }
        Err(e) => return Err(io_to_input_error(e, path)),
    };

    // Reject oversized files before reading them.
    check_size(&name, metadata.len(), max_bytes)?;

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| io_to_input_error(e, path.clone()))?;

    debug!("Loaded local file: {}", path.display());
    InputFile::from_bytes(name, bytes, max_bytes)
}

fn io_to_input_error(e: std::io::Error, path: PathBuf) -> SheetError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => SheetError::PermissionDenied { path },
        _ => SheetError::FileNotFound { path },
    }
}

async fn download_url(url: &str, max_bytes: u64, timeout_secs: u64) -> Result<InputFile, SheetError> {
    info!("Downloading: {}", url);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| SheetError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let map_send_err = |e: reqwest::Error| {
        if e.is_timeout() {
            SheetError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            SheetError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    };

    let response = client.get(url).send().await.map_err(map_send_err)?;

    if !response.status().is_success() {
        return Err(SheetError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let name = extract_filename(url);
    if let Some(len) = response.content_length() {
        check_size(&name, len, max_bytes)?;
    }

    // Content-Length may be absent or wrong; enforce the limit while reading.
    let mut response = response;
    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(map_send_err)? {
        check_size(&name, (bytes.len() + chunk.len()) as u64, max_bytes)?;
        bytes.extend_from_slice(&chunk);
    }
    info!("Downloaded {} ({} bytes)", name, bytes.len());

    InputFile::from_bytes(name, bytes, max_bytes)
}

fn check_size(name: &str, size: u64, max_bytes: u64) -> Result<(), SheetError> {
    if size > max_bytes {
        return Err(SheetError::FileTooLarge {
            name: name.to_string(),
            size,
            limit_mb: (max_bytes / (1024 * 1024)).max(1),
        });
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Last non-empty URL path segment, or a generic name.
fn extract_filename(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() {
                    return last.to_string();
                }
            }
        }
    }
    "download".to_string()
}

fn describe_magic(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return "empty file".to_string();
    }
    let hex: Vec<String> = bytes.iter().take(4).map(|b| format!("{b:02X}")).collect();
    format!("starts with {}", hex.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/exam.pdf"));
        assert!(is_url("http://example.com/exam.png"));
        assert!(!is_url("/tmp/exam.pdf"));
        assert!(!is_url("exam.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn sniffs_supported_types() {
        assert_eq!(sniff(b"%PDF-1.7\n"), Some(FileKind::Pdf));
        assert_eq!(sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(FileKind::Jpeg));
        assert_eq!(sniff(&PNG_MAGIC), Some(FileKind::Png));
        assert_eq!(sniff(b"RIFF\x24\x00\x00\x00WEBPVP8 "), Some(FileKind::Webp));
        assert_eq!(sniff(b"GIF89a"), None);
        assert_eq!(sniff(b""), None);
    }

    #[test]
    fn oversize_rejected_before_type_check() {
        let err = InputFile::from_bytes("big.gif", vec![0u8; 2048], 1024).unwrap_err();
        assert!(matches!(err, SheetError::FileTooLarge { size: 2048, .. }));
        assert!(err.is_input_error());
    }

    #[test]
    fn unsupported_type_names_file() {
        let err = InputFile::from_bytes("notes.txt", b"hello".to_vec(), 1024).unwrap_err();
        match err {
            SheetError::UnsupportedFileType { name, detected } => {
                assert_eq!(name, "notes.txt");
                assert!(detected.contains("68 65 6C 6C"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn stem_strips_extension() {
        let f = InputFile::from_bytes("2024 문제지.pdf", b"%PDF-1.4".to_vec(), 1024).unwrap();
        assert_eq!(f.stem(), "2024 문제지");
        assert_eq!(f.kind, FileKind::Pdf);
    }

    #[test]
    fn filename_from_url() {
        assert_eq!(extract_filename("https://x.org/a/exam.pdf"), "exam.pdf");
        assert_eq!(extract_filename("https://x.org/"), "download");
    }

    #[tokio::test]
    async fn local_file_loaded_and_sniffed() {
        let mut tmp = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        tmp.write_all(&PNG_MAGIC).unwrap();
        let f = load_input(tmp.path().to_str().unwrap(), 1024, 5).await.unwrap();
        assert_eq!(f.kind, FileKind::Png);
        assert_eq!(f.kind.mime(), "image/png");
    }

    #[tokio::test]
    async fn missing_file_reported() {
        let err = load_input("/nonexistent/exam.pdf", 1024, 5).await.unwrap_err();
        assert!(matches!(err, SheetError::FileNotFound { .. }));
    }

    #[tokio::test]
    async fn oversized_local_file_rejected() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&vec![b'%'; 4096]).unwrap();
        let err = load_input(tmp.path().to_str().unwrap(), 1024, 5).await.unwrap_err();
        assert!(matches!(err, SheetError::FileTooLarge { .. }));
    }

    #[tokio::test]
    async fn download_without_content_length_stops_at_limit() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = sock.read(&mut buf).await;
            let _ = sock
                .write_all(b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n")
                .await;
            let _ = sock.write_all(&PNG_MAGIC).await;
            let _ = sock.write_all(&vec![0u8; 64 * 1024]).await;
            let _ = sock.shutdown().await;
        });

        let url = format!("http://{addr}/exam.png");
        let err = load_input(&url, 1024, 5).await.unwrap_err();
        match err {
            SheetError::FileTooLarge { name, size, .. } => {
                assert_eq!(name, "exam.png");
                assert!(size > 1024);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
