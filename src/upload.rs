//! Upload validation and rate limiting.
//!
//! Every file in a batch is checked before any bytes are written: MIME
//! allowlist, size cap, file-name sanitization, and an extension/MIME
//! cross-check. A mismatch between the declared MIME type and what the
//! extension implies is recorded as a security event and fails that file
//! without touching the rest of the batch.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;
pub const ACCEPTED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];
pub const MAX_FILE_NAME_LEN: usize = 255;

const SUSPICIOUS_EXTENSIONS: [&str; 8] = [
    ".php", ".exe", ".sh", ".bat", ".js", ".html", ".svg", ".dll",
];

/// Metadata of one file in an upload batch, known before the body is read.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadIssue {
    #[error("unsupported file type {0}")]
    UnsupportedType(String),
    #[error("file exceeds the {max} byte limit ({size} bytes)", max = MAX_FILE_BYTES)]
    TooLarge { size: u64 },
    #[error("invalid file name: {0}")]
    InvalidFileName(String),
    #[error("declared type {declared} does not match extension .{extension}")]
    TypeMismatch {
        declared: String,
        extension: String,
    },
}

/// MIME type implied by a file extension, for the allowlisted image types.
pub fn expected_mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension.to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

pub fn file_extension(file_name: &str) -> Option<&str> {
    file_name.rsplit_once('.').map(|(_, ext)| ext).filter(|e| !e.is_empty())
}

fn file_name_problem(name: &str) -> Option<String> {
    if name.is_empty() {
        return Some("empty file name".into());
    }
    if name.len() > MAX_FILE_NAME_LEN {
        return Some("file name too long".into());
    }
    if name.contains('/') || name.contains('\\') {
        return Some("path separators are not allowed".into());
    }
    if name.contains("..") {
        return Some("traversal sequence".into());
    }
    if name.starts_with('.') {
        return Some("hidden file name".into());
    }
    if name.chars().any(|c| c.is_control()) {
        return Some("control characters".into());
    }
    let lowered = name.to_ascii_lowercase();
    for ext in SUSPICIOUS_EXTENSIONS {
        if lowered.contains(ext) {
            return Some(format!("suspicious pattern {ext}"));
        }
    }
    None
}

/// Validate one candidate. An empty result means the file may be stored;
/// otherwise every accumulated problem is reported and the file is skipped.
pub fn validate(candidate: &UploadCandidate) -> Vec<UploadIssue> {
    let mut issues = Vec::new();

    if !ACCEPTED_MIME_TYPES.contains(&candidate.content_type.as_str()) {
        issues.push(UploadIssue::UnsupportedType(candidate.content_type.clone()));
    }
    if candidate.size > MAX_FILE_BYTES {
        issues.push(UploadIssue::TooLarge {
            size: candidate.size,
        });
    }
    if let Some(problem) = file_name_problem(&candidate.file_name) {
        issues.push(UploadIssue::InvalidFileName(problem));
    }

    // Extension and declared MIME type must agree. A mismatch may indicate a
    // disguised payload; log it as a security event and fail the file.
    if let Some(extension) = file_extension(&candidate.file_name) {
        if let Some(expected) = expected_mime_for_extension(extension) {
            if expected != candidate.content_type
                && ACCEPTED_MIME_TYPES.contains(&candidate.content_type.as_str())
            {
                tracing::warn!(
                    file_name = %candidate.file_name,
                    declared = %candidate.content_type,
                    expected = %expected,
                    "security: extension/MIME mismatch on upload"
                );
                issues.push(UploadIssue::TypeMismatch {
                    declared: candidate.content_type.clone(),
                    extension: extension.to_ascii_lowercase(),
                });
            }
        }
    }

    issues
}

/// Storage key for an accepted file: `{epoch-millis}-{token}.{ext}`.
/// Original names never reach storage paths or public URLs.
pub fn storage_file_name(original_name: &str) -> String {
    let extension = file_extension(original_name)
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string());
    let token = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}.{}",
        Utc::now().timestamp_millis(),
        &token[..12],
        extension
    )
}

/// Per-user rolling-window request limiter for the upload endpoint.
///
/// The original system kept this count client-side; here it is enforced on
/// the server. Still advisory across replicas: the window lives in process
/// memory only.
pub struct UploadLimiter {
    max_requests: u32,
    window: Duration,
    buckets: Mutex<HashMap<Uuid, VecDeque<Instant>>>,
}

impl UploadLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Record one request for `user`, returning false when the window is
    /// already full.
    pub fn try_acquire(&self, user: Uuid) -> bool {
        self.try_acquire_at(user, Instant::now())
    }

    fn try_acquire_at(&self, user: Uuid, now: Instant) -> bool {
        let mut buckets = match self.buckets.lock() {
            Ok(guard) => guard,
            // A poisoned limiter should never lock users out of uploads.
            Err(poisoned) => poisoned.into_inner(),
        };
        let entries = buckets.entry(user).or_default();
        while let Some(front) = entries.front() {
            if now.duration_since(*front) >= self.window {
                entries.pop_front();
            } else {
                break;
            }
        }
        if entries.len() as u32 >= self.max_requests {
            return false;
        }
        entries.push_back(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_refills_after_window() {
        let limiter = UploadLimiter::new(2, Duration::from_secs(60));
        let user = Uuid::new_v4();
        let start = Instant::now();

        assert!(limiter.try_acquire_at(user, start));
        assert!(limiter.try_acquire_at(user, start));
        assert!(!limiter.try_acquire_at(user, start + Duration::from_secs(1)));
        // Old entries fall out of the rolling window.
        assert!(limiter.try_acquire_at(user, start + Duration::from_secs(61)));
    }

    #[test]
    fn limiter_is_per_user() {
        let limiter = UploadLimiter::new(1, Duration::from_secs(60));
        let now = Instant::now();
        assert!(limiter.try_acquire_at(Uuid::new_v4(), now));
        assert!(limiter.try_acquire_at(Uuid::new_v4(), now));
    }
}
