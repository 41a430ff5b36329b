use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Upload size ceiling: 100 MiB.
pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Fixed allow-list of accepted upload MIME types: common image, video,
/// document, and archive formats.
pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "video/mp4",
    "video/avi",
    "video/mov",
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/zip",
    "application/x-rar-compressed",
];

/// Why an upload was rejected by the validation pipeline. The first violation
/// wins: the type check runs before any payload is read, the size check after.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadRejection {
    UnsupportedType(String),
    TooLarge(usize),
}

impl fmt::Display for UploadRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadRejection::UnsupportedType(mime) => {
                write!(f, "unsupported file type: {mime}")
            }
            UploadRejection::TooLarge(size) => write!(
                f,
                "file too large: {size} bytes exceeds the {MAX_UPLOAD_BYTES} byte limit"
            ),
        }
    }
}

/// Type check: the declared MIME type must be a member of the allow-list.
pub fn validate_mime_type(declared: &str) -> Result<(), UploadRejection> {
    if ALLOWED_MIME_TYPES.contains(&declared) {
        Ok(())
    } else {
        Err(UploadRejection::UnsupportedType(declared.to_string()))
    }
}

/// Size check: the payload must not exceed the fixed ceiling.
pub fn validate_size(size: usize) -> Result<(), UploadRejection> {
    if size > MAX_UPLOAD_BYTES {
        Err(UploadRejection::TooLarge(size))
    } else {
        Ok(())
    }
}

/// storage_name
///
/// Generates the unique on-disk name for an accepted upload:
/// `<field>-<unix-millis>-<9-digit-random><original extension>`.
///
/// The millisecond timestamp plus an independent random component makes
/// collisions between concurrent uploads negligible without any shared
/// counter or lock, even for simultaneous arrivals of identically named files.
pub fn storage_name(field: &str, original_name: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let random: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    let extension = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();
    format!("{field}-{millis}-{random:09}{extension}")
}

// 1. StorageService Contract
/// StorageService
///
/// Defines the abstract contract for persisting validated upload payloads.
/// This trait allows swapping the concrete implementation — the real local-disk
/// store in production versus the in-memory mock during testing — without
/// affecting the calling handlers.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Persists a fully validated payload under `storage_name` and returns the
    /// stored path. Must never leave a partially written file behind on error.
    async fn save(&self, storage_name: &str, data: &[u8]) -> io::Result<PathBuf>;
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;

// 2. The Real Implementation (local disk)
/// LocalDiskStorage
///
/// Writes accepted uploads into the managed upload directory, from which they
/// are served read-only under the `/uploads` static prefix.
#[derive(Clone)]
pub struct LocalDiskStorage {
    root: PathBuf,
}

impl LocalDiskStorage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Creates the upload directory if absent. Idempotent: succeeding when the
    /// directory already exists is part of the contract.
    pub async fn ensure_root(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }
}

#[async_trait]
impl StorageService for LocalDiskStorage {
    async fn save(&self, storage_name: &str, data: &[u8]) -> io::Result<PathBuf> {
        // Generated names never contain separators; reject anything else so a
        // caller bug cannot escape the upload directory.
        if storage_name.contains('/') || storage_name.contains('\\') || storage_name.contains("..")
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "storage name must be a bare file name",
            ));
        }

        let dest = self.root.join(storage_name);
        match tokio::fs::write(&dest, data).await {
            Ok(()) => Ok(dest),
            Err(e) => {
                // A failed write must not leave a partial asset behind.
                let _ = tokio::fs::remove_file(&dest).await;
                Err(e)
            }
        }
    }
}

// 3. The Mock Implementation (For Unit Tests)
/// MockStorageService
///
/// A mock implementation of `StorageService` used exclusively for testing.
/// Records the names it was asked to store so tests can assert on the pipeline
/// without touching the filesystem.
pub struct MockStorageService {
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
    saved: Mutex<Vec<String>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self {
            should_fail: false,
            saved: Mutex::new(Vec::new()),
        }
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            saved: Mutex::new(Vec::new()),
        }
    }

    /// Names stored so far, in call order.
    pub fn saved_names(&self) -> Vec<String> {
        self.saved.lock().clone()
    }
}

impl Default for MockStorageService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn save(&self, storage_name: &str, _data: &[u8]) -> io::Result<PathBuf> {
        if self.should_fail {
            return Err(io::Error::other("mock storage error: simulation requested"));
        }
        self.saved.lock().push(storage_name.to_string());
        Ok(PathBuf::from("/mock-uploads").join(storage_name))
    }
}
