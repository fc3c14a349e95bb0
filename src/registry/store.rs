//! Lock-protected registry file
//!
//! Every pass takes an exclusive whole-file lock before reading and keeps it
//! until the rewritten file is on disk. Contention is waited out with a fixed
//! backoff and no timeout; a lock that is never released hangs the build.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use fs2::FileExt;
use tracing::{debug, instrument, warn};

use super::format;
use super::model::Registry;
use crate::error::LinkError;

pub const DEFAULT_LOCK_RETRY: Duration = Duration::from_millis(10);
const MIN_LOCK_RETRY: Duration = Duration::from_millis(1);

/// Handle to the shared registry file of a build
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
    retry: Duration,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            retry: DEFAULT_LOCK_RETRY,
        }
    }

    /// Backoff between lock attempts, at least one millisecond
    pub fn with_retry(mut self, retry: Duration) -> Self {
        self.retry = retry.max(MIN_LOCK_RETRY);
        self
    }

    /// Open (creating if needed) and lock the registry file, waiting for as
    /// long as another pass holds it
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn lock(&self) -> Result<LockedRegistry, LinkError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)?;

        let mut attempts: u64 = 0;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => break,
                Err(err) if is_contended(&err) => {
                    if attempts == 0 {
                        warn!(path = %self.path.display(), "registry is locked by another pass, waiting");
                    }
                    attempts += 1;
                    thread::sleep(self.retry);
                }
                Err(err) => return Err(err.into()),
            }
        }
        debug!(attempts, "registry lock acquired");

        Ok(LockedRegistry {
            file,
            path: self.path.clone(),
        })
    }
}

fn is_contended(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted)
        || err.raw_os_error().is_some() && err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

/// Exclusive access to the registry file; the lock is released on drop
#[derive(Debug)]
pub struct LockedRegistry {
    file: File,
    path: PathBuf,
}

impl LockedRegistry {
    /// Parse the whole file; any malformed line is fatal
    pub fn read(&mut self) -> Result<Registry, LinkError> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut bytes = Vec::new();
        self.file.read_to_end(&mut bytes)?;
        let text = String::from_utf8(bytes).map_err(|_| LinkError::RegistryEncoding {
            path: self.path.clone(),
        })?;
        format::parse(&text)
    }

    /// Truncate and rewrite the whole file, then sync it to disk
    ///
    /// An unusable `version` is rejected before anything is truncated.
    pub fn write(&mut self, registry: &Registry, version: &str) -> Result<(), LinkError> {
        format::check_version(version)?;
        let text = format::render(registry, version);
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        {
            let mut writer = BufWriter::new(&mut self.file);
            writer.write_all(text.as_bytes())?;
            writer.flush()?;
        }
        self.file.sync_data()?;
        debug!(
            types = registry.types.len(),
            methods = registry.methods.len(),
            bytes = text.len(),
            "registry written"
        );
        Ok(())
    }
}

impl Drop for LockedRegistry {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            warn!(path = %self.path.display(), error = %err, "failed to release registry lock");
        }
    }
}
