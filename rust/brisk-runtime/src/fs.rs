//! Handle-based filesystem service.

use crate::error::{HostError, ResourceKind};
use crate::table::ResourceTable;
use brisk_core::Handle;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// OpenMode
// ---------------------------------------------------------------------------

/// The fixed vocabulary of `fs.open` modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// `r`
    Read,
    /// `w`: create or truncate, write only.
    WriteTruncate,
    /// `a`: create, append only.
    Append,
    /// `r+`: read and write an existing file.
    ReadWrite,
    /// `w+`: create or truncate, read and write.
    WriteTruncateReadWrite,
    /// `a+`: create, read anywhere, writes append.
    AppendReadWrite,
    /// `rw`: create if missing, read and write without truncating.
    CreateReadWrite,
}

impl OpenMode {
    pub fn parse(mode: &str) -> Result<Self, HostError> {
        match mode {
            "r" => Ok(OpenMode::Read),
            "w" => Ok(OpenMode::WriteTruncate),
            "a" => Ok(OpenMode::Append),
            "r+" => Ok(OpenMode::ReadWrite),
            "w+" => Ok(OpenMode::WriteTruncateReadWrite),
            "a+" => Ok(OpenMode::AppendReadWrite),
            "rw" => Ok(OpenMode::CreateReadWrite),
            other => Err(HostError::InvalidArgument(format!(
                "unknown open mode '{}'",
                other
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OpenMode::Read => "r",
            OpenMode::WriteTruncate => "w",
            OpenMode::Append => "a",
            OpenMode::ReadWrite => "r+",
            OpenMode::WriteTruncateReadWrite => "w+",
            OpenMode::AppendReadWrite => "a+",
            OpenMode::CreateReadWrite => "rw",
        }
    }

    fn options(self) -> OpenOptions {
        let mut opts = OpenOptions::new();
        match self {
            OpenMode::Read => opts.read(true),
            OpenMode::WriteTruncate => opts.write(true).create(true).truncate(true),
            OpenMode::Append => opts.append(true).create(true),
            OpenMode::ReadWrite => opts.read(true).write(true),
            OpenMode::WriteTruncateReadWrite => {
                opts.read(true).write(true).create(true).truncate(true)
            }
            OpenMode::AppendReadWrite => opts.read(true).append(true).create(true),
            OpenMode::CreateReadWrite => opts.read(true).write(true).create(true),
        };
        opts
    }
}

// ---------------------------------------------------------------------------
// FsService
// ---------------------------------------------------------------------------

/// Open files keyed by handle, plus stateless path operations.
#[derive(Debug)]
pub struct FsService {
    files: ResourceTable<File>,
}

impl Default for FsService {
    fn default() -> Self {
        Self::new()
    }
}

impl FsService {
    pub fn new() -> Self {
        Self {
            files: ResourceTable::new(ResourceKind::File),
        }
    }

    /// Open `path` with a mode string (`r`, `w`, `a`, `r+`, `w+`, `a+`, `rw`).
    /// The handle is registered only after the OS open succeeds.
    pub fn open(&self, path: &Path, mode: &str) -> Result<Handle, HostError> {
        let mode = OpenMode::parse(mode)?;
        let file = mode
            .options()
            .open(path)
            .map_err(|e| HostError::io("open", e))?;
        let handle = self.files.insert(file);
        debug!(%handle, path = %path.display(), mode = mode.as_str(), "file opened");
        Ok(handle)
    }

    /// Read up to `n` bytes. Fewer bytes come back only at end of file.
    pub fn read(&self, handle: Handle, n: i64) -> Result<Vec<u8>, HostError> {
        let limit = read_limit(n)?;
        let file = self.files.get(handle)?;
        if limit == 0 {
            return Ok(Vec::new());
        }
        let mut buf = Vec::new();
        (&*file)
            .take(limit)
            .read_to_end(&mut buf)
            .map_err(|e| HostError::io("read", e))?;
        trace!(%handle, requested = limit, read = buf.len(), "file read");
        Ok(buf)
    }

    /// Issue one write and report how many bytes the OS accepted.
    pub fn write(&self, handle: Handle, data: &[u8]) -> Result<usize, HostError> {
        let file = self.files.get(handle)?;
        let written = (&*file)
            .write(data)
            .map_err(|e| HostError::io("write", e))?;
        trace!(%handle, requested = data.len(), written, "file write");
        Ok(written)
    }

    /// Remove the handle and release the descriptor.
    pub fn close(&self, handle: Handle) -> Result<(), HostError> {
        // Dropping the last Arc closes the descriptor; an in-flight read or
        // write on another thread keeps it alive until that call returns.
        self.files.remove(handle)?;
        debug!(%handle, "file closed");
        Ok(())
    }

    /// `false` when the path does not exist; other stat failures are errors.
    pub fn exists(&self, path: &Path) -> Result<bool, HostError> {
        match std::fs::metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(HostError::io("stat", e)),
        }
    }

    /// Remove a file or an empty directory.
    pub fn remove(&self, path: &Path) -> Result<(), HostError> {
        let meta = std::fs::symlink_metadata(path).map_err(|e| HostError::io("remove", e))?;
        if meta.is_dir() {
            std::fs::remove_dir(path).map_err(|e| HostError::io("remove", e))?;
        } else {
            std::fs::remove_file(path).map_err(|e| HostError::io("remove", e))?;
        }
        debug!(path = %path.display(), "path removed");
        Ok(())
    }

    /// Create a single directory. The parent must already exist.
    pub fn mkdir(&self, path: &Path) -> Result<(), HostError> {
        std::fs::create_dir(path).map_err(|e| HostError::io("mkdir", e))?;
        debug!(path = %path.display(), "directory created");
        Ok(())
    }

    /// Number of files currently open through this service.
    pub fn open_count(&self) -> usize {
        self.files.len()
    }
}

/// Validate a script-supplied byte count.
pub(crate) fn read_limit(n: i64) -> Result<u64, HostError> {
    u64::try_from(n)
        .map_err(|_| HostError::InvalidArgument(format!("read length must be >= 0, got {}", n)))
}
