//! [`SnapshotStore`] implementation backed by a single file.
//!
//! Writes never leave a half-written canonical file behind:
//!
//! 1. encode into `<stem>.tmp.<ext>` next to the target
//! 2. move the previous snapshot, if any, to `<path>.bak`
//! 3. move the temporary file to `<path>`
//! 4. delete the backup
//!
//! A crash between steps 2 and 3 leaves only the backup, which [`load`]
//! picks up and moves back into place.
//!
//! [`load`]: FileSnapshotStore::load_snapshot

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use domintell_app::ports::SnapshotStore;
use domintell_domain::device::Device;
use domintell_domain::error::DomintellError;

use crate::error::StorageError;
use crate::format::SnapshotFormat;

/// Crash-safe snapshot file.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
    temp: PathBuf,
    backup: PathBuf,
    format: SnapshotFormat,
}

impl FileSnapshotStore {
    /// Create a store writing to `path`. Nothing is touched on disk yet.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::UnsupportedExtension`] if the extension of
    /// `path` selects no [`SnapshotFormat`].
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let format = SnapshotFormat::from_path(&path)?;

        let mut temp_name = path.file_stem().map(OsString::from).unwrap_or_default();
        temp_name.push(".tmp.");
        temp_name.push(format.extension());
        let temp = path.with_file_name(temp_name);

        let mut backup = path.clone().into_os_string();
        backup.push(".bak");

        Ok(Self {
            path,
            temp,
            backup: PathBuf::from(backup),
            format,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[cfg(test)]
    fn backup_path(&self) -> &Path {
        &self.backup
    }

    /// Read the persisted devices, recovering from the backup if needed.
    ///
    /// A corrupt canonical file is deleted once the backup has been tried.
    /// Returns an empty set when no usable snapshot exists.
    ///
    /// # Errors
    ///
    /// Returns an error only when a file exists but cannot be read.
    pub fn load_snapshot(&self) -> Result<Vec<Device>, StorageError> {
        match self.read(&self.path) {
            Ok(Some(devices)) => return Ok(devices),
            Ok(None) => {}
            Err(err) if is_corrupt(&err) => {
                tracing::warn!(path = %self.path.display(), %err, "snapshot is corrupt");
            }
            Err(err) => return Err(err),
        }

        let recovered = match self.read(&self.backup) {
            Ok(found) => found,
            Err(err) if is_corrupt(&err) => {
                tracing::warn!(path = %self.backup.display(), %err, "snapshot backup is corrupt");
                None
            }
            Err(err) => return Err(err),
        };

        if let Some(devices) = recovered {
            fs::rename(&self.backup, &self.path)
                .map_err(|err| StorageError::io(&self.backup, err))?;
            tracing::info!(path = %self.path.display(), "snapshot restored from backup");
            return Ok(devices);
        }

        match fs::remove_file(&self.path) {
            Ok(()) => tracing::warn!(path = %self.path.display(), "deleted corrupt snapshot"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(StorageError::io(&self.path, err)),
        }
        Ok(Vec::new())
    }

    /// Atomically replace the snapshot with `devices`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MissingDirectory`] or
    /// [`StorageError::PermissionDenied`] before anything is written when
    /// the target cannot be written, or the error of the failing step.
    pub fn save_snapshot(&self, devices: &[Device]) -> Result<(), StorageError> {
        self.check_writable()?;
        let bytes = self.format.encode(devices)?;

        write_synced(&self.temp, &bytes).map_err(|err| StorageError::io(&self.temp, err))?;

        let replaced = self.path.exists();
        if replaced {
            fs::rename(&self.path, &self.backup)
                .map_err(|err| StorageError::io(&self.path, err))?;
        }
        fs::rename(&self.temp, &self.path).map_err(|err| StorageError::io(&self.temp, err))?;
        if replaced {
            fs::remove_file(&self.backup).map_err(|err| StorageError::io(&self.backup, err))?;
        }

        tracing::trace!(path = %self.path.display(), devices = devices.len(), "snapshot saved");
        Ok(())
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn check_writable(&self) -> Result<(), StorageError> {
        let directory = self.directory();
        let metadata = match fs::metadata(directory) {
            Ok(metadata) if metadata.is_dir() => metadata,
            Ok(_) => return Err(StorageError::MissingDirectory(directory.to_path_buf())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::MissingDirectory(directory.to_path_buf()));
            }
            Err(err) => return Err(StorageError::io(directory, err)),
        };
        if metadata.permissions().readonly() {
            return Err(StorageError::PermissionDenied(directory.to_path_buf()));
        }
        if let Ok(metadata) = fs::metadata(&self.path)
            && metadata.permissions().readonly()
        {
            return Err(StorageError::PermissionDenied(self.path.clone()));
        }
        Ok(())
    }

    /// `Ok(None)` when `path` does not exist.
    fn read(&self, path: &Path) -> Result<Option<Vec<Device>>, StorageError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StorageError::io(path, err)),
        };
        self.format.decode(&bytes).map(Some)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Vec<Device>, DomintellError> {
        Ok(self.load_snapshot()?)
    }

    fn save(&self, devices: &[Device]) -> Result<(), DomintellError> {
        Ok(self.save_snapshot(devices)?)
    }
}

fn is_corrupt(err: &StorageError) -> bool {
    matches!(err, StorageError::Postcard(_) | StorageError::Json(_))
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}
