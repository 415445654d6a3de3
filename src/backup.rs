use chrono::{DateTime, Local};
use log::{debug, warn};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};

const BACKUP_EXTENSION: &str = "backup";

/// Copies files into a flat backup directory before they are mutated.
#[derive(Debug, Clone)]
pub struct BackupManager {
    directory: PathBuf,
}

impl BackupManager {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the backup path, or `None` when the source is missing or the
    /// copy fails. Never an error: a failed backup must not block the write.
    pub fn backup(&self, path: &Path) -> Option<PathBuf> {
        self.backup_at(path, Local::now())
    }

    pub(crate) fn backup_at(&self, path: &Path, now: DateTime<Local>) -> Option<PathBuf> {
        if !path.is_file() {
            debug!("No backup for missing file: {}", path.display());
            return None;
        }
        match self.try_backup(path, now) {
            Ok(backup_path) => {
                debug!(
                    "Backed up {} to {}",
                    path.display(),
                    backup_path.display()
                );
                Some(backup_path)
            }
            Err(e) => {
                warn!("Backup of {} failed: {e}", path.display());
                None
            }
        }
    }

    fn try_backup(&self, path: &Path, now: DateTime<Local>) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.directory)?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let stamp = now.format("%Y%m%d_%H%M%S");

        let mut source = File::open(path)?;
        // Same-second backups get a numeric suffix instead of overwriting.
        let mut attempt = 0u32;
        loop {
            let file_name = if attempt == 0 {
                format!("{name}_{stamp}.{BACKUP_EXTENSION}")
            } else {
                format!("{name}_{stamp}_{attempt}.{BACKUP_EXTENSION}")
            };
            let target = self.directory.join(file_name);
            match OpenOptions::new().write(true).create_new(true).open(&target) {
                Ok(dest) => {
                    fill_or_discard(&target, dest, &mut source)?;
                    return Ok(target);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e),
            }
        }
    }
}

/// Copies `source` into the freshly created `target`, removing it again if
/// the copy fails so a partial file never passes for a backup.
fn fill_or_discard(target: &Path, mut dest: File, source: &mut impl Read) -> io::Result<()> {
    if let Err(e) = io::copy(source, &mut dest) {
        drop(dest);
        let _ = fs::remove_file(target);
        return Err(e);
    }
    Ok(())
}
