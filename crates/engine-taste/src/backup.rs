use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

/// Copy `db_path` into a sibling `backups/` directory under a timestamped
/// name, then delete all but the `keep` newest backups. Called once from
/// `FeedbackStore::open`, before the database file is opened for writing —
/// generalizes the teacher's `MemoryEventLog::backup` (a single `.bak`
/// sibling copy) into the rotation-with-retention scheme `spec.md` §4.6
/// calls for, ported from `taste_engine.py::_backup_on_startup`/
/// `_rotate_backups`.
pub fn backup_and_rotate(db_path: &Path, keep: usize, now: DateTime<Utc>) -> Result<()> {
    if !db_path.exists() {
        return Ok(());
    }

    let backups_dir = db_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join("backups");
    fs::create_dir_all(&backups_dir)
        .with_context(|| format!("creating backup directory {}", backups_dir.display()))?;

    let stem = db_path
        .file_name()
        .map(|f| f.to_string_lossy().to_string())
        .unwrap_or_else(|| "taste.redb".to_string());
    let stamped_name = format!("{stem}.{}.bak", now.format("%Y%m%dT%H%M%S%.f"));
    let dest = backups_dir.join(&stamped_name);

    fs::copy(db_path, &dest)
        .with_context(|| format!("copying {} to {}", db_path.display(), dest.display()))?;

    rotate(&backups_dir, &stem, keep)
}

fn rotate(backups_dir: &Path, stem: &str, keep: usize) -> Result<()> {
    let prefix = format!("{stem}.");
    let mut backups: Vec<(PathBuf, std::time::SystemTime)> = fs::read_dir(backups_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .map(|f| f.to_string_lossy().starts_with(&prefix))
                .unwrap_or(false)
        })
        .filter_map(|path| {
            let modified = fs::metadata(&path).ok()?.modified().ok()?;
            Some((path, modified))
        })
        .collect();

    // Newest first.
    backups.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in backups.into_iter().skip(keep) {
        if let Err(err) = fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), error = %err, "failed to prune old taste-engine backup");
        }
    }
    Ok(())
}
