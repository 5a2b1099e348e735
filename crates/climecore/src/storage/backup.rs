use chrono::{Local, NaiveDateTime};
use fs_err as fs;
use std::path::{Path, PathBuf};

use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::storage::db::DbPool;

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

fn ensure_backup_dir(backup_dir: &Path) -> AppResult<()> {
    if !backup_dir.exists() {
        fs::create_dir_all(backup_dir)?;
        log::info!("Created backup directory: {}", backup_dir.display());
    }
    Ok(())
}

/// Parses the `YYYYMMDD_HHMMSS` prefix of a backup file name.
fn backup_timestamp(path: &Path) -> Option<NaiveDateTime> {
    let name = path.file_name()?.to_str()?;
    let stamp = name.get(0..15)?;
    NaiveDateTime::parse_from_str(stamp, STAMP_FORMAT).ok()
}

/// Writes a consistent snapshot of the database into `backup_dir`.
///
/// Uses `VACUUM INTO`, so the copy is taken inside a read transaction and a sale
/// committing at the same moment is either fully in the backup or not at all.
/// Keeps the newest [`config::backup::MAX_BACKUPS`] files.
pub fn create_backup(pool: &DbPool, db_path: &str, backup_dir: &Path) -> AppResult<PathBuf> {
    ensure_backup_dir(backup_dir)?;

    let timestamp = Local::now().format(STAMP_FORMAT);
    let db_name = Path::new(db_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("clime.sqlite");
    let backup_path = backup_dir.join(format!("{}_{}", timestamp, db_name));
    if backup_path.exists() {
        return Err(AppError::Validation(format!(
            "Backup {} already exists",
            backup_path.display()
        )));
    }

    let target = backup_path
        .to_str()
        .ok_or_else(|| AppError::Validation("Backup path is not valid UTF-8".to_string()))?;
    let conn = pool.get()?;
    conn.execute("VACUUM INTO ?1", [target])?;
    log::info!("Created backup: {}", backup_path.display());

    cleanup_old_backups(backup_dir, config::backup::MAX_BACKUPS)?;

    Ok(backup_path)
}

/// Backups in `backup_dir`, newest first.
pub fn list_backups(backup_dir: &Path) -> AppResult<Vec<(PathBuf, NaiveDateTime)>> {
    let mut backups = Vec::new();
    if !backup_dir.is_dir() {
        return Ok(backups);
    }

    for entry in fs::read_dir(backup_dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(stamp) = backup_timestamp(&path) {
            backups.push((path, stamp));
        }
    }

    backups.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
    Ok(backups)
}

/// Removes everything but the newest `keep` backups.
fn cleanup_old_backups(backup_dir: &Path, keep: usize) -> AppResult<()> {
    for (path, _) in list_backups(backup_dir)?.iter().skip(keep) {
        if let Err(e) = fs::remove_file(path) {
            log::warn!("Failed to remove old backup {}: {}", path.display(), e);
        } else {
            log::info!("Removed old backup: {}", path.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::create_pool;
    use tempfile::TempDir;

    #[test]
    fn test_backup_is_a_readable_database() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("clime.sqlite");
        let pool = create_pool(db_path.to_str().unwrap()).unwrap();
        pool.get()
            .unwrap()
            .execute(
                "INSERT INTO inventory (artist, title, condition, price, quantity) VALUES ('Can', 'Tago Mago', 'vg+', '20.00', 5)",
                [],
            )
            .unwrap();

        let backups = dir.path().join("backups");
        let path = create_backup(&pool, db_path.to_str().unwrap(), &backups).unwrap();
        assert!(path.file_name().unwrap().to_str().unwrap().ends_with("_clime.sqlite"));

        let copy = rusqlite::Connection::open(&path).unwrap();
        let qty: i64 = copy
            .query_row("SELECT quantity FROM inventory WHERE title = 'Tago Mago'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(qty, 5);
        assert_eq!(list_backups(&backups).unwrap().len(), 1);
    }

    #[test]
    fn test_cleanup_keeps_newest() {
        let dir = TempDir::new().unwrap();
        for day in 1..=5 {
            let name = format!("202401{:02}_120000_clime.sqlite", day);
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();

        cleanup_old_backups(dir.path(), 2).unwrap();

        let left = list_backups(dir.path()).unwrap();
        let names: Vec<_> = left
            .iter()
            .map(|(p, _)| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["20240105_120000_clime.sqlite", "20240104_120000_clime.sqlite"]);
        assert!(dir.path().join("notes.txt").exists());
    }
}
