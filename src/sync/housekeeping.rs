// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Post-sync local-file housekeeping (§4.8): any backup file whose
//! database is no longer present on the device is moved — never deleted
//! — into an attic directory, protecting a user whose device was wiped or
//! replaced from an over-eager local cleanup.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const MAX_COLLISION_SUFFIX: u32 = 99;

/// Move every `.pdb`/`.prc` file in `backup_dir` whose stem is not in
/// `live_db_names` into `attic_dir`, suffixing with `~0`, `~1`, ... on a
/// name collision. Returns one log line per file moved, in the style the
/// session log accumulates (§7).
pub fn sweep(backup_dir: &Path, attic_dir: &Path, live_db_names: &HashSet<String>) -> Result<Vec<String>> {
    let mut moved = Vec::new();
    let entries = match fs::read_dir(backup_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(moved),
        Err(e) => return Err(e.into()),
    };

    for entry in entries {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        if ext != "pdb" && ext != "prc" {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if live_db_names.contains(stem) {
            continue;
        }

        fs::create_dir_all(attic_dir)?;
        let dest = attic_destination(attic_dir, &path)?;
        fs::rename(&path, &dest)?;
        moved.push(format!("moved {} to attic ({})", stem, dest.display()));
    }

    Ok(moved)
}

fn attic_destination(attic_dir: &Path, src: &Path) -> Result<PathBuf> {
    let file_name = src.file_name().ok_or_else(|| Error::Corrupt("backup file has no name".into()))?;
    let base = attic_dir.join(file_name);
    if !base.exists() {
        return Ok(base);
    }
    for n in 0..=MAX_COLLISION_SUFFIX {
        let candidate = attic_dir.join(format!("{}~{n}", file_name.to_string_lossy()));
        if !candidate.exists() {
            return Ok(candidate);
        }
    }
    Err(Error::Corrupt(format!(
        "attic collision suffixes 0..={MAX_COLLISION_SUFFIX} all exhausted for {}",
        src.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_for_live_db_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("backup");
        let attic = dir.path().join("attic");
        fs::create_dir_all(&backup).unwrap();
        fs::write(backup.join("Memo.pdb"), b"x").unwrap();

        let live: HashSet<String> = ["Memo".to_string()].into_iter().collect();
        let moved = sweep(&backup, &attic, &live).unwrap();
        assert!(moved.is_empty());
        assert!(backup.join("Memo.pdb").exists());
    }

    #[test]
    fn file_for_missing_db_is_moved_to_attic() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("backup");
        let attic = dir.path().join("attic");
        fs::create_dir_all(&backup).unwrap();
        fs::write(backup.join("OldDB.pdb"), b"x").unwrap();

        let live = HashSet::new();
        let moved = sweep(&backup, &attic, &live).unwrap();
        assert_eq!(moved.len(), 1);
        assert!(!backup.join("OldDB.pdb").exists());
        assert!(attic.join("OldDB.pdb").exists());
    }

    #[test]
    fn collision_gets_suffixed() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("backup");
        let attic = dir.path().join("attic");
        fs::create_dir_all(&backup).unwrap();
        fs::create_dir_all(&attic).unwrap();
        fs::write(backup.join("OldDB.pdb"), b"new").unwrap();
        fs::write(attic.join("OldDB.pdb"), b"existing").unwrap();

        let live = HashSet::new();
        let moved = sweep(&backup, &attic, &live).unwrap();
        assert_eq!(moved.len(), 1);
        assert!(attic.join("OldDB.pdb~0").exists());
        assert_eq!(fs::read(attic.join("OldDB.pdb")).unwrap(), b"existing");
        assert_eq!(fs::read(attic.join("OldDB.pdb~0")).unwrap(), b"new");
    }

    #[test]
    fn non_pdb_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("backup");
        let attic = dir.path().join("attic");
        fs::create_dir_all(&backup).unwrap();
        fs::write(backup.join("notes.txt"), b"x").unwrap();

        let live = HashSet::new();
        let moved = sweep(&backup, &attic, &live).unwrap();
        assert!(moved.is_empty());
        assert!(backup.join("notes.txt").exists());
    }

    #[test]
    fn missing_backup_dir_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("does-not-exist");
        let attic = dir.path().join("attic");
        let moved = sweep(&backup, &attic, &HashSet::new()).unwrap();
        assert!(moved.is_empty());
    }
}
