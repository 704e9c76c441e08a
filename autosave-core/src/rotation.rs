//! Autosave file naming and rotation.
//!
//! The vendor writes several files per saved flight (the flight file plus
//! weather and panel state), all sharing one stem, so rotation works on stem
//! groups rather than single files. Stems embed a sortable timestamp, which
//! makes lexicographic order chronological.

use std::path::{Path, PathBuf};
use std::{fs, io};

use chrono::NaiveDateTime;

/// Prefix shared by every autosaved flight.
pub const SAVE_PREFIX: &str = "AutoSave_";

/// Folder we own under the simulator's saved-flights directory.
pub const SAVE_FOLDER: &str = "FSXAutoSave";

/// Prepar3D major version whose Files directory receives the saves.
pub const P3D_VERSION: u32 = 5;

/// File stem for a save issued at `at`, e.g. `AutoSave_2026-08-31_14-05-00`.
pub fn save_stem(at: NaiveDateTime) -> String {
    format!("{SAVE_PREFIX}{}", at.format("%Y-%m-%d_%H-%M-%S"))
}

/// Path handed to the vendor save call, relative to the saved-flights root.
/// The simulator resolves it itself, so the separator is always a backslash.
pub fn sim_relative_path(stem: &str) -> String {
    format!("{SAVE_FOLDER}\\{stem}")
}

/// Absolute autosave directory, `Documents\Prepar3D v5 Files\FSXAutoSave`.
pub fn autosave_dir() -> Option<PathBuf> {
    dirs::document_dir()
        .map(|docs| docs.join(format!("Prepar3D v{P3D_VERSION} Files")).join(SAVE_FOLDER))
}

/// Delete the oldest autosaves until at most `max_keep` stem groups remain.
/// Files not carrying [`SAVE_PREFIX`] are never touched. Returns the number
/// of files removed; a missing directory counts as already empty.
pub fn prune_old_saves(dir: &Path, max_keep: u32) -> io::Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }

    let mut stems: Vec<String> = Vec::new();
    let mut files: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !name.starts_with(SAVE_PREFIX) {
            continue;
        }
        let stem = match name.split_once('.') {
            Some((stem, _ext)) => stem.to_string(),
            None => name.to_string(),
        };
        if !stems.contains(&stem) {
            stems.push(stem.clone());
        }
        files.push((stem, path));
    }

    stems.sort();
    let mut removed = 0;
    while stems.len() > max_keep as usize {
        let oldest = stems.remove(0);
        for (stem, path) in &files {
            if *stem == oldest {
                fs::remove_file(path)?;
                removed += 1;
            }
        }
        log::info!("pruned old autosave {oldest}");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("fsx-autosave-rotation-{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn stamp(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn stem_has_no_path_hostile_characters() {
        let stem = save_stem(stamp(31, 14));
        assert_eq!(stem, "AutoSave_2026-08-31_14-00-00");
        assert!(!stem.contains([':', '/', '\\', ' ']));
    }

    #[test]
    fn stems_sort_chronologically() {
        let earlier = save_stem(stamp(30, 23));
        let later = save_stem(stamp(31, 0));
        assert!(earlier < later);
    }

    #[test]
    fn sim_relative_path_uses_our_folder() {
        assert_eq!(
            sim_relative_path("AutoSave_X"),
            "FSXAutoSave\\AutoSave_X"
        );
    }

    #[test]
    fn prune_keeps_newest_stem_groups() {
        let dir = temp_dir("keep-newest");
        for day in 1..=4 {
            let stem = save_stem(stamp(day, 12));
            fs::write(dir.join(format!("{stem}.fxml")), b"flight").unwrap();
            fs::write(dir.join(format!("{stem}.wx")), b"weather").unwrap();
        }

        let removed = prune_old_saves(&dir, 2).unwrap();
        assert_eq!(removed, 4, "two evicted stems of two files each");

        let mut left: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        left.sort();
        assert_eq!(
            left,
            vec![
                "AutoSave_2026-08-03_12-00-00.fxml",
                "AutoSave_2026-08-03_12-00-00.wx",
                "AutoSave_2026-08-04_12-00-00.fxml",
                "AutoSave_2026-08-04_12-00-00.wx",
            ]
        );
    }

    #[test]
    fn prune_ignores_foreign_files() {
        let dir = temp_dir("foreign");
        fs::write(dir.join("KeepMe.fxml"), b"manual save").unwrap();
        fs::write(dir.join(format!("{}.fxml", save_stem(stamp(1, 1)))), b"x").unwrap();
        fs::write(dir.join(format!("{}.fxml", save_stem(stamp(2, 1)))), b"x").unwrap();

        let removed = prune_old_saves(&dir, 1).unwrap();
        assert_eq!(removed, 1);
        assert!(dir.join("KeepMe.fxml").exists());
    }

    #[test]
    fn prune_of_missing_dir_is_a_no_op() {
        let dir = std::env::temp_dir().join("fsx-autosave-rotation-does-not-exist");
        assert_eq!(prune_old_saves(&dir, 1).unwrap(), 0);
    }

    #[test]
    fn prune_under_capacity_removes_nothing() {
        let dir = temp_dir("under-capacity");
        fs::write(dir.join(format!("{}.fxml", save_stem(stamp(1, 1)))), b"x").unwrap();
        assert_eq!(prune_old_saves(&dir, 30).unwrap(), 0);
    }
}
