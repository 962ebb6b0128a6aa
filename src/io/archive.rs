//! JSON analysis archive.
//!
//! The archive is a two-level map `directory → name → entry`, mirroring the
//! on-disk layout of rendered files. It is always opened for update: an
//! existing file is read and merged into, a missing one starts empty, and the
//! parent directories are created when it is written.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::domain::{FitResult, GaussianFit, Point, SeriesGroup};
use crate::error::AppError;
use crate::floorplan::{CompositeCanvas, Grid};

/// Stored copy of one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivedSeries {
    pub name: String,
    pub group: SeriesGroup,
    pub points: Vec<Point>,
}

/// Payload of an archive entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Artifact {
    Series {
        title: String,
        series: Vec<ArchivedSeries>,
        fit: Option<GaussianFit>,
    },
    Grid {
        grid: Grid,
    },
    Canvas {
        canvas: CompositeCanvas,
    },
    Fits {
        fits: Vec<FitResult>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    /// RFC 3339 timestamp of the last write.
    pub created: String,
    pub artifact: Artifact,
}

#[derive(Debug, Clone, Default)]
pub struct Archive {
    path: PathBuf,
    directories: BTreeMap<String, BTreeMap<String, ArchiveEntry>>,
}

impl Archive {
    /// Read `path` if it exists, otherwise start an empty archive.
    pub fn open_for_update(path: &Path) -> Result<Self, AppError> {
        let directories = if path.exists() {
            let text = fs::read_to_string(path)
                .map_err(|e| AppError::io(format!("Failed to read archive '{}': {e}", path.display())))?;
            if text.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&text)
                    .map_err(|e| AppError::invalid_input(format!("Failed to parse archive '{}': {e}", path.display())))?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            directories,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace `directory/name`.
    pub fn put(&mut self, directory: &str, name: &str, artifact: Artifact) {
        let entry = ArchiveEntry {
            created: Utc::now().to_rfc3339(),
            artifact,
        };
        self.directories
            .entry(directory.to_string())
            .or_default()
            .insert(name.to_string(), entry);
    }

    pub fn get(&self, directory: &str, name: &str) -> Option<&ArchiveEntry> {
        self.directories.get(directory)?.get(name)
    }

    pub fn directories(&self) -> impl Iterator<Item = &str> + '_ {
        self.directories.keys().map(String::as_str)
    }

    /// Names stored under `directory`, sorted.
    pub fn names(&self, directory: &str) -> Vec<&str> {
        self.directories
            .get(directory)
            .map(|d| d.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.directories.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write(&self) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    AppError::io(format!("Failed to create directory '{}': {e}", parent.display()))
                })?;
            }
        }

        let json = serde_json::to_string_pretty(&self.directories)
            .map_err(|e| AppError::io(format!("Failed to serialize archive: {e}")))?;
        fs::write(&self.path, json)
            .map_err(|e| AppError::io(format!("Failed to write archive '{}': {e}", self.path.display())))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Phase;
    use crate::floorplan::Quantity;

    #[test]
    fn entries_survive_reopen_and_merge() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/run.json");

        let mut archive = Archive::open_for_update(&path).unwrap();
        assert!(archive.is_empty());
        let mut grid = Grid::new(Quantity::Mean, 2, 1);
        grid.set(0.5, 0.5, 12.0);
        archive.put("0_pre", "scurve_mu", Artifact::Grid { grid: grid.clone() });
        archive.write().unwrap();

        let mut reopened = Archive::open_for_update(&path).unwrap();
        assert_eq!(reopened.get("0_pre", "scurve_mu").unwrap().artifact, Artifact::Grid { grid });

        reopened.put(
            "composite",
            "composite_pre_mu",
            Artifact::Canvas {
                canvas: CompositeCanvas::new(Quantity::Mean, Phase::Pre),
            },
        );
        reopened.write().unwrap();

        let last = Archive::open_for_update(&path).unwrap();
        assert_eq!(last.len(), 2);
        assert_eq!(last.directories().collect::<Vec<_>>(), vec!["0_pre", "composite"]);
    }

    #[test]
    fn put_replaces_existing_name() {
        let mut archive = Archive::default();
        archive.put("d", "fits", Artifact::Fits { fits: vec![] });
        archive.put("d", "fits", Artifact::Fits { fits: vec![FitResult::Unset] });
        assert_eq!(archive.len(), 1);
        assert_eq!(archive.names("d"), vec!["fits"]);
        assert!(archive.names("missing").is_empty());
    }

    #[test]
    fn timestamps_are_rfc3339() {
        let mut archive = Archive::default();
        archive.put("d", "n", Artifact::Fits { fits: vec![] });
        let created = &archive.get("d", "n").unwrap().created;
        assert!(chrono::DateTime::parse_from_rfc3339(created).is_ok(), "{created}");
    }

    #[test]
    fn corrupt_archive_is_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{not json").unwrap();
        let err = Archive::open_for_update(&path).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidInput);
    }
}
