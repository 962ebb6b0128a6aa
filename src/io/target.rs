//! Output location of persisted artifacts.
//!
//! An artifact is addressed by three opaque strings:
//! - the archive file (JSON) that receives the data
//! - a directory, used both inside the archive and on the filesystem for renders
//! - a base name for the rendered file
//!
//! The only validation is stripping trailing separators.

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputTarget {
    archive: PathBuf,
    directory: String,
    name: String,
}

fn trim_separators(s: &str) -> String {
    let trimmed = s.trim_end_matches(['/', '\\']);
    if trimmed.is_empty() && !s.is_empty() {
        // A bare "/" stays the filesystem root.
        s[..1].to_string()
    } else {
        trimmed.to_string()
    }
}

impl OutputTarget {
    pub fn new(archive: impl Into<PathBuf>, directory: &str, name: &str) -> Self {
        Self {
            archive: archive.into(),
            directory: trim_separators(directory),
            name: trim_separators(name),
        }
    }

    pub fn archive(&self) -> &Path {
        &self.archive
    }

    pub fn set_archive(&mut self, archive: impl Into<PathBuf>) {
        self.archive = archive.into();
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }

    pub fn set_directory(&mut self, directory: &str) {
        self.directory = trim_separators(directory);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = trim_separators(name);
    }

    /// Filesystem path of a rendered file `<directory>/<stem>.<ext>`.
    pub fn render_path(&self, stem: &str, ext: &str) -> PathBuf {
        let file = format!("{stem}.{ext}");
        if self.directory.is_empty() {
            PathBuf::from(file)
        } else {
            Path::new(&self.directory).join(file)
        }
    }

    /// Same archive and directory with a different name.
    pub fn with_name(&self, name: &str) -> Self {
        Self {
            archive: self.archive.clone(),
            directory: self.directory.clone(),
            name: trim_separators(name),
        }
    }
}
