//! Writes a built site to disk: clearing the old output directory, copying
//! static assets, and writing every rendered [`Output`].

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::site::Output;

/// Writes outputs beneath a single output directory.
pub struct Writer<'a> {
    output_directory: &'a Path,
}

impl<'a> Writer<'a> {
    pub fn new(output_directory: &'a Path) -> Writer<'a> {
        Writer { output_directory }
    }

    /// Deletes the output directory so stale files from earlier builds don't
    /// survive. Refuses when the output directory is `project_root` or one of
    /// its ancestors.
    pub fn clean(&self, project_root: &Path) -> Result<()> {
        let output = match fs::canonicalize(self.output_directory) {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(self.io(self.output_directory, e)),
        };
        let root = fs::canonicalize(project_root).map_err(|e| self.io(project_root, e))?;
        if root.starts_with(&output) {
            return Err(Error::Unsafe(self.output_directory.to_owned()));
        }
        rmdir(self.output_directory)
    }

    /// Copies every file under `static_directory` to the same relative path
    /// in the output directory. A missing static directory is skipped.
    pub fn copy_static(&self, static_directory: &Path) -> Result<usize> {
        if !static_directory.is_dir() {
            debug!(dir = %static_directory.display(), "no static directory");
            return Ok(0);
        }

        let mut copied = 0;
        for entry in WalkDir::new(static_directory).sort_by_file_name() {
            let entry = entry?;
            let relative = match entry.path().strip_prefix(static_directory) {
                Ok(relative) => relative,
                Err(_) => continue,
            };
            let target = self.output_directory.join(relative);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target).map_err(|e| self.io(&target, e))?;
            } else {
                fs::copy(entry.path(), &target).map_err(|e| self.io(&target, e))?;
                copied += 1;
            }
        }
        info!(files = copied, "copied static files");
        Ok(copied)
    }

    /// Writes each output to its file, creating parent directories as
    /// needed. A generated file replaces a static file at the same path.
    pub fn write_outputs(&self, outputs: &[Output]) -> Result<()> {
        let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
        for output in outputs {
            let path = self.output_directory.join(&output.file);
            if let Some(dir) = path.parent() {
                if seen_dirs.insert(dir.to_owned()) {
                    fs::create_dir_all(dir).map_err(|e| self.io(dir, e))?;
                }
            }
            if path.is_file() {
                warn!(file = %output.file, owner = %output.owner, "replacing static file");
            }
            fs::write(&path, &output.markup).map_err(|e| self.io(&path, e))?;
            debug!(file = %output.file, "wrote output");
        }
        info!(
            files = outputs.len(),
            dir = %self.output_directory.display(),
            "wrote site"
        );
        Ok(())
    }

    fn io(&self, path: &Path, err: std::io::Error) -> Error {
        Error::Io {
            path: path.to_owned(),
            err,
        }
    }
}

fn rmdir(dir: &Path) -> Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

/// The result of writing a site.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a problem writing the site to disk.
#[derive(Debug, Error)]
pub enum Error {
    /// Returned when the output directory would delete the project with it.
    #[error("refusing to clean `{}`: it contains the project", .0.display())]
    Unsafe(PathBuf),

    /// Returned for I/O problems while cleaning the output directory.
    #[error("cleaning directory `{}`: {err}", .path.display())]
    Clean {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },

    /// Returned for errors walking the static directory.
    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    /// Returned for other I/O errors.
    #[error("writing `{}`: {err}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_refuses_to_clean_project_root() -> Result<()> {
        let dir = tempfile::tempdir().map_err(|e| Error::Io {
            path: PathBuf::new(),
            err: e,
        })?;
        let writer = Writer::new(dir.path());
        assert!(matches!(writer.clean(dir.path()), Err(Error::Unsafe(_))));
        assert!(dir.path().is_dir());
        Ok(())
    }

    #[test]
    fn test_clean_missing_directory() -> Result<()> {
        let writer = Writer::new(Path::new("/nonexistent/jotter/_site"));
        writer.clean(Path::new("."))
    }
}
