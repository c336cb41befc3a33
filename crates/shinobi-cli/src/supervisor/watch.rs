//! Polling snapshots of the watched source tree.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::project::WatchSettings;

use super::SupervisorError;

/// Modification stamp of one watched file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    modified: Option<SystemTime>,
    len: u64,
}

/// Watched files keyed by path.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct SourceSnapshot {
    files: BTreeMap<PathBuf, Stamp>,
}

impl SourceSnapshot {
    /// Walks every watch root under `root`. Missing roots contribute nothing.
    pub(crate) fn capture(root: &Path, settings: &WatchSettings) -> Result<Self, SupervisorError> {
        let mut snapshot = Self::default();
        let mut pending: Vec<PathBuf> = settings.roots.iter().map(|dir| root.join(dir)).collect();
        while let Some(directory) = pending.pop() {
            let entries = match fs::read_dir(&directory) {
                Ok(entries) => entries,
                Err(error) if error.kind() == io::ErrorKind::NotFound => continue,
                Err(source) => {
                    return Err(SupervisorError::Watch {
                        path: directory,
                        source,
                    });
                }
            };
            for entry in entries {
                let entry = entry.map_err(|source| SupervisorError::Watch {
                    path: directory.clone(),
                    source,
                })?;
                snapshot.record(&entry, settings, &mut pending)?;
            }
        }
        Ok(snapshot)
    }

    fn record(
        &mut self,
        entry: &fs::DirEntry,
        settings: &WatchSettings,
        pending: &mut Vec<PathBuf>,
    ) -> Result<(), SupervisorError> {
        let path = entry.path();
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(source) => return Err(SupervisorError::Watch { path, source }),
        };
        if metadata.is_dir() {
            let ignored = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name == "target" || name.starts_with('.'));
            if !ignored {
                pending.push(path);
            }
            return Ok(());
        }
        let watched = path.extension().is_some_and(|extension| {
            settings
                .extensions
                .iter()
                .any(|wanted| extension == wanted.trim_start_matches('.'))
        });
        if watched {
            self.files.insert(
                path,
                Stamp {
                    modified: metadata.modified().ok(),
                    len: metadata.len(),
                },
            );
        }
        Ok(())
    }

    /// First path added, removed, or modified between `self` and `later`.
    #[must_use]
    pub(crate) fn first_difference(&self, later: &Self) -> Option<PathBuf> {
        later
            .files
            .iter()
            .find(|(path, stamp)| self.files.get(*path) != Some(*stamp))
            .map(|(path, _)| path.clone())
            .or_else(|| {
                self.files
                    .keys()
                    .find(|path| !later.files.contains_key(*path))
                    .cloned()
            })
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.files.len()
    }
}
