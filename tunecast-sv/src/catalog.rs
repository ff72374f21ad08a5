//! Track catalog
//!
//! Directory-derived listing of folders and raw PCM tracks. Every call reads
//! the filesystem again; nothing is cached, so there is nothing to invalidate.
//!
//! Layout: `<root>/<folder>/<track>.pcm`. Only immediate subdirectories of the
//! root are folders and only `.pcm` files directly inside them are tracks.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::warn;
use tunecast_common::{AudioFormat, PCM_EXTENSION};

use crate::error::{Error, Result};

/// One playable raw PCM file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub folder: String,
    /// File name including the `.pcm` suffix
    pub name: String,
    /// Whole seconds of audio (floor of size / bytes per second)
    pub duration: u64,
}

/// A folder of tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub name: String,
    pub track_count: usize,
}

/// Full catalog listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackList {
    pub folders: Vec<Folder>,
    pub tracks: Vec<Track>,
}

/// Scanned folder with its qualifying files, sorted by name
struct ScannedFolder {
    name: String,
    files: Vec<ScannedFile>,
}

struct ScannedFile {
    name: String,
    path: PathBuf,
    size: u64,
}

/// Catalog rooted at a directory
#[derive(Debug, Clone)]
pub struct TrackCatalog {
    root: PathBuf,
    format: AudioFormat,
}

impl TrackCatalog {
    pub fn new(root: impl Into<PathBuf>, format: AudioFormat) -> Self {
        Self {
            root: root.into(),
            format,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// List folders and tracks
    ///
    /// Folders are sorted by name, tracks by folder then file name. A folder's
    /// count covers only its own qualifying files.
    pub async fn list(&self) -> Result<TrackList> {
        let scanned = self.scan(FolderErrors::Fail).await?;
        let mut list = TrackList::default();

        for folder in scanned {
            list.folders.push(Folder {
                name: folder.name.clone(),
                track_count: folder.files.len(),
            });
            list.tracks.extend(folder.files.into_iter().map(|file| Track {
                folder: folder.name.clone(),
                name: file.name,
                duration: self.format.duration_secs(file.size),
            }));
        }

        Ok(list)
    }

    /// Every track path, in lexicographic order of the full path
    ///
    /// This is the playlist order used for seeding and auto-advance. Folders
    /// that cannot be read are left out; only an unreadable root fails.
    pub async fn sorted_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = self
            .scan(FolderErrors::Skip)
            .await?
            .into_iter()
            .flat_map(|folder| folder.files.into_iter().map(|file| file.path))
            .collect();
        paths.sort_by_cached_key(|p| playlist_key(p));
        Ok(paths)
    }

    /// Describe one track by its path under the root
    ///
    /// Fails with NotFound if the path is outside the catalog layout, is not a
    /// `.pcm` file, or cannot be read.
    pub async fn describe(&self, path: &Path) -> Result<Track> {
        let not_found = || Error::NotFound(format!("Track file not found: {}", path.display()));

        let relative = path.strip_prefix(&self.root).map_err(|_| not_found())?;
        let parts: Vec<&str> = relative
            .components()
            .map(|c| match c {
                Component::Normal(part) => part.to_str(),
                _ => None,
            })
            .collect::<Option<Vec<_>>>()
            .ok_or_else(not_found)?;

        let [folder, name] = parts.as_slice() else {
            return Err(not_found());
        };
        if !has_pcm_extension(path) {
            return Err(not_found());
        }

        let metadata = tokio::fs::metadata(path).await.map_err(|_| not_found())?;
        if !metadata.is_file() {
            return Err(not_found());
        }

        Ok(Track {
            folder: folder.to_string(),
            name: name.to_string(),
            duration: self.format.duration_secs(metadata.len()),
        })
    }

    /// Map a control request's folder and track names onto a catalog path
    ///
    /// Appends the `.pcm` suffix when absent. Rejects names that are empty or
    /// would escape their directory.
    pub fn resolve(&self, folder: &str, track: &str) -> Result<PathBuf> {
        validate_name("folder", folder)?;
        validate_name("track", track)?;

        let file_name = if has_pcm_suffix(track) {
            track.to_string()
        } else {
            format!("{}.{}", track, PCM_EXTENSION)
        };

        Ok(self.root.join(folder).join(file_name))
    }

    /// Immediate subdirectories of the root as `(name, path)`
    async fn folder_dirs(&self) -> Result<Vec<(String, PathBuf)>> {
        let root_error = |e: std::io::Error| {
            Error::Catalog(format!("Cannot read catalog root {}: {}", self.root.display(), e))
        };

        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(root_error)?;
        let mut dirs = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(root_error)? {
            let path = entry.path();
            if !tokio::fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false) {
                continue;
            }
            dirs.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
        Ok(dirs)
    }

    async fn scan(&self, on_folder_error: FolderErrors) -> Result<Vec<ScannedFolder>> {
        let dirs = self.folder_dirs().await?;
        scan_folders(dirs, on_folder_error).await
    }
}

/// What a scan does with a folder that cannot be read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FolderErrors {
    /// Fail the whole scan
    Fail,
    /// Leave the folder out and keep going
    Skip,
}

async fn scan_folders(
    dirs: Vec<(String, PathBuf)>,
    on_folder_error: FolderErrors,
) -> Result<Vec<ScannedFolder>> {
    let mut folders = Vec::with_capacity(dirs.len());
    for (name, path) in dirs {
        match scan_folder(&path).await {
            Ok(files) => folders.push(ScannedFolder { name, files }),
            Err(e) if on_folder_error == FolderErrors::Skip => {
                warn!("Skipping folder {}: {}", name, e);
            }
            Err(e) => return Err(e),
        }
    }

    folders.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(folders)
}

async fn scan_folder(dir: &Path) -> Result<Vec<ScannedFile>> {
    let read_error =
        |e: std::io::Error| Error::Catalog(format!("Cannot read folder {}: {}", dir.display(), e));

    let mut entries = tokio::fs::read_dir(dir).await.map_err(read_error)?;
    let mut files = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(read_error)? {
        let path = entry.path();
        if !has_pcm_extension(&path) {
            continue;
        }

        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => files.push(ScannedFile {
                name: entry.file_name().to_string_lossy().into_owned(),
                path,
                size: metadata.len(),
            }),
            // Nested directories named *.pcm are not tracks
            Ok(_) => {}
            Err(e) => warn!("Error getting track info for {}: {}", path.display(), e),
        }
    }

    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

/// String form of a path used for playlist ordering
pub(crate) fn playlist_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn has_pcm_extension(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == PCM_EXTENSION)
}

fn has_pcm_suffix(name: &str) -> bool {
    name.strip_suffix(PCM_EXTENSION)
        .map_or(false, |stem| stem.ends_with('.'))
}

fn validate_name(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::BadRequest(format!("{} must not be empty", field)));
    }
    if value == "." || value == ".." || value.contains(['/', '\\', '\0']) {
        return Err(Error::BadRequest(format!("Invalid {} name: {}", field, value)));
    }
    Ok(())
}
