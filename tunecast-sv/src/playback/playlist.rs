//! Auto-advance target selection

use std::path::{Path, PathBuf};

use crate::catalog::playlist_key;

/// Next track to play after `finished`, in catalog order
///
/// Returns the path and whether the playlist wrapped to its first entry.
/// A `finished` path no longer in the catalog continues with the first path
/// sorting after it. `None` when the catalog is empty.
pub fn next_track(sorted: &[PathBuf], finished: &Path) -> Option<(PathBuf, bool)> {
    let first = sorted.first()?;

    let next = match sorted.iter().position(|p| p == finished) {
        Some(index) => sorted.get(index + 1),
        None => {
            let key = playlist_key(finished);
            sorted.iter().find(|p| playlist_key(p) > key)
        }
    };

    Some(match next {
        Some(path) => (path.clone(), false),
        None => (first.clone(), true),
    })
}
