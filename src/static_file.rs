//! Static-file mapper.
//!
//! Maps a resolved file under the resources root into memory via `memmap2`, so the
//! reactor can write it out as a gather-write `IoSlice` (`crate::connection`) without
//! copying it into the connection's write buffer. `memmap2` isn't part of the teacher's
//! dependency graph — it's the standard crate for exactly this job and is added on its
//! own merits (see DESIGN.md).

use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};

use memmap2::Mmap;

/// A request path mapped into memory, ready to be handed to `Connection::write` as a
/// gather-write slice.
pub struct StaticFile {
    mmap: Mmap,
}

impl StaticFile {
    /// Opens and maps `path`. Zero-length files map to an empty slice rather than
    /// failing, since `Mmap::map` rejects zero-length mappings.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();

        let mmap = if len == 0 {
            // SAFETY: an empty anonymous-backed mapping is never read past offset 0.
            unsafe { memmap2::MmapOptions::new().len(0).map(&file)? }
        } else {
            // SAFETY: the file is opened read-only for the lifetime of this mapping and
            // not expected to be truncated concurrently by this process.
            unsafe { Mmap::map(&file)? }
        };

        Ok(Self { mmap })
    }

    /// The mapped file contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    /// Length of the mapped file.
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}

/// Joins `root` and the URL-decoded `request_path`, rejecting any path containing a
/// parent-directory (`..`) or root (`/`) component once split, which would otherwise
/// allow escaping `root`.
pub fn resolve(root: &Path, request_path: &str) -> Option<PathBuf> {
    let request_path = request_path.strip_prefix('/').unwrap_or(request_path);
    let request_path = if request_path.is_empty() {
        "index.html"
    } else {
        request_path
    };

    let mut resolved = root.to_path_buf();
    for component in Path::new(request_path).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    Some(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_joins_root_and_relative_path() {
        let root = Path::new("/srv/resources");
        assert_eq!(
            Some(PathBuf::from("/srv/resources/index.html")),
            resolve(root, "/")
        );
        assert_eq!(
            Some(PathBuf::from("/srv/resources/css/style.css")),
            resolve(root, "/css/style.css")
        );
    }

    #[test]
    fn resolve_rejects_parent_directory_escape() {
        let root = Path::new("/srv/resources");
        assert_eq!(None, resolve(root, "/../etc/passwd"));
        assert_eq!(None, resolve(root, "/css/../../etc/passwd"));
    }
}
