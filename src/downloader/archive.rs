//! Zip packaging of a downloaded directory tree.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::error::{Error, Result};
use crate::utils::relative_slash_path;

/// Zip every file under `source_dir` into `{uuid}.zip` next to it.
///
/// Entry names are relative to `source_dir`. A failed run removes the
/// partial archive. Blocking; call it through `spawn_blocking` from async code.
pub fn package_archive(source_dir: &Path) -> Result<PathBuf> {
    let parent = source_dir.parent().ok_or_else(|| {
        Error::Other(format!(
            "cannot place an archive next to {}",
            source_dir.display()
        ))
    })?;
    let archive_path = parent.join(format!("{}.zip", Uuid::new_v4()));

    match write_archive(source_dir, &archive_path) {
        Ok(entries) => {
            tracing::info!(
                archive = %archive_path.display(),
                entries,
                "packaged archive"
            );
            Ok(archive_path)
        }
        Err(e) => {
            std::fs::remove_file(&archive_path).ok();
            Err(e)
        }
    }
}

fn write_archive(source_dir: &Path, archive_path: &Path) -> Result<usize> {
    let file = File::create(archive_path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut entries = 0;
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = relative_slash_path(source_dir, entry.path()) else {
            continue;
        };

        zip.start_file(name, options)?;
        let contents = std::fs::read(entry.path())?;
        zip.write_all(&contents)?;
        entries += 1;
    }

    zip.finish()?;
    Ok(entries)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::tempdir;

    #[test]
    fn archive_holds_relative_paths_next_to_source() {
        let dir = tempdir().unwrap();
        let posts = dir.path().join("posts");
        std::fs::create_dir_all(posts.join("rec1")).unwrap();
        std::fs::create_dir_all(posts.join("rec2")).unwrap();
        std::fs::write(posts.join("rec1/ABC.jpg"), b"one").unwrap();
        std::fs::write(posts.join("rec2/DEF_1.jpg"), b"two").unwrap();
        std::fs::write(posts.join("rec2/DEF.txt"), b"caption").unwrap();

        let archive_path = package_archive(&posts).unwrap();

        assert_eq!(archive_path.parent().unwrap(), dir.path());
        let stem = archive_path.file_stem().unwrap().to_str().unwrap();
        assert!(Uuid::parse_str(stem).is_ok());

        let mut archive = zip::ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        let mut names: Vec<_> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["rec1/ABC.jpg", "rec2/DEF.txt", "rec2/DEF_1.jpg"]);

        let mut contents = String::new();
        archive
            .by_name("rec2/DEF.txt")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "caption");
    }

    #[test]
    fn empty_tree_gives_empty_archive() {
        let dir = tempdir().unwrap();
        let posts = dir.path().join("posts");
        std::fs::create_dir_all(&posts).unwrap();

        let archive_path = package_archive(&posts).unwrap();
        let archive = zip::ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        assert_eq!(archive.len(), 0);
    }

    #[test]
    fn each_archive_gets_a_fresh_name() {
        let dir = tempdir().unwrap();
        let posts = dir.path().join("posts");
        std::fs::create_dir_all(&posts).unwrap();

        let first = package_archive(&posts).unwrap();
        let second = package_archive(&posts).unwrap();
        assert_ne!(first, second);
    }
}
