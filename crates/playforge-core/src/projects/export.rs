//! In-memory zip export of a project folder

use std::fs;
use std::io::{self, Cursor, Write};
use std::path::Path;

use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{Error, Result};
use crate::paths;

fn zip_error(e: zip::result::ZipError) -> Error {
    Error::Storage(io::Error::other(e))
}

/// Zip every regular file under `root`, named relative to `root`
pub fn zip_directory(root: &Path) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut files = 0usize;
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = paths::relative_display(root, entry.path()) else {
            continue;
        };

        writer.start_file(name, options).map_err(zip_error)?;
        writer.write_all(&fs::read(entry.path())?)?;
        files += 1;
    }

    let cursor = writer.finish().map_err(zip_error)?;
    tracing::debug!(root = %root.display(), files, "Built project archive");
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    #[test]
    fn test_zip_directory_uses_relative_names() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.html"), "<h1>Ciao</h1>").unwrap();
        fs::create_dir_all(dir.path().join("assets").join("img")).unwrap();
        fs::write(dir.path().join("assets").join("img").join("a.svg"), "<svg/>").unwrap();
        fs::create_dir_all(dir.path().join("empty")).unwrap();

        let bytes = zip_directory(dir.path()).expect("Failed to zip");
        let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("Invalid archive");

        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, ["assets/img/a.svg", "index.html"]);
        for name in &names {
            assert!(!name.starts_with('/'));
            assert!(!name.contains(".."));
        }

        let mut content = String::new();
        archive
            .by_name("index.html")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "<h1>Ciao</h1>");
    }

    #[test]
    fn test_zip_empty_directory() {
        let dir = TempDir::new().unwrap();
        let bytes = zip_directory(dir.path()).expect("Failed to zip");
        let archive = ZipArchive::new(Cursor::new(bytes)).expect("Invalid archive");
        assert_eq!(archive.len(), 0);
    }
}
