use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::StorageError;

/// Renames `src` to `dst` without ever replacing an existing `dst`.
///
/// Tries `hard_link` + `remove_file` first: linking fails atomically when
/// the destination exists, and the final name appears with its full
/// content. Filesystems without hard links (or cross-device moves) fall
/// back to an exclusive-create copy. The source is only removed once the
/// destination is in place.
pub fn rename_no_clobber(src: &Path, dst: &Path) -> Result<(), StorageError> {
    if std::fs::symlink_metadata(dst).is_ok() {
        return Err(conflict(src, dst));
    }

    match std::fs::hard_link(src, dst) {
        Ok(()) => {
            std::fs::remove_file(src).map_err(|e| StorageError::MoveFile {
                from: src.to_path_buf(),
                to: dst.to_path_buf(),
                source: e,
            })?;
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(conflict(src, dst)),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::MoveFile {
            from: src.to_path_buf(),
            to: dst.to_path_buf(),
            source: e,
        }),
        Err(_) => copy_then_remove(src, dst),
    }
}

fn copy_then_remove(src: &Path, dst: &Path) -> Result<(), StorageError> {
    let move_err = |e: std::io::Error| StorageError::MoveFile {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source: e,
    };

    let mut reader = std::fs::File::open(src).map_err(move_err)?;
    let mut writer = match OpenOptions::new().write(true).create_new(true).open(dst) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Err(conflict(src, dst)),
        Err(e) => return Err(move_err(e)),
    };

    if let Err(e) = std::io::copy(&mut reader, &mut writer) {
        drop(writer);
        let _ = std::fs::remove_file(dst);
        return Err(move_err(e));
    }

    std::fs::remove_file(src).map_err(move_err)?;
    Ok(())
}

fn conflict(src: &Path, dst: &Path) -> StorageError {
    StorageError::RenameConflict {
        source_path: src.to_path_buf(),
        destination: dst.to_path_buf(),
    }
}

pub struct FileStorage {
    output_directory: PathBuf,
}

impl FileStorage {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Moves a finished document to `<output>/<filename>`.
    ///
    /// Returns [`StorageError::RenameConflict`] and leaves `source` untouched
    /// when the destination already exists.
    pub fn finalize(&self, source: &Path, filename: &str) -> Result<PathBuf, StorageError> {
        self.ensure_directory(&self.output_directory)?;
        let destination = self.output_directory.join(filename);
        rename_no_clobber(source, &destination)?;
        Ok(destination)
    }

    /// Moves `source` into the output directory under `filename`, or the
    /// first free `_N` variant of it.
    pub fn preserve(&self, source: &Path, filename: &str) -> Result<PathBuf, StorageError> {
        self.ensure_directory(&self.output_directory)?;

        let (base, ext) = if let Some(dot_pos) = filename.rfind('.') {
            (&filename[..dot_pos], Some(&filename[dot_pos..]))
        } else {
            (filename, None)
        };

        for counter in 1..=1000 {
            let try_filename = if counter == 1 {
                filename.to_string()
            } else {
                match ext {
                    Some(ext) => format!("{}_{}{}", base, counter, ext),
                    None => format!("{}_{}", base, counter),
                }
            };

            let try_path = self.output_directory.join(&try_filename);
            match rename_no_clobber(source, &try_path) {
                Ok(()) => return Ok(try_path),
                Err(StorageError::RenameConflict { .. }) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(StorageError::FileExists(self.output_directory.join(filename)))
    }

    /// Creates a fresh scratch directory for one document under
    /// `<output>/.work/`.
    pub fn create_work_directory(&self, base_name: &str) -> Result<PathBuf, StorageError> {
        let short_id = uuid::Uuid::new_v4().simple().to_string();
        let dir = self
            .output_directory
            .join(".work")
            .join(format!("{}-{}", base_name, &short_id[..8]));
        self.ensure_directory(&dir)?;
        Ok(dir)
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_finalize_moves_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join("out"));

        let source = temp_dir.path().join("assembled.pdf");
        std::fs::write(&source, b"%PDF-1.5").unwrap();

        let dest = storage.finalize(&source, "1_Fix_Ann.pdf").unwrap();

        assert!(!source.exists());
        assert_eq!(dest, temp_dir.path().join("out/1_Fix_Ann.pdf"));
        assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.5");
    }

    #[test]
    fn test_finalize_conflict_leaves_both_files() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let existing = temp_dir.path().join("1_Fix_Ann.pdf");
        std::fs::write(&existing, b"old").unwrap();
        let source = temp_dir.path().join("new.pdf");
        std::fs::write(&source, b"new").unwrap();

        let result = storage.finalize(&source, "1_Fix_Ann.pdf");

        match result {
            Err(StorageError::RenameConflict {
                source_path,
                destination,
            }) => {
                assert_eq!(source_path, source);
                assert_eq!(destination, existing);
            }
            other => panic!("Expected RenameConflict, got {:?}", other),
        }
        assert_eq!(std::fs::read(&existing).unwrap(), b"old");
        assert_eq!(std::fs::read(&source).unwrap(), b"new");
    }

    #[test]
    fn test_rename_missing_source_errors() {
        let temp_dir = TempDir::new().unwrap();
        let result = rename_no_clobber(
            &temp_dir.path().join("missing.pdf"),
            &temp_dir.path().join("dest.pdf"),
        );
        assert!(matches!(result, Err(StorageError::MoveFile { .. })));
        assert!(!temp_dir.path().join("dest.pdf").exists());
    }

    #[test]
    fn test_copy_fallback_refuses_existing_destination() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("a.pdf");
        let dst = temp_dir.path().join("b.pdf");
        std::fs::write(&src, b"a").unwrap();
        std::fs::write(&dst, b"b").unwrap();

        assert!(matches!(
            copy_then_remove(&src, &dst),
            Err(StorageError::RenameConflict { .. })
        ));
        assert!(src.exists());
        assert_eq!(std::fs::read(&dst).unwrap(), b"b");
    }

    #[test]
    fn test_copy_fallback_moves_content() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("a.pdf");
        let dst = temp_dir.path().join("b.pdf");
        std::fs::write(&src, b"content").unwrap();

        copy_then_remove(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(std::fs::read(&dst).unwrap(), b"content");
    }

    #[test]
    fn test_preserve_numbering_sequence() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path().join("out"));

        for i in 1..=3 {
            let source = temp_dir.path().join(format!("src{}.pdf", i));
            std::fs::write(&source, format!("Content {}", i)).unwrap();
            storage.preserve(&source, "WO_ocr.pdf").unwrap();
        }

        assert!(temp_dir.path().join("out/WO_ocr.pdf").exists());
        assert!(temp_dir.path().join("out/WO_ocr_2.pdf").exists());
        assert!(temp_dir.path().join("out/WO_ocr_3.pdf").exists());
    }

    #[test]
    fn test_work_directory_is_unique_per_call() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        let a = storage.create_work_directory("doc").unwrap();
        let b = storage.create_work_directory("doc").unwrap();

        assert!(a.is_dir());
        assert!(b.is_dir());
        assert_ne!(a, b);
        assert!(a.starts_with(temp_dir.path().join(".work")));
    }

    #[test]
    fn test_output_directory_accessor() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path());

        assert_eq!(storage.output_directory(), temp_dir.path());
    }
}
