use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Where label files live. Keys are bare filenames such as `cat.txt`.
pub trait AnnotationStore {
    fn list(&self) -> Result<Vec<String>, StoreError>;
    fn read(&self, filename: &str) -> Result<String, StoreError>;
    fn write(&self, filename: &str, content: &str) -> Result<(), StoreError>;
}

const EXTENSIONS: [&str; 2] = ["txt", "json"];

fn extension(filename: &str) -> Option<&str> {
    Path::new(filename).extension().and_then(|e| e.to_str())
}

/// A labels folder on local disk.
#[derive(Clone, Debug)]
pub struct FolderStore {
    root: PathBuf,
}

impl FolderStore {
    /// Opens `root`, creating it when missing.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, filename: &str) -> Result<PathBuf, StoreError> {
        let is_plain = !filename.is_empty()
            && filename != "."
            && filename != ".."
            && !filename.contains(['/', '\\'])
            && !filename.contains("..");
        if !is_plain {
            return Err(StoreError::InvalidFilename(filename.to_string()));
        }
        Ok(self.root.join(filename))
    }
}

impl AnnotationStore for FolderStore {
    fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            if extension(&name).is_some_and(|e| EXTENSIONS.contains(&e)) {
                files.push(name);
            }
        }
        files.sort();
        Ok(files)
    }

    fn read(&self, filename: &str) -> Result<String, StoreError> {
        let path = self.path_for(filename)?;
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(filename.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, filename: &str, content: &str) -> Result<(), StoreError> {
        let path = self.path_for(filename)?;
        match extension(filename) {
            Some("json") => {
                let value: serde_json::Value =
                    serde_json::from_str(content).map_err(StoreError::InvalidJson)?;
                let pretty = serde_json::to_string_pretty(&value).map_err(StoreError::InvalidJson)?;
                std::fs::write(&path, pretty)?;
            }
            Some("txt") => std::fs::write(&path, content)?,
            other => {
                return Err(StoreError::InvalidExtension(
                    other.unwrap_or_default().to_string(),
                ))
            }
        }
        log::debug!("Wrote {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FolderStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FolderStore::open(dir.path().join("labels")).unwrap();
        (dir, store)
    }

    #[test]
    fn open_creates_the_folder() {
        let (_dir, store) = store();
        assert!(store.root().is_dir());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn text_is_written_verbatim_and_listed() {
        let (_dir, store) = store();
        store.write("b.txt", "0 0.5 0.5 0.1 0.1").unwrap();
        store.write("a.json", r#"{"annotations":[]}"#).unwrap();
        std::fs::write(store.root().join("notes.md"), "ignored").unwrap();

        assert_eq!(store.list().unwrap(), vec!["a.json", "b.txt"]);
        assert_eq!(store.read("b.txt").unwrap(), "0 0.5 0.5 0.1 0.1");
    }

    #[test]
    fn json_is_validated_and_pretty_printed() {
        let (_dir, store) = store();
        store.write("a.json", r#"{"annotations":[]}"#).unwrap();
        assert_eq!(store.read("a.json").unwrap(), "{\n  \"annotations\": []\n}");

        assert!(matches!(
            store.write("b.json", "{oops"),
            Err(StoreError::InvalidJson(_))
        ));
    }

    #[test]
    fn bad_names_are_rejected() {
        let (_dir, store) = store();
        assert!(matches!(
            store.write("../escape.txt", ""),
            Err(StoreError::InvalidFilename(_))
        ));
        assert!(matches!(
            store.write("nested/a.txt", ""),
            Err(StoreError::InvalidFilename(_))
        ));
        assert!(matches!(store.write("", ""), Err(StoreError::InvalidFilename(_))));
        assert!(matches!(
            store.write("image.png", ""),
            Err(StoreError::InvalidExtension(e)) if e == "png"
        ));
        assert!(matches!(
            store.write("noext", ""),
            Err(StoreError::InvalidExtension(_))
        ));
    }

    #[test]
    fn missing_file_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(store.read("nope.txt"), Err(StoreError::NotFound(n)) if n == "nope.txt"));
    }
}
