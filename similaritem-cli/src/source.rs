use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use similaritem::{Document, DocumentSource};

/// Every regular file directly inside one directory, one document per file.
///
/// Files are read in path order so reports are reproducible. The document id
/// is the file path.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    path: PathBuf,
}

impl DirectorySource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        DirectorySource {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn files(&self) -> Result<Vec<PathBuf>> {
        if !self.path.is_dir() {
            bail!("{} is not a directory", self.path.display());
        }
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.path)
            .with_context(|| format!("failed to list {}", self.path.display()))?
        {
            let path = entry
                .with_context(|| format!("failed to list {}", self.path.display()))?
                .path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl DocumentSource for DirectorySource {
    type Error = anyhow::Error;

    fn documents(&self) -> Result<Vec<Document>> {
        self.files()?
            .into_iter()
            .map(|path| {
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?;
                Ok(Document::from_text(path.display().to_string(), &text))
            })
            .collect()
    }
}
