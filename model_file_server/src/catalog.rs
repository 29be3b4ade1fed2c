use std::{
    collections::BTreeSet,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use tokio::fs::File;

use crate::{config::AppConfig, error::ServiceError};

/// The allow-listed artifacts and the directory they live in.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    base_dir: PathBuf,
    allowed: BTreeSet<String>,
}

/// An allow-listed file opened for reading.
#[derive(Debug)]
pub struct OpenArtifact {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub file: File,
}

impl ModelCatalog {
    pub fn new<I, S>(base_dir: impl Into<PathBuf>, allowed: I) -> Result<Self, ServiceError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed: BTreeSet<String> = allowed.into_iter().map(Into::into).collect();
        for name in &allowed {
            validate_name(name)?;
        }
        Ok(Self {
            base_dir: base_dir.into(),
            allowed,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        Self::new(config.model_dir.clone(), config.allowed_files.iter().cloned())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn allowed(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }

    pub fn is_allowed(&self, filename: &str) -> bool {
        self.allowed.contains(filename)
    }

    /// Checks `filename` against the allow-list, then against the disk.
    /// The order matters: an unlisted name is rejected even when it exists.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf, ServiceError> {
        if !self.is_allowed(filename) {
            return Err(ServiceError::NotAllowed(filename.to_string()));
        }
        Ok(self.base_dir.join(filename))
    }

    pub async fn open(&self, filename: &str) -> Result<OpenArtifact, ServiceError> {
        let path = self.resolve(filename)?;

        let file = match File::open(&path).await {
            Ok(file) => file,
            Err(err) if is_missing(&err) => {
                return Err(ServiceError::Missing(filename.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        // Metadata comes from the open handle so the size matches what is streamed.
        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(ServiceError::Missing(filename.to_string()));
        }

        Ok(OpenArtifact {
            name: filename.to_string(),
            path,
            size_bytes: metadata.len(),
            file,
        })
    }
}

fn is_missing(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory)
}

/// Allow-list entries must be a single plain path component.
fn validate_name(name: &str) -> Result<(), ServiceError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.chars().any(char::is_control);
    if invalid {
        return Err(ServiceError::Config(format!(
            "allow-listed name {name:?} is not a plain file name"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    use super::*;

    fn catalog(dir: &TempDir, names: &[&str]) -> ModelCatalog {
        ModelCatalog::new(dir.path(), names.iter().copied()).unwrap()
    }

    #[test]
    fn rejects_names_with_path_components() {
        let bad_names = [
            "", ".", "..", "../a.bin", "sub/a.bin", "sub\\a.bin", "a\0.bin", "a\n.bin",
        ];
        for bad in bad_names {
            let result = ModelCatalog::new("/tmp", [bad]);
            assert!(
                matches!(result, Err(ServiceError::Config(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn resolve_stays_under_base_dir() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir, &["a.bin"]);

        let path = catalog.resolve("a.bin").unwrap();
        assert_eq!(path, dir.path().join("a.bin"));
        assert!(path.starts_with(catalog.base_dir()));
    }

    #[test]
    fn resolve_is_case_sensitive() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir, &["a.bin"]);

        assert!(matches!(
            catalog.resolve("A.BIN"),
            Err(ServiceError::NotAllowed(_))
        ));
    }

    #[tokio::test]
    async fn unlisted_file_is_rejected_even_if_present() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.bin"), b"secret").unwrap();
        let catalog = catalog(&dir, &["a.bin"]);

        let err = catalog.open("b.bin").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotAllowed(name) if name == "b.bin"));
    }

    #[tokio::test]
    async fn listed_but_absent_file_is_missing() {
        let dir = TempDir::new().unwrap();
        let catalog = catalog(&dir, &["a.bin"]);

        let err = catalog.open("a.bin").await.unwrap_err();
        assert!(matches!(err, ServiceError::Missing(name) if name == "a.bin"));
    }

    #[tokio::test]
    async fn listed_directory_is_missing() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("a.bin")).unwrap();
        let catalog = catalog(&dir, &["a.bin"]);

        let err = catalog.open("a.bin").await.unwrap_err();
        assert!(matches!(err, ServiceError::Missing(_)));
    }

    #[tokio::test]
    async fn missing_base_dir_reports_missing_file() {
        let dir = TempDir::new().unwrap();
        let catalog = ModelCatalog::new(dir.path().join("nope"), ["a.bin"]).unwrap();

        let err = catalog.open("a.bin").await.unwrap_err();
        assert!(matches!(err, ServiceError::Missing(_)));
    }

    #[tokio::test]
    async fn open_returns_size_and_contents() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.bin"), b"XYZ").unwrap();
        let catalog = catalog(&dir, &["a.bin"]);

        let mut artifact = catalog.open("a.bin").await.unwrap();
        assert_eq!(artifact.name, "a.bin");
        assert_eq!(artifact.size_bytes, 3);

        let mut buf = Vec::new();
        artifact.file.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"XYZ");
    }
}
