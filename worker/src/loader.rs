//! Resolution of a model directory and handler into something the registry can load.

use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use anyhow::Context;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

const MANIFEST_DIR: &str = "MAR-INF";
const MANIFEST_FILE: &str = "MANIFEST.json";
const DEFAULT_FUNCTION: &str = "handle";

/// Model archive metadata, read from `MAR-INF/MANIFEST.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub runtime: Option<String>,
    #[serde(default)]
    pub model: Option<ManifestModel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestModel {
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub handler: Option<String>,
}

/// The service entry point a handler resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub file: PathBuf,
    pub function: String,
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file.display())
    }
}

/// Turns a model location plus handler into a manifest and an entry point.
pub trait ModelLoader {
    /// # Errors
    /// * `ServiceError::Invalid` for a bad manifest or handler.
    /// * `ServiceError::Other` for anything else (I/O, permissions).
    fn load(&self, model_path: &Path, handler: &str) -> Result<(Manifest, EntryPoint), ServiceError>;
}

/// Loads unpacked model archives from the local filesystem.
///
/// A handler is `<file>[:<function>]`, relative to the model directory; the
/// function defaults to `handle`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManifestLoader;

impl ModelLoader for ManifestLoader {
    fn load(&self, model_path: &Path, handler: &str) -> Result<(Manifest, EntryPoint), ServiceError> {
        fs::metadata(model_path)
            .with_context(|| format!("failed to access model directory {}", model_path.display()))?;

        let manifest = read_manifest(model_path)?;
        let (file, function) = parse_handler(handler)?;

        let file = model_path.join(file);
        if !file.is_file() {
            return Err(ServiceError::Invalid(format!(
                "Handler file {} does not exist",
                file.display()
            )));
        }

        debug!("handler resolved to {}:{function}", file.display());
        let entry_point = EntryPoint {
            file,
            function: function.to_string(),
        };

        Ok((manifest, entry_point))
    }
}

fn read_manifest(model_path: &Path) -> Result<Manifest, ServiceError> {
    let path = model_path.join(MANIFEST_DIR).join(MANIFEST_FILE);

    let bytes = match fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Manifest::default()),
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("failed to read manifest {}", path.display()))
                .into());
        }
    };

    serde_json::from_slice(&bytes)
        .map_err(|e| ServiceError::Invalid(format!("Invalid manifest {}: {e}", path.display())))
}

fn parse_handler(handler: &str) -> Result<(&str, &str), ServiceError> {
    let invalid = || ServiceError::Invalid(format!("Invalid handler: {handler}"));

    let (file, function) = match handler.trim().split_once(':') {
        Some((file, function)) => (file.trim(), function.trim()),
        None => (handler.trim(), DEFAULT_FUNCTION),
    };

    if file.is_empty() || function.is_empty() {
        return Err(invalid());
    }

    Ok((file, function))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_dir(handler_file: Option<&str>, manifest: Option<&str>) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();

        if let Some(file) = handler_file {
            fs::write(dir.path().join(file), "").unwrap();
        }

        if let Some(manifest) = manifest {
            fs::create_dir(dir.path().join(MANIFEST_DIR)).unwrap();
            fs::write(dir.path().join(MANIFEST_DIR).join(MANIFEST_FILE), manifest).unwrap();
        }

        dir
    }

    #[test]
    fn resolves_file_and_function() {
        let dir = model_dir(
            Some("service.py"),
            Some(r#"{"runtime":"python","model":{"modelName":"squeezenet"}}"#),
        );

        let (manifest, entry) = ManifestLoader.load(dir.path(), "service.py:predict").unwrap();

        assert_eq!(manifest.runtime.as_deref(), Some("python"));
        assert_eq!(entry.file, dir.path().join("service.py"));
        assert_eq!(entry.function, "predict");
    }

    #[test]
    fn missing_manifest_falls_back_to_defaults() {
        let dir = model_dir(Some("service.py"), None);

        let (manifest, entry) = ManifestLoader.load(dir.path(), "service.py").unwrap();

        assert_eq!(manifest, Manifest::default());
        assert_eq!(entry.function, DEFAULT_FUNCTION);
    }

    #[test]
    fn bad_handler_is_a_value_error() {
        let dir = model_dir(Some("service.py"), None);

        let err = ManifestLoader.load(dir.path(), ":handle").unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));

        let err = ManifestLoader.load(dir.path(), "missing.py").unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
    }

    #[test]
    fn corrupt_manifest_is_a_value_error() {
        let dir = model_dir(Some("service.py"), Some("{"));

        let err = ManifestLoader.load(dir.path(), "service.py").unwrap_err();
        assert!(matches!(err, ServiceError::Invalid(_)));
    }

    #[test]
    fn missing_model_directory_is_another_error() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("gone");

        let err = ManifestLoader.load(&gone, "service.py").unwrap_err();
        assert!(matches!(err, ServiceError::Other(_)));
    }
}
