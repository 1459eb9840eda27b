use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail, ensure};
use serde::Deserialize;

use crate::codec::EmbeddingEncoding;
use crate::embedder::DEFAULT_DIMENSIONS;
use crate::selector::{DEFAULT_TOP_K, RetrievalOptions};

pub const DEFAULT_CONFIG_FILE: &str = "rag.toml";

/// Settings shared by the CLI commands.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// SQLite file holding documents and chunks.
    pub database: PathBuf,
    pub top_k: usize,
    /// Minimum similarity for a chunk to be returned. Unset keeps every match.
    pub min_similarity: Option<f64>,
    /// Length of vectors produced by the local embedder.
    pub dimensions: usize,
    pub max_chunk_chars: usize,
    /// Encoding for newly stored embeddings.
    pub encoding: EmbeddingEncoding,
}

impl Settings {
    fn default_database() -> PathBuf {
        dirs::data_dir()
            .map(|dir| dir.join("rag-retrieval").join("corpus.db"))
            .unwrap_or_else(|| PathBuf::from("corpus.db"))
    }

    pub fn retrieval_options(&self) -> RetrievalOptions {
        RetrievalOptions {
            k: self.top_k,
            min_similarity: self.min_similarity,
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.top_k > 0, "top_k must be at least 1");
        ensure!(self.dimensions > 0, "dimensions must be at least 1");
        ensure!(self.max_chunk_chars > 0, "max_chunk_chars must be at least 1");
        if let Some(threshold) = self.min_similarity {
            ensure!(
                (-1.0..=1.0).contains(&threshold),
                "min_similarity must lie in [-1, 1], got {threshold}"
            );
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: Self::default_database(),
            top_k: DEFAULT_TOP_K,
            min_similarity: None,
            dimensions: DEFAULT_DIMENSIONS,
            max_chunk_chars: 1000,
            encoding: EmbeddingEncoding::default(),
        }
    }
}

/// Loads settings from `explicit`, or from `rag.toml` in `base_dir` when present.
///
/// An explicit path that does not exist is an error; a missing default file
/// falls back to built-in defaults.
pub fn load_settings(explicit: Option<&Path>, base_dir: &Path) -> Result<Settings> {
    let (candidate, explicit_provided) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (base_dir.join(DEFAULT_CONFIG_FILE), false),
    };

    if candidate.exists() {
        let raw = std::fs::read_to_string(&candidate).with_context(|| {
            format!("failed to read configuration from {}", candidate.display())
        })?;
        let parsed = toml::from_str(&raw).with_context(|| {
            format!(
                "failed to parse TOML configuration at {}",
                candidate.display()
            )
        })?;
        Ok(parsed)
    } else if explicit_provided {
        bail!("configuration file not found at {}", candidate.display());
    } else {
        Ok(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{NamedTempFile, tempdir};

    #[test]
    fn load_settings_returns_default_when_missing() {
        let dir = tempdir().expect("temp dir");
        let settings = load_settings(None, dir.path()).expect("default settings");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.retrieval_options(), RetrievalOptions::default());
    }

    #[test]
    fn load_settings_errors_for_missing_explicit_path() {
        let dir = tempdir().expect("temp dir");
        let result = load_settings(Some(Path::new("definitely_missing.toml")), dir.path());
        assert!(result.is_err());
    }

    #[test]
    fn load_settings_parses_toml_payload() {
        let file = NamedTempFile::new().expect("temp file");
        let path = file.into_temp_path();
        std::fs::write(
            &path,
            r#"database = "data/test.db"
top_k = 5
min_similarity = 0.5
encoding = "json"
"#,
        )
        .expect("write config");

        let dir = tempdir().expect("temp dir");
        let settings = load_settings(Some(&*path), dir.path()).expect("parsed settings");
        assert_eq!(settings.database, PathBuf::from("data/test.db"));
        assert_eq!(settings.encoding, EmbeddingEncoding::Json);
        assert_eq!(settings.dimensions, DEFAULT_DIMENSIONS);
        assert_eq!(
            settings.retrieval_options(),
            RetrievalOptions::top_k(5).with_min_similarity(0.5)
        );
    }

    #[test]
    fn default_file_in_base_dir_is_picked_up() {
        let dir = tempdir().expect("temp dir");
        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "max_chunk_chars = 250\n")
            .expect("write config");
        let settings = load_settings(None, dir.path()).expect("settings");
        assert_eq!(settings.max_chunk_chars, 250);
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut settings = Settings::default();
        assert!(settings.validate().is_ok());

        settings.min_similarity = Some(1.5);
        assert!(settings.validate().is_err());

        settings.min_similarity = None;
        settings.top_k = 0;
        assert!(settings.validate().is_err());
    }
}
