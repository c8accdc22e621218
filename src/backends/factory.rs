// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Backend Selection
//!
//! Picks the engine factory at initialization time. Callers either pin a
//! backend explicitly or ask for automatic selection, which prefers the
//! native engine and falls back to the sandboxed artifact when the
//! native probe fails.

use std::path::PathBuf;

use crate::backends::native::NativeEngineFactory;
use crate::backends::wasm::{ArtifactLoader, SandboxedEngineFactory};
use crate::traits::engine::{EngineFactory, EngineResult};

/// Which engine realization to initialize.
#[derive(Debug, Clone)]
pub enum BackendPreference {
    /// In-process libsecp256k1.
    Native,
    /// Sandboxed engine loaded from the given artifact path.
    Sandboxed(PathBuf),
    /// Prefer native; fall back to the sandboxed artifact at the given
    /// path if the native probe fails.
    Auto(PathBuf),
}

/// Resolves a [`BackendPreference`] into an engine factory.
pub struct EngineSelector;

impl EngineSelector {
    pub fn select(preference: &BackendPreference) -> EngineResult<Box<dyn EngineFactory>> {
        match preference {
            BackendPreference::Native => {
                tracing::debug!(backend = "native", "engine backend selected");
                Ok(Box::new(NativeEngineFactory))
            }
            BackendPreference::Sandboxed(path) => {
                let artifact = ArtifactLoader::load_file(path)?;
                tracing::debug!(backend = "sandboxed", "engine backend selected");
                Ok(Box::new(SandboxedEngineFactory::new(artifact)))
            }
            BackendPreference::Auto(path) => {
                // Probe the native engine once; a working probe means
                // every later create() goes native too.
                match NativeEngineFactory.create() {
                    Ok(_) => {
                        tracing::debug!(backend = "native", "engine backend selected");
                        Ok(Box::new(NativeEngineFactory))
                    }
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            "native engine unavailable, falling back to sandboxed artifact"
                        );
                        let artifact = ArtifactLoader::load_file(path)?;
                        Ok(Box::new(SandboxedEngineFactory::new(artifact)))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_native_preference() {
        let factory = EngineSelector::select(&BackendPreference::Native).unwrap();
        assert_eq!(factory.kind(), "native");
    }

    #[test]
    fn test_auto_prefers_native() {
        let preference = BackendPreference::Auto(PathBuf::from("/nonexistent/engine.wasm"));
        let factory = EngineSelector::select(&preference).unwrap();
        assert_eq!(factory.kind(), "native");
    }

    #[test]
    fn test_sandboxed_preference_loads_artifact() {
        let bytes = wat::parse_str(r#"(module (memory (export "memory") 1))"#).unwrap();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();

        let preference = BackendPreference::Sandboxed(file.path().to_path_buf());
        let factory = EngineSelector::select(&preference).unwrap();
        assert_eq!(factory.kind(), "sandboxed");
    }

    #[test]
    fn test_sandboxed_preference_missing_artifact_fails() {
        let preference = BackendPreference::Sandboxed(PathBuf::from("/nonexistent/engine.wasm"));
        assert!(EngineSelector::select(&preference).is_err());
    }
}
