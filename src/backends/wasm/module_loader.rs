// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Engine Artifact Loading and Validation
//!
//! Loads the compiled curve-engine WASM binary and prepares it for
//! instantiation:
//! - File I/O and size validation
//! - Spec-compliant encoding detection via wasmparser (core modules
//!   only; Component Model binaries are rejected)
//! - Import rejection: the engine ABI is pure compute, so a conforming
//!   artifact imports nothing (no WASI, no host functions)
//! - Wasmtime engine creation with a hardened configuration

use std::path::Path;

use wasmparser::{Encoding, Parser, Payload};
use wasmtime::{Config, Engine, Module};

use crate::backends::wasm::error::{WasmError, WasmResult};

/// Maximum allowed engine artifact size (16MB)
const MAX_ARTIFACT_SIZE: usize = 16 * 1024 * 1024;

/// A compiled engine artifact, ready for per-instance instantiation.
pub struct LoadedArtifact {
    pub engine: Engine,
    pub module: Module,
}

/// Loader for the sandboxed engine artifact.
pub struct ArtifactLoader;

impl ArtifactLoader {
    /// Load and validate an engine artifact from the filesystem.
    pub fn load_file<P: AsRef<Path>>(path: P) -> WasmResult<LoadedArtifact> {
        let bytes = std::fs::read(path.as_ref()).map_err(WasmError::IoError)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            size = bytes.len(),
            "loading engine artifact"
        );
        Self::load_bytes(&bytes)
    }

    /// Load and validate an engine artifact from raw bytes.
    pub fn load_bytes(bytes: &[u8]) -> WasmResult<LoadedArtifact> {
        if bytes.len() > MAX_ARTIFACT_SIZE {
            return Err(WasmError::ValidationError(format!(
                "engine artifact too large: {} bytes (max: {} bytes)",
                bytes.len(),
                MAX_ARTIFACT_SIZE
            )));
        }

        Self::check_encoding(bytes)?;

        let engine = Self::create_engine()?;
        let module =
            Module::new(&engine, bytes).map_err(|e| WasmError::ModuleError(e.to_string()))?;

        Self::reject_imports(&module)?;

        Ok(LoadedArtifact { engine, module })
    }

    /// Verify the binary is a classic core WASM module.
    fn check_encoding(bytes: &[u8]) -> WasmResult<()> {
        let parser = Parser::new(0);
        let mut encoding = None;

        for payload in parser.parse_all(bytes) {
            if let Payload::Version { encoding: enc, .. } = payload? {
                encoding = Some(enc);
                break;
            }
        }

        match encoding {
            Some(Encoding::Module) => Ok(()),
            Some(Encoding::Component) => Err(WasmError::UnsupportedEncoding(
                "Component Model binaries are not supported; the engine ABI requires a core WASM module".to_string(),
            )),
            None => Err(WasmError::InvalidWasmBinary(
                "missing WASM version header".to_string(),
            )),
        }
    }

    /// A conforming engine artifact is self-contained; any import means
    /// the binary was built against capabilities the sandbox refuses.
    fn reject_imports(module: &Module) -> WasmResult<()> {
        if let Some(import) = module.imports().next() {
            return Err(WasmError::ValidationError(format!(
                "engine artifact must not import anything, found '{}::{}'",
                import.module(),
                import.name()
            )));
        }
        Ok(())
    }

    /// Create a wasmtime engine with a security-focused configuration.
    fn create_engine() -> WasmResult<Engine> {
        let mut config = Config::new();

        config.wasm_threads(false);
        config.wasm_simd(false);
        config.wasm_relaxed_simd(false);
        config.wasm_multi_memory(false);
        config.wasm_memory64(false);
        config.wasm_component_model(false);

        // Fuel metering bounds each engine call; the sandboxed engine
        // refills the budget before every operation.
        config.consume_fuel(true);
        config.epoch_interruption(false);

        Engine::new(&config).map_err(|e| WasmError::EngineError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_engine_creation() {
        assert!(ArtifactLoader::create_engine().is_ok());
    }

    #[test]
    fn test_artifact_size_validation() {
        let oversized = vec![0u8; MAX_ARTIFACT_SIZE + 1];
        let result = ArtifactLoader::load_bytes(&oversized);

        match result {
            Err(WasmError::ValidationError(msg)) => assert!(msg.contains("too large")),
            other => panic!("expected ValidationError, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_invalid_binary_rejected() {
        let result = ArtifactLoader::load_bytes(b"not wasm at all");
        assert!(result.is_err());
    }

    #[test]
    fn test_import_rejection() {
        let bytes = wat::parse_str(
            r#"
            (module
                (import "env" "host_fn" (func))
                (memory (export "memory") 1)
            )
            "#,
        )
        .unwrap();

        let result = ArtifactLoader::load_bytes(&bytes);
        match result {
            Err(WasmError::ValidationError(msg)) => {
                assert!(msg.contains("must not import"));
                assert!(msg.contains("host_fn"));
            }
            other => panic!("expected ValidationError, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_load_minimal_module_from_file() {
        let bytes = wat::parse_str(r#"(module (memory (export "memory") 1))"#).unwrap();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();

        let artifact = ArtifactLoader::load_file(file.path()).unwrap();
        assert!(artifact.module.imports().next().is_none());
    }
}
