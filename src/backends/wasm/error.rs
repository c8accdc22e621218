// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error types for the sandboxed engine backend.
//!
//! Covers artifact loading, binary validation, compilation, and
//! instantiation. All errors implement `std::error::Error` via the
//! `thiserror` crate. Runtime failures during operations are reported as
//! [`EngineError`](crate::traits::engine::EngineError) instead.

use thiserror::Error;

use crate::traits::engine::EngineError;

/// Errors from loading and instantiating the sandboxed engine artifact.
#[derive(Error, Debug)]
pub enum WasmError {
    /// Invalid or malformed WASM binary format.
    #[error("Invalid WASM binary: {0}")]
    InvalidWasmBinary(String),

    /// Component Model or other non-core-module encodings.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Module compilation or instantiation error.
    #[error("WASM module error: {0}")]
    ModuleError(String),

    /// Memory allocation or access error in WASM linear memory.
    #[error("Memory error: {0}")]
    MemoryError(String),

    /// File I/O error during artifact loading.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Wasmtime runtime error.
    #[error("WASM execution error: {0}")]
    ExecutionError(#[from] wasmtime::Error),

    /// The artifact does not satisfy the engine ABI (size limits,
    /// missing exports, unexpected imports).
    #[error("Invalid input: {0}")]
    ValidationError(String),

    /// Wasmtime engine creation or configuration error.
    #[error("Engine creation error: {0}")]
    EngineError(String),

    /// WASM binary parsing error from wasmparser.
    #[error("WASM parser error: {0}")]
    ParserError(#[from] wasmparser::BinaryReaderError),
}

/// Result type alias for WASM backend operations.
pub type WasmResult<T> = Result<T, WasmError>;

impl From<WasmError> for EngineError {
    fn from(err: WasmError) -> Self {
        EngineError::Load(err.to_string())
    }
}
