// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Sandboxed Curve Engine Backend
//!
//! Runs the curve engine inside a wasmtime sandbox. The artifact is a
//! self-contained core WASM module exporting the engine ABI; this
//! backend loads and validates it, instantiates it per engine, and
//! marshals every operation through the module's linear memory.

pub(crate) mod arena;
pub mod engine;
pub mod error;
pub mod module_loader;

pub use engine::{SandboxedEngine, SandboxedEngineFactory};
pub use error::{WasmError, WasmResult};
pub use module_loader::{ArtifactLoader, LoadedArtifact};
