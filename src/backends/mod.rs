// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Curve Engine Backends
//!
//! Two interchangeable realizations of the engine capability contract:
//! - `native`: in-process libsecp256k1 via the `secp256k1` crate
//! - `wasm`: the same engine compiled to WASM, run under wasmtime
//!
//! `factory` selects between them at initialization time.

pub mod factory;
pub mod native;
pub mod wasm;

pub use factory::{BackendPreference, EngineSelector};
pub use native::{NativeEngine, NativeEngineFactory};
pub use wasm::{SandboxedEngine, SandboxedEngineFactory};
