// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! # secp256k1-bridge
//!
//! A validated façade over secp256k1 elliptic-curve operations, backed
//! by one of two interchangeable engines:
//! - a **native** engine using in-process libsecp256k1 bindings
//! - a **sandboxed** engine running the same curve code as a WASM
//!   module under wasmtime, with all operands marshaled through the
//!   sandbox's linear memory
//!
//! The façade validates every argument before the engine is invoked,
//! interprets the engines' shared status-code convention through
//! per-operation tables, and enforces a one-shot initialization
//! lifecycle.
//!
//! ```no_run
//! use secp256k1_bridge::{BackendPreference, Output, Secp256k1};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut secp = Secp256k1::with_preference(&BackendPreference::Native)?;
//! secp.init()?;
//!
//! let seckey = [0x01u8; 32];
//! if secp.private_key_verify(&seckey)? {
//!     let pubkey = secp.public_key_create(&seckey, true, Output::Allocate)?;
//!     let signed = secp.ecdsa_sign(&[0x02u8; 32], &seckey, Output::Allocate)?;
//!     assert!(secp.ecdsa_verify(&signed.signature, &[0x02u8; 32], &pubkey)?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod errors;
pub mod facade;
pub mod traits;

pub use backends::factory::{BackendPreference, EngineSelector};
pub use backends::native::NativeEngineFactory;
pub use backends::wasm::{ArtifactLoader, SandboxedEngineFactory};
pub use errors::{Error, Result};
pub use facade::{Output, RecoverableSignature, Secp256k1};
pub use traits::{CurveEngine, EngineError, EngineFactory, EngineResult};
