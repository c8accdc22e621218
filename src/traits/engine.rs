// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Curve Engine Capability Contract
//!
//! This module defines the low-level calling convention shared by both
//! engine realizations:
//! - Native engine backed by libsecp256k1 bindings
//! - Sandboxed engine backed by a WASM module in linear memory
//!
//! Every operation returns a small integer status code. `0` always means
//! success; nonzero codes are operation-specific and are interpreted by
//! the façade's per-operation tables. An `Err` from any method is not a
//! status code; it means the engine itself failed (sandbox trap, memory
//! fault) rather than reporting a cryptographic result.
//!
//! ## Design Principles
//!
//! - **One operation in flight**: every method takes `&mut self`; the
//!   sandboxed engine's scratch offsets are reused across calls and are
//!   not reentrancy-safe.
//! - **Validated buffers only**: fixed-size operands arrive as array
//!   references, already length-checked by the façade. Variable-size
//!   operands (public keys, DER signatures) arrive as slices whose
//!   lengths the façade has confirmed against the accepted set.
//! - **No retained references**: engines never keep caller buffers
//!   beyond the call.

use thiserror::Error;

/// Transport-level engine failures, distinct from status codes.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The sandboxed engine trapped (fuel exhaustion, out-of-bounds
    /// access inside the module, unreachable).
    #[error("engine trap: {0}")]
    Trap(String),

    /// A linear memory read or write failed.
    #[error("linear memory access failed: {0}")]
    Memory(String),

    /// The sandbox allocator returned a null pointer.
    #[error("sandbox allocation of {0} bytes failed")]
    Alloc(usize),

    /// The engine artifact could not be loaded or instantiated.
    #[error("engine load failed: {0}")]
    Load(String),

    /// The engine violated the capability contract (missing export,
    /// out-of-range reported length).
    #[error("engine contract violation: {0}")]
    Contract(String),
}

/// Result type alias for engine-level operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// The capability set both engine realizations implement.
///
/// Buffer conventions mirror the engine ABI: `output` buffers are sized
/// by the caller (33 or 65 bytes for public keys), in-place operands are
/// `&mut`, and `written` out-parameters report actual lengths for
/// variable-size outputs.
pub trait CurveEngine: Send {
    /// Re-randomize the context blinding. `None` clears randomization.
    fn context_randomize(&mut self, seed: Option<&[u8; 32]>) -> EngineResult<i32>;

    /// `0` if the key is a valid curve-order scalar, `1` otherwise.
    fn seckey_verify(&mut self, seckey: &[u8; 32]) -> EngineResult<i32>;

    /// Negate the key in place.
    fn seckey_negate(&mut self, seckey: &mut [u8; 32]) -> EngineResult<i32>;

    /// Add a tweak scalar to the key in place.
    fn seckey_tweak_add(&mut self, seckey: &mut [u8; 32], tweak: &[u8; 32]) -> EngineResult<i32>;

    /// Multiply the key by a tweak scalar in place.
    fn seckey_tweak_mul(&mut self, seckey: &mut [u8; 32], tweak: &[u8; 32]) -> EngineResult<i32>;

    /// Derive the public point; `output` is 33 or 65 bytes.
    fn pubkey_create(&mut self, output: &mut [u8], seckey: &[u8; 32]) -> EngineResult<i32>;

    /// Re-serialize a public key in the format implied by `output.len()`.
    fn pubkey_convert(&mut self, output: &mut [u8], input: &[u8]) -> EngineResult<i32>;

    /// Negate a public point.
    fn pubkey_negate(&mut self, output: &mut [u8], input: &[u8]) -> EngineResult<i32>;

    /// Sum one or more public points.
    fn pubkey_combine(&mut self, output: &mut [u8], inputs: &[&[u8]]) -> EngineResult<i32>;

    /// Tweak a public point additively.
    fn pubkey_tweak_add(
        &mut self,
        output: &mut [u8],
        input: &[u8],
        tweak: &[u8; 32],
    ) -> EngineResult<i32>;

    /// Tweak a public point multiplicatively.
    fn pubkey_tweak_mul(
        &mut self,
        output: &mut [u8],
        input: &[u8],
        tweak: &[u8; 32],
    ) -> EngineResult<i32>;

    /// Force the low-S canonical form in place. Idempotent.
    fn signature_normalize(&mut self, sig: &mut [u8; 64]) -> EngineResult<i32>;

    /// Compact -> DER. The actual encoded length (<= 72) is reported
    /// through `written`.
    fn signature_export(
        &mut self,
        output: &mut [u8; 72],
        written: &mut usize,
        sig: &[u8; 64],
    ) -> EngineResult<i32>;

    /// DER -> compact. `der` is variable-length.
    fn signature_import(&mut self, output: &mut [u8; 64], der: &[u8]) -> EngineResult<i32>;

    /// Sign with deterministic (RFC6979) nonce generation; the recovery
    /// id is reported through `recid`.
    fn ecdsa_sign(
        &mut self,
        sig: &mut [u8; 64],
        recid: &mut i32,
        msg32: &[u8; 32],
        seckey: &[u8; 32],
    ) -> EngineResult<i32>;

    /// `0` valid, `3` cryptographically incorrect, `1`/`2` parse errors.
    fn ecdsa_verify(&mut self, sig: &[u8; 64], msg32: &[u8; 32], pubkey: &[u8])
        -> EngineResult<i32>;

    /// Recover the public key from a compact signature and recovery id.
    fn ecdsa_recover(
        &mut self,
        output: &mut [u8],
        sig: &[u8; 64],
        recid: i32,
        msg32: &[u8; 32],
    ) -> EngineResult<i32>;

    /// Derive a 32-byte shared secret (SHA-256 of the compressed point).
    fn ecdh(&mut self, output: &mut [u8; 32], pubkey: &[u8], seckey: &[u8; 32])
        -> EngineResult<i32>;

    /// Human-readable engine realization name, for logs and diagnostics.
    fn kind(&self) -> &'static str;
}

/// Creates one engine instance per façade `init()`.
///
/// The façade owns a factory from construction and invokes it exactly
/// once; engine instantiation (context creation, scratch arena layout)
/// happens here rather than at selection time.
pub trait EngineFactory: Send {
    /// Instantiate a fresh engine with its own context handle.
    fn create(&self) -> EngineResult<Box<dyn CurveEngine>>;

    /// Human-readable backend name.
    fn kind(&self) -> &'static str;
}
