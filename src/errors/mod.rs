// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Public error taxonomy for the secp256k1 façade.
//!
//! Errors fall into four groups, kept deliberately distinct:
//! - Lifecycle errors (`NotInitialized`, `AlreadyInitialized`)
//! - Argument-shape errors, detected before any engine call
//! - Domain errors reported by the curve engine (invalid keys, tweaks,
//!   unparseable inputs)
//! - Internal-invariant errors: status codes an operation's contract
//!   declares impossible. These signal a façade/engine mismatch and are
//!   never folded into domain errors.

use thiserror::Error;

use crate::traits::engine::EngineError;

/// Errors returned by [`Secp256k1`](crate::facade::Secp256k1) operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An operation was called before `init()`.
    #[error("secp256k1 should be initialized first")]
    NotInitialized,

    /// `init()` was called on an already-initialized instance.
    #[error("secp256k1 already initialized")]
    AlreadyInitialized,

    /// An input buffer had an unsupported byte length.
    #[error("invalid {name}: expected length in {expected:?}, got {actual}")]
    InvalidArgument {
        name: &'static str,
        expected: &'static [usize],
        actual: usize,
    },

    /// A recovery id outside the interval [0, 3].
    #[error("expected recovery id within interval [0, 3], got {0}")]
    InvalidRecoveryId(i32),

    /// `public_key_combine` requires at least one public key.
    #[error("expected at least one public key")]
    NoPublicKeys,

    /// Context randomization failed inside the engine.
    #[error("unknown error on context randomization")]
    ContextRandomize,

    /// The private key is not a valid curve-order scalar.
    #[error("private key is invalid")]
    InvalidPrivateKey,

    /// The tweak was out of range or the tweaked key is invalid.
    #[error("the tweak was out of range or the resulting private key is invalid")]
    TweakOutOfRangeOrInvalidResult,

    /// The tweak was out of range or equal to zero.
    #[error("the tweak was out of range or equal to zero")]
    TweakOutOfRangeOrZero,

    /// A public key could not be parsed as a curve point.
    #[error("public key could not be parsed")]
    PublicKeyParse,

    /// A public key could not be serialized.
    #[error("public key serialization error")]
    PublicKeySerialize,

    /// The sum of the public keys is not a valid point.
    #[error("the sum of the public keys is not valid")]
    PublicKeyCombine,

    /// A signature could not be parsed.
    #[error("signature could not be parsed")]
    SignatureParse,

    /// Nonce generation failed or the private key was invalid.
    #[error("the nonce generation function failed, or the private key was invalid")]
    SigningFailed,

    /// No valid public key could be recovered.
    #[error("public key could not be recovered")]
    RecoveryFailed,

    /// The ECDH scalar was zero or overflowed the curve order.
    #[error("scalar was invalid (zero or overflow)")]
    EcdhInvalidScalar,

    /// The engine returned a status code the operation's contract
    /// declares impossible. Indicates a latent façade/engine mismatch,
    /// not bad input.
    #[error("impossible status code {code} from '{operation}', engine/facade contract mismatch")]
    InternalInvariant { operation: &'static str, code: i32 },

    /// The engine itself failed (sandbox trap, memory fault, load error).
    #[error("engine failure: {0}")]
    Engine(#[from] EngineError),
}

/// Result type alias for façade operations.
pub type Result<T> = std::result::Result<T, Error>;
