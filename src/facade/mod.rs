// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Validated secp256k1 Operation Façade
//!
//! The only surface application code talks to. Every operation follows
//! the same contract shape:
//! 1. The façade must be initialized, else `NotInitialized`.
//! 2. Every input buffer's length is checked against its accepted set;
//!    a violation fails before any engine call is made.
//! 3. The output is resolved: a caller-provided buffer is validated for
//!    exact length, or a fresh zero buffer is allocated.
//! 4. The engine is invoked with validated operands.
//! 5. The engine's status code is interpreted through the operation's
//!    table into a success value, a named domain error, or, for codes
//!    the table declares impossible, an internal-invariant error.
//!
//! The façade is a two-state machine: `init()` moves it from
//! uninitialized to initialized exactly once, and there is no way back.

use crate::backends::factory::{BackendPreference, EngineSelector};
use crate::errors::{Error, Result};
use crate::traits::engine::{CurveEngine, EngineFactory};

const SECKEY_LENS: &[usize] = &[32];
const TWEAK_LENS: &[usize] = &[32];
const SEED_LENS: &[usize] = &[32];
const MSG_LENS: &[usize] = &[32];
const SECRET_LENS: &[usize] = &[32];
const PUBKEY_LENS: &[usize] = &[33, 65];
const COMPRESSED_LENS: &[usize] = &[33];
const UNCOMPRESSED_LENS: &[usize] = &[65];
const SIG_LENS: &[usize] = &[64];
const DER_LENS: &[usize] = &[72];

/// How an operation's output buffer is obtained.
///
/// `Provided` hands the façade an owned buffer that must have exactly
/// the required length; `Allocate` lets the façade allocate one. Either
/// way the buffer is returned to the caller on success.
#[derive(Debug)]
pub enum Output {
    /// Caller-supplied buffer of exactly the required length.
    Provided(Vec<u8>),
    /// Allocate a zeroed buffer of the required length internally.
    Allocate,
}

impl Output {
    fn resolve(
        self,
        name: &'static str,
        required: usize,
        expected: &'static [usize],
    ) -> Result<Vec<u8>> {
        match self {
            Output::Provided(buffer) if buffer.len() == required => Ok(buffer),
            Output::Provided(buffer) => Err(Error::InvalidArgument {
                name,
                expected,
                actual: buffer.len(),
            }),
            Output::Allocate => Ok(vec![0u8; required]),
        }
    }
}

/// A compact signature together with its recovery id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoverableSignature {
    /// 64-byte compact `(r, s)` encoding.
    pub signature: Vec<u8>,
    /// Recovery id in `[0, 3]`.
    pub recovery_id: i32,
}

/// Check a variable-format operand against its accepted length set.
fn check_len(name: &'static str, buffer: &[u8], expected: &'static [usize]) -> Result<()> {
    if expected.contains(&buffer.len()) {
        return Ok(());
    }
    Err(Error::InvalidArgument {
        name,
        expected,
        actual: buffer.len(),
    })
}

/// Check a fixed-size operand and copy it into an array for the engine.
fn fixed<const N: usize>(
    name: &'static str,
    buffer: &[u8],
    expected: &'static [usize],
) -> Result<[u8; N]> {
    <[u8; N]>::try_from(buffer).map_err(|_| Error::InvalidArgument {
        name,
        expected,
        actual: buffer.len(),
    })
}

/// An impossible status code. Logged loudly: it means the engine and
/// the façade's tables have drifted apart, not that the input was bad.
fn internal(operation: &'static str, code: i32) -> Error {
    tracing::error!(operation, code, "impossible status code from engine");
    Error::InternalInvariant { operation, code }
}

fn point_len(compressed: bool) -> (usize, &'static [usize]) {
    if compressed {
        (33, COMPRESSED_LENS)
    } else {
        (65, UNCOMPRESSED_LENS)
    }
}

/// Stateful façade over one curve engine instance.
pub struct Secp256k1 {
    factory: Box<dyn EngineFactory>,
    engine: Option<Box<dyn CurveEngine>>,
}

impl Secp256k1 {
    /// Construct an uninitialized façade around an engine factory.
    pub fn new(factory: Box<dyn EngineFactory>) -> Self {
        Self {
            factory,
            engine: None,
        }
    }

    /// Construct an uninitialized façade from a backend preference.
    pub fn with_preference(preference: &BackendPreference) -> Result<Self> {
        let factory = EngineSelector::select(preference)?;
        Ok(Self::new(factory))
    }

    /// Instantiate the engine. Valid exactly once.
    pub fn init(&mut self) -> Result<()> {
        if self.engine.is_some() {
            return Err(Error::AlreadyInitialized);
        }
        let engine = self.factory.create()?;
        tracing::info!(backend = engine.kind(), "secp256k1 facade initialized");
        self.engine = Some(engine);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.engine.is_some()
    }

    /// Lifecycle precondition, checked before any argument validation.
    fn ensure_initialized(&self) -> Result<()> {
        if self.engine.is_none() {
            return Err(Error::NotInitialized);
        }
        Ok(())
    }

    fn engine(&mut self) -> Result<&mut dyn CurveEngine> {
        match self.engine.as_mut() {
            Some(engine) => Ok(engine.as_mut()),
            None => Err(Error::NotInitialized),
        }
    }

    /// Re-randomize the context blinding; `None` clears randomization.
    pub fn context_randomize(&mut self, seed: Option<&[u8]>) -> Result<()> {
        self.ensure_initialized()?;
        let seed = match seed {
            Some(bytes) => Some(fixed::<32>("seed", bytes, SEED_LENS)?),
            None => None,
        };
        match self.engine()?.context_randomize(seed.as_ref())? {
            0 => Ok(()),
            1 => Err(Error::ContextRandomize),
            code => Err(internal("context_randomize", code)),
        }
    }

    /// Pure predicate: `false` for curve-order-invalid keys, never an
    /// error on a well-formed 32-byte input.
    pub fn private_key_verify(&mut self, seckey: &[u8]) -> Result<bool> {
        self.ensure_initialized()?;
        let key = fixed::<32>("private key", seckey, SECKEY_LENS)?;
        match self.engine()?.seckey_verify(&key)? {
            0 => Ok(true),
            1 => Ok(false),
            code => Err(internal("seckey_verify", code)),
        }
    }

    /// Negate the private key in place.
    pub fn private_key_negate(&mut self, seckey: &mut [u8]) -> Result<()> {
        self.ensure_initialized()?;
        let mut key = fixed::<32>("private key", seckey, SECKEY_LENS)?;
        match self.engine()?.seckey_negate(&mut key)? {
            0 => {
                seckey.copy_from_slice(&key);
                Ok(())
            }
            code => Err(internal("seckey_negate", code)),
        }
    }

    /// Add a tweak scalar to the private key in place.
    pub fn private_key_tweak_add(&mut self, seckey: &mut [u8], tweak: &[u8]) -> Result<()> {
        self.ensure_initialized()?;
        let mut key = fixed::<32>("private key", seckey, SECKEY_LENS)?;
        let tweak = fixed::<32>("tweak", tweak, TWEAK_LENS)?;
        match self.engine()?.seckey_tweak_add(&mut key, &tweak)? {
            0 => {
                seckey.copy_from_slice(&key);
                Ok(())
            }
            1 => Err(Error::TweakOutOfRangeOrInvalidResult),
            code => Err(internal("seckey_tweak_add", code)),
        }
    }

    /// Multiply the private key by a tweak scalar in place.
    pub fn private_key_tweak_mul(&mut self, seckey: &mut [u8], tweak: &[u8]) -> Result<()> {
        self.ensure_initialized()?;
        let mut key = fixed::<32>("private key", seckey, SECKEY_LENS)?;
        let tweak = fixed::<32>("tweak", tweak, TWEAK_LENS)?;
        match self.engine()?.seckey_tweak_mul(&mut key, &tweak)? {
            0 => {
                seckey.copy_from_slice(&key);
                Ok(())
            }
            1 => Err(Error::TweakOutOfRangeOrZero),
            code => Err(internal("seckey_tweak_mul", code)),
        }
    }

    /// Derive the public point for a private key.
    pub fn public_key_create(
        &mut self,
        seckey: &[u8],
        compressed: bool,
        output: Output,
    ) -> Result<Vec<u8>> {
        self.ensure_initialized()?;
        let key = fixed::<32>("private key", seckey, SECKEY_LENS)?;
        let (required, lens) = point_len(compressed);
        let mut buffer = output.resolve("output", required, lens)?;
        match self.engine()?.pubkey_create(&mut buffer, &key)? {
            0 => Ok(buffer),
            1 => Err(Error::InvalidPrivateKey),
            2 => Err(Error::PublicKeySerialize),
            code => Err(internal("pubkey_create", code)),
        }
    }

    /// Re-serialize a public key as compressed or uncompressed.
    pub fn public_key_convert(
        &mut self,
        pubkey: &[u8],
        compressed: bool,
        output: Output,
    ) -> Result<Vec<u8>> {
        self.ensure_initialized()?;
        check_len("public key", pubkey, PUBKEY_LENS)?;
        let (required, lens) = point_len(compressed);
        let mut buffer = output.resolve("output", required, lens)?;
        match self.engine()?.pubkey_convert(&mut buffer, pubkey)? {
            0 => Ok(buffer),
            1 => Err(Error::PublicKeyParse),
            2 => Err(Error::PublicKeySerialize),
            code => Err(internal("pubkey_convert", code)),
        }
    }

    /// Negate a public point.
    pub fn public_key_negate(
        &mut self,
        pubkey: &[u8],
        compressed: bool,
        output: Output,
    ) -> Result<Vec<u8>> {
        self.ensure_initialized()?;
        check_len("public key", pubkey, PUBKEY_LENS)?;
        let (required, lens) = point_len(compressed);
        let mut buffer = output.resolve("output", required, lens)?;
        match self.engine()?.pubkey_negate(&mut buffer, pubkey)? {
            0 => Ok(buffer),
            1 => Err(Error::PublicKeyParse),
            3 => Err(Error::PublicKeySerialize),
            code => Err(internal("pubkey_negate", code)),
        }
    }

    /// Sum one or more public-key points.
    pub fn public_key_combine(
        &mut self,
        pubkeys: &[&[u8]],
        compressed: bool,
        output: Output,
    ) -> Result<Vec<u8>> {
        self.ensure_initialized()?;
        if pubkeys.is_empty() {
            return Err(Error::NoPublicKeys);
        }
        for pubkey in pubkeys {
            check_len("public key", pubkey, PUBKEY_LENS)?;
        }
        let (required, lens) = point_len(compressed);
        let mut buffer = output.resolve("output", required, lens)?;
        match self.engine()?.pubkey_combine(&mut buffer, pubkeys)? {
            0 => Ok(buffer),
            1 => Err(Error::PublicKeyParse),
            2 => Err(Error::PublicKeyCombine),
            3 => Err(Error::PublicKeySerialize),
            code => Err(internal("pubkey_combine", code)),
        }
    }

    /// Tweak a public point additively.
    pub fn public_key_tweak_add(
        &mut self,
        pubkey: &[u8],
        tweak: &[u8],
        compressed: bool,
        output: Output,
    ) -> Result<Vec<u8>> {
        self.ensure_initialized()?;
        check_len("public key", pubkey, PUBKEY_LENS)?;
        let tweak = fixed::<32>("tweak", tweak, TWEAK_LENS)?;
        let (required, lens) = point_len(compressed);
        let mut buffer = output.resolve("output", required, lens)?;
        match self.engine()?.pubkey_tweak_add(&mut buffer, pubkey, &tweak)? {
            0 => Ok(buffer),
            1 => Err(Error::PublicKeyParse),
            2 => Err(Error::TweakOutOfRangeOrInvalidResult),
            3 => Err(Error::PublicKeySerialize),
            code => Err(internal("pubkey_tweak_add", code)),
        }
    }

    /// Tweak a public point multiplicatively.
    pub fn public_key_tweak_mul(
        &mut self,
        pubkey: &[u8],
        tweak: &[u8],
        compressed: bool,
        output: Output,
    ) -> Result<Vec<u8>> {
        self.ensure_initialized()?;
        check_len("public key", pubkey, PUBKEY_LENS)?;
        let tweak = fixed::<32>("tweak", tweak, TWEAK_LENS)?;
        let (required, lens) = point_len(compressed);
        let mut buffer = output.resolve("output", required, lens)?;
        match self.engine()?.pubkey_tweak_mul(&mut buffer, pubkey, &tweak)? {
            0 => Ok(buffer),
            1 => Err(Error::PublicKeyParse),
            2 => Err(Error::TweakOutOfRangeOrZero),
            3 => Err(Error::PublicKeySerialize),
            code => Err(internal("pubkey_tweak_mul", code)),
        }
    }

    /// Force the low-S canonical form in place. Idempotent.
    pub fn signature_normalize(&mut self, sig: &mut [u8]) -> Result<()> {
        self.ensure_initialized()?;
        let mut compact = fixed::<64>("signature", sig, SIG_LENS)?;
        match self.engine()?.signature_normalize(&mut compact)? {
            0 => {
                sig.copy_from_slice(&compact);
                Ok(())
            }
            1 => Err(Error::SignatureParse),
            code => Err(internal("signature_normalize", code)),
        }
    }

    /// Compact -> DER. The returned buffer is truncated to the actual
    /// encoded length (at most 72 bytes).
    pub fn signature_export(&mut self, sig: &[u8], output: Output) -> Result<Vec<u8>> {
        self.ensure_initialized()?;
        let compact = fixed::<64>("signature", sig, SIG_LENS)?;
        let mut buffer = output.resolve("output", 72, DER_LENS)?;
        let mut der = [0u8; 72];
        let mut written = 0usize;
        match self
            .engine()?
            .signature_export(&mut der, &mut written, &compact)?
        {
            0 => {
                buffer[..written].copy_from_slice(&der[..written]);
                buffer.truncate(written);
                Ok(buffer)
            }
            1 => Err(Error::SignatureParse),
            code => Err(internal("signature_export", code)),
        }
    }

    /// DER -> compact. Accepts any DER input length; the engine decides
    /// whether it parses.
    pub fn signature_import(&mut self, der: &[u8], output: Output) -> Result<Vec<u8>> {
        self.ensure_initialized()?;
        let mut buffer = output.resolve("output", 64, SIG_LENS)?;
        let mut compact = [0u8; 64];
        match self.engine()?.signature_import(&mut compact, der)? {
            0 => {
                buffer.copy_from_slice(&compact);
                Ok(buffer)
            }
            1 => Err(Error::SignatureParse),
            code => Err(internal("signature_import", code)),
        }
    }

    /// Sign a 32-byte message digest; the nonce is generated
    /// deterministically (RFC 6979) inside the engine.
    pub fn ecdsa_sign(
        &mut self,
        msg32: &[u8],
        seckey: &[u8],
        output: Output,
    ) -> Result<RecoverableSignature> {
        self.ensure_initialized()?;
        let msg = fixed::<32>("message", msg32, MSG_LENS)?;
        let key = fixed::<32>("private key", seckey, SECKEY_LENS)?;
        let mut buffer = output.resolve("output", 64, SIG_LENS)?;
        let mut sig = [0u8; 64];
        let mut recid = 0i32;
        match self.engine()?.ecdsa_sign(&mut sig, &mut recid, &msg, &key)? {
            0 => {
                buffer.copy_from_slice(&sig);
                Ok(RecoverableSignature {
                    signature: buffer,
                    recovery_id: recid,
                })
            }
            1 => Err(Error::SigningFailed),
            code => Err(internal("ecdsa_sign", code)),
        }
    }

    /// `Ok(false)` for a well-formed but cryptographically incorrect
    /// signature; errors only for unparseable inputs.
    pub fn ecdsa_verify(&mut self, sig: &[u8], msg32: &[u8], pubkey: &[u8]) -> Result<bool> {
        self.ensure_initialized()?;
        let compact = fixed::<64>("signature", sig, SIG_LENS)?;
        let msg = fixed::<32>("message", msg32, MSG_LENS)?;
        check_len("public key", pubkey, PUBKEY_LENS)?;
        match self.engine()?.ecdsa_verify(&compact, &msg, pubkey)? {
            0 => Ok(true),
            3 => Ok(false),
            1 => Err(Error::SignatureParse),
            2 => Err(Error::PublicKeyParse),
            code => Err(internal("ecdsa_verify", code)),
        }
    }

    /// Recover the signing public key from a compact signature, its
    /// recovery id, and the message digest.
    pub fn ecdsa_recover(
        &mut self,
        sig: &[u8],
        recid: i32,
        msg32: &[u8],
        compressed: bool,
        output: Output,
    ) -> Result<Vec<u8>> {
        self.ensure_initialized()?;
        let compact = fixed::<64>("signature", sig, SIG_LENS)?;
        if !(0..=3).contains(&recid) {
            return Err(Error::InvalidRecoveryId(recid));
        }
        let msg = fixed::<32>("message", msg32, MSG_LENS)?;
        let (required, lens) = point_len(compressed);
        let mut buffer = output.resolve("output", required, lens)?;
        match self
            .engine()?
            .ecdsa_recover(&mut buffer, &compact, recid, &msg)?
        {
            0 => Ok(buffer),
            1 => Err(Error::SignatureParse),
            2 => Err(Error::RecoveryFailed),
            code => Err(internal("ecdsa_recover", code)),
        }
    }

    /// Derive the 32-byte ECDH shared secret (SHA-256 of the compressed
    /// shared point).
    pub fn ecdh(&mut self, pubkey: &[u8], seckey: &[u8], output: Output) -> Result<Vec<u8>> {
        self.ensure_initialized()?;
        check_len("public key", pubkey, PUBKEY_LENS)?;
        let key = fixed::<32>("private key", seckey, SECKEY_LENS)?;
        let mut buffer = output.resolve("output", 32, SECRET_LENS)?;
        let mut secret = [0u8; 32];
        match self.engine()?.ecdh(&mut secret, pubkey, &key)? {
            0 => {
                buffer.copy_from_slice(&secret);
                Ok(buffer)
            }
            1 => Err(Error::PublicKeyParse),
            2 => Err(Error::EcdhInvalidScalar),
            code => Err(internal("ecdh", code)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::native::NativeEngineFactory;
    use crate::traits::engine::EngineResult;

    /// Curve order N, big-endian.
    const ORDER_HEX: &str = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn facade() -> Secp256k1 {
        init_tracing();
        let mut secp = Secp256k1::new(Box::new(NativeEngineFactory));
        secp.init().unwrap();
        secp
    }

    /// Engine stub reporting the same status code from every operation,
    /// for exercising switch arms the native engine cannot reach.
    struct FixedCodeEngine(i32);

    impl CurveEngine for FixedCodeEngine {
        fn context_randomize(&mut self, _: Option<&[u8; 32]>) -> EngineResult<i32> {
            Ok(self.0)
        }
        fn seckey_verify(&mut self, _: &[u8; 32]) -> EngineResult<i32> {
            Ok(self.0)
        }
        fn seckey_negate(&mut self, _: &mut [u8; 32]) -> EngineResult<i32> {
            Ok(self.0)
        }
        fn seckey_tweak_add(&mut self, _: &mut [u8; 32], _: &[u8; 32]) -> EngineResult<i32> {
            Ok(self.0)
        }
        fn seckey_tweak_mul(&mut self, _: &mut [u8; 32], _: &[u8; 32]) -> EngineResult<i32> {
            Ok(self.0)
        }
        fn pubkey_create(&mut self, _: &mut [u8], _: &[u8; 32]) -> EngineResult<i32> {
            Ok(self.0)
        }
        fn pubkey_convert(&mut self, _: &mut [u8], _: &[u8]) -> EngineResult<i32> {
            Ok(self.0)
        }
        fn pubkey_negate(&mut self, _: &mut [u8], _: &[u8]) -> EngineResult<i32> {
            Ok(self.0)
        }
        fn pubkey_combine(&mut self, _: &mut [u8], _: &[&[u8]]) -> EngineResult<i32> {
            Ok(self.0)
        }
        fn pubkey_tweak_add(
            &mut self,
            _: &mut [u8],
            _: &[u8],
            _: &[u8; 32],
        ) -> EngineResult<i32> {
            Ok(self.0)
        }
        fn pubkey_tweak_mul(
            &mut self,
            _: &mut [u8],
            _: &[u8],
            _: &[u8; 32],
        ) -> EngineResult<i32> {
            Ok(self.0)
        }
        fn signature_normalize(&mut self, _: &mut [u8; 64]) -> EngineResult<i32> {
            Ok(self.0)
        }
        fn signature_export(
            &mut self,
            _: &mut [u8; 72],
            _: &mut usize,
            _: &[u8; 64],
        ) -> EngineResult<i32> {
            Ok(self.0)
        }
        fn signature_import(&mut self, _: &mut [u8; 64], _: &[u8]) -> EngineResult<i32> {
            Ok(self.0)
        }
        fn ecdsa_sign(
            &mut self,
            _: &mut [u8; 64],
            _: &mut i32,
            _: &[u8; 32],
            _: &[u8; 32],
        ) -> EngineResult<i32> {
            Ok(self.0)
        }
        fn ecdsa_verify(&mut self, _: &[u8; 64], _: &[u8; 32], _: &[u8]) -> EngineResult<i32> {
            Ok(self.0)
        }
        fn ecdsa_recover(
            &mut self,
            _: &mut [u8],
            _: &[u8; 64],
            _: i32,
            _: &[u8; 32],
        ) -> EngineResult<i32> {
            Ok(self.0)
        }
        fn ecdh(&mut self, _: &mut [u8; 32], _: &[u8], _: &[u8; 32]) -> EngineResult<i32> {
            Ok(self.0)
        }
        fn kind(&self) -> &'static str {
            "fixed-code"
        }
    }

    struct FixedCodeFactory(i32);

    impl EngineFactory for FixedCodeFactory {
        fn create(&self) -> EngineResult<Box<dyn CurveEngine>> {
            Ok(Box::new(FixedCodeEngine(self.0)))
        }
        fn kind(&self) -> &'static str {
            "fixed-code"
        }
    }

    fn facade_with_code(code: i32) -> Secp256k1 {
        init_tracing();
        let mut secp = Secp256k1::new(Box::new(FixedCodeFactory(code)));
        secp.init().unwrap();
        secp
    }

    fn seckey(n: u8) -> Vec<u8> {
        let mut key = vec![0u8; 32];
        key[31] = n;
        key
    }

    #[test]
    fn test_operations_require_init() {
        let mut secp = Secp256k1::new(Box::new(NativeEngineFactory));
        assert!(matches!(
            secp.private_key_verify(&seckey(1)),
            Err(Error::NotInitialized)
        ));
        assert!(matches!(
            secp.ecdsa_verify(&[0u8; 64], &[0u8; 32], &[2u8; 33]),
            Err(Error::NotInitialized)
        ));
    }

    #[test]
    fn test_double_init_fails() {
        let mut secp = facade();
        assert!(matches!(secp.init(), Err(Error::AlreadyInitialized)));
        // The engine from the first init survives the failed second one.
        assert!(secp.private_key_verify(&seckey(1)).unwrap());
    }

    #[test]
    fn test_private_key_verify_at_order_boundaries() {
        let mut secp = facade();
        let order = hex::decode(ORDER_HEX).unwrap();

        assert!(!secp.private_key_verify(&vec![0u8; 32]).unwrap());
        assert!(!secp.private_key_verify(&order).unwrap());

        let mut below = order.clone();
        below[31] -= 1;
        assert!(secp.private_key_verify(&below).unwrap());

        // Strictly above the order.
        let mut above = order;
        above[31] += 1;
        assert!(!secp.private_key_verify(&above).unwrap());
        assert!(!secp.private_key_verify(&vec![0xffu8; 32]).unwrap());

        assert!(secp.private_key_verify(&seckey(1)).unwrap());
    }

    #[test]
    fn test_argument_length_checked_before_engine() {
        let mut secp = facade();
        match secp.private_key_verify(&[0u8; 31]) {
            Err(Error::InvalidArgument {
                name,
                expected,
                actual,
            }) => {
                assert_eq!(name, "private key");
                assert_eq!(expected, &[32]);
                assert_eq!(actual, 31);
            }
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn test_provided_output_with_wrong_length_rejected() {
        let mut secp = facade();
        let result = secp.public_key_create(&seckey(5), true, Output::Provided(vec![0u8; 65]));
        assert!(matches!(
            result,
            Err(Error::InvalidArgument {
                name: "output",
                actual: 65,
                ..
            })
        ));
    }

    #[test]
    fn test_public_key_create_known_point() {
        let mut secp = facade();
        let pubkey = secp
            .public_key_create(&seckey(5), true, Output::Allocate)
            .unwrap();
        assert_eq!(
            hex::encode(&pubkey),
            "022f8bde4d1a07209355b4a7250a5c5128e88b84bddc619ab7cba8d569b240efe4"
        );
    }

    #[test]
    fn test_public_key_create_invalid_key() {
        let mut secp = facade();
        let result = secp.public_key_create(&vec![0u8; 32], true, Output::Allocate);
        assert!(matches!(result, Err(Error::InvalidPrivateKey)));
    }

    #[test]
    fn test_private_key_negate_is_involution() {
        let mut secp = facade();
        let original = seckey(42);
        let mut key = original.clone();
        secp.private_key_negate(&mut key).unwrap();
        assert_ne!(key, original);
        secp.private_key_negate(&mut key).unwrap();
        assert_eq!(key, original);
    }

    #[test]
    fn test_private_key_tweak_add_rejects_order_overflow() {
        let mut secp = facade();
        let mut key = seckey(1);
        let order = hex::decode(ORDER_HEX).unwrap();
        assert!(matches!(
            secp.private_key_tweak_add(&mut key, &order),
            Err(Error::TweakOutOfRangeOrInvalidResult)
        ));
        // Failed tweak leaves the key untouched.
        assert_eq!(key, seckey(1));
    }

    #[test]
    fn test_private_key_tweak_mul_rejects_zero() {
        let mut secp = facade();
        let mut key = seckey(1);
        assert!(matches!(
            secp.private_key_tweak_mul(&mut key, &vec![0u8; 32]),
            Err(Error::TweakOutOfRangeOrZero)
        ));
    }

    #[test]
    fn test_public_key_convert_round_trip() {
        let mut secp = facade();
        let compressed = secp
            .public_key_create(&seckey(7), true, Output::Allocate)
            .unwrap();
        let uncompressed = secp
            .public_key_convert(&compressed, false, Output::Allocate)
            .unwrap();
        assert_eq!(uncompressed.len(), 65);
        let back = secp
            .public_key_convert(&uncompressed, true, Output::Allocate)
            .unwrap();
        assert_eq!(back, compressed);
    }

    #[test]
    fn test_public_key_convert_rejects_garbage() {
        let mut secp = facade();
        let result = secp.public_key_convert(&[0xffu8; 33], true, Output::Allocate);
        assert!(matches!(result, Err(Error::PublicKeyParse)));
    }

    #[test]
    fn test_public_key_negate_twice_is_identity() {
        let mut secp = facade();
        let pubkey = secp
            .public_key_create(&seckey(9), true, Output::Allocate)
            .unwrap();
        let negated = secp
            .public_key_negate(&pubkey, true, Output::Allocate)
            .unwrap();
        assert_ne!(negated, pubkey);
        let back = secp
            .public_key_negate(&negated, true, Output::Allocate)
            .unwrap();
        assert_eq!(back, pubkey);
    }

    #[test]
    fn test_public_key_combine_single_key_is_identity() {
        let mut secp = facade();
        let pubkey = secp
            .public_key_create(&seckey(3), true, Output::Allocate)
            .unwrap();
        let combined = secp
            .public_key_combine(&[&pubkey], true, Output::Allocate)
            .unwrap();
        assert_eq!(combined, pubkey);
    }

    #[test]
    fn test_public_key_combine_matches_private_addition() {
        let mut secp = facade();
        // (3 + 5) * G == 3 * G + 5 * G
        let pub_a = secp
            .public_key_create(&seckey(3), true, Output::Allocate)
            .unwrap();
        let pub_b = secp
            .public_key_create(&seckey(5), true, Output::Allocate)
            .unwrap();
        let combined = secp
            .public_key_combine(&[&pub_a, &pub_b], true, Output::Allocate)
            .unwrap();
        let expected = secp
            .public_key_create(&seckey(8), true, Output::Allocate)
            .unwrap();
        assert_eq!(combined, expected);
    }

    #[test]
    fn test_public_key_combine_requires_at_least_one_key() {
        let mut secp = facade();
        assert!(matches!(
            secp.public_key_combine(&[], true, Output::Allocate),
            Err(Error::NoPublicKeys)
        ));
    }

    #[test]
    fn test_public_key_combine_opposite_points_is_infinity() {
        let mut secp = facade();
        let pubkey = secp
            .public_key_create(&seckey(6), true, Output::Allocate)
            .unwrap();
        let negated = secp
            .public_key_negate(&pubkey, true, Output::Allocate)
            .unwrap();
        assert!(matches!(
            secp.public_key_combine(&[&pubkey, &negated], true, Output::Allocate),
            Err(Error::PublicKeyCombine)
        ));
    }

    #[test]
    fn test_public_key_tweak_add_matches_private_tweak() {
        let mut secp = facade();
        let tweak = seckey(11);
        let tweaked_point = secp
            .public_key_create(&seckey(2), true, Output::Allocate)
            .unwrap();
        let tweaked_point = secp
            .public_key_tweak_add(&tweaked_point, &tweak, true, Output::Allocate)
            .unwrap();

        let mut key = seckey(2);
        secp.private_key_tweak_add(&mut key, &tweak).unwrap();
        let expected = secp.public_key_create(&key, true, Output::Allocate).unwrap();
        assert_eq!(tweaked_point, expected);
    }

    #[test]
    fn test_public_key_tweak_serialize_failure() {
        let mut secp = facade_with_code(3);
        let pubkey = vec![0x02u8; 33];
        let tweak = seckey(1);
        assert!(matches!(
            secp.public_key_tweak_add(&pubkey, &tweak, true, Output::Allocate),
            Err(Error::PublicKeySerialize)
        ));
        assert!(matches!(
            secp.public_key_tweak_mul(&pubkey, &tweak, true, Output::Allocate),
            Err(Error::PublicKeySerialize)
        ));
    }

    #[test]
    fn test_out_of_table_code_is_internal_invariant() {
        let mut secp = facade_with_code(9);
        assert!(matches!(
            secp.private_key_verify(&seckey(1)),
            Err(Error::InternalInvariant {
                operation: "seckey_verify",
                code: 9
            })
        ));
        assert!(matches!(
            secp.public_key_tweak_add(&vec![0x02u8; 33], &seckey(1), true, Output::Allocate),
            Err(Error::InternalInvariant {
                operation: "pubkey_tweak_add",
                code: 9
            })
        ));
    }

    #[test]
    fn test_signature_der_round_trip() {
        let mut secp = facade();
        let msg = vec![0x42u8; 32];
        let signed = secp.ecdsa_sign(&msg, &seckey(7), Output::Allocate).unwrap();

        let der = secp
            .signature_export(&signed.signature, Output::Allocate)
            .unwrap();
        assert!(der.len() <= 72);
        assert_eq!(der[0], 0x30);

        let compact = secp.signature_import(&der, Output::Allocate).unwrap();
        assert_eq!(compact, signed.signature);
    }

    #[test]
    fn test_signature_import_rejects_garbage() {
        let mut secp = facade();
        assert!(matches!(
            secp.signature_import(&[0x01, 0x02, 0x03], Output::Allocate),
            Err(Error::SignatureParse)
        ));
    }

    #[test]
    fn test_signature_normalize_is_idempotent() {
        let mut secp = facade();
        let msg = vec![0x13u8; 32];
        let signed = secp.ecdsa_sign(&msg, &seckey(9), Output::Allocate).unwrap();

        let mut once = signed.signature.clone();
        secp.signature_normalize(&mut once).unwrap();
        let mut twice = once.clone();
        secp.signature_normalize(&mut twice).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_sign_verify_consistency() {
        let mut secp = facade();
        let msg = vec![0x66u8; 32];
        let signed = secp.ecdsa_sign(&msg, &seckey(4), Output::Allocate).unwrap();
        let pubkey = secp
            .public_key_create(&seckey(4), true, Output::Allocate)
            .unwrap();

        assert!(secp.ecdsa_verify(&signed.signature, &msg, &pubkey).unwrap());

        let other = vec![0x67u8; 32];
        assert!(!secp.ecdsa_verify(&signed.signature, &other, &pubkey).unwrap());
    }

    #[test]
    fn test_verify_rejects_unparseable_signature() {
        let mut secp = facade();
        let pubkey = secp
            .public_key_create(&seckey(4), true, Output::Allocate)
            .unwrap();
        // r and s both overflow the curve order.
        assert!(matches!(
            secp.ecdsa_verify(&[0xffu8; 64], &[0u8; 32], &pubkey),
            Err(Error::SignatureParse)
        ));
    }

    #[test]
    fn test_sign_known_vector() {
        let mut secp = facade();
        let signed = secp
            .ecdsa_sign(&vec![0u8; 32], &seckey(1), Output::Allocate)
            .unwrap();
        let sig_hex = hex::encode(&signed.signature);
        assert!(sig_hex.starts_with("a0b37f8f"));
        assert!(sig_hex.ends_with("fcce52"));
        assert_eq!(signed.recovery_id, 1);
    }

    #[test]
    fn test_ecdsa_recover_round_trip() {
        let mut secp = facade();
        let msg = vec![0x55u8; 32];
        let signed = secp.ecdsa_sign(&msg, &seckey(8), Output::Allocate).unwrap();
        let expected = secp
            .public_key_create(&seckey(8), true, Output::Allocate)
            .unwrap();

        let recovered = secp
            .ecdsa_recover(
                &signed.signature,
                signed.recovery_id,
                &msg,
                true,
                Output::Allocate,
            )
            .unwrap();
        assert_eq!(recovered, expected);
    }

    #[test]
    fn test_ecdsa_recover_validates_recovery_id() {
        let mut secp = facade();
        assert!(matches!(
            secp.ecdsa_recover(&[0u8; 64], 4, &[0u8; 32], true, Output::Allocate),
            Err(Error::InvalidRecoveryId(4))
        ));
        assert!(matches!(
            secp.ecdsa_recover(&[0u8; 64], -1, &[0u8; 32], true, Output::Allocate),
            Err(Error::InvalidRecoveryId(-1))
        ));
    }

    #[test]
    fn test_ecdh_symmetry() {
        let mut secp = facade();
        let pub_a = secp
            .public_key_create(&seckey(3), true, Output::Allocate)
            .unwrap();
        let pub_b = secp
            .public_key_create(&seckey(5), true, Output::Allocate)
            .unwrap();

        let ab = secp.ecdh(&pub_b, &seckey(3), Output::Allocate).unwrap();
        let ba = secp.ecdh(&pub_a, &seckey(5), Output::Allocate).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.len(), 32);
    }

    #[test]
    fn test_ecdh_rejects_zero_scalar() {
        let mut secp = facade();
        let pubkey = secp
            .public_key_create(&seckey(3), true, Output::Allocate)
            .unwrap();
        assert!(matches!(
            secp.ecdh(&pubkey, &vec![0u8; 32], Output::Allocate),
            Err(Error::EcdhInvalidScalar)
        ));
    }

    #[test]
    fn test_context_randomize_accepts_seed_and_null() {
        let mut secp = facade();
        secp.context_randomize(Some(&[0x17u8; 32])).unwrap();
        secp.context_randomize(None).unwrap();
        // Signatures stay deterministic across randomization.
        let signed = secp
            .ecdsa_sign(&vec![0u8; 32], &seckey(1), Output::Allocate)
            .unwrap();
        assert_eq!(signed.recovery_id, 1);
    }

    #[test]
    fn test_uncompressed_outputs() {
        let mut secp = facade();
        let pubkey = secp
            .public_key_create(&seckey(5), false, Output::Allocate)
            .unwrap();
        assert_eq!(pubkey.len(), 65);
        assert_eq!(pubkey[0], 0x04);

        let provided = secp
            .public_key_create(&seckey(5), false, Output::Provided(vec![0u8; 65]))
            .unwrap();
        assert_eq!(provided, pubkey);
    }
}
