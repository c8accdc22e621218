// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Native curve engine backed by the `secp256k1` crate.
//!
//! This is a thin adapter: the typed libsecp256k1 API is translated into
//! the numeric status codes of the engine capability contract, so the
//! façade interprets both engine realizations through the same tables.
//! The curve arithmetic itself is entirely the library's concern.

use secp256k1::ecdh::SharedSecret;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId, Signature};
use secp256k1::{All, Message, PublicKey, Scalar, Secp256k1, SecretKey};
use zeroize::Zeroizing;

use crate::traits::engine::{CurveEngine, EngineFactory, EngineResult};

/// Native engine holding one libsecp256k1 context.
pub struct NativeEngine {
    ctx: Secp256k1<All>,
}

impl NativeEngine {
    pub fn new() -> Self {
        Self {
            ctx: Secp256k1::new(),
        }
    }

    /// Serialize a point into a caller-sized buffer (33 or 65 bytes).
    fn serialize_point(output: &mut [u8], point: &PublicKey) {
        if output.len() == 33 {
            output.copy_from_slice(&point.serialize());
        } else {
            output.copy_from_slice(&point.serialize_uncompressed());
        }
    }
}

impl Default for NativeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CurveEngine for NativeEngine {
    fn context_randomize(&mut self, seed: Option<&[u8; 32]>) -> EngineResult<i32> {
        match seed {
            Some(seed) => self.ctx.seeded_randomize(seed),
            // A NULL seed resets the blinding; a fresh context is the
            // equivalent on this side of the ABI.
            None => self.ctx = Secp256k1::new(),
        }
        Ok(0)
    }

    fn seckey_verify(&mut self, seckey: &[u8; 32]) -> EngineResult<i32> {
        Ok(if SecretKey::from_slice(seckey).is_ok() {
            0
        } else {
            1
        })
    }

    fn seckey_negate(&mut self, seckey: &mut [u8; 32]) -> EngineResult<i32> {
        let Ok(key) = SecretKey::from_slice(seckey) else {
            return Ok(1);
        };
        let negated = Zeroizing::new(key.negate().secret_bytes());
        seckey.copy_from_slice(&negated[..]);
        Ok(0)
    }

    fn seckey_tweak_add(&mut self, seckey: &mut [u8; 32], tweak: &[u8; 32]) -> EngineResult<i32> {
        let Ok(key) = SecretKey::from_slice(seckey) else {
            return Ok(1);
        };
        let Ok(scalar) = Scalar::from_be_bytes(*tweak) else {
            return Ok(1);
        };
        let Ok(tweaked) = key.add_tweak(&scalar) else {
            return Ok(1);
        };
        let bytes = Zeroizing::new(tweaked.secret_bytes());
        seckey.copy_from_slice(&bytes[..]);
        Ok(0)
    }

    fn seckey_tweak_mul(&mut self, seckey: &mut [u8; 32], tweak: &[u8; 32]) -> EngineResult<i32> {
        let Ok(key) = SecretKey::from_slice(seckey) else {
            return Ok(1);
        };
        let Ok(scalar) = Scalar::from_be_bytes(*tweak) else {
            return Ok(1);
        };
        let Ok(tweaked) = key.mul_tweak(&scalar) else {
            return Ok(1);
        };
        let bytes = Zeroizing::new(tweaked.secret_bytes());
        seckey.copy_from_slice(&bytes[..]);
        Ok(0)
    }

    fn pubkey_create(&mut self, output: &mut [u8], seckey: &[u8; 32]) -> EngineResult<i32> {
        let Ok(key) = SecretKey::from_slice(seckey) else {
            return Ok(1);
        };
        let point = PublicKey::from_secret_key(&self.ctx, &key);
        Self::serialize_point(output, &point);
        Ok(0)
    }

    fn pubkey_convert(&mut self, output: &mut [u8], input: &[u8]) -> EngineResult<i32> {
        let Ok(point) = PublicKey::from_slice(input) else {
            return Ok(1);
        };
        Self::serialize_point(output, &point);
        Ok(0)
    }

    fn pubkey_negate(&mut self, output: &mut [u8], input: &[u8]) -> EngineResult<i32> {
        let Ok(point) = PublicKey::from_slice(input) else {
            return Ok(1);
        };
        let negated = point.negate(&self.ctx);
        Self::serialize_point(output, &negated);
        Ok(0)
    }

    fn pubkey_combine(&mut self, output: &mut [u8], inputs: &[&[u8]]) -> EngineResult<i32> {
        let mut points = Vec::with_capacity(inputs.len());
        for input in inputs {
            let Ok(point) = PublicKey::from_slice(input) else {
                return Ok(1);
            };
            points.push(point);
        }
        let refs: Vec<&PublicKey> = points.iter().collect();
        let Ok(sum) = PublicKey::combine_keys(&refs) else {
            return Ok(2);
        };
        Self::serialize_point(output, &sum);
        Ok(0)
    }

    fn pubkey_tweak_add(
        &mut self,
        output: &mut [u8],
        input: &[u8],
        tweak: &[u8; 32],
    ) -> EngineResult<i32> {
        let Ok(point) = PublicKey::from_slice(input) else {
            return Ok(1);
        };
        let Ok(scalar) = Scalar::from_be_bytes(*tweak) else {
            return Ok(2);
        };
        let Ok(tweaked) = point.add_exp_tweak(&self.ctx, &scalar) else {
            return Ok(2);
        };
        Self::serialize_point(output, &tweaked);
        Ok(0)
    }

    fn pubkey_tweak_mul(
        &mut self,
        output: &mut [u8],
        input: &[u8],
        tweak: &[u8; 32],
    ) -> EngineResult<i32> {
        let Ok(point) = PublicKey::from_slice(input) else {
            return Ok(1);
        };
        let Ok(scalar) = Scalar::from_be_bytes(*tweak) else {
            return Ok(2);
        };
        let Ok(tweaked) = point.mul_tweak(&self.ctx, &scalar) else {
            return Ok(2);
        };
        Self::serialize_point(output, &tweaked);
        Ok(0)
    }

    fn signature_normalize(&mut self, sig: &mut [u8; 64]) -> EngineResult<i32> {
        let Ok(mut parsed) = Signature::from_compact(sig) else {
            return Ok(1);
        };
        parsed.normalize_s();
        sig.copy_from_slice(&parsed.serialize_compact());
        Ok(0)
    }

    fn signature_export(
        &mut self,
        output: &mut [u8; 72],
        written: &mut usize,
        sig: &[u8; 64],
    ) -> EngineResult<i32> {
        let Ok(parsed) = Signature::from_compact(sig) else {
            return Ok(1);
        };
        let der = parsed.serialize_der();
        output[..der.len()].copy_from_slice(&der);
        *written = der.len();
        Ok(0)
    }

    fn signature_import(&mut self, output: &mut [u8; 64], der: &[u8]) -> EngineResult<i32> {
        let Ok(parsed) = Signature::from_der(der) else {
            return Ok(1);
        };
        output.copy_from_slice(&parsed.serialize_compact());
        Ok(0)
    }

    fn ecdsa_sign(
        &mut self,
        sig: &mut [u8; 64],
        recid: &mut i32,
        msg32: &[u8; 32],
        seckey: &[u8; 32],
    ) -> EngineResult<i32> {
        let Ok(key) = SecretKey::from_slice(seckey) else {
            return Ok(1);
        };
        let Ok(message) = Message::from_digest_slice(msg32) else {
            return Ok(1);
        };
        let recoverable = self.ctx.sign_ecdsa_recoverable(&message, &key);
        let (id, data) = recoverable.serialize_compact();
        sig.copy_from_slice(&data);
        *recid = id.to_i32();
        Ok(0)
    }

    fn ecdsa_verify(
        &mut self,
        sig: &[u8; 64],
        msg32: &[u8; 32],
        pubkey: &[u8],
    ) -> EngineResult<i32> {
        let Ok(parsed) = Signature::from_compact(sig) else {
            return Ok(1);
        };
        let Ok(point) = PublicKey::from_slice(pubkey) else {
            return Ok(2);
        };
        let Ok(message) = Message::from_digest_slice(msg32) else {
            return Ok(3);
        };
        Ok(match self.ctx.verify_ecdsa(&message, &parsed, &point) {
            Ok(()) => 0,
            Err(_) => 3,
        })
    }

    fn ecdsa_recover(
        &mut self,
        output: &mut [u8],
        sig: &[u8; 64],
        recid: i32,
        msg32: &[u8; 32],
    ) -> EngineResult<i32> {
        let Ok(id) = RecoveryId::from_i32(recid) else {
            return Ok(1);
        };
        let Ok(recoverable) = RecoverableSignature::from_compact(sig, id) else {
            return Ok(1);
        };
        let Ok(message) = Message::from_digest_slice(msg32) else {
            return Ok(2);
        };
        let Ok(point) = self.ctx.recover_ecdsa(&message, &recoverable) else {
            return Ok(2);
        };
        Self::serialize_point(output, &point);
        Ok(0)
    }

    fn ecdh(
        &mut self,
        output: &mut [u8; 32],
        pubkey: &[u8],
        seckey: &[u8; 32],
    ) -> EngineResult<i32> {
        let Ok(point) = PublicKey::from_slice(pubkey) else {
            return Ok(1);
        };
        let Ok(key) = SecretKey::from_slice(seckey) else {
            return Ok(2);
        };
        let secret = Zeroizing::new(SharedSecret::new(&point, &key).secret_bytes());
        output.copy_from_slice(&secret[..]);
        Ok(0)
    }

    fn kind(&self) -> &'static str {
        "native"
    }
}

/// Factory producing [`NativeEngine`] instances.
pub struct NativeEngineFactory;

impl EngineFactory for NativeEngineFactory {
    fn create(&self) -> EngineResult<Box<dyn CurveEngine>> {
        Ok(Box::new(NativeEngine::new()))
    }

    fn kind(&self) -> &'static str {
        "native"
    }
}
