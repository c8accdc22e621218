// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Sandboxed curve engine: marshaling between typed host buffers and the
//! engine module's untyped linear memory.
//!
//! The sandbox exposes only a byte-addressable memory, a `malloc`/`free`
//! allocator, and numbered entry points taking i32 pointers and lengths.
//! This module:
//! - instantiates the artifact once per engine instance and allocates a
//!   scratch arena of named fixed slots (see [`arena`](super::arena))
//! - copies operands in, invokes the entry point, and copies results out
//!   only on a success status; a failed call never partially writes the
//!   caller's output
//! - allocates temporaries for variable-arity calls (key combination,
//!   DER import) and frees them on success and failure alike
//! - zero-fills every sensitive slot before returning from a call that
//!   staged key material, including when the call failed
//! - refills the fuel budget before each operation; traps surface as
//!   [`EngineError::Trap`]

use wasmtime::{Instance, Memory, Store, TypedFunc, WasmParams, WasmResults};

use crate::backends::wasm::arena::ScratchArena;
use crate::backends::wasm::error::{WasmError, WasmResult};
use crate::backends::wasm::module_loader::LoadedArtifact;
use crate::traits::engine::{CurveEngine, EngineError, EngineFactory, EngineResult};

/// Fuel budget per engine call (100M instructions).
const FUEL_LEVEL: u64 = 100_000_000;

/// Typed handles to the engine ABI exports.
///
/// All pointer and length parameters are i32, matching the wasm32
/// calling convention.
struct EngineExports {
    malloc: TypedFunc<i32, i32>,
    free: TypedFunc<i32, ()>,
    context_randomize: TypedFunc<(i32, i32), i32>,
    seckey_verify: TypedFunc<(i32, i32), i32>,
    seckey_negate: TypedFunc<(i32, i32), i32>,
    seckey_tweak_add: TypedFunc<(i32, i32, i32), i32>,
    seckey_tweak_mul: TypedFunc<(i32, i32, i32), i32>,
    pubkey_create: TypedFunc<(i32, i32, i32, i32), i32>,
    pubkey_convert: TypedFunc<(i32, i32, i32, i32, i32), i32>,
    pubkey_negate: TypedFunc<(i32, i32, i32, i32, i32), i32>,
    pubkey_combine: TypedFunc<(i32, i32, i32, i32, i32, i32), i32>,
    pubkey_tweak_add: TypedFunc<(i32, i32, i32, i32, i32, i32), i32>,
    pubkey_tweak_mul: TypedFunc<(i32, i32, i32, i32, i32, i32), i32>,
    signature_normalize: TypedFunc<(i32, i32), i32>,
    signature_export: TypedFunc<(i32, i32, i32, i32), i32>,
    signature_import: TypedFunc<(i32, i32, i32, i32), i32>,
    ecdsa_sign: TypedFunc<(i32, i32, i32, i32, i32), i32>,
    ecdsa_verify: TypedFunc<(i32, i32, i32, i32, i32), i32>,
    ecdsa_recover: TypedFunc<(i32, i32, i32, i32, i32, i32), i32>,
    ecdh: TypedFunc<(i32, i32, i32, i32, i32), i32>,
}

/// Sandboxed engine instance: one context handle, one scratch arena.
pub struct SandboxedEngine {
    store: Store<()>,
    memory: Memory,
    exports: EngineExports,
    ctx: i32,
    arena: ScratchArena,
}

fn trap(err: wasmtime::Error) -> EngineError {
    EngineError::Trap(err.to_string())
}

fn export<P, R>(store: &mut Store<()>, instance: &Instance, name: &str) -> WasmResult<TypedFunc<P, R>>
where
    P: WasmParams,
    R: WasmResults,
{
    instance.get_typed_func::<P, R>(&mut *store, name).map_err(|_| {
        WasmError::ValidationError(format!("engine module must export '{name}'"))
    })
}

impl SandboxedEngine {
    /// Instantiate the artifact, create the engine context, and allocate
    /// the scratch arena.
    pub fn new(artifact: &LoadedArtifact) -> WasmResult<Self> {
        let mut store = Store::new(&artifact.engine, ());
        store.set_fuel(FUEL_LEVEL)?;

        let instance = Instance::new(&mut store, &artifact.module, &[])?;

        let memory = instance.get_memory(&mut store, "memory").ok_or_else(|| {
            WasmError::ValidationError("engine module must export 'memory'".to_string())
        })?;

        let context_create: TypedFunc<(), i32> =
            export(&mut store, &instance, "engine_context_create")?;

        let exports = EngineExports {
            malloc: export(&mut store, &instance, "malloc")?,
            free: export(&mut store, &instance, "free")?,
            context_randomize: export(&mut store, &instance, "engine_context_randomize")?,
            seckey_verify: export(&mut store, &instance, "engine_seckey_verify")?,
            seckey_negate: export(&mut store, &instance, "engine_seckey_negate")?,
            seckey_tweak_add: export(&mut store, &instance, "engine_seckey_tweak_add")?,
            seckey_tweak_mul: export(&mut store, &instance, "engine_seckey_tweak_mul")?,
            pubkey_create: export(&mut store, &instance, "engine_pubkey_create")?,
            pubkey_convert: export(&mut store, &instance, "engine_pubkey_convert")?,
            pubkey_negate: export(&mut store, &instance, "engine_pubkey_negate")?,
            pubkey_combine: export(&mut store, &instance, "engine_pubkey_combine")?,
            pubkey_tweak_add: export(&mut store, &instance, "engine_pubkey_tweak_add")?,
            pubkey_tweak_mul: export(&mut store, &instance, "engine_pubkey_tweak_mul")?,
            signature_normalize: export(&mut store, &instance, "engine_signature_normalize")?,
            signature_export: export(&mut store, &instance, "engine_signature_export")?,
            signature_import: export(&mut store, &instance, "engine_signature_import")?,
            ecdsa_sign: export(&mut store, &instance, "engine_ecdsa_sign")?,
            ecdsa_verify: export(&mut store, &instance, "engine_ecdsa_verify")?,
            ecdsa_recover: export(&mut store, &instance, "engine_ecdsa_recover")?,
            ecdh: export(&mut store, &instance, "engine_ecdh")?,
        };

        let ctx = context_create.call(&mut store, ())?;
        if ctx == 0 {
            return Err(WasmError::ValidationError(
                "engine context creation returned null".to_string(),
            ));
        }

        let base = exports.malloc.call(&mut store, ScratchArena::SIZE as i32)?;
        if base == 0 {
            return Err(WasmError::MemoryError(
                "scratch arena allocation failed".to_string(),
            ));
        }

        tracing::debug!(ctx, arena_base = base, "sandboxed engine instantiated");

        Ok(Self {
            store,
            memory,
            exports,
            ctx,
            arena: ScratchArena::at(base),
        })
    }

    fn refuel(&mut self) -> EngineResult<()> {
        self.store
            .set_fuel(FUEL_LEVEL)
            .map_err(|e| EngineError::Trap(e.to_string()))
    }

    fn write(&mut self, ptr: i32, bytes: &[u8]) -> EngineResult<()> {
        self.memory
            .write(&mut self.store, ptr as usize, bytes)
            .map_err(|e| EngineError::Memory(e.to_string()))
    }

    fn read(&mut self, ptr: i32, out: &mut [u8]) -> EngineResult<()> {
        self.memory
            .read(&self.store, ptr as usize, out)
            .map_err(|e| EngineError::Memory(e.to_string()))
    }

    fn write_i32(&mut self, ptr: i32, value: i32) -> EngineResult<()> {
        self.write(ptr, &value.to_le_bytes())
    }

    fn read_i32(&mut self, ptr: i32) -> EngineResult<i32> {
        let mut bytes = [0u8; 4];
        self.read(ptr, &mut bytes)?;
        Ok(i32::from_le_bytes(bytes))
    }

    fn malloc(&mut self, size: usize) -> EngineResult<i32> {
        let ptr = self
            .exports
            .malloc
            .call(&mut self.store, size as i32)
            .map_err(trap)?;
        if ptr == 0 {
            return Err(EngineError::Alloc(size));
        }
        Ok(ptr)
    }

    fn free(&mut self, ptr: i32) -> EngineResult<()> {
        self.exports.free.call(&mut self.store, ptr).map_err(trap)
    }

    /// Zero-fill every sensitive slot. Runs after each call that staged
    /// key material, on success and failure alike.
    fn scrub(&mut self) -> EngineResult<()> {
        const ZERO: [u8; 32] = [0u8; 32];
        for (ptr, len) in self.arena.sensitive_slots() {
            self.write(ptr, &ZERO[..len])?;
        }
        Ok(())
    }

    /// Run a staged call, then scrub sensitive slots on both paths. The
    /// operation's error wins over a scrub error.
    fn with_scrub(
        &mut self,
        op: impl FnOnce(&mut Self) -> EngineResult<i32>,
    ) -> EngineResult<i32> {
        let result = op(self);
        let scrubbed = self.scrub();
        let code = result?;
        scrubbed?;
        Ok(code)
    }

    /// Stage a public-key transform: input point in, output point out.
    fn pubkey_transform(
        &mut self,
        func: TypedFunc<(i32, i32, i32, i32, i32), i32>,
        output: &mut [u8],
        input: &[u8],
    ) -> EngineResult<i32> {
        self.refuel()?;
        self.write(self.arena.pubkey_in, input)?;
        let code = func
            .call(
                &mut self.store,
                (
                    self.ctx,
                    self.arena.pubkey_out,
                    self.arena.pubkey_in,
                    input.len() as i32,
                    output.len() as i32,
                ),
            )
            .map_err(trap)?;
        if code == 0 {
            self.read(self.arena.pubkey_out, output)?;
        }
        Ok(code)
    }

    /// Stage a tweaked public-key transform. The tweak is sensitive, so
    /// the caller wraps this in [`Self::with_scrub`].
    fn pubkey_tweak(
        &mut self,
        func: TypedFunc<(i32, i32, i32, i32, i32, i32), i32>,
        output: &mut [u8],
        input: &[u8],
        tweak: &[u8; 32],
    ) -> EngineResult<i32> {
        self.write(self.arena.pubkey_in, input)?;
        self.write(self.arena.tweak, tweak)?;
        let code = func
            .call(
                &mut self.store,
                (
                    self.ctx,
                    self.arena.pubkey_out,
                    self.arena.pubkey_in,
                    input.len() as i32,
                    self.arena.tweak,
                    output.len() as i32,
                ),
            )
            .map_err(trap)?;
        if code == 0 {
            self.read(self.arena.pubkey_out, output)?;
        }
        Ok(code)
    }

    #[cfg(test)]
    pub(crate) fn arena(&self) -> ScratchArena {
        self.arena
    }

    #[cfg(test)]
    pub(crate) fn dump(&mut self, ptr: i32, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        self.memory
            .read(&self.store, ptr as usize, &mut bytes)
            .expect("memory dump in range");
        bytes
    }
}

impl CurveEngine for SandboxedEngine {
    fn context_randomize(&mut self, seed: Option<&[u8; 32]>) -> EngineResult<i32> {
        self.refuel()?;
        self.with_scrub(|engine| {
            let seed_ptr = match seed {
                Some(seed) => {
                    engine.write(engine.arena.seed, seed)?;
                    engine.arena.seed
                }
                None => 0, // NULL clears randomization
            };
            engine
                .exports
                .context_randomize
                .call(&mut engine.store, (engine.ctx, seed_ptr))
                .map_err(trap)
        })
    }

    fn seckey_verify(&mut self, seckey: &[u8; 32]) -> EngineResult<i32> {
        self.refuel()?;
        self.with_scrub(|engine| {
            engine.write(engine.arena.seckey, seckey)?;
            engine
                .exports
                .seckey_verify
                .call(&mut engine.store, (engine.ctx, engine.arena.seckey))
                .map_err(trap)
        })
    }

    fn seckey_negate(&mut self, seckey: &mut [u8; 32]) -> EngineResult<i32> {
        self.refuel()?;
        self.with_scrub(|engine| {
            engine.write(engine.arena.seckey, seckey)?;
            let code = engine
                .exports
                .seckey_negate
                .call(&mut engine.store, (engine.ctx, engine.arena.seckey))
                .map_err(trap)?;
            if code == 0 {
                engine.read(engine.arena.seckey, seckey)?;
            }
            Ok(code)
        })
    }

    fn seckey_tweak_add(&mut self, seckey: &mut [u8; 32], tweak: &[u8; 32]) -> EngineResult<i32> {
        self.refuel()?;
        self.with_scrub(|engine| {
            engine.write(engine.arena.seckey, seckey)?;
            engine.write(engine.arena.tweak, tweak)?;
            let code = engine
                .exports
                .seckey_tweak_add
                .call(
                    &mut engine.store,
                    (engine.ctx, engine.arena.seckey, engine.arena.tweak),
                )
                .map_err(trap)?;
            if code == 0 {
                engine.read(engine.arena.seckey, seckey)?;
            }
            Ok(code)
        })
    }

    fn seckey_tweak_mul(&mut self, seckey: &mut [u8; 32], tweak: &[u8; 32]) -> EngineResult<i32> {
        self.refuel()?;
        self.with_scrub(|engine| {
            engine.write(engine.arena.seckey, seckey)?;
            engine.write(engine.arena.tweak, tweak)?;
            let code = engine
                .exports
                .seckey_tweak_mul
                .call(
                    &mut engine.store,
                    (engine.ctx, engine.arena.seckey, engine.arena.tweak),
                )
                .map_err(trap)?;
            if code == 0 {
                engine.read(engine.arena.seckey, seckey)?;
            }
            Ok(code)
        })
    }

    fn pubkey_create(&mut self, output: &mut [u8], seckey: &[u8; 32]) -> EngineResult<i32> {
        self.refuel()?;
        let arena = self.arena;
        self.with_scrub(|engine| {
            engine.write(arena.seckey, seckey)?;
            let code = engine
                .exports
                .pubkey_create
                .call(
                    &mut engine.store,
                    (engine.ctx, arena.pubkey_out, arena.seckey, output.len() as i32),
                )
                .map_err(trap)?;
            if code == 0 {
                engine.read(arena.pubkey_out, output)?;
            }
            Ok(code)
        })
    }

    fn pubkey_convert(&mut self, output: &mut [u8], input: &[u8]) -> EngineResult<i32> {
        let func = self.exports.pubkey_convert.clone();
        self.pubkey_transform(func, output, input)
    }

    fn pubkey_negate(&mut self, output: &mut [u8], input: &[u8]) -> EngineResult<i32> {
        let func = self.exports.pubkey_negate.clone();
        self.pubkey_transform(func, output, input)
    }

    fn pubkey_combine(&mut self, output: &mut [u8], inputs: &[&[u8]]) -> EngineResult<i32> {
        self.refuel()?;

        // Variable arity: one contiguous block for the key bytes plus
        // two parallel i32 arrays of (pointer, length), all freed below
        // regardless of the call's outcome.
        let total: usize = inputs.iter().map(|key| key.len()).sum();
        let data = self.malloc(total)?;
        let ptrs = match self.malloc(4 * inputs.len()) {
            Ok(ptr) => ptr,
            Err(err) => {
                let _ = self.free(data);
                return Err(err);
            }
        };
        let lens = match self.malloc(4 * inputs.len()) {
            Ok(ptr) => ptr,
            Err(err) => {
                let _ = self.free(data);
                let _ = self.free(ptrs);
                return Err(err);
            }
        };

        let result = self.pubkey_combine_staged(output, inputs, data, ptrs, lens);

        let freed_data = self.free(data);
        let freed_ptrs = self.free(ptrs);
        let freed_lens = self.free(lens);

        let code = result?;
        freed_data?;
        freed_ptrs?;
        freed_lens?;
        Ok(code)
    }

    fn pubkey_tweak_add(
        &mut self,
        output: &mut [u8],
        input: &[u8],
        tweak: &[u8; 32],
    ) -> EngineResult<i32> {
        self.refuel()?;
        let func = self.exports.pubkey_tweak_add.clone();
        self.with_scrub(|engine| engine.pubkey_tweak(func, output, input, tweak))
    }

    fn pubkey_tweak_mul(
        &mut self,
        output: &mut [u8],
        input: &[u8],
        tweak: &[u8; 32],
    ) -> EngineResult<i32> {
        self.refuel()?;
        let func = self.exports.pubkey_tweak_mul.clone();
        self.with_scrub(|engine| engine.pubkey_tweak(func, output, input, tweak))
    }

    fn signature_normalize(&mut self, sig: &mut [u8; 64]) -> EngineResult<i32> {
        self.refuel()?;
        self.write(self.arena.sig, sig)?;
        let code = self
            .exports
            .signature_normalize
            .call(&mut self.store, (self.ctx, self.arena.sig))
            .map_err(trap)?;
        if code == 0 {
            self.read(self.arena.sig, sig)?;
        }
        Ok(code)
    }

    fn signature_export(
        &mut self,
        output: &mut [u8; 72],
        written: &mut usize,
        sig: &[u8; 64],
    ) -> EngineResult<i32> {
        self.refuel()?;
        self.write(self.arena.sig, sig)?;
        self.write_i32(self.arena.len, output.len() as i32)?;
        let code = self
            .exports
            .signature_export
            .call(
                &mut self.store,
                (self.ctx, self.arena.der, self.arena.len, self.arena.sig),
            )
            .map_err(trap)?;
        if code == 0 {
            let reported = self.read_i32(self.arena.len)?;
            if reported < 0 || reported as usize > output.len() {
                return Err(EngineError::Contract(format!(
                    "DER length {reported} out of range"
                )));
            }
            let len = reported as usize;
            self.read(self.arena.der, &mut output[..len])?;
            *written = len;
        }
        Ok(code)
    }

    fn signature_import(&mut self, output: &mut [u8; 64], der: &[u8]) -> EngineResult<i32> {
        self.refuel()?;

        // DER input is variable-length and gets a temporary allocation,
        // freed on both paths.
        let input = self.malloc(der.len())?;
        let result: EngineResult<i32> = (|| {
            self.write(input, der)?;
            let code = self
                .exports
                .signature_import
                .call(
                    &mut self.store,
                    (self.ctx, self.arena.sig, input, der.len() as i32),
                )
                .map_err(trap)?;
            if code == 0 {
                self.read(self.arena.sig, output)?;
            }
            Ok(code)
        })();

        let freed = self.free(input);
        let code = result?;
        freed?;
        Ok(code)
    }

    fn ecdsa_sign(
        &mut self,
        sig: &mut [u8; 64],
        recid: &mut i32,
        msg32: &[u8; 32],
        seckey: &[u8; 32],
    ) -> EngineResult<i32> {
        self.refuel()?;
        self.with_scrub(|engine| {
            engine.write(engine.arena.msg32, msg32)?;
            engine.write(engine.arena.seckey, seckey)?;
            let code = engine
                .exports
                .ecdsa_sign
                .call(
                    &mut engine.store,
                    (
                        engine.ctx,
                        engine.arena.sig,
                        engine.arena.recid,
                        engine.arena.msg32,
                        engine.arena.seckey,
                    ),
                )
                .map_err(trap)?;
            if code == 0 {
                engine.read(engine.arena.sig, sig)?;
                *recid = engine.read_i32(engine.arena.recid)?;
            }
            Ok(code)
        })
    }

    fn ecdsa_verify(
        &mut self,
        sig: &[u8; 64],
        msg32: &[u8; 32],
        pubkey: &[u8],
    ) -> EngineResult<i32> {
        self.refuel()?;
        self.write(self.arena.sig, sig)?;
        self.write(self.arena.msg32, msg32)?;
        self.write(self.arena.pubkey_in, pubkey)?;
        self.exports
            .ecdsa_verify
            .call(
                &mut self.store,
                (
                    self.ctx,
                    self.arena.sig,
                    self.arena.msg32,
                    self.arena.pubkey_in,
                    pubkey.len() as i32,
                ),
            )
            .map_err(trap)
    }

    fn ecdsa_recover(
        &mut self,
        output: &mut [u8],
        sig: &[u8; 64],
        recid: i32,
        msg32: &[u8; 32],
    ) -> EngineResult<i32> {
        self.refuel()?;
        self.write(self.arena.sig, sig)?;
        self.write(self.arena.msg32, msg32)?;
        let code = self
            .exports
            .ecdsa_recover
            .call(
                &mut self.store,
                (
                    self.ctx,
                    self.arena.pubkey_out,
                    self.arena.sig,
                    recid,
                    self.arena.msg32,
                    output.len() as i32,
                ),
            )
            .map_err(trap)?;
        if code == 0 {
            self.read(self.arena.pubkey_out, output)?;
        }
        Ok(code)
    }

    fn ecdh(
        &mut self,
        output: &mut [u8; 32],
        pubkey: &[u8],
        seckey: &[u8; 32],
    ) -> EngineResult<i32> {
        self.refuel()?;
        self.with_scrub(|engine| {
            engine.write(engine.arena.pubkey_in, pubkey)?;
            engine.write(engine.arena.seckey, seckey)?;
            let code = engine
                .exports
                .ecdh
                .call(
                    &mut engine.store,
                    (
                        engine.ctx,
                        engine.arena.secret,
                        engine.arena.pubkey_in,
                        pubkey.len() as i32,
                        engine.arena.seckey,
                    ),
                )
                .map_err(trap)?;
            if code == 0 {
                engine.read(engine.arena.secret, output)?;
            }
            Ok(code)
        })
    }

    fn kind(&self) -> &'static str {
        "sandboxed"
    }
}

impl SandboxedEngine {
    fn pubkey_combine_staged(
        &mut self,
        output: &mut [u8],
        inputs: &[&[u8]],
        data: i32,
        ptrs: i32,
        lens: i32,
    ) -> EngineResult<i32> {
        let mut cursor = data;
        for (i, key) in inputs.iter().enumerate() {
            self.write(cursor, key)?;
            self.write_i32(ptrs + 4 * i as i32, cursor)?;
            self.write_i32(lens + 4 * i as i32, key.len() as i32)?;
            cursor += key.len() as i32;
        }

        let code = self
            .exports
            .pubkey_combine
            .call(
                &mut self.store,
                (
                    self.ctx,
                    self.arena.pubkey_out,
                    ptrs,
                    lens,
                    inputs.len() as i32,
                    output.len() as i32,
                ),
            )
            .map_err(trap)?;
        if code == 0 {
            self.read(self.arena.pubkey_out, output)?;
        }
        Ok(code)
    }
}

/// Factory producing [`SandboxedEngine`] instances from one compiled
/// artifact.
pub struct SandboxedEngineFactory {
    artifact: LoadedArtifact,
}

impl SandboxedEngineFactory {
    pub fn new(artifact: LoadedArtifact) -> Self {
        Self { artifact }
    }
}

impl EngineFactory for SandboxedEngineFactory {
    fn create(&self) -> EngineResult<Box<dyn CurveEngine>> {
        let engine = SandboxedEngine::new(&self.artifact)?;
        Ok(Box::new(engine))
    }

    fn kind(&self) -> &'static str {
        "sandboxed"
    }
}
