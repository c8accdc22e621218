// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod engine;

pub use engine::{CurveEngine, EngineError, EngineFactory, EngineResult};
