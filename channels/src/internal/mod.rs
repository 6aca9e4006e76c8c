// src/internal/mod.rs

//! Crate-internal building blocks shared by the primitives.

pub(crate) mod pool;
