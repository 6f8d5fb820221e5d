// src/core/mod.rs — Domain types and the run-scoped context

pub mod context;
pub mod types;
