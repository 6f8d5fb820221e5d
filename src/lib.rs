// src/lib.rs — Library root for flagprobe

pub mod cli;
pub mod core;
pub mod discovery;
pub mod extract;
pub mod infra;
pub mod output;
pub mod params;
pub mod probe;
pub mod runner;
pub mod util;
