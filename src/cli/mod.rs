// src/cli/mod.rs — CLI definition (clap derive)

pub mod run;

use std::path::PathBuf;

use clap::Parser;

use crate::infra::config::ConfigOverrides;

#[derive(Parser, Debug)]
#[command(
    name = "flagprobe",
    about = "Find the compiler flags and parameters that are safe to autotune",
    version
)]
pub struct Cli {
    /// Config file path (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Compiler to probe
    #[arg(short, long)]
    pub compiler: Option<String>,

    /// Parameter definitions source (eg params.def)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Test program compiled by every trial
    #[arg(short, long = "test-program")]
    pub test: Option<PathBuf>,

    /// Kill a trial compile after this many seconds
    #[arg(short = 'l', long)]
    pub compile_limit: Option<f64>,

    /// Address-space limit per trial, in bytes
    #[arg(short, long)]
    pub memory_limit: Option<u64>,

    /// Parallelism factor; the worker pool defaults to twice this
    #[arg(short, long)]
    pub parallelism: Option<usize>,

    /// Exact worker pool size
    #[arg(long)]
    pub pool_size: Option<usize>,

    /// How to get target flags from the compiler (eg --help=target)
    #[arg(long, allow_hyphen_values = true)]
    pub target_input: Option<String>,

    /// How to get optimisation flags from the compiler (eg --help=optimizers)
    #[arg(long, allow_hyphen_values = true)]
    pub opt_input: Option<String>,

    /// How to get the parameter list from the compiler (eg --help=params)
    #[arg(long, allow_hyphen_values = true)]
    pub params_input: Option<String>,

    /// YAML file to write
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    pub debug: bool,
}

impl Cli {
    /// Fields given on the command line, to layer over the config file.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            compiler: self.compiler.clone(),
            target_help: self.target_input.clone(),
            optimizer_help: self.opt_input.clone(),
            params_help: self.params_input.clone(),
            test_program: self.test.clone(),
            compile_limit_secs: self.compile_limit,
            memory_limit_bytes: self.memory_limit,
            parallelism: self.parallelism,
            pool_size: self.pool_size,
            definitions: self.source.clone(),
            output: self.output.clone(),
        }
    }
}
