// src/cli/run.rs — Default command: discover and write the flag set

use crate::cli::Cli;
use crate::core::context::RunContext;
use crate::discovery::{discover, DiscoveryReport};
use crate::infra::config::Config;
use crate::infra::errors::DiscoveryError;
use crate::output::write_report;

/// Resolve configuration: file (or defaults), then command-line overrides.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::default(),
    };
    config.apply_overrides(&cli.overrides());
    config.validate()?;
    Ok(config)
}

/// Run discovery on a fresh worker pool and write the report.
///
/// Ctrl-C kills every live trial and ends the run with
/// [`DiscoveryError::Interrupted`]. The pool is shut down on every path.
pub fn run_discovery(config: &Config) -> anyhow::Result<DiscoveryReport> {
    let ctx = RunContext::new(config.pool.effective_size())?;

    let outcome = ctx.block_on(async {
        tokio::select! {
            result = discover(&ctx, config) => result,
            _ = tokio::signal::ctrl_c() => {
                let killed = ctx.registry().kill_all();
                tracing::warn!("Interrupted; killed {} running trial(s)", killed);
                Err(DiscoveryError::Interrupted)
            }
        }
    });
    ctx.shutdown();

    let report = outcome?;
    write_report(&report, &config.output.path)?;
    Ok(report)
}

/// Entry point behind `main`.
pub fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = resolve_config(cli)?;
    let report = run_discovery(&config)?;
    println!("{}", report.summary());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_file_then_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flagprobe.toml");
        std::fs::write(
            &path,
            "[compiler]\npath = \"gcc-9\"\n\n[pool]\nparallelism = 3\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "flagprobe",
            "--config",
            path.to_str().unwrap(),
            "-o",
            "x.yaml",
        ])
        .unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.compiler.path, "gcc-9");
        assert_eq!(config.pool.effective_size(), 6);
        assert_eq!(config.output.path, PathBuf::from("x.yaml"));
    }

    #[test]
    fn test_invalid_override_rejected() {
        let cli = Cli::try_parse_from(["flagprobe", "-p", "0"]).unwrap();
        let err = resolve_config(&cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DiscoveryError>(),
            Some(DiscoveryError::Config(_))
        ));
    }

    #[test]
    fn test_missing_config_file() {
        let cli = Cli::try_parse_from(["flagprobe", "--config", "/nonexistent/flagprobe.toml"])
            .unwrap();
        assert!(resolve_config(&cli).is_err());
    }
}
