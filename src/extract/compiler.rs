// src/extract/compiler.rs — Compiler resolution
//
// Runs the compiler once for its version and once per help listing, and
// captures the text for the scanners. A compiler that cannot be launched is
// fatal; anything it prints (or fails to print) is not.

use std::time::Duration;

use crate::core::types::{Compiler, CompilerVersion};
use crate::infra::config::CompilerConfig;
use crate::infra::errors::Result;
use crate::runner::{TrialCommand, TrialExecutor};
use crate::util::excerpt;

/// Build a command from the compiler and a whitespace-separated invocation
/// such as `--help=target` or `-Q --help=optimizers`.
fn invocation(compiler: &str, args: &str) -> TrialCommand {
    args.split_whitespace()
        .fold(TrialCommand::new(compiler), |cmd, a| cmd.arg(a))
}

/// Run one informational invocation and return its standard output.
async fn capture(
    executor: &dyn TrialExecutor,
    compiler: &str,
    args: &str,
    limit: Duration,
) -> Result<String> {
    let cmd = invocation(compiler, args);
    let result = executor.execute(&cmd, limit).await?;

    if result.timed_out {
        tracing::warn!("'{}' did not finish within {:?}", cmd, limit);
    } else if !result.success() {
        tracing::warn!(
            "'{}' exited with {:?}: {}",
            cmd,
            result.exit_code,
            excerpt(&result.stderr, 160)
        );
    }
    Ok(result.stdout)
}

/// Resolve version and help listings for the configured compiler.
pub async fn resolve_compiler(
    executor: &dyn TrialExecutor,
    config: &CompilerConfig,
    limit: Duration,
) -> Result<Compiler> {
    let path = config.path.as_str();
    match which::which(path) {
        Ok(found) => tracing::debug!("Using compiler {}", found.display()),
        Err(e) => tracing::warn!("Compiler {} not found: {}", path, e),
    }

    let version_text = capture(executor, path, "--version", limit).await?;
    let version = CompilerVersion::scan(&version_text);
    match version {
        Some(v) => tracing::debug!("Compiler version {}", v),
        None => tracing::warn!("Could not determine the version of {}", path),
    }

    let target_help = capture(executor, path, &config.target_help, limit).await?;
    let optimizer_help = capture(executor, path, &config.optimizer_help, limit).await?;
    let params_help = capture(executor, path, &config.params_help, limit).await?;

    Ok(Compiler {
        path: path.to_string(),
        version,
        target_help,
        optimizer_help,
        params_help,
    })
}
