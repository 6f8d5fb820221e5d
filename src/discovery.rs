// src/discovery.rs — One complete discovery run
//
// Resolve the compiler, validate its switches, then resolve the parameters it
// shares with the definitions file. Everything runs on the context's worker
// pool and every child process lands in the context's registry.

use std::sync::Arc;

use crate::core::context::RunContext;
use crate::core::types::{CompilerVersion, ValidatedFlag};
use crate::extract::compiler::resolve_compiler;
use crate::extract::FlagSetExtractor;
use crate::infra::config::Config;
use crate::infra::errors::Result;
use crate::params::load_definitions;
use crate::probe::range::ParameterRangeSearch;
use crate::probe::FlagProbe;
use crate::runner::TrialExecutor;

/// What a run found, ready for serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub compiler_name: String,
    pub version: Option<CompilerVersion>,
    /// Sorted: optimizer switches, target switches, then range parameters.
    pub flags: Vec<ValidatedFlag>,
    /// Parameters whose range search found no valid maximum.
    pub unresolved: Vec<String>,
}

impl DiscoveryReport {
    pub fn switch_count(&self) -> usize {
        self.flags.iter().filter(|f| !f.is_range()).count()
    }

    pub fn param_count(&self) -> usize {
        self.flags.iter().filter(|f| f.is_range()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// `N flags, M params`
    pub fn summary(&self) -> String {
        format!("{} flags, {} params", self.switch_count(), self.param_count())
    }
}

/// Run discovery with the process runner bound to `ctx`.
pub async fn discover(ctx: &RunContext, config: &Config) -> Result<DiscoveryReport> {
    let executor: Arc<dyn TrialExecutor> =
        Arc::new(ctx.runner(config.probe.memory_limit_bytes));
    discover_with(executor, ctx.pool_size(), config).await
}

/// Run discovery through any executor.
pub async fn discover_with(
    executor: Arc<dyn TrialExecutor>,
    pool_size: usize,
    config: &Config,
) -> Result<DiscoveryReport> {
    if !tokio::fs::try_exists(&config.probe.test_program)
        .await
        .unwrap_or(false)
    {
        tracing::warn!(
            "Test program {} does not exist; every trial compile will fail",
            config.probe.test_program.display()
        );
    }

    let compiler = resolve_compiler(executor.as_ref(), &config.compiler, config.help_limit()).await?;

    let probe = FlagProbe::new(
        executor,
        compiler.path.clone(),
        config.probe.test_program.clone(),
        config.compile_limit(),
    );
    let range_search = ParameterRangeSearch::new(probe.clone());
    let extractor = FlagSetExtractor::new(probe, range_search, pool_size);

    let mut flags = extractor.extract(&compiler).await?;

    let definitions = match &config.params.definitions {
        Some(path) => load_definitions(path).await?,
        None => {
            tracing::info!("No parameter definitions given; skipping params");
            Vec::new()
        }
    };

    let mut unresolved = Vec::new();
    if !definitions.is_empty() {
        let outcome = extractor
            .extract_params(
                &compiler,
                definitions,
                &config.params.prefix,
                &config.params.separator,
            )
            .await?;
        flags.extend(outcome.flags);
        unresolved = outcome.unresolved;
    }

    flags.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    let report = DiscoveryReport {
        compiler_name: compiler.path,
        version: compiler.version,
        flags,
        unresolved,
    };

    tracing::info!(
        "Found {} compiler flags and {} params",
        report.switch_count(),
        report.param_count()
    );
    if report.is_empty() {
        tracing::warn!("No usable flags or params were found");
    }
    if !report.unresolved.is_empty() {
        tracing::warn!("Unresolved params: {}", report.unresolved.join(", "));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::testing::{exit, fail, pass, FakeCompiler};

    // FakeCompiler drops the last argument, so `--version` and the help
    // invocations all arrive as an empty flag.

    #[test]
    fn test_summary_counts() {
        let report = DiscoveryReport {
            compiler_name: "gcc".into(),
            version: None,
            flags: vec![
                ValidatedFlag::on_off("-fipa-pta"),
                ValidatedFlag::on_off("-mavx2"),
            ],
            unresolved: vec![],
        };
        assert_eq!(report.summary(), "2 flags, 0 params");
        assert!(!report.is_empty());
    }

    #[tokio::test]
    async fn test_zero_results_reported_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.probe.test_program = dir.path().join("hello.c");
        std::fs::write(&config.probe.test_program, "int main(void){return 0;}\n").unwrap();

        let executor: Arc<dyn TrialExecutor> = Arc::new(FakeCompiler::new(|flag: &str| {
            if flag.is_empty() {
                let mut out = pass();
                out.stdout = "fakecc (Fake) 9.3.0\n".into();
                out
            } else {
                fail()
            }
        }));
        let report = discover_with(executor, 2, &config).await.unwrap();
        assert!(report.is_empty());
        assert_eq!(report.summary(), "0 flags, 0 params");
        assert_eq!(report.compiler_name, "gcc");
    }

    #[tokio::test]
    async fn test_help_listing_drives_validation() {
        let executor: Arc<dyn TrialExecutor> = Arc::new(FakeCompiler::new(|flag: &str| {
            if flag.is_empty() {
                let mut out = exit(0, "");
                out.stdout = "fakecc 1.2.3\n  -fgood   ok\n  -mbad   no\n".into();
                return out;
            }
            if flag.starts_with("-m") {
                fail()
            } else {
                pass()
            }
        }));
        let report = discover_with(executor, 2, &Config::default()).await.unwrap();
        assert_eq!(
            report.version,
            Some(CompilerVersion {
                major: 1,
                minor: 2,
                patch: 3
            })
        );
        assert_eq!(report.flags, vec![ValidatedFlag::on_off("-fgood")]);
        assert_eq!(report.summary(), "1 flags, 0 params");
    }
}
