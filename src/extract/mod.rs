// src/extract/mod.rs — Flag-set extraction
//
// Turns help listings and parameter definitions into validated flags.
// Independent candidates are probed concurrently, at most `pool_size` at a
// time; the steps inside one candidate (inverse check, range narrowing) stay
// sequential.

pub mod compiler;
pub mod help;

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::core::types::{
    render_param, CandidateFlag, Compiler, FlagCategory, ParameterDefinition, ResolvedRange,
    ValidatedFlag,
};
use crate::infra::errors::{DiscoveryError, Result};
use crate::probe::range::ParameterRangeSearch;
use crate::probe::FlagProbe;

/// Parameters that survived validation, plus the names whose range search
/// found no usable maximum.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamOutcome {
    pub flags: Vec<ValidatedFlag>,
    pub unresolved: Vec<String>,
}

#[derive(Clone)]
pub struct FlagSetExtractor {
    probe: FlagProbe,
    range_search: ParameterRangeSearch,
    pool_size: usize,
}

impl FlagSetExtractor {
    pub fn new(probe: FlagProbe, range_search: ParameterRangeSearch, pool_size: usize) -> Self {
        Self {
            probe,
            range_search,
            pool_size: pool_size.max(1),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Optimizer and target switches from the compiler's help that pass
    /// their trial compiles, as on-off flags.
    pub async fn extract(&self, compiler: &Compiler) -> Result<Vec<ValidatedFlag>> {
        let mut candidates = Vec::new();
        for (category, text) in [
            (FlagCategory::Optimizer, &compiler.optimizer_help),
            (FlagCategory::Target, &compiler.target_help),
        ] {
            let found = help::scan_flags(text, category);
            tracing::info!(
                "Determining which of {} possible {} flags work",
                found.len(),
                category
            );
            candidates.extend(found);
        }

        let accepted = self.validate(candidates).await?;
        for category in [FlagCategory::Optimizer, FlagCategory::Target] {
            let n = accepted.iter().filter(|c| c.category == category).count();
            tracing::info!("Returning {} {} flags", n, category);
        }

        Ok(accepted
            .iter()
            .map(|c| ValidatedFlag::on_off(&c.text))
            .collect())
    }

    /// Probe every candidate and keep the accepted ones. Order follows
    /// completion, not input.
    pub async fn validate(&self, candidates: Vec<CandidateFlag>) -> Result<Vec<CandidateFlag>> {
        tracing::debug!(
            "Probing {} candidates, {} at a time",
            candidates.len(),
            self.pool_size()
        );
        let probe = self.probe.clone();
        let checked = self
            .run_bounded(candidates, move |candidate| {
                let probe = probe.clone();
                async move {
                    let ok = probe.is_valid(&candidate.text).await?;
                    Ok::<_, DiscoveryError>(ok.then_some(candidate))
                }
            })
            .await?;
        Ok(checked.into_iter().flatten().collect())
    }

    /// Range parameters: definitions the compiler also lists, whose default
    /// compiles, with a resolved range where `max > min`.
    pub async fn extract_params(
        &self,
        compiler: &Compiler,
        definitions: Vec<ParameterDefinition>,
        prefix: &str,
        separator: &str,
    ) -> Result<ParamOutcome> {
        let listed: HashSet<String> = help::scan_param_names(&compiler.params_help)
            .into_iter()
            .collect();
        let total = definitions.len();
        let known: Vec<ParameterDefinition> = definitions
            .into_iter()
            .filter(|d| listed.contains(&d.name))
            .collect();
        tracing::debug!(
            "{} of {} parameter definitions are listed by the compiler",
            known.len(),
            total
        );
        tracing::info!(
            "Determining which of {} possible params work",
            known.len()
        );

        let probe = self.probe.clone();
        let search = self.range_search.clone();
        let (prefix_owned, separator_owned) = (prefix.to_string(), separator.to_string());
        let ranges = self
            .run_bounded(known, move |def| {
                let probe = probe.clone();
                let search = search.clone();
                let prefix = prefix_owned.clone();
                let separator = separator_owned.clone();
                async move { resolve_param(&probe, &search, def, &prefix, &separator).await }
            })
            .await?;

        let mut outcome = ParamOutcome::default();
        for range in ranges.into_iter().flatten() {
            match ValidatedFlag::range(&range, prefix, separator) {
                Some(flag) => outcome.flags.push(flag),
                None if !range.resolved => outcome.unresolved.push(range.name),
                None => tracing::debug!(
                    "Dropping {}: range [{}, {}] is empty",
                    range.name,
                    range.min,
                    range.max
                ),
            }
        }
        outcome.unresolved.sort();
        Ok(outcome)
    }

    /// Run `work` over `items` with at most `pool_size` in flight. The first
    /// error wins; dropping the set aborts the remaining tasks.
    async fn run_bounded<T, R, F, Fut>(&self, items: Vec<T>, work: F) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut,
        Fut: Future<Output = Result<R>> + Send + 'static,
    {
        let permits = Arc::new(Semaphore::new(self.pool_size));
        let mut tasks = JoinSet::new();
        for item in items {
            let permits = permits.clone();
            let job = work(item);
            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| DiscoveryError::Runtime(e.to_string()))?;
                job.await
            });
        }

        let mut results = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            let result = joined.map_err(|e| DiscoveryError::Runtime(e.to_string()))?;
            results.push(result?);
        }
        Ok(results)
    }
}

/// Default-value check, then range resolution. `None` when the default
/// itself is rejected.
async fn resolve_param(
    probe: &FlagProbe,
    search: &ParameterRangeSearch,
    def: ParameterDefinition,
    prefix: &str,
    separator: &str,
) -> Result<Option<ResolvedRange>> {
    let with_default = render_param(prefix, &def.name, separator, def.default);
    if !probe.is_valid(&with_default).await? {
        tracing::warn!("Removing param {} because its default does not compile", def.name);
        return Ok(None);
    }
    search.resolve(&def, prefix, separator).await.map(Some)
}
