// src/probe/mod.rs — Single-flag validation
//
// A flag is usable when a trial compile of the test program with it exits
// cleanly and prints none of the known "not really supported" diagnostics.
// Optimizer switches must additionally work in their inverted form.

pub mod range;
#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::core::types::{FlagCategory, ProbeResult};
use crate::infra::errors::Result;
use crate::runner::{TrialCommand, TrialExecutor};
use crate::util::excerpt;

/// Diagnostic printed when a switch is accepted but ignored for this target.
pub const UNSUPPORTED_MARKER: &str = "warning: this target";
/// Diagnostic printed for switches that only survive as aliases.
pub const RENAMED_MARKER: &str = "has been renamed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    CompileError,
    TimedOut,
    /// Killed by a signal before the deadline (e.g. an internal compiler crash).
    Crashed,
    UnsupportedByTarget,
    Renamed,
    /// The flag works but its `no-` inverse does not.
    AsymmetricInverse,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompileError => "results in compile error",
            Self::TimedOut => "exceeded the compile limit",
            Self::Crashed => "crashed the compiler",
            Self::UnsupportedByTarget => "not supported by target",
            Self::Renamed => "renamed",
            Self::AsymmetricInverse => "inverse form does not work",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }

    /// Judge one trial outcome.
    pub fn of(result: &ProbeResult) -> Self {
        if result.timed_out {
            Verdict::Rejected(RejectReason::TimedOut)
        } else if result.signal.is_some() {
            Verdict::Rejected(RejectReason::Crashed)
        } else if result.exit_code != Some(0) {
            Verdict::Rejected(RejectReason::CompileError)
        } else if result.stderr.contains(UNSUPPORTED_MARKER) {
            Verdict::Rejected(RejectReason::UnsupportedByTarget)
        } else if result.stderr.contains(RENAMED_MARKER) {
            Verdict::Rejected(RejectReason::Renamed)
        } else {
            Verdict::Accepted
        }
    }
}

/// Logical inverse of an optimizer switch: `-ffoo` <-> `-fno-foo`.
/// Other categories have no inverse.
pub fn invert_flag(flag: &str) -> Option<String> {
    if FlagCategory::of(flag) != FlagCategory::Optimizer {
        return None;
    }
    let body = &flag[2..];
    Some(match body.strip_prefix("no-") {
        Some(rest) => format!("-f{rest}"),
        None => format!("-fno-{body}"),
    })
}

/// Validates flags by trial-compiling a fixed test program.
#[derive(Clone)]
pub struct FlagProbe {
    executor: Arc<dyn TrialExecutor>,
    compiler: String,
    test_program: PathBuf,
    compile_limit: Duration,
}

impl FlagProbe {
    pub fn new(
        executor: Arc<dyn TrialExecutor>,
        compiler: impl Into<String>,
        test_program: impl Into<PathBuf>,
        compile_limit: Duration,
    ) -> Self {
        Self {
            executor,
            compiler: compiler.into(),
            test_program: test_program.into(),
            compile_limit,
        }
    }

    pub async fn is_valid(&self, flag: &str) -> Result<bool> {
        Ok(self.check(flag).await?.is_accepted())
    }

    /// Direct check, then (for optimizer switches) exactly one check of the
    /// inverse. The inverse is never itself inverted.
    pub async fn check(&self, flag: &str) -> Result<Verdict> {
        tracing::debug!("Flag is: {}", flag);

        let direct = self.trial(flag).await?;
        if let Verdict::Rejected(reason) = direct {
            tracing::warn!("Removing flag {} because {}", flag, reason.as_str());
            return Ok(direct);
        }

        if let Some(inverse) = invert_flag(flag) {
            if let Verdict::Rejected(reason) = self.trial(&inverse).await? {
                tracing::warn!(
                    "Odd... {} works but {} does not ({})",
                    flag,
                    inverse,
                    reason.as_str()
                );
                return Ok(Verdict::Rejected(RejectReason::AsymmetricInverse));
            }
        }

        Ok(Verdict::Accepted)
    }

    /// One trial compile, no inversion.
    pub async fn trial(&self, flag: &str) -> Result<Verdict> {
        let cmd = TrialCommand::compile(&self.compiler, flag, &self.test_program);
        let result = self.executor.execute(&cmd, self.compile_limit).await?;
        let verdict = Verdict::of(&result);
        if let (Verdict::Rejected(RejectReason::Crashed), Some(sig)) = (verdict, result.signal) {
            tracing::debug!("{}: killed by signal {}", cmd, sig);
        }
        if !verdict.is_accepted() && !result.stderr.is_empty() {
            tracing::debug!("{}: {}", cmd, excerpt(&result.stderr, 160));
        }
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{exit, fail, hang, pass, FakeCompiler};
    use super::*;
    use pretty_assertions::assert_eq;

    fn probe_with<F>(fake: Arc<FakeCompiler<F>>) -> FlagProbe
    where
        F: Fn(&str) -> ProbeResult + Send + Sync + 'static,
    {
        FlagProbe::new(fake, "cc", "hello.c", Duration::from_secs(5))
    }

    #[test]
    fn test_invert_flag() {
        assert_eq!(invert_flag("-ffoo-bar").as_deref(), Some("-fno-foo-bar"));
        assert_eq!(invert_flag("-fno-foo-bar").as_deref(), Some("-ffoo-bar"));
        assert_eq!(invert_flag("-mavx2"), None);
        assert_eq!(invert_flag("--param max-foo=1"), None);
    }

    #[test]
    fn test_verdict_markers() {
        assert_eq!(Verdict::of(&pass()), Verdict::Accepted);
        assert_eq!(
            Verdict::of(&fail()),
            Verdict::Rejected(RejectReason::CompileError)
        );
        assert_eq!(
            Verdict::of(&hang()),
            Verdict::Rejected(RejectReason::TimedOut)
        );
        let mut segv = exit(0, "");
        segv.exit_code = None;
        segv.signal = Some(11);
        assert_eq!(
            Verdict::of(&segv),
            Verdict::Rejected(RejectReason::Crashed)
        );
        assert_eq!(
            Verdict::of(&exit(0, "cc1: warning: this target machine does not have delayed branches")),
            Verdict::Rejected(RejectReason::UnsupportedByTarget)
        );
        assert_eq!(
            Verdict::of(&exit(0, "warning: '-fold' has been renamed to '-fnew'")),
            Verdict::Rejected(RejectReason::Renamed)
        );
    }

    #[tokio::test]
    async fn test_symmetric_flag_accepted() {
        let fake = Arc::new(FakeCompiler::new(|_: &str| pass()));
        let probe = probe_with(fake.clone());
        assert!(probe.is_valid("-ffoo-bar").await.unwrap());
        assert_eq!(fake.calls(), vec!["-ffoo-bar", "-fno-foo-bar"]);
    }

    #[tokio::test]
    async fn test_asymmetric_flag_rejected() {
        let fake = Arc::new(FakeCompiler::new(|flag: &str| {
            if flag == "-fno-foo-bar" {
                fail()
            } else {
                pass()
            }
        }));
        let probe = probe_with(fake.clone());
        assert_eq!(
            probe.check("-ffoo-bar").await.unwrap(),
            Verdict::Rejected(RejectReason::AsymmetricInverse)
        );
        // Inverse checked once, never re-inverted
        assert_eq!(fake.calls(), vec!["-ffoo-bar", "-fno-foo-bar"]);
    }

    #[tokio::test]
    async fn test_negative_flag_checks_positive_form() {
        let fake = Arc::new(FakeCompiler::new(|flag: &str| {
            if flag == "-fstrict" {
                fail()
            } else {
                pass()
            }
        }));
        let probe = probe_with(fake.clone());
        assert!(!probe.is_valid("-fno-strict").await.unwrap());
        assert_eq!(fake.calls(), vec!["-fno-strict", "-fstrict"]);
    }

    #[tokio::test]
    async fn test_direct_failure_skips_inverse() {
        let fake = Arc::new(FakeCompiler::new(|_: &str| fail()));
        let probe = probe_with(fake.clone());
        assert_eq!(
            probe.check("-fbogus").await.unwrap(),
            Verdict::Rejected(RejectReason::CompileError)
        );
        assert_eq!(fake.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_target_flag_has_no_inverse_check() {
        let fake = Arc::new(FakeCompiler::new(|_: &str| pass()));
        let probe = probe_with(fake.clone());
        assert!(probe.is_valid("-mavx2").await.unwrap());
        assert_eq!(fake.calls(), vec!["-mavx2"]);
    }

    #[tokio::test]
    async fn test_timeout_rejects() {
        let fake = Arc::new(FakeCompiler::new(|_: &str| hang()));
        let probe = probe_with(fake);
        assert_eq!(
            probe.check("-fslow").await.unwrap(),
            Verdict::Rejected(RejectReason::TimedOut)
        );
    }

    #[tokio::test]
    async fn test_repeated_probe_is_deterministic() {
        let fake = Arc::new(FakeCompiler::new(|flag: &str| {
            if flag.contains("bad") {
                fail()
            } else {
                pass()
            }
        }));
        let probe = probe_with(fake);
        for _ in 0..3 {
            assert!(probe.is_valid("-fgood").await.unwrap());
            assert!(!probe.is_valid("-fno-bad").await.unwrap());
        }
    }
}
