// src/probe/testing.rs — Scripted compiler stand-in for probe tests

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::core::types::ProbeResult;
use crate::infra::errors::Result;
use crate::runner::{TrialCommand, TrialExecutor};

/// Decides each trial from the flag text alone (everything between the
/// program and the trailing test-program argument).
pub(crate) struct FakeCompiler<F> {
    judge: F,
    calls: Mutex<Vec<String>>,
}

impl<F> FakeCompiler<F>
where
    F: Fn(&str) -> ProbeResult + Send + Sync,
{
    pub(crate) fn new(judge: F) -> Self {
        Self {
            judge,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Flags probed so far, in order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl<F> TrialExecutor for FakeCompiler<F>
where
    F: Fn(&str) -> ProbeResult + Send + Sync,
{
    async fn execute(&self, cmd: &TrialCommand, _deadline: Duration) -> Result<ProbeResult> {
        let words = &cmd.args[..cmd.args.len().saturating_sub(1)];
        let flag = words.join(" ");
        self.calls.lock().unwrap().push(flag.clone());
        Ok((self.judge)(&flag))
    }
}

pub(crate) fn exit(code: i32, stderr: &str) -> ProbeResult {
    ProbeResult {
        exit_code: Some(code),
        signal: None,
        stdout: String::new(),
        stderr: stderr.to_string(),
        elapsed: Duration::from_millis(3),
        timed_out: false,
    }
}

pub(crate) fn pass() -> ProbeResult {
    exit(0, "")
}

pub(crate) fn fail() -> ProbeResult {
    exit(1, "cc1: error: unrecognized command-line option")
}

pub(crate) fn hang() -> ProbeResult {
    ProbeResult {
        exit_code: None,
        signal: Some(9),
        stdout: String::new(),
        stderr: String::new(),
        elapsed: Duration::MAX,
        timed_out: true,
    }
}
