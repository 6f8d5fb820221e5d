// src/output/mod.rs — Autotuner configuration output
//
// Serializes a discovery report into the `compiler:` section the autotuner
// reads: name, version and the list of tunable flags.

use std::path::Path;

use serde::Serialize;

use crate::core::types::ValidatedFlag;
use crate::discovery::DiscoveryReport;

const UNKNOWN_VERSION: &str = "unknown";

#[derive(Serialize)]
struct Document<'a> {
    compiler: CompilerSection<'a>,
}

#[derive(Serialize)]
struct CompilerSection<'a> {
    name: &'a str,
    version: String,
    flags: &'a [ValidatedFlag],
}

/// Render `report` as YAML.
pub fn render_yaml(report: &DiscoveryReport) -> anyhow::Result<String> {
    let doc = Document {
        compiler: CompilerSection {
            name: &report.compiler_name,
            version: report
                .version
                .map(|v| v.to_string())
                .unwrap_or_else(|| UNKNOWN_VERSION.to_string()),
            flags: &report.flags,
        },
    };
    Ok(serde_yml::to_string(&doc)?)
}

/// Render `report` and write it to `path`.
pub fn write_report(report: &DiscoveryReport, path: &Path) -> anyhow::Result<()> {
    let yaml = render_yaml(report)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, yaml)?;
    tracing::info!("Wrote {}", path.display());
    Ok(())
}
