// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::infra::errors::{DiscoveryError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub compiler: CompilerConfig,

    #[serde(default)]
    pub probe: ProbeConfig,

    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub params: ParamsConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// Which compiler to interrogate and how to ask it for help text.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub path: String,
    pub target_help: String,
    pub optimizer_help: String,
    pub params_help: String,
    /// Deadline for `--version` and the help invocations.
    pub help_limit_secs: f64,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            path: "gcc".into(),
            target_help: "--help=target".into(),
            optimizer_help: "--help=optimizers".into(),
            params_help: "--help=params".into(),
            help_limit_secs: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Source file compiled by every trial.
    pub test_program: PathBuf,
    pub compile_limit_secs: f64,
    pub memory_limit_bytes: Option<u64>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            test_program: PathBuf::from("test/helloworld.c"),
            compile_limit_secs: 5.0,
            memory_limit_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub parallelism: usize,
    /// Worker count; defaults to twice the parallelism.
    pub size: Option<usize>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            parallelism: 2,
            size: None,
        }
    }
}

impl PoolConfig {
    pub fn effective_size(&self) -> usize {
        self.size
            .unwrap_or_else(|| self.parallelism.saturating_mul(2))
            .max(1)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamsConfig {
    /// Parameter-definition source (e.g. GCC's params.def). No file, no params.
    pub definitions: Option<PathBuf>,
    pub prefix: String,
    pub separator: String,
}

impl Default for ParamsConfig {
    fn default() -> Self {
        Self {
            definitions: None,
            prefix: "--param ".into(),
            separator: "=".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("compiler_flags.yaml"),
        }
    }
}

/// Command-line values that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub compiler: Option<String>,
    pub target_help: Option<String>,
    pub optimizer_help: Option<String>,
    pub params_help: Option<String>,
    pub test_program: Option<PathBuf>,
    pub compile_limit_secs: Option<f64>,
    pub memory_limit_bytes: Option<u64>,
    pub parallelism: Option<usize>,
    pub pool_size: Option<usize>,
    pub definitions: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl Config {
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, o: &ConfigOverrides) {
        if let Some(ref v) = o.compiler {
            self.compiler.path = v.clone();
        }
        if let Some(ref v) = o.target_help {
            self.compiler.target_help = v.clone();
        }
        if let Some(ref v) = o.optimizer_help {
            self.compiler.optimizer_help = v.clone();
        }
        if let Some(ref v) = o.params_help {
            self.compiler.params_help = v.clone();
        }
        if let Some(ref v) = o.test_program {
            self.probe.test_program = v.clone();
        }
        if let Some(v) = o.compile_limit_secs {
            self.probe.compile_limit_secs = v;
        }
        if let Some(v) = o.memory_limit_bytes {
            self.probe.memory_limit_bytes = Some(v);
        }
        if let Some(v) = o.parallelism {
            self.pool.parallelism = v;
        }
        if let Some(v) = o.pool_size {
            self.pool.size = Some(v);
        }
        if let Some(ref v) = o.definitions {
            self.params.definitions = Some(v.clone());
        }
        if let Some(ref v) = o.output {
            self.output.path = v.clone();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.compiler.path.trim().is_empty() {
            return Err(DiscoveryError::Config("compiler path is empty".into()));
        }
        if !(self.probe.compile_limit_secs.is_finite() && self.probe.compile_limit_secs > 0.0) {
            return Err(DiscoveryError::Config(format!(
                "compile limit must be a positive number of seconds, got {}",
                self.probe.compile_limit_secs
            )));
        }
        if !(self.compiler.help_limit_secs.is_finite() && self.compiler.help_limit_secs > 0.0) {
            return Err(DiscoveryError::Config(format!(
                "help limit must be a positive number of seconds, got {}",
                self.compiler.help_limit_secs
            )));
        }
        if self.pool.parallelism == 0 {
            return Err(DiscoveryError::Config(
                "parallelism must be at least 1".into(),
            ));
        }
        if self.pool.size == Some(0) {
            return Err(DiscoveryError::Config("pool size must be at least 1".into()));
        }
        if self.probe.memory_limit_bytes == Some(0) {
            return Err(DiscoveryError::Config(
                "memory limit must be non-zero when given".into(),
            ));
        }
        Ok(())
    }

    pub fn compile_limit(&self) -> Duration {
        Duration::from_secs_f64(self.probe.compile_limit_secs)
    }

    pub fn help_limit(&self) -> Duration {
        Duration::from_secs_f64(self.compiler.help_limit_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_reasonable() {
        let c = Config::default();
        assert_eq!(c.compiler.path, "gcc");
        assert_eq!(c.compiler.target_help, "--help=target");
        assert_eq!(c.compiler.optimizer_help, "--help=optimizers");
        assert_eq!(c.compiler.params_help, "--help=params");
        assert!((c.probe.compile_limit_secs - 5.0).abs() < 0.001);
        assert!(c.probe.memory_limit_bytes.is_none());
        assert_eq!(c.pool.parallelism, 2);
        assert_eq!(c.params.prefix, "--param ");
        assert_eq!(c.params.separator, "=");
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_pool_size_scales_with_parallelism() {
        let mut p = PoolConfig::default();
        assert_eq!(p.effective_size(), 4);
        p.parallelism = 8;
        assert_eq!(p.effective_size(), 16);
        p.size = Some(3);
        assert_eq!(p.effective_size(), 3);
    }

    #[test]
    fn test_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.compiler.path, "gcc");
        assert_eq!(config.pool.parallelism, 2);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml_str = r#"
[compiler]
path = "/usr/bin/gcc-12"
target_help = "--help=target"
optimizer_help = "--help=optimizers"
params_help = "--help=params"
help_limit_secs = 10.0

[probe]
test_program = "tests/hello.c"
compile_limit_secs = 2.5
memory_limit_bytes = 1073741824

[pool]
parallelism = 4
size = 6

[params]
definitions = "/src/gcc/gcc/params.def"
prefix = "--param "
separator = "="

[output]
path = "out.yaml"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.compiler.path, "/usr/bin/gcc-12");
        assert!((config.compiler.help_limit_secs - 10.0).abs() < 0.001);
        assert_eq!(config.probe.test_program, PathBuf::from("tests/hello.c"));
        assert_eq!(config.compile_limit(), Duration::from_millis(2500));
        assert_eq!(config.probe.memory_limit_bytes, Some(1 << 30));
        assert_eq!(config.pool.effective_size(), 6);
        assert_eq!(
            config.params.definitions,
            Some(PathBuf::from("/src/gcc/gcc/params.def"))
        );
        assert_eq!(config.output.path, PathBuf::from("out.yaml"));
    }

    #[test]
    fn test_overrides_win() {
        let mut config = Config::default();
        config.apply_overrides(&ConfigOverrides {
            compiler: Some("clang".into()),
            compile_limit_secs: Some(1.0),
            parallelism: Some(6),
            output: Some(PathBuf::from("x.yaml")),
            ..Default::default()
        });
        assert_eq!(config.compiler.path, "clang");
        assert_eq!(config.compile_limit(), Duration::from_secs(1));
        assert_eq!(config.pool.effective_size(), 12);
        assert_eq!(config.output.path, PathBuf::from("x.yaml"));
        // Untouched fields keep their values
        assert_eq!(config.compiler.target_help, "--help=target");
    }

    #[test]
    fn test_validate_rejects_bad_limits() {
        let mut c = Config::default();
        c.probe.compile_limit_secs = 0.0;
        assert!(matches!(c.validate(), Err(DiscoveryError::Config(_))));

        let mut c = Config::default();
        c.pool.parallelism = 0;
        assert!(c.validate().is_err());

        let mut c = Config::default();
        c.probe.compile_limit_secs = f64::INFINITY;
        assert!(c.validate().is_err());

        let mut c = Config::default();
        c.probe.memory_limit_bytes = Some(0);
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.compiler.path, config.compiler.path);
        assert_eq!(deserialized.pool.parallelism, config.pool.parallelism);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load_from(Path::new("/nonexistent/flagprobe.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: Config = toml::from_str("[compiler]\npath = \"gcc-9\"\n").unwrap();
        assert_eq!(config.compiler.path, "gcc-9");
        assert_eq!(config.compiler.params_help, "--help=params");
        assert!((config.compiler.help_limit_secs - 30.0).abs() < 0.001);
    }
}
