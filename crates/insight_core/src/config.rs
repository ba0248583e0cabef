//! Run configuration.
//!
//! Defaults match the directory layout of a fresh checkout; a TOML file can
//! override any subset of the fields.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, CoreResult};

/// Memory bank file name used inside `log_dir` when no path is configured.
pub const MEMORY_FILE: &str = "memory_bank.jsonl";

/// Settings for the optional text-generation call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LlmSettings {
    /// Model override (provider default when absent)
    pub model: Option<String>,
    /// HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: None,
            timeout_secs: 30,
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FlowConfig {
    /// Directory receiving charts and generated datasets
    pub output_dir: PathBuf,
    /// Directory receiving run logs and the tracing log file
    pub log_dir: PathBuf,
    /// Long-term memory bank file (JSON lines), `<log_dir>/memory_bank.jsonl`
    /// when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_path: Option<PathBuf>,
    /// File name of the monthly revenue chart inside `output_dir`
    pub chart_file: String,
    /// Text generation settings
    pub llm: LlmSettings,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("insightflow_output"),
            log_dir: PathBuf::from("insightflow_logs"),
            memory_path: None,
            chart_file: "monthly_revenue.svg".to_string(),
            llm: LlmSettings::default(),
        }
    }
}

impl FlowConfig {
    /// Load configuration from a TOML file. Missing fields take defaults.
    pub fn load(path: &Path) -> CoreResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| CoreError::Config(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Rebase every relative path onto `root`.
    pub fn rooted_at(mut self, root: &Path) -> Self {
        if self.output_dir.is_relative() {
            self.output_dir = root.join(&self.output_dir);
        }
        if self.log_dir.is_relative() {
            self.log_dir = root.join(&self.log_dir);
        }
        if let Some(memory_path) = &self.memory_path {
            if memory_path.is_relative() {
                self.memory_path = Some(root.join(memory_path));
            }
        }
        self
    }

    /// Memory bank file: the configured path, or [`MEMORY_FILE`] inside
    /// `log_dir`.
    pub fn memory_path(&self) -> PathBuf {
        self.memory_path
            .clone()
            .unwrap_or_else(|| self.log_dir.join(MEMORY_FILE))
    }

    /// Full path of the monthly revenue chart.
    pub fn chart_path(&self) -> PathBuf {
        self.output_dir.join(&self.chart_file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = FlowConfig::default();
        assert_eq!(config.chart_path(), PathBuf::from("insightflow_output/monthly_revenue.svg"));
        assert_eq!(config.llm.timeout_secs, 30);
        assert!(config.llm.model.is_none());
        assert_eq!(config.memory_path(), PathBuf::from("insightflow_logs/memory_bank.jsonl"));
    }

    #[test]
    fn test_memory_path_follows_log_dir_unless_set() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("insightflow.toml");
        fs::write(&path, "log_dir = \"elsewhere\"\n").unwrap();
        let config = FlowConfig::load(&path).unwrap();
        assert_eq!(config.memory_path(), PathBuf::from("elsewhere/memory_bank.jsonl"));

        fs::write(&path, "log_dir = \"elsewhere\"\nmemory_path = \"bank.jsonl\"\n").unwrap();
        let config = FlowConfig::load(&path).unwrap();
        assert_eq!(config.memory_path(), PathBuf::from("bank.jsonl"));
    }

    #[test]
    fn test_load_partial_toml() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("insightflow.toml");
        fs::write(
            &path,
            "output_dir = \"out\"\n\n[llm]\nmodel = \"gpt-4o-mini\"\n",
        )
        .unwrap();

        let config = FlowConfig::load(&path).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.log_dir, PathBuf::from("insightflow_logs"));
        assert_eq!(config.llm.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(config.llm.timeout_secs, 30);
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("broken.toml");
        fs::write(&path, "output_dir = [").unwrap();

        assert!(matches!(FlowConfig::load(&path), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_rooted_at_keeps_absolute_paths() {
        let mut config = FlowConfig::default();
        config.log_dir = PathBuf::from("/var/log/insightflow");

        let config = config.rooted_at(Path::new("/work"));
        assert_eq!(config.output_dir, PathBuf::from("/work/insightflow_output"));
        assert_eq!(config.log_dir, PathBuf::from("/var/log/insightflow"));
        assert_eq!(
            config.memory_path(),
            PathBuf::from("/var/log/insightflow/memory_bank.jsonl")
        );

        let mut config = FlowConfig::default();
        config.memory_path = Some(PathBuf::from("bank.jsonl"));
        let config = config.rooted_at(Path::new("/work"));
        assert_eq!(config.memory_path(), PathBuf::from("/work/bank.jsonl"));
    }
}
