use crate::storage::ReservedNames;
use crate::tracking::BuildMode;
use crate::utils::IgnoreSet;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub core: CoreConfig,

    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Content heuristics used by `scan`
    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub performance: PerformanceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    #[serde(default)]
    pub build_mode: BuildMode,
    /// When false only the modification time decides `Modified`
    #[serde(default = "default_true")]
    pub compare_size: bool,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    /// Base names of files never recorded as tracked content
    #[serde(default = "default_reserved_names")]
    pub reserved_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_keywords")]
    pub keywords: Vec<String>,
    #[serde(default = "default_true")]
    pub flag_non_ascii: bool,
    #[serde(default = "default_true")]
    pub skip_binary: bool,
    /// Bytes read from the start of each file
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,
    #[serde(default)]
    pub quarantine_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Analysis threads per process; 0 picks a default
    #[serde(default = "default_parallel_threads")]
    pub parallel_threads: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            build_mode: BuildMode::default(),
            compare_size: true,
            ignore_patterns: Vec::new(),
            reserved_names: default_reserved_names(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            keywords: default_keywords(),
            flag_non_ascii: true,
            skip_binary: true,
            max_bytes: default_max_bytes(),
            quarantine_dir: None,
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            parallel_threads: default_parallel_threads(),
        }
    }
}

impl TrackingConfig {
    /// Compile the ignore globs.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid pattern.
    pub fn ignore_set(&self) -> Result<IgnoreSet> {
        IgnoreSet::new(&self.ignore_patterns).context("Invalid pattern in tracking.ignore_patterns")
    }

    /// Reserved names, always including the state and lock files.
    #[must_use]
    pub fn reserved(&self) -> ReservedNames {
        let mut names = default_reserved_names();
        names.push(crate::LOCK_FILE.to_string());
        for name in &self.reserved_names {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        ReservedNames::new(names)
    }
}

impl Config {
    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Cannot create parent directories
    /// - Cannot read or parse the configuration file
    /// - Configuration file contains invalid TOML or invalid values
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            // Create default config if it doesn't exist
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.core.state_dir =
            crate::utils::expand_tilde(&config.core.state_dir.to_string_lossy())?;
        if let Some(dir) = &config.analysis.quarantine_dir {
            config.analysis.quarantine_dir =
                Some(crate::utils::expand_tilde(&dir.to_string_lossy())?);
        }
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Cannot create parent directories
    /// - Cannot write to the file
    /// - TOML serialization fails
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(toml_str.as_bytes())?;
        Ok(())
    }

    /// Check values serde cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid ignore glob or a zero read cap.
    pub fn validate(&self) -> Result<()> {
        self.tracking.ignore_set()?;
        if self.analysis.max_bytes == 0 {
            anyhow::bail!("analysis.max_bytes must be greater than 0");
        }
        if self.tracking.reserved_names.iter().any(|n| n.contains('/')) {
            anyhow::bail!("tracking.reserved_names must be base names, not paths");
        }
        Ok(())
    }
}

// Default functions for serde
fn default_state_dir() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/tmp"));
    home.join(crate::DEFAULT_STATE_DIR)
}

const fn default_true() -> bool {
    true
}

fn default_reserved_names() -> Vec<String> {
    vec![
        crate::PREVIOUS_SNAPSHOT_FILE.to_string(),
        crate::CURRENT_SNAPSHOT_FILE.to_string(),
    ]
}

fn default_keywords() -> Vec<String> {
    ["corrupted", "dangerous", "risk", "attack", "malware", "malicious"]
        .into_iter()
        .map(String::from)
        .collect()
}

const fn default_max_bytes() -> usize {
    1_048_576 // 1MB
}

fn default_parallel_threads() -> usize {
    crate::utils::thread_pool::default_threads()
}
