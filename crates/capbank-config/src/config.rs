//! ---
//! cb_section: "03-configuration"
//! cb_subsection: "module"
//! cb_type: "source"
//! cb_scope: "code"
//! cb_description: "TOML configuration for logging, export and named studies."
//! cb_version: "v0.1.0"
//! cb_owner: "protection-studies"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use capbank_engine::{
    critical::CriticalRowPolicy,
    export::ExportSettings,
    io::load_nameplate_from_file,
    model::{BankNameplate, Grounding, Topology},
    presets, validation, AnalysisOptions, UnbalanceRequest,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

/// Top-level configuration for `capbankctl`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub critical: CriticalRowPolicy,
    #[serde(default)]
    pub studies: IndexMap<String, StudyConfig>,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: PathBuf,
}

impl LoadedAppConfig {
    /// Directory relative nameplate paths are resolved against.
    pub fn base_dir(&self) -> Option<&Path> {
        self.source.parent()
    }
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "CAPBANK_CONFIG";

    /// Load configuration from disk, respecting the `CAPBANK_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration from disk together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path,
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: path.to_path_buf(),
                });
            }
        }

        Err(anyhow!(
            "no configuration files found. inspected: {}",
            candidates
                .iter()
                .map(|p| p.as_ref().display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn study(&self, name: &str) -> Option<&StudyConfig> {
        self.studies.get(name)
    }

    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            critical: self.critical,
            export: self.export.settings.clone(),
        }
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        let max_ratio = self.critical.max_ratio;
        if !(max_ratio.is_finite() && max_ratio > 0.0) {
            return Err(anyhow!(
                "critical.max_ratio must be a positive number, got {max_ratio}"
            ));
        }
        if self.export.settings.decimals > 12 {
            return Err(anyhow!(
                "export.decimals must be at most 12, got {}",
                self.export.settings.decimals
            ));
        }
        for (name, study) in &self.studies {
            study.validate(name)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(flatten)]
    pub settings: ExportSettings,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            settings: ExportSettings::default(),
        }
    }
}

/// One named bank study. Without a nameplate the topology preset is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    pub topology: Topology,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub nameplate: Option<BankNameplate>,
    #[serde(default)]
    pub nameplate_file: Option<PathBuf>,
    /// Overrides the nameplate's `G` flag.
    #[serde(default)]
    pub grounding: Option<Grounding>,
    #[serde(default)]
    pub fault_indices: Option<Vec<u32>>,
    #[serde(default)]
    pub include_sentinel: bool,
    /// Per-study report directory; defaults to `<export.output_dir>/<study>`.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl StudyConfig {
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            description: None,
            nameplate: None,
            nameplate_file: None,
            grounding: None,
            fault_indices: None,
            include_sentinel: false,
            output_dir: None,
        }
    }

    pub fn validate(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(anyhow!("study names must not be empty"));
        }
        if self.nameplate.is_some() && self.nameplate_file.is_some() {
            return Err(anyhow!(
                "study '{name}' sets both nameplate and nameplate_file"
            ));
        }
        if self.include_sentinel && self.topology != Topology::HBridgeExternalFuses {
            return Err(anyhow!(
                "study '{name}': the SU row only exists for {}",
                Topology::HBridgeExternalFuses
            ));
        }
        if let Some(nameplate) = &self.nameplate {
            validation::validate(self.topology, &nameplate.arrangement)
                .into_result()
                .with_context(|| format!("study '{name}' has an invalid arrangement"))?;
        }
        Ok(())
    }

    /// Inline nameplate, then `nameplate_file` (relative to `base_dir`), then the preset.
    pub fn resolve_nameplate(&self, base_dir: Option<&Path>) -> Result<BankNameplate> {
        let nameplate = match (&self.nameplate, &self.nameplate_file) {
            (Some(nameplate), _) => nameplate.clone(),
            (None, Some(file)) => {
                let path = match base_dir {
                    Some(base) if file.is_relative() => base.join(file),
                    _ => file.clone(),
                };
                load_nameplate_from_file(&path)
                    .with_context(|| format!("unable to load nameplate {}", path.display()))?
            }
            (None, None) => presets::preset(self.topology),
        };
        Ok(match self.grounding {
            Some(grounding) => nameplate.with_grounding(grounding),
            None => nameplate,
        })
    }

    pub fn request(&self, name: &str, base_dir: Option<&Path>) -> Result<UnbalanceRequest> {
        let nameplate = self.resolve_nameplate(base_dir)?;
        let mut request = UnbalanceRequest::new(self.topology, nameplate)
            .with_study(name)
            .with_sentinel(self.include_sentinel);
        if let Some(counts) = &self.fault_indices {
            let kind = self.topology.fault_kind();
            request = request.with_fault_indices(counts.iter().map(|c| kind.index(*c)).collect());
        }
        Ok(request)
    }

    pub fn output_dir(&self, name: &str, export: &ExportConfig) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| export.output_dir.join(name))
    }
}
