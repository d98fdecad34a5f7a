//! Workflow configuration, loaded from TOML.
//!
//! Every field has a default, so an empty file is a valid configuration:
//!
//! ```toml
//! [storage]
//! bucket = "my-bucket"
//! region = "us-east-1"
//!
//! [training.hyperparameters]
//! max_depth = 6
//!
//! [compilation]
//! enabled = false
//! ```

use crate::dataset::{SplitRatios, DEFAULT_SEED, REDUNDANT_CHARGE_COLUMNS};
use crate::error::{ChurnError, Result};
use crate::metrics::CostMatrix;
use crate::preprocessing::HandleUnknown;
use crate::remote::image::{XGBOOST_REPOSITORY, XGBOOST_VERSION};
use crate::remote::{CompileSettings, DeploySettings, Hyperparameters, PollSettings};
use crate::scoring::DEFAULT_BATCH_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub storage: StorageConfig,
    pub training: TrainingConfig,
    pub compilation: CompilationConfig,
    pub hosting: HostingConfig,
    pub scoring: ScoringConfig,
    pub split: SplitConfig,
    pub features: FeatureConfig,
    pub gateway: GatewayConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub bucket: String,
    /// Key prefix for uploaded partitions and model output.
    pub prefix: String,
    pub region: String,
    /// Execution role passed to training and compilation.
    pub role: String,
    /// Local directory for partitions and the encoder schema.
    pub output_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: "churnflow-data".to_string(),
            prefix: "sagemaker/DEMO-xgboost-churn".to_string(),
            region: "us-west-2".to_string(),
            role: "SageMakerRole".to_string(),
            output_dir: PathBuf::from("churnflow-output"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub image_repository: String,
    pub image_version: String,
    pub instance_type: String,
    pub instance_count: u32,
    pub job_name_prefix: String,
    pub hyperparameters: Hyperparameters,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            image_repository: XGBOOST_REPOSITORY.to_string(),
            image_version: XGBOOST_VERSION.to_string(),
            instance_type: "ml.m4.xlarge".to_string(),
            instance_count: 1,
            job_name_prefix: "xgboost-churn".to_string(),
            hyperparameters: Hyperparameters::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilationConfig {
    pub enabled: bool,
    pub target: String,
    pub framework: String,
    pub framework_version: String,
    pub compiled_model_name: String,
}

impl Default for CompilationConfig {
    fn default() -> Self {
        let settings = CompileSettings::default();
        Self {
            enabled: true,
            target: settings.target,
            framework: settings.framework,
            framework_version: settings.framework_version,
            compiled_model_name: settings.compiled_model_name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostingConfig {
    pub endpoint_name: String,
    pub initial_instance_count: u32,
    pub instance_type: String,
    /// Delete the endpoint once the test set is scored.
    pub teardown_endpoint: bool,
}

impl Default for HostingConfig {
    fn default() -> Self {
        Self {
            endpoint_name: "churnflow-endpoint".to_string(),
            initial_instance_count: 1,
            instance_type: "ml.m4.xlarge".to_string(),
            teardown_endpoint: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub batch_size: usize,
    pub costs: CostMatrix,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            costs: CostMatrix::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    #[serde(flatten)]
    pub ratios: SplitRatios,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            ratios: SplitRatios::default(),
            seed: DEFAULT_SEED,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Columns pruned before encoding.
    pub drop_columns: Vec<String>,
    pub handle_unknown: HandleUnknown,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            drop_columns: REDUNDANT_CHARGE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            handle_unknown: HandleUnknown::Error,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub url: String,
    /// Environment variable holding a bearer token, if any.
    pub token_env: Option<String>,
    pub timeout_secs: u64,
    pub poll_interval_secs: u64,
    /// `None` polls until the job settles.
    pub max_polls: Option<u32>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            token_env: None,
            timeout_secs: 60,
            poll_interval_secs: 30,
            max_polls: None,
        }
    }
}

impl GatewayConfig {
    pub fn poll(&self) -> PollSettings {
        PollSettings {
            interval: Duration::from_secs(self.poll_interval_secs),
            max_polls: self.max_polls,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl WorkflowConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: WorkflowConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ChurnError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ChurnError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| Err(ChurnError::Config(msg));
        if self.storage.bucket.trim().is_empty() {
            return bad("storage.bucket must not be empty".to_string());
        }
        if self.storage.region.trim().is_empty() {
            return bad("storage.region must not be empty".to_string());
        }
        if self.training.instance_count == 0 {
            return bad("training.instance_count must be positive".to_string());
        }
        if self.hosting.initial_instance_count == 0 {
            return bad("hosting.initial_instance_count must be positive".to_string());
        }
        if self.hosting.endpoint_name.trim().is_empty() {
            return bad("hosting.endpoint_name must not be empty".to_string());
        }
        if self.scoring.batch_size == 0 {
            return bad("scoring.batch_size must be positive".to_string());
        }
        self.split
            .ratios
            .validate()
            .or_else(|e| bad(format!("split: {}", e)))?;
        self.training
            .hyperparameters
            .validate()
            .or_else(|e| bad(format!("training.hyperparameters: {}", e)))?;
        Ok(())
    }

    /// Training output location, `s3://{bucket}/{prefix}/output`.
    pub fn output_location(&self) -> crate::remote::StorageLocation {
        crate::remote::StorageLocation::new(
            self.storage.bucket.clone(),
            format!("{}/output", self.storage.prefix),
        )
    }

    pub fn compile_settings(&self) -> CompileSettings {
        CompileSettings {
            target: self.compilation.target.clone(),
            framework: self.compilation.framework.clone(),
            framework_version: self.compilation.framework_version.clone(),
            compiled_model_name: self.compilation.compiled_model_name.clone(),
            role: self.storage.role.clone(),
            poll: self.gateway.poll(),
        }
    }

    pub fn deploy_settings(&self) -> DeploySettings {
        DeploySettings {
            endpoint_name: self.hosting.endpoint_name.clone(),
            initial_instance_count: self.hosting.initial_instance_count,
            instance_type: self.hosting.instance_type.clone(),
            poll: self.gateway.poll(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = WorkflowConfig::default();
        config.validate().unwrap();
        assert_eq!(config.storage.prefix, "sagemaker/DEMO-xgboost-churn");
        assert_eq!(config.split.seed, 1729);
        assert_eq!(config.scoring.batch_size, 500);
        assert_eq!(config.features.drop_columns.len(), 4);
        assert_eq!(
            config.output_location().uri(),
            "s3://churnflow-data/sagemaker/DEMO-xgboost-churn/output"
        );
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(WorkflowConfig::from_toml_str("").unwrap(), WorkflowConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = WorkflowConfig::from_toml_str(
            r#"
            [storage]
            bucket = "acme"

            [split]
            train = 0.6
            validation = 0.3
            seed = 7

            [training.hyperparameters]
            max_depth = 8

            [compilation]
            enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.bucket, "acme");
        assert_eq!(config.storage.region, "us-west-2");
        assert_eq!(config.split.ratios.train, 0.6);
        assert_eq!(config.split.seed, 7);
        assert_eq!(config.training.hyperparameters.max_depth, 8);
        assert_eq!(config.training.hyperparameters.eta, 0.2);
        assert!(!config.compilation.enabled);
    }

    #[test]
    fn test_rejects_bad_values() {
        for text in [
            "[storage]\nbucket = \"\"",
            "[scoring]\nbatch_size = 0",
            "[hosting]\ninitial_instance_count = 0",
            "[training]\ninstance_count = 0",
            "[split]\ntrain = 0.9\nvalidation = 0.3",
            "[training.hyperparameters]\nsubsample = 1.5",
        ] {
            assert!(
                matches!(WorkflowConfig::from_toml_str(text), Err(ChurnError::Config(_))),
                "accepted: {}",
                text
            );
        }
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(WorkflowConfig::from_toml_str("[storage\nbucket=").is_err());
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("churnflow.toml");
        let mut config = WorkflowConfig::default();
        config.hosting.teardown_endpoint = true;
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();
        assert_eq!(WorkflowConfig::from_file(&path).unwrap(), config);
        assert!(WorkflowConfig::from_file(dir.path().join("missing.toml")).is_err());
    }
}
