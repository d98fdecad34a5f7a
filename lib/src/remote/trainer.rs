//! Uploading partitions and running one managed boosted-tree training job.

use crate::dataset::FeatureMatrix;
use crate::error::{ChurnError, Result};
use crate::payload::{self, CONTENT_TYPE};
use crate::remote::{
    settle_job, wait_for, ModelHandle, ObjectStore, PollSettings, StorageLocation,
    TrainingService,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Boosted-tree settings sent with the training job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Hyperparameters {
    pub max_depth: u32,
    /// Shrinkage applied to each tree.
    pub eta: f64,
    /// Minimum loss reduction to split.
    pub gamma: f64,
    pub min_child_weight: f64,
    pub subsample: f64,
    pub silent: u8,
    pub objective: String,
    pub num_round: u32,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            max_depth: 5,
            eta: 0.2,
            gamma: 4.0,
            min_child_weight: 6.0,
            subsample: 0.8,
            silent: 0,
            objective: "binary:logistic".to_string(),
            num_round: 100,
        }
    }
}

impl Hyperparameters {
    pub fn validate(&self) -> Result<()> {
        let bad = |msg: &str| Err(ChurnError::InvalidParameter(msg.to_string()));
        if self.max_depth == 0 {
            return bad("max_depth must be positive");
        }
        if !(self.eta > 0.0 && self.eta <= 1.0) {
            return bad("eta must be in (0, 1]");
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return bad("subsample must be in (0, 1]");
        }
        if self.gamma < 0.0 || self.min_child_weight < 0.0 {
            return bad("gamma and min_child_weight must be non-negative");
        }
        if self.num_round == 0 {
            return bad("num_round must be positive");
        }
        Ok(())
    }

    /// The string map the training service takes.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("max_depth".to_string(), self.max_depth.to_string()),
            ("eta".to_string(), self.eta.to_string()),
            ("gamma".to_string(), self.gamma.to_string()),
            ("min_child_weight".to_string(), self.min_child_weight.to_string()),
            ("subsample".to_string(), self.subsample.to_string()),
            ("silent".to_string(), self.silent.to_string()),
            ("objective".to_string(), self.objective.clone()),
            ("num_round".to_string(), self.num_round.to_string()),
        ])
    }
}

/// One named input of a training job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingChannel {
    pub name: String,
    pub location: StorageLocation,
    pub content_type: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingJobRequest {
    pub job_name: String,
    pub image: String,
    pub role: String,
    pub instance_type: String,
    pub instance_count: u32,
    pub output_path: String,
    pub channels: Vec<TrainingChannel>,
    pub hyperparameters: BTreeMap<String, String>,
}

/// Runs training jobs with a fixed image, role and hyperparameter set.
///
/// Build with [`RemoteTrainer::builder`]; the trainer is immutable and can
/// launch any number of jobs.
#[derive(Clone, Debug)]
pub struct RemoteTrainer {
    pub(crate) image: String,
    pub(crate) role: String,
    pub(crate) instance_type: String,
    pub(crate) instance_count: u32,
    pub(crate) output: StorageLocation,
    pub(crate) hyperparameters: Hyperparameters,
    pub(crate) poll: PollSettings,
}

/// Fluent builder for [`RemoteTrainer`].
///
/// Defaults:
/// - `instance_type`: `ml.m4.xlarge`
/// - `instance_count`: 1
/// - `hyperparameters`: [`Hyperparameters::default`]
/// - `poll`: every 30 s, no limit
pub struct RemoteTrainerBuilder {
    image: String,
    role: String,
    output: StorageLocation,
    instance_type: String,
    instance_count: u32,
    hyperparameters: Hyperparameters,
    poll: PollSettings,
}

impl RemoteTrainerBuilder {
    pub fn new(image: impl Into<String>, role: impl Into<String>, output: StorageLocation) -> Self {
        Self {
            image: image.into(),
            role: role.into(),
            output,
            instance_type: "ml.m4.xlarge".to_string(),
            instance_count: 1,
            hyperparameters: Hyperparameters::default(),
            poll: PollSettings::default(),
        }
    }

    pub fn instance_type(mut self, instance_type: impl Into<String>) -> Self {
        self.instance_type = instance_type.into();
        self
    }

    pub fn instance_count(mut self, count: u32) -> Self {
        self.instance_count = count;
        self
    }

    pub fn hyperparameters(mut self, hyperparameters: Hyperparameters) -> Self {
        self.hyperparameters = hyperparameters;
        self
    }

    pub fn poll(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn build(self) -> Result<RemoteTrainer> {
        if self.instance_count == 0 {
            return Err(ChurnError::InvalidParameter(
                "training needs at least one instance".to_string(),
            ));
        }
        self.hyperparameters.validate()?;
        Ok(RemoteTrainer {
            image: self.image,
            role: self.role,
            instance_type: self.instance_type,
            instance_count: self.instance_count,
            output: self.output,
            hyperparameters: self.hyperparameters,
            poll: self.poll,
        })
    }
}

impl RemoteTrainer {
    pub fn builder(
        image: impl Into<String>,
        role: impl Into<String>,
        output: StorageLocation,
    ) -> RemoteTrainerBuilder {
        RemoteTrainerBuilder::new(image, role, output)
    }

    pub fn output(&self) -> &StorageLocation {
        &self.output
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyperparameters
    }

    /// Uploads train and validation partitions as headerless, label-first
    /// CSV to `{prefix}/train/train.csv` and
    /// `{prefix}/validation/validation.csv`.
    pub fn upload<S: ObjectStore + ?Sized>(
        &self,
        store: &S,
        bucket: &str,
        prefix: &str,
        train: &FeatureMatrix,
        validation: &FeatureMatrix,
    ) -> Result<Vec<TrainingChannel>> {
        let mut channels = Vec::with_capacity(2);
        for (name, matrix) in [("train", train), ("validation", validation)] {
            if !matrix.has_label() {
                return Err(ChurnError::InvalidParameter(format!(
                    "{} partition has no label column",
                    name
                )));
            }
            let location = StorageLocation::new(bucket, format!("{}/{}/{}.csv", prefix, name, name));
            let body = payload::to_csv_bytes(matrix)?;
            tracing::debug!(channel = name, rows = matrix.n_rows(), bytes = body.len(), %location, "uploading");
            store.put_object(&location, body)?;
            channels.push(TrainingChannel {
                name: name.to_string(),
                location,
                content_type: CONTENT_TYPE.to_string(),
            });
        }
        Ok(channels)
    }

    pub fn request(&self, job_name: &str, channels: Vec<TrainingChannel>) -> TrainingJobRequest {
        TrainingJobRequest {
            job_name: job_name.to_string(),
            image: self.image.clone(),
            role: self.role.clone(),
            instance_type: self.instance_type.clone(),
            instance_count: self.instance_count,
            output_path: self.output.uri(),
            channels,
            hyperparameters: self.hyperparameters.to_map(),
        }
    }

    /// Starts the job and blocks until it settles.
    ///
    /// A failed or stopped job surfaces as [`ChurnError::JobFailed`].
    pub fn fit<S: TrainingService + ?Sized>(
        &self,
        service: &S,
        job_name: &str,
        channels: Vec<TrainingChannel>,
    ) -> Result<ModelHandle> {
        let request = self.request(job_name, channels);
        tracing::info!(job = job_name, image = %request.image, "starting training job");
        service.create_training_job(&request)?;
        let model = wait_for(&self.poll, job_name, || {
            settle_job(service.describe_training_job(job_name)?)
        })?;
        tracing::info!(job = job_name, artifact = %model.artifact, "training finished");
        Ok(model)
    }
}
