//! Managed ML service seams: storage, training, compilation, hosting and
//! inference.
//!
//! Each remote capability is a trait, so the workflow runs against the HTTP
//! gateway ([`http::GatewayClient`]) or the in-process stand-in
//! ([`memory::InMemoryServices`]) without change. Long-running jobs are
//! created, then polled with [`wait_for`] until they settle; nothing is
//! retried.

pub mod compiler;
pub mod deployer;
pub mod http;
pub mod image;
pub mod memory;
pub mod trainer;

pub use compiler::{compile_or_fallback, CompilationJobRequest, CompileSettings};
pub use deployer::{deploy, teardown, DeploySettings, EndpointRequest};
pub use http::GatewayClient;
pub use image::{image_uri, neo_image_uri};
pub use memory::InMemoryServices;
pub use trainer::{Hyperparameters, RemoteTrainer, TrainingChannel, TrainingJobRequest};

use crate::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A bucket/key pair in object storage.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageLocation {
    pub bucket: String,
    pub key: String,
}

impl StorageLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// `s3://bucket/key`
    pub fn uri(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }

    /// Parses an `s3://bucket/key` URI.
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("s3://")
            .ok_or_else(|| ChurnError::InvalidParameter(format!("not a storage URI: {}", uri)))?;
        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(ChurnError::InvalidParameter(format!(
                "storage URI without bucket: {}",
                uri
            )));
        }
        Ok(Self::new(bucket, key.trim_end_matches('/')))
    }

    /// The location one path segment up; the bucket root stays put.
    pub fn parent(&self) -> Self {
        let key = match self.key.rsplit_once('/') {
            Some((parent, _)) => parent.to_string(),
            None => String::new(),
        };
        Self::new(self.bucket.clone(), key)
    }
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri())
    }
}

/// A trained (or compiled) model owned by the remote service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelHandle {
    pub name: String,
    /// URI of the model artifact.
    pub artifact: String,
    /// Serving container image.
    pub image: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    InProgress,
    Completed,
    Failed,
    Stopped,
}

/// Server-side view of a training or compilation job.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobDescription {
    pub name: String,
    pub status: JobStatus,
    #[serde(default)]
    pub failure_reason: Option<String>,
    /// Present once the job completed.
    #[serde(default)]
    pub model: Option<ModelHandle>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointStatus {
    Creating,
    InService,
    Failed,
    Deleting,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EndpointDescription {
    pub name: String,
    pub status: EndpointStatus,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

/// A deployed endpoint; it keeps running until torn down.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointRef {
    pub name: String,
    pub status: EndpointStatus,
}

pub trait ObjectStore {
    fn put_object(&self, location: &StorageLocation, body: Vec<u8>) -> Result<()>;
}

pub trait TrainingService {
    fn create_training_job(&self, request: &TrainingJobRequest) -> Result<()>;
    fn describe_training_job(&self, name: &str) -> Result<JobDescription>;
}

pub trait CompilationService {
    fn create_compilation_job(&self, request: &CompilationJobRequest) -> Result<()>;
    fn describe_compilation_job(&self, name: &str) -> Result<JobDescription>;
}

pub trait HostingService {
    fn create_endpoint(&self, request: &EndpointRequest) -> Result<()>;
    fn describe_endpoint(&self, name: &str) -> Result<EndpointDescription>;
    fn delete_endpoint(&self, name: &str) -> Result<()>;
}

/// Sends a request body to a named endpoint and returns the decoded reply.
pub trait RuntimeService {
    fn invoke_endpoint(&self, endpoint: &str, content_type: &str, body: &[u8]) -> Result<String>;
}

/// Anything that scores a payload; the batch scorer only needs this.
pub trait InferenceEndpoint {
    fn invoke(&self, content_type: &str, body: &[u8]) -> Result<String>;
}

/// Everything the workflow needs from the managed service.
pub trait ManagedMlService:
    ObjectStore + TrainingService + CompilationService + HostingService + RuntimeService
{
}

impl<T> ManagedMlService for T where
    T: ObjectStore + TrainingService + CompilationService + HostingService + RuntimeService
{
}

/// Binds a runtime to one endpoint name.
pub struct Predictor<'a, R: RuntimeService + ?Sized> {
    runtime: &'a R,
    endpoint: String,
}

impl<'a, R: RuntimeService + ?Sized> Predictor<'a, R> {
    pub fn new(runtime: &'a R, endpoint: impl Into<String>) -> Self {
        Self {
            runtime,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl<R: RuntimeService + ?Sized> InferenceEndpoint for Predictor<'_, R> {
    fn invoke(&self, content_type: &str, body: &[u8]) -> Result<String> {
        self.runtime.invoke_endpoint(&self.endpoint, content_type, body)
    }
}

/// How often, and how many times, to poll a remote job.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PollSettings {
    pub interval: Duration,
    /// `None` waits indefinitely.
    pub max_polls: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_polls: None,
        }
    }
}

impl PollSettings {
    /// No sleeping between polls; for in-process services.
    pub fn immediate() -> Self {
        Self {
            interval: Duration::ZERO,
            max_polls: None,
        }
    }
}

/// Polls `check` until it yields a value or an error.
pub fn wait_for<T>(
    poll: &PollSettings,
    what: &str,
    mut check: impl FnMut() -> Result<Option<T>>,
) -> Result<T> {
    let mut polls = 0u32;
    loop {
        if let Some(done) = check()? {
            return Ok(done);
        }
        polls += 1;
        if poll.max_polls.is_some_and(|max| polls >= max) {
            return Err(ChurnError::JobFailed {
                job: what.to_string(),
                reason: format!("still running after {} polls", polls),
            });
        }
        tracing::debug!(job = what, polls, "waiting");
        if !poll.interval.is_zero() {
            std::thread::sleep(poll.interval);
        }
    }
}

/// Maps a finished job description to its model, or to an error.
pub(crate) fn settle_job(job: JobDescription) -> Result<Option<ModelHandle>> {
    match job.status {
        JobStatus::InProgress => Ok(None),
        JobStatus::Completed => job.model.map(Some).ok_or_else(|| {
            ChurnError::MalformedResponse(format!("job {} completed without a model", job.name))
        }),
        JobStatus::Failed | JobStatus::Stopped => Err(ChurnError::JobFailed {
            job: job.name,
            reason: job
                .failure_reason
                .unwrap_or_else(|| format!("{:?}", job.status)),
        }),
    }
}
