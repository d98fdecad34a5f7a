//! HTTP client for a managed-service gateway.
//!
//! Routes, relative to the configured base URL:
//!
//! | Operation                  | Route                                   |
//! |----------------------------|-----------------------------------------|
//! | `put_object`               | `PUT /buckets/{bucket}/objects/{key}`   |
//! | `create_training_job`      | `POST /training-jobs`                   |
//! | `describe_training_job`    | `GET /training-jobs/{name}`             |
//! | `create_compilation_job`   | `POST /compilation-jobs`                |
//! | `describe_compilation_job` | `GET /compilation-jobs/{name}`          |
//! | `create_endpoint`          | `POST /endpoints`                       |
//! | `describe_endpoint`        | `GET /endpoints/{name}`                 |
//! | `delete_endpoint`          | `DELETE /endpoints/{name}`              |
//! | `invoke_endpoint`          | `POST /endpoints/{name}/invocations`    |
//!
//! Requests and descriptions are JSON; objects and invocations are raw
//! bodies. A `501` on compilation means the region has no compiler.

use crate::error::{ChurnError, Result};
use crate::remote::compiler::CompilationJobRequest;
use crate::remote::deployer::EndpointRequest;
use crate::remote::trainer::TrainingJobRequest;
use crate::remote::{
    CompilationService, EndpointDescription, HostingService, JobDescription, ObjectStore,
    RuntimeService, StorageLocation, TrainingService,
};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::fmt;
use std::time::Duration;

pub struct GatewayClient {
    base_url: String,
    region: String,
    token: Option<String>,
    client: Client,
}

impl GatewayClient {
    pub fn new(base_url: impl Into<String>, region: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("churnflow/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            region: region.into(),
            token: None,
            client,
        })
    }

    /// Sends `token` as a bearer credential on every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let request = request.header("x-churnflow-region", &self.region);
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request.send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().unwrap_or_default();
        Err(ChurnError::Remote {
            status: status.as_u16(),
            message: if message.is_empty() {
                status.to_string()
            } else {
                message
            },
        })
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        tracing::debug!(%url, "GET");
        let response = self.send(self.client.get(&url))?;
        let text = response.text()?;
        serde_json::from_str(&text)
            .map_err(|e| ChurnError::MalformedResponse(format!("{} from {}: {}", e, url, text)))
    }

    fn post_json<T: serde::Serialize>(&self, path: &str, body: &T) -> Result<()> {
        let url = self.url(path);
        tracing::debug!(%url, "POST");
        self.send(self.client.post(&url).json(body))?;
        Ok(())
    }
}

impl fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.base_url)
            .field("region", &self.region)
            .field("has_token", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl ObjectStore for GatewayClient {
    fn put_object(&self, location: &StorageLocation, body: Vec<u8>) -> Result<()> {
        let url = self.url(&format!("buckets/{}/objects/{}", location.bucket, location.key));
        tracing::debug!(%url, bytes = body.len(), "PUT");
        self.send(
            self.client
                .put(&url)
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(body),
        )?;
        Ok(())
    }
}

impl TrainingService for GatewayClient {
    fn create_training_job(&self, request: &TrainingJobRequest) -> Result<()> {
        self.post_json("training-jobs", request)
    }

    fn describe_training_job(&self, name: &str) -> Result<JobDescription> {
        self.get_json(&format!("training-jobs/{}", name))
    }
}

impl CompilationService for GatewayClient {
    fn create_compilation_job(&self, request: &CompilationJobRequest) -> Result<()> {
        match self.post_json("compilation-jobs", request) {
            Err(ChurnError::Remote { status, .. })
                if status == StatusCode::NOT_IMPLEMENTED.as_u16() =>
            {
                Err(ChurnError::UnsupportedRegion {
                    region: self.region.clone(),
                    repository: "compilation".to_string(),
                })
            }
            other => other,
        }
    }

    fn describe_compilation_job(&self, name: &str) -> Result<JobDescription> {
        self.get_json(&format!("compilation-jobs/{}", name))
    }
}

impl HostingService for GatewayClient {
    fn create_endpoint(&self, request: &EndpointRequest) -> Result<()> {
        self.post_json("endpoints", request)
    }

    fn describe_endpoint(&self, name: &str) -> Result<EndpointDescription> {
        self.get_json(&format!("endpoints/{}", name))
    }

    fn delete_endpoint(&self, name: &str) -> Result<()> {
        let url = self.url(&format!("endpoints/{}", name));
        tracing::debug!(%url, "DELETE");
        self.send(self.client.delete(&url))?;
        Ok(())
    }
}

impl RuntimeService for GatewayClient {
    fn invoke_endpoint(&self, endpoint: &str, content_type: &str, body: &[u8]) -> Result<String> {
        let url = self.url(&format!("endpoints/{}/invocations", endpoint));
        let response = self.send(
            self.client
                .post(&url)
                .header(CONTENT_TYPE, content_type)
                .body(body.to_vec()),
        )?;
        let bytes = response.bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ChurnError::MalformedResponse(format!("non-UTF-8 predictions: {}", e)))
    }
}
