//! In-process stand-in for the managed service.
//!
//! Jobs and endpoints settle after a configurable number of polls, objects
//! live in a map and the endpoint scores each CSV row with a caller-supplied
//! function. Used by tests and by `churnflow run --dry-run`.

use crate::error::{ChurnError, Result};
use crate::payload::CONTENT_TYPE;
use crate::remote::compiler::CompilationJobRequest;
use crate::remote::deployer::EndpointRequest;
use crate::remote::image::neo_image_uri;
use crate::remote::trainer::TrainingJobRequest;
use crate::remote::{
    CompilationService, EndpointDescription, EndpointStatus, HostingService, JobDescription,
    JobStatus, ModelHandle, ObjectStore, RuntimeService, StorageLocation, TrainingService,
};
use csv::ReaderBuilder;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

type RowScorer = Box<dyn Fn(&[f64]) -> f64>;

struct Job<R> {
    request: R,
    polls: u32,
}

struct Endpoint {
    request: EndpointRequest,
    polls: u32,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<String, Vec<u8>>,
    training: Vec<Job<TrainingJobRequest>>,
    compilation: Vec<Job<CompilationJobRequest>>,
    endpoints: HashMap<String, Endpoint>,
    invocations: Vec<(String, usize)>,
}

pub struct InMemoryServices {
    region: String,
    pending_polls: u32,
    training_failure: Option<String>,
    compilation_available: bool,
    scorer: RowScorer,
    state: RefCell<State>,
}

impl fmt::Debug for InMemoryServices {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryServices")
            .field("region", &self.region)
            .field("pending_polls", &self.pending_polls)
            .finish_non_exhaustive()
    }
}

impl InMemoryServices {
    /// Jobs settle on the first poll; the endpoint answers 0.5 for every row.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            pending_polls: 0,
            training_failure: None,
            compilation_available: true,
            scorer: Box::new(|_| 0.5),
            state: RefCell::new(State::default()),
        }
    }

    /// Number of polls that report a job or endpoint as still running.
    pub fn with_pending_polls(mut self, polls: u32) -> Self {
        self.pending_polls = polls;
        self
    }

    pub fn with_scorer(mut self, scorer: impl Fn(&[f64]) -> f64 + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    /// Every training job fails with `reason`.
    pub fn with_training_failure(mut self, reason: impl Into<String>) -> Self {
        self.training_failure = Some(reason.into());
        self
    }

    /// The compilation service rejects the region.
    pub fn without_compilation(mut self) -> Self {
        self.compilation_available = false;
        self
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn object(&self, location: &StorageLocation) -> Option<Vec<u8>> {
        self.state.borrow().objects.get(&location.uri()).cloned()
    }

    pub fn object_uris(&self) -> Vec<String> {
        self.state.borrow().objects.keys().cloned().collect()
    }

    pub fn training_requests(&self) -> Vec<TrainingJobRequest> {
        self.state.borrow().training.iter().map(|j| j.request.clone()).collect()
    }

    pub fn compilation_requests(&self) -> Vec<CompilationJobRequest> {
        self.state.borrow().compilation.iter().map(|j| j.request.clone()).collect()
    }

    /// Sorted names of endpoints not yet deleted.
    pub fn live_endpoints(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.borrow().endpoints.keys().cloned().collect();
        names.sort();
        names
    }

    /// Row count of every inference request, in order.
    pub fn invocations(&self) -> Vec<usize> {
        self.state.borrow().invocations.iter().map(|(_, rows)| *rows).collect()
    }

    fn next_status(&self, polls: &mut u32) -> bool {
        let done = *polls >= self.pending_polls;
        *polls += 1;
        done
    }
}

fn conflict(what: &str, name: &str) -> ChurnError {
    ChurnError::Remote {
        status: 409,
        message: format!("{} {} already exists", what, name),
    }
}

fn not_found(what: &str, name: &str) -> ChurnError {
    ChurnError::Remote {
        status: 404,
        message: format!("{} {} not found", what, name),
    }
}

impl ObjectStore for InMemoryServices {
    fn put_object(&self, location: &StorageLocation, body: Vec<u8>) -> Result<()> {
        self.state.borrow_mut().objects.insert(location.uri(), body);
        Ok(())
    }
}

impl TrainingService for InMemoryServices {
    fn create_training_job(&self, request: &TrainingJobRequest) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.training.iter().any(|j| j.request.job_name == request.job_name) {
            return Err(conflict("training job", &request.job_name));
        }
        for channel in &request.channels {
            if !state.objects.contains_key(&channel.location.uri()) {
                return Err(ChurnError::Remote {
                    status: 400,
                    message: format!("no data at {}", channel.location),
                });
            }
        }
        state.training.push(Job {
            request: request.clone(),
            polls: 0,
        });
        Ok(())
    }

    fn describe_training_job(&self, name: &str) -> Result<JobDescription> {
        let mut state = self.state.borrow_mut();
        let job = state
            .training
            .iter_mut()
            .find(|j| j.request.job_name == name)
            .ok_or_else(|| not_found("training job", name))?;
        if !self.next_status(&mut job.polls) {
            return Ok(JobDescription {
                name: name.to_string(),
                status: JobStatus::InProgress,
                failure_reason: None,
                model: None,
            });
        }
        if let Some(reason) = &self.training_failure {
            return Ok(JobDescription {
                name: name.to_string(),
                status: JobStatus::Failed,
                failure_reason: Some(reason.clone()),
                model: None,
            });
        }
        Ok(JobDescription {
            name: name.to_string(),
            status: JobStatus::Completed,
            failure_reason: None,
            model: Some(ModelHandle {
                name: name.to_string(),
                artifact: format!("{}/{}/output/model.tar.gz", job.request.output_path, name),
                image: job.request.image.clone(),
            }),
        })
    }
}

impl CompilationService for InMemoryServices {
    fn create_compilation_job(&self, request: &CompilationJobRequest) -> Result<()> {
        if !self.compilation_available || neo_image_uri(&self.region).is_err() {
            return Err(ChurnError::UnsupportedRegion {
                region: self.region.clone(),
                repository: "compilation".to_string(),
            });
        }
        let mut state = self.state.borrow_mut();
        if state.compilation.iter().any(|j| j.request.job_name == request.job_name) {
            return Err(conflict("compilation job", &request.job_name));
        }
        state.compilation.push(Job {
            request: request.clone(),
            polls: 0,
        });
        Ok(())
    }

    fn describe_compilation_job(&self, name: &str) -> Result<JobDescription> {
        let mut state = self.state.borrow_mut();
        let job = state
            .compilation
            .iter_mut()
            .find(|j| j.request.job_name == name)
            .ok_or_else(|| not_found("compilation job", name))?;
        let done = self.next_status(&mut job.polls);
        let request = &job.request;
        Ok(JobDescription {
            name: name.to_string(),
            status: if done {
                JobStatus::Completed
            } else {
                JobStatus::InProgress
            },
            failure_reason: None,
            model: done.then(|| ModelHandle {
                name: name.to_string(),
                artifact: format!(
                    "{}/{}-{}.tar.gz",
                    request.output_path, request.model.name, request.target
                ),
                image: request.model.image.clone(),
            }),
        })
    }
}

impl HostingService for InMemoryServices {
    fn create_endpoint(&self, request: &EndpointRequest) -> Result<()> {
        let mut state = self.state.borrow_mut();
        if state.endpoints.contains_key(&request.endpoint_name) {
            return Err(conflict("endpoint", &request.endpoint_name));
        }
        state.endpoints.insert(
            request.endpoint_name.clone(),
            Endpoint {
                request: request.clone(),
                polls: 0,
            },
        );
        Ok(())
    }

    fn describe_endpoint(&self, name: &str) -> Result<EndpointDescription> {
        let mut state = self.state.borrow_mut();
        let endpoint = state
            .endpoints
            .get_mut(name)
            .ok_or_else(|| not_found("endpoint", name))?;
        let status = if self.next_status(&mut endpoint.polls) {
            EndpointStatus::InService
        } else {
            EndpointStatus::Creating
        };
        Ok(EndpointDescription {
            name: endpoint.request.endpoint_name.clone(),
            status,
            failure_reason: None,
        })
    }

    fn delete_endpoint(&self, name: &str) -> Result<()> {
        self.state
            .borrow_mut()
            .endpoints
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found("endpoint", name))
    }
}

impl RuntimeService for InMemoryServices {
    fn invoke_endpoint(&self, endpoint: &str, content_type: &str, body: &[u8]) -> Result<String> {
        if !self.state.borrow().endpoints.contains_key(endpoint) {
            return Err(not_found("endpoint", endpoint));
        }
        if content_type != CONTENT_TYPE {
            return Err(ChurnError::Remote {
                status: 415,
                message: format!("unsupported content type {}", content_type),
            });
        }

        let mut rdr = ReaderBuilder::new()
            .has_headers(false)
            .from_reader(body);
        let mut scores = Vec::new();
        for record in rdr.records() {
            let record = record?;
            let row = record
                .iter()
                .map(|cell| cell.trim().parse::<f64>())
                .collect::<std::result::Result<Vec<f64>, _>>()
                .map_err(|e| ChurnError::Remote {
                    status: 400,
                    message: format!("bad feature row: {}", e),
                })?;
            scores.push((self.scorer)(&row).to_string());
        }

        self.state
            .borrow_mut()
            .invocations
            .push((endpoint.to_string(), scores.len()));
        Ok(scores.join(","))
    }
}
