//! # churnflow
//!
//! Customer-churn prediction workflow over a managed ML service.
//!
//! ## Pipeline
//!
//! 1. **Load and clean** a fixed-schema customer file ([`dataset`]): drop the
//!    per-row identifier, retype the area code as categorical.
//! 2. **Explore** ([`explore`]): frequencies, histograms, correlations, and
//!    the redundant charge columns to prune.
//! 3. **Encode** ([`preprocessing`]): one-hot categoricals, label first as a
//!    single 0/1 column. The fitted schema is saved and reused for scoring.
//! 4. **Split** 70/20/10 with a fixed seed ([`dataset::split`]).
//! 5. **Train, compile, deploy** through the managed service ([`remote`]).
//! 6. **Score** the test partition in mini-batches ([`scoring`]) and
//!    **evaluate** it against a cost matrix ([`metrics`]).
//!
//! [`workflow::ChurnWorkflow`] runs all of it from a [`config::WorkflowConfig`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use churnflow::config::WorkflowConfig;
//! use churnflow::remote::InMemoryServices;
//! use churnflow::workflow::ChurnWorkflow;
//!
//! let services = InMemoryServices::new("us-west-2");
//! let workflow = ChurnWorkflow::new(WorkflowConfig::default(), &services)?;
//! let report = workflow.run("churn.txt")?;
//! println!("{} predictions, best cutoff {}", report.predictions.len(), report.evaluation.sweep.best_cutoff);
//! # Ok::<(), churnflow::ChurnError>(())
//! ```

/// TOML workflow configuration.
pub mod config;

/// Loading, cleaning and splitting customer records.
pub mod dataset;

pub mod error;

/// Exploratory statistics for human inspection.
pub mod explore;

/// Confusion matrices and cost-based cutoff selection.
pub mod metrics;

/// Headerless CSV payloads and prediction parsing.
pub mod payload;

/// Feature encoding transformers.
pub mod preprocessing;

/// Managed-service traits, clients and orchestration steps.
pub mod remote;

/// Mini-batch endpoint scoring.
pub mod scoring;

/// Fitted-parameter persistence.
pub mod serialization;

/// End-to-end orchestration.
pub mod workflow;

pub use error::{ChurnError, Result};
