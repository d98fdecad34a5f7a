//! End-to-end orchestration: prepare, train, compile, deploy, score.
//!
//! Every step blocks until done and the first error stops the run. The
//! endpoint stays up afterwards unless `hosting.teardown_endpoint` is set.

use crate::config::WorkflowConfig;
use crate::dataset::{load_churn, split, FeatureMatrix, Partitions, Table};
use crate::error::{ChurnError, Result};
use crate::metrics::{evaluate, Evaluation};
use crate::payload;
use crate::preprocessing::{ChurnEncoder, FittedChurnEncoder, FittedTransformer, Transformer};
use crate::remote::{
    compile_or_fallback, deploy, image_uri, teardown, EndpointRef, ManagedMlService, ModelHandle,
    Predictor, RemoteTrainer, RuntimeService,
};
use crate::scoring::BatchScorer;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const TRAIN_FILE: &str = "train.csv";
pub const VALIDATION_FILE: &str = "validation.csv";
pub const TEST_FILE: &str = "test.csv";
pub const ENCODER_FILE: &str = "encoder.bin";

/// Encoded, split data plus where it was written.
#[derive(Clone, Debug)]
pub struct PreparedData {
    pub encoder: FittedChurnEncoder,
    pub partitions: Partitions,
    /// Model inputs, label excluded.
    pub n_features: usize,
    pub output_dir: PathBuf,
}

impl PreparedData {
    pub fn encoder_path(&self) -> PathBuf {
        self.output_dir.join(ENCODER_FILE)
    }
}

#[derive(Clone, Debug)]
pub struct WorkflowReport {
    pub sizes: (usize, usize, usize),
    pub n_features: usize,
    pub trained_model: ModelHandle,
    /// Compiled model, or the trained one after a fallback.
    pub deployed_model: ModelHandle,
    pub endpoint: EndpointRef,
    pub predictions: Vec<f64>,
    pub evaluation: Evaluation,
    pub endpoint_deleted: bool,
}

impl WorkflowReport {
    pub fn compiled(&self) -> bool {
        self.deployed_model != self.trained_model
    }
}

pub struct ChurnWorkflow<'a, S: ManagedMlService + ?Sized> {
    config: WorkflowConfig,
    services: &'a S,
}

impl<'a, S: ManagedMlService + ?Sized> ChurnWorkflow<'a, S> {
    pub fn new(config: WorkflowConfig, services: &'a S) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, services })
    }

    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Loads, prunes, encodes and splits a churn file.
    pub fn prepare<P: AsRef<Path>>(&self, path: P) -> Result<PreparedData> {
        self.prepare_table(load_churn(path)?)
    }

    /// Prunes, encodes and splits; writes the partitions and encoder schema
    /// to the output directory.
    pub fn prepare_table(&self, mut table: Table) -> Result<PreparedData> {
        let drop: Vec<&str> = self
            .config
            .features
            .drop_columns
            .iter()
            .map(String::as_str)
            .filter(|c| table.has_column(c))
            .collect();
        table.drop_columns(&drop)?;
        tracing::info!(dropped = ?drop, columns = table.n_columns(), "pruned redundant columns");

        let encoder = ChurnEncoder::churn()
            .with_handle_unknown(self.config.features.handle_unknown)
            .fit(&table)?;
        let matrix = encoder.transform(&table)?;
        let n_features = matrix.n_features();
        tracing::info!(rows = matrix.n_rows(), n_features, "encoded features");

        let partitions = split(&matrix, self.config.split.ratios, self.config.split.seed)?;
        let (train, validation, test) = partitions.sizes();
        tracing::info!(train, validation, test, seed = self.config.split.seed, "split rows");

        let output_dir = self.config.storage.output_dir.clone();
        std::fs::create_dir_all(&output_dir)?;
        payload::write_csv_file(&partitions.train, output_dir.join(TRAIN_FILE))?;
        payload::write_csv_file(&partitions.validation, output_dir.join(VALIDATION_FILE))?;
        payload::write_csv_file(&partitions.test, output_dir.join(TEST_FILE))?;
        encoder.save_to_file(output_dir.join(ENCODER_FILE))?;

        Ok(PreparedData {
            encoder,
            partitions,
            n_features,
            output_dir,
        })
    }

    pub fn run<P: AsRef<Path>>(&self, path: P) -> Result<WorkflowReport> {
        let prepared = self.prepare(path)?;
        self.run_prepared(&prepared)
    }

    /// Trains, optionally compiles, deploys, then scores the test partition.
    pub fn run_prepared(&self, prepared: &PreparedData) -> Result<WorkflowReport> {
        let cfg = &self.config;
        let poll = cfg.gateway.poll();
        let output = cfg.output_location();
        let image = image_uri(
            &cfg.storage.region,
            &cfg.training.image_repository,
            &cfg.training.image_version,
        )?;

        let trainer = RemoteTrainer::builder(image, cfg.storage.role.clone(), output.clone())
            .instance_type(cfg.training.instance_type.clone())
            .instance_count(cfg.training.instance_count)
            .hyperparameters(cfg.training.hyperparameters.clone())
            .poll(poll)
            .build()?;

        let parts = &prepared.partitions;
        let channels = trainer.upload(
            self.services,
            &cfg.storage.bucket,
            &cfg.storage.prefix,
            &parts.train,
            &parts.validation,
        )?;
        let job_name = job_name(&cfg.training.job_name_prefix);
        let trained_model = trainer.fit(self.services, &job_name, channels)?;

        let deployed_model = if cfg.compilation.enabled {
            compile_or_fallback(
                self.services,
                trained_model.clone(),
                prepared.n_features,
                &format!("{}-compile", job_name),
                &cfg.storage.region,
                &output,
                &cfg.compile_settings(),
            )?
        } else {
            trained_model.clone()
        };

        let endpoint = deploy(self.services, &deployed_model, &cfg.deploy_settings())?;

        let predictions = {
            let predictor = Predictor::new(self.services, endpoint.name.clone());
            BatchScorer::new(cfg.scoring.batch_size)?
                .score(&predictor, &parts.test.without_label())?
        };
        let actual = labels_of(&parts.test)?;
        let evaluation = evaluate(&actual, &predictions, &cfg.scoring.costs)?;
        tracing::info!(
            accuracy = evaluation.confusion.accuracy(),
            best_cutoff = evaluation.sweep.best_cutoff,
            best_cost = evaluation.sweep.best_cost,
            "evaluated test partition"
        );

        let endpoint_deleted = cfg.hosting.teardown_endpoint;
        if endpoint_deleted {
            teardown(self.services, &endpoint.name)?;
        } else {
            tracing::warn!(endpoint = %endpoint.name, "endpoint left running; delete it when done");
        }

        Ok(WorkflowReport {
            sizes: parts.sizes(),
            n_features: prepared.n_features,
            trained_model,
            deployed_model,
            endpoint,
            predictions,
            evaluation,
            endpoint_deleted,
        })
    }
}

fn labels_of(matrix: &FeatureMatrix) -> Result<Vec<f64>> {
    matrix
        .labels()
        .map(|y| y.to_vec())
        .ok_or_else(|| ChurnError::InvalidParameter("test partition has no label".to_string()))
}

fn job_name(prefix: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{}-{}", prefix, millis)
}

/// Scores an unlabelled churn file against a running endpoint, reusing the
/// encoder schema saved by [`ChurnWorkflow::prepare`].
pub fn score_file<R, P, Q>(
    runtime: &R,
    endpoint: &str,
    encoder_path: P,
    data_path: Q,
    batch_size: usize,
) -> Result<Vec<f64>>
where
    R: RuntimeService + ?Sized,
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let encoder = FittedChurnEncoder::load_from_file(encoder_path)?;
    let table = load_churn(data_path)?;
    let features = encoder.transform_features(&table)?;
    let predictor = Predictor::new(runtime, endpoint);
    BatchScorer::new(batch_size)?.score(&predictor, &features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{load_churn_from_reader, synthetic};
    use crate::remote::memory::InMemoryServices;
    use crate::remote::EndpointStatus;

    const CUST_SERV: &str = "CustServ Calls";

    fn config(dir: &Path) -> WorkflowConfig {
        let mut config = WorkflowConfig::default();
        config.storage.output_dir = dir.to_path_buf();
        config.gateway.poll_interval_secs = 0;
        config
    }

    fn churn_table(rows: usize) -> Table {
        load_churn_from_reader(synthetic::churn_csv(rows, 11).as_bytes()).unwrap()
    }

    fn services(encoder_columns: &[String]) -> InMemoryServices {
        let idx = encoder_columns.iter().position(|c| c == CUST_SERV).unwrap();
        InMemoryServices::new("us-west-2")
            .with_pending_polls(1)
            .with_scorer(move |row| if row[idx] > 3.0 { 0.8 } else { 0.2 })
    }

    #[test]
    fn test_prepare_writes_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let svc = InMemoryServices::new("us-west-2");
        let wf = ChurnWorkflow::new(config(dir.path()), &svc).unwrap();
        let prepared = wf.prepare_table(churn_table(3333)).unwrap();

        assert_eq!(prepared.partitions.sizes(), (2333, 666, 334));
        for file in [TRAIN_FILE, VALIDATION_FILE, TEST_FILE, ENCODER_FILE] {
            assert!(dir.path().join(file).exists(), "{} missing", file);
        }
        let names = prepared.encoder.feature_names();
        assert!(!names.iter().any(|n| n.ends_with("Charge")));
        assert_eq!(prepared.n_features, names.len());

        let train = std::fs::read_to_string(dir.path().join(TRAIN_FILE)).unwrap();
        assert_eq!(train.lines().count(), 2333);
        let first = train.lines().next().unwrap();
        assert_eq!(first.split(',').count(), prepared.n_features + 1);
        assert!(first.starts_with("0,") || first.starts_with("1,"));
    }

    #[test]
    fn test_prepare_is_deterministic() {
        let dir = tempfile::tempdir().unwrap();
        let svc = InMemoryServices::new("us-west-2");
        let wf = ChurnWorkflow::new(config(dir.path()), &svc).unwrap();
        let a = wf.prepare_table(churn_table(200)).unwrap();
        let b = wf.prepare_table(churn_table(200)).unwrap();
        assert_eq!(a.partitions, b.partitions);
        assert_eq!(a.encoder, b.encoder);
    }

    #[test]
    fn test_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let probe = InMemoryServices::new("us-west-2");
        let prepared = ChurnWorkflow::new(config(dir.path()), &probe)
            .unwrap()
            .prepare_table(churn_table(3333))
            .unwrap();

        let svc = services(&prepared.encoder.feature_names());
        let wf = ChurnWorkflow::new(config(dir.path()), &svc).unwrap();
        let report = wf.run_prepared(&prepared).unwrap();

        assert_eq!(report.sizes, (2333, 666, 334));
        assert_eq!(report.predictions.len(), 334);
        // 334 rows at batch size 500 is one request
        assert_eq!(svc.invocations(), vec![334]);
        assert!(report.compiled());
        assert_eq!(report.deployed_model.name, "deployed-xgboost-customer-churn");
        assert_eq!(report.endpoint.status, EndpointStatus::InService);
        assert!(!report.endpoint_deleted);
        assert_eq!(svc.live_endpoints(), vec!["churnflow-endpoint".to_string()]);

        let uris = svc.object_uris();
        assert!(uris.contains(
            &"s3://churnflow-data/sagemaker/DEMO-xgboost-churn/train/train.csv".to_string()
        ));
        assert_eq!(
            svc.compilation_requests()[0].input_shape["data"],
            vec![1, report.n_features]
        );
        assert_eq!(report.evaluation.confusion.total(), 334);
        assert!(report.evaluation.sweep.best_cutoff > 0.0 && report.evaluation.sweep.best_cutoff < 1.0);
    }

    #[test]
    fn test_run_without_compilation_and_with_teardown() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.compilation.enabled = false;
        cfg.hosting.teardown_endpoint = true;

        let svc = InMemoryServices::new("us-west-2");
        let wf = ChurnWorkflow::new(cfg, &svc).unwrap();
        let prepared = wf.prepare_table(churn_table(300)).unwrap();
        let report = wf.run_prepared(&prepared).unwrap();

        assert!(!report.compiled());
        assert!(svc.compilation_requests().is_empty());
        assert!(report.endpoint_deleted);
        assert!(svc.live_endpoints().is_empty());
    }

    #[test]
    fn test_run_falls_back_when_compiler_rejects_region() {
        let dir = tempfile::tempdir().unwrap();
        let svc = InMemoryServices::new("us-west-2").without_compilation();
        let wf = ChurnWorkflow::new(config(dir.path()), &svc).unwrap();
        let prepared = wf.prepare_table(churn_table(300)).unwrap();
        let report = wf.run_prepared(&prepared).unwrap();
        assert_eq!(report.deployed_model, report.trained_model);
    }

    #[test]
    fn test_run_stops_on_training_failure() {
        let dir = tempfile::tempdir().unwrap();
        let svc = InMemoryServices::new("us-west-2").with_training_failure("capacity");
        let wf = ChurnWorkflow::new(config(dir.path()), &svc).unwrap();
        let prepared = wf.prepare_table(churn_table(300)).unwrap();
        assert!(matches!(
            wf.run_prepared(&prepared),
            Err(ChurnError::JobFailed { .. })
        ));
        assert!(svc.live_endpoints().is_empty());
        assert!(svc.invocations().is_empty());
    }

    #[test]
    fn test_score_file_reuses_saved_schema() {
        let dir = tempfile::tempdir().unwrap();
        let svc = InMemoryServices::new("us-west-2");
        let wf = ChurnWorkflow::new(config(dir.path()), &svc).unwrap();
        let prepared = wf.prepare_table(churn_table(300)).unwrap();
        wf.run_prepared(&prepared).unwrap();

        // Same customers, label column removed
        let unlabelled: String = synthetic::churn_csv(40, 11)
            .lines()
            .map(|line| format!("{}\n", line.rsplit_once(',').unwrap().0))
            .collect();
        let data_path = dir.path().join("new_customers.csv");
        std::fs::write(&data_path, unlabelled).unwrap();

        let scores = score_file(
            &svc,
            "churnflow-endpoint",
            prepared.encoder_path(),
            &data_path,
            500,
        )
        .unwrap();
        assert_eq!(scores.len(), 40);
        assert_eq!(svc.invocations().last(), Some(&40));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let svc = InMemoryServices::new("us-west-2");
        let mut cfg = WorkflowConfig::default();
        cfg.scoring.batch_size = 0;
        assert!(ChurnWorkflow::new(cfg, &svc).is_err());
    }
}
