//! Subcommand implementations.

use crate::args::{ExploreArgs, PrepareArgs, RunArgs, ScoreArgs, TeardownArgs};
use anyhow::{Context, Result};
use churnflow::config::WorkflowConfig;
use churnflow::dataset::{load_churn, CHURN_LABEL};
use churnflow::explore::Summary;
use churnflow::remote::{teardown, GatewayClient, InMemoryServices, ManagedMlService};
use churnflow::workflow::{score_file, ChurnWorkflow, WorkflowReport};
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

pub fn load_config(path: Option<&Path>) -> Result<WorkflowConfig> {
    match path {
        Some(path) => WorkflowConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(WorkflowConfig::default()),
    }
}

fn gateway(config: &WorkflowConfig) -> Result<GatewayClient> {
    let client = GatewayClient::new(
        config.gateway.url.clone(),
        config.storage.region.clone(),
        config.gateway.timeout(),
    )
    .context("building gateway client")?;
    let token = config
        .gateway
        .token_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok());
    Ok(match token {
        Some(token) => client.with_token(token),
        None => client,
    })
}

pub fn explore(args: &ExploreArgs) -> Result<String> {
    let table = load_churn(&args.data)
        .with_context(|| format!("loading {}", args.data.display()))?;
    let summary = Summary::build(&table, Some(CHURN_LABEL), args.bins, args.threshold)?;
    Ok(summary.render())
}

pub fn prepare(config: WorkflowConfig, args: &PrepareArgs) -> Result<String> {
    let mut config = config;
    if let Some(dir) = &args.output_dir {
        config.storage.output_dir = dir.clone();
    }
    // Preparation never touches the remote service.
    let services = InMemoryServices::new(config.storage.region.clone());
    let workflow = ChurnWorkflow::new(config, &services)?;
    let prepared = workflow
        .prepare(&args.data)
        .with_context(|| format!("preparing {}", args.data.display()))?;

    let (train, validation, test) = prepared.partitions.sizes();
    Ok(format!(
        "train {} / validation {} / test {} rows, {} features\nwritten to {}\n",
        train,
        validation,
        test,
        prepared.n_features,
        prepared.output_dir.display()
    ))
}

pub fn run(config: WorkflowConfig, args: &RunArgs) -> Result<String> {
    let mut config = config;
    if let Some(dir) = &args.output_dir {
        config.storage.output_dir = dir.clone();
    }
    if args.no_compile {
        config.compilation.enabled = false;
    }
    if args.teardown {
        config.hosting.teardown_endpoint = true;
    }

    if args.dry_run {
        config.gateway.poll_interval_secs = 0;
        let services = InMemoryServices::new(config.storage.region.clone());
        run_with(config, &services, &args.data)
    } else {
        let services = gateway(&config)?;
        run_with(config, &services, &args.data)
    }
}

fn run_with<S: ManagedMlService + ?Sized>(
    config: WorkflowConfig,
    services: &S,
    data: &Path,
) -> Result<String> {
    let workflow = ChurnWorkflow::new(config, services)?;
    let report = workflow
        .run(data)
        .with_context(|| format!("running workflow on {}", data.display()))?;
    Ok(render_report(&report))
}

pub fn render_report(report: &WorkflowReport) -> String {
    let mut out = String::new();
    let (train, validation, test) = report.sizes;
    let eval = &report.evaluation;
    let _ = writeln!(out, "partitions: train {} / validation {} / test {}", train, validation, test);
    let _ = writeln!(out, "features: {}", report.n_features);
    let _ = writeln!(out, "trained model: {} ({})", report.trained_model.name, report.trained_model.artifact);
    if report.compiled() {
        let _ = writeln!(out, "compiled model: {} ({})", report.deployed_model.name, report.deployed_model.artifact);
    } else {
        let _ = writeln!(out, "compiled model: none, deployed the trained model");
    }
    let _ = writeln!(
        out,
        "endpoint: {} ({})",
        report.endpoint.name,
        if report.endpoint_deleted { "deleted" } else { "still running" }
    );
    let _ = writeln!(out, "\nconfusion at 0.5:\n{}", eval.confusion);
    let _ = writeln!(
        out,
        "accuracy {:.3}, precision {:.3}, recall {:.3}",
        eval.confusion.accuracy(),
        eval.confusion.precision(),
        eval.confusion.recall()
    );
    let _ = writeln!(
        out,
        "\ncheapest cutoff {:.2} costs {:.0}:\n{}",
        eval.sweep.best_cutoff, eval.sweep.best_cost, eval.best_confusion
    );
    out
}

pub fn score(config: WorkflowConfig, args: &ScoreArgs) -> Result<usize> {
    let endpoint = args
        .endpoint
        .clone()
        .unwrap_or_else(|| config.hosting.endpoint_name.clone());
    let batch_size = args.batch_size.unwrap_or(config.scoring.batch_size);
    let services = gateway(&config)?;
    let predictions = score_file(&services, &endpoint, &args.encoder, &args.data, batch_size)
        .with_context(|| format!("scoring {} against {}", args.data.display(), endpoint))?;

    let mut text = String::with_capacity(predictions.len() * 8);
    for p in &predictions {
        let _ = writeln!(text, "{}", p);
    }
    match &args.output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("writing {}", path.display()))?,
        None => std::io::stdout().lock().write_all(text.as_bytes())?,
    }
    Ok(predictions.len())
}

pub fn teardown_endpoint(config: WorkflowConfig, args: &TeardownArgs) -> Result<String> {
    let endpoint = args
        .endpoint
        .clone()
        .unwrap_or_else(|| config.hosting.endpoint_name.clone());
    let services = gateway(&config)?;
    teardown(&services, &endpoint).with_context(|| format!("deleting endpoint {}", endpoint))?;
    Ok(format!("deleted endpoint {}\n", endpoint))
}

pub fn show_config(config: &WorkflowConfig) -> Result<String> {
    Ok(config.to_toml_string()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use churnflow::dataset::synthetic;
    use std::path::PathBuf;

    fn write_sample(dir: &Path, rows: usize) -> PathBuf {
        let path = dir.join("churn.txt");
        std::fs::write(&path, synthetic::churn_csv(rows, 5)).unwrap();
        path
    }

    #[test]
    fn explore_renders_report() {
        let dir = tempfile::tempdir().unwrap();
        let data = write_sample(dir.path(), 300);
        let text = explore(&ExploreArgs {
            data,
            bins: 5,
            threshold: 0.95,
        })
        .unwrap();
        assert!(text.starts_with("300 rows"));
        assert!(text.contains("Day Charge"));
    }

    #[test]
    fn prepare_writes_into_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let data = write_sample(dir.path(), 300);
        let out = dir.path().join("out");
        let text = prepare(
            WorkflowConfig::default(),
            &PrepareArgs {
                data,
                output_dir: Some(out.clone()),
            },
        )
        .unwrap();
        assert!(text.starts_with("train 210 / validation 60 / test 30"));
        assert!(out.join("encoder.bin").exists());
    }

    #[test]
    fn dry_run_completes() {
        let dir = tempfile::tempdir().unwrap();
        let data = write_sample(dir.path(), 300);
        let text = run(
            WorkflowConfig::default(),
            &RunArgs {
                data,
                output_dir: Some(dir.path().join("out")),
                dry_run: true,
                no_compile: false,
                teardown: true,
            },
        )
        .unwrap();
        assert!(text.contains("partitions: train 210 / validation 60 / test 30"));
        assert!(text.contains("compiled model: deployed-xgboost-customer-churn"));
        assert!(text.contains("(deleted)"));
    }

    #[test]
    fn missing_config_file_is_reported() {
        let err = load_config(Some(Path::new("/nonexistent/churnflow.toml"))).unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/churnflow.toml"));
    }

    #[test]
    fn show_config_round_trips() {
        let text = show_config(&WorkflowConfig::default()).unwrap();
        assert_eq!(WorkflowConfig::from_toml_str(&text).unwrap(), WorkflowConfig::default());
    }
}
