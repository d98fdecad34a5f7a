//! Optional hardware-specific compilation of a trained model.

use crate::error::{ChurnError, Result};
use crate::remote::image::neo_image_uri;
use crate::remote::{
    settle_job, wait_for, CompilationService, ModelHandle, PollSettings, StorageLocation,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub struct CompileSettings {
    /// Target hardware family.
    pub target: String,
    pub framework: String,
    pub framework_version: String,
    /// Name given to the compiled model.
    pub compiled_model_name: String,
    pub role: String,
    pub poll: PollSettings,
}

impl Default for CompileSettings {
    fn default() -> Self {
        Self {
            target: "ml_m4".to_string(),
            framework: "xgboost".to_string(),
            framework_version: "latest".to_string(),
            compiled_model_name: "deployed-xgboost-customer-churn".to_string(),
            role: String::new(),
            poll: PollSettings::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompilationJobRequest {
    pub job_name: String,
    pub model: ModelHandle,
    pub role: String,
    pub target: String,
    /// Input tensor name to shape; `{"data": [1, n_features]}`.
    pub input_shape: BTreeMap<String, Vec<usize>>,
    pub framework: String,
    pub framework_version: String,
    pub output_path: String,
}

/// Compiles `model` for the configured target, or hands it back unchanged
/// when compilation is unavailable in `region`.
///
/// `n_features` excludes the label. The compiled artifact goes next to the
/// training output, one level up from `training_output`. Availability is a
/// permanent capability of the region, so the fallback never retries.
pub fn compile_or_fallback<S: CompilationService + ?Sized>(
    service: &S,
    model: ModelHandle,
    n_features: usize,
    job_name: &str,
    region: &str,
    training_output: &StorageLocation,
    settings: &CompileSettings,
) -> Result<ModelHandle> {
    let image = match neo_image_uri(region) {
        Ok(image) => image,
        Err(ChurnError::UnsupportedRegion { .. }) => {
            tracing::warn!(region, "compilation unavailable in region, deploying uncompiled model");
            return Ok(model);
        }
        Err(e) => return Err(e),
    };

    let request = CompilationJobRequest {
        job_name: job_name.to_string(),
        model: model.clone(),
        role: settings.role.clone(),
        target: settings.target.clone(),
        input_shape: BTreeMap::from([("data".to_string(), vec![1, n_features])]),
        framework: settings.framework.clone(),
        framework_version: settings.framework_version.clone(),
        output_path: training_output.parent().uri(),
    };

    tracing::info!(job = job_name, target = %request.target, n_features, "starting compilation job");
    match service.create_compilation_job(&request) {
        Ok(()) => {}
        Err(ChurnError::UnsupportedRegion { region, .. }) => {
            tracing::warn!(%region, "compilation service rejected region, deploying uncompiled model");
            return Ok(model);
        }
        Err(e) => return Err(e),
    }

    let compiled = wait_for(&settings.poll, job_name, || {
        settle_job(service.describe_compilation_job(job_name)?)
    })?;
    tracing::info!(job = job_name, artifact = %compiled.artifact, "compilation finished");

    Ok(ModelHandle {
        name: settings.compiled_model_name.clone(),
        artifact: compiled.artifact,
        image,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::memory::InMemoryServices;

    fn trained() -> ModelHandle {
        ModelHandle {
            name: "churn-job".into(),
            artifact: "s3://bucket/demo/output/churn-job/output/model.tar.gz".into(),
            image: "xgb:1.7-1".into(),
        }
    }

    fn settings() -> CompileSettings {
        CompileSettings {
            poll: PollSettings::immediate(),
            ..CompileSettings::default()
        }
    }

    fn output() -> StorageLocation {
        StorageLocation::new("bucket", "demo/output")
    }

    #[test]
    fn test_compile_request_shape() {
        let services = InMemoryServices::new("us-west-2");
        let compiled =
            compile_or_fallback(&services, trained(), 69, "compile-1", "us-west-2", &output(), &settings())
                .unwrap();

        assert_eq!(compiled.name, "deployed-xgboost-customer-churn");
        assert_eq!(
            compiled.image,
            "301217895009.dkr.ecr.us-west-2.amazonaws.com/xgboost-neo:latest"
        );
        assert_ne!(compiled.artifact, trained().artifact);

        let requests = services.compilation_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].input_shape["data"], vec![1, 69]);
        assert_eq!(requests[0].target, "ml_m4");
        assert_eq!(requests[0].framework, "xgboost");
        assert_eq!(requests[0].output_path, "s3://bucket/demo");
    }

    #[test]
    fn test_unsupported_region_falls_back() {
        let services = InMemoryServices::new("mars-north-1");
        let model =
            compile_or_fallback(&services, trained(), 69, "compile-1", "mars-north-1", &output(), &settings())
                .unwrap();
        assert_eq!(model, trained());
        assert!(services.compilation_requests().is_empty());
    }

    #[test]
    fn test_service_side_rejection_falls_back() {
        let services = InMemoryServices::new("us-west-2").without_compilation();
        let model =
            compile_or_fallback(&services, trained(), 69, "compile-1", "us-west-2", &output(), &settings())
                .unwrap();
        assert_eq!(model, trained());
    }
}
