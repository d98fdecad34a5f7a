//! Standing up and tearing down the hosted inference endpoint.

use crate::error::{ChurnError, Result};
use crate::remote::{
    wait_for, EndpointRef, EndpointStatus, HostingService, ModelHandle, PollSettings,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq)]
pub struct DeploySettings {
    pub endpoint_name: String,
    pub initial_instance_count: u32,
    pub instance_type: String,
    pub poll: PollSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EndpointRequest {
    pub endpoint_name: String,
    pub model: ModelHandle,
    pub initial_instance_count: u32,
    pub instance_type: String,
}

/// Creates the endpoint and blocks until it is in service.
pub fn deploy<S: HostingService + ?Sized>(
    service: &S,
    model: &ModelHandle,
    settings: &DeploySettings,
) -> Result<EndpointRef> {
    if settings.initial_instance_count == 0 {
        return Err(ChurnError::InvalidParameter(
            "an endpoint needs at least one instance".to_string(),
        ));
    }
    let request = EndpointRequest {
        endpoint_name: settings.endpoint_name.clone(),
        model: model.clone(),
        initial_instance_count: settings.initial_instance_count,
        instance_type: settings.instance_type.clone(),
    };
    tracing::info!(
        endpoint = %request.endpoint_name,
        model = %model.name,
        instances = request.initial_instance_count,
        instance_type = %request.instance_type,
        "creating endpoint"
    );
    service.create_endpoint(&request)?;

    let name = settings.endpoint_name.as_str();
    let status = wait_for(&settings.poll, name, || {
        let desc = service.describe_endpoint(name)?;
        match desc.status {
            EndpointStatus::InService => Ok(Some(desc.status)),
            EndpointStatus::Creating => Ok(None),
            EndpointStatus::Failed | EndpointStatus::Deleting => Err(ChurnError::JobFailed {
                job: desc.name,
                reason: desc
                    .failure_reason
                    .unwrap_or_else(|| format!("endpoint {:?}", desc.status)),
            }),
        }
    })?;
    tracing::info!(endpoint = name, "endpoint in service");

    Ok(EndpointRef {
        name: name.to_string(),
        status,
    })
}

/// Deletes the endpoint; it bills until this runs.
pub fn teardown<S: HostingService + ?Sized>(service: &S, endpoint: &str) -> Result<()> {
    tracing::info!(endpoint, "deleting endpoint");
    service.delete_endpoint(endpoint)
}
