//! Fargate launcher: one ECS task per region.

use std::collections::BTreeMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ecs::Client;
use aws_sdk_ecs::config::Region as AwsRegion;
use aws_sdk_ecs::types::{
    AssignPublicIp, AwsVpcConfiguration, ContainerOverride, KeyValuePair, LaunchType,
    NetworkConfiguration, TaskOverride,
};
use tracing::info;

use crate::config::{EcsTarget, LauncherSettings};
use crate::models::Region;
use crate::services::worker::WorkerParams;

use super::{LaunchError, LaunchReceipt, WorkerLauncher};

struct RegionalTarget {
    client: Client,
    target: EcsTarget,
}

/// Launches workers as Fargate tasks in the region they audit from.
pub struct EcsLauncher {
    targets: BTreeMap<Region, RegionalTarget>,
    container_name: String,
    task_memory: i32,
    task_cpu: i32,
}

impl EcsLauncher {
    /// Create one ECS client per configured region.
    ///
    /// Credentials come from the default AWS provider chain.
    pub async fn new(settings: &LauncherSettings) -> Self {
        let mut targets = BTreeMap::new();
        for (region, target) in &settings.targets {
            let sdk_config = aws_config::defaults(BehaviorVersion::latest())
                .region(AwsRegion::new(region.as_str()))
                .load()
                .await;
            targets.insert(
                *region,
                RegionalTarget {
                    client: Client::new(&sdk_config),
                    target: target.clone(),
                },
            );
        }

        info!(
            regions = ?targets.keys().map(Region::as_str).collect::<Vec<_>>(),
            "ECS launcher initialized"
        );

        Self {
            targets,
            container_name: settings.container_name.clone(),
            task_memory: settings.task_memory,
            task_cpu: settings.task_cpu,
        }
    }

    fn container_override(&self, params: &WorkerParams) -> ContainerOverride {
        let environment = params
            .to_env()
            .into_iter()
            .map(|(name, value)| KeyValuePair::builder().name(name).value(value).build())
            .collect();

        ContainerOverride::builder()
            .name(&self.container_name)
            .set_environment(Some(environment))
            .memory(self.task_memory)
            .cpu(self.task_cpu)
            .build()
    }
}

#[async_trait]
impl WorkerLauncher for EcsLauncher {
    async fn launch(&self, params: &WorkerParams) -> Result<LaunchReceipt, LaunchError> {
        let regional = self
            .targets
            .get(&params.region)
            .ok_or(LaunchError::NoTarget(params.region))?;

        let vpc = AwsVpcConfiguration::builder()
            .subnets(&regional.target.subnet)
            .assign_public_ip(AssignPublicIp::Enabled)
            .build()
            .map_err(|e| LaunchError::Rejected(format!("invalid network configuration: {}", e)))?;

        let output = regional
            .client
            .run_task()
            .cluster(&regional.target.cluster)
            .task_definition(&regional.target.task_definition)
            .launch_type(LaunchType::Fargate)
            .count(1)
            .network_configuration(NetworkConfiguration::builder().awsvpc_configuration(vpc).build())
            .overrides(
                TaskOverride::builder()
                    .container_overrides(self.container_override(params))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| LaunchError::Rejected(e.into_service_error().to_string()))?;

        if let Some(failure) = output.failures().first() {
            return Err(LaunchError::Rejected(format!(
                "{} ({})",
                failure.reason().unwrap_or("unknown reason"),
                failure.arn().unwrap_or("no arn")
            )));
        }

        let task_arn = output
            .tasks()
            .first()
            .and_then(|task| task.task_arn())
            .ok_or_else(|| LaunchError::Rejected("RunTask returned no task".to_string()))?;

        info!(
            job_id = %params.job_id,
            region = %params.region,
            task_arn = %task_arn,
            "Worker task started"
        );

        Ok(LaunchReceipt {
            region: params.region,
            handle: task_arn.to_string(),
        })
    }
}
