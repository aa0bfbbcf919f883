//! Grouping coordinator of a single broker node
//!
//! Depending on its handler type the node either decides on all bindings of the cluster
//! and answers proposals sent to its address, or forwards its proposals to that node.

mod options;

use crate::coordinator::{
    GroupingHandler, LocalCoordinator, ProposalResponderJob, ReaperJob, RemoteCoordinator,
};
use crate::domain::HandlerType;
use crate::harness::{Heart, Module, ModuleTerminationReason};
use crate::library::communication::implementation::redis::RedisTransport;
use crate::library::communication::request::CompositeRequestor;
use crate::library::{BoxedError, EmptyResult};
use async_trait::async_trait;
use jatsl::{schedule, JobScheduler};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

pub use options::Options;

#[derive(Error, Debug)]
enum CoordinatorError {
    #[error("transport has not been connected")]
    NotConnected,
}

/// Module implementation
pub struct Coordinator {
    options: Options,
    transport: Option<RedisTransport>,
    handler: Option<Arc<dyn GroupingHandler>>,
}

impl Coordinator {
    /// Creates a new instance from raw parts
    pub fn new(options: Options) -> Self {
        Self {
            options,
            transport: None,
            handler: None,
        }
    }
}

#[async_trait]
impl Module for Coordinator {
    async fn pre_startup(&mut self) -> EmptyResult {
        debug!(url = %self.options.redis.url, "Connecting to redis");
        self.transport = Some(RedisTransport::connect(&self.options.redis.url).await?);
        Ok(())
    }

    #[instrument(skip(self, scheduler), fields(name = %self.options.grouping.name))]
    async fn run(&mut self, scheduler: &JobScheduler) -> Result<Option<Heart>, BoxedError> {
        let transport = self
            .transport
            .clone()
            .ok_or(CoordinatorError::NotConnected)?;
        let configuration = Arc::new(self.options.grouping.configuration()?);
        let reaper_period = configuration.reaper_period();

        info!(
            handler_type = %configuration.handler_type(),
            timeout = ?configuration.timeout(),
            group_timeout = ?configuration.group_timeout(),
            "Starting grouping handler"
        );

        match configuration.handler_type() {
            HandlerType::Local => {
                let coordinator = Arc::new(LocalCoordinator::new(configuration));
                let address = self.options.grouping.authority_address().to_owned();

                let responder_job =
                    ProposalResponderJob::new(coordinator.clone(), transport, address);
                let reaper_job = ReaperJob::new(&coordinator, reaper_period);

                schedule!(scheduler, { responder_job, reaper_job });

                self.handler = Some(coordinator);
            }
            HandlerType::Remote => {
                let address = configuration
                    .address()
                    .map(ToOwned::to_owned)
                    .unwrap_or_default();
                let requestor = CompositeRequestor::with_extension(
                    transport.clone(),
                    transport.clone(),
                    address,
                );
                let coordinator = Arc::new(RemoteCoordinator::new(
                    configuration,
                    requestor,
                    transport,
                )?);

                let reaper_job = ReaperJob::new(&coordinator, reaper_period);

                schedule!(scheduler, { reaper_job });

                self.handler = Some(coordinator);
            }
        }

        Ok(Some(Heart::without_heart_stone()))
    }

    async fn post_shutdown(&mut self, termination_reason: ModuleTerminationReason) {
        if let Some(handler) = self.handler.take() {
            handler.shutdown().await;

            for (name, value) in handler.metrics().exported() {
                info!(metric = name, value, "Final metric value");
            }
        }

        match termination_reason {
            ModuleTerminationReason::HeartDied(_) | ModuleTerminationReason::ExitedNormally => {
                info!("Coordinator exited normally")
            }
            reason => error!(?reason, "Coordinator terminated with an error"),
        }
    }
}
