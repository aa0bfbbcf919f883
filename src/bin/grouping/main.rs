use anyhow::Result;
use grouping::coordinator::{GroupingHandler, RemoteCoordinator};
use grouping::harness::ModuleRunner;
use grouping::library::communication::implementation::redis::RedisTransport;
use grouping::library::communication::request::CompositeRequestor;
use grouping::module::coordinator::Coordinator;
use options::{Command, LogFormat, ProposeOptions};
use std::sync::Arc;
use structopt::StructOpt;
use tracing::info;

mod options;

#[tokio::main]
async fn main() -> Result<()> {
    let (command, runner) = init().await?;

    match command {
        Command::Serve(options) => runner.run(Coordinator::new(options)).await,
        Command::Propose(options) => propose(options).await?,
    };

    Ok(())
}

async fn init() -> Result<(options::Command, ModuleRunner)> {
    let options = options::MainOptions::from_args();

    let formatter = tracing_subscriber::fmt().with_env_filter(options.log);

    match options.log_format {
        LogFormat::Text => formatter.init(),
        LogFormat::Compact => formatter.compact().init(),
        LogFormat::Json => formatter.json().init(),
    };

    let runner = match options.status_server {
        Some(port) => ModuleRunner::new_with_status_server(port),
        None => ModuleRunner::default(),
    };

    info!("Grouping {}", env!("CARGO_PKG_VERSION"));

    Ok((options.command, runner))
}

async fn propose(options: ProposeOptions) -> Result<()> {
    let configuration = Arc::new(options.grouping.configuration()?);
    let address = options.grouping.authority_address().to_owned();
    let transport = RedisTransport::connect(&options.redis.url).await?;

    let requestor =
        CompositeRequestor::with_extension(transport.clone(), transport.clone(), address);
    let coordinator = RemoteCoordinator::new(configuration, requestor, transport)?;

    let outcome = coordinator.propose(&options.group_id, &options.route).await;
    coordinator.shutdown().await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(())
}
