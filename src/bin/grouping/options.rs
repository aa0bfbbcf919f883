use anyhow::anyhow;
use grouping::module::options::{GroupingOptions, RedisOptions};
use std::str::FromStr;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    about = "Coordinator keeping message groups bound to a single route across broker nodes.",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct MainOptions {
    /// Log level, scopable to different modules
    ///
    /// Levels: trace, debug, info, warn, error
    #[structopt(
        short,
        long,
        global = true,
        default_value = "info",
        env = "RUST_LOG",
        value_name = "level"
    )]
    pub log: String,

    /// Format of log output
    ///
    /// Formats: text, compact, json
    #[structopt(
        long,
        global = true,
        default_value = "text",
        env = "LOG_FORMAT",
        value_name = "format"
    )]
    pub log_format: LogFormat,

    /// Enable status reporting server which can be used as a readiness check
    #[structopt(long, global = true, env, value_name = "port")]
    pub status_server: Option<u16>,

    #[structopt(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(anyhow!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Runs the grouping coordinator of this node until terminated
    Serve(grouping::module::coordinator::Options),

    /// Sends a single proposal to the authoritative node and prints the outcome
    Propose(ProposeOptions),
}

#[derive(Debug, StructOpt)]
pub struct ProposeOptions {
    #[structopt(flatten)]
    pub redis: RedisOptions,

    #[structopt(flatten)]
    pub grouping: GroupingOptions,

    /// Identifier of the message group
    #[structopt(value_name = "group")]
    pub group_id: String,

    /// Route proposed as the owner of the group
    #[structopt(value_name = "route")]
    pub route: String,
}
