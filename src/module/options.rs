//! Various options usable by modules
//!
//! The structs in this module allow other modules to flatten them into
//! their own options struct.

use crate::domain::{
    ConfigurationError, GroupingHandlerConfiguration, HandlerType, DEFAULT_GROUP_TIMEOUT,
    DEFAULT_REAPER_PERIOD,
};
use std::time::Duration;
use structopt::StructOpt;

/// Options for connecting to the Redis server
#[derive(Debug, StructOpt)]
pub struct RedisOptions {
    /// Redis database server URL
    #[structopt(
        short = "r",
        long = "redis",
        env = "REDIS",
        global = true,
        default_value = "redis://grouping-redis/",
        value_name = "url"
    )]
    pub url: String,
}

/// Options describing the grouping handler of this node
#[derive(Debug, StructOpt)]
pub struct GroupingOptions {
    /// Name of this node, used as the response location for its proposals
    #[structopt(long, env = "GROUPING_NAME")]
    pub name: String,

    /// Role of this node, either LOCAL (authoritative) or REMOTE
    #[structopt(
        long = "type",
        env = "GROUPING_TYPE",
        default_value = "LOCAL",
        value_name = "type"
    )]
    pub handler_type: HandlerType,

    /// Address of the authoritative node. Required for REMOTE nodes,
    /// LOCAL nodes listen on it and fall back to their name.
    #[structopt(long, env = "GROUPING_ADDRESS")]
    pub address: Option<String>,

    /// Milliseconds to wait for the authoritative node to answer a proposal
    #[structopt(
        long,
        env = "GROUPING_TIMEOUT",
        default_value = "5000",
        value_name = "ms"
    )]
    pub timeout: u64,

    /// Milliseconds after which unused groups are released
    #[structopt(long, env = "GROUPING_GROUP_TIMEOUT", value_name = "ms")]
    pub group_timeout: Option<u64>,

    /// Milliseconds between two sweeps for unused groups
    #[structopt(long, env = "GROUPING_REAPER_PERIOD", value_name = "ms")]
    pub reaper_period: Option<u64>,
}

impl GroupingOptions {
    /// Validates the options into a configuration
    pub fn configuration(&self) -> Result<GroupingHandlerConfiguration, ConfigurationError> {
        GroupingHandlerConfiguration::with_timing(
            self.name.clone(),
            self.handler_type,
            self.address.clone(),
            Duration::from_millis(self.timeout),
            self.group_timeout
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_GROUP_TIMEOUT),
            self.reaper_period
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_REAPER_PERIOD),
        )
    }

    /// Address on which the authoritative node receives proposals
    pub fn authority_address(&self) -> &str {
        self.address.as_deref().unwrap_or(&self.name)
    }
}

#[cfg(test)]
mod does {
    use super::*;

    fn options(args: &[&str]) -> GroupingOptions {
        let args = std::iter::once("grouping").chain(args.iter().copied());
        GroupingOptions::from_iter_safe(args).unwrap()
    }

    #[test]
    fn build_configuration_from_flags() {
        let options = options(&[
            "--name",
            "node-1",
            "--type",
            "remote",
            "--address",
            "authority",
            "--timeout",
            "250",
            "--group-timeout",
            "5000",
            "--reaper-period",
            "1000",
        ]);

        let configuration = options.configuration().unwrap();

        assert_eq!(configuration.handler_type(), HandlerType::Remote);
        assert_eq!(configuration.address(), Some("authority"));
        assert_eq!(configuration.timeout(), Duration::from_millis(250));
        assert_eq!(configuration.group_timeout(), Duration::from_secs(5));
        assert_eq!(configuration.reaper_period(), Duration::from_secs(1));
    }

    #[test]
    fn listen_on_own_name_without_address() {
        let options = options(&["--name", "authority"]);

        assert_eq!(options.handler_type, HandlerType::Local);
        assert_eq!(options.authority_address(), "authority");
    }

    #[test]
    fn refuse_remote_nodes_without_address() {
        let options = options(&["--name", "node-1", "--type", "REMOTE"]);

        assert_eq!(
            options.configuration(),
            Err(ConfigurationError::MissingAddress)
        );
    }
}
