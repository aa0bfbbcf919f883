use crate::module::options::{GroupingOptions, RedisOptions};
use structopt::StructOpt;

/// Options for the coordinator module
#[derive(Debug, StructOpt)]
pub struct Options {
    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub redis: RedisOptions,

    #[allow(missing_docs)]
    #[structopt(flatten)]
    pub grouping: GroupingOptions,
}
