use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Environment variable overriding the group timeout in milliseconds
pub const GROUP_TIMEOUT_VARIABLE: &str = "GROUPING_GROUP_TIMEOUT";
/// Environment variable overriding the reaper period in milliseconds
pub const REAPER_PERIOD_VARIABLE: &str = "GROUPING_REAPER_PERIOD";

/// Default time to wait for the authoritative node to answer a proposal
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(5_000);
/// Default time after which unused bindings are evicted
pub const DEFAULT_GROUP_TIMEOUT: Duration = Duration::from_millis(60_000);
/// Default interval in which idle bindings are evicted
pub const DEFAULT_REAPER_PERIOD: Duration = Duration::from_millis(30_000);

/// Role of a grouping handler within the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerType {
    /// Decides bindings authoritatively for all proposals it receives
    Local,
    /// Forwards all proposals to the authoritative node
    Remote,
}

/// Error returned when parsing an unknown [`HandlerType`]
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown handler type '{0}', expected LOCAL or REMOTE")]
pub struct UnknownHandlerType(String);

impl FromStr for HandlerType {
    type Err = UnknownHandlerType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOCAL" => Ok(HandlerType::Local),
            "REMOTE" => Ok(HandlerType::Remote),
            _ => Err(UnknownHandlerType(s.to_owned())),
        }
    }
}

impl fmt::Display for HandlerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerType::Local => write!(f, "LOCAL"),
            HandlerType::Remote => write!(f, "REMOTE"),
        }
    }
}

/// Reasons for which a [`GroupingHandlerConfiguration`] may be refused
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Handler name is empty
    #[error("handler name must not be empty")]
    MissingName,
    /// Remote handlers need to know where the authoritative node lives
    #[error("remote handler requires an authoritative address")]
    MissingAddress,
    /// A duration has been set to zero
    #[error("{0} must be positive")]
    NonPositive(&'static str),
    /// An environment override could not be parsed into a positive number of milliseconds
    #[error("environment variable {variable} contains invalid value '{value}'")]
    InvalidOverride {
        /// Name of the offending variable
        variable: &'static str,
        /// Value it contained
        value: String,
    },
}

/// Immutable parameters of a grouping handler
///
/// Two configurations are considered equal when their address, name, timeout and handler type
/// match. The group timeout and reaper period do not take part in comparisons or hashing.
#[derive(Debug, Clone)]
pub struct GroupingHandlerConfiguration {
    name: String,
    handler_type: HandlerType,
    address: Option<String>,
    timeout: Duration,
    group_timeout: Duration,
    reaper_period: Duration,
}

impl GroupingHandlerConfiguration {
    /// Creates a new configuration using the default group timeout and reaper period
    ///
    /// Both may be overridden through the [`GROUP_TIMEOUT_VARIABLE`] and [`REAPER_PERIOD_VARIABLE`]
    /// environment variables.
    pub fn new(
        name: impl Into<String>,
        handler_type: HandlerType,
        address: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigurationError> {
        Self::from_lookup(name, handler_type, address, timeout, |variable| {
            std::env::var(variable).ok()
        })
    }

    /// Creates a new configuration with explicit timings, ignoring the environment
    pub fn with_timing(
        name: impl Into<String>,
        handler_type: HandlerType,
        address: Option<String>,
        timeout: Duration,
        group_timeout: Duration,
        reaper_period: Duration,
    ) -> Result<Self, ConfigurationError> {
        let configuration = Self {
            name: name.into(),
            handler_type,
            address: address.filter(|a| !a.is_empty()),
            timeout,
            group_timeout,
            reaper_period,
        };

        configuration.validate()?;
        Ok(configuration)
    }

    fn from_lookup<L>(
        name: impl Into<String>,
        handler_type: HandlerType,
        address: Option<String>,
        timeout: Duration,
        lookup: L,
    ) -> Result<Self, ConfigurationError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let group_timeout = override_or(&lookup, GROUP_TIMEOUT_VARIABLE, DEFAULT_GROUP_TIMEOUT)?;
        let reaper_period = override_or(&lookup, REAPER_PERIOD_VARIABLE, DEFAULT_REAPER_PERIOD)?;

        Self::with_timing(
            name,
            handler_type,
            address,
            timeout,
            group_timeout,
            reaper_period,
        )
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.name.is_empty() {
            return Err(ConfigurationError::MissingName);
        }

        if self.handler_type == HandlerType::Remote && self.address.is_none() {
            return Err(ConfigurationError::MissingAddress);
        }

        for (field, value) in [
            ("timeout", self.timeout),
            ("group timeout", self.group_timeout),
            ("reaper period", self.reaper_period),
        ] {
            if value.is_zero() {
                return Err(ConfigurationError::NonPositive(field));
            }
        }

        if self.reaper_period >= self.group_timeout {
            warn!(
                reaper_period = ?self.reaper_period,
                group_timeout = ?self.group_timeout,
                "Reaper period is not smaller than the group timeout, idle groups will linger"
            );
        }

        Ok(())
    }

    /// Name of the handler, also used to identify the node on the wire
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Role of the handler
    pub fn handler_type(&self) -> HandlerType {
        self.handler_type
    }

    /// Address of the authoritative node
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Time to wait for a response to a proposal
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Time after which unused bindings are evicted
    pub fn group_timeout(&self) -> Duration {
        self.group_timeout
    }

    /// Interval in which idle bindings are evicted
    pub fn reaper_period(&self) -> Duration {
        self.reaper_period
    }
}

fn override_or<L>(
    lookup: &L,
    variable: &'static str,
    default: Duration,
) -> Result<Duration, ConfigurationError>
where
    L: Fn(&str) -> Option<String>,
{
    match lookup(variable) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<u64>() {
            Ok(millis) if millis > 0 => Ok(Duration::from_millis(millis)),
            _ => Err(ConfigurationError::InvalidOverride { variable, value }),
        },
    }
}

impl PartialEq for GroupingHandlerConfiguration {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
            && self.name == other.name
            && self.timeout == other.timeout
            && self.handler_type == other.handler_type
    }
}

impl Eq for GroupingHandlerConfiguration {}

impl Hash for GroupingHandlerConfiguration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
        self.name.hash(state);
        self.timeout.hash(state);
        self.handler_type.hash(state);
    }
}
