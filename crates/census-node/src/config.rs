//! Node configuration from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// Configuration for a census node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeConfig {
    /// Address the local node announces.
    pub bind_addr: SocketAddr,

    /// Network name; seeds the genesis cloud state hash.
    pub network: String,

    /// Period of the simulated pulse source.
    pub pulse_interval: Duration,

    /// Join candidates admitted per pulse at most.
    pub max_joiners: usize,

    /// How long a graceful leave may take before it counts as stuck.
    pub leave_timeout: Duration,

    /// Peers in the local simulated cluster, the local node included.
    pub simulated_peers: usize,

    /// Print each pulse's census summary as JSON.
    pub summary_json: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 7900)),
            network: "census-local".to_string(),
            pulse_interval: Duration::from_millis(1000),
            max_joiners: 4,
            leave_timeout: Duration::from_millis(10_000),
            simulated_peers: 4,
            summary_json: false,
        }
    }
}

impl NodeConfig {
    /// Create config from environment variables with defaults for unset ones.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Create config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let config = Self {
            bind_addr: parse_var(&lookup, "CENSUS_BIND_ADDR")?.unwrap_or(defaults.bind_addr),
            network: lookup("CENSUS_NETWORK").unwrap_or(defaults.network),
            pulse_interval: parse_var(&lookup, "CENSUS_PULSE_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.pulse_interval),
            max_joiners: parse_var(&lookup, "CENSUS_MAX_JOINERS")?
                .unwrap_or(defaults.max_joiners),
            leave_timeout: parse_var(&lookup, "CENSUS_LEAVE_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.leave_timeout),
            simulated_peers: parse_var(&lookup, "CENSUS_SIMULATED_PEERS")?
                .unwrap_or(defaults.simulated_peers),
            summary_json: parse_var(&lookup, "CENSUS_SUMMARY_JSON")?
                .unwrap_or(defaults.summary_json),
        };

        if config.max_joiners == 0 {
            return Err(Error::Config {
                var: "CENSUS_MAX_JOINERS",
                value: "0".to_string(),
            });
        }
        if config.pulse_interval.is_zero() {
            return Err(Error::Config {
                var: "CENSUS_PULSE_INTERVAL_MS",
                value: "0".to_string(),
            });
        }
        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, var: &'static str) -> Result<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    let trimmed = value.trim();
    trimmed
        .parse()
        .map(Some)
        .map_err(|_| Error::Config { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| vars.get(var).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = NodeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, NodeConfig::default());
        assert_eq!(config.bind_addr.port(), 7900);
    }

    #[test]
    fn reads_every_variable() {
        let config = NodeConfig::from_lookup(lookup(&[
            ("CENSUS_BIND_ADDR", "10.0.0.1:8000"),
            ("CENSUS_NETWORK", "testnet"),
            ("CENSUS_PULSE_INTERVAL_MS", "250"),
            ("CENSUS_MAX_JOINERS", " 2 "),
            ("CENSUS_LEAVE_TIMEOUT_MS", "500"),
            ("CENSUS_SIMULATED_PEERS", "7"),
            ("CENSUS_SUMMARY_JSON", "true"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "10.0.0.1:8000".parse().unwrap());
        assert_eq!(config.network, "testnet");
        assert_eq!(config.pulse_interval, Duration::from_millis(250));
        assert_eq!(config.max_joiners, 2);
        assert_eq!(config.leave_timeout, Duration::from_millis(500));
        assert_eq!(config.simulated_peers, 7);
        assert!(config.summary_json);
    }

    #[test]
    fn malformed_value_is_an_error() {
        let err = NodeConfig::from_lookup(lookup(&[("CENSUS_MAX_JOINERS", "many")])).unwrap_err();
        match err {
            Error::Config { var, value } => {
                assert_eq!(var, "CENSUS_MAX_JOINERS");
                assert_eq!(value, "many");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_joiners_rejected() {
        assert!(matches!(
            NodeConfig::from_lookup(lookup(&[("CENSUS_MAX_JOINERS", "0")])),
            Err(Error::Config { var: "CENSUS_MAX_JOINERS", .. })
        ));
    }
}
