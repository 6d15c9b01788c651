//! Broker configuration

use std::fmt;
use std::str::FromStr;

/// What fan-out does when a client's outbox is full
///
/// Fan-out never waits for a subscriber. A full outbox is a delivery stall
/// and is resolved by this policy, applied the same way to every client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Forcibly unregister the stalled client; its outbox closes and the
    /// adapter drops the connection
    #[default]
    Disconnect,
    /// Discard the update for the stalled client only
    DropNewest,
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Disconnect => write!(f, "disconnect"),
            OverflowPolicy::DropNewest => write!(f, "drop-newest"),
        }
    }
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disconnect" => Ok(OverflowPolicy::Disconnect),
            "drop-newest" | "drop_newest" | "drop" => Ok(OverflowPolicy::DropNewest),
            other => Err(format!(
                "unknown overflow policy '{}' (expected 'disconnect' or 'drop-newest')",
                other
            )),
        }
    }
}

/// Broker configuration options
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Capacity of each client's outbox, in updates
    pub outbox_capacity: usize,

    /// Policy applied when an outbox is full
    pub overflow_policy: OverflowPolicy,

    /// Number of write lanes sequencing commit and fan-out per key
    pub write_lanes: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: 1024,
            overflow_policy: OverflowPolicy::Disconnect,
            write_lanes: 64,
        }
    }
}

impl BrokerConfig {
    /// Set the outbox capacity (at least 1)
    pub fn outbox_capacity(mut self, capacity: usize) -> Self {
        self.outbox_capacity = capacity.max(1);
        self
    }

    /// Set the overflow policy
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Set the number of write lanes (at least 1)
    pub fn write_lanes(mut self, lanes: usize) -> Self {
        self.write_lanes = lanes.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BrokerConfig::default();

        assert_eq!(config.outbox_capacity, 1024);
        assert_eq!(config.overflow_policy, OverflowPolicy::Disconnect);
        assert_eq!(config.write_lanes, 64);
    }

    #[test]
    fn test_builder_clamps_zero() {
        let config = BrokerConfig::default().outbox_capacity(0).write_lanes(0);

        assert_eq!(config.outbox_capacity, 1);
        assert_eq!(config.write_lanes, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let config = BrokerConfig::default()
            .outbox_capacity(8)
            .overflow_policy(OverflowPolicy::DropNewest)
            .write_lanes(4);

        assert_eq!(config.outbox_capacity, 8);
        assert_eq!(config.overflow_policy, OverflowPolicy::DropNewest);
        assert_eq!(config.write_lanes, 4);
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("disconnect".parse(), Ok(OverflowPolicy::Disconnect));
        assert_eq!("Drop-Newest".parse(), Ok(OverflowPolicy::DropNewest));
        assert!("block".parse::<OverflowPolicy>().is_err());
    }

    #[test]
    fn test_policy_display_round_trips() {
        for policy in [OverflowPolicy::Disconnect, OverflowPolicy::DropNewest] {
            assert_eq!(policy.to_string().parse(), Ok(policy));
        }
    }
}
