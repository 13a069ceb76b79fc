//! Channels - the simulated transports behind the gateway

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Simulated transport channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Udp,
    WebSocket,
    Ble,
    Local,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Udp, Channel::WebSocket, Channel::Ble, Channel::Local];

    /// Wire name
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Udp => "udp",
            Channel::WebSocket => "websocket",
            Channel::Ble => "ble",
            Channel::Local => "local",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown channel: {0}")]
pub struct UnknownChannel(pub String);

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownChannel(s.to_string()))
    }
}

/// Propagation target: every active channel, or a single one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    All,
    Channel(Channel),
}

impl FromStr for Route {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Route::All),
            other => other.parse().map(Route::Channel),
        }
    }
}

impl From<Channel> for Route {
    fn from(channel: Channel) -> Self {
        Route::Channel(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names_roundtrip() {
        for channel in Channel::ALL {
            assert_eq!(channel.as_str().parse::<Channel>(), Ok(channel));
        }
        assert_eq!(
            serde_json::to_string(&Channel::WebSocket).unwrap(),
            "\"websocket\""
        );
    }

    #[test]
    fn test_route_parse() {
        assert_eq!("all".parse::<Route>(), Ok(Route::All));
        assert_eq!("ble".parse::<Route>(), Ok(Route::Channel(Channel::Ble)));
        assert_eq!(
            "carrier-pigeon".parse::<Route>(),
            Err(UnknownChannel("carrier-pigeon".into()))
        );
        // Names are case sensitive
        assert!("UDP".parse::<Channel>().is_err());
    }
}
