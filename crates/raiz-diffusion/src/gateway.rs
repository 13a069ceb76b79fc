//! Gateway - multi-channel propagation fan-out
//!
//! INVARIANT: `total_messages` equals the sum of per-channel counters.

use std::collections::BTreeMap;

use raiz_core::Tron;
use serde::Serialize;
use tracing::{debug, info};

use crate::{Channel, Route};

/// Per-channel state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelStatus {
    pub active: bool,
    pub messages: u64,
}

/// Read-only gateway snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GatewayStatus {
    pub channels: BTreeMap<Channel, ChannelStatus>,
    pub total_messages: u64,
}

/// Multi-protocol gateway
#[derive(Debug, Clone)]
pub struct Gateway {
    channels: BTreeMap<Channel, ChannelStatus>,
    total_messages: u64,
}

impl Gateway {
    /// Every channel active, all counters zero
    pub fn new() -> Self {
        Self::with_active(|_| true)
    }

    /// Initial activity decided per channel
    pub fn with_active(mut active: impl FnMut(Channel) -> bool) -> Self {
        let channels = Channel::ALL
            .into_iter()
            .map(|c| {
                (
                    c,
                    ChannelStatus {
                        active: active(c),
                        messages: 0,
                    },
                )
            })
            .collect();
        Gateway {
            channels,
            total_messages: 0,
        }
    }

    pub fn set_active(&mut self, channel: Channel, active: bool) {
        if let Some(status) = self.channels.get_mut(&channel) {
            status.active = active;
            debug!(channel = %channel, active, "channel toggled");
        }
    }

    pub fn is_active(&self, channel: Channel) -> bool {
        self.channels.get(&channel).is_some_and(|s| s.active)
    }

    /// Propagate a TRON. Inactive channels are skipped silently.
    ///
    /// Returns the number of channel messages emitted.
    pub fn propagate(&mut self, tron: &Tron, route: Route) -> u64 {
        let mut emitted = 0;
        for (channel, status) in self.channels.iter_mut() {
            let selected = match route {
                Route::All => true,
                Route::Channel(target) => *channel == target,
            };
            if selected && status.active {
                status.messages += 1;
                emitted += 1;
            }
        }
        self.total_messages += emitted;

        if emitted > 0 {
            info!(tron = %tron.id(), channels = emitted, "TRON propagated");
        } else {
            debug!(tron = %tron.id(), route = ?route, "propagation dropped: no active channel");
        }
        emitted
    }

    /// Propagate by wire name (`"all"`, `"udp"`, ...). Unknown names are a
    /// silent no-op.
    pub fn propagate_named(&mut self, tron: &Tron, name: &str) -> u64 {
        match name.parse::<Route>() {
            Ok(route) => self.propagate(tron, route),
            Err(err) => {
                debug!(tron = %tron.id(), %err, "propagation dropped");
                0
            }
        }
    }

    pub fn total_messages(&self) -> u64 {
        self.total_messages
    }

    pub fn messages(&self, channel: Channel) -> u64 {
        self.channels.get(&channel).map_or(0, |s| s.messages)
    }

    pub fn status(&self) -> GatewayStatus {
        GatewayStatus {
            channels: self.channels.clone(),
            total_messages: self.total_messages,
        }
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use raiz_core::{SimTime, TronSpec};

    fn tron() -> Tron {
        Tron::new(TronSpec::new("payload"), SimTime::ZERO)
    }

    #[test]
    fn test_all_hits_every_active_channel() {
        let mut gw = Gateway::new();
        assert_eq!(gw.propagate(&tron(), Route::All), 4);
        for channel in Channel::ALL {
            assert_eq!(gw.messages(channel), 1);
        }
        assert_eq!(gw.total_messages(), 4);
    }

    #[test]
    fn test_inactive_channel_is_noop() {
        let mut gw = Gateway::new();
        gw.set_active(Channel::Udp, false);
        let t = tron();

        assert_eq!(gw.propagate(&t, Route::Channel(Channel::Udp)), 0);
        assert_eq!(gw.messages(Channel::Udp), 0);
        assert_eq!(gw.total_messages(), 0);

        assert_eq!(gw.propagate(&t, Route::All), 3);
        assert_eq!(gw.messages(Channel::Udp), 0);
        assert_eq!(gw.total_messages(), 3);
    }

    #[test]
    fn test_named_routes() {
        let mut gw = Gateway::new();
        let t = tron();

        assert_eq!(gw.propagate_named(&t, "ble"), 1);
        assert_eq!(gw.propagate_named(&t, "all"), 4);
        assert_eq!(gw.propagate_named(&t, "smoke-signal"), 0);
        assert_eq!(gw.messages(Channel::Ble), 2);
        assert_eq!(gw.total_messages(), 5);
    }

    #[test]
    fn test_initial_activity() {
        let gw = Gateway::with_active(|c| c != Channel::Local);
        assert!(gw.is_active(Channel::Udp));
        assert!(!gw.is_active(Channel::Local));
    }

    #[test]
    fn test_status_serializes_wire_names() {
        let mut gw = Gateway::new();
        gw.propagate(&tron(), Route::Channel(Channel::WebSocket));
        let json = serde_json::to_value(gw.status()).unwrap();
        assert_eq!(json["channels"]["websocket"]["messages"], 1);
        assert_eq!(json["channels"]["udp"]["active"], true);
        assert_eq!(json["total_messages"], 1);
    }

    fn arb_route() -> impl Strategy<Value = Route> {
        prop_oneof![
            Just(Route::All),
            (0usize..4).prop_map(|i| Route::Channel(Channel::ALL[i])),
        ]
    }

    proptest! {
        #[test]
        fn prop_total_is_sum_of_channels(
            ops in prop::collection::vec((arb_route(), any::<bool>(), 0usize..4), 0..100)
        ) {
            let mut gw = Gateway::new();
            let t = tron();
            for (route, toggle, idx) in ops {
                if toggle {
                    let channel = Channel::ALL[idx];
                    let active = gw.is_active(channel);
                    gw.set_active(channel, !active);
                }
                gw.propagate(&t, route);
                let sum: u64 = Channel::ALL.iter().map(|c| gw.messages(*c)).sum();
                prop_assert_eq!(gw.total_messages(), sum);
            }
        }
    }
}
