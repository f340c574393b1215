// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

use super::SupportedModel;
use crate::state::BridgeState;

/// Which of the bridge's device ports a connection change concerns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// The device's output is connected to the bridge's device input port.
    Input,
    /// The bridge's device output port is connected to the device's input.
    Output,
}

/// Notified whenever the negotiated protocol changes.
pub trait ProtocolListener: Send + Sync {
    fn protocol_changed(&self, old: Option<SupportedModel>, new: Option<SupportedModel>);
}

#[derive(Default)]
struct Sides {
    input: Option<SupportedModel>,
    output: Option<SupportedModel>,
}

/// Tracks the model connected on each side of the bridge and derives the protocol.
pub struct Registry {
    state: Arc<BridgeState>,
    sides: Mutex<Sides>,
    listener: Arc<dyn ProtocolListener>,
}

impl Registry {
    pub fn new(state: Arc<BridgeState>, listener: Arc<dyn ProtocolListener>) -> Registry {
        Registry {
            state,
            sides: Mutex::new(Sides::default()),
            listener,
        }
    }

    /// Records a connection change on one of the device ports. The protocol only
    /// becomes a concrete model when both sides see the same one.
    pub fn on_port_connect<S: AsRef<str>>(
        &self,
        direction: Direction,
        connected: bool,
        aliases: &[S],
    ) {
        let model = if connected {
            SupportedModel::detect(aliases)
        } else {
            None
        };
        debug!(
            ?direction,
            connected,
            model = ?model,
            "Device port connection changed."
        );

        // Held across the listener call so transitions are delivered in order.
        let mut sides = self.sides.lock();
        match direction {
            Direction::Input => sides.input = model,
            Direction::Output => sides.output = model,
        }
        self.update(&sides);
    }

    /// Forgets both sides, tearing down any active protocol.
    pub fn reset(&self) {
        let mut sides = self.sides.lock();
        *sides = Sides::default();
        self.update(&sides);
    }

    fn update(&self, sides: &Sides) {
        let protocol = if sides.input == sides.output {
            sides.input
        } else {
            None
        };
        let old = self.state.protocol();
        if old != protocol {
            match protocol {
                Some(model) => info!(model = %model, "Controller connected."),
                None => info!("Controller disconnected."),
            }
            // The listener sees the outgoing protocol still in place.
            self.listener.protocol_changed(old, protocol);
            self.state.swap_protocol(protocol);
        }
    }

    pub fn protocol(&self) -> Option<SupportedModel> {
        self.state.protocol()
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::{Direction, ProtocolListener, Registry};
    use crate::{device::SupportedModel, state::BridgeState};

    const LAUNCHKEY: &str = "alsa_pcm:Launchkey-Mini-MK3-MIDI-2/midi_capture_2";
    const LAUNCHPAD: &str = "alsa_pcm:Launchpad-Mini-MK3-MIDI-2/midi_capture_2";

    type Change = (Option<SupportedModel>, Option<SupportedModel>);

    #[derive(Default)]
    struct Recorder {
        changes: Mutex<Vec<Change>>,
    }

    impl ProtocolListener for Recorder {
        fn protocol_changed(&self, old: Option<SupportedModel>, new: Option<SupportedModel>) {
            self.changes.lock().push((old, new));
        }
    }

    fn registry() -> (Registry, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        (
            Registry::new(Arc::new(BridgeState::new()), recorder.clone()),
            recorder,
        )
    }

    #[test]
    fn test_protocol_requires_both_sides() {
        let (registry, recorder) = registry();

        registry.on_port_connect(Direction::Input, true, &[LAUNCHKEY]);
        assert_eq!(registry.protocol(), None);
        assert!(recorder.changes.lock().is_empty());

        registry.on_port_connect(Direction::Output, true, &["system:playback", LAUNCHKEY]);
        assert_eq!(registry.protocol(), Some(SupportedModel::LaunchkeyMiniMk3));
        assert_eq!(
            *recorder.changes.lock(),
            vec![(None, Some(SupportedModel::LaunchkeyMiniMk3))]
        );
    }

    #[test]
    fn test_disconnect_clears_protocol() {
        let (registry, recorder) = registry();
        registry.on_port_connect(Direction::Input, true, &[LAUNCHPAD]);
        registry.on_port_connect(Direction::Output, true, &[LAUNCHPAD]);
        assert_eq!(registry.protocol(), Some(SupportedModel::LaunchpadMiniMk3));

        registry.on_port_connect::<&str>(Direction::Output, false, &[]);
        assert_eq!(registry.protocol(), None);
        assert_eq!(
            recorder.changes.lock().last(),
            Some(&(Some(SupportedModel::LaunchpadMiniMk3), None))
        );

        // Reconnecting restores it.
        registry.on_port_connect(Direction::Output, true, &[LAUNCHPAD]);
        assert_eq!(registry.protocol(), Some(SupportedModel::LaunchpadMiniMk3));
        assert_eq!(recorder.changes.lock().len(), 3);
    }

    #[test]
    fn test_unknown_device_clears_side() {
        let (registry, _) = registry();
        registry.on_port_connect(Direction::Input, true, &[LAUNCHKEY]);
        registry.on_port_connect(Direction::Output, true, &[LAUNCHKEY]);
        registry.on_port_connect(Direction::Input, true, &["alsa_pcm:Some-Keyboard"]);
        assert_eq!(registry.protocol(), None);
    }

    #[test]
    fn test_mismatched_models() {
        let (registry, recorder) = registry();
        registry.on_port_connect(Direction::Input, true, &[LAUNCHKEY]);
        registry.on_port_connect(Direction::Output, true, &[LAUNCHPAD]);
        assert_eq!(registry.protocol(), None);
        assert!(recorder.changes.lock().is_empty());
    }

    #[test]
    fn test_reset() {
        let (registry, recorder) = registry();
        registry.reset();
        assert!(recorder.changes.lock().is_empty());

        registry.on_port_connect(Direction::Input, true, &[LAUNCHKEY]);
        registry.on_port_connect(Direction::Output, true, &[LAUNCHKEY]);
        registry.reset();
        assert_eq!(registry.protocol(), None);
        assert_eq!(
            recorder.changes.lock().last(),
            Some(&(Some(SupportedModel::LaunchkeyMiniMk3), None))
        );
    }

    /// Records the protocol the shared state reports while the listener runs.
    struct StateObserver {
        state: Arc<BridgeState>,
        seen: Mutex<Vec<Option<SupportedModel>>>,
    }

    impl ProtocolListener for StateObserver {
        fn protocol_changed(&self, _: Option<SupportedModel>, _: Option<SupportedModel>) {
            self.seen.lock().push(self.state.protocol());
        }
    }

    #[test]
    fn test_state_changes_after_listener() {
        let state = Arc::new(BridgeState::new());
        let observer = Arc::new(StateObserver {
            state: state.clone(),
            seen: Mutex::new(Vec::new()),
        });
        let registry = Registry::new(state.clone(), observer.clone());

        registry.on_port_connect(Direction::Input, true, &[LAUNCHKEY]);
        registry.on_port_connect(Direction::Output, true, &[LAUNCHKEY]);
        assert_eq!(state.protocol(), Some(SupportedModel::LaunchkeyMiniMk3));

        registry.on_port_connect::<&str>(Direction::Input, false, &[]);
        assert_eq!(state.protocol(), None);

        assert_eq!(
            *observer.seen.lock(),
            vec![None, Some(SupportedModel::LaunchkeyMiniMk3)]
        );
    }
}
