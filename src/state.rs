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
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU8, Ordering};

use parking_lot::Mutex;

use crate::device::{SupportedModel, MAX_SESSION_PADS};

const NO_PROTOCOL: u8 = 0;

/// Sequencer play state of a pad, as reported by the control host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PlayState {
    #[default]
    Stopped,
    Playing,
    Stopping,
    Starting,
    Restarting,
    Disabled,
}

impl TryFrom<i32> for PlayState {
    type Error = i32;

    /// Converts the sequencer's wire value. Synchronised stopping is shown the
    /// same as stopping.
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PlayState::Stopped),
            1 => Ok(PlayState::Playing),
            2 | 5 => Ok(PlayState::Stopping),
            3 => Ok(PlayState::Starting),
            4 => Ok(PlayState::Restarting),
            6 => Ok(PlayState::Disabled),
            other => Err(other),
        }
    }
}

/// Last known state of a session pad.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PadState {
    /// Group colour index received from the sequencer, if any has arrived yet.
    pub colour_group: Option<u8>,
    pub play_state: PlayState,
}

impl PadState {
    /// The device colour of the pad. Pads that have not been assigned a group are unlit.
    pub fn colour(&self, model: SupportedModel) -> u8 {
        self.colour_group.map_or(0, |group| model.colour(group))
    }
}

/// Device modifier state, written by the decode path and the public setters.
pub struct Modifiers {
    cc_offset: AtomicI32,
    shift: AtomicBool,
    midi_channel: AtomicU8,
}

impl Modifiers {
    fn new() -> Modifiers {
        Modifiers {
            cc_offset: AtomicI32::new(0),
            shift: AtomicBool::new(false),
            midi_channel: AtomicU8::new(0),
        }
    }

    /// Controller offset applied to forwarded knob CCs.
    pub fn cc_offset(&self) -> i32 {
        self.cc_offset.load(Ordering::Relaxed)
    }

    /// Selects a knob bank. Banks are numbered from 1, each addressing 8 controllers.
    pub fn select_bank(&self, bank: u8) {
        self.cc_offset
            .store(8 * (i32::from(bank) - 1), Ordering::Relaxed);
    }

    pub fn shift(&self) -> bool {
        self.shift.load(Ordering::Relaxed)
    }

    pub fn set_shift(&self, held: bool) {
        self.shift.store(held, Ordering::Relaxed);
    }

    pub fn midi_channel(&self) -> u8 {
        self.midi_channel.load(Ordering::Relaxed)
    }

    /// Sets the channel for forwarded CCs. Channels outside 0-15 are ignored.
    pub fn set_midi_channel(&self, channel: u8) -> bool {
        if channel > 15 {
            return false;
        }
        self.midi_channel.store(channel, Ordering::Relaxed);
        true
    }
}

/// State shared between the realtime step and the control plane.
pub struct BridgeState {
    /// The negotiated protocol, stored as model index + 1 so that zero is "none".
    protocol: AtomicU8,
    pads: Mutex<[PadState; MAX_SESSION_PADS]>,
    modifiers: Modifiers,
}

impl BridgeState {
    pub fn new() -> BridgeState {
        BridgeState {
            protocol: AtomicU8::new(NO_PROTOCOL),
            pads: Mutex::new([PadState::default(); MAX_SESSION_PADS]),
            modifiers: Modifiers::new(),
        }
    }

    pub fn protocol(&self) -> Option<SupportedModel> {
        match self.protocol.load(Ordering::Acquire) {
            NO_PROTOCOL => None,
            value => SupportedModel::from_index(usize::from(value - 1)),
        }
    }

    /// Stores the protocol and returns the previous one.
    pub(crate) fn swap_protocol(&self, protocol: Option<SupportedModel>) -> Option<SupportedModel> {
        let value = protocol.map_or(NO_PROTOCOL, |model| model.index() as u8 + 1);
        match self.protocol.swap(value, Ordering::AcqRel) {
            NO_PROTOCOL => None,
            old => SupportedModel::from_index(usize::from(old - 1)),
        }
    }

    pub fn modifiers(&self) -> &Modifiers {
        &self.modifiers
    }

    pub fn pad(&self, index: usize) -> Option<PadState> {
        self.pads.lock().get(index).copied()
    }

    /// Applies a status update to a pad and returns the resulting state.
    pub(crate) fn update_pad(
        &self,
        index: usize,
        colour_group: u8,
        play_state: Option<PlayState>,
    ) -> Option<PadState> {
        let mut pads = self.pads.lock();
        let pad = pads.get_mut(index)?;
        pad.colour_group = Some(colour_group);
        if let Some(play_state) = play_state {
            pad.play_state = play_state;
        }
        Some(*pad)
    }

    /// Returns every pad to its idle state.
    pub(crate) fn reset_pads(&self) {
        *self.pads.lock() = [PadState::default(); MAX_SESSION_PADS];
    }
}

impl Default for BridgeState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::{BridgeState, PlayState};
    use crate::device::SupportedModel;

    #[test]
    fn test_play_state_wire_values() {
        assert_eq!(PlayState::try_from(0), Ok(PlayState::Stopped));
        assert_eq!(PlayState::try_from(1), Ok(PlayState::Playing));
        assert_eq!(PlayState::try_from(2), Ok(PlayState::Stopping));
        assert_eq!(PlayState::try_from(3), Ok(PlayState::Starting));
        assert_eq!(PlayState::try_from(4), Ok(PlayState::Restarting));
        assert_eq!(PlayState::try_from(5), Ok(PlayState::Stopping));
        assert_eq!(PlayState::try_from(6), Ok(PlayState::Disabled));
        assert_eq!(PlayState::try_from(42), Err(42));
    }

    #[test]
    fn test_protocol_swap() {
        let state = BridgeState::new();
        assert_eq!(state.protocol(), None);
        assert_eq!(state.swap_protocol(Some(SupportedModel::LaunchpadMiniMk3)), None);
        assert_eq!(state.protocol(), Some(SupportedModel::LaunchpadMiniMk3));
        assert_eq!(
            state.swap_protocol(None),
            Some(SupportedModel::LaunchpadMiniMk3)
        );
        assert_eq!(state.protocol(), None);
    }

    #[test]
    fn test_modifiers() {
        let state = BridgeState::new();
        let modifiers = state.modifiers();
        for bank in 1..=7 {
            modifiers.select_bank(bank);
            assert_eq!(modifiers.cc_offset(), 8 * (i32::from(bank) - 1));
        }
        assert!(modifiers.set_midi_channel(15));
        assert!(!modifiers.set_midi_channel(16));
        assert_eq!(modifiers.midi_channel(), 15);
    }

    #[test]
    fn test_update_pad() {
        let state = BridgeState::new();
        let pad = state.update_pad(3, 2, Some(PlayState::Playing));
        assert_eq!(pad.map(|pad| pad.play_state), Some(PlayState::Playing));
        assert_eq!(
            pad.map(|pad| pad.colour(SupportedModel::LaunchkeyMiniMk3)),
            Some(9)
        );
        assert!(state.update_pad(64, 2, Some(PlayState::Playing)).is_none());

        // Unknown states still recolour the pad.
        state.update_pad(3, 0, None);
        assert_eq!(state.pad(3).map(|pad| pad.play_state), Some(PlayState::Playing));
        assert_eq!(state.pad(3).and_then(|pad| pad.colour_group), Some(0));

        state.reset_pads();
        assert_eq!(state.pad(3).and_then(|pad| pad.colour_group), None);
    }
}
