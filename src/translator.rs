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

use midly::live::LiveEvent;
use tracing::{debug, trace};

use crate::{
    controller::ControlAction,
    device::SupportedModel,
    queue::OutboundQueue,
    state::{BridgeState, PlayState},
};

mod launchkey;
mod launchpad;

/// Note-on status bytes whose channel picks the LED behaviour.
const STATIC_FEEDBACK: u8 = 0x90;
const FLASHING_FEEDBACK: u8 = 0x91;
const PULSING_FEEDBACK: u8 = 0x92;

const STARTING_COLOUR: u8 = 123;
const STOPPING_COLOUR: u8 = 120;
const OFF_COLOUR: u8 = 0;

/// Drum pads are lit and forwarded on MIDI channel 10.
const DRUM_NOTE_ON: u8 = 0x99;
const DRUM_NOTE_OFF: u8 = 0x89;
const DRUM_IDLE_COLOUR: u8 = 79;
const DRUM_ACTIVE_COLOUR: u8 = 90;

/// The result of decoding one device event.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    /// An action to publish to the control host.
    pub action: Option<ControlAction>,
    /// A message to forward downstream.
    pub passthrough: Option<[u8; 3]>,
}

impl Decoded {
    fn action(action: ControlAction) -> Decoded {
        Decoded {
            action: Some(action),
            passthrough: None,
        }
    }

    fn passthrough(message: [u8; 3]) -> Decoded {
        Decoded {
            action: None,
            passthrough: Some(message),
        }
    }
}

/// Translates between device events and application state for the active protocol.
pub struct Translator {
    state: Arc<BridgeState>,
    queue: Arc<OutboundQueue>,
}

impl Translator {
    pub fn new(state: Arc<BridgeState>, queue: Arc<OutboundQueue>) -> Translator {
        Translator { state, queue }
    }

    pub fn state(&self) -> &Arc<BridgeState> {
        &self.state
    }

    pub fn queue(&self) -> &Arc<OutboundQueue> {
        &self.queue
    }

    /// Brings a newly connected device to a known baseline: the bridge's layout,
    /// idle drum pads and every session pad stopped.
    pub fn enable(&self, model: SupportedModel) {
        debug!(model = %model, "Initialising device feedback.");
        self.state.reset_pads();

        match model {
            SupportedModel::LaunchkeyMiniMk3 => launchkey::enable(&self.queue),
            SupportedModel::LaunchpadMiniMk3 => launchpad::enable(&self.queue),
        }
        for note in model.drum_pads() {
            self.queue
                .enqueue_short(DRUM_NOTE_ON, *note, DRUM_IDLE_COLOUR);
        }
        for index in 0..model.session_pad_count() {
            self.encode_pad(model, index, PlayState::Stopped);
        }
        if model == SupportedModel::LaunchkeyMiniMk3 {
            launchkey::select_knobs(&self.state, &self.queue, launchkey::DEFAULT_KNOB_BANK);
        }
    }

    /// Returns the device to its own layout.
    pub fn disable(&self, model: SupportedModel) {
        debug!(model = %model, "Disabling device feedback.");
        match model {
            SupportedModel::LaunchkeyMiniMk3 => launchkey::disable(&self.queue),
            SupportedModel::LaunchpadMiniMk3 => launchpad::disable(&self.queue),
        }
        self.state.reset_pads();
    }

    /// Queues the lighting commands for a session pad in the given state.
    pub fn encode_pad_status(&self, index: usize, play_state: PlayState) {
        if let Some(model) = self.state.protocol() {
            self.encode_pad(model, index, play_state);
        }
    }

    fn encode_pad(&self, model: SupportedModel, index: usize, play_state: PlayState) {
        let (note, pad) = match (model.session_note(index), self.state.pad(index)) {
            (Some(note), Some(pad)) => (note, pad),
            _ => return,
        };
        let colour = pad.colour(model);

        match play_state {
            PlayState::Stopped => {
                self.queue.enqueue_short(STATIC_FEEDBACK, note, colour);
            }
            PlayState::Starting | PlayState::Restarting => {
                self.queue.enqueue_short(STATIC_FEEDBACK, note, colour);
                self.queue
                    .enqueue_short(FLASHING_FEEDBACK, note, STARTING_COLOUR);
            }
            PlayState::Playing => {
                self.queue.enqueue_short(PULSING_FEEDBACK, note, colour);
            }
            PlayState::Stopping => {
                self.queue.enqueue_short(STATIC_FEEDBACK, note, colour);
                self.queue
                    .enqueue_short(FLASHING_FEEDBACK, note, STOPPING_COLOUR);
            }
            PlayState::Disabled => {
                self.queue.enqueue_short(STATIC_FEEDBACK, note, OFF_COLOUR);
            }
        }
    }

    /// Applies a sequencer status notification to its pad.
    pub fn on_sequence_status(&self, bank: i32, sequence: i32, state: i32, group: i32) {
        let model = match self.state.protocol() {
            Some(model) => model,
            None => return,
        };
        let index = match usize::try_from(sequence) {
            Ok(index) if index < model.session_pad_count() => index,
            _ => {
                trace!(bank, sequence, "Ignoring status for a sequence without a pad.");
                return;
            }
        };

        let play_state = PlayState::try_from(state).ok();
        self.state
            .update_pad(index, group.rem_euclid(16) as u8, play_state);
        if let Some(play_state) = play_state {
            self.encode_pad(model, index, play_state);
        }
    }

    /// Lights the transport buttons for the file player status bitmask
    /// (bit 0: player active, bit 1: recorder active).
    pub fn on_player_status(&self, mask: i32) {
        if self.state.protocol() == Some(SupportedModel::LaunchkeyMiniMk3) {
            launchkey::player_status(&self.queue, mask);
        }
    }

    /// Selects the knob bank on devices that have one.
    pub fn select_knobs(&self, bank: u32) {
        if self.state.protocol() == Some(SupportedModel::LaunchkeyMiniMk3) {
            if let Ok(bank) = u8::try_from(bank) {
                launchkey::select_knobs(&self.state, &self.queue, bank);
            }
        }
    }

    /// Selects the device's pad layout.
    pub fn select_pads(&self, mode: u32) {
        let mode = match u8::try_from(mode) {
            Ok(mode) if mode < 0x80 => mode,
            _ => return,
        };
        match self.state.protocol() {
            Some(SupportedModel::LaunchkeyMiniMk3) => launchkey::select_pads(&self.queue, mode),
            Some(SupportedModel::LaunchpadMiniMk3) => launchpad::select_pads(&self.queue, mode),
            None => {}
        }
    }

    /// Decodes a raw device event. Runs on the realtime thread, so any device
    /// feedback it produces is queued without waiting.
    pub fn decode(&self, raw: &[u8]) -> Decoded {
        if raw.len() != 3 {
            return Decoded::default();
        }
        let message = match LiveEvent::parse(raw) {
            Ok(LiveEvent::Midi { message, .. }) => message,
            _ => return Decoded::default(),
        };

        match self.state.protocol() {
            Some(SupportedModel::LaunchkeyMiniMk3) => {
                launchkey::decode(&self.state, &self.queue, message)
            }
            Some(SupportedModel::LaunchpadMiniMk3) => launchpad::decode(message),
            None => Decoded::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use super::{Decoded, Translator};
    use crate::{
        controller::ControlAction,
        device::SupportedModel,
        queue::OutboundQueue,
        state::{BridgeState, PlayState},
    };

    pub(super) fn translator(model: Option<SupportedModel>) -> Translator {
        let state = Arc::new(BridgeState::new());
        state.swap_protocol(model);
        Translator::new(state, Arc::new(OutboundQueue::new()))
    }

    #[test]
    fn test_enable_launchkey_resyncs_every_pad() {
        let translator = translator(Some(SupportedModel::LaunchkeyMiniMk3));
        translator.state().update_pad(4, 3, Some(PlayState::Playing));
        translator.enable(SupportedModel::LaunchkeyMiniMk3);

        let messages = translator.queue().snapshot();
        let model = SupportedModel::LaunchkeyMiniMk3;
        let mut expected = vec![vec![0x9F, 12, 127]];
        expected.extend(model.drum_pads().iter().map(|note| vec![0x99, *note, 79]));
        expected.extend(model.session_pads().iter().map(|note| vec![0x90, *note, 0]));
        expected.push(vec![0xBF, 9, 1]);
        assert_eq!(messages, expected);

        assert_eq!(
            translator.state().pad(4).map(|pad| pad.play_state),
            Some(PlayState::Stopped)
        );
        assert_eq!(translator.state().modifiers().cc_offset(), 0);
    }

    #[test]
    fn test_enable_launchpad_resyncs_every_pad() {
        let translator = translator(Some(SupportedModel::LaunchpadMiniMk3));
        translator.enable(SupportedModel::LaunchpadMiniMk3);

        let messages = translator.queue().snapshot();
        assert_eq!(messages.len(), 65);
        assert_eq!(
            messages[0],
            vec![0xF0, 0x00, 0x20, 0x29, 0x02, 0x0D, 0x00, 0x7F, 0xF7]
        );
        for (message, note) in messages[1..]
            .iter()
            .zip(SupportedModel::LaunchpadMiniMk3.session_pads())
        {
            assert_eq!(message, &vec![0x90, *note, 0]);
        }
    }

    #[test]
    fn test_disable() {
        let translator = translator(None);
        translator.disable(SupportedModel::LaunchkeyMiniMk3);
        translator.disable(SupportedModel::LaunchpadMiniMk3);
        assert_eq!(
            translator.queue().snapshot(),
            vec![
                vec![0x9F, 12, 0],
                vec![0xF0, 0x00, 0x20, 0x29, 0x02, 0x0D, 0x00, 0x00, 0xF7],
            ]
        );
    }

    #[test]
    fn test_encode_pad_states() {
        let translator = translator(Some(SupportedModel::LaunchkeyMiniMk3));
        translator.state().update_pad(0, 1, None);
        let queue = translator.queue();

        translator.encode_pad_status(0, PlayState::Stopped);
        assert_eq!(queue.snapshot(), vec![vec![0x90, 96, 35]]);
        queue.clear();

        translator.encode_pad_status(0, PlayState::Starting);
        assert_eq!(queue.snapshot(), vec![vec![0x90, 96, 35], vec![0x91, 96, 123]]);
        queue.clear();

        translator.encode_pad_status(0, PlayState::Restarting);
        assert_eq!(queue.snapshot(), vec![vec![0x90, 96, 35], vec![0x91, 96, 123]]);
        queue.clear();

        translator.encode_pad_status(0, PlayState::Playing);
        assert_eq!(queue.snapshot(), vec![vec![0x92, 96, 35]]);
        queue.clear();

        translator.encode_pad_status(0, PlayState::Stopping);
        assert_eq!(queue.snapshot(), vec![vec![0x90, 96, 35], vec![0x91, 96, 120]]);
        queue.clear();

        translator.encode_pad_status(0, PlayState::Disabled);
        assert_eq!(queue.snapshot(), vec![vec![0x90, 96, 0]]);
    }

    #[test]
    fn test_encode_out_of_range_pad() {
        let translator = translator(Some(SupportedModel::LaunchkeyMiniMk3));
        translator.encode_pad_status(16, PlayState::Playing);
        translator.encode_pad_status(64, PlayState::Playing);
        assert!(translator.queue().is_empty());

        let translator = translator_without_protocol();
        translator.encode_pad_status(0, PlayState::Playing);
        assert!(translator.queue().is_empty());
    }

    fn translator_without_protocol() -> Translator {
        translator(None)
    }

    #[test]
    fn test_sequence_status_playing() {
        let translator = translator(Some(SupportedModel::LaunchkeyMiniMk3));
        translator.on_sequence_status(0, 3, 1, 2);

        let pad = translator.state().pad(3).expect("pad 3 should exist");
        assert_eq!(pad.colour(SupportedModel::LaunchkeyMiniMk3), 9);
        assert_eq!(pad.play_state, PlayState::Playing);
        assert_eq!(translator.queue().snapshot(), vec![vec![0x92, 99, 9]]);
    }

    #[test]
    fn test_sequence_status_bounds() {
        let translator = translator(Some(SupportedModel::LaunchkeyMiniMk3));
        for sequence in [16, 17, 63, 64, 1000, -1] {
            translator.on_sequence_status(0, sequence, 1, 2);
        }
        assert!(translator.queue().is_empty());

        let translator = translator_launchpad();
        translator.on_sequence_status(0, 63, 0, 18);
        assert_eq!(translator.queue().snapshot(), vec![vec![0x90, 18, 9]]);
        translator.queue().clear();
        translator.on_sequence_status(0, 64, 0, 2);
        assert!(translator.queue().is_empty());
    }

    fn translator_launchpad() -> Translator {
        translator(Some(SupportedModel::LaunchpadMiniMk3))
    }

    #[test]
    fn test_sequence_status_unknown_state_recolours_only() {
        let translator = translator(Some(SupportedModel::LaunchkeyMiniMk3));
        translator.on_sequence_status(0, 2, 99, 5);
        assert!(translator.queue().is_empty());
        assert_eq!(
            translator.state().pad(2).and_then(|pad| pad.colour_group),
            Some(5)
        );
    }

    #[test]
    fn test_player_status() {
        let translator = translator(Some(SupportedModel::LaunchkeyMiniMk3));
        let queue = translator.queue();

        translator.on_player_status(0);
        assert_eq!(queue.snapshot(), vec![vec![0xB0, 115, 0], vec![0xB0, 117, 0]]);
        queue.clear();

        translator.on_player_status(1);
        assert_eq!(queue.snapshot(), vec![vec![0xB1, 115, 127], vec![0xB1, 117, 0]]);
        queue.clear();

        translator.on_player_status(2);
        assert_eq!(queue.snapshot(), vec![vec![0xB0, 115, 0], vec![0xB1, 117, 127]]);
        queue.clear();

        translator.on_player_status(3);
        assert_eq!(queue.snapshot(), vec![vec![0xB2, 115, 127], vec![0xB2, 117, 127]]);
        queue.clear();

        // Only the two low bits are used.
        translator.on_player_status(0b1101);
        assert_eq!(queue.snapshot(), vec![vec![0xB1, 115, 127], vec![0xB1, 117, 0]]);
        queue.clear();

        let translator = translator_launchpad();
        translator.on_player_status(3);
        assert!(translator.queue().is_empty());
    }

    #[test]
    fn test_select_knobs_and_pads() {
        let translator = translator(Some(SupportedModel::LaunchkeyMiniMk3));
        translator.select_knobs(3);
        assert_eq!(translator.state().modifiers().cc_offset(), 16);
        translator.select_knobs(0);
        translator.select_knobs(7);
        translator.select_pads(2);
        translator.select_pads(200);
        assert_eq!(
            translator.queue().snapshot(),
            vec![vec![0xBF, 9, 3], vec![0xBF, 3, 2]]
        );

        let translator = translator_launchpad();
        translator.select_knobs(3);
        translator.select_pads(0x05);
        assert_eq!(
            translator.queue().snapshot(),
            vec![vec![0xF0, 0x00, 0x20, 0x29, 0x02, 0x0D, 0x00, 0x05, 0xF7]]
        );

        let translator = translator_without_protocol();
        translator.select_knobs(3);
        translator.select_pads(1);
        assert!(translator.queue().is_empty());
    }

    #[test]
    fn test_decode_without_protocol() {
        let translator = translator_without_protocol();
        assert_eq!(translator.decode(&[0x90, 97, 127]), Decoded::default());
        assert_eq!(translator.decode(&[0xB0, 21, 64]), Decoded::default());
        assert!(translator.queue().is_empty());
    }

    #[test]
    fn test_decode_ignores_malformed_events() {
        let translator = translator(Some(SupportedModel::LaunchkeyMiniMk3));
        assert_eq!(translator.decode(&[0x90, 97]), Decoded::default());
        assert_eq!(translator.decode(&[0xF0, 0x7E, 0xF7]), Decoded::default());
        assert_eq!(translator.decode(&[0x90, 97, 127, 0]), Decoded::default());
    }

    #[test]
    fn test_decode_launchpad_session_pads() {
        let translator = translator_launchpad();
        assert_eq!(
            translator.decode(&[0x90, 81, 127]).action,
            Some(ControlAction::ToggleSequence(0))
        );
        assert_eq!(
            translator.decode(&[0x90, 18, 127]).action,
            Some(ControlAction::ToggleSequence(63))
        );
        // Releases and notes outside the grid do nothing.
        assert_eq!(translator.decode(&[0x90, 81, 0]), Decoded::default());
        assert_eq!(translator.decode(&[0x90, 19, 127]), Decoded::default());
    }
}
