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
//! Novation Launchkey Mini MK3 in DAW mode.

use std::ops::RangeInclusive;

use midly::MidiMessage;
use tracing::trace;

use super::{Decoded, DRUM_ACTIVE_COLOUR, DRUM_IDLE_COLOUR, DRUM_NOTE_OFF, DRUM_NOTE_ON};
use crate::{
    controller::ControlAction,
    queue::{OutboundMessage, OutboundQueue},
    state::BridgeState,
};

/// Note 12 on channel 16 switches DAW mode.
const DAW_MODE: u8 = 0x9F;
const DAW_MODE_NOTE: u8 = 12;

/// Configuration CCs are sent on channel 16.
const CONFIG_CC: u8 = 0xBF;
const KNOB_BANK_CC: u8 = 9;
const PAD_MODE_CC: u8 = 3;

pub(super) const DEFAULT_KNOB_BANK: u8 = 1;
const KNOB_BANKS: RangeInclusive<u8> = 1..=6;

const SHIFT_CC: u8 = 108;
const UP_CC: u8 = 104;
const DOWN_CC: u8 = 105;
const LEFT_CC: u8 = 103;
const RIGHT_CC: u8 = 102;
const PLAY_CC: u8 = 115;
const RECORD_CC: u8 = 117;

const KNOBS: RangeInclusive<u8> = 21..=28;
const SHIFTED_KNOB_OFFSET: i32 = 40;

const DRUM_PADS: RangeInclusive<u8> = 36..=51;
const LAUNCH_ROW_TOP: RangeInclusive<u8> = 96..=103;
const LAUNCH_ROW_BOTTOM: RangeInclusive<u8> = 112..=119;

pub(super) fn enable(queue: &OutboundQueue) {
    queue.enqueue_short(DAW_MODE, DAW_MODE_NOTE, 127);
}

pub(super) fn disable(queue: &OutboundQueue) {
    queue.enqueue_short(DAW_MODE, DAW_MODE_NOTE, 0);
}

pub(super) fn select_knobs(state: &BridgeState, queue: &OutboundQueue, bank: u8) {
    if !KNOB_BANKS.contains(&bank) {
        trace!(bank, "Ignoring unknown knob bank.");
        return;
    }
    state.modifiers().select_bank(bank);
    queue.enqueue_short(CONFIG_CC, KNOB_BANK_CC, bank);
}

pub(super) fn select_pads(queue: &OutboundQueue, mode: u8) {
    queue.enqueue_short(CONFIG_CC, PAD_MODE_CC, mode);
}

/// Play and record buttons: static off, flashing for the recorder, pulsing
/// when both run.
pub(super) fn player_status(queue: &OutboundQueue, mask: i32) {
    let (play, record) = match mask & 0x03 {
        0 => ((0xB0, 0), (0xB0, 0)),
        1 => ((0xB1, 127), (0xB1, 0)),
        2 => ((0xB0, 0), (0xB1, 127)),
        _ => ((0xB2, 127), (0xB2, 127)),
    };
    queue.enqueue_short(play.0, PLAY_CC, play.1);
    queue.enqueue_short(record.0, RECORD_CC, record.1);
}

fn drum_feedback(queue: &OutboundQueue, note: u8, colour: u8) {
    if let Some(message) = OutboundMessage::short(DRUM_NOTE_ON, note, colour) {
        queue.try_push(message);
    }
}

pub(super) fn decode(state: &BridgeState, queue: &OutboundQueue, message: MidiMessage) -> Decoded {
    match message {
        MidiMessage::NoteOn { key, vel } => {
            let (key, vel) = (key.as_int(), vel.as_int());
            if DRUM_PADS.contains(&key) {
                drum_feedback(queue, key, DRUM_ACTIVE_COLOUR);
                Decoded::passthrough([DRUM_NOTE_ON, key, vel])
            } else if LAUNCH_ROW_TOP.contains(&key) {
                Decoded::action(ControlAction::ToggleSequence(key - LAUNCH_ROW_TOP.start()))
            } else if LAUNCH_ROW_BOTTOM.contains(&key) {
                // The bottom row continues the numbering from the top row.
                Decoded::action(ControlAction::ToggleSequence(key - 104))
            } else {
                Decoded::default()
            }
        }
        MidiMessage::NoteOff { key, vel } => {
            let (key, vel) = (key.as_int(), vel.as_int());
            if DRUM_PADS.contains(&key) {
                drum_feedback(queue, key, DRUM_IDLE_COLOUR);
                Decoded::passthrough([DRUM_NOTE_OFF, key, vel])
            } else {
                Decoded::default()
            }
        }
        MidiMessage::Controller { controller, value } => {
            decode_controller(state, controller.as_int(), value.as_int())
        }
        _ => Decoded::default(),
    }
}

fn decode_controller(state: &BridgeState, controller: u8, value: u8) -> Decoded {
    let modifiers = state.modifiers();
    match controller {
        KNOB_BANK_CC => {
            // The device reports whatever bank it is on; forwarding checks the range.
            modifiers.select_bank(value);
            return Decoded::default();
        }
        SHIFT_CC => {
            modifiers.set_shift(value != 0);
            return Decoded::default();
        }
        _ => {}
    }

    if KNOBS.contains(&controller) {
        let mut target = i32::from(controller) + modifiers.cc_offset();
        if modifiers.shift() {
            target += SHIFTED_KNOB_OFFSET;
        }
        return match u8::try_from(target) {
            Ok(target) if target < 0x80 => {
                Decoded::passthrough([0xB0 | modifiers.midi_channel(), target, value])
            }
            _ => Decoded::default(),
        };
    }

    if value == 0 {
        return Decoded::default();
    }
    let action = if modifiers.shift() {
        match controller {
            UP_CC => ControlAction::BackUp,
            DOWN_CC => ControlAction::BackDown,
            LEFT_CC => ControlAction::SelectUp,
            RIGHT_CC => ControlAction::SelectDown,
            PLAY_CC => ControlAction::ToggleAudioPlay,
            RECORD_CC => ControlAction::ToggleAudioRecord,
            _ => return Decoded::default(),
        }
    } else {
        match controller {
            UP_CC => ControlAction::SelectConfirm,
            DOWN_CC => ControlAction::Back,
            PLAY_CC => ControlAction::ToggleMidiPlay,
            RECORD_CC => ControlAction::ToggleMidiRecord,
            _ => return Decoded::default(),
        }
    };
    Decoded::action(action)
}
