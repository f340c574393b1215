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
//! Novation Launchpad Mini MK3 in programmer mode.

use midly::MidiMessage;

use super::Decoded;
use crate::{controller::ControlAction, device::SupportedModel, queue::OutboundQueue};

const LAYOUT_SESSION: u8 = 0x00;
const LAYOUT_PROGRAMMER: u8 = 0x7F;

/// Layout selection sysex.
fn layout(layout: u8) -> [u8; 9] {
    [0xF0, 0x00, 0x20, 0x29, 0x02, 0x0D, 0x00, layout, 0xF7]
}

pub(super) fn enable(queue: &OutboundQueue) {
    queue.enqueue(&layout(LAYOUT_PROGRAMMER));
}

pub(super) fn disable(queue: &OutboundQueue) {
    queue.enqueue(&layout(LAYOUT_SESSION));
}

pub(super) fn select_pads(queue: &OutboundQueue, mode: u8) {
    queue.enqueue(&layout(mode));
}

pub(super) fn decode(message: MidiMessage) -> Decoded {
    match message {
        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
            match SupportedModel::LaunchpadMiniMk3.session_index(key.as_int()) {
                Some(index) => Decoded::action(ControlAction::ToggleSequence(index as u8)),
                None => Decoded::default(),
            }
        }
        _ => Decoded::default(),
    }
}
