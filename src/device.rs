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
use std::fmt;

pub mod registry;

/// The largest session grid of any supported model.
pub const MAX_SESSION_PADS: usize = 64;

/// Novation MK3 colour indices that most closely match the sequencer's group colours.
const NOVATION_MK3_PALETTE: [u8; 16] = [
    67, 35, 9, 47, 105, 63, 94, 126, 40, 81, 8, 45, 28, 95, 104, 44,
];

/// Launch buttons 1-8 then 9-16.
const LAUNCHKEY_SESSION_PADS: [u8; 16] = [
    96, 97, 98, 99, 100, 101, 102, 103, 112, 113, 114, 115, 116, 117, 118, 119,
];

const LAUNCHKEY_DRUM_PADS: [u8; 16] = [
    40, 41, 42, 43, 44, 45, 46, 47, 48, 49, 50, 51, 36, 37, 38, 39,
];

/// Programmer layout, top row first.
const LAUNCHPAD_SESSION_PADS: [u8; 64] = [
    81, 82, 83, 84, 85, 86, 87, 88, //
    71, 72, 73, 74, 75, 76, 77, 78, //
    61, 62, 63, 64, 65, 66, 67, 68, //
    51, 52, 53, 54, 55, 56, 57, 58, //
    41, 42, 43, 44, 45, 46, 47, 48, //
    31, 32, 33, 34, 35, 36, 37, 38, //
    21, 22, 23, 24, 25, 26, 27, 28, //
    11, 12, 13, 14, 15, 16, 17, 18, //
];

const NO_PAD: u8 = u8::MAX;

/// Reverse lookup from a device note number to the pad index that owns it.
struct NoteIndex([u8; 128]);

impl NoteIndex {
    const fn build(notes: &[u8]) -> NoteIndex {
        let mut index = [NO_PAD; 128];
        let mut i = 0;
        while i < notes.len() {
            index[(notes[i] & 0x7F) as usize] = i as u8;
            i += 1;
        }
        NoteIndex(index)
    }

    fn get(&self, note: u8) -> Option<usize> {
        match self.0.get(note as usize) {
            Some(&NO_PAD) | None => None,
            Some(&pad) => Some(pad as usize),
        }
    }
}

static LAUNCHKEY_SESSION_INDEX: NoteIndex = NoteIndex::build(&LAUNCHKEY_SESSION_PADS);
static LAUNCHPAD_SESSION_INDEX: NoteIndex = NoteIndex::build(&LAUNCHPAD_SESSION_PADS);

/// A controller model the bridge knows how to talk to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SupportedModel {
    /// Novation Launchkey Mini MK3.
    LaunchkeyMiniMk3,
    /// Novation Launchpad Mini MK3.
    LaunchpadMiniMk3,
}

impl SupportedModel {
    /// All supported models, in alias matching order.
    pub const ALL: [SupportedModel; 2] = [
        SupportedModel::LaunchkeyMiniMk3,
        SupportedModel::LaunchpadMiniMk3,
    ];

    /// The substring that identifies this model in a port alias.
    pub fn alias(self) -> &'static str {
        match self {
            SupportedModel::LaunchkeyMiniMk3 => "Launchkey-Mini-MK3-MIDI-2",
            SupportedModel::LaunchpadMiniMk3 => "Launchpad-Mini-MK3-MIDI-2",
        }
    }

    /// Position of the model within [`SupportedModel::ALL`].
    pub fn index(self) -> usize {
        match self {
            SupportedModel::LaunchkeyMiniMk3 => 0,
            SupportedModel::LaunchpadMiniMk3 => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<SupportedModel> {
        Self::ALL.get(index).copied()
    }

    /// Finds the first supported model whose identifier appears in any of the aliases.
    pub fn detect<S: AsRef<str>>(aliases: &[S]) -> Option<SupportedModel> {
        Self::ALL.into_iter().find(|model| {
            aliases
                .iter()
                .any(|alias| alias.as_ref().contains(model.alias()))
        })
    }

    /// Device note numbers of the session pads, indexed by sequence slot.
    pub fn session_pads(self) -> &'static [u8] {
        match self {
            SupportedModel::LaunchkeyMiniMk3 => &LAUNCHKEY_SESSION_PADS,
            SupportedModel::LaunchpadMiniMk3 => &LAUNCHPAD_SESSION_PADS,
        }
    }

    /// Device note numbers of the drum pads.
    pub fn drum_pads(self) -> &'static [u8] {
        match self {
            SupportedModel::LaunchkeyMiniMk3 => &LAUNCHKEY_DRUM_PADS,
            SupportedModel::LaunchpadMiniMk3 => &[],
        }
    }

    pub fn palette(self) -> &'static [u8; 16] {
        &NOVATION_MK3_PALETTE
    }

    pub fn session_pad_count(self) -> usize {
        self.session_pads().len()
    }

    /// Resolves a sequence slot to the device note of its pad.
    pub fn session_note(self, index: usize) -> Option<u8> {
        self.session_pads().get(index).copied()
    }

    /// Resolves a device note to the sequence slot of its pad.
    pub fn session_index(self, note: u8) -> Option<usize> {
        match self {
            SupportedModel::LaunchkeyMiniMk3 => LAUNCHKEY_SESSION_INDEX.get(note),
            SupportedModel::LaunchpadMiniMk3 => LAUNCHPAD_SESSION_INDEX.get(note),
        }
    }

    /// The palette colour for a sequencer group.
    pub fn colour(self, group: u8) -> u8 {
        self.palette()[(group % 16) as usize]
    }
}

impl fmt::Display for SupportedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupportedModel::LaunchkeyMiniMk3 => write!(f, "Novation Launchkey Mini MK3"),
            SupportedModel::LaunchpadMiniMk3 => write!(f, "Novation Launchpad Mini MK3"),
        }
    }
}

/// Walks the supported model list. While a protocol is active only the active
/// model is listed.
#[derive(Default)]
pub struct ModelCursor {
    position: usize,
}

impl ModelCursor {
    /// Returns the next model alias. A reset moves the cursor to the active
    /// protocol, or to the start of the list when there is none.
    pub fn next(&mut self, reset: bool, protocol: Option<SupportedModel>) -> Option<&'static str> {
        match (reset, protocol) {
            (true, Some(model)) => self.position = model.index(),
            (true, None) => self.position = 0,
            (false, Some(model)) => {
                self.position = if self.position < model.index() {
                    model.index()
                } else {
                    SupportedModel::ALL.len()
                }
            }
            (false, None) => {}
        }

        let model = SupportedModel::from_index(self.position)?;
        self.position += 1;
        Some(model.alias())
    }
}

#[cfg(test)]
mod test {
    use super::{ModelCursor, SupportedModel};

    #[test]
    fn test_detect() {
        assert_eq!(
            SupportedModel::detect(&["system:midi_capture_1", "alsa_pcm:Launchkey-Mini-MK3-MIDI-2/midi_capture_1"]),
            Some(SupportedModel::LaunchkeyMiniMk3)
        );
        assert_eq!(
            SupportedModel::detect(&["alsa_pcm:Launchpad-Mini-MK3-MIDI-2/midi_playback_1"]),
            Some(SupportedModel::LaunchpadMiniMk3)
        );
        assert_eq!(SupportedModel::detect(&["alsa_pcm:Launchkey-MK2"]), None);
        assert_eq!(SupportedModel::detect::<&str>(&[]), None);
    }

    #[test]
    fn test_session_lookup() {
        let model = SupportedModel::LaunchkeyMiniMk3;
        assert_eq!(model.session_pad_count(), 16);
        assert_eq!(model.session_note(0), Some(96));
        assert_eq!(model.session_note(8), Some(112));
        assert_eq!(model.session_note(16), None);
        assert_eq!(model.session_index(97), Some(1));
        assert_eq!(model.session_index(119), Some(15));
        assert_eq!(model.session_index(104), None);

        let model = SupportedModel::LaunchpadMiniMk3;
        assert_eq!(model.session_pad_count(), 64);
        assert_eq!(model.session_note(0), Some(81));
        assert_eq!(model.session_note(63), Some(18));
        assert_eq!(model.session_index(11), Some(56));
        assert_eq!(model.session_index(19), None);
        assert!(model.drum_pads().is_empty());
    }

    #[test]
    fn test_colour_wraps_groups() {
        let model = SupportedModel::LaunchkeyMiniMk3;
        assert_eq!(model.colour(0), 67);
        assert_eq!(model.colour(2), 9);
        assert_eq!(model.colour(18), 9);
    }

    #[test]
    fn test_model_cursor_without_protocol() {
        let mut cursor = ModelCursor::default();
        assert_eq!(cursor.next(true, None), Some("Launchkey-Mini-MK3-MIDI-2"));
        assert_eq!(cursor.next(false, None), Some("Launchpad-Mini-MK3-MIDI-2"));
        assert_eq!(cursor.next(false, None), None);
        assert_eq!(cursor.next(true, None), Some("Launchkey-Mini-MK3-MIDI-2"));
    }

    #[test]
    fn test_model_cursor_with_protocol() {
        let mut cursor = ModelCursor::default();
        let protocol = Some(SupportedModel::LaunchpadMiniMk3);
        assert_eq!(cursor.next(true, protocol), Some("Launchpad-Mini-MK3-MIDI-2"));
        assert_eq!(cursor.next(false, protocol), None);

        // Without a reset the cursor jumps forward to the active model.
        let mut cursor = ModelCursor::default();
        assert_eq!(cursor.next(false, protocol), Some("Launchpad-Mini-MK3-MIDI-2"));
        assert_eq!(cursor.next(false, protocol), None);
    }
}
