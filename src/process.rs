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

use crate::{
    controller::{Command, CommandSender},
    queue::MidiSink,
    translator::Translator,
};

/// The work done once per realtime period. Never blocks and never allocates.
pub struct ProcessStep {
    translator: Arc<Translator>,
    commands: CommandSender,
}

impl ProcessStep {
    pub fn new(translator: Arc<Translator>, commands: CommandSender) -> ProcessStep {
        ProcessStep {
            translator,
            commands,
        }
    }

    /// Decodes this period's device events, forwards passthrough messages and
    /// then flushes as much queued device feedback as the device buffer accepts.
    pub fn run<'a, I, D, P>(&self, input: I, device: &mut D, passthrough: &mut P)
    where
        I: IntoIterator<Item = &'a [u8]>,
        D: MidiSink + ?Sized,
        P: MidiSink + ?Sized,
    {
        for raw in input {
            let decoded = self.translator.decode(raw);
            if let Some(action) = decoded.action {
                // A full command buffer drops the action.
                self.commands.send(Command::Action(action));
            }
            if let Some(message) = decoded.passthrough {
                // Passthrough has to stay aligned with its input, so it is
                // dropped rather than deferred.
                passthrough.write(&message);
            }
        }

        self.translator.queue().drain(device);
    }
}
