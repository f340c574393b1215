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
use std::{io, sync::Arc, time::Duration};

use crossbeam_channel::TryRecvError;
use tokio::{
    sync::mpsc::{self, Receiver},
    task::JoinHandle,
};
use tracing::{error, info, span, warn, Level};

pub mod osc;

/// Buffered commands between the realtime side and the control plane.
pub(crate) const COMMAND_BUFFER: usize = 64;

/// How long the forwarder sleeps when there's nothing to forward.
const FORWARD_POLL: Duration = Duration::from_millis(2);

/// Actions decoded from the controller that are published to the control host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlAction {
    /// Toggles playback of the given sequence.
    ToggleSequence(u8),
    BackUp,
    BackDown,
    SelectUp,
    SelectDown,
    /// Confirms the current selection.
    SelectConfirm,
    /// Navigates back.
    Back,
    ToggleAudioPlay,
    ToggleAudioRecord,
    ToggleMidiPlay,
    ToggleMidiRecord,
}

impl ControlAction {
    /// The host's name for the action.
    pub fn name(&self) -> &'static str {
        match self {
            ControlAction::ToggleSequence(_) => "TOGGLE_SEQUENCE",
            ControlAction::BackUp => "BACK_UP",
            ControlAction::BackDown => "BACK_DOWN",
            ControlAction::SelectUp => "SELECT_UP",
            ControlAction::SelectDown => "SELECT_DOWN",
            ControlAction::SelectConfirm => "SWITCH_SELECT_SHORT",
            ControlAction::Back => "SWITCH_BACK_SHORT",
            ControlAction::ToggleAudioPlay => "TOGGLE_AUDIO_PLAY",
            ControlAction::ToggleAudioRecord => "TOGGLE_AUDIO_RECORD",
            ControlAction::ToggleMidiPlay => "TOGGLE_MIDI_PLAY",
            ControlAction::ToggleMidiRecord => "TOGGLE_MIDI_RECORD",
        }
    }
}

/// Work for the control plane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// A controller became available: subscribe to status notifications.
    Subscribe,
    /// The controller went away: drop the status subscriptions.
    Unsubscribe,
    /// Publish an action to the host.
    Action(ControlAction),
}

/// Non-blocking handle for queueing commands from the realtime and notification threads.
#[derive(Clone)]
pub struct CommandSender {
    tx: crossbeam_channel::Sender<Command>,
}

impl CommandSender {
    /// Queues a command. Commands are dropped when the buffer is full.
    pub fn send(&self, command: Command) -> bool {
        self.tx.try_send(command).is_ok()
    }

    /// Queues a command, waiting up to `timeout` for room. Not for the realtime thread.
    pub fn send_timeout(&self, command: Command, timeout: Duration) -> bool {
        self.tx.send_timeout(command, timeout).is_ok()
    }

    #[cfg(test)]
    pub fn pair() -> (CommandSender, crossbeam_channel::Receiver<Command>) {
        let (tx, rx) = crossbeam_channel::bounded(COMMAND_BUFFER);
        (CommandSender { tx }, rx)
    }
}

/// A control plane transport.
pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, commands: Receiver<Command>) -> JoinHandle<Result<(), io::Error>>;
}

/// Runs a driver and feeds it commands.
pub struct Controller {
    commands: CommandSender,
    forwarder: JoinHandle<()>,
    driver: JoinHandle<Result<(), io::Error>>,
}

impl Controller {
    /// Starts the driver. Must be called from within a tokio runtime.
    pub fn new(driver: Arc<dyn Driver>) -> Controller {
        let (tx, rx) = crossbeam_channel::bounded::<Command>(COMMAND_BUFFER);
        let (commands_tx, commands_rx) = mpsc::channel::<Command>(COMMAND_BUFFER);

        // The realtime thread can't touch the async channel, so commands hop
        // through a blocking forwarder. It polls rather than parking on the
        // channel, so a realtime `try_send` never has a receiver to wake.
        let forwarder = tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "command forwarder");
            let _enter = span.enter();

            loop {
                match rx.try_recv() {
                    Ok(command) => {
                        if commands_tx.blocking_send(command).is_err() {
                            info!("Driver closed, stopping command forwarder.");
                            return;
                        }
                    }
                    Err(TryRecvError::Empty) => {
                        if commands_tx.is_closed() {
                            return;
                        }
                        std::thread::sleep(FORWARD_POLL);
                    }
                    Err(TryRecvError::Disconnected) => return,
                }
            }
        });

        Controller {
            commands: CommandSender { tx },
            forwarder,
            driver: driver.monitor_events(commands_rx),
        }
    }

    pub fn sender(&self) -> CommandSender {
        self.commands.clone()
    }

    /// Stops the driver and waits for the forwarder to notice.
    pub async fn shutdown(self) {
        self.driver.abort();
        match self.driver.await {
            Ok(Err(e)) => error!(err = e.to_string(), "Control driver failed"),
            Err(e) if !e.is_cancelled() => error!(err = e.to_string(), "Error joining control driver"),
            _ => {}
        }
        drop(self.commands);
        if let Err(e) = self.forwarder.await {
            warn!(err = e.to_string(), "Error joining command forwarder");
        }
    }
}
