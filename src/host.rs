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

use jack::{
    AsyncClient, Client, ClientOptions, Control, MidiIn, MidiOut, MidiWriter, NotificationHandler,
    Port, PortFlags, PortId, ProcessHandler, ProcessScope, RawMidi,
};
use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::{
    config,
    device::registry::{Direction, Registry},
    process::ProcessStep,
    queue::MidiSink,
};

const MIDI_PORT_TYPE: &str = "8 bit raw midi";

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("JACK error: {0}")]
    Jack(#[from] jack::Error),

    #[error("JACK client was lost during a previous activation change")]
    Lost,
}

/// Writes at the start of the period.
struct JackSink<'a>(MidiWriter<'a>);

impl MidiSink for JackSink<'_> {
    fn write(&mut self, bytes: &[u8]) -> bool {
        self.0.write(&RawMidi { time: 0, bytes }).is_ok()
    }
}

/// Runs the process step in the JACK realtime thread.
struct Processor {
    input: Port<MidiIn>,
    device_output: Port<MidiOut>,
    output: Port<MidiOut>,
    step: ProcessStep,
}

impl ProcessHandler for Processor {
    fn process(&mut self, _: &Client, ps: &ProcessScope) -> Control {
        let mut device = JackSink(self.device_output.writer(ps));
        let mut passthrough = JackSink(self.output.writer(ps));
        self.step.run(
            self.input.iter(ps).map(|event| event.bytes),
            &mut device,
            &mut passthrough,
        );
        Control::Continue
    }
}

/// Feeds port connection changes to the device registry.
struct Notifications {
    registry: Arc<Registry>,
    /// Full name of the port the device sends to.
    input_port: String,
    /// Full name of the port the device receives from.
    device_output_port: String,
}

impl Notifications {
    /// Works out which device port a connection concerns.
    fn direction(&self, source: &str, destination: &str) -> Option<Direction> {
        if destination == self.input_port {
            Some(Direction::Input)
        } else if source == self.device_output_port {
            Some(Direction::Output)
        } else {
            None
        }
    }
}

impl NotificationHandler for Notifications {
    fn ports_connected(&mut self, client: &Client, port_id_a: PortId, port_id_b: PortId, are_connected: bool) {
        let (Some(source), Some(destination)) = (client.port_by_id(port_id_a), client.port_by_id(port_id_b)) else {
            return;
        };
        let source_name = source.name().unwrap_or_default();
        let destination_name = destination.name().unwrap_or_default();

        // The aliases of the remote end identify the device.
        let (direction, remote) = match self.direction(&source_name, &destination_name) {
            Some(Direction::Input) => (Direction::Input, source),
            Some(Direction::Output) => (Direction::Output, destination),
            None => return,
        };
        let aliases = remote.aliases().unwrap_or_default();
        self.registry
            .on_port_connect(direction, are_connected, aliases.as_slice());
    }

    unsafe fn shutdown(&mut self, status: jack::ClientStatus, reason: &str) {
        warn!(?status, reason, "JACK server shut down the client.");
    }
}

enum HostState {
    Active(AsyncClient<Notifications, Processor>),
    Inactive(Client, Notifications, Processor),
    Lost,
}

/// The bridge's JACK client.
pub struct Host {
    state: Mutex<HostState>,
}

impl Host {
    /// Registers the client and its ports and activates it.
    pub fn new(config: &config::Jack, step: ProcessStep, registry: Arc<Registry>) -> Result<Host, HostError> {
        let (client, _) = Client::new(&config.client_name(), ClientOptions::NO_START_SERVER)?;
        let input = client.register_port(&config.input_port(), MidiIn::default())?;
        let device_output = client.register_port(&config.device_output_port(), MidiOut::default())?;
        let output = client.register_port(&config.output_port(), MidiOut::default())?;

        let notifications = Notifications {
            registry,
            input_port: input.name()?,
            device_output_port: device_output.name()?,
        };
        let processor = Processor {
            input,
            device_output,
            output,
            step,
        };

        let active = client.activate_async(notifications, processor)?;
        info!(client = config.client_name(), "JACK client activated.");
        Ok(Host {
            state: Mutex::new(HostState::Active(active)),
        })
    }

    /// Connects the client to, or disconnects it from, the JACK graph.
    pub fn activate(&self, activate: bool) -> Result<(), HostError> {
        let mut state = self.state.lock();
        let next = match (std::mem::replace(&mut *state, HostState::Lost), activate) {
            (HostState::Inactive(client, notifications, processor), true) => {
                HostState::Active(client.activate_async(notifications, processor)?)
            }
            (HostState::Active(active), false) => {
                let (client, notifications, processor) = active.deactivate()?;
                HostState::Inactive(client, notifications, processor)
            }
            (HostState::Lost, _) => return Err(HostError::Lost),
            (unchanged, _) => unchanged,
        };
        *state = next;
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        matches!(*self.state.lock(), HostState::Active(_))
    }

    /// Deactivates and closes the client.
    pub fn close(self) {
        if let HostState::Active(active) = self.state.into_inner() {
            if let Err(e) = active.deactivate() {
                error!(err = e.to_string(), "Error deactivating JACK client");
            }
        }
    }
}

/// Lists the MIDI ports known to the JACK server and their aliases.
pub fn list_ports() -> Result<Vec<(String, Vec<String>)>, HostError> {
    let (client, _) = Client::new("padbridge-probe", ClientOptions::NO_START_SERVER)?;
    Ok(client
        .ports(None, Some(MIDI_PORT_TYPE), PortFlags::empty())
        .into_iter()
        .map(|name| {
            let aliases = client
                .port_by_name(&name)
                .and_then(|port| port.aliases().ok())
                .unwrap_or_default();
            (name, aliases)
        })
        .collect())
}
