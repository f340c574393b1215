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
use std::{error::Error, sync::Arc, time::Duration};

use parking_lot::Mutex;
use tracing::{error, info, warn};

use crate::{
    config,
    controller::{osc, Command, CommandSender, Controller},
    device::{
        registry::{ProtocolListener, Registry},
        ModelCursor, SupportedModel,
    },
    host::{Host, HostError},
    logging,
    process::ProcessStep,
    queue::OutboundQueue,
    state::BridgeState,
    translator::Translator,
};

/// How long a subscription change may wait behind queued actions.
const LIFECYCLE_SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Moves the device and the control host between protocols.
struct ProtocolSwitch {
    translator: Arc<Translator>,
    commands: CommandSender,
}

impl ProtocolSwitch {
    fn send(&self, command: Command) {
        if !self.commands.send_timeout(command, LIFECYCLE_SEND_TIMEOUT) {
            warn!(?command, "Control plane is backed up, subscription change dropped.");
        }
    }
}

impl ProtocolListener for ProtocolSwitch {
    fn protocol_changed(&self, old: Option<SupportedModel>, new: Option<SupportedModel>) {
        if let Some(old) = old {
            self.send(Command::Unsubscribe);
            self.translator.disable(old);
        }
        if let Some(new) = new {
            self.translator.enable(new);
            self.send(Command::Subscribe);
        }
    }
}

/// The running bridge.
pub struct Bridge {
    state: Arc<BridgeState>,
    translator: Arc<Translator>,
    registry: Arc<Registry>,
    controller: Controller,
    host: Option<Host>,
    models: Mutex<ModelCursor>,
    shutdown_grace: Duration,
}

impl Bridge {
    /// Starts the control plane and the JACK client. A JACK failure is reported
    /// once and leaves the bridge running without a device. Must be called from
    /// within a tokio runtime.
    pub fn initialize(config: &config::Bridge) -> Result<Bridge, Box<dyn Error>> {
        let jack = config.jack();
        Self::build(config, |step, registry| Host::new(&jack, step, registry))
    }

    fn build<F>(config: &config::Bridge, host: F) -> Result<Bridge, Box<dyn Error>>
    where
        F: FnOnce(ProcessStep, Arc<Registry>) -> Result<Host, HostError>,
    {
        let osc_config = config.osc();
        let shutdown_grace = osc_config.shutdown_grace()?;

        let state = Arc::new(BridgeState::new());
        match config.midi_channel() {
            Ok(channel) => {
                state.modifiers().set_midi_channel(channel);
            }
            Err(e) => warn!(err = e.to_string(), "Ignoring MIDI channel from config"),
        }

        let translator = Arc::new(Translator::new(state.clone(), Arc::new(OutboundQueue::new())));
        let controller = Controller::new(osc::Driver::new(&osc_config, translator.clone())?);
        let commands = controller.sender();

        let registry = Arc::new(Registry::new(
            state.clone(),
            Arc::new(ProtocolSwitch {
                translator: translator.clone(),
                commands: commands.clone(),
            }),
        ));

        let host = match host(ProcessStep::new(translator.clone(), commands), registry.clone()) {
            Ok(host) => Some(host),
            Err(e) => {
                error!(err = e.to_string(), "Unable to start JACK client, the bridge is disabled");
                None
            }
        };

        Ok(Bridge {
            state,
            translator,
            registry,
            controller,
            host,
            models: Mutex::new(ModelCursor::default()),
            shutdown_grace,
        })
    }

    /// Releases the device and the control host subscriptions, then stops.
    pub async fn shutdown(self) {
        info!("Shutting down.");
        if self.registry.protocol().is_some() {
            self.registry.reset();
            // Gives the realtime thread and the driver time to flush.
            tokio::time::sleep(self.shutdown_grace).await;
        }
        if let Some(host) = self.host {
            host.close();
        }
        self.controller.shutdown().await;
    }

    /// Connects the bridge to, or disconnects it from, the JACK graph.
    pub fn activate(&self, activate: bool) {
        if let Some(host) = &self.host {
            if let Err(e) = host.activate(activate) {
                error!(err = e.to_string(), activate, "Error changing JACK activation");
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.host.as_ref().is_some_and(Host::is_active)
    }

    pub fn protocol(&self) -> Option<SupportedModel> {
        self.state.protocol()
    }

    /// Sets the channel for forwarded knob CCs. Channels above 15 are ignored.
    pub fn set_midi_channel(&self, channel: u32) {
        if let Ok(channel) = u8::try_from(channel) {
            self.state.modifiers().set_midi_channel(channel);
        }
    }

    pub fn select_knobs(&self, bank: u32) {
        self.translator.select_knobs(bank);
    }

    pub fn select_pads(&self, mode: u32) {
        self.translator.select_pads(mode);
    }

    /// Walks the supported model names. See [`ModelCursor`].
    pub fn supported_models(&self, reset: bool) -> Option<&'static str> {
        self.models.lock().next(reset, self.state.protocol())
    }

    pub fn set_debug(&self, debug: bool) {
        if !logging::set_debug(debug) {
            warn!("Logging isn't initialised, debug toggle ignored.");
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Builds a bridge without a JACK client.
    #[cfg(test)]
    fn detached(config: &config::Bridge) -> Result<Bridge, Box<dyn Error>> {
        Self::build(config, |_, _| Err(HostError::Lost))
    }
}
