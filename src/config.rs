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
use std::{path::Path, time::Duration};

use config::{Config, File};
use duration_string::DurationString;
use serde::Deserialize;

mod error;

pub use error::ConfigError;

const DEFAULT_CLIENT_NAME: &str = "padbridge";
const DEFAULT_INPUT_PORT: &str = "controller input";
const DEFAULT_DEVICE_OUTPUT_PORT: &str = "controller output";
const DEFAULT_OUTPUT_PORT: &str = "output";

const DEFAULT_LISTEN_PORT: u16 = 2001;
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_HOST_PORT: u16 = 1370;
const DEFAULT_REPLY_HOST: &str = "localhost";
const DEFAULT_SEQUENCE_STATUS_ADDRESS: &str = "/sequence/status";
const DEFAULT_PLAYER_STATUS_ADDRESS: &str = "/smf";
const DEFAULT_SEQUENCER_CHANNEL: &str = "/SEQUENCER/STATE";
const DEFAULT_PLAYER_CHANNEL: &str = "SMF";
const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// The bridge configuration. Every field is optional.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Bridge {
    jack: Option<Jack>,
    osc: Option<Osc>,
    /// Channel for forwarded knob CCs.
    midi_channel: Option<u8>,
    debug: Option<bool>,
}

impl Bridge {
    /// Parse a bridge configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Bridge, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Bridge>()?)
    }

    pub fn jack(&self) -> Jack {
        self.jack.clone().unwrap_or_default()
    }

    pub fn osc(&self) -> Osc {
        self.osc.clone().unwrap_or_default()
    }

    /// Returns the MIDI channel for forwarded CCs.
    pub fn midi_channel(&self) -> Result<u8, ConfigError> {
        match self.midi_channel {
            Some(channel) if channel > 15 => Err(ConfigError::MidiChannel(channel)),
            Some(channel) => Ok(channel),
            None => Ok(0),
        }
    }

    pub fn debug(&self) -> bool {
        self.debug.unwrap_or(false)
    }

    /// Turns on debug logging regardless of the file.
    pub fn with_debug(mut self, debug: bool) -> Bridge {
        if debug {
            self.debug = Some(true);
        }
        self
    }
}

/// JACK client and port names.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Jack {
    client_name: Option<String>,
    /// Receives events from the controller.
    input_port: Option<String>,
    /// Sends feedback to the controller.
    device_output_port: Option<String>,
    /// Forwards passthrough events downstream.
    output_port: Option<String>,
}

impl Jack {
    pub fn client_name(&self) -> String {
        self.client_name
            .clone()
            .unwrap_or_else(|| DEFAULT_CLIENT_NAME.to_string())
    }

    pub fn input_port(&self) -> String {
        self.input_port
            .clone()
            .unwrap_or_else(|| DEFAULT_INPUT_PORT.to_string())
    }

    pub fn device_output_port(&self) -> String {
        self.device_output_port
            .clone()
            .unwrap_or_else(|| DEFAULT_DEVICE_OUTPUT_PORT.to_string())
    }

    pub fn output_port(&self) -> String {
        self.output_port
            .clone()
            .unwrap_or_else(|| DEFAULT_OUTPUT_PORT.to_string())
    }
}

/// The OSC link to the control host.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct Osc {
    /// The local port status notifications arrive on.
    listen_port: Option<u16>,
    /// The control host.
    host: Option<String>,
    host_port: Option<u16>,
    /// The hostname the control host should send notifications to.
    reply_host: Option<String>,
    sequence_status_address: Option<String>,
    player_status_address: Option<String>,
    /// Subscription channel for sequencer status.
    sequencer_channel: Option<String>,
    /// Subscription channel for file player status.
    player_channel: Option<String>,
    /// How long to wait for unsubscribe messages to go out on shutdown.
    shutdown_grace: Option<String>,
}

impl Osc {
    pub fn listen_port(&self) -> u16 {
        self.listen_port.unwrap_or(DEFAULT_LISTEN_PORT)
    }

    pub fn host(&self) -> String {
        self.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string())
    }

    pub fn host_port(&self) -> u16 {
        self.host_port.unwrap_or(DEFAULT_HOST_PORT)
    }

    pub fn reply_host(&self) -> String {
        self.reply_host
            .clone()
            .unwrap_or_else(|| DEFAULT_REPLY_HOST.to_string())
    }

    pub fn sequence_status_address(&self) -> String {
        self.sequence_status_address
            .clone()
            .unwrap_or_else(|| DEFAULT_SEQUENCE_STATUS_ADDRESS.to_string())
    }

    pub fn player_status_address(&self) -> String {
        self.player_status_address
            .clone()
            .unwrap_or_else(|| DEFAULT_PLAYER_STATUS_ADDRESS.to_string())
    }

    pub fn sequencer_channel(&self) -> String {
        self.sequencer_channel
            .clone()
            .unwrap_or_else(|| DEFAULT_SEQUENCER_CHANNEL.to_string())
    }

    pub fn player_channel(&self) -> String {
        self.player_channel
            .clone()
            .unwrap_or_else(|| DEFAULT_PLAYER_CHANNEL.to_string())
    }

    /// Returns the shutdown grace period from the configuration.
    pub fn shutdown_grace(&self) -> Result<Duration, ConfigError> {
        match &self.shutdown_grace {
            Some(grace) => Ok(DurationString::from_string(grace.clone())?.into()),
            None => Ok(DEFAULT_SHUTDOWN_GRACE),
        }
    }

    #[cfg(test)]
    pub fn for_test(listen_port: u16, host_port: u16) -> Osc {
        Osc {
            listen_port: Some(listen_port),
            host_port: Some(host_port),
            ..Default::default()
        }
    }
}
