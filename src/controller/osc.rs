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
use std::{
    error::Error,
    io,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use rosc::{
    address::{Matcher, OscAddress},
    OscMessage, OscPacket, OscType,
};
use tokio::{
    net::UdpSocket,
    select,
    sync::mpsc::{self, Receiver, Sender},
    task::JoinHandle,
};
use tracing::{debug, error, info, span, Instrument, Level};

use super::{Command, ControlAction};
use crate::{config, translator::Translator};

const REGISTER: &str = "/cuia/register";
const UNREGISTER: &str = "/cuia/unregister";
const ACTION_PREFIX: &str = "/cuia/";

/// A control plane driver that talks OSC to the control host.
pub struct Driver {
    /// Applies status notifications to the device.
    translator: Arc<Translator>,
    /// Bound when the driver is built, handed to the first monitor.
    socket: Mutex<Option<std::net::UdpSocket>>,
    /// The control host.
    host_addr: SocketAddr,
    /// The hostname the control host replies to.
    reply_host: String,
    osc_events: Arc<OscEvents>,
}

pub(super) struct OscEvents {
    /// Sequencer pad status: bank, sequence, state and colour group.
    sequence_status: Matcher,
    /// File player status bitmask.
    player_status: Matcher,
    /// Subscription channel for sequencer notifications.
    sequencer_channel: String,
    /// Subscription channel for player notifications.
    player_channel: String,
}

impl Driver {
    pub fn new(config: &config::Osc, translator: Arc<Translator>) -> Result<Arc<Self>, Box<dyn Error>> {
        let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.listen_port()));
        let host = config.host();
        let host_addr = (host.as_str(), config.host_port())
            .to_socket_addrs()?
            .find(SocketAddr::is_ipv4)
            .ok_or_else(|| format!("no IPv4 address found for control host {}", host))?;

        let socket = std::net::UdpSocket::bind(addr)
            .map_err(|e| format!("unable to listen for OSC on {}: {}", addr, e))?;
        socket.set_nonblocking(true)?;
        debug!(addr = %socket.local_addr()?, "Bound OSC socket.");

        Ok(Arc::new(Driver {
            translator,
            socket: Mutex::new(Some(socket)),
            host_addr,
            reply_host: config.reply_host(),
            osc_events: Arc::new(OscEvents {
                sequence_status: Matcher::new(config.sequence_status_address().as_str())?,
                player_status: Matcher::new(config.player_status_address().as_str())?,
                sequencer_channel: config.sequencer_channel(),
                player_channel: config.player_channel(),
            }),
        }))
    }
}

/// Aborts a task when dropped, so the socket goes away with the driver.
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, mut commands: Receiver<Command>) -> JoinHandle<Result<(), io::Error>> {
        let socket = self.socket.lock().take();
        let host_addr = self.host_addr;
        let reply_host = self.reply_host.clone();
        let translator = self.translator.clone();
        let osc_events = self.osc_events.clone();

        let span = span!(Level::INFO, "OSC Driver");
        tokio::spawn(async move {
            let Some(socket) = socket else {
                return Err(io::Error::other("OSC socket is already being monitored"));
            };
            let socket = UdpSocket::from_std(socket)?;
            let reply_port = socket.local_addr()?.port();
            info!(port = reply_port, host = %host_addr, "OSC driver started.");

            let (rx_sender, mut rx_receiver) = mpsc::channel::<OscPacket>(10);
            let (tx_sender, tx_receiver) = mpsc::channel::<OscPacket>(10);
            let _comms = AbortOnDrop(tokio::spawn(Self::handle_udp_comms(
                socket,
                host_addr,
                rx_sender,
                tx_receiver,
            )));

            // Notifications are only applied while a device is subscribed.
            let subscribed = AtomicBool::new(false);
            let registration = Registration {
                reply_host: &reply_host,
                reply_port,
                osc_events: &osc_events,
            };

            loop {
                select! {
                    packet = rx_receiver.recv() => {
                        let Some(packet) = packet else {
                            return Ok(());
                        };
                        if subscribed.load(Ordering::Relaxed) {
                            if let Err(e) = Self::handle_packet(&translator, &osc_events, &packet).await {
                                error!(err = e.to_string(), "Error handling OSC packet");
                            }
                        }
                    }
                    command = commands.recv() => {
                        let Some(command) = command else {
                            info!("Command channel closed, stopping OSC driver.");
                            return Ok(());
                        };
                        if let Err(e) = Self::handle_command(command, &registration, &subscribed, &tx_sender).await {
                            error!(err = e.to_string(), "Error handling command");
                        }
                    }
                }
            }
        }.instrument(span))
    }
}

/// Everything needed to build subscription messages.
pub(super) struct Registration<'a> {
    reply_host: &'a str,
    reply_port: u16,
    osc_events: &'a OscEvents,
}

impl Registration<'_> {
    fn packets(&self, addr: &str) -> [OscPacket; 2] {
        [&self.osc_events.sequencer_channel, &self.osc_events.player_channel].map(|channel| {
            OscPacket::Message(OscMessage {
                addr: addr.to_string(),
                args: vec![
                    OscType::String(self.reply_host.to_string()),
                    OscType::Int(i32::from(self.reply_port)),
                    OscType::String(channel.clone()),
                ],
            })
        })
    }
}

impl Driver {
    /// Handles UDP sending/receiving.
    pub(super) async fn handle_udp_comms(
        socket: UdpSocket,
        host_addr: SocketAddr,
        rx_sender: Sender<OscPacket>,
        mut tx_receiver: Receiver<OscPacket>,
    ) {
        let mut buf = [0u8; rosc::decoder::MTU];

        // Spurious network errors are logged and otherwise ignored.
        loop {
            select! {
                result = socket.recv_from(&mut buf) => {
                    match result {
                        Ok((size, _)) => {
                            match rosc::decoder::decode_udp(&buf[..size]) {
                                Ok((_, packet)) => {
                                    if let Err(e) = rx_sender.send(packet).await {
                                        error!(err = e.to_string(), "Error sending packet on channel.");
                                    }
                                }
                                Err(e) => error!(err = e.to_string(), "Error decoding OSC message"),
                            }
                        },
                        Err(e) => error!(err = e.to_string(), "Error receiving UDP."),
                    }
                }
                packet = tx_receiver.recv() => {
                    let Some(packet) = packet else {
                        return;
                    };
                    match rosc::encoder::encode(&packet) {
                        Ok(buf) => {
                            if let Err(e) = socket.send_to(&buf, host_addr).await {
                                error!(err = e.to_string(), "Error sending UDP data.");
                            }
                        }
                        Err(e) => error!(err = e.to_string(), "Error encoding OSC message"),
                    };
                }
            };
        }
    }

    /// Turns a command into messages for the control host.
    pub(super) async fn handle_command(
        command: Command,
        registration: &Registration<'_>,
        subscribed: &AtomicBool,
        tx_sender: &Sender<OscPacket>,
    ) -> Result<(), Box<dyn Error>> {
        match command {
            Command::Subscribe => {
                info!("Subscribing to control host notifications.");
                subscribed.store(true, Ordering::Relaxed);
                for packet in registration.packets(REGISTER) {
                    tx_sender.send(packet).await?;
                }
            }
            Command::Unsubscribe => {
                info!("Unsubscribing from control host notifications.");
                subscribed.store(false, Ordering::Relaxed);
                for packet in registration.packets(UNREGISTER) {
                    tx_sender.send(packet).await?;
                }
            }
            Command::Action(action) => {
                debug!(action = action.name(), "Sending action.");
                tx_sender.send(action_packet(action)).await?;
            }
        }
        Ok(())
    }

    /// Handles incoming OSC packets.
    pub(super) async fn handle_packet(
        translator: &Arc<Translator>,
        osc_events: &Arc<OscEvents>,
        packet: &OscPacket,
    ) -> Result<bool, Box<dyn Error>> {
        match packet {
            OscPacket::Message(osc_message) => {
                Box::pin(Self::handle_message(translator, osc_events, osc_message)).await
            }
            OscPacket::Bundle(osc_bundle) => {
                let mut recognized_event = false;
                for packet in &osc_bundle.content {
                    recognized_event |=
                        Box::pin(Self::handle_packet(translator, osc_events, packet)).await?;
                }

                Ok(recognized_event)
            }
        }
    }

    /// Handles individual OSC messages. Messages with unexpected arguments are ignored.
    pub(super) async fn handle_message(
        translator: &Arc<Translator>,
        osc_events: &Arc<OscEvents>,
        msg: &OscMessage,
    ) -> Result<bool, Box<dyn Error>> {
        let address = OscAddress::new(msg.addr.clone())?;
        if osc_events.sequence_status.match_address(&address) {
            if let [OscType::Int(bank), OscType::Int(sequence), OscType::Int(state), OscType::Int(group), ..] =
                msg.args.as_slice()
            {
                translator.on_sequence_status(*bank, *sequence, *state, *group);
                return Ok(true);
            }
        } else if osc_events.player_status.match_address(&address) {
            if let [OscType::Int(mask)] = msg.args.as_slice() {
                translator.on_player_status(*mask);
                return Ok(true);
            }
        }

        Ok(false)
    }
}

fn action_packet(action: ControlAction) -> OscPacket {
    let args = match action {
        ControlAction::ToggleSequence(sequence) => vec![OscType::Int(i32::from(sequence))],
        _ => vec![],
    };
    OscPacket::Message(OscMessage {
        addr: format!("{}{}", ACTION_PREFIX, action.name()),
        args,
    })
}
