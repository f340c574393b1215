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
use std::{collections::VecDeque, fmt};

use parking_lot::Mutex;
use tracing::{debug, trace};

/// The longest device-bound message: a layout select sysex.
pub const MAX_MESSAGE_LEN: usize = 9;

/// Queue capacity reserved up front so the realtime side never reallocates.
const DEFAULT_QUEUE_CAPACITY: usize = 512;

/// A device-bound MIDI message.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct OutboundMessage {
    len: u8,
    data: [u8; MAX_MESSAGE_LEN],
}

impl OutboundMessage {
    /// Creates a message from raw bytes. Empty or oversized messages and messages
    /// that don't start with a status byte are rejected.
    pub fn new(bytes: &[u8]) -> Option<OutboundMessage> {
        if bytes.is_empty() || bytes.len() > MAX_MESSAGE_LEN || bytes[0] < 0x80 {
            return None;
        }

        let mut data = [0u8; MAX_MESSAGE_LEN];
        data[..bytes.len()].copy_from_slice(bytes);
        Some(OutboundMessage {
            len: bytes.len() as u8,
            data,
        })
    }

    /// Creates a three byte channel message. A message is only rejected for its
    /// data bytes when both of them are out of range.
    pub fn short(status: u8, value1: u8, value2: u8) -> Option<OutboundMessage> {
        if status < 0x80 || (value1 > 127 && value2 > 127) {
            return None;
        }
        OutboundMessage::new(&[status, value1, value2])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }
}

impl fmt::Debug for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutboundMessage({:02X?})", self.as_bytes())
    }
}

/// A per-period MIDI output buffer.
pub trait MidiSink {
    /// Writes the message if there is room for it this period. Returns false when
    /// the sink is full.
    fn write(&mut self, bytes: &[u8]) -> bool;
}

/// FIFO of messages waiting to be written to the device.
///
/// Producers lock the queue; the realtime consumer only ever tries the lock and
/// skips the period when it's contended.
pub struct OutboundQueue {
    messages: Mutex<VecDeque<OutboundMessage>>,
    capacity: usize,
}

impl OutboundQueue {
    pub fn new() -> OutboundQueue {
        OutboundQueue::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> OutboundQueue {
        OutboundQueue {
            messages: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Queues raw bytes for the device. Invalid messages are dropped.
    pub fn enqueue(&self, bytes: &[u8]) {
        match OutboundMessage::new(bytes) {
            Some(message) => {
                self.push(message);
            }
            None => trace!(bytes = ?bytes, "Dropping invalid device message."),
        }
    }

    /// Queues a three byte message for the device. Invalid messages are dropped.
    pub fn enqueue_short(&self, status: u8, value1: u8, value2: u8) {
        match OutboundMessage::short(status, value1, value2) {
            Some(message) => {
                self.push(message);
            }
            None => trace!(status, value1, value2, "Dropping invalid device message."),
        }
    }

    /// Appends a message, waiting for the lock if the realtime side holds it.
    /// A full queue drops the message; feedback is resent with the next status.
    pub fn push(&self, message: OutboundMessage) -> bool {
        let mut messages = self.messages.lock();
        if messages.len() >= self.capacity {
            debug!(?message, "Device queue full, dropping message.");
            return false;
        }
        messages.push_back(message);
        true
    }

    /// Appends a message without waiting. Used from the realtime thread, where a
    /// contended or full queue drops the message instead.
    pub fn try_push(&self, message: OutboundMessage) -> bool {
        match self.messages.try_lock() {
            Some(mut messages) if messages.len() < self.capacity => {
                messages.push_back(message);
                true
            }
            _ => false,
        }
    }

    /// Moves as many queued messages as fit into the sink, oldest first. Messages
    /// that don't fit stay queued, in order, for the next period. Returns the
    /// number of messages written.
    pub fn drain<S: MidiSink + ?Sized>(&self, sink: &mut S) -> usize {
        let mut messages = match self.messages.try_lock() {
            Some(messages) => messages,
            None => return 0,
        };

        let mut written = 0;
        while let Some(message) = messages.front() {
            if !sink.write(message.as_bytes()) {
                break;
            }
            messages.pop_front();
            written += 1;
        }
        written
    }

    /// Drops every queued message.
    pub fn clear(&self) {
        self.messages.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Vec<Vec<u8>> {
        self.messages
            .lock()
            .iter()
            .map(|message| message.as_bytes().to_vec())
            .collect()
    }
}

impl Default for OutboundQueue {
    fn default() -> Self {
        Self::new()
    }
}
