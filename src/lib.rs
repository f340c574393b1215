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
//! A realtime bridge between Novation grid controllers and an OSC controlled
//! sequencer host, running as a JACK client.

pub mod bridge;
pub mod config;
pub mod controller;
pub mod device;
pub mod host;
pub mod logging;
pub mod process;
pub mod queue;
pub mod state;
pub mod translator;

#[cfg(test)]
mod testutil;

pub use bridge::Bridge;
