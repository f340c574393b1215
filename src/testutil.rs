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
    future::Future,
    thread,
    time::{Duration, SystemTime},
};

use crate::queue::MidiSink;

/// A sink that records every message written to it, up to a byte budget.
pub struct RecordingSink {
    remaining: usize,
    pub messages: Vec<Vec<u8>>,
}

impl RecordingSink {
    pub fn new(capacity: usize) -> RecordingSink {
        RecordingSink {
            remaining: capacity,
            messages: Vec::new(),
        }
    }
}

impl MidiSink for RecordingSink {
    fn write(&mut self, bytes: &[u8]) -> bool {
        if bytes.len() > self.remaining {
            return false;
        }
        self.remaining -= bytes.len();
        self.messages.push(bytes.to_vec());
        true
    }
}

/// Wait for the given predicate to return true or fail.
#[inline]
pub fn eventually<F>(predicate: F, error_msg: &str)
where
    F: Fn() -> bool,
{
    let start = SystemTime::now();
    let tick = Duration::from_millis(10);
    let timeout = Duration::from_secs(3);

    loop {
        let elapsed = start.elapsed().expect("System time error");
        if elapsed > timeout {
            panic!("{}", error_msg);
        }
        if predicate() {
            return;
        }
        thread::sleep(tick);
    }
}

/// Wait for the given async predicate to return true or fail.
pub async fn eventually_async<F, Fut>(predicate: F, error_msg: &str)
where
    F: Fn() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = SystemTime::now();
    let tick = Duration::from_millis(10);
    let timeout = Duration::from_secs(3);

    loop {
        let elapsed = start.elapsed().expect("System time error");
        if elapsed > timeout {
            panic!("{}", error_msg);
        }
        if predicate().await {
            return;
        }
        tokio::time::sleep(tick).await;
    }
}
