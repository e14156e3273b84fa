//! Mock implementations for testing
//!
//! [`MockBus`] records every primitive issued through [`BusTransport`] so
//! protocol tests can assert the exact command/argument stream, and serves
//! reads from a scripted queue.

#![cfg(any(test, feature = "std"))]

use std::collections::VecDeque;
use std::vec::Vec;

use crate::{BusError, BusTransport};

/// One recorded bus primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    /// `wait_ready()` was called explicitly.
    WaitReady,
    /// Command word.
    Command(u16),
    /// Single data word written.
    Data(u16),
    /// Data burst written (raw wire bytes).
    Burst(Vec<u8>),
    /// Single data word read.
    Read(u16),
    /// Burst read of the given number of words.
    BurstRead(usize),
}

/// Recording [`BusTransport`] with scripted read responses.
///
/// Reads pop from the response queue; an empty queue yields `0`, which is
/// what an idle controller returns for most status registers. Setting a
/// failure injects a [`BusError`] on the next N-th primitive.
#[derive(Debug, Default)]
pub struct MockBus {
    events: Vec<BusEvent>,
    responses: VecDeque<u16>,
    fail_at: Option<(usize, BusError)>,
}

impl MockBus {
    /// Create an empty mock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue words to be returned by subsequent reads, in order.
    pub fn queue_reads(&mut self, words: &[u16]) -> &mut Self {
        self.responses.extend(words.iter().copied());
        self
    }

    /// Make the primitive with zero-based index `index` fail with `error`.
    pub fn fail_at(&mut self, index: usize, error: BusError) -> &mut Self {
        self.fail_at = Some((index, error));
        self
    }

    /// Everything recorded so far.
    pub fn events(&self) -> &[BusEvent] {
        &self.events
    }

    /// Drain the recorded events.
    pub fn take_events(&mut self) -> Vec<BusEvent> {
        core::mem::take(&mut self.events)
    }

    /// Number of scripted reads not yet consumed.
    pub fn pending_reads(&self) -> usize {
        self.responses.len()
    }

    /// Command words only, in issue order.
    pub fn commands(&self) -> Vec<u16> {
        self.events
            .iter()
            .filter_map(|e| match e {
                BusEvent::Command(c) => Some(*c),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, event: BusEvent) -> Result<(), BusError> {
        if let Some((index, error)) = self.fail_at {
            if index == self.events.len() {
                self.fail_at = None;
                return Err(error);
            }
        }
        self.events.push(event);
        Ok(())
    }

    fn next_response(&mut self) -> u16 {
        self.responses.pop_front().unwrap_or(0)
    }
}

impl BusTransport for MockBus {
    fn wait_ready(&mut self) -> Result<(), BusError> {
        self.record(BusEvent::WaitReady)
    }

    fn write_command(&mut self, command: u16) -> Result<(), BusError> {
        self.record(BusEvent::Command(command))
    }

    fn write_data(&mut self, word: u16) -> Result<(), BusError> {
        self.record(BusEvent::Data(word))
    }

    fn write_data_burst(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        self.record(BusEvent::Burst(bytes.to_vec()))
    }

    fn read_data(&mut self) -> Result<u16, BusError> {
        let word = self.next_response();
        self.record(BusEvent::Read(word))?;
        Ok(word)
    }

    fn read_data_burst(&mut self, words: &mut [u16]) -> Result<(), BusError> {
        self.record(BusEvent::BurstRead(words.len()))?;
        for slot in words.iter_mut() {
            *slot = self.next_response();
        }
        Ok(())
    }
}
