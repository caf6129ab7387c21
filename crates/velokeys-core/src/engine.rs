//! The interpretation engine: one object owning all per-cycle state.
//!
//! A cycle is a single plain function call, invoked by whatever
//! scheduler the firmware runs (timer interrupt, fixed-rate loop); at
//! several hundred Hz the travel timer keeps enough resolution for
//! velocity. Nothing here blocks, nothing is shared across threads and
//! a cycle always runs to completion.

use crate::bus::{ColumnReader, MidiTransport};
use crate::config::Config;
use crate::keys::KeyMatrix;
use crate::midi::{send_messages, EventQueue, MidiMessage, Shaping};
use crate::scanner::{scan, MatrixGeometry};

/// Engine state: key records, the per-cycle queue and the shaping
/// configuration.
#[derive(Debug)]
pub struct Engine {
    keys: KeyMatrix,
    queue: EventQueue,
    messages: Vec<MidiMessage>,
    shaping: Shaping,
    geometry: MatrixGeometry,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Shaping::default(), MatrixGeometry::default())
    }
}

impl Engine {
    pub fn new(shaping: Shaping, geometry: MatrixGeometry) -> Self {
        log::info!(
            "engine: channel {} pitch offset {} geometry {:?}",
            shaping.channel,
            shaping.pitch_offset,
            geometry.lane_offsets
        );
        Self {
            keys: KeyMatrix::new(),
            queue: EventQueue::new(),
            messages: Vec::new(),
            shaping,
            geometry,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.to_shaping(), config.to_geometry())
    }

    pub fn shaping(&self) -> &Shaping {
        &self.shaping
    }

    /// Shaping is read-only while a cycle runs; mutate it between cycles
    /// only (e.g. from a panel control).
    pub fn shaping_mut(&mut self) -> &mut Shaping {
        &mut self.shaping
    }

    pub fn keys(&self) -> &KeyMatrix {
        &self.keys
    }

    /// Run one complete scan → state-update → reshape → serialize pass.
    ///
    /// Returns the number of messages sent. The queue is flushed at the
    /// start, so events never survive into the next cycle.
    pub fn cycle(
        &mut self,
        reader: &mut dyn ColumnReader,
        transport: &mut dyn MidiTransport,
    ) -> crate::Result<usize> {
        self.queue.clear();

        let phases = scan(reader, &self.geometry);
        self.keys.update(&phases, &mut self.queue);

        // Reshape: key index -> pitch, travel time -> velocity, in queue
        // order (which is ascending key order by construction).
        self.messages.clear();
        for event in self.queue.iter() {
            self.messages.push(self.shaping.shape(event));
        }

        send_messages(&self.messages, transport)
    }
}
