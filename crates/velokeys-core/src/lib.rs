//! velokeys-core - key-matrix to MIDI interpretation engine
//!
//! The engine of a velocity-sensitive keyboard controller: it reads a
//! 64-key contact matrix through an abstract column reader, runs a
//! per-key phase state machine with travel-time velocity estimation, and
//! serializes the resulting note events as a MIDI 1.0 byte stream.
//!
//! Hardware is kept behind three traits ([`ColumnReader`], [`IoBus`],
//! [`MidiTransport`]); the crate ships simulated implementations so the
//! whole pipeline runs on a host.
//!
//! # Usage
//!
//! ```
//! use velokeys_core::{CaptureTransport, Engine, KeyPhase, MatrixGeometry, SimMatrix};
//!
//! let mut engine = Engine::default();
//! let mut matrix = SimMatrix::new(MatrixGeometry::default());
//! let mut transport = CaptureTransport::new();
//!
//! // Key 0 transits the half-press zone for two cycles, then bottoms out.
//! matrix.set_phase(0, KeyPhase::HalfPressed);
//! engine.cycle(&mut matrix, &mut transport).unwrap();
//! engine.cycle(&mut matrix, &mut transport).unwrap();
//! matrix.set_phase(0, KeyPhase::FullPressed);
//! engine.cycle(&mut matrix, &mut transport).unwrap();
//!
//! // Note-on for C2, velocity derived from two cycles of travel.
//! assert_eq!(transport.bytes(), &[0x90, 36, 123]);
//! ```

pub mod bus;
pub mod config;
pub mod engine;
pub mod error;
pub mod keys;
pub mod midi;
pub mod scanner;

// Re-export main types
pub use bus::{
    BusColumnReader, BusDirection, CaptureTransport, ColumnReader, IoBus, LogTransport,
    MidiTransport, SimMatrix, WriterTransport,
};
pub use config::Config;
pub use engine::Engine;
pub use error::{Error, Result};
pub use keys::{Key, KeyMatrix, TRAVEL_TIMER_MAX};
pub use midi::{note_name, EventQueue, MidiMessage, NoteEvent, NoteKind, Shaping};
pub use scanner::{scan, KeyPhase, MatrixGeometry, COLUMN_COUNT, KEY_COUNT, LANES_PER_COLUMN};
