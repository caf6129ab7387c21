//! Key matrix scanning and contact-phase decoding.
//!
//! The keybed is a 16-column matrix of 64 velocity-sensitive keys. Each
//! key has two contacts that close at different points of the key travel,
//! so every key reports a 2-bit code per scan:
//!
//! - `00`: fully released
//! - `01` / `10`: half-pressed (only one contact closed; which one closes
//!   first is mechanically ambiguous, so both codes collapse to the same
//!   logical phase)
//! - `11`: fully pressed
//!
//! A column read returns one byte carrying four such pairs, one per
//! "lane". Which key a lane belongs to depends on the board revision;
//! the mapping is data (see [`MatrixGeometry`]), not code, so both
//! wirings seen in the field are expressible without touching the
//! decoder.
//!
//! Scanning is not debounced here: a misread yields a spurious phase for
//! a single cycle and is corrected on the next scan. Debounce is
//! temporal, provided by the travel timer in the key state machine.

use crate::bus::ColumnReader;

/// Total number of keys on the keybed.
pub const KEY_COUNT: usize = 64;
/// Number of addressable columns.
pub const COLUMN_COUNT: usize = 16;
/// Key pairs carried by one column byte.
pub const LANES_PER_COLUMN: usize = 4;

/// Decoded contact phase of one key for one scan cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPhase {
    /// Neither contact closed.
    #[default]
    Released,
    /// Exactly one contact closed; the key is mid-travel.
    HalfPressed,
    /// Both contacts closed.
    FullPressed,
}

impl KeyPhase {
    /// Decode a 2-bit contact pair. Only the low two bits are inspected.
    pub fn from_pair(pair: u8) -> Self {
        match (pair & 0x01) + ((pair >> 1) & 0x01) {
            0 => KeyPhase::Released,
            1 => KeyPhase::HalfPressed,
            _ => KeyPhase::FullPressed,
        }
    }
}

/// Key-index-to-bit-lane mapping for the matrix wiring.
///
/// Column `c`, lane `l` holds the key at index `c + lane_offsets[l]`.
/// The default is the interleaved layout where the four lanes cover key
/// groups 16 apart (`[0, 16, 32, 48]`); revisions with different column
/// wiring can supply their own offsets, including from the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatrixGeometry {
    /// Key-index offset of each lane within a column byte.
    pub lane_offsets: [u8; LANES_PER_COLUMN],
}

impl Default for MatrixGeometry {
    fn default() -> Self {
        Self::interleaved()
    }
}

impl MatrixGeometry {
    /// The interleaved wiring: lane `l` of column `c` is key `c + 16*l`.
    pub fn interleaved() -> Self {
        Self {
            lane_offsets: [0, 16, 32, 48],
        }
    }

    /// Key index held by `lane` of `column`.
    ///
    /// Wraps into the key range; offsets that make lanes collide are a
    /// configuration error, not detected here.
    pub fn key_index(&self, column: u8, lane: usize) -> usize {
        (usize::from(column) + usize::from(self.lane_offsets[lane])) % KEY_COUNT
    }

    /// Inverse mapping: the `(column, lane)` position of a key, if the
    /// geometry covers it.
    pub fn locate(&self, key: u8) -> Option<(u8, usize)> {
        self.lane_offsets.iter().enumerate().find_map(|(lane, &off)| {
            let column = key.checked_sub(off)?;
            (usize::from(column) < COLUMN_COUNT).then_some((column, lane))
        })
    }
}

/// Scan the entire matrix once, returning the decoded phase of every key.
///
/// Columns are read in ascending order; the `ColumnReader` implementation
/// is responsible for the column-select sequence and for leaving the bus
/// in input mode afterwards.
pub fn scan(reader: &mut dyn ColumnReader, geometry: &MatrixGeometry) -> [KeyPhase; KEY_COUNT] {
    let mut phases = [KeyPhase::Released; KEY_COUNT];
    for column in 0..COLUMN_COUNT as u8 {
        let raw = reader.read_column(column);
        for lane in 0..LANES_PER_COLUMN {
            let pair = (raw >> (lane * 2)) & 0x03;
            phases[geometry.key_index(column, lane)] = KeyPhase::from_pair(pair);
        }
    }
    phases
}
