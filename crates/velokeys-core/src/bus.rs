//! Hardware collaborator seams.
//!
//! The engine never touches pins or serial registers directly. Everything
//! electrical sits behind three small traits:
//!
//! - [`IoBus`]: the 8-bit bidirectional data bus shared with the column
//!   latches and the readback transceiver.
//! - [`ColumnReader`]: one level up, "give me the raw byte for column n".
//!   Firmware supplies a bus-backed implementation; tests and the
//!   simulator use [`SimMatrix`].
//! - [`MidiTransport`]: the serial byte sink the MIDI stream goes out on.

use crate::error::{Error, Result};
use crate::scanner::{KeyPhase, MatrixGeometry, COLUMN_COUNT, KEY_COUNT, LANES_PER_COLUMN};

/// Direction of the bidirectional data bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusDirection {
    /// High-impedance / safe; the bus can be driven by the matrix side.
    Input,
    /// The controller drives the bus (column select writes).
    Output,
}

/// The 8-bit bidirectional data bus collaborator.
pub trait IoBus {
    /// Switch the bus direction. Implementations own any settling delay.
    fn set_direction(&mut self, direction: BusDirection);

    /// Drive a byte onto the bus. Only valid in output mode.
    fn write_byte(&mut self, value: u8);

    /// Read the byte currently on the bus. Only valid in input mode.
    fn read_byte(&mut self) -> u8;
}

/// Raw column access for the matrix scanner.
pub trait ColumnReader {
    /// Read the raw byte for `column` (0..15): four 2-bit key pairs.
    ///
    /// Implementations must leave the underlying bus in input mode when
    /// they return.
    fn read_column(&mut self, column: u8) -> u8;
}

/// `ColumnReader` built on a latched [`IoBus`].
///
/// The select byte `1 << (column % 8)` is written to the bus and latched
/// by the column-select flipflops (the bus implementation strobes the
/// latch for the high or low column block when the byte is written); the
/// bus is then turned around and the column byte read back. The bus is
/// left in input mode.
pub struct BusColumnReader<B: IoBus> {
    bus: B,
}

impl<B: IoBus> BusColumnReader<B> {
    pub fn new(bus: B) -> Self {
        Self { bus }
    }

    /// Give the bus back, e.g. to reuse it between scans.
    pub fn into_inner(self) -> B {
        self.bus
    }
}

impl<B: IoBus> ColumnReader for BusColumnReader<B> {
    fn read_column(&mut self, column: u8) -> u8 {
        self.bus.set_direction(BusDirection::Output);
        self.bus.write_byte(1 << (column % 8));
        self.bus.set_direction(BusDirection::Input);
        self.bus.read_byte()
    }
}

/// Programmable in-memory matrix, for tests and the offline simulator.
///
/// Phases set per key are encoded back into column bytes through the
/// geometry, so reads exercise the same bit layout real hardware
/// produces. Half-pressed keys encode as `01`.
#[derive(Debug, Clone)]
pub struct SimMatrix {
    geometry: MatrixGeometry,
    phases: [KeyPhase; KEY_COUNT],
}

impl SimMatrix {
    pub fn new(geometry: MatrixGeometry) -> Self {
        Self {
            geometry,
            phases: [KeyPhase::Released; KEY_COUNT],
        }
    }

    /// Set the phase one key currently reports.
    pub fn set_phase(&mut self, key: u8, phase: KeyPhase) {
        self.phases[usize::from(key)] = phase;
    }

    /// Reset every key to released.
    pub fn release_all(&mut self) {
        self.phases = [KeyPhase::Released; KEY_COUNT];
    }
}

impl ColumnReader for SimMatrix {
    fn read_column(&mut self, column: u8) -> u8 {
        debug_assert!(usize::from(column) < COLUMN_COUNT);
        let mut raw = 0u8;
        for lane in 0..LANES_PER_COLUMN {
            let pair = match self.phases[self.geometry.key_index(column, lane)] {
                KeyPhase::Released => 0b00,
                KeyPhase::HalfPressed => 0b01,
                KeyPhase::FullPressed => 0b11,
            };
            raw |= pair << (lane * 2);
        }
        raw
    }
}

/// Serial byte sink for the outgoing MIDI stream.
pub trait MidiTransport {
    /// Transmit one byte downstream.
    fn transmit_byte(&mut self, byte: u8) -> Result<()>;
}

/// Transport that logs bytes instead of sending them (useful when no
/// serial port is attached).
pub struct LogTransport;

impl MidiTransport for LogTransport {
    fn transmit_byte(&mut self, byte: u8) -> Result<()> {
        log::debug!("MIDI out: {:#04x}", byte);
        Ok(())
    }
}

/// Transport that collects every byte, for tests and the simulator.
#[derive(Debug, Default)]
pub struct CaptureTransport {
    bytes: Vec<u8>,
}

impl CaptureTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// All bytes transmitted so far, in order.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Drain the captured bytes.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }
}

impl MidiTransport for CaptureTransport {
    fn transmit_byte(&mut self, byte: u8) -> Result<()> {
        self.bytes.push(byte);
        Ok(())
    }
}

/// `MidiTransport` for any writer, e.g. a serial port device file.
pub struct WriterTransport<W: std::io::Write> {
    writer: W,
}

impl<W: std::io::Write> WriterTransport<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: std::io::Write> MidiTransport for WriterTransport<W> {
    fn transmit_byte(&mut self, byte: u8) -> Result<()> {
        self.writer
            .write_all(&[byte])
            .map_err(|e| Error::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Bus fake that records the direction/write/read sequence and
    /// serves a fixed byte per latched select value.
    struct SimBus {
        direction: BusDirection,
        latched: u8,
        trace: Vec<&'static str>,
    }

    impl SimBus {
        fn new() -> Self {
            Self {
                direction: BusDirection::Input,
                latched: 0,
                trace: Vec::new(),
            }
        }
    }

    impl IoBus for SimBus {
        fn set_direction(&mut self, direction: BusDirection) {
            self.direction = direction;
            self.trace.push(match direction {
                BusDirection::Input => "dir:in",
                BusDirection::Output => "dir:out",
            });
        }

        fn write_byte(&mut self, value: u8) {
            assert_eq!(self.direction, BusDirection::Output);
            self.latched = value;
            self.trace.push("write");
        }

        fn read_byte(&mut self) -> u8 {
            assert_eq!(self.direction, BusDirection::Input);
            self.trace.push("read");
            // Column select 0b100 answers with a half-pressed lane 0.
            if self.latched == 0b100 {
                0b01
            } else {
                0
            }
        }
    }

    #[test]
    fn test_bus_column_reader_sequence() {
        let mut reader = BusColumnReader::new(SimBus::new());
        assert_eq!(reader.read_column(2), 0b01);
        // Columns above 7 reuse the low select byte; block selection is
        // the bus implementation's job.
        assert_eq!(reader.read_column(10), 0b01);

        let bus = reader.into_inner();
        // Bus ends up in input mode after every column read.
        assert_eq!(bus.direction, BusDirection::Input);
        assert_eq!(
            bus.trace,
            vec![
                "dir:out", "write", "dir:in", "read", //
                "dir:out", "write", "dir:in", "read",
            ]
        );
    }

    #[test]
    fn test_capture_transport() {
        let mut transport = CaptureTransport::new();
        transport.transmit_byte(0x90).unwrap();
        transport.transmit_byte(0x24).unwrap();
        assert_eq!(transport.bytes(), &[0x90, 0x24]);
        assert_eq!(transport.take(), vec![0x90, 0x24]);
        assert!(transport.bytes().is_empty());
    }

    #[test]
    fn test_writer_transport() {
        let mut buf = Vec::new();
        {
            let mut transport = WriterTransport::new(&mut buf);
            transport.transmit_byte(0x80).unwrap();
            transport.transmit_byte(0x24).unwrap();
            transport.transmit_byte(0x00).unwrap();
        }
        assert_eq!(buf, vec![0x80, 0x24, 0x00]);
    }
}
