//! MIDI event queue, shaping and serialization.
//!
//! Key events are queued first and sent together at the end of the cycle
//! so computation overhead between keys never spreads a chord out in
//! time. Queued events still speak in key indices and raw travel times;
//! [`Shaping`] turns them into MIDI-legal pitch and velocity, and
//! [`MidiMessage`] owns the wire layout.

use crate::bus::MidiTransport;
use crate::error::Result;
use crate::scanner::KEY_COUNT;

/// Direction of a note event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteKind {
    On,
    Off,
}

/// One press or release as emitted by the key state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub kind: NoteKind,
    /// Key index, 0..63.
    pub key: u8,
    /// Cycles the key spent half-pressed before the crossing.
    pub travel: u8,
}

/// Per-cycle note event queue.
///
/// At most one event per key per cycle, so capacity is the key count.
/// The queue is cleared (length reset, slots not rewritten) at the start
/// of every cycle and never outlives it.
#[derive(Debug)]
pub struct EventQueue {
    events: Vec<NoteEvent>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(KEY_COUNT),
        }
    }

    pub fn push(&mut self, event: NoteEvent) {
        debug_assert!(self.events.len() < KEY_COUNT);
        self.events.push(event);
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NoteEvent> {
        self.events.iter()
    }
}

/// Pitch/velocity shaping configuration.
///
/// Set once at startup (or between cycles from a user control); read-only
/// while a cycle runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shaping {
    /// MIDI note of key 0. The default of 36 (C2) suits a 5-octave,
    /// 61-key bed.
    pub pitch_offset: i16,
    /// Whole-octave offset on top of `pitch_offset`.
    pub octave_offset: i16,
    /// Semitone transpose.
    pub transpose: i16,
    /// Shape note-offs with the release travel time instead of velocity
    /// 0. Some synths do clever things with it, others get confused.
    pub send_note_off_velocity: bool,
    /// Serialize note-offs as note-on with velocity 0, for receivers
    /// that expect that convention.
    pub send_note_on_with_zero_velocity: bool,
    /// MIDI channel, 1-indexed as on the panel; 0-indexed on the wire.
    pub channel: u8,
}

impl Default for Shaping {
    fn default() -> Self {
        Self {
            pitch_offset: 36,
            octave_offset: 0,
            transpose: 0,
            send_note_off_velocity: false,
            send_note_on_with_zero_velocity: false,
            channel: 1,
        }
    }
}

impl Shaping {
    /// Map a key index to a MIDI pitch.
    ///
    /// The result is masked into 0..127; offsets that push any of the 64
    /// keys out of range are a configuration error, not checked here.
    pub fn pitch_for_key(&self, key: u8) -> u8 {
        let pitch =
            i16::from(key) + self.pitch_offset + self.transpose + 12 * self.octave_offset;
        (pitch & 0x7F) as u8
    }

    /// Map a raw travel time to a MIDI velocity.
    ///
    /// Travel is inverse velocity: few half-press cycles means a fast,
    /// loud stroke. The raw count is scaled up fourfold (saturating),
    /// inverted and halved into 0..=127.
    pub fn velocity_for_travel(travel: u8) -> u8 {
        let scaled = (u16::from(travel) * 4).min(255) as u8;
        (255 - scaled) / 2
    }

    /// Shape one queued event into a wire-ready message.
    pub fn shape(&self, event: &NoteEvent) -> MidiMessage {
        let pitch = self.pitch_for_key(event.key);
        match event.kind {
            NoteKind::On => MidiMessage::NoteOn {
                channel: self.channel,
                pitch,
                velocity: Self::velocity_for_travel(event.travel),
            },
            NoteKind::Off => {
                let velocity = if self.send_note_off_velocity {
                    Self::velocity_for_travel(event.travel)
                } else {
                    0
                };
                if self.send_note_on_with_zero_velocity {
                    MidiMessage::NoteOn {
                        channel: self.channel,
                        pitch,
                        velocity: 0,
                    }
                } else {
                    MidiMessage::NoteOff {
                        channel: self.channel,
                        pitch,
                        velocity,
                    }
                }
            }
        }
    }
}

/// A shaped channel-voice message. Channels are 1-indexed here and
/// converted to the 0-indexed wire nibble in [`MidiMessage::to_bytes`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { channel: u8, pitch: u8, velocity: u8 },
    NoteOff { channel: u8, pitch: u8, velocity: u8 },
}

const STATUS_NOTE_ON: u8 = 0x90;
const STATUS_NOTE_OFF: u8 = 0x80;

impl MidiMessage {
    /// Convert to the 3-byte MIDI 1.0 wire form.
    pub fn to_bytes(&self) -> [u8; 3] {
        let (status, channel, pitch, velocity) = match *self {
            MidiMessage::NoteOn { channel, pitch, velocity } => {
                (STATUS_NOTE_ON, channel, pitch, velocity)
            }
            MidiMessage::NoteOff { channel, pitch, velocity } => {
                (STATUS_NOTE_OFF, channel, pitch, velocity)
            }
        };
        let wire_channel = channel.saturating_sub(1) & 0x0F;
        [status | wire_channel, pitch & 0x7F, velocity & 0x7F]
    }
}

/// Serialize the cycle's shaped messages, in queue order, through the
/// transport. Pure fan-out, three bytes per message, no buffering.
pub fn send_messages(
    messages: &[MidiMessage],
    transport: &mut dyn MidiTransport,
) -> Result<usize> {
    for message in messages {
        for byte in message.to_bytes() {
            transport.transmit_byte(byte)?;
        }
    }
    Ok(messages.len())
}

/// Convert a MIDI note number to a note name, e.g. 36 -> "C2".
pub fn note_name(note: u8) -> String {
    let names = ["C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B"];
    let octave = (note / 12) as i8 - 1;
    format!("{}{}", names[(note % 12) as usize], octave)
}
