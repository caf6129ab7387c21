//! Per-key state machine and travel timing.
//!
//! Every scan cycle each key gets a freshly decoded [`KeyPhase`] from the
//! scanner. The state machine turns phase crossings into note events:
//!
//! - entering `FullPressed` while the key is silent fires a note-on;
//! - returning to `Released` while the key is sounding fires a note-off;
//! - everything in between, including bouncing against the full-press
//!   contact without a full release, fires nothing.
//!
//! The travel timer counts cycles spent continuously half-pressed and is
//! the raw velocity: a fast press spends few cycles between the first and
//! second contact. The timer is sampled into the event before it resets,
//! so every note-on carries the travel time of the stroke that caused it.

use crate::midi::{EventQueue, NoteEvent, NoteKind};
use crate::scanner::{KeyPhase, KEY_COUNT};

/// Ceiling of the travel timer; a press slower than this is as slow as
/// the engine can distinguish.
pub const TRAVEL_TIMER_MAX: u8 = 255;

/// State carried per key across scan cycles.
#[derive(Debug, Clone, Copy, Default)]
pub struct Key {
    /// Phase decoded on the most recent scan.
    pub phase: KeyPhase,
    /// True between an emitted note-on and its matching note-off.
    pub is_sounding: bool,
    /// Cycles spent continuously half-pressed, saturating.
    pub travel_timer: u8,
}

/// The 64 key records, owned, one writer per cycle.
#[derive(Debug, Clone)]
pub struct KeyMatrix {
    keys: [Key; KEY_COUNT],
}

impl Default for KeyMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyMatrix {
    pub fn new() -> Self {
        Self {
            keys: [Key::default(); KEY_COUNT],
        }
    }

    /// State of one key, mostly for inspection and tests.
    pub fn key(&self, index: u8) -> &Key {
        &self.keys[usize::from(index)]
    }

    /// Number of keys currently sounding.
    pub fn sounding_count(&self) -> usize {
        self.keys.iter().filter(|k| k.is_sounding).count()
    }

    /// Advance every key by one scan cycle, pushing note events onto the
    /// queue in ascending key order.
    ///
    /// The timer update runs after the event for this cycle (if any) has
    /// sampled it: a key that just crossed into full press reports the
    /// half-press cycles of the stroke, then starts from zero again.
    pub fn update(&mut self, phases: &[KeyPhase; KEY_COUNT], queue: &mut EventQueue) {
        for (index, key) in self.keys.iter_mut().enumerate() {
            let phase = phases[index];
            key.phase = phase;

            if phase == KeyPhase::FullPressed && !key.is_sounding {
                key.is_sounding = true;
                queue.push(NoteEvent {
                    kind: NoteKind::On,
                    key: index as u8,
                    travel: key.travel_timer,
                });
            } else if phase == KeyPhase::Released && key.is_sounding {
                key.is_sounding = false;
                queue.push(NoteEvent {
                    kind: NoteKind::Off,
                    key: index as u8,
                    travel: key.travel_timer,
                });
            }

            key.travel_timer = if phase == KeyPhase::HalfPressed {
                key.travel_timer.saturating_add(1)
            } else {
                0
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phases_with(key: u8, phase: KeyPhase) -> [KeyPhase; KEY_COUNT] {
        let mut phases = [KeyPhase::Released; KEY_COUNT];
        phases[usize::from(key)] = phase;
        phases
    }

    fn run_cycles(
        matrix: &mut KeyMatrix,
        queue: &mut EventQueue,
        phases: &[KeyPhase; KEY_COUNT],
        cycles: usize,
    ) {
        for _ in 0..cycles {
            queue.clear();
            matrix.update(phases, queue);
        }
    }

    #[test]
    fn test_note_on_fires_on_full_press() {
        let mut matrix = KeyMatrix::new();
        let mut queue = EventQueue::new();

        run_cycles(&mut matrix, &mut queue, &phases_with(5, KeyPhase::HalfPressed), 3);
        assert!(queue.is_empty());

        queue.clear();
        matrix.update(&phases_with(5, KeyPhase::FullPressed), &mut queue);
        let events: Vec<_> = queue.iter().copied().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, NoteKind::On);
        assert_eq!(events[0].key, 5);
        assert_eq!(events[0].travel, 3);
        assert!(matrix.key(5).is_sounding);
    }

    #[test]
    fn test_sustained_press_fires_once() {
        let mut matrix = KeyMatrix::new();
        let mut queue = EventQueue::new();
        let full = phases_with(12, KeyPhase::FullPressed);

        queue.clear();
        matrix.update(&full, &mut queue);
        assert_eq!(queue.len(), 1);

        run_cycles(&mut matrix, &mut queue, &full, 10);
        assert!(queue.is_empty());
        assert!(matrix.key(12).is_sounding);
    }

    #[test]
    fn test_note_off_only_when_sounding() {
        let mut matrix = KeyMatrix::new();
        let mut queue = EventQueue::new();

        // Released without ever sounding: nothing.
        run_cycles(&mut matrix, &mut queue, &phases_with(3, KeyPhase::Released), 2);
        assert!(queue.is_empty());

        queue.clear();
        matrix.update(&phases_with(3, KeyPhase::FullPressed), &mut queue);
        queue.clear();
        matrix.update(&phases_with(3, KeyPhase::Released), &mut queue);
        let events: Vec<_> = queue.iter().copied().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, NoteKind::Off);
        assert_eq!(events[0].travel, 0);
        assert!(!matrix.key(3).is_sounding);
    }

    #[test]
    fn test_half_press_bounce_stays_silent() {
        let mut matrix = KeyMatrix::new();
        let mut queue = EventQueue::new();

        queue.clear();
        matrix.update(&phases_with(8, KeyPhase::FullPressed), &mut queue);
        assert_eq!(queue.len(), 1);

        // Bounce between half and full without a release.
        for _ in 0..4 {
            queue.clear();
            matrix.update(&phases_with(8, KeyPhase::HalfPressed), &mut queue);
            assert!(queue.is_empty());
            queue.clear();
            matrix.update(&phases_with(8, KeyPhase::FullPressed), &mut queue);
            assert!(queue.is_empty());
        }
    }

    #[test]
    fn test_travel_timer_counts_and_resets() {
        let mut matrix = KeyMatrix::new();
        let mut queue = EventQueue::new();
        let half = phases_with(0, KeyPhase::HalfPressed);

        let mut previous = 0;
        for _ in 0..10 {
            queue.clear();
            matrix.update(&half, &mut queue);
            let timer = matrix.key(0).travel_timer;
            assert!(timer >= previous);
            previous = timer;
        }
        assert_eq!(matrix.key(0).travel_timer, 10);

        queue.clear();
        matrix.update(&phases_with(0, KeyPhase::FullPressed), &mut queue);
        assert_eq!(matrix.key(0).travel_timer, 0);
    }

    #[test]
    fn test_travel_timer_saturates() {
        let mut matrix = KeyMatrix::new();
        let mut queue = EventQueue::new();
        let half = phases_with(7, KeyPhase::HalfPressed);

        run_cycles(&mut matrix, &mut queue, &half, 300);
        assert_eq!(matrix.key(7).travel_timer, TRAVEL_TIMER_MAX);

        // The eventual note-on reports the saturated value.
        queue.clear();
        matrix.update(&phases_with(7, KeyPhase::FullPressed), &mut queue);
        let events: Vec<_> = queue.iter().copied().collect();
        assert_eq!(events[0].travel, TRAVEL_TIMER_MAX);
    }

    #[test]
    fn test_all_keys_bound_and_ordered() {
        let mut matrix = KeyMatrix::new();
        let mut queue = EventQueue::new();
        let all_full = [KeyPhase::FullPressed; KEY_COUNT];

        queue.clear();
        matrix.update(&all_full, &mut queue);
        assert_eq!(queue.len(), KEY_COUNT);
        assert_eq!(matrix.sounding_count(), KEY_COUNT);

        let keys: Vec<_> = queue.iter().map(|e| e.key).collect();
        let expected: Vec<_> = (0..KEY_COUNT as u8).collect();
        assert_eq!(keys, expected);

        // Holding them all produces nothing further.
        queue.clear();
        matrix.update(&all_full, &mut queue);
        assert!(queue.is_empty());
    }
}
