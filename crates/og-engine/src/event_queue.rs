//! Time-ordered queue of playback notifications.

use alloc::vec::Vec;
use og_ir::InstrumentId;

use crate::voice_pool::VoiceHandle;

/// Something the host may want to react to while a song plays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlaybackEvent {
    /// A scheduled note became audible.
    NoteStart {
        handle: VoiceHandle,
        key: u16,
        instrument: InstrumentId,
        /// Render-clock seconds
        time: f64,
    },
}

/// An event tagged with the render-clock time it fires at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimedEvent {
    pub time: f64,
    pub event: PlaybackEvent,
}

/// Events sorted by time; equal times keep insertion order.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    events: Vec<TimedEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Push an event into the queue.
    pub fn push(&mut self, time: f64, event: PlaybackEvent) {
        let pos = self.events.partition_point(|e| e.time <= time);
        self.events.insert(pos, TimedEvent { time, event });
    }

    /// Peek at the next event without removing it.
    pub fn peek(&self) -> Option<&TimedEvent> {
        self.events.first()
    }

    /// Move every event at or before `time` into `out`, in order.
    pub fn drain_due(&mut self, time: f64, out: &mut Vec<TimedEvent>) -> usize {
        let due = self.events.partition_point(|e| e.time <= time);
        out.extend(self.events.drain(..due));
        due
    }

    /// Clear all events.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Retain only events matching the predicate, removing the rest.
    pub fn retain<F: FnMut(&TimedEvent) -> bool>(&mut self, f: F) {
        self.events.retain(f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn note_start(handle: VoiceHandle, key: u16, time: f64) -> PlaybackEvent {
        PlaybackEvent::NoteStart { handle, key, instrument: InstrumentId::Melodic(0), time }
    }

    fn handles(n: usize) -> Vec<VoiceHandle> {
        let mut map: SlotMap<VoiceHandle, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    #[test]
    fn event_ordering() {
        let h = handles(3);
        let mut queue = EventQueue::new();
        queue.push(1.0, note_start(h[0], 10, 1.0));
        queue.push(0.5, note_start(h[1], 20, 0.5));
        queue.push(1.5, note_start(h[2], 30, 1.5));
        assert_eq!(queue.peek().unwrap().time, 0.5);

        let mut out = Vec::new();
        assert_eq!(queue.drain_due(10.0, &mut out), 3);
        let times: Vec<f64> = out.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![0.5, 1.0, 1.5]);
        assert!(queue.is_empty());
    }

    #[test]
    fn drain_due_stops_at_time() {
        let h = handles(2);
        let mut queue = EventQueue::new();
        queue.push(0.1, note_start(h[0], 1, 0.1));
        queue.push(0.3, note_start(h[1], 2, 0.3));
        let mut out = Vec::new();
        assert_eq!(queue.drain_due(0.2, &mut out), 1);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.drain_due(0.2, &mut out), 0);
        assert_eq!(queue.drain_due(0.3, &mut out), 1);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn equal_times_keep_push_order() {
        let h = handles(2);
        let mut queue = EventQueue::new();
        queue.push(1.0, note_start(h[0], 1, 1.0));
        queue.push(1.0, note_start(h[1], 2, 1.0));
        let mut out = Vec::new();
        queue.drain_due(1.0, &mut out);
        assert_eq!(out[0].event, note_start(h[0], 1, 1.0));
    }

    #[test]
    fn retain_drops_future_events() {
        let h = handles(2);
        let mut queue = EventQueue::new();
        queue.push(0.1, note_start(h[0], 1, 0.1));
        queue.push(5.0, note_start(h[1], 2, 5.0));
        queue.retain(|e| e.time <= 1.0);
        assert_eq!(queue.len(), 1);
        queue.clear();
        assert!(queue.is_empty());
    }
}
