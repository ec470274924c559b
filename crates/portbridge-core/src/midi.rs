//! MIDI side channel.
//!
//! The push convention hands the engine one buffer of short MIDI messages per
//! block, alongside the audio. Storage is a fixed array so filling it on the
//! audio thread never allocates.

/// Maximum number of MIDI events held per block.
pub const MAX_MIDI_EVENTS: usize = 1024;

/// A short (channel voice) MIDI message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MidiEvent {
    /// Frame offset within the block.
    pub sample_offset: u32,
    /// Status byte (message type and channel).
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl MidiEvent {
    const NOTE_OFF: u8 = 0x80;
    const NOTE_ON: u8 = 0x90;

    /// Note On. `channel` is masked to 0-15, `note` and `velocity` to 0-127.
    pub const fn note_on(sample_offset: u32, channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            sample_offset,
            status: Self::NOTE_ON | (channel & 0x0F),
            data1: note & 0x7F,
            data2: velocity & 0x7F,
        }
    }

    /// Note Off.
    pub const fn note_off(sample_offset: u32, channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            sample_offset,
            status: Self::NOTE_OFF | (channel & 0x0F),
            data1: note & 0x7F,
            data2: velocity & 0x7F,
        }
    }

    /// MIDI channel (0-15).
    #[inline]
    pub const fn channel(&self) -> u8 {
        self.status & 0x0F
    }
}

/// Fixed-capacity buffer of MIDI events for one block.
///
/// Events should be pushed in chronological order.
#[derive(Debug, Clone)]
pub struct MidiBuffer {
    events: [MidiEvent; MAX_MIDI_EVENTS],
    len: usize,
    /// Set when a push fails because the buffer is full.
    overflowed: bool,
}

impl MidiBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            events: [MidiEvent::default(); MAX_MIDI_EVENTS],
            len: 0,
            overflowed: false,
        }
    }

    /// Remove all events and clear the overflow flag.
    #[inline]
    pub fn clear(&mut self) {
        self.len = 0;
        self.overflowed = false;
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True if an event was dropped since the last [`clear`](Self::clear).
    #[inline]
    pub fn has_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Append an event. Returns `false` and sets the overflow flag when full.
    #[inline]
    pub fn push(&mut self, event: MidiEvent) -> bool {
        if self.len < MAX_MIDI_EVENTS {
            self.events[self.len] = event;
            self.len += 1;
            true
        } else {
            self.overflowed = true;
            false
        }
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &MidiEvent> {
        self.events[..self.len].iter()
    }

    #[inline]
    pub fn as_slice(&self) -> &[MidiEvent] {
        &self.events[..self.len]
    }
}

impl Default for MidiBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_constructors_mask_ranges() {
        let on = MidiEvent::note_on(12, 17, 200, 100);
        assert_eq!(on.status, 0x91);
        assert_eq!(on.channel(), 1);
        assert_eq!(on.data1, 200 & 0x7F);
        assert_eq!(on.sample_offset, 12);

        let off = MidiEvent::note_off(0, 0, 60, 0);
        assert_eq!(off.status, 0x80);
    }

    #[test]
    fn test_push_and_clear() {
        let mut buffer = MidiBuffer::new();
        assert!(buffer.is_empty());
        assert!(buffer.push(MidiEvent::note_on(0, 0, 60, 100)));
        assert!(buffer.push(MidiEvent::note_off(32, 0, 60, 0)));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.as_slice()[1].sample_offset, 32);

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.iter().count(), 0);
    }

    #[test]
    fn test_overflow() {
        let mut buffer = MidiBuffer::new();
        for i in 0..MAX_MIDI_EVENTS {
            assert!(buffer.push(MidiEvent::note_on(i as u32, 0, 60, 100)));
        }
        assert!(!buffer.has_overflowed());
        assert!(!buffer.push(MidiEvent::note_on(0, 0, 61, 100)));
        assert!(buffer.has_overflowed());
        assert_eq!(buffer.len(), MAX_MIDI_EVENTS);

        buffer.clear();
        assert!(!buffer.has_overflowed());
    }
}
