//! Single-slot, latest-value-wins stores shared by exactly one writer and one reader.
//!
//! The writer and reader halves are not `Clone`, so the single-writer /
//! single-reader assignment is fixed when the pipeline is wired. A write
//! replaces whatever is in the slot; nothing is queued. A read empties the
//! slot, so each value is consumed at most once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_utils::atomic::AtomicCell;

use thermo_types::{QuantizedOutput, RawSample};

struct Slot<T> {
    value: AtomicCell<Option<T>>,
    overwritten: AtomicU64,
}

/// Create an empty slot.
pub fn slot<T: Copy + Send>() -> (SlotWriter<T>, SlotReader<T>) {
    let shared = Arc::new(Slot {
        value: AtomicCell::new(None),
        overwritten: AtomicU64::new(0),
    });
    (SlotWriter { slot: shared.clone() }, SlotReader { slot: shared })
}

/// Result of a write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WriteOutcome<T> {
    /// The slot was empty, either never written or already read.
    Fresh,
    /// An unread value was replaced and is lost.
    Replaced(T),
}

pub struct SlotWriter<T> {
    slot: Arc<Slot<T>>,
}

impl<T: Copy + Send> SlotWriter<T> {
    /// Store `value`, publishing it before any signal given afterwards.
    pub fn write(&mut self, value: T) -> WriteOutcome<T> {
        match self.slot.value.swap(Some(value)) {
            Some(previous) => {
                self.slot.overwritten.fetch_add(1, Ordering::Relaxed);
                WriteOutcome::Replaced(previous)
            }
            None => WriteOutcome::Fresh,
        }
    }

    /// How many unread values have been overwritten so far.
    pub fn overwritten(&self) -> u64 {
        self.slot.overwritten.load(Ordering::Relaxed)
    }
}

pub struct SlotReader<T> {
    slot: Arc<Slot<T>>,
}

impl<T: Copy + Send> SlotReader<T> {
    /// Take the most recent value, leaving the slot empty.
    ///
    /// `None` before the first write and after a value has already been taken.
    pub fn take(&mut self) -> Option<T> {
        self.slot.value.take()
    }

    /// Look at the current value without consuming it.
    pub fn peek(&self) -> Option<T> {
        self.slot.value.load()
    }

    pub fn has_unread(&self) -> bool {
        self.slot.value.load().is_some()
    }
}

/// Written by sampling, read by inference.
pub type SampleWriter = SlotWriter<RawSample>;
pub type SampleReader = SlotReader<RawSample>;
/// Written by inference, read by reporting.
pub type ResultWriter = SlotWriter<QuantizedOutput>;
pub type ResultReader = SlotReader<QuantizedOutput>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_until_first_write() {
        let (_writer, mut reader) = slot::<RawSample>();
        assert_eq!(reader.take(), None);
        assert!(!reader.has_unread());
    }

    #[test]
    fn latest_value_wins() {
        let (mut writer, mut reader) = slot::<RawSample>();
        assert_eq!(writer.write(RawSample::new(20.0, 1)), WriteOutcome::Fresh);
        assert_eq!(
            writer.write(RawSample::new(21.5, 2)),
            WriteOutcome::Replaced(RawSample::new(20.0, 1))
        );
        assert_eq!(reader.take(), Some(RawSample::new(21.5, 2)));
        assert_eq!(writer.overwritten(), 1);
    }

    #[test]
    fn write_after_read_is_fresh() {
        let (mut writer, mut reader) = slot::<QuantizedOutput>();
        writer.write(QuantizedOutput::new([1, 2, 3], 1));
        assert!(reader.has_unread());
        assert!(reader.take().is_some());
        assert!(!reader.has_unread());
        assert_eq!(writer.write(QuantizedOutput::new([4, 5, 6], 2)), WriteOutcome::Fresh);
        assert_eq!(writer.overwritten(), 0);
    }

    #[test]
    fn read_empties_the_slot() {
        let (mut writer, mut reader) = slot::<RawSample>();
        writer.write(RawSample::new(23.0, 4));
        assert_eq!(reader.take(), Some(RawSample::new(23.0, 4)));
        assert_eq!(reader.take(), None);
        assert_eq!(reader.peek(), None);
    }

    #[test]
    fn concurrent_writes_and_reads_never_repeat_a_value() {
        let (mut writer, mut reader) = slot::<RawSample>();
        let producer = std::thread::spawn(move || {
            let mut replaced = 0;
            for seq in 1..=2_000u64 {
                if let WriteOutcome::Replaced(_) = writer.write(RawSample::new(seq as f32, seq)) {
                    replaced += 1;
                }
            }
            (replaced, writer.overwritten())
        });

        let mut seen = Vec::new();
        loop {
            if let Some(sample) = reader.take() {
                seen.push(sample.seq);
            }
            if producer.is_finished() {
                break;
            }
        }
        let (replaced, overwritten) = producer.join().unwrap();
        seen.extend(reader.take().map(|s| s.seq));

        assert!(seen.windows(2).all(|w| w[0] < w[1]), "a value was read twice: {:?}", seen);
        // every write either was read once or was replaced unread
        assert_eq!(seen.len() as u64 + replaced, 2_000);
        assert_eq!(overwritten, replaced);
    }

    #[test]
    fn peek_does_not_consume() {
        let (mut writer, reader) = slot::<RawSample>();
        writer.write(RawSample::new(19.0, 1));
        assert_eq!(reader.peek(), Some(RawSample::new(19.0, 1)));
        assert!(reader.has_unread());
    }

    #[test]
    fn visible_across_threads() {
        let (mut writer, mut reader) = slot::<RawSample>();
        let (giver, taker) = crate::signal::binary("sampling-done");
        let handle = std::thread::spawn(move || {
            writer.write(RawSample::new(30.0, 9));
            giver.give().unwrap();
        });
        taker.take().unwrap();
        assert_eq!(reader.take(), Some(RawSample::new(30.0, 9)));
        handle.join().unwrap();
    }
}
