//! Property-based tests using proptest.
//!
//! Run with: cargo test --test proptest

use std::collections::VecDeque;

use eefifo::{Fifo, FifoError, RamStorage};
use proptest::prelude::*;

const REGION: usize = 96;

/// Everything a caller can do to the queue.
#[derive(Debug, Clone)]
enum Op {
    Push(Vec<u8>),
    Pop,
    Read,
    RestartRead,
    Begin,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => proptest::collection::vec(any::<u8>(), 1..=16).prop_map(Op::Push),
        2 => Just(Op::Pop),
        2 => Just(Op::Read),
        1 => Just(Op::RestartRead),
        1 => Just(Op::Begin),
    ]
}

/// The reference model: queued records plus the read cursor's index into
/// them.
#[derive(Debug, Default)]
struct Model {
    records: VecDeque<Vec<u8>>,
    read_idx: usize,
}

proptest! {
    /// Property: an arbitrary operation sequence matches a queue model,
    /// and every structural invariant holds after every single step.
    #[test]
    fn operations_match_model(ops in proptest::collection::vec(op_strategy(), 1..200)) {
        let mut fifo = Fifo::new(RamStorage::<REGION>::new()).unwrap();
        fifo.format().unwrap();
        let mut model = Model::default();
        let mut buf = [0u8; 32];

        for op in ops {
            match op {
                Op::Push(record) => match fifo.push(&record) {
                    Ok(()) => model.records.push_back(record),
                    // Whether a record fits depends on fragmentation; the
                    // model only demands that nothing else goes wrong.
                    Err(FifoError::FifoFull) => {}
                    Err(e) => prop_assert!(false, "unexpected push error: {}", e),
                },
                Op::Pop => match fifo.pop(&mut buf) {
                    Ok(n) => {
                        let expected = model.records.pop_front();
                        prop_assert_eq!(expected.as_deref(), Some(&buf[..n]));
                        model.read_idx = model.read_idx.saturating_sub(1);
                    }
                    Err(FifoError::FifoEmpty) => {
                        prop_assert!(model.records.is_empty());
                    }
                    Err(e) => prop_assert!(false, "unexpected pop error: {}", e),
                },
                Op::Read => match fifo.read(&mut buf) {
                    Ok(n) => {
                        let expected = model.records.get(model.read_idx);
                        prop_assert_eq!(expected.map(Vec::as_slice), Some(&buf[..n]));
                        model.read_idx += 1;
                    }
                    Err(FifoError::FifoEmpty) => {
                        prop_assert_eq!(model.read_idx, model.records.len());
                    }
                    Err(e) => prop_assert!(false, "unexpected read error: {}", e),
                },
                Op::RestartRead => {
                    fifo.restart_read();
                    model.read_idx = 0;
                }
                Op::Begin => {
                    // A rescan of a quiescent region must succeed and
                    // rewinds the volatile read cursor to the queue head.
                    fifo.begin().unwrap();
                    model.read_idx = 0;
                }
            }

            fifo.verify().unwrap();
            prop_assert_eq!(fifo.record_count(), model.records.len());
            prop_assert_eq!(fifo.is_empty(), model.records.is_empty());
        }
    }

    /// Property: records come back out in push order, bytewise.
    #[test]
    fn fifo_roundtrip_preserves_order(
        records in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 1..=8),
            1..=8,
        )
    ) {
        // Worst case: 8 records of 9 bytes each, well under the ring.
        let mut fifo = Fifo::new(RamStorage::<REGION>::new()).unwrap();
        fifo.format().unwrap();

        for record in &records {
            fifo.push(record).unwrap();
        }
        fifo.verify().unwrap();

        let mut buf = [0u8; 16];
        for record in &records {
            let n = fifo.pop(&mut buf).unwrap();
            prop_assert_eq!(&buf[..n], record.as_slice());
        }
        prop_assert!(fifo.is_empty());
    }

    /// Property: a power cycle between any two operations loses nothing.
    /// The revived queue holds exactly the records the old one held.
    #[test]
    fn rescan_recovers_queue_contents(
        records in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 1..=8),
            1..=8,
        ),
        pops in 0usize..8,
    ) {
        let mut fifo = Fifo::new(RamStorage::<REGION>::new()).unwrap();
        fifo.format().unwrap();
        for record in &records {
            fifo.push(record).unwrap();
        }
        let mut buf = [0u8; 16];
        let pops = pops.min(records.len());
        for _ in 0..pops {
            fifo.pop(&mut buf).unwrap();
        }
        let before = fifo.cursors();

        let image = *fifo.storage().bytes();
        let mut revived = Fifo::new(RamStorage::from_bytes(image)).unwrap();
        revived.begin().unwrap();
        revived.verify().unwrap();
        if pops < records.len() {
            prop_assert_eq!(revived.cursors(), before);
        }

        for record in records.iter().skip(pops) {
            let n = revived.pop(&mut buf).unwrap();
            prop_assert_eq!(&buf[..n], record.as_slice());
        }
        prop_assert!(revived.is_empty());
    }

    /// Property: a second immediate rescan is a no-op for both the region
    /// and the cursors.
    #[test]
    fn begin_is_idempotent(
        records in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 1..=8),
            1..=8,
        )
    ) {
        let mut fifo = Fifo::new(RamStorage::<REGION>::new()).unwrap();
        fifo.format().unwrap();
        for record in &records {
            fifo.push(record).unwrap();
        }

        fifo.begin().unwrap();
        let first = (fifo.cursors(), *fifo.storage().bytes());
        fifo.begin().unwrap();
        prop_assert_eq!((fifo.cursors(), *fifo.storage().bytes()), first);
    }

    /// Property: sweeping with `read` writes nothing, moves no queue
    /// cursor, and previews exactly what `pop` later returns.
    #[test]
    fn read_sweep_is_non_destructive(
        records in proptest::collection::vec(
            proptest::collection::vec(any::<u8>(), 1..=8),
            1..=8,
        )
    ) {
        let mut fifo = Fifo::new(RamStorage::<REGION>::new()).unwrap();
        fifo.format().unwrap();
        for record in &records {
            fifo.push(record).unwrap();
        }
        let region_before = *fifo.storage().bytes();
        let pop_before = fifo.cursors().pop;

        let mut buf = [0u8; 16];
        let mut swept = Vec::new();
        while let Ok(n) = fifo.read(&mut buf) {
            swept.push(buf[..n].to_vec());
        }
        prop_assert_eq!(*fifo.storage().bytes(), region_before);
        prop_assert_eq!(fifo.cursors().pop, pop_before);
        prop_assert_eq!(swept.len(), records.len());

        fifo.restart_read();
        for seen in &swept {
            let n = fifo.pop(&mut buf).unwrap();
            prop_assert_eq!(&buf[..n], seen.as_slice());
        }
    }
}
