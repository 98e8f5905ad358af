#![no_main]

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use arbitrary::Arbitrary;
use eefifo::{EmulatedFlash, Fifo, FifoError};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Event {
    Push(Vec<u8>),
    Pop,
    Flush,
    PowerLoss,
    Tick(u16),
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    commit_period_ms: u16,
    events: Vec<Event>,
}

// Crashes may land between any two operations; the durable image must
// always be a consistent queue state, and recovery must never lose a
// record that was flushed.
fuzz_target!(|input: FuzzInput| {
    let time = Rc::new(Cell::new(0u32));
    let handle = Rc::clone(&time);
    let flash = EmulatedFlash::<48, _>::new(
        move || handle.get(),
        u32::from(input.commit_period_ms),
    );

    let mut fifo = Fifo::new(flash).unwrap();
    fifo.format().unwrap();

    let mut model: VecDeque<Vec<u8>> = VecDeque::new();
    let mut durable = model.clone();
    let mut formatted_durably = !fifo.storage().has_unflushed_writes();
    let mut buf = [0u8; 128];

    for event in input.events {
        match event {
            Event::Push(record) => match fifo.push(&record) {
                Ok(()) => model.push_back(record),
                Err(FifoError::FifoFull) => {}
                Err(FifoError::DataBufferSmall) => assert!(record.is_empty()),
                Err(e) => panic!("unexpected push error: {}", e),
            },
            Event::Pop => match fifo.pop(&mut buf) {
                Ok(n) => {
                    let expected = model.pop_front().expect("pop on empty model");
                    assert_eq!(&buf[..n], expected.as_slice());
                }
                Err(FifoError::FifoEmpty) => assert!(model.is_empty()),
                Err(e) => panic!("unexpected pop error: {}", e),
            },
            Event::Flush => fifo.storage_mut().flush(),
            Event::Tick(ms) => time.set(time.get().saturating_add(u32::from(ms))),
            Event::PowerLoss => {
                fifo.storage_mut().power_loss();
                match fifo.begin() {
                    Ok(()) => {
                        assert!(formatted_durably, "recovered from a never-flushed region");
                        fifo.verify().expect("recovered ring must pass verification");
                        model = durable.clone();
                        assert_eq!(fifo.record_count(), model.len());
                    }
                    Err(_) => {
                        // Nothing durable to recover; start over.
                        fifo.format().unwrap();
                        model.clear();
                    }
                }
            }
        }

        // Track which queue state the durable image corresponds to.
        if !fifo.storage().has_unflushed_writes() {
            durable = model.clone();
            formatted_durably = true;
        }
    }
});
