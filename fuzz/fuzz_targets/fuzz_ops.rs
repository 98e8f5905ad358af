#![no_main]

use std::collections::VecDeque;

use arbitrary::Arbitrary;
use eefifo::{Fifo, FifoError, RamStorage};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Op {
    Push(Vec<u8>),
    Pop,
    Read,
    RestartRead,
    Begin,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    ops: Vec<Op>,
}

fuzz_target!(|input: FuzzInput| {
    let mut fifo = Fifo::new(RamStorage::<64>::new()).unwrap();
    fifo.format().unwrap();

    let mut model: VecDeque<Vec<u8>> = VecDeque::new();
    let mut read_idx = 0usize;
    let mut buf = [0u8; 128];

    for op in input.ops {
        match op {
            Op::Push(record) => match fifo.push(&record) {
                Ok(()) => model.push_back(record),
                Err(FifoError::FifoFull) => {}
                Err(FifoError::DataBufferSmall) => assert!(record.is_empty()),
                Err(e) => panic!("unexpected push error: {}", e),
            },
            Op::Pop => match fifo.pop(&mut buf) {
                Ok(n) => {
                    let expected = model.pop_front().expect("pop on empty model");
                    assert_eq!(&buf[..n], expected.as_slice());
                    read_idx = read_idx.saturating_sub(1);
                }
                Err(FifoError::FifoEmpty) => assert!(model.is_empty()),
                Err(e) => panic!("unexpected pop error: {}", e),
            },
            Op::Read => match fifo.read(&mut buf) {
                Ok(n) => {
                    let expected = model.get(read_idx).expect("read past model");
                    assert_eq!(&buf[..n], expected.as_slice());
                    read_idx += 1;
                }
                Err(FifoError::FifoEmpty) => assert_eq!(read_idx, model.len()),
                Err(e) => panic!("unexpected read error: {}", e),
            },
            Op::RestartRead => {
                fifo.restart_read();
                read_idx = 0;
            }
            Op::Begin => {
                fifo.begin().expect("rescan of a healthy region");
                read_idx = 0;
            }
        }

        fifo.verify().expect("invariants after every operation");
        assert_eq!(fifo.record_count(), model.len());
    }
});
