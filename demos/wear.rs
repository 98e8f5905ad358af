//! Wear inspection example: how much medium traffic a workload causes,
//! and how much the write-eliding adapter saves.
//!
//! Run with: cargo run --example wear

use eefifo::{Fifo, RamStorage};

fn main() {
    let mut fifo = Fifo::new(RamStorage::<128>::new()).expect("region size");
    fifo.format().expect("format");
    println!("after format:        {}", fifo.storage().write_stats());

    // Identical records churning through the ring: headers and payload
    // bytes often land on bytes that already hold the right value.
    let record = [0xA5u8; 8];
    let mut buf = [0u8; 16];
    for _ in 0..1_000 {
        fifo.push(&record).expect("push");
        fifo.pop(&mut buf).expect("pop");
    }
    println!("uniform churn x1000: {}", fifo.storage().write_stats());

    // Varying records defeat most elision.
    let mut fifo = Fifo::new(RamStorage::<128>::new()).expect("region size");
    fifo.format().expect("format");
    let mut byte = 0u8;
    for _ in 0..1_000 {
        byte = byte.wrapping_add(17);
        fifo.push(&[byte; 8]).expect("push");
        fifo.pop(&mut buf).expect("pop");
    }
    println!("varied churn x1000:  {}", fifo.storage().write_stats());
}
