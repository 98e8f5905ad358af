//! Basic example: format a region, queue a few records, sweep and drain.
//!
//! Run with: cargo run --example basic

use eefifo::{Fifo, RamStorage};

fn main() {
    // A 64-byte region: one anchor byte plus a 63-byte ring.
    let mut fifo = Fifo::new(RamStorage::<64>::new()).expect("region size");
    fifo.format().expect("format");

    for i in 0..4u8 {
        let record = format!("record {}", i);
        fifo.push(record.as_bytes()).expect("push");
        println!("pushed: \"{}\"", record);
    }
    println!("queued: {} records\n{}", fifo.record_count(), fifo.snapshot());

    // Non-destructive sweep: nothing is written, nothing is dequeued.
    println!("sweeping:");
    let mut buf = [0u8; 32];
    while let Ok(n) = fifo.read(&mut buf) {
        println!("  saw: \"{}\"", String::from_utf8_lossy(&buf[..n]));
    }
    fifo.restart_read();
    println!("still queued: {} records", fifo.record_count());

    // Destructive drain, oldest first.
    println!("draining:");
    while let Ok(n) = fifo.pop(&mut buf) {
        println!("  popped: \"{}\"", String::from_utf8_lossy(&buf[..n]));
    }
    println!("empty: {}", fifo.is_empty());
}
