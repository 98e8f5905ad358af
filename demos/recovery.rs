//! Power-loss recovery example: records survive exactly up to the last
//! durable commit.
//!
//! Run with: cargo run --example recovery

use eefifo::{EmulatedFlash, Fifo};
use std::time::Instant;

fn main() {
    let start = Instant::now();
    let clock = move || start.elapsed().as_millis() as u32;

    // Buffered medium: writes become durable on flush only.
    let mut fifo = Fifo::new(EmulatedFlash::<64, _>::new(clock, 0)).expect("region size");
    fifo.format().expect("format");

    fifo.push(b"durable one").expect("push");
    fifo.push(b"durable two").expect("push");
    fifo.storage_mut().flush();
    println!("flushed two records");

    fifo.push(b"lost in the crash").expect("push");
    println!("pushed a third without flushing");

    // The lights go out.
    fifo.storage_mut().power_loss();
    println!("power lost; rescanning the region");

    fifo.begin().expect("rescan");
    println!("recovered {} records:", fifo.record_count());
    let mut buf = [0u8; 32];
    while let Ok(n) = fifo.pop(&mut buf) {
        println!("  \"{}\"", String::from_utf8_lossy(&buf[..n]));
    }
}
