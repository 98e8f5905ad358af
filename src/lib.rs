//! A persistent FIFO of variable-size binary records over EEPROM-class
//! byte storage.
//!
//! This crate manages a small byte-addressable region (on-chip EEPROM, a
//! flash-emulated EEPROM page, or plain RAM) as a power-loss-safe queue of
//! records. A single producer appends records with [`Fifo::push`], a single
//! consumer removes the oldest with [`Fifo::pop`], and an independent
//! non-destructive cursor sweeps the queue oldest-to-newest with
//! [`Fifo::read`] / [`Fifo::restart_read`]. After a reset, [`Fifo::begin`]
//! rebuilds every in-RAM cursor from a single scan of the region.
//!
//! # Features
//!
//! - **Power-loss safe**: queue state lives entirely in per-block status
//!   bits plus one anchor byte; no RAM state is needed to recover
//! - **Wear-conscious**: writes are elided when the byte already holds the
//!   target value, reads never touch the medium, and buffered media flush
//!   at a bounded rate
//! - **Variable-size records**: 1 to 127 payload bytes each, packed with a
//!   single byte of overhead per record
//! - **`no_std` support**: the core is allocation-free (disable the `std`
//!   feature); `std` adds `Vec`-returning conveniences
//!
//! # On-medium layout
//!
//! ```text
//! region byte 0     anchor: ring offset of the bottommost block
//! region bytes 1..N ring of R = N - 1 bytes, tiled by a cyclic block chain
//!
//! block:  [ header ] [ payload ... ]
//! header  bit 7    = 1 free, 0 used
//!         bits 6-0 = payload length, 0..=127
//! ```
//!
//! Blocks tile the ring exactly: starting from the anchored offset and
//! advancing by each block's span returns to the start after exactly `R`
//! bytes. A record may wrap across the ring end; the anchor byte always
//! names a real header so the chain can be walked after power loss. The
//! header `0x00` never occurs in a healthy ring and marks corruption.
//!
//! # Quick start
//!
//! ```
//! use eefifo::{Fifo, RamStorage};
//!
//! let mut fifo = Fifo::new(RamStorage::<64>::new()).unwrap();
//! fifo.format().unwrap();
//!
//! fifo.push(b"hello").unwrap();
//! fifo.push(b"world").unwrap();
//!
//! let mut buf = [0u8; 16];
//! let n = fifo.pop(&mut buf).unwrap();
//! assert_eq!(&buf[..n], b"hello");
//! ```
//!
//! # Surviving a power cycle
//!
//! Only the region bytes persist; cursors are volatile. `begin` rebuilds
//! them from the scan:
//!
//! ```
//! use eefifo::{Fifo, RamStorage};
//!
//! let mut fifo = Fifo::new(RamStorage::<32>::new()).unwrap();
//! fifo.format().unwrap();
//! fifo.push(&[1, 2, 3]).unwrap();
//!
//! // Reset: everything but the region is lost.
//! let region = *fifo.storage().bytes();
//! let mut revived = Fifo::new(RamStorage::from_bytes(region)).unwrap();
//! revived.begin().unwrap();
//!
//! let mut buf = [0u8; 8];
//! assert_eq!(revived.pop(&mut buf).unwrap(), 3);
//! assert_eq!(&buf[..3], &[1, 2, 3]);
//! ```
//!
//! # Buffered media
//!
//! Some targets emulate EEPROM in flash and buffer writes in RAM until a
//! commit. [`EmulatedFlash`] models this: the queue requests a commit after
//! every state-changing operation and the adapter flushes at most once per
//! configured period, using a caller-supplied millisecond clock:
//!
//! ```
//! use eefifo::{EmulatedFlash, Fifo};
//!
//! let flash = EmulatedFlash::<32, _>::new(|| 0u32, 100);
//! let mut fifo = Fifo::new(flash).unwrap();
//! fifo.format().unwrap();
//! fifo.push(b"buffered").unwrap();
//! // Force durability without waiting out the commit period.
//! fifo.storage_mut().flush();
//! ```
//!
//! # Limits
//!
//! The queue is strictly single-context: one producer, one consumer, no
//! interior synchronization. Records carry at most [`DATA_SIZE_MAX`] bytes.
//! The anchor byte bounds the ring at 256 bytes, so regions span
//! [`MIN_REGION_SIZE`] to [`MAX_REGION_SIZE`] bytes.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

use core::fmt;

/// Largest payload a single record can carry, in bytes.
pub const DATA_SIZE_MAX: usize = 127;

/// Smallest usable region: one anchor byte plus a four-byte ring.
pub const MIN_REGION_SIZE: usize = 5;

/// Largest usable region: the one-byte anchor addresses ring offsets
/// 0..=255, capping the ring at 256 bytes.
pub const MAX_REGION_SIZE: usize = 257;

/// Span of the largest possible block (header plus maximal payload).
const BLOCK_SPAN_MAX: usize = DATA_SIZE_MAX + 1;

const FREE_BIT: u8 = 0x80;
const SIZE_MASK: u8 = 0x7f;

/// Errors reported by queue operations.
///
/// Discriminants are stable and exposed through [`FifoError::code`] so
/// embedded callers can forward them across an ABI; `0` is reserved for
/// success. `FifoEmpty`, `FifoFull` and `DataBufferSmall` are routine
/// signals. The remaining variants indicate an unformatted or corrupted
/// region; the usual recovery is [`Fifo::format`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "this error should be handled"]
#[repr(u8)]
pub enum FifoError {
    /// No record available at the consumer or read cursor.
    FifoEmpty = 1,
    /// The record does not fit in the remaining free run.
    FifoFull = 2,
    /// The region cannot host the on-medium format.
    InvalidFifoBufferSize = 3,
    /// A block header decoded to the invalid value `0x00`, or the anchor
    /// points outside the ring.
    InvalidBlockHeader = 4,
    /// The caller's buffer is smaller than the record (or the record
    /// would be empty on push).
    DataBufferSmall = 5,
    /// The block under the push cursor is not free.
    PushBlockNotFree = 6,
    /// Walking the chain overshot the ring without closing back onto the
    /// anchored block.
    UnclosedBlockList = 7,
    /// The chain closes but does not describe a FIFO ring (no free block,
    /// or more than one used run).
    WrongRingBufferSize = 8,
}

impl FifoError {
    /// Stable integer code for ABI use; success is `0`.
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for FifoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FifoError::FifoEmpty => write!(f, "fifo is empty"),
            FifoError::FifoFull => write!(f, "not enough free space for the record"),
            FifoError::InvalidFifoBufferSize => write!(
                f,
                "region size outside {}..={} bytes",
                MIN_REGION_SIZE, MAX_REGION_SIZE
            ),
            FifoError::InvalidBlockHeader => write!(f, "invalid block header"),
            FifoError::DataBufferSmall => write!(f, "data buffer too small for the record"),
            FifoError::PushBlockNotFree => write!(f, "push cursor does not sit on a free block"),
            FifoError::UnclosedBlockList => {
                write!(f, "block chain does not close onto the anchor")
            }
            FifoError::WrongRingBufferSize => write!(f, "block chain is not a valid fifo ring"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FifoError {}

/// Map an operation result to its stable wire code (`0` = success).
#[inline]
pub fn status_code<T>(result: &Result<T, FifoError>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(e) => e.code(),
    }
}

/// One decoded block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockHeader {
    free: bool,
    data_size: u8,
}

impl BlockHeader {
    fn free(data_size: u8) -> Self {
        debug_assert!(data_size as usize <= DATA_SIZE_MAX);
        Self {
            free: true,
            data_size,
        }
    }

    fn used(data_size: u8) -> Self {
        debug_assert!(data_size as usize <= DATA_SIZE_MAX);
        Self {
            free: false,
            data_size,
        }
    }

    /// Decode a header byte. `0x00` (used, zero payload) never occurs in a
    /// healthy ring and is rejected.
    fn decode(byte: u8) -> Result<Self, FifoError> {
        if byte == 0 {
            return Err(FifoError::InvalidBlockHeader);
        }
        Ok(Self {
            free: byte & FREE_BIT != 0,
            data_size: byte & SIZE_MASK,
        })
    }

    fn encode(self) -> u8 {
        let status = if self.free { FREE_BIT } else { 0 };
        status | (self.data_size & SIZE_MASK)
    }

    /// Total bytes the block occupies on the ring: header plus payload.
    #[inline]
    fn span(self) -> usize {
        self.data_size as usize + 1
    }
}

/// A monotonic millisecond clock, supplied by the caller.
///
/// Firmware typically passes its `millis`-style tick function; the blanket
/// impl lets any `Fn() -> u32` serve directly.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<F: Fn() -> u32> Clock for F {
    #[inline]
    fn now_ms(&self) -> u32 {
        self()
    }
}

/// Byte-granular access to the storage region backing one queue.
///
/// The queue performs single-byte reads and idempotent single-byte writes
/// only; writes must be atomic at one-byte granularity. `attach` is the
/// lifecycle entry for media needing initialization and must be safe to
/// call repeatedly; the queue calls it at the start of both
/// [`Fifo::format`] and [`Fifo::begin`]. Steady-state `read` and `write`
/// are infallible; a medium that can fail surfaces that from `attach`.
pub trait Storage {
    /// Bring the medium up. Idempotent; the default does nothing.
    fn attach(&mut self) -> Result<(), FifoError> {
        Ok(())
    }

    /// Region length in bytes.
    fn size(&self) -> usize;

    /// Read the byte at `offset`.
    fn read(&self, offset: usize) -> u8;

    /// Write one byte at `offset`. Adapters should elide the write when
    /// the byte already holds `value`, sparing wear on the medium.
    fn write(&mut self, offset: usize, value: u8);

    /// Durability request. Media that buffer writes flush here, subject
    /// to their own rate limiting; the default does nothing. The queue
    /// issues one request after every state-changing operation.
    fn commit(&mut self) {}
}

/// Write-traffic counters kept by [`RamStorage`].
///
/// `performed` counts bytes actually written; `elided` counts writes
/// skipped because the byte already held the target value. On a real
/// EEPROM the second number is wear that never happened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub performed: u32,
    pub elided: u32,
}

impl fmt::Display for WriteStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "performed={}, elided={}", self.performed, self.elided)
    }
}

/// An in-RAM region, for RAM-backed queues and for tests.
///
/// Starts zeroed, which an unformatted scan rejects as corrupt; call
/// [`Fifo::format`] once before first use, exactly as with a blank EEPROM.
#[derive(Debug, Clone)]
pub struct RamStorage<const N: usize> {
    bytes: [u8; N],
    stats: WriteStats,
}

impl<const N: usize> Default for RamStorage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RamStorage<N> {
    /// A zeroed region.
    pub fn new() -> Self {
        Self::from_bytes([0u8; N])
    }

    /// Wrap an existing region image, e.g. one captured before a
    /// simulated power cycle.
    pub fn from_bytes(bytes: [u8; N]) -> Self {
        Self {
            bytes,
            stats: WriteStats::default(),
        }
    }

    /// The raw region bytes.
    #[inline]
    pub fn bytes(&self) -> &[u8; N] {
        &self.bytes
    }

    /// Mutable access to the raw region bytes, for corruption-injection
    /// tests and external tooling. Bytes changed here bypass the write
    /// counters.
    #[inline]
    pub fn bytes_mut(&mut self) -> &mut [u8; N] {
        &mut self.bytes
    }

    /// Write-traffic counters since construction.
    #[inline]
    pub fn write_stats(&self) -> WriteStats {
        self.stats
    }
}

impl<const N: usize> Storage for RamStorage<N> {
    fn size(&self) -> usize {
        N
    }

    fn read(&self, offset: usize) -> u8 {
        self.bytes[offset]
    }

    fn write(&mut self, offset: usize, value: u8) {
        if self.bytes[offset] == value {
            self.stats.elided += 1;
            return;
        }
        self.bytes[offset] = value;
        self.stats.performed += 1;
    }
}

/// A model of flash-emulated EEPROM: writes land in a volatile shadow and
/// become durable only on commit.
///
/// `attach` loads the shadow from the committed image (idempotent).
/// `write` dirties the shadow, eliding no-change writes. `commit` flushes
/// at most once per `commit_period_ms`, measured against the supplied
/// [`Clock`]; a period of `0` disables periodic flushing entirely and the
/// caller drives durability through [`EmulatedFlash::flush`]. A crash
/// inside the commit window rolls the queue back to the last flushed
/// state; [`EmulatedFlash::power_loss`] simulates exactly that.
#[derive(Debug, Clone)]
pub struct EmulatedFlash<const N: usize, C: Clock> {
    committed: [u8; N],
    shadow: [u8; N],
    attached: bool,
    dirty: bool,
    commit_period_ms: u32,
    next_commit_ms: u32,
    clock: C,
}

impl<const N: usize, C: Clock> EmulatedFlash<N, C> {
    /// A blank device flushing at most once per `commit_period_ms`.
    pub fn new(clock: C, commit_period_ms: u32) -> Self {
        Self::with_image([0u8; N], clock, commit_period_ms)
    }

    /// A device whose durable image already holds `committed`.
    pub fn with_image(committed: [u8; N], clock: C, commit_period_ms: u32) -> Self {
        let next_commit_ms = clock.now_ms().saturating_add(commit_period_ms);
        Self {
            committed,
            shadow: committed,
            attached: false,
            dirty: false,
            commit_period_ms,
            next_commit_ms,
            clock,
        }
    }

    /// Flush the shadow to the durable image immediately, ignoring the
    /// commit period.
    pub fn flush(&mut self) {
        if self.dirty {
            self.committed = self.shadow;
            self.dirty = false;
        }
    }

    /// Drop everything volatile: unflushed writes are lost and the device
    /// must be attached again, as after a real power cut.
    pub fn power_loss(&mut self) {
        self.shadow = self.committed;
        self.dirty = false;
        self.attached = false;
    }

    /// The durable image: what would survive a power loss right now.
    #[inline]
    pub fn committed_bytes(&self) -> &[u8; N] {
        &self.committed
    }

    /// True if the shadow holds writes the durable image does not.
    #[inline]
    pub fn has_unflushed_writes(&self) -> bool {
        self.dirty
    }

    /// The clock driving the commit throttle.
    #[inline]
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }
}

impl<const N: usize, C: Clock> Storage for EmulatedFlash<N, C> {
    fn attach(&mut self) -> Result<(), FifoError> {
        if !self.attached {
            self.shadow = self.committed;
            self.dirty = false;
            self.attached = true;
        }
        Ok(())
    }

    fn size(&self) -> usize {
        N
    }

    fn read(&self, offset: usize) -> u8 {
        self.shadow[offset]
    }

    fn write(&mut self, offset: usize, value: u8) {
        if self.shadow[offset] != value {
            self.shadow[offset] = value;
            self.dirty = true;
        }
    }

    fn commit(&mut self) {
        if self.commit_period_ms == 0 {
            return;
        }
        let now = self.clock.now_ms();
        if now < self.next_commit_ms {
            return;
        }
        self.flush();
        self.next_commit_ms = now.saturating_add(self.commit_period_ms);
    }
}

/// A snapshot of the three volatile cursors, as ring offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursors {
    /// First free block: the tail separator.
    pub push: usize,
    /// Oldest used block, or equal to `push` when the queue is empty.
    pub pop: usize,
    /// The non-destructive sweep cursor.
    pub read: usize,
}

impl fmt::Display for Cursors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "push={}, pop={}, read={}", self.push, self.pop, self.read)
    }
}

/// What one full walk of the block chain established.
struct WalkOutcome {
    push: usize,
    pop: usize,
    read: usize,
}

/// A persistent FIFO of variable-size records over a [`Storage`] region.
///
/// Region byte 0 anchors the chain; the remaining `R = N - 1` bytes form
/// the ring. All cursor state is volatile and rebuilt by [`Fifo::begin`].
/// The queue keeps at least one free block at all times: the block under
/// the push cursor separates the newest record from the oldest.
#[derive(Debug)]
pub struct Fifo<S: Storage> {
    storage: S,
    ring_size: usize,
    push_at: usize,
    pop_at: usize,
    read_at: usize,
}

impl<S: Storage> Fifo<S> {
    /// Bind a queue to a storage region.
    ///
    /// Fails with `InvalidFifoBufferSize` unless the region spans
    /// [`MIN_REGION_SIZE`]..=[`MAX_REGION_SIZE`] bytes. The region is not
    /// touched; call [`Fifo::format`] on a blank medium or
    /// [`Fifo::begin`] to adopt existing contents.
    pub fn new(storage: S) -> Result<Self, FifoError> {
        let size = storage.size();
        if !(MIN_REGION_SIZE..=MAX_REGION_SIZE).contains(&size) {
            return Err(FifoError::InvalidFifoBufferSize);
        }
        Ok(Self {
            storage,
            ring_size: size - 1,
            push_at: 0,
            pop_at: 0,
            read_at: 0,
        })
    }

    /// The backing storage adapter.
    #[inline]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Mutable access to the backing storage adapter, e.g. to drive
    /// flushes or simulate faults.
    #[inline]
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Consume the queue, returning the storage adapter.
    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Ring length in bytes (`region size - 1`).
    #[inline]
    pub fn ring_size(&self) -> usize {
        self.ring_size
    }

    /// True when no record is queued.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pop_at == self.push_at
    }

    /// Current cursor offsets.
    #[inline]
    pub fn cursors(&self) -> Cursors {
        Cursors {
            push: self.push_at,
            pop: self.pop_at,
            read: self.read_at,
        }
    }

    /// Write a fresh, empty queue structure to the region.
    ///
    /// Zeroes the anchor, resets all cursors and tiles the ring with a
    /// chain of maximal free blocks. Existing contents are logically
    /// discarded (payload bytes are left as they are; only headers and
    /// the anchor are written).
    pub fn format(&mut self) -> Result<(), FifoError> {
        self.storage.attach()?;
        self.storage.write(0, 0);
        self.push_at = 0;
        self.pop_at = 0;
        self.read_at = 0;

        let mut at = 0;
        let mut remaining = self.ring_size;
        while remaining > BLOCK_SPAN_MAX {
            self.ring_write(at, BlockHeader::free(DATA_SIZE_MAX as u8).encode());
            at += BLOCK_SPAN_MAX;
            remaining -= BLOCK_SPAN_MAX;
        }
        self.ring_write(at, BlockHeader::free((remaining - 1) as u8).encode());

        self.storage.commit();
        Ok(())
    }

    /// Adopt the queue structure already present in the region.
    ///
    /// Reads the anchor, walks the whole chain and places all three
    /// cursors from the status transitions found along the way. On a
    /// quiescent valid region this is a pure read: repeated calls return
    /// `Ok` and yield identical cursors. Any structural damage surfaces
    /// as `InvalidBlockHeader`, `UnclosedBlockList` or
    /// `WrongRingBufferSize`; the usual recovery is [`Fifo::format`].
    pub fn begin(&mut self) -> Result<(), FifoError> {
        self.storage.attach()?;
        let outcome = self.walk()?;
        self.push_at = outcome.push;
        self.pop_at = outcome.pop;
        self.read_at = outcome.read;
        Ok(())
    }

    /// Append one record to the queue.
    ///
    /// Consecutive free blocks under the push cursor are merged until the
    /// record fits; their intermediate headers need no rewrite because
    /// the payload is about to bury them. The leftover tail of the merged
    /// run becomes a new free block, written before the record's own
    /// header so a torn write leaves a self-consistent chain. A payload
    /// crossing the ring end wraps to offset 0 and moves the anchor.
    ///
    /// Fails with `FifoFull` when the free run cannot hold the record
    /// while keeping the mandatory free separator, `DataBufferSmall` for
    /// an empty record, and `PushBlockNotFree` when the region is
    /// corrupted or was never formatted.
    #[must_use = "pushing may fail; check the result"]
    pub fn push(&mut self, data: &[u8]) -> Result<(), FifoError> {
        let n = data.len();
        if n == 0 {
            // A used block of size 0 would encode as the invalid header.
            return Err(FifoError::DataBufferSmall);
        }
        if n > DATA_SIZE_MAX {
            return Err(FifoError::FifoFull);
        }

        let head = self.header(self.push_at)?;
        if !head.free {
            return Err(FifoError::PushBlockNotFree);
        }

        // Grow the allocation over consecutive free blocks until the
        // record fits. Crossing the queue head, or lapping the whole
        // ring, means there is no room.
        let mut free_run = head.span();
        while n + 1 > free_run {
            let next = self.step(self.push_at, free_run);
            if next == self.push_at {
                return Err(FifoError::FifoFull);
            }
            let h = self.header(next)?;
            if !h.free {
                return Err(FifoError::FifoFull);
            }
            free_run += h.span();
        }

        if n + 1 < free_run {
            // Leftover tail of the merged run becomes the new separator.
            let residual = self.step(self.push_at, n + 1);
            self.ring_write(
                residual,
                BlockHeader::free((free_run - n - 2) as u8).encode(),
            );
        } else {
            // Exact fit: the block after the run must already be free to
            // keep serving as the separator.
            let next = self.step(self.push_at, free_run);
            if next == self.push_at {
                return Err(FifoError::FifoFull);
            }
            let h = self.header(next)?;
            if !h.free {
                return Err(FifoError::FifoFull);
            }
        }

        // Copy the payload, wrapping at the ring end if needed.
        let end = self.push_at + 1 + n;
        if end <= self.ring_size {
            for (i, &byte) in data.iter().enumerate() {
                self.ring_write(self.push_at + 1 + i, byte);
            }
        } else {
            let split = self.ring_size - self.push_at - 1;
            for (i, &byte) in data[..split].iter().enumerate() {
                self.ring_write(self.push_at + 1 + i, byte);
            }
            for (i, &byte) in data[split..].iter().enumerate() {
                self.ring_write(i, byte);
            }
        }

        // A payload reaching or crossing the ring end relocates the
        // bottommost block; the anchor moves before the record's header
        // makes the block visible.
        if end >= self.ring_size {
            self.storage.write(0, (end - self.ring_size) as u8);
        }
        self.ring_write(self.push_at, BlockHeader::used(n as u8).encode());
        self.push_at = if end >= self.ring_size {
            end - self.ring_size
        } else {
            end
        };

        self.storage.commit();
        Ok(())
    }

    /// Remove the oldest record, copying its payload into `dst`.
    ///
    /// Returns the record length. The block is freed in place with its
    /// length preserved; merging with neighbouring free blocks is left to
    /// a later [`Fifo::push`]. If the read cursor sat on the removed
    /// record it advances along with the queue head.
    ///
    /// Fails with `FifoEmpty` when nothing is queued and with
    /// `DataBufferSmall` when `dst` cannot hold the record; in the latter
    /// case nothing advances and nothing is written.
    pub fn pop(&mut self, dst: &mut [u8]) -> Result<usize, FifoError> {
        if self.pop_at == self.push_at {
            return Err(FifoError::FifoEmpty);
        }
        let n = self.copy_out(self.pop_at, dst)?;

        self.ring_write(self.pop_at, BlockHeader::free(n as u8).encode());
        self.storage.commit();

        let next = self.step(self.pop_at, n + 1);
        if self.read_at == self.pop_at {
            self.read_at = next;
        }
        self.pop_at = next;
        Ok(n)
    }

    /// Copy the record under the read cursor into `dst` and advance the
    /// cursor, leaving the queue and the medium untouched.
    ///
    /// Returns the record length. Sweeping reaches each queued record
    /// oldest-first and costs no wear; [`Fifo::restart_read`] rewinds the
    /// sweep. Fails with `FifoEmpty` once the sweep has passed the newest
    /// record and with `DataBufferSmall` when `dst` is too short (the
    /// cursor then stays put).
    pub fn read(&mut self, dst: &mut [u8]) -> Result<usize, FifoError> {
        if self.read_at == self.push_at {
            return Err(FifoError::FifoEmpty);
        }
        let n = self.copy_out(self.read_at, dst)?;
        self.read_at = self.step(self.read_at, n + 1);
        Ok(n)
    }

    /// Rewind the read cursor to the oldest record. RAM-only.
    #[inline]
    pub fn restart_read(&mut self) {
        self.read_at = self.pop_at;
    }

    /// Number of records currently queued.
    ///
    /// Walks the used run; meaningful on a ring that passes
    /// [`Fifo::verify`]. A damaged chain terminates the count early
    /// rather than looping.
    pub fn record_count(&self) -> usize {
        let mut count = 0;
        let mut at = self.pop_at;
        while at != self.push_at && count <= self.ring_size {
            let Ok(h) = self.header(at) else {
                break;
            };
            count += 1;
            at = self.step(at, h.span());
        }
        count
    }

    /// Re-check every structural invariant without mutating anything.
    ///
    /// Walks the chain from the anchor exactly as [`Fifo::begin`] does,
    /// then confirms the reconstruction matches the live cursors and that
    /// the read cursor lies on the used run. Intended as the oracle in
    /// tests and as a health check before trusting a region.
    pub fn verify(&self) -> Result<(), FifoError> {
        let outcome = self.walk()?;
        if self.pop_at == self.push_at {
            // Empty queue: any free block is a legal cursor home, so the
            // reconstruction cannot be compared offset-for-offset.
            if outcome.pop != outcome.push
                || self.read_at != self.push_at
                || !self.header(self.push_at)?.free
            {
                return Err(FifoError::WrongRingBufferSize);
            }
            return Ok(());
        }
        if outcome.pop != self.pop_at || outcome.push != self.push_at {
            return Err(FifoError::WrongRingBufferSize);
        }

        // read_at must be reachable from pop_at at or before push_at.
        let mut at = self.pop_at;
        let mut seen = at == self.read_at;
        while at != self.push_at {
            let h = self.header(at)?;
            at = self.step(at, h.span());
            if at == self.read_at {
                seen = true;
            }
        }
        if self.read_at == self.push_at {
            seen = true;
        }
        if !seen {
            return Err(FifoError::WrongRingBufferSize);
        }
        Ok(())
    }

    /// The queued records, oldest first, without touching any cursor.
    #[cfg(feature = "std")]
    pub fn records(&self) -> Records<'_, S> {
        Records {
            fifo: self,
            at: self.pop_at,
        }
    }

    /// Capture the region bytes and cursors for inspection.
    #[cfg(feature = "std")]
    pub fn snapshot(&self) -> Snapshot {
        let mut ring = std::vec::Vec::with_capacity(self.ring_size);
        for at in 0..self.ring_size {
            ring.push(self.ring_read(at));
        }
        Snapshot {
            bot_offset: self.storage.read(0),
            ring,
            cursors: self.cursors(),
        }
    }

    /// Ring-relative advance: offsets stay in `[0, R)`.
    #[inline]
    fn step(&self, at: usize, len: usize) -> usize {
        (at + len) % self.ring_size
    }

    #[inline]
    fn ring_read(&self, at: usize) -> u8 {
        self.storage.read(at + 1)
    }

    #[inline]
    fn ring_write(&mut self, at: usize, value: u8) {
        self.storage.write(at + 1, value)
    }

    fn header(&self, at: usize) -> Result<BlockHeader, FifoError> {
        BlockHeader::decode(self.ring_read(at))
    }

    /// Copy the payload of the block at `at` into `dst`, mirroring the
    /// wrap handling of `push`. Returns the payload length. Checks `dst`
    /// capacity before touching anything.
    fn copy_out(&self, at: usize, dst: &mut [u8]) -> Result<usize, FifoError> {
        let h = self.header(at)?;
        let n = h.data_size as usize;
        if n > dst.len() {
            return Err(FifoError::DataBufferSmall);
        }
        let end = at + 1 + n;
        if end <= self.ring_size {
            for (i, slot) in dst[..n].iter_mut().enumerate() {
                *slot = self.ring_read(at + 1 + i);
            }
        } else {
            let split = self.ring_size - at - 1;
            for (i, slot) in dst[..split].iter_mut().enumerate() {
                *slot = self.ring_read(at + 1 + i);
            }
            for (i, slot) in dst[split..n].iter_mut().enumerate() {
                *slot = self.ring_read(i);
            }
        }
        Ok(n)
    }

    /// Walk the whole chain from the anchor, accumulating spans and
    /// tracking status transitions. free→used marks the queue head,
    /// used→free marks the tail; the lap must close after exactly `R`
    /// bytes. The transition back onto the anchored block counts too.
    fn walk(&self) -> Result<WalkOutcome, FifoError> {
        let bot = self.storage.read(0) as usize;
        if bot >= self.ring_size {
            return Err(FifoError::InvalidBlockHeader);
        }
        let first = self.header(bot)?;

        let mut outcome = WalkOutcome {
            push: bot,
            pop: bot,
            read: bot,
        };
        let mut free_blocks = 0usize;
        let mut heads = 0usize;
        let mut tails = 0usize;

        let mut at = bot;
        let mut h = first;
        let mut was_free = first.free;
        let mut total = 0usize;
        loop {
            if h.free {
                free_blocks += 1;
            }
            total += h.span();
            if total > self.ring_size {
                return Err(FifoError::UnclosedBlockList);
            }
            at = self.step(at, h.span());
            if total == self.ring_size {
                break;
            }
            h = self.header(at)?;
            if h.free != was_free {
                if was_free {
                    outcome.pop = at;
                    outcome.read = at;
                    heads += 1;
                } else {
                    outcome.push = at;
                    tails += 1;
                }
                was_free = h.free;
            }
        }
        debug_assert_eq!(at, bot);

        // The lap closes onto the first block; a status change there is
        // the same kind of transition, landing on the anchored block.
        if was_free != first.free {
            if was_free {
                outcome.pop = bot;
                outcome.read = bot;
                heads += 1;
            } else {
                outcome.push = bot;
                tails += 1;
            }
        }

        // One used run at most, and never zero free blocks.
        if free_blocks == 0 || heads > 1 || tails > 1 {
            return Err(FifoError::WrongRingBufferSize);
        }
        Ok(outcome)
    }
}

/// Iterator over the queued records, oldest first. Created by
/// [`Fifo::records`]; purely observational.
#[cfg(feature = "std")]
pub struct Records<'a, S: Storage> {
    fifo: &'a Fifo<S>,
    at: usize,
}

#[cfg(feature = "std")]
impl<'a, S: Storage> Iterator for Records<'a, S> {
    type Item = std::vec::Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.at == self.fifo.push_at {
            return None;
        }
        let h = self.fifo.header(self.at).ok()?;
        let mut buf = std::vec![0u8; h.data_size as usize];
        self.fifo.copy_out(self.at, &mut buf).ok()?;
        self.at = self.fifo.step(self.at, h.span());
        Some(buf)
    }
}

/// Point-in-time view of a queue's region and cursors.
///
/// `Display` renders the anchor, the cursors and a hex dump of the ring.
#[cfg(feature = "std")]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub bot_offset: u8,
    pub ring: std::vec::Vec<u8>,
    pub cursors: Cursors,
}

#[cfg(feature = "std")]
impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "bot_offset={}, ring_size={}, {}",
            self.bot_offset,
            self.ring.len(),
            self.cursors
        )?;
        for (row, chunk) in self.ring.chunks(16).enumerate() {
            write!(f, "{:04x}:", row * 16)?;
            for byte in chunk {
                write!(f, " {:02x}", byte)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
