//! Fixed-capacity circular (ring) buffer for `f32` audio samples.
//!
//! The capture callback writes incoming samples at the hardware rate while the
//! analysis task reads fixed-size frames at its own pace.  When the buffer is
//! full, new samples **overwrite** the oldest unread data so that the most
//! recent `capacity` samples are always available — the producer is never
//! blocked, and a stalled consumer only ever loses the head of the stream.
//!
//! Reads are all-or-nothing: [`read`](RingBuffer::read) either returns exactly
//! the requested number of samples in FIFO order or returns `None` and bumps
//! the underrun counter.  Dropped (overwritten) samples are tracked by a
//! separate overflow counter.  Both counters are diagnostic only and never
//! interrupt the stream.
//!
//! # Example
//!
//! ```rust
//! use stringtune::audio::RingBuffer;
//!
//! let mut buf = RingBuffer::new(4);
//! buf.write(&[1.0, 2.0, 3.0, 4.0]);
//! buf.write(&[5.0, 6.0]); // full → 1.0 and 2.0 silently dropped
//! assert_eq!(buf.read(4), Some(vec![3.0, 4.0, 5.0, 6.0]));
//! assert_eq!(buf.read(1), None); // empty again
//! ```

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity circular buffer with independent read and write cursors.
///
/// Generic over `T: Copy + Default` so it can store any `Copy` scalar, though
/// the audio pipeline uses `RingBuffer<f32>` exclusively.
///
/// ## Overflow behaviour
///
/// When [`write`](Self::write) would exceed `capacity`, the oldest unread
/// samples are silently overwritten and the read cursor advances past them
/// (sliding window).  The buffer never allocates beyond its initial capacity.
///
/// ## Concurrency
///
/// The buffer itself is single-threaded; callers share it between the one
/// producer and the one consumer as `Arc<Mutex<RingBuffer<f32>>>` (see
/// [`SharedRingBuffer`](super::SharedRingBuffer)).  Every operation is pure
/// cursor arithmetic plus memory copies, so the lock is only ever held for
/// microseconds.  [`read_into`](Self::read_into) and
/// [`peek_into`](Self::peek_into) copy into caller-owned storage and perform
/// no allocation at all, which keeps allocation out of the locked region on
/// the hot path.
pub struct RingBuffer<T> {
    buf: Vec<T>,
    capacity: usize,
    /// Index of the *next* write position (wraps around `capacity`).
    write_pos: usize,
    /// Index of the oldest unread sample (wraps around `capacity`).
    read_pos: usize,
    /// Number of valid samples currently stored (≤ `capacity`).
    len: usize,
    /// Failed reads (request larger than `len`) since the last counter reset.
    underruns: u64,
    /// Samples lost to sliding-window overwrites since the last `reset`.
    overflowed: u64,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Create a new ring buffer with the given `capacity`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            buf: vec![T::default(); capacity],
            capacity,
            write_pos: 0,
            read_pos: 0,
            len: 0,
            underruns: 0,
            overflowed: 0,
        }
    }

    /// Append `data` to the buffer.
    ///
    /// If the total number of samples exceeds `capacity`, the oldest unread
    /// samples are overwritten and counted as overflow.  Writing an empty
    /// slice is a no-op.  Never blocks, never fails.
    pub fn write(&mut self, data: &[T]) {
        let n = data.len();
        if n == 0 {
            return;
        }

        if n >= self.capacity {
            // The incoming chunk alone fills the buffer: everything previously
            // stored plus the head of the chunk is lost.
            self.overflowed += (self.len + n - self.capacity) as u64;
            self.buf.copy_from_slice(&data[n - self.capacity..]);
            self.read_pos = 0;
            self.write_pos = 0;
            self.len = self.capacity;
            return;
        }

        // Copy in at most two segments around the wrap point.
        let first = n.min(self.capacity - self.write_pos);
        self.buf[self.write_pos..self.write_pos + first].copy_from_slice(&data[..first]);
        if n > first {
            self.buf[..n - first].copy_from_slice(&data[first..]);
        }
        self.write_pos = (self.write_pos + n) % self.capacity;

        if self.len + n > self.capacity {
            let dropped = self.len + n - self.capacity;
            self.overflowed += dropped as u64;
            self.read_pos = (self.read_pos + dropped) % self.capacity;
            self.len = self.capacity;
        } else {
            self.len += n;
        }
    }

    /// Remove and return exactly `n` samples in FIFO order.
    ///
    /// Returns `None` (and increments the underrun counter) when fewer than
    /// `n` samples are available.  Partial reads are never produced.
    pub fn read(&mut self, n: usize) -> Option<Vec<T>> {
        let mut out = vec![T::default(); n];
        if self.read_into(&mut out) {
            Some(out)
        } else {
            None
        }
    }

    /// Allocation-free form of [`read`](Self::read): fill `out` completely
    /// from the oldest samples and consume them.
    ///
    /// Returns `false` (and increments the underrun counter) when fewer than
    /// `out.len()` samples are available; `out` is left untouched in that
    /// case.
    pub fn read_into(&mut self, out: &mut [T]) -> bool {
        let n = out.len();
        if n > self.len {
            self.underruns += 1;
            return false;
        }
        self.copy_out(out);
        self.read_pos = (self.read_pos + n) % self.capacity;
        self.len -= n;
        true
    }

    /// Copy the oldest `n` samples without consuming them.
    ///
    /// Same availability rule as [`read`](Self::read), but the cursors and
    /// the underrun counter are never touched.
    pub fn peek(&self, n: usize) -> Option<Vec<T>> {
        let mut out = vec![T::default(); n];
        if self.peek_into(&mut out) {
            Some(out)
        } else {
            None
        }
    }

    /// Allocation-free form of [`peek`](Self::peek).
    pub fn peek_into(&self, out: &mut [T]) -> bool {
        if out.len() > self.len {
            return false;
        }
        self.copy_out(out);
        true
    }

    /// Copy `out.len()` samples starting at the read cursor, handling the
    /// wrap around the end of the backing storage.  Caller guarantees
    /// `out.len() <= self.len`.
    fn copy_out(&self, out: &mut [T]) {
        let n = out.len();
        let first = n.min(self.capacity - self.read_pos);
        out[..first].copy_from_slice(&self.buf[self.read_pos..self.read_pos + first]);
        if n > first {
            out[first..].copy_from_slice(&self.buf[..n - first]);
        }
    }

    /// Discard all samples and rewind both cursors, without reallocating the
    /// backing storage.  The underrun counter is left alone; use
    /// [`reset_underrun_count`](Self::reset_underrun_count) for that.
    pub fn reset(&mut self) {
        self.write_pos = 0;
        self.read_pos = 0;
        self.len = 0;
        self.overflowed = 0;
    }

    /// Number of samples currently available to read.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the buffer contains no samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of samples the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns `true` when the buffer is filled to capacity (the next write
    /// will overwrite unread data).
    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    /// Failed reads since the last [`reset_underrun_count`](Self::reset_underrun_count).
    pub fn underrun_count(&self) -> u64 {
        self.underruns
    }

    /// Zero the underrun counter.
    pub fn reset_underrun_count(&mut self) {
        self.underruns = 0;
    }

    /// Samples lost to overwrites since the last [`reset`](Self::reset).
    pub fn overflow_count(&self) -> u64 {
        self.overflowed
    }

    /// Duration of the currently buffered audio in seconds, assuming
    /// `sample_rate` Hz mono.
    pub fn duration_secs(&self, sample_rate: u32) -> f32 {
        if sample_rate == 0 {
            return 0.0;
        }
        self.len as f32 / sample_rate as f32
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Basic write / read -------------------------------------------------

    #[test]
    fn write_and_read_within_capacity() {
        let mut buf = RingBuffer::new(8);
        buf.write(&[1.0_f32, 2.0, 3.0]);
        assert_eq!(buf.len(), 3);
        assert!(!buf.is_full());

        assert_eq!(buf.read(3), Some(vec![1.0, 2.0, 3.0]));
        assert!(buf.is_empty());
    }

    #[test]
    fn read_is_all_or_nothing() {
        let mut buf = RingBuffer::new(8);
        buf.write(&[1.0_f32, 2.0, 3.0]);

        // 4 > 3 available → no partial result, nothing consumed
        assert_eq!(buf.read(4), None);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.read(3), Some(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn sequential_reads_preserve_fifo_order() {
        let mut buf = RingBuffer::new(8);
        buf.write(&[1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0]);

        assert_eq!(buf.read(2), Some(vec![1.0, 2.0]));
        assert_eq!(buf.read(2), Some(vec![3.0, 4.0]));
        assert_eq!(buf.read(2), Some(vec![5.0, 6.0]));
    }

    #[test]
    fn wrap_around_read_returns_contiguous_stream() {
        // Fill 6 of 8, consume 4, refill 4: the second read must straddle the
        // end of the backing array and still come back in order.
        let mut buf = RingBuffer::new(8);
        buf.write(&[1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(buf.read(4), Some(vec![1.0, 2.0, 3.0, 4.0]));

        buf.write(&[7.0_f32, 8.0, 9.0, 10.0]);
        assert_eq!(buf.read(6), Some(vec![5.0, 6.0, 7.0, 8.0, 9.0, 10.0]));
    }

    // ---- Overflow (oldest samples discarded) --------------------------------

    #[test]
    fn overflow_drops_oldest_and_keeps_order() {
        let mut buf = RingBuffer::new(4);
        buf.write(&[1.0_f32, 2.0, 3.0, 4.0]);
        buf.write(&[5.0_f32, 6.0]); // overwrites 1.0 and 2.0

        assert_eq!(buf.len(), 4);
        assert_eq!(buf.read(4), Some(vec![3.0, 4.0, 5.0, 6.0]));
        assert_eq!(buf.overflow_count(), 2);
    }

    #[test]
    fn write_larger_than_capacity_keeps_newest() {
        let mut buf = RingBuffer::new(4);
        buf.write(&[1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);

        assert_eq!(buf.len(), 4);
        assert_eq!(buf.read(4), Some(vec![5.0, 6.0, 7.0, 8.0]));
        assert_eq!(buf.overflow_count(), 4);
    }

    #[test]
    fn overflow_after_partial_read_accounts_for_consumed_samples() {
        let mut buf = RingBuffer::new(4);
        buf.write(&[1.0_f32, 2.0, 3.0, 4.0]);
        assert_eq!(buf.read(2), Some(vec![1.0, 2.0]));

        // Two slots free: no overflow yet.
        buf.write(&[5.0_f32, 6.0]);
        assert_eq!(buf.overflow_count(), 0);

        // One more sample overwrites 3.0.
        buf.write(&[7.0_f32]);
        assert_eq!(buf.read(4), Some(vec![4.0, 5.0, 6.0, 7.0]));
        assert_eq!(buf.overflow_count(), 1);
    }

    #[test]
    fn write_empty_slice_is_noop() {
        let mut buf = RingBuffer::new(4);
        buf.write(&[1.0_f32]);
        buf.write(&[]);
        assert_eq!(buf.len(), 1);
        assert_eq!(buf.overflow_count(), 0);
    }

    // ---- Underrun counting ---------------------------------------------------

    #[test]
    fn failed_read_increments_underrun_count_once_per_call() {
        let mut buf: RingBuffer<f32> = RingBuffer::new(8);
        assert_eq!(buf.underrun_count(), 0);

        assert_eq!(buf.read(1), None);
        assert_eq!(buf.read(8), None);
        assert_eq!(buf.underrun_count(), 2);

        buf.write(&[1.0_f32]);
        assert_eq!(buf.read(1), Some(vec![1.0]));
        assert_eq!(buf.underrun_count(), 2);

        buf.reset_underrun_count();
        assert_eq!(buf.underrun_count(), 0);
    }

    #[test]
    fn peek_never_touches_underrun_count() {
        let mut buf: RingBuffer<f32> = RingBuffer::new(4);
        assert_eq!(buf.peek(2), None);
        assert_eq!(buf.underrun_count(), 0);

        buf.write(&[1.0_f32, 2.0]);
        assert_eq!(buf.peek(2), Some(vec![1.0, 2.0]));
        // Not consumed: a real read still sees the same samples.
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.read(2), Some(vec![1.0, 2.0]));
    }

    // ---- read_into / peek_into -----------------------------------------------

    #[test]
    fn read_into_fills_caller_buffer() {
        let mut buf = RingBuffer::new(8);
        buf.write(&[1.0_f32, 2.0, 3.0, 4.0]);

        let mut frame = [0.0_f32; 3];
        assert!(buf.read_into(&mut frame));
        assert_eq!(frame, [1.0, 2.0, 3.0]);
        assert_eq!(buf.len(), 1);
    }

    #[test]
    fn read_into_underrun_leaves_output_untouched() {
        let mut buf = RingBuffer::new(8);
        buf.write(&[1.0_f32]);

        let mut frame = [9.0_f32; 4];
        assert!(!buf.read_into(&mut frame));
        assert_eq!(frame, [9.0; 4]);
        assert_eq!(buf.underrun_count(), 1);
    }

    #[test]
    fn peek_into_straddles_wrap_point() {
        let mut buf = RingBuffer::new(4);
        buf.write(&[1.0_f32, 2.0, 3.0, 4.0]);
        assert_eq!(buf.read(3), Some(vec![1.0, 2.0, 3.0]));
        buf.write(&[5.0_f32, 6.0]); // 6.0 lands at index 1 after wrapping

        let mut frame = [0.0_f32; 3];
        assert!(buf.peek_into(&mut frame));
        assert_eq!(frame, [4.0, 5.0, 6.0]);
    }

    // ---- Reset semantics -------------------------------------------------------

    #[test]
    fn reset_empties_buffer_and_keeps_it_usable() {
        let mut buf = RingBuffer::new(4);
        buf.write(&[1.0_f32, 2.0, 3.0, 4.0, 5.0]);
        buf.reset();

        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 4);
        assert_eq!(buf.overflow_count(), 0);

        buf.write(&[9.0_f32]);
        assert_eq!(buf.read(1), Some(vec![9.0]));
    }

    #[test]
    fn reset_preserves_underrun_count() {
        let mut buf: RingBuffer<f32> = RingBuffer::new(4);
        assert_eq!(buf.read(1), None);
        buf.reset();
        assert_eq!(buf.underrun_count(), 1);
    }

    // ---- Capacity / duration helpers ---------------------------------------

    #[test]
    fn capacity_reported_correctly() {
        let buf: RingBuffer<f32> = RingBuffer::new(1024);
        assert_eq!(buf.capacity(), 1024);
    }

    #[test]
    fn duration_secs_calculation() {
        let mut buf = RingBuffer::new(44_100);
        buf.write(&vec![0.0_f32; 22_050]);
        // 22050 samples at 44.1kHz = 0.5 seconds
        assert!((buf.duration_secs(44_100) - 0.5).abs() < 1e-6);
    }

    // ---- Panic guard -------------------------------------------------------

    #[test]
    #[should_panic(expected = "RingBuffer capacity must be > 0")]
    fn zero_capacity_panics() {
        let _buf: RingBuffer<f32> = RingBuffer::new(0);
    }
}
