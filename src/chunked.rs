// Copyright 2023 The gd32e103-dma-crc authors.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Chunked DMA-fed CRC
//!
//! A single DMA descriptor moves at most [`Config::max_chunk_len()`] bytes, so a long buffer is
//! fed to the accumulator as a chain of transfers. [`ChunkedCrc::start`] seeds the accumulator
//! and fires the first chunk; every transfer-complete interrupt then calls
//! [`ChunkedCrc::on_transfer_complete`], which either arms the next chunk or raises the done
//! flag in the shared [`Completion`]. The caller blocks on that flag and reads the result.
//!
//! ```text
//!   start ──▶ InFlight ──(complete, bytes left)──▶ InFlight
//!                │
//!                └──(complete, nothing left)──▶ Done
//! ```
//!
//! The remaining length is decremented by the length of the chunk that actually completed,
//! so it reaches exactly zero when the run finishes.

use core::cmp;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use embedded_dma::ReadBuffer;
use log::{debug, trace, warn};
use void::Void;

use crate::crc::Accumulator;
use crate::dma::BlockMover;
use crate::time::{Clock, MicroSeconds};

/// Largest chunk handed to the DMA by default, in bytes.
pub const MAX_CHUNK_LEN: usize = 1024;

/// Chunked CRC error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The buffer holds no data.
    EmptyBuffer,
    /// A run is already in flight.
    Busy,
    /// No run has been started since the engine was created or aborted.
    NotStarted,
    /// The completion signal did not arrive in time.
    Timeout,
}

/// Chunking configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub max_chunk_len: usize,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            max_chunk_len: MAX_CHUNK_LEN,
        }
    }
}

impl Config {
    pub fn max_chunk_len(mut self, len: usize) -> Self {
        self.max_chunk_len = len;
        self
    }
}

/// Done flag and bookkeeping shared between the interrupt handler and the waiting caller.
///
/// Only the engine writes; the caller reads. Every access is a plain atomic load or store,
/// so this works on cores without compare-and-swap.
#[derive(Debug)]
pub struct Completion {
    remaining: AtomicUsize,
    chunks: AtomicUsize,
    done: AtomicBool,
}

impl Completion {
    pub const fn new() -> Self {
        Completion {
            remaining: AtomicUsize::new(0),
            chunks: AtomicUsize::new(0),
            done: AtomicBool::new(false),
        }
    }

    /// Whether the last run has finished.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Bytes of the current run not yet moved into the accumulator.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Relaxed)
    }

    /// Number of chunks armed during the current run.
    pub fn chunks(&self) -> usize {
        self.chunks.load(Ordering::Relaxed)
    }

    /// Non-blocking check of the done flag.
    pub fn poll(&self) -> nb::Result<(), Void> {
        if self.is_done() {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    /// Blocks until the run is done, calling `idle` between checks.
    ///
    /// There is no timeout: if the DMA never completes this never returns. Pass
    /// `cortex_m::asm::wfi` as `idle` to sleep until the next interrupt.
    pub fn wait<F>(&self, mut idle: F)
    where
        F: FnMut(),
    {
        while self.poll().is_err() {
            idle();
        }
    }

    /// Blocks until the run is done or `timeout` has elapsed on `clock`.
    pub fn wait_timeout<C, F>(
        &self,
        clock: &C,
        timeout: MicroSeconds,
        mut idle: F,
    ) -> Result<(), Error>
    where
        C: Clock,
        F: FnMut(),
    {
        let t0 = clock.now();
        loop {
            if self.is_done() {
                return Ok(());
            }
            if clock.elapsed_since(t0) >= timeout {
                // The flag may have been raised while the clock was read.
                return if self.is_done() {
                    Ok(())
                } else {
                    Err(Error::Timeout)
                };
            }
            idle();
        }
    }

    fn begin(&self, len: usize) {
        self.done.store(false, Ordering::Relaxed);
        self.chunks.store(0, Ordering::Relaxed);
        self.remaining.store(len, Ordering::Release);
    }

    fn armed(&self) {
        self.chunks.store(self.chunks() + 1, Ordering::Relaxed);
    }

    fn complete(&self, len: usize) -> usize {
        let remaining = self.remaining().saturating_sub(len);
        self.remaining.store(remaining, Ordering::Relaxed);
        remaining
    }

    fn finish(&self) {
        self.done.store(true, Ordering::Release);
    }
}

impl Default for Completion {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    InFlight,
    Done,
}

/// Feeds buffers to an accumulator through a block mover, one bounded chunk at a time.
pub struct ChunkedCrc<'a, M: BlockMover, B> {
    // Only `free` takes the mover out.
    mover: Option<M>,
    completion: &'a Completion,
    max_chunk_len: usize,
    buffer: Option<B>,
    base: *const u8,
    offset: usize,
    in_flight: usize,
    state: State,
}

impl<'a, M, B> ChunkedCrc<'a, M, B>
where
    M: BlockMover,
    B: ReadBuffer<Word = u8>,
{
    /// Creates an idle engine.
    ///
    /// # Panics
    ///
    /// If the chunk length is zero or longer than the mover can transfer at once.
    pub fn new(mover: M, completion: &'a Completion, config: Config) -> Self {
        assert!(config.max_chunk_len > 0);
        assert!(config.max_chunk_len <= M::MAX_LEN);

        ChunkedCrc {
            mover: Some(mover),
            completion,
            max_chunk_len: config.max_chunk_len,
            buffer: None,
            base: core::ptr::null(),
            offset: 0,
            in_flight: 0,
            state: State::Idle,
        }
    }

    /// Seeds the accumulator and starts feeding `buffer` to it.
    ///
    /// A buffer left over from a previous run is dropped; use
    /// [`take_buffer`](Self::take_buffer) first to keep it.
    pub fn start(&mut self, buffer: B) -> Result<(), Error> {
        if self.state == State::InFlight {
            return Err(Error::Busy);
        }

        // NOTE(unsafe) the engine owns `buffer` until the run has finished or been aborted
        let (base, len) = unsafe { buffer.read_buffer() };
        if len == 0 {
            return Err(Error::EmptyBuffer);
        }

        self.buffer = Some(buffer);
        self.base = base;
        self.offset = 0;
        self.in_flight = 0;

        self.mover_mut().accumulator_mut().seed();
        self.completion.begin(len);
        self.state = State::InFlight;
        debug!("crc run: {} bytes in chunks of {}", len, self.max_chunk_len);

        self.arm(cmp::min(len, self.max_chunk_len));
        Ok(())
    }

    /// Transfer complete handler. Call once per DMA completion interrupt.
    ///
    /// A call made while the mover reports no finished transfer (for example an interrupt
    /// left pending by an aborted run) is ignored.
    pub fn on_transfer_complete(&mut self) {
        if self.state != State::InFlight {
            warn!("spurious DMA completion in state {:?}", self.state);
            self.mover_mut().disable();
            return;
        }
        if !self.mover().is_complete() {
            warn!("DMA completion without a finished transfer at offset {}", self.offset);
            return;
        }

        self.mover_mut().disable();
        self.offset += self.in_flight;
        let remaining = self.completion.complete(self.in_flight);

        if remaining > self.max_chunk_len {
            self.arm(self.max_chunk_len);
        } else if remaining > 0 {
            self.arm(remaining);
        } else {
            self.in_flight = 0;
            self.state = State::Done;
            self.completion.finish();
            debug!("crc run done after {} chunks", self.completion.chunks());
        }
    }

    /// The checksum of the last run, once it is done.
    pub fn result(&self) -> nb::Result<u32, Error> {
        match self.state {
            State::Idle => Err(nb::Error::Other(Error::NotStarted)),
            State::InFlight => Err(nb::Error::WouldBlock),
            State::Done => Ok(self.mover().accumulator().result()),
        }
    }

    /// Stops the run in flight, if any. The done flag stays down.
    pub fn abort(&mut self) {
        if self.state == State::InFlight {
            warn!(
                "crc run aborted with {} bytes remaining",
                self.completion.remaining()
            );
            self.mover_mut().disable();
            self.in_flight = 0;
            self.state = State::Idle;
        }
    }

    /// Whether a chunk is currently in flight.
    pub fn is_busy(&self) -> bool {
        self.state == State::InFlight
    }

    /// Hands back the buffer of the last run, unless a run is in flight.
    pub fn take_buffer(&mut self) -> Option<B> {
        if self.state == State::InFlight {
            return None;
        }
        self.base = core::ptr::null();
        self.buffer.take()
    }

    /// Returns a reference to the block mover
    pub fn mover(&self) -> &M {
        match self.mover {
            Some(ref mover) => mover,
            None => unreachable!(),
        }
    }

    /// Returns a mutable reference to the block mover
    pub fn mover_mut(&mut self) -> &mut M {
        match self.mover {
            Some(ref mut mover) => mover,
            None => unreachable!(),
        }
    }

    /// Stops any run in flight and releases the block mover and the buffer.
    pub fn free(mut self) -> (M, Option<B>) {
        self.abort();
        let buffer = self.buffer.take();
        match self.mover.take() {
            Some(mover) => (mover, buffer),
            None => unreachable!(),
        }
    }

    fn arm(&mut self, len: usize) {
        trace!("arming chunk of {} bytes at offset {}", len, self.offset);
        self.in_flight = len;
        self.completion.armed();
        // NOTE(unsafe) offset + len never exceeds the length reported by `read_buffer`, and
        // the buffer is owned by the engine, which disables the mover before releasing it
        let src = unsafe { self.base.add(self.offset) };
        let mover = self.mover_mut();
        unsafe {
            mover.configure(src, len);
        }
        mover.enable();
        mover.trigger();
    }
}

impl<'a, M: BlockMover, B> Drop for ChunkedCrc<'a, M, B> {
    fn drop(&mut self) {
        if self.state == State::InFlight {
            if let Some(mover) = self.mover.as_mut() {
                mover.disable();
            }
        }
    }
}

// NOTE(unsafe) `base` only ever points into the owned buffer
unsafe impl<'a, M: BlockMover + Send, B: Send> Send for ChunkedCrc<'a, M, B> {}
