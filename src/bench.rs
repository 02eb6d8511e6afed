// Copyright 2023 The gd32e103-dma-crc authors.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Comparison harness
//!
//! Times the CPU-fed and DMA-fed paths over the same buffer and checks both against a
//! software reference.

use core::fmt;

use crate::chunked::Error;
use crate::crc::Accumulator;
use crate::time::{Clock, MicroSeconds};

/// Buffer lengths swept by the comparison: below, at and around multiples of the chunk limit.
pub const BLOCK_SIZES: [usize; 8] = [512, 1024, 1030, 1824, 2048, 2049, 2303, 10240];

/// Seeds `acc` and feeds it `data` one byte at a time from the CPU.
pub fn cpu_fed<A: Accumulator>(acc: &mut A, data: &[u8]) -> u32 {
    acc.seed();
    acc.feed(data);
    acc.result()
}

/// Runs `f`, returning its output and how long it took on `clock`.
pub fn timed<C, R, F>(clock: &C, f: F) -> (R, MicroSeconds)
where
    C: Clock,
    F: FnOnce() -> R,
{
    let t0 = clock.now();
    let r = f();
    (r, clock.elapsed_since(t0))
}

/// Fills `buf` with pseudo-random bytes whose parity alternates odd, even, odd, ...
pub fn fill_alternating_parity(buf: &mut [u8], seed: u32) {
    let mut x = if seed == 0 { 0x2545_F491 } else { seed };
    for (i, byte) in buf.iter_mut().enumerate() {
        // xorshift32
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        let odd = i % 2 == 0;
        *byte = (x as u8 & !1) | odd as u8;
    }
}

/// Outcome of one block size of the sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Comparison {
    pub block_size: usize,
    /// Software model of what the accumulator should produce.
    pub reference: u32,
    /// Accumulator fed by the CPU.
    pub cpu: u32,
    /// Accumulator fed by chained DMA transfers.
    pub dma: u32,
    /// DMA chunks used.
    pub chunks: usize,
    pub cpu_elapsed: MicroSeconds,
    pub dma_elapsed: MicroSeconds,
}

impl Comparison {
    /// Whether all three paths agree.
    pub fn matches(&self) -> bool {
        self.reference == self.cpu && self.cpu == self.dma
    }

    /// How many times faster the DMA path was than the CPU-fed one.
    pub fn speedup(&self) -> f32 {
        if self.dma_elapsed.0 == 0 {
            return f32::INFINITY;
        }
        self.cpu_elapsed.0 as f32 / self.dma_elapsed.0 as f32
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Block Size: {}", self.block_size)?;
        writeln!(f)?;
        writeln!(f, "reference = {:08x}", self.reference)?;
        writeln!(f, "hwCRC     = {:08x}", self.cpu)?;
        writeln!(f, "DMA_CRC   = {:08x} ({} chunks)", self.dma, self.chunks)?;
        writeln!(f)?;
        writeln!(f, "Hardware CRC Elapsed Time: {}", self.cpu_elapsed)?;
        writeln!(f, "DMA CRC Elapsed Time: {}", self.dma_elapsed)?;
        writeln!(f)?;
        writeln!(f, "Speedup: {:.2} times faster", self.speedup())?;
        if !self.matches() {
            writeln!(f, "MISMATCH")?;
        }
        write!(f, "--------------------------------------")
    }
}

/// Times `cpu` then `dma` over a block of `block_size` bytes.
///
/// `dma` returns the checksum and the number of chunks it took.
pub fn compare<C, P, D>(
    block_size: usize,
    reference: u32,
    clock: &C,
    cpu: P,
    dma: D,
) -> Result<Comparison, Error>
where
    C: Clock,
    P: FnOnce() -> u32,
    D: FnOnce() -> Result<(u32, usize), Error>,
{
    let (cpu, cpu_elapsed) = timed(clock, cpu);
    let (dma, dma_elapsed) = timed(clock, dma);
    let (dma, chunks) = dma?;

    Ok(Comparison {
        block_size,
        reference,
        cpu,
        dma,
        chunks,
        cpu_elapsed,
        dma_elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunked::{ChunkedCrc, Completion, Config};
    use crate::crc::software::{crc32, Crc32};
    use crate::dma::BlockMover;
    use crate::time::Hertz;
    use core::cell::Cell;

    /// Ticks once per call.
    struct StepClock(Cell<u32>);

    impl Clock for StepClock {
        fn now(&self) -> u32 {
            let now = self.0.get();
            self.0.set(now + 1);
            now
        }

        fn frequency(&self) -> Hertz {
            Hertz(1_000_000)
        }
    }

    /// Completes each chunk as soon as it is triggered.
    struct InstantMover(Crc32, Option<(*const u8, usize)>);

    impl BlockMover for InstantMover {
        type Accumulator = Crc32;

        const MAX_LEN: usize = 1024;

        unsafe fn configure(&mut self, src: *const u8, len: usize) {
            self.1 = Some((src, len));
        }

        fn enable(&mut self) {}

        fn trigger(&mut self) {
            if let Some((src, len)) = self.1.take() {
                self.0.feed(unsafe { core::slice::from_raw_parts(src, len) });
            }
        }

        fn disable(&mut self) {}

        fn is_complete(&self) -> bool {
            true
        }

        fn accumulator(&self) -> &Crc32 {
            &self.0
        }

        fn accumulator_mut(&mut self) -> &mut Crc32 {
            &mut self.0
        }
    }

    #[test]
    fn sweep_matches_software_reference() {
        let completion = Completion::new();
        let mut engine = ChunkedCrc::new(
            InstantMover(Crc32::new(), None),
            &completion,
            Config::default(),
        );
        let mut cpu = Crc32::new();
        let clock = StepClock(Cell::new(0));

        let mut data = vec![0u8; 10240];
        fill_alternating_parity(&mut data, 1);
        let data: &'static [u8] = Box::leak(data.into_boxed_slice());

        for &size in BLOCK_SIZES.iter() {
            let block = &data[..size];
            let comparison = compare(
                size,
                crc32(block),
                &clock,
                || cpu_fed(&mut cpu, block),
                || {
                    engine.start(block)?;
                    completion.wait(|| engine.on_transfer_complete());
                    let crc = nb::block!(engine.result())?;
                    Ok((crc, completion.chunks()))
                },
            )
            .unwrap();

            assert!(comparison.matches(), "{}", comparison);
            assert_eq!(comparison.chunks, (size + 1023) / 1024);
        }
    }

    #[test]
    fn failing_dma_path_is_reported() {
        let clock = StepClock(Cell::new(0));
        let result = compare(4, 0, &clock, || 0, || Err(Error::Timeout));
        assert_eq!(result, Err(Error::Timeout));
    }

    #[test]
    fn report_lists_every_path() {
        let comparison = Comparison {
            block_size: 2049,
            reference: 0xdead_beef,
            cpu: 0xdead_beef,
            dma: 0xdead_beef,
            chunks: 3,
            cpu_elapsed: MicroSeconds(900),
            dma_elapsed: MicroSeconds(300),
        };
        let report = format!("{}", comparison);

        assert!(report.starts_with("Block Size: 2049\n"));
        assert!(report.contains("DMA_CRC   = deadbeef (3 chunks)"));
        assert!(report.contains("Hardware CRC Elapsed Time: 900 us"));
        assert!(report.contains("DMA CRC Elapsed Time: 300 us"));
        assert!(report.contains("Speedup: 3.00 times faster"));
        assert!(!report.contains("MISMATCH"));
    }

    #[test]
    fn mismatch_is_flagged() {
        let comparison = Comparison {
            block_size: 4,
            reference: 1,
            cpu: 1,
            dma: 2,
            chunks: 1,
            cpu_elapsed: MicroSeconds(1),
            dma_elapsed: MicroSeconds(0),
        };
        assert!(!comparison.matches());
        assert!(comparison.speedup().is_infinite());
        assert!(format!("{}", comparison).contains("MISMATCH"));
    }

    #[test]
    fn cpu_fed_reseeds() {
        let mut acc = Crc32::new();
        acc.feed(b"left over");
        assert_eq!(cpu_fed(&mut acc, b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn pattern_alternates_parity() {
        let mut buf = [0u8; 257];
        fill_alternating_parity(&mut buf, 0);
        for (i, &byte) in buf.iter().enumerate() {
            assert_eq!(byte % 2 == 1, i % 2 == 0, "byte {}", i);
        }

        let mut other = [0u8; 257];
        fill_alternating_parity(&mut other, 0);
        assert_eq!(buf[..], other[..]);
    }
}
