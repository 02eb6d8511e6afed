// Copyright 2023 The gd32e103-dma-crc authors.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CRC calculation unit
//!
//! The GD32E103 CRC unit computes CRC-32/MPEG-2 (polynomial 0x04C11DB7, MSB first, seed
//! 0xFFFFFFFF, no output inversion) over 32-bit words written to its data register. When
//! bytes are fed through a 32-bit wide port each byte is zero-extended to a word first;
//! [`software::WordCrc32`] models exactly that.

pub mod software;

use crate::dma::{CrcDma, DmaChannel};
use crate::pac::CRC;
use crate::rcu::{Enable, Reset, AHB};

/// Initial value loaded into every accumulator when it is seeded.
pub const SEED: u32 = 0xFFFF_FFFF;

const CTL_RST: u32 = 1 << 0;

/// A running CRC-32 register that ingests data and exposes its current value.
pub trait Accumulator {
    /// Resets the running value to [`SEED`].
    fn seed(&mut self);

    /// Feeds one byte.
    fn ingest_byte(&mut self, byte: u8);

    /// The checksum of everything ingested since the last seed.
    fn result(&self) -> u32;

    /// Feeds `data` one byte at a time.
    fn feed(&mut self, data: &[u8]) {
        for &byte in data {
            self.ingest_byte(byte);
        }
    }
}

/// Extension trait to constrain the CRC peripheral
pub trait CrcExt {
    /// Constrains the CRC peripheral to play nicely with the other abstractions
    fn constrain(self, ahb: &mut AHB) -> Crc;
}

impl CrcExt for CRC {
    fn constrain(self, ahb: &mut AHB) -> Crc {
        CRC::enable(ahb);
        CRC::reset(ahb);

        Crc { crc: self }
    }
}

/// Constrained CRC peripheral
pub struct Crc {
    crc: CRC,
}

impl Crc {
    /// Reads the current value of the data register.
    pub fn read(&self) -> u32 {
        self.crc.data.read().bits()
    }

    /// Feeds one word to the unit.
    pub fn write(&mut self, val: u32) {
        self.crc.data.write(|w| w.bits(val));
    }

    /// Loads the data register with 0xFFFFFFFF.
    pub fn reset(&mut self) {
        self.crc.ctl.write(|w| unsafe { w.bits(CTL_RST) });
    }

    /// Bus address of the data register, the destination of DMA transfers.
    pub(crate) fn data_address(&self) -> u32 {
        &self.crc.data as *const _ as usize as u32
    }

    /// Pairs the unit with a DMA channel that feeds its data register.
    pub fn with_dma<CH: DmaChannel>(self, channel: CH) -> CrcDma<CH> {
        CrcDma::new(self, channel)
    }

    /// Releases the underlying peripheral.
    pub fn release(self) -> CRC {
        self.crc
    }
}

impl Accumulator for Crc {
    fn seed(&mut self) {
        self.reset();
    }

    fn ingest_byte(&mut self, byte: u8) {
        self.write(u32::from(byte));
    }

    fn result(&self) -> u32 {
        self.read()
    }
}
