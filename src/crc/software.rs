// Copyright 2023 The gd32e103-dma-crc authors.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Software checksums
//!
//! Bitwise, table-free implementations used as correctness oracles for the hardware paths.

use super::{Accumulator, SEED};

/// Reflected CRC-32 polynomial (IEEE 802.3, as used by zlib and Ethernet).
pub const POLY_REFLECTED: u32 = 0xEDB8_8320;

/// CRC-32 polynomial in MSB-first form, as implemented by the CRC unit.
pub const POLY: u32 = 0x04C1_1DB7;

/// Computes the standard CRC-32 of `data`.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.feed(data);
    crc.result()
}

/// Computes what the CRC unit produces when each byte of `data` is written to it as a
/// zero-extended word.
pub fn word_crc32(data: &[u8]) -> u32 {
    let mut crc = WordCrc32::new();
    crc.feed(data);
    crc.result()
}

/// One's complement of the byte sum. Cheap, but blind to reordered bytes.
pub fn additive_checksum(data: &[u8]) -> u32 {
    !data
        .iter()
        .fold(0u32, |sum, &byte| sum.wrapping_add(u32::from(byte)))
}

/// Incremental standard CRC-32: reflected polynomial, seeded with all ones and complemented
/// on output.
#[derive(Clone, Copy, Debug)]
pub struct Crc32 {
    state: u32,
}

impl Crc32 {
    pub const fn new() -> Self {
        Crc32 { state: SEED }
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator for Crc32 {
    fn seed(&mut self) {
        self.state = SEED;
    }

    fn ingest_byte(&mut self, byte: u8) {
        let mut crc = self.state ^ u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ POLY_REFLECTED
            } else {
                crc >> 1
            };
        }
        self.state = crc;
    }

    fn result(&self) -> u32 {
        !self.state
    }
}

/// Software model of the CRC unit: CRC-32/MPEG-2 over 32-bit words, no output inversion.
#[derive(Clone, Copy, Debug)]
pub struct WordCrc32 {
    state: u32,
}

impl WordCrc32 {
    pub const fn new() -> Self {
        WordCrc32 { state: SEED }
    }

    /// Feeds one word, most significant bit first.
    pub fn ingest_word(&mut self, word: u32) {
        let mut crc = self.state ^ word;
        for _ in 0..32 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ POLY
            } else {
                crc << 1
            };
        }
        self.state = crc;
    }
}

impl Default for WordCrc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Accumulator for WordCrc32 {
    fn seed(&mut self) {
        self.state = SEED;
    }

    fn ingest_byte(&mut self, byte: u8) {
        self.ingest_word(u32::from(byte));
    }

    fn result(&self) -> u32 {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crc32_check_value() {
        assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(crc32(b"The quick brown fox jumps over the lazy dog"), 0x414F_A339);
    }

    #[test]
    fn crc32_of_nothing_is_zero() {
        assert_eq!(crc32(&[]), 0);
    }

    #[test]
    fn word_crc_matches_unit() {
        // Value the unit reports after a reset and a single write of 0x12345678.
        let mut crc = WordCrc32::new();
        crc.ingest_word(0x1234_5678);
        assert_eq!(crc.result(), 0xDF8A_8A2B);
    }

    #[test]
    fn word_crc_zero_extends_bytes() {
        let mut words = WordCrc32::new();
        for &byte in b"abc" {
            words.ingest_word(u32::from(byte));
        }
        assert_eq!(word_crc32(b"abc"), words.result());
    }

    #[test]
    fn seed_restarts_the_computation() {
        let mut crc = Crc32::new();
        crc.feed(b"garbage");
        crc.seed();
        crc.feed(b"123456789");
        assert_eq!(crc.result(), 0xCBF4_3926);
    }

    #[test]
    fn additive_checksum_complements_sum() {
        assert_eq!(additive_checksum(&[1, 2, 3]), !6);
        assert_eq!(additive_checksum(&[]), 0xFFFF_FFFF);
    }

    #[test]
    fn crc_catches_what_the_sum_misses() {
        let data: Vec<u8> = (0..64).collect();
        let mut swapped = data.clone();
        swapped.swap(3, 40);
        assert_eq!(additive_checksum(&data), additive_checksum(&swapped));
        assert_ne!(crc32(&data), crc32(&swapped));

        let mut flipped = data.clone();
        flipped[20] = !flipped[20];
        assert_ne!(crc32(&data), crc32(&flipped));
        assert_ne!(word_crc32(&data), word_crc32(&flipped));
    }
}
