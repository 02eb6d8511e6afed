//! Compares a CRC-32 fed by chained DMA transfers against the CPU-fed and software paths
//!
//! The DMA0 channel 0 interrupt re-arms the channel until the whole block has been moved into
//! the CRC unit; meanwhile the core sleeps.

#![no_main]
#![no_std]

use panic_semihosting as _;

use core::cell::RefCell;

use cortex_m::interrupt::{free, CriticalSection, Mutex};
use cortex_m::{asm, peripheral::NVIC, singleton};
use cortex_m_rt::entry;
use cortex_m_semihosting::hprintln;
use gd32e103_dma_crc::{
    bench::{self, BLOCK_SIZES},
    chunked::{ChunkedCrc, Completion, Config},
    crc::software,
    dma::{dma0::C0, CrcDma},
    pac::{self, interrupt},
    prelude::*,
    time::MonoTimer,
};

type Engine = ChunkedCrc<'static, CrcDma<C0>, &'static [u8]>;

static COMPLETION: Completion = Completion::new();
static ENGINE: Mutex<RefCell<Option<Engine>>> = Mutex::new(RefCell::new(None));

fn with_engine<R>(cs: &CriticalSection, f: impl FnOnce(&mut Engine) -> R) -> R {
    f(ENGINE.borrow(cs).borrow_mut().as_mut().unwrap())
}

#[entry]
fn main() -> ! {
    let cp = cortex_m::Peripherals::take().unwrap();
    let dp = pac::Peripherals::take().unwrap();

    let mut rcu = dp.RCU.constrain();
    let channels = dp.DMA0.split(&mut rcu.ahb);
    let crc_dma = dp.CRC.constrain(&mut rcu.ahb).with_dma(channels.0);

    // The core runs from the 8 MHz internal oscillator out of reset.
    let timer = MonoTimer::new(cp.DWT, cp.DCB, 8.mhz());

    let data = singleton!(: [u8; 10240] = [0; 10240]).unwrap();
    bench::fill_alternating_parity(data, 1);
    let data: &'static [u8] = data;

    free(|cs| {
        ENGINE
            .borrow(cs)
            .replace(Some(ChunkedCrc::new(crc_dma, &COMPLETION, Config::default())));
    });
    unsafe { NVIC::unmask(pac::Interrupt::DMA0_CHANNEL0) };

    for &size in BLOCK_SIZES.iter() {
        let block = &data[..size];

        let comparison = bench::compare(
            size,
            software::word_crc32(block),
            &timer,
            || free(|cs| with_engine(cs, |e| bench::cpu_fed(e.mover_mut().accumulator_mut(), block))),
            || {
                free(|cs| with_engine(cs, |e| e.start(block)))?;
                // WFI still wakes on an interrupt that became pending while masked, so checking
                // the flag with interrupts off cannot miss the last completion.
                COMPLETION.wait(|| {
                    free(|_| {
                        if !COMPLETION.is_done() {
                            asm::wfi();
                        }
                    })
                });
                let crc = free(|cs| with_engine(cs, |e| nb::block!(e.result())))?;
                Ok((crc, COMPLETION.chunks()))
            },
        );

        match comparison {
            Ok(comparison) => hprintln!("\n{}", comparison),
            Err(e) => hprintln!("\nBlock Size: {}: {:?}", size, e),
        }
        hprintln!(
            "CRC-32 = {:08x}, additive checksum = {:08x}",
            software::crc32(block),
            software::additive_checksum(block)
        );
    }

    loop {
        asm::wfi();
    }
}

#[interrupt]
fn DMA0_CHANNEL0() {
    free(|cs| with_engine(cs, |e| e.on_transfer_complete()));
}
