//! # cc2530-znp
//!
//! A portable, no_std Rust driver for Texas Instruments CC2530 Zigbee network processors
//! running the Z-Stack ZNP firmware, attached over SPI.
//!
//! This driver implements the host side of the Z-Stack monitor/test (MT) protocol using:
//! - `embedded-hal` traits for the SPI bus, the handshake pins and timing
//! - the MRDY/SRDY handshake to arbitrate the half-duplex channel
//! - a single 64-byte receive buffer with read-and-clear flags
//! - optional interrupt-safe driver access with `critical-section`
//!
//! ## Crate features
//! | Feature              | Description |
//! |----------------------|-------------|
//! | `std`                | Disables `#![no_std]` support |
//! | `srdy-isr` (default) | Shares the driver with an SRDY or timer ISR via `critical-section` |
//! | `defmt-0-3`          | Uses `defmt` logging |
//! | `log`                | Uses `log` logging |
//!
//! ## Software Features
//!
//! - **Synchronous requests** (`SREQ`/`SRSP`) and **asynchronous commands** (`AREQ`)
//! - **Poll loop** draining unsolicited frames while SRDY is low
//! - **Commissioning** of the NV parameters (PAN, channel, poll rates, keys)
//! - Bounded handshake waits; a silent device gives an error instead of a hang
//! - Command builders and payload layouts for the SYS, ZB, ZDO and AF subsystems
//!
//! ## Usage
//!
//! ```ignore
//! use cc2530_znp::driver::ZnpDriver;
//!
//! let mut znp = ZnpDriver::new(spi, mrdy, srdy, Some(reset), delay);
//! znp.power_up()?;
//! znp.commission()?;
//! znp.startup_from_app()?;
//! znp.af_register(1)?;
//! loop {
//!     znp.poll()?;
//!     if znp.incoming_message() {
//!         if let Some(data) = znp.incoming_payload() {
//!             // ...
//!         }
//!     }
//! }
//! ```
//!
//! Or, with the `srdy-isr` feature, poll from the SRDY falling-edge interrupt:
//!
//! ```ignore
//! cc2530_znp::init_znp_driver!(Spi1, PA4, PA3, PA2, Delay);
//!
//! #[interrupt]
//! fn EXTI3() {
//!     let _ = cc2530_znp::poll_znp!();
//! }
//! ```
//!
//! ## Integration Notes
//!
//! - Configure the SPI bus for mode 0, MSB first, at most 4 MHz ([`consts::ZNP_SPI_MODE`])
//! - MRDY doubles as the chip select and is driven by the driver, not by an `SpiDevice`
//! - Commission once per device; the first step clears the stored network state
//! - With `srdy-isr`, release the shared driver before commissioning or resetting; those
//!   waits would otherwise run inside the critical section
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(any(test, feature = "std")), no_std)]

#[macro_use]
mod fmt;

#[cfg(feature = "srdy-isr")]
pub use critical_section;

pub use heapless;

pub mod commands;
pub mod config;
pub mod consts;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod frame;
pub mod layout;
pub mod messages;
#[cfg(feature = "srdy-isr")]
pub mod shared;
pub mod timer;
pub mod transport;

pub use driver::{DeviceState, ZnpDriver};
pub use error::{Result, ZnpError};
