//! AM2302 Sensor Driver for Embedded Rust
//!
//! This crate provides a platform-agnostic driver for the AM2302 (DHT22)
//! temperature and humidity sensor. Instead of bit-banging the response, it
//! asks the GPIO subsystem to timestamp falling edges and decodes the pulse
//! widths afterwards, which suits hosts where the driver cannot keep tight
//! timing itself (e.g. a Linux process talking to a GPIO daemon).
//!
//! # Features
//! - Blocking synchronous API using `embedded-hal` traits
//! - Designed for `no_std` environments (needs `alloc`)
//! - Typed errors separating transient transmission faults from fatal ones
//! - Optional logging support via `defmt` or `log`
//!
//! # Dependencies
//! This driver depends on the following traits:
//! - [`SensorPort`] (extends [`OutputPin`]) for the data line
//! - [`DelayNs`] for hold times and waits
//!
//! # Optional Features
//! - `defmt`: Implements `defmt::Format` and logs through `defmt`
//! - `log`: Logs through the `log` facade
//!
//! # Example
//!
//! ```ignore
//! let mut dht = Dht22::new(port, delay);
//! loop {
//!     match dht.read() {
//!         Ok(reading) => println!("{:.1} C, {:.1} %", reading.temperature, reading.relative_humidity),
//!         Err(DhtError::Transmission(fault)) => println!("skipping: {fault}"),
//!         Err(err) => return Err(err),
//!     }
//! }
//! ```
//!
//! [`OutputPin`]: embedded_hal::digital::OutputPin
//! [`DelayNs`]: embedded_hal::delay::DelayNs

#![cfg_attr(not(test), no_std)]

extern crate alloc;

#[macro_use]
mod fmt;

pub mod capture;
pub mod decode;
pub mod dht22;
pub mod error;
pub mod port;
pub mod signal;
pub mod timing;

#[cfg(test)]
mod mock;

pub use dht22::{AbortHandle, Config, Dht22, Reading, TemperatureUnit};
pub use error::{DecodeError, DhtError, TransmissionError};
pub use port::{PinMode, Pull, SensorPort, Subscription};
