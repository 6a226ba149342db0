//! Non-blocking DHT22 Sensor Driver for Embedded Rust
//!
//! This crate provides a platform-agnostic driver for the DHT22 (AM2302) temperature
//! and humidity sensor that never blocks. The protocol is run as a state machine:
//! the caller ticks [`Dht22::run`] from its main loop and every tick performs at
//! most one step (drive the line, check a deadline, or look for an edge), so a
//! single-threaded control loop can service other work between ticks.
//!
//! # Features
//! - Tick-driven API, no delays and no interrupts
//! - Built on [`embedded-hal`] 1.0 digital traits through [`OpenDrain`]
//! - Injected microsecond clock ([`MicrosClock`]) with wraparound-safe deadlines
//! - Queryable cycle outcome ([`CycleStatus`]) and an [`nb`]-style [`Dht22::read`]
//! - Designed for `no_std` environments
//!
//! # Example
//!
//! ```ignore
//! let mut line = OpenDrain::new(gpio);
//! let mut dht = Dht22::new(&mut line, clock);
//! dht.begin();
//! loop {
//!     dht.run()?;
//!     // other work
//!     let (t, rh) = (dht.temperature(), dht.humidity());
//! }
//! ```
//!
//! # Optional Features
//! - `defmt`: Implements `defmt::Format` for the public types and logs decoded
//!   frames, checksum mismatches and stalls
//!
//! [`embedded-hal`]: https://docs.rs/embedded-hal

#![cfg_attr(not(test), no_std)]

pub mod clock;
pub mod dht22;
pub mod error;
pub mod pin;
pub mod timing;

pub use clock::{MicrosClock, Microseconds};
pub use dht22::{CycleStatus, Dht22, Phase, Reading};
pub use error::DhtError;
pub use pin::{DataPin, OpenDrain, PinMode};
pub use timing::Timing;
