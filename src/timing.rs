//! Protocol timing.

/// Time the host holds the line low to wake the sensor (in microseconds).
pub const WAKE_PULSE_US: u32 = 1_000;

/// Time the host drives the line high before releasing it (in microseconds).
pub const RELEASE_US: u32 = 20;

/// Delay after a bit's rising edge at which the line is sampled (in microseconds).
///
/// A `0` bit is high for ~26µs, a `1` bit for ~70µs.
pub const BIT_THRESHOLD_US: u32 = 40;

/// Minimum interval between two reads (in microseconds).
pub const PACKET_INTERVAL_US: u32 = 2_000_000;

/// Intervals used by the state machine.
///
/// The defaults follow the DHT22 datasheet. `stall_timeout_us` is off by
/// default: a sensor that never answers parks the driver in the phase it is
/// waiting in.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timing {
    /// Host start pulse, line held low.
    pub wake_pulse_us: u32,
    /// Line driven high before switching to input.
    pub release_us: u32,
    /// Sampling point after a bit's rising edge.
    pub bit_threshold_us: u32,
    /// Wait between the end of one frame and the next start pulse.
    pub packet_interval_us: u32,
    /// Give up on a frame when an awaited edge does not show up within this
    /// many microseconds.
    pub stall_timeout_us: Option<u32>,
}

impl Timing {
    /// Enables the stall timeout.
    pub const fn with_stall_timeout(mut self, us: u32) -> Self {
        self.stall_timeout_us = Some(us);
        self
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            wake_pulse_us: WAKE_PULSE_US,
            release_us: RELEASE_US,
            bit_threshold_us: BIT_THRESHOLD_US,
            packet_interval_us: PACKET_INTERVAL_US,
            stall_timeout_us: None,
        }
    }
}
