use embedded_hal::digital::PinState;

use crate::{
    clock::{MicrosClock, Microseconds},
    error::DhtError,
    pin::{DataPin, PinMode},
    timing::Timing,
};

/// Bytes in one frame: humidity (2), temperature (2), checksum (1).
const FRAME_LEN: usize = 5;

/// Point in the read cycle the driver is currently at.
///
/// The cycle is strictly linear; [`Phase::WaitNextPacket`] loops back to
/// [`Phase::RequestLow`].
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Pull the line low to wake the sensor.
    RequestLow,
    /// Hold the line low for the wake pulse.
    RequestWaitLow,
    /// Drive the line high briefly before releasing it.
    RequestWait20us,
    /// Wait for the sensor to pull the line low.
    ResponseWaitStart,
    /// Wait for the sensor to release the line after its low response.
    ResponseWaitHigh,
    /// Wait for the low that opens the first bit.
    ResponseWaitLow,
    /// Reset the frame accumulator.
    DataReadStart,
    /// Wait for the rising edge that starts a bit.
    DataWaitHigh,
    /// Wait until the bit threshold has passed, then sample.
    DataWait40us,
    /// Wait for the falling edge that ends a bit.
    DataWaitLow,
    /// Hold off until the sensor accepts another request.
    WaitNextPacket,
}

impl Phase {
    /// Phases that advance on the clock alone.
    ///
    /// While the driver sits in one of these, ticking faster than the
    /// remaining deadline gains nothing; a scheduler can use this to back off
    /// during the two second [`Phase::WaitNextPacket`] pause.
    pub fn is_time_gated(self) -> bool {
        matches!(
            self,
            Phase::RequestWaitLow
                | Phase::RequestWait20us
                | Phase::DataWait40us
                | Phase::WaitNextPacket
        )
    }

    /// Phases that advance only when the sensor moves the line.
    pub fn is_edge_wait(self) -> bool {
        matches!(
            self,
            Phase::ResponseWaitStart
                | Phase::ResponseWaitHigh
                | Phase::ResponseWaitLow
                | Phase::DataWaitHigh
                | Phase::DataWaitLow
        )
    }
}

/// Reading returned by the DHT22 sensor.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    /// Temperature in degrees Celsius.
    pub temperature: f32,
    /// Relative humidity in percent.
    pub relative_humidity: f32,
}

impl Reading {
    /// Decodes the four data bytes of a frame.
    ///
    /// Temperature uses sign-magnitude: bit 7 of the high byte is the sign.
    fn from_data(data: [u8; 4]) -> Self {
        let [hum_hi, hum_lo, temp_hi, temp_lo] = data;

        let joined_humidity = u16::from_be_bytes([hum_hi, hum_lo]);
        let relative_humidity = joined_humidity as f32 / 10.0;

        let is_temp_negative = (temp_hi >> 7) != 0;
        let temp_hi = temp_hi & 0b0111_1111;
        let joined_temp = u16::from_be_bytes([temp_hi, temp_lo]);
        let mut temperature = joined_temp as f32 / 10.0;
        if is_temp_negative {
            temperature = -temperature;
        }

        Reading {
            temperature,
            relative_humidity,
        }
    }
}

/// Outcome of the current or most recently finished read cycle.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CycleStatus {
    /// A cycle is in flight, or none has finished since [`Dht22::begin`].
    AwaitingResponse,
    /// The last frame was valid.
    Success(Reading),
    /// The last frame was discarded. Previous readings are kept.
    ChecksumMismatch {
        /// Checksum byte sent by the sensor.
        expected: u8,
        /// Wrapping sum of the four data bytes.
        calculated: u8,
    },
    /// The sensor stopped answering in the given phase. Only reported when
    /// [`Timing::stall_timeout_us`] is set.
    TimedOut(Phase),
}

/// Non-blocking driver for the DHT22 temperature and humidity sensor.
///
/// The driver never waits. Every call to [`Dht22::run`] performs at most one
/// step of the protocol and returns; the caller decides how often to tick.
/// The line is sampled when a tick happens, so ticking slower than the 20µs
/// and 40µs windows degrades the decoding.
pub struct Dht22<'a, PIN, CLK> {
    pin: &'a mut PIN,
    clock: CLK,
    timing: Timing,
    phase: Phase,
    /// When the current time-gated phase may advance.
    deadline: Microseconds,
    /// When the current phase was entered, for the stall timeout.
    entered_at: Microseconds,
    bits: u8,
    bit_count: u8,
    byte_count: usize,
    frame: [u8; FRAME_LEN],
    reading: Option<Reading>,
    status: CycleStatus,
}

impl<'a, PIN, CLK> Dht22<'a, PIN, CLK>
where
    PIN: DataPin,
    CLK: MicrosClock,
{
    /// Creates a new instance of the DHT22 driver with the datasheet timing.
    ///
    /// # Arguments
    ///
    /// * `pin` - The data line. It stays borrowed for the lifetime of the driver.
    /// * `clock` - A monotonic microsecond clock.
    pub fn new(pin: &'a mut PIN, clock: CLK) -> Self {
        Self::with_timing(pin, clock, Timing::default())
    }

    /// Creates a driver with custom [`Timing`].
    pub fn with_timing(pin: &'a mut PIN, clock: CLK, timing: Timing) -> Self {
        Dht22 {
            pin,
            clock,
            timing,
            phase: Phase::RequestLow,
            deadline: Microseconds(0),
            entered_at: Microseconds(0),
            bits: 0,
            bit_count: 0,
            byte_count: 0,
            frame: [0; FRAME_LEN],
            reading: None,
            status: CycleStatus::AwaitingResponse,
        }
    }

    /// Initialises the clock and starts a new cycle with the request pulse.
    ///
    /// Can be called again at any point; the cycle in flight is dropped and
    /// the last valid reading is kept.
    pub fn begin(&mut self) {
        self.clock.begin();
        self.phase = Phase::RequestLow;
        self.status = CycleStatus::AwaitingResponse;
    }

    /// Advances the state machine by at most one transition.
    ///
    /// Returns immediately when the current phase is still waiting for its
    /// deadline or for the sensor to move the line.
    ///
    /// # Errors
    ///
    /// `DhtError::PinError` if the pin fails. The phase is left unchanged so
    /// the next tick retries it.
    pub fn run(&mut self) -> Result<(), DhtError<PIN::Error>> {
        self.step().map(|_| ())
    }

    /// Ticks once and reports when a cycle finishes, in the [`nb`] style.
    ///
    /// # Returns
    ///
    /// * `Ok(Reading)` on the tick that completes a valid frame.
    /// * `Err(nb::Error::WouldBlock)` while the cycle is still in flight.
    /// * `Err(nb::Error::Other(DhtError))` on checksum mismatch, stall
    ///   timeout or pin failure.
    pub fn read(&mut self) -> nb::Result<Reading, DhtError<PIN::Error>> {
        match self.step()? {
            Some(CycleStatus::Success(reading)) => Ok(reading),
            Some(CycleStatus::ChecksumMismatch {
                expected,
                calculated,
            }) => Err(nb::Error::Other(DhtError::ChecksumMismatch {
                expected,
                calculated,
            })),
            Some(CycleStatus::TimedOut(_)) => Err(nb::Error::Other(DhtError::Timeout)),
            Some(CycleStatus::AwaitingResponse) | None => Err(nb::Error::WouldBlock),
        }
    }

    /// Last valid temperature in degrees Celsius, `0.0` before the first one.
    pub fn temperature(&self) -> f32 {
        self.reading.map_or(0.0, |r| r.temperature)
    }

    /// Last valid relative humidity in percent, `0.0` before the first one.
    pub fn humidity(&self) -> f32 {
        self.reading.map_or(0.0, |r| r.relative_humidity)
    }

    /// Last valid reading.
    pub fn reading(&self) -> Option<Reading> {
        self.reading
    }

    /// Outcome of the cycle in flight or, during the pause before the next
    /// request, of the one that just finished.
    pub fn status(&self) -> CycleStatus {
        self.status
    }

    /// Current point in the read cycle.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Intervals the driver was built with.
    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Drops the driver, ending the pin borrow, and returns the clock.
    pub fn release(self) -> CLK {
        self.clock
    }

    /// One tick. `Some` when a cycle finished on this tick.
    fn step(&mut self) -> Result<Option<CycleStatus>, DhtError<PIN::Error>> {
        let now = self.clock.now();
        let phase = self.phase;

        match phase {
            Phase::RequestLow => self.request_low(now)?,
            Phase::RequestWaitLow => self.wait_low(now)?,
            Phase::RequestWait20us => self.wait_release(now)?,
            Phase::ResponseWaitStart => {
                if !self.pin.read()? {
                    self.enter(Phase::ResponseWaitHigh, now);
                }
            }
            Phase::ResponseWaitHigh => {
                if self.pin.read()? {
                    self.enter(Phase::ResponseWaitLow, now);
                }
            }
            Phase::ResponseWaitLow => {
                if !self.pin.read()? {
                    self.enter(Phase::DataReadStart, now);
                }
            }
            Phase::DataReadStart => self.start_data_read(now),
            Phase::DataWaitHigh => self.wait_data_high(now)?,
            Phase::DataWait40us => self.sample_bit(now)?,
            Phase::DataWaitLow => {
                if let Some(status) = self.wait_data_low(now)? {
                    return Ok(Some(status));
                }
            }
            Phase::WaitNextPacket => self.wait_next_packet(now),
        }

        if self.phase == phase && phase.is_edge_wait() && self.stalled(now) {
            return Ok(Some(self.abandon(now)));
        }
        Ok(None)
    }

    fn enter(&mut self, phase: Phase, now: Microseconds) {
        self.phase = phase;
        self.entered_at = now;
    }

    fn request_low(&mut self, now: Microseconds) -> Result<(), DhtError<PIN::Error>> {
        self.pin.set_mode(PinMode::Output)?;
        self.pin.write(PinState::Low)?;

        #[cfg(feature = "defmt")]
        defmt::trace!("DHT22 start pulse at {}", now);

        self.status = CycleStatus::AwaitingResponse;
        self.deadline = now + self.timing.wake_pulse_us;
        self.enter(Phase::RequestWaitLow, now);
        Ok(())
    }

    fn wait_low(&mut self, now: Microseconds) -> Result<(), DhtError<PIN::Error>> {
        if !now.has_reached(self.deadline) {
            return Ok(());
        }

        self.pin.write(PinState::High)?;
        self.deadline = now + self.timing.release_us;
        self.enter(Phase::RequestWait20us, now);
        Ok(())
    }

    fn wait_release(&mut self, now: Microseconds) -> Result<(), DhtError<PIN::Error>> {
        if !now.has_reached(self.deadline) {
            return Ok(());
        }

        // Let the sensor drive the line from here on
        self.pin.set_mode(PinMode::Input)?;
        self.enter(Phase::ResponseWaitStart, now);
        Ok(())
    }

    fn start_data_read(&mut self, now: Microseconds) {
        self.bits = 0;
        self.bit_count = 0;
        self.byte_count = 0;
        self.enter(Phase::DataWaitHigh, now);
    }

    fn wait_data_high(&mut self, now: Microseconds) -> Result<(), DhtError<PIN::Error>> {
        if !self.pin.read()? {
            return Ok(());
        }

        self.deadline = now + self.timing.bit_threshold_us;
        self.enter(Phase::DataWait40us, now);
        Ok(())
    }

    /// A short high (~26µs) is a `0`, a long one (~70µs) a `1`: if the line
    /// is still high past the threshold, the bit is set.
    fn sample_bit(&mut self, now: Microseconds) -> Result<(), DhtError<PIN::Error>> {
        if !now.has_reached(self.deadline) {
            return Ok(());
        }

        let bit = self.pin.read()?;
        self.bits = (self.bits << 1) | bit as u8;
        self.enter(Phase::DataWaitLow, now);
        Ok(())
    }

    fn wait_data_low(
        &mut self,
        now: Microseconds,
    ) -> Result<Option<CycleStatus>, DhtError<PIN::Error>> {
        if self.pin.read()? {
            return Ok(None);
        }

        self.bit_count += 1;
        if self.bit_count == 8 {
            self.frame[self.byte_count] = self.bits;
            self.byte_count += 1;
            self.bits = 0;
            self.bit_count = 0;

            if self.byte_count == FRAME_LEN {
                return Ok(Some(self.finish_frame(now)));
            }
        }

        self.enter(Phase::DataWaitHigh, now);
        Ok(None)
    }

    /// Validates the received frame and publishes it if the checksum holds.
    fn finish_frame(&mut self, now: Microseconds) -> CycleStatus {
        let [data @ .., checksum] = self.frame;
        let calculated = data.iter().fold(0u8, |sum, v| sum.wrapping_add(*v));

        let status = if calculated == checksum {
            let reading = Reading::from_data(data);

            #[cfg(feature = "defmt")]
            defmt::debug!("DHT22 frame decoded: {}", reading);

            self.reading = Some(reading);
            CycleStatus::Success(reading)
        } else {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "DHT22 checksum mismatch: expected {=u8:#x}, calculated {=u8:#x}",
                checksum,
                calculated
            );

            CycleStatus::ChecksumMismatch {
                expected: checksum,
                calculated,
            }
        };

        self.status = status;
        self.deadline = now + self.timing.packet_interval_us;
        self.enter(Phase::WaitNextPacket, now);
        status
    }

    fn stalled(&self, now: Microseconds) -> bool {
        self.timing
            .stall_timeout_us
            .is_some_and(|timeout| now.elapsed_since(self.entered_at) >= timeout)
    }

    /// Gives up on the frame in flight. The line is already released in
    /// every edge-wait phase.
    fn abandon(&mut self, now: Microseconds) -> CycleStatus {
        #[cfg(feature = "defmt")]
        defmt::warn!("DHT22 stalled in {}", self.phase);

        self.status = CycleStatus::TimedOut(self.phase);
        self.deadline = now + self.timing.packet_interval_us;
        self.enter(Phase::WaitNextPacket, now);
        self.status
    }

    fn wait_next_packet(&mut self, now: Microseconds) {
        if now.has_reached(self.deadline) {
            self.enter(Phase::RequestLow, now);
        }
    }
}
