//! Single-wire data line abstraction.

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};

/// Direction of the data line.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinMode {
    /// The line is released and sampled.
    Input,
    /// The host drives the line.
    Output,
}

/// A GPIO that can switch between driving and sampling the DHT22 data line.
///
/// `embedded-hal` 1.0 has no trait for changing pin direction at runtime, so
/// the driver talks to the line through this one. Use [`OpenDrain`] for the
/// usual open-drain wiring, or implement it directly for a HAL pin that can
/// be reconfigured.
pub trait DataPin: ErrorType {
    /// Configures the line direction.
    fn set_mode(&mut self, mode: PinMode) -> Result<(), Self::Error>;

    /// Drives the line. Only meaningful in [`PinMode::Output`].
    fn write(&mut self, state: PinState) -> Result<(), Self::Error>;

    /// Samples the line, `true` meaning high.
    fn read(&mut self) -> Result<bool, Self::Error>;
}

impl<T: DataPin + ?Sized> DataPin for &mut T {
    fn set_mode(&mut self, mode: PinMode) -> Result<(), Self::Error> {
        T::set_mode(self, mode)
    }

    fn write(&mut self, state: PinState) -> Result<(), Self::Error> {
        T::write(self, state)
    }

    fn read(&mut self) -> Result<bool, Self::Error> {
        T::read(self)
    }
}

/// Adapts an open-drain pin (with external pull-up) to [`DataPin`].
///
/// An open-drain output can be read back at any time, so switching to input
/// just means letting go of the line: the pin is driven high and the pull-up
/// (or the sensor) determines the level. Switching to output does nothing
/// until the next [`DataPin::write`].
#[derive(Debug)]
pub struct OpenDrain<P> {
    pin: P,
}

impl<P> OpenDrain<P>
where
    P: InputPin + OutputPin,
{
    /// Wraps an open-drain GPIO.
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Gives the GPIO back.
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: ErrorType> ErrorType for OpenDrain<P> {
    type Error = P::Error;
}

impl<P> DataPin for OpenDrain<P>
where
    P: InputPin + OutputPin,
{
    fn set_mode(&mut self, mode: PinMode) -> Result<(), Self::Error> {
        match mode {
            PinMode::Input => self.pin.set_high(),
            PinMode::Output => Ok(()),
        }
    }

    fn write(&mut self, state: PinState) -> Result<(), Self::Error> {
        self.pin.set_state(state)
    }

    fn read(&mut self) -> Result<bool, Self::Error> {
        self.pin.is_high()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTx,
    };

    #[test]
    fn test_open_drain_releases_line_on_input() {
        let mut pin = PinMock::new(&[
            PinTx::set(PinState::Low),
            PinTx::set(PinState::High),
            PinTx::get(PinState::Low),
        ]);

        let mut line = OpenDrain::new(pin.clone());
        line.set_mode(PinMode::Output).unwrap();
        line.write(embedded_hal::digital::PinState::Low).unwrap();
        line.set_mode(PinMode::Input).unwrap();
        assert!(!line.read().unwrap());

        pin.done();
    }

    #[test]
    fn test_data_pin_through_mut_ref() {
        let mut pin = PinMock::new(&[PinTx::get(PinState::High)]);

        let mut line = OpenDrain::new(pin.clone());
        let mut borrowed = &mut line;
        assert!(DataPin::read(&mut borrowed).unwrap());

        pin.done();
    }
}
