use core::fmt;

/// Possible errors from the DHT22 driver.
#[derive(Debug, PartialEq, Eq)]
pub enum DhtError<E> {
    /// No edge was seen within the configured stall timeout.
    Timeout,
    /// Checksum did not match the received data.
    ChecksumMismatch {
        /// Checksum byte sent by the sensor.
        expected: u8,
        /// Wrapping sum of the four data bytes.
        calculated: u8,
    },
    /// Error from the GPIO pin (input/output).
    PinError(E),
}

impl<E> From<E> for DhtError<E> {
    fn from(value: E) -> Self {
        Self::PinError(value)
    }
}

impl<E: fmt::Debug> fmt::Display for DhtError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DhtError::Timeout => f.write_str("timed out waiting for the sensor"),
            DhtError::ChecksumMismatch {
                expected,
                calculated,
            } => write!(
                f,
                "checksum mismatch (expected {expected:#04x}, calculated {calculated:#04x})"
            ),
            DhtError::PinError(err) => write!(f, "pin error: {err:?}"),
        }
    }
}
