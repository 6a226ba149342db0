//! Monotonic microsecond time source.

use core::ops::Add;

/// An instant on a free-running 32-bit microsecond counter.
///
/// The counter wraps roughly every 71 minutes. Comparisons go through
/// [`Microseconds::has_reached`], which stays correct across the wrap as long
/// as the two instants are less than 2^31 µs apart.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Microseconds(pub u32);

impl Microseconds {
    /// Returns `true` once `self` is at or past `deadline`.
    pub fn has_reached(self, deadline: Microseconds) -> bool {
        // 10 - 4294967290 = 16 with wrapping arithmetic
        self.0.wrapping_sub(deadline.0) as i32 >= 0
    }

    /// Microseconds elapsed from `earlier` to `self`.
    pub fn elapsed_since(self, earlier: Microseconds) -> u32 {
        self.0.wrapping_sub(earlier.0)
    }
}

impl Add<u32> for Microseconds {
    type Output = Microseconds;

    fn add(self, us: u32) -> Microseconds {
        Microseconds(self.0.wrapping_add(us))
    }
}

/// A monotonic clock with microsecond resolution.
pub trait MicrosClock {
    /// One-time initialisation of the time source.
    ///
    /// Platforms with an always-running counter can keep the default no-op.
    fn begin(&mut self) {}

    /// Current value of the counter. Allowed to wrap.
    fn now(&self) -> Microseconds;
}

/// Lets several users share one clock. `begin` is a no-op through a shared
/// reference; initialise the clock itself before handing it out.
impl<T: MicrosClock + ?Sized> MicrosClock for &T {
    fn now(&self) -> Microseconds {
        (**self).now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_reached() {
        let deadline = Microseconds(1_000);
        assert!(!Microseconds(999).has_reached(deadline));
        assert!(Microseconds(1_000).has_reached(deadline));
        assert!(Microseconds(1_001).has_reached(deadline));
    }

    #[test]
    fn test_has_reached_across_wrap() {
        let start = Microseconds(u32::MAX - 10);
        let deadline = start + 40;
        assert_eq!(deadline, Microseconds(29));

        assert!(!start.has_reached(deadline));
        assert!(!Microseconds(u32::MAX).has_reached(deadline));
        assert!(!Microseconds(28).has_reached(deadline));
        assert!(Microseconds(29).has_reached(deadline));
        assert_eq!(Microseconds(29).elapsed_since(start), 40);
    }
}
