use serde::Serialize;
use std::fmt;
use std::ops::{Add, Sub};

/// Capture timestamp, relative to the UNIX epoch
///
/// Panic-free replacement of `std::time::Duration` covering what capture files
/// carry: whole seconds plus microseconds. A null value means "no timestamp".
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug, Serialize)]
pub struct Duration {
    pub secs: u32,
    pub micros: u32,
}

pub const MICROS_PER_SEC: u32 = 1_000_000;

impl Duration {
    /// Build Duration from secs and micros
    ///
    /// Microseconds above one second are carried into `secs`.
    pub fn new(secs: u32, micros: u32) -> Duration {
        Duration {
            secs: secs.wrapping_add(micros / MICROS_PER_SEC),
            micros: micros % MICROS_PER_SEC,
        }
    }

    /// Build Duration from a number of seconds and a fraction expressed in `unit` ticks
    /// per second (for ex. 1_000_000_000 for nanosecond resolution)
    pub fn from_fraction(secs: u32, frac: u64, unit: u64) -> Duration {
        let micros = match unit {
            0 => 0,
            u if u >= MICROS_PER_SEC as u64 => frac / (u / MICROS_PER_SEC as u64),
            u => frac.saturating_mul(MICROS_PER_SEC as u64 / u),
        };
        let carry = micros / MICROS_PER_SEC as u64;
        let micros = (micros % MICROS_PER_SEC as u64) as u32;
        Duration {
            secs: secs.wrapping_add(carry as u32),
            micros,
        }
    }

    /// Test if Duration object is null
    #[inline]
    pub fn is_null(self) -> bool {
        self.secs == 0 && self.micros == 0
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{:06}", self.secs, self.micros)
    }
}

impl Add for Duration {
    type Output = Duration;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn add(self, other: Duration) -> Self::Output {
        let secs = self.secs.wrapping_add(other.secs);
        let micros = self.micros.wrapping_add(other.micros);
        Duration::new(secs, micros)
    }
}

impl Sub for Duration {
    type Output = Duration;

    #[allow(clippy::suspicious_arithmetic_impl)]
    fn sub(self, other: Duration) -> Self::Output {
        let secs = self.secs.wrapping_sub(other.secs);
        if self.micros >= other.micros {
            Duration {
                secs,
                micros: self.micros - other.micros,
            }
        } else {
            Duration {
                secs: secs.wrapping_sub(1),
                micros: MICROS_PER_SEC - (other.micros - self.micros),
            }
        }
    }
}
