//! Common transfer rates, in bits per second.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A transfer rate in bits per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct BitRate(pub u64);

impl BitRate {
    pub const fn bits_per_second(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn kbps(kilobits: u64) -> Self {
        Self(kilobits * 1_000)
    }

    pub const fn mbps(megabits: u64) -> Self {
        Self(megabits * 1_000_000)
    }

    pub const fn two_g() -> Self {
        Self::kbps(64)
    }

    pub const fn three_g() -> Self {
        Self::mbps(2)
    }

    pub const fn four_g() -> Self {
        Self::mbps(64)
    }

    pub const fn five_g() -> Self {
        Self::mbps(512)
    }

    pub const fn ten_megabit() -> Self {
        Self::mbps(10)
    }

    pub const fn hundred_megabit() -> Self {
        Self::mbps(100)
    }

    pub const fn one_gigabit() -> Self {
        Self::mbps(1_000)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for BitRate {
    fn from(bits: u64) -> Self {
        Self(bits)
    }
}

impl fmt::Display for BitRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            b if b >= 1_000_000 && b % 1_000_000 == 0 => write!(f, "{}Mbps", b / 1_000_000),
            b if b >= 1_000 && b % 1_000 == 0 => write!(f, "{}kbps", b / 1_000),
            b => write!(f, "{b}bps"),
        }
    }
}
