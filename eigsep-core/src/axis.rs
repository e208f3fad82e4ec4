//! Axis identifiers
//!
//! The mount has exactly two independently driven axes. All per-axis
//! state in the workspace is keyed by [`Axis`] and stored in a
//! [`PerAxis`] container so that an invalid axis can never be indexed.

use core::fmt;
use core::ops::{Index, IndexMut};
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One of the two motion channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Axis {
    /// Azimuth
    Az,
    /// Altitude (elevation)
    Alt,
}

/// Errors raised at the axis API boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisError {
    /// Identifier does not name an axis
    InvalidAxis,
}

impl fmt::Display for AxisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisError::InvalidAxis => f.write_str("invalid axis, must be `az` or `alt`"),
        }
    }
}

impl core::error::Error for AxisError {}

impl Axis {
    /// Both axes in wire order (az, alt)
    pub const ALL: [Axis; 2] = [Axis::Az, Axis::Alt];

    /// Position of this axis in wire order
    pub const fn index(self) -> usize {
        match self {
            Axis::Az => 0,
            Axis::Alt => 1,
        }
    }

    /// Short lowercase name, as used in configuration files
    pub const fn name(self) -> &'static str {
        match self {
            Axis::Az => "az",
            Axis::Alt => "alt",
        }
    }

    /// The other axis
    pub const fn other(self) -> Axis {
        match self {
            Axis::Az => Axis::Alt,
            Axis::Alt => Axis::Az,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Axis {
    type Err = AxisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "az" | "azimuth" => Ok(Axis::Az),
            // "el" is what the operator-facing tools have always called it
            "alt" | "el" | "altitude" | "elevation" => Ok(Axis::Alt),
            _ => Err(AxisError::InvalidAxis),
        }
    }
}

impl TryFrom<u8> for Axis {
    type Error = AxisError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Axis::Az),
            1 => Ok(Axis::Alt),
            _ => Err(AxisError::InvalidAxis),
        }
    }
}

/// A value stored once per axis
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PerAxis<T> {
    pub az: T,
    pub alt: T,
}

impl<T> PerAxis<T> {
    /// Create from explicit values
    pub const fn new(az: T, alt: T) -> Self {
        Self { az, alt }
    }

    /// Build each entry from its axis
    pub fn from_fn(mut f: impl FnMut(Axis) -> T) -> Self {
        Self {
            az: f(Axis::Az),
            alt: f(Axis::Alt),
        }
    }

    /// Map each entry to a new value
    pub fn map<U>(self, mut f: impl FnMut(Axis, T) -> U) -> PerAxis<U> {
        PerAxis {
            az: f(Axis::Az, self.az),
            alt: f(Axis::Alt, self.alt),
        }
    }

    /// Iterate entries in wire order
    pub fn iter(&self) -> impl Iterator<Item = (Axis, &T)> {
        [(Axis::Az, &self.az), (Axis::Alt, &self.alt)].into_iter()
    }
}

impl<T: Copy> PerAxis<T> {
    /// Same value for both axes
    pub const fn splat(value: T) -> Self {
        Self {
            az: value,
            alt: value,
        }
    }
}

impl<T> Index<Axis> for PerAxis<T> {
    type Output = T;

    fn index(&self, axis: Axis) -> &T {
        match axis {
            Axis::Az => &self.az,
            Axis::Alt => &self.alt,
        }
    }
}

impl<T> IndexMut<Axis> for PerAxis<T> {
    fn index_mut(&mut self, axis: Axis) -> &mut T {
        match axis {
            Axis::Az => &mut self.az,
            Axis::Alt => &mut self.alt,
        }
    }
}

/// A subset of {az, alt}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisSet {
    az: bool,
    alt: bool,
}

impl AxisSet {
    /// No axes
    pub const EMPTY: Self = Self {
        az: false,
        alt: false,
    };

    /// Both axes
    pub const BOTH: Self = Self { az: true, alt: true };

    /// A set containing a single axis
    pub const fn only(axis: Axis) -> Self {
        match axis {
            Axis::Az => Self {
                az: true,
                alt: false,
            },
            Axis::Alt => Self {
                az: false,
                alt: true,
            },
        }
    }

    /// Add an axis to the set
    pub fn insert(&mut self, axis: Axis) {
        match axis {
            Axis::Az => self.az = true,
            Axis::Alt => self.alt = true,
        }
    }

    /// Check membership
    pub const fn contains(&self, axis: Axis) -> bool {
        match axis {
            Axis::Az => self.az,
            Axis::Alt => self.alt,
        }
    }

    /// Check if no axis is selected
    pub const fn is_empty(&self) -> bool {
        !self.az && !self.alt
    }

    /// Iterate the selected axes in wire order
    pub fn iter(self) -> impl Iterator<Item = Axis> {
        Axis::ALL.into_iter().filter(move |a| self.contains(*a))
    }
}

impl From<Axis> for AxisSet {
    fn from(axis: Axis) -> Self {
        AxisSet::only(axis)
    }
}
