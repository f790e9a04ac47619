use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Result, TimelineError};

/// First year of the timeline. Selecting it parks the monorail off the track.
pub const START_YEAR: i32 = 1970;
/// Last year of the timeline.
pub const END_YEAR: i32 = 1998;

/// Number of marker intervals on the track. The track spans
/// `START_YEAR + 1 ..= END_YEAR`.
const TRACK_STEPS: i32 = END_YEAR - START_YEAR - 1;

/// A year inside `[START_YEAR, END_YEAR]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Year(i32);

impl Year {
    pub const START: Year = Year(START_YEAR);
    pub const END: Year = Year(END_YEAR);

    /// Clamps an arbitrary value into the timeline range.
    pub fn clamped(value: i32) -> Self {
        Self(value.clamp(START_YEAR, END_YEAR))
    }

    /// Returns `None` when the value lies outside the timeline.
    pub fn new(value: i32) -> Option<Self> {
        (START_YEAR..=END_YEAR).contains(&value).then_some(Self(value))
    }

    pub fn get(self) -> i32 {
        self.0
    }

    pub fn is_start(self) -> bool {
        self.0 == START_YEAR
    }

    /// Every year of the timeline in ascending order.
    pub fn all() -> impl DoubleEndedIterator<Item = Year> {
        (START_YEAR..=END_YEAR).map(Year)
    }
}

impl TryFrom<i32> for Year {
    type Error = TimelineError;

    fn try_from(value: i32) -> Result<Self> {
        Year::new(value).ok_or_else(|| {
            TimelineError::config(format!(
                "year {value} is outside {START_YEAR}..={END_YEAR}"
            ))
        })
    }
}

impl From<Year> for i32 {
    fn from(value: Year) -> Self {
        value.0
    }
}

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Converts between slider pixel coordinates and years.
///
/// The marker step is rounded to whole pixels once, so `year_x` followed by
/// `year_from_x` is only guaranteed to round-trip while the accumulated
/// rounding error stays below half a marker. This matches the painted year
/// markers and is kept as is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearMapper {
    left: f64,
    width: f64,
    step: f64,
}

impl YearMapper {
    pub fn new(left: f64, width: f64) -> Result<Self> {
        if !left.is_finite() || !width.is_finite() || width <= 0.0 {
            return Err(TimelineError::config(format!(
                "slider track needs a finite left edge and positive width, \
                 got left={left} width={width}"
            )));
        }

        Ok(Self {
            left,
            width,
            step: (width / TRACK_STEPS as f64).round(),
        })
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Pixel distance between two adjacent year markers.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Maps a slider-relative x coordinate to a year.
    pub fn year_from_x(&self, x: f64) -> Year {
        if x < self.left {
            return Year::START;
        }
        if x > self.right() {
            return Year::END;
        }

        let offset = ((x - self.left) / self.width * TRACK_STEPS as f64).round() as i32;
        Year::clamped(START_YEAR + 1 + offset)
    }

    /// Marker position of `year`, or `None` for the off-track start year.
    pub fn year_x(&self, year: Year) -> Option<f64> {
        if year.is_start() {
            return None;
        }
        Some(self.left + self.step * (year.get() - START_YEAR - 1) as f64)
    }
}
