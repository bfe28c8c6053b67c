// src/models/game.rs

//! Game catalogue: zone layouts, start years and draw calendars.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// One group of numbers drawn from a fixed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneSpec {
    /// Label used in reports ("red", "blue", ...)
    pub label: &'static str,
    /// Exact number of values in the zone
    pub count: usize,
    pub min: u8,
    pub max: u8,
    /// Values must be distinct within the zone
    pub unique: bool,
    /// Candidates may not contain three or more consecutive values
    pub run_restricted: bool,
}

impl ZoneSpec {
    /// Number of values the zone can take.
    pub fn size(&self) -> usize {
        usize::from(self.max - self.min) + 1
    }

    /// All values in ascending order.
    pub fn values(&self) -> RangeInclusive<u8> {
        self.min..=self.max
    }

    pub fn contains(&self, value: u8) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Largest value of the low half.
    pub fn low_high_split(&self) -> u8 {
        self.min + ((self.max - self.min) / 2)
    }
}

/// Zone layout of a game.
#[derive(Debug, Clone, Copy)]
pub struct GameSpec {
    pub primary: ZoneSpec,
    /// Absent for single-zone games
    pub secondary: Option<ZoneSpec>,
    /// Secondary values may not repeat a primary value
    pub secondary_excludes_primary: bool,
}

impl GameSpec {
    /// Zones in draw order.
    pub fn zones(&self) -> Vec<ZoneSpec> {
        std::iter::once(self.primary).chain(self.secondary).collect()
    }
}

/// Supported lottery games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    /// Double Color Ball
    Ssq,
    /// Super Lotto
    Dlt,
    /// Seven Happy
    Qlc,
    /// Seven Star
    Qxc,
}

const SSQ: GameSpec = GameSpec {
    primary: ZoneSpec {
        label: "red",
        count: 6,
        min: 1,
        max: 33,
        unique: true,
        run_restricted: true,
    },
    secondary: Some(ZoneSpec {
        label: "blue",
        count: 1,
        min: 1,
        max: 16,
        unique: true,
        run_restricted: false,
    }),
    secondary_excludes_primary: false,
};

const DLT: GameSpec = GameSpec {
    primary: ZoneSpec {
        label: "front",
        count: 5,
        min: 1,
        max: 35,
        unique: true,
        run_restricted: true,
    },
    secondary: Some(ZoneSpec {
        label: "back",
        count: 2,
        min: 1,
        max: 12,
        unique: true,
        run_restricted: false,
    }),
    secondary_excludes_primary: false,
};

const QLC: GameSpec = GameSpec {
    primary: ZoneSpec {
        label: "basic",
        count: 7,
        min: 1,
        max: 30,
        unique: true,
        run_restricted: true,
    },
    secondary: Some(ZoneSpec {
        label: "special",
        count: 1,
        min: 1,
        max: 30,
        unique: true,
        run_restricted: false,
    }),
    secondary_excludes_primary: true,
};

const QXC: GameSpec = GameSpec {
    primary: ZoneSpec {
        label: "digits",
        count: 7,
        min: 0,
        max: 9,
        unique: false,
        run_restricted: false,
    },
    secondary: None,
    secondary_excludes_primary: false,
};

impl GameKind {
    pub const ALL: [GameKind; 4] = [Self::Ssq, Self::Dlt, Self::Qlc, Self::Qxc];

    /// Short code used in storage keys and on the command line.
    pub fn code(self) -> &'static str {
        match self {
            Self::Ssq => "ssq",
            Self::Dlt => "dlt",
            Self::Qlc => "qlc",
            Self::Qxc => "qxc",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Ssq => "Double Color Ball (SSQ)",
            Self::Dlt => "Super Lotto (DLT)",
            Self::Qlc => "Seven Happy (QLC)",
            Self::Qxc => "Seven Star (QXC)",
        }
    }

    pub fn spec(self) -> &'static GameSpec {
        match self {
            Self::Ssq => &SSQ,
            Self::Dlt => &DLT,
            Self::Qlc => &QLC,
            Self::Qxc => &QXC,
        }
    }

    /// Earliest year any source publishes for this game.
    pub fn start_year(self) -> i32 {
        match self {
            Self::Ssq => 2003,
            Self::Dlt => 2007,
            Self::Qlc => 2007,
            Self::Qxc => 2004,
        }
    }

    /// Weekdays on which draws take place.
    pub fn draw_weekdays(self) -> &'static [Weekday] {
        match self {
            Self::Ssq => &[Weekday::Tue, Weekday::Thu, Weekday::Sun],
            Self::Dlt => &[Weekday::Mon, Weekday::Wed, Weekday::Sat],
            Self::Qlc => &[Weekday::Mon, Weekday::Wed, Weekday::Fri],
            Self::Qxc => &[Weekday::Tue, Weekday::Fri, Weekday::Sun],
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for GameKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|g| g.code() == code)
            .ok_or_else(|| {
                AppError::config(format!(
                    "Unknown game '{}', expected one of: ssq, dlt, qlc, qxc",
                    s
                ))
            })
    }
}
