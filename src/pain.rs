use core::fmt::{self, Display};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How inconvenient a meeting hour is for one person.
/// Tiers are ordered from least to most painful.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PainTier {
    Ideal,
    Annoying,
    Painful,
    Toxic,
    Conflict,
}

impl PainTier {
    pub const ALL: [PainTier; 5] = [
        PainTier::Ideal,
        PainTier::Annoying,
        PainTier::Painful,
        PainTier::Toxic,
        PainTier::Conflict,
    ];

    /// Classifies a local wall-clock hour.
    /// A calendar conflict overrides the time of day entirely.
    ///
    /// Hours are bucketed on half-open intervals:
    /// `[9, 17)` Ideal, `[7, 9)` and `[17, 19)` Annoying,
    /// `[5, 7)` and `[19, 22)` Painful, everything else Toxic.
    ///
    /// # Examples
    /// ```
    /// use nync_libs::pain::PainTier;
    ///
    /// assert_eq!(PainTier::classify(9, false), PainTier::Ideal);
    /// assert_eq!(PainTier::classify(17, false), PainTier::Annoying);
    /// assert_eq!(PainTier::classify(6, false), PainTier::Painful);
    /// assert_eq!(PainTier::classify(22, false), PainTier::Toxic);
    /// assert_eq!(PainTier::classify(12, true), PainTier::Conflict);
    /// ```
    pub fn classify(local_hour: u32, is_blocked: bool) -> PainTier {
        if is_blocked {
            return PainTier::Conflict;
        }

        match local_hour {
            9..=16 => PainTier::Ideal,
            7..=8 | 17..=18 => PainTier::Annoying,
            5..=6 | 19..=21 => PainTier::Painful,
            _ => PainTier::Toxic,
        }
    }

    /// Pain points charged for a meeting in this tier.
    pub fn points(self) -> u32 {
        match self {
            PainTier::Ideal => 0,
            PainTier::Annoying => 2,
            PainTier::Painful => 3,
            PainTier::Toxic => 10,
            PainTier::Conflict => 100,
        }
    }

    pub fn is_conflict(self) -> bool {
        self == PainTier::Conflict
    }
}

impl Display for PainTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PainTier::Ideal => "ideal",
            PainTier::Annoying => "annoying",
            PainTier::Painful => "painful",
            PainTier::Toxic => "toxic",
            PainTier::Conflict => "conflict",
        };
        f.write_str(label)
    }
}

/// Pain points for meeting at `local_hour` (0-23).
///
/// # Examples
/// ```
/// use nync_libs::pain::score;
///
/// assert_eq!(score(10, false), 0);
/// assert_eq!(score(8, false), 2);
/// assert_eq!(score(20, false), 3);
/// assert_eq!(score(3, false), 10);
/// assert_eq!(score(10, true), 100);
/// ```
pub fn score(local_hour: u32, is_blocked: bool) -> u32 {
    PainTier::classify(local_hour, is_blocked).points()
}
