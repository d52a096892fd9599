use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use log::trace;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Signed-in user whose calendars can be queried.
    RegisteredUser,
    /// Team member added by name only. Has no calendar.
    Placeholder,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterMember {
    pub id: String,
    #[cfg_attr(feature = "serde", serde(rename = "displayName"))]
    pub display_name: String,
    #[cfg_attr(feature = "serde", serde(rename = "timezone"))]
    pub timezone: String,
    pub kind: MemberKind,
}

impl RosterMember {
    /// Constructs a member. `timezone` is an IANA name such as `Europe/Berlin`.
    pub fn new(id: &str, display_name: &str, timezone: &str, kind: MemberKind) -> RosterMember {
        RosterMember {
            id: id.to_string(),
            display_name: display_name.to_string(),
            timezone: timezone.to_string(),
            kind,
        }
    }

    pub fn user(id: &str, display_name: &str, timezone: &str) -> RosterMember {
        RosterMember::new(id, display_name, timezone, MemberKind::RegisteredUser)
    }

    pub fn placeholder(id: &str, display_name: &str, timezone: &str) -> RosterMember {
        RosterMember::new(id, display_name, timezone, MemberKind::Placeholder)
    }

    pub fn has_calendar(&self) -> bool {
        self.kind == MemberKind::RegisteredUser
    }

    /// Resolves the member's time zone, or `None` if the name is unknown.
    pub fn tz(&self) -> Option<Tz> {
        self.timezone.parse::<Tz>().ok()
    }

    /// Wall-clock hour for this member at `instant`.
    /// An unresolvable time zone falls back to the UTC hour.
    ///
    /// # Examples
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use nync_libs::roster::RosterMember;
    ///
    /// let instant = Utc.with_ymd_and_hms(2024, 1, 15, 14, 0, 0).unwrap();
    ///
    /// let tokyo = RosterMember::user("kenji", "Kenji", "Asia/Tokyo");
    /// assert_eq!(tokyo.local_hour(instant), 23);
    ///
    /// let lost = RosterMember::user("lost", "Lost", "Mars/Olympus_Mons");
    /// assert_eq!(lost.local_hour(instant), 14);
    /// ```
    pub fn local_hour(&self, instant: DateTime<Utc>) -> u32 {
        let hour = hour_in(self.tz().as_ref(), instant);
        trace!("{} ({}) local hour {}", self.id, self.timezone, hour);
        hour
    }
}

/// Hour of `instant` in `zone`, or the UTC hour when there is no zone.
pub fn hour_in(zone: Option<&Tz>, instant: DateTime<Utc>) -> u32 {
    match zone {
        Some(tz) => instant.with_timezone(tz).hour(),
        None => instant.hour(),
    }
}
