use crate::roster::RosterMember;
use chrono::{DateTime, Duration, DurationRound, Utc};
use log::{debug, warn};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

/// Truncates an instant down to the start of its UTC hour.
pub fn truncate_to_hour(instant: DateTime<Utc>) -> DateTime<Utc> {
    instant
        .duration_trunc(Duration::hours(1))
        .unwrap_or(instant)
}

/// Half-open `[start, end)` UTC interval.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Interval {
        Interval { start, end }
    }

    /// The 24 hours following `day_start`.
    pub fn day(day_start: DateTime<Utc>) -> Interval {
        Interval::new(day_start, day_start + Duration::hours(24))
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }

    /// Every UTC hour bucket this interval touches, whole or partial.
    ///
    /// # Examples
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use nync_libs::busy::Interval;
    ///
    /// let event = Interval::new(
    ///     Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 0).unwrap(),
    ///     Utc.with_ymd_and_hms(2024, 5, 1, 12, 15, 0).unwrap(),
    /// );
    ///
    /// assert_eq!(
    ///     event.hour_buckets().collect::<Vec<_>>(),
    ///     vec![
    ///         Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
    ///         Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap(),
    ///         Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ///     ]
    /// );
    /// ```
    pub fn hour_buckets(&self) -> impl Iterator<Item = DateTime<Utc>> {
        let end = self.end;
        let first = if self.is_empty() {
            None
        } else {
            Some(truncate_to_hour(self.start))
        };

        std::iter::successors(first, |bucket| Some(*bucket + Duration::hours(1)))
            .take_while(move |bucket| *bucket < end)
    }
}

/// Hour-truncated UTC instants during which one member is busy.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusyHours(BTreeSet<DateTime<Utc>>);

impl BusyHours {
    pub fn new() -> BusyHours {
        BusyHours(BTreeSet::new())
    }

    /// Expands calendar events into the hours they occupy.
    pub fn from_events<'a, I>(events: I) -> BusyHours
    where
        I: IntoIterator<Item = &'a Interval>,
    {
        events
            .into_iter()
            .flat_map(|event| event.hour_buckets())
            .collect()
    }

    pub fn insert(&mut self, instant: DateTime<Utc>) -> bool {
        self.0.insert(truncate_to_hour(instant))
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.0.contains(&truncate_to_hour(instant))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.0.iter()
    }

    /// Drops every hour outside of `window`.
    pub fn retain_within(&mut self, window: &Interval) {
        self.0.retain(|hour| window.contains(*hour));
    }
}

impl std::iter::FromIterator<DateTime<Utc>> for BusyHours {
    fn from_iter<T: IntoIterator<Item = DateTime<Utc>>>(iter: T) -> Self {
        BusyHours(iter.into_iter().map(truncate_to_hour).collect())
    }
}

impl Extend<DateTime<Utc>> for BusyHours {
    fn extend<T: IntoIterator<Item = DateTime<Utc>>>(&mut self, iter: T) {
        self.0.extend(iter.into_iter().map(truncate_to_hour));
    }
}

/// Member id -> busy hours. Members without an entry are never blocked.
pub type BusyMap = HashMap<String, BusyHours>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Calendar access for {member} is not authorized")]
    Unauthorized { member: String },
    #[error("Calendar provider unavailable: {0}")]
    Unavailable(String),
}

/// A calendar backend able to report when a user is busy.
pub trait CalendarProvider {
    fn name(&self) -> &str;

    /// Busy hour instants for `member_id` within `window`.
    /// An event spanning several hours reports one instant per hour it touches.
    fn busy_hours(
        &self,
        member_id: &str,
        window: &Interval,
    ) -> Result<Vec<DateTime<Utc>>, ProviderError>;
}

/// Queries every provider for every registered member over the day starting
/// at `day_start`, and unions the results.
///
/// Provider failures are logged and treated as "no busy hours": the analyzer
/// cannot tell an empty calendar from an unreachable one, so a failing
/// provider must never block scheduling.
pub fn collect_busy_map(
    roster: &[RosterMember],
    providers: &[&dyn CalendarProvider],
    day_start: DateTime<Utc>,
) -> BusyMap {
    let window = Interval::day(day_start);

    roster
        .iter()
        .filter(|member| member.has_calendar())
        .filter_map(|member| {
            let mut hours = BusyHours::new();

            for provider in providers {
                match provider.busy_hours(&member.id, &window) {
                    Ok(found) => {
                        debug!(
                            "{} reported {} busy hours for {}",
                            provider.name(),
                            found.len(),
                            member.id
                        );
                        hours.extend(found);
                    }
                    Err(e) => warn!("{} failed for {}: {}", provider.name(), member.id, e),
                }
            }

            hours.retain_within(&window);

            if hours.is_empty() {
                None
            } else {
                Some((member.id.clone(), hours))
            }
        })
        .collect()
}
