use crate::busy::BusyMap;
use crate::config::AnalysisOptions;
use crate::pain::PainTier;
use crate::roster::{hour_in, RosterMember};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use itertools::{Itertools, MinMaxResult};
use log::{debug, info, trace, warn};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

pub const HOURS_PER_DAY: u32 = 24;

/// Number of ranked scenarios handed back unless configured otherwise.
pub const DEFAULT_TOP_SLOTS: usize = 3;

/// Member id -> lifetime pain points for a team. Missing members count as 0.
pub type HistoryMap = HashMap<String, u32>;

/// UTC midnight starting `date`.
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// What one candidate hour would cost a single member.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberPain {
    pub name: String,
    #[cfg_attr(feature = "serde", serde(rename = "localHour"))]
    pub local_hour: u32,
    pub tier: PainTier,
    pub pain: u32,
    pub blocked: bool,
}

/// One candidate UTC start hour and what it would cost the team.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    #[cfg_attr(feature = "serde", serde(rename = "utcHour"))]
    pub utc_hour: u32,
    pub start: DateTime<Utc>,
    #[cfg_attr(feature = "serde", serde(rename = "totalPain"))]
    pub total_pain: u32,
    /// Spread between the highest and lowest lifetime balance the team
    /// would carry if this hour were booked.
    pub gap: u32,
    #[cfg_attr(feature = "serde", serde(rename = "hasConflict"))]
    pub has_conflict: bool,
    pub breakdown: BTreeMap<String, MemberPain>,
}

impl Scenario {
    /// Sort key: conflicts last, then the smallest karma gap, then the least
    /// total pain.
    pub fn rank_key(&self) -> (bool, u32, u32) {
        (self.has_conflict, self.gap, self.total_pain)
    }

    /// Compares two scenarios by fairness.
    ///
    /// # Examples
    /// ```
    /// use chrono::{TimeZone, Utc};
    /// use nync_libs::analysis::Scenario;
    /// use std::cmp::Ordering;
    /// use std::collections::BTreeMap;
    ///
    /// let slot = |utc_hour, total_pain, gap, has_conflict| Scenario {
    ///     utc_hour,
    ///     start: Utc.with_ymd_and_hms(2024, 1, 1, utc_hour, 0, 0).unwrap(),
    ///     total_pain,
    ///     gap,
    ///     has_conflict,
    ///     breakdown: BTreeMap::new(),
    /// };
    ///
    /// // Fairness beats efficiency
    /// assert_eq!(slot(1, 20, 0, false).cmp_rank(&slot(2, 0, 10, false)), Ordering::Less);
    /// // Any conflict beats both
    /// assert_eq!(slot(3, 100, 0, true).cmp_rank(&slot(4, 40, 40, false)), Ordering::Greater);
    /// ```
    pub fn cmp_rank(&self, other: &Self) -> Ordering {
        self.rank_key().cmp(&other.rank_key())
    }
}

/// Evaluates every UTC hour of a day for a roster and ranks them by fairness.
///
/// All inputs are borrowed snapshots. Nothing is fetched, cached or mutated.
#[derive(Debug)]
pub struct Analyzer<'a> {
    roster: &'a [RosterMember],
    zones: Vec<Option<Tz>>,
    busy: &'a BusyMap,
    history: &'a HistoryMap,
    limit: usize,
}

impl<'a> Analyzer<'a> {
    pub fn new(roster: &'a [RosterMember], busy: &'a BusyMap, history: &'a HistoryMap) -> Self {
        let zones = roster
            .iter()
            .map(|member| {
                let zone = member.tz();
                if zone.is_none() {
                    warn!(
                        "Unknown time zone {:?} for {}, using UTC hours",
                        member.timezone, member.id
                    );
                }
                zone
            })
            .collect();

        Analyzer {
            roster,
            zones,
            busy,
            history,
            limit: DEFAULT_TOP_SLOTS,
        }
    }

    /// How many ranked scenarios `rank` returns. `0` returns all of them.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_options(self, options: &AnalysisOptions) -> Self {
        self.with_limit(options.top_slots)
    }

    /// Builds the scenario for starting at `utc_hour` on the day beginning at
    /// `day_start`.
    pub fn scenario(&self, day_start: DateTime<Utc>, utc_hour: u32) -> Scenario {
        let start = day_start + Duration::hours(i64::from(utc_hour));

        let mut total_pain: u32 = 0;
        let mut has_conflict = false;
        let mut projected = Vec::with_capacity(self.roster.len());
        let mut breakdown = BTreeMap::new();

        for (member, zone) in self.roster.iter().zip(self.zones.iter()) {
            let local_hour = hour_in(zone.as_ref(), start);
            let blocked = self
                .busy
                .get(&member.id)
                .map_or(false, |hours| hours.contains(start));

            let tier = PainTier::classify(local_hour, blocked);
            let pain = tier.points();

            total_pain = total_pain.saturating_add(pain);
            has_conflict |= tier.is_conflict();

            let balance = self.history.get(&member.id).copied().unwrap_or(0);
            projected.push(balance.saturating_add(pain));

            trace!(
                "{:02}:00 UTC {} local {:02}:00 {} (+{})",
                utc_hour,
                member.id,
                local_hour,
                tier,
                pain
            );

            breakdown.insert(
                member.id.clone(),
                MemberPain {
                    name: member.display_name.clone(),
                    local_hour,
                    tier,
                    pain,
                    blocked,
                },
            );
        }

        let gap = match projected.iter().minmax() {
            MinMaxResult::MinMax(min, max) => max - min,
            MinMaxResult::OneElement(_) | MinMaxResult::NoElements => 0,
        };

        debug!(
            "{:02}:00 UTC total pain {} gap {} conflict {}",
            utc_hour, total_pain, gap, has_conflict
        );

        Scenario {
            utc_hour,
            start,
            total_pain,
            gap,
            has_conflict,
            breakdown,
        }
    }

    /// All 24 scenarios in hour order, unranked.
    pub fn scenarios(&self, day_start: DateTime<Utc>) -> Vec<Scenario> {
        #[cfg(feature = "rayon")]
        let scenarios = (0..HOURS_PER_DAY)
            .into_par_iter()
            .map(|hour| self.scenario(day_start, hour))
            .collect();

        #[cfg(not(feature = "rayon"))]
        let scenarios = (0..HOURS_PER_DAY)
            .map(|hour| self.scenario(day_start, hour))
            .collect();

        scenarios
    }

    /// Ranks the day's candidate hours, best first.
    ///
    /// The sort is stable over hour order, so equally ranked hours come back
    /// earliest first.
    pub fn rank(&self, day_start: DateTime<Utc>) -> Vec<Scenario> {
        let mut scenarios = self.scenarios(day_start);
        scenarios.sort_by(Scenario::cmp_rank);

        if self.limit > 0 {
            scenarios.truncate(self.limit);
        }

        if let Some(best) = scenarios.first() {
            info!(
                "Best slot for {} members on {}: {:02}:00 UTC (pain {}, gap {})",
                self.roster.len(),
                day_start.format("%Y-%m-%d"),
                best.utc_hour,
                best.total_pain,
                best.gap
            );
        }

        scenarios
    }
}

/// Finds the three fairest UTC start hours on the day beginning at
/// `day_start`, best first.
///
/// Candidates with any calendar conflict rank after every conflict-free
/// candidate. Among the rest, the hour that leaves the team's lifetime pain
/// balances closest together wins, and total pain breaks the remaining ties.
///
/// `day_start` is expected to be UTC midnight. It is not checked.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use nync_libs::analysis::{analyze, day_start, HistoryMap};
/// use nync_libs::busy::BusyMap;
/// use nync_libs::roster::RosterMember;
///
/// let roster = vec![
///     RosterMember::user("ada", "Ada", "Europe/London"),
///     RosterMember::user("grace", "Grace", "America/New_York"),
/// ];
/// let day = day_start(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
///
/// let top = analyze(&roster, &BusyMap::new(), day, &HistoryMap::new());
///
/// assert_eq!(top.len(), 3);
/// assert_eq!(top[0].total_pain, 0);
/// assert!(top.iter().all(|s| s.breakdown.len() == 2));
/// ```
pub fn analyze(
    roster: &[RosterMember],
    busy: &BusyMap,
    day_start: DateTime<Utc>,
    history: &HistoryMap,
) -> Vec<Scenario> {
    Analyzer::new(roster, busy, history).rank(day_start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::busy::BusyHours;

    fn day() -> DateTime<Utc> {
        day_start(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap())
    }

    #[test]
    fn midnight_of_date() {
        assert_eq!(day(), Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn scenarios_cover_every_hour_in_order() {
        let roster = vec![RosterMember::user("a", "A", "UTC")];
        let busy = BusyMap::new();
        let history = HistoryMap::new();

        let hours: Vec<u32> = Analyzer::new(&roster, &busy, &history)
            .scenarios(day())
            .iter()
            .map(|s| s.utc_hour)
            .collect();

        assert_eq!(hours, (0..24).collect::<Vec<_>>());
    }

    #[test]
    fn scenario_records_local_view() {
        let roster = vec![
            RosterMember::user("tokyo", "Kenji", "Asia/Tokyo"),
            RosterMember::placeholder("berlin", "Lena", "Europe/Berlin"),
        ];
        let mut busy = BusyMap::new();
        busy.insert(
            "tokyo".to_string(),
            vec![day() + Duration::hours(1)].into_iter().collect::<BusyHours>(),
        );
        let history = HistoryMap::new();

        let scenario = Analyzer::new(&roster, &busy, &history).scenario(day(), 1);

        let tokyo = &scenario.breakdown["tokyo"];
        assert_eq!(tokyo.name, "Kenji");
        assert_eq!(tokyo.local_hour, 10);
        assert!(tokyo.blocked);
        assert_eq!(tokyo.tier, PainTier::Conflict);
        assert_eq!(tokyo.pain, 100);

        let berlin = &scenario.breakdown["berlin"];
        assert_eq!(berlin.local_hour, 2);
        assert!(!berlin.blocked);
        assert_eq!(berlin.pain, 10);

        assert_eq!(scenario.total_pain, 110);
        assert_eq!(scenario.gap, 90);
        assert!(scenario.has_conflict);
    }

    #[test]
    fn zero_limit_returns_every_hour() {
        let roster = vec![RosterMember::user("a", "A", "UTC")];
        let busy = BusyMap::new();
        let history = HistoryMap::new();

        let all = Analyzer::new(&roster, &busy, &history)
            .with_limit(0)
            .rank(day());
        assert_eq!(all.len(), 24);

        let one = Analyzer::new(&roster, &busy, &history)
            .with_limit(1)
            .rank(day());
        assert_eq!(one.len(), 1);
        assert_eq!(one[0], all[0]);
    }

    #[test]
    fn options_set_the_limit() {
        let roster = vec![RosterMember::user("a", "A", "UTC")];
        let busy = BusyMap::new();
        let history = HistoryMap::new();
        let options = AnalysisOptions {
            top_slots: 5,
            ..AnalysisOptions::default()
        };

        let ranked = Analyzer::new(&roster, &busy, &history)
            .with_options(&options)
            .rank(day());
        assert_eq!(ranked.len(), 5);
    }

    #[test]
    fn conflict_flag_does_not_depend_on_total() {
        // Twelve members at Toxic hours reach 120 points without a conflict
        let roster: Vec<RosterMember> = (0..12)
            .map(|i| RosterMember::user(&i.to_string(), "Night Owl", "UTC"))
            .collect();
        let busy = BusyMap::new();
        let history = HistoryMap::new();

        let scenario = Analyzer::new(&roster, &busy, &history).scenario(day(), 2);

        assert_eq!(scenario.total_pain, 120);
        assert!(!scenario.has_conflict);
    }

    #[test]
    fn saturating_balances() {
        let roster = vec![
            RosterMember::user("a", "A", "UTC"),
            RosterMember::user("b", "B", "UTC"),
        ];
        let busy = BusyMap::new();
        let history: HistoryMap = vec![("a".to_string(), u32::MAX)].into_iter().collect();

        let scenario = Analyzer::new(&roster, &busy, &history).scenario(day(), 0);

        assert_eq!(scenario.gap, u32::MAX - 10);
    }
}
