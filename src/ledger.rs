use crate::analysis::{HistoryMap, Scenario};
use chrono::NaiveDate;
use itertools::Itertools;
use log::{debug, info};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use thiserror::Error;

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum LedgerError {
    #[error("Nothing to record: the chosen scenario has no members")]
    EmptyBreakdown,
    #[error("Ledger storage failed: {0}")]
    Storage(String),
}

/// Pain charged to one member for one booked meeting.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    #[cfg_attr(feature = "serde", serde(rename = "teamId"))]
    pub team_id: String,
    #[cfg_attr(feature = "serde", serde(rename = "memberId"))]
    pub member_id: String,
    pub pain: u32,
    #[cfg_attr(feature = "serde", serde(rename = "meetingDate"))]
    pub meeting_date: NaiveDate,
}

/// Lifetime pain of one member, as shown on the leaderboard.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Standing {
    #[cfg_attr(feature = "serde", serde(rename = "memberId"))]
    pub member_id: String,
    #[cfg_attr(feature = "serde", serde(rename = "totalPain"))]
    pub total_pain: u32,
}

/// Append-only store of pain charged per team.
pub trait Ledger {
    fn append(&mut self, entries: &[LedgerEntry]) -> Result<(), LedgerError>;

    fn entries(&self, team_id: &str) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Sum of pain per member of `team_id`.
    fn history(&self, team_id: &str) -> Result<HistoryMap, LedgerError> {
        Ok(self
            .entries(team_id)?
            .into_iter()
            .fold(HistoryMap::new(), |mut totals, entry| {
                let total = totals.entry(entry.member_id).or_insert(0);
                *total = total.saturating_add(entry.pain);
                totals
            }))
    }
}

/// Ledger kept in process memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    entries: Vec<LedgerEntry>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        MemoryLedger::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Ledger for MemoryLedger {
    fn append(&mut self, entries: &[LedgerEntry]) -> Result<(), LedgerError> {
        self.entries.extend_from_slice(entries);
        Ok(())
    }

    fn entries(&self, team_id: &str) -> Result<Vec<LedgerEntry>, LedgerError> {
        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.team_id == team_id)
            .cloned()
            .collect())
    }
}

/// Records the pain of a booked scenario, one entry per member.
/// Returns the number of entries written.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use nync_libs::analysis::{analyze, day_start, HistoryMap};
/// use nync_libs::busy::BusyMap;
/// use nync_libs::ledger::{commit_booking, Ledger, MemoryLedger};
/// use nync_libs::roster::RosterMember;
///
/// let roster = vec![
///     RosterMember::user("ada", "Ada", "UTC"),
///     RosterMember::user("lin", "Lin", "Asia/Shanghai"),
/// ];
/// let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
/// let mut ledger = MemoryLedger::new();
///
/// let history = ledger.history("core").unwrap();
/// let best = analyze(&roster, &BusyMap::new(), day_start(date), &history).remove(0);
///
/// assert_eq!(commit_booking(&mut ledger, "core", date, &best), Ok(2));
/// assert_eq!(ledger.history("core").unwrap().len(), 2);
/// assert!(ledger.history("other").unwrap().is_empty());
/// ```
pub fn commit_booking<L>(
    ledger: &mut L,
    team_id: &str,
    meeting_date: NaiveDate,
    scenario: &Scenario,
) -> Result<usize, LedgerError>
where
    L: Ledger + ?Sized,
{
    if scenario.breakdown.is_empty() {
        return Err(LedgerError::EmptyBreakdown);
    }

    let entries = scenario
        .breakdown
        .iter()
        .map(|(member_id, member)| LedgerEntry {
            team_id: team_id.to_string(),
            member_id: member_id.clone(),
            pain: member.pain,
            meeting_date,
        })
        .collect_vec();

    debug!("Appending {} ledger entries for {}", entries.len(), team_id);
    ledger.append(&entries)?;

    info!(
        "Booked {:02}:00 UTC on {} for {} (total pain {})",
        scenario.utc_hour, meeting_date, team_id, scenario.total_pain
    );

    Ok(entries.len())
}

/// Team members ranked by lifetime pain, most burdened first.
pub fn leaderboard<L>(ledger: &L, team_id: &str) -> Result<Vec<Standing>, LedgerError>
where
    L: Ledger + ?Sized,
{
    Ok(ledger
        .history(team_id)?
        .into_iter()
        .sorted_by(|(a_id, a_total), (b_id, b_total)| {
            Reverse(a_total).cmp(&Reverse(b_total)).then_with(|| a_id.cmp(b_id))
        })
        .map(|(member_id, total_pain)| Standing {
            member_id,
            total_pain,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::MemberPain;
    use crate::pain::PainTier;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    fn entry(team: &str, member: &str, pain: u32) -> LedgerEntry {
        LedgerEntry {
            team_id: team.to_string(),
            member_id: member.to_string(),
            pain,
            meeting_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        }
    }

    fn scenario(pains: &[(&str, u32)]) -> Scenario {
        let breakdown: BTreeMap<String, MemberPain> = pains
            .iter()
            .map(|(id, pain)| {
                (
                    id.to_string(),
                    MemberPain {
                        name: id.to_string(),
                        local_hour: 0,
                        tier: PainTier::Toxic,
                        pain: *pain,
                        blocked: false,
                    },
                )
            })
            .collect();

        Scenario {
            utc_hour: 0,
            start: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            total_pain: pains.iter().map(|(_, p)| p).sum(),
            gap: 0,
            has_conflict: false,
            breakdown,
        }
    }

    struct Offline;

    impl Ledger for Offline {
        fn append(&mut self, _entries: &[LedgerEntry]) -> Result<(), LedgerError> {
            Err(LedgerError::Storage("connection refused".to_string()))
        }

        fn entries(&self, _team_id: &str) -> Result<Vec<LedgerEntry>, LedgerError> {
            Err(LedgerError::Storage("connection refused".to_string()))
        }
    }

    #[test]
    fn history_sums_per_member() {
        let mut ledger = MemoryLedger::new();
        ledger
            .append(&[
                entry("t", "a", 10),
                entry("t", "b", 2),
                entry("t", "a", 3),
                entry("other", "a", 100),
            ])
            .unwrap();

        let history = ledger.history("t").unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history["a"], 13);
        assert_eq!(history["b"], 2);
    }

    #[test]
    fn commit_writes_one_entry_per_member() {
        let mut ledger = MemoryLedger::new();
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();

        let written = commit_booking(&mut ledger, "t", date, &scenario(&[("a", 10), ("b", 0)]));

        assert_eq!(written, Ok(2));
        assert_eq!(
            ledger.entries("t").unwrap(),
            vec![entry("t", "a", 10), entry("t", "b", 0)]
        );
    }

    #[test]
    fn empty_breakdown_writes_nothing() {
        let mut ledger = MemoryLedger::new();
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();

        assert_eq!(
            commit_booking(&mut ledger, "t", date, &scenario(&[])),
            Err(LedgerError::EmptyBreakdown)
        );
        assert!(ledger.is_empty());
    }

    #[test]
    fn storage_failures_surface() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();

        assert!(matches!(
            commit_booking(&mut Offline, "t", date, &scenario(&[("a", 1)])),
            Err(LedgerError::Storage(_))
        ));
        assert!(leaderboard(&Offline, "t").is_err());
    }

    #[test]
    fn leaderboard_ranks_most_pain_first() {
        let mut ledger = MemoryLedger::new();
        ledger
            .append(&[
                entry("t", "carol", 5),
                entry("t", "alice", 20),
                entry("t", "bob", 5),
                entry("t", "carol", 0),
            ])
            .unwrap();

        let board = leaderboard(&ledger, "t").unwrap();
        let order: Vec<(&str, u32)> = board
            .iter()
            .map(|s| (s.member_id.as_str(), s.total_pain))
            .collect();

        assert_eq!(order, vec![("alice", 20), ("bob", 5), ("carol", 5)]);
    }
}
