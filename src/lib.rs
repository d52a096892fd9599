pub mod analysis;
pub mod busy;
pub mod config;
pub mod invite;
pub mod ledger;
pub mod pain;
pub mod poll;
pub mod roster;

pub use analysis::{analyze, Analyzer, HistoryMap, MemberPain, Scenario};
pub use busy::{BusyHours, BusyMap, CalendarProvider, Interval};
pub use pain::{score, PainTier};
pub use roster::{MemberKind, RosterMember};
