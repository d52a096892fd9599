use crate::analysis::Scenario;
use chrono::NaiveDate;
use log::{debug, info};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum PollError {
    #[error("A poll needs at least one candidate slot")]
    NoOptions,
    #[error("Option {0} does not belong to this poll")]
    UnknownOption(Uuid),
    #[error("{voter} has already voted")]
    AlreadyVoted { voter: String },
    #[error("Poll is closed")]
    Closed,
    #[error("No votes have been cast")]
    NoVotes,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PollStatus {
    Open,
    Closed,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOption {
    pub id: Uuid,
    pub scenario: Scenario,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vote {
    pub voter: String,
    #[cfg_attr(feature = "serde", serde(rename = "optionId"))]
    pub option_id: Uuid,
}

/// A team vote between ranked candidate slots.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Poll {
    pub id: Uuid,
    #[cfg_attr(feature = "serde", serde(rename = "teamId"))]
    pub team_id: String,
    #[cfg_attr(feature = "serde", serde(rename = "meetingDate"))]
    pub meeting_date: NaiveDate,
    pub options: Vec<PollOption>,
    votes: Vec<Vote>,
    status: PollStatus,
}

impl Poll {
    /// Opens a poll with one option per scenario, in ranked order.
    pub fn from_scenarios(
        team_id: &str,
        meeting_date: NaiveDate,
        scenarios: &[Scenario],
    ) -> Result<Poll, PollError> {
        if scenarios.is_empty() {
            return Err(PollError::NoOptions);
        }

        let options = scenarios
            .iter()
            .map(|scenario| PollOption {
                id: Uuid::new_v4(),
                scenario: scenario.clone(),
            })
            .collect();

        let poll = Poll {
            id: Uuid::new_v4(),
            team_id: team_id.to_string(),
            meeting_date,
            options,
            votes: vec![],
            status: PollStatus::Open,
        };
        info!(
            "Opened poll {} for {} with {} options",
            poll.id,
            team_id,
            poll.options.len()
        );

        Ok(poll)
    }

    pub fn status(&self) -> PollStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status == PollStatus::Open
    }

    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }

    pub fn has_voted(&self, voter: &str) -> bool {
        self.votes.iter().any(|vote| vote.voter == voter)
    }

    /// Records `voter`'s choice. Each voter gets a single vote.
    pub fn cast_vote(&mut self, voter: &str, option_id: Uuid) -> Result<(), PollError> {
        if !self.is_open() {
            return Err(PollError::Closed);
        }
        if !self.options.iter().any(|option| option.id == option_id) {
            return Err(PollError::UnknownOption(option_id));
        }
        if self.has_voted(voter) {
            return Err(PollError::AlreadyVoted {
                voter: voter.to_string(),
            });
        }

        debug!("{} voted for {} in poll {}", voter, option_id, self.id);
        self.votes.push(Vote {
            voter: voter.to_string(),
            option_id,
        });

        Ok(())
    }

    /// Votes per option, in option order.
    pub fn tally(&self) -> Vec<(&PollOption, usize)> {
        self.options
            .iter()
            .map(|option| {
                let count = self
                    .votes
                    .iter()
                    .filter(|vote| vote.option_id == option.id)
                    .count();
                (option, count)
            })
            .collect()
    }

    /// The option with the most votes. Ties go to the better ranked option.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use nync_libs::analysis::{analyze, day_start, HistoryMap};
    /// use nync_libs::busy::BusyMap;
    /// use nync_libs::poll::{Poll, PollError};
    /// use nync_libs::roster::RosterMember;
    ///
    /// let roster = vec![RosterMember::user("ada", "Ada", "UTC")];
    /// let date = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
    /// let top = analyze(&roster, &BusyMap::new(), day_start(date), &HistoryMap::new());
    ///
    /// let mut poll = Poll::from_scenarios("core", date, &top).unwrap();
    /// assert_eq!(poll.winner().err(), Some(PollError::NoVotes));
    ///
    /// let second = poll.options[1].id;
    /// poll.cast_vote("ada", second).unwrap();
    /// assert_eq!(poll.winner().unwrap().id, second);
    /// ```
    pub fn winner(&self) -> Result<&PollOption, PollError> {
        let mut best: Option<(&PollOption, usize)> = None;

        for (option, count) in self.tally() {
            match best {
                _ if count == 0 => {}
                Some((_, best_count)) if best_count >= count => {}
                _ => best = Some((option, count)),
            }
        }

        best.map(|(option, _)| option).ok_or(PollError::NoVotes)
    }

    /// Stops accepting votes. Closing twice is harmless.
    pub fn close(&mut self) {
        if self.is_open() {
            info!("Closed poll {} with {} votes", self.id, self.votes.len());
        }
        self.status = PollStatus::Closed;
    }

    /// Closes the poll and hands back the winning option.
    /// The poll stays open when nobody has voted yet.
    pub fn close_with_winner(&mut self) -> Result<PollOption, PollError> {
        let winner = self.winner()?.clone();
        self.close();
        Ok(winner)
    }
}
