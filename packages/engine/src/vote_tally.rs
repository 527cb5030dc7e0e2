use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use crate::error::{GameError, VoteRejection};
use crate::models::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: PlayerId,
    pub target: PlayerId,
    pub cast_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Eliminate { target: PlayerId, votes: usize },
    NoElimination,
}

/// Votes of one round, at most one per voter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoteTally {
    votes: BTreeMap<PlayerId, Vote>,
}

impl VoteTally {
    /// Records or replaces `voter`'s vote. Returns the previous target, if any.
    pub fn record_vote(
        &mut self,
        voter: PlayerId,
        target: PlayerId,
        active: &BTreeSet<PlayerId>,
    ) -> Result<Option<PlayerId>, GameError> {
        if !active.contains(&voter) {
            return Err(GameError::InvalidVote(VoteRejection::VoterNotActive));
        }
        if voter == target {
            return Err(GameError::InvalidVote(VoteRejection::SelfVote));
        }
        if !active.contains(&target) {
            return Err(GameError::InvalidVote(VoteRejection::TargetNotActive));
        }

        let previous = self.votes.insert(
            voter,
            Vote {
                voter,
                target,
                cast_at: Utc::now(),
            },
        );
        Ok(previous.map(|v| v.target))
    }

    pub fn vote_of(&self, voter: PlayerId) -> Option<&Vote> {
        self.votes.get(&voter)
    }

    pub fn votes(&self) -> impl Iterator<Item = &Vote> {
        self.votes.values()
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    pub fn has_everyone_voted(&self, active: &BTreeSet<PlayerId>) -> bool {
        !active.is_empty() && active.iter().all(|p| self.votes.contains_key(p))
    }

    pub fn counts(&self) -> BTreeMap<PlayerId, usize> {
        let mut counts = BTreeMap::new();
        for vote in self.votes.values() {
            *counts.entry(vote.target).or_insert(0) += 1;
        }
        counts
    }

    /// Picks the most voted player.
    ///
    /// A tie at the top is broken uniformly at random among the tied players,
    /// so the outcome depends on `rng`. Seed it to get a reproducible result.
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> Resolution {
        let counts = self.counts();
        let Some(&max) = counts.values().max() else {
            return Resolution::NoElimination;
        };

        let most_voted: Vec<PlayerId> = counts
            .iter()
            .filter(|(_, &c)| c == max)
            .map(|(&id, _)| id)
            .collect();

        if most_voted.len() > 1 {
            info!("Tie between players {:?} with {} votes each", most_voted, max);
        }

        match most_voted.choose(rng) {
            Some(&target) => Resolution::Eliminate { target, votes: max },
            None => Resolution::NoElimination,
        }
    }
}
