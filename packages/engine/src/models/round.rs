use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{game::GamePhase, submission::Submission, PlayerId};
use crate::vote_tally::VoteTally;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub number: u32,
    pub phase: GamePhase,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub tally: VoteTally,
    pub submissions: Vec<Submission>,
}

impl Round {
    pub fn new(number: u32) -> Self {
        Round {
            number,
            phase: GamePhase::Preparation,
            started_at: Utc::now(),
            finished_at: None,
            tally: VoteTally::default(),
            submissions: Vec::new(),
        }
    }

    pub fn submission_of(&self, player_id: PlayerId) -> Option<&Submission> {
        self.submissions.iter().find(|s| s.player_id == player_id)
    }

    pub(crate) fn submission_of_mut(&mut self, player_id: PlayerId) -> Option<&mut Submission> {
        self.submissions.iter_mut().find(|s| s.player_id == player_id)
    }
}
