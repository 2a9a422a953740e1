//! Match and MatchStatus for 1v1 round-robin games.

use crate::models::participant::ParticipantId;
use crate::models::tournament::TournamentId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a match.
pub type MatchId = Uuid;

/// Lifecycle of a single match. A match is completed exactly once and never re-opened.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    Scheduled,
    Completed,
}

/// A single match between two participants.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub tournament_id: TournamentId,
    /// 1-based round number.
    pub round: u32,
    /// Slot A. Slot order is presentation only.
    pub participant_a: ParticipantId,
    pub participant_b: ParticipantId,
    /// None until decided.
    pub winner: Option<ParticipantId>,
    pub status: MatchStatus,
}

impl Match {
    pub fn new(
        tournament_id: TournamentId,
        round: u32,
        participant_a: ParticipantId,
        participant_b: ParticipantId,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            tournament_id,
            round,
            participant_a,
            participant_b,
            winner: None,
            status: MatchStatus::Scheduled,
        }
    }

    /// Whether `participant` plays in this match.
    pub fn involves(&self, participant: ParticipantId) -> bool {
        self.participant_a == participant || self.participant_b == participant
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    /// Scheduled -> Completed with `winner`. Returns false (and changes nothing) if the
    /// match is already completed or `winner` is not one of its participants.
    pub fn complete(&mut self, winner: ParticipantId) -> bool {
        if self.is_completed() || !self.involves(winner) {
            return false;
        }
        self.winner = Some(winner);
        self.status = MatchStatus::Completed;
        true
    }
}
