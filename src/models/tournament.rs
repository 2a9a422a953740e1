//! Tournament, TournamentStatus, and the errors returned by tournament operations.

use crate::models::game::MatchId;
use crate::models::participant::ParticipantId;
use crate::store::StorageError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a tournament.
pub type TournamentId = Uuid;

/// Identity of whoever performs an operation, as established by the identity service.
pub type ActorId = Uuid;

/// Longest accepted tournament name, in characters.
pub const MAX_NAME_LEN: usize = 100;

/// Which kind of record a lookup failed to find.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Missing {
    Tournament(TournamentId),
    Match(MatchId),
    Participant(ParticipantId),
}

/// Errors that can occur during tournament operations.
#[derive(Debug)]
pub enum TournamentError {
    /// Bad input shape, e.g. a blank name.
    Validation(String),
    /// Starting needs at least `required` participants.
    InsufficientParticipants { required: usize, registered: usize },
    /// Operation not allowed in the tournament's current status.
    InvalidTransition {
        status: TournamentStatus,
        operation: &'static str,
    },
    NotFound(Missing),
    /// Winner is not one of the match's two participants.
    InvalidWinner {
        match_id: MatchId,
        winner: ParticipantId,
    },
    /// The match already has a result; results are never re-scored.
    AlreadyCompleted(MatchId),
    /// The tournament is completed and no longer accepts changes.
    TournamentClosed(TournamentId),
    /// The actor lacks the role the operation requires.
    Unauthorized(ActorId),
    /// Participant is already registered in this tournament.
    DuplicateParticipant(ParticipantId),
    /// The backing store failed; nothing was partially applied.
    Storage(StorageError),
}

impl std::fmt::Display for TournamentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TournamentError::Validation(msg) => write!(f, "Invalid input: {}", msg),
            TournamentError::InsufficientParticipants { required, registered } => write!(
                f,
                "Need at least {} participants to start (have {})",
                required, registered
            ),
            TournamentError::InvalidTransition { status, operation } => {
                write!(f, "Cannot {} while tournament is {}", operation, status)
            }
            TournamentError::NotFound(Missing::Tournament(id)) => {
                write!(f, "Tournament {} not found", id)
            }
            TournamentError::NotFound(Missing::Match(id)) => write!(f, "Match {} not found", id),
            TournamentError::NotFound(Missing::Participant(id)) => {
                write!(f, "Participant {} not found", id)
            }
            TournamentError::InvalidWinner { match_id, winner } => {
                write!(f, "Participant {} does not play in match {}", winner, match_id)
            }
            TournamentError::AlreadyCompleted(id) => {
                write!(f, "Match {} already has a result", id)
            }
            TournamentError::TournamentClosed(id) => write!(f, "Tournament {} is completed", id),
            TournamentError::Unauthorized(_) => write!(f, "Not allowed to perform this action"),
            TournamentError::DuplicateParticipant(_) => {
                write!(f, "Participant is already registered")
            }
            TournamentError::Storage(e) => write!(f, "Storage failure: {}", e),
        }
    }
}

impl std::error::Error for TournamentError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TournamentError::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for TournamentError {
    fn from(e: StorageError) -> Self {
        TournamentError::Storage(e)
    }
}

/// Lifecycle of a tournament. Transitions only move forward.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Registering participants; no matches yet.
    #[default]
    Draft,
    /// Schedule generated; results are being recorded.
    InProgress,
    /// Every match has a result.
    Completed,
}

impl TournamentStatus {
    /// Whether moving from `self` to `next` is a legal forward step.
    pub fn can_advance_to(self, next: TournamentStatus) -> bool {
        use TournamentStatus::*;
        matches!((self, next), (Draft, InProgress) | (InProgress, Completed))
    }
}

impl std::fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TournamentStatus::Draft => "draft",
            TournamentStatus::InProgress => "in progress",
            TournamentStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// Caller input for creating a tournament.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NewTournament {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
}

/// Tournament record as kept by the tournament store.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    pub description: String,
    /// Planned start date shown to participants; not enforced.
    pub start_date: Option<NaiveDate>,
    pub created_by: ActorId,
    pub created_at: DateTime<Utc>,
    pub status: TournamentStatus,
    /// Actors allowed to submit results besides the creator (subject to policy).
    pub referees: Vec<ActorId>,
    /// Total matches in the schedule (0 while Draft).
    pub match_count: usize,
    /// Matches with a result. Equals `match_count` iff Completed.
    pub completed_matches: usize,
}

impl Tournament {
    /// Create a Draft tournament owned by `created_by`. The name is trimmed and must be non-empty.
    pub fn new(created_by: ActorId, draft: NewTournament) -> Result<Self, TournamentError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(TournamentError::Validation("name is required".into()));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(TournamentError::Validation(format!(
                "name must be at most {} characters",
                MAX_NAME_LEN
            )));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: draft.description.trim().to_string(),
            start_date: draft.start_date,
            created_by,
            created_at: Utc::now(),
            status: TournamentStatus::Draft,
            referees: Vec::new(),
            match_count: 0,
            completed_matches: 0,
        })
    }

    pub fn is_creator(&self, actor: ActorId) -> bool {
        self.created_by == actor
    }

    pub fn is_referee(&self, actor: ActorId) -> bool {
        self.referees.contains(&actor)
    }

    /// Matches still waiting for a result.
    pub fn remaining_matches(&self) -> usize {
        self.match_count.saturating_sub(self.completed_matches)
    }

    /// Ok if the participant list may still change.
    pub fn ensure_draft(&self, operation: &'static str) -> Result<(), TournamentError> {
        match self.status {
            TournamentStatus::Draft => Ok(()),
            TournamentStatus::Completed => Err(TournamentError::TournamentClosed(self.id)),
            status => Err(TournamentError::InvalidTransition { status, operation }),
        }
    }
}
