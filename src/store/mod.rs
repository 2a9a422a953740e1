//! Persistence seams for the engine.
//!
//! The engine only talks to storage through these traits, so the scheduling and
//! result rules can be exercised against [`MemoryStore`] or any durable backend.
//! Writes that change state are conditional on the expected prior state; the two
//! composite operations on [`Store`] must be applied all-or-nothing.

mod memory;

pub use memory::MemoryStore;

use crate::models::{
    ActorId, Match, MatchId, Participant, ParticipantId, Tournament, TournamentId,
    TournamentStatus,
};
use std::sync::Arc;

/// Failure reported by a store. Carried unchanged inside `TournamentError::Storage`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StorageError {
    message: String,
}

impl StorageError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for StorageError {}

pub trait TournamentStore {
    fn create_tournament(&self, tournament: Tournament) -> Result<(), StorageError>;

    fn get_tournament(&self, id: TournamentId) -> Result<Option<Tournament>, StorageError>;

    /// All tournaments, newest first.
    fn list_tournaments(&self) -> Result<Vec<Tournament>, StorageError>;

    /// Set status to `new` only if it is currently `expected` and `expected -> new` is a
    /// forward step (Draft -> InProgress -> Completed). Completed additionally requires
    /// every scheduled match to have a result. Returns whether it applied.
    fn update_status(
        &self,
        id: TournamentId,
        expected: TournamentStatus,
        new: TournamentStatus,
    ) -> Result<bool, StorageError>;

    /// Returns false if `referee` was already listed.
    fn add_referee(&self, id: TournamentId, referee: ActorId) -> Result<bool, StorageError>;
}

pub trait ParticipantStore {
    /// Participants in registration order.
    fn list_participants(&self, tournament_id: TournamentId)
        -> Result<Vec<Participant>, StorageError>;

    /// Returns false, writing nothing, if a participant with the same id is already
    /// registered or the tournament is no longer Draft.
    fn add_participant(
        &self,
        tournament_id: TournamentId,
        participant: Participant,
    ) -> Result<bool, StorageError>;

    /// Returns false, writing nothing, if the participant was not registered or the
    /// tournament is no longer Draft.
    fn remove_participant(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
    ) -> Result<bool, StorageError>;

    /// Returns false if the participant was not registered.
    fn increment_points(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
        delta: u32,
    ) -> Result<bool, StorageError>;
}

pub trait MatchStore {
    fn bulk_create_matches(
        &self,
        tournament_id: TournamentId,
        matches: Vec<Match>,
    ) -> Result<(), StorageError>;

    fn get_match(&self, id: MatchId) -> Result<Option<Match>, StorageError>;

    /// Record `winner` only if the match is still Scheduled. Returns whether it applied.
    fn set_winner(&self, id: MatchId, winner: ParticipantId) -> Result<bool, StorageError>;

    /// Matches ordered by round, then by position within the round.
    fn list_matches(&self, tournament_id: TournamentId) -> Result<Vec<Match>, StorageError>;
}

/// What a successful [`Store::commit_result`] changed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommittedResult {
    pub game: Match,
    /// Winner's point total after the increment.
    pub winner_points: u32,
    /// True if this result completed the last open match and closed the tournament.
    pub tournament_completed: bool,
}

/// Full backend used by the engine: the three record stores plus the two atomic units.
pub trait Store: TournamentStore + ParticipantStore + MatchStore + Send + Sync {
    /// Persist `matches` and move the tournament Draft -> InProgress as one unit.
    /// `participants` is the registration-ordered field the schedule was built from.
    /// Returns false, writing nothing, if the tournament is no longer Draft or its
    /// registered participants differ from `participants`.
    fn commit_schedule(
        &self,
        tournament_id: TournamentId,
        participants: &[ParticipantId],
        matches: Vec<Match>,
    ) -> Result<bool, StorageError>;

    /// As one unit: set the match winner (only if still Scheduled), credit `points`
    /// to the winner, bump the completion counter, and close the tournament when no
    /// match remains open. Returns None, writing nothing, if the match is not a
    /// Scheduled match of this InProgress tournament with `winner` as a participant.
    fn commit_result(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
        winner: ParticipantId,
        points: u32,
    ) -> Result<Option<CommittedResult>, StorageError>;
}

// A backend shared by several engines is handed out as `Arc<S>`.

impl<T: TournamentStore + ?Sized> TournamentStore for Arc<T> {
    fn create_tournament(&self, tournament: Tournament) -> Result<(), StorageError> {
        (**self).create_tournament(tournament)
    }

    fn get_tournament(&self, id: TournamentId) -> Result<Option<Tournament>, StorageError> {
        (**self).get_tournament(id)
    }

    fn list_tournaments(&self) -> Result<Vec<Tournament>, StorageError> {
        (**self).list_tournaments()
    }

    fn update_status(
        &self,
        id: TournamentId,
        expected: TournamentStatus,
        new: TournamentStatus,
    ) -> Result<bool, StorageError> {
        (**self).update_status(id, expected, new)
    }

    fn add_referee(&self, id: TournamentId, referee: ActorId) -> Result<bool, StorageError> {
        (**self).add_referee(id, referee)
    }
}

impl<T: ParticipantStore + ?Sized> ParticipantStore for Arc<T> {
    fn list_participants(
        &self,
        tournament_id: TournamentId,
    ) -> Result<Vec<Participant>, StorageError> {
        (**self).list_participants(tournament_id)
    }

    fn add_participant(
        &self,
        tournament_id: TournamentId,
        participant: Participant,
    ) -> Result<bool, StorageError> {
        (**self).add_participant(tournament_id, participant)
    }

    fn remove_participant(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
    ) -> Result<bool, StorageError> {
        (**self).remove_participant(tournament_id, participant_id)
    }

    fn increment_points(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
        delta: u32,
    ) -> Result<bool, StorageError> {
        (**self).increment_points(tournament_id, participant_id, delta)
    }
}

impl<T: MatchStore + ?Sized> MatchStore for Arc<T> {
    fn bulk_create_matches(
        &self,
        tournament_id: TournamentId,
        matches: Vec<Match>,
    ) -> Result<(), StorageError> {
        (**self).bulk_create_matches(tournament_id, matches)
    }

    fn get_match(&self, id: MatchId) -> Result<Option<Match>, StorageError> {
        (**self).get_match(id)
    }

    fn set_winner(&self, id: MatchId, winner: ParticipantId) -> Result<bool, StorageError> {
        (**self).set_winner(id, winner)
    }

    fn list_matches(&self, tournament_id: TournamentId) -> Result<Vec<Match>, StorageError> {
        (**self).list_matches(tournament_id)
    }
}

impl<T: Store + ?Sized> Store for Arc<T> {
    fn commit_schedule(
        &self,
        tournament_id: TournamentId,
        participants: &[ParticipantId],
        matches: Vec<Match>,
    ) -> Result<bool, StorageError> {
        (**self).commit_schedule(tournament_id, participants, matches)
    }

    fn commit_result(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
        winner: ParticipantId,
        points: u32,
    ) -> Result<Option<CommittedResult>, StorageError> {
        (**self).commit_result(tournament_id, match_id, winner, points)
    }
}
