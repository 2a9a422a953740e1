//! Data structures for round-robin tournaments: participants, matches, tournament state.

mod game;
mod participant;
mod tournament;

pub use game::{Match, MatchId, MatchStatus};
pub use participant::{Participant, ParticipantId};
pub use tournament::{
    ActorId, Missing, NewTournament, Tournament, TournamentError, TournamentId, TournamentStatus,
    MAX_NAME_LEN,
};
