//! Round-robin tournament organizer: library with models, storage seams and business logic.

pub mod logic;
pub mod models;
pub mod store;

pub use logic::{
    generate, match_count, rank, round_count, schedule_to_csv, write_schedule_csv, EngineConfig,
    MatchResult, ResultAuthority, RoundPairings, Schedule, ScheduledRound, Standing,
    TournamentEngine, CSV_HEADER,
};
pub use models::{
    ActorId, Match, MatchId, MatchStatus, Missing, NewTournament, Participant, ParticipantId,
    Tournament, TournamentError, TournamentId, TournamentStatus, MAX_NAME_LEN,
};
pub use store::{
    CommittedResult, MatchStore, MemoryStore, ParticipantStore, StorageError, Store,
    TournamentStore,
};
