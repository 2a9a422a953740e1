//! Tournament business logic: scheduling, lifecycle, standings, export.

mod engine;
mod export;
mod schedule;
mod standings;

pub use engine::{EngineConfig, MatchResult, ResultAuthority, TournamentEngine};
pub use export::{schedule_to_csv, write_schedule_csv, CSV_HEADER};
pub use schedule::{generate, match_count, round_count, RoundPairings, Schedule, ScheduledRound};
pub use standings::{rank, Standing};
