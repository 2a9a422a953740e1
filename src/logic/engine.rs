//! Tournament lifecycle: Draft -> InProgress -> Completed.
//!
//! [`TournamentEngine`] owns the rules; storage goes through [`Store`]. Every
//! mutating operation on a tournament runs under that tournament's lock, and the
//! writes themselves are conditional commits, so concurrent or retried calls can
//! neither double-start a tournament nor double-count a result.

use crate::logic::schedule::{self, Schedule};
use crate::logic::standings::{self, Standing};
use crate::models::{
    ActorId, Match, MatchId, Missing, NewTournament, Participant, ParticipantId, Tournament,
    TournamentError, TournamentId, TournamentStatus,
};
use crate::store::{StorageError, Store};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Who besides the creator may record match results.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultAuthority {
    /// Only the tournament creator.
    #[default]
    CreatorOnly,
    /// The creator and any referee the creator added.
    CreatorOrReferee,
}

impl std::str::FromStr for ResultAuthority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "creator" | "creator_only" => Ok(ResultAuthority::CreatorOnly),
            "referee" | "referees" | "creator_or_referee" => Ok(ResultAuthority::CreatorOrReferee),
            other => Err(format!("unknown result authority: {}", other)),
        }
    }
}

/// Engine settings.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Points credited to the winner of a match. Byes and losses award nothing.
    pub points_per_win: u32,
    pub result_authority: ResultAuthority,
    /// Participants required to start. Values below 2 are treated as 2.
    pub min_participants: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            points_per_win: 1,
            result_authority: ResultAuthority::CreatorOnly,
            min_participants: 2,
        }
    }
}

/// Outcome of a recorded match result.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct MatchResult {
    #[serde(rename = "match")]
    pub game: Match,
    pub winner_points: u32,
    pub tournament_status: TournamentStatus,
}

/// Schedule commits attempted before giving up on a participant list that keeps changing.
const START_ATTEMPTS: usize = 3;

fn storage_failure(e: StorageError) -> TournamentError {
    log::warn!("Storage failure: {}", e);
    TournamentError::Storage(e)
}

/// Orchestrates tournaments over a [`Store`].
pub struct TournamentEngine<S> {
    store: S,
    config: EngineConfig,
    locks: Mutex<HashMap<TournamentId, Arc<Mutex<()>>>>,
}

impl<S: Store> TournamentEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(store, EngineConfig::default())
    }

    pub fn with_config(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Per-tournament mutex serializing state changes. The guarded value is `()`,
    /// so a poisoned lock carries no broken state and is simply reused.
    ///
    /// Entries exist only for tournaments that are stored and not yet Completed:
    /// unknown ids fail before anything is inserted, and a Completed tournament
    /// (which never changes again) gets a private lock and its entry dropped.
    fn lock_tournament(&self, id: TournamentId) -> Result<Arc<Mutex<()>>, TournamentError> {
        let tournament = self.load(id)?;
        if tournament.status == TournamentStatus::Completed {
            self.release_lock(id);
            return Ok(Arc::default());
        }
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(locks.entry(id).or_default().clone())
    }

    fn release_lock(&self, id: TournamentId) {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }

    /// Number of tournaments with a live lock entry.
    pub fn active_locks(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn load(&self, id: TournamentId) -> Result<Tournament, TournamentError> {
        self.store
            .get_tournament(id)
            .map_err(storage_failure)?
            .ok_or(TournamentError::NotFound(Missing::Tournament(id)))
    }

    fn require_creator(tournament: &Tournament, actor: ActorId) -> Result<(), TournamentError> {
        if tournament.is_creator(actor) {
            Ok(())
        } else {
            log::debug!(
                "Actor {} is not the creator of tournament {}",
                actor,
                tournament.id
            );
            Err(TournamentError::Unauthorized(actor))
        }
    }

    /// Creator, or the participant acting on their own registration.
    fn require_creator_or_self(
        tournament: &Tournament,
        actor: ActorId,
        participant_id: ParticipantId,
    ) -> Result<(), TournamentError> {
        if actor == participant_id {
            Ok(())
        } else {
            Self::require_creator(tournament, actor)
        }
    }

    fn require_result_authority(
        &self,
        tournament: &Tournament,
        actor: ActorId,
    ) -> Result<(), TournamentError> {
        let allowed = tournament.is_creator(actor)
            || (self.config.result_authority == ResultAuthority::CreatorOrReferee
                && tournament.is_referee(actor));
        if allowed {
            Ok(())
        } else {
            log::debug!(
                "Actor {} may not record results in tournament {}",
                actor,
                tournament.id
            );
            Err(TournamentError::Unauthorized(actor))
        }
    }

    /// Create a Draft tournament owned by `actor`.
    pub fn create_tournament(
        &self,
        actor: ActorId,
        draft: NewTournament,
    ) -> Result<Tournament, TournamentError> {
        let tournament = Tournament::new(actor, draft)?;
        self.store
            .create_tournament(tournament.clone())
            .map_err(storage_failure)?;
        log::info!("Created tournament {} ({})", tournament.id, tournament.name);
        Ok(tournament)
    }

    pub fn get_tournament(&self, id: TournamentId) -> Result<Tournament, TournamentError> {
        self.load(id)
    }

    /// All tournaments, newest first.
    pub fn list_tournaments(&self) -> Result<Vec<Tournament>, TournamentError> {
        self.store.list_tournaments().map_err(storage_failure)
    }

    /// Participants in registration order.
    pub fn get_participants(&self, id: TournamentId) -> Result<Vec<Participant>, TournamentError> {
        self.load(id)?;
        self.store.list_participants(id).map_err(storage_failure)
    }

    /// Register a participant (Draft only). The creator may add anyone; any other
    /// actor may only register themselves.
    pub fn add_participant(
        &self,
        actor: ActorId,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
        name: &str,
    ) -> Result<Participant, TournamentError> {
        let lock = self.lock_tournament(tournament_id)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let tournament = self.load(tournament_id)?;
        Self::require_creator_or_self(&tournament, actor, participant_id)?;
        tournament.ensure_draft("add participants")?;

        let name = name.trim();
        if name.is_empty() {
            return Err(TournamentError::Validation(
                "participant name is required".into(),
            ));
        }

        let participant = Participant::new(participant_id, name);
        let added = self
            .store
            .add_participant(tournament_id, participant.clone())
            .map_err(storage_failure)?;
        if !added {
            // Either a duplicate, or another engine started the tournament meanwhile.
            self.load(tournament_id)?.ensure_draft("add participants")?;
            return Err(TournamentError::DuplicateParticipant(participant_id));
        }
        log::info!(
            "Registered {} ({}) in tournament {}",
            participant.name,
            participant.id,
            tournament_id
        );
        Ok(participant)
    }

    /// Unregister a participant (Draft only). Same authorization as registering.
    pub fn remove_participant(
        &self,
        actor: ActorId,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
    ) -> Result<(), TournamentError> {
        let lock = self.lock_tournament(tournament_id)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let tournament = self.load(tournament_id)?;
        Self::require_creator_or_self(&tournament, actor, participant_id)?;
        tournament.ensure_draft("remove participants")?;

        let removed = self
            .store
            .remove_participant(tournament_id, participant_id)
            .map_err(storage_failure)?;
        if !removed {
            self.load(tournament_id)?.ensure_draft("remove participants")?;
            return Err(TournamentError::NotFound(Missing::Participant(participant_id)));
        }
        log::info!(
            "Removed participant {} from tournament {}",
            participant_id,
            tournament_id
        );
        Ok(())
    }

    /// Let `referee` submit results (creator only, until the tournament completes).
    /// Adding an existing referee is a no-op.
    pub fn add_referee(
        &self,
        actor: ActorId,
        tournament_id: TournamentId,
        referee: ActorId,
    ) -> Result<Tournament, TournamentError> {
        let lock = self.lock_tournament(tournament_id)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let tournament = self.load(tournament_id)?;
        Self::require_creator(&tournament, actor)?;
        if tournament.status == TournamentStatus::Completed {
            return Err(TournamentError::TournamentClosed(tournament_id));
        }
        if self
            .store
            .add_referee(tournament_id, referee)
            .map_err(storage_failure)?
        {
            log::info!("Added referee {} to tournament {}", referee, tournament_id);
        }
        self.load(tournament_id)
    }

    /// Generate the round-robin schedule over the registration order and move the
    /// tournament to InProgress. Happens at most once per tournament.
    ///
    /// The commit only applies if the registered field still matches the one the
    /// schedule was built from; if another writer changed it, the schedule is rebuilt.
    pub fn start_tournament(
        &self,
        actor: ActorId,
        tournament_id: TournamentId,
    ) -> Result<Schedule, TournamentError> {
        let lock = self.lock_tournament(tournament_id)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        for attempt in 1..=START_ATTEMPTS {
            let tournament = self.load(tournament_id)?;
            Self::require_creator(&tournament, actor)?;
            if tournament.status != TournamentStatus::Draft {
                return Err(TournamentError::InvalidTransition {
                    status: tournament.status,
                    operation: "start",
                });
            }

            let participants = self
                .store
                .list_participants(tournament_id)
                .map_err(storage_failure)?;
            let required = self.config.min_participants.max(2);
            if participants.len() < required {
                return Err(TournamentError::InsufficientParticipants {
                    required,
                    registered: participants.len(),
                });
            }

            let ids: Vec<ParticipantId> = participants.iter().map(|p| p.id).collect();
            let matches: Vec<Match> = schedule::generate(&ids)
                .into_iter()
                .zip(1u32..)
                .flat_map(|(pairings, round)| {
                    pairings
                        .into_iter()
                        .map(move |(a, b)| Match::new(tournament_id, round, a, b))
                })
                .collect();

            let committed = self
                .store
                .commit_schedule(tournament_id, &ids, matches.clone())
                .map_err(storage_failure)?;
            if !committed {
                // Status or field changed behind our back; the next pass sorts out which.
                log::debug!(
                    "Schedule commit for tournament {} rejected (attempt {})",
                    tournament_id,
                    attempt
                );
                continue;
            }

            let schedule = Schedule::from_matches(tournament_id, matches, &participants);
            log::info!(
                "Started tournament {}: {} participants, {} rounds, {} matches",
                tournament_id,
                participants.len(),
                schedule.rounds.len(),
                schedule.match_count()
            );
            return Ok(schedule);
        }

        Err(storage_failure(StorageError::new(format!(
            "participants of tournament {} kept changing during start",
            tournament_id
        ))))
    }

    /// Record `winner` for a match. The winner gains the configured points; when this
    /// was the last open match the tournament becomes Completed.
    pub fn record_match_result(
        &self,
        actor: ActorId,
        tournament_id: TournamentId,
        match_id: MatchId,
        winner: ParticipantId,
    ) -> Result<MatchResult, TournamentError> {
        let lock = self.lock_tournament(tournament_id)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let tournament = self.load(tournament_id)?;
        match tournament.status {
            TournamentStatus::InProgress => {}
            TournamentStatus::Completed => {
                return Err(TournamentError::TournamentClosed(tournament_id))
            }
            status => {
                return Err(TournamentError::InvalidTransition {
                    status,
                    operation: "record results",
                })
            }
        }
        self.require_result_authority(&tournament, actor)?;

        let game = self
            .store
            .get_match(match_id)
            .map_err(storage_failure)?
            .filter(|m| m.tournament_id == tournament_id)
            .ok_or(TournamentError::NotFound(Missing::Match(match_id)))?;
        if game.is_completed() {
            return Err(TournamentError::AlreadyCompleted(match_id));
        }
        if !game.involves(winner) {
            return Err(TournamentError::InvalidWinner { match_id, winner });
        }

        let committed = self
            .store
            .commit_result(tournament_id, match_id, winner, self.config.points_per_win)
            .map_err(storage_failure)?
            .ok_or(TournamentError::AlreadyCompleted(match_id))?;

        log::info!(
            "Match {} in round {} won by {} ({} points)",
            match_id,
            committed.game.round,
            winner,
            committed.winner_points
        );
        let tournament_status = if committed.tournament_completed {
            log::info!("Tournament {} completed", tournament_id);
            self.release_lock(tournament_id);
            TournamentStatus::Completed
        } else {
            TournamentStatus::InProgress
        };
        Ok(MatchResult {
            game: committed.game,
            winner_points: committed.winner_points,
            tournament_status,
        })
    }

    /// Standings ranked by points; ties keep registration order.
    pub fn get_standings(&self, id: TournamentId) -> Result<Vec<Standing>, TournamentError> {
        let participants = self.get_participants(id)?;
        Ok(standings::rank(&participants))
    }

    /// The tournament's matches grouped by round (empty while Draft).
    pub fn get_schedule(&self, id: TournamentId) -> Result<Schedule, TournamentError> {
        let participants = self.get_participants(id)?;
        let matches = self.store.list_matches(id).map_err(storage_failure)?;
        Ok(Schedule::from_matches(id, matches, &participants))
    }
}
