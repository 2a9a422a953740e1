//! In-process store: every table behind one `RwLock`, so composite commits are atomic.

use super::{
    CommittedResult, MatchStore, ParticipantStore, StorageError, Store, TournamentStore,
};
use crate::models::{
    ActorId, Match, MatchId, Participant, ParticipantId, Tournament, TournamentId,
    TournamentStatus,
};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tables {
    tournaments: HashMap<TournamentId, Tournament>,
    /// Registration order is the Vec order.
    participants: HashMap<TournamentId, Vec<Participant>>,
    matches: HashMap<MatchId, Match>,
    /// Match ids per tournament in schedule order.
    schedules: HashMap<TournamentId, Vec<MatchId>>,
}

impl Tables {
    fn update_status(
        &mut self,
        id: TournamentId,
        expected: TournamentStatus,
        new: TournamentStatus,
    ) -> bool {
        match self.tournaments.get_mut(&id) {
            Some(t) if t.status == expected && expected.can_advance_to(new) => {
                // Completed only once every scheduled match has a result.
                if new == TournamentStatus::Completed
                    && (t.match_count == 0 || t.remaining_matches() > 0)
                {
                    return false;
                }
                t.status = new;
                true
            }
            _ => false,
        }
    }

    fn is_draft(&self, id: TournamentId) -> bool {
        self.tournaments
            .get(&id)
            .is_some_and(|t| t.status == TournamentStatus::Draft)
    }

    fn participant_mut(
        &mut self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
    ) -> Option<&mut Participant> {
        self.participants
            .get_mut(&tournament_id)?
            .iter_mut()
            .find(|p| p.id == participant_id)
    }

    fn bulk_create_matches(&mut self, tournament_id: TournamentId, matches: Vec<Match>) {
        let order = self.schedules.entry(tournament_id).or_default();
        for m in matches {
            order.push(m.id);
            self.matches.insert(m.id, m);
        }
    }

    fn set_winner(&mut self, id: MatchId, winner: ParticipantId) -> bool {
        self.matches
            .get_mut(&id)
            .map(|m| m.complete(winner))
            .unwrap_or(false)
    }

    fn commit_result(
        &mut self,
        tournament_id: TournamentId,
        match_id: MatchId,
        winner: ParticipantId,
        points: u32,
    ) -> Result<Option<CommittedResult>, StorageError> {
        // Check every precondition before touching anything.
        let open = self
            .tournaments
            .get(&tournament_id)
            .is_some_and(|t| t.status == TournamentStatus::InProgress);
        let playable = self.matches.get(&match_id).is_some_and(|m| {
            m.tournament_id == tournament_id && !m.is_completed() && m.involves(winner)
        });
        if !open || !playable {
            return Ok(None);
        }
        if self.participant_mut(tournament_id, winner).is_none() {
            return Err(StorageError::new(format!(
                "match {} references unregistered participant {}",
                match_id, winner
            )));
        }

        self.set_winner(match_id, winner);
        let winner_points = match self.participant_mut(tournament_id, winner) {
            Some(p) => {
                p.add_points(points);
                p.points
            }
            None => 0,
        };
        let remaining = match self.tournaments.get_mut(&tournament_id) {
            Some(t) => {
                t.completed_matches += 1;
                t.remaining_matches()
            }
            None => 0,
        };
        let tournament_completed = remaining == 0
            && self.update_status(
                tournament_id,
                TournamentStatus::InProgress,
                TournamentStatus::Completed,
            );
        let game = self.matches[&match_id].clone();
        Ok(Some(CommittedResult {
            game,
            winner_points,
            tournament_completed,
        }))
    }
}

/// Thread-safe in-memory implementation of every store trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>, StorageError> {
        self.tables
            .read()
            .map_err(|_| StorageError::new("lock error"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>, StorageError> {
        self.tables
            .write()
            .map_err(|_| StorageError::new("lock error"))
    }
}

impl TournamentStore for MemoryStore {
    fn create_tournament(&self, tournament: Tournament) -> Result<(), StorageError> {
        let mut g = self.write()?;
        if g.tournaments.contains_key(&tournament.id) {
            return Err(StorageError::new(format!(
                "tournament {} already exists",
                tournament.id
            )));
        }
        g.participants.insert(tournament.id, Vec::new());
        g.tournaments.insert(tournament.id, tournament);
        Ok(())
    }

    fn get_tournament(&self, id: TournamentId) -> Result<Option<Tournament>, StorageError> {
        Ok(self.read()?.tournaments.get(&id).cloned())
    }

    fn list_tournaments(&self) -> Result<Vec<Tournament>, StorageError> {
        let mut all: Vec<Tournament> = self.read()?.tournaments.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    fn update_status(
        &self,
        id: TournamentId,
        expected: TournamentStatus,
        new: TournamentStatus,
    ) -> Result<bool, StorageError> {
        Ok(self.write()?.update_status(id, expected, new))
    }

    fn add_referee(&self, id: TournamentId, referee: ActorId) -> Result<bool, StorageError> {
        let mut g = self.write()?;
        let t = g
            .tournaments
            .get_mut(&id)
            .ok_or_else(|| StorageError::new(format!("tournament {} does not exist", id)))?;
        if t.referees.contains(&referee) {
            return Ok(false);
        }
        t.referees.push(referee);
        Ok(true)
    }
}

impl ParticipantStore for MemoryStore {
    fn list_participants(
        &self,
        tournament_id: TournamentId,
    ) -> Result<Vec<Participant>, StorageError> {
        Ok(self
            .read()?
            .participants
            .get(&tournament_id)
            .cloned()
            .unwrap_or_default())
    }

    fn add_participant(
        &self,
        tournament_id: TournamentId,
        participant: Participant,
    ) -> Result<bool, StorageError> {
        let mut g = self.write()?;
        if !g.is_draft(tournament_id) {
            return Ok(false);
        }
        let list = g.participants.entry(tournament_id).or_default();
        if list.iter().any(|p| p.id == participant.id) {
            return Ok(false);
        }
        list.push(participant);
        Ok(true)
    }

    fn remove_participant(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
    ) -> Result<bool, StorageError> {
        let mut g = self.write()?;
        if !g.is_draft(tournament_id) {
            return Ok(false);
        }
        let Some(list) = g.participants.get_mut(&tournament_id) else {
            return Ok(false);
        };
        let before = list.len();
        list.retain(|p| p.id != participant_id);
        Ok(list.len() != before)
    }

    fn increment_points(
        &self,
        tournament_id: TournamentId,
        participant_id: ParticipantId,
        delta: u32,
    ) -> Result<bool, StorageError> {
        let mut g = self.write()?;
        match g.participant_mut(tournament_id, participant_id) {
            Some(p) => {
                p.add_points(delta);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl MatchStore for MemoryStore {
    fn bulk_create_matches(
        &self,
        tournament_id: TournamentId,
        matches: Vec<Match>,
    ) -> Result<(), StorageError> {
        self.write()?.bulk_create_matches(tournament_id, matches);
        Ok(())
    }

    fn get_match(&self, id: MatchId) -> Result<Option<Match>, StorageError> {
        Ok(self.read()?.matches.get(&id).cloned())
    }

    fn set_winner(&self, id: MatchId, winner: ParticipantId) -> Result<bool, StorageError> {
        Ok(self.write()?.set_winner(id, winner))
    }

    fn list_matches(&self, tournament_id: TournamentId) -> Result<Vec<Match>, StorageError> {
        let g = self.read()?;
        let ids = g.schedules.get(&tournament_id).map(Vec::as_slice).unwrap_or(&[]);
        Ok(ids.iter().filter_map(|id| g.matches.get(id)).cloned().collect())
    }
}

impl Store for MemoryStore {
    fn commit_schedule(
        &self,
        tournament_id: TournamentId,
        participants: &[ParticipantId],
        matches: Vec<Match>,
    ) -> Result<bool, StorageError> {
        let mut g = self.write()?;
        let registered: Vec<ParticipantId> = g
            .participants
            .get(&tournament_id)
            .map(|list| list.iter().map(|p| p.id).collect())
            .unwrap_or_default();
        if registered != participants {
            return Ok(false);
        }
        let count = matches.len();
        match g.tournaments.get_mut(&tournament_id) {
            Some(t) if t.status == TournamentStatus::Draft => {
                t.status = TournamentStatus::InProgress;
                t.match_count = count;
                t.completed_matches = 0;
            }
            _ => return Ok(false),
        }
        g.bulk_create_matches(tournament_id, matches);
        Ok(true)
    }

    fn commit_result(
        &self,
        tournament_id: TournamentId,
        match_id: MatchId,
        winner: ParticipantId,
        points: u32,
    ) -> Result<Option<CommittedResult>, StorageError> {
        self.write()?
            .commit_result(tournament_id, match_id, winner, points)
    }
}
