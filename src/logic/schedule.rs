//! Round-robin schedule generation (circle method) and the per-round schedule view.

use crate::models::{Match, Participant, ParticipantId, TournamentId};
use serde::Serialize;

/// Pairings for one round, in slot order `(a, b)`.
pub type RoundPairings<T> = Vec<(T, T)>;

/// Generate a round-robin schedule over `participants`, in the given order.
///
/// 1. If the count is odd, append a bye so the working list has even length `m`.
/// 2. Produce `m - 1` rounds. In each, pair position `i` with `m - 1 - i` and drop
///    any pair that includes the bye.
/// 3. Between rounds, move the last entry to index 1; index 0 never moves.
///
/// Every unordered pair meets exactly once. Fewer than two participants yields no
/// rounds. The result depends only on the input order.
pub fn generate<T: Clone>(participants: &[T]) -> Vec<RoundPairings<T>> {
    if participants.len() < 2 {
        return Vec::new();
    }

    // None is the bye.
    let mut slots: Vec<Option<T>> = participants.iter().cloned().map(Some).collect();
    if slots.len() % 2 == 1 {
        slots.push(None);
    }
    let m = slots.len();

    let mut rounds = Vec::with_capacity(m - 1);
    for _ in 0..m - 1 {
        let round: RoundPairings<T> = (0..m / 2)
            .filter_map(|i| match (&slots[i], &slots[m - 1 - i]) {
                (Some(a), Some(b)) => Some((a.clone(), b.clone())),
                _ => None,
            })
            .collect();
        rounds.push(round);

        if let Some(last) = slots.pop() {
            slots.insert(1, last);
        }
    }
    rounds
}

/// Number of rounds `generate` produces for `n` participants.
pub fn round_count(n: usize) -> usize {
    match n {
        0 | 1 => 0,
        n if n % 2 == 0 => n - 1,
        n => n,
    }
}

/// Number of matches `generate` produces for `n` participants.
pub fn match_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Persisted matches of one round, plus whoever sits the round out.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ScheduledRound {
    pub round: u32,
    pub matches: Vec<Match>,
    /// Participants without a match this round (the bye with an odd field).
    pub idle: Vec<ParticipantId>,
}

/// A tournament's matches grouped by round, in play order.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Schedule {
    pub tournament_id: TournamentId,
    pub rounds: Vec<ScheduledRound>,
}

impl Schedule {
    /// Group `matches` (already in schedule order) by round.
    pub fn from_matches(
        tournament_id: TournamentId,
        matches: Vec<Match>,
        participants: &[Participant],
    ) -> Self {
        let mut rounds: Vec<ScheduledRound> = Vec::new();
        for m in matches {
            match rounds.last_mut() {
                Some(r) if r.round == m.round => r.matches.push(m),
                _ => rounds.push(ScheduledRound {
                    round: m.round,
                    matches: vec![m],
                    idle: Vec::new(),
                }),
            }
        }
        for r in &mut rounds {
            r.idle = participants
                .iter()
                .map(|p| p.id)
                .filter(|id| !r.matches.iter().any(|m| m.involves(*id)))
                .collect();
        }
        Self {
            tournament_id,
            rounds,
        }
    }

    pub fn match_count(&self) -> usize {
        self.rounds.iter().map(|r| r.matches.len()).sum()
    }

    /// All matches in play order.
    pub fn matches(&self) -> impl Iterator<Item = &Match> {
        self.rounds.iter().flat_map(|r| r.matches.iter())
    }
}
