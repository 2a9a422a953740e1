//! Standings: participants ranked by accumulated points.

use crate::models::{Participant, ParticipantId};
use serde::Serialize;

/// One row of the standings table.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Standing {
    /// Competition rank: equal points share a rank and the next rank skips (1, 2, 2, 4).
    pub rank: usize,
    pub participant_id: ParticipantId,
    pub name: String,
    pub points: u32,
}

/// Rank participants by points, highest first.
///
/// Ties keep the input order, so passing participants in registration order makes
/// earlier registrants list first among equals.
pub fn rank(participants: &[Participant]) -> Vec<Standing> {
    let mut ordered: Vec<&Participant> = participants.iter().collect();
    // sort_by is stable
    ordered.sort_by(|a, b| b.points.cmp(&a.points));

    let mut standings: Vec<Standing> = Vec::with_capacity(ordered.len());
    for (i, p) in ordered.into_iter().enumerate() {
        let rank = match standings.last() {
            Some(prev) if prev.points == p.points => prev.rank,
            _ => i + 1,
        };
        standings.push(Standing {
            rank,
            participant_id: p.id,
            name: p.name.clone(),
            points: p.points,
        });
    }
    standings
}
