//! Schedule export as CSV (one row per match).

use crate::logic::schedule::Schedule;
use crate::models::{MatchStatus, Participant, ParticipantId};
use serde::Serialize;
use std::collections::HashMap;
use std::io;

/// Column names, in `ScheduleRow` field order.
pub const CSV_HEADER: [&str; 6] = ["round", "match_id", "player_a", "player_b", "winner", "status"];

#[derive(Serialize)]
struct ScheduleRow {
    round: u32,
    match_id: String,
    player_a: String,
    player_b: String,
    winner: String,
    status: MatchStatus,
}

/// Write `schedule` as CSV. The header is always written, even with no matches.
/// Participants are written by name, falling back to the raw id.
pub fn write_schedule_csv<W: io::Write>(
    schedule: &Schedule,
    participants: &[Participant],
    writer: W,
) -> csv::Result<()> {
    let names: HashMap<ParticipantId, &str> = participants
        .iter()
        .map(|p| (p.id, p.name.as_str()))
        .collect();
    let name_of = |id: ParticipantId| {
        names
            .get(&id)
            .map(|n| n.to_string())
            .unwrap_or_else(|| id.to_string())
    };

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(CSV_HEADER)?;
    for m in schedule.matches() {
        wtr.serialize(ScheduleRow {
            round: m.round,
            match_id: m.id.to_string(),
            player_a: name_of(m.participant_a),
            player_b: name_of(m.participant_b),
            winner: m.winner.map(name_of).unwrap_or_default(),
            status: m.status,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Same as [`write_schedule_csv`], into a `String`.
pub fn schedule_to_csv(schedule: &Schedule, participants: &[Participant]) -> csv::Result<String> {
    let mut buf = Vec::new();
    write_schedule_csv(schedule, participants, &mut buf)?;
    String::from_utf8(buf)
        .map_err(|e| csv::Error::from(io::Error::new(io::ErrorKind::InvalidData, e)))
}
