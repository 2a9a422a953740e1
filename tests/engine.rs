//! Integration tests for the tournament lifecycle: registration, start, results, completion.

use round_robin_web::{
    ActorId, EngineConfig, MatchStatus, MatchStore, MemoryStore, Missing, NewTournament,
    ParticipantId, ResultAuthority, TournamentEngine, TournamentError, TournamentId,
    TournamentStatus,
};
use uuid::Uuid;

struct Fixture {
    engine: TournamentEngine<MemoryStore>,
    owner: ActorId,
    tournament: TournamentId,
    players: Vec<ParticipantId>,
}

fn draft(name: &str) -> NewTournament {
    NewTournament {
        name: name.to_string(),
        ..Default::default()
    }
}

fn fixture_with_config(n: usize, config: EngineConfig) -> Fixture {
    let engine = TournamentEngine::with_config(MemoryStore::new(), config);
    let owner = Uuid::new_v4();
    let tournament = engine.create_tournament(owner, draft("Club night")).unwrap().id;
    let players: Vec<ParticipantId> = (0..n)
        .map(|i| {
            let id = Uuid::new_v4();
            engine
                .add_participant(owner, tournament, id, &format!("P{i}"))
                .unwrap();
            id
        })
        .collect();
    Fixture {
        engine,
        owner,
        tournament,
        players,
    }
}

fn fixture(n: usize) -> Fixture {
    fixture_with_config(n, EngineConfig::default())
}

#[test]
fn create_requires_a_name() {
    let engine = TournamentEngine::new(MemoryStore::new());
    let err = engine.create_tournament(Uuid::new_v4(), draft("   ")).unwrap_err();
    assert!(matches!(err, TournamentError::Validation(_)));
}

#[test]
fn new_tournament_is_draft_without_matches() {
    let f = fixture(3);
    let t = f.engine.get_tournament(f.tournament).unwrap();
    assert_eq!(t.status, TournamentStatus::Draft);
    assert_eq!(t.name, "Club night");
    assert!(f.engine.get_schedule(f.tournament).unwrap().rounds.is_empty());
}

#[test]
fn list_returns_newest_first() {
    let engine = TournamentEngine::new(MemoryStore::new());
    let owner = Uuid::new_v4();
    let first = engine.create_tournament(owner, draft("First")).unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    let second = engine.create_tournament(owner, draft("Second")).unwrap();
    let ids: Vec<_> = engine.list_tournaments().unwrap().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);
}

#[test]
fn participants_keep_registration_order() {
    let f = fixture(4);
    let listed: Vec<_> = f
        .engine
        .get_participants(f.tournament)
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(listed, f.players);
}

#[test]
fn duplicate_registration_is_rejected() {
    let f = fixture(2);
    let err = f
        .engine
        .add_participant(f.owner, f.tournament, f.players[0], "Again")
        .unwrap_err();
    assert!(matches!(err, TournamentError::DuplicateParticipant(id) if id == f.players[0]));
}

#[test]
fn blank_participant_name_is_rejected() {
    let f = fixture(0);
    let err = f
        .engine
        .add_participant(f.owner, f.tournament, Uuid::new_v4(), "  ")
        .unwrap_err();
    assert!(matches!(err, TournamentError::Validation(_)));
}

#[test]
fn actors_may_register_only_themselves() {
    let f = fixture(0);
    let stranger = Uuid::new_v4();
    f.engine
        .add_participant(stranger, f.tournament, stranger, "Walk-in")
        .unwrap();
    let err = f
        .engine
        .add_participant(stranger, f.tournament, Uuid::new_v4(), "Friend")
        .unwrap_err();
    assert!(matches!(err, TournamentError::Unauthorized(a) if a == stranger));
    f.engine
        .remove_participant(stranger, f.tournament, stranger)
        .unwrap();
    assert!(f.engine.get_participants(f.tournament).unwrap().is_empty());
}

#[test]
fn removing_unknown_participant_is_not_found() {
    let f = fixture(2);
    let ghost = Uuid::new_v4();
    let err = f
        .engine
        .remove_participant(f.owner, f.tournament, ghost)
        .unwrap_err();
    assert!(matches!(err, TournamentError::NotFound(Missing::Participant(id)) if id == ghost));
}

#[test]
fn unknown_tournament_is_not_found() {
    let engine = TournamentEngine::new(MemoryStore::new());
    let id = Uuid::new_v4();
    assert!(matches!(
        engine.get_standings(id),
        Err(TournamentError::NotFound(Missing::Tournament(t))) if t == id
    ));
}

#[test]
fn start_requires_two_participants() {
    for n in 0..2 {
        let f = fixture(n);
        let err = f.engine.start_tournament(f.owner, f.tournament).unwrap_err();
        assert!(matches!(
            err,
            TournamentError::InsufficientParticipants { required: 2, registered } if registered == n
        ));
        let t = f.engine.get_tournament(f.tournament).unwrap();
        assert_eq!(t.status, TournamentStatus::Draft);
    }
}

#[test]
fn only_creator_may_start() {
    let f = fixture(4);
    let err = f
        .engine
        .start_tournament(f.players[0], f.tournament)
        .unwrap_err();
    assert!(matches!(err, TournamentError::Unauthorized(_)));
}

#[test]
fn start_generates_round_robin_in_registration_order() {
    let f = fixture(4);
    let schedule = f.engine.start_tournament(f.owner, f.tournament).unwrap();
    let p = &f.players;

    let rounds: Vec<Vec<(ParticipantId, ParticipantId)>> = schedule
        .rounds
        .iter()
        .map(|r| {
            r.matches
                .iter()
                .map(|m| (m.participant_a, m.participant_b))
                .collect()
        })
        .collect();
    assert_eq!(
        rounds,
        vec![
            vec![(p[0], p[3]), (p[1], p[2])],
            vec![(p[0], p[2]), (p[3], p[1])],
            vec![(p[0], p[1]), (p[2], p[3])],
        ]
    );
    let numbers: Vec<u32> = schedule.rounds.iter().map(|r| r.round).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert!(schedule.matches().all(|m| m.status == MatchStatus::Scheduled));

    let t = f.engine.get_tournament(f.tournament).unwrap();
    assert_eq!(t.status, TournamentStatus::InProgress);
    assert_eq!(t.match_count, 6);
    assert_eq!(f.engine.get_schedule(f.tournament).unwrap(), schedule);
}

#[test]
fn odd_field_has_one_idle_participant_per_round() {
    let f = fixture(5);
    let schedule = f.engine.start_tournament(f.owner, f.tournament).unwrap();
    assert_eq!(schedule.rounds.len(), 5);
    assert_eq!(schedule.match_count(), 10);
    for round in &schedule.rounds {
        assert_eq!(round.matches.len(), 2);
        assert_eq!(round.idle.len(), 1);
    }
}

#[test]
fn second_start_fails_and_keeps_schedule() {
    let f = fixture(4);
    let first = f.engine.start_tournament(f.owner, f.tournament).unwrap();
    let err = f.engine.start_tournament(f.owner, f.tournament).unwrap_err();
    assert!(matches!(
        err,
        TournamentError::InvalidTransition {
            status: TournamentStatus::InProgress,
            ..
        }
    ));
    assert_eq!(f.engine.get_schedule(f.tournament).unwrap(), first);
}

#[test]
fn participants_are_frozen_once_started() {
    let f = fixture(3);
    f.engine.start_tournament(f.owner, f.tournament).unwrap();
    let add = f
        .engine
        .add_participant(f.owner, f.tournament, Uuid::new_v4(), "Late")
        .unwrap_err();
    assert!(matches!(add, TournamentError::InvalidTransition { .. }));
    let remove = f
        .engine
        .remove_participant(f.owner, f.tournament, f.players[0])
        .unwrap_err();
    assert!(matches!(remove, TournamentError::InvalidTransition { .. }));
}

#[test]
fn result_before_start_is_invalid_transition() {
    let f = fixture(2);
    let err = f
        .engine
        .record_match_result(f.owner, f.tournament, Uuid::new_v4(), f.players[0])
        .unwrap_err();
    assert!(matches!(
        err,
        TournamentError::InvalidTransition {
            status: TournamentStatus::Draft,
            ..
        }
    ));
}

#[test]
fn recording_a_result_awards_one_point() {
    let f = fixture(4);
    let schedule = f.engine.start_tournament(f.owner, f.tournament).unwrap();
    let m = &schedule.rounds[0].matches[0];

    let result = f
        .engine
        .record_match_result(f.owner, f.tournament, m.id, m.participant_b)
        .unwrap();
    assert_eq!(result.game.status, MatchStatus::Completed);
    assert_eq!(result.game.winner, Some(m.participant_b));
    assert_eq!(result.winner_points, 1);
    assert_eq!(result.tournament_status, TournamentStatus::InProgress);

    let stored = f.engine.store().get_match(m.id).unwrap().unwrap();
    assert_eq!(stored.winner, Some(m.participant_b));
    let standings = f.engine.get_standings(f.tournament).unwrap();
    assert_eq!(standings[0].participant_id, m.participant_b);
    assert_eq!(standings[0].points, 1);
}

#[test]
fn duplicate_result_is_already_completed_and_counted_once() {
    let f = fixture(3);
    let schedule = f.engine.start_tournament(f.owner, f.tournament).unwrap();
    let m = &schedule.rounds[0].matches[0];
    f.engine
        .record_match_result(f.owner, f.tournament, m.id, m.participant_a)
        .unwrap();
    let err = f
        .engine
        .record_match_result(f.owner, f.tournament, m.id, m.participant_a)
        .unwrap_err();
    assert!(matches!(err, TournamentError::AlreadyCompleted(id) if id == m.id));

    let points: u32 = f
        .engine
        .get_standings(f.tournament)
        .unwrap()
        .iter()
        .map(|s| s.points)
        .sum();
    assert_eq!(points, 1);
    assert_eq!(
        f.engine.get_tournament(f.tournament).unwrap().completed_matches,
        1
    );
}

#[test]
fn rescoring_with_the_other_winner_is_rejected() {
    let f = fixture(3);
    let schedule = f.engine.start_tournament(f.owner, f.tournament).unwrap();
    let m = &schedule.rounds[0].matches[0];
    f.engine
        .record_match_result(f.owner, f.tournament, m.id, m.participant_a)
        .unwrap();
    let err = f
        .engine
        .record_match_result(f.owner, f.tournament, m.id, m.participant_b)
        .unwrap_err();
    assert!(matches!(err, TournamentError::AlreadyCompleted(_)));
    let stored = f.engine.store().get_match(m.id).unwrap().unwrap();
    assert_eq!(stored.winner, Some(m.participant_a));
}

#[test]
fn winner_must_play_in_the_match() {
    let f = fixture(4);
    let schedule = f.engine.start_tournament(f.owner, f.tournament).unwrap();
    let m = &schedule.rounds[0].matches[0];
    let outsider = *f.players.iter().find(|p| !m.involves(**p)).unwrap();
    let err = f
        .engine
        .record_match_result(f.owner, f.tournament, m.id, outsider)
        .unwrap_err();
    assert!(matches!(err, TournamentError::InvalidWinner { winner, .. } if winner == outsider));
    assert!(!f.engine.store().get_match(m.id).unwrap().unwrap().is_completed());
}

#[test]
fn unknown_or_foreign_match_is_not_found() {
    let f = fixture(2);
    f.engine.start_tournament(f.owner, f.tournament).unwrap();
    let err = f
        .engine
        .record_match_result(f.owner, f.tournament, Uuid::new_v4(), f.players[0])
        .unwrap_err();
    assert!(matches!(err, TournamentError::NotFound(Missing::Match(_))));

    // A match of another tournament in the same store is unknown here too.
    let other = f.engine.create_tournament(f.owner, draft("Other")).unwrap().id;
    f.engine
        .add_participant(f.owner, other, Uuid::new_v4(), "X")
        .unwrap();
    f.engine
        .add_participant(f.owner, other, Uuid::new_v4(), "Y")
        .unwrap();
    let foreign = f.engine.start_tournament(f.owner, other).unwrap().rounds[0].matches[0].id;
    let err = f
        .engine
        .record_match_result(f.owner, f.tournament, foreign, f.players[0])
        .unwrap_err();
    assert!(matches!(err, TournamentError::NotFound(Missing::Match(id)) if id == foreign));
}

#[test]
fn tournament_completes_exactly_when_last_match_finishes() {
    let f = fixture(3);
    let schedule = f.engine.start_tournament(f.owner, f.tournament).unwrap();
    let matches: Vec<_> = schedule.matches().cloned().collect();
    assert_eq!(matches.len(), 3);

    let mut completions = 0;
    for (i, m) in matches.iter().enumerate() {
        let result = f
            .engine
            .record_match_result(f.owner, f.tournament, m.id, m.participant_a)
            .unwrap();
        let status = f.engine.get_tournament(f.tournament).unwrap().status;
        assert_eq!(status, result.tournament_status);
        if i < 2 {
            assert_eq!(status, TournamentStatus::InProgress);
        } else {
            assert_eq!(status, TournamentStatus::Completed);
        }
        if result.tournament_status == TournamentStatus::Completed {
            completions += 1;
        }
    }
    assert_eq!(completions, 1);

    let t = f.engine.get_tournament(f.tournament).unwrap();
    assert_eq!(t.completed_matches, 3);
    assert_eq!(t.remaining_matches(), 0);
}

#[test]
fn completed_tournament_rejects_changes() {
    let f = fixture(2);
    let schedule = f.engine.start_tournament(f.owner, f.tournament).unwrap();
    let m = &schedule.rounds[0].matches[0];
    f.engine
        .record_match_result(f.owner, f.tournament, m.id, m.participant_b)
        .unwrap();

    assert!(matches!(
        f.engine
            .record_match_result(f.owner, f.tournament, m.id, m.participant_a),
        Err(TournamentError::TournamentClosed(_))
    ));
    assert!(matches!(
        f.engine
            .add_participant(f.owner, f.tournament, Uuid::new_v4(), "Late"),
        Err(TournamentError::TournamentClosed(_))
    ));
    assert!(matches!(
        f.engine.add_referee(f.owner, f.tournament, Uuid::new_v4()),
        Err(TournamentError::TournamentClosed(_))
    ));
    assert!(matches!(
        f.engine.start_tournament(f.owner, f.tournament),
        Err(TournamentError::InvalidTransition {
            status: TournamentStatus::Completed,
            ..
        })
    ));
}

#[test]
fn non_creator_cannot_record_results_by_default() {
    let f = fixture(2);
    let referee = Uuid::new_v4();
    f.engine.add_referee(f.owner, f.tournament, referee).unwrap();
    let schedule = f.engine.start_tournament(f.owner, f.tournament).unwrap();
    let m = &schedule.rounds[0].matches[0];
    let err = f
        .engine
        .record_match_result(referee, f.tournament, m.id, m.participant_a)
        .unwrap_err();
    assert!(matches!(err, TournamentError::Unauthorized(a) if a == referee));
}

#[test]
fn referees_record_results_when_policy_allows() {
    let config = EngineConfig {
        result_authority: ResultAuthority::CreatorOrReferee,
        ..EngineConfig::default()
    };
    let f = fixture_with_config(2, config);
    let referee = Uuid::new_v4();
    let t = f.engine.add_referee(f.owner, f.tournament, referee).unwrap();
    assert_eq!(t.referees, vec![referee]);
    // Adding twice is a no-op.
    let t = f.engine.add_referee(f.owner, f.tournament, referee).unwrap();
    assert_eq!(t.referees, vec![referee]);

    let schedule = f.engine.start_tournament(f.owner, f.tournament).unwrap();
    let m = &schedule.rounds[0].matches[0];
    let stranger = Uuid::new_v4();
    assert!(matches!(
        f.engine
            .record_match_result(stranger, f.tournament, m.id, m.participant_a),
        Err(TournamentError::Unauthorized(_))
    ));
    let result = f
        .engine
        .record_match_result(referee, f.tournament, m.id, m.participant_a)
        .unwrap();
    assert_eq!(result.tournament_status, TournamentStatus::Completed);
}

#[test]
fn only_creator_adds_referees() {
    let f = fixture(2);
    let err = f
        .engine
        .add_referee(f.players[0], f.tournament, f.players[0])
        .unwrap_err();
    assert!(matches!(err, TournamentError::Unauthorized(_)));
}

#[test]
fn configured_points_per_win_are_credited() {
    let config = EngineConfig {
        points_per_win: 3,
        ..EngineConfig::default()
    };
    let f = fixture_with_config(3, config);
    let schedule = f.engine.start_tournament(f.owner, f.tournament).unwrap();
    let m = &schedule.rounds[0].matches[0];
    let result = f
        .engine
        .record_match_result(f.owner, f.tournament, m.id, m.participant_a)
        .unwrap();
    assert_eq!(result.winner_points, 3);
}

#[test]
fn configured_minimum_participants_applies() {
    let config = EngineConfig {
        min_participants: 4,
        ..EngineConfig::default()
    };
    let f = fixture_with_config(3, config);
    let err = f.engine.start_tournament(f.owner, f.tournament).unwrap_err();
    assert!(matches!(
        err,
        TournamentError::InsufficientParticipants {
            required: 4,
            registered: 3
        }
    ));
}

#[test]
fn full_tournament_standings_sum_to_match_count() {
    let f = fixture(6);
    let schedule = f.engine.start_tournament(f.owner, f.tournament).unwrap();
    for m in schedule.matches() {
        // Lower registration index wins.
        let ia = f.players.iter().position(|p| *p == m.participant_a).unwrap();
        let ib = f.players.iter().position(|p| *p == m.participant_b).unwrap();
        let winner = if ia < ib { m.participant_a } else { m.participant_b };
        f.engine
            .record_match_result(f.owner, f.tournament, m.id, winner)
            .unwrap();
    }
    let standings = f.engine.get_standings(f.tournament).unwrap();
    let ids: Vec<_> = standings.iter().map(|s| s.participant_id).collect();
    assert_eq!(ids, f.players);
    let points: Vec<u32> = standings.iter().map(|s| s.points).collect();
    assert_eq!(points, vec![5, 4, 3, 2, 1, 0]);
    assert_eq!(
        f.engine.get_tournament(f.tournament).unwrap().status,
        TournamentStatus::Completed
    );
}

#[test]
fn completed_tournament_is_closed_even_to_strangers() {
    let f = fixture(2);
    let schedule = f.engine.start_tournament(f.owner, f.tournament).unwrap();
    let m = &schedule.rounds[0].matches[0];
    f.engine
        .record_match_result(f.owner, f.tournament, m.id, m.participant_a)
        .unwrap();

    let stranger = Uuid::new_v4();
    let err = f
        .engine
        .record_match_result(stranger, f.tournament, m.id, m.participant_b)
        .unwrap_err();
    assert!(matches!(err, TournamentError::TournamentClosed(id) if id == f.tournament));
}

#[test]
fn lock_table_skips_unknown_ids_and_drops_completed_tournaments() {
    let f = fixture(2);
    assert_eq!(f.engine.active_locks(), 1);

    for _ in 0..100 {
        let unknown = Uuid::new_v4();
        let err = f
            .engine
            .add_participant(f.owner, unknown, Uuid::new_v4(), "Ghost")
            .unwrap_err();
        assert!(matches!(err, TournamentError::NotFound(Missing::Tournament(id)) if id == unknown));
    }
    assert_eq!(f.engine.active_locks(), 1);

    let schedule = f.engine.start_tournament(f.owner, f.tournament).unwrap();
    let m = &schedule.rounds[0].matches[0];
    f.engine
        .record_match_result(f.owner, f.tournament, m.id, m.participant_a)
        .unwrap();
    assert_eq!(f.engine.active_locks(), 0);

    // Later calls on the finished tournament do not bring the entry back.
    assert!(f
        .engine
        .record_match_result(f.owner, f.tournament, m.id, m.participant_a)
        .is_err());
    assert!(f.engine.add_referee(f.owner, f.tournament, Uuid::new_v4()).is_err());
    assert_eq!(f.engine.active_locks(), 0);
}
