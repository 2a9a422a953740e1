//! Single binary web server: REST API over the tournament engine.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default.
//! Override with env: HOST, PORT, POINTS_PER_WIN, RESULT_AUTHORITY (creator | referees),
//! MIN_PARTICIPANTS, COOKIE_SECURE (true | false), SESSION_KEY (at least 64 bytes).
//!
//! Identity is established upstream; `POST /api/session` stores the authenticated
//! actor id in a signed cookie and every mutating route reads it from there.

use actix_session::{storage::CookieSessionStore, Session, SessionMiddleware};
use actix_web::{
    cookie::Key,
    delete, get, post, put,
    web::{Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use round_robin_web::{
    schedule_to_csv, ActorId, EngineConfig, MemoryStore, MatchId, NewTournament, ParticipantId,
    ResultAuthority, TournamentEngine, TournamentError, TournamentId,
};
use serde::Deserialize;

type AppState = Data<TournamentEngine<MemoryStore>>;

/// Session key holding the current actor id.
const ACTOR_KEY: &str = "actor_id";

#[derive(serde::Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct SessionBody {
    actor_id: ActorId,
}

#[derive(Deserialize)]
struct AddParticipantBody {
    /// Defaults to the current actor (self registration).
    participant_id: Option<ParticipantId>,
    name: String,
}

#[derive(Deserialize)]
struct AddRefereeBody {
    referee_id: ActorId,
}

#[derive(Deserialize)]
struct SetMatchWinnerBody {
    winner_id: ParticipantId,
}

/// Path segment: tournament id (e.g. /api/tournaments/{id})
#[derive(Deserialize)]
struct TournamentPath {
    id: TournamentId,
}

/// Path segments: tournament id and participant id
#[derive(Deserialize)]
struct TournamentParticipantPath {
    id: TournamentId,
    participant_id: ParticipantId,
}

/// Path segments: tournament id and match id
#[derive(Deserialize)]
struct TournamentMatchPath {
    id: TournamentId,
    match_id: MatchId,
}

fn error_body(message: impl std::fmt::Display) -> serde_json::Value {
    serde_json::json!({ "error": message.to_string() })
}

/// Map an engine error to its HTTP status with a `{"error": ...}` body.
fn error_response(e: &TournamentError) -> HttpResponse {
    use TournamentError::*;
    let body = error_body(e);
    match e {
        Validation(_) | InsufficientParticipants { .. } | InvalidWinner { .. } => {
            HttpResponse::BadRequest().json(body)
        }
        Unauthorized(_) => HttpResponse::Forbidden().json(body),
        NotFound(_) => HttpResponse::NotFound().json(body),
        InvalidTransition { .. }
        | AlreadyCompleted(_)
        | TournamentClosed(_)
        | DuplicateParticipant(_) => HttpResponse::Conflict().json(body),
        Storage(_) => HttpResponse::InternalServerError().json(body),
    }
}

/// Actor from the session, or the response to return when there is none.
fn current_actor(session: &Session) -> Result<ActorId, HttpResponse> {
    match session.get::<ActorId>(ACTOR_KEY) {
        Ok(Some(actor)) => Ok(actor),
        Ok(None) => Err(HttpResponse::Unauthorized().json(error_body("Not signed in"))),
        Err(_) => Err(HttpResponse::BadRequest().json(error_body("Invalid session"))),
    }
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "round-robin-web",
    })
}

/// Store the actor id supplied by the identity service in the session cookie.
#[post("/api/session")]
async fn api_sign_in(session: Session, body: Json<SessionBody>) -> HttpResponse {
    session.renew();
    match session.insert(ACTOR_KEY, body.actor_id) {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({ "actor_id": body.actor_id })),
        Err(e) => HttpResponse::InternalServerError().json(error_body(e)),
    }
}

#[delete("/api/session")]
async fn api_sign_out(session: Session) -> HttpResponse {
    session.purge();
    HttpResponse::NoContent().finish()
}

/// List tournaments, newest first.
#[get("/api/tournaments")]
async fn api_list_tournaments(state: AppState) -> HttpResponse {
    match state.list_tournaments() {
        Ok(all) => HttpResponse::Ok().json(all),
        Err(e) => error_response(&e),
    }
}

/// Create a Draft tournament owned by the current actor.
#[post("/api/tournaments")]
async fn api_create_tournament(
    state: AppState,
    session: Session,
    body: Json<NewTournament>,
) -> HttpResponse {
    let actor = match current_actor(&session) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match state.create_tournament(actor, body.into_inner()) {
        Ok(t) => HttpResponse::Created().json(t),
        Err(e) => error_response(&e),
    }
}

/// Get a tournament with its participants.
#[get("/api/tournaments/{id}")]
async fn api_get_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let tournament = match state.get_tournament(path.id) {
        Ok(t) => t,
        Err(e) => return error_response(&e),
    };
    match state.get_participants(path.id) {
        Ok(participants) => HttpResponse::Ok().json(serde_json::json!({
            "tournament": tournament,
            "participants": participants,
        })),
        Err(e) => error_response(&e),
    }
}

/// Register a participant (Draft only).
#[post("/api/tournaments/{id}/participants")]
async fn api_add_participant(
    state: AppState,
    session: Session,
    path: Path<TournamentPath>,
    body: Json<AddParticipantBody>,
) -> HttpResponse {
    let actor = match current_actor(&session) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    let participant_id = body.participant_id.unwrap_or(actor);
    match state.add_participant(actor, path.id, participant_id, &body.name) {
        Ok(p) => HttpResponse::Created().json(p),
        Err(e) => error_response(&e),
    }
}

/// Unregister a participant (Draft only).
#[delete("/api/tournaments/{id}/participants/{participant_id}")]
async fn api_remove_participant(
    state: AppState,
    session: Session,
    path: Path<TournamentParticipantPath>,
) -> HttpResponse {
    let actor = match current_actor(&session) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match state.remove_participant(actor, path.id, path.participant_id) {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => error_response(&e),
    }
}

/// Allow another actor to record results (creator only).
#[post("/api/tournaments/{id}/referees")]
async fn api_add_referee(
    state: AppState,
    session: Session,
    path: Path<TournamentPath>,
    body: Json<AddRefereeBody>,
) -> HttpResponse {
    let actor = match current_actor(&session) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match state.add_referee(actor, path.id, body.referee_id) {
        Ok(t) => HttpResponse::Ok().json(t),
        Err(e) => error_response(&e),
    }
}

/// Start the tournament (Draft -> InProgress) and return the generated schedule.
#[post("/api/tournaments/{id}/start")]
async fn api_start_tournament(
    state: AppState,
    session: Session,
    path: Path<TournamentPath>,
) -> HttpResponse {
    let actor = match current_actor(&session) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match state.start_tournament(actor, path.id) {
        Ok(schedule) => HttpResponse::Ok().json(schedule),
        Err(e) => error_response(&e),
    }
}

/// Record the winner of one match.
#[put("/api/tournaments/{id}/matches/{match_id}/winner")]
async fn api_set_match_winner(
    state: AppState,
    session: Session,
    path: Path<TournamentMatchPath>,
    body: Json<SetMatchWinnerBody>,
) -> HttpResponse {
    let actor = match current_actor(&session) {
        Ok(a) => a,
        Err(resp) => return resp,
    };
    match state.record_match_result(actor, path.id, path.match_id, body.winner_id) {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(e) => error_response(&e),
    }
}

#[get("/api/tournaments/{id}/standings")]
async fn api_standings(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    match state.get_standings(path.id) {
        Ok(standings) => HttpResponse::Ok().json(standings),
        Err(e) => error_response(&e),
    }
}

#[get("/api/tournaments/{id}/schedule")]
async fn api_schedule(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    match state.get_schedule(path.id) {
        Ok(schedule) => HttpResponse::Ok().json(schedule),
        Err(e) => error_response(&e),
    }
}

/// Download the schedule as CSV.
#[get("/api/tournaments/{id}/schedule.csv")]
async fn api_schedule_csv(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let schedule = match state.get_schedule(path.id) {
        Ok(s) => s,
        Err(e) => return error_response(&e),
    };
    let participants = match state.get_participants(path.id) {
        Ok(p) => p,
        Err(e) => return error_response(&e),
    };
    match schedule_to_csv(&schedule, &participants) {
        Ok(csv) => HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .insert_header((
                "Content-Disposition",
                format!("attachment; filename=\"schedule-{}.csv\"", path.id),
            ))
            .body(csv),
        Err(e) => {
            log::error!("CSV export failed for tournament {}: {}", path.id, e);
            HttpResponse::InternalServerError().json(error_body("CSV export failed"))
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Parse env var `name`, falling back to `default` (with a warning) when unset or invalid.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Ignoring invalid {}={:?}", name, raw);
            default
        }),
        Err(_) => default,
    }
}

fn engine_config_from_env() -> EngineConfig {
    let defaults = EngineConfig::default();
    EngineConfig {
        points_per_win: env_or("POINTS_PER_WIN", defaults.points_per_win),
        result_authority: env_or::<ResultAuthority>("RESULT_AUTHORITY", defaults.result_authority),
        min_participants: env_or("MIN_PARTICIPANTS", defaults.min_participants),
    }
}

fn session_key() -> Key {
    if let Ok(raw) = std::env::var("SESSION_KEY") {
        match Key::try_from(raw.as_bytes()) {
            Ok(key) => return key,
            Err(_) => log::warn!("SESSION_KEY must be at least 64 bytes; using a random key"),
        }
    }
    Key::generate()
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = std::env::var("HOST").unwrap_or_else(|_| default_host());
    let port: u16 = env_or("PORT", default_port());
    let cookie_secure: bool = env_or("COOKIE_SECURE", false);
    let config = engine_config_from_env();
    log::info!(
        "Engine config: {} point(s) per win, results by {:?}, min {} participants",
        config.points_per_win,
        config.result_authority,
        config.min_participants
    );

    let state: AppState = Data::new(TournamentEngine::with_config(MemoryStore::new(), config));
    let key = session_key();

    log::info!("Starting server at http://{}:{}", host, port);
    HttpServer::new(move || {
        App::new()
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), key.clone())
                    .cookie_secure(cookie_secure)
                    .build(),
            )
            .app_data(state.clone())
            .service(api_health)
            .service(api_sign_in)
            .service(api_sign_out)
            .service(api_list_tournaments)
            .service(api_create_tournament)
            .service(api_get_tournament)
            .service(api_add_participant)
            .service(api_remove_participant)
            .service(api_add_referee)
            .service(api_start_tournament)
            .service(api_set_match_winner)
            .service(api_standings)
            .service(api_schedule)
            .service(api_schedule_csv)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
