//! JSON API over the tournament service. Mounted by the `web` binary.
//!
//! Errors are returned as `{"error": "..."}` with 400 for bad input, 404 for
//! unknown ids, 409 for state conflicts and 500 for broken state or storage.

use crate::config::bracket_bounds;
use crate::logic::{Progress, Proposal, Rect};
use crate::models::{
    ErrorKind, FormationId, InviteId, MemberId, TeamId, TenantId, Tournament, TournamentError,
    TournamentId, TournamentSettings,
};
use crate::notify::LogNotifier;
use crate::service::TournamentService;
use crate::store::MemoryStore;
use actix_web::{
    delete, get, post, put,
    web::{Data, Json, Path, Query, ServiceConfig},
    HttpResponse, Responder,
};
use serde::{Deserialize, Serialize};

/// Shared state: the service plus the default drawing area for brackets.
pub struct AppData {
    pub service: TournamentService<MemoryStore, LogNotifier>,
    pub bounds: Rect,
}

type AppState = Data<AppData>;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

/// A tournament after a bracket transition, with what the transition did.
#[derive(Serialize)]
struct TransitionResponse {
    tournament: Tournament,
    result: Progress,
}

impl From<(Tournament, Progress)> for TransitionResponse {
    fn from((tournament, result): (Tournament, Progress)) -> Self {
        Self { tournament, result }
    }
}

#[derive(Deserialize)]
struct CreateTournamentBody {
    tenant_id: TenantId,
    #[serde(flatten)]
    settings: TournamentSettings,
}

#[derive(Deserialize)]
struct SetMatchWinnerBody {
    match_index: usize,
    team_id: TeamId,
}

#[derive(Deserialize)]
struct MemberBody {
    member_id: MemberId,
}

#[derive(Deserialize)]
struct InviteBody {
    inviter_id: MemberId,
    member_id: MemberId,
}

fn default_history_limit() -> usize {
    10
}

#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(default)]
    skip: usize,
    #[serde(default = "default_history_limit")]
    limit: usize,
}

/// Optional canvas size; the configured one is used otherwise.
#[derive(Deserialize)]
struct BracketQuery {
    width: Option<f64>,
    height: Option<f64>,
}

/// Path segment: tournament id (e.g. /api/tournaments/{id})
#[derive(Deserialize)]
struct TournamentPath {
    id: TournamentId,
}

#[derive(Deserialize)]
struct TenantPath {
    tenant_id: TenantId,
}

#[derive(Deserialize)]
struct TournamentTeamPath {
    id: TournamentId,
    team_id: TeamId,
}

#[derive(Deserialize)]
struct TournamentMemberPath {
    id: TournamentId,
    member_id: MemberId,
}

#[derive(Deserialize)]
struct TournamentTeamNamePath {
    id: TournamentId,
    name: String,
}

#[derive(Deserialize)]
struct FormationPath {
    id: FormationId,
}

#[derive(Deserialize)]
struct InvitePath {
    id: InviteId,
}

fn error_response(e: &TournamentError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    match e.kind() {
        ErrorKind::Validation => HttpResponse::BadRequest().json(body),
        ErrorKind::NotFound => HttpResponse::NotFound().json(body),
        ErrorKind::Conflict => HttpResponse::Conflict().json(body),
        ErrorKind::Invariant | ErrorKind::Store => {
            log::error!("Request failed: {}", e);
            HttpResponse::InternalServerError().json(body)
        }
    }
}

fn respond<T: Serialize>(result: Result<T, TournamentError>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => error_response(&e),
    }
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "bracket-tourney",
    })
}

#[post("/api/tournaments")]
async fn api_create_tournament(state: AppState, body: Json<CreateTournamentBody>) -> HttpResponse {
    let body = body.into_inner();
    respond(state.service.create_tournament(body.tenant_id, body.settings))
}

#[get("/api/tournaments/{id}")]
async fn api_get_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.service.get_tournament(path.id))
}

/// Delete a tournament along with its teams and pending registrations.
#[delete("/api/tournaments/{id}")]
async fn api_delete_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    match state.service.delete_tournament(path.id) {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => error_response(&e),
    }
}

/// The open, pending or active tournament of a tenant.
#[get("/api/tenants/{tenant_id}/tournament")]
async fn api_live_tournament(state: AppState, path: Path<TenantPath>) -> HttpResponse {
    respond(state.service.live_tournament(path.tenant_id))
}

/// Past and current tournaments of a tenant, newest first (`?skip=&limit=`).
#[get("/api/tenants/{tenant_id}/tournaments")]
async fn api_history(
    state: AppState,
    path: Path<TenantPath>,
    query: Query<HistoryQuery>,
) -> HttpResponse {
    respond(state.service.history(path.tenant_id, query.skip, query.limit))
}

/// Close registration (Open -> Pending).
#[post("/api/tournaments/{id}/close")]
async fn api_close_registration(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.service.close_registration(path.id))
}

/// Seed the bracket and start round 1 (Open/Pending -> Active).
#[post("/api/tournaments/{id}/start")]
async fn api_start_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    let mut rng = rand::thread_rng();
    respond(
        state
            .service
            .start(path.id, &mut rng)
            .map(TransitionResponse::from),
    )
}

/// Set the winner of one match in the current round.
#[put("/api/tournaments/{id}/matches/winner")]
async fn api_set_match_winner(
    state: AppState,
    path: Path<TournamentPath>,
    body: Json<SetMatchWinnerBody>,
) -> HttpResponse {
    respond(
        state
            .service
            .set_winner(path.id, body.match_index, body.team_id)
            .map(TransitionResponse::from),
    )
}

/// Report a win for the member's team in its current match.
#[put("/api/tournaments/{id}/members/{member_id}/win")]
async fn api_member_win(state: AppState, path: Path<TournamentMemberPath>) -> HttpResponse {
    respond(
        state
            .service
            .set_winner_for_member(path.id, path.member_id)
            .map(TransitionResponse::from),
    )
}

#[get("/api/tournaments/{id}/teams")]
async fn api_list_teams(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    respond(state.service.teams(path.id))
}

#[get("/api/tournaments/{id}/teams/by-name/{name}")]
async fn api_team_by_name(state: AppState, path: Path<TournamentTeamNamePath>) -> HttpResponse {
    respond(state.service.team_by_name(path.id, &path.name))
}

#[get("/api/tournaments/{id}/members/{member_id}/team")]
async fn api_team_of_member(state: AppState, path: Path<TournamentMemberPath>) -> HttpResponse {
    respond(state.service.team_of_member(path.id, path.member_id))
}

/// Remove a team (Open or Pending only).
#[delete("/api/tournaments/{id}/teams/{team_id}")]
async fn api_kick_team(state: AppState, path: Path<TournamentTeamPath>) -> HttpResponse {
    match state.service.kick_team(path.id, path.team_id) {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => error_response(&e),
    }
}

/// Propose a team; invited members must confirm before it is registered.
#[post("/api/tournaments/{id}/registrations")]
async fn api_register(
    state: AppState,
    path: Path<TournamentPath>,
    body: Json<Proposal>,
) -> HttpResponse {
    respond(state.service.register(path.id, &body))
}

#[get("/api/formations/{id}")]
async fn api_get_formation(state: AppState, path: Path<FormationPath>) -> HttpResponse {
    respond(state.service.get_formation(path.id))
}

#[post("/api/formations/{id}/confirm")]
async fn api_confirm(
    state: AppState,
    path: Path<FormationPath>,
    body: Json<MemberBody>,
) -> HttpResponse {
    respond(state.service.confirm(path.id, body.member_id))
}

#[post("/api/formations/{id}/decline")]
async fn api_decline(
    state: AppState,
    path: Path<FormationPath>,
    body: Json<MemberBody>,
) -> HttpResponse {
    respond(state.service.decline(path.id, body.member_id))
}

/// Withdraw a proposal (leader only).
#[post("/api/formations/{id}/cancel")]
async fn api_cancel(
    state: AppState,
    path: Path<FormationPath>,
    body: Json<MemberBody>,
) -> HttpResponse {
    respond(state.service.cancel(path.id, body.member_id))
}

/// A team leader invites a member into the team.
#[post("/api/tournaments/{id}/invites")]
async fn api_invite(
    state: AppState,
    path: Path<TournamentPath>,
    body: Json<InviteBody>,
) -> HttpResponse {
    respond(state.service.invite(path.id, body.inviter_id, body.member_id))
}

#[get("/api/invites/{id}")]
async fn api_get_invite(state: AppState, path: Path<InvitePath>) -> HttpResponse {
    respond(state.service.get_invite(path.id))
}

#[post("/api/invites/{id}/accept")]
async fn api_accept_invite(
    state: AppState,
    path: Path<InvitePath>,
    body: Json<MemberBody>,
) -> HttpResponse {
    respond(state.service.accept_invite(path.id, body.member_id))
}

#[post("/api/invites/{id}/decline")]
async fn api_decline_invite(
    state: AppState,
    path: Path<InvitePath>,
    body: Json<MemberBody>,
) -> HttpResponse {
    respond(state.service.decline_invite(path.id, body.member_id))
}

/// Bracket geometry with labels and highlights for drawing.
#[get("/api/tournaments/{id}/bracket")]
async fn api_bracket(
    state: AppState,
    path: Path<TournamentPath>,
    query: Query<BracketQuery>,
) -> HttpResponse {
    let bounds = match (query.width, query.height) {
        (Some(w), Some(h)) => bracket_bounds(w, h),
        _ => state.bounds,
    };
    respond(state.service.bracket(path.id, bounds))
}

/// Register every route.
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(api_health)
        .service(api_create_tournament)
        .service(api_get_tournament)
        .service(api_delete_tournament)
        .service(api_live_tournament)
        .service(api_history)
        .service(api_close_registration)
        .service(api_start_tournament)
        .service(api_set_match_winner)
        .service(api_member_win)
        .service(api_list_teams)
        .service(api_team_by_name)
        .service(api_team_of_member)
        .service(api_kick_team)
        .service(api_register)
        .service(api_get_formation)
        .service(api_confirm)
        .service(api_decline)
        .service(api_cancel)
        .service(api_invite)
        .service(api_get_invite)
        .service(api_accept_invite)
        .service(api_decline_invite)
        .service(api_bracket);
}
