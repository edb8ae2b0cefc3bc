//! Single-elimination bracket tournaments: library with models, engines and the service layer.

pub mod api;
pub mod config;
pub mod logic;
pub mod models;
pub mod notify;
pub mod service;
pub mod store;

pub use config::Config;
pub use logic::{
    advance, bracket_view, fill_order, layout, place_teams, seed_bracket, set_winner,
    set_winner_for_member, start_tournament, BracketLayout, BracketView, ConfirmOutcome,
    LayoutMode, Progress, Proposal, Rect,
};
pub use models::{
    AbortReason, ErrorKind, FormationId, FormationState, InviteId, InviteState, Match, MemberId,
    PendingTeamFormation, Slot, Team, TeamId, TeamInvite, TenantId, Tournament, TournamentError,
    TournamentId, TournamentSettings, TournamentStatus, Winner,
};
pub use notify::{LogNotifier, Notifier, NotifyError};
pub use service::{
    Confirmation, History, Invitation, Registration, SweepReport, TournamentService,
};
pub use store::{MemoryStore, Store};
