//! Tournament business logic: seeding, round advancement, team formation and invites, bracket layout.

mod advancement;
mod formation;
mod invite;
mod layout;
mod seeding;

pub use advancement::{
    advance, find_match, next_round, round_complete, set_winner, set_winner_for_member, Progress,
};
pub use formation::{
    cancel, confirm, decline, expire_if_due, finalize, propose, team_of, ConfirmOutcome, Proposal,
};
pub use invite::{accept_invite, decline_invite, expire_invite_if_due, invite};
pub use layout::{
    bracket_view, layout, parents, round_sizes, BracketLayout, BracketView, Highlight, LayoutMode,
    MatchBox, MatchView, Point, Rect, Segment, Side, SlotView, BYE_LABEL, DUAL_SIDED_MIN_MATCHES,
};
pub use seeding::{fill_order, place_teams, seed_bracket, start_tournament};
