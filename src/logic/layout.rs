//! Bracket layout: deterministic match-box geometry for a renderer.
//!
//! Brackets with fewer than 16 teams are laid out single-sided, rounds running
//! left to right. Larger brackets are split into a left and a right half that
//! converge on a final centered in the drawing area.
//!
//! Positions are computed for the whole planned bracket (every round down to
//! the final), so boxes keep their place as later rounds appear. Centers live
//! in a plain arena indexed by `(round, slot)` and are filled round by round:
//! a match sits halfway between the two matches that feed it.

use crate::models::{Match, Result, Slot, TeamId, Tournament, TournamentError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

/// First-round match count from which the bracket is drawn on two sides.
pub const DUAL_SIDED_MIN_MATCHES: usize = 8;

/// Horizontal room kept free between the two halves for the final.
const CENTER_SPACE: f64 = 140.0;

/// Axis-aligned rectangle in drawing units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// A straight bracket line.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Segment {
    pub from: Point,
    pub to: Point,
}

fn segment(x1: f64, y1: f64, x2: f64, y2: f64) -> Segment {
    Segment {
        from: Point { x: x1, y: y1 },
        to: Point { x: x2, y: y2 },
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutMode {
    SingleSided,
    DualSided,
}

/// Which half of the drawing a match belongs to. Single-sided brackets are all `Left`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
    Center,
}

/// Geometry of one match: two stacked slots separated by a gap.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MatchBox {
    pub round: usize,
    pub index: usize,
    pub side: Side,
    pub rect: Rect,
    pub slot_height: f64,
    pub gap: f64,
    /// The round is already behind the tournament's current round.
    pub past_round: bool,
}

impl MatchBox {
    /// y of the underline of the first and the second slot.
    pub fn slot_lines(&self) -> (f64, f64) {
        let first = self.rect.y + self.slot_height;
        (first, first + self.gap + self.slot_height)
    }

    pub fn center_y(&self) -> f64 {
        self.rect.center_y()
    }
}

/// Computed geometry for every existing match plus the connecting lines.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BracketLayout {
    pub mode: LayoutMode,
    pub bounds: Rect,
    pub boxes: Vec<Vec<MatchBox>>,
    pub connectors: Vec<Segment>,
    /// Dual-sided only: centerlines of the left and right matches feeding the final.
    pub terminals: Option<[f64; 2]>,
}

impl BracketLayout {
    pub fn get(&self, round: usize, index: usize) -> Option<&MatchBox> {
        self.boxes.get(round).and_then(|r| r.get(index))
    }
}

#[derive(Clone, Copy, Debug)]
struct BoxGeometry {
    slot_height: f64,
    gap: f64,
}

struct Sizing {
    slot: (f64, f64, f64),
    gap: (f64, f64, f64),
}

const SINGLE_SIZING: Sizing = Sizing {
    slot: (0.35, 18.0, 28.0),
    gap: (0.15, 5.0, 15.0),
};

const DUAL_SIZING: Sizing = Sizing {
    slot: (0.35, 16.0, 24.0),
    gap: (0.12, 4.0, 12.0),
};

impl BoxGeometry {
    /// Size a box for `space` units of vertical room. Boxes never take more
    /// than 90% of it, so neighbours in a round cannot touch.
    fn fit(space: f64, sizing: &Sizing) -> Self {
        let (ratio, lo, hi) = sizing.slot;
        let slot_height = (space * ratio).clamp(lo, hi);
        let (ratio, lo, hi) = sizing.gap;
        let gap = (space * ratio).clamp(lo, hi);
        let height = slot_height * 2.0 + gap;
        let room = (space * 0.9).max(0.0);
        if height > room {
            let scale = room / height;
            Self {
                slot_height: slot_height * scale,
                gap: gap * scale,
            }
        } else {
            Self { slot_height, gap }
        }
    }

    fn height(&self) -> f64 {
        self.slot_height * 2.0 + self.gap
    }
}

/// Match count of every round of a bracket whose first round has `first`
/// matches, down to the final. Each round pairs up the previous one; an odd
/// trailing winner meets a bye.
pub fn round_sizes(first: usize) -> Vec<usize> {
    if first == 0 {
        return Vec::new();
    }
    let mut sizes = vec![first];
    let mut n = first;
    while n > 1 {
        n = n.div_ceil(2);
        sizes.push(n);
    }
    sizes
}

/// Indices of the matches in the previous round (of `prev_len` matches) that feed match `index`.
pub fn parents(prev_len: usize, index: usize) -> Range<usize> {
    let first = 2 * index;
    first..(first + 2).min(prev_len)
}

struct Plan {
    mode: LayoutMode,
    sides: Vec<Vec<Side>>,
    centers: Vec<Vec<f64>>,
    xs: Vec<Vec<f64>>,
    box_width: f64,
    geometry: BoxGeometry,
    terminals: Option<[f64; 2]>,
}

fn spread(bounds: &Rect, count: usize, i: usize) -> f64 {
    let space = bounds.height / count as f64;
    bounds.y + (i as f64 + 0.5) * space
}

fn fill_midpoints(centers: &mut [Vec<f64>], sizes: &[usize], rounds: Range<usize>) {
    for r in rounds {
        let row: Vec<f64> = (0..sizes[r])
            .map(|i| {
                let feeding = parents(sizes[r - 1], i);
                let n = feeding.len() as f64;
                feeding.map(|p| centers[r - 1][p]).sum::<f64>() / n
            })
            .collect();
        centers[r] = row;
    }
}

fn plan_single(sizes: &[usize], bounds: &Rect) -> Plan {
    let rounds = sizes.len() as f64;
    let round_spacing = bounds.width / rounds;
    let box_width = ((bounds.width - 40.0) / rounds).clamp(0.0, 180.0);
    let geometry = BoxGeometry::fit(bounds.height / sizes[0] as f64, &SINGLE_SIZING);

    let mut centers: Vec<Vec<f64>> = sizes.iter().map(|&n| vec![0.0; n]).collect();
    centers[0] = (0..sizes[0]).map(|i| spread(bounds, sizes[0], i)).collect();
    fill_midpoints(&mut centers, sizes, 1..sizes.len());

    let xs = sizes
        .iter()
        .enumerate()
        .map(|(r, &n)| vec![bounds.x + r as f64 * round_spacing; n])
        .collect();
    Plan {
        mode: LayoutMode::SingleSided,
        sides: sizes.iter().map(|&n| vec![Side::Left; n]).collect(),
        centers,
        xs,
        box_width,
        geometry,
        terminals: None,
    }
}

/// The final's two feeders root the left and right halves; every other match
/// inherits the side of the match it feeds.
fn assign_sides(sizes: &[usize]) -> Vec<Vec<Side>> {
    let mut sides: Vec<Vec<Side>> = sizes.iter().map(|&n| vec![Side::Center; n]).collect();
    for r in (1..sizes.len()).rev() {
        for i in 0..sizes[r] {
            let child = sides[r][i];
            for (k, p) in parents(sizes[r - 1], i).enumerate() {
                sides[r - 1][p] = match (child, k) {
                    (Side::Center, 0) => Side::Left,
                    (Side::Center, _) => Side::Right,
                    (side, _) => side,
                };
            }
        }
    }
    sides
}

fn plan_dual(sizes: &[usize], bounds: &Rect) -> Plan {
    let final_round = sizes.len() - 1;
    let terminal_round = final_round - 1;
    let side_width = ((bounds.width - CENTER_SPACE) / 2.0).max(0.0);
    let round_spacing = side_width / final_round as f64;
    let box_width = (round_spacing * 0.7).clamp(0.0, 140.0);

    let sides = assign_sides(sizes);
    let left_leaves = sides[0].iter().filter(|&&s| s == Side::Left).count();
    let right_leaves = sizes[0] - left_leaves;

    let mut centers: Vec<Vec<f64>> = sizes.iter().map(|&n| vec![0.0; n]).collect();
    centers[0] = (0..sizes[0])
        .map(|i| {
            if i < left_leaves {
                spread(bounds, left_leaves, i)
            } else {
                spread(bounds, right_leaves, i - left_leaves)
            }
        })
        .collect();
    fill_midpoints(&mut centers, sizes, 1..final_round);

    // Both halves end on the same horizontal line as the final: the renderer
    // joins them with one straight connector. A half whose terminal is off
    // center is moved onto the line and squeezed towards it until its first
    // round fits the height again.
    let mid = bounds.center_y();
    let mut spacing = f64::INFINITY;
    for (k, (side, leaves)) in [(Side::Left, left_leaves), (Side::Right, right_leaves)]
        .into_iter()
        .enumerate()
    {
        let space = bounds.height / leaves as f64;
        let reach = (bounds.height - space) / 2.0;
        let terminal = centers[terminal_round][k];
        let members: Vec<(usize, usize)> = (0..final_round)
            .flat_map(|r| (0..sizes[r]).map(move |i| (r, i)))
            .filter(|&(r, i)| sides[r][i] == side)
            .collect();
        let extent = members
            .iter()
            .map(|&(r, i)| (centers[r][i] - terminal).abs())
            .fold(0.0, f64::max);
        let scale = if extent > reach { reach / extent } else { 1.0 };
        for &(r, i) in &members {
            centers[r][i] = mid + (centers[r][i] - terminal) * scale;
        }
        spacing = spacing.min(space * scale);
    }
    let geometry = BoxGeometry::fit(spacing, &DUAL_SIZING);
    centers[final_round][0] = mid;

    let xs = sides
        .iter()
        .enumerate()
        .map(|(r, row)| {
            let step = r as f64 * round_spacing;
            row.iter()
                .map(|side| match side {
                    Side::Left => bounds.x + step,
                    Side::Right => bounds.right() - box_width - step,
                    Side::Center => bounds.center_x() - box_width / 2.0,
                })
                .collect()
        })
        .collect();
    let terminals = Some([centers[terminal_round][0], centers[terminal_round][1]]);
    Plan {
        mode: LayoutMode::DualSided,
        sides,
        centers,
        xs,
        box_width,
        geometry,
        terminals,
    }
}

fn check_shape(rounds: &[Vec<Match>], sizes: &[usize]) -> Result<()> {
    if rounds.len() > sizes.len() {
        return Err(TournamentError::Corrupted(format!(
            "{} rounds stored for a bracket of {} rounds",
            rounds.len(),
            sizes.len()
        )));
    }
    for (r, (round, &expected)) in rounds.iter().zip(sizes).enumerate() {
        if round.len() != expected {
            return Err(TournamentError::Corrupted(format!(
                "round {} has {} matches, expected {}",
                r + 1,
                round.len(),
                expected
            )));
        }
    }
    Ok(())
}

/// Lines from the feeding matches into `child`.
fn connect(feeders: &[&MatchBox], child: &MatchBox, out: &mut Vec<Segment>) {
    let child_y = child.center_y();
    if child.side == Side::Center {
        // Dual-sided final: each half runs straight into the side of the final box.
        for p in feeders {
            let y = p.center_y();
            match p.side {
                Side::Right => out.push(segment(p.rect.x, y, child.rect.right(), y)),
                Side::Left | Side::Center => out.push(segment(p.rect.right(), y, child.rect.x, y)),
            }
        }
        return;
    }
    let (edge, child_edge) = match child.side {
        Side::Right => (feeders[0].rect.x, child.rect.right()),
        Side::Left | Side::Center => (feeders[0].rect.right(), child.rect.x),
    };
    let mid_x = edge + (child_edge - edge) * 0.3;
    for p in feeders {
        let y = p.center_y();
        out.push(segment(edge, y, mid_x, y));
    }
    if let [first, last] = feeders {
        out.push(segment(mid_x, first.center_y(), mid_x, last.center_y()));
    }
    out.push(segment(mid_x, child_y, child_edge, child_y));
}

/// Lay out the stored rounds inside `bounds`.
///
/// `current_round` is the tournament's 1-based current round; rounds before it
/// are flagged as past. The result depends only on the arguments.
pub fn layout(rounds: &[Vec<Match>], current_round: usize, bounds: Rect) -> Result<BracketLayout> {
    let first = rounds.first().map_or(0, Vec::len);
    let sizes = round_sizes(first);
    check_shape(rounds, &sizes)?;
    if sizes.is_empty() {
        return Ok(BracketLayout {
            mode: LayoutMode::SingleSided,
            bounds,
            boxes: Vec::new(),
            connectors: Vec::new(),
            terminals: None,
        });
    }

    let plan = if first >= DUAL_SIDED_MIN_MATCHES {
        plan_dual(&sizes, &bounds)
    } else {
        plan_single(&sizes, &bounds)
    };
    let height = plan.geometry.height();

    let boxes: Vec<Vec<MatchBox>> = rounds
        .iter()
        .enumerate()
        .map(|(r, round)| {
            (0..round.len())
                .map(|i| MatchBox {
                    round: r,
                    index: i,
                    side: plan.sides[r][i],
                    rect: Rect::new(
                        plan.xs[r][i],
                        plan.centers[r][i] - height / 2.0,
                        plan.box_width,
                        height,
                    ),
                    slot_height: plan.geometry.slot_height,
                    gap: plan.geometry.gap,
                    past_round: r + 1 < current_round,
                })
                .collect()
        })
        .collect();

    let mut connectors = Vec::new();
    for r in 1..boxes.len() {
        for child in &boxes[r] {
            let feeders: Vec<&MatchBox> = parents(boxes[r - 1].len(), child.index)
                .map(|p| &boxes[r - 1][p])
                .collect();
            connect(&feeders, child, &mut connectors);
        }
    }

    Ok(BracketLayout {
        mode: plan.mode,
        bounds,
        boxes,
        connectors,
        terminals: plan.terminals,
    })
}

/// How a slot should stand out when drawn.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Highlight {
    None,
    /// Advanced out of a finished round.
    Winner,
    /// The tournament champion; wins over `Winner`.
    Champion,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SlotView {
    pub label: String,
    /// Bracket position, first round only.
    pub seed: Option<usize>,
    pub highlight: Highlight,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MatchView {
    #[serde(flatten)]
    pub geometry: MatchBox,
    pub slots: [SlotView; 2],
}

/// Everything a renderer needs to draw the bracket of one tournament.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BracketView {
    pub mode: LayoutMode,
    pub bounds: Rect,
    pub current_round: usize,
    pub champion: Option<TeamId>,
    pub matches: Vec<Vec<MatchView>>,
    pub connectors: Vec<Segment>,
    pub terminals: Option<[f64; 2]>,
}

pub const BYE_LABEL: &str = "BYE";

fn label(slot: &Slot, names: &HashMap<TeamId, String>) -> String {
    match slot {
        Slot::Team(id) => names.get(id).cloned().unwrap_or_else(|| id.to_string()),
        Slot::Bye | Slot::Unassigned => BYE_LABEL.to_string(),
    }
}

/// Seed numbers of a first-round match. On two sides the right half continues
/// numbering after the left half.
fn seeds(first_round: &[MatchBox], b: &MatchBox) -> [usize; 2] {
    let left = first_round.iter().filter(|m| m.side == Side::Left).count();
    match b.side {
        Side::Right => {
            let j = b.index - left;
            [2 * left + 2 * j + 1, 2 * first_round.len() - 2 * j]
        }
        Side::Left | Side::Center => [2 * b.index + 1, 2 * left - 2 * b.index],
    }
}

fn highlights(m: &Match, past: bool, champion: Option<TeamId>) -> [Highlight; 2] {
    let won = match (past, m.winner) {
        (true, Some(w)) => [
            m.team1.team().is_some() && m.team1.team() == w.team(),
            m.team2.team().is_some() && m.team2.team() == w.team(),
        ],
        _ => [false, false],
    };
    let mark = |slot: &Slot, won: bool| {
        if champion.is_some() && slot.team() == champion {
            Highlight::Champion
        } else if won {
            Highlight::Winner
        } else {
            Highlight::None
        }
    };
    [mark(&m.team1, won[0]), mark(&m.team2, won[1])]
}

/// Lay out `tournament` and attach labels, seeds and highlighting.
pub fn bracket_view(
    tournament: &Tournament,
    bounds: Rect,
    names: &HashMap<TeamId, String>,
) -> Result<BracketView> {
    let geometry = layout(&tournament.matches, tournament.current_round, bounds)?;
    let champion = tournament.winner_id;

    let matches = geometry
        .boxes
        .iter()
        .zip(&tournament.matches)
        .map(|(boxes, round)| {
            boxes
                .iter()
                .zip(round)
                .map(|(b, m)| {
                    let seed = (b.round == 0).then(|| seeds(&geometry.boxes[0], b));
                    let marks = highlights(m, b.past_round, champion);
                    let slot = |k: usize, s: &Slot| SlotView {
                        label: label(s, names),
                        seed: seed.map(|pair| pair[k]),
                        highlight: marks[k],
                    };
                    MatchView {
                        geometry: *b,
                        slots: [slot(0, &m.team1), slot(1, &m.team2)],
                    }
                })
                .collect()
        })
        .collect();

    Ok(BracketView {
        mode: geometry.mode,
        bounds,
        current_round: tournament.current_round,
        champion,
        matches,
        connectors: geometry.connectors,
        terminals: geometry.terminals,
    })
}
