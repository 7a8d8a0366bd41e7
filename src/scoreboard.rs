//! Leaderboard ranking, rendering and the monthly settlement pass.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::problems::GameKind;
use crate::store::{Participant, ParticipantStore, StoreError};

/// Which scoring field a leaderboard is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaderboardScope {
    /// Current monthly contest totals.
    Month,
    /// Cumulative all-time points.
    AllTime,
    /// Per-variant high scores.
    Game(GameKind),
}

impl LeaderboardScope {
    pub fn title(&self) -> String {
        match self {
            LeaderboardScope::Month => "Monthly leaderboard".to_string(),
            LeaderboardScope::AllTime => "All-time leaderboard".to_string(),
            LeaderboardScope::Game(kind) => format!("High scores: {}", kind),
        }
    }
}

impl FromStr for LeaderboardScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "month" | "monthly" => Ok(LeaderboardScope::Month),
            "all" | "all_time" | "alltime" | "total" => Ok(LeaderboardScope::AllTime),
            other => other
                .parse::<GameKind>()
                .map(LeaderboardScope::Game)
                .map_err(|_| format!("unknown leaderboard scope: {}", other)),
        }
    }
}

/// One ranked leaderboard line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub name: String,
    pub score: f64,
}

/// Shown when a scoreboard has no qualifying entries.
pub const EMPTY_BOARD: &str = "No players on the scoreboard yet.";

/// Sorts entries by score and assigns competition-style ranks.
///
/// Tied entries share the first rank of their group and the counter keeps
/// advancing underneath, so scores `[10, 10, 7, 7, 5]` rank `[1, 1, 3, 3, 5]`.
pub fn rank(mut entries: Vec<(String, f64)>) -> Vec<LeaderboardRow> {
    entries.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    let mut rows: Vec<LeaderboardRow> = Vec::with_capacity(entries.len());
    for (i, (name, score)) in entries.into_iter().enumerate() {
        let rank = match rows.last() {
            Some(prev) if prev.score == score => prev.rank,
            _ => i + 1,
        };
        rows.push(LeaderboardRow { rank, name, score });
    }
    rows
}

/// Prefix of ranked rows that a rendered board shows: the top five, extended
/// by everyone tied with the fifth place.
pub fn visible_rows(rows: &[LeaderboardRow]) -> &[LeaderboardRow] {
    if rows.len() <= 5 {
        return rows;
    }
    let cut_score = rows[4].score;
    let mut end = 5;
    while end < rows.len() && rows[end].score == cut_score {
        end += 1;
    }
    &rows[..end]
}

/// Renders ranked rows as a plain-text board with a title line.
pub fn render(rows: &[LeaderboardRow], title: &str) -> String {
    let shown = visible_rows(rows);
    if shown.is_empty() {
        return EMPTY_BOARD.to_string();
    }
    let mut out = format!("{}:", title);
    for row in shown {
        out.push_str(&format!(
            "\n{}. {}: {}",
            row.rank,
            row.name,
            format_score(row.score)
        ));
    }
    out
}

fn format_score(score: f64) -> String {
    if score.fract().abs() < 1e-9 {
        format!("{:.0}", score)
    } else {
        format!("{:.1}", score)
    }
}

/// Extracts `(name, score)` pairs for a scope. Participants without the
/// scope's scoring field are left off the board.
pub fn rows_for(scope: LeaderboardScope, participants: &[Participant]) -> Vec<(String, f64)> {
    match scope {
        LeaderboardScope::Month => participants
            .iter()
            .filter_map(|p| p.month_points.map(|m| (p.name.clone(), m)))
            .collect(),
        LeaderboardScope::AllTime => participants
            .iter()
            .map(|p| (p.name.clone(), p.points))
            .collect(),
        LeaderboardScope::Game(kind) => participants
            .iter()
            .filter_map(|p| {
                p.high_scores
                    .get(&kind)
                    .map(|&s| (p.name.clone(), s as f64))
            })
            .collect(),
    }
}

/// Full store-to-text pipeline for one scope.
pub fn leaderboard_text(
    store: &dyn ParticipantStore,
    scope: LeaderboardScope,
) -> Result<String, StoreError> {
    let participants = store.all()?;
    let rows = rank(rows_for(scope, &participants));
    Ok(render(&rows, &scope.title()))
}

/// Monthly settlement: everyone with a recorded month score `m` gains
/// `200 * m / M` cumulative points, where `M` is the best month score, and
/// the month field resets. Returns how many participants were settled.
///
/// With no recorded month scores, or a best of zero, nothing changes.
pub fn settle_month(store: &dyn ParticipantStore) -> Result<usize, StoreError> {
    let participants = store.all()?;
    let recorded: Vec<(crate::store::ParticipantId, f64)> = participants
        .iter()
        .filter_map(|p| p.month_points.map(|m| (p.id, m)))
        .collect();
    if recorded.is_empty() {
        return Ok(0);
    }
    let best = recorded.iter().map(|&(_, m)| m).fold(f64::MIN, f64::max);
    if best <= 0.0 {
        return Ok(0);
    }
    for &(id, m) in &recorded {
        store.add_points(id, 200.0 * m / best)?;
        store.clear_month_points(id)?;
    }
    Ok(recorded.len())
}
