//! Points-table ordering for the teams of one group.
//!
//! Teams are ordered by points, then by whichever tie-break metrics the owning
//! sport enables, always in the fixed order net run rate → goal difference →
//! point difference.
use crate::Team;
use std::cmp::Ordering;

/// The three per-sport tie-break switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TieBreakFlags {
    pub uses_nrr: bool,
    pub uses_gd: bool,
    pub uses_pd: bool,
}

impl TieBreakFlags {
    pub const NONE: TieBreakFlags = TieBreakFlags {
        uses_nrr: false,
        uses_gd: false,
        uses_pd: false,
    };
}

/// How tie-break metrics are selected once points are level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreakMode {
    /// Only metrics whose flag is enabled are compared. A metric that is equal
    /// for both teams falls through to the next enabled one.
    #[default]
    FlagGated,
    /// The legacy site comparator: flags are ignored, and the first metric on
    /// which either team is non-zero decides, even when both values are equal.
    Literal,
}

impl TieBreakMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "flagged" | "flag-gated" | "gated" => Some(TieBreakMode::FlagGated),
            "literal" | "legacy" => Some(TieBreakMode::Literal),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TieBreakMode::FlagGated => "flag-gated",
            TieBreakMode::Literal => "literal",
        }
    }
}

/// Comparator placing the better-ranked team first.
pub fn compare_standings(a: &Team, b: &Team, flags: TieBreakFlags, mode: TieBreakMode) -> Ordering {
    let by_points = b.points.cmp(&a.points);
    if by_points != Ordering::Equal {
        return by_points;
    }

    match mode {
        TieBreakMode::FlagGated => {
            let mut ord = Ordering::Equal;
            if flags.uses_nrr {
                ord = ord.then_with(|| cmp_nrr_desc(a, b));
            }
            if flags.uses_gd {
                ord = ord.then_with(|| b.goal_difference.cmp(&a.goal_difference));
            }
            if flags.uses_pd {
                ord = ord.then_with(|| b.point_difference.cmp(&a.point_difference));
            }
            ord
        }
        TieBreakMode::Literal => {
            if a.net_run_rate != 0.0 || b.net_run_rate != 0.0 {
                return cmp_nrr_desc(a, b);
            }
            if a.goal_difference != 0 || b.goal_difference != 0 {
                return b.goal_difference.cmp(&a.goal_difference);
            }
            if a.point_difference != 0 || b.point_difference != 0 {
                return b.point_difference.cmp(&a.point_difference);
            }
            Ordering::Equal
        }
    }
}

// Exact comparison, so 0.0 and -0.0 tie. A NaN rate sorts below every
// number and ties with other NaNs, which keeps the order total.
fn cmp_nrr_desc(a: &Team, b: &Team) -> Ordering {
    match (a.net_run_rate.is_nan(), b.net_run_rate.is_nan()) {
        (false, false) => b
            .net_run_rate
            .partial_cmp(&a.net_run_rate)
            .unwrap_or(Ordering::Equal),
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
    }
}

/// Sort one group's teams for display. Fully tied teams keep their input order.
pub fn rank_in_place(teams: &mut [Team], flags: TieBreakFlags, mode: TieBreakMode) {
    teams.sort_by(|a, b| compare_standings(a, b, flags, mode));
}

pub fn rank_teams(mut teams: Vec<Team>, flags: TieBreakFlags, mode: TieBreakMode) -> Vec<Team> {
    rank_in_place(&mut teams, flags, mode);
    teams
}

/// Fallback order when no group context is available: points only.
pub fn default_order(teams: &mut [Team]) {
    teams.sort_by(|a, b| b.points.cmp(&a.points));
}

#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    /// 1-based table position.
    pub position: usize,
    pub team: Team,
}

impl Standing {
    pub fn is_leader(&self) -> bool {
        self.position == 1
    }
}

pub fn standings(teams: Vec<Team>, flags: TieBreakFlags, mode: TieBreakMode) -> Vec<Standing> {
    rank_teams(teams, flags, mode)
        .into_iter()
        .enumerate()
        .map(|(i, team)| Standing { position: i + 1, team })
        .collect()
}

/// Net run rate as shown in points tables: signed, three decimals.
pub fn format_nrr(nrr: f64) -> String {
    if nrr > 0.0 {
        format!("+{nrr:.3}")
    } else if nrr < 0.0 {
        format!("{nrr:.3}")
    } else {
        "0.000".to_string()
    }
}
