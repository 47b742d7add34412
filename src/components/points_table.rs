use fest_api::ranking::{Standing, TieBreakFlags, format_nrr};
use tui::buffer::Buffer;
use tui::layout::Rect;
use tui::style::{Color, Modifier, Style};
use tui::widgets::Widget;

const TEAM_MIN_WIDTH: u16 = 12;
const STAT_WIDTH: u16 = 5;
const NRR_WIDTH: u16 = 8;

/// One group's points table: position, team, played/won/lost/drawn, points,
/// plus whichever differentials the sport tracks.
pub struct PointsTable<'a> {
    pub title: &'a str,
    pub standings: &'a [Standing],
    pub flags: TieBreakFlags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Played,
    Won,
    Lost,
    Drawn,
    Points,
    NetRunRate,
    GoalDiff,
    PointDiff,
}

impl Column {
    fn header(&self) -> &'static str {
        match self {
            Column::Played => "P",
            Column::Won => "W",
            Column::Lost => "L",
            Column::Drawn => "D",
            Column::Points => "Pts",
            Column::NetRunRate => "NRR",
            Column::GoalDiff => "GD",
            Column::PointDiff => "PD",
        }
    }

    fn width(&self) -> u16 {
        match self {
            Column::NetRunRate => NRR_WIDTH,
            _ => STAT_WIDTH,
        }
    }

    fn value(&self, standing: &Standing) -> String {
        let team = &standing.team;
        match self {
            Column::Played => team.matches_played.to_string(),
            Column::Won => team.wins.to_string(),
            Column::Lost => team.losses.to_string(),
            Column::Drawn => team.draws.to_string(),
            Column::Points => team.points.to_string(),
            Column::NetRunRate => format_nrr(team.net_run_rate),
            Column::GoalDiff => signed(team.goal_difference),
            Column::PointDiff => signed(team.point_difference),
        }
    }
}

fn signed(value: i32) -> String {
    if value > 0 { format!("+{value}") } else { value.to_string() }
}

fn columns(flags: TieBreakFlags) -> Vec<Column> {
    let mut cols = vec![Column::Played, Column::Won, Column::Lost, Column::Drawn, Column::Points];
    if flags.uses_nrr {
        cols.push(Column::NetRunRate);
    }
    if flags.uses_gd {
        cols.push(Column::GoalDiff);
    }
    if flags.uses_pd {
        cols.push(Column::PointDiff);
    }
    cols
}

/// Rows the table needs: title, header, one per team.
pub fn table_height(standings: &[Standing]) -> u16 {
    2 + standings.len().max(1) as u16
}

impl<'a> Widget for PointsTable<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height < 2 || area.width < TEAM_MIN_WIDTH + 4 {
            return;
        }

        let accent = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
        let dim = Style::default().fg(Color::DarkGray);
        buf.set_stringn(area.x, area.y, self.title, area.width as usize, accent);

        let cols = columns(self.flags);
        let stats_width: u16 = cols.iter().map(Column::width).sum();
        let team_width = area.width.saturating_sub(4 + stats_width).max(TEAM_MIN_WIDTH);
        let stats_x = area.x + 4 + team_width;
        let right = area.x + area.width;

        let header_y = area.y + 1;
        buf.set_string(area.x, header_y, "#", dim);
        buf.set_string(area.x + 4, header_y, "Team", dim);
        let mut x = stats_x;
        for col in &cols {
            if x + col.width() > right {
                break;
            }
            let text = format!("{:>w$}", col.header(), w = col.width() as usize);
            buf.set_string(x, header_y, text, dim);
            x += col.width();
        }

        if self.standings.is_empty() {
            if area.height > 2 {
                buf.set_string(area.x + 4, area.y + 2, "No teams yet", dim);
            }
            return;
        }

        for (row, standing) in self.standings.iter().enumerate() {
            let y = area.y + 2 + row as u16;
            if y >= area.y + area.height {
                break;
            }
            let style = if standing.is_leader() {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            buf.set_string(area.x, y, standing.position.to_string(), style);
            buf.set_stringn(area.x + 4, y, &standing.team.name, team_width.saturating_sub(1) as usize, style);

            let mut x = stats_x;
            for col in &cols {
                if x + col.width() > right {
                    break;
                }
                let text = format!("{:>w$}", col.value(standing), w = col.width() as usize);
                let cell_style = if *col == Column::Points { style.add_modifier(Modifier::BOLD) } else { style };
                buf.set_string(x, y, text, cell_style);
                x += col.width();
            }
        }
    }
}
