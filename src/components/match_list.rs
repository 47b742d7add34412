use fest_api::{MatchStatus, MatchWithSport};
use tui::buffer::Buffer;
use tui::layout::Rect;
use tui::style::{Color, Modifier, Style};
use tui::text::{Line, Span};
use tui::widgets::Widget;

/// Matches one per line: time, sport, fixture, venue and a status badge.
pub struct MatchList<'a> {
    pub matches: &'a [MatchWithSport],
    /// Highlighted row, if the list is navigable.
    pub selected: Option<usize>,
    /// Rows skipped from the top.
    pub offset: usize,
    pub show_date: bool,
    pub empty_message: &'a str,
}

pub fn status_style(status: MatchStatus) -> Style {
    match status {
        MatchStatus::Upcoming => Style::default().fg(Color::Yellow),
        MatchStatus::Running => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        MatchStatus::Completed => Style::default().fg(Color::DarkGray),
    }
}

fn badge(status: MatchStatus) -> String {
    match status {
        MatchStatus::Running => "● LIVE".to_string(),
        other => other.label().to_string(),
    }
}

/// The fixture text: "A vs B" when both teams are known, else the match name.
pub fn fixture(m: &MatchWithSport) -> String {
    match (&m.details.team_a, &m.details.team_b) {
        (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => format!("{a} vs {b}"),
        _ => m.details.match_name.clone(),
    }
}

pub fn match_line(m: &MatchWithSport, show_date: bool) -> Line<'static> {
    let details = &m.details;
    let dim = Style::default().fg(Color::DarkGray);

    let mut spans = Vec::with_capacity(8);
    if show_date {
        spans.push(Span::styled(format!("{} ", details.match_date.date_label()), dim));
    }
    spans.push(Span::styled(format!("{:<5} ", details.match_time), Style::default().fg(Color::Cyan)));
    if let Some(icon) = m.sport.as_ref().and_then(|s| s.icon.as_deref()) {
        spans.push(Span::raw(format!("{icon} ")));
    }
    spans.push(Span::styled(
        format!("{:<14} ", m.sport_name()),
        Style::default().fg(Color::Gray),
    ));
    spans.push(Span::styled(fixture(m), Style::default().fg(Color::White)));
    if let Some(group) = details.group_name.as_deref().filter(|g| !g.is_empty()) {
        spans.push(Span::styled(format!(" ({group})"), dim));
    }
    if let Some(venue) = details.venue.as_deref().filter(|v| !v.is_empty()) {
        spans.push(Span::styled(format!(" @ {venue}"), dim));
    }
    spans.push(Span::raw("  "));
    spans.push(Span::styled(badge(details.status), status_style(details.status)));
    Line::from(spans)
}

impl<'a> Widget for MatchList<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        if self.matches.is_empty() {
            buf.set_stringn(
                area.x,
                area.y,
                self.empty_message,
                area.width as usize,
                Style::default().fg(Color::DarkGray),
            );
            return;
        }

        let rows = self.matches.iter().enumerate().skip(self.offset).take(area.height as usize);
        for (line_no, (idx, m)) in rows.enumerate() {
            let y = area.y + line_no as u16;
            let selected = self.selected == Some(idx);
            let marker = if selected { "> " } else { "  " };
            buf.set_string(area.x, y, marker, Style::default().fg(Color::Yellow));
            let line = match_line(m, self.show_date);
            buf.set_line(area.x + 2, y, &line, area.width.saturating_sub(2));
            if selected {
                buf.set_style(Rect::new(area.x, y, area.width, 1), Style::default().add_modifier(Modifier::REVERSED));
            }
        }
    }
}
