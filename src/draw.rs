use tui::backend::Backend;
use tui::layout::{Alignment, Constraint, Layout, Rect};
use tui::style::{Color, Modifier, Style};
use tui::text::{Line, Span};
use tui::widgets::{Block, BorderType, Borders, Paragraph, Tabs, Wrap};
use tui::{Frame, Terminal};
use tui_logger::TuiLoggerWidget;

use crate::app::{App, MenuItem};
use crate::components::match_list::{MatchList, fixture};
use crate::components::points_table::{PointsTable, table_height};
use crate::state::app_state::AdminFocus;
use crate::state::network::{ERROR_CHAR, LoadingState};
use crate::ui::layout::LayoutAreas;
use fest_api::countdown::Countdown;
use fest_api::ranking::{TieBreakFlags, format_nrr};

pub fn draw<B>(terminal: &mut Terminal<B>, app: &mut App, loading: LoadingState)
where
    B: Backend,
{
    let current_size = terminal.size().unwrap_or_default();
    if current_size.width <= 10 || current_size.height <= 10 {
        return;
    }

    let mut layout = LayoutAreas::new(current_size);

    let drawn = terminal.draw(|f| {
        layout.update(f.area(), app.settings.full_screen, app.state.show_logs);

        if !app.settings.full_screen {
            draw_tabs(f, layout.tab_bar, app);
            draw_banner(f, layout.banner, app);
        }

        match app.state.active_tab {
            MenuItem::Sports => draw_sports(f, layout.main, app),
            MenuItem::Schedule => draw_schedule(f, layout.main, app),
            MenuItem::Standings => draw_standings(f, layout.main, app),
            MenuItem::Live => draw_live(f, layout.main, app),
            MenuItem::Chat => draw_chat(f, layout.main, app),
            MenuItem::Admin => draw_admin(f, layout.main, app),
            MenuItem::Help => draw_help(f, layout.main),
        }

        if app.state.show_logs {
            draw_logs(f, layout.logs);
        }
        draw_status(f, layout.status, app);
        draw_loading_spinner(f, f.area(), app, loading);
    });
    if let Err(e) = drawn {
        log::error!("draw failed: {e}");
    }
}

pub fn default_border<'a>(color: Color) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(color))
}

fn draw_tabs(f: &mut Frame, tab_bar: [Rect; 2], app: &App) {
    let style = Style::default().fg(Color::White);
    let border_type = BorderType::Rounded;

    let tab_index = MenuItem::TABS
        .iter()
        .position(|t| *t == app.state.active_tab)
        .unwrap_or(0);

    let titles: Vec<Line> = MenuItem::TABS.iter().map(|t| Line::from(t.title())).collect();
    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .borders(Borders::LEFT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .highlight_style(Style::default().add_modifier(Modifier::UNDERLINED))
        .select(tab_index)
        .style(style);
    f.render_widget(tabs, tab_bar[0]);

    let help = Paragraph::new("Help: ? ")
        .alignment(Alignment::Right)
        .block(
            Block::default()
                .borders(Borders::RIGHT | Borders::BOTTOM | Borders::TOP)
                .border_type(border_type),
        )
        .style(style);
    f.render_widget(help, tab_bar[1]);
}

/// Countdown to the opening on the left, running matches on the right.
fn draw_banner(f: &mut Frame, area: Rect, app: &App) {
    let [left, right] =
        Layout::horizontal([Constraint::Percentage(45), Constraint::Percentage(55)]).areas(area);

    let countdown = match app.state.countdown {
        Some(Countdown::Live) => Line::from(Span::styled(
            " 🔴 LIVE NOW",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
        Some(countdown) => Line::from(vec![
            Span::styled(" Fest starts in ", Style::default().fg(Color::DarkGray)),
            Span::styled(countdown.display(), Style::default().fg(Color::Yellow)),
        ]),
        None => Line::from(Span::styled(" Start date not set", Style::default().fg(Color::DarkGray))),
    };
    f.render_widget(Paragraph::new(countdown), left);

    let running = &app.state.live.matches;
    if running.is_empty() {
        return;
    }
    let names: Vec<String> = running
        .iter()
        .map(|m| format!("{} {}", m.sport_name(), fixture(m)))
        .collect();
    let live = Line::from(vec![
        Span::styled(
            format!("● {} live ", app.running_count()),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ),
        Span::styled(names.join(" · "), Style::default().fg(Color::Gray)),
    ]);
    f.render_widget(Paragraph::new(live).alignment(Alignment::Right), right);
}

fn draw_sports(f: &mut Frame, area: Rect, app: &App) {
    let sports = &app.state.sports;
    let block = default_border(Color::White).title(format!(" {} ", sports.category.label()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    if !sports.loaded {
        f.render_widget(Paragraph::new("Loading sports..."), inner);
        return;
    }
    if sports.sports.is_empty() {
        f.render_widget(
            Paragraph::new("No sports in this category").style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return;
    }

    let [list_area, detail_area] =
        Layout::horizontal([Constraint::Length(28), Constraint::Fill(1)]).areas(inner);

    let mut lines = Vec::with_capacity(sports.sports.len() + 2);
    for (idx, sport) in sports.sports.iter().enumerate() {
        let selected = idx == sports.selected;
        let style = if selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        let marker = if selected { ">" } else { " " };
        lines.push(Line::from(Span::styled(format!("{marker} {} {}", sport.icon, sport.name), style)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "c next category",
        Style::default().fg(Color::DarkGray),
    )));
    f.render_widget(Paragraph::new(lines), list_area);

    let Some(sport) = sports.selected_sport() else {
        return;
    };
    let dim = Style::default().fg(Color::DarkGray);
    let mut detail = vec![
        Line::from(Span::styled(
            format!("{} {}", sport.icon, sport.name),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    if let Some(description) = sport.description.as_deref().filter(|d| !d.is_empty()) {
        detail.push(Line::from(description.to_string()));
        detail.push(Line::from(""));
    }
    detail.push(Line::from(vec![Span::styled("Scoring  ", dim), Span::raw(sport.scoring_summary())]));
    detail.push(Line::from(vec![
        Span::styled("Ties     ", dim),
        Span::raw(tie_break_text(sport.tie_break_flags())),
    ]));
    if let Some(url) = sport.live_stream_url.as_deref().filter(|u| !u.is_empty()) {
        detail.push(Line::from(vec![
            Span::styled("Stream   ", dim),
            Span::styled(url.to_string(), Style::default().fg(Color::Blue)),
        ]));
    }
    detail.push(Line::from(""));
    detail.push(Line::from(Span::styled("Enter points table · 5 chat", dim)));
    f.render_widget(Paragraph::new(detail).wrap(Wrap { trim: false }), detail_area);
}

fn tie_break_text(flags: TieBreakFlags) -> String {
    let mut keys = vec!["points"];
    if flags.uses_nrr {
        keys.push("net run rate");
    }
    if flags.uses_gd {
        keys.push("goal difference");
    }
    if flags.uses_pd {
        keys.push("point difference");
    }
    keys.join(", then ")
}

fn draw_schedule(f: &mut Frame, area: Rect, app: &App) {
    let schedule = &app.state.schedule;
    let block = default_border(Color::White).title(" Schedule ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let [days_area, _, list_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Fill(1),
    ])
    .areas(inner);

    let days: Vec<Span> = fest_api::FestDay::ALL
        .iter()
        .flat_map(|day| {
            let style = if *day == schedule.day {
                Style::default().fg(Color::Black).bg(Color::Cyan)
            } else {
                Style::default().fg(Color::Gray)
            };
            [
                Span::styled(format!(" {} · {} ", day.label(), day.date_label()), style),
                Span::raw(" "),
            ]
        })
        .collect();
    f.render_widget(Paragraph::new(Line::from(days)), days_area);

    if !schedule.loaded {
        f.render_widget(Paragraph::new("Loading matches..."), list_area);
        return;
    }
    f.render_widget(
        MatchList {
            matches: &schedule.matches,
            selected: None,
            offset: schedule.scroll_offset as usize,
            show_date: false,
            empty_message: "No matches scheduled for this day",
        },
        list_area,
    );
}

fn draw_standings(f: &mut Frame, area: Rect, app: &App) {
    let standings = &app.state.standings;
    let title = standings
        .sport
        .as_ref()
        .map(|s| format!(" {} {} · Points Table ", s.icon, s.name))
        .unwrap_or_else(|| " Points Table ".to_string());
    let block = default_border(Color::White).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    if standings.sport_id.is_none() {
        f.render_widget(Paragraph::new("Select a sport on the Sports tab and press Enter"), inner);
        return;
    }
    if !standings.loaded {
        f.render_widget(Paragraph::new("Loading points table..."), inner);
        return;
    }
    let fixtures_height = if standings.fixtures.is_empty() {
        0
    } else {
        standings.fixtures.len().min(6) as u16 + 2
    };
    let [inner, fixtures_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(fixtures_height)]).areas(inner);
    if fixtures_height > 0 {
        let block = default_border(Color::DarkGray).title(" Fixtures ");
        let fixtures_inner = block.inner(fixtures_area);
        f.render_widget(block, fixtures_area);
        f.render_widget(
            MatchList {
                matches: &standings.fixtures,
                selected: None,
                offset: 0,
                show_date: true,
                empty_message: "",
            },
            fixtures_inner,
        );
    }

    if standings.tables.is_empty() {
        f.render_widget(
            Paragraph::new("No groups for this sport yet").style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return;
    }

    let flags = standings
        .sport
        .as_ref()
        .map(|s| s.tie_break_flags())
        .unwrap_or(TieBreakFlags::NONE);

    let [tables_area, legend_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(inner);

    let mut y = tables_area.y;
    let bottom = tables_area.y + tables_area.height;
    for (group, rows) in standings.tables.iter().skip(standings.scroll_offset as usize) {
        if y >= bottom {
            break;
        }
        let height = table_height(rows).min(bottom - y);
        f.render_widget(
            PointsTable { title: &group.name, standings: rows, flags },
            Rect::new(tables_area.x, y, tables_area.width, height),
        );
        y += height + 1;
    }

    let legend = format!(
        "Ranked by {} ({})",
        tie_break_text(flags),
        app.settings.tie_break.label()
    );
    f.render_widget(
        Paragraph::new(legend).style(Style::default().fg(Color::DarkGray)),
        legend_area,
    );
}

fn draw_live(f: &mut Frame, area: Rect, app: &App) {
    let live = &app.state.live;
    let refreshed = live
        .refreshed_at
        .map(|t| format!(" Live Matches · updated {} ", t.format("%H:%M:%S")))
        .unwrap_or_else(|| " Live Matches ".to_string());
    let block = default_border(Color::Red).title(refreshed);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let streams: Vec<Line> = live
        .matches
        .iter()
        .filter_map(|m| {
            let url = m.details.live_stream_url.as_deref().filter(|u| !u.is_empty())?;
            Some(Line::from(vec![
                Span::styled(format!("{}: ", fixture(m)), Style::default().fg(Color::Gray)),
                Span::styled(url.to_string(), Style::default().fg(Color::Blue)),
            ]))
        })
        .collect();

    let stream_height = if streams.is_empty() { 0 } else { streams.len() as u16 + 2 };
    let [list_area, streams_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(stream_height)]).areas(inner);

    f.render_widget(
        MatchList {
            matches: &live.matches,
            selected: None,
            offset: 0,
            show_date: true,
            empty_message: "No matches in progress. r to refresh",
        },
        list_area,
    );

    if !streams.is_empty() {
        let mut lines = vec![Line::from(Span::styled("Streams", Style::default().fg(Color::DarkGray)))];
        lines.extend(streams);
        f.render_widget(Paragraph::new(lines), streams_area.inner(tui::layout::Margin::new(0, 1)));
    }
}

fn draw_chat(f: &mut Frame, area: Rect, app: &App) {
    let chat = &app.state.chat;
    let title = if chat.sport_name.is_empty() {
        " Chat ".to_string()
    } else {
        format!(" {} Chat ", chat.sport_name)
    };
    let block = default_border(Color::White).title(title);
    let inner = block.inner(area);
    f.render_widget(block, area);

    if inner.width == 0 || inner.height < 3 {
        return;
    }
    if chat.sport_id.is_none() {
        f.render_widget(Paragraph::new("Select a sport on the Sports tab to join its chat"), inner);
        return;
    }

    let [messages_area, input_area] =
        Layout::vertical([Constraint::Fill(1), Constraint::Length(3)]).areas(inner);

    let mut lines = Vec::new();
    let status = if chat.connected { "online" } else { "offline" };
    lines.push(Line::from(vec![
        Span::styled("as ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.settings.chat_name.as_str(), Style::default().fg(Color::Gray)),
        Span::styled("  status ", Style::default().fg(Color::DarkGray)),
        Span::styled(status, Style::default().fg(if chat.connected { Color::Green } else { Color::Red })),
    ]));
    lines.push(Line::from(""));

    for msg in &chat.messages {
        let prefix = format!("[{}] {}: ", msg.time, msg.username);
        let style = if msg.is_system {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::White)
        };
        let body_width = messages_area
            .width
            .saturating_sub(prefix.chars().count() as u16)
            .max(8) as usize;
        let clipped: String = msg.message.chars().take(body_width).collect();
        lines.push(Line::from(vec![
            Span::styled(prefix, style.add_modifier(Modifier::BOLD)),
            Span::styled(clipped, style),
        ]));
    }

    let visible = messages_area.height as usize;
    let total = lines.len();
    let offset = chat.scroll_offset as usize;
    let end = total.saturating_sub(offset);
    let start = end.saturating_sub(visible);
    let window = if start < end { lines[start..end].to_vec() } else { Vec::new() };
    f.render_widget(Paragraph::new(window), messages_area);

    let mode = if chat.composing { "typing" } else { "idle" };
    let input = if chat.composing {
        format!("> {}_", chat.input)
    } else {
        "Press Enter/i to type. Esc cancel. j/k scroll.".to_string()
    };
    let input_style = if chat.composing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input_block = default_border(Color::DarkGray).title(format!(" {mode} "));
    let input_inner = input_block.inner(input_area);
    f.render_widget(input_block, input_area);
    f.render_widget(Paragraph::new(input).style(input_style), input_inner);
}

fn draw_admin(f: &mut Frame, area: Rect, app: &App) {
    let admin = &app.state.admin;
    let block = default_border(Color::Magenta).title(" Admin ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    match admin.gate {
        None => {
            f.render_widget(Paragraph::new("Checking access..."), inner);
            return;
        }
        Some(gate) if !gate.is_granted() => {
            f.render_widget(
                Paragraph::new(gate.message())
                    .style(Style::default().fg(Color::Red))
                    .alignment(Alignment::Center),
                inner,
            );
            return;
        }
        Some(_) => {}
    }

    let [top_area, matches_area, prompt_area, help_area] = Layout::vertical([
        Constraint::Percentage(45),
        Constraint::Fill(1),
        Constraint::Length(if admin.prompt.is_some() { 3 } else { 0 }),
        Constraint::Length(2),
    ])
    .areas(inner);
    let [sports_area, groups_area, teams_area] = Layout::horizontal([
        Constraint::Percentage(34),
        Constraint::Percentage(22),
        Constraint::Percentage(44),
    ])
    .areas(top_area);

    let focus_color = |focus: AdminFocus| {
        if admin.focus == focus { Color::Yellow } else { Color::DarkGray }
    };

    let sport_rows: Vec<String> = admin
        .sports
        .iter()
        .map(|s| format!("{} {:<14} {}", s.icon, s.name, s.scoring_summary()))
        .collect();
    draw_admin_list(f, sports_area, " Sports ", focus_color(AdminFocus::Sports), &sport_rows, admin.selected_sport);

    let group_rows: Vec<String> = admin.groups.iter().map(|g| g.name.clone()).collect();
    draw_admin_list(f, groups_area, " Groups ", focus_color(AdminFocus::Groups), &group_rows, admin.selected_group);

    let team_rows: Vec<String> = admin
        .teams
        .iter()
        .map(|t| {
            format!(
                "{:<14} {}-{}-{} {:>3} pts {}",
                t.name,
                t.wins,
                t.draws,
                t.losses,
                t.points,
                format_nrr(t.net_run_rate)
            )
        })
        .collect();
    draw_admin_list(f, teams_area, " Teams ", focus_color(AdminFocus::Teams), &team_rows, admin.selected_team);

    let matches_block = default_border(focus_color(AdminFocus::Matches)).title(" Fixtures ");
    let matches_inner = matches_block.inner(matches_area);
    f.render_widget(matches_block, matches_area);
    let visible = matches_inner.height as usize;
    f.render_widget(
        MatchList {
            matches: &admin.matches,
            selected: (admin.focus == AdminFocus::Matches).then_some(admin.selected_match),
            offset: admin.selected_match.saturating_sub(visible.saturating_sub(1)),
            show_date: true,
            empty_message: "No matches for this sport",
        },
        matches_inner,
    );

    if let Some(prompt) = &admin.prompt {
        let block = default_border(Color::Cyan).title(format!(" {} ({}) ", prompt.kind.title(), prompt.kind.hint()));
        let prompt_inner = block.inner(prompt_area);
        f.render_widget(block, prompt_area);
        let text = if prompt.kind.is_confirm() { String::new() } else { format!("{}_", prompt.input) };
        f.render_widget(Paragraph::new(text).style(Style::default().fg(Color::White)), prompt_inner);
    }

    let focus_keys = match admin.focus {
        AdminFocus::Sports => "e scoring · n/g/p toggle NRR/GD/PD · u stream",
        AdminFocus::Groups => "a add group · x delete group",
        AdminFocus::Teams => "a add · x delete · e edit stats · +/- points",
        AdminFocus::Matches => "a add · x delete · s status · u stream",
    };
    let last_export = match admin.last_export.first().and_then(|p| p.parent()) {
        Some(dir) => format!(" · last export in {}", dir.display()),
        None => String::new(),
    };
    let help = vec![
        Line::from(format!("Tab switch list · j/k move · {focus_keys} · d fest start · L sign out")),
        Line::from(format!(
            "E export backup ({}) · t toggle format · saves to {}{last_export}",
            admin.export_format.extension(),
            app.settings.export_dir.display()
        )),
    ];
    f.render_widget(Paragraph::new(help).style(Style::default().fg(Color::DarkGray)), help_area);
}

/// One bordered admin list with the cursor kept in view.
fn draw_admin_list(f: &mut Frame, area: Rect, title: &str, color: Color, rows: &[String], selected: usize) {
    let block = default_border(color).title(title.to_string());
    let inner = block.inner(area);
    f.render_widget(block, area);
    if rows.is_empty() {
        f.render_widget(Paragraph::new("None").style(Style::default().fg(Color::DarkGray)), inner);
        return;
    }
    let visible = inner.height as usize;
    let skip = selected.saturating_sub(visible.saturating_sub(1));
    let lines: Vec<Line> = rows
        .iter()
        .enumerate()
        .skip(skip)
        .take(visible)
        .map(|(idx, row)| {
            let style = if idx == selected && color == Color::Yellow {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::REVERSED)
            } else if idx == selected {
                Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            Line::from(Span::styled(row.clone(), style))
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_help(f: &mut Frame, area: Rect) {
    let block = default_border(Color::DarkGray).title(" Help ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = [
        ("1-6", "switch tab"),
        ("?  / Esc", "open / close help"),
        ("q  / Ctrl-C", "quit"),
        ("f", "toggle full screen"),
        ("\"", "toggle log pane"),
        ("", ""),
        ("Sports", "j/k move · c next category · Enter points table"),
        ("Schedule", "h/l previous/next day · j/k scroll"),
        ("Points Table", "j/k scroll groups · fixtures below · Esc back to sports"),
        ("Live", "r refresh now (auto every 30s)"),
        ("Chat", "Enter/i type · Enter send · Esc cancel · j/k scroll"),
        ("Admin", "Tab switch list · a add · x delete · e edit · u stream · s status"),
        ("", "+/- points · n/g/p tie-break flags · d fest start · E export · t format · L sign out"),
    ];
    let lines: Vec<Line> = rows
        .iter()
        .map(|(key, what)| {
            Line::from(vec![
                Span::styled(format!("{key:<14}"), Style::default().fg(Color::Cyan)),
                Span::raw(*what),
            ])
        })
        .collect();
    f.render_widget(Paragraph::new(lines), inner);
}

fn draw_logs(f: &mut Frame, area: Rect) {
    let logs = TuiLoggerWidget::default()
        .block(default_border(Color::DarkGray).title(" Logs "))
        .style_error(Style::default().fg(Color::Red))
        .style_warn(Style::default().fg(Color::Yellow))
        .style_info(Style::default().fg(Color::Gray))
        .style_debug(Style::default().fg(Color::DarkGray));
    f.render_widget(logs, area);
}

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
    let Some(notification) = app.state.notification.as_ref() else {
        if app.settings.is_offline() {
            f.render_widget(
                Paragraph::new(" offline · local data, changes last until exit")
                    .style(Style::default().fg(Color::DarkGray)),
                area,
            );
        }
        return;
    };
    let style = if notification.is_error {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Green)
    };
    f.render_widget(Paragraph::new(format!(" {}", notification.message)).style(style), area);
}

fn draw_loading_spinner(f: &mut Frame, area: Rect, app: &App, loading: LoadingState) {
    if !loading.is_loading && loading.spinner_char != ERROR_CHAR {
        return;
    }
    let style = match loading.spinner_char {
        ERROR_CHAR => Style::default().fg(Color::Red),
        _ => Style::default().fg(Color::White),
    };
    let spinner = Paragraph::new(loading.spinner_char.to_string())
        .alignment(Alignment::Right)
        .style(style);
    let area = if app.settings.full_screen {
        Rect::new(area.width.saturating_sub(3), area.height.saturating_sub(2), 1, 1)
    } else {
        Rect::new(area.width.saturating_sub(11), 1, 1, 1)
    };
    f.render_widget(spinner, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tie_break_text_lists_active_keys() {
        assert_eq!(tie_break_text(TieBreakFlags::NONE), "points");
        let football = TieBreakFlags { uses_gd: true, ..TieBreakFlags::NONE };
        assert_eq!(tie_break_text(football), "points, then goal difference");
    }
}
