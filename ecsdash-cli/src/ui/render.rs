use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{
        Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap,
    },
};

use ecsdash_core::dashboard::Dashboard;
use ecsdash_core::navigation::{Focus, Screen};
use ecsdash_core::projection::{self, TABLE_HEADERS};
use ecsdash_core::scheduler::SnapshotKind;

use super::theme::styles;

/// Header facts that do not live in the dashboard state.
pub struct Banner<'a> {
    pub inventory: &'a str,
    pub region: &'a str,
}

pub fn render(frame: &mut Frame, dash: &Dashboard, banner: &Banner) {
    // [ top bar ]
    // [ screen   ]
    // [ footer   ]
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    render_top_bar(frame, dash, banner, outer[0]);
    match dash.screen() {
        Screen::Services => render_services_screen(frame, dash, outer[1]),
        Screen::Table => render_table_screen(frame, dash, outer[1]),
    }
    render_footer(frame, dash.screen(), outer[2]);
}

fn render_top_bar(frame: &mut Frame, dash: &Dashboard, banner: &Banner, area: Rect) {
    let mut spans = vec![
        Span::styled(" ecsdash ", styles::header()),
        Span::styled(format!("{} ({}) ", banner.region, banner.inventory), styles::text()),
    ];
    for screen in Screen::ALL {
        spans.push(Span::styled(
            format!(" {} ", screen.label()),
            styles::tab(screen == dash.screen()),
        ));
    }
    if let Some(at) = dash.tree_built_at() {
        let at = at.with_timezone(&dash.view_options().offset);
        spans.push(Span::styled(
            format!("   tree {}", at.format("%H:%M:%S")),
            styles::text_muted(),
        ));
    }
    if dash.is_building(SnapshotKind::Tree) || dash.is_building(SnapshotKind::Table) {
        spans.push(Span::styled("  refreshing…", styles::warn()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn panel_block(title: impl Into<String>, focused: bool) -> Block<'static> {
    let title = title.into();
    let title = if focused { format!("▸ {title}") } else { title };
    Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border(focused))
        .title(title)
}

fn render_services_screen(frame: &mut Frame, dash: &Dashboard, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(rows[0]);

    render_tree(frame, dash, top[0]);
    render_debug_log(frame, dash, top[1]);
    render_detail(frame, dash, Screen::Services, rows[1]);
}

fn render_table_screen(frame: &mut Frame, dash: &Dashboard, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);
    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[1]);

    render_table(frame, dash, rows[0]);
    render_detail(frame, dash, Screen::Table, bottom[0]);
    render_events(frame, dash, bottom[1]);
}

fn render_tree(frame: &mut Frame, dash: &Dashboard, area: Rect) {
    let lines = dash.tree_lines();
    let items: Vec<ListItem> = lines
        .iter()
        .map(|line| {
            let marker = match (line.depth, line.extended) {
                (0, true) => "▾ ",
                (0, false) => "▸ ",
                _ => "  ",
            };
            let indent = "  ".repeat(line.depth as usize);
            ListItem::new(Line::from(vec![
                Span::raw(indent),
                Span::styled(marker, styles::text_muted()),
                Span::styled(line.label.clone(), styles::text()),
            ]))
        })
        .collect();

    let focused = dash.focus() == Focus::Navigator;
    let title = if dash.tree().is_empty() && dash.is_building(SnapshotKind::Tree) {
        "Services (loading)".to_string()
    } else {
        format!("Services ({})", dash.tree().service_count())
    };
    let list = List::new(items)
        .block(panel_block(title, focused))
        .highlight_style(styles::selection());
    let mut state = ListState::default();
    if !lines.is_empty() {
        state.select(Some(dash.tree_index()));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_debug_log(frame: &mut Frame, dash: &Dashboard, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let offset = dash.view_options().offset;
    let entries: Vec<_> = dash.debug_log().entries().collect();
    let skip = entries.len().saturating_sub(visible);
    let items: Vec<ListItem> = entries
        .into_iter()
        .skip(skip)
        .map(|entry| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{} ", entry.at.with_timezone(&offset).format("%H:%M:%S")),
                    styles::text_muted(),
                ),
                Span::styled(entry.text.clone(), styles::log_level(entry.level)),
            ]))
        })
        .collect();
    frame.render_widget(List::new(items).block(panel_block("Debug", false)), area);
}

fn render_detail(frame: &mut Frame, dash: &Dashboard, screen: Screen, area: Rect) {
    let panel = dash.panel(screen);
    let focused = dash.focus() == Focus::Detail;
    let paragraph = Paragraph::new(dash.detail_text(screen))
        .style(styles::text())
        .block(panel_block(dash.detail_title(screen), focused))
        .wrap(Wrap { trim: false })
        .scroll((panel.scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_table(frame: &mut Frame, dash: &Dashboard, area: Rect) {
    let focused = dash.focus() == Focus::Navigator;
    let block = panel_block(dash.table_label(), focused);
    let Some(table) = dash.table() else {
        frame.render_widget(Paragraph::new("").block(block), area);
        return;
    };

    let header = Row::new(TABLE_HEADERS).style(styles::header());
    let rows: Vec<Row> = table
        .entries
        .iter()
        .zip(projection::table_rows(table))
        .map(|(entry, cells)| {
            let [status, rest @ ..] = cells;
            let status = Line::from(vec![
                Span::styled(
                    format!("{} ", styles::status_icon(&entry.service.status)),
                    styles::status(&entry.service.status),
                ),
                Span::styled(status, styles::status(&entry.service.status)),
            ]);
            let mut row = vec![Cell::from(status)];
            row.extend(rest.into_iter().map(Cell::from));
            Row::new(row)
        })
        .collect();

    let widths = [
        Constraint::Length(12),
        Constraint::Percentage(30),
        Constraint::Percentage(20),
        Constraint::Percentage(30),
        Constraint::Length(10),
    ];
    let widget = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(styles::selection());
    let mut state = TableState::default();
    if !table.is_empty() {
        state.select(Some(dash.table_index()));
    }
    frame.render_stateful_widget(widget, area, &mut state);
}

fn render_events(frame: &mut Frame, dash: &Dashboard, area: Rect) {
    let lines: Vec<Line> = dash
        .event_lines(Screen::Table)
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            // timestamp lines alternate with message lines
            if i % 2 == 0 {
                Line::styled(text, styles::text_muted())
            } else {
                Line::styled(text, styles::text())
            }
        })
        .collect();
    let paragraph = Paragraph::new(lines)
        .block(panel_block("Events", false))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_footer(frame: &mut Frame, screen: Screen, area: Rect) {
    let mut hints = vec![
        ("s", "services"),
        ("[ ]", "screens"),
        ("t", "task def"),
        ("r", "refresh"),
        ("tab", "focus"),
    ];
    if screen == Screen::Services {
        hints.push(("enter", "open/fold"));
    } else {
        hints.push(("enter", "tasks"));
    }
    hints.push(("q", "quit"));

    let mut spans = Vec::new();
    for (key, what) in hints {
        spans.push(Span::styled(format!(" {key} "), styles::key_hint()));
        spans.push(Span::styled(format!("{what} "), styles::text_muted()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
