use crate::app::{App, LogLevel, Prompt, PromptKind};
use crate::config::VisualConfig;
use crate::ring::NodeGraph;
use crate::state::{Mode, ViewState};
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Circle, Line as CanvasLine, Points};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;

const COLOR_PRIMARY: Color = Color::Cyan;
const COLOR_SELECTED: Color = Color::LightRed;
const COLOR_HOVER: Color = Color::White;
const COLOR_DIM: Color = Color::DarkGray;

pub fn draw(frame: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // HUD
            Constraint::Min(12),   // ring + inspector
            Constraint::Length(8), // event log
            Constraint::Length(3), // prompt / key hints
        ])
        .split(frame.area());

    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(40), Constraint::Length(38)])
        .split(rows[1]);

    draw_hud(frame, app, rows[0]);
    draw_ring(frame, app, main[0]);
    draw_inspector(frame, app, main[1]);
    draw_log(frame, app, rows[2]);
    draw_footer(frame, app, rows[3]);
    draw_tooltip(frame, app);
}

/// Badge text and styling for the replication mode. Driven solely by the
/// last reconciled snapshot, never by a pending mode switch.
pub fn mode_badge(mode: Mode) -> (&'static str, Color) {
    match mode {
        Mode::Sync => ("CP / sync", Color::Green),
        Mode::Async => ("AP / async", Color::Yellow),
    }
}

fn draw_hud(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(
            " RINGWATCH ",
            Style::default()
                .fg(COLOR_PRIMARY)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
    ];

    if app.seen_snapshot {
        let (badge, badge_color) = mode_badge(app.view.mode);
        spans.extend([
            Span::styled("nodes: ", Style::default().fg(COLOR_DIM)),
            Span::raw(app.view.nodes.len().to_string()),
            Span::styled(" | keys: ", Style::default().fg(COLOR_DIM)),
            Span::raw(app.view.total_keys().to_string()),
            Span::styled(" | replicas: ", Style::default().fg(COLOR_DIM)),
            Span::raw(app.view.replicas.to_string()),
            Span::styled(" | mode: ", Style::default().fg(COLOR_DIM)),
            Span::styled(
                badge,
                Style::default().fg(badge_color).add_modifier(Modifier::BOLD),
            ),
        ]);
    } else {
        spans.push(Span::styled(
            "connecting to backend...",
            Style::default().fg(COLOR_DIM),
        ));
    }

    let hud = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_PRIMARY))
            .title("STATUS"),
    );
    frame.render_widget(hud, area);
}

fn draw_ring(frame: &mut Frame, app: &mut App, area: Rect) {
    let block = Block::default().borders(Borders::ALL).title("RING");
    let inner = block.inner(area);
    app.canvas_area = inner;

    let bound = canvas_bound(&app.visual);
    let graph = &app.graph;
    let particles = &app.particles;
    let visual = &app.visual;
    let selected = app.view.selected.clone();
    let hovered = app.hover.as_ref().map(|h| h.id.clone());
    // Horizontal span of one terminal cell in canvas units, for rough
    // text centering.
    let char_w = if inner.width > 0 {
        2.0 * bound / inner.width as f64
    } else {
        1.0
    };

    let canvas = Canvas::default()
        .block(block)
        .marker(Marker::Braille)
        .x_bounds([-bound, bound])
        .y_bounds([-bound, bound])
        .paint(move |ctx| {
            ctx.draw(&Circle {
                x: 0.0,
                y: 0.0,
                radius: visual.ring_radius,
                color: Color::Blue,
            });

            for vn in graph.iter() {
                let (x, y) = canvas_pos(vn.x, vn.y);
                ctx.draw(&CanvasLine {
                    x1: 0.0,
                    y1: 0.0,
                    x2: x,
                    y2: y,
                    color: COLOR_DIM,
                });
            }

            for vn in graph.iter() {
                let (x, y) = canvas_pos(vn.x, vn.y);
                let is_selected = selected.as_deref() == Some(vn.id.as_str());
                let is_hovered = hovered.as_deref() == Some(vn.id.as_str());
                ctx.draw(&Circle {
                    x,
                    y,
                    radius: visual.node_radius,
                    color: node_color(is_selected, is_hovered),
                });
            }

            for p in particles.iter() {
                let (px, py) = p.position();
                ctx.draw(&Points {
                    coords: &[canvas_pos(px, py)],
                    color: p.color,
                });
            }

            // Labels last so they sit above the shapes.
            for vn in graph.iter() {
                let (x, y) = canvas_pos(vn.x, vn.y);
                let port = vn.id.rsplit(':').next().unwrap_or(vn.id.as_str());
                let keys = format!("{} keys", vn.stat.key_count);
                ctx.print(
                    x - port.len() as f64 * char_w / 2.0,
                    y,
                    Line::styled(port.to_string(), Style::default().fg(Color::White)),
                );
                ctx.print(
                    x - keys.len() as f64 * char_w / 2.0,
                    y - visual.node_radius - 12.0,
                    Line::styled(keys, Style::default().fg(COLOR_PRIMARY)),
                );
            }
        });
    frame.render_widget(canvas, area);
}

/// Highlight precedence: selection beats hover; hover only restyles
/// unselected nodes.
pub fn node_color(selected: bool, hovered: bool) -> Color {
    if selected {
        COLOR_SELECTED
    } else if hovered {
        COLOR_HOVER
    } else {
        COLOR_PRIMARY
    }
}

fn draw_inspector(frame: &mut Frame, app: &App, area: Rect) {
    let body = Paragraph::new(inspector_lines(&app.view))
        .block(Block::default().borders(Borders::ALL).title("INSPECTOR"))
        .wrap(Wrap { trim: true });
    frame.render_widget(body, area);
}

/// Inspector content for the current selection.
pub fn inspector_lines(view: &ViewState) -> Vec<Line<'static>> {
    let Some(selected) = &view.selected else {
        return vec![Line::styled(
            "click or Tab-select a node to view its keys",
            Style::default().fg(COLOR_DIM),
        )];
    };

    // Stale selection racing a tick: no stat record yet. Render nothing
    // and keep the selection; the next poll resolves it either way.
    let Some(stat) = view.stats.get(selected) else {
        return Vec::new();
    };

    let port = selected.rsplit(':').next().unwrap_or(selected.as_str());
    let mut lines = vec![
        Line::from(vec![
            Span::styled(
                format!("Worker {}", port),
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                format!("{} req/s", stat.request_rate),
                Style::default().fg(COLOR_DIM),
            ),
        ]),
        Line::raw(""),
    ];

    if stat.keys.is_empty() {
        lines.push(Line::styled(
            "no keys stored",
            Style::default().fg(COLOR_DIM),
        ));
    } else {
        let badges: Vec<Span<'static>> = stat
            .keys
            .iter()
            .map(|k| Span::styled(format!("[{}] ", k), Style::default().fg(COLOR_PRIMARY)))
            .collect();
        lines.push(Line::from(badges));
    }
    lines
}

fn draw_log(frame: &mut Frame, app: &App, area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let lines: Vec<Line> = app
        .log
        .iter()
        .rev()
        .take(visible)
        .rev()
        .map(|entry| {
            let (tag, color) = match entry.level {
                LogLevel::Sys => ("SYS ", COLOR_PRIMARY),
                LogLevel::Ok => ("OK  ", Color::Green),
                LogLevel::Warn => ("WARN", Color::Yellow),
                LogLevel::Err => ("ERR ", Color::Red),
            };
            Line::from(vec![
                Span::styled(entry.time.clone(), Style::default().fg(COLOR_DIM)),
                Span::raw(" "),
                Span::styled(tag, Style::default().fg(color)),
                Span::raw(" "),
                Span::raw(entry.msg.clone()),
            ])
        })
        .collect();

    let log = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("EVENTS"));
    frame.render_widget(log, area);
}

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    let line = match &app.prompt {
        Some(Prompt { kind, buffer }) => {
            let label = match kind {
                PromptKind::Put => "put key=value",
                PromptKind::Get => "get key",
            };
            Line::from(vec![
                Span::styled(
                    format!(" {} > ", label),
                    Style::default().fg(Color::Yellow),
                ),
                Span::raw(buffer.clone()),
                Span::styled("_", Style::default().add_modifier(Modifier::SLOW_BLINK)),
                Span::styled(
                    "   (enter: send, esc: cancel)",
                    Style::default().fg(COLOR_DIM),
                ),
            ])
        }
        None => Line::styled(
            " q quit | s sync | a async | p put | g get | tab/arrows select | esc clear",
            Style::default().fg(COLOR_DIM),
        ),
    };
    frame.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn draw_tooltip(frame: &mut Frame, app: &App) {
    let Some(hover) = &app.hover else {
        return;
    };
    let Some(vn) = app.graph.get(&hover.id) else {
        return;
    };

    let lines = vec![
        Line::styled(
            vn.id.clone(),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Line::raw(format!("keys: {}", vn.stat.key_count)),
        Line::raw(format!("load: {}/s", vn.stat.request_rate)),
    ];
    let width = (lines.iter().map(|l| l.width()).max().unwrap_or(0) as u16 + 2).min(40);
    let height = lines.len() as u16 + 2;

    let screen = frame.area();
    let mut x = hover.column.saturating_add(2);
    let mut y = hover.row.saturating_add(1);
    if x + width > screen.right() {
        x = screen.right().saturating_sub(width);
    }
    if y + height > screen.bottom() {
        y = screen.bottom().saturating_sub(height);
    }
    let rect = Rect::new(x, y, width.min(screen.width), height.min(screen.height));

    frame.render_widget(Clear, rect);
    frame.render_widget(
        Paragraph::new(lines).block(Block::default().borders(Borders::ALL)),
        rect,
    );
}

pub fn canvas_bound(visual: &VisualConfig) -> f64 {
    visual.ring_radius + visual.node_radius + 40.0
}

/// Layout angles assume screen-style y (down); the braille canvas y axis
/// points up.
fn canvas_pos(x: f64, y: f64) -> (f64, f64) {
    (x, -y)
}

/// Map a terminal cell inside the ring viewport back to canvas
/// coordinates and find the node under it, if any. Cells are coarse, so
/// the tolerance is the node radius plus a small margin.
pub fn hit_test(
    graph: &NodeGraph,
    inner: Rect,
    visual: &VisualConfig,
    column: u16,
    row: u16,
) -> Option<String> {
    if inner.width == 0 || inner.height == 0 {
        return None;
    }
    if !inner.contains(Position::new(column, row)) {
        return None;
    }

    let bound = canvas_bound(visual);
    let fx = (column - inner.x) as f64 + 0.5;
    let fy = (row - inner.y) as f64 + 0.5;
    let cx = -bound + fx / inner.width as f64 * (2.0 * bound);
    let cy = bound - fy / inner.height as f64 * (2.0 * bound);

    let tol = visual.node_radius * 1.2;
    let mut best: Option<(f64, &str)> = None;
    for vn in graph.iter() {
        let (nx, ny) = canvas_pos(vn.x, vn.y);
        let dist2 = (nx - cx).powi(2) + (ny - cy).powi(2);
        if dist2 <= tol * tol && best.map(|(d, _)| dist2 < d).unwrap_or(true) {
            best = Some((dist2, vn.id.as_str()));
        }
    }
    best.map(|(_, id)| id.to_string())
}
