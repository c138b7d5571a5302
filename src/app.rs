use crate::client::{ApiClient, GetOutcome};
use crate::config::{Config, VisualConfig};
use crate::particles::ParticleField;
use crate::ring::NodeGraph;
use crate::state::{reconcile, Mode, SystemSnapshot, ViewState};
use crate::ui;
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use std::collections::VecDeque;
use tokio::sync::mpsc::UnboundedSender;

const LOG_CAPACITY: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Sys,
    Ok,
    Warn,
    Err,
}

#[derive(Clone, Debug)]
pub struct LogLine {
    pub time: String,
    pub level: LogLevel,
    pub msg: String,
}

/// Messages posted back to the single-writer loop by spawned poll and
/// command tasks. Delivery order on the channel decides last-writer-wins
/// between overlapping polls.
#[derive(Debug)]
pub enum AppEvent {
    Snapshot(SystemSnapshot),
    PollFailed(String),
    PutDone { key: String, value: String },
    Logged(LogLevel, String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PromptKind {
    Put,
    Get,
}

#[derive(Clone, Debug)]
pub struct Prompt {
    pub kind: PromptKind,
    pub buffer: String,
}

/// Transient hover state; purely a paint attribute, never persisted
/// across snapshots of a departed node.
#[derive(Clone, Debug)]
pub struct Hover {
    pub id: String,
    pub column: u16,
    pub row: u16,
}

/// All mutable dashboard state, owned and mutated exclusively by the
/// event loop in `main`. Spawned tasks only talk back via `AppEvent`.
pub struct App {
    pub view: ViewState,
    pub graph: NodeGraph,
    pub particles: ParticleField,
    pub log: VecDeque<LogLine>,
    pub prompt: Option<Prompt>,
    pub hover: Option<Hover>,
    pub should_quit: bool,
    pub seen_snapshot: bool,
    /// Inner rect of the ring viewport from the last draw, for mouse
    /// hit-testing.
    pub canvas_area: Rect,
    pub visual: VisualConfig,
    client: ApiClient,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(cfg: &Config, client: ApiClient, events: UnboundedSender<AppEvent>) -> Self {
        let mut app = Self {
            view: ViewState::default(),
            graph: NodeGraph::new(cfg.visual.ring_radius),
            particles: ParticleField::new(
                cfg.visual.particle_speed_min,
                cfg.visual.particle_speed_max,
            ),
            log: VecDeque::new(),
            prompt: None,
            hover: None,
            should_quit: false,
            seen_snapshot: false,
            canvas_area: Rect::default(),
            visual: cfg.visual.clone(),
            client,
            events,
        };
        let base = app.client.base_url().to_string();
        app.push_log(
            LogLevel::Sys,
            format!("dashboard initialized, connecting to {}", base),
        );
        app
    }

    pub fn push_log(&mut self, level: LogLevel, msg: String) {
        self.log.push_back(LogLine {
            time: timestamp(),
            level,
            msg,
        });
        while self.log.len() > LOG_CAPACITY {
            self.log.pop_front();
        }
    }

    pub fn handle_event(&mut self, ev: AppEvent) {
        match ev {
            AppEvent::Snapshot(snap) => {
                self.seen_snapshot = true;
                self.apply_snapshot(snap);
            }
            AppEvent::PollFailed(msg) => {
                self.push_log(LogLevel::Err, format!("poll failed: {}", msg));
            }
            AppEvent::PutDone { key, value } => {
                self.push_log(LogLevel::Ok, format!("PUT {} = {}", key, value));
                // The true owner is unknown without the ring hash; aim at
                // a node whose identity contains the key, else random.
                self.particles.spawn(&key, &self.graph);
            }
            AppEvent::Logged(level, msg) => self.push_log(level, msg),
        }
    }

    /// Reconcile the snapshot and patch the visual graph. The view is
    /// replaced wholesale; the graph keeps identity across ticks.
    fn apply_snapshot(&mut self, snap: SystemSnapshot) {
        self.view = reconcile(&self.view, snap);
        self.graph.update(&self.view.nodes, &self.view.stats);
        if let Some(hover) = &self.hover {
            if self.graph.get(&hover.id).is_none() {
                self.hover = None;
            }
        }
    }

    /// Move the selection highlight; visible on the next animation frame,
    /// independent of the poll cadence.
    pub fn select(&mut self, id: &str) {
        if self.view.nodes.iter().any(|n| n == id) {
            self.view.selected = Some(id.to_string());
        }
    }

    pub fn clear_selection(&mut self) {
        self.view.selected = None;
    }

    pub fn select_next(&mut self) {
        self.step_selection(1);
    }

    pub fn select_prev(&mut self) {
        self.step_selection(-1);
    }

    fn step_selection(&mut self, dir: isize) {
        let ids = self.graph.ids();
        if ids.is_empty() {
            return;
        }
        let len = ids.len() as isize;
        let next = match &self.view.selected {
            Some(sel) => match ids.iter().position(|id| id == sel) {
                Some(idx) => (idx as isize + dir).rem_euclid(len) as usize,
                None => 0,
            },
            None => {
                if dir >= 0 {
                    0
                } else {
                    ids.len() - 1
                }
            }
        };
        self.view.selected = Some(ids[next].clone());
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.prompt.is_some() {
            match key.code {
                KeyCode::Esc => self.prompt = None,
                KeyCode::Enter => {
                    if let Some(prompt) = self.prompt.take() {
                        self.submit_prompt(prompt);
                    }
                }
                KeyCode::Backspace => {
                    if let Some(prompt) = self.prompt.as_mut() {
                        prompt.buffer.pop();
                    }
                }
                KeyCode::Char(c) => {
                    if let Some(prompt) = self.prompt.as_mut() {
                        prompt.buffer.push(c);
                    }
                }
                _ => {}
            }
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('s') => self.dispatch_mode(Mode::Sync),
            KeyCode::Char('a') => self.dispatch_mode(Mode::Async),
            KeyCode::Char('p') => {
                self.prompt = Some(Prompt {
                    kind: PromptKind::Put,
                    buffer: String::new(),
                })
            }
            KeyCode::Char('g') => {
                self.prompt = Some(Prompt {
                    kind: PromptKind::Get,
                    buffer: String::new(),
                })
            }
            KeyCode::Tab | KeyCode::Right | KeyCode::Down => self.select_next(),
            KeyCode::BackTab | KeyCode::Left | KeyCode::Up => self.select_prev(),
            KeyCode::Esc => self.clear_selection(),
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, ev: MouseEvent) {
        match ev.kind {
            MouseEventKind::Moved => {
                self.hover =
                    ui::hit_test(&self.graph, self.canvas_area, &self.visual, ev.column, ev.row)
                        .map(|id| Hover {
                            id,
                            column: ev.column,
                            row: ev.row,
                        });
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(id) =
                    ui::hit_test(&self.graph, self.canvas_area, &self.visual, ev.column, ev.row)
                {
                    self.select(&id);
                }
            }
            _ => {}
        }
    }

    fn submit_prompt(&mut self, prompt: Prompt) {
        match prompt.kind {
            PromptKind::Put => match prompt.buffer.split_once('=') {
                Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
                    self.dispatch_put(key.trim().to_string(), value.trim().to_string());
                }
                _ => self.push_log(LogLevel::Warn, "put expects key=value".to_string()),
            },
            PromptKind::Get => {
                let key = prompt.buffer.trim().to_string();
                if !key.is_empty() {
                    self.dispatch_get(key);
                }
            }
        }
    }

    /// Fire-and-forget mode switch. Local state is not touched: the HUD
    /// adopts the new mode only once a poll reports it.
    pub fn dispatch_mode(&mut self, mode: Mode) {
        let client = self.client.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let ev = match client.switch_mode(mode).await {
                Ok(()) => AppEvent::Logged(
                    LogLevel::Sys,
                    format!("switched replication mode to {}", mode),
                ),
                Err(e) => AppEvent::Logged(LogLevel::Err, format!("mode switch failed: {}", e)),
            };
            let _ = tx.send(ev);
        });
    }

    pub fn dispatch_put(&mut self, key: String, value: String) {
        let client = self.client.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let ev = match client.put(&key, &value).await {
                Ok(_) => AppEvent::PutDone { key, value },
                Err(e) => AppEvent::Logged(LogLevel::Err, format!("PUT {} failed: {}", key, e)),
            };
            let _ = tx.send(ev);
        });
    }

    pub fn dispatch_get(&mut self, key: String) {
        let client = self.client.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let ev = match client.get(&key).await {
                Ok(GetOutcome::Found(value)) => {
                    AppEvent::Logged(LogLevel::Ok, format!("GET {} -> {}", key, value))
                }
                Ok(GetOutcome::NotFound) => {
                    AppEvent::Logged(LogLevel::Warn, format!("GET {} -> not found", key))
                }
                Err(e) => AppEvent::Logged(LogLevel::Err, format!("GET {} failed: {}", key, e)),
            };
            let _ = tx.send(ev);
        });
    }
}

fn timestamp() -> String {
    let secs = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let s = secs % 86400;
    format!("{:02}:{:02}:{:02}", s / 3600, (s % 3600) / 60, s % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{NodeStat, RingConfig};
    use tokio::sync::mpsc;

    fn snapshot(nodes: &[&str]) -> SystemSnapshot {
        SystemSnapshot {
            nodes: nodes.iter().map(|n| n.to_string()).collect(),
            mode: Mode::Sync,
            stats: nodes
                .iter()
                .map(|n| NodeStat {
                    address: n.to_string(),
                    key_count: 2,
                    request_rate: 5,
                    keys: vec!["alpha".into(), "beta".into()],
                })
                .collect(),
            config: RingConfig { replicas: 20 },
        }
    }

    fn test_app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        // Unroutable backend: dispatch tasks fail, which is fine here.
        App::new(&Config::default(), ApiClient::new("127.0.0.1:1"), tx)
    }

    #[test]
    fn test_snapshot_builds_graph_and_selection_sticks() {
        let mut app = test_app();
        app.handle_event(AppEvent::Snapshot(snapshot(&["a:9001", "b:9002"])));
        assert_eq!(app.graph.len(), 2);

        app.select("a:9001");
        assert_eq!(app.view.selected.as_deref(), Some("a:9001"));

        // Another tick with the same membership keeps the selection.
        app.handle_event(AppEvent::Snapshot(snapshot(&["a:9001", "b:9002"])));
        assert_eq!(app.view.selected.as_deref(), Some("a:9001"));
    }

    #[test]
    fn test_departed_node_clears_selection_and_visual() {
        let mut app = test_app();
        app.handle_event(AppEvent::Snapshot(snapshot(&["a:9001"])));
        app.select("a:9001");

        app.handle_event(AppEvent::Snapshot(snapshot(&[])));
        assert_eq!(app.view.selected, None);
        assert!(app.graph.is_empty());
    }

    #[test]
    fn test_select_is_idempotent() {
        let mut app = test_app();
        app.handle_event(AppEvent::Snapshot(snapshot(&["a:9001", "b:9002"])));

        app.select("a:9001");
        let first = ui::inspector_lines(&app.view);
        app.select("a:9001");
        let second = ui::inspector_lines(&app.view);
        assert_eq!(first, second);
    }

    #[test]
    fn test_select_rejects_unknown_identity() {
        let mut app = test_app();
        app.handle_event(AppEvent::Snapshot(snapshot(&["a:9001"])));
        app.select("ghost:1234");
        assert_eq!(app.view.selected, None);
    }

    #[test]
    fn test_selection_cycles_in_ring_order() {
        let mut app = test_app();
        app.handle_event(AppEvent::Snapshot(snapshot(&["a:1", "b:2", "c:3"])));

        app.select_next();
        assert_eq!(app.view.selected.as_deref(), Some("a:1"));
        app.select_next();
        assert_eq!(app.view.selected.as_deref(), Some("b:2"));
        app.select_prev();
        app.select_prev();
        assert_eq!(app.view.selected.as_deref(), Some("c:3"));
    }

    #[tokio::test]
    async fn test_mode_switch_is_not_optimistic() {
        let mut app = test_app();
        app.handle_event(AppEvent::Snapshot(snapshot(&["a:9001"])));
        assert_eq!(app.view.mode, Mode::Sync);

        app.handle_key(KeyEvent::from(KeyCode::Char('a')));
        // Still sync until a poll reports otherwise.
        assert_eq!(app.view.mode, Mode::Sync);

        let mut next = snapshot(&["a:9001"]);
        next.mode = Mode::Async;
        app.handle_event(AppEvent::Snapshot(next));
        assert_eq!(app.view.mode, Mode::Async);
    }

    #[test]
    fn test_put_outcome_logs_and_spawns_particle() {
        let mut app = test_app();
        app.handle_event(AppEvent::Snapshot(snapshot(&["a:9001"])));

        app.handle_event(AppEvent::PutDone {
            key: "color".to_string(),
            value: "teal".to_string(),
        });
        assert_eq!(app.particles.len(), 1);
        assert!(app.log.back().unwrap().msg.contains("PUT color = teal"));
    }

    #[test]
    fn test_put_outcome_with_empty_ring_spawns_nothing() {
        let mut app = test_app();
        app.handle_event(AppEvent::PutDone {
            key: "color".to_string(),
            value: "teal".to_string(),
        });
        assert_eq!(app.particles.len(), 0);
    }

    #[test]
    fn test_poll_failure_logs_and_leaves_state() {
        let mut app = test_app();
        app.handle_event(AppEvent::Snapshot(snapshot(&["a:9001"])));
        let before = app.view.clone();

        app.handle_event(AppEvent::PollFailed("connection refused".to_string()));
        assert_eq!(app.view, before);
        assert_eq!(app.log.back().unwrap().level, LogLevel::Err);
    }

    #[test]
    fn test_prompt_editing() {
        let mut app = test_app();
        app.handle_key(KeyEvent::from(KeyCode::Char('p')));
        assert!(app.prompt.is_some());

        for c in "k=v".chars() {
            app.handle_key(KeyEvent::from(KeyCode::Char(c)));
        }
        app.handle_key(KeyEvent::from(KeyCode::Backspace));
        assert_eq!(app.prompt.as_ref().unwrap().buffer, "k=");

        app.handle_key(KeyEvent::from(KeyCode::Esc));
        assert!(app.prompt.is_none());
    }

    #[test]
    fn test_malformed_put_prompt_logs_warning() {
        let mut app = test_app();
        app.handle_key(KeyEvent::from(KeyCode::Char('p')));
        for c in "no-equals".chars() {
            app.handle_key(KeyEvent::from(KeyCode::Char(c)));
        }
        app.handle_key(KeyEvent::from(KeyCode::Enter));

        assert!(app.prompt.is_none());
        assert_eq!(app.log.back().unwrap().level, LogLevel::Warn);
    }
}
