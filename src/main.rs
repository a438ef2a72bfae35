use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph};
use tracing::{info, warn};

use hoops_career::Store;
use hoops_career::comps::SHALLOW_CAREER_FLOOR;
use hoops_career::config::{self, EngineConfig};
use hoops_career::logging;
use hoops_career::similarity::GEOMETRY_AXES;
use hoops_career::synthetic;

#[derive(Debug, Parser)]
#[command(name = "hoops_career", about = "Browse career trajectories, comps and labels")]
struct Args {
    /// Use a generated roster instead of the season table.
    #[arg(long)]
    demo: bool,
    #[arg(long, default_value_t = 400)]
    demo_players: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long)]
    seasons: Option<PathBuf>,
    #[arg(long)]
    bio: Option<PathBuf>,
    #[arg(long)]
    season: Option<i32>,
    #[arg(short, long)]
    k: Option<usize>,
    #[arg(long, default_value = "hoops_career.log")]
    log_file: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Trajectory,
    Comps,
    Geometry,
    Projection,
    Forecast,
    Labels,
}

const VIEWS: [View; 6] = [
    View::Trajectory,
    View::Comps,
    View::Geometry,
    View::Projection,
    View::Forecast,
    View::Labels,
];

impl View {
    fn label(self) -> &'static str {
        match self {
            View::Trajectory => "Trajectory",
            View::Comps => "Comps",
            View::Geometry => "Geometry",
            View::Projection => "Projection",
            View::Forecast => "Forecast",
            View::Labels => "Labels",
        }
    }

    fn next(self) -> Self {
        let idx = VIEWS.iter().position(|v| *v == self).unwrap_or(0);
        VIEWS[(idx + 1) % VIEWS.len()]
    }
}

struct App {
    store: Store,
    k: usize,
    visible: Vec<i64>,
    selected: usize,
    view: View,
    show_all: bool,
    search: String,
    searching: bool,
    help_overlay: bool,
    should_quit: bool,
}

impl App {
    fn new(store: Store, k: usize) -> Self {
        let mut app = Self {
            store,
            k,
            visible: Vec::new(),
            selected: 0,
            view: View::Trajectory,
            show_all: false,
            search: String::new(),
            searching: false,
            help_overlay: false,
            should_quit: false,
        };
        app.refilter();
        app
    }

    /// By default only careers deep enough to have comps are listed.
    fn refilter(&mut self) {
        let floor = if self.show_all { 0 } else { SHALLOW_CAREER_FLOOR };
        self.visible = self
            .store
            .roster()
            .search(&self.search)
            .into_iter()
            .filter(|p| p.qualifying_seasons >= floor)
            .map(|p| p.player_id)
            .collect();
        self.selected = self.selected.min(self.visible.len().saturating_sub(1));
    }

    fn selected_player(&self) -> Option<i64> {
        self.visible.get(self.selected).copied()
    }

    fn on_key(&mut self, key: KeyEvent) {
        if self.searching {
            match key.code {
                KeyCode::Enter | KeyCode::Esc => self.searching = false,
                KeyCode::Backspace => {
                    self.search.pop();
                    self.refilter();
                }
                KeyCode::Char(c) => {
                    self.search.push(c);
                    self.selected = 0;
                    self.refilter();
                }
                _ => {}
            }
            return;
        }
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected + 1 < self.visible.len() {
                    self.selected += 1;
                }
            }
            KeyCode::Char('k') | KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Tab | KeyCode::Char('l') => self.view = self.view.next(),
            KeyCode::Char(c @ '1'..='6') => {
                let idx = c as usize - '1' as usize;
                self.view = VIEWS[idx];
            }
            KeyCode::Char('/') => self.searching = true,
            KeyCode::Char('a') => {
                self.show_all = !self.show_all;
                self.refilter();
            }
            KeyCode::Esc => {
                self.search.clear();
                self.refilter();
            }
            KeyCode::Char('?') => self.help_overlay = !self.help_overlay,
            _ => {}
        }
    }
}

fn build_store(args: &Args) -> Result<(Store, usize)> {
    let mut cfg = EngineConfig::from_env();
    if let Some(path) = &args.seasons {
        cfg.seasons_path = path.clone();
    }
    if let Some(path) = &args.bio {
        cfg.bio_path = path.clone();
    }
    if let Some(season) = args.season {
        cfg.current_season = season;
    }
    let k = args.k.unwrap_or(cfg.default_k);

    let store = if args.demo {
        let roster = synthetic::generate(args.demo_players, cfg.current_season, args.seed);
        info!(players = args.demo_players, seed = args.seed, "using synthetic roster");
        Store::from_raw(roster.seasons, &roster.bio, cfg.current_season)
    } else {
        Store::load(&cfg)?
    };
    Ok((store.with_default_k(k), k))
}

fn main() -> Result<()> {
    config::load_dotenv();
    let args = Args::parse();
    if let Err(err) = logging::init_file_logging(&args.log_file) {
        eprintln!("warning: file logging disabled: {err:#}");
    }

    let (store, k) = build_store(&args)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App::new(store, k);
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        warn!(error = %err, "browser loop failed");
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.on_key(key);
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let header = Paragraph::new(header_text(app)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(chunks[1]);
    render_player_list(frame, body[0], app);
    render_detail(frame, body[1], app);

    let footer = Paragraph::new(footer_text(app)).block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, chunks[2]);

    if app.help_overlay {
        let area = frame.size();
        render_help_overlay(frame, area);
    }
}

fn header_text(app: &App) -> String {
    let title = format!(
        "HOOPS CAREER | Season {} | {} players | {}",
        app.store.current_season(),
        app.visible.len(),
        app.view.label()
    );
    let filter = if app.searching {
        format!("Search: {}_", app.search)
    } else if app.search.is_empty() {
        String::new()
    } else {
        format!("Search: {}", app.search)
    };
    format!("  (o)  {title}\n  /|\\  {filter}\n  / \\")
}

fn footer_text(app: &App) -> String {
    if app.searching {
        return "Type to filter | Enter/Esc Done".to_string();
    }
    "j/k/↑/↓ Move | Tab/l View | 1-6 Jump | / Search | a All | ? Help | q Quit".to_string()
}

fn render_player_list(frame: &mut Frame, area: Rect, app: &App) {
    let block = Block::default().title("Players").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.visible.is_empty() {
        let empty = Paragraph::new("No players match").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
        return;
    }

    let visible = inner.height as usize;
    let (start, end) = visible_range(app.selected, app.visible.len(), visible);
    for (i, idx) in (start..end).enumerate() {
        let pid = app.visible[idx];
        let Some(profile) = app.store.profile(pid) else {
            continue;
        };
        let row_area = Rect {
            x: inner.x,
            y: inner.y + i as u16,
            width: inner.width,
            height: 1,
        };
        let style = if idx == app.selected {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        let text = format!(
            "{} ({}-{})",
            profile.name, profile.from_year, profile.to_year
        );
        frame.render_widget(Paragraph::new(text).style(style), row_area);
    }
}

fn render_detail(frame: &mut Frame, area: Rect, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(1)])
        .split(area);

    let Some(pid) = app.selected_player() else {
        frame.render_widget(Block::default().borders(Borders::ALL), area);
        return;
    };

    let profile = Paragraph::new(profile_text(app, pid))
        .block(Block::default().title("Profile").borders(Borders::ALL));
    frame.render_widget(profile, rows[0]);

    let block = Block::default().title(app.view.label()).borders(Borders::ALL);
    match app.view {
        View::Geometry => render_geometry(frame, rows[1], app, pid, block),
        view => {
            let text = match view {
                View::Trajectory => trajectory_text(app, pid),
                View::Comps => comps_text(app, pid),
                View::Projection => projection_text(app, pid),
                View::Forecast => forecast_text(app, pid),
                _ => labels_text(app),
            };
            frame.render_widget(Paragraph::new(text).block(block), rows[1]);
        }
    }
}

fn profile_text(app: &App, pid: i64) -> String {
    let Some(p) = app.store.profile(pid) else {
        return "Unknown player".to_string();
    };
    let label = app.store.label(pid);
    let body = [
        p.position.clone(),
        p.height.clone(),
        p.weight.map(|w| format!("{w:.0} lb")),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" | ");
    format!(
        "{} #{}  {}\n{}-{} | {} seasons played\n{}: {}",
        p.name,
        p.player_id,
        body,
        p.from_year,
        p.to_year,
        p.season_count,
        label.label,
        label.rationale.unwrap_or_default()
    )
}

fn opt(value: Option<f64>, decimals: usize) -> String {
    value
        .map(|v| format!("{v:.decimals$}"))
        .unwrap_or_else(|| "-".to_string())
}

fn trajectory_text(app: &App, pid: i64) -> String {
    let points = app.store.trajectory(pid);
    if points.is_empty() {
        return "No seasons before the current one".to_string();
    }
    let mut lines = vec!["Season Age  GP   MPG   PTS  AST  REB  3PM   TS%   VAL  Notes".to_string()];
    for p in points {
        let notes = [p.annotation.as_deref(), p.efficiency_note]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" | ");
        lines.push(format!(
            "{:<6} {:>3} {:>3} {:>5} {:>5} {:>4} {:>4} {:>4} {:>5} {:>5}  {}",
            p.season,
            opt(p.age, 0),
            opt(p.gp, 0),
            opt(p.mpg, 1),
            opt(p.pts_per_game, 1),
            opt(p.ast_per_game, 1),
            opt(p.reb_per_game, 1),
            opt(p.fg3_per_game, 1),
            opt(p.ts_pct, 3),
            opt(p.value_score, 2),
            notes
        ));
    }
    lines.join("\n")
}

fn comps_text(app: &App, pid: i64) -> String {
    let mut lines = Vec::new();
    match app.store.comps(pid, app.k) {
        Ok(set) => {
            lines.push(format!("Stability comps ({})", set.space.name()));
            if set.comps.is_empty() {
                lines.push("  none".to_string());
            }
            for c in set.comps {
                lines.push(format!("  {}. {} (d={:.3})", c.similarity_rank, c.name, c.distance));
            }
        }
        Err(err) => lines.push(format!("Stability comps: {err}")),
    }
    lines.push(String::new());
    match app.store.radar(pid, app.k) {
        Ok(radar) => {
            lines.push("Name                      PTS  AST  REB  3PM   TS%  AVAIL   VAL".to_string());
            for s in radar.series {
                lines.push(format!(
                    "{:<24} {:>4} {:>4} {:>4} {:>4} {:>5} {:>6} {:>5}",
                    s.name,
                    opt(s.pts_per_game, 1),
                    opt(s.ast_per_game, 1),
                    opt(s.reb_per_game, 1),
                    opt(s.fg3_per_game, 1),
                    opt(s.ts_pct, 3),
                    opt(s.availability, 2),
                    opt(s.value_score, 2),
                ));
            }
        }
        Err(err) => lines.push(format!("Radar: {err}")),
    }
    lines.join("\n")
}

fn render_geometry(frame: &mut Frame, area: Rect, app: &App, pid: i64, block: Block) {
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(10), Constraint::Min(1)])
        .split(inner);

    let geometry = match app.store.counting_geometry(pid, app.k) {
        Ok(g) => g,
        Err(err) => {
            let msg = Paragraph::new(format!("{err}")).style(Style::default().fg(Color::Red));
            frame.render_widget(msg, inner);
            return;
        }
    };
    let Some(selected) = geometry.series.first() else {
        let empty = Paragraph::new("No peak season on record")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
        return;
    };

    let values = axis_values(selected);
    let bars = GEOMETRY_AXES
        .iter()
        .zip(values)
        .map(|(axis, v)| {
            Bar::default()
                .value((v * 100.0).round() as u64)
                .label(Line::from(*axis))
                .style(Style::default().fg(Color::Cyan))
        })
        .collect::<Vec<_>>();
    let chart = BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .max(100);
    frame.render_widget(chart, parts[0]);

    let mut lines = vec![format!("Peak season {}", selected.season)];
    for s in geometry.series.iter().skip(1) {
        lines.push(format!(
            "  {} ({}) d={}",
            s.name,
            s.season,
            opt(s.distance, 3)
        ));
    }
    let list = Paragraph::new(lines.join("\n")).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(list, parts[1]);
}

fn axis_values(s: &hoops_career::comps::GeometrySeries) -> [f64; 8] {
    [
        s.efficiency,
        s.threes,
        s.points,
        s.rebounds,
        s.assists,
        s.steals,
        s.blocks,
        s.turnovers,
    ]
}

fn projection_text(app: &App, pid: i64) -> String {
    let points = app.store.projection(pid);
    if points.is_empty() {
        return "No projection: player did not appear last season".to_string();
    }
    let mut lines = vec!["Season Age  GP   MPG   PTS  AST  REB  3PM   TS%".to_string()];
    for p in points {
        lines.push(format!(
            "{:<6} {:>3} {:>3} {:>5} {:>5} {:>4} {:>4} {:>4} {:>5}",
            p.season,
            opt(p.age, 0),
            opt(p.gp_pred, 0),
            opt(p.mpg_pred, 1),
            opt(p.pts_per_game_pred, 1),
            opt(p.ast_per_game_pred, 1),
            opt(p.reb_per_game_pred, 1),
            opt(p.fg3_per_game_pred, 1),
            opt(p.ts_pct_pred, 3),
        ));
    }
    lines.join("\n")
}

fn forecast_text(app: &App, pid: i64) -> String {
    let Some(points) = app.store.forecast(pid) else {
        return "No forecast: needs a current-season row and a scored prior season".to_string();
    };
    let mut lines = vec!["Season    p25  median    p75".to_string()];
    for p in points.iter() {
        lines.push(format!(
            "{:<6} {:>6.3} {:>7.3} {:>6.3}",
            p.season, p.p25, p.median, p.p75
        ));
    }
    lines.join("\n")
}

fn labels_text(app: &App) -> String {
    let summary = app.store.label_summary();
    let mut lines = vec![format!("{} players labelled", summary.total_players)];
    for l in &summary.labels {
        lines.push(format!("{:>5}  {}", l.count, l.label));
    }
    lines.join("\n")
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "Hoops Career - Help",
        "",
        "Players:",
        "  j/k or ↑/↓   Move",
        "  /            Search by name",
        "  Esc          Clear search",
        "  a            Toggle shallow careers",
        "",
        "Views:",
        "  Tab / l      Next view",
        "  1-6          Trajectory, Comps, Geometry,",
        "               Projection, Forecast, Labels",
        "",
        "  ?            Toggle help",
        "  q            Quit",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
