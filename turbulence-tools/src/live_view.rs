//! Animated two-panel terminal view of loss and turbulence.
//!
//! Replays a finished (or in-progress) run frame by frame: frame `k` shows
//! the first `k` values of each series, with axis bounds fixed to the full
//! series so the curves grow into a stable frame.
//!
//! # Keys
//!
//! - `q` / `Esc`: quit
//! - `Space`: pause / resume
//! - `r`: restart from frame 0

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    symbols,
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType},
    Frame, Terminal,
};
use tracing::info;

use crate::charts::VizResult;
use crate::tracker::TurbulenceTracker;

/// Default delay between frames.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(500);

/// Live replay of loss and turbulence histories.
pub struct LiveTurbulenceView {
    loss_points: Vec<(f64, f64)>,
    turbulence_points: Vec<(f64, f64)>,
    loss_bounds: [f64; 2],
    turbulence_bounds: [f64; 2],
    interval: Duration,
    frame: usize,
    paused: bool,
    should_quit: bool,
}

/// `[min, max + headroom]`, with `0` / `1` standing in for an empty series.
fn y_bounds(values: &[f64], headroom: f64) -> [f64; 2] {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = if min.is_finite() { min } else { 0.0 };
    let max = if max.is_finite() { max } else { 1.0 };
    [min, max + headroom]
}

fn to_points(values: &[f64]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64, v))
        .collect()
}

impl LiveTurbulenceView {
    pub fn new(loss_history: &[f32], turbulence_history: &[f64]) -> Self {
        let loss: Vec<f64> = loss_history.iter().map(|&v| f64::from(v)).collect();
        Self {
            loss_bounds: y_bounds(&loss, 0.1),
            turbulence_bounds: y_bounds(turbulence_history, 0.2),
            loss_points: to_points(&loss),
            turbulence_points: to_points(turbulence_history),
            interval: DEFAULT_FRAME_INTERVAL,
            frame: 0,
            paused: false,
            should_quit: false,
        }
    }

    pub fn from_tracker(tracker: &TurbulenceTracker) -> Self {
        Self::new(tracker.loss_history(), tracker.turbulence_history())
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn frame(&self) -> usize {
        self.frame
    }

    /// One frame per recorded loss value.
    pub fn total_frames(&self) -> usize {
        self.loss_points.len()
    }

    pub fn is_finished(&self) -> bool {
        self.frame + 1 >= self.total_frames()
    }

    /// Move to the next frame. Returns false once the last frame is reached.
    pub fn advance(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.frame += 1;
        true
    }

    pub fn restart(&mut self) {
        self.frame = 0;
    }

    fn visible_loss(&self) -> &[(f64, f64)] {
        &self.loss_points[..self.frame.min(self.loss_points.len())]
    }

    fn visible_turbulence(&self) -> &[(f64, f64)] {
        &self.turbulence_points[..self.frame.min(self.turbulence_points.len())]
    }

    /// Run the animation in the terminal until the user quits.
    pub fn run(&mut self) -> VizResult<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        info!(
            frames = self.total_frames(),
            interval_ms = self.interval.as_millis() as u64,
            "starting live turbulence view"
        );
        let result = self.main_loop(&mut terminal);

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> VizResult<()> {
        let mut last_tick = Instant::now();

        while !self.should_quit {
            terminal.draw(|f| self.draw(f))?;

            let timeout = self.interval.saturating_sub(last_tick.elapsed());
            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code);
                    }
                }
            }

            if last_tick.elapsed() >= self.interval {
                if !self.paused {
                    self.advance();
                }
                last_tick = Instant::now();
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char(' ') => self.paused = !self.paused,
            KeyCode::Char('r') => self.restart(),
            _ => {}
        }
    }

    /// Draw the current frame into `f`.
    pub fn draw(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(f.area());

        self.draw_panel(
            f,
            chunks[0],
            " Live Loss Curve ",
            "Loss",
            self.visible_loss(),
            self.loss_points.len(),
            self.loss_bounds,
            Color::Blue,
        );
        self.draw_panel(
            f,
            chunks[1],
            " Live Turbulence ",
            "Angle",
            self.visible_turbulence(),
            self.turbulence_points.len(),
            self.turbulence_bounds,
            Color::Red,
        );
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_panel(
        &self,
        f: &mut Frame,
        area: Rect,
        title: &str,
        y_title: &str,
        data: &[(f64, f64)],
        len: usize,
        y_bounds: [f64; 2],
        color: Color,
    ) {
        let datasets = vec![Dataset::default()
            .name(y_title.to_string())
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(color))
            .data(data)];

        let x_max = (len as f64).max(1.0);
        let chart = Chart::new(datasets)
            .block(Block::default().borders(Borders::ALL).title(title.to_string()))
            .x_axis(
                Axis::default()
                    .title("Step")
                    .style(Style::default().fg(Color::Gray))
                    .bounds([0.0, x_max])
                    .labels(vec!["0".to_string(), format!("{:.0}", x_max)]),
            )
            .y_axis(
                Axis::default()
                    .title(y_title.to_string())
                    .style(Style::default().fg(Color::Gray))
                    .bounds(y_bounds)
                    .labels(vec![
                        format!("{:.2}", y_bounds[0]),
                        format!("{:.2}", (y_bounds[0] + y_bounds[1]) / 2.0),
                        format!("{:.2}", y_bounds[1]),
                    ]),
            );

        f.render_widget(chart, area);
    }
}
