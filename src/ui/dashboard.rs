//! Live bar chart dashboard
//!
//! One panel per channel group, one bar per channel. Missing channels are
//! drawn flat and labelled `-`; heights above `y_max` are clipped.

use crate::domain::{is_missing, ChannelGroup, Frame};
use crate::ui::palette::channel_colors;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Paragraph},
    Frame as TermFrame,
};
use std::time::Instant;

/// What the dashboard shows between frames
#[derive(Debug)]
pub struct DashboardState {
    source: String,
    groups: Vec<ChannelGroup>,
    y_max: u64,
    frame: Option<Frame>,
    frames_received: u64,
    last_frame_at: Option<Instant>,
    last_error: Option<String>,
    closed: bool,
}

impl DashboardState {
    pub fn new(source: impl Into<String>, groups: Vec<ChannelGroup>, y_max: u64) -> Self {
        Self {
            source: source.into(),
            groups,
            y_max: y_max.max(1),
            frame: None,
            frames_received: 0,
            last_frame_at: None,
            last_error: None,
            closed: false,
        }
    }

    pub fn update_frame(&mut self, frame: Frame) {
        self.frame = Some(frame);
        self.frames_received += 1;
        self.last_frame_at = Some(Instant::now());
        self.last_error = None;
    }

    /// Keep the last frame on screen and show why the cycle failed
    pub fn record_error(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
    }

    pub fn mark_closed(&mut self) {
        self.closed = true;
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }
}

/// Bar height for a reading: missing is zero, the rest is clipped to `y_max`
pub fn bar_value(value: f64, y_max: u64) -> u64 {
    if is_missing(value) {
        0
    } else {
        (value.round() as u64).min(y_max)
    }
}

fn value_text(value: f64) -> String {
    if is_missing(value) {
        "-".to_string()
    } else {
        format!("{:.0}", value)
    }
}

pub fn draw(f: &mut TermFrame, state: &DashboardState) {
    let mut constraints = vec![Constraint::Length(3)];
    constraints.extend(state.groups.iter().map(|_| Constraint::Fill(1)));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(f.area());

    draw_header(f, chunks[0], state);
    for (i, group) in state.groups.iter().enumerate() {
        draw_group(f, chunks[i + 1], state, group);
    }
}

fn draw_header(f: &mut TermFrame, area: Rect, state: &DashboardState) {
    let (status_text, status_color) = if state.closed {
        ("CLOSED", Color::Red)
    } else if state.last_error.is_some() {
        ("STALLED", Color::Yellow)
    } else if state.frames_received > 0 {
        ("LIVE", Color::Green)
    } else {
        ("WAITING", Color::DarkGray)
    };

    let last_frame = state
        .last_frame_at
        .map(|t| format!("{}ms ago", t.elapsed().as_millis()))
        .unwrap_or_else(|| "never".to_string());

    let mut spans = vec![
        Span::styled("Spectra ", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
        Span::raw("| "),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw(format!(" | {} | Frames: ", state.source)),
        Span::styled(state.frames_received.to_string(), Style::default().fg(Color::Yellow)),
        Span::raw(format!(" | Last: {}", last_frame)),
    ];
    if let Some(err) = &state.last_error {
        spans.push(Span::styled(format!(" | {}", err), Style::default().fg(Color::Red)));
    }
    spans.push(Span::raw(" | Press 'q' to quit"));

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn draw_group(f: &mut TermFrame, area: Rect, state: &DashboardState, group: &ChannelGroup) {
    let count = group.channel_count();
    let colors = channel_colors(group.palette, count);
    let values: Vec<f64> = state
        .frame
        .as_ref()
        .and_then(|frame| frame.group(&group.name))
        .map(|reading| reading.values.clone())
        .unwrap_or_default();

    let bars: Vec<Bar> = group
        .labels
        .iter()
        .enumerate()
        .map(|(i, label)| {
            let value = values.get(i).copied().unwrap_or(f64::NAN);
            Bar::default()
                .value(bar_value(value, state.y_max))
                .text_value(value_text(value))
                .label(Line::from(label.clone()))
                .style(Style::default().fg(colors[i]))
                .value_style(Style::default().fg(Color::Black).bg(colors[i]))
        })
        .collect();

    // Spread bars across the panel, one column gap between them
    let inner_width = area.width.saturating_sub(2) as usize;
    let bar_width = (inner_width / count.max(1)).saturating_sub(1).max(1) as u16;

    let chart = BarChart::default()
        .block(
            Block::default()
                .title(format!(" {} Spectrometer (0-{}) ", group.name, state.y_max))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .bar_width(bar_width)
        .bar_gap(1)
        .max(state.y_max)
        .data(BarGroup::default().bars(&bars));

    f.render_widget(chart, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GroupReading, MISSING};
    use ratatui::{backend::TestBackend, Terminal};

    fn rendered(state: &DashboardState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| draw(f, state)).unwrap();
        terminal.backend().buffer().content.iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_bar_value() {
        assert_eq!(bar_value(MISSING, 5000), 0);
        assert_eq!(bar_value(1234.4, 5000), 1234);
        assert_eq!(bar_value(9000.0, 5000), 5000);
        assert_eq!(bar_value(f64::INFINITY, 5000), 5000);
    }

    #[test]
    fn test_draw_waiting() {
        let state = DashboardState::new("script", ChannelGroup::defaults(), 5000);
        let screen = rendered(&state);
        assert!(screen.contains("WAITING"));
        assert!(screen.contains("AS7341"));
        assert!(screen.contains("AS7263"));
    }

    #[test]
    fn test_draw_frame() {
        let mut state = DashboardState::new("script", ChannelGroup::defaults(), 5000);
        let mut as7263 = vec![MISSING; 6];
        as7263[0] = 4321.0;
        state.update_frame(Frame {
            groups: vec![
                GroupReading { name: "AS7341".to_string(), values: vec![MISSING; 12] },
                GroupReading { name: "AS7263".to_string(), values: as7263 },
            ],
        });
        let screen = rendered(&state);
        assert!(screen.contains("LIVE"));
        assert!(screen.contains("4321"));
        assert_eq!(state.frames_received(), 1);
    }

    #[test]
    fn test_error_then_closed() {
        let mut state = DashboardState::new("script", ChannelGroup::defaults(), 5000);
        state.record_error("no complete \"&\" block after 2000ms");
        assert!(rendered(&state).contains("STALLED"));
        state.mark_closed();
        assert!(rendered(&state).contains("CLOSED"));
        assert!(state.frame().is_none());
    }
}
