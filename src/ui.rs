use itertools::{EitherOrBoth, Itertools};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::challenge::{normalize, Challenge, Cue, Phase};
use crate::history::MatchOutcome;
use crate::{App, Screen};

const HORIZONTAL_MARGIN: u16 = 5;

pub fn draw(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.screen {
            Screen::Menu => render_menu(self, area, buf),
            Screen::Match => render_match(self, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

fn centered_block(area: Rect, height: u16) -> Rect {
    let pad = area.height.saturating_sub(height) / 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(pad),
            Constraint::Length(height),
            Constraint::Min(0),
        ])
        .split(area);
    chunks[1]
}

fn volume_bar(value: f64) -> String {
    let filled = ((value * 10.0).round() as usize).min(10);
    format!(
        "{}{} {:3.0}%",
        "▮".repeat(filled),
        "░".repeat(10 - filled),
        value * 100.0
    )
}

fn render_menu(app: &App, area: Rect, buf: &mut Buffer) {
    let magenta_bold = bold().fg(Color::Magenta);

    let ambient_line = if !app.ambient_enabled {
        Span::styled("ambient track off", dim())
    } else if app.ambient.awaiting_gesture() {
        Span::styled("press any key to resume the ambient track", dim())
    } else {
        match &app.resume_note {
            Some(note) => Span::styled(note.clone(), dim()),
            None => Span::styled("ambient track from the top", dim()),
        }
    };

    let mut lines = vec![
        Line::styled("t e c l a", magenta_bold),
        Line::styled(
            "type it perfectly, or face the roulette",
            Style::default().add_modifier(Modifier::ITALIC),
        ),
        Line::default(),
        Line::from(ambient_line),
        Line::from(vec![
            Span::styled("ambient  ", dim()),
            Span::raw(volume_bar(app.volumes.ambient())),
            Span::styled("  ↑/↓", dim()),
        ]),
        Line::from(vec![
            Span::styled("feedback ", dim()),
            Span::raw(volume_bar(app.volumes.feedback())),
            Span::styled("  ←/→", dim()),
        ]),
        Line::default(),
    ];

    if let Some((outcome, summary)) = &app.last_summary {
        let label = match outcome {
            MatchOutcome::Victory => "last match: victory",
            MatchOutcome::Eliminated => "last match: eliminated",
        };
        lines.push(Line::from(Span::styled(
            format!(
                "{} in {:.1}s, {} errors, {} draws, final odds 1/{}",
                label,
                summary.elapsed_ms as f64 / 1000.0,
                summary.total_errors,
                summary.total_draws,
                summary.final_odds
            ),
            dim(),
        )));
        lines.push(Line::default());
    }

    lines.push(Line::from(Span::styled(
        format!(
            "starting odds 1/{}, enter to play, esc to quit",
            app.starting_odds
        ),
        dim().add_modifier(Modifier::BOLD),
    )));

    let height = lines.len() as u16;
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .render(centered_block(area, height), buf);
}

fn render_match(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(challenge) = &app.challenge else {
        return;
    };

    // Error shake: flash a red frame around the whole screen
    let area = if app.now_ms < app.shake_until {
        let frame = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red));
        let inner = frame.inner(area);
        frame.render(area, buf);
        inner
    } else {
        area
    };

    match challenge.phase() {
        Phase::Countdown { remaining, .. } => render_countdown(remaining, area, buf),
        Phase::DrawPending { .. } => render_roulette_banner(None, app, area, buf),
        Phase::Presenting { .. } => {
            render_roulette_banner(app.cue.map(|active| active.cue), app, area, buf)
        }
        Phase::Victorious | Phase::Eliminated => render_summary(app, area, buf),
        Phase::Idle | Phase::Active | Phase::Frozen { .. } => {
            render_typing(app, challenge, area, buf)
        }
    }
}

fn render_countdown(remaining: u8, area: Rect, buf: &mut Buffer) {
    let lines = vec![
        Line::styled(remaining.to_string(), bold().fg(Color::Yellow)),
        Line::styled("get ready", dim()),
    ];
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(centered_block(area, 2), buf);
}

fn render_roulette_banner(cue: Option<Cue>, app: &App, area: Rect, buf: &mut Buffer) {
    let mut lines = vec![match cue {
        None => Line::styled("the roulette spins...", bold().fg(Color::Yellow)),
        Some(Cue::Survival) => Line::styled("S P A R E D", bold().fg(Color::Green)),
        Some(Cue::Elimination) => Line::styled("E L I M I N A T E D", bold().fg(Color::Red)),
    }];
    if let Some(notice) = &app.notice {
        lines.push(Line::styled(notice.clone(), dim()));
    }
    let height = lines.len() as u16;
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(centered_block(area, height), buf);
}

fn render_typing(app: &App, challenge: &Challenge, area: Rect, buf: &mut Buffer) {
    let green_bold = bold().fg(Color::Green);
    let red_bold = bold().fg(Color::Red);
    let underlined_dim_bold = dim().add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let dim_bold = dim().add_modifier(Modifier::BOLD);

    let reference = challenge.reference();
    let typed = normalize(&app.typed);

    let mut cursor_seen = false;
    let spans = typed
        .chars()
        .zip_longest(reference.chars())
        .map(|pair| match pair {
            EitherOrBoth::Both(typed_c, reference_c) if typed_c == reference_c => {
                Span::styled(reference_c.to_string(), green_bold)
            }
            EitherOrBoth::Both(typed_c, _) => Span::styled(
                match typed_c {
                    ' ' => "·".to_owned(),
                    c => c.to_string(),
                },
                red_bold,
            ),
            EitherOrBoth::Right(reference_c) => {
                let style = if cursor_seen {
                    dim_bold
                } else {
                    cursor_seen = true;
                    underlined_dim_bold
                };
                Span::styled(reference_c.to_string(), style)
            }
            EitherOrBoth::Left(typed_c) => Span::styled(typed_c.to_string(), red_bold),
        })
        .collect::<Vec<Span>>();

    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let prompt_occupied_lines =
        ((reference.width() as f64 / max_chars_per_line as f64).ceil()).max(1.0) as u16;

    let status = Line::from(vec![
        Span::styled(format!("{:3}%", challenge.progress_pct()), bold()),
        Span::styled(
            format!(
                "  errors {}/{} ({} total)",
                challenge.consecutive_errors(),
                crate::challenge::MAX_CONSECUTIVE_ERRORS,
                challenge.total_errors()
            ),
            dim(),
        ),
        Span::styled(format!("  odds 1/{}", challenge.odds()), dim()),
        Span::styled(
            format!(
                "  {:.1}s",
                challenge.elapsed_ms(app.now_ms) as f64 / 1000.0
            ),
            dim(),
        ),
    ]);

    let hint = match challenge.phase() {
        Phase::Frozen { .. } => Some(Line::styled("frozen...", bold().fg(Color::Yellow))),
        _ => app
            .notice
            .as_ref()
            .map(|notice| Line::styled(notice.clone(), dim())),
    };

    let mut lines = vec![status, Line::default(), Line::from(spans), Line::default()];
    if let Some(hint) = hint {
        lines.push(hint);
    }

    let height = prompt_occupied_lines + lines.len() as u16;
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false })
        .render(centered_block(area, height), buf);
}

fn render_summary(app: &App, area: Rect, buf: &mut Buffer) {
    let Some((outcome, summary)) = &app.last_summary else {
        return;
    };

    let headline = match outcome {
        MatchOutcome::Victory => Line::styled("V I C T O R Y", bold().fg(Color::Green)),
        MatchOutcome::Eliminated => Line::styled("E L I M I N A T E D", bold().fg(Color::Red)),
    };
    let time_label = match outcome {
        MatchOutcome::Victory => "time",
        MatchOutcome::Eliminated => "survived",
    };

    let lines = vec![
        headline,
        Line::default(),
        Line::from(Span::styled(
            format!("{} {:.1}s", time_label, summary.elapsed_ms as f64 / 1000.0),
            bold(),
        )),
        Line::from(Span::styled(
            format!(
                "{} errors, {} draws, final odds 1/{}",
                summary.total_errors, summary.total_draws, summary.final_odds
            ),
            dim(),
        )),
        Line::default(),
        Line::from(Span::styled("enter for the menu, esc to quit", dim())),
    ];

    let height = lines.len() as u16;
    Paragraph::new(lines)
        .alignment(Alignment::Center)
        .render(centered_block(area, height), buf);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_bar_is_ten_cells_wide() {
        assert!(volume_bar(0.0).starts_with("░░░░░░░░░░"));
        assert!(volume_bar(1.0).starts_with("▮▮▮▮▮▮▮▮▮▮"));
        assert!(volume_bar(0.5).starts_with("▮▮▮▮▮░░░░░"));
    }

    #[test]
    fn volume_bar_shows_percentage() {
        assert!(volume_bar(0.5).ends_with("50%"));
        assert!(volume_bar(0.9).ends_with("90%"));
    }

    #[test]
    fn centered_block_fits_inside_area() {
        let area = Rect::new(0, 0, 80, 24);
        let inner = centered_block(area, 6);
        assert_eq!(inner.height, 6);
        assert!(inner.y >= area.y);
        assert!(inner.bottom() <= area.bottom());
    }
}
