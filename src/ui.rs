pub mod progress;

use lockwrite::{
    controller::Progress,
    editor::{wrap_lines, Editor},
    goal::GoalType,
    session::{SaveStatus, SessionPhase, SessionSummary, EMERGENCY_PHRASE},
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Widget, Wrap},
};

use self::progress::{format_clock, format_percent, format_remaining, save_status_label};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;
const SETUP_WIDTH: u16 = 64;
const DIALOG_WIDTH: u16 = 56;

/// Snapshot of the setup form
#[derive(Debug)]
pub struct SetupView<'a> {
    pub goal_type: GoalType,
    pub goal_input: &'a str,
    pub strict_mode: bool,
    pub error: Option<&'a str>,
    pub notice: Option<&'a str>,
    pub draft_words: usize,
    pub draft_age: Option<String>,
}

/// Snapshot of a running session
#[derive(Debug)]
pub struct WritingView<'a> {
    pub editor: &'a Editor,
    pub phase: SessionPhase,
    pub strict_mode: bool,
    pub locked: bool,
    pub progress: Option<Progress>,
    pub words_written: usize,
    pub elapsed_seconds: u64,
    pub save_status: &'a SaveStatus,
    pub goal_summary: Option<SessionSummary>,
    /// Some while the emergency prompt is open
    pub emergency_input: Option<&'a str>,
    pub notice: Option<&'a str>,
}

#[derive(Debug)]
pub enum View<'a> {
    Setup(SetupView<'a>),
    Writing(WritingView<'a>),
}

impl Widget for &View<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self {
            View::Setup(view) => view.render(area, buf),
            View::Writing(view) => view.render(area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim() -> Style {
    Style::default().add_modifier(Modifier::DIM)
}

/// Rect of at most `width` x `height`, centered in `area`
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

impl Widget for &SetupView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let selected = Style::default().patch(bold()).fg(Color::Cyan);

        let goal_type_line = Line::from(vec![
            Span::raw("  goal      "),
            Span::styled(
                "words",
                if self.goal_type == GoalType::Words { selected } else { dim() },
            ),
            Span::raw(" / "),
            Span::styled(
                "time",
                if self.goal_type == GoalType::Time { selected } else { dim() },
            ),
            Span::styled("   tab", dim()),
        ]);

        let presets = self
            .goal_type
            .presets()
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        let target_line = Line::from(vec![
            Span::raw("  target    "),
            Span::styled(format!("{}_", self.goal_input), bold()),
            Span::raw(format!(" {}", self.goal_type.unit())),
            Span::styled(format!("   F1-F4: {presets}"), dim()),
        ]);

        let strict_line = Line::from(vec![
            Span::raw("  strict    "),
            if self.strict_mode {
                Span::styled("on", Style::default().patch(bold()).fg(Color::Red))
            } else {
                Span::styled("off", bold())
            },
            Span::styled("   s", dim()),
        ]);

        let draft_line = if self.draft_words == 0 {
            Line::styled("  draft     empty", dim())
        } else {
            let age = self
                .draft_age
                .as_deref()
                .map(|a| format!(", {a}"))
                .unwrap_or_default();
            Line::styled(format!("  draft     {} words{age}", self.draft_words), dim())
        };

        let mut lines = vec![goal_type_line, target_line, strict_line, draft_line, Line::raw("")];
        if let Some(err) = self.error {
            lines.push(Line::styled(format!("  {err}"), Style::default().fg(Color::Red)));
        }
        if let Some(notice) = self.notice {
            lines.push(Line::styled(format!("  {notice}"), Style::default().fg(Color::Yellow)));
        }
        lines.push(Line::styled("  enter start · esc quit", dim()));

        let rect = centered(area, SETUP_WIDTH, lines.len() as u16 + 2);
        Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title(" lockwrite "))
            .wrap(Wrap { trim: false })
            .render(rect, buf);
    }
}

impl WritingView<'_> {
    fn status_line(&self) -> Line<'static> {
        let lock = if self.locked {
            Span::styled("locked", Style::default().patch(bold()).fg(Color::Red))
        } else {
            Span::styled("free", Style::default().patch(bold()).fg(Color::Green))
        };
        let save = save_status_label(self.save_status);
        let save_style = match self.save_status {
            SaveStatus::Failed(_) => Style::default().fg(Color::Red),
            _ => dim(),
        };
        Line::from(vec![
            lock,
            Span::styled(format!("  ·  {} words", self.words_written), dim()),
            Span::styled(format!("  ·  {}", format_clock(self.elapsed_seconds)), dim()),
            Span::styled(if save.is_empty() { String::new() } else { format!("  ·  {save}") }, save_style),
        ])
    }

    fn hint_line(&self) -> Line<'static> {
        if let Some(notice) = self.notice {
            return Line::styled(notice.to_string(), Style::default().fg(Color::Yellow));
        }
        let hint = match self.phase {
            SessionPhase::GoalReached if self.strict_mode => {
                "ctrl+k keep writing · ctrl+s save & exit · ctrl+e emergency exit"
            }
            SessionPhase::GoalReached => "ctrl+k keep writing · ctrl+s save & exit",
            _ if self.strict_mode => "locked until the goal is reached · ctrl+e emergency exit",
            _ => "ctrl+s save & exit · esc quit",
        };
        Line::styled(hint, dim())
    }

    fn render_editor(&self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let lines = wrap_lines(self.editor.text(), area.width);
        let (row, col) = self.editor.cursor_position(area.width);
        let scroll = row.saturating_sub(area.height - 1);

        Paragraph::new(lines.into_iter().map(Line::from).collect::<Vec<_>>())
            .scroll((scroll, 0))
            .render(area, buf);

        if let Some(cell) = buf.cell_mut((area.x + col, area.y + row - scroll)) {
            cell.set_style(Style::default().add_modifier(Modifier::REVERSED));
        }
    }

    fn render_goal_banner(&self, summary: &SessionSummary, area: Rect, buf: &mut Buffer) {
        let target = format!("{} {}", summary.goal_value, summary.goal_type.unit());
        let lines = vec![
            Line::styled("Goal reached!", Style::default().patch(bold()).fg(Color::Green)),
            Line::raw(""),
            Line::raw(format!(
                "{} words in {} (target {target})",
                summary.words_written,
                format_clock(summary.elapsed_seconds)
            )),
            Line::raw(""),
            Line::styled("ctrl+k keep writing · ctrl+s save & exit", dim()),
        ];
        let rect = centered(area, DIALOG_WIDTH, lines.len() as u16 + 2);
        Clear.render(rect, buf);
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Green)))
            .render(rect, buf);
    }

    fn render_emergency_prompt(&self, input: &str, area: Rect, buf: &mut Buffer) {
        let lines = vec![
            Line::styled("Emergency exit", Style::default().patch(bold()).fg(Color::Red)),
            Line::raw(""),
            Line::raw(format!("Type \"{EMERGENCY_PHRASE}\" and press enter.")),
            Line::raw("Your draft is saved; the session is not recorded."),
            Line::raw(""),
            Line::from(vec![Span::raw("> "), Span::styled(format!("{input}_"), bold())]),
            Line::raw(""),
            Line::styled("esc keep writing", dim()),
        ];
        let rect = centered(area, DIALOG_WIDTH, lines.len() as u16 + 2);
        Clear.render(rect, buf);
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Red)))
            .render(rect, buf);
    }
}

impl Widget for &WritingView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1), // status
                Constraint::Length(1), // progress
                Constraint::Length(1), // padding
                Constraint::Min(1),    // editor
                Constraint::Length(1), // hints
            ])
            .split(area);

        Paragraph::new(self.status_line()).render(chunks[0], buf);

        if let Some(progress) = self.progress {
            Gauge::default()
                .gauge_style(Style::default().fg(Color::Cyan))
                .ratio(progress.fraction.clamp(0.0, 1.0))
                .label(format!(
                    "{} · {}",
                    format_percent(progress.fraction),
                    format_remaining(progress.remaining)
                ))
                .render(chunks[1], buf);
        }

        self.render_editor(chunks[3], buf);
        Paragraph::new(self.hint_line()).render(chunks[4], buf);

        if let Some(input) = self.emergency_input {
            self.render_emergency_prompt(input, area, buf);
        } else if let (SessionPhase::GoalReached, Some(summary)) = (self.phase, self.goal_summary.as_ref()) {
            self.render_goal_banner(summary, area, buf);
        }
    }
}
