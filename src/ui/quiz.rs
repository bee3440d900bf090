use ratatui::{
    prelude::*,
    widgets::{Gauge, Paragraph, Wrap},
};

use crate::app::App;
use crate::engine::{Phase, Report, Scheduler};
use crate::models::{AnswerOption, AnswerRecord};

const OPTION_LABELS: &[u8] = b"ABCDEFGHIJ";

pub fn render<S: Scheduler, R: Report>(frame: &mut Frame, area: Rect, app: &App<S, R>) {
    let Some(question) = app.current_question() else {
        return;
    };

    let chunks = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(4),
        Constraint::Fill(1),
        Constraint::Length(1),
    ])
    .margin(2)
    .split(area);

    render_progress(frame, chunks[0], app);
    render_countdown(frame, chunks[1], app);
    render_question_text(frame, chunks[2], &question.prompt);

    let locked = if app.phase() == Phase::Locked {
        app.current_answer()
    } else {
        None
    };
    render_options(frame, chunks[3], &question.options, app.selected_option(), locked);
    render_controls(frame, chunks[4], locked);
}

fn render_progress<S: Scheduler, R: Report>(frame: &mut Frame, area: Rect, app: &App<S, R>) {
    let progress = format!(
        "{}/{}  ·  score {}",
        app.current_question_number(),
        app.total_questions(),
        app.session().score()
    );
    let widget = Paragraph::new(progress)
        .alignment(Alignment::Right)
        .fg(Color::DarkGray);
    frame.render_widget(widget, area);
}

fn render_countdown<S: Scheduler, R: Report>(frame: &mut Frame, area: Rect, app: &App<S, R>) {
    let total = app.session().settings().question_secs.max(1);
    let remaining = app.session().remaining_secs().min(total);
    let widget = Gauge::default()
        .gauge_style(Style::default().fg(countdown_color(remaining, total)))
        .ratio(f64::from(remaining) / f64::from(total))
        .label(format!("{}s", remaining));
    frame.render_widget(widget, area);
}

fn countdown_color(remaining: u32, total: u32) -> Color {
    match u64::from(remaining) * 100 / u64::from(total.max(1)) {
        0..=20 => Color::Red,
        21..=50 => Color::Yellow,
        _ => Color::Green,
    }
}

fn render_question_text(frame: &mut Frame, area: Rect, text: &str) {
    let widget = Paragraph::new(text)
        .wrap(Wrap { trim: true })
        .fg(Color::White)
        .bold();
    frame.render_widget(widget, area);
}

fn option_label(index: usize) -> char {
    OPTION_LABELS.get(index).map_or('?', |b| char::from(*b))
}

fn render_options(
    frame: &mut Frame,
    area: Rect,
    options: &[AnswerOption],
    selected: usize,
    locked: Option<&AnswerRecord>,
) {
    let mut lines: Vec<Line> = Vec::with_capacity(options.len() * 2);

    for (index, option) in options.iter().enumerate() {
        let is_selected = index == selected;
        let style = match locked {
            // Reveal: correct option green, a wrong pick red, the rest dimmed.
            Some(_) if option.is_correct => Style::default().fg(Color::Green).bold(),
            Some(answer) if answer.selected_option.as_deref() == Some(option.id.as_str()) => {
                Style::default().fg(Color::Red).bold()
            }
            Some(_) => Style::default().fg(Color::DarkGray),
            None if is_selected => Style::default().fg(Color::Cyan).bold(),
            None => Style::default().fg(Color::Gray),
        };
        let marker = if is_selected { ">" } else { " " };

        lines.push(Line::from(vec![
            Span::styled(format!(" {} ", marker), style),
            Span::styled(format!("{}. ", option_label(index)), style),
            Span::styled(option.text.as_str(), style),
        ]));
        lines.push(Line::from(""));
    }

    frame.render_widget(Paragraph::new(lines), area);
}

fn render_controls(frame: &mut Frame, area: Rect, locked: Option<&AnswerRecord>) {
    let widget = match locked {
        Some(answer) if answer.correct => Paragraph::new("Correct!").fg(Color::Green),
        Some(answer) if answer.timed_out() => Paragraph::new("Time's up").fg(Color::Red),
        Some(_) => Paragraph::new("Wrong answer").fg(Color::Red),
        None => Paragraph::new("j/k navigate  ·  enter select  ·  1-9 pick  ·  q quit").fg(Color::DarkGray),
    };
    frame.render_widget(widget.alignment(Alignment::Center), area);
}
