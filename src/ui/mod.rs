mod quiz;
mod result;
mod unavailable;
mod welcome;

use ratatui::{prelude::*, widgets::Block};

use crate::app::App;
use crate::engine::{Phase, Report, Scheduler};

pub fn render<S: Scheduler, R: Report>(frame: &mut Frame, app: &App<S, R>) {
    let area = frame.area();
    frame.render_widget(Block::default().bg(Color::Reset), area);

    if let Some(quiz) = app.pending_quiz() {
        welcome::render(frame, area, quiz, app.session().settings().question_secs);
        return;
    }

    match app.phase() {
        Phase::Loading => welcome::render_loading(frame, area),
        Phase::AwaitingAnswer | Phase::Locked => quiz::render(frame, area, app),
        Phase::Finished => result::render(frame, area, app),
        Phase::Empty => unavailable::render(frame, area),
    }
}
