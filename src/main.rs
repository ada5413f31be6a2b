use anyhow::Result;

use charla::app::App;
use charla::handler;
use charla::tui::{self, EventHandler, Tui};
use charla::ui;

#[tokio::main]
async fn main() -> Result<()> {
    tui::install_panic_hook();

    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new();

    let result = run(&mut terminal, &mut events, &mut app).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut Tui, events: &mut EventHandler, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        // Apply a finished completion before the next event; the tick keeps
        // this loop turning while a request is in flight.
        app.poll_completion().await;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }
    Ok(())
}
