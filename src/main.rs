use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use game::{Game, GameState, TICK_RATE};
use log::{error, info};
use ratatui::prelude::*;
use simplelog::{Config, LevelFilter, WriteLogger};
use std::fs::File;
use std::io::{self, Stdout};
use std::time::Instant;

mod game;
mod haus;

const LOG_FILE: &str = "snekgrid.log";

fn main() -> Result<(), io::Error> {
    // Set up logging before anything else
    WriteLogger::init(LevelFilter::Info, Config::default(), File::create(LOG_FILE)?)
        .map_err(io::Error::other)?;

    info!("Starting snekgrid");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal);

    // Cleanup terminal, even when the loop failed
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    match &result {
        Ok(()) => info!("Exiting snekgrid"),
        Err(e) => error!("Game loop failed: {}", e),
    }
    result
}

fn run(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> io::Result<()> {
    let mut game = Game::new();
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| game.render(f))?;

        // Wait for input only until the next tick is due
        let timeout = TICK_RATE.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                game.handle_input(key);
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            game.update();
            last_tick = Instant::now();
        }

        if let GameState::Exit = game.state {
            return Ok(());
        }
    }
}
