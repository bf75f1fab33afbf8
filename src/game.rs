use crate::haus::{CellState, Direction, Pos, Size, SnekHaus, StepResult};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::{
    layout::Flex,
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};
use std::time::Duration;

pub const BOARD_SIZE: u16 = 20;
pub const TICK_RATE: Duration = Duration::from_millis(200);

const SNEK_SYMBOL: &str = " ";
const PICKUP_SYMBOL: &str = "●";

#[derive(Debug)]
pub enum GameState {
    Playing,
    GameOver { final_score: u32 },
    Exit,
}

pub struct Game {
    pub state: GameState,
    haus: SnekHaus,
    rng: StdRng,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    #[cfg(test)]
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(mut rng: StdRng) -> Self {
        let haus = SnekHaus::new(Size::square(BOARD_SIZE), &mut rng);
        info!("New game, pickup at {:?}", haus.pickup());
        Game {
            state: GameState::Playing,
            haus,
            rng,
        }
    }

    #[cfg(test)]
    pub fn haus(&self) -> &SnekHaus {
        &self.haus
    }

    pub fn restart(&mut self) {
        self.haus.reset(&mut self.rng);
        self.state = GameState::Playing;
        info!("Restarted, pickup at {:?}", self.haus.pickup());
    }

    pub fn handle_input(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                info!("Exit requested");
                self.state = GameState::Exit;
                return;
            }
            _ => {}
        }

        match self.state {
            GameState::Playing => {
                let direction = match key.code {
                    KeyCode::Up => Direction::North,
                    KeyCode::Down => Direction::South,
                    KeyCode::Left => Direction::West,
                    KeyCode::Right => Direction::East,
                    _ => return,
                };
                self.haus.steer(direction);
            }
            GameState::GameOver { .. } => {
                if matches!(key.code, KeyCode::Char(' ') | KeyCode::Char('r')) {
                    self.restart();
                }
            }
            GameState::Exit => {}
        }
    }

    pub fn update(&mut self) {
        if !matches!(self.state, GameState::Playing) {
            return;
        }

        match self.haus.slither_on(&mut self.rng) {
            StepResult::Collision(collision) => {
                let final_score = self.haus.score();
                info!(
                    "Game over ({:?}): score {}, length {}",
                    collision,
                    final_score,
                    self.haus.snek().len()
                );
                self.state = GameState::GameOver { final_score };
            }
            StepResult::Nommed(score) => {
                info!("Score {}, next pickup at {:?}", score, self.haus.pickup());
            }
            StepResult::Ongoing | StepResult::Stopped => {}
        }
    }

    pub fn render(&self, frame: &mut Frame) {
        let layout = Layout::vertical([
            Constraint::Length(3), // Title + score
            Constraint::Min(0),    // Board
        ])
        .split(frame.area());

        frame.render_widget(
            Paragraph::new(format!("SNEKGRID    Score: {}", self.haus.score()))
                .alignment(Alignment::Left)
                .block(Block::default().borders(Borders::ALL)),
            layout[0],
        );

        let size = self.haus.size();
        let [column] = Layout::horizontal([Constraint::Length(size.width * 2 + 2)])
            .flex(Flex::Center)
            .areas(layout[1]);
        let [board_area] = Layout::vertical([Constraint::Length(size.height + 2)])
            .flex(Flex::Start)
            .areas(column);

        let block = match self.state {
            GameState::GameOver { .. } => Block::default().title("Game over").borders(Borders::ALL),
            _ => Block::default().title("Playing").borders(Borders::ALL),
        };
        let inner_area = block.inner(board_area);
        frame.render_widget(block, board_area);
        frame.render_widget(&self.haus, inner_area);

        if let GameState::GameOver { final_score } = self.state {
            frame.render_widget(
                Paragraph::new(format!(
                    "GAME OVER\nYour Score: {}\nPress SPACE or R to play again",
                    final_score
                ))
                .alignment(Alignment::Center),
                inner_area,
            );
        }
    }
}

impl Widget for &SnekHaus {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let size = self.size();
        for y in 0..size.height.min(area.height) {
            for x in 0..size.width.min(area.width / 2) {
                let (symbol, style) = match self.cell_state(Pos { x, y }) {
                    CellState::Snek => (SNEK_SYMBOL, Style::default().bg(Color::Green)),
                    CellState::Pickup => (PICKUP_SYMBOL, Style::default().fg(Color::LightRed)),
                    CellState::Empty => continue,
                };
                let col = area.x + x * 2;
                let row = area.y + y;
                buf[(col, row)].set_symbol(symbol).set_style(style);
                buf[(col + 1, row)].set_symbol(" ").set_style(style);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use ratatui::backend::TestBackend;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn run_into_wall(game: &mut Game) {
        // Heading east from the middle hits the wall within a board width
        for _ in 0..=BOARD_SIZE {
            game.update();
        }
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_starts_playing() {
        let game = Game::with_seed(1);
        assert!(matches!(game.state, GameState::Playing));
        assert_eq!(game.haus().score(), 0);
        assert_eq!(game.haus().snek().head(), Pos { x: 10, y: 10 });
    }

    #[test]
    fn test_default_game_is_playing() {
        let game = Game::default();
        assert!(matches!(game.state, GameState::Playing));
        assert_eq!(game.haus().snek().len(), 1);
        assert!(!game.haus().is_game_over());
    }

    #[test]
    fn test_r_restarts_after_game_over() {
        let mut game = Game::with_seed(11);
        run_into_wall(&mut game);
        assert!(matches!(game.state, GameState::GameOver { .. }));

        game.handle_input(press(KeyCode::Char('r')));
        assert!(matches!(game.state, GameState::Playing));
        assert_eq!(game.haus().score(), 0);
    }

    #[test]
    fn test_arrow_keys_steer() {
        let mut game = Game::with_seed(2);

        game.handle_input(press(KeyCode::Up));
        assert_eq!(game.haus().pending_direction(), Some(Direction::North));

        game.update();
        assert_eq!(game.haus().direction(), Direction::North);

        game.handle_input(press(KeyCode::Left));
        assert_eq!(game.haus().pending_direction(), Some(Direction::West));
    }

    #[test]
    fn test_other_keys_ignored() {
        let mut game = Game::with_seed(3);

        game.handle_input(press(KeyCode::Char('w')));
        game.handle_input(press(KeyCode::Enter));
        game.handle_input(press(KeyCode::Char(' ')));
        assert_eq!(game.haus().pending_direction(), None);
        assert!(matches!(game.state, GameState::Playing));
    }

    #[test]
    fn test_key_release_ignored() {
        let mut game = Game::with_seed(4);
        let mut key = press(KeyCode::Up);
        key.kind = KeyEventKind::Release;

        game.handle_input(key);
        assert_eq!(game.haus().pending_direction(), None);
    }

    #[test]
    fn test_quit_keys() {
        let mut game = Game::with_seed(5);
        game.handle_input(press(KeyCode::Char('q')));
        assert!(matches!(game.state, GameState::Exit));

        let mut game = Game::with_seed(5);
        game.handle_input(press(KeyCode::Esc));
        assert!(matches!(game.state, GameState::Exit));
    }

    #[test]
    fn test_collision_ends_game_and_stops_ticks() {
        let mut game = Game::with_seed(6);
        run_into_wall(&mut game);

        let GameState::GameOver { final_score } = game.state else {
            panic!("expected game over, got {:?}", game.state);
        };
        assert_eq!(final_score, game.haus().score());
        assert!(game.haus().is_game_over());

        let head = game.haus().snek().head();
        game.update();
        assert_eq!(game.haus().snek().head(), head);
    }

    #[test]
    fn test_restart_after_game_over() {
        let mut game = Game::with_seed(7);
        run_into_wall(&mut game);
        assert!(matches!(game.state, GameState::GameOver { .. }));

        // Arrows do nothing on the game over screen
        game.handle_input(press(KeyCode::Up));
        assert!(matches!(game.state, GameState::GameOver { .. }));

        game.handle_input(press(KeyCode::Char(' ')));
        assert!(matches!(game.state, GameState::Playing));
        assert_eq!(game.haus().score(), 0);
        assert_eq!(game.haus().snek().len(), 1);
        assert_eq!(game.haus().snek().head(), Pos { x: 10, y: 10 });
        assert_eq!(game.haus().direction(), Direction::East);
        assert!(!game.haus().is_game_over());
    }

    #[test]
    fn test_widget_draws_cell_states() {
        let game = Game::with_seed(8);
        let haus = game.haus();
        let area = Rect::new(0, 0, BOARD_SIZE * 2, BOARD_SIZE);
        let mut buf = Buffer::empty(area);

        haus.render(area, &mut buf);

        let head = haus.snek().head();
        assert_eq!(buf[(head.x * 2, head.y)].bg, Color::Green);
        assert_eq!(buf[(head.x * 2 + 1, head.y)].bg, Color::Green);

        let pickup = haus.pickup();
        assert_eq!(buf[(pickup.x * 2, pickup.y)].symbol(), PICKUP_SYMBOL);
        assert_eq!(buf[(pickup.x * 2, pickup.y)].fg, Color::LightRed);

        let empty = (0..BOARD_SIZE)
            .map(|x| Pos { x, y: 0 })
            .find(|p| haus.cell_state(*p) == CellState::Empty)
            .expect("an empty cell on the top row");
        assert_eq!(buf[(empty.x * 2, empty.y)].bg, Color::Reset);
        assert_eq!(buf[(empty.x * 2, empty.y)].symbol(), " ");
    }

    #[test]
    fn test_widget_clips_to_small_area() {
        let game = Game::with_seed(9);
        let area = Rect::new(0, 0, 6, 3);
        let mut buf = Buffer::empty(area);

        // Must not index outside the buffer
        game.haus().render(area, &mut buf);
    }

    #[test]
    fn test_render_shows_score_and_game_over() {
        let mut terminal = Terminal::new(TestBackend::new(60, 30)).unwrap();
        let mut game = Game::with_seed(10);

        terminal.draw(|f| game.render(f)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("Score: 0"));
        assert!(!text.contains("GAME OVER"));

        run_into_wall(&mut game);
        terminal.draw(|f| game.render(f)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("GAME OVER"));
        assert!(text.contains("Your Score:"));
        assert!(text.contains("Press SPACE or R to play again"));
    }
}
