use log::debug;
use rand::Rng;
use std::collections::VecDeque;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Size {
    pub width: u16,
    pub height: u16,
}

impl Size {
    pub fn square(side: u16) -> Self {
        Size {
            width: side,
            height: side,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub fn opposite(&self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pos {
    pub x: u16,
    pub y: u16,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PosDelta {
    pub x: i32,
    pub y: i32,
}

impl From<Direction> for PosDelta {
    fn from(dir: Direction) -> Self {
        match dir {
            Direction::North => PosDelta { x: 0, y: -1 },
            Direction::South => PosDelta { x: 0, y: 1 },
            Direction::East => PosDelta { x: 1, y: 0 },
            Direction::West => PosDelta { x: -1, y: 0 },
        }
    }
}

impl Pos {
    /// Steps by `delta`, or `None` if the result falls outside the arena.
    pub fn checked_add(&self, delta: PosDelta, size: Size) -> Option<Pos> {
        let new_x = self.x as i32 + delta.x;
        let new_y = self.y as i32 + delta.y;
        if (0..size.width as i32).contains(&new_x) && (0..size.height as i32).contains(&new_y) {
            Some(Pos {
                x: new_x as u16,
                y: new_y as u16,
            })
        } else {
            None
        }
    }
}

/// Snake segments, head first. Never empty.
#[derive(Clone, Debug, PartialEq)]
pub struct Snek {
    body: VecDeque<Pos>,
}

impl Snek {
    pub fn new(head: Pos) -> Self {
        Snek {
            body: VecDeque::from([head]),
        }
    }

    pub fn head(&self) -> Pos {
        self.body[0]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    #[cfg(test)]
    pub fn segments(&self) -> impl Iterator<Item = &Pos> {
        self.body.iter()
    }

    pub fn would_collide_with_body(&self, pos: impl Into<Pos>) -> bool {
        self.body.contains(&pos.into())
    }

    /// Moves onto `new_head`. Without `grow` the tail is dropped so the length is kept.
    fn slither(&mut self, new_head: Pos, grow: bool) {
        self.body.push_front(new_head);
        if !grow {
            self.body.pop_back();
        }
    }
}

#[cfg(test)]
impl From<Vec<Pos>> for Snek {
    fn from(segments: Vec<Pos>) -> Self {
        Snek {
            body: segments.into(),
        }
    }
}

/// Picks a uniformly random free cell by rejection sampling.
///
/// Never returns if the snake covers the whole arena; the game always ends
/// through a collision well before that.
pub fn new_pickup(snek: &Snek, size: Size, rng: &mut impl Rng) -> Pos {
    loop {
        let pos = Pos {
            x: rng.gen_range(0..size.width),
            y: rng.gen_range(0..size.height),
        };

        if !snek.would_collide_with_body(pos) {
            return pos;
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collision {
    Wall,
    Body,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepResult {
    Ongoing,     // Moved without growing
    Nommed(u32), // Ate the pickup, carries the new score
    Collision(Collision),
    Stopped, // Already game over, nothing happened
}

/// What the board shows at a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellState {
    Snek,
    Pickup,
    Empty,
}

#[derive(Clone, Debug)]
pub struct SnekHaus {
    size: Size,
    snek: Snek,
    direction: Direction,
    pending_direction: Option<Direction>,
    pickup: Pos,
    score: u32,
    game_over: bool,
}

impl SnekHaus {
    /// A fresh game: one segment in the middle of the arena heading east.
    pub fn new(size: Size, rng: &mut impl Rng) -> Self {
        let snek = Snek::new(Pos {
            x: size.width / 2,
            y: size.height / 2,
        });
        let pickup = new_pickup(&snek, size, rng);
        debug!("Initial pickup at {:?}", pickup);

        SnekHaus {
            size,
            snek,
            direction: Direction::East,
            pending_direction: None,
            pickup,
            score: 0,
            game_over: false,
        }
    }

    pub fn reset(&mut self, rng: &mut impl Rng) {
        *self = SnekHaus::new(self.size, rng);
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn snek(&self) -> &Snek {
        &self.snek
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[cfg(test)]
    pub fn pending_direction(&self) -> Option<Direction> {
        self.pending_direction
    }

    pub fn pickup(&self) -> Pos {
        self.pickup
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Buffers a direction change for the next tick. Reversals are refused
    /// and only the first accepted change per tick is kept.
    pub fn steer(&mut self, new_direction: Direction) {
        if new_direction == self.direction.opposite() || self.pending_direction.is_some() {
            return;
        }
        self.pending_direction = Some(new_direction);
    }

    /// Advances the game by one tick.
    pub fn slither_on(&mut self, rng: &mut impl Rng) -> StepResult {
        if self.game_over {
            return StepResult::Stopped;
        }

        let direction = self
            .pending_direction
            .take()
            .filter(|pending| *pending != self.direction.opposite())
            .unwrap_or(self.direction);
        self.direction = direction;

        let Some(new_head) = self.snek.head().checked_add(direction.into(), self.size) else {
            self.game_over = true;
            return StepResult::Collision(Collision::Wall);
        };

        // The tail has not moved yet, so running into it counts.
        if self.snek.would_collide_with_body(new_head) {
            self.game_over = true;
            return StepResult::Collision(Collision::Body);
        }

        if new_head == self.pickup {
            self.snek.slither(new_head, true);
            self.pickup = new_pickup(&self.snek, self.size, rng);
            debug!("Pickup eaten, next one at {:?}", self.pickup);
            self.score = self.score.max(self.snek.len() as u32 - 1);
            return StepResult::Nommed(self.score);
        }

        self.snek.slither(new_head, false);
        StepResult::Ongoing
    }

    pub fn cell_state(&self, pos: Pos) -> CellState {
        if self.snek.would_collide_with_body(pos) {
            CellState::Snek
        } else if self.pickup == pos {
            CellState::Pickup
        } else {
            CellState::Empty
        }
    }
}
