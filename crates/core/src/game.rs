//! Presentation rules for a single game seen by one player.

use std::fmt;

use thiserror::Error;

use crate::{
    board::{cell_label, Boards, COLUMNS, GRID_SIZE, ROWS},
    models::{Game, GameStatus, StrikeRequest},
};

/// Header line describing whose turn it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnLine {
    /// Nobody has joined yet.
    Waiting,
    /// The game is over.
    Winner {
        /// Whether the viewer won.
        viewer_won: bool,
    },
    /// The game is in progress.
    ToMove {
        /// Whether the viewer strikes next.
        viewer: bool,
    },
}

impl fmt::Display for TurnLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => f.write_str("Waiting for a 2nd player..."),
            Self::Winner { viewer_won: true } => f.write_str("Winner: You"),
            Self::Winner { viewer_won: false } => f.write_str("Winner: Opponent"),
            Self::ToMove { viewer: true } => f.write_str("Player to Move: You"),
            Self::ToMove { viewer: false } => f.write_str("Player to Move: Opponent"),
        }
    }
}

/// Why a strike was refused before reaching the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StrikeRefusal {
    /// Strikes are only possible while the game is active.
    #[error("the game is not active")]
    NotActive,
    /// The opponent is expected to move.
    #[error("wait for your turn to make a move")]
    NotYourTurn,
}

/// A game paired with the player looking at it.
#[derive(Debug, Clone, Copy)]
pub struct GameView<'a> {
    game: &'a Game,
    viewer_id: &'a str,
}

impl<'a> GameView<'a> {
    /// View of `game` for the player `viewer_id`.
    pub fn new(game: &'a Game, viewer_id: &'a str) -> Self {
        Self { game, viewer_id }
    }

    /// Underlying game.
    pub fn game(&self) -> &'a Game {
        self.game
    }

    /// Turn header for the current status.
    ///
    /// In a finished game the player left "to move" is the one who lost.
    pub fn turn_line(&self) -> TurnLine {
        let viewer_to_move = self.game.is_turn_of(self.viewer_id);
        match self.game.status {
            GameStatus::Created => TurnLine::Waiting,
            GameStatus::Finished => TurnLine::Winner {
                viewer_won: !viewer_to_move,
            },
            GameStatus::MapConfig | GameStatus::Active => TurnLine::ToMove {
                viewer: viewer_to_move,
            },
        }
    }

    /// Ships can be placed only during map configuration.
    pub fn can_configure(&self) -> bool {
        self.game.status == GameStatus::MapConfig
    }

    /// Grids are shown once both players are in.
    pub fn shows_boards(&self) -> bool {
        matches!(
            self.game.status,
            GameStatus::MapConfig | GameStatus::Active | GameStatus::Finished
        )
    }

    /// Whether the strike picker is offered.
    pub fn accepts_strikes(&self) -> bool {
        self.game.status == GameStatus::Active
    }

    /// Local pre-check before sending a strike.
    pub fn check_strike(&self) -> Result<(), StrikeRefusal> {
        if !self.accepts_strikes() {
            return Err(StrikeRefusal::NotActive);
        }
        if !self.game.is_turn_of(self.viewer_id) {
            return Err(StrikeRefusal::NotYourTurn);
        }
        Ok(())
    }

    /// Classified grids for the viewer.
    pub fn boards(&self) -> Boards {
        Boards::classify(&self.game.ships_coord, &self.game.moves, self.viewer_id)
    }
}

/// Cell currently selected in a row/column picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CellCursor {
    row: usize,
    col: usize,
}

impl CellCursor {
    /// Zero-based row index.
    pub fn row(&self) -> usize {
        self.row
    }

    /// Zero-based column index.
    pub fn col(&self) -> usize {
        self.col
    }

    /// Move by the given deltas, clamped to the grid.
    pub fn shift(&mut self, rows: isize, cols: isize) {
        self.row = clamp_index(self.row, rows);
        self.col = clamp_index(self.col, cols);
    }

    /// Row letter under the cursor.
    pub fn row_label(&self) -> &'static str {
        ROWS[self.row]
    }

    /// Column number under the cursor.
    pub fn column(&self) -> u32 {
        COLUMNS[self.col]
    }

    /// Label such as `C7` for the selected cell.
    pub fn label(&self) -> String {
        cell_label(self.row, self.col)
    }

    /// Strike body for the selected cell.
    pub fn strike(&self) -> StrikeRequest {
        StrikeRequest {
            x: self.row_label().to_string(),
            y: self.column(),
        }
    }
}

fn clamp_index(current: usize, delta: isize) -> usize {
    let next = current as isize + delta;
    next.clamp(0, GRID_SIZE as isize - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        board::CellState,
        models::{Move, ShipCoord},
    };

    fn game(status: GameStatus, to_move: Option<&str>) -> Game {
        Game {
            id: "g1".to_string(),
            status,
            player1_id: Some("me".to_string()),
            player2_id: Some("them".to_string()),
            player_to_move_id: to_move.map(str::to_string),
            ships_coord: Vec::new(),
            moves: Vec::new(),
        }
    }

    #[test]
    fn turn_line_follows_status() {
        let created = game(GameStatus::Created, None);
        assert_eq!(
            GameView::new(&created, "me").turn_line().to_string(),
            "Waiting for a 2nd player..."
        );

        let active = game(GameStatus::Active, Some("me"));
        assert_eq!(
            GameView::new(&active, "me").turn_line().to_string(),
            "Player to Move: You"
        );
        assert_eq!(
            GameView::new(&active, "them").turn_line().to_string(),
            "Player to Move: Opponent"
        );

        let finished = game(GameStatus::Finished, Some("them"));
        assert_eq!(
            GameView::new(&finished, "me").turn_line(),
            TurnLine::Winner { viewer_won: true }
        );
        assert_eq!(
            GameView::new(&finished, "them").turn_line().to_string(),
            "Winner: Opponent"
        );
    }

    #[test]
    fn actions_depend_on_status() {
        let created = game(GameStatus::Created, None);
        let view = GameView::new(&created, "me");
        assert!(!view.can_configure());
        assert!(!view.shows_boards());
        assert!(!view.accepts_strikes());

        let config = game(GameStatus::MapConfig, None);
        let view = GameView::new(&config, "me");
        assert!(view.can_configure());
        assert!(view.shows_boards());
        assert!(!view.accepts_strikes());

        let finished = game(GameStatus::Finished, None);
        let view = GameView::new(&finished, "me");
        assert!(!view.can_configure());
        assert!(view.shows_boards());
    }

    #[test]
    fn strike_requires_active_game_and_turn() {
        let config = game(GameStatus::MapConfig, Some("me"));
        assert_eq!(
            GameView::new(&config, "me").check_strike(),
            Err(StrikeRefusal::NotActive)
        );

        let active = game(GameStatus::Active, Some("them"));
        assert_eq!(
            GameView::new(&active, "me").check_strike(),
            Err(StrikeRefusal::NotYourTurn)
        );
        assert_eq!(GameView::new(&active, "them").check_strike(), Ok(()));
    }

    #[test]
    fn boards_use_viewer_perspective() {
        let mut active = game(GameStatus::Active, Some("me"));
        active.ships_coord.push(ShipCoord {
            player_id: "me".to_string(),
            x: "A".to_string(),
            y: 1,
        });
        active.moves.push(Move {
            player_id: "me".to_string(),
            x: "B".to_string(),
            y: 2,
            result: false,
        });

        let mine = GameView::new(&active, "me").boards();
        assert_eq!(mine.own.cell(0, 0), Some(CellState::Ship));
        assert_eq!(mine.opponent.cell(1, 1), Some(CellState::Miss));

        let theirs = GameView::new(&active, "them").boards();
        assert_eq!(theirs.own.cell(0, 0), Some(CellState::Empty));
        assert_eq!(theirs.own.cell(1, 1), Some(CellState::Miss));
    }

    #[test]
    fn cursor_is_clamped_to_grid() {
        let mut cursor = CellCursor::default();
        cursor.shift(-1, -1);
        assert_eq!((cursor.row(), cursor.col()), (0, 0));
        cursor.shift(20, 3);
        assert_eq!(cursor.row_label(), "J");
        assert_eq!(cursor.column(), 4);
        assert_eq!(cursor.label(), "J4");
        assert_eq!(
            cursor.strike(),
            StrikeRequest {
                x: "J".to_string(),
                y: 4
            }
        );
    }
}
