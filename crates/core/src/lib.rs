#![warn(clippy::all, missing_docs)]

//! Core logic for the salvo Battleship client.
//!
//! This crate hosts the configuration layer, the typed HTTP contracts and
//! client for the game server, session persistence, battle-grid
//! classification, ship staging, and the game refresh poller used by the
//! terminal UI.

pub mod api;
pub mod board;
pub mod config;
pub mod game;
pub mod lobby;
pub mod models;
pub mod placement;
pub mod poll;
pub mod session;

pub use api::{resolve_join, ApiClient, ApiError};
pub use board::{Boards, BoardSide, CellState, Grid};
pub use config::AppConfig;
pub use game::{CellCursor, GameView, StrikeRefusal, TurnLine};
pub use lobby::GameFilter;
pub use models::{Game, GameStatus, ShipPlacement, UserDetails};
pub use placement::{ConfigureRequest, Orientation, PlacementError, ShipStaging};
pub use poll::{GamePoller, PollHandle, PollUpdate};
pub use session::{Session, SessionStore};
