//! Wire models exchanged with the game server.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle stage of a game as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameStatus {
    /// Waiting for a second player.
    Created,
    /// Both players are placing ships.
    MapConfig,
    /// Players are trading strikes.
    Active,
    /// A winner has been decided.
    Finished,
}

impl GameStatus {
    /// Upper-case label used by the server.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "CREATED",
            Self::MapConfig => "MAP_CONFIG",
            Self::Active => "ACTIVE",
            Self::Finished => "FINISHED",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ship cell recorded by the server for one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipCoord {
    /// Owner of the ship.
    pub player_id: String,
    /// Row letter, `A` to `J`.
    pub x: String,
    /// Column number, `1` to `10`.
    pub y: u32,
}

/// Strike resolved by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    /// Player who fired.
    pub player_id: String,
    /// Target row letter.
    pub x: String,
    /// Target column number.
    pub y: u32,
    /// Whether the strike hit a ship.
    pub result: bool,
}

/// Full game state returned by `/game/{id}` and the mutation endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    /// Server-assigned identifier.
    pub id: String,
    /// Current lifecycle stage.
    pub status: GameStatus,
    /// Creator of the game.
    #[serde(default)]
    pub player1_id: Option<String>,
    /// Player who joined, once any.
    #[serde(default)]
    pub player2_id: Option<String>,
    /// Player expected to strike next.
    #[serde(default)]
    pub player_to_move_id: Option<String>,
    /// Ship cells of both players.
    #[serde(default)]
    pub ships_coord: Vec<ShipCoord>,
    /// Every strike so far, oldest first.
    #[serde(default)]
    pub moves: Vec<Move>,
}

impl Game {
    /// Whether the given user is one of the two participants.
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.player1_id.as_deref() == Some(user_id) || self.player2_id.as_deref() == Some(user_id)
    }

    /// Whether it is the given user's turn to strike.
    pub fn is_turn_of(&self, user_id: &str) -> bool {
        self.player_to_move_id.as_deref() == Some(user_id)
    }
}

/// Response body of `GET /game`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameList {
    /// Every game visible to the caller.
    pub games: Vec<Game>,
}

/// Ship placement as entered by the player and submitted to `PATCH /game/{id}`.
///
/// Fields are kept as entered so that out-of-range values can be reported
/// before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipPlacement {
    /// Anchor row letter.
    pub x: String,
    /// Anchor column number.
    pub y: u32,
    /// Ship length.
    pub size: u32,
    /// `HORIZONTAL` or `VERTICAL`.
    pub direction: String,
}

impl ShipPlacement {
    /// Human readable summary, e.g. `Ship of size 2 at A1 facing HORIZONTAL`.
    pub fn describe(&self) -> String {
        format!(
            "Ship of size {} at {}{} facing {}",
            self.size, self.x, self.y, self.direction
        )
    }
}

/// Request body of `PATCH /game/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipConfiguration {
    /// Complete fleet, replacing any earlier submission.
    pub ships: Vec<ShipPlacement>,
}

/// Request body of `POST /game/strike/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrikeRequest {
    /// Target row letter.
    pub x: String,
    /// Target column number.
    pub y: u32,
}

/// Body of the two auth endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    /// Account email.
    pub email: String,
    /// Plain-text password, sent over the wire as entered.
    pub password: String,
}

/// Response body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token for authenticated requests.
    pub access_token: String,
}

/// Account identity nested in the profile response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Account identifier, matched against `playerId` fields.
    pub id: String,
    /// Account email.
    pub email: String,
}

/// Response body of `GET /user/details/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(missing_docs)]
pub struct UserDetails {
    pub user: User,
    pub games_played: u32,
    pub games_won: u32,
    pub games_lost: u32,
    pub currently_games_playing: u32,
}

impl UserDetails {
    /// Label/value pairs shown on the profile view.
    pub fn summary(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Email", self.user.email.clone()),
            ("ID", self.user.id.clone()),
            ("Games Played", self.games_played.to_string()),
            ("Games Won", self.games_won.to_string()),
            ("Games Lost", self.games_lost.to_string()),
            ("Live Games", self.currently_games_playing.to_string()),
        ]
    }
}
