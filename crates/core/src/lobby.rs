//! Game list filters for the lobby and the "my games" view.

use std::fmt;

use crate::models::{Game, GameStatus};

/// Which subset of the server's game list to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GameFilter {
    /// Public games still waiting for a second player.
    #[default]
    Open,
    /// The viewer's games that have not finished.
    Ongoing,
    /// The viewer's finished games.
    History,
}

impl GameFilter {
    /// Whether `game` belongs in this view for `viewer_id`.
    pub fn matches(&self, game: &Game, viewer_id: &str) -> bool {
        match self {
            Self::Open => game.status == GameStatus::Created,
            Self::Ongoing => {
                matches!(
                    game.status,
                    GameStatus::Active | GameStatus::MapConfig | GameStatus::Created
                ) && game.has_participant(viewer_id)
            }
            Self::History => {
                game.status == GameStatus::Finished && game.has_participant(viewer_id)
            }
        }
    }

    /// Filter the list, keeping server order.
    pub fn apply(&self, games: Vec<Game>, viewer_id: &str) -> Vec<Game> {
        games
            .into_iter()
            .filter(|game| self.matches(game, viewer_id))
            .collect()
    }

    /// Flip between the two "my games" tabs.
    pub fn toggled(&self) -> Self {
        match self {
            Self::Ongoing => Self::History,
            Self::History => Self::Ongoing,
            Self::Open => Self::Open,
        }
    }
}

impl fmt::Display for GameFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Open => "Public Games",
            Self::Ongoing => "Ongoing Games",
            Self::History => "History",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(id: &str, status: GameStatus, players: (&str, Option<&str>)) -> Game {
        Game {
            id: id.to_string(),
            status,
            player1_id: Some(players.0.to_string()),
            player2_id: players.1.map(str::to_string),
            player_to_move_id: None,
            ships_coord: Vec::new(),
            moves: Vec::new(),
        }
    }

    fn sample() -> Vec<Game> {
        vec![
            game("open-mine", GameStatus::Created, ("me", None)),
            game("open-theirs", GameStatus::Created, ("them", None)),
            game("config", GameStatus::MapConfig, ("them", Some("me"))),
            game("active-other", GameStatus::Active, ("x", Some("y"))),
            game("won", GameStatus::Finished, ("me", Some("them"))),
            game("foreign-finished", GameStatus::Finished, ("x", Some("y"))),
        ]
    }

    fn ids(games: &[Game]) -> Vec<&str> {
        games.iter().map(|game| game.id.as_str()).collect()
    }

    #[test]
    fn lobby_lists_every_created_game() {
        let games = GameFilter::Open.apply(sample(), "me");
        assert_eq!(ids(&games), vec!["open-mine", "open-theirs"]);
    }

    #[test]
    fn ongoing_lists_viewers_unfinished_games() {
        let games = GameFilter::Ongoing.apply(sample(), "me");
        assert_eq!(ids(&games), vec!["open-mine", "config"]);
    }

    #[test]
    fn history_lists_viewers_finished_games() {
        let games = GameFilter::History.apply(sample(), "me");
        assert_eq!(ids(&games), vec!["won"]);
    }

    #[test]
    fn toggles_between_tabs() {
        assert_eq!(GameFilter::Ongoing.toggled(), GameFilter::History);
        assert_eq!(GameFilter::History.toggled(), GameFilter::Ongoing);
        assert_eq!(GameFilter::Open.toggled(), GameFilter::Open);
    }
}
