//! Ship staging and local validation before the fleet is submitted.

use std::fmt;

use thiserror::Error;

use crate::{
    board::{COLUMNS, ROWS},
    models::{ShipConfiguration, ShipPlacement},
};

/// Ship lengths accepted by the server.
pub const SHIP_SIZES: [u32; 4] = [2, 3, 4, 6];

/// Direction a ship extends from its anchor cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Extends along the row.
    #[default]
    Horizontal,
    /// Extends down the column.
    Vertical,
}

impl Orientation {
    /// Every orientation in picker order.
    pub const ALL: [Orientation; 2] = [Orientation::Horizontal, Orientation::Vertical];

    /// Wire label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Horizontal => "HORIZONTAL",
            Self::Vertical => "VERTICAL",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A staged ship whose fields fall outside the allowed sets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum PlacementError {
    /// Anchor row is not a letter from `A` to `J`.
    #[error("ship {index}: row {value:?} is not between A and J")]
    Row { index: usize, value: String },
    /// Anchor column is not between 1 and 10.
    #[error("ship {index}: column {value} is not between 1 and 10")]
    Column { index: usize, value: u32 },
    /// Length is not an allowed ship size.
    #[error("ship {index}: size {value} is not one of 2, 3, 4 or 6")]
    Size { index: usize, value: u32 },
    /// Direction is not a known orientation.
    #[error("ship {index}: direction {value:?} is not HORIZONTAL or VERTICAL")]
    Direction { index: usize, value: String },
}

/// Check that every field of a placement belongs to its allowed set.
pub fn validate(index: usize, ship: &ShipPlacement) -> Result<(), PlacementError> {
    if !ROWS.contains(&ship.x.as_str()) {
        return Err(PlacementError::Row {
            index,
            value: ship.x.clone(),
        });
    }
    if !COLUMNS.contains(&ship.y) {
        return Err(PlacementError::Column {
            index,
            value: ship.y,
        });
    }
    if !SHIP_SIZES.contains(&ship.size) {
        return Err(PlacementError::Size {
            index,
            value: ship.size,
        });
    }
    if !Orientation::ALL
        .iter()
        .any(|orientation| orientation.as_str() == ship.direction)
    {
        return Err(PlacementError::Direction {
            index,
            value: ship.direction.clone(),
        });
    }
    Ok(())
}

/// Validated request ready for `PATCH /game/{id}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureRequest {
    /// Game the fleet belongs to.
    pub game_id: String,
    /// Body sent as-is.
    pub body: ShipConfiguration,
}

/// Ordered list of candidate ships assembled before submission.
///
/// No overlap or bounds checks are made here; the server decides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShipStaging {
    ships: Vec<ShipPlacement>,
}

impl ShipStaging {
    /// Empty staging list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate anchored at `row`/`column`.
    pub fn add_ship(&mut self, row: &str, column: u32, size: u32, orientation: Orientation) {
        self.push(ShipPlacement {
            x: row.to_string(),
            y: column,
            size,
            direction: orientation.as_str().to_string(),
        });
    }

    /// Append a raw candidate.
    pub fn push(&mut self, ship: ShipPlacement) {
        self.ships.push(ship);
    }

    /// Remove the candidate at `index`; out-of-range indexes are ignored.
    pub fn remove_ship(&mut self, index: usize) {
        self.ships = self
            .ships
            .drain(..)
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(_, ship)| ship)
            .collect();
    }

    /// Validate every candidate and build the replacement configuration.
    ///
    /// The staged list is left untouched; call [`ShipStaging::accept`] once the
    /// server has taken it.
    pub fn submit(&self, game_id: &str) -> Result<ConfigureRequest, PlacementError> {
        for (index, ship) in self.ships.iter().enumerate() {
            validate(index, ship)?;
        }
        Ok(ConfigureRequest {
            game_id: game_id.to_string(),
            body: ShipConfiguration {
                ships: self.ships.clone(),
            },
        })
    }

    /// Clear the staged list after the server accepted it.
    pub fn accept(&mut self) {
        self.ships.clear();
    }

    /// Staged candidates in insertion order.
    pub fn ships(&self) -> &[ShipPlacement] {
        &self.ships
    }

    /// Number of staged ships.
    pub fn len(&self) -> usize {
        self.ships.len()
    }

    /// Whether nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.ships.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(x: &str, y: u32, size: u32, direction: &str) -> ShipPlacement {
        ShipPlacement {
            x: x.to_string(),
            y,
            size,
            direction: direction.to_string(),
        }
    }

    #[test]
    fn submit_builds_exact_patch_body() -> anyhow::Result<()> {
        let mut staging = ShipStaging::new();
        staging.add_ship("A", 1, 2, Orientation::Horizontal);

        let request = staging.submit("g1")?;
        assert_eq!(request.game_id, "g1");
        assert_eq!(
            serde_json::to_value(&request.body)?,
            json!({"ships": [{"x": "A", "y": 1, "size": 2, "direction": "HORIZONTAL"}]})
        );
        assert_eq!(staging.len(), 1);
        Ok(())
    }

    #[test]
    fn submit_rejects_fields_outside_allowed_sets() {
        let cases = [
            (raw("K", 1, 2, "HORIZONTAL"), "row"),
            (raw("a", 1, 2, "HORIZONTAL"), "row"),
            (raw("A", 0, 2, "HORIZONTAL"), "column"),
            (raw("A", 11, 2, "HORIZONTAL"), "column"),
            (raw("A", 1, 5, "HORIZONTAL"), "size"),
            (raw("A", 1, 1, "VERTICAL"), "size"),
            (raw("A", 1, 2, "DIAGONAL"), "direction"),
        ];

        for (ship, field) in cases {
            let mut staging = ShipStaging::new();
            staging.add_ship("B", 2, 3, Orientation::Vertical);
            staging.push(ship.clone());

            let err = staging.submit("g1").expect_err("invalid ship accepted");
            let matches = match (&err, field) {
                (PlacementError::Row { index, .. }, "row") => *index == 1,
                (PlacementError::Column { index, .. }, "column") => *index == 1,
                (PlacementError::Size { index, .. }, "size") => *index == 1,
                (PlacementError::Direction { index, .. }, "direction") => *index == 1,
                _ => false,
            };
            assert!(matches, "{ship:?} produced {err:?}");
            assert_eq!(staging.len(), 2, "input preserved for correction");
        }
    }

    #[test]
    fn remove_then_add_preserves_order() {
        let mut staging = ShipStaging::new();
        staging.add_ship("A", 1, 2, Orientation::Horizontal);
        staging.add_ship("B", 2, 3, Orientation::Vertical);
        staging.add_ship("C", 3, 4, Orientation::Horizontal);
        let original = staging.ships().to_vec();

        staging.remove_ship(1);
        staging.add_ship("J", 10, 6, Orientation::Vertical);

        let expected = vec![
            original[0].clone(),
            original[2].clone(),
            raw("J", 10, 6, "VERTICAL"),
        ];
        assert_eq!(staging.ships(), expected.as_slice());
    }

    #[test]
    fn remove_out_of_range_is_noop() {
        let mut staging = ShipStaging::new();
        staging.add_ship("A", 1, 2, Orientation::Horizontal);
        staging.remove_ship(5);
        assert_eq!(staging.len(), 1);
    }

    #[test]
    fn accept_clears_staging() -> anyhow::Result<()> {
        let mut staging = ShipStaging::new();
        staging.add_ship("D", 4, 6, Orientation::Vertical);
        staging.submit("g1")?;
        staging.accept();
        assert!(staging.is_empty());
        Ok(())
    }

    #[test]
    fn duplicates_and_overlaps_are_left_to_the_server() -> anyhow::Result<()> {
        let mut staging = ShipStaging::new();
        staging.add_ship("J", 10, 6, Orientation::Horizontal);
        staging.add_ship("J", 10, 6, Orientation::Horizontal);
        assert_eq!(staging.submit("g1")?.body.ships.len(), 2);
        Ok(())
    }
}
