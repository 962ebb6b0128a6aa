//! Element layout and coordinate resolution.
//!
//! A geometry is a list of rows of element indices, read top to bottom:
//!
//! ```text
//! [[1, 2, 3], [4, 5, 6]]   →   1 2 3
//!                              4 5 6
//! ```
//!
//! Rows may differ in length; the grid width is the longest row. Coordinates
//! are cell centres in a frame whose origin is the bottom-left corner, so row 0
//! has the largest `y`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Panel cell marker for logical positions without a physical slot.
pub const INVALID_PANEL_CELL: i32 = -1;

/// Physical panel cell (1-based, row-major in a 3×2 canvas) for each logical
/// processing position. The assembly is read in a serpentine: left to right
/// on the top row, then right to left on the bottom row.
const PANEL_CELLS: [i32; 6] = [1, 2, 3, 6, 5, 4];

/// Map a logical chip position to its composite canvas cell.
///
/// Returns [`INVALID_PANEL_CELL`] for positions outside `0..6`.
pub fn physical_panel_cell(logical_position: i32) -> i32 {
    usize::try_from(logical_position)
        .ok()
        .and_then(|p| PANEL_CELLS.get(p).copied())
        .unwrap_or(INVALID_PANEL_CELL)
}

/// Immutable element layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u32>>", into = "Vec<Vec<u32>>")]
pub struct GeometryMap {
    rows: Vec<Vec<u32>>,
    width: usize,
    height: usize,
    // index -> (column, row from top)
    lookup: HashMap<u32, (usize, usize)>,
}

impl GeometryMap {
    /// Build a geometry from rows of element indices.
    ///
    /// Fails when there are no rows, when every row is empty, or when an index
    /// appears more than once.
    pub fn new(rows: Vec<Vec<u32>>) -> Result<Self, AppError> {
        if rows.is_empty() {
            return Err(AppError::configuration("Geometry is empty: at least one row is required."));
        }

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if width == 0 {
            return Err(AppError::configuration("Geometry is empty: every row has zero elements."));
        }
        let height = rows.len();

        let mut lookup = HashMap::new();
        for (row_idx, row) in rows.iter().enumerate() {
            for (col_idx, &index) in row.iter().enumerate() {
                if let Some((c, r)) = lookup.insert(index, (col_idx, row_idx)) {
                    return Err(AppError::configuration(format!(
                        "Element {index} appears twice in the geometry (row {r} column {c} and row {row_idx} column {col_idx})."
                    )));
                }
            }
        }

        Ok(Self {
            rows,
            width,
            height,
            lookup,
        })
    }

    pub fn rows(&self) -> &[Vec<u32>] {
        &self.rows
    }

    /// Longest row length.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    pub fn contains(&self, index: u32) -> bool {
        self.lookup.contains_key(&index)
    }

    /// Column and row (counted from the top) of an element.
    pub fn cell(&self, index: u32) -> Option<(usize, usize)> {
        self.lookup.get(&index).copied()
    }

    /// Cell-centre coordinate of an element, or `None` if it is not in the layout.
    pub fn resolve(&self, index: u32) -> Option<(f64, f64)> {
        let (col, row) = self.cell(index)?;
        let x = col as f64 + 0.5;
        let y = (self.height - row) as f64 - 0.5;
        Some((x, y))
    }

    /// All element indices in layout order (top row first).
    pub fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.iter().flatten().copied()
    }
}

impl TryFrom<Vec<Vec<u32>>> for GeometryMap {
    type Error = AppError;

    fn try_from(rows: Vec<Vec<u32>>) -> Result<Self, Self::Error> {
        GeometryMap::new(rows)
    }
}

impl From<GeometryMap> for Vec<Vec<u32>> {
    fn from(value: GeometryMap) -> Self {
        value.rows
    }
}

/// Row-major layout of `rows × columns` element indices numbered from `first`.
///
/// Numbering stops at `u32::MAX`; rows past it come out short or empty.
pub fn rectangular_layout(rows: usize, columns: usize, first: u32) -> Vec<Vec<u32>> {
    let mut indices = first..=u32::MAX;
    (0..rows)
        .map(|_| indices.by_ref().take(columns).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn resolves_two_by_two_layout() {
        let g = GeometryMap::new(vec![vec![10, 11], vec![12, 13]]).unwrap();
        assert_eq!(g.width(), 2);
        assert_eq!(g.height(), 2);
        assert_eq!(g.resolve(10), Some((0.5, 1.5)));
        assert_eq!(g.resolve(11), Some((1.5, 1.5)));
        assert_eq!(g.resolve(12), Some((0.5, 0.5)));
        assert_eq!(g.resolve(13), Some((1.5, 0.5)));
        assert_eq!(g.resolve(14), None);
    }

    #[test]
    fn ragged_rows_use_longest_row_as_width() {
        let g = GeometryMap::new(vec![vec![5], vec![1, 2, 3], vec![9, 8]]).unwrap();
        assert_eq!(g.width(), 3);
        assert_eq!(g.height(), 3);
        assert_eq!(g.resolve(5), Some((0.5, 2.5)));
        assert_eq!(g.resolve(3), Some((2.5, 1.5)));
        assert_eq!(g.resolve(8), Some((1.5, 0.5)));
    }

    #[test]
    fn resolve_is_injective_on_present_indices() {
        let g = GeometryMap::new(rectangular_layout(3, 16, 0)).unwrap();
        let mut seen = std::collections::HashSet::new();
        for index in g.indices() {
            let (x, y) = g.resolve(index).unwrap();
            assert!(seen.insert((x.to_bits(), y.to_bits())), "duplicate coordinate for {index}");
        }
        assert_eq!(seen.len(), 48);
    }

    #[test]
    fn rectangular_layout_stops_at_last_index() {
        assert_eq!(rectangular_layout(2, 3, 7), vec![vec![7, 8, 9], vec![10, 11, 12]]);

        let layout = rectangular_layout(3, 2, u32::MAX - 2);
        assert_eq!(layout, vec![vec![u32::MAX - 2, u32::MAX - 1], vec![u32::MAX], vec![]]);
        assert!(GeometryMap::new(layout).is_ok());
    }

    #[test]
    fn empty_geometry_is_a_configuration_error() {
        let err = GeometryMap::new(vec![]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        let err = GeometryMap::new(vec![vec![], vec![]]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn duplicate_index_is_rejected() {
        let err = GeometryMap::new(vec![vec![1, 2], vec![2, 3]]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("Element 2"));
    }

    #[test]
    fn panel_cells_follow_serpentine_order() {
        let cells: Vec<i32> = (0..6).map(physical_panel_cell).collect();
        assert_eq!(cells, vec![1, 2, 3, 6, 5, 4]);
        assert_eq!(physical_panel_cell(6), INVALID_PANEL_CELL);
        assert_eq!(physical_panel_cell(-1), INVALID_PANEL_CELL);
        assert_eq!(physical_panel_cell(i32::MAX), INVALID_PANEL_CELL);
    }

    #[test]
    fn geometry_deserializes_from_nested_lists() {
        let g: GeometryMap = serde_yaml::from_str("[[0, 1, 2], [3, 4, 5]]").unwrap();
        assert_eq!(g.resolve(4), Some((1.5, 0.5)));

        let bad: Result<GeometryMap, _> = serde_yaml::from_str("[]");
        assert!(bad.is_err());
    }
}
