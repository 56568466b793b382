use crate::{GridPos, Loc, MapHeader};

/// Numeric layers stored for every map cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Layer {
    /// Obstruction level of the cell.
    Rubble,
    /// Resources lying on the cell.
    Parts,
}

/// Map grid with its per-cell rubble and parts layers.
///
/// The grid is never resized after construction; terrain events only rewrite
/// individual cells.
#[derive(Clone, Debug, PartialEq)]
pub struct GameMap {
    width: u32,
    height: u32,
    name: String,
    origin: Loc,
    rubble: Vec<f64>,
    parts: Vec<f64>,
}

impl GameMap {
    /// Builds the map described by a decoded header.
    ///
    /// The decoder guarantees that the header's layers match its dimensions.
    #[must_use]
    pub fn from_header(header: &MapHeader) -> Self {
        Self {
            width: header.width,
            height: header.height,
            name: header.name.clone(),
            origin: header.origin,
            rubble: header.initial_rubble.iter().flatten().copied().collect(),
            parts: header.initial_parts.iter().flatten().copied().collect(),
        }
    }

    /// Number of columns in the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Map name reported by the server.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// World-space location of the grid's `(0, 0)` cell.
    #[must_use]
    pub const fn origin(&self) -> Loc {
        self.origin
    }

    /// Reports whether the cell lies inside the grid.
    #[must_use]
    pub fn contains(&self, cell: GridPos) -> bool {
        cell.column() < self.width && cell.row() < self.height
    }

    /// Reads a layer value for the cell.
    #[must_use]
    pub fn get(&self, layer: Layer, cell: GridPos) -> Option<f64> {
        let index = self.index(cell)?;
        self.layer(layer).get(index).copied()
    }

    /// Rubble level of the cell.
    #[must_use]
    pub fn rubble(&self, cell: GridPos) -> Option<f64> {
        self.get(Layer::Rubble, cell)
    }

    /// Parts lying on the cell.
    #[must_use]
    pub fn parts(&self, cell: GridPos) -> Option<f64> {
        self.get(Layer::Parts, cell)
    }

    /// Overwrites a layer value, returning `false` when the cell lies outside the grid.
    pub fn set(&mut self, layer: Layer, cell: GridPos, amount: f64) -> bool {
        let Some(index) = self.index(cell) else {
            return false;
        };
        let values = match layer {
            Layer::Rubble => &mut self.rubble,
            Layer::Parts => &mut self.parts,
        };
        match values.get_mut(index) {
            Some(slot) => {
                *slot = amount;
                true
            }
            None => false,
        }
    }

    /// Iterator over every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = GridPos> + '_ {
        (0..self.height)
            .flat_map(move |row| (0..self.width).map(move |column| GridPos::new(column, row)))
    }

    fn layer(&self, layer: Layer) -> &[f64] {
        match layer {
            Layer::Rubble => &self.rubble,
            Layer::Parts => &self.parts,
        }
    }

    fn index(&self, cell: GridPos) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        let row = usize::try_from(cell.row()).ok()?;
        let column = usize::try_from(cell.column()).ok()?;
        let width = usize::try_from(self.width).ok()?;
        Some(row * width + column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> MapHeader {
        MapHeader {
            width: 3,
            height: 2,
            name: "tiny".to_owned(),
            origin: Loc::new(10.0, 20.0),
            initial_rubble: vec![vec![0.0, 1.0, 2.0], vec![3.0, 4.0, 5.0]],
            initial_parts: vec![vec![0.0; 3], vec![0.0, 0.0, 9.0]],
        }
    }

    #[test]
    fn layers_are_row_major() {
        let map = GameMap::from_header(&header());
        assert_eq!(map.rubble(GridPos::new(2, 0)), Some(2.0));
        assert_eq!(map.rubble(GridPos::new(0, 1)), Some(3.0));
        assert_eq!(map.parts(GridPos::new(2, 1)), Some(9.0));
        assert_eq!(map.rubble(GridPos::new(3, 0)), None);
    }

    #[test]
    fn set_rejects_cells_outside_grid() {
        let mut map = GameMap::from_header(&header());
        assert!(map.set(Layer::Parts, GridPos::new(1, 1), 50.0));
        assert_eq!(map.parts(GridPos::new(1, 1)), Some(50.0));
        assert!(!map.set(Layer::Parts, GridPos::new(1, 2), 50.0));
    }

    #[test]
    fn cells_cover_whole_grid() {
        let map = GameMap::from_header(&header());
        let cells: Vec<_> = map.cells().collect();
        assert_eq!(cells.len(), 6);
        assert_eq!(cells[0], GridPos::new(0, 0));
        assert_eq!(cells[5], GridPos::new(2, 1));
    }
}
