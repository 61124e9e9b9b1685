use crate::population::Coordinates;
use crate::rand::Rng;

/// Hands out free grid cells for new locations, each cell at most once.
///
/// The grid starts as the smallest square with at least one cell per person. Communities with
/// many small workplaces can need more locations than that; when every cell is taken the
/// square grows by one row and one column.
#[derive(Debug)]
pub(crate) struct Grid {
    side: u32,
    free: Vec<Coordinates>,
}

impl Grid {
    pub(crate) fn for_population(population: usize) -> Self {
        let mut side: u32 = 1;
        while (side as usize) * (side as usize) < population {
            side += 1;
        }
        let free = (0..side)
            .flat_map(|y| (0..side).map(move |x| Coordinates::new(x, y)))
            .collect();
        Grid { side, free }
    }

    pub(crate) fn side(&self) -> u32 {
        self.side
    }

    pub(crate) fn take_random_cell<R: Rng>(&mut self, rng: &mut R) -> Coordinates {
        if self.free.is_empty() {
            self.grow();
        }
        let idx = rng.random_range(0..self.free.len());
        self.free.swap_remove(idx)
    }

    fn grow(&mut self) {
        let edge = self.side;
        self.free.extend((0..=edge).map(|y| Coordinates::new(edge, y)));
        self.free.extend((0..edge).map(|x| Coordinates::new(x, edge)));
        self.side += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rand::rngs::SmallRng;
    use crate::rand::SeedableRng;
    use crate::HashSet;

    #[test]
    fn sized_to_fit_population() {
        assert_eq!(Grid::for_population(0).side(), 1);
        assert_eq!(Grid::for_population(1).side(), 1);
        assert_eq!(Grid::for_population(200).side(), 15);
        assert_eq!(Grid::for_population(225).side(), 15);
        assert_eq!(Grid::for_population(226).side(), 16);
    }

    #[test]
    fn cells_are_never_reused() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut grid = Grid::for_population(10);
        assert_eq!(grid.side(), 4);
        let mut seen = HashSet::default();
        // Twice the initial 16 cells forces the grid to grow.
        for _ in 0..32 {
            let cell = grid.take_random_cell(&mut rng);
            assert!(seen.insert(cell), "cell {cell:?} handed out twice");
            assert!(cell.x < grid.side() && cell.y < grid.side());
        }
        assert!(grid.side() >= 6);
    }
}
