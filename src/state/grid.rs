use crate::infra::{Bounds, Position};

/// Longest side a grid may have.
pub const MAX_GRID_SIDE: i32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Empty,
    Obstacle,
    Object,
    Target,
    Robot,
}

impl Cell {
    pub fn symbol(self) -> char {
        match self {
            Cell::Empty => '.',
            Cell::Obstacle => '#',
            Cell::Object => 'O',
            Cell::Target => 'T',
            Cell::Robot => 'A',
        }
    }
}

/// Fixed-size grid of cell tags, stored row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    pub width: i32,
    pub height: i32,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: i32, height: i32) -> Self {
        let len = width.max(0) as usize * height.max(0) as usize;
        Self {
            width,
            height,
            cells: vec![Cell::Empty; len],
        }
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_size(self.width, self.height)
    }

    pub fn in_bounds(&self, pos: &Position) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    fn index(&self, pos: &Position) -> Option<usize> {
        self.in_bounds(pos)
            .then(|| pos.y as usize * self.width as usize + pos.x as usize)
    }

    pub fn get(&self, pos: &Position) -> Option<Cell> {
        self.index(pos).map(|i| self.cells[i])
    }

    /// Retags a cell, returning the previous tag. Out-of-bounds writes are ignored.
    pub fn set(&mut self, pos: Position, cell: Cell) -> Option<Cell> {
        let i = self.index(&pos)?;
        Some(std::mem::replace(&mut self.cells[i], cell))
    }

    pub fn clear(&mut self) {
        self.cells.fill(Cell::Empty);
    }

    pub fn is_obstacle(&self, pos: &Position) -> bool {
        self.get(pos) == Some(Cell::Obstacle)
    }

    pub fn find(&self, cell: Cell) -> Option<Position> {
        self.iter().find(|&(_, c)| c == cell).map(|(pos, _)| pos)
    }

    pub fn count(&self, cell: Cell) -> usize {
        self.cells.iter().filter(|&&c| c == cell).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Position, Cell)> + '_ {
        let width = self.width.max(1) as usize;
        self.cells.iter().enumerate().map(move |(i, &cell)| {
            (Position::new((i % width) as i32, (i / width) as i32), cell)
        })
    }
}
