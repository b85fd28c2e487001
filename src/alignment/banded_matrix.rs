//! Banded score matrix for diagonal-band dynamic programming
//!
//! A full alignment matrix of two N-frame sequences needs N² cells. When the drift
//! between the sequences never exceeds `side` frames, only the cells within `side`
//! of the main diagonal matter, so each row stores `2 * side + 1` cells addressed by
//! their diagonal offset `column - row`.

/// Score matrix restricted to a diagonal band
#[derive(Debug, Clone)]
pub struct BandedMatrix {
    rows: usize,
    side: usize,
    data: Vec<i32>,
}

impl BandedMatrix {
    /// Create a `rows x (2 * side + 1)` band with every cell set to `fill`
    pub fn new(rows: usize, side: usize, fill: i32) -> Self {
        let width = 2 * side + 1;
        Self {
            rows,
            side,
            data: vec![fill; rows * width],
        }
    }

    /// Band half-width
    pub fn side(&self) -> usize {
        self.side
    }

    fn contains(&self, row: usize, offset: isize) -> bool {
        row < self.rows && offset.unsigned_abs() <= self.side
    }

    /// Full-matrix column of `(row, offset)`, or `None` if it would be negative
    pub fn column(row: usize, offset: isize) -> Option<usize> {
        row.checked_add_signed(offset)
    }

    /// Diagonal offset of the full-matrix cell `(row, column)`
    pub fn offset(row: usize, column: usize) -> isize {
        column as isize - row as isize
    }

    fn index(&self, row: usize, offset: isize) -> Option<usize> {
        if !self.contains(row, offset) {
            return None;
        }
        let slot = (offset + self.side as isize) as usize;
        Some(row * (2 * self.side + 1) + slot)
    }

    /// Score at `(row, offset)`, `None` outside the band
    pub fn get(&self, row: usize, offset: isize) -> Option<i32> {
        self.index(row, offset).map(|i| self.data[i])
    }

    /// Set the score at `(row, offset)`; returns false and stores nothing outside the band
    pub fn set(&mut self, row: usize, offset: isize, value: i32) -> bool {
        match self.index(row, offset) {
            Some(i) => {
                self.data[i] = value;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_within_band() {
        let mut m = BandedMatrix::new(5, 2, i32::MIN);
        assert!(m.set(3, -2, 7));
        assert!(m.set(3, 2, 9));
        assert!(m.set(0, 0, 1));
        assert_eq!(m.get(3, -2), Some(7));
        assert_eq!(m.get(3, 2), Some(9));
        assert_eq!(m.get(0, 0), Some(1));
        assert_eq!(m.get(3, 0), Some(i32::MIN));
    }

    #[test]
    fn test_out_of_band_is_rejected() {
        let mut m = BandedMatrix::new(4, 1, 0);
        assert!(!m.set(2, 2, 5));
        assert!(!m.set(4, 0, 5));
        assert_eq!(m.get(2, -2), None);
        assert_eq!(m.get(4, 0), None);
    }

    #[test]
    fn test_cells_do_not_alias() {
        // Neighbouring rows must not share storage at the band edges
        let mut m = BandedMatrix::new(3, 1, 0);
        for row in 0..3 {
            for offset in -1..=1 {
                m.set(row, offset, (row * 10) as i32 + offset as i32);
            }
        }
        for row in 0..3 {
            for offset in -1..=1 {
                assert_eq!(m.get(row, offset), Some((row * 10) as i32 + offset as i32));
            }
        }
    }

    #[test]
    fn test_column_offset_mapping() {
        assert_eq!(BandedMatrix::column(5, -2), Some(3));
        assert_eq!(BandedMatrix::column(1, -2), None);
        assert_eq!(BandedMatrix::offset(5, 3), -2);
        assert_eq!(BandedMatrix::offset(2, 6), 4);
    }
}
