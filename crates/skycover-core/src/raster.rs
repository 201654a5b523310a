use serde::{Deserialize, Serialize};

/// A 2D grid of per-pixel values, row-major.
/// Every per-pixel artifact of the pipeline (channels, labels, masks) is a Raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raster<T> {
    /// Row-major values, `width * height` long.
    pub data: Vec<T>,
    pub width: usize,
    pub height: usize,
}

impl<T: Clone> Raster<T> {
    /// Create a new Raster filled with the given value.
    pub fn new(width: usize, height: usize, fill: T) -> Self {
        Self {
            data: vec![fill; width * height],
            width,
            height,
        }
    }
}

impl<T> Raster<T> {
    /// Wrap an existing row-major buffer. Panics if the length does not match.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Self {
        assert_eq!(data.len(), width * height, "raster buffer length mismatch");
        Self { data, width, height }
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> &T {
        &self.data[row * self.width + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: T) {
        self.data[row * self.width + col] = val;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Apply `f` to every cell, keeping the shape.
    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> Raster<U> {
        Raster {
            data: self.data.iter().map(f).collect(),
            width: self.width,
            height: self.height,
        }
    }
}

impl Raster<bool> {
    /// Number of true cells.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }
}

impl Raster<f64> {
    pub fn min_value(&self) -> f64 {
        self.data.iter().cloned().fold(f64::INFINITY, f64::min)
    }

    pub fn max_value(&self) -> f64 {
        self.data.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_are_row_major() {
        let mut r = Raster::new(3, 2, 0u8);
        r.set(1, 2, 7);
        assert_eq!(r.data[5], 7);
        assert_eq!(*r.get(1, 2), 7);
        assert_eq!(r.index(1, 0), 3);
    }

    #[test]
    fn count_true_cells() {
        let r = Raster::from_vec(2, 2, vec![true, false, true, true]);
        assert_eq!(r.count(), 3);
    }

    #[test]
    fn map_keeps_shape() {
        let r = Raster::from_vec(2, 1, vec![1.0f64, -2.0]);
        let m = r.map(|v| *v > 0.0);
        assert_eq!((m.width, m.height), (2, 1));
        assert_eq!(m.data, vec![true, false]);
        assert_eq!(r.min_value(), -2.0);
        assert_eq!(r.max_value(), 1.0);
    }

    #[test]
    #[should_panic]
    fn from_vec_rejects_wrong_length() {
        let _ = Raster::from_vec(2, 2, vec![0u8; 3]);
    }
}
