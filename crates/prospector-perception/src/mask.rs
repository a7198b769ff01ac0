//! Binary raster used for every classification result.

/// A row-major binary image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl Mask {
    /// An all-false mask.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    /// Build a mask by evaluating `f(col, row)` for every pixel.
    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> bool) -> Self {
        let mut data = Vec::with_capacity(width as usize * height as usize);
        for row in 0..height {
            for col in 0..width {
                data.push(f(col, row));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel value; out-of-bounds reads are `false`.
    pub fn get(&self, col: u32, row: u32) -> bool {
        if col >= self.width || row >= self.height {
            return false;
        }
        self.data[self.index(col, row)]
    }

    /// Set a pixel; out-of-bounds writes are ignored.
    pub fn set(&mut self, col: u32, row: u32, value: bool) {
        if col < self.width && row < self.height {
            let i = self.index(col, row);
            self.data[i] = value;
        }
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v).count()
    }

    /// `(col, row)` of every set pixel, in row-major order.
    pub fn set_pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.width;
        self.data
            .iter()
            .enumerate()
            .filter(|(_, v)| **v)
            .map(move |(i, _)| ((i as u32) % width, (i as u32) / width))
    }

    /// `self && other`, pixel-wise. Pixels outside `other` count as unset.
    pub fn and(&self, other: &Mask) -> Mask {
        Mask::from_fn(self.width, self.height, |c, r| {
            self.get(c, r) && other.get(c, r)
        })
    }

    /// `self && !other`, pixel-wise. Masks must share dimensions; pixels
    /// outside `other` count as unset.
    pub fn and_not(&self, other: &Mask) -> Mask {
        Mask::from_fn(self.width, self.height, |c, r| {
            self.get(c, r) && !other.get(c, r)
        })
    }

    fn index(&self, col: u32, row: u32) -> usize {
        row as usize * self.width as usize + col as usize
    }
}
