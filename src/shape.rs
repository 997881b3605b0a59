/// Shape of a column-major matrix. Activations keep one sample per column,
/// weight matrices are `outputs x inputs`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Shape {
    rows: usize,
    cols: usize,
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} x {}", self.rows, self.cols)
    }
}

impl std::ops::Mul<Shape> for Shape {
    type Output = Shape;
    fn mul(self, rhs: Shape) -> Self::Output {
        assert_eq!(self.cols, rhs.rows, "{self} * {rhs} is not possible!");
        Self { cols: rhs.cols, rows: self.rows }
    }
}

impl Shape {
    pub fn new(rows: usize, cols: usize) -> Self {
        assert!(cols > 0, "Cannot have 0 columns!");
        assert!(rows > 0, "Cannot have 0 rows!");
        Self { rows, cols }
    }

    pub fn with_cols(&self, cols: usize) -> Self {
        Self::new(self.rows, cols)
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn size(&self) -> usize {
        self.cols * self.rows
    }
}
