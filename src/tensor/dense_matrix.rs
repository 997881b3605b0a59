mod activate;
mod affine;
mod elementwise;
mod squared_error;

pub use activate::Activation;

use crate::{
    error::{Error, Result},
    shape::Shape,
};

/// Column-major matrix of `f32` living on the host.
#[derive(Clone, Debug, PartialEq)]
pub struct DenseMatrix {
    pub(super) shape: Shape,
    pub(super) buf: Vec<f32>,
}

impl Default for DenseMatrix {
    fn default() -> Self {
        Self::zeroed(Shape::new(1, 1))
    }
}

impl DenseMatrix {
    pub fn zeroed(shape: Shape) -> Self {
        Self { shape, buf: vec![0.0; shape.size()] }
    }

    /// Builds a `features x samples` matrix from row-per-sample data.
    /// Column-major storage makes the two layouts identical in memory.
    pub fn from_samples(features: usize, data: &[f32]) -> Result<Self> {
        if features == 0 || data.is_empty() {
            return Err(Error::InvalidData("cannot build a matrix with no features or no samples".to_string()));
        }

        if data.len() % features != 0 {
            return Err(Error::InvalidData(format!(
                "{} values do not split into samples of {features} features",
                data.len()
            )));
        }

        Ok(Self { shape: Shape::new(features, data.len() / features), buf: data.to_vec() })
    }

    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let features = rows.first().map_or(0, Vec::len);

        if let Some(bad) = rows.iter().position(|row| row.len() != features) {
            return Err(Error::InvalidData(format!(
                "sample {bad} has {} values, expected {features}",
                rows[bad].len()
            )));
        }

        let data = rows.iter().flatten().copied().collect::<Vec<_>>();
        Self::from_samples(features, &data)
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn values(&self) -> &[f32] {
        &self.buf
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.buf
    }

    pub fn num_samples(&self) -> usize {
        self.shape.cols()
    }

    pub fn sample(&self, idx: usize) -> &[f32] {
        let rows = self.shape.rows();
        &self.buf[idx * rows..(idx + 1) * rows]
    }

    pub fn samples(&self) -> std::slice::ChunksExact<'_, f32> {
        self.buf.chunks_exact(self.shape.rows())
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.buf[row + col * self.shape.rows()]
    }

    /// Gathers the given samples (columns) into a new matrix, in order.
    pub fn select_samples(&self, indices: &[usize]) -> Self {
        let mut buf = Vec::with_capacity(indices.len() * self.shape.rows());

        for &idx in indices {
            buf.extend_from_slice(self.sample(idx));
        }

        Self { shape: self.shape.with_cols(indices.len()), buf }
    }

    /// Appends the samples of `other` after the samples of `self`.
    pub fn append_samples(&mut self, other: &Self) {
        assert_eq!(self.shape.rows(), other.shape.rows());
        self.buf.extend_from_slice(&other.buf);
        self.shape = self.shape.with_cols(self.shape.cols() + other.shape.cols());
    }

    /// - If the provided `shape` matches the matrix's current shape, nothing is done.
    /// - If it doesn't, the matrix is reshaped into this shape, and its values are zeroed.
    pub(crate) fn reshape_if_needed(&mut self, shape: Shape) {
        if self.shape != shape {
            self.buf.clear();
            self.buf.resize(shape.size(), 0.0);
            self.shape = shape;
        }
    }

    pub fn load_from_slice(&mut self, shape: Shape, buf: &[f32]) {
        assert_eq!(shape.size(), buf.len(), "Must be exactly the same size!");
        self.reshape_if_needed(shape);
        self.buf.copy_from_slice(buf);
    }

    pub fn set_zero(&mut self) {
        self.buf.fill(0.0);
    }

    pub fn copy_into(&self, dest: &mut Self) {
        dest.reshape_if_needed(self.shape);
        dest.buf.copy_from_slice(&self.buf);
    }

    /// Writes the contents of this matrix into a buffer,
    /// returns number of values written.
    pub fn write_to_slice(&self, buf: &mut [f32]) -> usize {
        assert!(self.shape.size() <= buf.len());
        buf[..self.buf.len()].copy_from_slice(&self.buf);
        self.buf.len()
    }

    /// Index of the largest value in each sample.
    pub fn argmax_per_sample(&self) -> Vec<usize> {
        self.samples()
            .map(|sample| {
                sample.iter().enumerate().fold(0, |best, (idx, &val)| if val > sample[best] { idx } else { best })
            })
            .collect()
    }

    /// Writes a complete description of the matrix into a buffer of bytes,
    /// along with an ID tag.
    pub fn write_to_byte_buffer(&self, id: &str) -> std::io::Result<Vec<u8>> {
        use std::io::{Error, ErrorKind, Write};

        if !id.is_ascii() {
            return Err(Error::new(ErrorKind::InvalidInput, "IDs may not contain non-ASCII characters!"));
        }

        if id.contains('\n') {
            return Err(Error::new(ErrorKind::InvalidInput, "IDs may not contain newlines!"));
        }

        let mut buf = Vec::with_capacity(id.len() + 17 + 4 * self.buf.len());

        buf.write_all(id.as_bytes())?;
        buf.write_all(b"\n")?;
        buf.write_all(&(self.shape.rows() as u64).to_le_bytes())?;
        buf.write_all(&(self.shape.cols() as u64).to_le_bytes())?;

        for val in &self.buf {
            buf.write_all(&val.to_le_bytes())?;
        }

        Ok(buf)
    }

    /// Reads a matrix from a byte buffer, returning the matrix ID that was
    /// read and how many bytes were consumed.
    pub fn read_from_byte_buffer(&mut self, bytes: &[u8]) -> Result<(String, usize)> {
        const DIM: usize = std::mem::size_of::<u64>();

        let newline = bytes
            .iter()
            .position(|&ch| ch == b'\n')
            .ok_or_else(|| Error::Format("missing newline after matrix id".to_string()))?;

        let id = std::str::from_utf8(&bytes[..newline])
            .ok()
            .filter(|id| id.is_ascii())
            .ok_or_else(|| Error::Format("matrix id is not ASCII".to_string()))?
            .to_string();

        let mut offset = newline + 1;

        let read_dim = |offset: &mut usize| -> Result<usize> {
            let word = bytes
                .get(*offset..*offset + DIM)
                .ok_or_else(|| Error::Format(format!("truncated header for matrix `{id}`")))?;
            *offset += DIM;
            let mut buf = [0u8; DIM];
            buf.copy_from_slice(word);
            Ok(u64::from_le_bytes(buf) as usize)
        };

        let rows = read_dim(&mut offset)?;
        let cols = read_dim(&mut offset)?;

        if rows == 0 || cols == 0 {
            return Err(Error::Format(format!("matrix `{id}` has an empty dimension")));
        }

        let total_read = rows
            .checked_mul(cols)
            .and_then(|size| size.checked_mul(4))
            .and_then(|len| len.checked_add(offset))
            .ok_or_else(|| Error::Format(format!("matrix `{id}` claims {rows} x {cols} values")))?;

        let words = bytes
            .get(offset..total_read)
            .ok_or_else(|| Error::Format(format!("truncated values for matrix `{id}`")))?;

        let shape = Shape::new(rows, cols);

        let values = words
            .chunks_exact(4)
            .map(|word| {
                let mut buf = [0; 4];
                buf.copy_from_slice(word);
                f32::from_le_bytes(buf)
            })
            .collect::<Vec<_>>();

        self.load_from_slice(shape, &values);

        Ok((id, total_read))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_dense_matrix() {
        let mut matrix = DenseMatrix::default();

        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];

        matrix.load_from_slice(Shape::new(3, 3), &values);

        let bytes = matrix.write_to_byte_buffer("matrix").unwrap();

        matrix.set_zero();

        let (id, bytes_read) = matrix.read_from_byte_buffer(&bytes).unwrap();

        assert_eq!(id.as_str(), "matrix");
        assert_eq!(bytes_read, 59);

        let mut buf = [0.0; 9];

        matrix.write_to_slice(&mut buf);

        assert_eq!(buf, values);
    }

    #[test]
    fn attempt_invalid_writes() {
        let matrix = DenseMatrix::default();
        assert!(matrix.write_to_byte_buffer("matrix\n").is_err());
        assert!(matrix.write_to_byte_buffer("màtrix").is_err());
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let matrix = DenseMatrix::from_samples(2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let bytes = matrix.write_to_byte_buffer("w").unwrap();

        let mut out = DenseMatrix::default();
        assert!(matches!(out.read_from_byte_buffer(&bytes[..bytes.len() - 1]), Err(Error::Format(_))));
        assert!(matches!(out.read_from_byte_buffer(b"no newline"), Err(Error::Format(_))));
    }

    #[test]
    fn oversized_header_is_rejected() {
        let mut bytes = b"w\n".to_vec();
        bytes.extend_from_slice(&(u64::MAX / 2).to_le_bytes());
        bytes.extend_from_slice(&4u64.to_le_bytes());
        bytes.extend_from_slice(&[0; 16]);

        let mut out = DenseMatrix::default();
        assert!(matches!(out.read_from_byte_buffer(&bytes), Err(Error::Format(_))));

        let mut bytes = b"w\n".to_vec();
        bytes.extend_from_slice(&u64::MAX.to_le_bytes());
        bytes.extend_from_slice(&1u64.to_le_bytes());
        assert!(matches!(out.read_from_byte_buffer(&bytes), Err(Error::Format(_))));
        assert_eq!(out, DenseMatrix::default());
    }

    #[test]
    fn samples_are_columns() {
        let matrix = DenseMatrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap();

        assert_eq!(matrix.shape(), Shape::new(3, 2));
        assert_eq!(matrix.sample(1), &[4.0, 5.0, 6.0]);
        assert_eq!(matrix.get(2, 0), 3.0);

        let picked = matrix.select_samples(&[1, 1, 0]);
        assert_eq!(picked.values(), &[4.0, 5.0, 6.0, 4.0, 5.0, 6.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        assert!(DenseMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).is_err());
        assert!(DenseMatrix::from_samples(3, &[1.0, 2.0]).is_err());
        assert!(DenseMatrix::from_samples(3, &[]).is_err());
    }

    #[test]
    fn argmax_picks_first_maximum() {
        let matrix = DenseMatrix::from_samples(3, &[0.1, 0.7, 0.2, 0.5, 0.5, 0.0]).unwrap();
        assert_eq!(matrix.argmax_per_sample(), vec![1, 0]);
    }
}
