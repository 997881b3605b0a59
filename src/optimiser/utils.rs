use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

use crate::{
    error::{Error, Result},
    graph::Graph,
    tensor::{DenseMatrix, SharedTensor},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Placement {
    Before,
    #[default]
    After,
}

/// Writes the weights of a graph to a file, tagged by weight id.
pub fn write_graph_weights_to_file(graph: &Graph, path: impl AsRef<Path>) -> Result<()> {
    let mut buf = Vec::new();

    for id in graph.weight_ids() {
        let weights = graph.get_weights(&id)?;
        buf.extend_from_slice(&weights.values.write_to_byte_buffer(&id)?);
    }

    let mut file = File::create(path)?;
    file.write_all(&buf)?;

    Ok(())
}

/// Weights read from a file and checked against a graph, not yet copied in.
pub type StagedWeights = Vec<(SharedTensor, DenseMatrix)>;

/// Reads a weights file and matches every entry to a weight of `graph`
/// without touching the graph. Every weight in the file must exist in the
/// graph with the same shape.
pub fn stage_graph_weights_from_file(graph: &Graph, path: impl AsRef<Path>) -> Result<StagedWeights> {
    let mut staged = Vec::new();

    for (id, matrix) in load_weights_from_file(path)? {
        let handle = graph.weights_handle(&id)?;
        let shape = handle.borrow().values.shape();

        if shape != matrix.shape() {
            return Err(Error::Format(format!(
                "weights `{id}` are {shape} in the graph but {} in the file",
                matrix.shape()
            )));
        }

        staged.push((handle, matrix));
    }

    Ok(staged)
}

/// Copies staged weights into the graph they were checked against.
pub fn apply_staged_weights(staged: StagedWeights) {
    for (handle, matrix) in staged {
        matrix.copy_into(&mut handle.borrow_mut().values);
    }
}

/// Loads every labelled matrix in a file, in file order.
pub fn load_weights_from_file(path: impl AsRef<Path>) -> Result<Vec<(String, DenseMatrix)>> {
    let mut buf = Vec::new();
    let mut file = File::open(path)?;
    file.read_to_end(&mut buf)?;

    let mut offset = 0;
    let mut res = Vec::new();

    while offset < buf.len() {
        let mut matrix = DenseMatrix::default();
        let (id, bytes_read) = matrix.read_from_byte_buffer(&buf[offset..])?;
        res.push((id, matrix));
        offset += bytes_read;
    }

    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::{GraphBuilder, Operation},
        shape::Shape,
        tensor::Tensor,
    };

    fn graph() -> Graph {
        let mut builder = GraphBuilder::default();
        let input = builder.create_input("input", 3).unwrap();
        let kernel = Tensor::new(Shape::new(2, 3), true).shared();
        let bias = Tensor::new(Shape::new(2, 1), true).shared();
        let weights = builder.create_weights("l/kernel", kernel).unwrap();
        let bias = builder.create_weights("l/bias", bias).unwrap();
        let out = builder.create_result_of_operation(Operation::Affine { weights, bias, input }).unwrap();
        builder.build(out, None, Some(0))
    }

    fn write(path: &Path, entries: &[(&str, Shape)]) {
        let mut file = File::create(path).unwrap();

        for (id, shape) in entries {
            let mut matrix = DenseMatrix::default();
            matrix.load_from_slice(*shape, &vec![1.5; shape.size()]);
            file.write_all(&matrix.write_to_byte_buffer(id).unwrap()).unwrap();
        }
    }

    fn load(graph: &Graph, path: &Path) -> Result<()> {
        apply_staged_weights(stage_graph_weights_from_file(graph, path)?);
        Ok(())
    }

    #[test]
    fn load_is_all_or_nothing() {
        let path = std::env::temp_dir().join(format!("sae-utils-test-{}.bin", std::process::id()));
        let target = graph();

        write(&path, &[("l/kernel", Shape::new(2, 3)), ("l/missing", Shape::new(1, 1))]);
        assert!(matches!(load(&target, &path), Err(Error::UnknownWeights(_))));
        assert!(target.get_weights("l/kernel").unwrap().values.values().iter().all(|&v| v == 0.0));

        write(&path, &[("l/kernel", Shape::new(2, 3)), ("l/bias", Shape::new(3, 1))]);
        assert!(matches!(load(&target, &path), Err(Error::Format(_))));
        assert!(target.get_weights("l/kernel").unwrap().values.values().iter().all(|&v| v == 0.0));

        write(&path, &[("l/kernel", Shape::new(2, 3)), ("l/bias", Shape::new(2, 1))]);
        load(&target, &path).unwrap();
        assert!(target.get_weights("l/kernel").unwrap().values.values().iter().all(|&v| v == 1.5));
        assert!(target.get_weights("l/bias").unwrap().values.values().iter().all(|&v| v == 1.5));

        std::fs::remove_file(&path).unwrap();
    }
}
