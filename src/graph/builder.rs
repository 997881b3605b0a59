use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    rc::Rc,
};

use super::{operation::Operation, ExecutionContext, Graph};
use crate::{
    error::{Error, Result},
    rng,
    shape::Shape,
    tensor::{SharedTensor, Tensor},
};

#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Node(pub(crate) usize);

pub(crate) struct NodeData {
    id: Option<String>,
    shape: Shape,
    requires_grad: bool,
    parent_operation: Option<Operation>,
    tensor: Option<SharedTensor>,
}

impl NodeData {
    pub fn shape(&self) -> Shape {
        self.shape
    }
}

/// Builds a graph one node at a time. Input shapes are per sample, the
/// batch size is only fixed when data is stored into the built graph.
#[derive(Default)]
pub struct GraphBuilder {
    nodes: Vec<NodeData>,
    inputs: HashSet<Node>,
    weights: HashSet<Node>,
    ids: HashSet<String>,
}

impl GraphBuilder {
    pub(crate) fn get_node(&self, index: Node) -> &NodeData {
        &self.nodes[index.0]
    }

    pub fn shape_of(&self, node: Node) -> Shape {
        self.nodes[node.0].shape
    }

    fn create_node(&mut self, data: NodeData) -> Result<Node> {
        if let Some(id) = data.id.as_ref() {
            if !self.ids.insert(id.to_string()) {
                return Err(Error::DuplicateId(id.to_string()));
            }
        }

        let node = Node(self.nodes.len());
        self.nodes.push(data);

        Ok(node)
    }

    pub fn create_input(&mut self, id: &str, features: usize) -> Result<Node> {
        let data = NodeData {
            id: Some(id.to_string()),
            shape: Shape::new(features, 1),
            requires_grad: false,
            parent_operation: None,
            tensor: None,
        };

        let node = self.create_node(data)?;
        self.inputs.insert(node);

        Ok(node)
    }

    /// Weights are passed in by handle, so the same parameter can live in
    /// several graphs at once.
    pub fn create_weights(&mut self, id: &str, tensor: SharedTensor) -> Result<Node> {
        let aliased = self.weights.iter().any(|node| {
            self.nodes[node.0].tensor.as_ref().is_some_and(|existing| Rc::ptr_eq(existing, &tensor))
        });

        if aliased {
            return Err(Error::DuplicateId(id.to_string()));
        }

        let shape = tensor.borrow().shape();
        let data = NodeData { id: Some(id.to_string()), shape, requires_grad: true, parent_operation: None, tensor: Some(tensor) };

        let node = self.create_node(data)?;
        self.weights.insert(node);

        Ok(node)
    }

    pub fn create_result_of_operation(&mut self, operation: Operation) -> Result<Node> {
        let nodes = operation.nodes();

        if nodes.iter().any(|node| node.0 >= self.nodes.len()) {
            return Err(Error::ShapeMismatch { op: operation.name(), message: "unknown input node".to_string() });
        }

        let distinct = nodes.iter().collect::<HashSet<_>>();
        if distinct.len() != nodes.len() {
            return Err(Error::AliasedNode(operation.name()));
        }

        let shape = operation.output_shape(self)?;

        self.create_node(NodeData { id: None, shape, requires_grad: true, parent_operation: Some(operation), tensor: None })
    }

    /// `output` is what prediction computes, `loss` is the scalar that
    /// training minimises.
    pub fn build(self, output: Node, loss: Option<Node>, seed: Option<u64>) -> Graph {
        assert!(output.0 < self.nodes.len(), "Output node does not exist!");
        assert!(!self.weights.contains(&output), "Can't output trainable weights!");

        if let Some(loss) = loss {
            assert_eq!(self.get_node(loss).shape, Shape::new(1, 1), "Graph loss must be scalar!");
            assert!(self.get_node(loss).parent_operation.is_some(), "Loss cannot be an input!");
        }

        let predict_plan = self.plan_for(output);
        let train_plan = loss.map(|loss| self.plan_for(loss)).unwrap_or_default();

        let mut operations = Vec::with_capacity(self.nodes.len());
        let mut nodes = Vec::with_capacity(self.nodes.len());

        for data in self.nodes.iter() {
            let tensor = match &data.tensor {
                Some(tensor) => tensor.clone(),
                None => Tensor::new(data.shape, data.requires_grad).shared(),
            };

            nodes.push(tensor);
            operations.push(data.parent_operation.clone());
        }

        let named = |set: &HashSet<Node>| {
            set.iter().map(|&node| (self.get_node(node).id.clone().unwrap_or_default(), node)).collect::<HashMap<_, _>>()
        };

        let inputs = named(&self.inputs);
        let weights = named(&self.weights);

        Graph {
            nodes,
            operations,
            output,
            loss,
            inputs,
            weights,
            predict_plan,
            train_plan,
            ctx: RefCell::new(ExecutionContext { training: false, rng: rng::seeded(seed), batch_size: 1 }),
        }
    }

    /// Operation nodes needed to compute `root`, in execution order.
    fn plan_for(&self, root: Node) -> Vec<Node> {
        let mut needed = vec![false; self.nodes.len()];
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            if needed[node.0] {
                continue;
            }

            needed[node.0] = true;

            if let Some(op) = &self.nodes[node.0].parent_operation {
                stack.extend(op.nodes());
            }
        }

        (0..self.nodes.len())
            .filter(|&idx| needed[idx] && self.nodes[idx].parent_operation.is_some())
            .map(Node)
            .collect()
    }
}
