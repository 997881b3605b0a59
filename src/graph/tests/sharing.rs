use std::rc::Rc;

use crate::{
    graph::{GraphBuilder, Operation},
    tensor::DenseMatrix,
};

use super::weights;

#[test]
fn weights_are_shared_between_graphs() {
    let w = weights(1, 2, &[1.0, 2.0]);
    let b = weights(1, 1, &[0.0]);

    let build = || {
        let mut builder = GraphBuilder::default();
        let x = builder.create_input("x", 2).unwrap();
        let wn = builder.create_weights("w", w.clone()).unwrap();
        let bn = builder.create_weights("b", b.clone()).unwrap();
        let out = builder.create_result_of_operation(Operation::Affine { weights: wn, bias: bn, input: x }).unwrap();
        builder.build(out, None, None)
    };

    let mut first = build();
    let mut second = build();

    let data = DenseMatrix::from_samples(2, &[1.0, 1.0]).unwrap();
    first.store_input("x", &data).unwrap();
    second.store_input("x", &data).unwrap();

    assert_eq!(first.predict().values(), &[3.0]);

    w.borrow_mut().values.values_mut()[0] = 5.0;

    assert_eq!(first.predict().values(), &[7.0]);
    assert_eq!(second.predict().values(), &[7.0]);
    assert!(Rc::ptr_eq(&first.weights_handle("w").unwrap(), &second.weights_handle("w").unwrap()));
}

#[test]
fn same_weights_twice_in_one_graph() {
    let w = weights(1, 1, &[1.0]);

    let mut builder = GraphBuilder::default();
    builder.create_weights("a", w.clone()).unwrap();
    assert!(builder.create_weights("b", w).is_err());
}
