use anyhow::Result;
use ndarray::Array2;
use proptest::prelude::*;
use xaibridge_core::{
    Error, InferTensor, InferenceResponse, ModelInput, Shape, Table, TensorCodec, TensorData,
};

fn matrix(rows: usize, cols: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |(r, c)| r as f64 * 100.0 + c as f64 + 0.5)
}

fn echo(codec: &TensorCodec, input: &ModelInput) -> Result<Array2<f64>> {
    let tensor = codec.encode(input)?;
    Ok(codec.decode(&InferenceResponse::new("echo", vec![tensor]))?)
}

#[test]
fn round_trip_for_reference_shapes() -> Result<()> {
    let codec = TensorCodec::default();
    for rows in [0, 1, 50] {
        for cols in [1, 5] {
            let a = matrix(rows, cols);
            assert_eq!(echo(&codec, &ModelInput::F64(a.clone()))?, a, "shape ({rows}, {cols})");
        }
    }
    Ok(())
}

#[test]
fn three_by_two_table_decodes_to_itself_not_its_transpose() -> Result<()> {
    let a = matrix(3, 2);
    let table = Table::from_array(&a, &["first", "second"])?;
    let codec = TensorCodec::default();

    let tensor = codec.encode(&ModelInput::Table(table))?;
    assert_eq!(tensor.shape().dims(), &[3, 2]);

    let decoded = codec.decode(&InferenceResponse::new("m", vec![tensor]))?;
    assert_eq!(decoded, a);
    assert_ne!(decoded.view(), a.t());
    Ok(())
}

#[test]
fn six_values_fit_two_by_three_but_five_do_not() {
    let ok = InferTensor::new("out", Shape::from_slice(&[2, 3]), TensorData::F64(vec![1.0; 6]));
    assert!(ok.is_ok());

    let short = InferTensor::new("out", Shape::from_slice(&[2, 3]), TensorData::F64(vec![1.0; 5]));
    assert!(matches!(short, Err(Error::ShapeMismatch { expected: 6, actual: 5, .. })));
}

proptest! {
    #[test]
    fn declared_shape_always_covers_every_value(rows in 0usize..40, cols in 1usize..8) {
        let tensor = TensorCodec::default().encode(&ModelInput::F64(matrix(rows, cols))).unwrap();
        prop_assert_eq!(tensor.shape().dims(), &[rows, cols]);
        prop_assert_eq!(tensor.shape().numel(), rows * cols);
        prop_assert_eq!(tensor.data().len(), rows * cols);
    }

    #[test]
    fn f32_inputs_round_trip_exactly(values in proptest::collection::vec(-1.0e6f32..1.0e6, 1..60)) {
        let cols = 3;
        let rows = values.len() / cols;
        let a = Array2::from_shape_vec((rows, cols), values[..rows * cols].to_vec()).unwrap();
        let decoded = echo(&TensorCodec::default(), &ModelInput::F32(a.clone())).unwrap();
        prop_assert_eq!(decoded, a.mapv(f64::from));
    }
}
