use approx::assert_abs_diff_eq;
use chanlast_core::internal::*;
use chanlast_core::ops::cnn::{AutoPad, AvgPool, Conv, KernelFormat, MaxPool, MaxPoolV8, PoolSpec, RoundingType};
use chanlast_core::ops::ElementWiseOp;
use proptest::prelude::*;

mod utils;

use crate::utils::*;

fn tensor(shape: &[usize], seed: usize) -> Tensor {
    let len = shape.iter().product();
    let data: Vec<f32> = (0..len).map(|i| ((i * 7919 + seed) % 31) as f32 / 8.0 - 2.0).collect();
    Tensor::from_shape(shape, &data).unwrap()
}

/// Runs the model before and after conversion and compares the outputs.
fn check_equivalence(model: Model, inputs: TVec<Tensor>, rewrites: usize) {
    setup_test_logger();
    let expected = SimplePlan::new(&model).unwrap().run(inputs.clone()).unwrap();
    let mut converted = model.clone();
    assert_eq!(ConvertLayout::default().run(&mut converted).unwrap(), rewrites);
    converted.check_edges().unwrap();
    let found = SimplePlan::new(&converted).unwrap().run(inputs).unwrap();
    assert_eq!(found.len(), expected.len());
    for (found, expected) in found.iter().zip(expected.iter()) {
        assert_eq!(found.datum_type(), expected.datum_type());
        if found.datum_type().is_float() {
            assert_abs_diff_eq!(
                found.to_array_view::<f32>().unwrap(),
                expected.to_array_view::<f32>().unwrap(),
                epsilon = 1e-5
            );
        } else {
            assert_eq!(found, expected);
        }
    }
}

fn conv_model(input: &[usize], weights: Tensor, bias: Option<Tensor>, spec: PoolSpec) -> Model {
    let mut model = Model::default();
    let source = model.add_source("input", f32::fact(input)).unwrap();
    let mut inputs = vec![source, model.add_const("weights", weights).unwrap()];
    if let Some(bias) = bias {
        inputs.push(model.add_const("bias", bias).unwrap());
    }
    let conv = model.wire_node("conv", Conv::new(spec, KernelFormat::OIHW), &inputs).unwrap();
    model.set_output_outlets(&conv).unwrap();
    model
}

fn pool_model(input: &[usize], op: impl Into<Op>) -> Model {
    let mut model = Model::default();
    let source = model.add_source("input", f32::fact(input)).unwrap();
    model.wire_node("pool", op, &[source]).unwrap();
    model.auto_outputs().unwrap();
    model
}

#[test]
fn conv_2d() {
    let spec = PoolSpec::nchw(tvec!(3, 2))
        .with_strides(tvec!(2, 1))
        .with_dilations(tvec!(1, 2))
        .with_pads(tvec!(1, 0), tvec!(1, 2));
    let model = conv_model(&[2, 3, 7, 6], tensor(&[5, 3, 3, 2], 1), Some(tensor(&[5], 2)), spec);
    check_equivalence(model, tvec!(tensor(&[2, 3, 7, 6], 0)), 1);
}

#[test]
fn conv_2d_same_lower() {
    let spec = PoolSpec::nchw(tvec!(3, 3)).with_strides(tvec!(2, 2)).with_auto_pad(AutoPad::SameLower);
    let model = conv_model(&[1, 2, 6, 5], tensor(&[4, 2, 3, 3], 3), None, spec);
    check_equivalence(model, tvec!(tensor(&[1, 2, 6, 5], 4)), 1);
}

#[test]
fn conv_3d() {
    let spec = PoolSpec::nchw(tvec!(2, 2, 3)).with_auto_pad(AutoPad::SameUpper);
    let model = conv_model(&[1, 2, 4, 5, 6], tensor(&[3, 2, 2, 2, 3], 5), Some(tensor(&[3], 6)), spec);
    check_equivalence(model, tvec!(tensor(&[1, 2, 4, 5, 6], 7)), 1);
}

#[test]
fn max_pool_v1() {
    let spec = PoolSpec::nchw(tvec!(3, 3)).with_strides(tvec!(2, 2)).with_rounding_type(RoundingType::Ceil);
    let model = pool_model(&[2, 3, 8, 7], MaxPool::new(spec));
    check_equivalence(model, tvec!(tensor(&[2, 3, 8, 7], 8)), 1);
}

#[test]
fn max_pool_v8_2d() {
    for axis in [0, 1, -1, -4] {
        let spec = PoolSpec::nchw(tvec!(2, 3)).with_dilations(tvec!(2, 1)).with_pads(tvec!(1, 1), tvec!(0, 1));
        let model = pool_model(&[2, 3, 6, 6], MaxPoolV8::new(spec, DatumType::I64, axis));
        check_equivalence(model, tvec!(tensor(&[2, 3, 6, 6], 9)), 1);
    }
}

#[test]
fn max_pool_v8_3d() {
    let spec = PoolSpec::nchw(tvec!(2, 2, 2))
        .with_strides(tvec!(2, 2, 2))
        .with_rounding_type(RoundingType::Ceil);
    let model = pool_model(&[1, 4, 5, 4, 3], MaxPoolV8::new(spec, DatumType::I32, 1));
    check_equivalence(model, tvec!(tensor(&[1, 4, 5, 4, 3], 10)), 1);
}

#[test]
fn avg_pool() {
    for exclude_pad in [false, true] {
        let spec = PoolSpec::nchw(tvec!(3, 3)).with_auto_pad(AutoPad::SameUpper).with_strides(tvec!(2, 1));
        let model = pool_model(&[1, 3, 5, 5], AvgPool::new(spec, exclude_pad));
        check_equivalence(model, tvec!(tensor(&[1, 3, 5, 5], 11)), 1);
        let spec = PoolSpec::nchw(tvec!(2, 2, 2)).with_pads(tvec!(1, 0, 1), tvec!(0, 1, 1));
        let model = pool_model(&[2, 2, 3, 4, 5], AvgPool::new(spec, exclude_pad));
        check_equivalence(model, tvec!(tensor(&[2, 2, 3, 4, 5], 12)), 1);
    }
}

#[test]
fn chain() {
    let mut model = Model::default();
    let input = model.add_source("input", f32::fact([1, 3, 9, 9])).unwrap();
    let weights = model.add_const("weights", tensor(&[8, 3, 3, 3], 13)).unwrap();
    let bias = model.add_const("bias", tensor(&[8], 14)).unwrap();
    let conv = Conv::new(PoolSpec::nchw(tvec!(3, 3)), KernelFormat::OIHW);
    let conv = model.wire_node("conv", conv, &[input, weights, bias]).unwrap();
    let relu = model.wire_node("relu", ElementWiseOp::Relu, &conv).unwrap();
    let spec = PoolSpec::nchw(tvec!(2, 2)).with_strides(tvec!(2, 2));
    let pool = model.wire_node("pool", MaxPoolV8::new(spec.clone(), DatumType::I64, 0), &relu).unwrap();
    let avg = model.wire_node("avg", AvgPool::new(spec, false), &[pool[0]]).unwrap();
    model.set_output_outlets(&[avg[0], pool[1]]).unwrap();
    check_equivalence(model, tvec!(tensor(&[1, 3, 9, 9], 15)), 3);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn conv_equivalence(
        batch in 1usize..3,
        channels in 1usize..4,
        filters in 1usize..4,
        hw in proptest::collection::vec(3usize..7, 2..=3),
        kernel in 1usize..3,
        stride in 1usize..3,
        seed in 0usize..31,
    ) {
        let rank = hw.len() + 2;
        let mut input = vec![batch, channels];
        input.extend(hw.iter().copied());
        let mut weights = vec![filters, channels];
        weights.extend(std::iter::repeat_n(kernel, rank - 2));
        let spec = PoolSpec::nchw(tvec!(kernel; rank - 2)).with_strides(tvec!(stride; rank - 2));
        let model = conv_model(&input, tensor(&weights, seed), None, spec);
        check_equivalence(model, tvec!(tensor(&input, seed + 1)), 1);
    }

    #[test]
    fn avg_pool_equivalence(
        hw in proptest::collection::vec(2usize..6, 2..=3),
        kernel in 1usize..3,
        pad in 0usize..2,
        exclude_pad in any::<bool>(),
        ceil in any::<bool>(),
    ) {
        let rank = hw.len() + 2;
        let mut input = vec![1, 2];
        input.extend(hw.iter().copied());
        let rounding = if ceil { RoundingType::Ceil } else { RoundingType::Floor };
        let spec = PoolSpec::nchw(tvec!(kernel; rank - 2))
            .with_strides(tvec!(2; rank - 2))
            .with_pads(tvec!(pad; rank - 2), tvec!(pad; rank - 2))
            .with_rounding_type(rounding);
        let model = pool_model(&input, AvgPool::new(spec, exclude_pad));
        check_equivalence(model, tvec!(tensor(&input, 0)), 1);
    }
}
