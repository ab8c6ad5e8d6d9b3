use chanlast_core::internal::*;
use chanlast_core::ops::cnn::{AvgPool, Conv, KernelFormat, MaxPool, MaxPoolV8, PoolSpec};
use chanlast_core::ops::nn::DataFormat;
use chanlast_core::ops::{ElementWiseOp, Transpose};
use chanlast_core::transform::get_transform;

mod utils;

use crate::utils::*;

fn transpose(model: &Model, name: &str) -> TVec<usize> {
    match &model.node_by_name(name).unwrap().op {
        Op::Transpose(Transpose { perm }) => perm.clone(),
        op => panic!("{name} is a {op}, expected a Transpose"),
    }
}

fn conv_model(input: ShapeFactoid, weights_shape: &[usize], bias: bool) -> Model {
    let mut model = Model::default();
    let input = model.add_source("input", f32::fact(input)).unwrap();
    let weights = model.add_const("weights", Tensor::zero::<f32>(weights_shape)).unwrap();
    let mut inputs = vec![input, weights];
    if bias {
        inputs.push(model.add_const("bias", Tensor::zero::<f32>(&weights_shape[..1])).unwrap());
    }
    let conv = Conv::new(PoolSpec::nchw(weights_shape[2..].into()), KernelFormat::OIHW);
    let conv = model.wire_node("conv", conv, &inputs).unwrap();
    model.set_output_outlets(&conv).unwrap();
    model
}

fn max_pool_v8_model(input: ShapeFactoid, axis: i64) -> Model {
    let mut model = Model::default();
    let input = model.add_source("input", f32::fact(input)).unwrap();
    let spec = PoolSpec::nchw(tvec!(2, 2)).with_strides(tvec!(2, 2));
    let pool = model.wire_node("pool", MaxPoolV8::new(spec, DatumType::I64, axis), &[input]).unwrap();
    let relu = model.wire_node("relu", ElementWiseOp::Relu, &[pool[0]]).unwrap();
    model.set_output_outlets(&[relu[0], pool[1]]).unwrap();
    model
}

#[test]
fn convolution_scenario() {
    setup_test_logger();
    let mut model = conv_model(shapefactoid![1, 3, 8, 8], &[16, 3, 3, 3], false);
    assert_eq!(ConvertLayout::default().run(&mut model).unwrap(), 1);
    model.check_edges().unwrap();

    assert_eq!(&*transpose(&model, "conv.to_channel_last"), &[0, 2, 3, 1]);
    assert_eq!(&*transpose(&model, "conv.weights.to_channel_last"), &[0, 2, 3, 1]);
    assert_eq!(&*transpose(&model, "conv"), &[0, 3, 1, 2]);

    let input = model.node_by_name("input").unwrap().id;
    let weights = model.node_by_name("weights").unwrap().id;
    let to_nhwc = model.node_by_name("conv.to_channel_last").unwrap();
    assert_eq!(to_nhwc.inputs, vec!(OutletId::new(input, 0)));
    assert_eq!(to_nhwc.outputs[0].fact, f32::fact([1, 8, 8, 3]));
    let weights_to_ohwi = model.node_by_name("conv.weights.to_channel_last").unwrap();
    assert_eq!(weights_to_ohwi.inputs, vec!(OutletId::new(weights, 0)));

    let conv = model.node_by_name("conv.channel_last").unwrap();
    let Op::Conv(op) = &conv.op else { panic!("expected a Conv, got {}", conv.op) };
    assert_eq!(op.pool_spec.data_format, DataFormat::NHWC);
    assert_eq!(op.kernel_fmt, KernelFormat::OHWI);
    assert_eq!(&*op.pool_spec.kernel_shape, &[3, 3]);
    assert_eq!(conv.inputs, vec!(OutletId::new(to_nhwc.id, 0), OutletId::new(weights_to_ohwi.id, 0)));
    assert_eq!(conv.outputs[0].fact, f32::fact([1, 6, 6, 16]));

    let output = model.node_by_name("conv").unwrap();
    assert_eq!(output.inputs, vec!(OutletId::new(conv.id, 0)));
    assert_eq!(model.output_outlets().unwrap(), &[OutletId::new(output.id, 0)]);
    assert_eq!(*model.output_fact(0).unwrap(), f32::fact([1, 16, 6, 6]));
    assert_eq!(model.nodes().len(), 6);
}

#[test]
fn convolution_preserves_geometry() {
    let mut model = Model::default();
    let input = model.add_source("input", f32::fact([1, 2, 9, 9, 9])).unwrap();
    let weights = model.add_const("weights", Tensor::zero::<f32>(&[4, 2, 2, 3, 2])).unwrap();
    let spec = PoolSpec::nchw(tvec!(2, 3, 2))
        .with_strides(tvec!(2, 1, 3))
        .with_dilations(tvec!(1, 2, 1))
        .with_pads(tvec!(0, 1, 1), tvec!(1, 1, 0));
    let conv = model.wire_node("conv", Conv::new(spec.clone(), KernelFormat::OIHW), &[input, weights]).unwrap();
    model.set_output_outlets(&conv).unwrap();
    let before = model.output_fact(0).unwrap().clone();
    assert_eq!(ConvertLayout::default().run(&mut model).unwrap(), 1);
    let Op::Conv(op) = &model.node_by_name("conv.channel_last").unwrap().op else { panic!() };
    assert_eq!(op.pool_spec, spec.with_data_format(DataFormat::NHWC));
    assert_eq!(&*transpose(&model, "conv"), &[0, 4, 1, 2, 3]);
    assert_eq!(*model.output_fact(0).unwrap(), before);
}

#[test]
fn bias_is_passed_through() {
    let mut model = conv_model(shapefactoid![1, 3, 8, 8], &[16, 3, 3, 3], true);
    assert_eq!(ConvertLayout::default().run(&mut model).unwrap(), 1);
    let bias = model.node_by_name("bias").unwrap().id;
    let conv = model.node_by_name("conv.channel_last").unwrap();
    assert_eq!(conv.inputs.len(), 3);
    assert_eq!(conv.inputs[2], OutletId::new(bias, 0));
    assert!(model.nodes().iter().all(|n| !n.name.starts_with("conv.bias")));
}

#[test]
fn rank_gating() {
    setup_test_logger();
    for (input, weights) in [
        (shapefactoid![1, 3, 8], vec![4usize, 3, 3]),
        (shapefactoid![1, 3, 4, 4, 4, 4], vec![4, 3, 2, 2, 2, 2]),
        (shapefactoid![..], vec![4, 3, 3, 3]),
    ] {
        let mut model = conv_model(input, &weights, false);
        let before = format!("{model}");
        assert_eq!(ConvertLayout::default().run(&mut model).unwrap(), 0);
        assert_eq!(format!("{model}"), before);
    }
    let mut model = Model::default();
    let input = model.add_source("input", f32::fact(shapefactoid![..])).unwrap();
    let pool = model.wire_node("pool", AvgPool::new(PoolSpec::nchw(tvec!(2, 2)), true), &[input]).unwrap();
    model.set_output_outlets(&pool).unwrap();
    assert_eq!(ConvertLayout::default().run(&mut model).unwrap(), 0);
}

#[test]
fn pool_rank_gating() {
    setup_test_logger();
    for (input, kernel) in
        [(shapefactoid![1, 3, 8], tvec!(2)), (shapefactoid![1, 3, 4, 4, 4, 4], tvec!(2, 2, 2, 2))]
    {
        let spec = PoolSpec::nchw(kernel);
        let pools: [Op; 3] = [
            MaxPool::new(spec.clone()).into(),
            MaxPoolV8::new(spec.clone(), DatumType::I64, 0).into(),
            AvgPool::new(spec, false).into(),
        ];
        for pool in pools {
            let mut model = Model::default();
            let source = model.add_source("input", f32::fact(input.clone())).unwrap();
            let pool = model.wire_node("pool", pool, &[source]).unwrap();
            model.set_output_outlets(&pool).unwrap();
            let before = format!("{model}");
            assert_eq!(ConvertLayout::default().run(&mut model).unwrap(), 0, "{before}");
            assert_eq!(format!("{model}"), before);
        }
    }
}

#[test]
fn veto_leaves_graph_untouched() {
    let mut model = conv_model(shapefactoid![1, 3, 8, 8], &[16, 3, 3, 3], true);
    let before = format!("{model}");
    let convert = ConvertLayout::default().with_veto(|node| node.name == "conv");
    assert_eq!(convert.run(&mut model).unwrap(), 0);
    assert_eq!(format!("{model}"), before);
}

#[test]
fn max_pool_v8_outputs() {
    setup_test_logger();
    let mut model = max_pool_v8_model(shapefactoid![1, 3, 8, 8], 0);
    assert_eq!(ConvertLayout::default().run(&mut model).unwrap(), 1);
    model.check_edges().unwrap();
    assert!(model.node_by_name("pool").is_err());
    assert_eq!(&*transpose(&model, "pool.0"), &[0, 3, 1, 2]);
    assert_eq!(&*transpose(&model, "pool.1"), &[0, 3, 1, 2]);

    let pool = model.node_by_name("pool.channel_last").unwrap();
    assert_eq!(pool.outputs[0].fact, f32::fact([1, 4, 4, 3]));
    assert_eq!(pool.outputs[1].fact, i64::fact([1, 4, 4, 3]));
    let Op::MaxPoolV8(op) = &pool.op else { panic!() };
    assert_eq!(op.axis, 0);
    assert_eq!(op.index_element_type, DatumType::I64);

    let values = model.node_by_name("pool.0").unwrap();
    let indices = model.node_by_name("pool.1").unwrap();
    assert_eq!(values.inputs, vec!(OutletId::new(pool.id, 0)));
    assert_eq!(indices.inputs, vec!(OutletId::new(pool.id, 1)));
    let relu = model.node_by_name("relu").unwrap();
    assert_eq!(relu.inputs, vec!(OutletId::new(values.id, 0)));
    assert_eq!(model.output_outlets().unwrap()[1], OutletId::new(indices.id, 0));
    assert_eq!(*model.output_fact(1).unwrap(), i64::fact([1, 3, 4, 4]));
}

#[test]
fn max_pool_v8_axis_guard() {
    for (rank, axis, rewritten) in [
        (4, 0, 1),
        (4, 1, 1),
        (4, 2, 0),
        (4, 3, 0),
        (4, -4, 1),
        (4, -5, 0),
        (5, -6, 0),
        (5, -5, 1),
    ] {
        let shape: ShapeFactoid = if rank == 4 { shapefactoid![1, 3, 8, 8] } else { shapefactoid![1, 3, 8, 8, 8] };
        let mut model = Model::default();
        let input = model.add_source("input", f32::fact(shape)).unwrap();
        let spec = PoolSpec::nchw(tvec!(2; rank - 2));
        let pool = model.wire_node("pool", MaxPoolV8::new(spec, DatumType::I32, axis), &[input]).unwrap();
        model.set_output_outlets(&pool).unwrap();
        assert_eq!(ConvertLayout::default().run(&mut model).unwrap(), rewritten, "rank {rank}, axis {axis}");
    }
}

// -1 is in range for the guard but designates the last spatial axis, not
// the batch or channel axis.
#[test]
fn max_pool_v8_last_axis_is_rewritten() {
    let mut model = max_pool_v8_model(shapefactoid![1, 3, 8, 8], -1);
    assert_eq!(ConvertLayout::default().run(&mut model).unwrap(), 1);
    let Op::MaxPoolV8(op) = &model.node_by_name("pool.channel_last").unwrap().op else { panic!() };
    assert_eq!(op.axis, -1);
}

#[test]
fn pools() {
    let mut model = Model::default();
    let input = model.add_source("input", f32::fact(shapefactoid![_, 3, 8, 8])).unwrap();
    let spec = PoolSpec::nchw(tvec!(3, 3)).with_pads(tvec!(1, 1), tvec!(1, 1));
    let max = model.wire_node("max", MaxPool::new(spec.clone()), &[input]).unwrap();
    let avg = model.wire_node("avg", AvgPool::new(spec, true), &max).unwrap();
    model.set_output_outlets(&avg).unwrap();
    assert_eq!(ConvertLayout::default().run(&mut model).unwrap(), 2);
    assert_eq!(model.node_by_name("max.channel_last").unwrap().outputs[0].fact, f32::fact(shapefactoid![_, 8, 8, 3]));
    let Op::AvgPool(avg) = &model.node_by_name("avg.channel_last").unwrap().op else { panic!() };
    assert!(avg.exclude_pad);
    assert_eq!(avg.pool_spec.data_format, DataFormat::NHWC);
    let to_nhwc = model.node_by_name("avg.to_channel_last").unwrap();
    assert_eq!(to_nhwc.inputs, vec!(OutletId::new(model.node_by_name("max").unwrap().id, 0)));
    assert_eq!(*model.output_fact(0).unwrap(), f32::fact(shapefactoid![_, 3, 8, 8]));
}

#[test]
fn second_pass_is_a_no_op() {
    let mut model = conv_model(shapefactoid![1, 3, 8, 8], &[16, 3, 3, 3], true);
    assert_eq!(ConvertLayout::default().run(&mut model).unwrap(), 1);
    let once = format!("{model}");
    assert_eq!(ConvertLayout::default().run(&mut model).unwrap(), 0);
    assert_eq!(format!("{model}"), once);
}

#[test]
fn runtime_info_is_copied() {
    let mut model = max_pool_v8_model(shapefactoid![1, 3, 8, 8], 1);
    model.node_by_name_mut("pool").unwrap().rt_info.insert("origin", "maxpool_1");
    assert_eq!(ConvertLayout::default().run(&mut model).unwrap(), 1);
    for name in ["pool.to_channel_last", "pool.channel_last", "pool.0", "pool.1"] {
        assert_eq!(model.node_by_name(name).unwrap().rt_info.get("origin"), Some("maxpool_1"), "{name}");
    }
    assert!(model.node_by_name("relu").unwrap().rt_info.is_empty());
}

#[test]
fn derived_names_are_unique() {
    let mut model = conv_model(shapefactoid![1, 3, 8, 8], &[16, 3, 3, 3], false);
    let output = model.output_outlets().unwrap()[0];
    let relu = model.wire_node("conv.channel_last", ElementWiseOp::Relu, &[output]).unwrap();
    model.set_output_outlets(&relu).unwrap();
    assert_eq!(ConvertLayout::default().run(&mut model).unwrap(), 1);
    assert_eq!(model.node_by_name("conv.channel_last").unwrap().op, Op::ElementWise(ElementWiseOp::Relu));
    assert!(matches!(model.node_by_name("conv.channel_last.1").unwrap().op, Op::Conv(_)));
}

fn two_convs() -> Model {
    let mut model = Model::default();
    let input = model.add_source("input", f32::fact([1, 3, 10, 10])).unwrap();
    let w1 = model.add_const("w1", Tensor::zero::<f32>(&[16, 3, 3, 3])).unwrap();
    let w2 = model.add_const("w2", Tensor::zero::<f32>(&[4, 16, 3, 3])).unwrap();
    let conv1 = Conv::new(PoolSpec::nchw(tvec!(3, 3)), KernelFormat::OIHW);
    let conv1 = model.wire_node("conv1", conv1, &[input, w1]).unwrap();
    let conv2 = Conv::new(PoolSpec::nchw(tvec!(3, 3)), KernelFormat::OIHW);
    let conv2 = model.wire_node("conv2", conv2, &[conv1[0], w2]).unwrap();
    model.set_output_outlets(&conv2).unwrap();
    model
}

#[test]
fn transform_filters() {
    let mut model = two_convs();
    get_transform("convert-layout!=conv1").unwrap().transform(&mut model).unwrap();
    assert!(matches!(model.node_by_name("conv1").unwrap().op, Op::Conv(_)));
    assert!(matches!(model.node_by_name("conv2").unwrap().op, Op::Transpose(_)));

    let mut model = two_convs();
    get_transform("convert-layout==conv1").unwrap().transform(&mut model).unwrap();
    assert!(matches!(model.node_by_name("conv1").unwrap().op, Op::Transpose(_)));
    assert!(matches!(model.node_by_name("conv2").unwrap().op, Op::Conv(_)));

    let model = two_convs();
    let converted = get_transform("convert-layout").unwrap().transform_into(&model).unwrap();
    assert!(matches!(model.node_by_name("conv2").unwrap().op, Op::Conv(_)));
    assert!(matches!(converted.node_by_name("conv2").unwrap().op, Op::Transpose(_)));
    assert_eq!(converted.nodes().iter().filter(|n| matches!(n.op, Op::Transpose(_))).count(), 6);

    for filter in ["convert-layout!=", "convert-layout!=,", "convert-layout!= , conv2"] {
        let mut model = two_convs();
        get_transform(filter).unwrap().transform(&mut model).unwrap();
        assert!(matches!(model.node_by_name("conv1").unwrap().op, Op::Transpose(_)), "{filter}");
    }
    let mut model = two_convs();
    get_transform("convert-layout==,").unwrap().transform(&mut model).unwrap();
    assert!(matches!(model.node_by_name("conv2").unwrap().op, Op::Transpose(_)));
}
