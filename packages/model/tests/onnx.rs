//! Integration tests for the ONNX Runtime classifier with a real model.
//!
//! The model is a tiny `Flatten -> MatMul` graph built in-process: an
//! `[1, 8, 8, 3]` NHWC input mapped to four scores, where the first three
//! scores are the mean of the red, green and blue channels.
//! They are marked #[ignore] by default since they need the ONNX Runtime
//! binaries.
//!
//! Run integration tests:
//! ```sh
//! cargo test --package neuroscan-model --test onnx -- --ignored
//! ```
#![cfg(feature = "onnx")]

use neuroscan_model::image::{DynamicImage, Rgb, RgbImage};
use neuroscan_model::onnx::{OnnxConfig, load};
use neuroscan_model::{InputSize, ModelHandle, TumorClass};
use std::path::{Path, PathBuf};

const SIDE: usize = 8;
const FEATURES: usize = SIDE * SIDE * 3;

fn varint(buf: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        buf.push((v as u8) | 0x80);
        v >>= 7;
    }
    buf.push(v as u8);
}

fn int_field(buf: &mut Vec<u8>, field: u64, v: u64) {
    varint(buf, field << 3);
    varint(buf, v);
}

fn bytes_field(buf: &mut Vec<u8>, field: u64, data: &[u8]) {
    varint(buf, (field << 3) | 2);
    varint(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

fn value_info(name: &str, dims: &[u64]) -> Vec<u8> {
    let mut shape = Vec::new();
    for &d in dims {
        let mut dim = Vec::new();
        int_field(&mut dim, 1, d);
        bytes_field(&mut shape, 1, &dim);
    }
    let mut tensor_type = Vec::new();
    int_field(&mut tensor_type, 1, 1); // FLOAT
    bytes_field(&mut tensor_type, 2, &shape);
    let mut type_proto = Vec::new();
    bytes_field(&mut type_proto, 1, &tensor_type);

    let mut info = Vec::new();
    bytes_field(&mut info, 1, name.as_bytes());
    bytes_field(&mut info, 2, &type_proto);
    info
}

fn node(inputs: &[&str], output: &str, name: &str, op: &str, attrs: &[Vec<u8>]) -> Vec<u8> {
    let mut node = Vec::new();
    for input in inputs {
        bytes_field(&mut node, 1, input.as_bytes());
    }
    bytes_field(&mut node, 2, output.as_bytes());
    bytes_field(&mut node, 3, name.as_bytes());
    bytes_field(&mut node, 4, op.as_bytes());
    for attr in attrs {
        bytes_field(&mut node, 5, attr);
    }
    node
}

/// Weights of the `[FEATURES, 4]` MatMul: channel means for the first three
/// classes, zero for the last.
fn weights() -> Vec<u8> {
    let mut raw = Vec::with_capacity(FEATURES * 4 * 4);
    for i in 0..FEATURES {
        let channel = i % 3;
        for class in 0..4 {
            let w = if class == channel {
                1.0 / (SIDE * SIDE) as f32
            } else {
                0.0
            };
            raw.extend_from_slice(&w.to_le_bytes());
        }
    }
    raw
}

fn channel_mean_model() -> Vec<u8> {
    let mut axis = Vec::new();
    bytes_field(&mut axis, 1, b"axis");
    int_field(&mut axis, 3, 1);
    int_field(&mut axis, 20, 2); // INT

    let mut initializer = Vec::new();
    int_field(&mut initializer, 1, FEATURES as u64);
    int_field(&mut initializer, 1, 4);
    int_field(&mut initializer, 2, 1); // FLOAT
    bytes_field(&mut initializer, 8, b"weights");
    bytes_field(&mut initializer, 9, &weights());

    let mut graph = Vec::new();
    bytes_field(
        &mut graph,
        1,
        &node(&["input"], "flat", "flatten", "Flatten", &[axis]),
    );
    bytes_field(
        &mut graph,
        1,
        &node(&["flat", "weights"], "scores", "classify", "MatMul", &[]),
    );
    bytes_field(&mut graph, 2, b"channel_means");
    bytes_field(&mut graph, 5, &initializer);
    bytes_field(
        &mut graph,
        11,
        &value_info("input", &[1, SIDE as u64, SIDE as u64, 3]),
    );
    bytes_field(&mut graph, 12, &value_info("scores", &[1, 4]));

    let mut opset = Vec::new();
    int_field(&mut opset, 2, 13);

    let mut model = Vec::new();
    int_field(&mut model, 1, 7); // IR version
    bytes_field(&mut model, 2, b"neuroscan-tests");
    bytes_field(&mut model, 7, &graph);
    bytes_field(&mut model, 8, &opset);
    model
}

fn write_model(dir: &Path) -> PathBuf {
    let path = dir.join("model.onnx");
    std::fs::write(&path, channel_mean_model()).expect("Failed to write model");
    path
}

fn solid(color: [u8; 3]) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(40, 30, Rgb(color)))
}

#[test]
#[ignore]
fn declared_input_size_overrides_config() {
    let dir = tempfile::tempdir().unwrap();
    let handle = load(&OnnxConfig {
        model_path: write_model(dir.path()),
        input_size: InputSize::square(128),
        ..Default::default()
    });

    assert!(handle.is_ready(), "model failed to load: {:?}", handle);
    let classifier = handle.classifier().unwrap();
    assert_eq!(classifier.input_size(), InputSize::square(SIDE as u32));
}

#[test]
#[ignore]
fn predicts_from_real_inference() {
    let dir = tempfile::tempdir().unwrap();
    let handle = load(&OnnxConfig {
        model_path: write_model(dir.path()),
        optimization_level: 1,
        intra_threads: Some(1),
        ..Default::default()
    });
    assert!(matches!(handle, ModelHandle::Ready(_)));

    let result = handle.predict(&solid([255, 0, 0])).unwrap();
    assert_eq!(result.probabilities.len(), 4);
    assert!(result.probabilities.values().all(|p| p.is_finite()));
    assert_eq!(result.classification, TumorClass::Glioma);
    assert!((result.confidence - 1.0).abs() < 1e-3);
    assert!(result.probabilities[&TumorClass::Pituitary].abs() < 1e-6);

    let result = handle.predict(&solid([0, 0, 255])).unwrap();
    assert_eq!(result.classification, TumorClass::NoTumor);
}
