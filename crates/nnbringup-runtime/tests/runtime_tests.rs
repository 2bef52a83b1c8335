//! Integration tests for the reference runtime against the INI fixtures.

use std::io::Write;
use std::path::PathBuf;

use nnbringup_core::{
    ModelFormat, ModelHandle, ModelKind, ModelRuntime, RuntimeError, Seed, ShapeDescriptor,
    SummaryLevel,
};
use nnbringup_runtime::{NeuralNetRuntime, NeuralNetwork};

/// Fixture directory relative to the workspace root
const FIXTURES: &str = "testing/fixtures/models";

fn fixture(name: &str) -> PathBuf {
    let manifest_dir = std::env::var("CARGO_MANIFEST_DIR").unwrap();
    let workspace_root = PathBuf::from(manifest_dir)
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .to_path_buf();
    workspace_root.join(FIXTURES).join(name)
}

fn loaded(name: &str) -> Result<NeuralNetwork, RuntimeError> {
    let mut model = NeuralNetRuntime::new().create_model(ModelKind::NeuralNet)?;
    model.load(&fixture(name), ModelFormat::Ini)?;
    Ok(model)
}

fn ready(name: &str, seed: u64) -> NeuralNetwork {
    let mut model = loaded(name).unwrap();
    model.compile().unwrap();
    model.initialize(Seed(seed)).unwrap();
    model
}

fn summary(model: &NeuralNetwork, level: SummaryLevel) -> String {
    let mut out = Vec::new();
    model.summarize(&mut out, level).unwrap();
    String::from_utf8(out).unwrap()
}

fn param_counts(model: &NeuralNetwork) -> (usize, usize) {
    model.weights().fold((0, 0), |(total, trainable), t| {
        let n = t.data.len();
        (total + n, trainable + if t.trainable { n } else { 0 })
    })
}

// =============================================================================
// Shapes
// =============================================================================

#[test]
fn test_cifar_shapes() {
    let model = ready("cifar_cnn.ini", 1);

    assert_eq!(
        model.input_dimensions(),
        vec![ShapeDescriptor::new(1, 3, 32, 32)]
    );
    assert_eq!(
        model.output_dimensions(),
        vec![ShapeDescriptor::new(1, 10, 1, 1)]
    );
    assert_eq!(param_counts(&model), (25_578, 25_578));
}

#[test]
fn test_mlp_batch_and_params() {
    let model = ready("mnist_mlp.ini", 1);

    assert_eq!(
        model.input_dimensions(),
        vec![ShapeDescriptor::new(32, 1, 28, 28)]
    );
    assert_eq!(
        model.output_dimensions(),
        vec![ShapeDescriptor::new(32, 10, 1, 1)]
    );
    assert_eq!(param_counts(&model), (102_282, 102_026));
}

#[test]
fn test_multiple_inputs_and_outputs() {
    let model = ready("two_towers.ini", 1);

    assert_eq!(
        model.input_dimensions(),
        vec![
            ShapeDescriptor::new(4, 1, 8, 8),
            ShapeDescriptor::new(4, 1, 8, 8),
        ]
    );
    assert_eq!(
        model.output_dimensions(),
        vec![
            ShapeDescriptor::new(4, 5, 1, 1),
            ShapeDescriptor::new(4, 1, 1, 1),
        ]
    );
    assert_eq!(param_counts(&model), (166, 101));
}

#[test]
fn test_dimensions_empty_before_initialize() {
    let mut model = loaded("cifar_cnn.ini").unwrap();
    assert!(model.input_dimensions().is_empty());
    model.compile().unwrap();
    assert!(model.output_dimensions().is_empty());
}

// =============================================================================
// Stage failures
// =============================================================================

#[test]
fn test_missing_file_fails_to_load() {
    let err = loaded("does_not_exist.ini").unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("failed to read"), "got {}", message);
    assert!(message.contains("does_not_exist.ini"));
}

#[test]
fn test_load_errors() {
    let malformed = loaded("malformed.ini").unwrap_err();
    assert!(matches!(malformed, RuntimeError::InvalidConfig(_)));
    assert!(malformed.to_string().contains("line 3"));

    let unknown = loaded("unknown_layer.ini").unwrap_err();
    assert_eq!(
        unknown.to_string(),
        "invalid configuration: [rnn] unknown layer type 'lstm'"
    );
}

#[test]
fn test_compile_errors() {
    let mut cyclic = loaded("cyclic.ini").unwrap();
    let err = cyclic.compile().unwrap_err();
    assert!(err.to_string().contains("cycle"), "got {}", err);

    let mut mismatch = loaded("shape_mismatch.ini").unwrap();
    let err = mismatch.compile().unwrap_err();
    assert!(err.to_string().contains("layer 'sum'"), "got {}", err);
}

#[test]
#[cfg(target_pointer_width = "64")]
fn test_oversized_shape_fails_to_compile() {
    let mut model = loaded("oversized.ini").unwrap();
    let err = model.compile().unwrap_err();

    assert!(matches!(err, RuntimeError::InvalidConfig(_)), "got {:?}", err);
    assert!(err.to_string().contains("layer 'in'"), "got {}", err);
    assert!(err.to_string().contains("overflows"), "got {}", err);
    assert!(model.graph().is_none());
}

#[test]
#[cfg(target_pointer_width = "64")]
fn test_unallocatable_weights_fail_to_initialize() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.ini");
    std::fs::write(
        &path,
        "[in]\nType = input\nInput_Shape = 1:1:2147483648\n\
         [fc]\nType = fc\nUnit = 2147483648\n",
    )
    .unwrap();

    let mut model = NeuralNetRuntime::new()
        .create_model(ModelKind::NeuralNet)
        .unwrap();
    model.load(&path, ModelFormat::Ini).unwrap();
    model.compile().unwrap();

    let err = model.initialize(Seed(1)).unwrap_err();
    assert!(
        err.to_string().starts_with("cannot allocate tensor 'fc:weight'"),
        "got {}",
        err
    );
    assert!(!model.is_initialized());
    assert!(model.graph().is_some());
}

#[test]
fn test_out_of_order_calls_are_rejected() {
    let runtime = NeuralNetRuntime::new();

    let mut model = runtime.create_model(ModelKind::NeuralNet).unwrap();
    assert!(matches!(model.compile(), Err(RuntimeError::InvalidState(_))));
    assert!(matches!(
        model.initialize(Seed(0)),
        Err(RuntimeError::InvalidState(_))
    ));
    assert!(matches!(
        model.summarize(&mut Vec::new(), SummaryLevel::Model),
        Err(RuntimeError::InvalidState(_))
    ));

    let mut model = loaded("cifar_cnn.ini").unwrap();
    assert!(matches!(
        model.load(&fixture("cifar_cnn.ini"), ModelFormat::Ini),
        Err(RuntimeError::InvalidState(_))
    ));
    assert!(matches!(
        model.initialize(Seed(0)),
        Err(RuntimeError::InvalidState(_))
    ));
    model.compile().unwrap();
    model.initialize(Seed(0)).unwrap();
    assert!(matches!(
        model.initialize(Seed(0)),
        Err(RuntimeError::InvalidState(_))
    ));
}

#[test]
fn test_failed_compile_keeps_model_loaded() {
    let mut model = loaded("shape_mismatch.ini").unwrap();
    assert!(model.compile().is_err());
    assert!(model.description().is_some());
    assert!(model.graph().is_none());
    assert!(model.compile().is_err());
}

// =============================================================================
// Initialization and summaries
// =============================================================================

#[test]
fn test_same_seed_same_weights() {
    let a = ready("cifar_cnn.ini", 1234);
    let b = ready("cifar_cnn.ini", 1234);
    let c = ready("cifar_cnn.ini", 4321);

    assert!(a.weights().eq(b.weights()));
    assert!(!a.weights().eq(c.weights()));
}

#[test]
fn test_layer_summary() {
    let model = ready("cifar_cnn.ini", 1);
    let text = summary(&model, SummaryLevel::Layer);

    for name in ["inputlayer", "conv1", "pool1", "conv2", "pool2", "flatten", "outputlayer"] {
        assert!(text.contains(name), "missing {}", name);
    }
    assert!(text.contains("1:16:32:32"));
    assert!(text.contains("filters=16 kernel=3x3 stride=1x1 padding=same activation=relu"));
    let conv1 = text.lines().find(|l| l.starts_with("conv1")).unwrap();
    assert!(conv1.trim_end().ends_with("448"));
}

#[test]
fn test_model_summary() {
    let model = ready("mnist_mlp.ini", 77);
    let text = summary(&model, SummaryLevel::Model);

    assert!(text.contains("Batch size            : 32"));
    assert!(text.contains("Loss                  : cross_softmax"));
    assert!(text.contains("Optimizer             : sgd (learning_rate=0.01)"));
    assert!(text.contains("Total parameters      : 102282"));
    assert!(text.contains("Non-trainable params  : 256"));
    assert!(text.contains("Initialization seed   : 77"));
    assert!(text.contains("Topology              : blake3:"));
}

#[test]
fn test_tensor_summary() {
    let model = ready("two_towers.ini", 5);
    let text = summary(&model, SummaryLevel::Tensor);

    assert!(text.contains("features:filter"));
    assert!(text.contains("aux:weight"));
    assert!(text.contains("merged:output"));
    assert!(text.contains("Weight bytes          : 664"));
}

#[test]
fn test_summary_write_failure() {
    struct Closed;
    impl Write for Closed {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let model = ready("cifar_cnn.ini", 1);
    let err = model.summarize(&mut Closed, SummaryLevel::Tensor).unwrap_err();
    assert!(matches!(err, RuntimeError::Io(_)));
}

#[test]
fn test_load_from_scratch_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.ini");
    std::fs::write(&path, "[x]\nType = fc\nUnit = 2\nInput_Shape = 1:1:3\n").unwrap();

    let mut model = NeuralNetRuntime::new()
        .create_model(ModelKind::NeuralNet)
        .unwrap();
    model.load(&path, ModelFormat::Ini).unwrap();
    model.compile().unwrap();
    model.initialize(Seed(3)).unwrap();

    assert_eq!(
        model.output_dimensions(),
        vec![ShapeDescriptor::new(1, 2, 1, 1)]
    );
    assert_eq!(param_counts(&model), (8, 8));
}
