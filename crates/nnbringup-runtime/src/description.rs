//! Model Description: the validated content of an INI topology
use nnini::{serialize_ini, IniDocument, IniSection};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{NetError, Result};
use crate::layer::LayerSpec;
use crate::props::Props;

const MODEL_SECTION: &str = "model";
const OPTIMIZER_SECTION: &str = "optimizer";
/// Data sections belong to training, which bring-up does not run
const IGNORED_SECTIONS: &[&str] = &["dataset", "train_set", "valid_set", "test_set"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Loss {
    Mse,
    Cross,
    CrossSoftmax,
    CrossSigmoid,
}

impl fmt::Display for Loss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Mse => "mse",
            Self::Cross => "cross",
            Self::CrossSoftmax => "cross_softmax",
            Self::CrossSigmoid => "cross_sigmoid",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingProps {
    pub epochs: usize,
    pub batch_size: usize,
    pub loss: Option<Loss>,
    pub save_path: Option<String>,
}

impl Default for TrainingProps {
    fn default() -> Self {
        Self {
            epochs: 1,
            batch_size: 1,
            loss: None,
            save_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OptimizerKind {
    Sgd,
    Adam { beta1: f32, beta2: f32, epsilon: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSpec {
    pub kind: OptimizerKind,
    pub learning_rate: f32,
}

impl fmt::Display for OptimizerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OptimizerKind::Sgd => write!(f, "sgd (learning_rate={})", self.learning_rate),
            OptimizerKind::Adam {
                beta1,
                beta2,
                epsilon,
            } => write!(
                f,
                "adam (learning_rate={}, beta1={}, beta2={}, epsilon={})",
                self.learning_rate, beta1, beta2, epsilon
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescription {
    pub training: TrainingProps,
    pub optimizer: Option<OptimizerSpec>,
    /// Layers in declaration order
    pub layers: Vec<LayerSpec>,
    /// blake3 of the normalized document
    pub fingerprint: String,
}

impl ModelDescription {
    pub fn from_document(doc: &IniDocument) -> Result<Self> {
        let mut training = TrainingProps::default();
        let mut optimizer = None;
        let mut layers = Vec::new();

        for section in &doc.sections {
            let key = section.name.to_ascii_lowercase();
            if key == MODEL_SECTION {
                training = parse_model(section)?;
            } else if key == OPTIMIZER_SECTION {
                optimizer = Some(parse_optimizer(section)?);
            } else if IGNORED_SECTIONS.contains(&key.as_str()) {
                tracing::debug!(section = %section.name, "skipping data section");
            } else {
                layers.push(LayerSpec::from_section(section)?);
            }
        }

        let fingerprint = format!("blake3:{}", blake3::hash(serialize_ini(doc).as_bytes()));
        tracing::debug!(layers = layers.len(), %fingerprint, "model description parsed");

        Ok(Self {
            training,
            optimizer,
            layers,
            fingerprint,
        })
    }
}

fn parse_model(section: &IniSection) -> Result<TrainingProps> {
    let props = Props::new(section);
    props.check_known(&[&["type", "epochs", "batch_size", "loss", "save_path"]])?;

    if let Some(ty) = props.str("type") {
        let ty = ty.to_ascii_lowercase();
        if !matches!(ty.as_str(), "neuralnetwork" | "neural_network" | "network") {
            return Err(NetError::property(
                props.name(),
                format!("unsupported model type '{}'", ty),
            ));
        }
    }

    let loss = match props.str("loss").map(str::to_ascii_lowercase).as_deref() {
        None => None,
        Some("mse") => Some(Loss::Mse),
        Some("cross") => Some(Loss::Cross),
        Some("cross_softmax") => Some(Loss::CrossSoftmax),
        Some("cross_sigmoid") => Some(Loss::CrossSigmoid),
        Some(other) => {
            return Err(NetError::property(
                props.name(),
                format!("unknown loss '{}'", other),
            ))
        }
    };

    Ok(TrainingProps {
        epochs: props.positive("epochs")?.unwrap_or(1),
        batch_size: props.positive("batch_size")?.unwrap_or(1),
        loss,
        save_path: props.str("save_path").map(str::to_string),
    })
}

fn parse_optimizer(section: &IniSection) -> Result<OptimizerSpec> {
    let props = Props::new(section);
    props.check_known(&[&["type", "learning_rate", "beta1", "beta2", "epsilon"]])?;

    let learning_rate = props.parse::<f32>("learning_rate")?.unwrap_or(1e-3);
    if learning_rate.is_nan() || learning_rate <= 0.0 {
        return Err(NetError::property(props.name(), "learning_rate must be positive"));
    }

    let kind = match props.required("type")?.to_ascii_lowercase().as_str() {
        "sgd" => OptimizerKind::Sgd,
        "adam" => OptimizerKind::Adam {
            beta1: props.parse::<f32>("beta1")?.unwrap_or(0.9),
            beta2: props.parse::<f32>("beta2")?.unwrap_or(0.999),
            epsilon: props.parse::<f32>("epsilon")?.unwrap_or(1e-7),
        },
        other => {
            return Err(NetError::property(
                props.name(),
                format!("unknown optimizer '{}'", other),
            ))
        }
    };

    Ok(OptimizerSpec {
        kind,
        learning_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nnini::parse_ini;

    fn describe(text: &str) -> Result<ModelDescription> {
        ModelDescription::from_document(&parse_ini(text).unwrap())
    }

    #[test]
    fn test_model_and_optimizer() {
        let desc = describe(
            "[Model]\nType = NeuralNetwork\nEpochs = 3\nBatch_Size = 16\nLoss = cross\n\
             [Optimizer]\nType = adam\nLearning_rate = 0.01\n\
             [DataSet]\nBufferSize = 100\n\
             [in]\nType = input\nInput_Shape = 1:1:4\n",
        )
        .unwrap();

        assert_eq!(desc.training.batch_size, 16);
        assert_eq!(desc.training.epochs, 3);
        assert_eq!(desc.training.loss, Some(Loss::Cross));
        let optimizer = desc.optimizer.unwrap();
        assert_eq!(optimizer.learning_rate, 0.01);
        assert!(matches!(optimizer.kind, OptimizerKind::Adam { .. }));
        assert_eq!(desc.layers.len(), 1);
        assert!(desc.fingerprint.starts_with("blake3:"));
    }

    #[test]
    fn test_defaults_without_model_section() {
        let desc = describe("[in]\nType = input\nInput_Shape = 1:1:4\n").unwrap();
        assert_eq!(desc.training, TrainingProps::default());
        assert!(desc.optimizer.is_none());
    }

    #[test]
    fn test_rejections() {
        assert!(describe("[Model]\nType = knn\n").is_err());
        assert!(describe("[Model]\nBatch_Size = 0\n").is_err());
        assert!(describe("[Model]\nLoss = hinge\n").is_err());
        assert!(describe("[Optimizer]\nType = rmsprop\n").is_err());
        assert!(describe("[Optimizer]\nType = sgd\nLearning_rate = -1\n").is_err());
        assert!(describe("[Model]\nColour = red\n").is_err());
    }

    #[test]
    fn test_learning_rate_must_be_a_positive_number() {
        for value in ["0", "NaN", "-inf"] {
            let err = describe(&format!("[Optimizer]\nType = sgd\nLearning_rate = {}\n", value))
                .unwrap_err();
            assert!(err.to_string().contains("learning_rate must be positive"), "{}: {}", value, err);
        }
    }

    #[test]
    fn test_fingerprint_ignores_formatting() {
        let a = describe("[in]\nType = input\nInput_Shape = 1:1:4\n").unwrap();
        let b = describe("; comment\n[in]\n  type=input ; x\ninput_shape = 1:1:4").unwrap();
        let c = describe("[in]\nType = input\nInput_Shape = 1:1:5\n").unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_ne!(a.fingerprint, c.fingerprint);
    }
}
