//! Layer kinds: property parsing, shape inference and weight declarations
use nnbringup_core::ShapeDescriptor;
use nnini::IniSection;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{NetError, Result};
use crate::props::Props;

/// Properties every layer section may carry
const COMMON_KEYS: &[&str] = &[
    "type",
    "input_layers",
    "input_shape",
    "activation",
    "trainable",
    "weight_initializer",
    "bias_initializer",
    "disable_bias",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayerType {
    Input,
    FullyConnected,
    Conv2d,
    Pooling2d,
    Flatten,
    Activation,
    BatchNormalization,
    Dropout,
    Addition,
    Concat,
}

static LAYER_TYPES: Lazy<HashMap<&'static str, LayerType>> = Lazy::new(|| {
    HashMap::from([
        ("input", LayerType::Input),
        ("fully_connected", LayerType::FullyConnected),
        ("fc", LayerType::FullyConnected),
        ("conv2d", LayerType::Conv2d),
        ("pooling2d", LayerType::Pooling2d),
        ("flatten", LayerType::Flatten),
        ("activation", LayerType::Activation),
        ("batch_normalization", LayerType::BatchNormalization),
        ("bn", LayerType::BatchNormalization),
        ("dropout", LayerType::Dropout),
        ("addition", LayerType::Addition),
        ("concat", LayerType::Concat),
    ])
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    None,
    Relu,
    LeakyRelu,
    Sigmoid,
    Tanh,
    Softmax,
}

impl Activation {
    fn parse(section: &str, raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "relu" => Ok(Self::Relu),
            "leaky_relu" => Ok(Self::LeakyRelu),
            "sigmoid" => Ok(Self::Sigmoid),
            "tanh" => Ok(Self::Tanh),
            "softmax" => Ok(Self::Softmax),
            _ => Err(NetError::property(
                section,
                format!("unknown activation '{}'", raw),
            )),
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Relu => "relu",
            Self::LeakyRelu => "leaky_relu",
            Self::Sigmoid => "sigmoid",
            Self::Tanh => "tanh",
            Self::Softmax => "softmax",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Initializer {
    Zeros,
    Ones,
    XavierUniform,
    HeUniform,
    LecunUniform,
}

impl Initializer {
    fn parse(section: &str, raw: &str) -> Result<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "zeros" => Ok(Self::Zeros),
            "ones" => Ok(Self::Ones),
            "xavier_uniform" => Ok(Self::XavierUniform),
            "he_uniform" => Ok(Self::HeUniform),
            "lecun_uniform" => Ok(Self::LecunUniform),
            _ => Err(NetError::property(
                section,
                format!("unknown initializer '{}'", raw),
            )),
        }
    }
}

impl fmt::Display for Initializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Zeros => "zeros",
            Self::Ones => "ones",
            Self::XavierUniform => "xavier_uniform",
            Self::HeUniform => "he_uniform",
            Self::LecunUniform => "lecun_uniform",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    Valid,
    Same,
    Explicit(usize, usize),
}

impl Padding {
    fn parse(props: &Props<'_>) -> Result<Self> {
        match props.str("padding") {
            None => Ok(Self::Valid),
            Some(raw) if raw.eq_ignore_ascii_case("valid") => Ok(Self::Valid),
            Some(raw) if raw.eq_ignore_ascii_case("same") => Ok(Self::Same),
            Some(_) => {
                let (h, w) = props.pair("padding")?.unwrap_or((0, 0));
                Ok(Self::Explicit(h, w))
            }
        }
    }

    /// Output extent along one axis (0 = height, 1 = width); `None` when the
    /// padded extent overflows
    fn apply(&self, axis: usize, input: usize, kernel: usize, stride: usize) -> Option<usize> {
        let pad = match self {
            Self::Valid => 0,
            Self::Same => return Some(input.div_ceil(stride)),
            Self::Explicit(h, w) => (if axis == 0 { *h } else { *w }).checked_mul(2)?,
        };
        match input.checked_add(pad)?.checked_sub(kernel) {
            Some(span) => Some(span / stride + 1),
            None => Some(0),
        }
    }
}

impl fmt::Display for Padding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid => f.write_str("valid"),
            Self::Same => f.write_str("same"),
            Self::Explicit(h, w) => write!(f, "{}x{}", h, w),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pooling {
    Max,
    Average,
    GlobalMax,
    GlobalAverage,
}

impl Pooling {
    fn is_global(&self) -> bool {
        matches!(self, Self::GlobalMax | Self::GlobalAverage)
    }
}

impl fmt::Display for Pooling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Max => "max",
            Self::Average => "average",
            Self::GlobalMax => "global_max",
            Self::GlobalAverage => "global_average",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LayerKind {
    Input {
        normalization: bool,
        standardization: bool,
    },
    FullyConnected {
        unit: usize,
    },
    Conv2d {
        filters: usize,
        kernel: (usize, usize),
        stride: (usize, usize),
        padding: Padding,
    },
    Pooling2d {
        pooling: Pooling,
        pool_size: (usize, usize),
        stride: (usize, usize),
        padding: Padding,
    },
    Flatten,
    Activation,
    BatchNormalization {
        momentum: f32,
        epsilon: f32,
    },
    Dropout {
        rate: f32,
    },
    Addition,
    Concat {
        axis: usize,
    },
}

impl LayerKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Input { .. } => "input",
            Self::FullyConnected { .. } => "fully_connected",
            Self::Conv2d { .. } => "conv2d",
            Self::Pooling2d { .. } => "pooling2d",
            Self::Flatten => "flatten",
            Self::Activation => "activation",
            Self::BatchNormalization { .. } => "batch_normalization",
            Self::Dropout { .. } => "dropout",
            Self::Addition => "addition",
            Self::Concat { .. } => "concat",
        }
    }

    /// Accepted number of incoming connections. Entry layers receive their
    /// declared shape as the single incoming one.
    fn arity(&self) -> (usize, usize) {
        match self {
            Self::Addition | Self::Concat { .. } => (2, usize::MAX),
            _ => (1, 1),
        }
    }

    fn parse(ty: LayerType, props: &Props<'_>) -> Result<Self> {
        let section = props.name();
        let kind = match ty {
            LayerType::Input => {
                props.check_known(&[COMMON_KEYS, &["normalization", "standardization"]])?;
                Self::Input {
                    normalization: props.bool("normalization")?.unwrap_or(false),
                    standardization: props.bool("standardization")?.unwrap_or(false),
                }
            }
            LayerType::FullyConnected => {
                props.check_known(&[COMMON_KEYS, &["unit"]])?;
                props.required("unit")?;
                Self::FullyConnected {
                    unit: props.positive("unit")?.unwrap_or(1),
                }
            }
            LayerType::Conv2d => {
                props.check_known(&[COMMON_KEYS, &["filters", "kernel_size", "stride", "padding"]])?;
                props.required("filters")?;
                props.required("kernel_size")?;
                Self::Conv2d {
                    filters: props.positive("filters")?.unwrap_or(1),
                    kernel: nonzero(section, "kernel_size", props.pair("kernel_size")?)?,
                    stride: nonzero(section, "stride", props.pair("stride")?)?,
                    padding: Padding::parse(props)?,
                }
            }
            LayerType::Pooling2d => {
                props.check_known(&[COMMON_KEYS, &["pooling", "pool_size", "stride", "padding"]])?;
                let pooling = match props.required("pooling")?.to_ascii_lowercase().as_str() {
                    "max" => Pooling::Max,
                    "average" => Pooling::Average,
                    "global_max" => Pooling::GlobalMax,
                    "global_average" => Pooling::GlobalAverage,
                    other => {
                        return Err(NetError::property(
                            section,
                            format!("unknown pooling '{}'", other),
                        ))
                    }
                };
                if !pooling.is_global() {
                    props.required("pool_size")?;
                }
                Self::Pooling2d {
                    pooling,
                    pool_size: nonzero(section, "pool_size", props.pair("pool_size")?)?,
                    stride: nonzero(section, "stride", props.pair("stride")?)?,
                    padding: Padding::parse(props)?,
                }
            }
            LayerType::Flatten => {
                props.check_known(&[COMMON_KEYS])?;
                Self::Flatten
            }
            LayerType::Activation => {
                props.check_known(&[COMMON_KEYS])?;
                props.required("activation")?;
                Self::Activation
            }
            LayerType::BatchNormalization => {
                props.check_known(&[COMMON_KEYS, &["momentum", "epsilon"]])?;
                let momentum = props.parse::<f32>("momentum")?.unwrap_or(0.99);
                let epsilon = props.parse::<f32>("epsilon")?.unwrap_or(0.001);
                if !(0.0..=1.0).contains(&momentum) || epsilon <= 0.0 {
                    return Err(NetError::property(
                        section,
                        "momentum must be in [0, 1] and epsilon positive",
                    ));
                }
                Self::BatchNormalization { momentum, epsilon }
            }
            LayerType::Dropout => {
                props.check_known(&[COMMON_KEYS, &["dropout_rate"]])?;
                let rate = props.parse::<f32>("dropout_rate")?.unwrap_or(0.0);
                if !(0.0..1.0).contains(&rate) {
                    return Err(NetError::property(section, "dropout_rate must be in [0, 1)"));
                }
                Self::Dropout { rate }
            }
            LayerType::Addition => {
                props.check_known(&[COMMON_KEYS])?;
                Self::Addition
            }
            LayerType::Concat => {
                props.check_known(&[COMMON_KEYS, &["axis"]])?;
                let axis = props.parse::<usize>("axis")?.unwrap_or(1);
                if !(1..=3).contains(&axis) {
                    return Err(NetError::property(section, "axis must be 1, 2 or 3"));
                }
                Self::Concat { axis }
            }
        };
        Ok(kind)
    }
}

fn nonzero(
    section: &str,
    key: &str,
    value: Option<(usize, usize)>,
) -> Result<(usize, usize)> {
    match value {
        None => Ok((1, 1)),
        Some((h, w)) if h > 0 && w > 0 => Ok((h, w)),
        Some(_) => Err(NetError::property(
            section,
            format!("'{}' must be greater than zero", key),
        )),
    }
}

/// A weight tensor a layer needs once its input shapes are known
#[derive(Debug, Clone, PartialEq)]
pub struct WeightSpec {
    pub name: String,
    pub dim: ShapeDescriptor,
    pub initializer: Initializer,
    pub trainable: bool,
    pub fan_in: usize,
    pub fan_out: usize,
}

/// One layer section, validated
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSpec {
    pub name: String,
    pub kind: LayerKind,
    pub input_layers: Vec<String>,
    /// Declared (channel, height, width) for graph entry points
    pub input_shape: Option<[usize; 3]>,
    pub activation: Activation,
    pub trainable: bool,
    pub weight_initializer: Initializer,
    pub bias_initializer: Initializer,
    pub disable_bias: bool,
}

impl LayerSpec {
    pub fn from_section(section: &IniSection) -> Result<Self> {
        let props = Props::new(section);
        let name = section.name.clone();

        let raw_type = props.required("type")?;
        let ty = LAYER_TYPES
            .get(raw_type.to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| {
                NetError::property(&name, format!("unknown layer type '{}'", raw_type))
            })?;
        let kind = LayerKind::parse(ty, &props)?;

        let input_shape = match props.shape("input_shape")? {
            Some((Some(batch), shape)) => {
                tracing::warn!(
                    layer = %name,
                    batch,
                    "batch in input_shape is ignored, the model batch size applies"
                );
                Some(shape)
            }
            Some((None, shape)) => Some(shape),
            None => None,
        };
        let input_layers = props.list("input_layers");

        if matches!(kind, LayerKind::Input { .. }) {
            if input_shape.is_none() {
                return Err(NetError::property(&name, "missing required property 'input_shape'"));
            }
            if !input_layers.is_empty() {
                return Err(NetError::property(&name, "input layers cannot have input_layers"));
            }
        } else if input_shape.is_some() && !input_layers.is_empty() {
            return Err(NetError::property(
                &name,
                "input_shape and input_layers are mutually exclusive",
            ));
        }

        let activation = match props.str("activation") {
            Some(raw) => Activation::parse(&name, raw)?,
            None => Activation::None,
        };
        if kind == LayerKind::Activation && activation == Activation::None {
            return Err(NetError::property(&name, "activation layer needs an activation"));
        }

        Ok(Self {
            kind,
            input_layers,
            input_shape,
            activation,
            trainable: props.bool("trainable")?.unwrap_or(true),
            weight_initializer: match props.str("weight_initializer") {
                Some(raw) => Initializer::parse(&name, raw)?,
                None => Initializer::XavierUniform,
            },
            bias_initializer: match props.str("bias_initializer") {
                Some(raw) => Initializer::parse(&name, raw)?,
                None => Initializer::Zeros,
            },
            disable_bias: props.bool("disable_bias")?.unwrap_or(false),
            name,
        })
    }

    /// Hyperparameters in `key=value` form, for reports
    pub fn describe(&self) -> String {
        let mut parts = match &self.kind {
            LayerKind::Input {
                normalization,
                standardization,
            } => vec![
                format!("normalization={}", normalization),
                format!("standardization={}", standardization),
            ],
            LayerKind::FullyConnected { unit } => vec![format!("unit={}", unit)],
            LayerKind::Conv2d {
                filters,
                kernel,
                stride,
                padding,
            } => vec![
                format!("filters={}", filters),
                format!("kernel={}x{}", kernel.0, kernel.1),
                format!("stride={}x{}", stride.0, stride.1),
                format!("padding={}", padding),
            ],
            LayerKind::Pooling2d {
                pooling,
                pool_size,
                stride,
                padding,
            } if !pooling.is_global() => vec![
                format!("pooling={}", pooling),
                format!("pool_size={}x{}", pool_size.0, pool_size.1),
                format!("stride={}x{}", stride.0, stride.1),
                format!("padding={}", padding),
            ],
            LayerKind::Pooling2d { pooling, .. } => vec![format!("pooling={}", pooling)],
            LayerKind::BatchNormalization { momentum, epsilon } => vec![
                format!("momentum={}", momentum),
                format!("epsilon={}", epsilon),
            ],
            LayerKind::Dropout { rate } => vec![format!("dropout_rate={}", rate)],
            LayerKind::Concat { axis } => vec![format!("axis={}", axis)],
            LayerKind::Flatten | LayerKind::Activation | LayerKind::Addition => Vec::new(),
        };
        if self.activation != Activation::None {
            parts.push(format!("activation={}", self.activation));
        }
        if !self.trainable {
            parts.push("trainable=false".to_string());
        }
        parts.join(" ")
    }

    /// Whether this layer is fed from outside the graph
    pub fn is_entry(&self) -> bool {
        matches!(self.kind, LayerKind::Input { .. })
            || (self.input_shape.is_some() && self.input_layers.is_empty())
    }

    /// Output shape from the shapes of the incoming connections
    pub fn infer(&self, inputs: &[ShapeDescriptor]) -> Result<ShapeDescriptor> {
        let (min, max) = self.kind.arity();
        let count = inputs.len();
        if count < min || count > max {
            return Err(NetError::shape(
                &self.name,
                format!(
                    "{} takes {} input(s), got {}",
                    self.kind.type_name(),
                    if min == max { min.to_string() } else { format!("at least {}", min) },
                    count
                ),
            ));
        }

        let out = match &self.kind {
            LayerKind::Input { .. }
            | LayerKind::Activation
            | LayerKind::BatchNormalization { .. }
            | LayerKind::Dropout { .. } => inputs[0],
            LayerKind::FullyConnected { unit } => {
                let x = inputs[0];
                ShapeDescriptor::new(x.batch, *unit, 1, 1)
            }
            LayerKind::Conv2d {
                filters,
                kernel,
                stride,
                padding,
            } => {
                let x = inputs[0];
                let h = padding.apply(0, x.height, kernel.0, stride.0);
                let w = padding.apply(1, x.width, kernel.1, stride.1);
                match (h, w) {
                    (Some(h), Some(w)) => ShapeDescriptor::new(x.batch, *filters, h, w),
                    _ => return Err(self.overflow(&x)),
                }
            }
            LayerKind::Pooling2d {
                pooling,
                pool_size,
                stride,
                padding,
            } => {
                let x = inputs[0];
                if pooling.is_global() {
                    ShapeDescriptor::new(x.batch, x.channel, 1, 1)
                } else {
                    let h = padding.apply(0, x.height, pool_size.0, stride.0);
                    let w = padding.apply(1, x.width, pool_size.1, stride.1);
                    match (h, w) {
                        (Some(h), Some(w)) => ShapeDescriptor::new(x.batch, x.channel, h, w),
                        _ => return Err(self.overflow(&x)),
                    }
                }
            }
            LayerKind::Flatten => {
                let x = inputs[0];
                let features = x.feature_len().ok_or_else(|| self.overflow(&x))?;
                ShapeDescriptor::new(x.batch, features, 1, 1)
            }
            LayerKind::Addition => {
                let first = inputs[0];
                if let Some(other) = inputs.iter().find(|d| **d != first) {
                    return Err(NetError::shape(
                        &self.name,
                        format!("addition of mismatched shapes {} and {}", first, other),
                    ));
                }
                first
            }
            LayerKind::Concat { axis } => concat(&self.name, inputs, *axis)?,
        };

        if out.is_empty() {
            return Err(NetError::shape(
                &self.name,
                format!("{} produces an empty output {}", self.kind.type_name(), out),
            ));
        }
        if out.len().is_none() {
            return Err(self.overflow(&out));
        }
        Ok(out)
    }

    fn overflow(&self, shape: &ShapeDescriptor) -> NetError {
        NetError::shape(
            &self.name,
            format!("{} overflows on dimensions {}", self.kind.type_name(), shape),
        )
    }

    /// Weights this layer owns, given its (already validated) input shapes.
    /// Fails when a weight's element count does not fit in `usize`.
    pub fn weights(&self, inputs: &[ShapeDescriptor]) -> Result<Vec<WeightSpec>> {
        let mut specs = Vec::new();
        let mut push = |suffix: &str,
                        dim: ShapeDescriptor,
                        initializer: Initializer,
                        trainable: bool,
                        fans: (usize, usize)| {
            specs.push(WeightSpec {
                name: format!("{}:{}", self.name, suffix),
                dim,
                initializer,
                trainable: trainable && self.trainable,
                fan_in: fans.0,
                fan_out: fans.1,
            });
        };

        match &self.kind {
            LayerKind::FullyConnected { unit } => {
                let in_features = inputs[0]
                    .feature_len()
                    .ok_or_else(|| self.overflow(&inputs[0]))?;
                push(
                    "weight",
                    ShapeDescriptor::new(1, 1, in_features, *unit),
                    self.weight_initializer,
                    true,
                    (in_features, *unit),
                );
                if !self.disable_bias {
                    push(
                        "bias",
                        ShapeDescriptor::new(1, 1, 1, *unit),
                        self.bias_initializer,
                        true,
                        (in_features, *unit),
                    );
                }
            }
            LayerKind::Conv2d {
                filters, kernel, ..
            } => {
                let channels = inputs[0].channel;
                let receptive = kernel.0 * kernel.1;
                let fans = (channels * receptive, filters * receptive);
                push(
                    "filter",
                    ShapeDescriptor::new(*filters, channels, kernel.0, kernel.1),
                    self.weight_initializer,
                    true,
                    fans,
                );
                if !self.disable_bias {
                    push(
                        "bias",
                        ShapeDescriptor::new(1, *filters, 1, 1),
                        self.bias_initializer,
                        true,
                        fans,
                    );
                }
            }
            LayerKind::BatchNormalization { .. } => {
                let dim = ShapeDescriptor::new(1, inputs[0].channel, 1, 1);
                let fans = (dim.channel, dim.channel);
                push("gamma", dim, Initializer::Ones, true, fans);
                push("beta", dim, Initializer::Zeros, true, fans);
                push("moving_mean", dim, Initializer::Zeros, false, fans);
                push("moving_variance", dim, Initializer::Ones, false, fans);
            }
            _ => {}
        }

        if let Some(spec) = specs.iter().find(|spec| spec.dim.len().is_none()) {
            return Err(NetError::shape(
                &self.name,
                format!("weight '{}' overflows on dimensions {}", spec.name, spec.dim),
            ));
        }
        Ok(specs)
    }
}

fn concat(name: &str, inputs: &[ShapeDescriptor], axis: usize) -> Result<ShapeDescriptor> {
    let axes = |d: &ShapeDescriptor| [d.batch, d.channel, d.height, d.width];
    let first = axes(&inputs[0]);
    let mut out = first;
    for dim in &inputs[1..] {
        let other = axes(dim);
        for i in 0..4 {
            if i != axis && other[i] != first[i] {
                return Err(NetError::shape(
                    name,
                    format!(
                        "concat along axis {} of incompatible shapes {} and {}",
                        axis, inputs[0], dim
                    ),
                ));
            }
        }
        out[axis] = out[axis].checked_add(other[axis]).ok_or_else(|| {
            NetError::shape(name, format!("concat along axis {} overflows", axis))
        })?;
    }
    Ok(ShapeDescriptor::new(out[0], out[1], out[2], out[3]))
}
