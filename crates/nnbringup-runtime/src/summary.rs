//! Text reports at layer, model and tensor granularity
use nnbringup_core::{ModelKind, Seed, SummaryLevel};
use std::io::{self, Write};

use crate::description::ModelDescription;
use crate::graph::CompiledGraph;
use crate::tensor::{Tensor, ELEMENT_BYTES};

const WIDTH: usize = 96;

/// Borrowed view over an initialized model
pub struct SummaryView<'a> {
    pub kind: ModelKind,
    pub desc: &'a ModelDescription,
    pub graph: &'a CompiledGraph,
    /// Weights per layer, indexed like the description's layers
    pub weights: &'a [Vec<Tensor>],
    pub seed: Seed,
}

impl SummaryView<'_> {
    pub fn write(&self, sink: &mut dyn Write, level: SummaryLevel) -> io::Result<()> {
        match level {
            SummaryLevel::Layer => self.layers(sink),
            SummaryLevel::Model => self.model(sink),
            SummaryLevel::Tensor => self.tensors(sink),
        }
    }

    fn layer_params(&self, index: usize) -> usize {
        self.weights[index].iter().map(|t| t.data.len()).sum()
    }

    fn param_totals(&self) -> (usize, usize) {
        self.weights
            .iter()
            .flatten()
            .fold((0, 0), |(total, trainable), t| {
                let n = t.data.len();
                (total + n, if t.trainable { trainable + n } else { trainable })
            })
    }

    fn layers(&self, w: &mut dyn Write) -> io::Result<()> {
        rule(w, '=')?;
        writeln!(
            w,
            "{:<20}{:<22}{:<20}{:<22}{:>12}",
            "Layer name", "Layer type", "Output dimension", "Input layer", "Params"
        )?;
        rule(w, '=')?;

        for (row, &i) in self.graph.order.iter().enumerate() {
            if row > 0 {
                rule(w, '-')?;
            }
            let layer = &self.desc.layers[i];
            let inputs = self.graph.input_names(self.desc, i).join(", ");
            writeln!(
                w,
                "{:<20}{:<22}{:<20}{:<22}{:>12}",
                layer.name,
                layer.kind.type_name(),
                self.graph.nodes[i].output.to_string(),
                inputs,
                self.layer_params(i)
            )?;
            let details = layer.describe();
            if !details.is_empty() {
                writeln!(w, "{:<20}{}", "", details)?;
            }
        }
        rule(w, '=')
    }

    fn model(&self, w: &mut dyn Write) -> io::Result<()> {
        let (total, trainable) = self.param_totals();
        let training = &self.desc.training;

        rule(w, '=')?;
        field(w, "Model type", &self.kind)?;
        field(w, "Layers", &self.desc.layers.len())?;
        field(
            w,
            "Inputs / outputs",
            &format!("{} / {}", self.graph.inputs.len(), self.graph.outputs.len()),
        )?;
        field(w, "Batch size", &training.batch_size)?;
        field(w, "Epochs", &training.epochs)?;
        match &training.loss {
            Some(loss) => field(w, "Loss", loss)?,
            None => field(w, "Loss", &"none")?,
        }
        match &self.desc.optimizer {
            Some(opt) => field(w, "Optimizer", opt)?,
            None => field(w, "Optimizer", &"none")?,
        }
        if let Some(path) = &training.save_path {
            field(w, "Save path", path)?;
        }
        field(w, "Total parameters", &total)?;
        field(w, "Trainable params", &trainable)?;
        field(w, "Non-trainable params", &(total - trainable))?;
        field(w, "Initialization seed", &self.seed)?;
        field(w, "Topology", &self.desc.fingerprint)?;
        rule(w, '=')
    }

    fn tensors(&self, w: &mut dyn Write) -> io::Result<()> {
        rule(w, '=')?;
        writeln!(
            w,
            "{:<28}{:<16}{:<16}{:<11}{:<15}{:>10}",
            "Weight", "Dimension", "Initializer", "Trainable", "Range", "Bytes"
        )?;
        rule(w, '=')?;

        let mut weight_bytes = 0;
        for &i in &self.graph.order {
            for tensor in &self.weights[i] {
                let (lo, hi) = tensor.range();
                writeln!(
                    w,
                    "{:<28}{:<16}{:<16}{:<11}{:<15}{:>10}",
                    tensor.name,
                    tensor.dim.to_string(),
                    tensor.initializer.to_string(),
                    tensor.trainable,
                    format!("[{:.3}, {:.3}]", lo, hi),
                    tensor.bytes()
                )?;
                weight_bytes += tensor.bytes();
            }
        }

        rule(w, '-')?;
        writeln!(w, "{:<28}{:<16}{:>52}", "Activation", "Dimension", "Bytes")?;
        rule(w, '-')?;

        let mut activation_bytes = 0;
        for &i in &self.graph.order {
            let output = self.graph.nodes[i].output;
            let bytes = output
                .len()
                .map_or(usize::MAX, |n| n.saturating_mul(ELEMENT_BYTES));
            writeln!(
                w,
                "{:<28}{:<16}{:>52}",
                format!("{}:output", self.desc.layers[i].name),
                output.to_string(),
                bytes
            )?;
            activation_bytes = bytes.saturating_add(activation_bytes);
        }

        rule(w, '=')?;
        field(w, "Weight bytes", &weight_bytes)?;
        field(w, "Activation bytes", &activation_bytes)?;
        rule(w, '=')
    }
}

fn rule(w: &mut dyn Write, c: char) -> io::Result<()> {
    writeln!(w, "{}", c.to_string().repeat(WIDTH))
}

fn field(w: &mut dyn Write, label: &str, value: &dyn std::fmt::Display) -> io::Result<()> {
    writeln!(w, "{:<22}: {}", label, value)
}
