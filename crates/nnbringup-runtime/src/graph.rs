//! Graph compilation: connection resolution, ordering, shape inference
use nnbringup_core::ShapeDescriptor;
use std::collections::{BTreeSet, HashMap};

use crate::description::ModelDescription;
use crate::error::{NetError, Result};

/// Where a layer's data comes from
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Fed from outside with the declared shape
    External(ShapeDescriptor),
    /// Outputs of other layers, by index
    Layers(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub source: Source,
    pub input_dims: Vec<ShapeDescriptor>,
    pub output: ShapeDescriptor,
}

/// Compiled graph. `nodes` is indexed like `ModelDescription::layers`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledGraph {
    pub nodes: Vec<Node>,
    /// Topological order, ties broken by declaration order
    pub order: Vec<usize>,
    pub inputs: Vec<usize>,
    pub outputs: Vec<usize>,
}

impl CompiledGraph {
    pub fn input_dimensions(&self) -> Vec<ShapeDescriptor> {
        self.inputs
            .iter()
            .flat_map(|&i| self.nodes[i].input_dims.first().copied())
            .collect()
    }

    pub fn output_dimensions(&self) -> Vec<ShapeDescriptor> {
        self.outputs.iter().map(|&i| self.nodes[i].output).collect()
    }

    /// Names of the layers feeding `index`
    pub fn input_names<'a>(&self, desc: &'a ModelDescription, index: usize) -> Vec<&'a str> {
        match &self.nodes[index].source {
            Source::External(_) => Vec::new(),
            Source::Layers(ids) => ids.iter().map(|&i| desc.layers[i].name.as_str()).collect(),
        }
    }
}

pub fn compile(desc: &ModelDescription) -> Result<CompiledGraph> {
    if desc.layers.is_empty() {
        return Err(NetError::EmptyModel);
    }
    let batch = desc.training.batch_size;

    let index: HashMap<String, usize> = desc
        .layers
        .iter()
        .enumerate()
        .map(|(i, l)| (l.name.to_ascii_lowercase(), i))
        .collect();

    let mut sources = Vec::with_capacity(desc.layers.len());
    for (i, layer) in desc.layers.iter().enumerate() {
        let source = if layer.is_entry() {
            let [c, h, w] = layer.input_shape.unwrap_or([1, 1, 1]);
            Source::External(ShapeDescriptor::new(batch, c, h, w))
        } else if !layer.input_layers.is_empty() {
            let mut ids = Vec::with_capacity(layer.input_layers.len());
            for name in &layer.input_layers {
                let id = *index.get(&name.to_ascii_lowercase()).ok_or_else(|| {
                    NetError::topology(&layer.name, format!("unknown input layer '{}'", name))
                })?;
                if id == i {
                    return Err(NetError::topology(&layer.name, "layer lists itself as input"));
                }
                ids.push(id);
            }
            Source::Layers(ids)
        } else if i == 0 {
            return Err(NetError::topology(
                &layer.name,
                "first layer has no input; declare input_shape or use an input layer",
            ));
        } else {
            Source::Layers(vec![i - 1])
        };
        sources.push(source);
    }

    let order = topological_order(desc, &sources)?;

    let mut outputs: Vec<Option<ShapeDescriptor>> = vec![None; desc.layers.len()];
    let mut nodes: Vec<Option<Node>> = vec![None; desc.layers.len()];
    for &i in &order {
        let layer = &desc.layers[i];
        let input_dims = match &sources[i] {
            Source::External(dim) => vec![*dim],
            Source::Layers(ids) => ids.iter().flat_map(|&id| outputs[id]).collect(),
        };
        let output = layer.infer(&input_dims)?;
        layer.weights(&input_dims)?;
        tracing::debug!(layer = %layer.name, %output, "shape inferred");
        outputs[i] = Some(output);
        nodes[i] = Some(Node {
            source: sources[i].clone(),
            input_dims,
            output,
        });
    }
    let nodes: Vec<Node> = nodes.into_iter().flatten().collect();

    let mut consumed = vec![false; nodes.len()];
    for node in &nodes {
        if let Source::Layers(ids) = &node.source {
            for &id in ids {
                consumed[id] = true;
            }
        }
    }

    let inputs = (0..nodes.len())
        .filter(|&i| matches!(nodes[i].source, Source::External(_)))
        .collect();
    let outputs = (0..nodes.len()).filter(|&i| !consumed[i]).collect();

    Ok(CompiledGraph {
        nodes,
        order,
        inputs,
        outputs,
    })
}

/// Kahn's algorithm, always taking the earliest declared ready layer
fn topological_order(desc: &ModelDescription, sources: &[Source]) -> Result<Vec<usize>> {
    let n = sources.len();
    let mut pending = vec![0usize; n];
    let mut consumers: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, source) in sources.iter().enumerate() {
        if let Source::Layers(ids) = source {
            pending[i] = ids.len();
            for &id in ids {
                consumers[id].push(i);
            }
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(i) = ready.pop_first() {
        order.push(i);
        for &c in &consumers[i] {
            pending[c] -= 1;
            if pending[c] == 0 {
                ready.insert(c);
            }
        }
    }

    if order.len() < n {
        let stuck = (0..n).find(|&i| pending[i] > 0).unwrap_or(0);
        return Err(NetError::Cycle(desc.layers[stuck].name.clone()));
    }
    Ok(order)
}
