//! NeuralNetwork: the model handle driven through load → compile → initialize
use nnbringup_core::{
    ModelFormat, ModelHandle, ModelKind, RuntimeError, Seed, ShapeDescriptor, SummaryLevel,
};
use nnini::parse_ini;
use std::io::Write;
use std::path::Path;

use crate::description::ModelDescription;
use crate::error::{NetError, Result};
use crate::graph::{self, CompiledGraph};
use crate::summary::SummaryView;
use crate::tensor::{Tensor, WeightAllocator};

#[derive(Debug, Default)]
enum State {
    #[default]
    Empty,
    Loaded {
        desc: ModelDescription,
    },
    Compiled {
        desc: ModelDescription,
        graph: CompiledGraph,
    },
    Initialized {
        desc: ModelDescription,
        graph: CompiledGraph,
        weights: Vec<Vec<Tensor>>,
        seed: Seed,
    },
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Loaded { .. } => "loaded",
            Self::Compiled { .. } => "compiled",
            Self::Initialized { .. } => "initialized",
        }
    }
}

#[derive(Debug)]
pub struct NeuralNetwork {
    kind: ModelKind,
    state: State,
}

impl NeuralNetwork {
    pub fn new(kind: ModelKind) -> Self {
        Self {
            kind,
            state: State::Empty,
        }
    }

    pub fn description(&self) -> Option<&ModelDescription> {
        match &self.state {
            State::Empty => None,
            State::Loaded { desc }
            | State::Compiled { desc, .. }
            | State::Initialized { desc, .. } => Some(desc),
        }
    }

    pub fn graph(&self) -> Option<&CompiledGraph> {
        match &self.state {
            State::Compiled { graph, .. } | State::Initialized { graph, .. } => Some(graph),
            _ => None,
        }
    }

    /// All weight tensors in layer declaration order
    pub fn weights(&self) -> impl Iterator<Item = &Tensor> {
        let layers: &[Vec<Tensor>] = match &self.state {
            State::Initialized { weights, .. } => weights,
            _ => &[],
        };
        layers.iter().flatten()
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.state, State::Initialized { .. })
    }

    /// Parse a topology from text; `load` reads the file and calls this
    pub fn load_str(&mut self, text: &str) -> Result<()> {
        if !matches!(self.state, State::Empty) {
            return Err(NetError::State(format!(
                "model already {}, load is only valid once",
                self.state.name()
            )));
        }
        let doc = parse_ini(text)?;
        let desc = ModelDescription::from_document(&doc)?;
        self.state = State::Loaded { desc };
        Ok(())
    }

    fn compile_graph(&mut self) -> Result<()> {
        match std::mem::take(&mut self.state) {
            State::Loaded { desc } => match graph::compile(&desc) {
                Ok(graph) => {
                    tracing::debug!(
                        layers = desc.layers.len(),
                        inputs = graph.inputs.len(),
                        outputs = graph.outputs.len(),
                        "graph compiled"
                    );
                    self.state = State::Compiled { desc, graph };
                    Ok(())
                }
                Err(e) => {
                    self.state = State::Loaded { desc };
                    Err(e)
                }
            },
            other => {
                let name = other.name();
                self.state = other;
                Err(NetError::State(format!(
                    "compile requires a loaded model, model is {}",
                    name
                )))
            }
        }
    }

    fn initialize_weights(&mut self, seed: Seed) -> Result<()> {
        match std::mem::take(&mut self.state) {
            State::Compiled { desc, graph } => {
                let weights = match allocate_weights(&desc, &graph, seed) {
                    Ok(weights) => weights,
                    Err(e) => {
                        self.state = State::Compiled { desc, graph };
                        return Err(e);
                    }
                };
                tracing::debug!(
                    %seed,
                    tensors = weights.iter().map(Vec::len).sum::<usize>(),
                    "weights initialized"
                );
                self.state = State::Initialized {
                    desc,
                    graph,
                    weights,
                    seed,
                };
                Ok(())
            }
            other => {
                let name = other.name();
                self.state = other;
                Err(NetError::State(format!(
                    "initialize requires a compiled model, model is {}",
                    name
                )))
            }
        }
    }
}

fn allocate_weights(
    desc: &ModelDescription,
    graph: &CompiledGraph,
    seed: Seed,
) -> Result<Vec<Vec<Tensor>>> {
    let mut allocator = WeightAllocator::new(seed);
    let mut weights = vec![Vec::new(); desc.layers.len()];
    for &i in &graph.order {
        weights[i] = desc.layers[i]
            .weights(&graph.nodes[i].input_dims)?
            .iter()
            .map(|spec| allocator.allocate(spec))
            .collect::<Result<_>>()?;
    }
    Ok(weights)
}

impl ModelHandle for NeuralNetwork {
    fn load(&mut self, path: &Path, format: ModelFormat) -> std::result::Result<(), RuntimeError> {
        match format {
            ModelFormat::Ini => {}
            other => {
                return Err(NetError::Unsupported(format!("model format {:?}", other)).into())
            }
        }
        let text = std::fs::read_to_string(path).map_err(|source| NetError::Read {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bytes = text.len(), "loading topology");
        Ok(self.load_str(&text)?)
    }

    fn compile(&mut self) -> std::result::Result<(), RuntimeError> {
        Ok(self.compile_graph()?)
    }

    fn initialize(&mut self, seed: Seed) -> std::result::Result<(), RuntimeError> {
        Ok(self.initialize_weights(seed)?)
    }

    fn input_dimensions(&self) -> Vec<ShapeDescriptor> {
        match &self.state {
            State::Initialized { graph, .. } => graph.input_dimensions(),
            _ => Vec::new(),
        }
    }

    fn output_dimensions(&self) -> Vec<ShapeDescriptor> {
        match &self.state {
            State::Initialized { graph, .. } => graph.output_dimensions(),
            _ => Vec::new(),
        }
    }

    fn summarize(
        &self,
        sink: &mut dyn Write,
        level: SummaryLevel,
    ) -> std::result::Result<(), RuntimeError> {
        match &self.state {
            State::Initialized {
                desc,
                graph,
                weights,
                seed,
            } => {
                let view = SummaryView {
                    kind: self.kind,
                    desc,
                    graph,
                    weights,
                    seed: *seed,
                };
                view.write(sink, level)?;
                Ok(())
            }
            other => Err(NetError::State(format!(
                "summarize requires an initialized model, model is {}",
                other.name()
            ))
            .into()),
        }
    }
}
