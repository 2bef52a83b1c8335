//! Weight tensors: allocation and seeded initialization
use nnbringup_core::{Seed, ShapeDescriptor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{NetError, Result};
use crate::layer::{Initializer, WeightSpec};

pub const ELEMENT_BYTES: usize = std::mem::size_of::<f32>();

#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub name: String,
    pub dim: ShapeDescriptor,
    pub initializer: Initializer,
    pub trainable: bool,
    pub data: Vec<f32>,
}

impl Tensor {
    pub fn bytes(&self) -> usize {
        self.data.len() * ELEMENT_BYTES
    }

    /// (min, max) of the values; (0, 0) when empty
    pub fn range(&self) -> (f32, f32) {
        if self.data.is_empty() {
            return (0.0, 0.0);
        }
        self.data
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}

/// Allocates tensors from one RNG stream so equal seeds give equal weights
pub struct WeightAllocator {
    rng: StdRng,
}

impl WeightAllocator {
    pub fn new(seed: Seed) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed.0),
        }
    }

    /// Reserve and fill one tensor. Fails instead of aborting when the
    /// tensor cannot be allocated.
    pub fn allocate(&mut self, spec: &WeightSpec) -> Result<Tensor> {
        let len = spec.dim.len().ok_or_else(|| NetError::Allocation {
            tensor: spec.name.clone(),
            message: format!("element count of {} overflows", spec.dim),
        })?;
        let mut data: Vec<f32> = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|e| NetError::Allocation {
                tensor: spec.name.clone(),
                message: format!("{} elements: {}", len, e),
            })?;

        match spec.initializer {
            Initializer::Zeros => data.resize(len, 0.0),
            Initializer::Ones => data.resize(len, 1.0),
            Initializer::XavierUniform => {
                let fans = spec.fan_in.saturating_add(spec.fan_out).max(1);
                self.uniform(&mut data, len, (6.0 / fans as f32).sqrt())
            }
            Initializer::HeUniform => {
                self.uniform(&mut data, len, (6.0 / spec.fan_in.max(1) as f32).sqrt())
            }
            Initializer::LecunUniform => {
                self.uniform(&mut data, len, (3.0 / spec.fan_in.max(1) as f32).sqrt())
            }
        }

        Ok(Tensor {
            name: spec.name.clone(),
            dim: spec.dim,
            initializer: spec.initializer,
            trainable: spec.trainable,
            data,
        })
    }

    fn uniform(&mut self, data: &mut Vec<f32>, len: usize, limit: f32) {
        let rng = &mut self.rng;
        data.extend((0..len).map(|_| rng.gen_range(-limit..=limit)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(initializer: Initializer) -> WeightSpec {
        WeightSpec {
            name: "fc:weight".to_string(),
            dim: ShapeDescriptor::new(1, 1, 8, 4),
            initializer,
            trainable: true,
            fan_in: 8,
            fan_out: 4,
        }
    }

    #[test]
    fn test_constant_initializers() {
        let mut alloc = WeightAllocator::new(Seed(1));
        let zeros = alloc.allocate(&spec(Initializer::Zeros)).unwrap();
        assert_eq!(zeros.data, vec![0.0; 32]);
        assert_eq!(zeros.bytes(), 128);
        assert_eq!(
            alloc.allocate(&spec(Initializer::Ones)).unwrap().range(),
            (1.0, 1.0)
        );
    }

    #[test]
    fn test_xavier_bounds() {
        let limit = (6.0f32 / 12.0).sqrt();
        let tensor = WeightAllocator::new(Seed(7))
            .allocate(&spec(Initializer::XavierUniform))
            .unwrap();
        let (lo, hi) = tensor.range();
        assert!(lo >= -limit && hi <= limit);
        assert!(lo < hi);
    }

    #[test]
    fn test_seed_determinism() {
        let he = || spec(Initializer::HeUniform);
        let a = WeightAllocator::new(Seed(99)).allocate(&he()).unwrap();
        let b = WeightAllocator::new(Seed(99)).allocate(&he()).unwrap();
        let c = WeightAllocator::new(Seed(100)).allocate(&he()).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.data, c.data);
    }

    #[test]
    fn test_unallocatable_tensor_is_an_error() {
        let mut oversized = spec(Initializer::Zeros);
        oversized.dim = ShapeDescriptor::new(1, 1, usize::MAX / 2, 2);
        let err = WeightAllocator::new(Seed(1)).allocate(&oversized).unwrap_err();
        assert!(matches!(err, NetError::Allocation { .. }), "got {:?}", err);

        oversized.dim = ShapeDescriptor::new(1, 1, usize::MAX, 2);
        let err = WeightAllocator::new(Seed(1)).allocate(&oversized).unwrap_err();
        assert!(err.to_string().contains("overflows"), "got {}", err);
    }
}
