//! Value network trained by a (1 + λ) evolution strategy.
//!
//! The parameters live in a flat genome so a whole network can be moved to a
//! worker thread, mutated, and swapped back. Forward passes are batched
//! through the NdArray backend.

use std::path::Path;

use burn::backend::ndarray::{NdArray, NdArrayDevice};
use burn::prelude::*;
use burn::tensor::activation::tanh;
use burn::tensor::TensorData;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::ai::state_encoding::{encode_batch, encode_input};
use crate::ai::value_function::{ValueFunction, ValueTarget};
use crate::error::CheckpointError;
use crate::game::{Action, ACTIONS, NUM_ACTIONS};

type InferBackend = NdArray<f32>;

pub const EVOLVED_NETWORK_FILE: &str = "evolved_network.json";

/// Search budget for one training pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    pub generations: usize,
    /// Mutants evaluated per generation.
    pub offspring: usize,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        EvolutionConfig {
            generations: 100,
            offspring: 8,
        }
    }
}

/// Flat parameters of an `input -> hidden (tanh) -> 1` network.
///
/// Layout: hidden weights `[input, hidden]` row-major, hidden bias, output
/// weights `[hidden]`, output bias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub input_size: usize,
    pub hidden_size: usize,
    pub weights: Vec<f32>,
}

impl Genome {
    pub fn parameter_count(input_size: usize, hidden_size: usize) -> usize {
        input_size * hidden_size + hidden_size + hidden_size + 1
    }

    /// Uniform initialization in `±1/sqrt(fan_in)` per layer.
    pub fn random<R: Rng>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let hidden_bound = 1.0 / (input_size.max(1) as f32).sqrt();
        let output_bound = 1.0 / (hidden_size.max(1) as f32).sqrt();
        let first_layer = input_size * hidden_size + hidden_size;
        let weights = (0..Self::parameter_count(input_size, hidden_size))
            .map(|idx| {
                let bound = if idx < first_layer { hidden_bound } else { output_bound };
                rng.random_range(-bound..=bound)
            })
            .collect();
        Genome {
            input_size,
            hidden_size,
            weights,
        }
    }

    /// Copy with Gaussian noise of standard deviation `sigma` on every weight.
    pub fn mutate<R: Rng>(&self, sigma: f32, rng: &mut R) -> Genome {
        let mut child = self.clone();
        let Ok(noise) = Normal::new(0.0f32, sigma) else {
            return child;
        };
        for weight in &mut child.weights {
            *weight += noise.sample(rng);
        }
        child
    }

    /// Evaluate a batch of input rows.
    pub fn forward(&self, inputs: &[Vec<f32>], device: &NdArrayDevice) -> Vec<f32> {
        let (input, hidden) = (self.input_size, self.hidden_size);
        let (w1, rest) = self.weights.split_at(input * hidden);
        let (b1, rest) = rest.split_at(hidden);
        let (w2, b2) = rest.split_at(hidden);

        let x = encode_batch::<InferBackend>(inputs, input, device);
        let w1 = param(w1, device).reshape([input as i32, hidden as i32]);
        let b1 = param(b1, device).reshape([1, hidden as i32]);
        let w2 = param(w2, device).reshape([hidden as i32, 1]);
        let b2 = param(b2, device).reshape([1, 1]);

        let h = tanh(x.matmul(w1) + b1);
        (h.matmul(w2) + b2)
            .into_data()
            .to_vec::<f32>()
            .expect("f32 tensor data extraction")
    }

    /// Mean squared error against a set of targets.
    pub fn error(&self, samples: &[ValueTarget<Vec<f32>>], device: &NdArrayDevice) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let inputs: Vec<Vec<f32>> = samples
            .iter()
            .map(|s| encode_input(&s.state, s.action))
            .collect();
        let outputs = self.forward(&inputs, device);
        let total: f32 = outputs
            .iter()
            .zip(samples)
            .map(|(out, s)| (out - s.target).powi(2))
            .sum();
        total / samples.len() as f32
    }
}

fn param(values: &[f32], device: &NdArrayDevice) -> Tensor<InferBackend, 1> {
    Tensor::<InferBackend, 1>::from_data(TensorData::from(values), device)
}

/// Value function whose weights are improved by mutation and selection.
#[derive(Debug, Clone)]
pub struct EvolvedNetwork {
    genome: Genome,
    evolution: EvolutionConfig,
    rng: StdRng,
    device: NdArrayDevice,
}

impl EvolvedNetwork {
    pub fn new(
        input_size: usize,
        hidden_size: usize,
        evolution: EvolutionConfig,
        seed: Option<u64>,
    ) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let genome = Genome::random(input_size, hidden_size, &mut rng);
        EvolvedNetwork {
            genome,
            evolution,
            rng,
            device: NdArrayDevice::default(),
        }
    }

    pub fn genome(&self) -> &Genome {
        &self.genome
    }

    pub fn save(&self, dir: &Path) -> Result<(), CheckpointError> {
        let json = serde_json::to_string(&self.genome)?;
        std::fs::write(dir.join(EVOLVED_NETWORK_FILE), json)?;
        Ok(())
    }

    pub fn load(&mut self, dir: &Path) -> Result<(), CheckpointError> {
        let content = std::fs::read_to_string(dir.join(EVOLVED_NETWORK_FILE))
            .map_err(|e| CheckpointError::ModelLoad(e.to_string()))?;
        let genome: Genome = serde_json::from_str(&content)?;
        let expected = Genome::parameter_count(genome.input_size, genome.hidden_size);
        if genome.input_size != self.genome.input_size || genome.weights.len() != expected {
            return Err(CheckpointError::ModelLoad(format!(
                "genome shape mismatch: input {} with {} weights, expected input {}",
                genome.input_size,
                genome.weights.len(),
                self.genome.input_size
            )));
        }
        self.genome = genome;
        Ok(())
    }
}

impl ValueFunction for EvolvedNetwork {
    /// Board cell codes, as produced by `encode_board`.
    type State = Vec<f32>;

    fn predict(&self, state: &Vec<f32>, action: Action) -> f32 {
        self.genome.forward(&[encode_input(state, action)], &self.device)[0]
    }

    fn action_values(&self, state: &Vec<f32>) -> [f32; NUM_ACTIONS] {
        let inputs: Vec<Vec<f32>> = ACTIONS.iter().map(|&a| encode_input(state, a)).collect();
        let out = self.genome.forward(&inputs, &self.device);
        [out[0], out[1], out[2]]
    }

    /// Evolve toward the batch with mutation strength `rate`. Offspring
    /// replace the parent only when they do not increase the error.
    fn train(&mut self, batch: &[ValueTarget<Vec<f32>>], rate: f64) -> f32 {
        let mut best_error = self.genome.error(batch, &self.device);
        if batch.is_empty() {
            return best_error;
        }
        let sigma = rate as f32;
        for _ in 0..self.evolution.generations {
            let mut champion: Option<(Genome, f32)> = None;
            for _ in 0..self.evolution.offspring {
                let child = self.genome.mutate(sigma, &mut self.rng);
                let error = child.error(batch, &self.device);
                if champion.as_ref().map_or(true, |(_, e)| error < *e) {
                    champion = Some((child, error));
                }
            }
            if let Some((child, error)) = champion {
                if error <= best_error {
                    self.genome = child;
                    best_error = error;
                }
            }
        }
        tracing::debug!(samples = batch.len(), error = best_error, "evolution pass finished");
        best_error
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<ValueTarget<Vec<f32>>> {
        vec![
            ValueTarget {
                state: vec![0.0, 1.0, 2.0, 0.0],
                action: Action::LEFT,
                target: -10.0,
            },
            ValueTarget {
                state: vec![0.0, 0.0, 0.0, 2.0],
                action: Action::STAY,
                target: 5.0,
            },
        ]
    }

    #[test]
    fn test_parameter_count() {
        let mut rng = StdRng::seed_from_u64(1);
        let genome = Genome::random(6, 4, &mut rng);
        assert_eq!(genome.weights.len(), 6 * 4 + 4 + 4 + 1);
        assert_eq!(Genome::parameter_count(6, 4), genome.weights.len());
    }

    #[test]
    fn test_forward_matches_manual_computation() {
        let genome = Genome {
            input_size: 2,
            hidden_size: 1,
            // w1 = [0.5, -1.0], b1 = 0.25, w2 = 2.0, b2 = 1.0
            weights: vec![0.5, -1.0, 0.25, 2.0, 1.0],
        };
        let out = genome.forward(&[vec![1.0, 1.0]], &NdArrayDevice::default());
        let expected = 2.0 * (0.5f32 - 1.0 + 0.25).tanh() + 1.0;
        assert!((out[0] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_zero_sigma_mutation_is_identity() {
        let mut rng = StdRng::seed_from_u64(2);
        let genome = Genome::random(3, 2, &mut rng);
        assert_eq!(genome.mutate(0.0, &mut rng), genome);
    }

    #[test]
    fn test_training_never_increases_error() {
        let mut net = EvolvedNetwork::new(6, 5, EvolutionConfig::default(), Some(7));
        let batch = samples();
        let before = net.genome().error(&batch, &NdArrayDevice::default());
        let after = net.train(&batch, 0.1);
        assert!(after <= before);
        assert!(after < before, "evolution made no progress from {before}");
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut net = EvolvedNetwork::new(6, 5, EvolutionConfig::default(), Some(7));
        let genome = net.genome().clone();
        assert_eq!(net.train(&[], 0.1), 0.0);
        assert_eq!(net.genome(), &genome);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let source = EvolvedNetwork::new(6, 5, EvolutionConfig::default(), Some(3));
        source.save(dir.path()).unwrap();

        let mut restored = EvolvedNetwork::new(6, 5, EvolutionConfig::default(), Some(4));
        assert_ne!(restored.genome(), source.genome());
        restored.load(dir.path()).unwrap();
        assert_eq!(restored.genome(), source.genome());
    }

    #[test]
    fn test_load_rejects_wrong_shape() {
        let dir = tempfile::tempdir().unwrap();
        EvolvedNetwork::new(8, 5, EvolutionConfig::default(), Some(3))
            .save(dir.path())
            .unwrap();
        let mut other = EvolvedNetwork::new(6, 5, EvolutionConfig::default(), Some(3));
        assert!(matches!(
            other.load(dir.path()),
            Err(CheckpointError::ModelLoad(_))
        ));
    }
}
