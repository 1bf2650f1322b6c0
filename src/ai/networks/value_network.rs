use std::path::Path;

use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use burn::nn::{Linear, LinearConfig, Tanh};
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::DefaultRecorder;
use burn::tensor::TensorData;

use crate::ai::state_encoding::{encode_batch, encode_input};
use crate::ai::value_function::{ValueFunction, ValueTarget};
use crate::error::CheckpointError;
use crate::game::{Action, ACTIONS, NUM_ACTIONS};

type InferBackend = NdArray<f32>;
type TrainBackend = Autodiff<InferBackend>;

/// Record file stem; the recorder appends `.mpk`.
pub const VALUE_NETWORK_FILE: &str = "value_network";

/// Single-hidden-layer action-value approximator.
///
/// ```text
/// Input:  [batch, rows*cols + 2]   (cell codes, row_delta, col_delta)
/// Hidden: Linear -> hidden_size, tanh
/// Output: Linear -> 1
/// ```
#[derive(Module, Debug)]
pub struct ValueMlp<B: Backend> {
    hidden: Linear<B>,
    output: Linear<B>,
    activation: Tanh,
}

#[derive(Config, Debug)]
pub struct ValueMlpConfig {
    pub input_size: usize,
    #[config(default = 5)]
    pub hidden_size: usize,
}

impl ValueMlpConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ValueMlp<B> {
        ValueMlp {
            hidden: LinearConfig::new(self.input_size, self.hidden_size).init(device),
            output: LinearConfig::new(self.hidden_size, 1).init(device),
            activation: Tanh::new(),
        }
    }
}

impl<B: Backend> ValueMlp<B> {
    /// Forward pass: `[batch, input_size]` -> `[batch, 1]`.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.activation.forward(self.hidden.forward(input));
        self.output.forward(x)
    }
}

/// Value network trained online by gradient steps on the one-step target.
pub struct ValueNetwork {
    net: ValueMlp<TrainBackend>,
    optimizer: OptimizerAdaptor<Adam, ValueMlp<TrainBackend>, TrainBackend>,
    config: ValueMlpConfig,
    device: <TrainBackend as Backend>::Device,
}

impl ValueNetwork {
    pub fn new(config: ValueMlpConfig) -> Self {
        let device = Default::default();
        let net = config.init::<TrainBackend>(&device);
        ValueNetwork {
            net,
            optimizer: AdamConfig::new().init(),
            config,
            device,
        }
    }

    /// Run the inference copy of the network on a batch of inputs.
    fn infer(&self, inputs: &[Vec<f32>]) -> Vec<f32> {
        let net = self.net.valid();
        let batch = encode_batch::<InferBackend>(inputs, self.config.input_size, &self.device);
        net.forward(batch)
            .into_data()
            .to_vec::<f32>()
            .expect("f32 tensor data extraction")
    }

    pub fn save(&self, dir: &Path) -> Result<(), CheckpointError> {
        let recorder = DefaultRecorder::default();
        self.net
            .clone()
            .valid()
            .save_file(dir.join(VALUE_NETWORK_FILE), &recorder)
            .map_err(|e| CheckpointError::ModelSave(e.to_string()))
    }

    pub fn load(&mut self, dir: &Path) -> Result<(), CheckpointError> {
        let recorder = DefaultRecorder::default();
        let net: ValueMlp<TrainBackend> = self
            .config
            .init(&self.device)
            .load_file(dir.join(VALUE_NETWORK_FILE), &recorder, &self.device)
            .map_err(|e| CheckpointError::ModelLoad(e.to_string()))?;
        self.net = net;
        self.optimizer = AdamConfig::new().init();
        Ok(())
    }
}

impl ValueFunction for ValueNetwork {
    /// Board cell codes, as produced by `encode_board`.
    type State = Vec<f32>;

    fn predict(&self, state: &Vec<f32>, action: Action) -> f32 {
        self.infer(&[encode_input(state, action)])[0]
    }

    fn action_values(&self, state: &Vec<f32>) -> [f32; NUM_ACTIONS] {
        let inputs: Vec<Vec<f32>> = ACTIONS.iter().map(|&a| encode_input(state, a)).collect();
        let out = self.infer(&inputs);
        [out[0], out[1], out[2]]
    }

    fn train(&mut self, batch: &[ValueTarget<Vec<f32>>], rate: f64) -> f32 {
        if batch.is_empty() {
            return 0.0;
        }
        let batch_size = batch.len();
        let inputs: Vec<Vec<f32>> = batch
            .iter()
            .map(|item| encode_input(&item.state, item.action))
            .collect();
        let target_data: Vec<f32> = batch.iter().map(|item| item.target).collect();

        let predictions = self
            .net
            .forward(encode_batch::<TrainBackend>(&inputs, self.config.input_size, &self.device));
        let targets = Tensor::<TrainBackend, 1>::from_data(
            TensorData::from(target_data.as_slice()),
            &self.device,
        )
        .reshape([batch_size as i32, 1]);

        let diff = predictions - targets;
        let loss = (diff.clone() * diff).mean();
        let loss_val: f32 = loss
            .clone()
            .into_data()
            .to_vec::<f32>()
            .expect("f32 loss tensor extraction")[0];

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.net);
        self.net = self.optimizer.step(rate, self.net.clone(), grads);

        loss_val
    }
}
