mod evolved_network;
mod value_network;

pub use evolved_network::{EvolutionConfig, EvolvedNetwork, Genome, EVOLVED_NETWORK_FILE};
pub use value_network::{ValueMlp, ValueMlpConfig, ValueNetwork, VALUE_NETWORK_FILE};
