mod agent;
pub mod algorithms;
pub mod exploration;
mod human;
pub mod networks;
pub mod q_table;
mod random;
pub mod session;
pub mod state_encoding;
pub mod value_function;

pub use agent::{Agent, EvalState, LearningAgent, Observation};
pub use algorithms::{
    MonteCarloAgent, MonteCarloConfig, QLearningAgent, QLearningConfig, TemporalDifferenceAgent,
    TemporalDifferenceConfig,
};
pub use exploration::ExplorationPolicy;
pub use human::HumanAgent;
pub use networks::{EvolvedNetwork, ValueNetwork};
pub use q_table::QTable;
pub use random::RandomAgent;
pub use session::{BatchSummary, LearnerConfig, SessionState, TrainingSession};
pub use value_function::{ValueFunction, ValueTarget};
