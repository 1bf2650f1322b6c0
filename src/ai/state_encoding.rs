use burn::prelude::*;
use burn::tensor::TensorData;
use serde::{Deserialize, Serialize};

use crate::game::{Action, Board, Cell, Position};

/// Values appended to the flattened board: `row_delta` and `col_delta`.
pub const ACTION_FEATURES: usize = 2;

/// Width of a network input row for a `rows × cols` board.
pub fn input_size(rows: usize, cols: usize) -> usize {
    rows * cols + ACTION_FEATURES
}

/// Flatten the board into cell codes, row-major.
pub fn encode_board(board: &Board) -> Vec<f32> {
    board.cells().iter().map(|c| c.code()).collect()
}

/// Concatenate an encoded board with an action vector.
pub fn encode_input(board: &[f32], action: Action) -> Vec<f32> {
    let mut input = Vec::with_capacity(board.len() + ACTION_FEATURES);
    input.extend_from_slice(board);
    input.push(action.row_delta as f32);
    input.push(action.col_delta as f32);
    input
}

/// Stack input rows of equal width into a `[batch, width]` tensor.
pub fn encode_batch<B: Backend>(
    inputs: &[Vec<f32>],
    width: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    let batch_size = inputs.len();
    let mut flat = Vec::with_capacity(batch_size * width);
    for input in inputs {
        assert_eq!(input.len(), width, "network input has the wrong width");
        flat.extend_from_slice(input);
    }
    Tensor::<B, 1>::from_data(TensorData::from(flat.as_slice()), device)
        .reshape([batch_size as i32, width as i32])
}

/// Discretized local view used as the tabular state.
///
/// One entry per column in `[col - 1, col, col + 1]`: [`StateKey::WALL`]
/// outside the board, otherwise the distance to the nearest obstacle at or
/// above the entity's row, saturated at the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey(pub [u8; 3]);

impl StateKey {
    pub const WALL: u8 = u8::MAX;

    pub fn from_board(board: &Board, position: Position, horizon: usize) -> Self {
        let horizon = horizon.min(u8::MAX as usize - 1) as u8;
        let mut key = [Self::WALL; 3];
        for (slot, offset) in key.iter_mut().zip(-1i64..=1) {
            let col = position.col as i64 + offset;
            if col < 0 || col >= board.cols() as i64 {
                continue;
            }
            let at = Position::new(position.row, col as usize);
            *slot = match board.obstacle_distance_above(at) {
                Some(distance) if distance < horizon as usize => distance as u8,
                _ => horizon,
            };
        }
        StateKey(key)
    }
}

/// Obstacles in the three columns around the entity, within `horizon` rows
/// at or above its row.
pub fn local_obstacle_count(board: &Board, position: Position, horizon: usize) -> usize {
    let top = position.row as i64 - horizon as i64 + 1;
    let mut count = 0;
    for row in top.max(0)..=position.row as i64 {
        for col in position.col as i64 - 1..=position.col as i64 + 1 {
            if board.get_signed(row, col) == Some(Cell::Obstacle) {
                count += 1;
            }
        }
    }
    count
}
