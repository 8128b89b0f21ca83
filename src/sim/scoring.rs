//! Reconstruction scoring (Dice coefficient)

use serde::{Deserialize, Serialize};

use super::grid::{GuessMask, OccupancyGrid};

/// Dice similarity `2|A∩B| / (|A| + |B|)` between the true mask and the guesses.
///
/// Guesses outside the mask bounds are ignored. Two empty sets score 1.0.
pub fn dice_score(true_mask: &OccupancyGrid, guessed: &GuessMask) -> f32 {
    ScoreReport::compute(true_mask, guessed).dice
}

/// End-of-round numbers shown on the results screen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub dice: f32,
    /// Cells in the hidden shape
    pub true_count: usize,
    /// Cells the learner marked (in bounds)
    pub guessed_count: usize,
    /// Marked cells that are part of the shape
    pub correct_count: usize,
}

impl ScoreReport {
    pub fn compute(true_mask: &OccupancyGrid, guessed: &GuessMask) -> Self {
        let mut guessed_count = 0;
        let mut correct_count = 0;
        for cell in guessed.iter() {
            if let Some(&inside) = true_mask.get(cell) {
                guessed_count += 1;
                if inside {
                    correct_count += 1;
                }
            }
        }
        let true_count = true_mask.iter().filter(|v| **v).count();

        let total = true_count + guessed_count;
        let dice = if total == 0 {
            1.0
        } else {
            2.0 * correct_count as f32 / total as f32
        };

        Self {
            dice,
            true_count,
            guessed_count,
            correct_count,
        }
    }

    /// Dice as a whole percentage
    pub fn percent(&self) -> u32 {
        (self.dice * 100.0).round() as u32
    }

    /// Shape cells the learner did not mark
    pub fn missed_count(&self) -> usize {
        self.true_count - self.correct_count
    }

    /// Marked cells outside the shape
    pub fn wrong_count(&self) -> usize {
        self.guessed_count - self.correct_count
    }
}
