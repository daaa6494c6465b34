/// Batch-norm folding and derived statistics for convolution blocks
pub mod batch_norm_fold;
/// Convolution block weights and their fold state
pub mod conv_block;
/// Filter sizes and scheduling options for whole-network folding
pub mod fold_config;
/// Validation helpers shared by the builder and the folder
mod input_validation_function;
/// Flattening of serialized layers into linear buffers
pub mod layer_adapter;
/// Residual blocks and squeeze-excitation units
pub mod residual_block;
/// Parsed (but not yet flattened) weight records
pub mod serialized;
/// Top-level network weight tree
pub mod weight_aggregate;

pub use batch_norm_fold::*;
pub use conv_block::*;
pub use fold_config::*;
pub use layer_adapter::*;
pub use residual_block::*;
pub use serialized::*;
pub use weight_aggregate::*;

use crate::error::{IoError, WeightError};
use crate::{Deserialize, Serialize};
use input_validation_function::*;
