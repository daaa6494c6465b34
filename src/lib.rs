/// Error types raised while building or folding network weights.
///
/// - `WeightError` - malformed serialized input (`FormatError`) or an invalid
///   fold request (`PreconditionError`)
/// - `IoError` - file and JSON failures on the loading path, plus any
///   `WeightError` raised while building the loaded weights
pub mod error;

/// In-memory network weights and the batch-norm folder.
///
/// This module turns a serialized weight container into a [`weights::WeightAggregate`]
/// tree that compute backends can read directly, and removes batch-normalization
/// passes from that tree by folding the statistics into the preceding convolution.
///
/// # Core Components
///
/// ## Weight tree
/// - **ConvBlock**: convolution kernel, biases and batch-norm statistics of one convolution
/// - **SeUnit**: optional squeeze-excitation weights of a residual block
/// - **ResidualBlock**: two convolutions applied in order plus the optional SE unit
/// - **WeightAggregate**: input convolution, residual tower and policy/value heads
///
/// ## Serialized input
/// - **SerializedWeights** and friends: parsed records, generic over the layer type
/// - **LayerAdapter**: flattens one serialized layer into an ordered `Vec<f32>`
/// - **TensorAdapter**: the adapter for `Vec<f32>` and shaped `SerializedTensor` layers
///
/// ## Folding
/// - **fold_bn**: destructive fold of one convolution block
/// - **get_inverted_stddev / get_offset_means**: derived statistics without mutation
/// - **fold_all**: folds a whole network according to a `FoldConfig`
///
/// # Examples
/// ```rust
/// use bnfold::prelude::*;
///
/// let record = SerializedConvBlock::<Vec<f32>> {
///     weights: vec![2.0],
///     biases: vec![1.0],
///     bn_gammas: vec![3.0],
///     bn_betas: vec![0.5],
///     bn_means: vec![4.0],
///     bn_stddevs: vec![8.999975],
/// };
/// let mut block = ConvBlock::new(&record, &TensorAdapter).unwrap();
///
/// block.fold_bn(1).unwrap();
/// assert!(block.is_folded());
/// assert!((block.get_biases()[0] + 2.5).abs() < 1e-4);
/// ```
pub mod weights;

/// Convenience re-exports of the public weight types.
pub mod prelude;

pub use error::{IoError, WeightError};
pub use serde::{Deserialize, Serialize};
