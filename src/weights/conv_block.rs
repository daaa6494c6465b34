use super::*;
use log::debug;
use ndarray::ArrayView4;

/// Fold state of a [`ConvBlock`].
///
/// # Variants
///
/// - `Unfolded` - Statistics are exactly as read from the serialized weights
/// - `Normalized` - Statistics were rewritten in place by `invert_stddev` and/or `offset_means`
/// - `Folded` - Batch normalization was folded into the kernel and biases; terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchNormState {
    #[default]
    Unfolded,
    Normalized {
        stddev_inverted: bool,
        means_offset: bool,
    },
    Folded,
}

/// Weights of one convolution followed by batch normalization.
///
/// All per-channel vectors are indexed by output channel. When the block carries
/// batch-norm statistics, `biases`, `bn_gammas`, `bn_betas`, `bn_means` and
/// `bn_stddevs` all have one entry per output channel; a block without
/// statistics keeps all four statistic vectors empty.
///
/// # Fields
///
/// - `weights` - Flattened kernel, `[output][input][row][col]`
/// - `biases` - Convolution bias per output channel
/// - `bn_gammas` - Batch-norm scale
/// - `bn_betas` - Batch-norm shift
/// - `bn_means` - Running mean
/// - `bn_stddevs` - Running variance (the name is historical)
/// - `state` - Whether the statistics are raw, normalized in place or folded
#[derive(Debug, Clone, PartialEq)]
pub struct ConvBlock {
    pub(crate) weights: Vec<f32>,
    pub(crate) biases: Vec<f32>,
    pub(crate) bn_gammas: Vec<f32>,
    pub(crate) bn_betas: Vec<f32>,
    pub(crate) bn_means: Vec<f32>,
    pub(crate) bn_stddevs: Vec<f32>,
    pub(crate) state: BatchNormState,
}

impl ConvBlock {
    /// Builds a convolution block from its serialized record.
    ///
    /// Every field is flattened independently through `adapter`. Records from
    /// older formats that lack `bn_betas` get `beta = 0.0` and `gamma = 1.0` per
    /// channel, and records lacking `biases` get `bias = 0.0` per channel.
    /// Fields that are present are never replaced, even if they are all zero.
    ///
    /// # Parameters
    ///
    /// - `record` - Serialized convolution block
    /// - `adapter` - Flattens each serialized layer into a linear buffer
    ///
    /// # Returns
    ///
    /// - `Ok(ConvBlock)` - The populated block in the `Unfolded` state
    /// - `Err(WeightError::FormatError)` - If a field cannot be decoded or the sizes disagree
    pub fn new<L, A>(record: &SerializedConvBlock<L>, adapter: &A) -> Result<Self, WeightError>
    where
        A: LayerAdapter<L>,
    {
        let weights = adapter.as_vector(&record.weights)?;
        let mut biases = adapter.as_vector(&record.biases)?;
        let mut bn_gammas = adapter.as_vector(&record.bn_gammas)?;
        let mut bn_betas = adapter.as_vector(&record.bn_betas)?;
        let bn_means = adapter.as_vector(&record.bn_means)?;
        let bn_stddevs = adapter.as_vector(&record.bn_stddevs)?;

        let channels = bn_means.len();
        if bn_betas.is_empty() {
            // Old nets store neither gamma nor beta.
            if !bn_gammas.is_empty() {
                return Err(WeightError::FormatError(format!(
                    "bn_gammas has {} entries but bn_betas is missing",
                    bn_gammas.len()
                )));
            }
            if channels > 0 {
                debug!("filling {} missing gamma/beta entries with 1.0/0.0", channels);
            }
            bn_betas = vec![0.0; channels];
            bn_gammas = vec![1.0; channels];
        }
        if biases.is_empty() {
            if channels > 0 {
                debug!("filling {} missing biases with 0.0", channels);
            }
            biases = vec![0.0; channels];
        }

        Self::from_parts(weights, biases, bn_gammas, bn_betas, bn_means, bn_stddevs)
    }

    /// Creates a block from already flattened vectors.
    ///
    /// No legacy defaults are applied here; every vector must already have its
    /// final length.
    ///
    /// # Errors
    ///
    /// Returns `WeightError::FormatError` if the statistic lengths disagree with
    /// `bn_means`, or the kernel does not split evenly over the output channels.
    pub fn from_parts(
        weights: Vec<f32>,
        biases: Vec<f32>,
        bn_gammas: Vec<f32>,
        bn_betas: Vec<f32>,
        bn_means: Vec<f32>,
        bn_stddevs: Vec<f32>,
    ) -> Result<Self, WeightError> {
        let channels = bn_means.len();
        validate_statistic_len("bn_gammas", bn_gammas.len(), channels)?;
        validate_statistic_len("bn_betas", bn_betas.len(), channels)?;
        validate_statistic_len("bn_stddevs", bn_stddevs.len(), channels)?;
        if channels > 0 {
            validate_statistic_len("biases", biases.len(), channels)?;
        }
        validate_weight_rows("weights", weights.len(), biases.len())?;

        Ok(ConvBlock {
            weights,
            biases,
            bn_gammas,
            bn_betas,
            bn_means,
            bn_stddevs,
            state: BatchNormState::Unfolded,
        })
    }

    /// Returns the flattened kernel, `[output][input][row][col]`
    pub fn get_weights(&self) -> &[f32] {
        &self.weights
    }

    /// Returns the bias of every output channel
    pub fn get_biases(&self) -> &[f32] {
        &self.biases
    }

    /// Returns the batch-norm scale of every output channel
    pub fn get_bn_gammas(&self) -> &[f32] {
        &self.bn_gammas
    }

    /// Returns the batch-norm shift of every output channel
    pub fn get_bn_betas(&self) -> &[f32] {
        &self.bn_betas
    }

    /// Returns the running mean of every output channel
    pub fn get_bn_means(&self) -> &[f32] {
        &self.bn_means
    }

    /// Returns the running variance of every output channel
    pub fn get_bn_stddevs(&self) -> &[f32] {
        &self.bn_stddevs
    }

    /// Returns the current fold state
    pub fn get_state(&self) -> BatchNormState {
        self.state
    }

    /// Returns `true` once batch normalization has been folded into the kernel
    pub fn is_folded(&self) -> bool {
        self.state == BatchNormState::Folded
    }

    /// Returns `true` if the block carries batch-norm statistics
    pub fn has_batch_norm(&self) -> bool {
        !self.bn_means.is_empty()
    }

    /// Returns the number of output channels
    pub fn outputs(&self) -> usize {
        self.biases.len()
    }

    /// Returns `true` if the block holds no weights at all
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty() && self.biases.is_empty() && self.bn_means.is_empty()
    }

    /// Views the kernel as a 4D array.
    ///
    /// # Parameters
    ///
    /// - `filter_size` - Side of the square filter
    ///
    /// # Returns
    ///
    /// - `Ok(ArrayView4<f32>)` - View with shape (outputs, inputs, filter_size, filter_size)
    /// - `Err(WeightError::PreconditionError)` - If the kernel does not split into square filters of that size
    pub fn kernel_view(&self, filter_size: usize) -> Result<ArrayView4<'_, f32>, WeightError> {
        let outputs = self.outputs();
        let inputs = kernel_inputs(self.weights.len(), outputs, filter_size)?;
        ArrayView4::from_shape((outputs, inputs, filter_size, filter_size), &self.weights)
            .map_err(|e| WeightError::PreconditionError(e.to_string()))
    }
}
