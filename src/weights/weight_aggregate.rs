use super::fold_config::PARALLEL_FOLD_THRESHOLD;
use super::*;
use log::debug;
use rayon::prelude::*;
use serde_json::{from_reader, from_str};

/// In-memory weights of a residual policy/value network.
///
/// The tree is built once from serialized weights and stays read-only
/// afterwards, apart from the batch-norm fold.
///
/// # Fields
///
/// - `input` - Input convolution
/// - `policy1` - Extra policy convolution, `None` for formats with a single policy convolution
/// - `policy` - Policy head convolution
/// - `ip_pol_w` / `ip_pol_b` - Policy projection
/// - `value` - Value head convolution
/// - `ip1_val_w` / `ip1_val_b` - First value projection
/// - `ip2_val_w` / `ip2_val_b` - Second value projection
/// - `residual` - Residual tower in network depth order
#[derive(Debug, Clone, PartialEq)]
pub struct WeightAggregate {
    pub input: ConvBlock,
    pub policy1: Option<ConvBlock>,
    pub policy: ConvBlock,
    pub ip_pol_w: Vec<f32>,
    pub ip_pol_b: Vec<f32>,
    pub value: ConvBlock,
    pub ip1_val_w: Vec<f32>,
    pub ip1_val_b: Vec<f32>,
    pub ip2_val_w: Vec<f32>,
    pub ip2_val_b: Vec<f32>,
    pub residual: Vec<ResidualBlock>,
}

impl WeightAggregate {
    /// Builds the weight tree from parsed serialized weights.
    ///
    /// Residual blocks keep their serialized order. Legacy gaps in the
    /// convolution blocks are filled as described in [`ConvBlock::new`].
    ///
    /// # Parameters
    ///
    /// - `weights` - Parsed serialized weights
    /// - `adapter` - Flattens each serialized layer into a linear buffer
    ///
    /// # Returns
    ///
    /// - `Ok(WeightAggregate)` - The fully populated tree
    /// - `Err(WeightError::FormatError)` - If any part of the input is malformed
    pub fn new<L, A>(weights: &SerializedWeights<L>, adapter: &A) -> Result<Self, WeightError>
    where
        A: LayerAdapter<L>,
    {
        let policy1 = match &weights.policy1 {
            Some(block) => Some(ConvBlock::new(block, adapter)?),
            None => None,
        };
        let residual = weights
            .residual
            .iter()
            .map(|block| ResidualBlock::new(block, adapter))
            .collect::<Result<Vec<_>, _>>()?;

        let aggregate = WeightAggregate {
            input: ConvBlock::new(&weights.input, adapter)?,
            policy1,
            policy: ConvBlock::new(&weights.policy, adapter)?,
            ip_pol_w: adapter.as_vector(&weights.ip_pol_w)?,
            ip_pol_b: adapter.as_vector(&weights.ip_pol_b)?,
            value: ConvBlock::new(&weights.value, adapter)?,
            ip1_val_w: adapter.as_vector(&weights.ip1_val_w)?,
            ip1_val_b: adapter.as_vector(&weights.ip1_val_b)?,
            ip2_val_w: adapter.as_vector(&weights.ip2_val_w)?,
            ip2_val_b: adapter.as_vector(&weights.ip2_val_b)?,
            residual,
        };
        validate_weight_rows("ip_pol_w", aggregate.ip_pol_w.len(), aggregate.ip_pol_b.len())?;
        validate_weight_rows("ip1_val_w", aggregate.ip1_val_w.len(), aggregate.ip1_val_b.len())?;
        validate_weight_rows("ip2_val_w", aggregate.ip2_val_w.len(), aggregate.ip2_val_b.len())?;

        debug!(
            "built network weights: {} filters, {} residual blocks, se: {}",
            aggregate.filters(),
            aggregate.blocks(),
            aggregate.has_se()
        );
        Ok(aggregate)
    }

    /// Parses a JSON weight document and builds the weight tree.
    ///
    /// # Errors
    ///
    /// - `Err(IoError::JsonError)` - The document is not valid JSON for [`SerializedWeights`]
    /// - `Err(IoError::Weight)` - The document parsed but its weights are malformed
    pub fn from_json_str(json: &str) -> Result<Self, IoError> {
        let weights: SerializedWeights<SerializedTensor> =
            from_str(json).map_err(IoError::JsonError)?;
        Ok(Self::new(&weights, &TensorAdapter)?)
    }

    /// Loads a JSON weight document from disk and builds the weight tree.
    ///
    /// # Errors
    ///
    /// - `Err(IoError::StdIoError)` - File not found or read operation failed
    /// - `Err(IoError::JsonError)` - Deserialization from JSON failed
    /// - `Err(IoError::Weight)` - The document parsed but its weights are malformed
    pub fn load_from_path(path: &str) -> Result<Self, IoError> {
        let reader = IoError::load_in_buf_reader(path)?;
        let weights: SerializedWeights<SerializedTensor> =
            from_reader(reader).map_err(IoError::JsonError)?;
        debug!("loaded serialized weights from {}", path);
        Ok(Self::new(&weights, &TensorAdapter)?)
    }

    /// Returns the number of filters of the residual tower
    pub fn filters(&self) -> usize {
        self.input.outputs()
    }

    /// Returns the number of residual blocks
    pub fn blocks(&self) -> usize {
        self.residual.len()
    }

    /// Returns `true` if any residual block applies squeeze-excitation
    pub fn has_se(&self) -> bool {
        self.residual.iter().any(|block| block.has_se)
    }

    /// Iterates over every convolution block with the filter size `config`
    /// assigns to it, in network order.
    fn conv_blocks(&self, config: FoldConfig) -> impl Iterator<Item = (&ConvBlock, usize)> {
        let trunk = config.trunk_filter_size;
        let heads = [
            self.policy1
                .as_ref()
                .map(|block| (block, config.policy1_filter_size)),
            Some((&self.policy, config.policy_filter_size)),
            Some((&self.value, config.value_filter_size)),
        ];
        std::iter::once((&self.input, trunk))
            .chain(
                self.residual
                    .iter()
                    .flat_map(move |block| [(&block.conv1, trunk), (&block.conv2, trunk)]),
            )
            .chain(heads.into_iter().flatten())
    }

    /// Folds batch normalization into every convolution block that carries it.
    ///
    /// The whole tree is validated before anything is mutated, so on error no
    /// block has been folded. Blocks without batch-norm statistics are skipped.
    /// With `config.parallel` set, deep residual towers are folded on the rayon
    /// pool; each block is folded in the same order either way, so the result
    /// is bit-identical to a sequential fold.
    ///
    /// # Parameters
    ///
    /// - `config` - Filter sizes and scheduling
    ///
    /// # Returns
    ///
    /// - `Ok(usize)` - Number of folded convolution blocks
    /// - `Err(WeightError::PreconditionError)` - If some block cannot be folded
    pub fn fold_all(&mut self, config: &FoldConfig) -> Result<usize, WeightError> {
        config.validate()?;

        let mut folded = 0;
        for (block, filter_size) in self.conv_blocks(*config) {
            if block.has_batch_norm() {
                block.check_foldable(filter_size)?;
                folded += 1;
            }
        }

        let trunk = config.trunk_filter_size;
        fold_if_present(&mut self.input, trunk)?;
        if config.parallel && self.residual.len() >= PARALLEL_FOLD_THRESHOLD {
            self.residual
                .par_iter_mut()
                .try_for_each(|block| fold_residual(block, trunk))?;
        } else {
            for block in self.residual.iter_mut() {
                fold_residual(block, trunk)?;
            }
        }
        if let Some(policy1) = self.policy1.as_mut() {
            fold_if_present(policy1, config.policy1_filter_size)?;
        }
        fold_if_present(&mut self.policy, config.policy_filter_size)?;
        fold_if_present(&mut self.value, config.value_filter_size)?;

        debug!("folded batch norm into {} convolution blocks", folded);
        Ok(folded)
    }
}

fn fold_if_present(block: &mut ConvBlock, filter_size: usize) -> Result<(), WeightError> {
    if block.has_batch_norm() {
        block.fold_bn(filter_size)?;
    }
    Ok(())
}

fn fold_residual(block: &mut ResidualBlock, filter_size: usize) -> Result<(), WeightError> {
    fold_if_present(&mut block.conv1, filter_size)?;
    fold_if_present(&mut block.conv2, filter_size)
}
