use super::*;

/// Residual towers at least this deep are folded on the rayon pool.
pub(super) const PARALLEL_FOLD_THRESHOLD: usize = 4;

/// Filter sizes and scheduling for [`WeightAggregate::fold_all`].
///
/// # Fields
///
/// - `trunk_filter_size` - Filter side of the input and residual convolutions
/// - `policy1_filter_size` - Filter side of the extra policy convolution
/// - `policy_filter_size` - Filter side of the policy head convolution
/// - `value_filter_size` - Filter side of the value head convolution
/// - `parallel` - Whether residual blocks may be folded in parallel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldConfig {
    pub trunk_filter_size: usize,
    pub policy1_filter_size: usize,
    pub policy_filter_size: usize,
    pub value_filter_size: usize,
    pub parallel: bool,
}

impl Default for FoldConfig {
    fn default() -> Self {
        FoldConfig {
            trunk_filter_size: 3,
            policy1_filter_size: 3,
            policy_filter_size: 1,
            value_filter_size: 1,
            parallel: true,
        }
    }
}

impl FoldConfig {
    /// Creates a new configuration with the given trunk and head filter sizes.
    ///
    /// The extra policy convolution uses the trunk filter size.
    ///
    /// # Parameters
    ///
    /// - `trunk_filter_size` - Filter side of the input, residual and extra policy convolutions
    /// - `head_filter_size` - Filter side of the policy and value head convolutions
    ///
    /// # Returns
    ///
    /// - `Ok(FoldConfig)` - A new configuration with parallel folding enabled
    /// - `Err(WeightError::PreconditionError)` - If any filter size is 0
    pub fn new(trunk_filter_size: usize, head_filter_size: usize) -> Result<Self, WeightError> {
        let config = FoldConfig {
            trunk_filter_size,
            policy1_filter_size: trunk_filter_size,
            policy_filter_size: head_filter_size,
            value_filter_size: head_filter_size,
            parallel: true,
        };
        config.validate()?;
        Ok(config)
    }

    /// Enables or disables parallel folding of the residual tower
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Checks every filter size, e.g. after deserializing a configuration.
    ///
    /// # Errors
    ///
    /// Returns `WeightError::PreconditionError` if any filter size is 0.
    pub fn validate(&self) -> Result<(), WeightError> {
        validate_filter_size(self.trunk_filter_size)?;
        validate_filter_size(self.policy1_filter_size)?;
        validate_filter_size(self.policy_filter_size)?;
        validate_filter_size(self.value_filter_size)?;
        Ok(())
    }
}
