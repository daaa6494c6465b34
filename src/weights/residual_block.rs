use super::*;

/// Squeeze-excitation weights of a residual block.
///
/// # Fields
///
/// - `w1` / `b1` - Squeeze projection, `[se_channels][channels]`
/// - `w2` / `b2` - Excitation projection, `[2 * channels][se_channels]`
#[derive(Debug, Clone, PartialEq)]
pub struct SeUnit {
    pub w1: Vec<f32>,
    pub b1: Vec<f32>,
    pub w2: Vec<f32>,
    pub b2: Vec<f32>,
}

impl SeUnit {
    /// Builds a squeeze-excitation unit from its serialized record.
    ///
    /// # Errors
    ///
    /// Returns `WeightError::FormatError` if a field cannot be decoded, the unit
    /// carries no weights, or a weight buffer does not split over its biases.
    pub fn new<L, A>(record: &SerializedSeUnit<L>, adapter: &A) -> Result<Self, WeightError>
    where
        A: LayerAdapter<L>,
    {
        let unit = SeUnit {
            w1: adapter.as_vector(&record.w1)?,
            b1: adapter.as_vector(&record.b1)?,
            w2: adapter.as_vector(&record.w2)?,
            b2: adapter.as_vector(&record.b2)?,
        };

        if unit.w1.is_empty() || unit.w2.is_empty() {
            return Err(WeightError::FormatError(
                "SE unit is flagged but carries no weights".to_string(),
            ));
        }
        validate_weight_rows("se.w1", unit.w1.len(), unit.b1.len())?;
        validate_weight_rows("se.w2", unit.w2.len(), unit.b2.len())?;
        Ok(unit)
    }
}

/// One residual block: two convolutions applied in order and an optional
/// squeeze-excitation unit.
///
/// # Fields
///
/// - `conv1` - First convolution
/// - `conv2` - Second convolution
/// - `se` - Squeeze-excitation unit, `Some` exactly when `has_se` is set
/// - `has_se` - Whether the block applies squeeze-excitation
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualBlock {
    pub conv1: ConvBlock,
    pub conv2: ConvBlock,
    pub se: Option<SeUnit>,
    pub has_se: bool,
}

impl ResidualBlock {
    /// Builds a residual block from its serialized record.
    ///
    /// # Errors
    ///
    /// Returns `WeightError::FormatError` if either convolution or the SE unit is malformed.
    pub fn new<L, A>(record: &SerializedResidual<L>, adapter: &A) -> Result<Self, WeightError>
    where
        A: LayerAdapter<L>,
    {
        let se = match &record.se {
            Some(se) => Some(SeUnit::new(se, adapter)?),
            None => None,
        };
        Ok(ResidualBlock {
            conv1: ConvBlock::new(&record.conv1, adapter)?,
            conv2: ConvBlock::new(&record.conv2, adapter)?,
            has_se: record.has_se(),
            se,
        })
    }

    /// Validates that both convolutions fold with `filter_size`.
    pub(super) fn check_foldable(&self, filter_size: usize) -> Result<(), WeightError> {
        self.conv1.check_foldable(filter_size)?;
        self.conv2.check_foldable(filter_size)?;
        Ok(())
    }

    /// Folds both convolutions, first then second.
    ///
    /// # Errors
    ///
    /// Returns `WeightError::PreconditionError`, leaving the block unchanged, if
    /// either convolution cannot be folded with `filter_size`.
    pub fn fold_bn(&mut self, filter_size: usize) -> Result<(), WeightError> {
        self.check_foldable(filter_size)?;
        self.conv1.fold_bn(filter_size)?;
        self.conv2.fold_bn(filter_size)?;
        Ok(())
    }
}
