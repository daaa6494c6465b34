use super::*;

/// Serialized convolution block, one layer per named field.
///
/// Older formats omit `bn_gammas`, `bn_betas` and `biases`; missing fields
/// deserialize to empty layers and are filled with neutral values when the
/// block is built.
///
/// # Fields
///
/// - `weights` - Convolution kernel, `[output][input][spatial]`
/// - `biases` - One bias per output channel
/// - `bn_gammas` - Batch-norm scale per output channel
/// - `bn_betas` - Batch-norm shift per output channel
/// - `bn_means` - Batch-norm running mean per output channel
/// - `bn_stddevs` - Batch-norm running variance per output channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "L: Deserialize<'de> + Default"))]
pub struct SerializedConvBlock<L = SerializedTensor> {
    pub weights: L,
    pub biases: L,
    pub bn_gammas: L,
    pub bn_betas: L,
    pub bn_means: L,
    #[serde(alias = "bn_stddivs")]
    pub bn_stddevs: L,
}

/// Serialized squeeze-excitation unit.
///
/// # Fields
///
/// - `w1` - Squeeze weights
/// - `b1` - Squeeze biases
/// - `w2` - Excitation weights
/// - `b2` - Excitation biases
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "L: Deserialize<'de> + Default"))]
pub struct SerializedSeUnit<L = SerializedTensor> {
    pub w1: L,
    pub b1: L,
    pub w2: L,
    pub b2: L,
}

/// Serialized residual block.
///
/// # Fields
///
/// - `conv1` - First convolution
/// - `conv2` - Second convolution
/// - `se` - Squeeze-excitation unit, present only in formats that carry one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "L: Deserialize<'de> + Default"))]
pub struct SerializedResidual<L = SerializedTensor> {
    pub conv1: SerializedConvBlock<L>,
    pub conv2: SerializedConvBlock<L>,
    pub se: Option<SerializedSeUnit<L>>,
}

impl<L> SerializedResidual<L> {
    /// Returns `true` if the block flags a squeeze-excitation unit
    pub fn has_se(&self) -> bool {
        self.se.is_some()
    }
}

/// Parsed network weight container.
///
/// # Fields
///
/// - `input` - Input convolution
/// - `policy1` - Extra policy convolution, only present in newer formats
/// - `policy` - Policy head convolution
/// - `ip_pol_w` / `ip_pol_b` - Policy projection
/// - `value` - Value head convolution
/// - `ip1_val_w` / `ip1_val_b` - First value projection
/// - `ip2_val_w` / `ip2_val_b` - Second value projection
/// - `residual` - Residual tower in network depth order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, bound(deserialize = "L: Deserialize<'de> + Default"))]
pub struct SerializedWeights<L = SerializedTensor> {
    pub input: SerializedConvBlock<L>,
    pub policy1: Option<SerializedConvBlock<L>>,
    pub policy: SerializedConvBlock<L>,
    pub ip_pol_w: L,
    pub ip_pol_b: L,
    pub value: SerializedConvBlock<L>,
    pub ip1_val_w: L,
    pub ip1_val_b: L,
    pub ip2_val_w: L,
    pub ip2_val_b: L,
    pub residual: Vec<SerializedResidual<L>>,
}
