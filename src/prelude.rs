pub use crate::error::{IoError, WeightError};
pub use crate::weights::batch_norm_fold::BN_EPSILON;
pub use crate::weights::conv_block::{BatchNormState, ConvBlock};
pub use crate::weights::fold_config::FoldConfig;
pub use crate::weights::layer_adapter::{LayerAdapter, SerializedTensor, TensorAdapter};
pub use crate::weights::residual_block::{ResidualBlock, SeUnit};
pub use crate::weights::serialized::{
    SerializedConvBlock, SerializedResidual, SerializedSeUnit, SerializedWeights,
};
pub use crate::weights::weight_aggregate::WeightAggregate;
