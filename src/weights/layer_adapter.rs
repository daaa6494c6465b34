use super::*;
use ndarray::{ArrayD, IxDyn};

/// Flattens one serialized layer into an ordered sequence of `f32` values.
///
/// This is the only capability the weight builder needs from a serialization
/// format. Implementations must return values in logical (row-major) order and
/// may return an empty vector for fields an older format does not carry.
pub trait LayerAdapter<L: ?Sized> {
    /// Returns the layer's values as a linear buffer.
    ///
    /// # Parameters
    ///
    /// - `layer` - The serialized layer to flatten
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<f32>)` - The flattened values, possibly empty
    /// - `Err(WeightError::FormatError)` - If the layer cannot be decoded
    fn as_vector(&self, layer: &L) -> Result<Vec<f32>, WeightError>;
}

/// Serialized tensor with an optional shape.
///
/// # Fields
///
/// - `shape` - Logical shape of the tensor; empty means `values` is already flat
/// - `values` - Tensor values in row-major order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerializedTensor {
    pub shape: Vec<usize>,
    pub values: Vec<f32>,
}

impl SerializedTensor {
    /// Creates a flat tensor without shape information
    pub fn flat(values: Vec<f32>) -> Self {
        SerializedTensor {
            shape: Vec::new(),
            values,
        }
    }

    /// Returns `true` if the tensor carries no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Adapter for the layer types the crate can read out of the box:
/// plain `Vec<f32>` buffers and shaped [`SerializedTensor`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct TensorAdapter;

impl LayerAdapter<Vec<f32>> for TensorAdapter {
    fn as_vector(&self, layer: &Vec<f32>) -> Result<Vec<f32>, WeightError> {
        Ok(layer.clone())
    }
}

impl LayerAdapter<[f32]> for TensorAdapter {
    fn as_vector(&self, layer: &[f32]) -> Result<Vec<f32>, WeightError> {
        Ok(layer.to_vec())
    }
}

impl LayerAdapter<SerializedTensor> for TensorAdapter {
    fn as_vector(&self, layer: &SerializedTensor) -> Result<Vec<f32>, WeightError> {
        if layer.shape.is_empty() {
            return Ok(layer.values.clone());
        }

        let array = ArrayD::from_shape_vec(IxDyn(&layer.shape), layer.values.clone())
            .map_err(|e| {
                WeightError::FormatError(format!(
                    "tensor of shape {:?} does not match its {} values: {}",
                    layer.shape,
                    layer.values.len(),
                    e
                ))
            })?;

        Ok(array.iter().copied().collect())
    }
}
