use super::*;
use log::trace;
use ndarray::ArrayViewMut2;

/// Variance regularization term of the batch-norm layers.
pub const BN_EPSILON: f32 = 1e-5;

fn invert_vector(values: &mut [f32]) {
    for x in values.iter_mut() {
        *x = 1.0 / (*x + BN_EPSILON).sqrt();
    }
}

fn offset_vector(means: &mut [f32], biases: &[f32]) {
    for (mean, bias) in means.iter_mut().zip(biases) {
        *mean -= *bias;
    }
}

impl ConvBlock {
    /// Returns `1 / sqrt(stddev + BN_EPSILON)` for every output channel.
    ///
    /// The block itself is left untouched.
    pub fn get_inverted_stddev(&self) -> Vec<f32> {
        let mut stddevs = self.bn_stddevs.clone();
        invert_vector(&mut stddevs);
        stddevs
    }

    /// Returns `mean - bias` for every output channel.
    ///
    /// The block itself is left untouched.
    pub fn get_offset_means(&self) -> Vec<f32> {
        let mut means = self.bn_means.clone();
        offset_vector(&mut means, &self.biases);
        means
    }

    /// Replaces the running variances with `1 / sqrt(stddev + BN_EPSILON)` in place.
    ///
    /// # Errors
    ///
    /// Returns `WeightError::PreconditionError` if the block is folded or the
    /// variances were already inverted.
    pub fn invert_stddev(&mut self) -> Result<(), WeightError> {
        let means_offset = match self.state {
            BatchNormState::Folded => {
                return Err(WeightError::PreconditionError(
                    "Cannot invert the variances of a folded block".to_string(),
                ));
            }
            BatchNormState::Normalized {
                stddev_inverted: true,
                ..
            } => {
                return Err(WeightError::PreconditionError(
                    "Variances are already inverted".to_string(),
                ));
            }
            BatchNormState::Normalized { means_offset, .. } => means_offset,
            BatchNormState::Unfolded => false,
        };

        invert_vector(&mut self.bn_stddevs);
        self.state = BatchNormState::Normalized {
            stddev_inverted: true,
            means_offset,
        };
        Ok(())
    }

    /// Replaces the running means with `mean - bias` in place.
    ///
    /// The biases are kept; callers that apply the offset means must not add
    /// the biases a second time.
    ///
    /// # Errors
    ///
    /// Returns `WeightError::PreconditionError` if the block is folded or the
    /// means were already offset.
    pub fn offset_means(&mut self) -> Result<(), WeightError> {
        let stddev_inverted = match self.state {
            BatchNormState::Folded => {
                return Err(WeightError::PreconditionError(
                    "Cannot offset the means of a folded block".to_string(),
                ));
            }
            BatchNormState::Normalized {
                means_offset: true,
                ..
            } => {
                return Err(WeightError::PreconditionError(
                    "Means are already offset by the biases".to_string(),
                ));
            }
            BatchNormState::Normalized {
                stddev_inverted, ..
            } => stddev_inverted,
            BatchNormState::Unfolded => false,
        };

        offset_vector(&mut self.bn_means, &self.biases);
        self.state = BatchNormState::Normalized {
            stddev_inverted,
            means_offset: true,
        };
        Ok(())
    }

    /// Checks that `fold_bn(filter_size)` would succeed without touching the block.
    ///
    /// # Returns
    ///
    /// - `Ok(usize)` - Number of input channels of the kernel
    /// - `Err(WeightError::PreconditionError)` - If the block cannot be folded
    pub fn check_foldable(&self, filter_size: usize) -> Result<usize, WeightError> {
        match self.state {
            BatchNormState::Unfolded => {}
            BatchNormState::Folded => {
                return Err(WeightError::PreconditionError(
                    "Convolution block is already folded".to_string(),
                ));
            }
            BatchNormState::Normalized { .. } => {
                return Err(WeightError::PreconditionError(
                    "Cannot fold a block whose statistics were normalized in place".to_string(),
                ));
            }
        }
        if !self.has_batch_norm() {
            return Err(WeightError::PreconditionError(
                "Convolution block has no batch-norm statistics to fold".to_string(),
            ));
        }
        kernel_inputs(self.weights.len(), self.outputs(), filter_size)
    }

    /// Folds batch normalization into the kernel and biases.
    ///
    /// Afterwards the convolution with the new biases computes exactly what the
    /// original convolution followed by batch normalization computed:
    ///
    /// - `gamma <- gamma * (1 / sqrt(stddev + BN_EPSILON))`, `mean <- mean - bias`
    /// - `weights[o][c][p] *= gamma[o]`
    /// - `bias[o] <- -gamma[o] * mean[o] + beta[o]`
    ///
    /// and the statistics are reset to identity (`stddev = 1`, `mean = beta = 0`).
    /// Gamma is multiplied by the reciprocal square root rather than divided by
    /// the square root; the two differ in the last bit for some inputs.
    /// The block ends in the `Folded` state; folding it again is an error.
    ///
    /// # Parameters
    ///
    /// - `filter_size` - Side of the square convolution filter
    ///
    /// # Errors
    ///
    /// Returns `WeightError::PreconditionError`, leaving the block unchanged, if the
    /// block is not foldable or the kernel does not split into filters of that size.
    pub fn fold_bn(&mut self, filter_size: usize) -> Result<(), WeightError> {
        let inputs = self.check_foldable(filter_size)?;
        let spatial = filter_size * filter_size;
        let outputs = self.biases.len();

        let mut kernel =
            ArrayViewMut2::from_shape((outputs, inputs * spatial), &mut self.weights)
                .map_err(|e| WeightError::PreconditionError(e.to_string()))?;

        // Variance to gamma.
        for i in 0..self.bn_stddevs.len() {
            self.bn_gammas[i] *= 1.0 / (self.bn_stddevs[i] + BN_EPSILON).sqrt();
            self.bn_stddevs[i] = 1.0;
            self.bn_means[i] -= self.biases[i];
            self.biases[i] = 0.0;
        }

        for (o, mut filters) in kernel.outer_iter_mut().enumerate() {
            let gamma = self.bn_gammas[o];
            filters.mapv_inplace(|w| w * gamma);

            self.biases[o] = -gamma * self.bn_means[o] + self.bn_betas[o];
            self.bn_means[o] = 0.0;
            self.bn_betas[o] = 0.0;
        }

        self.state = BatchNormState::Folded;
        trace!(
            "folded batch norm: {} outputs, {} inputs, {}x{} filters",
            outputs, inputs, filter_size, filter_size
        );
        Ok(())
    }
}
