use super::*;

/// Validates that a batch-norm statistic has one entry per output channel.
///
/// # Errors
///
/// Returns `WeightError::FormatError` if `len` differs from `channels`.
pub(super) fn validate_statistic_len(
    name: &str,
    len: usize,
    channels: usize,
) -> Result<(), WeightError> {
    if len != channels {
        return Err(WeightError::FormatError(format!(
            "{} has {} entries but bn_means has {}",
            name, len, channels
        )));
    }
    Ok(())
}

/// Validates that a weight buffer splits evenly into `rows` rows.
///
/// # Errors
///
/// Returns `WeightError::FormatError` if `len` is not a multiple of `rows`.
pub(super) fn validate_weight_rows(name: &str, len: usize, rows: usize) -> Result<(), WeightError> {
    if rows == 0 {
        if len != 0 {
            return Err(WeightError::FormatError(format!(
                "{} has {} values but no matching biases",
                name, len
            )));
        }
        return Ok(());
    }
    if len % rows != 0 {
        return Err(WeightError::FormatError(format!(
            "{} has {} values, which is not a multiple of {}",
            name, len, rows
        )));
    }
    Ok(())
}

/// Validates the filter size of a fold request.
///
/// # Errors
///
/// Returns `WeightError::PreconditionError` if `filter_size` is 0.
pub(super) fn validate_filter_size(filter_size: usize) -> Result<(), WeightError> {
    if filter_size == 0 {
        return Err(WeightError::PreconditionError(
            "Filter size must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

/// Computes the number of input channels of a kernel.
///
/// # Errors
///
/// Returns `WeightError::PreconditionError` if the kernel has no output channels
/// its length is not a multiple of `outputs * filter_size^2`, or that product
/// does not fit in `usize`.
pub(super) fn kernel_inputs(
    weights_len: usize,
    outputs: usize,
    filter_size: usize,
) -> Result<usize, WeightError> {
    validate_filter_size(filter_size)?;
    if outputs == 0 {
        return Err(WeightError::PreconditionError(
            "Convolution block has no output channels".to_string(),
        ));
    }

    let per_input = filter_size
        .checked_mul(filter_size)
        .and_then(|spatial| spatial.checked_mul(outputs))
        .ok_or_else(|| {
            WeightError::PreconditionError(format!(
                "{}x{} filters over {} outputs overflow the kernel size",
                filter_size, filter_size, outputs
            ))
        })?;
    if weights_len % per_input != 0 {
        return Err(WeightError::PreconditionError(format!(
            "{} weights cannot be split into {} outputs of {}x{} filters",
            weights_len, outputs, filter_size, filter_size
        )));
    }
    Ok(weights_len / per_input)
}
