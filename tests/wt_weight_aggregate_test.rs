use bnfold::prelude::*;

/// `channels` outputs, `inputs` inputs and `filter`x`filter` kernels; `seed`
/// makes every block distinguishable
fn conv(channels: usize, inputs: usize, filter: usize, seed: f32) -> SerializedConvBlock<Vec<f32>> {
    let kernel = channels * inputs * filter * filter;
    SerializedConvBlock {
        weights: (0..kernel).map(|i| seed + i as f32 * 0.01).collect(),
        biases: (0..channels).map(|i| seed * 0.1 + i as f32 * 0.02).collect(),
        bn_gammas: vec![1.5; channels],
        bn_betas: vec![0.25; channels],
        bn_means: (0..channels).map(|i| 0.1 * i as f32 - seed * 0.01).collect(),
        bn_stddevs: vec![0.8; channels],
    }
}

fn legacy_conv(channels: usize, inputs: usize, filter: usize) -> SerializedConvBlock<Vec<f32>> {
    SerializedConvBlock {
        weights: vec![0.5; channels * inputs * filter * filter],
        biases: vec![],
        bn_gammas: vec![],
        bn_betas: vec![],
        bn_means: vec![0.1; channels],
        bn_stddevs: vec![1.0; channels],
    }
}

fn se_unit(channels: usize, se_channels: usize) -> SerializedSeUnit<Vec<f32>> {
    SerializedSeUnit {
        w1: vec![0.1; se_channels * channels],
        b1: vec![0.0; se_channels],
        w2: vec![0.2; 2 * channels * se_channels],
        b2: vec![0.0; 2 * channels],
    }
}

/// Network with `filters` channels, `blocks` residual blocks and 3x3 trunk filters
fn network(filters: usize, blocks: usize, with_se: bool) -> SerializedWeights<Vec<f32>> {
    let residual = (0..blocks)
        .map(|b| SerializedResidual {
            conv1: conv(filters, filters, 3, b as f32),
            conv2: conv(filters, filters, 3, b as f32 + 0.5),
            se: with_se.then(|| se_unit(filters, 2)),
        })
        .collect();

    SerializedWeights {
        input: conv(filters, 2, 3, -1.0),
        policy1: None,
        policy: conv(2, filters, 1, 2.0),
        ip_pol_w: vec![0.1; 2 * 64 * 10],
        ip_pol_b: vec![0.0; 10],
        value: conv(1, filters, 1, 3.0),
        ip1_val_w: vec![0.1; 64 * 8],
        ip1_val_b: vec![0.0; 8],
        ip2_val_w: vec![0.1; 8],
        ip2_val_b: vec![0.0; 1],
        residual,
    }
}

#[test]
fn test_build_network() {
    let serialized = network(4, 3, false);
    let weights = WeightAggregate::new(&serialized, &TensorAdapter).unwrap();

    assert_eq!(weights.filters(), 4);
    assert_eq!(weights.blocks(), 3);
    assert!(!weights.has_se());
    assert!(weights.policy1.is_none());
    assert_eq!(weights.ip_pol_b.len(), 10);
    assert_eq!(weights.ip2_val_w, vec![0.1; 8]);
    assert_eq!(weights.value.outputs(), 1);
}

#[test]
fn test_residual_order_is_preserved() {
    let serialized = network(2, 5, false);
    let weights = WeightAggregate::new(&serialized, &TensorAdapter).unwrap();

    for (b, block) in weights.residual.iter().enumerate() {
        assert_eq!(block.conv1.get_weights()[0], b as f32);
        assert_eq!(block.conv2.get_weights()[0], b as f32 + 0.5);
    }
}

#[test]
fn test_se_units() {
    let serialized = network(4, 2, true);
    let weights = WeightAggregate::new(&serialized, &TensorAdapter).unwrap();

    assert!(weights.has_se());
    for block in &weights.residual {
        assert!(block.has_se);
        let se = block.se.as_ref().unwrap();
        assert_eq!(se.w1.len(), 8);
        assert_eq!(se.b2.len(), 8);
    }
}

#[test]
fn test_se_without_weights_is_format_error() {
    let mut serialized = network(4, 1, false);
    serialized.residual[0].se = Some(SerializedSeUnit::default());

    let result = WeightAggregate::new(&serialized, &TensorAdapter);
    assert!(matches!(result, Err(WeightError::FormatError(_))));
}

#[test]
fn test_policy1_is_built_when_present() {
    let mut serialized = network(4, 1, false);
    serialized.policy1 = Some(conv(4, 4, 3, 5.0));

    let weights = WeightAggregate::new(&serialized, &TensorAdapter).unwrap();
    let policy1 = weights.policy1.as_ref().unwrap();
    assert_eq!(policy1.outputs(), 4);
    assert_eq!(policy1.get_weights()[0], 5.0);
}

#[test]
fn test_legacy_network_gets_defaults() {
    let mut serialized = network(3, 2, false);
    serialized.input = legacy_conv(3, 2, 3);
    serialized.residual[1].conv2 = legacy_conv(3, 3, 3);

    let weights = WeightAggregate::new(&serialized, &TensorAdapter).unwrap();

    for block in [&weights.input, &weights.residual[1].conv2] {
        assert_eq!(block.get_biases(), &[0.0; 3]);
        assert_eq!(block.get_bn_gammas(), &[1.0; 3]);
        assert_eq!(block.get_bn_betas(), &[0.0; 3]);
    }
}

#[test]
fn test_malformed_residual_aborts_build() {
    let mut serialized = network(4, 3, false);
    serialized.residual[2].conv1.bn_stddevs.pop();

    let result = WeightAggregate::new(&serialized, &TensorAdapter);
    assert!(matches!(result, Err(WeightError::FormatError(_))));
}

#[test]
fn test_malformed_projection_aborts_build() {
    let mut serialized = network(4, 1, false);
    serialized.ip1_val_w.push(0.0);

    let result = WeightAggregate::new(&serialized, &TensorAdapter);
    assert!(matches!(result, Err(WeightError::FormatError(_))));
}

#[test]
fn test_fold_all() {
    let serialized = network(4, 2, false);
    let mut weights = WeightAggregate::new(&serialized, &TensorAdapter).unwrap();

    let folded = weights.fold_all(&FoldConfig::default()).unwrap();

    // input + 2 * 2 residual convolutions + policy + value
    assert_eq!(folded, 7);
    assert!(weights.input.is_folded());
    assert!(weights.policy.is_folded());
    assert!(weights.value.is_folded());
    for block in &weights.residual {
        for conv in [&block.conv1, &block.conv2] {
            assert!(conv.is_folded());
            assert!(conv.get_bn_stddevs().iter().all(|&s| s == 1.0));
            assert!(conv.get_bn_means().iter().all(|&m| m == 0.0));
            assert!(conv.get_bn_betas().iter().all(|&b| b == 0.0));
        }
    }
}

#[test]
fn test_fold_all_matches_block_fold() {
    let serialized = network(4, 2, false);
    let mut weights = WeightAggregate::new(&serialized, &TensorAdapter).unwrap();
    let mut expected = weights.residual[1].conv2.clone();

    weights.fold_all(&FoldConfig::default()).unwrap();
    expected.fold_bn(3).unwrap();

    assert_eq!(weights.residual[1].conv2, expected);
}

#[test]
fn test_parallel_fold_is_bit_identical() {
    let serialized = network(4, 8, true);
    let mut parallel = WeightAggregate::new(&serialized, &TensorAdapter).unwrap();
    let mut sequential = parallel.clone();

    parallel
        .fold_all(&FoldConfig::default().with_parallel(true))
        .unwrap();
    sequential
        .fold_all(&FoldConfig::default().with_parallel(false))
        .unwrap();

    for (p, s) in parallel.residual.iter().zip(&sequential.residual) {
        let p_bits: Vec<u32> = p.conv1.get_weights().iter().map(|x| x.to_bits()).collect();
        let s_bits: Vec<u32> = s.conv1.get_weights().iter().map(|x| x.to_bits()).collect();
        assert_eq!(p_bits, s_bits);
    }
    assert_eq!(parallel, sequential);
}

#[test]
fn test_fold_all_is_atomic() {
    let mut serialized = network(4, 2, false);
    // The value head kernel does not split into 3x3 filters.
    serialized.value = conv(1, 4, 1, 3.0);
    let mut weights = WeightAggregate::new(&serialized, &TensorAdapter).unwrap();
    let before = weights.clone();

    let config = FoldConfig {
        value_filter_size: 3,
        ..FoldConfig::default()
    };
    let result = weights.fold_all(&config);

    assert!(matches!(result, Err(WeightError::PreconditionError(_))));
    assert_eq!(weights, before);
}

#[test]
fn test_fold_all_twice_fails() {
    let serialized = network(2, 1, false);
    let mut weights = WeightAggregate::new(&serialized, &TensorAdapter).unwrap();

    weights.fold_all(&FoldConfig::default()).unwrap();
    let folded = weights.clone();

    assert!(weights.fold_all(&FoldConfig::default()).is_err());
    assert_eq!(weights, folded);
}

#[test]
fn test_fold_all_skips_blocks_without_batch_norm() {
    let mut serialized = network(4, 1, false);
    serialized.policy = SerializedConvBlock {
        weights: vec![0.1; 2 * 4],
        biases: vec![0.3, 0.4],
        ..SerializedConvBlock::default()
    };
    let mut weights = WeightAggregate::new(&serialized, &TensorAdapter).unwrap();

    let folded = weights.fold_all(&FoldConfig::default()).unwrap();

    assert_eq!(folded, 4);
    assert!(!weights.policy.is_folded());
    assert_eq!(weights.policy.get_biases(), &[0.3, 0.4]);
}

#[test]
fn test_fold_config_validation() {
    assert!(FoldConfig::new(3, 1).is_ok());
    assert!(matches!(
        FoldConfig::new(0, 1),
        Err(WeightError::PreconditionError(_))
    ));
    assert!(matches!(
        FoldConfig::new(3, 0),
        Err(WeightError::PreconditionError(_))
    ));

    let config = FoldConfig::new(5, 1).unwrap();
    assert_eq!(config.policy1_filter_size, 5);
    assert!(config.parallel);
}

#[test]
fn test_fold_config_from_json() {
    let config: FoldConfig =
        serde_json::from_str(r#"{ "trunk_filter_size": 5, "parallel": false }"#).unwrap();

    assert_eq!(config.trunk_filter_size, 5);
    assert_eq!(config.policy1_filter_size, 3);
    assert_eq!(config.policy_filter_size, 1);
    assert!(!config.parallel);
    assert!(config.validate().is_ok());

    let invalid: FoldConfig = serde_json::from_str(r#"{ "value_filter_size": 0 }"#).unwrap();
    assert!(matches!(
        invalid.validate(),
        Err(WeightError::PreconditionError(_))
    ));
}
