use fringefit::config::FringeConfig;
use fringefit::dataset::{Dataset, write_dataset};
use fringefit::preprocess::preprocess;
use fringefit::processing::{
    ChannelInput, ChannelOutcome, analyze_trends, process_channels, process_dataset,
};
use fringefit::simulation::{NoiseConfig, ScanConfig, SyntheticExperiment, generate_experiment};

const KM: f64 = 100.0;
const KC: f64 = 1000.0;

fn run_synthetic(seed: u64) -> (FringeConfig, Vec<ChannelOutcome>) {
    let config = FringeConfig::default();
    let noise = NoiseConfig::default().with_seed(seed).with_intensity_std(0.01);
    let scans = generate_experiment(
        &config.experiment,
        &SyntheticExperiment::default(),
        &ScanConfig::default(),
        &noise,
    )
    .expect("Failed to generate scans");

    let inputs: Vec<ChannelInput> = config
        .experiment
        .channel_specs()
        .into_iter()
        .zip(scans.iter())
        .map(|(spec, scan)| ChannelInput {
            series: preprocess(&scan.x, &scan.intensity, &config.pipeline.preprocess)
                .expect("Failed to preprocess"),
            spec,
        })
        .collect();

    let outcomes = process_channels(&inputs, &config.pipeline);
    (config, outcomes)
}

#[test]
fn test_spectral_estimates_within_one_bin() {
    let (config, outcomes) = run_synthetic(42);
    assert_eq!(outcomes.len(), 6);

    for outcome in &outcomes {
        let analysis = outcome
            .result
            .as_ref()
            .unwrap_or_else(|e| panic!("Channel {} failed: {}", outcome.channel.id, e));
        let bin = analysis.spectrum.bin_width();
        let estimate = analysis.estimate;

        assert!(
            (estimate.km - KM).abs() <= bin,
            "Channel {}: km estimate {} more than one bin ({}) from {}",
            outcome.channel.id,
            estimate.km,
            bin,
            KM
        );
        assert!(
            (estimate.kc - KC).abs() <= bin,
            "Channel {}: kc estimate {} more than one bin ({}) from {}",
            outcome.channel.id,
            estimate.kc,
            bin,
            KC
        );
        assert!(config.pipeline.spectral.envelope_range.contains(estimate.km));
        assert!(config.pipeline.spectral.carrier_range.contains(estimate.kc));
    }
}

#[test]
fn test_fitted_carrier_recovered() {
    let (config, outcomes) = run_synthetic(7);

    for outcome in &outcomes {
        let analysis = outcome.result.as_ref().expect("channel failed");
        let fit = &analysis.fit;

        assert!(
            (fit.carrier_wavenumber() - KC).abs() < 20.0,
            "Channel {}: fitted kc = {}",
            outcome.channel.id,
            fit.carrier_wavenumber()
        );
        assert!(fit.carrier_wavenumber_err() > 0.0);
        assert!(fit.envelope_wavenumber().is_finite());
        assert!(fit.envelope_wavenumber() > 0.0);
        assert!(config.pipeline.spectral.envelope_range.contains(fit.envelope_wavenumber()));
        assert!(analysis.residuals.rms < 0.1);
    }
}

#[test]
fn test_filtered_signal_is_symmetric_and_normalized() {
    let (_, outcomes) = run_synthetic(3);

    for outcome in &outcomes {
        let filtered = &outcome.result.as_ref().expect("channel failed").filtered;
        let n = filtered.len();
        assert_eq!(n % 2, 1);
        for j in 0..n {
            assert_eq!(filtered.intensity()[j], filtered.intensity()[n - 1 - j]);
            assert_eq!(filtered.x()[j], -filtered.x()[n - 1 - j]);
        }
        assert_eq!(filtered.x()[n / 2], 0.0);
        let max = filtered
            .intensity()
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(max, 1.0);
    }
}

#[test]
fn test_regime_regressions_are_finite() {
    let (config, outcomes) = run_synthetic(11);
    let report = analyze_trends(
        &outcomes,
        &config.experiment.regimes(),
        &config.pipeline.regression,
    )
    .expect("Trend analysis failed");

    assert_eq!(report.regimes.len(), 2);
    for regime in &report.regimes {
        assert!(regime.error.is_none(), "Regime {} failed: {:?}", regime.name, regime.error);
        for result in [regime.km.unwrap(), regime.kc.unwrap()] {
            assert!(result.slope_raw.is_finite());
            assert!(result.intercept_raw.is_finite());
            assert!(result.slope_err_raw > 0.0);
            assert!(result.intercept_err_raw > 0.0);
        }
    }
}

#[test]
fn test_dataset_round_trip_feeds_pipeline() {
    let config = FringeConfig::default();
    let noise = NoiseConfig::default().with_seed(5);
    let scans = generate_experiment(
        &config.experiment,
        &SyntheticExperiment::default(),
        &ScanConfig::default(),
        &noise,
    )
    .unwrap();

    let mut buffer = Vec::new();
    write_dataset(&mut buffer, &scans).unwrap();
    let dataset = Dataset::from_reader(buffer.as_slice()).unwrap();

    for spec in config.experiment.channel_specs() {
        let scan = dataset.scan(&spec.id).unwrap();
        assert_eq!(scan.x.len(), ScanConfig::default().num_samples);
        let series = preprocess(&scan.x, &scan.intensity, &config.pipeline.preprocess).unwrap();
        assert_eq!(series.len(), config.pipeline.preprocess.num_points);
    }
}

#[test]
fn test_flat_channel_does_not_stop_other_channels() {
    let config = FringeConfig::default();
    let noise = NoiseConfig::default().with_seed(42).with_intensity_std(0.01);
    let mut scans = generate_experiment(
        &config.experiment,
        &SyntheticExperiment::default(),
        &ScanConfig::default(),
        &noise,
    )
    .unwrap();
    let flat_id = scans[0].label.clone();
    scans[0].intensity = vec![0.5; scans[0].x.len()];

    let mut buffer = Vec::new();
    write_dataset(&mut buffer, &scans).unwrap();
    let dataset = Dataset::from_reader(buffer.as_slice()).unwrap();

    let specs = config.experiment.channel_specs();
    let outcomes = process_dataset(&dataset, &specs, &config.pipeline);
    assert_eq!(outcomes.len(), specs.len());
    for outcome in &outcomes {
        if outcome.channel.id == flat_id {
            assert!(outcome.result.is_err());
        } else {
            assert!(
                outcome.result.is_ok(),
                "Channel {} failed: {:?}",
                outcome.channel.id,
                outcome.result.as_ref().err()
            );
        }
    }

    let regimes = config.experiment.regimes();
    let report = analyze_trends(&outcomes, &regimes, &config.pipeline.regression).unwrap();
    for trend in &report.regimes {
        if trend.channel_ids.contains(&flat_id) {
            assert!(trend.error.is_some());
        } else {
            assert!(trend.km.is_some() && trend.kc.is_some());
        }
    }
}
