//! Integration tests for the engine components working together.
//!
//! Tests cover:
//! - Trend filter scenarios (rising series, constant price)
//! - Realised volatility scaling and hysteresis idempotence
//! - Mapper normalisation, net exposure and boundary continuity
//! - Drawdown governor monotonicity and neutral pull
//! - Safe-haven fallback
//! - Engine replay through a mock data port

mod common;

use approx::assert_relative_eq;
use common::*;
use proptest::prelude::*;
use regimetrader::cli::{run_signal_pipeline, SignalOptions};
use regimetrader::domain::drawdown::{DrawdownConfig, DrawdownGovernor};
use regimetrader::domain::engine::{Decision, RegimeEngine};
use regimetrader::domain::error::RegimeError;
use regimetrader::domain::instrument::{Instrument, WeightVector, WEIGHT_SCALE};
use regimetrader::domain::mapper::{ExposureBounds, ExposureMapper};
use regimetrader::domain::regime::{Posture, RegimeCell, TrendState};
use regimetrader::domain::safe_haven::{BondTrend, SafeHavenConfig, SafeHavenOverlay};
use regimetrader::domain::trend_filter::{FilterInput, NoiseMode, TrendFilter, TrendFilterConfig};
use regimetrader::domain::volatility::{realized_volatility, Hysteresis, VolState};

fn wide_mapper() -> ExposureMapper {
    ExposureMapper::new(ExposureBounds {
        min: -3.0,
        max: 3.0,
    })
    .unwrap()
}

fn max_weight_gap(a: &WeightVector, b: &WeightVector) -> f64 {
    Instrument::ALL
        .iter()
        .map(|&i| (a.weight(i) - b.weight(i)).abs())
        .fold(0.0, f64::max)
}

mod trend_filter_scenarios {
    use super::*;

    #[test]
    fn rising_series_positive_for_final_fifty_bars() {
        for noise_mode in [
            NoiseMode::Standard,
            NoiseMode::VolumeAdjusted,
            NoiseMode::RangeAdjusted,
        ] {
            let config = TrendFilterConfig {
                noise_mode,
                ..TrendFilterConfig::default()
            };
            let mut filter = TrendFilter::new(config).unwrap();
            let mut strengths = Vec::new();
            for i in 0..200 {
                let close = 100.0 + i as f64;
                let reading = filter.update(FilterInput {
                    close,
                    high: Some(close + 0.5),
                    low: Some(close - 0.5),
                    volume: Some(1_000_000.0),
                });
                strengths.push(reading.trend_strength);
            }
            assert!(
                strengths[150..].iter().all(|&s| s > 0.0),
                "{noise_mode}: {:?}",
                &strengths[150..]
            );
        }
    }

    #[test]
    fn constant_price_decays_to_zero() {
        let config = TrendFilterConfig {
            sigma_lookback: 20,
            ..TrendFilterConfig::default()
        };
        let mut filter = TrendFilter::new(config).unwrap();
        let mut last = f64::NAN;
        for _ in 0..60 {
            last = filter.update(FilterInput::close(250.0)).trend_strength;
        }
        assert!(last.abs() < 1e-9);
    }
}

mod volatility_scenarios {
    use super::*;

    /// 21 log returns with sample stddev exactly 0.01 (up to rounding).
    fn returns_with_unit_percent_std() -> Vec<f64> {
        let raw: Vec<f64> = (0..21).map(|i| if i % 3 == 0 { 2.0 } else { -1.0 }).collect();
        let n = raw.len() as f64;
        let mean = raw.iter().sum::<f64>() / n;
        let sd = (raw.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt();
        raw.iter().map(|x| (x - mean) / sd * 0.01 + 0.0005).collect()
    }

    #[test]
    fn realized_volatility_annualises_by_sqrt_252() {
        let mut closes = vec![100.0];
        for r in returns_with_unit_percent_std() {
            let last = *closes.last().unwrap();
            closes.push(last * r.exp());
        }
        let vols = realized_volatility(&closes, 21);
        assert_eq!(vols.len(), 1);
        assert_relative_eq!(vols[0], 0.01 * 252f64.sqrt(), max_relative = 1e-6);
        assert_relative_eq!(vols[0], 0.158745, max_relative = 1e-5);
    }

    proptest! {
        #[test]
        fn high_state_holds_inside_deadband(
            zs in prop::collection::vec(0.0f64..1.0, 1..100)
        ) {
            let mut h = Hysteresis::new(1.0, 0.0, 0);
            prop_assert_eq!(h.step(2.5), VolState::High);
            for z in zs {
                prop_assert_eq!(h.step(z), VolState::High);
            }
            prop_assert_eq!(h.step(-0.01), VolState::Low);
        }

        #[test]
        fn low_state_holds_inside_deadband(
            zs in prop::collection::vec(0.0f64..=1.0, 1..100)
        ) {
            let mut h = Hysteresis::new(1.0, 0.0, 0);
            prop_assert_eq!(h.step(-1.0), VolState::Low);
            for z in zs {
                prop_assert_eq!(h.step(z), VolState::Low);
            }
            prop_assert_eq!(h.step(1.01), VolState::High);
        }
    }
}

mod mapper_properties {
    use super::*;

    proptest! {
        #[test]
        fn weights_sum_to_one_and_reconstruct_exposure(e in -3.0f64..=3.0) {
            let w = wide_mapper().map(e);
            prop_assert!((w.total() - 1.0).abs() < 1e-9);
            prop_assert!((w.net_exposure() - e).abs() < 1e-9);
            prop_assert!(w.iter().all(|(_, weight)| weight >= 0.0));
        }

        #[test]
        fn out_of_bounds_exposure_is_clamped(e in -10.0f64..10.0) {
            let mapper = ExposureMapper::new(ExposureBounds::default()).unwrap();
            let w = mapper.map(e);
            prop_assert!((w.net_exposure() - e.clamp(-1.0, 2.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn continuous_at_zero_and_one() {
        let mapper = wide_mapper();
        for boundary in [0.0, 1.0] {
            let below = mapper.map(boundary - 1e-9);
            let above = mapper.map(boundary + 1e-9);
            assert!(max_weight_gap(&below, &above) < 1e-6, "gap at {boundary}");
        }
    }

    #[test]
    fn net_exposure_continuous_at_minus_one() {
        let mapper = wide_mapper();
        let below = mapper.map(-1.0 - 1e-9);
        let above = mapper.map(-1.0 + 1e-9);
        assert!((below.net_exposure() - above.net_exposure()).abs() < 1e-6);
    }

    #[test]
    fn leveraged_long_example_is_exact() {
        let w = wide_mapper().map(1.4);
        assert_eq!(w.weight(Instrument::LeveragedLong), 0.2);
        assert_eq!(w.weight(Instrument::Core), 0.8);
    }
}

mod governor_properties {
    use super::*;

    fn governor() -> DrawdownGovernor {
        DrawdownGovernor::new(DrawdownConfig::default()).unwrap()
    }

    proptest! {
        #[test]
        fn leveraged_exposure_non_increasing_in_drawdown(
            raw in 1.0001f64..3.0,
            a in 0.10f64..0.20,
            b in 0.10f64..0.20,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let g = governor();
            prop_assert!(g.govern(raw, hi) <= g.govern(raw, lo) + 1e-12);
        }

        #[test]
        fn pinned_at_neutral_beyond_hard(raw in -3.0f64..3.0, dd in 0.20f64..=1.0) {
            prop_assert_eq!(governor().govern(raw, dd), 1.0);
        }

        #[test]
        fn never_moves_away_from_neutral(raw in -3.0f64..3.0, dd in 0.0f64..=1.0) {
            let adjusted = governor().govern(raw, dd);
            prop_assert!((adjusted - 1.0).abs() <= (raw - 1.0).abs() + 1e-12);
        }
    }
}

mod safe_haven_fallback {
    use super::*;

    proptest! {
        #[test]
        fn short_bond_history_is_all_cash(n in 0usize..60, dw in 0.0f64..=1.0) {
            let overlay = SafeHavenOverlay::new(SafeHavenConfig::default()).unwrap();
            let prices: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
            let a = overlay.allocate(&prices, dw);
            prop_assert_eq!(a.len(), 1);
            prop_assert_eq!(a.get(&Instrument::Cash).copied(), Some(dw));
        }
    }

    #[test]
    fn bull_bond_scenario() {
        let overlay = SafeHavenOverlay::new(SafeHavenConfig::default()).unwrap();
        let prices: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let a = overlay.allocate(&prices, 1.0);
        assert_eq!(a.len(), 2);
        assert_eq!(a[&Instrument::BullBond], 0.4);
        assert_eq!(a[&Instrument::Cash], 0.6);
    }
}

mod engine_replay {
    use super::*;

    fn wobbly_rise(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + i as f64 + 0.3 * (i as f64).sin())
            .collect()
    }

    fn wobbly_fall(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 300.0 - i as f64 + 0.3 * (i as f64).sin())
            .collect()
    }

    #[test]
    fn one_allocation_per_bar_after_warm_up() {
        let config = fast_config();
        let minimum = config.min_history();
        let port = MockDataPort::new().with_bars("QQQ", generate_bars("QQQ", &wobbly_rise(80)));

        let allocations = run_signal_pipeline(&port, config, &SignalOptions::default()).unwrap();

        assert_eq!(minimum, 20);
        assert_eq!(allocations.len(), 80 - minimum + 1);
        for a in &allocations {
            let parts: i64 = Instrument::ALL.iter().map(|&i| a.weights.parts(i)).sum();
            assert_eq!(parts, WEIGHT_SCALE);
            assert!((a.weights.net_exposure() - a.adjusted_exposure()).abs() < 1e-9);
        }
    }

    #[test]
    fn rising_market_ends_in_bull_cell() {
        let port = MockDataPort::new().with_bars("QQQ", generate_bars("QQQ", &wobbly_rise(80)));
        let allocations =
            run_signal_pipeline(&port, fast_config(), &SignalOptions::default()).unwrap();
        let last = allocations.last().unwrap();
        assert_eq!(last.trend_state, TrendState::BullStrong);
        assert_eq!(last.posture, Posture::Aggressive);
        assert!(last.adjusted_exposure() >= 1.0);
        assert!(!last.weights.contains(Instrument::BullBond));
        assert!(!last.weights.contains(Instrument::BearBond));
    }

    #[test]
    fn falling_market_routes_defensive_weight_to_bonds() {
        let port = MockDataPort::new()
            .with_bars("QQQ", generate_bars("QQQ", &wobbly_fall(80)))
            .with_bars("TLT", generate_bars("TLT", &linear_closes(80, 90.0, 0.5)));
        let allocations =
            run_signal_pipeline(&port, fast_config(), &SignalOptions::default()).unwrap();
        let last = allocations.last().unwrap();
        assert_eq!(last.trend_state, TrendState::BearStrong);
        assert!(matches!(
            last.cell,
            RegimeCell::BearQuiet | RegimeCell::BearVolatile
        ));
        assert!(last.weights.contains(Instrument::BullBond));
        assert!(!last.weights.contains(Instrument::BearBond));
        assert!((last.weights.total() - 1.0).abs() < 1e-12);
        assert!((last.weights.net_exposure() - last.adjusted_exposure()).abs() < 1e-9);
    }

    #[test]
    fn bond_symbol_option_drives_overlay_without_configured_trend() {
        let mut config = fast_config();
        config.instruments.bond_trend = None;
        let port = MockDataPort::new()
            .with_bars("QQQ", generate_bars("QQQ", &wobbly_fall(80)))
            .with_bars("IEF", generate_bars("IEF", &linear_closes(80, 90.0, 0.5)));
        let options = SignalOptions {
            bond_symbol: Some("IEF".to_string()),
            ..SignalOptions::default()
        };

        let allocations = run_signal_pipeline(&port, config, &options).unwrap();
        let last = allocations.last().unwrap();
        assert_eq!(last.posture, Posture::Defensive);
        assert_eq!(last.bond_trend, Some(BondTrend::Bull));
        assert!(last.weights.contains(Instrument::BullBond));
        assert!((last.weights.net_exposure() - last.adjusted_exposure()).abs() < 1e-9);
    }

    #[test]
    fn bond_symbol_option_needs_bond_instruments() {
        let mut config = fast_config();
        config.instruments.bull_bond = None;
        let port = MockDataPort::new()
            .with_bars("QQQ", generate_bars("QQQ", &wobbly_fall(80)))
            .with_bars("IEF", generate_bars("IEF", &linear_closes(80, 90.0, 0.5)));
        let options = SignalOptions {
            bond_symbol: Some("IEF".to_string()),
            ..SignalOptions::default()
        };

        let err = run_signal_pipeline(&port, config, &options).unwrap_err();
        assert!(matches!(
            err,
            RegimeError::ConfigInvalid { section, key, .. }
                if section == "instruments" && key == "bond_trend"
        ));
    }

    #[test]
    fn missing_bond_symbol_falls_back_to_cash() {
        let port = MockDataPort::new().with_bars("QQQ", generate_bars("QQQ", &wobbly_fall(80)));
        let allocations =
            run_signal_pipeline(&port, fast_config(), &SignalOptions::default()).unwrap();
        for a in &allocations {
            assert!(!a.weights.contains(Instrument::BullBond));
            assert!(!a.weights.contains(Instrument::BearBond));
        }
    }

    #[test]
    fn drawdown_override_pins_neutral() {
        let port = MockDataPort::new().with_bars("QQQ", generate_bars("QQQ", &wobbly_rise(60)));
        let options = SignalOptions {
            drawdown: Some(0.5),
            ..SignalOptions::default()
        };
        let allocations = run_signal_pipeline(&port, fast_config(), &options).unwrap();
        assert!(!allocations.is_empty());
        for a in &allocations {
            assert_eq!(a.adjusted_exposure(), 1.0);
            assert_eq!(a.weights.weight(Instrument::Core), 1.0);
        }
    }

    #[test]
    fn drawdown_override_out_of_range_rejected() {
        let port = MockDataPort::new().with_bars("QQQ", generate_bars("QQQ", &wobbly_rise(60)));
        let options = SignalOptions {
            drawdown: Some(1.5),
            ..SignalOptions::default()
        };
        let err = run_signal_pipeline(&port, fast_config(), &options).unwrap_err();
        assert!(matches!(err, RegimeError::ConfigInvalid { .. }));
    }

    #[test]
    fn short_history_is_insufficient_data() {
        let port = MockDataPort::new().with_bars("QQQ", generate_bars("QQQ", &wobbly_rise(10)));
        let err = run_signal_pipeline(&port, fast_config(), &SignalOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            RegimeError::InsufficientData { bars: 10, minimum: 20, .. }
        ));
    }

    #[test]
    fn unknown_symbol_is_no_data() {
        let port = MockDataPort::new();
        let options = SignalOptions {
            symbol: Some("SPY".into()),
            ..SignalOptions::default()
        };
        let err = run_signal_pipeline(&port, fast_config(), &options).unwrap_err();
        assert!(matches!(err, RegimeError::NoData { symbol } if symbol == "SPY"));
    }

    #[test]
    fn bond_data_error_propagates() {
        let port = MockDataPort::new()
            .with_bars("QQQ", generate_bars("QQQ", &wobbly_rise(40)))
            .with_error("TLT", "corrupt file");
        let err = run_signal_pipeline(&port, fast_config(), &SignalOptions::default()).unwrap_err();
        assert!(matches!(err, RegimeError::Data { .. }));
    }

    #[test]
    fn engine_state_is_per_instance() {
        let bars = generate_bars("QQQ", &oscillating_closes(120, 100.0, 0.001));
        let mut a = RegimeEngine::new(fast_config()).unwrap();
        let mut b = RegimeEngine::new(fast_config()).unwrap();
        let flat = regimetrader::domain::drawdown::DrawdownState::flat(1.0);
        for bar in &bars[..50] {
            let _ = a.on_bar(bar, None, &flat);
        }
        // b never saw the first 50 bars, so it is still warming up.
        let da = a.on_bar(&bars[50], None, &flat);
        let db = b.on_bar(&bars[50], None, &flat);
        assert!(da.is_actionable());
        assert_eq!(db, Decision::NotReady { bars: 1, minimum: 20 });
    }
}
