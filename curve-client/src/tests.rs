//! Tests for the curve parameter builder.

use {
    crate::{
        builder::{
            build_curve, dynamic_fee_params, fee_scheduler_params, parse_quote_threshold,
            CurveDefaults, FeeSchedule, FeeSchedulerMode, TokenType,
        },
        constants::{MAX_SQRT_PRICE, MIN_SQRT_PRICE},
        error::CurveClientError,
        fake::FakeLedger,
        params::LockedVestingParams,
    },
    assert_matches::assert_matches,
    test_case::test_case,
};

const ONE_SOL: u64 = 1_000_000_000;

fn defaults() -> CurveDefaults {
    CurveDefaults::default()
}

// ===========================================================================
// 1. Threshold parsing
// ===========================================================================

#[test_case("85", 85.0 ; "integer")]
#[test_case(" 0.5 ", 0.5 ; "fraction with whitespace")]
#[test_case("1e2", 100.0 ; "exponent")]
fn threshold_parses(raw: &str, expected: f64) {
    assert_eq!(parse_quote_threshold(raw).unwrap(), expected);
}

#[test_case("" ; "empty")]
#[test_case("   " ; "blank")]
#[test_case("abc" ; "not a number")]
#[test_case("0" ; "zero")]
#[test_case("-5" ; "negative")]
#[test_case("NaN" ; "nan")]
#[test_case("inf" ; "infinite")]
fn threshold_rejected(raw: &str) {
    assert_matches!(
        parse_quote_threshold(raw),
        Err(CurveClientError::InvalidParameter(_))
    );
}

// ===========================================================================
// 2. Payload shape with the launchpad defaults
// ===========================================================================

#[test]
fn default_payload_carries_launchpad_settings() {
    let params = build_curve(&defaults(), 85.0).unwrap();

    assert_eq!(params.migration_quote_threshold, 85 * ONE_SOL);
    assert_eq!(params.token_type, TokenType::Token2022 as u8);
    assert_eq!(params.migration_option, 1);
    assert_eq!(params.migration_fee_option, 3);
    assert_eq!(params.token_decimal, 9);
    assert_eq!(params.partner_locked_lp_percentage, 50);
    assert_eq!(params.creator_locked_lp_percentage, 50);
    assert_eq!(params.partner_lp_percentage + params.creator_lp_percentage, 0);
    assert_eq!(params.creator_trading_fee_percentage, 1);
    assert_eq!(params.token_update_authority, 1);

    let supply = params.token_supply.unwrap();
    assert_eq!(supply.pre_migration_token_supply, 1_000_000_000 * ONE_SOL);
    assert_eq!(supply.post_migration_token_supply, 1_000_000_000 * ONE_SOL);
}

#[test]
fn flat_fee_has_no_schedule() {
    let params = build_curve(&defaults(), 85.0).unwrap();
    let base_fee = params.pool_fees.base_fee;
    // 100 bps of a 1e9 denominator
    assert_eq!(base_fee.cliff_fee_numerator, 10_000_000);
    assert_eq!(base_fee.number_of_period, 0);
    assert_eq!(base_fee.period_frequency, 0);
    assert_eq!(base_fee.reduction_factor, 0);
}

#[test]
fn dynamic_fee_matches_reference_values() {
    let dynamic = dynamic_fee_params(100).unwrap();
    assert_eq!(dynamic.bin_step, 1);
    assert_eq!(dynamic.max_volatility_accumulator, 14_460_000);
    assert_eq!(dynamic.variable_fee_control, 956);

    let mut no_dynamic = defaults();
    no_dynamic.dynamic_fee_enabled = false;
    assert!(build_curve(&no_dynamic, 85.0).unwrap().pool_fees.dynamic_fee.is_none());
}

#[test]
fn curve_prices_are_ordered_and_in_bounds() {
    for threshold in [0.000_001, 1.0, 85.0, 10_000.0] {
        let params = build_curve(&defaults(), threshold).unwrap();
        let migration_sqrt_price = params.curve[0].sqrt_price;
        assert_eq!(params.curve.len(), 1);
        assert!(params.sqrt_start_price >= MIN_SQRT_PRICE);
        assert!(migration_sqrt_price <= MAX_SQRT_PRICE);
        assert!(
            params.sqrt_start_price < migration_sqrt_price,
            "start {} must be below migration {} for threshold {threshold}",
            params.sqrt_start_price,
            migration_sqrt_price
        );
        assert!(params.curve[0].liquidity > 0);
    }
}

#[test]
fn curve_liquidity_never_needs_more_quote_than_threshold() {
    let params = build_curve(&defaults(), 85.0).unwrap();
    let lower = params.sqrt_start_price as f64;
    let upper = params.curve[0].sqrt_price as f64;
    let liquidity = params.curve[0].liquidity as f64;
    let q128 = 2f64.powi(128);
    let quote_needed = liquidity * (upper - lower) / q128;
    assert!(quote_needed <= params.migration_quote_threshold as f64 * 1.000_001);
}

// ===========================================================================
// 3. Purity
// ===========================================================================

#[test]
fn identical_inputs_give_identical_bytes() {
    let ledger = FakeLedger::default();
    let first = borsh::to_vec(&build_curve(&defaults(), 42.5).unwrap()).unwrap();
    let second = borsh::to_vec(&build_curve(&defaults(), 42.5).unwrap()).unwrap();
    assert_eq!(first, second);
    assert_eq!(ledger.calls().total(), 0);
}

#[test]
fn different_thresholds_give_different_payloads() {
    let a = build_curve(&defaults(), 10.0).unwrap();
    let b = build_curve(&defaults(), 20.0).unwrap();
    assert_ne!(a, b);
}

// ===========================================================================
// 4. Rejections
// ===========================================================================

#[test_case(0.0 ; "zero")]
#[test_case(-1.0 ; "negative")]
#[test_case(f64::NAN ; "nan")]
#[test_case(f64::INFINITY ; "infinite")]
#[test_case(1e-12 ; "below one lamport")]
fn build_rejects_bad_threshold(threshold: f64) {
    assert_matches!(
        build_curve(&defaults(), threshold),
        Err(CurveClientError::InvalidParameter(_))
    );
}

#[test]
fn lp_split_must_sum_to_hundred() {
    let mut split = defaults();
    split.creator_locked_lp_percentage = 40;
    assert_matches!(
        build_curve(&split, 85.0),
        Err(CurveClientError::InvalidParameter(reason)) if reason.contains("sum to 100")
    );
}

#[test]
fn lp_split_per_party_capped() {
    let mut split = defaults();
    split.partner_lp_percentage = 60;
    split.partner_locked_lp_percentage = 50;
    split.creator_locked_lp_percentage = 0;
    assert_matches!(
        build_curve(&split, 85.0),
        Err(CurveClientError::InvalidParameter(reason)) if reason.contains("exceeds 100%")
    );
}

#[test]
fn migration_share_out_of_range() {
    for pct in [0, 100] {
        let mut config = defaults();
        config.percentage_supply_on_migration = pct;
        assert_matches!(
            build_curve(&config, 85.0),
            Err(CurveClientError::InvalidParameter(_))
        );
    }
}

#[test]
fn vesting_larger_than_supply_is_rejected() {
    let mut config = defaults();
    config.locked_vesting = LockedVestingParams {
        amount_per_period: u64::MAX / 2,
        number_of_period: 1,
        ..LockedVestingParams::default()
    };
    assert_matches!(
        build_curve(&config, 85.0),
        Err(CurveClientError::InvalidParameter(_))
    );
}

// ===========================================================================
// 5. Fee scheduler
// ===========================================================================

#[test]
fn linear_schedule_reduces_evenly() {
    let schedule = FeeSchedule {
        starting_fee_bps: 5_000,
        ending_fee_bps: 100,
        number_of_period: 49,
        total_duration: 4_900,
        mode: FeeSchedulerMode::Linear,
    };
    let params = fee_scheduler_params(&schedule).unwrap();
    assert_eq!(params.cliff_fee_numerator, 500_000_000);
    assert_eq!(params.period_frequency, 100);
    // (500_000_000 - 10_000_000) / 49
    assert_eq!(params.reduction_factor, 10_000_000);
}

#[test_case(5_000, 2_500, 1, 5_000 ; "halved in one period")]
#[test_case(8_000, 1_000, 3, 5_000 ; "halved per period")]
#[test_case(4_000, 1_000, 2, 5_000 ; "quartered over two periods")]
fn exponential_schedule_decays_geometrically(
    starting_fee_bps: u16,
    ending_fee_bps: u16,
    number_of_period: u16,
    expected_reduction: u64,
) {
    let schedule = FeeSchedule {
        starting_fee_bps,
        ending_fee_bps,
        number_of_period,
        total_duration: 600,
        mode: FeeSchedulerMode::Exponential,
    };
    let params = fee_scheduler_params(&schedule).unwrap();
    assert_eq!(params.fee_scheduler_mode, FeeSchedulerMode::Exponential as u8);
    assert_eq!(params.number_of_period, number_of_period);
    assert_eq!(params.period_frequency, 600 / u64::from(number_of_period));
    // reduction factor is in basis points of the remaining fee per period
    assert!(params.reduction_factor.abs_diff(expected_reduction) <= 1);
}

#[test]
fn flat_schedule_with_periods_is_rejected() {
    let mut schedule = FeeSchedule::flat(100);
    schedule.number_of_period = 3;
    assert_matches!(
        fee_scheduler_params(&schedule),
        Err(CurveClientError::InvalidParameter(_))
    );
}

#[test]
fn rising_fee_is_rejected() {
    let schedule = FeeSchedule {
        starting_fee_bps: 100,
        ending_fee_bps: 200,
        number_of_period: 1,
        total_duration: 10,
        mode: FeeSchedulerMode::Linear,
    };
    assert_matches!(
        fee_scheduler_params(&schedule),
        Err(CurveClientError::InvalidParameter(_))
    );
}
