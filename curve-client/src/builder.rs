//! Curve parameter builder.
//!
//! Turns a handful of business parameters (total supply, share of supply kept
//! for migration, migration quote threshold, fee schedule) into the complete
//! [`ConfigParameters`] payload expected by `create_config`.
//!
//! The curve is a single constant-product segment ending at the migration
//! price:
//!
//! ```text
//! migration price  = migration quote amount / migration base supply
//! swap amount      = total supply - migration base amount - vesting - leftover
//! sqrt start price = sqrt migration price * migration base amount
//!                    / (swap amount * (1 - migration fee))
//! liquidity        = min(L from base, L from quote) over [start, migration]
//! ```
//!
//! Everything here is pure: no I/O, and identical inputs always produce
//! identical payloads.

use {
    crate::{
        constants::{
            dynamic_fee, FEE_DENOMINATOR, MAX_BASIS_POINT, MAX_FEE_BPS, MAX_SQRT_PRICE,
            MIN_SQRT_PRICE,
        },
        error::{CurveClientError, Result},
        params::{
            BaseFeeParameters, ConfigParameters, DynamicFeeParameters,
            LiquidityDistributionParameters, LockedVestingParams, MigratedPoolFee, MigrationFee,
            PoolFeeParameters, TokenSupplyParams,
        },
    },
    std::str::FromStr,
};

const Q64: f64 = 18_446_744_073_709_551_616.0;
const Q128: f64 = Q64 * Q64;

/// Token program the base mint is created under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TokenType {
    SplToken = 0,
    Token2022 = 1,
}

/// Post-migration AMM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MigrationOption {
    DammV1 = 0,
    DammV2 = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FeeSchedulerMode {
    Linear = 0,
    Exponential = 1,
}

/// Base fee schedule in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    pub starting_fee_bps: u16,
    pub ending_fee_bps: u16,
    pub number_of_period: u16,
    pub total_duration: u64,
    pub mode: FeeSchedulerMode,
}

impl FeeSchedule {
    /// A fee that never changes.
    pub fn flat(fee_bps: u16) -> Self {
        Self {
            starting_fee_bps: fee_bps,
            ending_fee_bps: fee_bps,
            number_of_period: 0,
            total_duration: 0,
            mode: FeeSchedulerMode::Linear,
        }
    }
}

/// Everything about a launch configuration except the migration threshold.
///
/// Supplies are in whole tokens; decimals are applied by the builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveDefaults {
    pub total_token_supply: u64,
    pub percentage_supply_on_migration: u8,
    pub migration_option: MigrationOption,
    pub token_base_decimal: u8,
    pub token_quote_decimal: u8,
    pub locked_vesting: LockedVestingParams,
    pub base_fee: FeeSchedule,
    pub dynamic_fee_enabled: bool,
    /// 0 = slot, 1 = timestamp.
    pub activation_type: u8,
    /// 0 = quote token only, 1 = both tokens.
    pub collect_fee_mode: u8,
    /// 0..=5 are the fixed 25/30/100/200/400/600 bps tiers.
    pub migration_fee_option: u8,
    pub token_type: TokenType,
    pub partner_lp_percentage: u8,
    pub creator_lp_percentage: u8,
    pub partner_locked_lp_percentage: u8,
    pub creator_locked_lp_percentage: u8,
    pub creator_trading_fee_percentage: u8,
    /// Base tokens left over after migration, in whole tokens.
    pub leftover: u64,
    /// 0 = creator, 1 = immutable.
    pub token_update_authority: u8,
    pub migration_fee: MigrationFee,
}

impl Default for CurveDefaults {
    fn default() -> Self {
        Self {
            total_token_supply: 1_000_000_000,
            percentage_supply_on_migration: 10,
            migration_option: MigrationOption::DammV2,
            token_base_decimal: 9,
            token_quote_decimal: 9,
            locked_vesting: LockedVestingParams::default(),
            base_fee: FeeSchedule::flat(100),
            dynamic_fee_enabled: true,
            activation_type: 0,
            collect_fee_mode: 0,
            migration_fee_option: 3, // fixed 200 bps
            token_type: TokenType::Token2022,
            partner_lp_percentage: 0,
            creator_lp_percentage: 0,
            partner_locked_lp_percentage: 50,
            creator_locked_lp_percentage: 50,
            creator_trading_fee_percentage: 1,
            leftover: 0,
            token_update_authority: 1,
            migration_fee: MigrationFee::default(),
        }
    }
}

/// Parse a migration quote threshold as received from a caller.
///
/// Accepts decimal notation ("85", "0.5", "1e2"). Rejects blanks, non-numbers,
/// non-finite values and anything not strictly positive.
pub fn parse_quote_threshold(raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CurveClientError::invalid_parameter(
            "migration quote threshold is empty",
        ));
    }
    let value = f64::from_str(trimmed).map_err(|_| {
        CurveClientError::invalid_parameter(format!(
            "migration quote threshold {trimmed:?} is not a number"
        ))
    })?;
    validate_threshold(value)?;
    Ok(value)
}

fn validate_threshold(value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(CurveClientError::invalid_parameter(format!(
            "migration quote threshold must be a positive number, got {value}"
        )));
    }
    Ok(())
}

/// Convert a whole-unit amount into atomic units.
fn to_atomic(amount: u64, decimals: u8) -> Result<u64> {
    10u64
        .checked_pow(u32::from(decimals))
        .and_then(|scale| amount.checked_mul(scale))
        .ok_or_else(|| {
            CurveClientError::invalid_parameter(format!(
                "{amount} with {decimals} decimals overflows u64"
            ))
        })
}

pub fn bps_to_fee_numerator(bps: u64) -> u64 {
    bps * FEE_DENOMINATOR / MAX_BASIS_POINT
}

fn validate_lp_split(defaults: &CurveDefaults) -> Result<()> {
    let partner = u16::from(defaults.partner_lp_percentage)
        + u16::from(defaults.partner_locked_lp_percentage);
    let creator = u16::from(defaults.creator_lp_percentage)
        + u16::from(defaults.creator_locked_lp_percentage);
    if partner > 100 || creator > 100 {
        return Err(CurveClientError::invalid_parameter(format!(
            "lp split exceeds 100% for one party (partner {partner}%, creator {creator}%)"
        )));
    }
    if partner + creator != 100 {
        return Err(CurveClientError::invalid_parameter(format!(
            "lp percentages must sum to 100, got {}",
            partner + creator
        )));
    }
    Ok(())
}

/// Base fee parameters for a linear or exponential fee scheduler.
pub fn fee_scheduler_params(schedule: &FeeSchedule) -> Result<BaseFeeParameters> {
    let FeeSchedule {
        starting_fee_bps,
        ending_fee_bps,
        number_of_period,
        total_duration,
        mode,
    } = *schedule;

    if starting_fee_bps > MAX_FEE_BPS {
        return Err(CurveClientError::invalid_parameter(format!(
            "starting fee {starting_fee_bps} bps exceeds maximum {MAX_FEE_BPS} bps"
        )));
    }
    if ending_fee_bps > starting_fee_bps {
        return Err(CurveClientError::invalid_parameter(format!(
            "ending fee {ending_fee_bps} bps is above starting fee {starting_fee_bps} bps"
        )));
    }

    let max_numerator = bps_to_fee_numerator(u64::from(starting_fee_bps));
    if starting_fee_bps == ending_fee_bps {
        if number_of_period != 0 || total_duration != 0 {
            return Err(CurveClientError::invalid_parameter(
                "a flat fee must have zero periods and zero duration",
            ));
        }
        return Ok(BaseFeeParameters {
            cliff_fee_numerator: max_numerator,
            fee_scheduler_mode: mode as u8,
            ..BaseFeeParameters::default()
        });
    }

    if number_of_period == 0 {
        return Err(CurveClientError::invalid_parameter(
            "a decaying fee needs at least one period",
        ));
    }
    let min_numerator = bps_to_fee_numerator(u64::from(ending_fee_bps));
    let periods = u64::from(number_of_period);
    let reduction_factor = match mode {
        FeeSchedulerMode::Linear => (max_numerator - min_numerator) / periods,
        FeeSchedulerMode::Exponential => {
            let ratio = min_numerator as f64 / max_numerator as f64;
            let decay_base = ratio.powf(1.0 / periods as f64);
            (MAX_BASIS_POINT as f64 * (1.0 - decay_base)) as u64
        }
    };

    Ok(BaseFeeParameters {
        cliff_fee_numerator: max_numerator,
        number_of_period,
        period_frequency: total_duration / periods,
        reduction_factor,
        fee_scheduler_mode: mode as u8,
    })
}

/// Dynamic fee parameters sized so the surcharge tops out at a fixed share of the base fee.
pub fn dynamic_fee_params(base_fee_bps: u16) -> Result<DynamicFeeParameters> {
    let price_ratio = 1.0 + dynamic_fee::MAX_PRICE_CHANGE_BPS as f64 / MAX_BASIS_POINT as f64;
    let sqrt_price_ratio_q64 = (price_ratio.sqrt() * Q64) as u128;
    let one_q64 = 1u128 << 64;
    let delta_bin_id = (sqrt_price_ratio_q64 - one_q64) / dynamic_fee::BIN_STEP_BPS_U128 * 2;
    let max_volatility_accumulator = delta_bin_id * u128::from(MAX_BASIS_POINT);
    let square_vfa_bin =
        (max_volatility_accumulator * u128::from(dynamic_fee::BIN_STEP_BPS)).pow(2);

    let base_fee_numerator = u128::from(bps_to_fee_numerator(u64::from(base_fee_bps)));
    let max_dynamic_fee_numerator =
        base_fee_numerator * u128::from(dynamic_fee::MAX_DYNAMIC_FEE_PERCENT) / 100;
    let v_fee = (max_dynamic_fee_numerator * dynamic_fee::SCALING_FACTOR)
        .saturating_sub(dynamic_fee::SCALING_FACTOR - 1);
    let variable_fee_control = v_fee / square_vfa_bin;

    let overflow = |field: &str| {
        CurveClientError::invalid_parameter(format!("dynamic fee {field} does not fit in u32"))
    };
    Ok(DynamicFeeParameters {
        bin_step: dynamic_fee::BIN_STEP_BPS,
        bin_step_u128: dynamic_fee::BIN_STEP_BPS_U128,
        filter_period: dynamic_fee::FILTER_PERIOD,
        decay_period: dynamic_fee::DECAY_PERIOD,
        reduction_factor: dynamic_fee::REDUCTION_FACTOR,
        max_volatility_accumulator: u32::try_from(max_volatility_accumulator)
            .map_err(|_| overflow("max volatility accumulator"))?,
        variable_fee_control: u32::try_from(variable_fee_control)
            .map_err(|_| overflow("variable fee control"))?,
    })
}

/// Q64.64 square root of an atomic-unit price.
fn sqrt_price_q64(price: f64) -> u128 {
    (price.sqrt() * Q64) as u128
}

fn price_from_sqrt_q64(sqrt_price: u128) -> f64 {
    let root = sqrt_price as f64 / Q64;
    root * root
}

/// Liquidity able to hold `base_amount` of base between `lower` and `upper`.
fn liquidity_from_base(base_amount: u64, lower: u128, upper: u128) -> f64 {
    let (lower, upper) = (lower as f64, upper as f64);
    base_amount as f64 * lower * upper / (upper - lower)
}

/// Liquidity able to hold `quote_amount` of quote between `lower` and `upper`.
fn liquidity_from_quote(quote_amount: u64, lower: u128, upper: u128) -> f64 {
    quote_amount as f64 * Q128 / (upper as f64 - lower as f64)
}

/// Build the full `create_config` payload.
///
/// `migration_quote_threshold` is in whole quote tokens (SOL for a wrapped
/// SOL quote mint).
pub fn build_curve(
    defaults: &CurveDefaults,
    migration_quote_threshold: f64,
) -> Result<ConfigParameters> {
    validate_threshold(migration_quote_threshold)?;
    validate_lp_split(defaults)?;
    if defaults.total_token_supply == 0 {
        return Err(CurveClientError::invalid_parameter(
            "total token supply must be positive",
        ));
    }
    if !(1..=99).contains(&defaults.percentage_supply_on_migration) {
        return Err(CurveClientError::invalid_parameter(format!(
            "percentage of supply on migration must be within 1..=99, got {}",
            defaults.percentage_supply_on_migration
        )));
    }
    if defaults.migration_fee.fee_percentage > 50 || defaults.migration_fee.creator_fee_percentage > 100 {
        return Err(CurveClientError::invalid_parameter(
            "migration fee percentages out of range",
        ));
    }

    let quote_scale = 10f64.powi(i32::from(defaults.token_quote_decimal));
    let threshold_atomic = (migration_quote_threshold * quote_scale).round();
    if threshold_atomic < 1.0 || threshold_atomic >= u64::MAX as f64 {
        return Err(CurveClientError::invalid_parameter(format!(
            "migration quote threshold {migration_quote_threshold} is not representable \
             with {} decimals",
            defaults.token_quote_decimal
        )));
    }
    let migration_quote_threshold = threshold_atomic as u64;

    let total_supply = to_atomic(defaults.total_token_supply, defaults.token_base_decimal)?;
    let leftover = to_atomic(defaults.leftover, defaults.token_base_decimal)?;
    let vesting = defaults
        .locked_vesting
        .total_amount()
        .ok_or_else(|| CurveClientError::invalid_parameter("locked vesting amount overflows"))?;

    let migration_base_supply = (u128::from(total_supply)
        * u128::from(defaults.percentage_supply_on_migration)
        / 100) as u64;
    let fee_percent = u128::from(defaults.migration_fee.fee_percentage);
    let migration_quote_amount =
        (u128::from(migration_quote_threshold) * (100 - fee_percent) / 100) as u64;
    if migration_quote_amount == 0 {
        return Err(CurveClientError::invalid_parameter(
            "migration quote amount rounds to zero",
        ));
    }

    let migration_price = migration_quote_amount as f64 / migration_base_supply as f64;
    let migration_sqrt_price = sqrt_price_q64(migration_price);
    let migration_base_amount =
        (migration_quote_amount as f64 / price_from_sqrt_q64(migration_sqrt_price)).ceil() as u64;

    let swap_amount = total_supply
        .checked_sub(migration_base_amount)
        .and_then(|amount| amount.checked_sub(vesting))
        .and_then(|amount| amount.checked_sub(leftover))
        .filter(|amount| *amount > 0)
        .ok_or_else(|| {
            CurveClientError::invalid_parameter(
                "total supply cannot cover migration, vesting and leftover amounts",
            )
        })?;

    let swap_after_fee = swap_amount as f64 * (100 - fee_percent) as f64 / 100.0;
    let sqrt_start_price =
        (migration_sqrt_price as f64 * migration_base_amount as f64 / swap_after_fee) as u128;

    if sqrt_start_price < MIN_SQRT_PRICE
        || migration_sqrt_price > MAX_SQRT_PRICE
        || sqrt_start_price >= migration_sqrt_price
    {
        return Err(CurveClientError::invalid_parameter(format!(
            "curve price range [{sqrt_start_price}, {migration_sqrt_price}] is invalid"
        )));
    }

    let liquidity = liquidity_from_base(swap_amount, sqrt_start_price, migration_sqrt_price)
        .min(liquidity_from_quote(
            migration_quote_threshold,
            sqrt_start_price,
            migration_sqrt_price,
        ))
        .floor() as u128;

    let base_fee = fee_scheduler_params(&defaults.base_fee)?;
    let dynamic_fee = if defaults.dynamic_fee_enabled {
        Some(dynamic_fee_params(defaults.base_fee.ending_fee_bps)?)
    } else {
        None
    };

    Ok(ConfigParameters {
        pool_fees: PoolFeeParameters {
            base_fee,
            dynamic_fee,
        },
        collect_fee_mode: defaults.collect_fee_mode,
        migration_option: defaults.migration_option as u8,
        activation_type: defaults.activation_type,
        token_type: defaults.token_type as u8,
        token_decimal: defaults.token_base_decimal,
        partner_lp_percentage: defaults.partner_lp_percentage,
        partner_locked_lp_percentage: defaults.partner_locked_lp_percentage,
        creator_lp_percentage: defaults.creator_lp_percentage,
        creator_locked_lp_percentage: defaults.creator_locked_lp_percentage,
        migration_quote_threshold,
        sqrt_start_price,
        locked_vesting: defaults.locked_vesting,
        migration_fee_option: defaults.migration_fee_option,
        token_supply: Some(TokenSupplyParams {
            pre_migration_token_supply: total_supply,
            post_migration_token_supply: total_supply,
        }),
        creator_trading_fee_percentage: defaults.creator_trading_fee_percentage,
        token_update_authority: defaults.token_update_authority,
        migration_fee: defaults.migration_fee,
        migrated_pool_fee: MigratedPoolFee::default(),
        padding: [0; 7],
        curve: vec![LiquidityDistributionParameters {
            sqrt_price: migration_sqrt_price,
            liquidity,
        }],
    })
}
