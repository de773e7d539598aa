use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places kept for every stored monetary amount (DECIMAL(15,2) columns)
pub const MONEY_SCALE: u32 = 2;

/// Rounds an amount to the stored money scale, midpoint away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Exact comparison that ignores trailing-zero scale differences (161340 == 161340.00)
pub fn amounts_equal(a: Decimal, b: Decimal) -> bool {
    a.normalize() == b.normalize()
}

/// Validates a caller-supplied amount: non-negative with at most two decimal places
pub fn validate_amount(field: &str, amount: Decimal) -> Result<(), String> {
    if amount < Decimal::ZERO {
        return Err(format!("{} cannot be negative", field));
    }

    if amount.normalize().scale() > MONEY_SCALE {
        return Err(format!(
            "{} must have at most {} decimal places, got {}",
            field,
            MONEY_SCALE,
            amount.normalize().scale()
        ));
    }

    Ok(())
}

/// Formats an amount for log lines and messages, e.g. `IDR 161340.00`
pub fn format_idr(amount: Decimal) -> String {
    format!("IDR {:.2}", round_money(amount))
}
