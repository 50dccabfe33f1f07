use sqlx::types::BigDecimal;
use validator::ValidationError;

/// Ceiling of a `NUMERIC(14,2)` column.
const MAX_AMOUNT: i64 = 1_000_000_000_000;

/// Rounds to kopecks, the precision every money column stores.
pub fn to_money(value: &BigDecimal) -> BigDecimal {
    value.round(2).with_scale(2)
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

pub fn validate_positive_amount(value: &BigDecimal) -> Result<(), ValidationError> {
    let amount = to_money(value);
    if amount <= BigDecimal::from(0) {
        return Err(invalid("amount_not_positive", "Amount must be greater than 0"));
    }
    if amount >= BigDecimal::from(MAX_AMOUNT) {
        return Err(invalid("amount_too_large", "Amount is too large"));
    }
    Ok(())
}

pub fn validate_price(value: &BigDecimal) -> Result<(), ValidationError> {
    let amount = to_money(value);
    if amount < BigDecimal::from(0) {
        return Err(invalid("price_negative", "Target price must not be negative"));
    }
    if amount >= BigDecimal::from(MAX_AMOUNT) {
        return Err(invalid("price_too_large", "Target price is too large"));
    }
    Ok(())
}
