//! Fixed-point money helpers
//!
//! Every amount and balance in the ledger carries exactly two fractional
//! digits, the precision of a `DECIMAL(19,2)` column. Inputs with more digits
//! are rounded half away from zero, the way such a column stores them.

use super::account::AccountId;
use super::error::LedgerError;
use rust_decimal::{Decimal, RoundingStrategy};

/// Number of fractional digits kept for amounts and balances
pub const MONEY_SCALE: u32 = 2;

/// Largest balance a `DECIMAL(19,2)` column can hold
pub fn max_balance() -> Decimal {
    Decimal::from_i128_with_scale(9_999_999_999_999_999_999, MONEY_SCALE)
}

/// Round a value to money precision and pin its scale to two digits
///
/// Pinning the scale keeps `Display` output stable (`50` prints as `50.00`).
pub fn to_money(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(MONEY_SCALE);
    rounded
}

/// Validate a caller-supplied amount
///
/// # Errors
///
/// Returns `InvalidAmount` when the rounded amount is not strictly positive
/// or does not fit in a balance column.
pub fn normalize_amount(amount: Decimal) -> Result<Decimal, LedgerError> {
    let money = to_money(amount);
    if money <= Decimal::ZERO || money > max_balance() {
        return Err(LedgerError::invalid_amount(amount));
    }
    Ok(money)
}

/// Add `amount` to `balance`, refusing results a balance column cannot hold
pub fn checked_credit(
    account: AccountId,
    balance: Decimal,
    amount: Decimal,
) -> Result<Decimal, LedgerError> {
    balance
        .checked_add(amount)
        .filter(|total| *total <= max_balance())
        .map(to_money)
        .ok_or_else(|| LedgerError::balance_overflow(account))
}

/// Subtract `amount` from `balance`, refusing to go below zero
pub fn checked_debit(
    account: AccountId,
    balance: Decimal,
    amount: Decimal,
) -> Result<Decimal, LedgerError> {
    if balance < amount {
        return Err(LedgerError::insufficient_balance(account, balance, amount));
    }
    balance
        .checked_sub(amount)
        .map(to_money)
        .ok_or_else(|| LedgerError::insufficient_balance(account, balance, amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;

    #[rstest]
    #[case::whole("50", "50.00")]
    #[case::one_digit("12.5", "12.50")]
    #[case::exact("0.01", "0.01")]
    #[case::round_up("10.005", "10.01")]
    #[case::round_down("10.004", "10.00")]
    fn test_normalize_amount_rounds_to_cents(#[case] input: &str, #[case] expected: &str) {
        let amount = normalize_amount(Decimal::from_str(input).unwrap()).unwrap();
        assert_eq!(amount.to_string(), expected);
    }

    #[rstest]
    #[case::zero("0")]
    #[case::negative("-5.00")]
    #[case::rounds_to_zero("0.004")]
    #[case::too_large("100000000000000000.00")]
    fn test_normalize_amount_rejects(#[case] input: &str) {
        let result = normalize_amount(Decimal::from_str(input).unwrap());
        assert!(matches!(result, Err(LedgerError::InvalidAmount { .. })));
    }

    #[test]
    fn test_checked_credit_adds() {
        let total = checked_credit(1, Decimal::new(10000, 2), Decimal::new(5000, 2)).unwrap();
        assert_eq!(total.to_string(), "150.00");
    }

    #[test]
    fn test_checked_credit_refuses_column_overflow() {
        let result = checked_credit(1, max_balance(), Decimal::new(1, 2));
        assert_eq!(result, Err(LedgerError::balance_overflow(1)));
    }

    #[test]
    fn test_checked_debit_subtracts() {
        let rest = checked_debit(1, Decimal::new(15000, 2), Decimal::new(3000, 2)).unwrap();
        assert_eq!(rest.to_string(), "120.00");
    }

    #[test]
    fn test_checked_debit_allows_draining_to_zero() {
        let rest = checked_debit(1, Decimal::new(3000, 2), Decimal::new(3000, 2)).unwrap();
        assert_eq!(rest, Decimal::ZERO);
    }

    #[test]
    fn test_checked_debit_refuses_negative_balance() {
        let result = checked_debit(1, Decimal::new(1000, 2), Decimal::new(1001, 2));
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientBalance { .. })
        ));
    }
}
