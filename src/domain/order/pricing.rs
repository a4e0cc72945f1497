//! Order line pricing math.
//!
//! Operator input arrives as raw text from a draft form. Anything that does
//! not parse as a non-negative number is coerced to zero instead of being
//! rejected, so a half-typed value never blocks editing.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use super::value_objects::{Adjustments, OrderLine, OrderTotals};

/// Largest accepted money amount (10^15); anything above is treated as a typo
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// `quantity * unit_price * (1 - discount_rate / 100)`, without rounding.
/// Saturates at `Decimal::MAX` instead of overflowing.
pub fn line_total(quantity: i32, unit_price: Decimal, discount_rate: Decimal) -> Decimal {
    Decimal::from(quantity)
        .checked_mul(unit_price)
        .and_then(|v| v.checked_mul(Decimal::ONE_HUNDRED - discount_rate))
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::MAX)
}

/// Parse a non-negative amount; NaN, negatives, amounts above `MAX_AMOUNT`
/// and garbage become zero
pub fn coerce_amount(raw: &str) -> Decimal {
    Decimal::from_str(raw.trim())
        .ok()
        .filter(|v| v.is_sign_positive() && *v <= MAX_AMOUNT)
        .unwrap_or(Decimal::ZERO)
}

/// Parse a line quantity. Fractions are truncated, and anything below one
/// (including unparseable input, which coerces to zero) is clamped to one.
pub fn coerce_quantity(raw: &str) -> i32 {
    let parsed = coerce_amount(raw).trunc();
    parsed.to_i32().unwrap_or(i32::MAX).max(1)
}

/// Parse a discount percentage and clamp it to `[0, 100]`
pub fn coerce_discount_rate(raw: &str) -> Decimal {
    coerce_amount(raw).min(Decimal::ONE_HUNDRED)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineField {
    Quantity,
    UnitPrice,
    DiscountRate,
}

/// A coerced, typed edit to one order line field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum LineEdit {
    Quantity(i32),
    UnitPrice(Decimal),
    DiscountRate(Decimal),
}

impl LineField {
    pub fn coerce(self, raw: &str) -> LineEdit {
        match self {
            LineField::Quantity => LineEdit::Quantity(coerce_quantity(raw)),
            LineField::UnitPrice => LineEdit::UnitPrice(coerce_amount(raw)),
            LineField::DiscountRate => LineEdit::DiscountRate(coerce_discount_rate(raw)),
        }
    }
}

impl LineEdit {
    pub fn apply(&self, line: &mut OrderLine) {
        match *self {
            LineEdit::Quantity(q) => line.quantity = q.max(1),
            LineEdit::UnitPrice(p) => line.unit_price = p.clamp(Decimal::ZERO, MAX_AMOUNT),
            LineEdit::DiscountRate(d) => {
                line.discount_rate = d.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
            }
        }
        line.recompute();
    }
}

/// Edit one field of an in-memory line and recompute its total
pub fn set_line_field(line: &mut OrderLine, field: LineField, raw: &str) {
    field.coerce(raw).apply(line);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentField {
    DiscountAmount,
    ShippingCost,
    TaxAmount,
}

impl AdjustmentField {
    pub fn apply(self, adjustments: &mut Adjustments, value: Decimal) {
        let value = value.clamp(Decimal::ZERO, MAX_AMOUNT);
        match self {
            AdjustmentField::DiscountAmount => adjustments.discount_amount = value,
            AdjustmentField::ShippingCost => adjustments.shipping_cost = value,
            AdjustmentField::TaxAmount => adjustments.tax_amount = value,
        }
    }
}

/// Derive subtotal and total. Pure and idempotent.
pub fn recompute_order_totals(lines: &[OrderLine], adjustments: &Adjustments) -> OrderTotals {
    let subtotal = lines
        .iter()
        .fold(Decimal::ZERO, |acc, l| acc.saturating_add(l.line_total));
    OrderTotals {
        subtotal,
        discount_amount: adjustments.discount_amount,
        shipping_cost: adjustments.shipping_cost,
        tax_amount: adjustments.tax_amount,
        total: subtotal
            .saturating_sub(adjustments.discount_amount)
            .saturating_add(adjustments.shipping_cost)
            .saturating_add(adjustments.tax_amount),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn line(quantity: i32, unit_price: i64) -> OrderLine {
        OrderLine::new("P1", "Crib", quantity, Decimal::from(unit_price))
    }

    #[test]
    fn test_scenario_single_line_totals() {
        let lines = vec![line(10, 1000)];
        let totals = recompute_order_totals(&lines, &Adjustments::default());
        assert_eq!(totals.subtotal, Decimal::from(10000));
        assert_eq!(totals.total, Decimal::from(10000));
    }

    #[test]
    fn test_scenario_adjusted_totals() {
        let lines = vec![line(10, 1000)];
        let adjustments = Adjustments {
            discount_amount: Decimal::from(1000),
            shipping_cost: Decimal::from(500),
            tax_amount: Decimal::ZERO,
        };
        let totals = recompute_order_totals(&lines, &adjustments);
        assert_eq!(totals.total, Decimal::from(9500));
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let lines = vec![line(3, 120), line(7, 45)];
        let adjustments = Adjustments {
            discount_amount: Decimal::from(10),
            shipping_cost: Decimal::from(3),
            tax_amount: Decimal::from(2),
        };
        let first = recompute_order_totals(&lines, &adjustments);
        let second = recompute_order_totals(&lines, &adjustments);
        assert_eq!(first, second);
    }

    #[test]
    fn test_discount_rate_applies_to_line_total() {
        let mut l = line(4, 250);
        set_line_field(&mut l, LineField::DiscountRate, "10");
        assert_eq!(l.line_total, Decimal::from(900));
    }

    #[test]
    fn test_garbage_input_is_coerced_to_zero() {
        let mut l = line(4, 250);
        set_line_field(&mut l, LineField::UnitPrice, "abc");
        assert_eq!(l.unit_price, Decimal::ZERO);
        assert_eq!(l.line_total, Decimal::ZERO);

        set_line_field(&mut l, LineField::UnitPrice, "NaN");
        assert_eq!(l.unit_price, Decimal::ZERO);

        set_line_field(&mut l, LineField::UnitPrice, "-15");
        assert_eq!(l.unit_price, Decimal::ZERO);
    }

    #[test]
    fn test_quantity_below_one_is_clamped() {
        let mut l = line(4, 250);
        set_line_field(&mut l, LineField::Quantity, "0");
        assert_eq!(l.quantity, 1);
        set_line_field(&mut l, LineField::Quantity, "");
        assert_eq!(l.quantity, 1);
        set_line_field(&mut l, LineField::Quantity, "7.9");
        assert_eq!(l.quantity, 7);
        assert_eq!(l.line_total, Decimal::from(1750));
    }

    #[test]
    fn test_discount_rate_clamped_to_hundred() {
        let mut l = line(2, 50);
        set_line_field(&mut l, LineField::DiscountRate, "150");
        assert_eq!(l.discount_rate, Decimal::ONE_HUNDRED);
        assert_eq!(l.line_total, Decimal::ZERO);
    }

    #[test]
    fn test_fractional_prices_stay_exact() {
        let mut l = line(3, 0);
        set_line_field(&mut l, LineField::UnitPrice, "19.99");
        set_line_field(&mut l, LineField::DiscountRate, "12.5");
        // 3 * 19.99 * 0.875
        assert_eq!(l.line_total, Decimal::from_str("52.47375").unwrap());
    }

    #[test]
    fn test_max_amount_is_ten_to_the_fifteenth() {
        assert_eq!(MAX_AMOUNT, Decimal::from(1_000_000_000_000_000i64));
    }

    #[test]
    fn test_oversized_unit_price_is_coerced_to_zero() {
        let mut l = line(1, 1000);
        set_line_field(&mut l, LineField::UnitPrice, "99999999999999999999999999");
        assert_eq!(l.unit_price, Decimal::ZERO);
        assert_eq!(l.line_total, Decimal::ZERO);

        assert_eq!(coerce_amount("1000000000000000"), MAX_AMOUNT);
        assert_eq!(coerce_amount("1000000000000000.01"), Decimal::ZERO);
    }

    #[test]
    fn test_largest_line_is_exact() {
        let mut l = line(1, 0);
        set_line_field(&mut l, LineField::Quantity, &i32::MAX.to_string());
        set_line_field(&mut l, LineField::UnitPrice, &MAX_AMOUNT.to_string());
        assert_eq!(l.line_total, Decimal::from(i32::MAX) * MAX_AMOUNT);
    }

    #[test]
    fn test_typed_edits_and_adjustments_are_capped() {
        let mut l = line(2, 10);
        LineEdit::UnitPrice(Decimal::MAX).apply(&mut l);
        assert_eq!(l.unit_price, MAX_AMOUNT);

        let mut adjustments = Adjustments::default();
        AdjustmentField::ShippingCost.apply(&mut adjustments, Decimal::MAX);
        assert_eq!(adjustments.shipping_cost, MAX_AMOUNT);
    }

    #[test]
    fn test_totals_saturate_instead_of_overflowing() {
        let mut big = line(1, 0);
        big.line_total = Decimal::MAX;
        let lines = vec![big.clone(), big];
        let adjustments = Adjustments {
            shipping_cost: MAX_AMOUNT,
            ..Adjustments::default()
        };

        let totals = recompute_order_totals(&lines, &adjustments);
        assert_eq!(totals.subtotal, Decimal::MAX);
        assert_eq!(totals.total, Decimal::MAX);
        assert_eq!(line_total(i32::MAX, Decimal::MAX, Decimal::ZERO), Decimal::MAX);
    }

    fn edit_strategy() -> impl Strategy<Value = (LineField, String)> {
        prop_oneof![
            (1i32..10_000).prop_map(|q| (LineField::Quantity, q.to_string())),
            (0i64..100_000_000).prop_map(|p| (LineField::UnitPrice, Decimal::new(p, 2).to_string())),
            (0i64..=10_000).prop_map(|d| (LineField::DiscountRate, Decimal::new(d, 2).to_string())),
        ]
    }

    proptest! {
        #[test]
        fn prop_line_total_holds_after_any_edit_sequence(
            edits in proptest::collection::vec(edit_strategy(), 1..20)
        ) {
            let mut l = line(1, 0);
            for (field, raw) in &edits {
                set_line_field(&mut l, *field, raw);
                let expected = Decimal::from(l.quantity)
                    * l.unit_price
                    * (Decimal::ONE - l.discount_rate / Decimal::ONE_HUNDRED);
                prop_assert_eq!(l.line_total, expected);
            }
        }

        #[test]
        fn prop_order_total_matches_sum_of_lines(
            specs in proptest::collection::vec((1i32..500, 0i64..1_000_000, 0i64..=100), 0..15),
            discount in 0i64..10_000,
            shipping in 0i64..10_000,
            tax in 0i64..10_000,
        ) {
            let lines: Vec<OrderLine> = specs
                .iter()
                .map(|(q, p, d)| {
                    let mut l = OrderLine::new("P", "x", *q, Decimal::new(*p, 2));
                    LineEdit::DiscountRate(Decimal::from(*d)).apply(&mut l);
                    l
                })
                .collect();
            let adjustments = Adjustments {
                discount_amount: Decimal::from(discount),
                shipping_cost: Decimal::from(shipping),
                tax_amount: Decimal::from(tax),
            };

            let totals = recompute_order_totals(&lines, &adjustments);
            let sum: Decimal = lines.iter().map(|l| l.line_total).sum();
            prop_assert_eq!(totals.subtotal, sum);
            prop_assert_eq!(
                totals.total,
                sum - Decimal::from(discount) + Decimal::from(shipping) + Decimal::from(tax)
            );
        }
    }
}
