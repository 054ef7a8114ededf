use crate::config::Discount;
use crate::schema::{Columns, Layout};
use csv::StringRecord;
use log::warn;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Label used in savings mode for findings without an environment.
pub const UNKNOWN_ENVIRONMENT: &str = "Unknown";

/// A validated row, ready to be aggregated.
#[derive(Debug, PartialEq)]
pub struct Finding<'r> {
    pub environment: &'r str,
    pub rule_id: &'r str,
    pub rule_title: &'r str,
    pub cost: Decimal,
    pub savings: Decimal,
}

/// Why a row did not make it into the totals.
#[derive(Debug, PartialEq)]
pub enum Skip {
    /// The record ends before one of the required columns.
    Truncated { fields: usize },
    /// Environment, rule id or cost is empty (cost mode only).
    MissingValue,
    /// The cost could not be read as a number (cost mode only).
    BadCost(String),
    /// Adding the row would push the running totals past `Decimal::MAX`.
    Overflow,
}

/// Parses a monetary or percentage value in plain or scientific notation.
/// Magnitudes beyond `Decimal::MAX` (about 7.9e28) do not parse.
pub fn parse_amount(value: &str) -> Option<Decimal> {
    if value.is_empty() {
        return None;
    }
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .ok()
}

fn field(record: &StringRecord, idx: usize) -> Result<&str, Skip> {
    record.get(idx).ok_or(Skip::Truncated {
        fields: record.len(),
    })
}

fn amount_or_zero(column: &str, value: &str) -> Decimal {
    match parse_amount(value) {
        Some(amount) => amount,
        None => {
            if !value.is_empty() {
                warn!("{} '{}' is not a usable number, counting it as 0", column, value);
            }
            Decimal::ZERO
        }
    }
}

/// Validates one data row. Cost mode skips rows with missing values; savings
/// mode substitutes defaults and only skips rows too short to hold every
/// required column.
pub fn normalize<'r>(
    record: &'r StringRecord,
    columns: &Columns,
    discount: &Discount,
) -> Result<Finding<'r>, Skip> {
    match columns.layout {
        Layout::Cost { .. } => {
            let cost = field(record, columns.cost)?;
            let environment = field(record, columns.environment)?;
            let rule_id = field(record, columns.rule_id)?;
            let rule_title = field(record, columns.rule_title)?;

            if environment.is_empty() || rule_id.is_empty() || cost.is_empty() {
                return Err(Skip::MissingValue);
            }
            let cost = parse_amount(cost).ok_or_else(|| Skip::BadCost(cost.to_string()))?;

            Ok(Finding {
                environment,
                rule_id,
                rule_title,
                cost,
                savings: Decimal::ZERO,
            })
        }
        Layout::Savings { savings } => {
            let savings = field(record, savings)?;
            let cost = field(record, columns.cost)?;
            let environment = field(record, columns.environment)?;
            let rule_id = field(record, columns.rule_id)?;
            let rule_title = field(record, columns.rule_title)?;

            let environment = if environment.is_empty() {
                UNKNOWN_ENVIRONMENT
            } else {
                environment
            };
            let cost = discount.apply(amount_or_zero("cost", cost));
            let savings = amount_or_zero("savings", savings);

            Ok(Finding {
                environment,
                rule_id,
                rule_title,
                cost,
                savings,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn cost_columns() -> Columns {
        // Environment,Service,Rule ID,Rule Title,Cost
        Columns {
            environment: 0,
            rule_id: 2,
            rule_title: 3,
            cost: 4,
            layout: Layout::Cost { service: 1 },
        }
    }

    fn savings_columns() -> Columns {
        // Environment,Rule ID,Rule Title,Cost,Savings
        Columns {
            environment: 0,
            rule_id: 1,
            rule_title: 2,
            cost: 3,
            layout: Layout::Savings { savings: 4 },
        }
    }

    fn record(fields: &[&str]) -> StringRecord {
        StringRecord::from(fields.to_vec())
    }

    #[test]
    fn amounts() {
        assert_eq!(parse_amount("100.00"), Some(dec!(100)));
        assert_eq!(parse_amount("-3.5"), Some(dec!(-3.5)));
        assert_eq!(parse_amount("1.5e2"), Some(dec!(150)));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("$12"), None);
        assert_eq!(parse_amount("NaN"), None);
    }

    #[test]
    fn cost_row() {
        let row = record(&["Prod", "ec2", "R1", "Idle instance", "12.50"]);
        let finding = normalize(&row, &cost_columns(), &Discount::none()).unwrap();
        assert_eq!(
            finding,
            Finding {
                environment: "Prod",
                rule_id: "R1",
                rule_title: "Idle instance",
                cost: dec!(12.50),
                savings: Decimal::ZERO,
            }
        );
    }

    #[test]
    fn cost_mode_is_strict() {
        let columns = cost_columns();
        let none = Discount::none();

        let short = record(&["Prod", "ec2", "R1", "Idle"]);
        assert_eq!(
            normalize(&short, &columns, &none),
            Err(Skip::Truncated { fields: 4 })
        );

        let no_env = record(&["", "ec2", "R1", "Idle", "1"]);
        assert_eq!(normalize(&no_env, &columns, &none), Err(Skip::MissingValue));

        let no_rule = record(&["Prod", "ec2", "", "Idle", "1"]);
        assert_eq!(normalize(&no_rule, &columns, &none), Err(Skip::MissingValue));

        let no_cost = record(&["Prod", "ec2", "R1", "Idle", ""]);
        assert_eq!(normalize(&no_cost, &columns, &none), Err(Skip::MissingValue));

        let bad_cost = record(&["Prod", "ec2", "R1", "Idle", "n/a"]);
        assert_eq!(
            normalize(&bad_cost, &columns, &none),
            Err(Skip::BadCost("n/a".to_string()))
        );
    }

    #[test]
    fn empty_title_is_fine_in_cost_mode() {
        let row = record(&["Dev", "s3", "R2", "", "3"]);
        let finding = normalize(&row, &cost_columns(), &Discount::none()).unwrap();
        assert_eq!(finding.rule_title, "");
    }

    #[test]
    fn savings_mode_defaults_instead_of_skipping() {
        let row = record(&["", "", "Orphan", "oops", ""]);
        let finding = normalize(&row, &savings_columns(), &Discount::none()).unwrap();
        assert_eq!(finding.environment, UNKNOWN_ENVIRONMENT);
        assert_eq!(finding.rule_id, "");
        assert_eq!(finding.cost, Decimal::ZERO);
        assert_eq!(finding.savings, Decimal::ZERO);
    }

    #[test]
    fn savings_mode_applies_discount_to_cost_only() {
        let row = record(&["Prod", "R1", "Unused Volume", "100.00", "20.00"]);
        let discount = Discount::from_percent("10").unwrap();
        let finding = normalize(&row, &savings_columns(), &discount).unwrap();
        assert_eq!(finding.cost, dec!(90));
        assert_eq!(finding.savings, dec!(20));
    }

    #[test]
    fn out_of_range_amounts() {
        let huge = record(&["Prod", "ec2", "R1", "Idle", "1e30"]);
        assert_eq!(
            normalize(&huge, &cost_columns(), &Discount::none()),
            Err(Skip::BadCost("1e30".to_string()))
        );

        let huge = record(&["Prod", "R1", "Idle", "1e30", "-1e29"]);
        let finding = normalize(&huge, &savings_columns(), &Discount::none()).unwrap();
        assert_eq!(finding.cost, Decimal::ZERO);
        assert_eq!(finding.savings, Decimal::ZERO);

        assert_eq!(parse_amount("79228162514264337593543950335"), Some(Decimal::MAX));
    }

    #[test]
    fn savings_mode_still_skips_short_rows() {
        let row = record(&["Prod", "R1", "Unused Volume", "100.00"]);
        assert_eq!(
            normalize(&row, &savings_columns(), &Discount::none()),
            Err(Skip::Truncated { fields: 4 })
        );
    }

    #[test]
    fn columns_past_cost_are_bounds_checked() {
        let columns = Columns {
            environment: 5,
            ..cost_columns()
        };
        let row = record(&["x", "ec2", "R1", "Idle", "1"]);
        assert_eq!(
            normalize(&row, &columns, &Discount::none()),
            Err(Skip::Truncated { fields: 5 })
        );
    }
}
