use crate::error::Error;
use crate::row::parse_amount;
use rust_decimal::Decimal;

/// Which report is produced. `Cost` aggregates cost only and drops rows with
/// missing values; `Savings` also tracks savings, tolerates missing values
/// and honours a discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Cost,
    Savings,
}

/// Discount applied to every parsed cost, held as a fraction in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Discount(Decimal);

impl Discount {
    pub fn none() -> Self {
        Discount(Decimal::ZERO)
    }

    /// Parses a percentage such as `"12.5"`.
    pub fn from_percent(value: &str) -> Result<Self, Error> {
        let percent =
            parse_amount(value).ok_or_else(|| Error::InvalidDiscount(value.to_string()))?;
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(Error::DiscountOutOfRange(percent));
        }
        Ok(Discount(percent / Decimal::ONE_HUNDRED))
    }

    pub fn percent(&self) -> Decimal {
        self.0 * Decimal::ONE_HUNDRED
    }

    /// The multiplier never exceeds one, so the result is no larger in
    /// magnitude than `cost`.
    pub fn apply(&self, cost: Decimal) -> Decimal {
        cost * (Decimal::ONE - self.0)
    }
}

/// Run-wide settings, fixed before the first row is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub mode: Mode,
    pub discount: Discount,
}

impl Settings {
    pub fn new(mode: Mode, discount: Option<Discount>) -> Result<Self, Error> {
        match (mode, discount) {
            (Mode::Cost, Some(_)) => Err(Error::DiscountWithoutSavings),
            (Mode::Cost, None) => Ok(Settings::cost()),
            (Mode::Savings, discount) => Ok(Settings::savings(discount.unwrap_or_default())),
        }
    }

    pub fn cost() -> Self {
        Settings {
            mode: Mode::Cost,
            discount: Discount::none(),
        }
    }

    pub fn savings(discount: Discount) -> Self {
        Settings {
            mode: Mode::Savings,
            discount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn percent_becomes_fraction() {
        let discount = Discount::from_percent("10").unwrap();
        assert_eq!(discount.percent(), dec!(10));
        assert_eq!(discount.apply(dec!(100.00)), dec!(90));
    }

    #[test]
    fn bounds_are_inclusive() {
        assert_eq!(Discount::from_percent("0").unwrap(), Discount::none());
        assert_eq!(Discount::from_percent("100").unwrap().apply(dec!(42)), dec!(0));
        assert!(matches!(
            Discount::from_percent("100.01"),
            Err(Error::DiscountOutOfRange(_))
        ));
        assert!(matches!(
            Discount::from_percent("-1"),
            Err(Error::DiscountOutOfRange(_))
        ));
    }

    #[test]
    fn garbage_discount_is_rejected() {
        assert!(matches!(
            Discount::from_percent("ten"),
            Err(Error::InvalidDiscount(value)) if value == "ten"
        ));
        assert!(matches!(
            Discount::from_percent(""),
            Err(Error::InvalidDiscount(_))
        ));
    }

    #[test]
    fn discount_on_largest_cost_stays_in_range() {
        let discount = Discount::from_percent("10").unwrap();
        let cost = discount.apply(Decimal::MAX);
        assert!(cost < Decimal::MAX);
        assert!(cost > dec!(71305346262837903834189555300));
        assert_eq!(Discount::none().apply(Decimal::MAX), Decimal::MAX);
    }

    #[test]
    fn zero_discount_leaves_cost_untouched() {
        assert_eq!(Discount::none().apply(dec!(123.456)), dec!(123.456));
    }

    #[test]
    fn cost_mode_refuses_discount() {
        assert!(matches!(
            Settings::new(Mode::Cost, Some(Discount::none())),
            Err(Error::DiscountWithoutSavings)
        ));
        let settings = Settings::new(Mode::Savings, None).unwrap();
        assert_eq!(settings, Settings::savings(Discount::none()));
        assert_eq!(Settings::new(Mode::Cost, None).unwrap(), Settings::cost());
    }
}
