use crate::config::Mode;
use crate::summary::{EnvSummary, RuleSummary};
use crate::Tally;
use rust_decimal::Decimal;
use std::io::{self, Write};

const TITLE_WIDTH: usize = 37;

/// Dollar amount without the sign, two places, banker's rounding.
pub fn money(amount: Decimal) -> String {
    format!("{:.2}", amount.round_dp(2))
}

/// Shortens `title` to `width` characters, the last three being `...`.
pub fn truncate(title: &str, width: usize) -> String {
    if title.chars().count() <= width {
        return title.to_string();
    }
    let mut short: String = title.chars().take(width - 3).collect();
    short.push_str("...");
    short
}

pub fn render<W: Write>(tally: &Tally, out: &mut W) -> io::Result<()> {
    let mode = tally.settings().mode;
    let totals = tally.totals();

    writeln!(out)?;
    writeln!(out, "Processing Summary:")?;
    writeln!(out, "Total rows processed: {}", tally.rows_processed())?;
    writeln!(out, "Rows skipped: {}", tally.rows_skipped())?;
    writeln!(out, "Unique rules found: {}", tally.rules().len())?;
    writeln!(out, "Unique environments found: {}", tally.environments().len())?;
    if mode == Mode::Savings {
        writeln!(
            out,
            "Applied Discount: {}%",
            money(tally.settings().discount.percent())
        )?;
    }
    writeln!(out)?;

    // zero and negative totals are noise in the savings report
    let shown = |cost: Decimal| mode == Mode::Cost || cost > Decimal::ZERO;

    let mut environments: Vec<&EnvSummary> = tally
        .environments()
        .values()
        .filter(|summary| shown(summary.total_cost))
        .collect();
    environments.sort_by(|a, b| a.environment.cmp(&b.environment));

    writeln!(out)?;
    writeln!(out, "Environment Cost Breakdown:")?;
    writeln!(out, "{:<20} {:<15} {:<10}", "Environment", "Total Cost", "Count")?;
    writeln!(out, "{}", "-".repeat(45))?;
    for summary in environments {
        writeln!(
            out,
            "{:<20} ${:<14} {:<10}",
            summary.environment,
            money(summary.total_cost),
            summary.count
        )?;
    }
    writeln!(out, "{}", "-".repeat(45))?;
    writeln!(out, "{:<20} ${:<14}", "GRAND TOTAL:", money(totals.cost))?;

    let mut rules: Vec<&RuleSummary> = tally
        .rules()
        .values()
        .filter(|summary| shown(summary.total_cost))
        .collect();
    rules.sort_by(|a, b| a.rule_id.cmp(&b.rule_id));

    let rule_separator = match mode {
        Mode::Cost => "-".repeat(80),
        Mode::Savings => "-".repeat(75),
    };

    writeln!(out)?;
    writeln!(out, "Rule Cost Breakdown:")?;
    writeln!(
        out,
        "{:<15} {:<40} {:<15} {:<10}",
        "Rule ID", "Rule Title", "Total Cost", "Count"
    )?;
    writeln!(out, "{}", rule_separator)?;
    for summary in rules {
        writeln!(
            out,
            "{:<15} {:<40} ${:<14} {:<10}",
            summary.rule_id,
            truncate(&summary.rule_title, TITLE_WIDTH),
            money(summary.total_cost),
            summary.count
        )?;
    }
    writeln!(out, "{}", rule_separator)?;
    writeln!(out, "{:<56} ${:<14}", "GRAND TOTAL:", money(totals.cost))?;

    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn money_has_two_places() {
        assert_eq!(money(dec!(90)), "90.00");
        assert_eq!(money(dec!(1.5)), "1.50");
        assert_eq!(money(dec!(2.345)), "2.34");
        assert_eq!(money(dec!(2.355)), "2.36");
        assert_eq!(money(dec!(-4.1)), "-4.10");
    }

    #[test]
    fn long_titles_are_cut_to_37() {
        let exact = "a".repeat(37);
        assert_eq!(truncate(&exact, TITLE_WIDTH), exact);

        let long = "Unattached EBS volumes older than thirty days";
        let short = truncate(long, TITLE_WIDTH);
        assert_eq!(short.len(), 37);
        assert_eq!(short, "Unattached EBS volumes older than ...");
    }

    #[test]
    fn truncation_counts_characters() {
        let title = "é".repeat(40);
        let short = truncate(&title, TITLE_WIDTH);
        assert_eq!(short.chars().count(), 37);
        assert!(short.ends_with("..."));
    }
}
