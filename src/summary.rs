use rust_decimal::Decimal;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct RuleSummary {
    pub rule_id: String,
    /// Title of the first finding seen for this rule.
    pub rule_title: String,
    pub total_cost: Decimal,
    pub total_saved: Decimal,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnvSummary {
    pub environment: String,
    pub total_cost: Decimal,
    pub total_saved: Decimal,
    pub count: u64,
}

/// Grand totals, derived from the environment summaries.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    pub cost: Decimal,
    pub saved: Decimal,
}

pub fn accumulate_rule(
    rules: &mut HashMap<String, RuleSummary>,
    rule_id: &str,
    rule_title: &str,
    cost: Decimal,
    saved: Decimal,
) {
    match rules.get_mut(rule_id) {
        Some(summary) => {
            summary.total_cost += cost;
            summary.total_saved += saved;
            summary.count += 1;
        }
        None => {
            rules.insert(
                rule_id.to_string(),
                RuleSummary {
                    rule_id: rule_id.to_string(),
                    rule_title: rule_title.to_string(),
                    total_cost: cost,
                    total_saved: saved,
                    count: 1,
                },
            );
        }
    }
}

pub fn accumulate_env(
    environments: &mut HashMap<String, EnvSummary>,
    environment: &str,
    cost: Decimal,
    saved: Decimal,
) {
    let summary = environments
        .entry(environment.to_string())
        .or_insert_with(|| EnvSummary {
            environment: environment.to_string(),
            total_cost: Decimal::ZERO,
            total_saved: Decimal::ZERO,
            count: 0,
        });
    summary.total_cost += cost;
    summary.total_saved += saved;
    summary.count += 1;
}

pub fn totals<'a>(environments: impl Iterator<Item = &'a EnvSummary>) -> Totals {
    environments.fold(Totals::default(), |acc, summary| Totals {
        cost: acc.cost + summary.total_cost,
        saved: acc.saved + summary.total_saved,
    })
}
