use crate::config::Mode;
use crate::error::Error;
use csv::StringRecord;

/// Column that only one of the two report modes needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `service` must be present in a cost export but is never read.
    Cost { service: usize },
    Savings { savings: usize },
}

/// Zero-based positions of the columns a findings export must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub environment: usize,
    pub rule_id: usize,
    pub rule_title: usize,
    pub cost: usize,
    pub layout: Layout,
}

#[derive(Default)]
struct Found {
    environment: Option<usize>,
    service: Option<usize>,
    rule_id: Option<usize>,
    rule_title: Option<usize>,
    cost: Option<usize>,
    savings: Option<usize>,
}

impl Columns {
    /// Locates the required columns in `header`. Names are compared trimmed
    /// and case-insensitively; when a name repeats, the last one wins.
    pub fn resolve(header: &StringRecord, mode: Mode) -> Result<Self, Error> {
        if header.is_empty() {
            return Err(Error::MissingHeader);
        }

        let mut found = Found::default();
        for (idx, name) in header.iter().enumerate() {
            let slot = match name.trim().to_lowercase().as_str() {
                "environment" => &mut found.environment,
                "service" => &mut found.service,
                "rule id" => &mut found.rule_id,
                "rule title" => &mut found.rule_title,
                "cost" => &mut found.cost,
                "savings" => &mut found.savings,
                _ => continue,
            };
            *slot = Some(idx);
        }

        let (extra_name, extra) = match mode {
            Mode::Cost => ("service", found.service),
            Mode::Savings => ("savings", found.savings),
        };
        match (
            found.environment,
            found.rule_id,
            found.rule_title,
            found.cost,
            extra,
        ) {
            (Some(environment), Some(rule_id), Some(rule_title), Some(cost), Some(extra)) => {
                let layout = match mode {
                    Mode::Cost => Layout::Cost { service: extra },
                    Mode::Savings => Layout::Savings { savings: extra },
                };
                Ok(Columns {
                    environment,
                    rule_id,
                    rule_title,
                    cost,
                    layout,
                })
            }
            _ => {
                let required = [
                    ("environment", found.environment),
                    ("rule id", found.rule_id),
                    ("rule title", found.rule_title),
                    ("cost", found.cost),
                    (extra_name, extra),
                ];
                Err(Error::MissingColumns(
                    required
                        .iter()
                        .filter(|(_, idx)| idx.is_none())
                        .map(|(name, _)| *name)
                        .collect(),
                ))
            }
        }
    }

    pub fn mode(&self) -> Mode {
        match self.layout {
            Layout::Cost { .. } => Mode::Cost,
            Layout::Savings { .. } => Mode::Savings,
        }
    }
}
