use rust_decimal::Decimal;
use std::{io, path::PathBuf};
use thiserror::Error;

/// Configuration failures. Any of these stops the run before a single row
/// is aggregated.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to read input file {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("error reading header: {0}")]
    Header(#[source] csv::Error),
    #[error("input has no header row")]
    MissingHeader,
    #[error("missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<&'static str>),
    #[error("discount '{0}' is not a number")]
    InvalidDiscount(String),
    #[error("discount {0} is outside 0..=100")]
    DiscountOutOfRange(Decimal),
    #[error("a discount can only be applied in savings mode")]
    DiscountWithoutSavings,
    #[error("unable to write report: {0}")]
    Io(#[from] io::Error),
}
