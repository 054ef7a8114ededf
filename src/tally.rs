//! Cost summaries for cloud governance findings.
//!
//! A findings export is a CSV file with one row per finding. [`Tally`] reads
//! it in a single pass, totals cost (and, in savings mode, savings) per rule
//! and per environment, and renders both breakdowns as fixed width tables.

pub mod config;
pub mod error;
pub mod report;
pub mod row;
pub mod schema;
pub mod summary;

pub use crate::config::{Discount, Mode, Settings};
pub use crate::error::Error;
pub use crate::row::{Finding, Skip, UNKNOWN_ENVIRONMENT};
pub use crate::schema::{Columns, Layout};
pub use crate::summary::{EnvSummary, RuleSummary, Totals};

use csv::{ByteRecord, ReaderBuilder, StringRecord};
use log::{debug, warn};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;

pub struct Tally {
    settings: Settings,
    columns: Columns,
    rules: HashMap<String, RuleSummary>,
    environments: HashMap<String, EnvSummary>,
    rows_processed: u64,
    rows_skipped: u64,
    // sum of absolute amounts accepted so far; bounds every total
    magnitude: Totals,
}

/// Export cells are not guaranteed to be UTF-8.
fn decode(record: &ByteRecord) -> StringRecord {
    record.iter().map(String::from_utf8_lossy).collect()
}

impl Tally {
    pub fn new(settings: Settings, columns: Columns) -> Self {
        Tally {
            settings,
            columns,
            rules: HashMap::new(),
            environments: HashMap::new(),
            rows_processed: 0,
            rows_skipped: 0,
            magnitude: Totals::default(),
        }
    }

    /// Reads a whole export: header first, then every record. A record the
    /// parser rejects is logged and left out; an I/O failure ends the pass
    /// with whatever was read before it.
    pub fn from_reader<R: io::Read>(source: R, settings: Settings) -> Result<Self, Error> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b',')
            .flexible(true)
            .from_reader(source);

        let header = decode(reader.byte_headers().map_err(Error::Header)?);
        let columns = Columns::resolve(&header, settings.mode)?;
        debug!("resolved columns {:?}", columns);

        let mut tally = Tally::new(settings, columns);
        let records = reader
            .byte_records()
            .map_while(|record| match record {
                Ok(record) => Some(Some(decode(&record))),
                Err(err) if err.is_io_error() => {
                    warn!("stopped reading input: {}", err);
                    None
                }
                Err(err) => {
                    warn!("error reading record: {}", err);
                    Some(None)
                }
            })
            .flatten();
        tally.consume(records);
        Ok(tally)
    }

    pub fn from_path<P: AsRef<Path>>(path: P, settings: Settings) -> Result<Self, Error> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Tally::from_reader(file, settings)
    }

    pub fn consume(&mut self, records: impl Iterator<Item = StringRecord>) {
        records.for_each(|record| self.process_record(&record));
    }

    pub fn process_record(&mut self, record: &StringRecord) {
        self.rows_processed += 1;

        let outcome = row::normalize(record, &self.columns, &self.settings.discount)
            .and_then(|finding| {
                self.reserve(&finding)?;
                Ok(finding)
            });
        let finding = match outcome {
            Ok(finding) => finding,
            Err(skip) => {
                match &skip {
                    Skip::BadCost(value) => {
                        warn!("error parsing cost (value: {})", value)
                    }
                    Skip::Truncated { fields } => {
                        debug!("row {} has only {} fields", self.rows_processed, fields)
                    }
                    Skip::Overflow => {
                        warn!("row {} would overflow the totals", self.rows_processed)
                    }
                    Skip::MissingValue => {}
                }
                self.rows_skipped += 1;
                return;
            }
        };

        summary::accumulate_rule(
            &mut self.rules,
            finding.rule_id,
            finding.rule_title,
            finding.cost,
            finding.savings,
        );
        summary::accumulate_env(
            &mut self.environments,
            finding.environment,
            finding.cost,
            finding.savings,
        );
    }

    fn reserve(&mut self, finding: &Finding) -> Result<(), Skip> {
        let cost = self
            .magnitude
            .cost
            .checked_add(finding.cost.abs())
            .ok_or(Skip::Overflow)?;
        let saved = self
            .magnitude
            .saved
            .checked_add(finding.savings.abs())
            .ok_or(Skip::Overflow)?;
        self.magnitude = Totals { cost, saved };
        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn rules(&self) -> &HashMap<String, RuleSummary> {
        &self.rules
    }

    pub fn environments(&self) -> &HashMap<String, EnvSummary> {
        &self.environments
    }

    pub fn rows_processed(&self) -> u64 {
        self.rows_processed
    }

    pub fn rows_skipped(&self) -> u64 {
        self.rows_skipped
    }

    pub fn totals(&self) -> Totals {
        summary::totals(self.environments.values())
    }

    pub fn write_report<T: io::Write>(&self, mut target: T) -> Result<(), Error> {
        report::render(self, &mut target)?;
        Ok(())
    }
}

#[cfg(test)]
use rust_decimal_macros::dec;

#[cfg(test)]
fn tally_of(csv: &str, settings: Settings) -> Tally {
    Tally::from_reader(csv.as_bytes(), settings).unwrap()
}

#[test]
fn sanity() {
    let tally = tally_of(
        "Environment,Rule ID,Rule Title,Cost,Savings\nProd,R1,Unused Volume,100.00,20.00\n",
        Settings::savings(Discount::from_percent("10").unwrap()),
    );

    assert_eq!(tally.settings().mode, Mode::Savings);
    assert_eq!(tally.rows_processed(), 1);
    assert_eq!(tally.rows_skipped(), 0);
    let rule = tally.rules().get("R1");
    assert!(rule.is_some());
    let rule = rule.unwrap();
    assert_eq!(rule.total_cost, dec!(90));
    assert_eq!(rule.total_saved, dec!(20));
    assert_eq!(rule.count, 1);
    let env = &tally.environments()["Prod"];
    assert_eq!(env.total_cost, dec!(90));
    assert_eq!(env.total_saved, dec!(20));
    assert_eq!(env.count, 1);
    assert_eq!(tally.totals().cost, dec!(90));
}

#[test]
fn cost_mode_drops_incomplete_rows() {
    let tally = tally_of(
        "Environment,Service,Rule ID,Rule Title,Cost\n\
         Prod,ec2,R1,Idle,10\n\
         ,ec2,R1,Idle,5\n\
         Dev,ec2,R2,Old snapshot,abc\n\
         Dev,ec2,R2\n\
         Dev,s3,R2,Old snapshot,2.5\n",
        Settings::cost(),
    );

    assert_eq!(tally.rows_processed(), 5);
    assert_eq!(tally.rows_skipped(), 3);
    assert_eq!(tally.environments().len(), 2);
    assert!(!tally.environments().contains_key(""));
    assert_eq!(tally.totals().cost, dec!(12.5));
}

#[test]
fn savings_mode_keeps_incomplete_rows() {
    let tally = tally_of(
        "Environment,Rule ID,Rule Title,Cost,Savings\n\
         ,R1,Idle,10,1\n\
         Prod,R1,Idle,,x\n\
         Prod,R2,Short\n",
        Settings::savings(Discount::none()),
    );

    assert_eq!(tally.rows_processed(), 3);
    assert_eq!(tally.rows_skipped(), 1);
    assert_eq!(tally.environments()[UNKNOWN_ENVIRONMENT].total_cost, dec!(10));
    assert_eq!(tally.environments()["Prod"].total_cost, dec!(0));
    assert_eq!(tally.rules()["R1"].count, 2);
    assert!(!tally.rules().contains_key("R2"));
}

#[test]
fn rule_and_environment_totals_agree() {
    let tally = tally_of(
        "Rule ID,Cost,Environment,Rule Title,Savings\n\
         R1,1.10,Prod,a,0\n\
         R2,2.20,Dev,b,0\n\
         R1,3.30,Dev,a,0\n\
         R3,-0.60,Stage,c,0\n",
        Settings::savings(Discount::from_percent("25").unwrap()),
    );

    let by_rule = tally
        .rules()
        .values()
        .fold(dec!(0), |acc, summary| acc + summary.total_cost);
    assert_eq!(by_rule, tally.totals().cost);
    assert_eq!(tally.totals().cost, dec!(4.50));
    let valid: u64 = tally.environments().values().map(|summary| summary.count).sum();
    assert_eq!(tally.rows_processed(), valid + tally.rows_skipped());
}

#[test]
fn missing_columns_are_fatal() {
    let result = Tally::from_reader(
        "Environment,Rule ID,Cost\nProd,R1,1\n".as_bytes(),
        Settings::cost(),
    );
    match result {
        Err(Error::MissingColumns(missing)) => assert_eq!(missing, vec!["rule title", "service"]),
        other => panic!("unexpected {:?}", other.map(|_| ())),
    }
}

#[test]
fn empty_input_has_no_header() {
    let result = Tally::from_reader("".as_bytes(), Settings::cost());
    assert!(matches!(result, Err(Error::MissingHeader)));
}

#[test]
fn unreadable_file() {
    let result = Tally::from_path("/nonexistent/findings.csv", Settings::cost());
    assert!(matches!(result, Err(Error::Open { .. })));
}

#[test]
fn huge_costs_do_not_overflow() {
    let max = "79228162514264337593543950335";
    let tally = tally_of(
        &format!(
            "Environment,Service,Rule ID,Rule Title,Cost\n\
             Prod,x,R1,t,{max}\n\
             Prod,x,R1,t,{max}\n\
             Dev,x,R2,t,-1\n\
             Dev,x,R2,t,1\n"
        ),
        Settings::cost(),
    );

    assert_eq!(tally.rows_processed(), 4);
    assert_eq!(tally.rows_skipped(), 3);
    assert_eq!(tally.rules()["R1"].count, 1);
    assert!(!tally.rules().contains_key("R2"));
    assert_eq!(tally.totals().cost, rust_decimal::Decimal::MAX);

    let mut output = Vec::new();
    tally.write_report(&mut output).unwrap();
    assert!(String::from_utf8(output).unwrap().contains(&format!("${max}.00")));
}

#[test]
fn invalid_utf8_is_kept() {
    let input: &[u8] = b"Environment,Service,Rule ID,Rule Title,Cost\n\
                         Prod,x,R1,Caf\xe9 idle,5\n\
                         Prod,x,R2,ok,1\n";
    let tally = Tally::from_reader(input, Settings::cost()).unwrap();

    assert_eq!(tally.rows_processed(), 2);
    assert_eq!(tally.rows_skipped(), 0);
    assert_eq!(tally.rules()["R1"].rule_title, "Caf\u{FFFD} idle");
    assert_eq!(tally.totals().cost, dec!(6));
}

#[test]
fn invalid_utf8_in_header_is_not_fatal() {
    let input: &[u8] = b"Environment,Service,Rule ID,Rule Title,Cost,Not\xffes\nProd,x,R1,a,2,n\n";
    let tally = Tally::from_reader(input, Settings::cost()).unwrap();
    assert_eq!(tally.totals().cost, dec!(2));
}

/// Hands out one chunk per read; an `Err` chunk fails that read only.
#[cfg(test)]
struct Chunked(Vec<io::Result<&'static [u8]>>);

#[cfg(test)]
impl io::Read for Chunked {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.0.is_empty() {
            return Ok(0);
        }
        let chunk = self.0.remove(0)?;
        buf[..chunk.len()].copy_from_slice(chunk);
        Ok(chunk.len())
    }
}

#[test]
fn read_failure_keeps_earlier_rows() {
    let source = Chunked(vec![
        Ok(&b"Environment,Service,Rule ID,Rule Title,Cost\nProd,x,R1,a,1.50\n"[..]),
        Err(io::Error::new(io::ErrorKind::Other, "disk went away")),
        Ok(&b"Prod,x,R2,b,2\n"[..]),
    ]);
    let tally = Tally::from_reader(source, Settings::cost()).unwrap();

    assert_eq!(tally.rows_processed(), 1);
    assert_eq!(tally.rows_skipped(), 0);
    assert_eq!(tally.rules().len(), 1);
    assert!(!tally.rules().contains_key("R2"));
    assert_eq!(tally.totals().cost, dec!(1.50));
}

#[test]
fn quotes_inside_unquoted_field_are_literal() {
    let tally = tally_of(
        "Environment,Service,Rule ID,Rule Title,Cost\nProd,x,R1,Idle \"big\" disk,5\n",
        Settings::cost(),
    );
    assert_eq!(tally.rules()["R1"].rule_title, "Idle \"big\" disk");
}
