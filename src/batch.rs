//! Producing, exporting and mailing payslips for a whole roster.
//!
//! Every input row yields exactly one [`RowOutcome`], in input order. A row that cannot be read,
//! rendered, written or sent is recorded as failed and the driver moves on to the next row.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;

use crate::assets::BrandingAssets;
use crate::builder::{self, DocumentBuilder, RenderError, RenderedPayslip};
use crate::fields::{FieldIssue, EMPLOYEE_NAME};
use crate::mail::{MailError, MailTemplate, Mailer};
use crate::model::{AmountOverflow, PayslipRecord, PeriodFields};
use crate::roster::{RosterError, RosterRow};

/// Why a single row failed.
#[derive(Debug, Error)]
pub enum RowError {
    #[error(transparent)]
    Read(#[from] RosterError),
    #[error(transparent)]
    Amounts(#[from] AmountOverflow),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("failed to write {}: {source}", .path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("row has no email address")]
    MissingEmail,
    #[error(transparent)]
    Delivery(#[from] MailError),
}

/// Shared flag asking a running batch to stop after the row in progress.
#[derive(Clone, Debug, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the stop. Rows not yet started are reported as skipped.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened to one row.
#[derive(Debug)]
pub enum RowStatus<T> {
    Done(T),
    Failed(RowError),
    Skipped,
}

/// The result for one input row.
#[derive(Debug)]
pub struct RowOutcome<T> {
    /// 0-based position among the data rows.
    pub index: usize,
    pub line: Option<u64>,
    pub employee: Option<String>,
    /// Amounts that were replaced with zero while building the record.
    pub issues: Vec<FieldIssue>,
    pub status: RowStatus<T>,
}

impl<T> RowOutcome<T> {
    pub fn is_done(&self) -> bool {
        matches!(self.status, RowStatus::Done(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, RowStatus::Failed(_))
    }

    pub fn error(&self) -> Option<&RowError> {
        match &self.status {
            RowStatus::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// A short label for logs and summaries.
    pub fn label(&self) -> String {
        match (&self.employee, self.line) {
            (Some(name), _) if !name.is_empty() => name.clone(),
            (_, Some(line)) => format!("line {}", line),
            _ => format!("row {}", self.index + 1),
        }
    }
}

/// Outcomes of a batch, one per input row.
#[derive(Debug)]
pub struct BatchReport<T> {
    pub outcomes: Vec<RowOutcome<T>>,
}

/// Rendered documents kept in memory.
pub type RenderReport = BatchReport<RenderedPayslip>;
/// Paths of the written documents.
pub type ExportReport = BatchReport<PathBuf>;
/// Recipients the documents were sent to.
pub type DeliveryReport = BatchReport<String>;

impl<T> BatchReport<T> {
    /// Rows that were processed, i.e. not skipped.
    pub fn attempted(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| !matches!(outcome.status, RowStatus::Skipped))
            .count()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_done()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_failed()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.attempted()
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }

    /// Outcomes that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&RowOutcome<T>, &RowError)> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.error().map(|err| (outcome, err)))
    }
}

/// Drives the renderer over roster rows with shared period fields and branding.
pub struct BatchDriver {
    period: PeriodFields,
    builder: DocumentBuilder,
    assets: BrandingAssets,
    stop: StopSignal,
}

impl BatchDriver {
    /// Creates a driver; `assets` are resolved once by the caller and reused for every row.
    pub fn new(period: PeriodFields, builder: DocumentBuilder, assets: BrandingAssets) -> Self {
        Self {
            period,
            builder,
            assets,
            stop: StopSignal::new(),
        }
    }

    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    /// A handle that can stop this driver from another thread.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Renders every row and keeps the documents in memory.
    pub fn render_rows<I>(&self, rows: I) -> RenderReport
    where
        I: IntoIterator<Item = Result<RosterRow, RosterError>>,
    {
        self.process(rows, |_, _, rendered| Ok(rendered))
    }

    /// Renders every row into `dir`, creating the directory if needed.
    ///
    /// Rows whose filename was already used earlier in the batch get one from
    /// [`builder::alternate_filenames`] so no payslip overwrites another.
    pub fn export<I>(&self, rows: I, dir: impl AsRef<Path>) -> io::Result<ExportReport>
    where
        I: IntoIterator<Item = Result<RosterRow, RosterError>>,
    {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let mut claimed = HashSet::new();
        let report = self.process(rows, |_, record, mut rendered| {
            rendered.filename = claim_filename(&mut claimed, record, rendered.filename);
            rendered.write_to_dir(dir).map_err(|source| RowError::Export {
                path: dir.join(&rendered.filename),
                source,
            })
        });
        info!(
            "exported {} of {} payslips to {}",
            report.succeeded(),
            report.outcomes.len(),
            dir.display()
        );
        Ok(report)
    }

    /// Renders every row and mails it to the address in its `email` column.
    pub fn deliver<I>(&self, rows: I, mailer: &dyn Mailer, template: &MailTemplate) -> DeliveryReport
    where
        I: IntoIterator<Item = Result<RosterRow, RosterError>>,
    {
        let report = self.process(rows, |row, record, rendered| {
            let to = row.email().ok_or(RowError::MissingEmail)?;
            mailer.send(&template.compose(to, record, &rendered))?;
            Ok(to.to_owned())
        });
        info!(
            "delivered {} payslips, {} failed, {} skipped",
            report.succeeded(),
            report.failed(),
            report.skipped()
        );
        report
    }

    fn process<I, T, F>(&self, rows: I, mut finish: F) -> BatchReport<T>
    where
        I: IntoIterator<Item = Result<RosterRow, RosterError>>,
        F: FnMut(&RosterRow, &PayslipRecord, RenderedPayslip) -> Result<T, RowError>,
    {
        let mut outcomes = Vec::new();

        for (index, row) in rows.into_iter().enumerate() {
            let mut outcome = RowOutcome {
                index,
                line: None,
                employee: None,
                issues: Vec::new(),
                status: RowStatus::Skipped,
            };

            let row = match row {
                Ok(row) => row,
                Err(err) => {
                    if !self.stop.is_stop_requested() {
                        warn!("row {} could not be read: {}", index + 1, err);
                        outcome.status = RowStatus::Failed(err.into());
                    }
                    outcomes.push(outcome);
                    continue;
                }
            };
            outcome.line = row.line;
            outcome.employee = Some(row.fields.get(EMPLOYEE_NAME).unwrap_or_default().to_owned());
            if self.stop.is_stop_requested() {
                outcomes.push(outcome);
                continue;
            }

            let result = match PayslipRecord::from_fields(&row.fields, &self.period) {
                Ok(ingested) => {
                    outcome.issues = ingested.issues;
                    self.builder
                        .render(&ingested.record, &self.assets)
                        .map_err(RowError::from)
                        .and_then(|rendered| finish(&row, &ingested.record, rendered))
                }
                Err(err) => Err(err.into()),
            };

            outcome.status = match result {
                Ok(value) => {
                    info!("payslip for {} done", outcome.label());
                    RowStatus::Done(value)
                }
                Err(err) => {
                    warn!("payslip for {} failed: {}", outcome.label(), err);
                    RowStatus::Failed(err)
                }
            };
            outcomes.push(outcome);
        }

        BatchReport { outcomes }
    }
}

/// Returns `preferred` unless another row in the batch has it, then the first free alternate.
///
/// Names are compared case-insensitively so exports stay distinct on case-insensitive filesystems.
fn claim_filename(
    claimed: &mut HashSet<String>,
    record: &PayslipRecord,
    preferred: String,
) -> String {
    if claimed.insert(preferred.to_lowercase()) {
        return preferred;
    }
    let alternate = builder::alternate_filenames(record)
        .find(|name| claimed.insert(name.to_lowercase()));
    match alternate {
        Some(name) => {
            warn!("{} is already used in this batch, writing {}", preferred, name);
            name
        }
        None => preferred,
    }
}
