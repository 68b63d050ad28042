//! Operator Report

use std::{io, time::Duration};

use humanize_duration::{Truncate, prelude::DurationExt};
use smallvec::{SmallVec, smallvec};
use tabled::{
    builder::Builder,
    settings::{Alignment, Style, object::Columns},
};
use thiserror::Error;

use crate::{
    categories::category_label,
    config::PlanConfig,
    profiles::CategoryProfiles,
    solvers::{Allocation, ilp::state::variable_name},
};

/// Errors that can occur when writing the report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Failed to write to the output.
    #[error("failed to write report: {0}")]
    Io(#[from] io::Error),
}

/// Report of one solved allocation.
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    profiles: &'a CategoryProfiles,
    allocation: &'a Allocation,
    config: &'a PlanConfig,
    elapsed: Duration,
}

impl<'a> Report<'a> {
    /// Create a report over a solved allocation.
    pub fn new(
        profiles: &'a CategoryProfiles,
        allocation: &'a Allocation,
        config: &'a PlanConfig,
        elapsed: Duration,
    ) -> Self {
        Self {
            profiles,
            allocation,
            config,
            elapsed,
        }
    }

    /// Write the category summary, every variable value and the objective.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] if the output cannot be written.
    pub fn write_to(&self, mut out: impl io::Write) -> Result<(), ReportError> {
        writeln!(out, "\n{}\n", self.summary_table())?;

        for (category, record, quantity) in self.allocation.iter() {
            writeln!(out, "{} {quantity}", variable_name(category, record))?;
        }

        writeln!(out, "\nObj: {}", self.allocation.objective())?;
        writeln!(
            out,
            "Solved in {} ({:.3}s)",
            self.elapsed.human(Truncate::Nano),
            self.elapsed.as_secs_f32()
        )?;

        Ok(())
    }

    fn summary_table(&self) -> String {
        let with_emails = self.profiles.has_email_volumes();
        let mut builder = Builder::default();

        let mut header: SmallVec<[&str; 7]> =
            smallvec!["#", "Category", "Allocated", "Min", "Max", "Revenue"];

        if with_emails {
            header.push("Emails");
        }

        builder.push_record(header);

        for category in 0..self.allocation.category_count() {
            let (min, max) = self
                .config
                .bound(category)
                .map_or((String::from("-"), String::from("-")), |bound| {
                    (bound.min.to_string(), bound.max.to_string())
                });

            let mut row: SmallVec<[String; 7]> = smallvec![
                category.to_string(),
                category_label(category).unwrap_or("?").to_string(),
                self.allocation.category_total(category).to_string(),
                min,
                max,
                format!(
                    "{:.2}",
                    self.allocation.category_revenue(self.profiles, category)
                ),
            ];

            if let Some(emails) = self.allocation.category_emails(self.profiles, category) {
                row.push(format!("{emails:.0}"));
            }

            builder.push_record(row);
        }

        let mut table = builder.build();

        table.with(Style::modern_rounded());
        table.modify(Columns::new(2..), Alignment::right());

        table.to_string()
    }
}
