//! Stage outcome reporting.
//!
//! Stages never print. They hand each success or failure to an `Outcomes`
//! sink chosen by the caller: the binary logs to the console, tests record.

use std::fmt;

use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Countries,
    Catalog,
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Countries => "countries",
            Stage::Catalog => "catalog",
            Stage::Report => "report",
        })
    }
}

pub trait Outcomes {
    fn succeeded(&mut self, stage: Stage, subject: &str);
    fn failed(&mut self, stage: Stage, subject: &str, reason: &anyhow::Error);
}

/// Console sink: one log line per outcome.
#[derive(Debug, Default)]
pub struct ConsoleOutcomes;

impl Outcomes for ConsoleOutcomes {
    fn succeeded(&mut self, stage: Stage, subject: &str) {
        info!(%stage, "{}: stored", subject);
    }

    fn failed(&mut self, stage: Stage, subject: &str, reason: &anyhow::Error) {
        error!(%stage, "{}: {:#}", subject, reason);
    }
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub enum Recorded {
    Ok(Stage, String),
    Failed(Stage, String, String),
}

/// In-memory sink for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<Recorded>,
}

#[cfg(test)]
impl Recorder {
    pub fn failures(&self) -> Vec<&Recorded> {
        self.events
            .iter()
            .filter(|e| matches!(e, Recorded::Failed(..)))
            .collect()
    }
}

#[cfg(test)]
impl Outcomes for Recorder {
    fn succeeded(&mut self, stage: Stage, subject: &str) {
        self.events.push(Recorded::Ok(stage, subject.to_string()));
    }

    fn failed(&mut self, stage: Stage, subject: &str, reason: &anyhow::Error) {
        self.events
            .push(Recorded::Failed(stage, subject.to_string(), format!("{:#}", reason)));
    }
}
