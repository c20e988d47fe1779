use std::sync::Arc;

use serde_json::Value;

use crate::error::Error;

/// A closure that does stuff when a job fires an event.
///
/// Listeners run on whichever thread drives the job, outside of the job's locks,
/// so they may call back into the job.
pub type Listener = Arc<dyn for<'a> Fn(&Event<'a>) + Send + Sync>;

/// Events a job fires over its lifetime
#[derive(Copy, Clone, Debug)]
pub enum Event<'a> {
  /// The job adopted another configuration
  ConfigurationChanged,
  /// What the job is about to do
  Description(&'a Description),
  /// Progress of the request, e.g. "Sending request"
  InfoMessage(&'a str),
  /// The request succeeded; `Value::Null` if the reply carried no JSON
  Succeeded(&'a Value),
  /// The request failed
  Failed(&'a Error),
  /// The job reached its final state. Fires exactly once.
  Finished,
  /// The job's result is available. Does not fire for quiet kills.
  Completed,
  /// Amount of work in `Unit` to be processed
  TotalAmount(Unit, u64),
  /// Amount of work in `Unit` processed so far
  ProcessedAmount(Unit, u64),
  /// Total amount in the job's progress unit
  TotalSize(u64),
  /// Processed amount in the job's progress unit
  ProcessedSize(u64),
  /// Overall progress, 0 to 100
  Percent(u64),
}

/// Unit progress is measured in
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Unit {
  /// Bytes transferred
  Bytes,
  /// Files handled
  Files,
  /// Directories handled
  Directories,
  /// Generic items
  Items,
}

impl Default for Unit {
  fn default() -> Self {
    Self::Bytes
  }
}

/// Whether killing a job still announces its result
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KillVerbosity {
  /// Only `Finished` fires
  Quietly,
  /// `Finished` and `Completed` fire
  EmitResult,
}

/// Human readable summary of a job: a title and labelled fields
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Description {
  /// e.g. "Requesting user data"
  pub title: String,
  /// e.g. `("User name", "tester")`
  pub fields: Vec<(String, String)>,
}

impl Description {
  /// Description without fields
  pub fn new(title: impl ToString) -> Self {
    Self { title: title.to_string(),
           fields: Vec::new() }
  }

  /// Add a labelled field
  pub fn field(mut self, label: impl ToString, value: impl ToString) -> Self {
    self.fields.push((label.to_string(), value.to_string()));
    self
  }
}
