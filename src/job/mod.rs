use std::{fmt,
          sync::{atomic::{AtomicU16, AtomicUsize, Ordering},
                 Arc, RwLock, RwLockReadGuard, RwLockWriteGuard}};

use bytes::Bytes;
use serde_json::Value;

use crate::{config::Configuration,
            context::Context,
            error::{Error, ErrorCode, Result},
            mutex_extra::{read_discard_poison, write_discard_poison}};

/// Job events and listeners
pub mod event;

/// What an endpoint contributes to a job
pub mod endpoint;

/// Building and sending requests
pub mod request;

/// Reading replies
pub mod reply;

/// Scheduling and the request flow
mod exec;

mod lifecycle;

pub use endpoint::Endpoint;
pub use event::{Description, Event, KillVerbosity, Listener, Unit};
pub use lifecycle::{Output, Phase};

/// Seconds a request may take unless configured otherwise
pub const DEFAULT_REQUEST_TIMEOUT: u16 = 300;

/// One request against an OCS endpoint.
///
/// `Job` is a cheap handle; clones refer to the same job. A job runs at most once:
/// either in the background with [`Job::start`] or blocking with [`Job::run`].
pub struct Job<E: Endpoint> {
  shared: Arc<Shared<E>>,
}

pub(crate) struct Shared<E: Endpoint> {
  pub(crate) context: Context,
  pub(crate) lifecycle: lifecycle::Lifecycle,
  endpoint: RwLock<E>,
  configuration: RwLock<Option<Arc<dyn Configuration>>>,
  timeout: AtomicU16,
  handles: AtomicUsize,
}

impl<E: Endpoint> Clone for Job<E> {
  fn clone(&self) -> Self {
    self.shared.handles.fetch_add(1, Ordering::Relaxed);
    Self { shared: self.shared.clone() }
  }
}

impl<E: Endpoint> Drop for Job<E> {
  fn drop(&mut self) {
    if self.shared.handles.fetch_sub(1, Ordering::AcqRel) == 1 {
      self.shared.lifecycle.release();
    }
  }
}

impl<E: Endpoint> fmt::Debug for Job<E> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Job")
     .field("endpoint", &*self.endpoint())
     .field("lifecycle", &self.shared.lifecycle)
     .finish()
  }
}

impl<E: Endpoint> Job<E> {
  /// Job against the process-wide context
  pub fn new(endpoint: E) -> Self {
    Self::with_context(Context::global().clone(), endpoint)
  }

  /// Job against `context`
  pub fn with_context(context: Context, endpoint: E) -> Self {
    let id = nanoid::nanoid!(10);
    log::debug!("job {}: created for {:?}", id, endpoint);

    Self { shared: Arc::new(Shared { context,
                                     lifecycle: lifecycle::Lifecycle::new(id),
                                     endpoint: RwLock::new(endpoint),
                                     configuration: RwLock::new(None),
                                     timeout: AtomicU16::new(DEFAULT_REQUEST_TIMEOUT),
                                     handles: AtomicUsize::new(1) }) }
  }

  /// Identifier used in log lines
  pub fn id(&self) -> &str {
    self.shared.lifecycle.id()
  }

  /// The context defaults are taken from
  pub fn context(&self) -> &Context {
    &self.shared.context
  }

  /// The endpoint
  pub fn endpoint(&self) -> RwLockReadGuard<'_, E> {
    read_discard_poison(&self.shared.endpoint)
  }

  /// The endpoint, for changing its parameters before the job starts
  pub fn endpoint_mut(&self) -> RwLockWriteGuard<'_, E> {
    write_discard_poison(&self.shared.endpoint)
  }

  /// The job's own configuration. `None` until set or until the default was adopted.
  pub fn configuration(&self) -> Option<Arc<dyn Configuration>> {
    self.shared.configuration()
  }

  /// Use `config` instead of the context default
  pub fn set_configuration(&self, config: Arc<dyn Configuration>) {
    self.shared.set_configuration(config)
  }

  /// Request timeout in seconds, `0` for none
  pub fn request_timeout(&self) -> u16 {
    self.shared.timeout.load(Ordering::Relaxed)
  }

  /// Change the request timeout; `0` disables it
  pub fn set_request_timeout(&self, secs: u16) {
    self.shared.timeout.store(secs, Ordering::Relaxed)
  }

  /// Register a listener for this job's events
  pub fn on<F>(&self, f: F) -> &Self
    where F: for<'a, 'b> Fn(&'b Event<'a>) + Send + Sync + 'static
  {
    self.shared.lifecycle.on(Arc::new(f));
    self
  }

  /// Where the job is in its life
  pub fn phase(&self) -> Phase {
    self.shared.lifecycle.phase()
  }

  /// Whether the job reached its final state. Lets a started job proceed.
  pub fn is_finished(&self) -> bool {
    self.shared.lifecycle.release();
    self.shared.lifecycle.is_finished()
  }

  /// The error the job failed with
  pub fn error(&self) -> Option<Error> {
    self.shared.lifecycle.error()
  }

  /// Integer error code, `0` on success
  pub fn error_code(&self) -> i32 {
    self.error().map(|e| e.code).unwrap_or(ErrorCode::NoError).code()
  }

  /// Text attached to the error, empty on success
  pub fn error_text(&self) -> String {
    self.error().map(|e| e.text).unwrap_or_default()
  }

  /// Human readable error message, empty on success
  pub fn error_string(&self) -> String {
    self.error()
        .map(|e| self.endpoint().error_string(&e))
        .unwrap_or_default()
  }

  /// Parsed reply of a successful job
  pub fn result(&self) -> Option<Value> {
    self.shared.lifecycle.output().json
  }

  /// Raw reply body of a successful job
  pub fn reply_data(&self) -> Bytes {
    self.shared.lifecycle.output().body
  }

  /// `ocs.meta.statuscode` of a failed OCS envelope, `0` otherwise
  pub fn meta_status_code(&self) -> i32 {
    self.shared.lifecycle.output().meta_status
  }

  /// The terminal result: the parsed reply (`Value::Null` if there was none) or the error.
  /// `None` while the job is not finished.
  pub fn outcome(&self) -> Option<Result<Value>> {
    if !self.is_finished() {
      return None;
    }

    Some(match self.error() {
           | Some(e) => Err(e),
           | None => Ok(self.result().unwrap_or(Value::Null)),
         })
  }

  pub(crate) fn settled_outcome(&self) -> Result<Value> {
    self.outcome()
        .unwrap_or_else(|| Err(Error::new(ErrorCode::UnknownError)))
  }

  /// Abort the job. Returns true if the job is (now) finished.
  pub fn kill(&self, verbosity: KillVerbosity) -> bool {
    let killed = self.shared.lifecycle.kill(verbosity);
    self.shared.lifecycle.release();
    killed
  }

  /// Jobs can not be suspended; always false
  pub fn suspend(&self) -> bool {
    self.shared.lifecycle.suspend()
  }

  /// Jobs can not be suspended; always false
  pub fn resume(&self) -> bool {
    self.shared.lifecycle.resume()
  }

  /// Whether the job drops its listeners once finished (default: true)
  pub fn is_auto_delete(&self) -> bool {
    self.shared.lifecycle.is_auto_delete()
  }

  /// Keep listeners after finishing (`false`) or drop them (`true`)
  pub fn set_auto_delete(&self, auto_delete: bool) {
    self.shared.lifecycle.set_auto_delete(auto_delete);
  }

  /// Unit `percent` is computed for
  pub fn progress_unit(&self) -> Unit {
    self.shared.lifecycle.progress_unit()
  }

  /// Change the unit `percent` is computed for
  pub fn set_progress_unit(&self, unit: Unit) {
    self.shared.lifecycle.set_progress_unit(unit)
  }

  /// Amount processed so far
  pub fn processed_amount(&self, unit: Unit) -> u64 {
    self.shared.lifecycle.processed_amount(unit)
  }

  /// Amount to be processed
  pub fn total_amount(&self, unit: Unit) -> u64 {
    self.shared.lifecycle.total_amount(unit)
  }

  /// Record progress; fires events when the amount changes
  pub fn set_processed_amount(&self, unit: Unit, amount: u64) {
    self.shared.lifecycle.set_processed_amount(unit, amount)
  }

  /// Record the total; fires events when the amount changes
  pub fn set_total_amount(&self, unit: Unit, amount: u64) {
    self.shared.lifecycle.set_total_amount(unit, amount)
  }

  /// Overall progress, 0 to 100
  pub fn percent(&self) -> u64 {
    self.shared.lifecycle.percent()
  }

  /// Set overall progress; fires `Event::Percent` when it changes
  pub fn set_percent(&self, percent: u64) {
    self.shared.lifecycle.set_percent(percent)
  }
}

impl<E: Endpoint> Shared<E> {
  fn configuration(&self) -> Option<Arc<dyn Configuration>> {
    read_discard_poison(&self.configuration).clone()
  }

  fn set_configuration(&self, config: Arc<dyn Configuration>) {
    let changed = {
      let mut current = write_discard_poison(&self.configuration);
      let changed = current.as_ref()
                           .map(|c| !same_config(c, &config))
                           .unwrap_or(true);
      *current = Some(config);
      changed
    };

    if changed {
      log::debug!("job {}: configuration changed", self.lifecycle.id());
      self.lifecycle.emit(&Event::ConfigurationChanged);
    }
  }

  /// The job's configuration, adopting the context default if it has none
  pub(crate) fn resolve_configuration(&self) -> Option<Arc<dyn Configuration>> {
    if let Some(config) = self.configuration() {
      return Some(config);
    }

    let default = self.context.default_configuration()?;
    log::debug!("job {}: using default configuration", self.lifecycle.id());
    self.set_configuration(default.clone());
    Some(default)
  }

  pub(crate) fn with_endpoint<T>(&self, f: impl FnOnce(&E) -> T) -> T {
    f(&read_discard_poison(&self.endpoint))
  }

  pub(crate) fn timeout(&self) -> u16 {
    self.timeout.load(Ordering::Relaxed)
  }
}

fn same_config(a: &Arc<dyn Configuration>, b: &Arc<dyn Configuration>) -> bool {
  Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}
