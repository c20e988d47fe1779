use std::{collections::HashMap,
          fmt,
          sync::{Condvar, Mutex}};

use bytes::Bytes;
use serde_json::Value;
use tokio::{sync::watch, task::AbortHandle};

use super::event::{Event, KillVerbosity, Listener, Unit};
use crate::{error::{Error, ErrorCode},
            mutex_extra::{lock_discard_poison, wait_discard_poison}};

/// Where a job is in its life. Phases only ever move forward.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
  /// Not started yet
  Created,
  /// Request scheduled or in flight
  Running,
  /// Outcome known, terminal events being fired
  Concluding,
  /// Done; `Finished` has fired
  Finished,
}

/// What a successful request left behind
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Output {
  /// Parsed reply, if the endpoint expects JSON and the reply carried some
  pub json: Option<Value>,
  /// Raw reply body
  pub body: Bytes,
  /// `ocs.meta.statuscode` of a failed OCS envelope, `0` otherwise
  pub meta_status: i32,
}

#[derive(Debug)]
struct State {
  phase: Phase,
  settled: bool,
  error: Option<Error>,
  output: Output,
  auto_delete: bool,
  disposed: bool,
  progress_unit: Unit,
  processed: HashMap<Unit, u64>,
  total: HashMap<Unit, u64>,
  percent: u64,
}

impl State {
  fn update_percent(&mut self, processed: u64, total: u64) -> Option<u64> {
    if total == 0 {
      return None;
    }

    let percent = (processed as f64 / total as f64 * 100.0) as u64;
    match percent == self.percent {
      | true => None,
      | false => {
        self.percent = percent;
        Some(percent)
      },
    }
  }
}

/// Lifecycle shared by every job: phases, terminal events, kill, auto-delete and progress.
pub(crate) struct Lifecycle {
  id: String,
  state: Mutex<State>,
  settled: Condvar,
  settled_tx: watch::Sender<bool>,
  released_tx: watch::Sender<bool>,
  listeners: Mutex<Vec<Listener>>,
  task: Mutex<Option<AbortHandle>>,
}

impl fmt::Debug for Lifecycle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Lifecycle")
     .field("id", &self.id)
     .field("state", &*lock_discard_poison(&self.state))
     .field("listeners", &lock_discard_poison(&self.listeners).len())
     .finish()
  }
}

impl Lifecycle {
  pub(crate) fn new(id: String) -> Self {
    let (settled_tx, _) = watch::channel(false);
    let (released_tx, _) = watch::channel(false);

    Self { id,
           state: Mutex::new(State { phase: Phase::Created,
                                     settled: false,
                                     error: None,
                                     output: Output::default(),
                                     auto_delete: true,
                                     disposed: false,
                                     progress_unit: Unit::default(),
                                     processed: HashMap::new(),
                                     total: HashMap::new(),
                                     percent: 0 }),
           settled: Condvar::new(),
           settled_tx,
           released_tx,
           listeners: Mutex::new(Vec::new()),
           task: Mutex::new(None) }
  }

  pub(crate) fn id(&self) -> &str {
    &self.id
  }

  pub(crate) fn phase(&self) -> Phase {
    lock_discard_poison(&self.state).phase
  }

  pub(crate) fn is_finished(&self) -> bool {
    self.phase() == Phase::Finished
  }

  pub(crate) fn error(&self) -> Option<Error> {
    lock_discard_poison(&self.state).error.clone()
  }

  pub(crate) fn output(&self) -> Output {
    lock_discard_poison(&self.state).output.clone()
  }

  /// Move from `Created` to `Running`. False if the job was started (or finished) before.
  pub(crate) fn begin(&self) -> bool {
    let mut st = lock_discard_poison(&self.state);
    match st.phase {
      | Phase::Created => {
        st.phase = Phase::Running;
        true
      },
      | phase => {
        log::warn!("job {}: not starting, phase is {:?}", self.id, phase);
        false
      },
    }
  }

  /// Let the request flow proceed. Until then a started job neither sends nor fires events.
  pub(crate) fn release(&self) {
    if !self.released_tx.send_replace(true) {
      log::trace!("job {}: released", self.id);
    }
  }

  /// Wait until `release` was called
  pub(crate) async fn released(&self) {
    let mut rx = self.released_tx.subscribe();
    let _ = rx.wait_for(|released| *released).await;
  }

  pub(crate) fn on(&self, listener: Listener) {
    if lock_discard_poison(&self.state).disposed {
      log::warn!("job {}: disposed, listener ignored", self.id);
      return;
    }

    lock_discard_poison(&self.listeners).push(listener);
  }

  pub(crate) fn emit(&self, event: &Event<'_>) {
    let listeners = lock_discard_poison(&self.listeners).clone();
    listeners.iter().for_each(|f| f(event));
  }

  pub(crate) fn info(&self, msg: &str) {
    log::debug!("job {}: {}", self.id, msg);
    self.emit(&Event::InfoMessage(msg));
  }

  /// Remember the task driving the request so `kill` can abort it.
  pub(crate) fn set_task(&self, task: AbortHandle) {
    match self.phase() {
      | Phase::Concluding | Phase::Finished => task.abort(),
      | _ => *lock_discard_poison(&self.task) = Some(task),
    }
  }

  /// Record the outcome of the request, fire `Succeeded` or `Failed`, then finish.
  ///
  /// Only the first outcome counts; a job killed while its request was in flight drops the late one.
  pub(crate) fn conclude(&self, outcome: Result<Output, Error>) {
    {
      let mut st = lock_discard_poison(&self.state);
      if let Phase::Concluding | Phase::Finished = st.phase {
        log::debug!("job {}: already concluded, dropping {:?}", self.id, outcome);
        return;
      }

      st.phase = Phase::Concluding;
      match &outcome {
        | Ok(output) => st.output = output.clone(),
        | Err(e) => st.error = Some(e.clone()),
      }
    }

    match &outcome {
      | Ok(output) => {
        log::info!("job {}: succeeded", self.id);
        self.emit(&Event::Succeeded(output.json.as_ref().unwrap_or(&Value::Null)));
      },
      | Err(e) => {
        log::error!("job {}: failed ({:?}): {}", self.id, e.code, e);
        self.emit(&Event::Failed(e));
      },
    }

    self.finish(true);
  }

  fn finish(&self, emit_result: bool) {
    {
      let mut st = lock_discard_poison(&self.state);
      if st.phase == Phase::Finished {
        log::error!("job {}: finished twice", self.id);
        return;
      }

      st.phase = Phase::Finished;
    }

    log::debug!("job {}: finished", self.id);
    self.emit(&Event::Finished);

    if emit_result {
      self.emit(&Event::Completed);
    }

    if self.is_auto_delete() {
      self.dispose();
    }

    lock_discard_poison(&self.state).settled = true;
    self.settled.notify_all();
    self.settled_tx.send_replace(true);
  }

  /// Abort the request (if any) and finish with `ErrorCode::Killed`.
  pub(crate) fn kill(&self, verbosity: KillVerbosity) -> bool {
    {
      let mut st = lock_discard_poison(&self.state);
      if let Phase::Concluding | Phase::Finished = st.phase {
        return true;
      }

      st.phase = Phase::Concluding;
      st.error = Some(Error::new(ErrorCode::Killed));
    }

    if let Some(task) = lock_discard_poison(&self.task).take() {
      task.abort();
    }

    log::info!("job {}: killed", self.id);
    self.finish(verbosity == KillVerbosity::EmitResult);
    true
  }

  pub(crate) fn suspend(&self) -> bool {
    log::debug!("job {}: suspending is not supported", self.id);
    false
  }

  pub(crate) fn resume(&self) -> bool {
    log::debug!("job {}: resuming is not supported", self.id);
    false
  }

  pub(crate) fn is_auto_delete(&self) -> bool {
    lock_discard_poison(&self.state).auto_delete
  }

  pub(crate) fn set_auto_delete(&self, auto_delete: bool) -> bool {
    std::mem::replace(&mut lock_discard_poison(&self.state).auto_delete, auto_delete)
  }

  /// Drop listeners and the task handle. Listeners often hold a clone of their job,
  /// so this is what lets a finished job be freed.
  pub(crate) fn dispose(&self) {
    lock_discard_poison(&self.state).disposed = true;
    lock_discard_poison(&self.listeners).clear();
    lock_discard_poison(&self.task).take();
    log::debug!("job {}: disposed", self.id);
  }

  /// Block until every terminal event has fired
  pub(crate) fn wait(&self) {
    let st = lock_discard_poison(&self.state);
    drop(wait_discard_poison(&self.settled, st, |st| st.settled));
  }

  /// Wait until every terminal event has fired
  pub(crate) async fn settled(&self) {
    let mut rx = self.settled_tx.subscribe();
    // the sender lives as long as `self`, so this can not fail
    let _ = rx.wait_for(|settled| *settled).await;
  }

  pub(crate) fn progress_unit(&self) -> Unit {
    lock_discard_poison(&self.state).progress_unit
  }

  pub(crate) fn set_progress_unit(&self, unit: Unit) {
    lock_discard_poison(&self.state).progress_unit = unit;
  }

  pub(crate) fn processed_amount(&self, unit: Unit) -> u64 {
    lock_discard_poison(&self.state).processed.get(&unit).copied().unwrap_or(0)
  }

  pub(crate) fn total_amount(&self, unit: Unit) -> u64 {
    lock_discard_poison(&self.state).total.get(&unit).copied().unwrap_or(0)
  }

  pub(crate) fn percent(&self) -> u64 {
    lock_discard_poison(&self.state).percent
  }

  pub(crate) fn set_processed_amount(&self, unit: Unit, amount: u64) {
    self.amount_changed(unit, amount, true)
  }

  pub(crate) fn set_total_amount(&self, unit: Unit, amount: u64) {
    self.amount_changed(unit, amount, false)
  }

  pub(crate) fn set_percent(&self, percent: u64) {
    {
      let mut st = lock_discard_poison(&self.state);
      if st.percent == percent {
        return;
      }

      st.percent = percent;
    }

    self.emit(&Event::Percent(percent));
  }

  fn amount_changed(&self, unit: Unit, amount: u64, processed: bool) {
    let mut events = Vec::new();

    {
      let mut st = lock_discard_poison(&self.state);
      let amounts = match processed {
        | true => &mut st.processed,
        | false => &mut st.total,
      };

      if amounts.insert(unit, amount).unwrap_or(0) == amount {
        return;
      }

      events.push(match processed {
                    | true => Event::ProcessedAmount(unit, amount),
                    | false => Event::TotalAmount(unit, amount),
                  });

      if unit == st.progress_unit {
        events.push(match processed {
                      | true => Event::ProcessedSize(amount),
                      | false => Event::TotalSize(amount),
                    });

        let done = st.processed.get(&unit).copied().unwrap_or(0);
        let total = st.total.get(&unit).copied().unwrap_or(0);
        if let Some(percent) = st.update_percent(done, total) {
          events.push(Event::Percent(percent));
        }
      }
    }

    events.iter().for_each(|e| self.emit(e));
  }
}

impl Drop for Lifecycle {
  fn drop(&mut self) {
    let unfinished = {
      let st = lock_discard_poison(&self.state);
      st.phase != Phase::Finished && !st.disposed
    };

    if unfinished {
      log::debug!("job {}: dropped before finishing", self.id);
      self.emit(&Event::Finished);
    }
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;

  fn recorder(lc: &Lifecycle) -> Arc<Mutex<Vec<String>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    lc.on(Arc::new(move |e: &Event<'_>| sink.lock().unwrap().push(format!("{:?}", e))));
    seen
  }

  #[test]
  fn conclude_fires_terminal_events_once() {
    let lc = Lifecycle::new("t".into());
    lc.set_auto_delete(false);
    let seen = recorder(&lc);

    assert!(lc.begin());
    lc.conclude(Err(Error::new(ErrorCode::MissingHost)));
    lc.conclude(Ok(Output::default()));

    assert_eq!(*seen.lock().unwrap(),
               vec!["Failed(Error { code: MissingHost, text: \"\" })", "Finished", "Completed"]);
    assert_eq!(lc.error().map(|e| e.code), Some(ErrorCode::MissingHost));
    assert!(lc.is_finished());
  }

  #[test]
  fn begin_only_once() {
    let lc = Lifecycle::new("t".into());
    assert!(lc.begin());
    assert!(!lc.begin());
  }

  #[test]
  fn quiet_kill_skips_completed() {
    let lc = Lifecycle::new("t".into());
    lc.set_auto_delete(false);
    let seen = recorder(&lc);

    assert!(lc.kill(KillVerbosity::Quietly));
    assert!(lc.kill(KillVerbosity::EmitResult));

    assert_eq!(*seen.lock().unwrap(), vec!["Finished"]);
    assert_eq!(lc.error().map(|e| e.code), Some(ErrorCode::Killed));
    assert!(!lc.begin());
  }

  #[test]
  fn auto_delete_drops_listeners() {
    let lc = Lifecycle::new("t".into());
    let seen = recorder(&lc);

    lc.conclude(Ok(Output::default()));
    lc.on(Arc::new(|_: &Event<'_>| panic!("listener registered after disposal ran")));
    lc.emit(&Event::Finished);

    assert_eq!(seen.lock().unwrap().len(), 3);
  }

  #[test]
  fn progress_events_only_on_change() {
    let lc = Lifecycle::new("t".into());
    let seen = recorder(&lc);

    lc.set_total_amount(Unit::Bytes, 200);
    lc.set_processed_amount(Unit::Bytes, 50);
    lc.set_processed_amount(Unit::Bytes, 50);
    lc.set_processed_amount(Unit::Files, 1);

    assert_eq!(*seen.lock().unwrap(),
               vec!["TotalAmount(Bytes, 200)",
                    "TotalSize(200)",
                    "ProcessedAmount(Bytes, 50)",
                    "ProcessedSize(50)",
                    "Percent(25)",
                    "ProcessedAmount(Files, 1)"]);
    assert_eq!(lc.percent(), 25);
    assert_eq!(lc.processed_amount(Unit::Files), 1);
    assert_eq!(lc.total_amount(Unit::Files), 0);
  }

  #[test]
  fn wait_returns_once_settled() {
    let lc = Arc::new(Lifecycle::new("t".into()));
    let worker = lc.clone();
    let handle = std::thread::spawn(move || worker.conclude(Ok(Output::default())));

    lc.wait();
    assert!(lc.is_finished());
    handle.join().unwrap();
  }

  #[tokio::test]
  async fn released_waits_for_release() {
    let lc = Arc::new(Lifecycle::new("t".into()));

    let waiter = {
      let lc = lc.clone();
      tokio::spawn(async move { lc.released().await })
    };

    tokio::task::yield_now().await;
    assert!(!waiter.is_finished());

    lc.release();
    lc.release();
    waiter.await.unwrap();
    lc.released().await;
  }
}
