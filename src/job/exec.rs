use std::{sync::Arc, thread};

use serde_json::Value;
use tokio::runtime::{self, RuntimeFlavor};

use super::{event::{Event, Unit},
            reply,
            request::Request,
            Endpoint, Job, Shared};
use crate::error::{Error, ErrorCode, Result};

impl<E: Endpoint> Job<E> {
  /// Send the request in the background and return immediately.
  ///
  /// Nothing is sent and no event fires until control comes back to the
  /// job: on a current-thread runtime that is the next time the calling task
  /// yields. Anywhere else (no runtime, multi-thread runtime) the request is
  /// held until the caller uses the job again through `join`, `run`, `kill`
  /// or `is_finished`, or drops its last handle. Listeners of a job started
  /// without a runtime run on a worker thread of the job's own.
  ///
  /// Starting a job twice has no effect.
  pub fn start(&self) {
    if !self.shared.lifecycle.begin() {
      return;
    }

    match runtime::Handle::try_current() {
      | Ok(handle) => {
        if handle.runtime_flavor() == RuntimeFlavor::CurrentThread {
          self.shared.lifecycle.release();
        }

        let task = handle.spawn(send_request(self.shared.clone()));
        self.shared.lifecycle.set_task(task.abort_handle());
      },
      | Err(_) => spawn_worker(self.shared.clone()),
    }
  }

  /// Send the request and block until the job finished. True if it succeeded.
  ///
  /// The request runs on a worker thread, so calling this from within a
  /// runtime does not starve the runtime of the request. Auto-delete is
  /// suspended while waiting so the job can be inspected afterwards; the
  /// job is disposed before returning if auto-delete was on.
  ///
  /// Must not be used on a job already started with `start` on the
  /// current-thread runtime this thread is driving.
  pub fn run(&self) -> bool {
    let lifecycle = &self.shared.lifecycle;
    let auto_delete = lifecycle.set_auto_delete(false);
    lifecycle.release();

    if lifecycle.begin() {
      spawn_worker(self.shared.clone());
    }

    lifecycle.wait();

    if auto_delete {
      lifecycle.set_auto_delete(true);
      lifecycle.dispose();
    }

    self.error_code() == ErrorCode::NoError.code()
  }

  /// Wait for the job to finish and yield its outcome.
  ///
  /// Does not start the job.
  pub async fn join(&self) -> Result<Value> {
    self.shared.lifecycle.release();
    self.shared.lifecycle.settled().await;
    self.settled_outcome()
  }
}

/// Drive the request on a fresh thread with a current-thread runtime
fn spawn_worker<E: Endpoint>(shared: Arc<Shared<E>>) {
  let worker = shared.clone();
  let spawned = thread::Builder::new().name(format!("ocs-job-{}", shared.lifecycle.id()))
                                      .spawn(move || {
                                        let rt = runtime::Builder::new_current_thread().enable_all().build();

                                        match rt {
                                          | Ok(rt) => rt.block_on(async move {
                                                          let task = tokio::spawn(send_request(worker.clone()));
                                                          worker.lifecycle.set_task(task.abort_handle());

                                                          if let Err(e) = task.await {
                                                            log::debug!("job {}: task ended early: {}",
                                                                        worker.lifecycle.id(),
                                                                        e);
                                                          }
                                                        }),
                                          | Err(e) => {
                                            worker.lifecycle
                                                  .conclude(Err(Error::with_text(ErrorCode::NetworkError, e)))
                                          },
                                        }
                                      });

  if let Err(e) = spawned {
    shared.lifecycle
          .conclude(Err(Error::with_text(ErrorCode::NetworkError, e)));
  }
}

/// The request flow: describe, resolve configuration, prepare, send, classify, conclude.
async fn send_request<E: Endpoint>(shared: Arc<Shared<E>>) {
  let lifecycle = &shared.lifecycle;
  lifecycle.released().await;

  let description = shared.with_endpoint(|ep| ep.describe());
  lifecycle.emit(&Event::Description(&description));
  lifecycle.info("Setting up request");

  let config = match shared.resolve_configuration() {
    | Some(config) => config,
    | None => return lifecycle.conclude(Err(ErrorCode::MissingConfig.into())),
  };

  let request = shared.with_endpoint(|ep| Request::prepare(ep, &*config, shared.timeout()));
  let request = match request {
    | Ok(request) => request,
    | Err(e) => return lifecycle.conclude(Err(e)),
  };

  log::debug!("job {}: {:?}", lifecycle.id(), request);

  let client = match shared.context.create_client(&*config) {
    | Ok(client) => client,
    | Err(e) => return lifecycle.conclude(Err(Error::with_text(ErrorCode::NetworkError, e))),
  };

  lifecycle.info("Sending request");
  let sent = request.send(&client).await;

  if let Ok(reply) = &sent {
    log::debug!("job {}: HTTP {} ({} bytes)", lifecycle.id(), reply.status, reply.body.len());
    lifecycle.set_total_amount(Unit::Bytes, reply.content_length.unwrap_or(reply.body.len() as u64));
    lifecycle.set_processed_amount(Unit::Bytes, reply.body.len() as u64);
  }

  lifecycle.info("Checking reply");
  let outcome = shared.with_endpoint(|ep| reply::classify(ep, sent));
  lifecycle.conclude(outcome);
}
