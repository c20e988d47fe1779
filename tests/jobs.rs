use std::{sync::{mpsc, Arc, Mutex},
          thread,
          time::Duration};

use ocs_jobs::{api::{GetServerStatus, GetUser, GetUserList},
               config::{Configuration, MemConfig},
               context::Context,
               error::ErrorCode,
               job::{Endpoint, Event, Job, KillVerbosity, Phase, Unit},
               mutex_extra::lock_discard_poison};

fn init() {
  simple_logger::SimpleLogger::new().init().ok();
}

fn record<E: Endpoint>(job: &Job<E>) -> Arc<Mutex<Vec<String>>> {
  let events = Arc::new(Mutex::new(Vec::new()));
  let sink = events.clone();

  job.on(move |ev| {
       let label = match ev {
         | Event::ConfigurationChanged => "configuration".to_string(),
         | Event::Description(d) => format!("description {}", d.title),
         | Event::InfoMessage(msg) => format!("info {}", msg),
         | Event::Succeeded(_) => "succeeded".to_string(),
         | Event::Failed(e) => format!("failed {:?}", e.code),
         | Event::Finished => "finished".to_string(),
         | Event::Completed => "completed".to_string(),
         | _ => return,
       };
       lock_discard_poison(&sink).push(label);
     });

  events
}

fn count(events: &Arc<Mutex<Vec<String>>>, label: &str) -> usize {
  lock_discard_poison(events).iter().filter(|e| *e == label).count()
}

fn config(url: &str, user: &str, password: &str) -> Arc<dyn Configuration> {
  Arc::new(MemConfig::from_server_url(url, user, password).unwrap())
}

#[test]
pub fn missing_config_fails_once() {
  init();

  let job = Job::with_context(Context::new(), GetUserList);
  let events = record(&job);

  assert!(!job.run());
  assert_eq!(job.error().unwrap().code, ErrorCode::MissingConfig);
  assert_eq!(job.error_code(), 101);
  assert!(job.is_finished());
  assert_eq!(job.phase(), Phase::Finished);

  assert_eq!(*lock_discard_poison(&events),
             vec!["description Requesting user list".to_string(),
                  "info Setting up request".to_string(),
                  "failed MissingConfig".to_string(),
                  "finished".to_string(),
                  "completed".to_string()]);
}

#[test]
pub fn missing_host() {
  init();

  let job = Job::with_context(Context::new(), GetServerStatus);
  job.set_configuration(Arc::new(MemConfig::new()));

  assert!(!job.run());
  assert_eq!(job.error().unwrap().code, ErrorCode::MissingHost);
}

#[test]
pub fn missing_credentials() {
  init();

  let job = Job::with_context(Context::new(), GetUserList);
  job.set_configuration(config("https://cloud.example.net", "", "secret"));
  assert!(!job.run());
  assert_eq!(job.error().unwrap().code, ErrorCode::MissingUser);

  let job = Job::with_context(Context::new(), GetUserList);
  job.set_configuration(config("https://cloud.example.net", "tester", ""));
  assert!(!job.run());
  assert_eq!(job.error().unwrap().code, ErrorCode::MissingPassword);
}

#[test]
pub fn empty_user_id() {
  init();

  let job = Job::with_context(Context::new(), GetUser::default());
  job.set_configuration(config("https://cloud.example.net", "tester", "secret"));

  assert!(!job.run());
  assert_eq!(job.error().unwrap().code, ErrorCode::EmptyUser);
  assert_eq!(job.error_string(), "Can not get user data for empty user name.");
}

#[test]
pub fn adopts_context_default() {
  init();

  let ctx = Context::new();
  let default = Arc::new(MemConfig::new());
  ctx.set_default_configuration(Some(default.clone()));

  let job = Job::with_context(ctx, GetServerStatus);
  let events = record(&job);
  assert!(job.configuration().is_none());

  job.run();

  let adopted = job.configuration().unwrap();
  assert_eq!(Arc::as_ptr(&adopted) as *const (), Arc::as_ptr(&default) as *const ());
  assert_eq!(count(&events, "configuration"), 1);
}

#[test]
pub fn explicit_configuration_wins() {
  init();

  let ctx = Context::new();
  ctx.set_default_configuration(Some(config("https://cloud.example.net", "tester", "secret")));

  let job = Job::with_context(ctx, GetUserList);
  job.set_configuration(Arc::new(MemConfig::new()));

  assert!(!job.run());
  assert_eq!(job.error().unwrap().code, ErrorCode::MissingHost);
}

#[test]
pub fn quiet_kill_before_start() {
  init();

  let job = Job::with_context(Context::new(), GetUserList);
  let events = record(&job);

  assert!(job.kill(KillVerbosity::Quietly));
  assert_eq!(*lock_discard_poison(&events), vec!["finished".to_string()]);
  assert_eq!(job.error().unwrap().code, ErrorCode::Killed);

  job.start();
  assert!(!job.run());
  assert_eq!(count(&events, "finished"), 1);
  assert_eq!(count(&events, "description Requesting user list"), 0);
}

#[test]
pub fn noisy_kill_emits_completed() {
  init();

  let job = Job::with_context(Context::new(), GetUserList);
  job.set_auto_delete(false);
  let events = record(&job);

  assert!(job.kill(KillVerbosity::EmitResult));
  assert_eq!(*lock_discard_poison(&events),
             vec!["finished".to_string(), "completed".to_string()]);

  assert!(job.kill(KillVerbosity::EmitResult));
  assert_eq!(lock_discard_poison(&events).len(), 2);
}

#[test]
pub fn run_twice_keeps_outcome() {
  init();

  let job = Job::with_context(Context::new(), GetUserList);
  let events = record(&job);

  assert!(!job.run());
  assert!(!job.run());
  assert_eq!(count(&events, "failed MissingConfig"), 1);
  assert_eq!(job.outcome().unwrap().unwrap_err().code, ErrorCode::MissingConfig);
}

#[test]
pub fn auto_delete_drops_listeners() {
  init();

  let witness = Arc::new(());

  let job = Job::with_context(Context::new(), GetUserList);
  let held = witness.clone();
  job.on(move |_| {
       let _ = &held;
     });
  assert_eq!(Arc::strong_count(&witness), 2);

  job.run();
  assert_eq!(Arc::strong_count(&witness), 1);

  let job = Job::with_context(Context::new(), GetUserList);
  job.set_auto_delete(false);
  let held = witness.clone();
  job.on(move |_| {
       let _ = &held;
     });

  job.run();
  assert!(!job.is_auto_delete());
  assert_eq!(Arc::strong_count(&witness), 2);
}

#[test]
pub fn suspend_is_unsupported() {
  let job = Job::with_context(Context::new(), GetUserList);
  assert!(!job.suspend());
  assert!(!job.resume());
}

#[test]
pub fn progress_on_job() {
  let job = Job::with_context(Context::new(), GetUserList);
  let percents = Arc::new(Mutex::new(Vec::new()));
  let sink = percents.clone();
  job.on(move |ev| {
       if let Event::Percent(p) = ev {
         lock_discard_poison(&sink).push(*p);
       }
     });

  job.set_total_amount(Unit::Bytes, 200);
  job.set_processed_amount(Unit::Bytes, 50);
  job.set_processed_amount(Unit::Bytes, 50);
  job.set_processed_amount(Unit::Bytes, 200);

  assert_eq!(job.processed_amount(Unit::Bytes), 200);
  assert_eq!(job.total_amount(Unit::Bytes), 200);
  assert_eq!(job.percent(), 100);
  assert_eq!(*lock_discard_poison(&percents), vec![25, 100]);
}

#[tokio::test]
pub async fn start_returns_before_events() {
  init();

  let job = Job::with_context(Context::new(), GetUserList);
  let events = record(&job);

  job.start();
  lock_discard_poison(&events).push("started".into());

  let err = job.join().await.unwrap_err();
  assert_eq!(err.code, ErrorCode::MissingConfig);

  let events = lock_discard_poison(&events);
  assert_eq!(events.first().map(String::as_str), Some("started"));
  assert_eq!(events.iter().filter(|e| *e == "finished").count(), 1);
}

#[test]
pub fn start_without_runtime_holds_events() {
  init();

  let job = Job::with_context(Context::new(), GetUserList);
  let events = record(&job);

  job.start();
  thread::sleep(Duration::from_millis(100));
  assert!(lock_discard_poison(&events).is_empty());
  assert_eq!(job.phase(), Phase::Running);
  lock_discard_poison(&events).push("started".into());

  assert!(!job.run());

  let events = lock_discard_poison(&events);
  assert_eq!(events.first().map(String::as_str), Some("started"));
  assert_eq!(events.iter().filter(|e| *e == "failed MissingConfig").count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
pub async fn start_on_multi_thread_runtime_holds_events() {
  init();

  let job = Job::with_context(Context::new(), GetUserList);
  let events = record(&job);

  job.start();
  thread::sleep(Duration::from_millis(100));
  lock_discard_poison(&events).push("started".into());

  assert_eq!(job.join().await.unwrap_err().code, ErrorCode::MissingConfig);

  let events = lock_discard_poison(&events);
  assert_eq!(events.first().map(String::as_str), Some("started"));
  assert_eq!(events.iter().filter(|e| *e == "finished").count(), 1);
}

#[test]
pub fn dropped_job_still_finishes() {
  init();

  let (tx, rx) = mpsc::channel();
  let tx = Mutex::new(tx);

  let job = Job::with_context(Context::new(), GetUserList);
  job.on(move |ev| {
       if let Event::Finished = ev {
         lock_discard_poison(&tx).send(()).ok();
       }
     });

  job.start();
  drop(job);

  assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
}

#[tokio::test]
pub async fn join_after_quiet_kill() {
  let job = Job::with_context(Context::new(), GetUserList);

  job.start();
  job.kill(KillVerbosity::Quietly);

  assert_eq!(job.join().await.unwrap_err().code, ErrorCode::Killed);
  assert!(job.is_finished());
}
