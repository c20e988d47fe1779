use std::sync::{Arc, RwLock};

use crate::{config::Configuration,
            mutex_extra::{read_discard_poison, write_discard_poison}};

/// Creates the HTTP client a job sends its request with
pub trait ClientFactory: 'static + Send + Sync + std::fmt::Debug {
  /// Build a client for requests against `config`'s server
  fn create(&self, config: &dyn Configuration) -> reqwest::Result<reqwest::Client>;
}

/// Plain `reqwest` client honouring `ignore_ssl_errors`
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultClientFactory;

impl ClientFactory for DefaultClientFactory {
  fn create(&self, config: &dyn Configuration) -> reqwest::Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();

    if config.ignore_ssl_errors() {
      log::warn!("ignoring TLS certificate errors for {}", config.host());
      builder = builder.danger_accept_invalid_certs(true);
    }

    builder.build()
  }
}

#[derive(Debug, Default)]
struct Defaults {
  configuration: Option<Arc<dyn Configuration>>,
  client_factory: Option<Arc<dyn ClientFactory>>,
}

/// Defaults shared by every job created against it.
///
/// Cloning a context yields another handle to the same defaults.
/// `Context::global()` is the process-wide instance `Job::new` uses.
#[derive(Clone, Debug, Default)]
pub struct Context {
  defaults: Arc<RwLock<Defaults>>,
}

lazy_static::lazy_static! {
  static ref GLOBAL: Context = Context::new();
}

impl Context {
  /// Context without defaults
  pub fn new() -> Self {
    Self::default()
  }

  /// The process-wide context
  pub fn global() -> &'static Context {
    &GLOBAL
  }

  /// Configuration jobs without their own configuration fall back to
  pub fn default_configuration(&self) -> Option<Arc<dyn Configuration>> {
    read_discard_poison(&self.defaults).configuration.clone()
  }

  /// Replace (or with `None`, clear) the default configuration
  pub fn set_default_configuration(&self, config: Option<Arc<dyn Configuration>>) {
    log::debug!("setting default configuration: {:?}", config);
    write_discard_poison(&self.defaults).configuration = config;
  }

  /// Factory used to create HTTP clients, if one is installed
  pub fn client_factory(&self) -> Option<Arc<dyn ClientFactory>> {
    read_discard_poison(&self.defaults).client_factory.clone()
  }

  /// Replace (or with `None`, clear) the client factory
  pub fn set_client_factory(&self, factory: Option<Arc<dyn ClientFactory>>) {
    log::debug!("setting client factory: {:?}", factory);
    write_discard_poison(&self.defaults).client_factory = factory;
  }

  /// Create a client through the installed factory or `DefaultClientFactory`
  pub fn create_client(&self, config: &dyn Configuration) -> reqwest::Result<reqwest::Client> {
    match self.client_factory() {
      | Some(factory) => factory.create(config),
      | None => DefaultClientFactory.create(config),
    }
  }
}

#[cfg(test)]
mod tests {
  use std::thread;

  use super::*;
  use crate::config::MemConfig;

  #[test]
  fn defaults_are_shared_across_clones_and_threads() {
    let ctx = Context::new();
    assert!(ctx.default_configuration().is_none());

    let config: Arc<dyn Configuration> = Arc::new(MemConfig::new());
    let writer = ctx.clone();
    let set = config.clone();
    thread::spawn(move || writer.set_default_configuration(Some(set))).join()
                                                                     .unwrap();

    let reader = ctx.clone();
    let seen = thread::spawn(move || reader.default_configuration()).join()
                                                                     .unwrap()
                                                                     .unwrap();
    assert!(Arc::ptr_eq(&seen, &config));

    ctx.set_default_configuration(None);
    assert!(ctx.default_configuration().is_none());
  }

  #[test]
  fn separate_contexts_are_isolated() {
    let a = Context::new();
    let b = Context::new();
    a.set_client_factory(Some(Arc::new(DefaultClientFactory)));
    assert!(a.client_factory().is_some());
    assert!(b.client_factory().is_none());
  }
}
