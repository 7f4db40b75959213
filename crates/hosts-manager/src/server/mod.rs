//! Service side of hosts-manager
//!
//! - [`reconcile`] - claim matching and all-or-nothing batches
//! - [`write_queue`] - serializes batches and runs hooks
//! - [`service`] - request decoding, validation and error reporting
//! - [`config`] / [`tracing_setup`] - ambient setup

pub mod config;
pub mod hooks;
pub mod messages;
pub mod reconcile;
pub mod service;
pub mod tracing_setup;
pub mod write_queue;

use crate::server::config::Config;
use crate::server::hooks::HookExecutor;
use crate::server::reconcile::Reconciler;
use crate::server::service::HostsService;
use crate::server::write_queue::WriteQueue;
use hosts_manager_store::{FsHostsFileIo, HostsFileIo};
use std::sync::Arc;
use tracing::debug;

/// Wire a service against the real filesystem
///
/// Must be called inside a tokio runtime; the write worker is spawned here.
pub fn build_service(config: &Config) -> HostsService {
    build_service_with_io(config, Arc::new(FsHostsFileIo::new()))
}

pub fn build_service_with_io(config: &Config, io: Arc<dyn HostsFileIo>) -> HostsService {
    let reconciler = Arc::new(Reconciler::new(
        io,
        config.hosts.path.clone(),
        config.store_options(),
    ));

    let hooks = Arc::new(HookExecutor::new(
        config.hooks.on_success.clone(),
        config.hooks.on_failure.clone(),
        config.hooks.timeout_secs,
    ));

    debug!(
        path = %config.hosts.path.display(),
        success_hooks = config.hooks.on_success.len(),
        failure_hooks = config.hooks.on_failure.len(),
        "Hosts service ready"
    );

    let queue = WriteQueue::new(Arc::clone(&reconciler), hooks);
    HostsService::new(reconciler, queue, config.hosts.validate)
}
