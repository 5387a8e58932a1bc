//! `HeartbeatSupervisor`: a caller-spawned background primitive that ticks
//! heartbeats on a fixed cadence, reregisters on a 404 (the server forgot the
//! instance), and backs off on a 5xx. Spawning the thread is the caller's
//! job, not a side effect of `RegistryClient::register` — this keeps register
//! a single RPC and makes the supervisor independently testable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::EurekaError;
use crate::instance::Instance;
use crate::registry::RegistryClient;

pub struct HeartbeatSupervisor {
    registry: Arc<RegistryClient>,
    instance: Instance,
    poll_interval: Duration,
    running: Arc<AtomicBool>,
}

impl HeartbeatSupervisor {
    pub fn new(registry: Arc<RegistryClient>, instance: Instance, poll_interval: Duration) -> Self {
        HeartbeatSupervisor {
            registry,
            instance,
            poll_interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawns the background thread. Returns a handle whose `Drop`
    /// cooperatively stops the loop (it does not block waiting for the
    /// thread to exit; the loop checks the flag at most once per
    /// `poll_interval`).
    pub fn spawn(self) -> HeartbeatHandle {
        self.running.store(true, Ordering::Relaxed);
        let running = Arc::clone(&self.running);
        let registry = Arc::clone(&self.registry);
        let instance = self.instance.clone();
        let poll_interval = self.poll_interval;
        let app = instance.app.clone();
        let instance_id = instance.id();

        let join = thread::spawn(move || {
            while running.load(Ordering::Relaxed) {
                thread::sleep(poll_interval);
                if !running.load(Ordering::Relaxed) {
                    break;
                }
                match registry.heartbeat(&app, &instance_id) {
                    Ok(()) => debug!("heartbeat ok for {}/{}", app, instance_id),
                    Err(e) => Self::handle_failure(&registry, &instance, &e),
                }
            }
        });

        HeartbeatHandle {
            running: self.running,
            join: Some(join),
        }
    }

    fn handle_failure(registry: &RegistryClient, instance: &Instance, err: &EurekaError) {
        match crate::error::http_response_status_code(Some(err)) {
            Some(404) => {
                warn!("instance {} unknown to server, reregistering", instance.id());
                if let Err(e) = registry.reregister(instance) {
                    error!("reregister after 404 failed: {}", e);
                }
            }
            Some(code) if (500..600).contains(&code) => {
                warn!("heartbeat got {}, backing off until next tick", code);
            }
            _ => {
                error!("heartbeat failed: {}", err);
            }
        }
    }
}

pub struct HeartbeatHandle {
    running: Arc<AtomicBool>,
    join: Option<thread::JoinHandle<()>>,
}

impl HeartbeatHandle {
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl Drop for HeartbeatHandle {
    fn drop(&mut self) {
        self.stop();
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}
