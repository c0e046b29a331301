//! # Example: tunnel_cohort
//!
//! Two tunnel-like workers started as one cohort and shut down together.
//!
//! Shows how to:
//! - Implement [`WorkerHooks`] for a transport.
//! - Consume a handshake response through [`SessionInfo`] in `do_start`.
//! - Print lifecycle events with the built-in [`LogWriter`].
//! - Run until Ctrl-C (or until a worker gives up), then stop the whole cohort.
//!
//! ## Flow
//! ```text
//! Cohort::start()
//!   ├─► ssh.do_start()  (parses handshake, opens "connection")
//!   └─► meek.do_start()
//! every tick: do_periodic_check()  (meek fails after a few checks)
//! meek votes unclean ─► cohort skips stop_imminent ─► do_stop() on both
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example tunnel_cohort --features logging
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing_subscriber::EnvFilter;
use tunnelvisor::{
    Cohort, HookError, LogWriter, ServerEntry, SessionInfo, Subscribe, WorkerConfig, WorkerHooks,
};

const HANDSHAKE: &str = "Upgrade: 7\n\
                         PSK: 9f86d081884c7d65\n\
                         Homepage: https://home.example\n\
                         SSHPort: 2222\n\
                         SSHUsername: tunnel\n\
                         SSHPassword: hunter2\n\
                         SSHHostkey: AAAAC3NzaC1lZDI1NTE5\n";

/// Pretends to hold an SSH session configured by the handshake.
struct SshTunnel {
    session: SessionInfo,
}

#[async_trait]
impl WorkerHooks for SshTunnel {
    fn name(&self) -> &str {
        "ssh"
    }

    async fn do_start(&self) -> Result<bool, HookError> {
        let port = self.session.ssh_port().unwrap_or("22");
        let user = self.session.ssh_username().unwrap_or("anonymous");
        println!("[ssh] connecting as {user} on port {port}");
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(true)
    }

    async fn do_periodic_check(&self) -> Result<bool, HookError> {
        Ok(true)
    }

    async fn stop_imminent(&self) {
        println!("[ssh] flushing channels");
    }

    async fn do_stop(&self) {
        println!("[ssh] disconnected");
    }
}

/// Transport that loses its connection after a few checks.
struct MeekTunnel {
    checks_left: AtomicU32,
}

#[async_trait]
impl WorkerHooks for MeekTunnel {
    fn name(&self) -> &str {
        "meek"
    }

    async fn do_start(&self) -> Result<bool, HookError> {
        println!("[meek] fronted connection up");
        Ok(true)
    }

    async fn do_periodic_check(&self) -> Result<bool, HookError> {
        if self.checks_left.fetch_sub(1, Ordering::SeqCst) == 0 {
            return Err(HookError::fail("front domain unreachable"));
        }
        Ok(true)
    }

    async fn stop_imminent(&self) {
        println!("[meek] closing relay");
    }

    async fn do_stop(&self) {
        println!("[meek] torn down");
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let session = SessionInfo::parse_validated(HANDSHAKE)?.with_server_entry(ServerEntry {
        address: "192.0.2.10".into(),
        web_server_port: 8080,
        web_server_secret: "0123abcd".into(),
    });

    let cfg = WorkerConfig {
        tick: Duration::from_millis(250),
        join_grace: Duration::from_secs(5),
        ..WorkerConfig::default()
    };

    let mut cohort = Cohort::builder(cfg)
        .with_subscribers(vec![Arc::new(LogWriter::new()) as Arc<dyn Subscribe>])
        .with_worker(Arc::new(SshTunnel { session }))
        .with_worker(Arc::new(MeekTunnel {
            checks_left: AtomicU32::new(8),
        }))
        .build();

    let started = cohort.start().await?;
    println!("[demo] {started} of {} workers started", cohort.workers().len());

    cohort.run_until_shutdown().await?;
    println!("[demo] cohort stopped; votes={:?}", cohort.synchronizer().snapshot().votes);

    cohort.reset();
    Ok(())
}
