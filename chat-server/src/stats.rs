//! SIGHUP-triggered stats dump (§4.F). The original server wrote the report
//! straight into `fprintf`'s format-string argument; a malicious SAY payload
//! embedded in a name could then be interpreted as `printf` conversions.
//! Building the report as an owned `String` and writing it verbatim sidesteps
//! that class of bug entirely.

use std::io::Write as _;
use std::sync::Arc;

use tokio::signal::unix::{signal, SignalKind};

use crate::roster::Roster;

pub async fn run(roster: Arc<Roster>) {
    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(s) => s,
        Err(err) => {
            tracing::warn!(%err, "could not install SIGHUP handler, stats dump disabled");
            return;
        }
    };

    loop {
        if hangup.recv().await.is_none() {
            return;
        }
        let report = roster.stats_report();
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(report.as_bytes());
        let _ = stderr.flush();
    }
}
