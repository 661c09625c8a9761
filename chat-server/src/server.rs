//! The accept loop: bind, announce the bound port, then spawn one task per
//! connection plus the long-lived stats reporter (§6).

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::connection::handle_connection;
use crate::roster::Roster;
use crate::stats;

pub struct Server {
    listener: TcpListener,
    roster: Arc<Roster>,
}

impl Server {
    pub async fn bind(port: u16, password: Option<String>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(("0.0.0.0", port))
            .await
            .context("binding listener")?;
        Ok(Self {
            listener,
            roster: Arc::new(Roster::new(password)),
        })
    }

    pub fn bound_port(&self) -> anyhow::Result<u16> {
        Ok(self.listener.local_addr().context("reading bound address")?.port())
    }

    pub async fn run(self) -> anyhow::Result<()> {
        tokio::spawn(stats::run(self.roster.clone()));

        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(v) => v,
                Err(err) => {
                    tracing::warn!(%err, "accept failed");
                    continue;
                }
            };
            tracing::debug!(%addr, "connection accepted");
            let roster = self.roster.clone();
            tokio::spawn(async move {
                handle_connection(stream, roster).await;
            });
        }
    }
}
