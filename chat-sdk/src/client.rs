//! The connecting-peer side of the protocol: two cooperating tasks sharing
//! one connection (§4.G).
//!
//! An **inbound** task runs the auth/name mirror state machine and then
//! renders every server command as a human-readable line on standard
//! output. An **outbound** task, gated until authentication and naming
//! finish, turns standard input lines into wire commands. Both push onto a
//! single mpsc channel drained by a dedicated writer task, so the
//! underlying socket only ever has one writer, matching the codec's
//! single-writer requirement (§4.A).

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, Notify};

use crate::codec;
use crate::protocol::{ClientCommand, ServerCommand};
use crate::sanitize::printable;

/// Why the client process is terminating, with the exit code and stderr
/// message mandated by §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Normal,
    Comms,
    Kicked,
    FailedAuth,
}

impl ExitReason {
    pub fn code(self) -> i32 {
        match self {
            ExitReason::Normal => 0,
            ExitReason::Comms => 2,
            ExitReason::Kicked => 3,
            ExitReason::FailedAuth => 4,
        }
    }

    pub fn message(self) -> Option<&'static str> {
        match self {
            ExitReason::Normal => None,
            ExitReason::Comms => Some("Communications error"),
            ExitReason::Kicked => Some("Kicked"),
            ExitReason::FailedAuth => Some("Authentication error"),
        }
    }
}

/// The first reason recorded wins; later attempts are ignored (§4.G).
#[derive(Default)]
struct ExitSlot(OnceLock<ExitReason>);

impl ExitSlot {
    fn record(&self, reason: ExitReason) {
        let _ = self.0.set(reason);
    }

    fn get(&self) -> Option<ExitReason> {
        self.0.get().copied()
    }
}

struct Shared {
    authenticated: Notify,
    exit: ExitSlot,
}

pub struct ClientConfig {
    pub name: String,
    pub password: Option<String>,
}

/// Drive one client connection to completion and return the terminal exit
/// reason. `server_in`/`server_out` are the two halves of the TCP stream;
/// `user_in`/`user_out` are standard input/output (or stand-ins for tests).
pub async fn run<SR, SW, UR, UW>(
    server_in: SR,
    server_out: SW,
    user_in: UR,
    user_out: UW,
    config: ClientConfig,
) -> ExitReason
where
    SR: AsyncBufReadExt + Unpin + Send + 'static,
    SW: AsyncWriteExt + Unpin + Send + 'static,
    UR: AsyncBufReadExt + Unpin + Send + 'static,
    UW: AsyncWriteExt + Unpin + Send + 'static,
{
    let shared = Arc::new(Shared {
        authenticated: Notify::new(),
        exit: ExitSlot::default(),
    });
    let (tx, rx) = mpsc::channel::<String>(256);

    let writer = tokio::spawn(writer_task(server_out, rx));
    let inbound = tokio::spawn(inbound_task(
        server_in,
        user_out,
        tx.clone(),
        shared.clone(),
        config,
    ));
    let outbound = tokio::spawn(outbound_task(user_in, tx, shared.clone()));

    let _ = inbound.await;
    let _ = outbound.await;
    drop(shared.clone());
    let _ = writer.await;

    shared.exit.get().unwrap_or(ExitReason::Normal)
}

async fn writer_task<SW>(mut server_out: SW, mut rx: mpsc::Receiver<String>)
where
    SW: AsyncWriteExt + Unpin,
{
    while let Some(line) = rx.recv().await {
        if codec::write_line(&mut server_out, &line).await.is_err() {
            break;
        }
    }
}

async fn inbound_task<SR, UW>(
    mut server_in: SR,
    mut user_out: UW,
    tx: mpsc::Sender<String>,
    shared: Arc<Shared>,
    config: ClientConfig,
) where
    SR: AsyncBufReadExt + Unpin,
    UW: AsyncWriteExt + Unpin,
{
    if !authenticate(&mut server_in, &tx, &config, &shared).await {
        return;
    }
    if !negotiate_name(&mut server_in, &tx, &config.name, &shared).await {
        return;
    }

    loop {
        let (line, eof) = match codec::read_line(&mut server_in).await {
            Ok(v) => v,
            Err(_) => {
                shared.exit.record(ExitReason::Comms);
                return;
            }
        };
        if eof {
            shared.exit.record(ExitReason::Comms);
            return;
        }
        let Some(cmd) = ClientCommand::parse(&line) else {
            continue;
        };
        match cmd {
            ClientCommand::Msg(name, payload) => {
                let rendered = match payload {
                    Some(m) => format!("{name}: {m}\n"),
                    None => format!("{name}:\n"),
                };
                let _ = user_out.write_all(rendered.as_bytes()).await;
                let _ = user_out.flush().await;
            }
            ClientCommand::Enter(name) => {
                let rendered = format!("({name} has entered the chat)\n");
                let _ = user_out.write_all(rendered.as_bytes()).await;
                let _ = user_out.flush().await;
            }
            ClientCommand::Leave(name) => {
                let rendered = format!("({name} has left the chat)\n");
                let _ = user_out.write_all(rendered.as_bytes()).await;
                let _ = user_out.flush().await;
            }
            ClientCommand::List(names) => {
                let rendered = format!("(current chatters: {names})\n");
                let _ = user_out.write_all(rendered.as_bytes()).await;
                let _ = user_out.flush().await;
            }
            ClientCommand::Kick => {
                shared.exit.record(ExitReason::Kicked);
                return;
            }
            ClientCommand::Who
            | ClientCommand::NameTaken
            | ClientCommand::Auth
            | ClientCommand::Ok => {
                // Ignored once auth/naming are behind us.
            }
        }
    }
}

/// Returns `true` on success (caller should proceed to name negotiation).
async fn authenticate<SR>(
    server_in: &mut SR,
    tx: &mpsc::Sender<String>,
    config: &ClientConfig,
    shared: &Shared,
) -> bool
where
    SR: AsyncBufReadExt + Unpin,
{
    loop {
        let (line, eof) = match codec::read_line(server_in).await {
            Ok(v) => v,
            Err(_) => {
                shared.exit.record(ExitReason::Comms);
                return false;
            }
        };
        if eof {
            shared.exit.record(ExitReason::Comms);
            return false;
        }
        match ClientCommand::parse(&line) {
            Some(ClientCommand::Auth) => break,
            _ => continue,
        }
    }

    let password = config.password.clone().unwrap_or_default();
    if tx
        .send(ServerCommand::Auth(password).serialize())
        .await
        .is_err()
    {
        shared.exit.record(ExitReason::Comms);
        return false;
    }

    let (line, eof) = match codec::read_line(server_in).await {
        Ok(v) => v,
        Err(_) => {
            shared.exit.record(ExitReason::Comms);
            return false;
        }
    };
    if eof {
        shared.exit.record(ExitReason::Comms);
        return false;
    }
    if ClientCommand::parse(&line) == Some(ClientCommand::Ok) {
        true
    } else {
        shared.exit.record(ExitReason::FailedAuth);
        false
    }
}

/// Returns `true` on success (caller should proceed to SERVING).
async fn negotiate_name<SR>(
    server_in: &mut SR,
    tx: &mpsc::Sender<String>,
    base_name: &str,
    shared: &Shared,
) -> bool
where
    SR: AsyncBufReadExt + Unpin,
{
    let mut suffix: i64 = -1;
    loop {
        let (line, eof) = match codec::read_line(server_in).await {
            Ok(v) => v,
            Err(_) => {
                shared.exit.record(ExitReason::Comms);
                return false;
            }
        };
        if eof {
            shared.exit.record(ExitReason::Comms);
            return false;
        }
        match ClientCommand::parse(&line) {
            Some(ClientCommand::Who) => {
                let candidate = if suffix < 0 {
                    base_name.to_string()
                } else {
                    format!("{base_name}{suffix}")
                };
                if tx
                    .send(ServerCommand::Name(candidate).serialize())
                    .await
                    .is_err()
                {
                    shared.exit.record(ExitReason::Comms);
                    return false;
                }

                let (reply, eof) = match codec::read_line(server_in).await {
                    Ok(v) => v,
                    Err(_) => {
                        shared.exit.record(ExitReason::Comms);
                        return false;
                    }
                };
                if eof {
                    shared.exit.record(ExitReason::Comms);
                    return false;
                }
                match ClientCommand::parse(&reply) {
                    Some(ClientCommand::Ok) => {
                        shared.authenticated.notify_waiters();
                        return true;
                    }
                    Some(ClientCommand::NameTaken) => {
                        suffix += 1;
                    }
                    _ => {}
                }
            }
            _ => continue,
        }
    }
}

const STDIN_EOF_DELAY: Duration = Duration::from_millis(50);

async fn outbound_task<UR>(mut user_in: UR, tx: mpsc::Sender<String>, shared: Arc<Shared>)
where
    UR: AsyncBufReadExt + Unpin,
{
    shared.authenticated.notified().await;

    loop {
        let (line, eof) = match codec::read_line(&mut user_in).await {
            Ok(v) => v,
            Err(_) => break,
        };
        if eof {
            tokio::time::sleep(STDIN_EOF_DELAY).await;
            shared.exit.record(ExitReason::Normal);
            break;
        }

        let is_leave = line == "*LEAVE:";
        let wire = if let Some(rest) = line.strip_prefix('*') {
            rest.to_string()
        } else {
            ServerCommand::Say(Some(printable(&line))).serialize()
        };
        if tx.send(wire).await.is_err() {
            break;
        }
        if is_leave {
            shared.exit.record(ExitReason::Normal);
            break;
        }
    }
}
