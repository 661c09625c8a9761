//! One server-side connection's state machine: `AUTH_WAIT → NAME_WAIT →
//! SERVING → CLOSED` (§4.C). Mirrors the dispatcher shape of a connection
//! handler owning a socket split into a buffered reader and a dedicated
//! writer task, generalized from a single IRC command table down to this
//! protocol's six server-bound tags.

use std::io::Write as _;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWriteExt, BufReader, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use chat_sdk::codec;
use chat_sdk::protocol::{ClientCommand, ServerCommand};
use chat_sdk::sanitize::printable;

use crate::roster::{PeerHandle, Roster};

const SERVING_TICK: Duration = Duration::from_millis(100);

pub async fn handle_connection(stream: TcpStream, roster: Arc<Roster>) {
    let peer_addr = stream.peer_addr().ok();
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);
    let (tx, rx) = mpsc::channel::<String>(256);
    let writer = tokio::spawn(writer_task(write_half, rx));

    tracing::debug!(?peer_addr, "accepted connection");

    if authenticate(&mut reader, &tx, &roster).await {
        if let Some(peer) = negotiate_name(&mut reader, &tx, &roster).await {
            tracing::info!(name = %peer.name, "peer joined");
            serve(&mut reader, &roster, &peer).await;
            close(&roster, &peer);
            tracing::info!(name = %peer.name, "peer left");
        }
    }

    drop(tx);
    let _ = writer.await;
}

async fn send(tx: &mpsc::Sender<String>, line: String) -> bool {
    tx.send(line).await.is_ok()
}

async fn writer_task(mut write_half: WriteHalf<TcpStream>, mut rx: mpsc::Receiver<String>) {
    while let Some(line) = rx.recv().await {
        if codec::write_line(&mut write_half, &line).await.is_err() {
            break;
        }
    }
    let _ = write_half.shutdown().await;
}

fn stdout_line(line: &str) {
    let mut out = std::io::stdout().lock();
    let _ = writeln!(out, "{line}");
    let _ = out.flush();
}

/// `true` means proceed to name negotiation; `false` means the connection
/// is already closed.
async fn authenticate<R>(reader: &mut BufReader<R>, tx: &mpsc::Sender<String>, roster: &Roster) -> bool
where
    R: AsyncRead + Unpin,
{
    if !roster.requires_auth() {
        return true;
    }

    if !send(tx, ClientCommand::Auth.serialize()).await {
        return false;
    }

    let (line, eof) = match codec::read_line(reader).await {
        Ok(v) => v,
        Err(_) => return false,
    };
    if eof {
        return false;
    }

    match ServerCommand::parse(&line) {
        Some(ServerCommand::Auth(password)) if roster.check_password(&password) => {
            roster.counters.auth.fetch_add(1, Ordering::Relaxed);
            send(tx, ClientCommand::Ok.serialize()).await
        }
        _ => false,
    }
}

/// Returns the newly-registered peer handle on success, or `None` if the
/// connection closed (or was rejected) before naming completed.
async fn negotiate_name<R>(
    reader: &mut BufReader<R>,
    tx: &mpsc::Sender<String>,
    roster: &Arc<Roster>,
) -> Option<Arc<PeerHandle>>
where
    R: AsyncRead + Unpin,
{
    loop {
        if !send(tx, ClientCommand::Who.serialize()).await {
            return None;
        }

        let (line, eof) = match codec::read_line(reader).await {
            Ok(v) => v,
            Err(_) => return None,
        };
        if eof {
            return None;
        }

        let Some(ServerCommand::Name(name)) = ServerCommand::parse(&line) else {
            // Any command other than NAME: here closes the peer without
            // joining the roster (§4.C) — not a "drop and continue".
            return None;
        };

        // Rejected attempts (empty or colliding) still count (§9).
        roster.counters.name.fetch_add(1, Ordering::Relaxed);

        if name.is_empty() {
            if !send(tx, ClientCommand::NameTaken.serialize()).await {
                return None;
            }
            continue;
        }

        let peer = Arc::new(PeerHandle::new(name.clone(), tx.clone()));
        if !roster.try_add(peer.clone()) {
            if !send(tx, ClientCommand::NameTaken.serialize()).await {
                return None;
            }
            continue;
        }

        if !send(tx, ClientCommand::Ok.serialize()).await {
            roster.remove(&name);
            return None;
        }

        let printable_name = printable(&name);
        roster.broadcast(&ClientCommand::Enter(printable_name.clone()).serialize());
        stdout_line(&format!("({printable_name} has entered the chat)"));

        return Some(peer);
    }
}

async fn serve<R>(reader: &mut BufReader<R>, roster: &Arc<Roster>, peer: &Arc<PeerHandle>)
where
    R: AsyncRead + Unpin,
{
    loop {
        tokio::time::sleep(SERVING_TICK).await;

        let (line, eof) = match codec::read_line(reader).await {
            Ok(v) => v,
            Err(_) => return,
        };
        if eof {
            return;
        }

        let Some(cmd) = ServerCommand::parse(&line) else {
            continue;
        };

        match cmd {
            ServerCommand::Say(payload) => {
                peer.counters.say.fetch_add(1, Ordering::Relaxed);
                roster.counters.say.fetch_add(1, Ordering::Relaxed);

                let name = printable(&peer.name);
                let payload = payload.as_deref().map(printable);
                roster.broadcast(&ClientCommand::Msg(name.clone(), payload.clone()).serialize());
                match payload {
                    Some(m) => stdout_line(&format!("{name}: {m}")),
                    None => stdout_line(&format!("{name}:")),
                }
            }
            ServerCommand::Kick(target) => {
                peer.counters.kick.fetch_add(1, Ordering::Relaxed);
                roster.counters.kick.fetch_add(1, Ordering::Relaxed);

                if let Some(victim) = roster.find_by_name(&target) {
                    victim.send(ClientCommand::Kick.serialize());
                }
            }
            ServerCommand::List => {
                peer.counters.list.fetch_add(1, Ordering::Relaxed);
                roster.counters.list.fetch_add(1, Ordering::Relaxed);

                let names: Vec<String> = roster.names().iter().map(|n| printable(n)).collect();
                let joined = names.join(",");
                roster.broadcast(&ClientCommand::List(joined.clone()).serialize());
                stdout_line(&format!("(current chatters: {joined})"));
            }
            ServerCommand::Leave => {
                roster.counters.leave.fetch_add(1, Ordering::Relaxed);
                return;
            }
            ServerCommand::Auth(_) | ServerCommand::Name(_) => {
                // Only meaningful before SERVING; a line with this tag here
                // is syntactically valid but semantically inert.
            }
        }
    }
}

/// CLOSED: broadcast LEAVE exactly once and drop the peer from the roster,
/// whether the disconnect was voluntary, EOF-driven, or kick-follow-up
/// (§4.C's exception note — a kicked peer's subsequent close is treated
/// exactly like any other departure).
fn close(roster: &Roster, peer: &Arc<PeerHandle>) {
    peer.deactivate();
    let name = printable(&peer.name);
    roster.broadcast(&ClientCommand::Leave(name.clone()).serialize());
    stdout_line(&format!("({name} has left the chat)"));
    roster.remove(&peer.name);
}
