//! The roster: the single piece of cross-task shared mutable state (§4.D,
//! §5). Everything else — each peer's `active` flag and per-peer counters —
//! lives behind plain atomics rather than its own lock, since those are
//! only ever written by the owning connection task and read elsewhere; the
//! roster's `parking_lot::Mutex` is the only thing that ever needs to be
//! held across more than a single field access, and no critical section
//! here ever awaits, which is why `parking_lot` rather than `tokio::sync`
//! guards it.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

#[derive(Default)]
pub struct PeerCounters {
    pub say: AtomicU64,
    pub kick: AtomicU64,
    pub list: AtomicU64,
}

impl PeerCounters {
    fn snapshot(&self) -> (u64, u64, u64) {
        (
            self.say.load(Ordering::Relaxed),
            self.kick.load(Ordering::Relaxed),
            self.list.load(Ordering::Relaxed),
        )
    }
}

/// A non-owning handle to one server-side connection. The roster owns the
/// peer; session tasks hold clones of this handle and must tolerate
/// observing `active` flip to `false` out from under them (e.g. on kick).
pub struct PeerHandle {
    pub name: String,
    active: AtomicBool,
    pub counters: PeerCounters,
    tx: mpsc::Sender<String>,
}

impl PeerHandle {
    pub fn new(name: String, tx: mpsc::Sender<String>) -> Self {
        Self {
            name,
            active: AtomicBool::new(true),
            counters: PeerCounters::default(),
            tx,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Relaxed);
    }

    /// Queue a line for this peer's writer task. A full or closed channel
    /// is swallowed (§4.D) — the peer's own reader will notice the
    /// disconnect and the roster will remove it.
    pub fn send(&self, line: String) {
        let _ = self.tx.try_send(line);
    }
}

#[derive(Default)]
pub struct GlobalCounters {
    pub auth: AtomicU64,
    pub name: AtomicU64,
    pub say: AtomicU64,
    pub kick: AtomicU64,
    pub list: AtomicU64,
    pub leave: AtomicU64,
}

struct RosterState {
    peers: BTreeMap<String, Arc<PeerHandle>>,
    password: Option<String>,
}

pub struct Roster {
    state: Mutex<RosterState>,
    pub counters: GlobalCounters,
}

impl Roster {
    pub fn new(password: Option<String>) -> Self {
        Self {
            state: Mutex::new(RosterState {
                peers: BTreeMap::new(),
                password,
            }),
            counters: GlobalCounters::default(),
        }
    }

    pub fn requires_auth(&self) -> bool {
        self.state.lock().password.is_some()
    }

    pub fn check_password(&self, candidate: &str) -> bool {
        match &self.state.lock().password {
            Some(p) => p == candidate,
            None => true,
        }
    }

    /// Atomically checks for a name collision and inserts if there is none.
    /// Returns `false` (no insertion) if the name was already taken.
    pub fn try_add(&self, peer: Arc<PeerHandle>) -> bool {
        let mut state = self.state.lock();
        if state.peers.contains_key(&peer.name) {
            return false;
        }
        state.peers.insert(peer.name.clone(), peer);
        true
    }

    pub fn remove(&self, name: &str) {
        self.state.lock().peers.remove(name);
    }

    pub fn find_by_name(&self, name: &str) -> Option<Arc<PeerHandle>> {
        self.state.lock().peers.get(name).cloned()
    }

    /// Roster-order (name-sorted) snapshot of current member names.
    pub fn names(&self) -> Vec<String> {
        self.state.lock().peers.keys().cloned().collect()
    }

    /// Deliver `line` to every active, named peer present at the moment
    /// the roster lock is acquired (§4.E).
    pub fn broadcast(&self, line: &str) {
        let state = self.state.lock();
        for peer in state.peers.values() {
            if peer.is_active() {
                peer.send(line.to_string());
            }
        }
    }

    /// The full stats dump (§4.F), assembled as one owned string and
    /// never interpolated into a format template when it's later written.
    pub fn stats_report(&self) -> String {
        let state = self.state.lock();
        let mut out = String::from("@CLIENTS@\n");
        for (name, peer) in state.peers.iter() {
            let (say, kick, list) = peer.counters.snapshot();
            out.push_str(&format!("{name}:SAY:{say}:KICK:{kick}:LIST:{list}\n"));
        }
        out.push_str("@SERVER@\n");
        let c = &self.counters;
        out.push_str(&format!(
            "server:AUTH:{}:NAME:{}:SAY:{}:KICK:{}:LIST:{}:LEAVE:{}\n",
            c.auth.load(Ordering::Relaxed),
            c.name.load(Ordering::Relaxed),
            c.say.load(Ordering::Relaxed),
            c.kick.load(Ordering::Relaxed),
            c.list.load(Ordering::Relaxed),
            c.leave.load(Ordering::Relaxed),
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(name: &str) -> Arc<PeerHandle> {
        let (tx, _rx) = mpsc::channel(16);
        Arc::new(PeerHandle::new(name.to_string(), tx))
    }

    #[test]
    fn names_are_returned_in_sorted_order() {
        let roster = Roster::new(None);
        assert!(roster.try_add(handle("carol")));
        assert!(roster.try_add(handle("alice")));
        assert!(roster.try_add(handle("bob")));
        assert_eq!(roster.names(), vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let roster = Roster::new(None);
        assert!(roster.try_add(handle("alice")));
        assert!(!roster.try_add(handle("alice")));
        assert_eq!(roster.names(), vec!["alice"]);
    }

    #[test]
    fn remove_drops_membership() {
        let roster = Roster::new(None);
        roster.try_add(handle("alice"));
        roster.remove("alice");
        assert!(roster.names().is_empty());
        assert!(roster.find_by_name("alice").is_none());
    }

    #[test]
    fn password_check_matches_byte_for_byte() {
        let roster = Roster::new(Some("hunter2".to_string()));
        assert!(roster.requires_auth());
        assert!(roster.check_password("hunter2"));
        assert!(!roster.check_password("hunter3"));
    }

    #[test]
    fn no_password_means_auth_not_required() {
        let roster = Roster::new(None);
        assert!(!roster.requires_auth());
        assert!(roster.check_password("anything"));
    }

    #[test]
    fn stats_report_matches_literal_format() {
        let roster = Roster::new(None);
        let alice = handle("alice");
        alice.counters.say.store(1, Ordering::Relaxed);
        alice.counters.kick.store(1, Ordering::Relaxed);
        roster.try_add(alice);
        roster.counters.auth.store(2, Ordering::Relaxed);
        roster.counters.name.store(2, Ordering::Relaxed);
        roster.counters.say.store(1, Ordering::Relaxed);
        roster.counters.kick.store(1, Ordering::Relaxed);

        let report = roster.stats_report();
        assert_eq!(
            report,
            "@CLIENTS@\nalice:SAY:1:KICK:1:LIST:0\n@SERVER@\nserver:AUTH:2:NAME:2:SAY:1:KICK:1:LIST:0:LEAVE:0\n"
        );
    }
}
