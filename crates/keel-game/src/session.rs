// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Session driver: the tick loop around the rollback controller plus the
//! transport boundary.
//!
//! The session owns the world, the scheduler, and the rollback controller.
//! Network messages come in through [`Session::handle_message`]; local
//! frames go out through [`Session::advance`]. The authority (lexicographic
//! minimum connected client id) broadcasts a snapshot every
//! `snapshot_interval` frames, and any peer snapshot or sync hash arriving
//! for the exact current frame is compared against the local state hash to
//! surface drift.

use std::collections::{BTreeMap, BTreeSet};

use bytes::Bytes;
use thiserror::Error;

use keel_core::interner::{Namespace, Sym};
use keel_core::rollback::{
    RollbackConfig, RollbackController, RollbackError, ServerTickOutcome,
};
use keel_core::scheduler::Scheduler;
use keel_core::snapshot::SnapshotError;
use keel_core::store::StoreError;
use keel_core::{StepError, World};
use keel_proto::{ClientHashRegistry, Message, SendSnapshotMessage, TickInput, Value};

use crate::authority::elect_authority;

/// Transport collaborator boundary. The kernel performs no network I/O; a
/// session hands outgoing messages to this trait and is fed incoming ones.
pub trait Transport {
    /// Queues a message for delivery.
    fn send(&mut self, message: &Message);
}

/// Session construction parameters.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Room identifier (assigned by the relay).
    pub room_id: String,
    /// This peer's client id.
    pub local_client: String,
    /// Authority snapshot broadcast period in frames.
    pub snapshot_interval: u32,
    /// Rollback bounds.
    pub rollback: RollbackConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            room_id: String::new(),
            local_client: String::new(),
            snapshot_interval: 100,
            rollback: RollbackConfig::default(),
        }
    }
}

/// Errors from driving a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Rollback machinery failed.
    #[error(transparent)]
    Rollback(#[from] RollbackError),
    /// A snapshot payload failed to restore.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    /// A tick failed.
    #[error(transparent)]
    Step(#[from] StepError),
    /// A store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A drift observation: a peer's hash disagreed with ours at the same frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriftReport {
    /// Frame both hashes were computed at.
    pub frame: u32,
    /// Our hash.
    pub local: String,
    /// The peer's hash.
    pub remote: String,
}

/// A running game session.
pub struct Session<T: Transport> {
    world: World,
    scheduler: Scheduler,
    rollback: RollbackController,
    transport: T,
    room_id: String,
    local_client: String,
    local_sym: Sym,
    local_hash: u32,
    clients: BTreeSet<String>,
    hashes: ClientHashRegistry,
    snapshot_interval: u32,
    input_seq: u32,
    last_drift: Option<DriftReport>,
    mispredictions: u64,
}

impl<T: Transport> Session<T> {
    /// Creates a session over an already configured world and scheduler.
    pub fn new(config: SessionConfig, mut world: World, scheduler: Scheduler, transport: T) -> Self {
        let local_sym = world
            .store
            .interner_mut()
            .intern(Namespace::Client, &config.local_client);
        let mut hashes = ClientHashRegistry::new();
        let local_hash = hashes.insert(&config.local_client);
        let mut clients = BTreeSet::new();
        clients.insert(config.local_client.clone());
        Self {
            world,
            scheduler,
            rollback: RollbackController::new(&config.rollback),
            transport,
            room_id: config.room_id,
            local_client: config.local_client,
            local_sym,
            local_hash,
            clients,
            hashes,
            snapshot_interval: config.snapshot_interval.max(1),
            input_seq: 0,
            last_drift: None,
            mispredictions: 0,
        }
    }

    /// The simulated world.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world access (spawning, scripted setup).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The room this session belongs to.
    #[must_use]
    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// This peer's interned client id.
    #[must_use]
    pub fn local_sym(&self) -> Sym {
        self.local_sym
    }

    /// Currently connected client ids.
    #[must_use]
    pub fn clients(&self) -> &BTreeSet<String> {
        &self.clients
    }

    /// Whether this peer currently holds authority.
    #[must_use]
    pub fn is_authority(&self) -> bool {
        elect_authority(self.clients.iter().map(String::as_str))
            == Some(self.local_client.as_str())
    }

    /// Count of mispredictions observed so far.
    #[must_use]
    pub fn mispredictions(&self) -> u64 {
        self.mispredictions
    }

    /// The most recent drift observation, if any.
    #[must_use]
    pub fn last_drift(&self) -> Option<&DriftReport> {
        self.last_drift.as_ref()
    }

    /// Advances one frame, optionally applying (and publishing) a local
    /// input.
    pub fn advance(&mut self, local_input: Option<Value>) -> Result<(), SessionError> {
        if let Some(value) = local_input {
            let data = value.to_bytes();
            let frame = self.world.frame();
            self.rollback
                .set_local_input(&mut self.world, self.local_sym, data.clone());
            self.input_seq = self.input_seq.wrapping_add(1);
            self.transport.send(&Message::BinaryInput {
                frame,
                input: TickInput {
                    client_hash: self.local_hash,
                    seq: self.input_seq,
                    data,
                },
            });
            #[cfg(feature = "debug_network")]
            tracing::debug!(frame, seq = self.input_seq, "published local input");
        }

        self.rollback.advance(&mut self.world, &mut self.scheduler)?;

        if self.is_authority() && self.world.frame() % self.snapshot_interval == 0 {
            self.broadcast_snapshot();
        }
        Ok(())
    }

    /// Processes an incoming session message.
    pub fn handle_message(&mut self, message: Message) -> Result<(), SessionError> {
        match message {
            Message::Tick(tick) => {
                let mut inputs: BTreeMap<Sym, Bytes> = BTreeMap::new();
                let mut max_seq = self.world.confirmed_seq();
                for input in &tick.inputs {
                    let Some(client) = self.hashes.resolve(input.client_hash) else {
                        tracing::warn!(hash = input.client_hash, "tick input from unknown client");
                        continue;
                    };
                    let sym = self
                        .world
                        .store
                        .interner_mut()
                        .intern(Namespace::Client, client);
                    inputs.insert(sym, input.data.clone());
                    max_seq = max_seq.max(input.seq);
                }
                let outcome = self.rollback.on_server_tick(
                    &mut self.world,
                    &mut self.scheduler,
                    tick.frame,
                    &inputs,
                )?;
                self.world.mark_confirmed(max_seq);
                if let ServerTickOutcome::Mispredicted { predicted, actual } = outcome {
                    self.mispredictions += 1;
                    #[cfg(feature = "debug_rollback")]
                    tracing::debug!(
                        frame = tick.frame,
                        %predicted,
                        %actual,
                        "misprediction, resimulated"
                    );
                    #[cfg(not(feature = "debug_rollback"))]
                    let _ = (predicted, actual);
                }
                if let (Some(frame), Some(hash)) = (tick.snapshot_frame, tick.snapshot_hash) {
                    self.check_drift(frame, &hash);
                }
            }
            Message::InitialState(state) => {
                self.world.restore(&state.snapshot)?;
                self.room_id = state.room_id;
                // The restore overwrote the interner; the local client id must
                // be re-interned before any further input routing.
                self.local_sym = self
                    .world
                    .store
                    .interner_mut()
                    .intern(Namespace::Client, &self.local_client);
                let resolved: Vec<(u32, BTreeMap<Sym, Bytes>, bool)> = state
                    .history
                    .iter()
                    .map(|frame| {
                        let mut inputs = BTreeMap::new();
                        for (hash, data) in &frame.inputs {
                            if let Some(client) = self.hashes.resolve(*hash) {
                                let sym = self
                                    .world
                                    .store
                                    .interner_mut()
                                    .intern(Namespace::Client, client);
                                inputs.insert(sym, data.clone());
                            }
                        }
                        (frame.frame, inputs, frame.confirmed)
                    })
                    .collect();
                self.rollback.history_mut().load(resolved);
                #[cfg(feature = "debug_network")]
                tracing::debug!(frame = self.world.frame(), "joined from initial state");
            }
            Message::ClientListUpdate { clients } => {
                self.clients = clients.iter().cloned().collect();
                self.clients.insert(self.local_client.clone());
                for client in &clients {
                    self.hashes.insert(client);
                }
            }
            Message::RoomJoined { room_id, client_id } => {
                self.room_id = room_id;
                self.hashes.insert(&client_id);
                self.clients.insert(client_id);
            }
            Message::RoomCreated { room_id } => {
                self.room_id = room_id;
            }
            Message::RoomLeft { client_id } => {
                self.clients.remove(&client_id);
            }
            Message::SyncHash { frame, hash } => {
                self.check_drift(frame, &hash);
            }
            Message::SendSnapshot(send) => {
                self.check_drift(send.frame, &send.hash);
            }
            Message::SnapshotUpdate { .. } | Message::BinarySnapshot { .. } => {
                // Unsolicited full snapshots are ignored here; late joiners
                // arrive via InitialState, and drift detection rides on the
                // hash-bearing messages.
            }
            Message::BinaryInput { .. } => {
                // Client → server traffic; a peer session has nothing to do.
            }
            Message::Error { code, message } => {
                tracing::warn!(code, %message, "server error");
            }
        }
        Ok(())
    }

    fn check_drift(&mut self, frame: u32, remote: &str) {
        if frame != self.world.frame() {
            return;
        }
        let local = self.world.state_hash().to_hex();
        if local != remote {
            tracing::warn!(frame, %local, remote, "state hash drift");
            self.last_drift = Some(DriftReport {
                frame,
                local,
                remote: remote.to_owned(),
            });
        }
    }

    fn broadcast_snapshot(&mut self) {
        let snapshot = self.world.snapshot();
        let hash = self.world.state_hash().to_hex();
        self.input_seq = self.input_seq.wrapping_add(1);
        self.transport.send(&Message::SendSnapshot(SendSnapshotMessage {
            seq: self.input_seq,
            frame: self.world.frame(),
            hash,
            data: snapshot,
        }));
        #[cfg(feature = "debug_network")]
        tracing::debug!(frame = self.world.frame(), "broadcast snapshot");
    }

    /// Registers a known peer (id → hash table and roster).
    pub fn add_client(&mut self, client_id: &str) {
        self.hashes.insert(client_id);
        self.clients.insert(client_id.to_owned());
    }

    /// The FNV-1a hash this session publishes inputs under.
    #[must_use]
    pub fn local_client_hash(&self) -> u32 {
        self.local_hash
    }
}

impl<T: Transport> core::fmt::Debug for Session<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Session")
            .field("room_id", &self.room_id)
            .field("local_client", &self.local_client)
            .field("frame", &self.world.frame())
            .field("clients", &self.clients)
            .finish()
    }
}
