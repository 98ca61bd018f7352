//! Concurrent registry of inbound bridges.
//!
//! Both indices live behind one lock, so no caller ever sees a bridge in one
//! index but not the other. Creation is serialized per transaction URL by a
//! creation gate: the enlistment round-trip runs with the gate held but
//! without the index lock, so traffic for other transactions is never stuck
//! behind a slow coordinator. Each creation runs on a spawned task that owns
//! its gate hold, so dropping the calling future never strands a branch.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::error::{BridgeError, Result};
use crate::identity::ParticipantIdentity;

use super::{BridgeFactory, InboundBridge};

/// Per-transaction creation gate.
type CreationGate = Arc<tokio::sync::Mutex<()>>;

/// One creation's claim on the gate for a transaction URL. The gate entry
/// goes away with the last claim.
struct GateHold<'a> {
    creating: &'a DashMap<String, CreationGate>,
    transaction_url: &'a str,
    gate: CreationGate,
}

impl<'a> GateHold<'a> {
    fn acquire(creating: &'a DashMap<String, CreationGate>, transaction_url: &'a str) -> Self {
        let gate = creating
            .entry(transaction_url.to_string())
            .or_default()
            .clone();
        Self {
            creating,
            transaction_url,
            gate,
        }
    }
}

impl Drop for GateHold<'_> {
    fn drop(&mut self) {
        // Only the map entry and this hold reference it: nobody is waiting.
        self.creating.remove_if(self.transaction_url, |_, gate| {
            Arc::ptr_eq(gate, &self.gate) && Arc::strong_count(gate) == 2
        });
    }
}

#[derive(Debug, Default)]
struct Indices {
    /// Transaction URL → bridge.
    by_transaction: HashMap<String, InboundBridge>,
    /// Participant id → transaction URL.
    by_participant: HashMap<String, String>,
}

/// Outcome of an insert attempt against the indices.
#[derive(Debug)]
enum Registration {
    Inserted,
    AlreadyRegistered,
    TransactionTaken(InboundBridge),
    ParticipantTaken,
}

impl Indices {
    fn register(&mut self, bridge: &InboundBridge) -> Registration {
        if let Some(existing) = self.by_transaction.get(bridge.transaction_url()) {
            if existing == bridge {
                return Registration::AlreadyRegistered;
            }
            return Registration::TransactionTaken(existing.clone());
        }

        if self.by_participant.contains_key(bridge.participant_id()) {
            return Registration::ParticipantTaken;
        }

        self.by_transaction
            .insert(bridge.transaction_url().to_string(), bridge.clone());
        self.by_participant.insert(
            bridge.participant_id().to_string(),
            bridge.transaction_url().to_string(),
        );
        Registration::Inserted
    }

    fn unregister(&mut self, transaction_url: &str) -> Option<InboundBridge> {
        let bridge = self.by_transaction.remove(transaction_url)?;
        self.by_participant.remove(bridge.participant_id());
        Some(bridge)
    }
}

fn require<'a>(value: &'a str, what: &'static str) -> Result<&'a str> {
    if value.trim().is_empty() {
        return Err(BridgeError::IdentifierRequired(what));
    }
    Ok(value)
}

/// Process-wide registry mapping REST-AT transactions to inbound bridges.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct BridgeRegistry {
    indices: Arc<RwLock<Indices>>,
    creating: Arc<DashMap<String, CreationGate>>,
    factory: Arc<BridgeFactory>,
}

impl BridgeRegistry {
    pub fn new(factory: BridgeFactory) -> Self {
        Self {
            indices: Arc::new(RwLock::new(Indices::default())),
            creating: Arc::new(DashMap::new()),
            factory: Arc::new(factory),
        }
    }

    pub fn factory(&self) -> &BridgeFactory {
        &self.factory
    }

    // ── Registration ─────────────────────────────────────────────────────────

    /// Register `bridge` under its transaction URL and participant id.
    ///
    /// Returns `true` if the bridge was inserted or an identical bridge is
    /// already registered. Returns `false`, leaving state untouched, if the
    /// transaction already has a different bridge or the participant id is
    /// bound to another transaction.
    pub fn try_register(&self, bridge: InboundBridge) -> bool {
        let outcome = self.indices.write().register(&bridge);
        match outcome {
            Registration::Inserted => {
                tracing::debug!(
                    transaction_url = bridge.transaction_url(),
                    participant_id = bridge.participant_id(),
                    "[Bridge] Registered bridge"
                );
                true
            }
            Registration::AlreadyRegistered => true,
            Registration::TransactionTaken(_) => {
                tracing::debug!(
                    transaction_url = bridge.transaction_url(),
                    "[Bridge] Transaction already bridged by another participant"
                );
                false
            }
            Registration::ParticipantTaken => {
                tracing::warn!(
                    participant_id = bridge.participant_id(),
                    "[Bridge] Participant id already bound to another transaction"
                );
                false
            }
        }
    }

    /// Return the bridge for `transaction_url`, creating and enlisting one on
    /// first access.
    ///
    /// Concurrent callers for the same transaction share a single creation:
    /// exactly one enlistment is issued and every caller gets the same
    /// bridge. A failed creation registers nothing, so the call can simply be
    /// retried.
    pub async fn get_or_create(
        &self,
        transaction_url: &str,
        base_url: &str,
    ) -> Result<InboundBridge> {
        self.ensure(transaction_url, base_url)
            .await
            .map(|(bridge, _)| bridge)
    }

    /// Like [`get_or_create`](Self::get_or_create), also reporting whether
    /// this call created the bridge.
    ///
    /// Creation runs on its own task. A caller dropped mid-enlistment does
    /// not cancel it: the bridge is still registered (or its branch released
    /// on failure), and a retry waits for that creation instead of enlisting
    /// a second participant.
    pub async fn ensure(
        &self,
        transaction_url: &str,
        base_url: &str,
    ) -> Result<(InboundBridge, bool)> {
        require(transaction_url, "Transaction URL")?;
        require(base_url, "Base URL")?;

        if let Some(bridge) = self.lookup(transaction_url) {
            return Ok((bridge, false));
        }

        let registry = self.clone();
        let (tx_url, base) = (transaction_url.to_string(), base_url.to_string());
        let creation = tokio::spawn(async move { registry.create_gated(&tx_url, &base).await });

        match creation.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(BridgeError::CreationInterrupted(
                transaction_url.to_string(),
            )),
        }
    }

    async fn create_gated(
        &self,
        transaction_url: &str,
        base_url: &str,
    ) -> Result<(InboundBridge, bool)> {
        let hold = GateHold::acquire(&self.creating, transaction_url);
        let _creating = hold.gate.lock().await;

        match self.lookup(transaction_url) {
            Some(bridge) => Ok((bridge, false)),
            None => {
                let bridge = self.factory.create(transaction_url, base_url).await?;
                self.register_created(bridge)
            }
        }
    }

    /// Register a bridge this registry just created and enlisted.
    ///
    /// If it lost to a direct registration its branch is released; a release
    /// failure is logged, the registration outcome is what gets returned.
    fn register_created(&self, bridge: InboundBridge) -> Result<(InboundBridge, bool)> {
        let outcome = self.indices.write().register(&bridge);
        match outcome {
            Registration::Inserted | Registration::AlreadyRegistered => Ok((bridge, true)),
            Registration::TransactionTaken(winner) => {
                // Registered directly while we were enlisting; first writer wins.
                self.discard(&bridge);
                Ok((winner, false))
            }
            Registration::ParticipantTaken => {
                self.discard(&bridge);
                Err(BridgeError::Conflict {
                    transaction_url: bridge.transaction_url().to_string(),
                })
            }
        }
    }

    fn discard(&self, bridge: &InboundBridge) {
        if let Err(e) = bridge.stop(self.factory.branches()) {
            tracing::warn!(
                error = %e,
                transaction_url = bridge.transaction_url(),
                participant_id = bridge.participant_id(),
                "[Bridge] Failed to release branch of unregistered bridge"
            );
        }
    }

    // ── Lookups ──────────────────────────────────────────────────────────────

    fn lookup(&self, transaction_url: &str) -> Option<InboundBridge> {
        self.indices
            .read()
            .by_transaction
            .get(transaction_url)
            .cloned()
    }

    /// Existing bridge for `transaction_url`, without creating one.
    pub fn get(&self, transaction_url: &str) -> Result<Option<InboundBridge>> {
        require(transaction_url, "Transaction URL")?;
        Ok(self.lookup(transaction_url))
    }

    /// Transaction URL owning `participant_id`, if any.
    pub fn lookup_transaction_for_participant(
        &self,
        participant_id: &str,
    ) -> Result<Option<String>> {
        require(participant_id, "Participant ID")?;
        Ok(self
            .indices
            .read()
            .by_participant
            .get(participant_id)
            .cloned())
    }

    /// Number of registered bridges.
    pub fn bridge_count(&self) -> usize {
        self.indices.read().by_transaction.len()
    }

    /// Registered participant ids carrying the bridge type marker.
    pub fn recoverable_participants(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .indices
            .read()
            .by_participant
            .keys()
            .filter(|id| ParticipantIdentity::is_bridge_participant(id))
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    // ── Removal ──────────────────────────────────────────────────────────────

    /// Stop the bridge for `transaction_url` and drop it from both indices.
    ///
    /// The bridge is unregistered even if stopping it fails; the stop failure
    /// is still returned.
    pub fn remove_by_transaction(&self, transaction_url: &str) -> Result<()> {
        require(transaction_url, "Transaction URL")?;
        let mut indices = self.indices.write();
        self.remove_locked(&mut indices, transaction_url)
    }

    /// Resolve the transaction owning `participant_id`, then remove it as
    /// [`remove_by_transaction`](Self::remove_by_transaction) does.
    pub fn remove_by_participant(&self, participant_id: &str) -> Result<()> {
        require(participant_id, "Participant ID")?;
        let mut indices = self.indices.write();
        let transaction_url = indices
            .by_participant
            .get(participant_id)
            .cloned()
            .ok_or(BridgeError::IdentifierRequired("Transaction URL"))?;
        let result = self.remove_locked(&mut indices, &transaction_url);
        indices.by_participant.remove(participant_id);
        result
    }

    fn remove_locked(&self, indices: &mut Indices, transaction_url: &str) -> Result<()> {
        let bridge = indices
            .unregister(transaction_url)
            .ok_or_else(|| BridgeError::BridgeNotFound(transaction_url.to_string()))?;

        tracing::info!(
            transaction_url = transaction_url,
            participant_id = bridge.participant_id(),
            "[Bridge] Removing bridge"
        );
        bridge.stop(self.factory.branches())
    }

    /// Stop and remove every bridge. Used at shutdown.
    ///
    /// All bridges are attempted; the first stop failure is returned.
    pub fn stop_all(&self) -> Result<()> {
        let drained: Vec<InboundBridge> = {
            let mut indices = self.indices.write();
            indices.by_participant.clear();
            indices.by_transaction.drain().map(|(_, b)| b).collect()
        };

        let count = drained.len();
        let mut first_err = None;
        for bridge in drained {
            if let Err(e) = bridge.stop(self.factory.branches()) {
                tracing::warn!(error = %e, "[Bridge] Failed to stop bridge at shutdown");
                first_err.get_or_insert(e);
            }
        }

        tracing::info!(count = count, "[Bridge] All bridges stopped");
        first_err.map_or(Ok(()), Err)
    }
}
