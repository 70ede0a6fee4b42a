//! Unique identifier issuance.
//!
//! Identifiers are random 32-bit values that never repeat within an
//! allocator. Uniqueness is global, so issuance is serialized in one of two
//! ways:
//!
//! - [`IdentityService`] owns an allocator on a dedicated thread and hands
//!   identifiers to workers over a channel (game identifiers).
//! - [`IdentityTable`] guards an allocator and a name lookup behind one
//!   mutex (player identifiers, one per source and name).

use std::collections::{HashMap, HashSet};
use std::thread::{self, JoinHandle};

use async_channel::{Receiver, Sender};
use log::debug;
use parking_lot::Mutex;

use crate::constants::{ANONYMOUS_ID, IDENTITY_MAX_ATTEMPTS};
use crate::error::{IdentityExhausted, StageError};

/// Draws random identifiers, retrying on collision with any already issued.
#[derive(Debug)]
pub struct IdentityAllocator {
    rng: fastrand::Rng,
    issued: HashSet<u32>,
    max_attempts: usize,
}

impl Default for IdentityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityAllocator {
    /// Allocator seeded from the system.
    pub fn new() -> Self {
        Self::from_rng(fastrand::Rng::new())
    }

    /// Allocator with a fixed seed, for reproducible datasets.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(fastrand::Rng::with_seed(seed))
    }

    fn from_rng(rng: fastrand::Rng) -> Self {
        Self {
            rng,
            issued: HashSet::new(),
            max_attempts: IDENTITY_MAX_ATTEMPTS,
        }
    }

    /// Change how many draws are allowed per identifier.
    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Mark an identifier as taken without issuing it.
    pub fn reserve(&mut self, id: u32) {
        self.issued.insert(id);
    }

    /// Number of identifiers issued or reserved.
    pub fn issued(&self) -> usize {
        self.issued.len()
    }

    /// Issue a fresh identifier.
    pub fn issue(&mut self) -> Result<u32, IdentityExhausted> {
        for _ in 0..self.max_attempts {
            let id = self.rng.u32(..);
            if self.issued.insert(id) {
                return Ok(id);
            }
        }
        Err(IdentityExhausted {
            attempts: self.max_attempts,
        })
    }
}

// =============================================================================
// Mutex-guarded name table
// =============================================================================

#[derive(Debug)]
struct TableInner {
    allocator: IdentityAllocator,
    names: HashMap<String, HashMap<String, u32>>,
}

/// Stable identifiers per (namespace, name), safe to share between workers.
///
/// The empty name always maps to [`ANONYMOUS_ID`], which is never issued
/// to anyone else.
#[derive(Debug)]
pub struct IdentityTable {
    inner: Mutex<TableInner>,
}

impl IdentityTable {
    pub fn new(mut allocator: IdentityAllocator) -> Self {
        allocator.reserve(ANONYMOUS_ID);
        Self {
            inner: Mutex::new(TableInner {
                allocator,
                names: HashMap::new(),
            }),
        }
    }

    /// Identifier for `name` within `namespace`, issuing one on first sight.
    pub fn lookup(&self, namespace: &str, name: &str) -> Result<u32, IdentityExhausted> {
        if name.is_empty() {
            return Ok(ANONYMOUS_ID);
        }
        let mut inner = self.inner.lock();
        if let Some(&id) = inner.names.get(namespace).and_then(|n| n.get(name)) {
            return Ok(id);
        }
        let id = inner.allocator.issue()?;
        inner
            .names
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), id);
        Ok(id)
    }

    /// Number of distinct names seen across all namespaces.
    pub fn len(&self) -> usize {
        self.inner.lock().names.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Single-owner service
// =============================================================================

/// An allocator running on its own thread.
///
/// Identifiers are produced ahead of demand into a small bounded queue.
/// Dropping the service closes the queue and joins the thread.
#[derive(Debug)]
pub struct IdentityService {
    ids: Receiver<Result<u32, IdentityExhausted>>,
    handle: Option<JoinHandle<()>>,
}

impl IdentityService {
    pub fn spawn(allocator: IdentityAllocator) -> Result<Self, StageError> {
        Self::spawn_on(thread::Builder::new(), allocator)
    }

    fn spawn_on(
        builder: thread::Builder,
        allocator: IdentityAllocator,
    ) -> Result<Self, StageError> {
        let (tx, rx) = async_channel::bounded(64);
        let handle = builder
            .name("identity".into())
            .spawn(move || serve(allocator, tx))
            .map_err(|source| StageError::Spawn {
                stage: "identity",
                source,
            })?;
        Ok(Self {
            ids: rx,
            handle: Some(handle),
        })
    }

    /// Handle workers use to draw identifiers.
    pub fn client(&self) -> IdentityClient {
        IdentityClient {
            ids: self.ids.clone(),
        }
    }
}

impl Drop for IdentityService {
    fn drop(&mut self) {
        self.ids.close();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn serve(mut allocator: IdentityAllocator, tx: Sender<Result<u32, IdentityExhausted>>) {
    loop {
        let next = allocator.issue();
        let exhausted = next.is_err();
        if tx.send_blocking(next).is_err() {
            break;
        }
        if exhausted {
            break;
        }
    }
    debug!("identity service issued {} identifiers", allocator.issued());
}

/// Receiving end of an [`IdentityService`].
#[derive(Debug, Clone)]
pub struct IdentityClient {
    ids: Receiver<Result<u32, IdentityExhausted>>,
}

impl IdentityClient {
    /// Next identifier. Fails once the generator has reported exhaustion
    /// or the service has shut down.
    pub fn next_id(&self) -> Result<u32, IdentityExhausted> {
        match self.ids.recv_blocking() {
            Ok(id) => id,
            Err(_) => Err(IdentityExhausted { attempts: 0 }),
        }
    }
}
