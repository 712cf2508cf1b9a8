//! Consistent Hash Ring
//!
//! Maps keys to peers so that every process computes the same owner for a
//! key without talking to the others, and a change in the peer set only
//! moves the keys that belonged to the peers that changed.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hasher;
use std::sync::Arc;

use siphasher::sip::SipHasher13;

/// Hash function used to place peers and keys on the ring.
pub type HashFn = Arc<dyn Fn(&[u8]) -> u32 + Send + Sync>;

/// Default number of virtual nodes per peer.
pub const DEFAULT_REPLICAS: usize = 50;

/// Default ring hash: SipHash-1-3 with fixed zero keys, folded to 32 bits.
///
/// Fixed keys keep the placement identical across processes and builds.
pub fn default_hash(data: &[u8]) -> u32 {
    let mut hasher = SipHasher13::new();
    hasher.write(data);
    let hash = hasher.finish();
    (hash ^ (hash >> 32)) as u32
}

// == Hash Ring ==
/// Sorted ring of virtual nodes, `replicas` per peer.
///
/// Virtual node `i` of peer `p` sits at `hash(i ‖ p)`. A key belongs to the
/// first virtual node at or after its own hash, wrapping around to the
/// start of the ring.
pub struct HashRing {
    hash: HashFn,
    replicas: usize,
    /// Sorted virtual node positions
    ring: Vec<u32>,
    /// Virtual node position to peer
    owners: HashMap<u32, String>,
}

impl HashRing {
    // == Constructor ==
    /// Creates an empty ring using [`default_hash`].
    pub fn new(replicas: usize) -> Self {
        Self::with_hasher(replicas, Arc::new(default_hash))
    }

    /// Creates an empty ring with a custom hash function.
    pub fn with_hasher(replicas: usize, hash: HashFn) -> Self {
        Self {
            hash,
            replicas,
            ring: Vec::new(),
            owners: HashMap::new(),
        }
    }

    // == Add ==
    /// Adds peers to the ring.
    pub fn add<I, S>(&mut self, peers: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for peer in peers {
            let peer = peer.as_ref();
            for i in 0..self.replicas {
                let position = (self.hash)(format!("{}{}", i, peer).as_bytes());
                if self.owners.insert(position, peer.to_string()).is_none() {
                    self.ring.push(position);
                }
            }
        }
        self.ring.sort_unstable();
    }

    // == Get ==
    /// Returns the peer owning `key`, or `None` if the ring is empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.ring.is_empty() {
            return None;
        }

        let hash = (self.hash)(key.as_bytes());
        let idx = self.ring.partition_point(|&position| position < hash);
        let position = self.ring[idx % self.ring.len()];

        self.owners.get(&position).map(String::as_str)
    }

    /// Returns true if no peer has been added.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Number of virtual nodes on the ring.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn replicas(&self) -> usize {
        self.replicas
    }
}

impl fmt::Debug for HashRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRing")
            .field("replicas", &self.replicas)
            .field("virtual_nodes", &self.ring.len())
            .finish()
    }
}
