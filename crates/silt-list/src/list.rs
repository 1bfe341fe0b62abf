//! The pool-backed singly linked list.
//!
//! Every node lives in a 10-byte pool block; links between nodes are
//! packed block handles stored inside the node bytes themselves. The list
//! holds only the head handle in native memory, so clearing the list
//! returns every byte it ever used to the pool.

use std::fmt;
use std::sync::{Arc, Mutex};

use silt_pool::{BlockHandle, Pool};

use crate::error::ListError;

/// Size of one encoded node in pool bytes: value (2) + next link (8).
const NODE_BYTES: u32 = 10;

/// Packed-handle value marking the end of the list.
const NO_NEXT: u64 = u64::MAX;

/// Opaque identifier for a node, returned by insertion and search.
///
/// A `NodeId` goes stale when its node is removed or the list is cleared.
/// Structural operations re-validate identifiers by traversal and report
/// [`ListError::NodeNotFound`] for stale ones rather than trusting them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeId(BlockHandle);

/// A decoded node: its value and the handle of its successor.
struct Node {
    value: u16,
    next: Option<BlockHandle>,
}

/// Thread-safe singly linked list of `u16` values with pool-resident nodes.
///
/// One coarse mutex serializes all operations, reads included. Pool calls
/// are made while holding the list lock; the only lock order anywhere is
/// list before pool, so the two coarse locks cannot deadlock.
pub struct PoolList {
    pool: Arc<Pool>,
    head: Mutex<Option<BlockHandle>>,
}

// Compile-time assertion: PoolList must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<PoolList>();
};

fn read_node(pool: &Pool, handle: BlockHandle) -> Result<Node, ListError> {
    let mut buf = [0u8; NODE_BYTES as usize];
    pool.read(handle, &mut buf)?;
    let value = u16::from_le_bytes([buf[0], buf[1]]);
    let raw = u64::from_le_bytes([
        buf[2], buf[3], buf[4], buf[5], buf[6], buf[7], buf[8], buf[9],
    ]);
    let next = if raw == NO_NEXT {
        None
    } else {
        Some(BlockHandle::from_raw(raw))
    };
    Ok(Node { value, next })
}

fn write_node(
    pool: &Pool,
    handle: BlockHandle,
    value: u16,
    next: Option<BlockHandle>,
) -> Result<(), ListError> {
    let mut buf = [0u8; NODE_BYTES as usize];
    buf[0..2].copy_from_slice(&value.to_le_bytes());
    let raw = next.map_or(NO_NEXT, BlockHandle::to_raw);
    buf[2..10].copy_from_slice(&raw.to_le_bytes());
    pool.write(handle, &buf)?;
    Ok(())
}

impl PoolList {
    /// Create an empty list whose nodes will be allocated from `pool`.
    pub fn new(pool: Arc<Pool>) -> Self {
        Self {
            pool,
            head: Mutex::new(None),
        }
    }

    /// Append `value` at the end of the list.
    ///
    /// Pool exhaustion surfaces as [`ListError::Pool`] and leaves the
    /// list unchanged.
    pub fn push_back(&self, value: u16) -> Result<NodeId, ListError> {
        let mut head = self.head.lock().unwrap();

        // Find the tail before allocating, so a failed allocation leaves
        // nothing to unwind.
        let tail = match *head {
            None => None,
            Some(first) => {
                let mut current = first;
                loop {
                    match read_node(&self.pool, current)?.next {
                        Some(next) => current = next,
                        None => break Some(current),
                    }
                }
            }
        };

        let fresh = self.pool.alloc(NODE_BYTES)?;
        if let Err(err) = write_node(&self.pool, fresh, value, None) {
            self.pool.free(fresh);
            return Err(err);
        }

        match tail {
            None => *head = Some(fresh),
            Some(tail) => {
                let node = read_node(&self.pool, tail)?;
                write_node(&self.pool, tail, node.value, Some(fresh))?;
            }
        }
        Ok(NodeId(fresh))
    }

    /// Insert `value` immediately after `node`.
    pub fn insert_after(&self, node: NodeId, value: u16) -> Result<NodeId, ListError> {
        let head = self.head.lock().unwrap();
        if !self.node_in_list(*head, node.0)? {
            return Err(ListError::NodeNotFound);
        }
        let prev = read_node(&self.pool, node.0)?;

        let fresh = self.pool.alloc(NODE_BYTES)?;
        if let Err(err) = write_node(&self.pool, fresh, value, prev.next) {
            self.pool.free(fresh);
            return Err(err);
        }
        write_node(&self.pool, node.0, prev.value, Some(fresh))?;
        Ok(NodeId(fresh))
    }

    /// Insert `value` immediately before `node`.
    pub fn insert_before(&self, node: NodeId, value: u16) -> Result<NodeId, ListError> {
        let mut head = self.head.lock().unwrap();

        // Head insertion rewrites only the head pointer.
        if *head == Some(node.0) {
            let fresh = self.pool.alloc(NODE_BYTES)?;
            if let Err(err) = write_node(&self.pool, fresh, value, Some(node.0)) {
                self.pool.free(fresh);
                return Err(err);
            }
            *head = Some(fresh);
            return Ok(NodeId(fresh));
        }

        // Otherwise find the predecessor of `node`.
        let mut current = (*head).ok_or(ListError::NodeNotFound)?;
        let predecessor = loop {
            let n = read_node(&self.pool, current)?;
            match n.next {
                Some(next) if next == node.0 => break current,
                Some(next) => current = next,
                None => return Err(ListError::NodeNotFound),
            }
        };

        let fresh = self.pool.alloc(NODE_BYTES)?;
        if let Err(err) = write_node(&self.pool, fresh, value, Some(node.0)) {
            self.pool.free(fresh);
            return Err(err);
        }
        let pred = read_node(&self.pool, predecessor)?;
        write_node(&self.pool, predecessor, pred.value, Some(fresh))?;
        Ok(NodeId(fresh))
    }

    /// Remove the first node carrying `value`, returning its bytes to the
    /// pool.
    pub fn remove(&self, value: u16) -> Result<(), ListError> {
        let mut head = self.head.lock().unwrap();

        let mut prev: Option<BlockHandle> = None;
        let mut current = match *head {
            Some(h) => h,
            None => return Err(ListError::ValueNotFound { value }),
        };
        loop {
            let node = read_node(&self.pool, current)?;
            if node.value == value {
                match prev {
                    None => *head = node.next,
                    Some(prev) => {
                        let p = read_node(&self.pool, prev)?;
                        write_node(&self.pool, prev, p.value, node.next)?;
                    }
                }
                self.pool.free(current);
                return Ok(());
            }
            match node.next {
                Some(next) => {
                    prev = Some(current);
                    current = next;
                }
                None => return Err(ListError::ValueNotFound { value }),
            }
        }
    }

    /// Find the first node carrying `value`.
    ///
    /// The returned identifier is a snapshot: another thread may remove
    /// the node before it is used again, in which case structural
    /// operations on it report [`ListError::NodeNotFound`].
    pub fn find(&self, value: u16) -> Option<NodeId> {
        let head = self.head.lock().unwrap();
        let mut current = *head;
        while let Some(handle) = current {
            match read_node(&self.pool, handle) {
                Ok(node) if node.value == value => return Some(NodeId(handle)),
                Ok(node) => current = node.next,
                Err(_) => return None,
            }
        }
        None
    }

    /// Number of nodes, counted by traversal under the lock.
    pub fn len(&self) -> usize {
        let head = self.head.lock().unwrap();
        let mut count = 0;
        let mut current = *head;
        while let Some(handle) = current {
            match read_node(&self.pool, handle) {
                Ok(node) => {
                    count += 1;
                    current = node.next;
                }
                Err(_) => break,
            }
        }
        count
    }

    /// Whether the list has no nodes.
    pub fn is_empty(&self) -> bool {
        self.head.lock().unwrap().is_none()
    }

    /// Snapshot of all values in list order.
    ///
    /// If the backing pool has been deinitialized out from under the
    /// list, the snapshot is truncated at the first unreadable node.
    pub fn to_vec(&self) -> Vec<u16> {
        let head = self.head.lock().unwrap();
        let mut values = Vec::new();
        let mut current = *head;
        while let Some(handle) = current {
            match read_node(&self.pool, handle) {
                Ok(node) => {
                    values.push(node.value);
                    current = node.next;
                }
                Err(_) => break,
            }
        }
        values
    }

    /// Render the sub-list from `start` (head when `None`) through `end`
    /// (tail when `None`), inclusive, as `[a, b, c]`.
    ///
    /// A `start` that is not in the list yields `[]`.
    pub fn range_string(&self, start: Option<NodeId>, end: Option<NodeId>) -> String {
        let head = self.head.lock().unwrap();

        // Locate the starting node by traversal from the head.
        let mut current = *head;
        if let Some(start) = start {
            loop {
                match current {
                    Some(handle) if handle == start.0 => break,
                    Some(handle) => match read_node(&self.pool, handle) {
                        Ok(node) => current = node.next,
                        Err(_) => return "[]".to_string(),
                    },
                    None => return "[]".to_string(),
                }
            }
        }

        let mut out = String::from("[");
        let mut first = true;
        while let Some(handle) = current {
            let Ok(node) = read_node(&self.pool, handle) else {
                break;
            };
            if !first {
                out.push_str(", ");
            }
            out.push_str(&node.value.to_string());
            first = false;
            if end.is_some_and(|end| end.0 == handle) {
                break;
            }
            current = node.next;
        }
        out.push(']');
        out
    }

    /// Remove every node, returning all node bytes to the pool.
    pub fn clear(&self) {
        let mut head = self.head.lock().unwrap();
        let mut current = *head;
        while let Some(handle) = current {
            let next = read_node(&self.pool, handle).ok().and_then(|n| n.next);
            self.pool.free(handle);
            current = next;
        }
        *head = None;
    }

    /// Whether `target` is reachable from `head`. Called under the list lock.
    fn node_in_list(
        &self,
        head: Option<BlockHandle>,
        target: BlockHandle,
    ) -> Result<bool, ListError> {
        let mut current = head;
        while let Some(handle) = current {
            if handle == target {
                return Ok(true);
            }
            current = read_node(&self.pool, handle)?.next;
        }
        Ok(false)
    }
}

impl fmt::Display for PoolList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.to_vec();
        write!(f, "[")?;
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{value}")?;
        }
        write!(f, "]")
    }
}
