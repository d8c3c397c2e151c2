//! Stream priority: the `(dependency, exclusive, weight)` record from RFC
//! 7540 Section 5.3, and the reparenting algorithm triggered by an exclusive
//! PRIORITY assignment.
//!
//! The dependency tree itself is not an owned data structure here: each
//! stream only remembers its own `Priority`, and the forest is recovered on
//! demand by asking the connection's stream registry which streams currently
//! depend on a given id, rather than kept as parent pointers plus a child
//! scan in a second, independent map: bookkeeping stays keyed by the
//! registry that already owns every stream, with nothing left to drift out
//! of sync.

use crate::error::Error;
use crate::types::{StreamId, CONNECTION_ROOT, DEFAULT_WEIGHT};

/// `(stream_dependency, exclusive, weight)` — locates a stream in the
/// connection's dependency forest.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Priority {
    /// 0 means "depends on the connection root".
    pub stream_dependency: StreamId,
    pub exclusive: bool,
    /// The RFC's 1..=256 weight, stored mod 256 so it fits a `u8`: 0 here
    /// means the RFC value 256. `StreamDependency::parse`/`serialize` do the
    /// +1/-1 conversion to and from the wire's zero-based octet.
    pub weight: u8,
}

impl Default for Priority {
    fn default() -> Priority {
        Priority {
            stream_dependency: CONNECTION_ROOT,
            exclusive: false,
            weight: DEFAULT_WEIGHT,
        }
    }
}

/// The subset of the connection's stream registry that priority reassignment
/// needs: look up and replace any stream's current priority record, and
/// enumerate every live stream id to recompute `children()`.
///
/// Implemented by `Connection` (see `connection.rs`); kept as its own trait
/// so the reparenting algorithm can be unit tested against a small fake
/// registry without standing up a full connection.
pub trait PriorityRegistry {
    fn priority_of(&self, id: StreamId) -> Option<Priority>;
    fn set_priority(&mut self, id: StreamId, priority: Priority);
    /// All stream ids currently tracked by the registry (idle/closed streams
    /// excluded, per the connection's reaping policy).
    fn stream_ids(&self) -> Vec<StreamId>;
}

/// The set of streams whose priority currently depends on `parent`.
pub fn children<R: PriorityRegistry + ?Sized>(registry: &R, parent: StreamId) -> Vec<StreamId> {
    registry
        .stream_ids()
        .into_iter()
        .filter(|&id| {
            registry
                .priority_of(id)
                .map_or(false, |p| p.stream_dependency == parent)
        })
        .collect()
}

/// Assigns a new priority to `stream_id`, per RFC 7540 Section 5.3.3:
///
/// 1. Rejects self-dependency.
/// 2. If `exclusive`, every current child of the new parent is reparented
///    onto `stream_id` before the new dependency is installed.
/// 3. Installs the new priority record.
pub fn reassign<R: PriorityRegistry + ?Sized>(
    registry: &mut R,
    stream_id: StreamId,
    new_dependency: StreamId,
    exclusive: bool,
    weight: u8,
) -> Result<(), Error> {
    if new_dependency == stream_id {
        return Err(Error::SelfDependency { stream_id });
    }

    if exclusive {
        for sibling in children(registry, new_dependency) {
            if sibling == stream_id {
                continue;
            }
            let mut reparented = registry.priority_of(sibling).unwrap_or_default();
            reparented.stream_dependency = stream_id;
            registry.set_priority(sibling, reparented);
        }
    }

    registry.set_priority(
        stream_id,
        Priority {
            stream_dependency: new_dependency,
            exclusive,
            weight,
        },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeRegistry(HashMap<StreamId, Priority>);

    impl PriorityRegistry for FakeRegistry {
        fn priority_of(&self, id: StreamId) -> Option<Priority> {
            self.0.get(&id).copied()
        }
        fn set_priority(&mut self, id: StreamId, priority: Priority) {
            self.0.insert(id, priority);
        }
        fn stream_ids(&self) -> Vec<StreamId> {
            self.0.keys().copied().collect()
        }
    }

    fn with(ids: &[(StreamId, StreamId)]) -> FakeRegistry {
        let mut reg = FakeRegistry::default();
        for &(id, dep) in ids {
            reg.set_priority(
                id,
                Priority {
                    stream_dependency: dep,
                    exclusive: false,
                    weight: DEFAULT_WEIGHT,
                },
            );
        }
        reg
    }

    #[test]
    fn self_dependency_is_rejected() {
        let mut reg = with(&[(3, 0)]);
        let before = reg.priority_of(3).unwrap();
        let err = reassign(&mut reg, 3, 3, false, 16).unwrap_err();
        matches!(err, Error::SelfDependency { stream_id: 3 });
        assert_eq!(reg.priority_of(3).unwrap(), before);
    }

    #[test]
    fn exclusive_reparents_existing_children() {
        // A(1), B(3), C(5) all depend on root (0).
        let mut reg = with(&[(1, 0), (3, 0), (5, 0)]);

        reassign(&mut reg, 1, 0, true, 16).unwrap();

        assert_eq!(children(&reg, 0), vec![1]);
        let mut under_a = children(&reg, 1);
        under_a.sort();
        assert_eq!(under_a, vec![3, 5]);
    }

    #[test]
    fn non_exclusive_does_not_disturb_siblings() {
        let mut reg = with(&[(1, 0), (3, 0)]);
        reassign(&mut reg, 1, 0, false, 16).unwrap();
        assert_eq!(reg.priority_of(3).unwrap().stream_dependency, 0);
    }
}
