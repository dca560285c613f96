use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn next_raw() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

macro_rules! identity {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u64);

        impl $name {
            /// Allocate a process-unique identity.
            pub fn next() -> Self {
                Self(next_raw())
            }

            /// The underlying counter value.
            pub fn raw(self) -> u64 {
                self.0
            }
        }
    };
}

identity!(
    /// Stable identity of a user-editable model object.
    ModelId
);
identity!(
    /// Identity of a per-render resource mirror; half of a `(ResourceId, version)` cache key.
    ResourceId
);
identity!(
    /// Identity of a render node, used to key processor caches.
    NodeId
);
