#![forbid(unsafe_code)]

//! xstore public facade crate.
//!
//! Re-exports the runtime primitives and, with the default `platform`
//! feature, the concrete stores and headless window.

pub use xstore_runtime as runtime;

#[cfg(feature = "platform")]
pub use xstore_platform as platform;

pub mod prelude {
    pub use xstore_runtime::reactive::{
        ExternalStore, ExternalStoreExt, FrameClock, FrameScheduler, ImmediateScheduler,
        KeyedMultiplexer, Listener, PresenceTracker, Reader, SingletonMultiplexer, Subscription,
        SyncStore,
    };
    pub use xstore_runtime::RuntimeConfig;

    #[cfg(feature = "platform")]
    pub use xstore_platform::{
        Breakpoint, Breakpoints, CounterStore, FakeCursor, MediaQueryStore, OnlineStatus,
        PointerPosition, ScrollY, Stores, Window, WindowSize,
    };
}
