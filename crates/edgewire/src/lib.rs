//! Wire codec for the edgewire streaming-telemetry protocol.
//!
//! Edges push timestamped measurement samples upstream and subscribe to
//! downstream streams through a server. Everything on the wire is an element:
//! a preamble, a type tag and a self-delimiting body.
//!
//! # Crate Structure
//!
//! - [`codec`]: Field primitives, elapsed time, data payloads and filters
//! - [`frame`]: Element framing, dispatch and blocking/async stream adapters

/// Re-export payload and filter codec types.
pub mod codec {
    pub use edgewire_codec::*;
}

/// Re-export element framing types.
pub mod frame {
    pub use edgewire_frame::*;
}
