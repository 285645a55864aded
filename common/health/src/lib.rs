//! Readiness reporting for components of the service.
//!
//! A process usually runs several components (consumers, connection pools,
//! background loops) and should only receive traffic once all of them are able
//! to serve it. [`ReadinessRegistry`] lets an arbitrary number of components
//! register a check and combines them into one status:
//!   - the process is ready only if every registered check is ready,
//!   - [`ReadinessRegistry::explain`] reports each component individually.
//!
//! Three kinds of checks are provided, depending on how a component knows it is ready:
//!   - [`PollCheck`]: the registry runs a probe at a fixed interval,
//!   - [`PushCheck`]: the component sets its own readiness,
//!   - [`PulseCheck`]: the component sends heartbeats, readiness expires without them.
//!
//! Anything implementing [`ReadinessCheck`] can be registered as well.
//!
//! Readiness and liveness are different probes with different consequences;
//! use a separate registry instance for each.

mod check;
mod poll;
mod pulse;
mod push;
mod registry;

pub use check::ReadinessCheck;
pub use poll::PollCheck;
pub use pulse::PulseCheck;
pub use push::PushCheck;
pub use registry::{ReadinessRegistry, ReadinessStatus};
