//! The facade crate (spec §10): the single entry point an embedding HTTP
//! service, CLI, or test fixture calls. [`BuildDriver::build_part`] wires
//! validate → normalize → schedule → evaluate → cache into one call, and is
//! the only crate in the workspace that owns every other pipeline stage at
//! once — the concurrency model (spec §5: single-threaded per build,
//! cooperative cancellation) and the one-span-per-`build_part`-call logging
//! requirement (spec §11) both live here.

pub mod driver;
pub mod partial;

pub use driver::{BuildDriver, BuildOutcome, BuildPolicy};
pub use partial::PartialBuildOutcome;
pub use truform_cache::{BuildSession, BuildSessionStore, FeatureBuildRecord, SessionId};
pub use truform_eval::CancellationToken;
pub use truform_ir::validate::StagedFeaturePolicy;
