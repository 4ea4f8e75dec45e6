/*!
 * Background translation jobs.
 *
 * - `params`: Persisted start parameters per job kind
 * - `events`: Lifecycle events and sinks
 * - `registry`: Cancellation tokens of running jobs
 * - `runner`: Job orchestration
 */

pub mod events;
pub mod params;
pub mod registry;
pub mod runner;

pub use self::events::{ChannelSink, CollectingSink, EventSink, JobEvent, NoopSink};
pub use self::params::{TranslateFileParams, TranslateUnitParams, TranslateUnitsParams};
pub use self::registry::CancellationRegistry;
pub use self::runner::JobRunner;
