pub mod error;
pub mod model;
pub mod registry;
pub mod runner;

pub use error::{InspectError, Result};
pub use model::{
    InspectionTask, LogKind, TaskLog, TaskStatus, TaskStep, CANCELLED_MESSAGE,
    STEP_ANALYZE_ALERTS, STEP_COLLECT_RESOURCES, STEP_COLLECT_SERVICES, STEP_GENERATE_REPORT,
};
pub use registry::{spawn_periodic_cleanup, TaskRegistry, TASK_RETENTION_HOURS};
pub use runner::{InspectionRunner, RunOutcome};
