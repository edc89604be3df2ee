pub mod allocator;
pub mod config;
pub mod orchestrator;
pub mod reporter;
pub mod testing;
pub mod worker;

pub use allocator::{AllocationError, PathAllocator};
pub use config::{
    load_config, load_config_from_str, load_layered_config, validate_config, BatchConfig,
    ConfigError,
};
pub use orchestrator::{
    aggregate_exit_code, BatchOptions, BatchOrchestrator, BatchOutcome, BatchReport,
    OrchestratorError, Placement,
};
pub use reporter::{ConsoleReporter, NullReporter, Reporter, SummaryFormat};
pub use worker::{
    CommandLine, CommandSpawner, CommandTemplate, Job, Spawner, TaskHandle, Worker, WorkerError,
    WorkerExit, WorkerId, WorkerOptions, WorkerState,
};
