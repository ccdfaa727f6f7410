pub mod order_scheduler;


pub use order_scheduler::{
    spawn_order_scheduler, LimitOrderScheduler, SchedulerConfig, SchedulerError, SchedulerHandle,
    TickSummary,
};
