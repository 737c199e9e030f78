pub mod activation;
pub mod clock;
pub mod config;
pub mod error;
pub mod hooks;
pub mod owner;
pub mod report;
pub mod scheduler;
pub mod subscriber;

pub use clock::{Clock, EpochClock, ManualClock, MonotonicClock};
pub use config::SchedulerConfig;
pub use error::{RunawayUpdate, SchedulerError};
pub use hooks::{FlushObserver, LifecycleHooks, NoopHooks};
pub use owner::{Owner, OwnerId, Owners};
pub use report::FlushReport;
pub use scheduler::{MAX_UPDATE_COUNT, Scheduler, SchedulerBuilder};
pub use subscriber::{Subscriber, SubscriberBuilder, SubscriberId, SubscriberIds};
