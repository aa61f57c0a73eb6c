//! 동기화 모듈.

pub mod deadline;
pub mod pipeline;
pub mod resolver;
pub mod scheduler;
pub mod window;

pub use deadline::{arm_deadline, DeadlineGuard};
pub use pipeline::{SymbolOutcome, SymbolSync};
pub use resolver::{first_non_empty, AliasResolver, FirstHit, Resolution};
pub use scheduler::{BatchScheduler, SchedulerConfig};
pub use window::{Clock, FixedClock, SystemClock, WindowCalculator};
