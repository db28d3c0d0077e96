//! Signal monitor: a scan loop aligned to candle closes.

pub mod alerts;
pub mod clock;
pub mod scheduler;

pub use alerts::{AlertIntent, AlertSink, ConsoleAlerts};
pub use clock::{interval_minutes, time_to_next_close, AnchoredClock, Clock, SystemClock};
pub use scheduler::{CycleOutcome, MonitorState, Phase, PollScheduler, SchedulerSettings};
