// Background jobs
// One-shot asynchronous units of work with a failure event stream

mod scheduler;

pub use scheduler::{JobEvent, JobRecord, JobScheduler, JobState};
