pub mod event_dispatch_worker;

pub use event_dispatch_worker::{EventDispatchWorker, WorkerHandle};
