use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use bss_events::{Event, EventBus, EventEnvelope, HandlerTable, Subscription};

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Background loop feeding bus envelopes through a [`HandlerTable`].
///
/// The table is built once at startup and never mutated; a failing handler
/// is logged by the table and does not stop the loop.
#[derive(Debug)]
pub struct EventDispatchWorker;

impl EventDispatchWorker {
    pub fn spawn<E, B>(
        name: &'static str,
        bus: B,
        table: Arc<HandlerTable<E>>,
    ) -> std::io::Result<WorkerHandle>
    where
        E: Event,
        B: EventBus<EventEnvelope<E>> + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub: Subscription<EventEnvelope<E>> = bus.subscribe();
        let handlers = table.handler_names();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(name, sub, shutdown_rx, &table))?;

        info!(worker = name, ?handlers, "event dispatch worker started");
        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop<E: Event>(
    name: &'static str,
    sub: Subscription<EventEnvelope<E>>,
    shutdown_rx: mpsc::Receiver<()>,
    table: &HandlerTable<E>,
) {
    let tick = Duration::from_millis(250);

    loop {
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(envelope) => {
                let report = table.dispatch(&envelope);
                debug!(
                    worker = name,
                    event_type = envelope.payload().event_type(),
                    delivered = report.delivered.len(),
                    failed = report.failed.len(),
                    "envelope dispatched"
                );
            }
            Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}
