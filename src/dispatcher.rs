use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Mutex;
use std::thread;

/// Sizing of the worker pool and of the two bounded queues between the
/// dispatching thread and the workers.
pub struct DispatcherConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> DispatcherConfig {
        DispatcherConfig {
            workers: thread::available_parallelism().map(|it| it.get()).unwrap_or(1),
            // Large enough to hold one full phase for any 16-bit frontier,
            // so a phase never blocks with responses still in flight.
            queue_capacity: 1 << 16,
        }
    }
}

/// Fan-out/fan-in worker pool. Workers are spawned once per `run` call,
/// pull work items from a shared bounded queue and push one response per
/// item back to the dispatching thread. Dropping the handle closes the
/// work queue and terminates the pool.
pub struct WorkDispatcher {
    config: DispatcherConfig,
}

pub struct DispatchHandle<W, R> {
    work: SyncSender<W>,
    responses: Receiver<R>,
    capacity: usize,
}

impl WorkDispatcher {
    pub fn new(config: DispatcherConfig) -> WorkDispatcher {
        assert!(config.workers >= 1);
        assert!(config.queue_capacity >= 1);
        WorkDispatcher { config }
    }

    pub fn run<W, R, F, T>(&self, worker: F, body: impl FnOnce(&DispatchHandle<W, R>) -> T) -> T
    where
        W: Send,
        R: Send,
        F: Fn(W) -> R + Sync,
    {
        let (work_sender, work_receiver) = sync_channel::<W>(self.config.queue_capacity);
        let (response_sender, response_receiver) = sync_channel::<R>(self.config.queue_capacity);
        let work_receiver = Mutex::new(work_receiver);
        thread::scope(|scope| {
            for _ in 0..self.config.workers {
                let response_sender = response_sender.clone();
                let work_receiver = &work_receiver;
                let worker = &worker;
                scope.spawn(move || loop {
                    let item = work_receiver.lock().unwrap().recv();
                    match item {
                        Ok(item) => {
                            if response_sender.send(worker(item)).is_err() {
                                break;
                            }
                        }
                        Err(_) => break,
                    }
                });
            }
            drop(response_sender);
            let handle = DispatchHandle {
                work: work_sender,
                responses: response_receiver,
                capacity: self.config.queue_capacity,
            };
            let out = body(&handle);
            drop(handle);
            out
        })
    }
}

impl<W, R> DispatchHandle<W, R> {
    /// Submit one phase of work and wait for exactly one response per item.
    /// Returning only once the full phase is answered is what sequences
    /// the rounds of the callers.
    pub fn dispatch(&self, items: Vec<W>) -> Vec<R> {
        assert!(items.len() <= self.capacity, "phase larger than queue capacity");
        let count = items.len();
        for item in items {
            self.work.send(item).expect("worker pool terminated early");
        }
        let mut responses = Vec::with_capacity(count);
        for _ in 0..count {
            responses.push(self.responses.recv().expect("worker pool terminated early"));
        }
        responses
    }
}
