use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use std::thread;
use tracing::{error, trace};

use crate::domain::FolioError;
use crate::record::{Collection, Record};
use crate::store::{RecordDraft, RecordStore};

#[derive(Debug, Clone)]
pub enum Job {
    /// `generation` orders loads; only the newest one may reach the table.
    Load { collection: Collection, generation: u64 },
    Create(RecordDraft),
    Update { id: u64, draft: RecordDraft },
    Delete { collection: Collection, id: u64, title: String },
}

#[derive(Debug)]
pub enum JobOutcome {
    Loaded {
        collection: Collection,
        generation: u64,
        result: Result<Vec<Record>, FolioError>,
    },
    Saved {
        collection: Collection,
        created: bool,
        result: Result<(), FolioError>,
    },
    Deleted {
        collection: Collection,
        title: String,
        result: Result<(), FolioError>,
    },
}

/// Runs store calls off the ui thread and hands the outcomes back over a channel.
pub struct Worker {
    store: Arc<dyn RecordStore>,
    sender: Sender<JobOutcome>,
    receiver: Receiver<JobOutcome>,
    in_flight: usize,
}

impl Worker {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        let (sender, receiver) = unbounded();
        Worker {
            store,
            sender,
            receiver,
            in_flight: 0,
        }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn submit(&mut self, job: Job) {
        trace!("Submitting {job:?}");
        self.in_flight += 1;
        let store = Arc::clone(&self.store);
        let sender = self.sender.clone();
        thread::spawn(move || {
            let outcome = Self::run(store.as_ref(), job);
            if sender.send(outcome).is_err() {
                error!("Job finished after the ui went away");
            }
        });
    }

    /// Next finished job, if any. Never blocks.
    pub fn try_recv(&mut self) -> Option<JobOutcome> {
        let outcome = self.receiver.try_recv().ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(outcome)
    }

    pub fn busy(&self) -> bool {
        self.in_flight > 0
    }

    fn run(store: &dyn RecordStore, job: Job) -> JobOutcome {
        match job {
            Job::Load { collection, generation } => JobOutcome::Loaded {
                collection,
                generation,
                result: store.list(collection),
            },
            Job::Create(draft) => JobOutcome::Saved {
                collection: draft.collection(),
                created: true,
                result: store.create(&draft),
            },
            Job::Update { id, draft } => JobOutcome::Saved {
                collection: draft.collection(),
                created: false,
                result: store.update(id, &draft),
            },
            Job::Delete { collection, id, title } => JobOutcome::Deleted {
                collection,
                title,
                result: store.delete(collection, id),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::blog;
    use crate::store::MemoryStore;
    use std::time::{Duration, Instant};

    fn wait(worker: &mut Worker) -> JobOutcome {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(outcome) = worker.try_recv() {
                return outcome;
            }
            assert!(Instant::now() < deadline, "job did not finish");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn load_runs_in_the_background() {
        let store = MemoryStore::new(vec![blog(1, "a"), blog(2, "b")]);
        let mut worker = Worker::new(Arc::new(store));
        worker.submit(Job::Load {
            collection: Collection::Blogs,
            generation: 7,
        });
        assert!(worker.busy());

        match wait(&mut worker) {
            JobOutcome::Loaded {
                collection,
                generation,
                result,
            } => {
                assert_eq!(collection, Collection::Blogs);
                assert_eq!(generation, 7);
                assert_eq!(result.unwrap().len(), 2);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(!worker.busy());
    }

    #[test]
    fn delete_failures_come_back_as_outcomes() {
        let mut worker = Worker::new(Arc::new(MemoryStore::new(Vec::new())));
        worker.submit(Job::Delete {
            collection: Collection::Blogs,
            id: 3,
            title: "gone".into(),
        });
        match wait(&mut worker) {
            JobOutcome::Deleted { title, result, .. } => {
                assert_eq!(title, "gone");
                assert!(result.is_err());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
