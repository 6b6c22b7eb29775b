use std::{
	future::Future,
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
	time::Duration,
};

use tokio::{sync::watch, task::JoinHandle};

/// Runs only the most recently scheduled job, after a quiet period.
///
/// Each job is keyed by the input it was scheduled for, and publishes
/// `(key, value)` on a watch channel. Scheduling a job aborts the pending
/// one, and a generation counter keeps a job that already finished its delay
/// from publishing once it has been superseded.
pub struct Debouncer<K, V> {
	delay: Duration,
	generation: Arc<AtomicU64>,
	pending: Option<JoinHandle<()>>,
	sender: Arc<watch::Sender<Option<(K, V)>>>,
}

impl<K, V> Debouncer<K, V>
where
	K: Send + Sync + 'static,
	V: Send + Sync + 'static,
{
	pub fn new(delay: Duration) -> Self {
		let (sender, _) = watch::channel(None);

		Self {
			delay,
			generation: Arc::new(AtomicU64::new(0)),
			pending: None,
			sender: Arc::new(sender),
		}
	}

	pub fn subscribe(&self) -> watch::Receiver<Option<(K, V)>> {
		self.sender.subscribe()
	}

	/// Runs `job` once `delay` has passed without another call.
	///
	/// Must be called from within a tokio runtime.
	pub fn schedule<F>(&mut self, key: K, job: F)
	where
		F: Future<Output = V> + Send + 'static,
	{
		let generation = self.supersede();
		let current = Arc::clone(&self.generation);
		let sender = Arc::clone(&self.sender);
		let delay = self.delay;

		self.pending = Some(tokio::spawn(async move {
			tokio::time::sleep(delay).await;

			let value = job.await;

			sender.send_if_modified(|slot| {
				if current.load(Ordering::SeqCst) != generation {
					return false;
				}

				*slot = Some((key, value));
				true
			});
		}));
	}

	/// Publishes a value now, superseding any pending job.
	pub fn resolve(&mut self, key: K, value: V) {
		self.supersede();
		self.sender.send_replace(Some((key, value)));
	}

	/// Drops the pending job without publishing anything.
	pub fn cancel(&mut self) {
		self.supersede();
	}

	fn supersede(&mut self) -> u64 {
		if let Some(pending) = self.pending.take() {
			pending.abort();
		}

		self.generation.fetch_add(1, Ordering::SeqCst) + 1
	}
}

impl<K, V> Drop for Debouncer<K, V> {
	fn drop(&mut self) {
		if let Some(pending) = self.pending.take() {
			pending.abort();
		}
	}
}

#[cfg(test)]
mod test {
	use std::sync::atomic::AtomicUsize;

	use super::*;

	const DELAY: Duration = Duration::from_millis(500);

	#[tokio::test(start_paused = true)]
	async fn test_only_the_latest_job_publishes() {
		let runs = Arc::new(AtomicUsize::new(0));
		let mut debouncer = Debouncer::new(DELAY);
		let mut receiver = debouncer.subscribe();

		for (key, value) in [("r", 1), ("re", 2), ("rex", 3)] {
			let runs = Arc::clone(&runs);

			debouncer.schedule(key, async move {
				runs.fetch_add(1, Ordering::SeqCst);
				value
			});

			tokio::time::sleep(Duration::from_millis(100)).await;
		}

		receiver.changed().await.unwrap();

		assert_eq!(*receiver.borrow(), Some(("rex", 3)));
		assert_eq!(runs.load(Ordering::SeqCst), 1);
	}

	#[tokio::test(start_paused = true)]
	async fn test_waits_for_the_delay() {
		let mut debouncer = Debouncer::new(DELAY);
		let receiver = debouncer.subscribe();

		debouncer.schedule("rex", async { true });

		tokio::time::sleep(Duration::from_millis(499)).await;
		assert!(!receiver.has_changed().unwrap());

		tokio::time::sleep(Duration::from_millis(2)).await;
		assert_eq!(*receiver.borrow(), Some(("rex", true)));
	}

	#[tokio::test(start_paused = true)]
	async fn test_cancel_publishes_nothing() {
		let mut debouncer = Debouncer::new(DELAY);
		let receiver = debouncer.subscribe();

		debouncer.schedule("rex", async { true });
		debouncer.cancel();

		tokio::time::sleep(DELAY * 2).await;

		assert!(!receiver.has_changed().unwrap());
		assert_eq!(*receiver.borrow(), None);
	}

	#[tokio::test(start_paused = true)]
	async fn test_resolve_supersedes_pending_job() {
		let mut debouncer = Debouncer::new(DELAY);
		let receiver = debouncer.subscribe();

		debouncer.schedule("rex", async { true });
		debouncer.resolve("r", false);

		tokio::time::sleep(DELAY * 2).await;

		assert_eq!(*receiver.borrow(), Some(("r", false)));
	}
}
