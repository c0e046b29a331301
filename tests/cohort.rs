use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tunnelvisor::{
    Cohort, Event, EventKind, HookError, Subscribe, SyncSnapshot, Synchronizer, Worker,
    WorkerConfig, WorkerHooks,
};

type Journal = Arc<Mutex<Vec<(&'static str, &'static str)>>>;

/// Test transport recording every hook call into a shared journal.
struct Link {
    name: &'static str,
    journal: Journal,
    start_ok: bool,
    healthy: AtomicBool,
    severed: AtomicBool,
    imminent: AtomicUsize,
    stops: AtomicUsize,
}

impl Link {
    fn new(name: &'static str, journal: &Journal) -> Arc<Self> {
        Self::build(name, journal, true)
    }

    fn declining(name: &'static str, journal: &Journal) -> Arc<Self> {
        Self::build(name, journal, false)
    }

    fn build(name: &'static str, journal: &Journal, start_ok: bool) -> Arc<Self> {
        Arc::new(Self {
            name,
            journal: Arc::clone(journal),
            start_ok,
            healthy: AtomicBool::new(true),
            severed: AtomicBool::new(false),
            imminent: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
        })
    }

    fn record(&self, what: &'static str) {
        self.journal.lock().expect("journal").push((self.name, what));
    }
}

#[async_trait]
impl WorkerHooks for Link {
    fn name(&self) -> &str {
        self.name
    }

    async fn do_start(&self) -> Result<bool, HookError> {
        self.record("start");
        Ok(self.start_ok)
    }

    async fn do_periodic_check(&self) -> Result<bool, HookError> {
        if self.severed.load(Ordering::SeqCst) {
            panic!("{}: link severed", self.name);
        }
        Ok(self.healthy.load(Ordering::SeqCst))
    }

    async fn stop_imminent(&self) {
        self.imminent.fetch_add(1, Ordering::SeqCst);
        self.record("imminent");
        // give slower peers a chance to interleave if the barrier were broken
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    async fn do_stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.record("stop");
    }
}

fn fast() -> WorkerConfig {
    WorkerConfig {
        tick: Duration::from_millis(10),
        ..WorkerConfig::default()
    }
}

fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

#[tokio::test]
async fn all_clean_cohort_runs_stop_imminent_before_any_teardown() {
    let journal = journal();
    let links: Vec<_> = ["ssh", "vpn", "meek"]
        .into_iter()
        .map(|n| Link::new(n, &journal))
        .collect();

    let mut cohort = Cohort::builder(fast()).build();
    for link in &links {
        cohort.add(link.clone());
    }

    assert_eq!(cohort.start().await.expect("start"), 3);
    assert_eq!(cohort.running(), 3);

    cohort.request_stop();
    cohort.stop().await.expect("stop");
    assert_eq!(cohort.running(), 0);

    let entries = journal.lock().expect("journal").clone();
    let last_imminent = entries
        .iter()
        .rposition(|(_, what)| *what == "imminent")
        .expect("imminent");
    let first_stop = entries
        .iter()
        .position(|(_, what)| *what == "stop")
        .expect("stop");
    assert!(last_imminent < first_stop, "journal: {entries:?}");

    for link in &links {
        assert_eq!(link.imminent.load(Ordering::SeqCst), 1);
        assert_eq!(link.stops.load(Ordering::SeqCst), 1);
    }

    let state = cohort.synchronizer().snapshot();
    assert_eq!(state.started, 3);
    assert_eq!(state.ready_to_stop, 3);
    assert_eq!(state.votes, vec![true, true, true]);
}

#[tokio::test]
async fn one_unclean_member_makes_every_member_skip_stop_imminent() {
    let journal = journal();
    let a = Link::new("a", &journal);
    let b = Link::new("b", &journal);

    let mut cohort = Cohort::builder(fast())
        .with_worker(a.clone())
        .with_worker(b.clone())
        .build();
    assert_eq!(cohort.start().await.expect("start"), 2);

    // a stops on its own and votes unclean while b is still healthy
    a.healthy.store(false, Ordering::SeqCst);
    cohort.workers()[0]
        .stopped_signal()
        .wait()
        .await
        .expect("a stopped");
    assert!(cohort.workers()[1].is_running());

    cohort.request_stop();
    cohort.stop().await.expect("stop");

    assert_eq!(a.imminent.load(Ordering::SeqCst), 0);
    assert_eq!(b.imminent.load(Ordering::SeqCst), 0);
    assert_eq!(a.stops.load(Ordering::SeqCst), 1);
    assert_eq!(b.stops.load(Ordering::SeqCst), 1);

    let state = cohort.synchronizer().snapshot();
    assert_eq!(state.votes, vec![false, true]);
    assert_eq!(state.ready_to_stop, 0);
}

#[tokio::test]
async fn panicking_member_votes_unclean_and_peers_skip_stop_imminent() {
    let journal = journal();
    let a = Link::new("a", &journal);
    let b = Link::new("b", &journal);

    let mut cohort = Cohort::builder(fast())
        .with_worker(a.clone())
        .with_worker(b.clone())
        .build();
    assert_eq!(cohort.start().await.expect("start"), 2);

    a.severed.store(true, Ordering::SeqCst);
    tokio::time::timeout(
        Duration::from_secs(2),
        cohort.workers()[0].stopped_signal().wait(),
    )
    .await
    .expect("a stopped in time")
    .expect("a stopped");
    assert!(!cohort.workers()[0].is_running());
    assert!(cohort.workers()[1].is_running());

    cohort.request_stop();
    cohort.stop().await.expect("stop");

    assert_eq!(a.imminent.load(Ordering::SeqCst), 0);
    assert_eq!(b.imminent.load(Ordering::SeqCst), 0);
    assert_eq!(a.stops.load(Ordering::SeqCst), 1);
    assert_eq!(b.stops.load(Ordering::SeqCst), 1);
    assert_eq!(cohort.synchronizer().snapshot().votes, vec![false, true]);
}

#[tokio::test]
async fn declined_member_spoils_the_clean_path() {
    let journal = journal();
    let ok = Link::new("ok", &journal);
    let declined = Link::declining("declined", &journal);

    let mut cohort = Cohort::builder(fast())
        .with_worker(ok.clone())
        .with_worker(declined.clone())
        .build();
    assert_eq!(cohort.start().await.expect("start"), 1);
    assert!(!cohort.workers()[1].is_running());

    cohort.request_stop();
    cohort.stop().await.expect("stop");

    assert_eq!(ok.imminent.load(Ordering::SeqCst), 0);
    assert_eq!(ok.stops.load(Ordering::SeqCst), 1);
    assert_eq!(declined.stops.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn synchronizer_reset_supports_successive_generations() {
    let journal = journal();
    let a = Link::new("a", &journal);
    let b = Link::new("b", &journal);
    let mut cohort = Cohort::builder(fast())
        .with_worker(a.clone())
        .with_worker(b.clone())
        .build();

    for generation in 1..=2 {
        assert_eq!(cohort.start().await.expect("start"), 2);
        cohort.request_stop();
        cohort.stop().await.expect("stop");

        assert_eq!(cohort.synchronizer().snapshot().ready_to_stop, 2);
        assert_eq!(a.imminent.load(Ordering::SeqCst), generation);
        assert_eq!(b.imminent.load(Ordering::SeqCst), generation);

        cohort.reset();
        assert_eq!(cohort.synchronizer().snapshot(), SyncSnapshot::default());
        assert!(!cohort.stop_token().is_cancelled());
    }
}

#[tokio::test]
async fn run_until_shutdown_returns_when_a_member_stops() {
    let journal = journal();
    let a = Link::new("a", &journal);
    let b = Link::new("b", &journal);
    let mut cohort = Cohort::builder(fast())
        .with_worker(a.clone())
        .with_worker(b.clone())
        .build();
    assert_eq!(cohort.start().await.expect("start"), 2);

    let trip = {
        let a = Arc::clone(&a);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            a.healthy.store(false, Ordering::SeqCst);
        })
    };

    tokio::time::timeout(Duration::from_secs(5), cohort.run_until_shutdown())
        .await
        .expect("returned")
        .expect("stopped");
    trip.await.expect("trip");

    assert_eq!(cohort.running(), 0);
    assert_eq!(b.stops.load(Ordering::SeqCst), 1);
    assert_eq!(b.imminent.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn workers_share_a_synchronizer_directly() {
    let journal = journal();
    let synch = Arc::new(Synchronizer::new());
    let stop = CancellationToken::new();

    let mut workers: Vec<Worker> = ["x", "y"]
        .into_iter()
        .map(|n| Worker::new(Link::new(n, &journal), fast()))
        .collect();
    for worker in &mut workers {
        assert!(
            worker
                .start(&stop, Some(Arc::clone(&synch)))
                .await
                .expect("start")
        );
    }

    stop.cancel();
    for worker in &mut workers {
        worker.stop().await.expect("stop");
        assert!(!worker.is_running());
    }
    assert_eq!(synch.snapshot().ready_to_stop, 2);
}

#[derive(Default)]
struct Kinds(Mutex<Vec<EventKind>>);

#[async_trait]
impl Subscribe for Kinds {
    async fn on_event(&self, ev: &Event) {
        self.0.lock().expect("kinds").push(ev.kind);
    }

    fn name(&self) -> &'static str {
        "kinds"
    }
}

#[tokio::test]
async fn subscribers_observe_the_cohort_lifecycle() {
    let journal = journal();
    let kinds = Arc::new(Kinds::default());
    let mut cohort = Cohort::builder(fast())
        .with_subscribers(vec![kinds.clone() as Arc<dyn Subscribe>])
        .with_worker(Link::new("ssh", &journal))
        .build();

    assert_eq!(cohort.start().await.expect("start"), 1);
    cohort.request_stop();
    cohort.stop().await.expect("stop");

    // delivery is asynchronous
    let expected = [
        EventKind::WorkerStarted,
        EventKind::StopRequested,
        EventKind::VoteCast,
        EventKind::CohortClean,
        EventKind::StopImminent,
        EventKind::WorkerStopped,
    ];
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let seen = kinds.0.lock().expect("kinds").clone();
        if expected.iter().all(|k| seen.contains(k)) {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "seen: {seen:?}");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn dropping_the_cohort_releases_its_subscribers() {
    let kinds = Arc::new(Kinds::default());
    let cohort = Cohort::builder(fast())
        .with_subscribers(vec![kinds.clone() as Arc<dyn Subscribe>])
        .build();
    cohort.bus().publish(Event::new(EventKind::ShutdownRequested));
    assert!(Arc::strong_count(&kinds) > 1);

    drop(cohort);

    // listener and delivery tasks end, dropping their handles to the subscriber
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while Arc::strong_count(&kinds) > 1 {
        assert!(tokio::time::Instant::now() < deadline, "subscriber still held");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[derive(Default)]
struct Faulty(AtomicUsize);

#[async_trait]
impl Subscribe for Faulty {
    async fn on_event(&self, _ev: &Event) {
        self.0.fetch_add(1, Ordering::SeqCst);
        panic!("faulty subscriber");
    }

    fn name(&self) -> &'static str {
        "faulty"
    }
}

#[tokio::test]
async fn panicking_subscriber_does_not_loop_on_its_own_reports() {
    let faulty = Arc::new(Faulty::default());
    let cohort = Cohort::builder(fast())
        .with_subscribers(vec![faulty.clone() as Arc<dyn Subscribe>])
        .build();

    cohort.bus().publish(Event::new(EventKind::ShutdownRequested));
    tokio::time::sleep(Duration::from_millis(200)).await;
    let settled = faulty.0.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(200)).await;

    // the event itself, then the single report about it
    assert_eq!(settled, 2);
    assert_eq!(faulty.0.load(Ordering::SeqCst), settled);
}
