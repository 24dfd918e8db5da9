//! In-memory directory and sinks shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream;
use rollcall_core::{CrawlerConfig, GroupId, MemberId};
use rollcall_crawler::{
    CrawlError, Directory, DirectoryError, GroupInfo, MemberSignal, MemberStream, PresenceSignal,
    ProgressEvent, ProgressSink,
};
use rollcall_db::Database;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const LATIN: &[char] = &[
    'a', 'm', 's', 'd', 'j', 'r', 'b', 'k', 't', 'c', 'e', 'l', 'n', 'p', 'g', 'v', 'h', 'o', 'f',
    'i', 'w', 'y', 'q', 'u', 'z', 'x',
];

pub async fn test_db() -> Arc<Database> {
    let db = Database::new(":memory:").await.expect("create test database");
    db.run_migrations().await.expect("run migrations");
    Arc::new(db)
}

/// Default tuning without pauses, throttling or flood-wait grace.
pub fn test_config() -> CrawlerConfig {
    CrawlerConfig {
        admission_pause_ms: 0,
        progress_interval_secs: 0,
        rate_limit_grace_secs: 0,
        ..CrawlerConfig::default()
    }
}

pub fn member(id: i64, name: &str, presence: PresenceSignal) -> MemberSignal {
    MemberSignal {
        id: MemberId::new(id),
        username: Some(name.to_string()),
        first_name: Some(name.to_string()),
        last_name: None,
        phone: None,
        is_bot: false,
        presence,
    }
}

/// `count` online members whose names start with every Latin letter in turn.
pub fn spread_members(count: usize) -> Vec<MemberSignal> {
    (0..count)
        .map(|i| {
            let name = format!("{}{}{}", LATIN[i % 26], LATIN[(i / 26) % 26], i);
            member(1_000 + i as i64, &name, PresenceSignal::Online)
        })
        .collect()
}

/// Counts concurrently open result streams.
struct InFlight {
    current: Arc<AtomicUsize>,
}

impl InFlight {
    fn enter(current: &Arc<AtomicUsize>, peak: &AtomicUsize) -> Self {
        let now = current.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self {
            current: Arc::clone(current),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Directory backed by a fixed member list.
///
/// Search matches username, first or last name by case-insensitive prefix
/// and is capped like the real endpoint.
pub struct FakeDirectory {
    members: Vec<MemberSignal>,
    member_count: Option<u64>,
    probe_count: Result<u64, DirectoryError>,
    search_cap: usize,
    list_cap: usize,
    fail_listing: bool,
    item_delay: Duration,
    flood_after: HashMap<String, usize>,
    searches: Mutex<Vec<String>>,
    listings: AtomicUsize,
    in_flight: Arc<AtomicUsize>,
    peak: AtomicUsize,
}

impl FakeDirectory {
    pub fn new(members: Vec<MemberSignal>) -> Self {
        let count = members.len() as u64;
        Self {
            members,
            member_count: Some(count),
            probe_count: Ok(count),
            search_cap: 100,
            list_cap: usize::MAX,
            fail_listing: false,
            item_delay: Duration::ZERO,
            flood_after: HashMap::new(),
            searches: Mutex::new(Vec::new()),
            listings: AtomicUsize::new(0),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: AtomicUsize::new(0),
        }
    }

    pub fn with_member_count(mut self, count: Option<u64>) -> Self {
        self.member_count = count;
        self
    }

    pub fn with_probe_count(mut self, probe: Result<u64, DirectoryError>) -> Self {
        self.probe_count = probe;
        self
    }

    pub fn with_list_cap(mut self, cap: usize) -> Self {
        self.list_cap = cap;
        self
    }

    pub fn with_failing_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    pub fn with_item_delay(mut self, delay: Duration) -> Self {
        self.item_delay = delay;
        self
    }

    /// Make searches for `prefix` hit a flood wait after `streamed` results.
    pub fn with_flood_wait(mut self, prefix: &str, streamed: usize) -> Self {
        self.flood_after.insert(prefix.to_string(), streamed);
        self
    }

    /// Search prefixes in call order.
    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }

    pub fn search_count(&self, prefix: &str) -> usize {
        self.searches().iter().filter(|p| *p == prefix).count()
    }

    pub fn listings(&self) -> usize {
        self.listings.load(Ordering::SeqCst)
    }

    /// Most result streams ever open at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn matches(signal: &MemberSignal, prefix: &str) -> bool {
        let prefix = prefix.to_lowercase();
        [&signal.username, &signal.first_name, &signal.last_name]
            .into_iter()
            .flatten()
            .any(|name| name.to_lowercase().starts_with(&prefix))
    }

    fn stream_of(&self, items: Vec<Result<MemberSignal, DirectoryError>>) -> MemberStream<'_> {
        let guard = InFlight::enter(&self.in_flight, &self.peak);
        let delay = self.item_delay;
        Box::pin(stream::unfold(
            (items.into_iter(), guard),
            move |(mut items, guard)| async move {
                let item = items.next()?;
                if delay.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    tokio::time::sleep(delay).await;
                }
                Some((item, (items, guard)))
            },
        ))
    }
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn resolve_group(&self, group_id: GroupId) -> Result<GroupInfo, DirectoryError> {
        Ok(GroupInfo {
            title: format!("Group {group_id}"),
            member_count: self.member_count,
        })
    }

    async fn count_members(&self, _group_id: GroupId) -> Result<u64, DirectoryError> {
        self.probe_count.clone()
    }

    fn search_members(&self, _group_id: GroupId, prefix: &str) -> MemberStream<'_> {
        self.searches.lock().unwrap().push(prefix.to_string());

        let mut items: Vec<Result<MemberSignal, DirectoryError>> = self
            .members
            .iter()
            .filter(|m| Self::matches(m, prefix))
            .take(self.search_cap)
            .cloned()
            .map(Ok)
            .collect();

        if let Some(&streamed) = self.flood_after.get(prefix) {
            items.truncate(streamed);
            items.push(Err(DirectoryError::RateLimited {
                retry_after: Duration::from_millis(10),
            }));
        }

        self.stream_of(items)
    }

    fn list_members(&self, _group_id: GroupId) -> MemberStream<'_> {
        self.listings.fetch_add(1, Ordering::SeqCst);

        let mut items: Vec<Result<MemberSignal, DirectoryError>> = self
            .members
            .iter()
            .take(self.list_cap)
            .cloned()
            .map(Ok)
            .collect();

        if self.fail_listing {
            items.truncate(10);
            items.push(Err(DirectoryError::Transient("connection reset".to_string())));
        }

        self.stream_of(items)
    }
}

/// Sink that keeps every event it receives.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProgressSink for RecordingSink {
    async fn report(&self, event: &ProgressEvent) -> Result<(), CrawlError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}
