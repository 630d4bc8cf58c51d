//! The cached "current session" and the values derived from it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use log::{debug, info};
use parking_lot::Mutex;

use crate::api;
use crate::credentials::CredentialStore;
use crate::error::VoteError;
use crate::models::{SessionId, VotingSession};

/// Notified whenever the cached session is replaced by a different one.
pub trait SessionObserver: Send + Sync {
    fn session_changed(&self, previous: Option<SessionId>, current: Option<&VotingSession>);
}

#[derive(Default)]
struct DirectoryState {
    current: Option<VotingSession>,
    has_voted: bool,
}

pub struct SessionDirectory {
    credentials: Arc<CredentialStore>,
    state: Mutex<DirectoryState>,
    issued: AtomicU64,
    observers: Vec<Arc<dyn SessionObserver>>,
}

impl SessionDirectory {
    pub fn new(credentials: Arc<CredentialStore>) -> Self {
        Self {
            credentials,
            state: Mutex::new(DirectoryState::default()),
            issued: AtomicU64::new(0),
            observers: Vec::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Fetches the current session and caches it.
    ///
    /// If another fetch (or an invalidation) was issued meanwhile, the late
    /// result is dropped and [`VoteError::Superseded`] is returned.
    pub async fn fetch_current(&self) -> Result<Option<VotingSession>, VoteError> {
        let ticket = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let fetched = api::session::get_current_session(&self.credentials).await?;

        if self.issued.load(Ordering::SeqCst) != ticket {
            debug!("Discarding superseded session fetch #{}", ticket);
            return Err(VoteError::Superseded);
        }
        self.replace(fetched.clone());
        Ok(fetched)
    }

    /// Drops the cached session and any fetch still in flight.
    pub fn invalidate(&self) {
        self.issued.fetch_add(1, Ordering::SeqCst);
        self.replace(None);
    }

    pub fn current(&self) -> Option<VotingSession> {
        self.state.lock().current.clone()
    }

    pub fn current_id(&self) -> Option<SessionId> {
        self.state.lock().current.as_ref().map(|s| s.session_id)
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().current.as_ref().is_some_and(|s| s.active)
    }

    pub fn has_voted(&self) -> bool {
        self.state.lock().has_voted
    }

    /// Records a server-confirmed submission for `session_id`.
    pub fn mark_voted(&self, session_id: SessionId) {
        let mut state = self.state.lock();
        if state.current.as_ref().map(|s| s.session_id) == Some(session_id) {
            state.has_voted = true;
        }
    }

    pub fn days_remaining(&self, now: NaiveDateTime) -> Option<u32> {
        self.state
            .lock()
            .current
            .as_ref()
            .map(|s| days_remaining(s.end_date, now))
    }

    pub fn human_remaining(&self, now: NaiveDateTime) -> Option<String> {
        self.days_remaining(now).map(human_remaining)
    }

    pub fn formatted_range(&self) -> Option<String> {
        self.state.lock().current.as_ref().map(formatted_range)
    }

    fn replace(&self, next: Option<VotingSession>) {
        let (previous, changed) = {
            let mut state = self.state.lock();
            let previous = state.current.take();
            let changed = is_change(previous.as_ref(), next.as_ref());
            let server_voted = next.as_ref().is_some_and(|s| s.has_voted);
            state.has_voted = if changed {
                server_voted
            } else {
                state.has_voted || server_voted
            };
            state.current = next.clone();
            (previous.map(|s| s.session_id), changed)
        };

        if changed {
            info!(
                "Current session changed: {:?} -> {:?}",
                previous,
                next.as_ref().map(|s| s.session_id)
            );
            for observer in &self.observers {
                observer.session_changed(previous, next.as_ref());
            }
        }
    }
}

fn is_change(previous: Option<&VotingSession>, next: Option<&VotingSession>) -> bool {
    match (previous, next) {
        (None, None) => false,
        (Some(prev), Some(next)) => {
            prev.session_id != next.session_id || (prev.active && !next.active)
        }
        _ => true,
    }
}

/// Whole days left until the end of `end_date`, rounded up, never negative.
pub fn days_remaining(end_date: NaiveDate, now: NaiveDateTime) -> u32 {
    let end_of_day = end_date.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::milliseconds(1);
    let left_ms = (end_of_day - now).num_milliseconds();
    if left_ms <= 0 {
        return 0;
    }
    let day_ms = Duration::days(1).num_milliseconds();
    ((left_ms + day_ms - 1) / day_ms) as u32
}

pub fn human_remaining(days: u32) -> String {
    match days {
        0 => "ended".to_string(),
        1 => "1 day".to_string(),
        2..=6 => format!("{} days", days),
        _ => format!("{} weeks", days.div_ceil(7)),
    }
}

pub fn formatted_range(session: &VotingSession) -> String {
    format!(
        "{} - {}",
        session.start_date.format("%d.%m.%Y"),
        session.end_date.format("%d.%m.%Y")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn session(id: SessionId, active: bool) -> VotingSession {
        VotingSession {
            session_id: id,
            start_date: date("2025-03-03"),
            end_date: date("2025-03-09"),
            active,
            current_user_can_vote: true,
            has_voted: false,
        }
    }

    #[test]
    fn days_remaining_counts_to_end_of_day() {
        let end = date("2025-03-09");
        assert_eq!(days_remaining(end, at("2025-03-09", "08:00:00")), 1);
        assert_eq!(days_remaining(end, at("2025-03-08", "23:59:59")), 2);
        assert_eq!(days_remaining(end, at("2025-03-08", "00:00:00")), 2);
        assert_eq!(days_remaining(end, at("2025-03-01", "12:00:00")), 9);
    }

    #[test]
    fn days_remaining_is_clamped() {
        let end = date("2025-03-09");
        assert_eq!(days_remaining(end, at("2025-03-10", "00:00:00")), 0);
        assert_eq!(days_remaining(end, at("2025-04-01", "00:00:00")), 0);
    }

    #[test]
    fn human_remaining_buckets() {
        assert_eq!(human_remaining(0), "ended");
        assert_eq!(human_remaining(1), "1 day");
        assert_eq!(human_remaining(2), "2 days");
        assert_eq!(human_remaining(6), "6 days");
        assert_eq!(human_remaining(7), "1 weeks");
        assert_eq!(human_remaining(8), "2 weeks");
        assert_eq!(human_remaining(14), "2 weeks");
        assert_eq!(human_remaining(15), "3 weeks");
    }

    #[test]
    fn formats_range() {
        assert_eq!(formatted_range(&session(1, true)), "03.03.2025 - 09.03.2025");
    }

    #[test]
    fn change_detection() {
        let one = session(1, true);
        assert!(!is_change(None, None));
        assert!(is_change(None, Some(&one)));
        assert!(is_change(Some(&one), None));
        assert!(!is_change(Some(&one), Some(&one)));
        assert!(is_change(Some(&one), Some(&session(2, true))));
        assert!(is_change(Some(&one), Some(&session(1, false))));
        assert!(!is_change(Some(&session(1, false)), Some(&one)));
    }

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl SessionObserver for Counter {
        fn session_changed(&self, _: Option<SessionId>, _: Option<&VotingSession>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn directory(counter: Arc<Counter>) -> SessionDirectory {
        let api = api::ApiClient::new(&crate::config::ApiConfig::default()).unwrap();
        SessionDirectory::new(Arc::new(CredentialStore::new(api, None))).with_observer(counter)
    }

    #[test]
    fn observers_fire_only_on_change() {
        let counter = Arc::new(Counter::default());
        let directory = directory(counter.clone());

        directory.replace(Some(session(1, true)));
        directory.replace(Some(session(1, true)));
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);

        directory.replace(Some(session(2, true)));
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);

        directory.invalidate();
        assert_eq!(counter.0.load(Ordering::SeqCst), 3);
        assert!(directory.current().is_none());
    }

    #[test]
    fn voted_flag_resets_with_session() {
        let directory = directory(Arc::new(Counter::default()));
        directory.replace(Some(session(1, true)));
        directory.mark_voted(2);
        assert!(!directory.has_voted());

        directory.mark_voted(1);
        assert!(directory.has_voted());
        directory.replace(Some(session(1, true)));
        assert!(directory.has_voted());

        directory.replace(Some(session(2, true)));
        assert!(!directory.has_voted());

        let mut voted = session(3, true);
        voted.has_voted = true;
        directory.replace(Some(voted));
        assert!(directory.has_voted());
    }
}
