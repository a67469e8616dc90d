//! In-process request statistics for the admin monitoring dashboard.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::{DashMap, DashSet};
use storyloft_api_types::{
    DailyActiveUsers, EndpointStats, ErrorEntry, MetricsSummary, SlowEndpoint,
};
use time::{Date, Duration, OffsetDateTime};
use uuid::Uuid;

use crate::application::error::ServiceError;
use crate::application::repos::UsersRepo;
use crate::application::sessions::Principal;

pub const DAU_HISTORY_DAYS: i64 = 7;
pub const DEFAULT_ERROR_CAPACITY: usize = 200;
const TOP_ENDPOINTS: usize = 10;

/// One finished request as seen by the HTTP layer.
#[derive(Debug, Clone)]
pub struct RequestSample {
    pub method: String,
    /// Route template, so ids do not multiply endpoints.
    pub endpoint: String,
    pub path: String,
    pub status: u16,
    pub duration_ms: f64,
    pub user_id: Option<Uuid>,
    pub at: OffsetDateTime,
}

#[derive(Debug, Default, Clone, Copy)]
struct EndpointTotals {
    count: u64,
    total_ms: f64,
    errors: u64,
}

pub struct RequestRecorder {
    total_requests: AtomicU64,
    total_errors: AtomicU64,
    status_codes: DashMap<u16, u64>,
    endpoints: DashMap<String, EndpointTotals>,
    daily_users: DashMap<Date, DashSet<Uuid>>,
    seen_users: DashSet<Uuid>,
    recent_errors: Mutex<VecDeque<ErrorEntry>>,
    error_capacity: usize,
}

impl Default for RequestRecorder {
    fn default() -> Self {
        Self::new(DEFAULT_ERROR_CAPACITY)
    }
}

impl RequestRecorder {
    pub fn new(error_capacity: usize) -> Self {
        Self {
            total_requests: AtomicU64::new(0),
            total_errors: AtomicU64::new(0),
            status_codes: DashMap::new(),
            endpoints: DashMap::new(),
            daily_users: DashMap::new(),
            seen_users: DashSet::new(),
            recent_errors: Mutex::new(VecDeque::with_capacity(error_capacity)),
            error_capacity: error_capacity.max(1),
        }
    }

    pub fn record(&self, sample: RequestSample) {
        let is_error = sample.status >= 400;
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if is_error {
            self.total_errors.fetch_add(1, Ordering::Relaxed);
        }
        *self.status_codes.entry(sample.status).or_insert(0) += 1;

        {
            let key = format!("{} {}", sample.method, sample.endpoint);
            let mut totals = self.endpoints.entry(key).or_default();
            totals.count += 1;
            totals.total_ms += sample.duration_ms;
            if is_error {
                totals.errors += 1;
            }
        }

        if let Some(user_id) = sample.user_id {
            let today = sample.at.date();
            self.daily_users.entry(today).or_default().insert(user_id);
            self.seen_users.insert(user_id);
            let cutoff = today - Duration::days(DAU_HISTORY_DAYS);
            self.daily_users.retain(|date, _| *date > cutoff);
        }

        if is_error {
            let mut errors = self
                .recent_errors
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if errors.len() == self.error_capacity {
                errors.pop_front();
            }
            errors.push_back(ErrorEntry {
                timestamp: sample.at,
                method: sample.method,
                path: sample.path,
                status_code: sample.status,
                duration: sample.duration_ms,
            });
        }
    }

    pub fn summary(&self, registered_users: u64, today: Date) -> MetricsSummary {
        let total_requests = self.total_requests.load(Ordering::Relaxed);
        let total_errors = self.total_errors.load(Ordering::Relaxed);

        let status_codes: BTreeMap<String, u64> = self
            .status_codes
            .iter()
            .map(|entry| (entry.key().to_string(), *entry.value()))
            .collect();

        let endpoints: Vec<(String, EndpointTotals)> = self
            .endpoints
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();

        let mut top_endpoints: Vec<EndpointStats> = endpoints
            .iter()
            .map(|(endpoint, totals)| EndpointStats {
                endpoint: endpoint.clone(),
                count: totals.count,
                avg_duration: average(totals.total_ms, totals.count),
                errors: totals.errors,
                error_rate: ratio(totals.errors, totals.count),
            })
            .collect();
        top_endpoints.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.endpoint.cmp(&b.endpoint)));
        top_endpoints.truncate(TOP_ENDPOINTS);

        let mut slowest_endpoints: Vec<SlowEndpoint> = endpoints
            .iter()
            .map(|(endpoint, totals)| SlowEndpoint {
                endpoint: endpoint.clone(),
                avg_duration: average(totals.total_ms, totals.count),
            })
            .collect();
        slowest_endpoints.sort_by(|a, b| b.avg_duration.total_cmp(&a.avg_duration));
        slowest_endpoints.truncate(TOP_ENDPOINTS);

        let dau_history = (0..DAU_HISTORY_DAYS)
            .rev()
            .map(|offset| {
                let date = today - Duration::days(offset);
                DailyActiveUsers {
                    date: date.to_string(),
                    users: self.active_on(date),
                }
            })
            .collect();

        MetricsSummary {
            total_requests,
            total_errors,
            error_rate: ratio(total_errors, total_requests),
            status_codes,
            top_endpoints,
            slowest_endpoints,
            daily_active_users: self.active_on(today),
            total_unique_users: self.seen_users.len() as u64,
            total_registered_users: registered_users,
            dau_history,
        }
    }

    /// Most recent first.
    pub fn recent_errors(&self, limit: usize) -> Vec<ErrorEntry> {
        let errors = self
            .recent_errors
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        errors.iter().rev().take(limit).cloned().collect()
    }

    fn active_on(&self, date: Date) -> u64 {
        self.daily_users
            .get(&date)
            .map(|users| users.len() as u64)
            .unwrap_or(0)
    }
}

fn average(total_ms: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        total_ms / count as f64
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[derive(Clone)]
pub struct MonitoringService {
    recorder: Arc<RequestRecorder>,
    users: Arc<dyn UsersRepo>,
}

impl MonitoringService {
    pub fn new(recorder: Arc<RequestRecorder>, users: Arc<dyn UsersRepo>) -> Self {
        Self { recorder, users }
    }

    pub fn recorder(&self) -> Arc<RequestRecorder> {
        self.recorder.clone()
    }

    pub async fn summary(&self, principal: &Principal) -> Result<MetricsSummary, ServiceError> {
        require_admin(principal)?;
        let registered = self.users.count_users().await?;
        Ok(self
            .recorder
            .summary(registered, OffsetDateTime::now_utc().date()))
    }

    pub fn recent_errors(
        &self,
        principal: &Principal,
        limit: Option<u32>,
    ) -> Result<Vec<ErrorEntry>, ServiceError> {
        require_admin(principal)?;
        let limit = limit.unwrap_or(50).clamp(1, 500) as usize;
        Ok(self.recorder.recent_errors(limit))
    }
}

fn require_admin(principal: &Principal) -> Result<(), ServiceError> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::forbidden("admin role required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample(endpoint: &str, status: u16, ms: f64, user: Option<u128>) -> RequestSample {
        RequestSample {
            method: "GET".to_string(),
            endpoint: endpoint.to_string(),
            path: endpoint.to_string(),
            status,
            duration_ms: ms,
            user_id: user.map(Uuid::from_u128),
            at: datetime!(2026-03-10 12:00 UTC),
        }
    }

    #[test]
    fn aggregates_requests_and_errors() {
        let recorder = RequestRecorder::new(2);
        recorder.record(sample("/api/stories", 200, 10.0, Some(1)));
        recorder.record(sample("/api/stories", 500, 30.0, Some(2)));
        recorder.record(sample("/api/videos", 404, 5.0, Some(1)));
        recorder.record(sample("/api/shots", 200, 1.0, None));

        let summary = recorder.summary(9, datetime!(2026-03-10 0:00 UTC).date());
        assert_eq!(summary.total_requests, 4);
        assert_eq!(summary.total_errors, 2);
        assert!((summary.error_rate - 0.5).abs() < f64::EPSILON);
        assert_eq!(summary.status_codes.get("200"), Some(&2));
        assert_eq!(summary.daily_active_users, 2);
        assert_eq!(summary.total_registered_users, 9);
        assert_eq!(summary.dau_history.len(), DAU_HISTORY_DAYS as usize);

        let top = &summary.top_endpoints[0];
        assert_eq!(top.endpoint, "GET /api/stories");
        assert!((top.avg_duration - 20.0).abs() < f64::EPSILON);
        assert_eq!(summary.slowest_endpoints[0].endpoint, "GET /api/stories");
    }

    #[test]
    fn error_ring_keeps_newest_entries() {
        let recorder = RequestRecorder::new(2);
        recorder.record(sample("/a", 500, 1.0, None));
        recorder.record(sample("/b", 500, 1.0, None));
        recorder.record(sample("/c", 500, 1.0, None));

        let paths: Vec<String> = recorder
            .recent_errors(10)
            .into_iter()
            .map(|entry| entry.path)
            .collect();
        assert_eq!(paths, vec!["/c".to_string(), "/b".to_string()]);
    }
}
