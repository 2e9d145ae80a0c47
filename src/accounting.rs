//! # 请求统计
//!
//! 可选的诊断通道：记录每个请求的耗时、状态码和响应大小，并提供汇总快照。
//! 启动时构造一次，以 `Arc<Accounting>` 的形式传给所有请求处理器。
//! 关闭时 [`Accounting::record`] 只是一次分支判断，不加锁也不分配内存。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// 快照默认返回的最近请求条数
pub const DEFAULT_RECENT_LIMIT: usize = 10;

/// 默认的统计输出间隔
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(60);

/// 单条请求记录
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLogEntry {
    pub timestamp: DateTime<Utc>,
    pub url: String,
    #[serde(rename = "durationMs", serialize_with = "serialize_millis")]
    pub duration: Duration,
    pub status_code: u16,
    pub response_size: u64,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

#[derive(Debug, Default)]
struct Ledger {
    request_count: u64,
    bytes_processed: u64,
    log: Vec<RequestLogEntry>,
}

/// 统计快照
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub uptime: String,
    pub uptime_seconds: u64,
    pub request_count: u64,
    pub bytes_processed: u64,
    pub last_requests: Vec<RequestLogEntry>,
    pub workers: usize,
    #[serde(rename = "memoryUsageMB")]
    pub memory_usage_mb: Option<f64>,
}

/// Process-wide request accounting.
///
/// All counters and the log live behind one mutex; the periodic reporter
/// takes the same lock as request-time writers.
#[derive(Debug)]
pub struct Accounting {
    enabled: bool,
    recent_limit: usize,
    started: Instant,
    in_flight: AtomicUsize,
    ledger: Mutex<Ledger>,
}

impl Accounting {
    pub fn new(enabled: bool, recent_limit: usize) -> Self {
        Accounting {
            enabled,
            recent_limit: recent_limit.max(1),
            started: Instant::now(),
            in_flight: AtomicUsize::new(0),
            ledger: Mutex::new(Ledger::default()),
        }
    }

    pub fn disabled() -> Self {
        Accounting::new(false, DEFAULT_RECENT_LIMIT)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 记录一次请求
    pub fn record(&self, entry: RequestLogEntry) {
        if !self.enabled {
            return;
        }

        tracing::debug!(
            url = %entry.url,
            duration = ?entry.duration,
            status = entry.status_code,
            size = entry.response_size,
            "request recorded"
        );

        let mut ledger = self.lock();
        ledger.request_count += 1;
        ledger.bytes_processed += entry.response_size;
        ledger.log.push(entry);
    }

    /// Marks a request handler as live until the returned guard is dropped.
    pub fn track_in_flight(&self) -> Option<InFlightGuard<'_>> {
        if !self.enabled {
            return None;
        }

        self.in_flight.fetch_add(1, Ordering::Relaxed);
        Some(InFlightGuard { accounting: self })
    }

    /// 获取统计快照，最近请求数量被限制在 `recent_limit` 以内
    pub fn snapshot(&self) -> StatsSnapshot {
        let uptime = self.started.elapsed();
        let ledger = self.lock();
        let start = ledger.log.len().saturating_sub(self.recent_limit);

        StatsSnapshot {
            uptime: format_uptime(uptime),
            uptime_seconds: uptime.as_secs(),
            request_count: ledger.request_count,
            bytes_processed: ledger.bytes_processed,
            last_requests: ledger.log[start..].to_vec(),
            workers: self.in_flight.load(Ordering::Relaxed),
            memory_usage_mb: resident_memory_mb(),
        }
    }

    /// 输出一次人类可读的统计摘要
    pub fn tick(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }

        let snapshot = self.snapshot();
        let memory = snapshot
            .memory_usage_mb
            .map(|mb| format!("{:.2} MB", mb))
            .unwrap_or_else(|| "unavailable".to_string());

        let summary = format!(
            "=== Debug Statistics ===\n\
             Uptime: {}\n\
             Total Requests: {}\n\
             Total Bytes Processed: {:.2} MB\n\
             Memory Usage: {}\n\
             Live Workers: {}\n\
             ========================",
            snapshot.uptime,
            snapshot.request_count,
            snapshot.bytes_processed as f64 / 1024.0 / 1024.0,
            memory,
            snapshot.workers,
        );

        tracing::info!("\n{}", summary);
        Some(summary)
    }

    /// Spawns the periodic reporter on the current tokio runtime.
    pub fn spawn_reporter(
        self: &std::sync::Arc<Self>,
        every: Duration,
    ) -> Option<tokio::task::JoinHandle<()>> {
        if !self.enabled {
            return None;
        }

        let accounting = std::sync::Arc::clone(self);
        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            // 第一次 tick 会立即完成
            interval.tick().await;
            loop {
                interval.tick().await;
                accounting.tick();
            }
        }))
    }

    fn lock(&self) -> MutexGuard<'_, Ledger> {
        // a panicked writer cannot leave the counters half-updated
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// 在途请求计数守卫
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    accounting: &'a Accounting,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.accounting.in_flight.fetch_sub(1, Ordering::Relaxed);
    }
}

fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);

    if h > 0 {
        format!("{}h{}m{}s", h, m, s)
    } else if m > 0 {
        format!("{}m{}s", m, s)
    } else {
        format!("{:.3}s", uptime.as_secs_f64())
    }
}

/// Resident set size of this process, read from `/proc/self/status`.
fn resident_memory_mb() -> Option<f64> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|l| l.starts_with("VmRSS:"))?;
    let kb: f64 = line.split_whitespace().nth(1)?.parse().ok()?;
    Some(kb / 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(url: &str, size: u64) -> RequestLogEntry {
        RequestLogEntry {
            timestamp: Utc::now(),
            url: url.to_string(),
            duration: Duration::from_millis(12),
            status_code: 200,
            response_size: size,
        }
    }

    #[test]
    fn disabled_accounting_records_nothing() {
        let accounting = Accounting::disabled();
        let before = accounting.snapshot();

        accounting.record(entry("/?url=a.com", 100));
        let after = accounting.snapshot();

        assert_eq!(before.request_count, 0);
        assert_eq!(after.request_count, 0);
        assert_eq!(after.bytes_processed, 0);
        assert!(after.last_requests.is_empty());
        assert!(accounting.tick().is_none());
        assert!(accounting.track_in_flight().is_none());
    }

    #[test]
    fn snapshot_clamps_to_available_entries() {
        let accounting = Accounting::new(true, DEFAULT_RECENT_LIMIT);

        for i in 0..3 {
            accounting.record(entry(&format!("/r{}", i), 10));
        }
        let snapshot = accounting.snapshot();

        assert_eq!(snapshot.request_count, 3);
        assert_eq!(snapshot.bytes_processed, 30);
        assert_eq!(snapshot.last_requests.len(), 3);
    }

    #[test]
    fn snapshot_keeps_most_recent_entries() {
        let accounting = Accounting::new(true, DEFAULT_RECENT_LIMIT);

        for i in 0..25u64 {
            accounting.record(entry(&format!("/r{}", i), i));
        }
        let snapshot = accounting.snapshot();

        assert_eq!(snapshot.request_count, 25);
        assert_eq!(snapshot.bytes_processed, (0..25).sum::<u64>());
        assert_eq!(snapshot.last_requests.len(), 10);
        assert_eq!(snapshot.last_requests[0].url, "/r15");
        assert_eq!(snapshot.last_requests[9].url, "/r24");
    }

    #[test]
    fn in_flight_guard_tracks_live_workers() {
        let accounting = Accounting::new(true, DEFAULT_RECENT_LIMIT);

        let first = accounting.track_in_flight();
        let second = accounting.track_in_flight();
        assert_eq!(accounting.snapshot().workers, 2);

        drop(first);
        drop(second);
        assert_eq!(accounting.snapshot().workers, 0);
    }

    #[test]
    fn tick_reports_summary() {
        let accounting = Accounting::new(true, DEFAULT_RECENT_LIMIT);
        accounting.record(entry("/", 2 * 1024 * 1024));

        let summary = accounting.tick().unwrap();
        assert!(summary.contains("Total Requests: 1"));
        assert!(summary.contains("Total Bytes Processed: 2.00 MB"));
    }

    #[cfg(feature = "web")]
    #[test]
    fn stats_serialize_with_expected_keys() {
        let accounting = Accounting::new(true, DEFAULT_RECENT_LIMIT);
        accounting.record(entry("/", 1));

        let value = serde_json::to_value(accounting.snapshot()).unwrap();
        for key in [
            "uptime",
            "uptimeSeconds",
            "requestCount",
            "bytesProcessed",
            "lastRequests",
            "workers",
            "memoryUsageMB",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["lastRequests"][0]["statusCode"], 200);
    }
}
