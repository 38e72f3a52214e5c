//! 分批并发调度
//!
//! 每批最多启动 `batch_size` 个探测任务，等这一批全部结束后
//! 才开始下一批，批与批之间可以插入固定延迟。

use std::future::Future;
use std::io;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::probe::ProbeOutcome;

// 预分配上限，批大小由用户给出
const MAX_PREALLOC: usize = 1024;

/// 扫描统计
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// 已完成的批次数
    pub batches: usize,
    /// 已完成的探测数（含未解析）
    pub probed: usize,
    /// 状态码非404的数量
    pub found: usize,
    /// 返回404的数量
    pub not_found: usize,
    /// 传输失败或任务异常的数量
    pub unresolved: usize,
    /// 总耗时
    pub elapsed: Duration,
}

impl ScanStats {
    fn record(&mut self, outcome: &ProbeOutcome) {
        self.probed += 1;
        match outcome {
            ProbeOutcome::Responded(result) if result.recognized => self.found += 1,
            ProbeOutcome::Responded(_) => self.not_found += 1,
            ProbeOutcome::Unresolved { .. } => self.unresolved += 1,
        }
    }
}

/// 批次调度器
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    batch_size: usize,
    delay: Duration,
}

impl BatchScheduler {
    /// `batch_size` 为0时按1处理
    pub fn new(batch_size: usize, delay: Duration) -> Self {
        BatchScheduler {
            batch_size: batch_size.max(1),
            delay,
        }
    }

    /// 每批最多并发的任务数
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// 按批消费候选并等待全部探测结束
    ///
    /// 候选源只在这里被逐个读取，不会整体载入内存。读取出错时先等当前批次
    /// 结束，再返回错误。
    ///
    /// 候选源在调用方的任务里同步迭代，文件读取会短暂占用运行时线程；
    /// 每批只读 `batch_size` 行，且已启动的任务可以在其他工作线程上继续。
    pub async fn run<I, F, Fut>(&self, candidates: I, probe: F) -> io::Result<ScanStats>
    where
        I: IntoIterator<Item = io::Result<String>>,
        F: Fn(String) -> Fut,
        Fut: Future<Output = ProbeOutcome> + Send + 'static,
    {
        let start = Instant::now();
        let mut candidates = candidates.into_iter().peekable();
        let mut stats = ScanStats::default();
        let mut batch: Vec<JoinHandle<ProbeOutcome>> = Vec::with_capacity(self.batch_size.min(MAX_PREALLOC));
        let mut read_error = None;

        loop {
            while batch.len() < self.batch_size {
                match candidates.next() {
                    Some(Ok(candidate)) => batch.push(tokio::spawn(probe(candidate))),
                    Some(Err(e)) => {
                        read_error = Some(e);
                        break;
                    }
                    None => break,
                }
            }

            if batch.is_empty() {
                break;
            }

            stats.batches += 1;
            log::debug!("第 {} 批: {} 个请求", stats.batches, batch.len());
            self.join_batch(&mut batch, &mut stats).await;

            if read_error.is_some() || candidates.peek().is_none() {
                break;
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }

        stats.elapsed = start.elapsed();
        match read_error {
            Some(e) => Err(e),
            None => Ok(stats),
        }
    }

    async fn join_batch(&self, batch: &mut Vec<JoinHandle<ProbeOutcome>>, stats: &mut ScanStats) {
        for handle in batch.drain(..) {
            match handle.await {
                Ok(outcome) => stats.record(&outcome),
                Err(e) => {
                    log::error!("探测任务异常退出: {}", e);
                    stats.probed += 1;
                    stats.unresolved += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::ProbeResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn words(n: usize) -> Vec<io::Result<String>> {
        (0..n).map(|i| Ok(format!("w{}", i))).collect()
    }

    fn responded(candidate: String, status: u16) -> ProbeOutcome {
        let target = format!("{}.example.com", candidate);
        ProbeOutcome::Responded(ProbeResult::new(candidate, target, status))
    }

    #[tokio::test]
    async fn test_batch_count_is_ceiling() {
        for (count, size) in [(0, 3), (1, 3), (3, 3), (4, 3), (10, 1), (10, 4), (7, 10)] {
            let scheduler = BatchScheduler::new(size, Duration::ZERO);
            let stats = scheduler
                .run(words(count), |c| async move { responded(c, 404) })
                .await
                .unwrap();
            assert_eq!(stats.batches, count.div_ceil(size), "C={} B={}", count, size);
            assert_eq!(stats.probed, count);
            assert_eq!(stats.not_found, count);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_in_flight_never_exceeds_batch_size() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let scheduler = BatchScheduler::new(3, Duration::ZERO);

        let stats = scheduler
            .run(words(20), |c| {
                let in_flight = in_flight.clone();
                let peak = peak.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    responded(c, 200)
                }
            })
            .await
            .unwrap();

        assert_eq!(stats.batches, 7);
        assert_eq!(stats.found, 20);
        let peak = peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "peak in-flight {}", peak);
        assert!(peak > 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_batch_barrier() {
        let spans: Arc<Mutex<Vec<(usize, Instant, Instant)>>> = Arc::default();
        let scheduler = BatchScheduler::new(4, Duration::ZERO);

        scheduler
            .run(words(12), |c| {
                let spans = spans.clone();
                async move {
                    let index: usize = c[1..].parse().unwrap();
                    let started = Instant::now();
                    // 同批内耗时不同
                    tokio::time::sleep(Duration::from_millis(5 + (index % 4) as u64 * 10)).await;
                    spans.lock().unwrap().push((index / 4, started, Instant::now()));
                    responded(c, 404)
                }
            })
            .await
            .unwrap();

        let spans = spans.lock().unwrap();
        assert_eq!(spans.len(), 12);
        for &(batch, started, _) in spans.iter() {
            for &(earlier, _, finished) in spans.iter().filter(|s| s.0 < batch) {
                assert!(started >= finished, "batch {} started before batch {} finished", batch, earlier);
            }
        }
    }

    #[tokio::test]
    async fn test_delay_only_between_batches() {
        let scheduler = BatchScheduler::new(2, Duration::from_millis(50));
        let stats = scheduler
            .run(words(6), |c| async move { responded(c, 404) })
            .await
            .unwrap();

        assert_eq!(stats.batches, 3);
        // 3批之间只有2次延迟
        assert!(stats.elapsed >= Duration::from_millis(100));
        assert!(stats.elapsed < Duration::from_millis(150) + Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_panicking_probe_does_not_abort_run() {
        let scheduler = BatchScheduler::new(2, Duration::ZERO);
        let stats = scheduler
            .run(words(5), |c| async move {
                if c == "w2" {
                    panic!("boom");
                }
                responded(c, 200)
            })
            .await
            .unwrap();

        assert_eq!(stats.batches, 3);
        assert_eq!(stats.probed, 5);
        assert_eq!(stats.found, 4);
        assert_eq!(stats.unresolved, 1);
    }

    #[tokio::test]
    async fn test_unresolved_outcome_counted() {
        let scheduler = BatchScheduler::new(10, Duration::ZERO);
        let stats = scheduler
            .run(words(3), |c| async move {
                if c == "w1" {
                    ProbeOutcome::Unresolved {
                        target: format!("{}.example.com", c),
                        candidate: c,
                        reason: "请求超时".to_string(),
                    }
                } else {
                    responded(c, 404)
                }
            })
            .await
            .unwrap();

        assert_eq!(stats.batches, 1);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.not_found, 2);
    }

    #[tokio::test]
    async fn test_read_error_drains_batch_then_fails() {
        let done = Arc::new(AtomicUsize::new(0));
        let source = vec![
            Ok("a".to_string()),
            Ok("b".to_string()),
            Err(io::Error::new(io::ErrorKind::InvalidData, "bad utf-8")),
            Ok("c".to_string()),
        ];
        let scheduler = BatchScheduler::new(5, Duration::ZERO);

        let err = scheduler
            .run(source, |c| {
                let done = done.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    done.fetch_add(1, Ordering::SeqCst);
                    responded(c, 404)
                }
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(done.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_huge_batch_size_does_not_preallocate() {
        let scheduler = BatchScheduler::new(usize::MAX, Duration::ZERO);
        let stats = scheduler
            .run(vec![Ok("www".to_string())], |c| async move { responded(c, 200) })
            .await
            .unwrap();

        assert_eq!(stats.batches, 1);
        assert_eq!(stats.probed, 1);
        assert_eq!(stats.found, 1);
    }

    #[test]
    fn test_zero_batch_size_clamped() {
        assert_eq!(BatchScheduler::new(0, Duration::ZERO).batch_size(), 1);
    }
}
