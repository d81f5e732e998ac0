//! Background path simplification.
//!
//! Very long pen strokes are committed as drawn and handed to a worker
//! thread. Results come back over a channel and are applied through the
//! normal store mutation path, but only if the stroke still exists and still
//! holds the exact points that were submitted.

use board_core::geometry::Point;
use board_core::id::ElementId;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

/// Perpendicular distance from `p` to the line through `a` and `b`.
fn perp_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = dx.hypot(dy);
    if len < 1e-12 {
        return p.distance(a);
    }
    (dy * (p.x - a.x) - dx * (p.y - a.y)).abs() / len
}

/// Ramer–Douglas–Peucker polyline simplification. Endpoints are always kept.
///
/// Spans still to split live on an explicit stack, so input length never
/// bounds the worker's call depth.
pub fn simplify_path(points: &[Point], tolerance: f64) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;
    let mut spans = vec![(0, points.len() - 1)];
    while let Some((lo, hi)) = spans.pop() {
        let (a, b) = (points[lo], points[hi]);
        let mut max_dist = 0.0;
        let mut max_idx = lo;
        for (i, p) in points.iter().enumerate().take(hi).skip(lo + 1) {
            let d = perp_distance(*p, a, b);
            if d > max_dist {
                max_dist = d;
                max_idx = i;
            }
        }
        if max_idx > lo && max_dist > tolerance {
            keep[max_idx] = true;
            spans.push((lo, max_idx));
            spans.push((max_idx, hi));
        }
    }
    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimplifyJob {
    pub id: ElementId,
    /// World points as committed; used to detect a stale result.
    pub original: Vec<Point>,
    pub tolerance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimplifyResult {
    pub id: ElementId,
    pub original: Vec<Point>,
    pub simplified: Vec<Point>,
}

/// One long-lived thread draining a job queue.
///
/// Dropping the worker closes the queue and joins the thread.
#[derive(Debug)]
pub struct SimplifyWorker {
    jobs: Option<Sender<SimplifyJob>>,
    results: Receiver<SimplifyResult>,
    handle: Option<JoinHandle<()>>,
    pending: usize,
}

impl SimplifyWorker {
    pub fn spawn() -> Self {
        let (job_tx, job_rx) = mpsc::channel::<SimplifyJob>();
        let (res_tx, res_rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("board-simplify".into())
            .spawn(move || {
                for job in job_rx {
                    let simplified = simplify_path(&job.original, job.tolerance);
                    let result = SimplifyResult {
                        id: job.id,
                        original: job.original,
                        simplified,
                    };
                    if res_tx.send(result).is_err() {
                        break;
                    }
                }
            });
        let handle = match handle {
            Ok(h) => Some(h),
            Err(err) => {
                log::warn!("simplify worker failed to start: {err}");
                None
            }
        };
        Self {
            jobs: Some(job_tx),
            results: res_rx,
            handle,
            pending: 0,
        }
    }

    /// Queue a job. Without a running thread the job runs inline and its
    /// result is returned directly.
    pub fn submit(&mut self, job: SimplifyJob) -> Option<SimplifyResult> {
        if self.handle.is_some()
            && let Some(tx) = &self.jobs
        {
            match tx.send(job) {
                Ok(()) => {
                    self.pending += 1;
                    return None;
                }
                Err(mpsc::SendError(job)) => return Some(Self::run_inline(job)),
            }
        }
        Some(Self::run_inline(job))
    }

    fn run_inline(job: SimplifyJob) -> SimplifyResult {
        SimplifyResult {
            simplified: simplify_path(&job.original, job.tolerance),
            id: job.id,
            original: job.original,
        }
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Results that have arrived, without blocking.
    pub fn try_results(&mut self) -> Vec<SimplifyResult> {
        let out: Vec<SimplifyResult> = self.results.try_iter().collect();
        self.pending = self.pending.saturating_sub(out.len());
        out
    }

    /// Block until every queued job has reported back.
    pub fn wait_all(&mut self) -> Vec<SimplifyResult> {
        let mut out = Vec::with_capacity(self.pending);
        while self.pending > 0 {
            match self.results.recv() {
                Ok(r) => {
                    self.pending -= 1;
                    out.push(r);
                }
                Err(_) => {
                    self.pending = 0;
                }
            }
        }
        out
    }
}

impl Drop for SimplifyWorker {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            log::warn!("simplify worker panicked");
        }
    }
}
