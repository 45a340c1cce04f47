//! Proof-of-work nonce scan.
//!
//! The scan visits nonces `0, 1, 2, ...` in order, hashes
//! `fingerprint ++ decimal(nonce)` and accepts digests below the difficulty
//! threshold until `pool_size` candidates are accepted. With more than one
//! thread the nonce space is split into fixed-size blocks; the collector only
//! counts acceptances below the contiguous prefix of finished blocks, so the
//! result is the same as the single-threaded scan.
use crate::difficulty::Difficulty;
use crate::error::{Error, Result};
use crate::stream::{BlockSource, StopFlag};
use crate::types::{Candidate, CandidatePool, Fingerprint};
use crate::HashAlgorithm;
use derive_builder::Builder;
use flume::{Receiver, Sender};
use std::collections::BTreeMap;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, info, trace};

pub const DEFAULT_BLOCK_SIZE: u64 = 4096;

#[derive(Builder, Debug, Clone)]
#[builder(pattern = "owned")]
pub struct SearchEngine {
    pub difficulty: Difficulty,
    pub pool_size: usize,
    #[builder(default = "1")]
    pub threads: usize,
    #[builder(default)]
    pub algorithm: HashAlgorithm,
    #[builder(default = "DEFAULT_BLOCK_SIZE")]
    pub block_size: u64,
    /// Number of nonces hashed by the most recent search.
    #[builder(default = "Arc::new(AtomicU64::new(0))")]
    pub progress: Arc<AtomicU64>,
}

type BlockResult = Result<BlockReport, Error>;

#[derive(Debug)]
struct BlockReport {
    start: u64,
    accepted: Vec<Candidate>,
}

impl SearchEngine {
    fn validate(&self) -> Result<(), Error> {
        if self.pool_size == 0 {
            return Err(Error::InvalidConfig("pool_size must be >= 1".into()));
        }
        if self.threads == 0 {
            return Err(Error::InvalidConfig("threads must be >= 1".into()));
        }
        if self.block_size == 0 {
            return Err(Error::InvalidConfig("block_size must be >= 1".into()));
        }
        self.difficulty.check_for(self.algorithm)
    }

    /// Run the scan and return the first `pool_size` accepted candidates.
    pub fn search(&self, fingerprint: &Fingerprint) -> Result<CandidatePool> {
        self.validate()?;
        self.progress.store(0, Ordering::SeqCst);
        info!(
            fingerprint = %fingerprint,
            difficulty = %self.difficulty,
            pool_size = self.pool_size,
            threads = self.threads,
            algorithm = %self.algorithm,
            "searching for nonces"
        );

        let accepted = self.scan_from(fingerprint, 0)?;

        let mut pool = CandidatePool::with_capacity(self.pool_size)?;
        for candidate in accepted {
            pool.insert(candidate);
        }
        if let Some(winner) = pool.winner() {
            info!(
                nonce = winner.nonce,
                digest = %winner.digest,
                scanned = self.progress.load(Ordering::SeqCst),
                "found smallest digest"
            );
        }
        Ok(pool)
    }

    /// Scan `start..u64::MAX` until `pool_size` candidates are accepted.
    fn scan_from(&self, fingerprint: &Fingerprint, start: u64) -> Result<Vec<Candidate>> {
        if self.threads == 1 {
            self.scan_sequential(fingerprint, start)
        } else {
            self.scan_parallel(fingerprint, start)
        }
    }

    fn scan_sequential(&self, fingerprint: &Fingerprint, start: u64) -> Result<Vec<Candidate>> {
        let mut hasher = NonceHasher::new(self.algorithm, fingerprint);
        let mut accepted = Vec::with_capacity(self.pool_size);
        for nonce in start..u64::MAX {
            let digest = hasher.digest(nonce);
            self.progress.fetch_add(1, Ordering::Relaxed);
            if self.difficulty.admits(&digest) {
                debug!(nonce, digest = %digest, "accepted candidate");
                accepted.push(Candidate::new(digest, nonce));
                if accepted.len() == self.pool_size {
                    return Ok(accepted);
                }
            }
        }
        Err(Error::NonceOverflow)
    }

    fn scan_parallel(&self, fingerprint: &Fingerprint, start: u64) -> Result<Vec<Candidate>> {
        let blocks = Arc::new(BlockSource::new(start, self.block_size));
        let stop = Arc::new(StopFlag::new());
        let bound = (self.threads * 2).max(1);
        let (tx, rx): (Sender<BlockResult>, Receiver<BlockResult>) = flume::bounded(bound);
        let mut joins = Vec::with_capacity(self.threads);

        for worker in 0..self.threads {
            let ctx = WorkerCtx {
                algorithm: self.algorithm,
                fingerprint: fingerprint.clone(),
                difficulty: self.difficulty.clone(),
                blocks: blocks.clone(),
                stop: stop.clone(),
                progress: self.progress.clone(),
                tx: tx.clone(),
            };
            joins.push(thread::spawn(move || {
                trace!(worker, "worker started");
                worker_loop(ctx);
                trace!(worker, "worker stopped");
            }));
        }
        drop(tx);

        let collector = BlockCollector::new(start, self.block_size, self.pool_size);
        collect_blocks(rx, collector, &stop, joins)
    }
}

/// Feed block reports to `collector` until it fills, a worker fails, or every
/// sender is gone. Workers are always stopped and joined before returning.
fn collect_blocks(
    rx: Receiver<BlockResult>,
    mut collector: BlockCollector,
    stop: &StopFlag,
    joins: Vec<thread::JoinHandle<()>>,
) -> Result<Vec<Candidate>> {
    while let Ok(report) = rx.recv() {
        match report {
            Ok(report) => {
                if collector.push(report) {
                    stop.force_stop();
                    drain_and_join(rx, joins);
                    return Ok(collector.accepted);
                }
            }
            Err(err) => {
                stop.force_stop();
                drain_and_join(rx, joins);
                return Err(err);
            }
        }
    }

    stop.force_stop();
    join_handles(joins);
    Err(Error::ChannelClosed)
}

impl SearchEngineBuilder {
    fn validate(&self) -> Result<(), Error> {
        if self.difficulty.is_none() {
            return Err(Error::InvalidConfig("difficulty must be provided".into()));
        }
        if self.pool_size.unwrap_or(0) == 0 {
            return Err(Error::InvalidConfig("pool_size must be >= 1".into()));
        }
        if self.threads == Some(0) {
            return Err(Error::InvalidConfig("threads must be >= 1".into()));
        }
        if self.block_size == Some(0) {
            return Err(Error::InvalidConfig("block_size must be >= 1".into()));
        }
        Ok(())
    }

    pub fn build_validated(self) -> Result<SearchEngine, Error> {
        self.validate()?;
        let engine = self
            .build()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        engine.validate()?;
        Ok(engine)
    }
}

/// Digest a single candidate: `Hash(fingerprint ++ decimal(nonce))`, lowercase hex.
pub fn candidate_digest(algorithm: HashAlgorithm, fingerprint: &Fingerprint, nonce: u64) -> String {
    NonceHasher::new(algorithm, fingerprint).digest(nonce)
}

/// Reuses one buffer holding the fingerprint, appending each nonce in turn.
struct NonceHasher {
    algorithm: HashAlgorithm,
    buf: Vec<u8>,
    prefix_len: usize,
}

impl NonceHasher {
    fn new(algorithm: HashAlgorithm, fingerprint: &Fingerprint) -> Self {
        let mut buf = Vec::with_capacity(fingerprint.as_bytes().len() + 20);
        buf.extend_from_slice(fingerprint.as_bytes());
        Self {
            algorithm,
            prefix_len: buf.len(),
            buf,
        }
    }

    fn digest(&mut self, nonce: u64) -> String {
        self.buf.truncate(self.prefix_len);
        push_decimal(&mut self.buf, nonce);
        self.algorithm.hex_digest(&self.buf)
    }
}

fn push_decimal(buf: &mut Vec<u8>, mut n: u64) {
    let mut digits = [0u8; 20];
    let mut i = digits.len();
    loop {
        i -= 1;
        digits[i] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    buf.extend_from_slice(&digits[i..]);
}

struct WorkerCtx {
    algorithm: HashAlgorithm,
    fingerprint: Fingerprint,
    difficulty: Difficulty,
    blocks: Arc<BlockSource>,
    stop: Arc<StopFlag>,
    progress: Arc<AtomicU64>,
    tx: Sender<BlockResult>,
}

fn worker_loop(ctx: WorkerCtx) {
    let mut hasher = NonceHasher::new(ctx.algorithm, &ctx.fingerprint);
    while !ctx.stop.should_stop() {
        let Some(range) = ctx.blocks.fetch() else {
            let _ = ctx.tx.send(Err(Error::NonceOverflow));
            ctx.stop.force_stop();
            break;
        };
        let report = scan_block(&mut hasher, &ctx.difficulty, range.clone());
        ctx.progress
            .fetch_add(range.end - range.start, Ordering::Relaxed);
        if ctx.tx.send(Ok(report)).is_err() {
            ctx.stop.force_stop();
            break;
        }
    }
}

fn scan_block(hasher: &mut NonceHasher, difficulty: &Difficulty, range: Range<u64>) -> BlockReport {
    let start = range.start;
    let accepted = range
        .filter_map(|nonce| {
            let digest = hasher.digest(nonce);
            difficulty
                .admits(&digest)
                .then(|| Candidate::new(digest, nonce))
        })
        .collect();
    BlockReport { start, accepted }
}

/// Reassembles block reports into scan order.
struct BlockCollector {
    block_size: u64,
    needed: usize,
    watermark: u64,
    pending: BTreeMap<u64, Vec<Candidate>>,
    accepted: Vec<Candidate>,
}

impl BlockCollector {
    fn new(start: u64, block_size: u64, needed: usize) -> Self {
        Self {
            block_size,
            needed,
            watermark: start,
            pending: BTreeMap::new(),
            accepted: Vec::with_capacity(needed),
        }
    }

    /// Record a finished block; returns `true` once `needed` candidates lie
    /// below the watermark.
    fn push(&mut self, report: BlockReport) -> bool {
        self.pending.insert(report.start, report.accepted);
        while let Some(block) = self.pending.remove(&self.watermark) {
            for candidate in block {
                debug!(nonce = candidate.nonce, digest = %candidate.digest, "accepted candidate");
                self.accepted.push(candidate);
                if self.accepted.len() == self.needed {
                    return true;
                }
            }
            self.watermark = self.watermark.saturating_add(self.block_size);
        }
        false
    }
}

fn drain_and_join(rx: Receiver<BlockResult>, joins: Vec<thread::JoinHandle<()>>) {
    // Workers blocked on a full channel need the receiver gone to notice the stop.
    drop(rx);
    join_handles(joins);
}

fn join_handles(joins: Vec<thread::JoinHandle<()>>) {
    for handle in joins {
        let _ = handle.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FINGERPRINT: &str = "a1bb968b4a47cbcd5fa8691085dd3eb6ebc75f4b23a0f457472561f9d5853538";

    fn engine(difficulty: &str, pool_size: usize, threads: usize) -> SearchEngine {
        SearchEngineBuilder::default()
            .difficulty(Difficulty::new(difficulty).unwrap())
            .pool_size(pool_size)
            .threads(threads)
            .block_size(7)
            .build_validated()
            .expect("build engine")
    }

    fn fingerprint() -> Fingerprint {
        Fingerprint::new(FINGERPRINT).unwrap()
    }

    fn nonces(pool: &CandidatePool) -> Vec<u64> {
        let mut n: Vec<u64> = pool.iter().map(|c| c.nonce).collect();
        n.sort_unstable();
        n
    }

    #[test]
    fn push_decimal_matches_to_string() {
        for n in [0u64, 7, 10, 2275718, u64::MAX] {
            let mut buf = Vec::new();
            push_decimal(&mut buf, n);
            assert_eq!(buf, n.to_string().into_bytes());
        }
    }

    #[test]
    fn candidate_digest_matches_published_value() {
        let digest = candidate_digest(HashAlgorithm::Sha2_256, &fingerprint(), 2275718);
        assert_eq!(
            digest,
            "000002e7500efdf2398d79d41e72477400acb60d23b8ed26f4cea25fc7905de0"
        );
    }

    #[test]
    fn sequential_scan_takes_first_acceptances_in_order() {
        let pool = engine("1", 5, 1).search(&fingerprint()).unwrap();
        assert_eq!(nonces(&pool), vec![19, 23, 32, 77, 83]);
        let winner = pool.winner().unwrap();
        assert_eq!(winner.nonce, 23);
        assert_eq!(
            winner.digest,
            "0004f023b858de0771542a11d04d1c2dcb0e5823ee2377a73b35779a383e8a1c"
        );
    }

    #[test]
    fn progress_counts_scanned_nonces() {
        let e = engine("01", 3, 1);
        let pool = e.search(&fingerprint()).unwrap();
        assert_eq!(nonces(&pool), vec![23, 423, 512]);
        assert_eq!(e.progress.load(Ordering::SeqCst), 513);
    }

    #[test]
    fn every_accepted_digest_is_below_threshold() {
        let e = engine("0008", 2, 1);
        let pool = e.search(&fingerprint()).unwrap();
        assert_eq!(nonces(&pool), vec![23, 5699]);
        for candidate in pool.iter() {
            assert!(&candidate.digest[..4] < "0008");
        }
        assert_eq!(pool.winner().map(|w| w.nonce), Some(5699));
    }

    #[test]
    fn uppercase_threshold_digit_admits_only_decimal_digits() {
        let upper = engine("000F", 2, 1).search(&fingerprint()).unwrap();
        assert_eq!(nonces(&upper), vec![23, 5699]);
        assert_eq!(upper.winner().map(|w| w.nonce), Some(5699));

        let lower = engine("000f", 2, 1).search(&fingerprint()).unwrap();
        assert_eq!(nonces(&lower), vec![23, 3133]);
        assert_eq!(engine("000F", 2, 3).search(&fingerprint()).unwrap(), upper);
    }

    #[test]
    fn pool_size_one_stops_at_first_acceptance() {
        let e = engine("8", 1, 1);
        let pool = e.search(&fingerprint()).unwrap();
        assert_eq!(nonces(&pool), vec![1]);
        assert_eq!(e.progress.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn parallel_scan_matches_sequential_scan() {
        let expected = engine("1", 5, 1).search(&fingerprint()).unwrap();
        for threads in [2, 3, 8] {
            let pool = engine("1", 5, threads).search(&fingerprint()).unwrap();
            assert_eq!(pool, expected, "threads = {threads}");
        }
        let expected = engine("0008", 2, 1).search(&fingerprint()).unwrap();
        let pool = engine("0008", 2, 4).search(&fingerprint()).unwrap();
        assert_eq!(pool, expected);
    }

    #[test]
    fn sha3_scan_uses_selected_algorithm() {
        let e = SearchEngineBuilder::default()
            .difficulty(Difficulty::new("1").unwrap())
            .pool_size(4)
            .algorithm(HashAlgorithm::Sha3_256)
            .build_validated()
            .unwrap();
        let pool = e.search(&fingerprint()).unwrap();
        assert_eq!(nonces(&pool), vec![14, 26, 44, 69]);
        assert_eq!(
            pool.winner().unwrap().digest,
            "01d6ec37ead847dace1263b261e64f9fee1ab93ee806d4ed338f8aa8b5988d56"
        );
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let err = SearchEngineBuilder::default()
            .difficulty(Difficulty::new("1").unwrap())
            .pool_size(0)
            .build_validated()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = SearchEngineBuilder::default()
            .difficulty(Difficulty::new("1").unwrap())
            .pool_size(1)
            .threads(0)
            .build_validated()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));

        let err = SearchEngineBuilder::default()
            .difficulty(Difficulty::new(&"1".repeat(65)).unwrap())
            .pool_size(1)
            .build_validated()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn search_validates_before_scanning() {
        let mut e = engine("1", 1, 1);
        e.pool_size = 0;
        assert!(matches!(
            e.search(&fingerprint()),
            Err(Error::InvalidConfig(_))
        ));
        assert_eq!(e.progress.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn collector_waits_for_contiguous_blocks() {
        let mut collector = BlockCollector::new(0, 10, 2);
        assert!(!collector.push(BlockReport {
            start: 10,
            accepted: vec![Candidate::new("00", 12)],
        }));
        assert!(collector.accepted.is_empty());
        assert!(collector.push(BlockReport {
            start: 0,
            accepted: vec![Candidate::new("0f", 3)],
        }));
        let order: Vec<u64> = collector.accepted.iter().map(|c| c.nonce).collect();
        assert_eq!(order, vec![3, 12]);
    }

    #[test]
    fn sequential_scan_reports_overflow_at_end_of_nonce_space() {
        let e = engine("8", 100, 1);
        let err = e.scan_from(&fingerprint(), u64::MAX - 20).unwrap_err();
        assert!(matches!(err, Error::NonceOverflow));
        assert_eq!(e.progress.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn parallel_scan_reports_overflow_after_joining_workers() {
        let e = SearchEngineBuilder::default()
            .difficulty(Difficulty::new("8").unwrap())
            .pool_size(100)
            .threads(3)
            .block_size(4)
            .build_validated()
            .unwrap();
        let err = e.scan_from(&fingerprint(), u64::MAX - 20).unwrap_err();
        assert!(matches!(err, Error::NonceOverflow));
        // Every claimed block was scanned and counted before the workers were joined.
        assert_eq!(e.progress.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn collector_reports_closed_channel_when_senders_drop() {
        let (tx, rx) = flume::bounded::<BlockResult>(4);
        tx.send(Ok(BlockReport {
            start: 0,
            accepted: vec![Candidate::new("00", 1)],
        }))
        .unwrap();
        drop(tx);
        let stop = StopFlag::new();
        let err = collect_blocks(rx, BlockCollector::new(0, 10, 2), &stop, Vec::new()).unwrap_err();
        assert!(matches!(err, Error::ChannelClosed));
        assert!(stop.should_stop());
    }

    #[test]
    fn collector_stops_workers_on_error() {
        let (tx, rx) = flume::bounded::<BlockResult>(1);
        let stop = Arc::new(StopFlag::new());
        let worker_stop = stop.clone();
        let worker = thread::spawn(move || {
            let idle = || Ok(BlockReport { start: 1_000, accepted: Vec::new() });
            for _ in 0..3 {
                let _ = tx.send(idle());
            }
            let _ = tx.send(Err(Error::NonceOverflow));
            while !worker_stop.should_stop() {
                if tx.send(idle()).is_err() {
                    break;
                }
            }
        });
        let err = collect_blocks(rx, BlockCollector::new(0, 10, 2), &stop, vec![worker]).unwrap_err();
        assert!(matches!(err, Error::NonceOverflow));
        assert!(stop.should_stop());
    }
}
