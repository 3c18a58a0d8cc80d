//! Per-instance run orchestration: discover, filter, sample, dispatch, record.

use std::path::Path;

use log::{debug, error, info};
use rand::{rngs::StdRng, RngExt, SeedableRng};

use crate::config::InstanceConfig;
use crate::providers::{CandidateKind, SearchCandidate, SearchProvider};
use crate::rate_limiter::RateLimiter;
use crate::search_history::JsonSearchHistoryStore;

/// Search commands carry at most this many item ids each.
const SEARCH_BATCH_SIZE: usize = 5;

/// Owns everything needed to run one configured instance: the provider, the
/// optional search history, the rate limiter, and a seeded RNG for sampling.
pub struct InstanceRunner {
    config: InstanceConfig,
    provider: Box<dyn SearchProvider>,
    history: Option<JsonSearchHistoryStore>,
    limiter: RateLimiter,
    rng: StdRng,
}

impl InstanceRunner {
    pub fn new(config: InstanceConfig, provider: Box<dyn SearchProvider>, data_dir: &Path) -> Self {
        // Zero frequency disables recency tracking entirely; filter, record,
        // and save all no-op uniformly when the store is absent.
        let history = (config.search_frequency_hours > 0.0).then(|| {
            JsonSearchHistoryStore::new(data_dir, &config.name, config.search_frequency_hours)
        });
        let limiter = RateLimiter::new(config.rate_limit_per_minute);
        let mut seed = [0u8; 32];
        getrandom::fill(&mut seed).expect("Failed to generate random seed");
        Self {
            config,
            provider,
            history,
            limiter,
            rng: StdRng::from_seed(seed),
        }
    }

    /// Runs one full pass for this instance. Every failure is logged and
    /// confined to this run; nothing propagates to other instances.
    pub fn run(&mut self) {
        let prefix = if self.config.dry_run { "[dry run] " } else { "" };
        info!(
            "[{}] {}Starting search (mode: {})",
            self.config.name,
            prefix,
            self.config.search_mode.as_str()
        );

        let mut candidates = match self.provider.get_candidates() {
            Ok(candidates) => candidates,
            Err(err) => {
                error!("[{}] Failed to fetch candidates: {}", self.config.name, err);
                return;
            }
        };
        if candidates.is_empty() {
            info!("[{}] No candidates found", self.config.name);
            return;
        }
        info!(
            "[{}] Found {} candidate(s)",
            self.config.name,
            candidates.len()
        );

        if let Some(history) = &self.history {
            let candidate_ids: Vec<i64> = candidates.iter().map(|candidate| candidate.id).collect();
            let recent_ids = history.filter_recent(&candidate_ids);
            if !recent_ids.is_empty() {
                let before = candidates.len();
                candidates.retain(|candidate| !recent_ids.contains(&candidate.id));
                info!(
                    "[{}] Skipped {} recently searched (within {}h)",
                    self.config.name,
                    before - candidates.len(),
                    self.config.search_frequency_hours
                );
            }
            if candidates.is_empty() {
                info!(
                    "[{}] No candidates remaining after filtering",
                    self.config.name
                );
                return;
            }
        }

        // Sampling policy, not priority: a fresh uniform shuffle each run
        // spreads search load across the catalog over time.
        shuffle_candidates(&mut candidates, &mut self.rng);
        candidates.truncate(self.config.search_limit);
        let selected = candidates;

        let verb = if self.config.dry_run {
            "Would search"
        } else {
            "Searching"
        };
        for kind in [CandidateKind::Missing, CandidateKind::Upgrade] {
            let subset: Vec<&SearchCandidate> = selected
                .iter()
                .filter(|candidate| candidate.kind == kind)
                .collect();
            if subset.is_empty() {
                continue;
            }
            info!(
                "[{}] {} {} {} item(s)",
                self.config.name,
                verb,
                subset.len(),
                kind.as_str()
            );
            for candidate in subset {
                info!(
                    "[{}]   [{}] {}",
                    self.config.name,
                    candidate.kind.as_str(),
                    candidate.title
                );
            }
        }

        if self.config.dry_run {
            return;
        }

        for batch in selected.chunks(SEARCH_BATCH_SIZE) {
            self.limiter.wait();
            let batch_ids: Vec<i64> = batch.iter().map(|candidate| candidate.id).collect();
            debug!(
                "[{}] Dispatching search for batch of {}",
                self.config.name,
                batch_ids.len()
            );
            if let Err(err) = self.provider.search(&batch_ids) {
                // Remaining batches still get their chance.
                error!("[{}] Search command failed: {}", self.config.name, err);
            }
        }

        if let Some(history) = &mut self.history {
            let selected_ids: Vec<i64> = selected.iter().map(|candidate| candidate.id).collect();
            history.record(&selected_ids);
            if let Err(err) = history.save() {
                error!(
                    "[{}] Failed to persist search history: {}",
                    self.config.name, err
                );
            }
        }

        info!("[{}] Run complete", self.config.name);
    }
}

// In-place Fisher-Yates; any unbiased permutation would do.
fn shuffle_candidates(candidates: &mut [SearchCandidate], rng: &mut StdRng) {
    for i in (1..candidates.len()).rev() {
        let j = rng.random_range(0..=i);
        candidates.swap(i, j);
    }
}
