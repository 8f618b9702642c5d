//! Randomized hyper-parameter search.
//!
//! [`RandomizedSearch`] samples `n_iter` candidates from a [`SearchSpace`],
//! scores each with stratified k-fold cross-validation and refits the best
//! candidate on the full training data. All `(candidate, fold)` fits run on a
//! dedicated rayon pool sized by `n_jobs`.

pub mod cv;
pub mod search_space;

pub use cv::StratifiedKFold;
pub use search_space::{ParamSet, SearchSpace};

use crate::config::TrainingConfig;
use crate::dataset::LabeledData;
use crate::error::{ErrorKind, PipelineError, Result};
use crate::metrics::Scoring;
use crate::model::{BoostingParams, Fitted, GradientBoostingClassifier, InferenceModel};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

/// Cross-validation result of one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateResult {
    pub params: ParamSet,
    /// Per-fold scores; `NaN` where the fold failed to fit.
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
}

/// Outcome of [`RandomizedSearch::fit`].
#[derive(Debug)]
pub struct SearchOutcome {
    pub best_model: GradientBoostingClassifier<Fitted>,
    pub best_params: ParamSet,
    pub best_score: f64,
    pub results: Vec<CandidateResult>,
}

/// Randomized search over boosted-tree hyper-parameters.
///
/// Built via [`RandomizedSearchBuilder`] or [`RandomizedSearch::from_config`].
#[derive(Debug, Clone)]
pub struct RandomizedSearch {
    pub(crate) space: SearchSpace,
    pub(crate) base: BoostingParams,
    pub(crate) n_iter: usize,
    pub(crate) cv: usize,
    pub(crate) scoring: Scoring,
    pub(crate) n_jobs: i32,
    pub(crate) verbose: u8,
    pub(crate) seed: u64,
}

/// Fluent builder for [`RandomizedSearch`].
///
/// Defaults:
/// - `n_iter`: 4
/// - `cv`: 2
/// - `scoring`: accuracy
/// - `n_jobs`: -1 (all cores)
/// - `verbose`: 0
/// - `seed`: 42
pub struct RandomizedSearchBuilder {
    space: SearchSpace,
    base: BoostingParams,
    n_iter: usize,
    cv: usize,
    scoring: Scoring,
    n_jobs: i32,
    verbose: u8,
    seed: u64,
}

impl RandomizedSearchBuilder {
    pub fn new(space: SearchSpace) -> Self {
        Self {
            space,
            base: BoostingParams::default(),
            n_iter: 4,
            cv: 2,
            scoring: Scoring::Accuracy,
            n_jobs: -1,
            verbose: 0,
            seed: 42,
        }
    }

    /// Parameters not covered by the search space.
    pub fn base_params(mut self, base: BoostingParams) -> Self {
        self.base = base;
        self
    }

    pub fn n_iter(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    pub fn cv(mut self, cv: usize) -> Self {
        self.cv = cv;
        self
    }

    pub fn scoring(mut self, scoring: Scoring) -> Self {
        self.scoring = scoring;
        self
    }

    /// Worker threads; `-1` (or any negative value) uses every core.
    pub fn n_jobs(mut self, n_jobs: i32) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    /// `1` logs one line per candidate, `2` and above also per fold.
    pub fn verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn build(self) -> RandomizedSearch {
        RandomizedSearch {
            space: self.space,
            base: self.base,
            n_iter: self.n_iter,
            cv: self.cv,
            scoring: self.scoring,
            n_jobs: self.n_jobs,
            verbose: self.verbose,
            seed: self.seed,
        }
    }
}

impl RandomizedSearch {
    pub fn builder(space: SearchSpace) -> RandomizedSearchBuilder {
        RandomizedSearchBuilder::new(space)
    }

    pub fn from_config(config: &TrainingConfig) -> Self {
        Self::builder(SearchSpace::from(&config.params))
            .n_iter(config.n_iter)
            .cv(config.cv)
            .scoring(config.scoring)
            .n_jobs(config.n_jobs)
            .verbose(config.verbose)
            .seed(config.random_state)
            .build()
    }

    /// Candidates this search will evaluate, in order.
    pub fn candidates(&self) -> Vec<ParamSet> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        self.space.sample_n(&mut rng, self.n_iter)
    }

    /// Run the search and refit the winner on all of `data`.
    ///
    /// The best candidate has the highest mean fold score; ties go to the
    /// earliest candidate. Candidates with a failed fold score `NaN` and
    /// never win.
    ///
    /// # Errors
    /// `Config` for `n_iter == 0` or `cv < 2`; `Fit` when every candidate
    /// fails or the refit fails.
    pub fn fit(&self, data: &LabeledData) -> Result<SearchOutcome> {
        if self.n_iter == 0 {
            return Err(PipelineError::config("randomized search needs n_iter > 0"));
        }
        let folds = StratifiedKFold::new(self.cv).split(data.labels())?;
        let candidates = self.candidates();
        let total = candidates.len() * folds.len();
        if self.verbose > 0 {
            info!(
                "Fitting {} folds for each of {} candidates, totalling {} fits",
                folds.len(),
                candidates.len(),
                total
            );
        }

        let tasks: Vec<(usize, usize)> = (0..candidates.len())
            .flat_map(|c| (0..folds.len()).map(move |f| (c, f)))
            .collect();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.threads())
            .build()
            .map_err(|e| PipelineError::with_source(ErrorKind::Fit, "cannot start worker pool", e))?;

        let scores: Vec<Result<f64>> = pool.install(|| {
            tasks
                .par_iter()
                .map(|&(c, f)| self.score_fold(&candidates[c], data, &folds[f]))
                .collect()
        });

        let mut results = Vec::with_capacity(candidates.len());
        let mut first_error = None;
        let mut scores = scores.into_iter();
        for (idx, params) in candidates.iter().enumerate() {
            let mut fold_scores = Vec::with_capacity(folds.len());
            for (fold, score) in scores.by_ref().take(folds.len()).enumerate() {
                match score {
                    Ok(s) => {
                        if self.verbose > 1 {
                            info!(candidate = idx + 1, fold = fold + 1, score = s, "[CV] {params}");
                        }
                        fold_scores.push(s);
                    }
                    Err(e) => {
                        warn!(candidate = idx + 1, fold = fold + 1, error = %e.chain(), "fold failed to fit");
                        fold_scores.push(f64::NAN);
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }
            let mean_score = fold_scores.iter().sum::<f64>() / fold_scores.len() as f64;
            if self.verbose > 0 {
                info!(candidate = idx + 1, mean_score, "{} = {mean_score:.4} for {params}", self.scoring);
            }
            results.push(CandidateResult {
                params: *params,
                fold_scores,
                mean_score,
            });
        }

        let best = results
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.mean_score.is_nan())
            .fold(None, |best: Option<(usize, f64)>, (i, r)| match best {
                Some((_, s)) if s >= r.mean_score => best,
                _ => Some((i, r.mean_score)),
            });
        let Some((best_idx, best_score)) = best else {
            let err = PipelineError::fit("every hyper-parameter candidate failed to fit");
            return Err(match first_error {
                Some(cause) => PipelineError::with_source(ErrorKind::Fit, err.context().to_string(), cause),
                None => err,
            });
        };

        let best_params = results[best_idx].params;
        debug!(%best_params, best_score, "refitting best candidate on full training data");
        let best_model = GradientBoostingClassifier::new(best_params.apply(&self.base)).fit(data)?;
        Ok(SearchOutcome {
            best_model,
            best_params,
            best_score,
            results,
        })
    }

    fn threads(&self) -> usize {
        // rayon treats 0 as "one thread per core".
        if self.n_jobs < 0 {
            0
        } else {
            self.n_jobs as usize
        }
    }

    fn score_fold(&self, params: &ParamSet, data: &LabeledData, fold: &cv::Fold) -> Result<f64> {
        let (train_idx, test_idx) = fold;
        let train = data.rows(train_idx);
        let test = data.rows(test_idx);
        let model = GradientBoostingClassifier::new(params.apply(&self.base)).fit(&train)?;
        let predicted = model.predict(test.features().view())?;
        Ok(self.scoring.score(test.labels(), &predicted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FloatRange, IntRange, SearchSpaceConfig};
    use ndarray::Array2;
    use rand::Rng;

    fn data(n: usize) -> LabeledData {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let x = Array2::from_shape_fn((n, 3), |_| rng.random::<f64>());
        let y = x
            .rows()
            .into_iter()
            .map(|r| if r[0] > 0.5 { 1.0 } else { 0.0 })
            .collect();
        LabeledData::new(x, y, vec!["a".into(), "b".into(), "c".into()]).unwrap()
    }

    fn small_space() -> SearchSpace {
        SearchSpace::from(&SearchSpaceConfig {
            n_estimators: IntRange::new(5, 15),
            max_depth: IntRange::new(2, 6),
            learning_rate: FloatRange::new(0.05, 0.3),
            num_leaves: IntRange::new(3, 8),
            min_child_samples: IntRange::new(2, 5),
        })
    }

    #[test]
    fn test_builder_defaults() {
        let search = RandomizedSearch::builder(small_space()).build();
        assert_eq!(search.n_iter, 4);
        assert_eq!(search.cv, 2);
        assert_eq!(search.scoring, Scoring::Accuracy);
        assert_eq!(search.n_jobs, -1);
        assert_eq!(search.seed, 42);
    }

    #[test]
    fn test_builder_chaining() {
        let search = RandomizedSearch::builder(small_space())
            .n_iter(7)
            .cv(3)
            .scoring(Scoring::F1)
            .n_jobs(2)
            .verbose(1)
            .seed(5)
            .build();
        assert_eq!(search.n_iter, 7);
        assert_eq!(search.cv, 3);
        assert_eq!(search.scoring, Scoring::F1);
        assert_eq!(search.n_jobs, 2);
        assert_eq!(search.verbose, 1);
        assert_eq!(search.seed, 5);
    }

    #[test]
    fn test_from_config() {
        let config = TrainingConfig::default();
        let search = RandomizedSearch::from_config(&config);
        assert_eq!(search.n_iter, 4);
        assert_eq!(search.verbose, 2);
        assert_eq!(search.seed, 42);
    }

    #[test]
    fn test_fit_returns_best_candidate() {
        let data = data(120);
        let search = RandomizedSearch::builder(small_space())
            .n_iter(3)
            .cv(3)
            .n_jobs(2)
            .build();
        let outcome = search.fit(&data).unwrap();

        assert_eq!(outcome.results.len(), 3);
        let max = outcome
            .results
            .iter()
            .map(|r| r.mean_score)
            .fold(f64::MIN, f64::max);
        assert_eq!(outcome.best_score, max);
        assert!(outcome.best_score > 0.7);
        assert_eq!(outcome.best_model.params().n_estimators, outcome.best_params.n_estimators);
        for r in &outcome.results {
            assert_eq!(r.fold_scores.len(), 3);
        }
    }

    #[test]
    fn test_search_is_deterministic() {
        let data = data(80);
        let search = RandomizedSearch::builder(small_space()).n_iter(2).build();
        let a = search.fit(&data).unwrap();
        let b = search.fit(&data).unwrap();
        assert_eq!(a.results, b.results);
        assert_eq!(a.best_params, b.best_params);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let search = RandomizedSearch::builder(small_space()).n_iter(0).build();
        let err = search.fit(&data(20)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn test_single_class_fails_every_candidate() {
        let base = data(20);
        let single = LabeledData::new(
            base.features().clone(),
            vec![1.0; 20],
            base.feature_names().to_vec(),
        )
        .unwrap();
        let search = RandomizedSearch::builder(small_space()).n_iter(2).build();
        let err = search.fit(&single).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fit);
    }
}
