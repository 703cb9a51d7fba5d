//! Permutation-invariant assignment between reference and hypothesis
//! sources.
//!
//! Separation models emit their sources in an arbitrary order, so training
//! losses are evaluated under the best bijection between references and
//! hypotheses. Source counts are small (2–4), which makes exhaustive
//! enumeration of all K! candidates both exact and cheap; greedy or
//! Hungarian shortcuts would only trade optimality for nothing here.

use itertools::Itertools;
use ndarray::Array1;

use crate::{Error, Result, F};

/// A bijection over source indices, `hyp[perm[i]]` answering for `ref[i]`.
pub type Permutation = Vec<usize>;

/// How the output-to-reference correspondence is resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Assignment {
    /// Search all K! permutations and keep the best one per batch element.
    Search,
    /// Evaluate a previously chosen assignment, one permutation per batch
    /// element. Used when a later loss must stay consistent with the
    /// assignment an earlier loss already settled on.
    Fixed(Vec<Permutation>),
    /// Skip the search and score sources in their given order.
    Identity,
}

/// Scores `hyps` against `refs` under the given assignment and returns the
/// batch-mean loss together with the permutation used per batch element.
///
/// `criterion` maps one (reference, hypothesis) pair to per-batch-element
/// distortions; it is evaluated once per pair and reused across all
/// permutations. Ties between permutations resolve to the lexicographically
/// first one, so results are deterministic for identical inputs.
pub fn permutation_loss<S>(
    refs: &[S],
    hyps: &[S],
    criterion: impl Fn(&S, &S) -> Array1<F>,
    assignment: &Assignment,
) -> Result<(F, Vec<Permutation>)> {
    let sources = refs.len();
    if sources == 0 || hyps.len() != sources {
        return Err(Error::SourceCountMismatch {
            refs: sources,
            hyps: hyps.len(),
        });
    }

    let pairs = refs
        .iter()
        .map(|r| hyps.iter().map(|h| criterion(r, h)).collect_vec())
        .collect_vec();
    let batch = pairs[0][0].len();
    for pair in pairs.iter().flatten() {
        assert_eq!(pair.len(), batch, "criterion must score every batch element");
    }
    if batch == 0 {
        return Ok((0.0, Vec::new()));
    }

    let pair_mean = |perm: &[usize], b: usize| {
        perm.iter()
            .enumerate()
            .map(|(i, &j)| pairs[i][j][b])
            .sum::<F>()
            / sources as F
    };

    let (per_element, perms) = match assignment {
        Assignment::Search => {
            let mut best = vec![F::INFINITY; batch];
            let mut best_perm = vec![Permutation::new(); batch];
            for perm in (0..sources).permutations(sources) {
                for b in 0..batch {
                    let loss = pair_mean(&perm, b);
                    if loss < best[b] {
                        best[b] = loss;
                        best_perm[b] = perm.clone();
                    }
                }
            }
            (best, best_perm)
        }
        Assignment::Fixed(perms) => {
            if perms.len() != batch {
                return Err(Error::PermutationCountMismatch {
                    perms: perms.len(),
                    batch,
                });
            }
            for perm in perms {
                if perm.len() != sources || !perm.iter().copied().sorted().eq(0..sources) {
                    return Err(Error::InvalidPermutation {
                        perm: perm.clone(),
                        sources,
                    });
                }
            }
            let losses = (0..batch).map(|b| pair_mean(&perms[b], b)).collect_vec();
            (losses, perms.clone())
        }
        Assignment::Identity => {
            let identity = (0..sources).collect_vec();
            let losses = (0..batch).map(|b| pair_mean(&identity, b)).collect_vec();
            (losses, vec![identity; batch])
        }
    };

    Ok((per_element.iter().sum::<F>() / batch as F, perms))
}
