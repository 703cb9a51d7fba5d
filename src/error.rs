use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between receiving masks and returning
/// enhanced spectrograms.
///
/// Configuration and contract violations fail before any statistics are
/// computed; numerical faults carry the `(batch, bin)` coordinates of the
/// offending covariance so a caller can trace them back to its data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("learned reference selection (ref_channel < 0) requires a channel scorer")]
    MissingChannelScorer,
    #[error("reference channel {channel} out of range for {channels} channels")]
    RefChannelOutOfRange { channel: usize, channels: usize },
    #[error("at least one speech mask is required")]
    NoSpeechMask,
    #[error("missing noise mask: the mvdr beamformer needs a separate interference estimate")]
    MissingNoiseMask,
    #[error("wpd prediction delay must be at least one frame")]
    ZeroDelay,
    #[error("mask shape {mask:?} does not match signal shape {signal:?}")]
    MaskShapeMismatch {
        mask: Vec<usize>,
        signal: Vec<usize>,
    },
    #[error("got {ilens} sequence lengths for a batch of {batch}")]
    LengthCountMismatch { ilens: usize, batch: usize },
    #[error("got {refs} references but {hyps} hypotheses")]
    SourceCountMismatch { refs: usize, hyps: usize },
    #[error("fixed permutation {perm:?} is not a bijection over {sources} sources")]
    InvalidPermutation { perm: Vec<usize>, sources: usize },
    #[error("got {perms} fixed permutations for a batch of {batch}")]
    PermutationCountMismatch { perms: usize, batch: usize },
    #[error("covariance at batch {batch}, bin {bin} stayed singular after diagonal loading")]
    SingularCovariance { batch: usize, bin: usize },
    #[error("non-finite filter weights at batch {batch}, bin {bin}")]
    NonFiniteWeights { batch: usize, bin: usize },
}
