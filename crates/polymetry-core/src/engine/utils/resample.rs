use rand::{distributions::WeightedIndex, prelude::*};

/// Splits a shuffled frame pool into `num_chunks` equal chunks.
///
/// Chunks are floor-sized; trailing frames that do not fill a whole chunk are
/// dropped. Returns an empty vector when no whole chunk fits.
pub fn shuffled_chunks(
    frames: &[usize],
    num_chunks: usize,
    rng: &mut impl Rng,
) -> Vec<Vec<usize>> {
    if num_chunks == 0 || frames.len() < num_chunks {
        return Vec::new();
    }
    let mut pool: Vec<usize> = frames.to_vec();
    pool.shuffle(rng);

    let chunk_size = pool.len() / num_chunks;
    pool.chunks_exact(chunk_size)
        .take(num_chunks)
        .map(<[usize]>::to_vec)
        .collect()
}

/// Draws `series.len()` values from `series` with replacement, with per-index
/// probabilities given by `dist`.
///
/// This is the Monte-Carlo reweighting approximation used by the weighted
/// internal-scaling statistics: the result has the same size as the input and
/// its mean only approximates the exact weighted mean.
pub fn resample_with_weights(
    series: &[f64],
    dist: &WeightedIndex<f64>,
    rng: &mut impl Rng,
) -> Vec<f64> {
    (0..series.len()).map(|_| series[dist.sample(rng)]).collect()
}
