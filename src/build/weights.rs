//! Relative sequence weighting algorithms.
//!
//! Three algorithms populate the alignment's weight vector: Henikoff
//! position-based weights (linear in alignment size, used automatically
//! for very deep alignments), Gerstein/Sonnhammer/Chothia tree weights
//! (the default), and BLOSUM cluster weights. All normalize so the
//! weights sum to the sequence count (mean weight 1) and every weight is
//! strictly positive.

use crate::alphabet;
use crate::build::cluster;
use crate::error::{BuildError, Result};
use crate::msa::Msa;

const MIN_WEIGHT: f64 = 1e-8;

/// Scale weights to sum to `nseq`, flooring at a tiny positive value so no
/// sequence is silently dropped from the counts.
fn normalize(wgt: &mut [f64]) {
    for w in wgt.iter_mut() {
        if *w < MIN_WEIGHT {
            *w = MIN_WEIGHT;
        }
    }
    let total: f64 = wgt.iter().sum();
    let n = wgt.len() as f64;
    for w in wgt.iter_mut() {
        *w *= n / total;
    }
}

/// Henikoff position-based weights: each residue contributes
/// `1 / (r * s)` to its sequence, where `r` is the number of distinct
/// residues in the column and `s` how many sequences carry this one.
pub fn position_based(msa: &mut Msa) -> Result<()> {
    let nseq = msa.nseq();
    let k = msa.alphabet.k();
    let mut wgt = vec![0.0; nseq];

    for col in 0..msa.alen() {
        let mut counts = vec![0usize; k];
        for row in &msa.rows {
            let c = row[col];
            if alphabet::is_canonical(c) {
                counts[c as usize] += 1;
            }
        }
        let r = counts.iter().filter(|&&n| n > 0).count();
        if r == 0 {
            continue;
        }
        for (i, row) in msa.rows.iter().enumerate() {
            let c = row[col];
            if alphabet::is_canonical(c) {
                wgt[i] += 1.0 / (r as f64 * counts[c as usize] as f64);
            }
        }
    }

    normalize(&mut wgt);
    msa.wgt = wgt;
    Ok(())
}

/// Gerstein/Sonnhammer/Chothia weights: build a UPGMA tree from pairwise
/// fractional-identity distances, then push each branch length down to the
/// leaves below it in equal shares.
pub fn gsc(msa: &mut Msa) -> Result<()> {
    let nseq = msa.nseq();
    if nseq == 1 {
        msa.wgt = vec![1.0];
        return Ok(());
    }

    // pairwise distances
    let mut dist = vec![vec![0.0; nseq]; nseq];
    for i in 0..nseq {
        for j in (i + 1)..nseq {
            let d = 1.0 - msa.pairwise_identity(i, j);
            dist[i][j] = d;
            dist[j][i] = d;
        }
    }

    // UPGMA: merge the closest pair of clusters until one remains,
    // recording each cluster's member leaves, height, and child branches.
    struct Cluster {
        members: Vec<usize>,
        height: f64,
        active: bool,
    }
    let mut clusters: Vec<Cluster> = (0..nseq)
        .map(|i| Cluster { members: vec![i], height: 0.0, active: true })
        .collect();
    // (child members, branch length) for every tree edge
    let mut edges: Vec<(Vec<usize>, f64)> = Vec::new();

    let avg_dist = |a: &Cluster, b: &Cluster, dist: &Vec<Vec<f64>>| -> f64 {
        let mut total = 0.0;
        for &i in &a.members {
            for &j in &b.members {
                total += dist[i][j];
            }
        }
        total / (a.members.len() * b.members.len()) as f64
    };

    for _ in 0..(nseq - 1) {
        let mut best = (0usize, 0usize, f64::INFINITY);
        for i in 0..clusters.len() {
            if !clusters[i].active {
                continue;
            }
            for j in (i + 1)..clusters.len() {
                if !clusters[j].active {
                    continue;
                }
                let d = avg_dist(&clusters[i], &clusters[j], &dist);
                if d < best.2 {
                    best = (i, j, d);
                }
            }
        }
        let (bi, bj, d) = best;
        let height = d / 2.0;
        let left_len = (height - clusters[bi].height).max(0.0);
        let right_len = (height - clusters[bj].height).max(0.0);
        edges.push((clusters[bi].members.clone(), left_len));
        edges.push((clusters[bj].members.clone(), right_len));
        let mut members = clusters[bi].members.clone();
        members.extend_from_slice(&clusters[bj].members);
        clusters[bi].active = false;
        clusters[bj].active = false;
        clusters.push(Cluster { members, height, active: true });
    }

    // each edge's length is shared equally by the leaves below it
    let mut wgt = vec![0.0; nseq];
    for (members, len) in &edges {
        let share = len / members.len() as f64;
        for &leaf in members {
            wgt[leaf] += share;
        }
    }

    normalize(&mut wgt);
    msa.wgt = wgt;
    Ok(())
}

/// BLOSUM cluster weights: single-linkage cluster at the identity
/// threshold, weight each sequence by the inverse of its cluster size.
pub fn blosum(msa: &mut Msa, maxid: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&maxid) {
        return Err(BuildError::Numerical(format!(
            "BLOSUM weighting identity threshold {} is outside [0,1]",
            maxid
        )));
    }
    let (assignment, nclusters) = cluster::single_linkage(msa, maxid);
    let mut sizes = vec![0usize; nclusters];
    for &c in &assignment {
        sizes[c] += 1;
    }
    let mut wgt: Vec<f64> = assignment.iter().map(|&c| 1.0 / sizes[c] as f64).collect();
    normalize(&mut wgt);
    msa.wgt = wgt;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;

    fn toy(seqs: &[&[u8]]) -> Msa {
        let names = (0..seqs.len()).map(|i| format!("s{}", i)).collect();
        Msa::from_rows(Alphabet::Amino, names, seqs).unwrap()
    }

    #[test]
    fn test_position_based_positive_and_normalized() {
        let mut msa = toy(&[b"ACDEFG", b"ACDEFG", b"TTTTTT"]);
        position_based(&mut msa).unwrap();
        assert_eq!(msa.wgt.len(), 3);
        assert!(msa.wgt.iter().all(|&w| w > 0.0));
        let sum: f64 = msa.wgt.iter().sum();
        assert!((sum - 3.0).abs() < 1e-9);
        // the outlier deserves more weight than either duplicate
        assert!(msa.wgt[2] > msa.wgt[0]);
    }

    #[test]
    fn test_gsc_outlier_upweighted() {
        let mut msa = toy(&[b"ACDEFGHIKL", b"ACDEFGHIKL", b"WYWYWYWYWY"]);
        gsc(&mut msa).unwrap();
        assert!(msa.wgt.iter().all(|&w| w > 0.0));
        let sum: f64 = msa.wgt.iter().sum();
        assert!((sum - 3.0).abs() < 1e-9);
        assert!(msa.wgt[2] > msa.wgt[0]);
        assert!((msa.wgt[0] - msa.wgt[1]).abs() < 1e-9);
    }

    #[test]
    fn test_gsc_identical_sequences_uniform() {
        let mut msa = toy(&[b"ACDE", b"ACDE", b"ACDE"]);
        gsc(&mut msa).unwrap();
        for &w in &msa.wgt {
            assert!((w - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_blosum_cluster_weights() {
        let mut msa = toy(&[b"ACDEFGHIKL", b"ACDEFGHIKL", b"WYWYWYWYWY"]);
        blosum(&mut msa, 0.62).unwrap();
        let sum: f64 = msa.wgt.iter().sum();
        assert!((sum - 3.0).abs() < 1e-9);
        // the two identical sequences share one cluster
        assert!((msa.wgt[0] - msa.wgt[1]).abs() < 1e-12);
        assert!(msa.wgt[2] > msa.wgt[0]);
    }

    #[test]
    fn test_blosum_threshold_validated() {
        let mut msa = toy(&[b"ACDE", b"ACDE"]);
        assert!(matches!(
            blosum(&mut msa, 1.5),
            Err(BuildError::Numerical(_))
        ));
    }
}
