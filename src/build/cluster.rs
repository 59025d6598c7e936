//! Single-linkage clustering of alignment sequences by fractional
//! identity. Used by BLOSUM weighting and the cluster effective-number
//! strategy.

use crate::msa::Msa;

/// Union-find with path compression.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> DisjointSet {
        DisjointSet { parent: (0..n).collect() }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[rb] = ra;
        }
    }
}

/// Cluster sequences, linking any pair whose fractional identity meets or
/// exceeds `maxid`. Returns a per-sequence cluster assignment
/// (`0..nclusters`) and the cluster count.
pub fn single_linkage(msa: &Msa, maxid: f64) -> (Vec<usize>, usize) {
    let n = msa.nseq();
    let mut ds = DisjointSet::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            if msa.pairwise_identity(i, j) >= maxid {
                ds.union(i, j);
            }
        }
    }
    let mut label = vec![usize::MAX; n];
    let mut assignment = vec![0usize; n];
    let mut nclusters = 0;
    for i in 0..n {
        let root = ds.find(i);
        if label[root] == usize::MAX {
            label[root] = nclusters;
            nclusters += 1;
        }
        assignment[i] = label[root];
    }
    (assignment, nclusters)
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
    fn test_identical_sequences_share_a_cluster() {
        let msa = toy(&[b"ACDEFGHIKL", b"ACDEFGHIKL", b"WYWYWYWYWY"]);
        let (assignment, n) = single_linkage(&msa, 0.62);
        assert_eq!(n, 2);
        assert_eq!(assignment[0], assignment[1]);
        assert_ne!(assignment[0], assignment[2]);
    }

    #[test]
    fn test_transitive_linking() {
        // a links b, b links c, a does not link c directly
        let msa = toy(&[b"ACDEFGHIKL", b"ACDEFGHIWW", b"ACDEFWWWWW"]);
        let (assignment, n) = single_linkage(&msa, 0.7);
        assert_eq!(n, 1, "assignment = {:?}", assignment);
    }

    #[test]
    fn test_threshold_one_separates_distinct() {
        let msa = toy(&[b"ACDE", b"ACDF", b"ACDE"]);
        let (assignment, n) = single_linkage(&msa, 1.0);
        assert_eq!(n, 2);
        assert_eq!(assignment[0], assignment[2]);
    }
}
