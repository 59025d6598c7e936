//! Rebuild a master alignment from the model's tracebacks.
//!
//! The rebuilt alignment has one column block per node: the inserts after
//! node k (left-justified, padded with gaps) followed by match column
//! k+1. Its reference annotation marks match columns with `x`, so a
//! rebuilt alignment round-trips exactly through hand architecture.

use crate::alphabet::GAP;
use crate::error::{BuildError, Result};
use crate::hmm::trace::{Trace, TraceState};
use crate::msa::Msa;

/// Align every traced sequence to the model's coordinate system and emit a
/// new alignment carrying the same names and weights.
pub fn trace_align(msa: &Msa, traces: &[Trace], m: usize) -> Result<Msa> {
    if traces.len() != msa.nseq() {
        return Err(BuildError::InvalidConfig(format!(
            "{} traces for {} sequences",
            traces.len(),
            msa.nseq()
        )));
    }

    // widest insert run after each node, over all sequences
    let mut maxins = vec![0usize; m + 1];
    for tr in traces {
        let mut run = vec![0usize; m + 1];
        for step in &tr.steps {
            if step.state == TraceState::I {
                run[step.node] += 1;
            }
        }
        for (node, &r) in run.iter().enumerate() {
            maxins[node] = maxins[node].max(r);
        }
    }

    // column offsets: [ins0][match1][ins1][match2]...[matchM][insM]
    let alen: usize = m + maxins.iter().sum::<usize>();
    let mut match_off = vec![0usize; m + 1];
    let mut ins_off = vec![0usize; m + 1];
    let mut pos = 0usize;
    for node in 0..=m {
        ins_off[node] = pos;
        pos += maxins[node];
        if node < m {
            match_off[node + 1] = pos;
            pos += 1;
        }
    }
    debug_assert_eq!(pos, alen);

    let mut rows = Vec::with_capacity(msa.nseq());
    for (tr, src) in traces.iter().zip(&msa.rows) {
        let mut row = vec![GAP; alen];
        let mut ins_used = vec![0usize; m + 1];
        for step in &tr.steps {
            match step.state {
                TraceState::M => {
                    row[match_off[step.node]] = src[step.col];
                }
                TraceState::I => {
                    row[ins_off[step.node] + ins_used[step.node]] = src[step.col];
                    ins_used[step.node] += 1;
                }
                _ => {}
            }
        }
        rows.push(row);
    }

    let mut rf = vec![b'.'; alen];
    for node in 1..=m {
        rf[match_off[node]] = b'x';
    }

    let mut out = Msa {
        alphabet: msa.alphabet.clone(),
        name: msa.name.clone(),
        acc: msa.acc.clone(),
        desc: msa.desc.clone(),
        names: msa.names.clone(),
        rows,
        wgt: msa.wgt.clone(),
        rf: None,
        cutoffs: msa.cutoffs,
    };
    out.set_rf(&rf)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::build::modelmaker;
    use crate::msa::Msa;

    fn toy(seqs: &[&[u8]]) -> Msa {
        let names = (0..seqs.len()).map(|i| format!("s{}", i)).collect();
        Msa::from_rows(Alphabet::Amino, names, seqs).unwrap()
    }

    #[test]
    fn test_round_trip_of_clean_alignment() {
        let msa = toy(&[b"ACD", b"ACD", b"ACD"]);
        let (hmm, traces) = modelmaker::fast(&msa, 0.5, true).unwrap();
        let out = trace_align(&msa, &traces.unwrap(), hmm.m).unwrap();
        assert_eq!(out.alen(), 3);
        assert_eq!(out.rows, msa.rows);
        assert_eq!(out.rf.as_deref(), Some(&b"xxx"[..]));
    }

    #[test]
    fn test_insert_block_left_justified() {
        // one of four sequences carries two inserted residues
        let msa = toy(&[b"A--D", b"ACCD", b"A--D", b"A--D"]);
        let (hmm, traces) = modelmaker::fast(&msa, 0.5, true).unwrap();
        assert_eq!(hmm.m, 2);
        let out = trace_align(&msa, &traces.unwrap(), hmm.m).unwrap();
        // layout: match A, two insert columns, match D
        assert_eq!(out.alen(), 4);
        assert_eq!(out.rf.as_deref(), Some(&b"x..x"[..]));
        let c = out.alphabet.digitize(b'C');
        assert_eq!(out.rows[1][1], c);
        assert_eq!(out.rows[1][2], c);
        assert_eq!(out.rows[0][1], GAP);
        assert_eq!(out.rows[0][2], GAP);
    }

    #[test]
    fn test_hand_round_trip_preserves_architecture() {
        let msa = toy(&[b"A--D", b"ACCD", b"A--D", b"A--D"]);
        let (hmm, traces) = modelmaker::fast(&msa, 0.5, true).unwrap();
        let out = trace_align(&msa, &traces.unwrap(), hmm.m).unwrap();
        let (hmm2, _) = modelmaker::hand(&out, false).unwrap();
        assert_eq!(hmm2.m, hmm.m);
    }

    #[test]
    fn test_trace_count_mismatch_rejected() {
        let msa = toy(&[b"ACD", b"ACD"]);
        let (hmm, traces) = modelmaker::fast(&msa, 0.5, true).unwrap();
        let mut traces = traces.unwrap();
        traces.pop();
        assert!(matches!(
            trace_align(&msa, &traces, hmm.m),
            Err(BuildError::InvalidConfig(_))
        ));
    }
}
