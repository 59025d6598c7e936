//! Architecture inference: assign consensus columns and collect
//! relative-weighted observed counts into a new model.
//!
//! Two makers share one count-collection core. The "fast" maker selects
//! match columns by the symbol-fraction rule over weighted occupancy; the
//! "hand" maker trusts the alignment's reference annotation line. Both
//! can also emit one traceback per alignment row.

use crate::alphabet;
use crate::hmm::model::{Hmm, T_DD, T_DM, T_II, T_IM, T_MD, T_MI, T_MM};
use crate::hmm::trace::{Trace, TraceState};
use crate::msa::Msa;

/// Raw failure signals from the makers; the builder translates these into
/// tagged errors with alignment context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MakerError {
    /// No column qualified as a consensus column.
    NoConsensus,
    /// Hand architecture requested but the alignment carries no reference
    /// annotation line.
    MissingRf,
}

/// Fast architecture: a column becomes a match column when the weighted
/// fraction of sequences carrying a residue there meets `symfrac`.
pub fn fast(
    msa: &Msa,
    symfrac: f64,
    want_traces: bool,
) -> Result<(Hmm, Option<Vec<Trace>>), MakerError> {
    let totwgt: f64 = msa.wgt.iter().sum();
    let mut matchcol = vec![false; msa.alen()];
    for (col, is_match) in matchcol.iter_mut().enumerate() {
        let mut r = 0.0;
        for (row, &w) in msa.rows.iter().zip(&msa.wgt) {
            if alphabet::is_residue(row[col]) {
                r += w;
            }
        }
        *is_match = totwgt > 0.0 && r / totwgt >= symfrac;
    }
    if !matchcol.iter().any(|&m| m) {
        return Err(MakerError::NoConsensus);
    }
    Ok(matchassign(msa, &matchcol, want_traces))
}

/// Hand architecture: match columns are the non-gap positions of the
/// reference annotation line.
pub fn hand(msa: &Msa, want_traces: bool) -> Result<(Hmm, Option<Vec<Trace>>), MakerError> {
    let rf = msa.rf.as_ref().ok_or(MakerError::MissingRf)?;
    let matchcol: Vec<bool> = rf
        .iter()
        .map(|&c| !matches!(c, b'.' | b'-' | b'~' | b' '))
        .collect();
    if !matchcol.iter().any(|&m| m) {
        return Err(MakerError::NoConsensus);
    }
    Ok(matchassign(msa, &matchcol, want_traces))
}

/// Shared core: given the match-column assignment, walk every row once,
/// building its state path and accumulating weighted emission and
/// transition counts.
fn matchassign(msa: &Msa, matchcol: &[bool], want_traces: bool) -> (Hmm, Option<Vec<Trace>>) {
    let m = matchcol.iter().filter(|&&b| b).count();
    let mut hmm = Hmm::new(msa.alphabet.clone(), m);
    hmm.nseq = msa.nseq();
    hmm.eff_nseq = msa.nseq() as f64;

    let mut traces = want_traces.then(Vec::new);

    for (row, &w) in msa.rows.iter().zip(&msa.wgt) {
        let mut tr = Trace::new();
        tr.append(TraceState::B, 0, 0);
        let mut node = 0usize; // current node; B acts as node 0
        let mut nres = 0usize;

        for (col, &cell) in row.iter().enumerate() {
            if matchcol[col] {
                node += 1;
                if alphabet::is_residue(cell) {
                    tr.append(TraceState::M, node, col);
                    nres += 1;
                } else {
                    tr.append(TraceState::D, node, 0);
                }
            } else if alphabet::is_residue(cell) {
                tr.append(TraceState::I, node, col);
                nres += 1;
            }
        }
        tr.append(TraceState::E, 0, 0);
        tr.m = m;
        tr.l = nres;

        count_trace(&mut hmm, row, &tr, w);
        if let Some(list) = traces.as_mut() {
            list.push(tr);
        }
    }

    (hmm, traces)
}

/// Accumulate one row's weighted counts from its state path.
fn count_trace(hmm: &mut Hmm, row: &[u8], tr: &Trace, w: f64) {
    let m = hmm.m;
    for step in &tr.steps {
        let code = row.get(step.col).copied();
        match step.state {
            TraceState::M => {
                if let Some(c) = code {
                    if alphabet::is_canonical(c) {
                        hmm.mat[step.node][c as usize] += w;
                    }
                }
            }
            TraceState::I => {
                if let Some(c) = code {
                    if alphabet::is_canonical(c) {
                        hmm.ins[step.node][c as usize] += w;
                    }
                }
            }
            _ => {}
        }
    }

    use TraceState::*;
    for pair in tr.steps.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        let from_node = prev.node;
        let idx = match (prev.state, next.state) {
            (B | M, M) => Some(T_MM),
            (B | M, I) => Some(T_MI),
            (B | M, D) => Some(T_MD),
            (B | M, E) => Some(T_MM), // M_m -> E exit
            (I, M) => Some(T_IM),
            (I, I) => Some(T_II),
            (I, E) => Some(T_IM), // I_m -> E exit
            (D, M) => Some(T_DM),
            (D, D) => Some(T_DD),
            (D, E) => Some(T_DM), // D_m -> E exit
            _ => None,
        };
        if let Some(idx) = idx {
            let node = if next.state == E { m } else { from_node };
            hmm.t[node][idx] += w;
        }
    }
}
