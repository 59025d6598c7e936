//! The build pipeline.
//!
//! A [`Builder`] is configured once from a [`BuildArgs`] option set and
//! then drives every stage of model construction: relative weighting,
//! architecture, effective sequence number, parameterization, annotation,
//! calibration, and the rebuilt master alignment. The single-sequence
//! path shares the calibration stage but parameterizes from a
//! substitution matrix instead of counts. Callers say up front which
//! artifacts they want; unrequested ones are never materialized.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand_xoshiro::rand_core::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::alphabet::Alphabet;
use crate::build::args::{ArchStrategy, BuildArgs, EffnStrategy, WeightStrategy};
use crate::build::{cluster, effn, modelmaker, seqmodel, tracealign, weights};
use crate::error::{BuildError, Result};
use crate::hmm::background::Bg;
use crate::hmm::model::Hmm;
use crate::hmm::prior::{self, Prior};
use crate::hmm::profile::{OptimizedProfile, Profile};
use crate::hmm::trace::Trace;
use crate::msa::Msa;
use crate::score::{matrix::ScoreMatrix, probify, ScoreSystem};
use crate::stats::calibrate::{self, CalibrationParams};

static SEED_COUNTER: AtomicU64 = AtomicU64::new(0);

/// An arbitrary seed for runs that asked for run-to-run variation. The
/// counter keeps two builders constructed in the same instant apart.
fn arbitrary_seed() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    nanos ^ SEED_COUNTER
        .fetch_add(1, Ordering::Relaxed)
        .wrapping_mul(0x9e37_79b9_7f4a_7c15)
}

/// Which artifacts a build call should produce beyond the model itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildRequest {
    /// The log-odds search profile.
    pub profile: bool,
    /// The f32-flattened profile.
    pub optimized: bool,
    /// The source alignment rebuilt in model coordinates.
    pub post_msa: bool,
    /// Tracebacks (for the single-sequence path, the trivial trace).
    pub trace: bool,
}

impl BuildRequest {
    pub fn all() -> BuildRequest {
        BuildRequest { profile: true, optimized: true, post_msa: true, trace: true }
    }
}

/// Artifacts of the alignment build path. Fields not named by the request
/// are `None`.
#[derive(Debug, Clone)]
pub struct BuildOutputs {
    /// The finished, calibrated probability model. Always produced.
    pub hmm: Hmm,
    pub profile: Option<Profile>,
    pub optimized: Option<OptimizedProfile>,
    pub post_msa: Option<Msa>,
    /// One traceback per alignment row, index-aligned with the input.
    pub traces: Option<Vec<Trace>>,
}

/// Artifacts of the single-sequence build path.
#[derive(Debug, Clone)]
pub struct SingleOutputs {
    pub hmm: Hmm,
    pub profile: Option<Profile>,
    pub optimized: Option<OptimizedProfile>,
    /// Trivial linear trace of the query through its own model.
    pub trace: Option<Trace>,
}

pub struct Builder {
    alphabet: Alphabet,
    prior: Prior,
    arch: ArchStrategy,
    weighting: WeightStrategy,
    effn: EffnStrategy,
    symfrac: f64,
    pbswitch: usize,
    wid: f64,
    eid: f64,
    ere: Option<f64>,
    esigma: f64,
    calibration: CalibrationParams,
    seed: u64,
    /// Reseed before every calibration so repeated builds from one Builder
    /// give identical statistics. Off when the seed was arbitrary.
    do_reseeding: bool,
    rng: Xoshiro256PlusPlus,
    scoresys: Option<ScoreSystem>,
}

impl Builder {
    /// Configure a builder for an alphabet. `None` takes every option at
    /// its documented default. Fails on option values no pipeline stage
    /// could honor.
    pub fn new(alphabet: Alphabet, args: Option<&BuildArgs>) -> Result<Builder> {
        let default_args;
        let args = match args {
            Some(a) => a,
            None => {
                default_args = BuildArgs::default();
                &default_args
            }
        };

        if !(0.0..=1.0).contains(&args.symfrac) {
            return Err(BuildError::InvalidConfig(format!(
                "symbol fraction {} is outside [0,1]",
                args.symfrac
            )));
        }
        if let Some(eset) = args.eset {
            if !(eset >= 0.0) {
                return Err(BuildError::InvalidConfig(format!(
                    "fixed effective sequence number {} must be nonnegative",
                    eset
                )));
            }
        }
        if let Some(ere) = args.ere {
            if !(ere > 0.0) {
                return Err(BuildError::InvalidConfig(format!(
                    "relative entropy target {} must be positive",
                    ere
                )));
            }
        }
        if !(0.0..=1.0).contains(&args.eft) {
            return Err(BuildError::InvalidConfig(format!(
                "tail mass {} is outside [0,1]",
                args.eft
            )));
        }

        let (seed, do_reseeding) = if args.seed == 0 {
            (arbitrary_seed(), false)
        } else {
            (args.seed, true)
        };

        Ok(Builder {
            prior: Prior::for_alphabet(&alphabet),
            alphabet,
            arch: args.arch_strategy(),
            weighting: args.weight_strategy(),
            effn: args.effn_strategy(),
            symfrac: args.symfrac,
            pbswitch: args.pbswitch,
            wid: args.wid,
            eid: args.eid,
            ere: args.ere,
            esigma: args.esigma,
            calibration: CalibrationParams {
                ev_l: args.ev_l,
                ev_n: args.ev_n,
                ef_l: args.ef_l,
                ef_n: args.ef_n,
                tail_mass: args.eft,
            },
            seed,
            do_reseeding,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
            scoresys: None,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Load and probabilify the scoring system for single-sequence builds,
    /// replacing any previous one. `mxfile` of `None` selects the built-in
    /// default matrix for the alphabet; a named file is resolved against
    /// the working directory and then the colon-separated directories of
    /// `env`.
    pub fn set_score_system(
        &mut self,
        mxfile: Option<&Path>,
        env: Option<&str>,
        popen: f64,
        pextend: f64,
    ) -> Result<()> {
        if !(0.0..0.5).contains(&popen) {
            return Err(BuildError::InvalidConfig(format!(
                "gap open probability {} is outside [0,0.5)",
                popen
            )));
        }
        if !(0.0..1.0).contains(&pextend) {
            return Err(BuildError::InvalidConfig(format!(
                "gap extend probability {} is outside [0,1)",
                pextend
            )));
        }
        let matrix = ScoreMatrix::load(mxfile, env, &self.alphabet)?;
        if !matrix.is_symmetric() {
            return Err(BuildError::Format(
                "score matrix is not symmetric".into(),
            ));
        }
        let (q, _, _) = probify::conditionalize(&matrix)?;
        self.scoresys = Some(ScoreSystem { matrix, q, popen, pextend });
        Ok(())
    }

    /// Run the full alignment build pipeline.
    pub fn build(&mut self, mut msa: Msa, request: &BuildRequest) -> Result<BuildOutputs> {
        if msa.nseq() == 0 {
            return Err(BuildError::NoResult("alignment has no sequences".into()));
        }
        if msa.alphabet != self.alphabet {
            return Err(BuildError::InvalidConfig(
                "alignment alphabet does not match the builder's".into(),
            ));
        }

        self.relative_weights(&mut msa)?;
        let want_traces = request.post_msa || request.trace;
        let (mut hmm, mut traces) = self.build_model(&msa, want_traces)?;
        hmm = self.effective_seqnumber(&msa, hmm)?;
        hmm = self.parameterize(hmm)?;
        self.annotate(&mut hmm, &msa)?;
        let profile = self.calibrate(&mut hmm)?;

        let post_msa = match &traces {
            Some(traces) if request.post_msa => Some(self.make_post_msa(&msa, traces, hmm.m)?),
            _ => None,
        };
        if !request.trace {
            traces = None;
        }
        let optimized = request
            .optimized
            .then(|| OptimizedProfile::from_profile(&profile));
        let profile = request.profile.then_some(profile);

        Ok(BuildOutputs { hmm, profile, optimized, post_msa, traces })
    }

    /// Build and calibrate a one-sequence model. Requires a scoring system
    /// configured with [`Builder::set_score_system`].
    pub fn build_single(
        &mut self,
        dsq: &[u8],
        name: Option<&str>,
        request: &BuildRequest,
    ) -> Result<SingleOutputs> {
        let scoresys = self.scoresys.as_ref().ok_or_else(|| {
            BuildError::InvalidConfig(
                "score system not set; single-sequence builds need a substitution matrix".into(),
            )
        })?;
        let bg = Bg::new(&self.alphabet);
        let mut hmm = seqmodel::seqmodel(dsq, name, scoresys, &bg)?;
        hmm.ctime = Some(timestamp());
        let profile = self.calibrate(&mut hmm)?;
        let optimized = request
            .optimized
            .then(|| OptimizedProfile::from_profile(&profile));
        let profile = request.profile.then_some(profile);
        let trace = request.trace.then(|| Trace::faux(dsq.len()));
        Ok(SingleOutputs { hmm, profile, optimized, trace })
    }

    /// Stage 1: relative sequence weights. Deep alignments fall back to
    /// the linear-time position-based algorithm when the tree and cluster
    /// weighters would be quadratic in sequence count.
    fn relative_weights(&self, msa: &mut Msa) -> Result<()> {
        let strategy = match self.weighting {
            WeightStrategy::Gsc | WeightStrategy::Blosum
                if self.pbswitch > 0 && msa.nseq() >= self.pbswitch =>
            {
                WeightStrategy::PositionBased
            }
            s => s,
        };
        match strategy {
            WeightStrategy::None => {
                msa.wgt = vec![1.0; msa.nseq()];
                Ok(())
            }
            WeightStrategy::Given => Ok(()),
            WeightStrategy::PositionBased => weights::position_based(msa),
            WeightStrategy::Gsc => weights::gsc(msa),
            WeightStrategy::Blosum => weights::blosum(msa, self.wid),
        }
    }

    /// Stage 2: architecture and weighted observed counts.
    fn build_model(&self, msa: &Msa, want_traces: bool) -> Result<(Hmm, Option<Vec<Trace>>)> {
        let result = match self.arch {
            ArchStrategy::Fast => modelmaker::fast(msa, self.symfrac, want_traces),
            ArchStrategy::Hand => modelmaker::hand(msa, want_traces),
        };
        result.map_err(|e| {
            let name = msa.name.as_deref().unwrap_or("(unnamed)");
            match (e, self.arch) {
                (modelmaker::MakerError::NoConsensus, ArchStrategy::Fast) => {
                    BuildError::NoResult(format!(
                        "alignment {} has no columns above the {:.0}% residue threshold; \
                         no model can be built from it",
                        name,
                        self.symfrac * 100.0
                    ))
                }
                (modelmaker::MakerError::NoConsensus, ArchStrategy::Hand) => {
                    BuildError::NoResult(format!(
                        "reference annotation of alignment {} marks no consensus columns",
                        name
                    ))
                }
                (modelmaker::MakerError::MissingRf, _) => BuildError::Format(format!(
                    "hand architecture requested but alignment {} has no reference annotation line",
                    name
                )),
            }
        })
    }

    /// Stage 3: effective sequence number; rescales the count mass.
    fn effective_seqnumber(&self, msa: &Msa, mut hmm: Hmm) -> Result<Hmm> {
        let eff = match self.effn {
            EffnStrategy::None => hmm.nseq as f64,
            EffnStrategy::Set(v) => v,
            EffnStrategy::Cluster => {
                let (_, nclusters) = cluster::single_linkage(msa, self.eid);
                nclusters as f64
            }
            EffnStrategy::Entropy => {
                let bg = Bg::new(&self.alphabet);
                let etarget = self
                    .ere
                    .unwrap_or_else(|| effn::default_target_relent(&self.alphabet, self.esigma, hmm.m));
                effn::entropy_weight(&hmm, &bg, &self.prior, etarget)?
            }
        };
        hmm.scale(eff / hmm.nseq as f64);
        hmm.eff_nseq = eff;
        Ok(hmm)
    }

    /// Stage 4: counts to probabilities.
    fn parameterize(&self, mut hmm: Hmm) -> Result<Hmm> {
        prior::parameter_estimation(&mut hmm, &self.prior)
            .map_err(|e| BuildError::InvalidConfig(format!("parameter estimation failed: {}", e)))?;
        Ok(hmm)
    }

    /// Stage 5: carry the alignment's annotation onto the model and stamp
    /// its residue composition.
    fn annotate(&self, hmm: &mut Hmm, msa: &Msa) -> Result<()> {
        hmm.name = Some(match &msa.name {
            Some(n) => n.clone(),
            None => {
                return Err(BuildError::InvalidConfig(
                    "unable to name the model: alignment has no name".into(),
                ))
            }
        });
        hmm.acc = msa.acc.clone();
        hmm.desc = msa.desc.clone();
        hmm.ctime = Some(timestamp());
        hmm.checksum = Some(msa.checksum());
        hmm.cutoffs = msa.cutoffs;
        hmm.set_composition();
        Ok(())
    }

    /// Stage 6: E-value statistics, stamped onto the model. Returns the
    /// profile the simulation scored with.
    fn calibrate(&mut self, hmm: &mut Hmm) -> Result<Profile> {
        if self.do_reseeding {
            self.rng = Xoshiro256PlusPlus::seed_from_u64(self.seed);
        }
        let bg = Bg::new(&self.alphabet);
        let cal = calibrate::calibrate(hmm, &bg, &mut self.rng, &self.calibration)?;
        hmm.evparams = Some(cal.evparams);
        Ok(cal.profile)
    }

    /// Stage 7: rebuild the master alignment in model coordinates.
    fn make_post_msa(&self, msa: &Msa, traces: &[Trace], m: usize) -> Result<Msa> {
        tracealign::trace_align(msa, traces, m)
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%a %b %e %H:%M:%S %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family_msa() -> Msa {
        // ten noisy copies of one ungapped family
        let rows: Vec<&[u8]> = vec![
            b"ACDEFGHIKLMNPQRSTVWY",
            b"ACDEFGHIKLMNPQRSTVWY",
            b"ACDEFGHIKLMNPQRSTVWA",
            b"ACDEFGHIKLMNPQRSTVWY",
            b"ACDEFGHIKLMNPQRSTCWY",
            b"ACDEFGHIKLMNPQRSTVWY",
            b"GCDEFGHIKLMNPQRSTVWY",
            b"ACDEFGHIKLMNPQRSTVWY",
            b"ACDEFGHIKLMNPQRSTVWY",
            b"ACDEFGTIKLMNPQRSTVWY",
        ];
        let names = (0..rows.len()).map(|i| format!("seq{}", i)).collect();
        let mut msa = Msa::from_rows(Alphabet::Amino, names, &rows).unwrap();
        msa.name = Some("fam1".into());
        msa
    }

    fn seeded_args() -> BuildArgs {
        BuildArgs { seed: 42, ev_n: 50, ef_n: 50, ..Default::default() }
    }

    fn seeded_builder() -> Builder {
        Builder::new(Alphabet::Amino, Some(&seeded_args())).unwrap()
    }

    #[test]
    fn test_pipeline_produces_calibrated_model() {
        let mut builder = seeded_builder();
        let out = builder.build(family_msa(), &BuildRequest::all()).unwrap();
        assert_eq!(out.hmm.m, 20);
        assert_eq!(out.hmm.nseq, 10);
        assert!(out.hmm.eff_nseq > 0.0 && out.hmm.eff_nseq <= 10.0);
        assert_eq!(out.hmm.name.as_deref(), Some("fam1"));
        assert!(out.hmm.checksum.is_some());
        assert!(out.hmm.ctime.is_some());
        assert!(out.hmm.evparams.is_some());
        assert_eq!(out.optimized.unwrap().m, 20);
        assert_eq!(out.post_msa.unwrap().nseq(), 10);
        assert_eq!(out.traces.unwrap().len(), 10);
        // rows carry normalized probabilities
        for k in 1..=out.hmm.m {
            let sum: f64 = out.hmm.mat[k].iter().sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_annotation_stamps_composition() {
        let mut builder = seeded_builder();
        let out = builder.build(family_msa(), &BuildRequest::default()).unwrap();
        let compo = out.hmm.compo.as_ref().expect("composition is stamped");
        assert_eq!(compo.len(), Alphabet::Amino.k());
        let sum: f64 = compo.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_unrequested_artifacts_are_absent() {
        let mut builder = seeded_builder();
        let out = builder.build(family_msa(), &BuildRequest::default()).unwrap();
        assert!(out.profile.is_none());
        assert!(out.optimized.is_none());
        assert!(out.post_msa.is_none());
        assert!(out.traces.is_none());
        assert!(out.hmm.evparams.is_some());
    }

    #[test]
    fn test_default_options_work() {
        let args = BuildArgs { ev_n: 20, ef_n: 20, seed: 1, ..Default::default() };
        let mut builder = Builder::new(Alphabet::Amino, Some(&args)).unwrap();
        let out = builder.build(family_msa(), &BuildRequest::default()).unwrap();
        assert_eq!(out.hmm.m, 20);
    }

    #[test]
    fn test_same_seed_reproduces_statistics() {
        let o1 = seeded_builder().build(family_msa(), &BuildRequest::default()).unwrap();
        let o2 = seeded_builder().build(family_msa(), &BuildRequest::default()).unwrap();
        assert_eq!(o1.hmm.evparams, o2.hmm.evparams);
    }

    #[test]
    fn test_reseeding_makes_repeat_builds_identical() {
        let mut builder = seeded_builder();
        let o1 = builder.build(family_msa(), &BuildRequest::default()).unwrap();
        let o2 = builder.build(family_msa(), &BuildRequest::default()).unwrap();
        assert_eq!(o1.hmm.evparams, o2.hmm.evparams);
    }

    #[test]
    fn test_zero_seed_builders_differ() {
        let args = BuildArgs { ev_n: 50, ef_n: 50, ..Default::default() };
        let b1 = Builder::new(Alphabet::Amino, Some(&args)).unwrap();
        let b2 = Builder::new(Alphabet::Amino, Some(&args)).unwrap();
        assert_ne!(b1.seed(), b2.seed());
    }

    #[test]
    fn test_alphabet_mismatch_rejected() {
        let mut builder = Builder::new(Alphabet::Dna, Some(&seeded_args())).unwrap();
        assert!(matches!(
            builder.build(family_msa(), &BuildRequest::default()),
            Err(BuildError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_no_consensus_is_no_result() {
        let rows: Vec<Vec<u8>> = (0..50)
            .map(|i| {
                let mut row = vec![b'-'; 50];
                row[i] = b'A';
                row
            })
            .collect();
        let refs: Vec<&[u8]> = rows.iter().map(|r| r.as_slice()).collect();
        let names = (0..50).map(|i| format!("s{}", i)).collect();
        let mut msa = Msa::from_rows(Alphabet::Amino, names, &refs).unwrap();
        msa.name = Some("sparse".into());
        let mut builder = seeded_builder();
        match builder.build(msa, &BuildRequest::default()) {
            Err(BuildError::NoResult(msg)) => assert!(msg.contains("sparse")),
            other => panic!("expected NoResult, got {:?}", other.map(|o| o.hmm.m)),
        }
    }

    #[test]
    fn test_hand_without_rf_is_format_error() {
        let args = BuildArgs { hand: true, ..seeded_args() };
        let mut builder = Builder::new(Alphabet::Amino, Some(&args)).unwrap();
        assert!(matches!(
            builder.build(family_msa(), &BuildRequest::default()),
            Err(BuildError::Format(_))
        ));
    }

    #[test]
    fn test_fixed_effective_number_honored() {
        let args = BuildArgs { eset: Some(3.5), ..seeded_args() };
        let mut builder = Builder::new(Alphabet::Amino, Some(&args)).unwrap();
        let out = builder.build(family_msa(), &BuildRequest::default()).unwrap();
        assert!((out.hmm.eff_nseq - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_eset_rejected() {
        let args = BuildArgs { eset: Some(-1.0), ..Default::default() };
        assert!(matches!(
            Builder::new(Alphabet::Amino, Some(&args)),
            Err(BuildError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_single_requires_score_system() {
        let mut builder = seeded_builder();
        let dsq = Alphabet::Amino.digitize_seq(b"ACDEFGHIKL");
        assert!(matches!(
            builder.build_single(&dsq, Some("q"), &BuildRequest::default()),
            Err(BuildError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_asymmetric_matrix_rejected_before_probabilification() {
        let dir = std::env::temp_dir().join("hmmforge_asym_mx");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("asym.mat");
        let mut text = String::from("   A C G T\n");
        text.push_str("A 1 0 0 0\nC 2 1 0 0\nG 0 0 1 0\nT 0 0 0 1\n");
        std::fs::write(&path, text).unwrap();

        let mut builder = Builder::new(Alphabet::Dna, None).unwrap();
        match builder.set_score_system(Some(path.as_path()), None, 0.02, 0.4) {
            Err(BuildError::Format(msg)) => assert!(msg.contains("symmetric")),
            other => panic!("expected Format error, got {:?}", other),
        }
    }

    #[test]
    fn test_single_with_default_matrix() {
        let mut builder = seeded_builder();
        builder.set_score_system(None, None, 0.02, 0.4).unwrap();
        let dsq = Alphabet::Amino.digitize_seq(b"ACDEFGHIKLMNPQRSTVWY");
        let out = builder
            .build_single(&dsq, Some("q1"), &BuildRequest::all())
            .unwrap();
        assert_eq!(out.hmm.m, 20);
        assert_eq!(out.hmm.name.as_deref(), Some("q1"));
        assert!(out.hmm.evparams.is_some());
        let trace = out.trace.unwrap();
        assert_eq!(trace.m, 20);
        assert_eq!(trace.l, 20);
    }
}
