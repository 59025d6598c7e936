//! End-to-end exercises of the build pipeline through the public API.

use hmmforge::alphabet::Alphabet;
use hmmforge::build::{BuildArgs, BuildRequest, Builder};
use hmmforge::error::BuildError;
use hmmforge::msa::Msa;

fn family_msa(name: &str) -> Msa {
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
    msa.name = Some(name.to_string());
    msa
}

fn quick_args(seed: u64) -> BuildArgs {
    BuildArgs { seed, ev_n: 50, ef_n: 50, ..Default::default() }
}

fn quick_builder(seed: u64) -> Builder {
    Builder::new(Alphabet::Amino, Some(&quick_args(seed))).unwrap()
}

fn built_weights(args: BuildArgs) -> Vec<f64> {
    let mut builder = Builder::new(Alphabet::Amino, Some(&args)).unwrap();
    let request = BuildRequest { post_msa: true, ..Default::default() };
    let out = builder.build(family_msa("fam1"), &request).unwrap();
    out.post_msa.unwrap().wgt
}

#[test]
fn deep_family_is_downweighted_and_calibrated() {
    let mut builder = quick_builder(42);
    let out = builder.build(family_msa("fam1"), &BuildRequest::all()).unwrap();

    assert_eq!(out.hmm.m, 20);
    assert!(out.hmm.eff_nseq < out.hmm.nseq as f64);
    let ev = out.hmm.evparams.expect("model is calibrated");
    assert!(ev.lambda > 0.0);
    assert!(ev.vit_mu.is_finite());
    assert!(ev.fwd_tau.is_finite());
    assert!((ev.tail_mass - 0.04).abs() < 1e-12);

    // a family member scores far above the random-sequence location
    let member = Alphabet::Amino.digitize_seq(b"ACDEFGHIKLMNPQRSTVWY");
    let profile = out.profile.expect("profile was requested");
    assert!(profile.viterbi_score(&member) > ev.vit_mu);
}

#[test]
fn unrequested_artifacts_are_never_materialized() {
    let mut builder = quick_builder(42);
    let out = builder
        .build(family_msa("fam1"), &BuildRequest::default())
        .unwrap();
    assert!(out.profile.is_none());
    assert!(out.optimized.is_none());
    assert!(out.post_msa.is_none());
    assert!(out.traces.is_none());
}

#[test]
fn post_msa_round_trips_through_hand_architecture() {
    let mut builder = quick_builder(42);
    let request = BuildRequest { post_msa: true, ..Default::default() };
    let out = builder.build(family_msa("fam1"), &request).unwrap();
    let post_msa = out.post_msa.unwrap();
    assert_eq!(post_msa.nseq(), 10);
    assert!(post_msa.rf.is_some());

    let args = BuildArgs { hand: true, ..quick_args(42) };
    let mut hand_builder = Builder::new(Alphabet::Amino, Some(&args)).unwrap();
    let rebuilt = hand_builder.build(post_msa, &BuildRequest::default()).unwrap();
    assert_eq!(rebuilt.hmm.m, out.hmm.m);
}

#[test]
fn deep_alignment_overrides_tree_weights_with_position_based() {
    // ten sequences meet a pbswitch of five, so the tree weighter is
    // replaced by the position-based one
    let forced = built_weights(BuildArgs { wgsc: true, pbswitch: 5, ..quick_args(42) });
    let pb = built_weights(BuildArgs { wpb: true, ..quick_args(42) });
    assert_eq!(forced, pb);

    // pbswitch 0 disables the override
    let gsc = built_weights(BuildArgs { wgsc: true, pbswitch: 0, ..quick_args(42) });
    assert!(forced.iter().zip(&gsc).any(|(a, b)| (a - b).abs() > 1e-6));
}

#[test]
fn wnone_assigns_unit_weight_to_every_sequence() {
    let wgt = built_weights(BuildArgs { wnone: true, ..quick_args(42) });
    assert_eq!(wgt, vec![1.0; 10]);
}

#[test]
fn cluster_strategy_sets_effective_number_to_family_count() {
    let rows: Vec<&[u8]> = vec![
        b"ACDEFGHIKLMNPQRSTVWY",
        b"ACDEFGHIKLMNPQRSTVWY",
        b"ACDEFGHIKLMNPQRSTVWA",
        b"WYWYWYWYWYWYWYWYWYWY",
        b"WYWYWYWYWYWYWYWYWYWY",
    ];
    let names = (0..rows.len()).map(|i| format!("s{}", i)).collect();
    let mut msa = Msa::from_rows(Alphabet::Amino, names, &rows).unwrap();
    msa.name = Some("mix".into());

    let args = BuildArgs { eclust: true, ..quick_args(11) };
    let mut builder = Builder::new(Alphabet::Amino, Some(&args)).unwrap();
    let out = builder.build(msa, &BuildRequest::default()).unwrap();
    assert!((out.hmm.eff_nseq - 2.0).abs() < 1e-12);
}

#[test]
fn sparse_alignment_yields_no_result() {
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

    let mut builder = quick_builder(7);
    match builder.build(msa, &BuildRequest::default()) {
        Err(BuildError::NoResult(msg)) => assert!(msg.contains("sparse")),
        other => panic!("expected NoResult, got {:?}", other.map(|o| o.hmm.m)),
    }
}

#[test]
fn single_sequence_path_needs_a_score_system() {
    let mut builder = quick_builder(7);
    let dsq = Alphabet::Amino.digitize_seq(b"ACDEFGHIKLMNPQRSTVWY");
    assert!(matches!(
        builder.build_single(&dsq, Some("q"), &BuildRequest::default()),
        Err(BuildError::InvalidConfig(_))
    ));

    builder.set_score_system(None, None, 0.02, 0.4).unwrap();
    let out = builder
        .build_single(&dsq, Some("q"), &BuildRequest::all())
        .unwrap();
    assert_eq!(out.hmm.m, 20);
    assert!(out.hmm.evparams.is_some());
    let trace = out.trace.unwrap();
    assert_eq!(trace.m, 20);
    assert_eq!(trace.l, 20);
}

#[test]
fn fixed_seed_reproduces_fixed_calibration() {
    let req = BuildRequest::default();
    let o1 = quick_builder(99).build(family_msa("f"), &req).unwrap();
    let o2 = quick_builder(99).build(family_msa("f"), &req).unwrap();
    assert_eq!(o1.hmm.evparams, o2.hmm.evparams);

    let o3 = quick_builder(100).build(family_msa("f"), &req).unwrap();
    assert_ne!(o1.hmm.evparams, o3.hmm.evparams);
}

#[test]
fn zero_seed_varies_between_builders() {
    let b1 = quick_builder(0);
    let b2 = quick_builder(0);
    assert_ne!(b1.seed(), b2.seed());
}

#[test]
fn annotation_carried_from_alignment() {
    let mut msa = family_msa("globins");
    msa.acc = Some("PF00042".into());
    msa.desc = Some("Globin family".into());
    msa.cutoffs[hmmforge::msa::CUTOFF_GA] = Some((25.0, 25.0));
    let checksum = msa.checksum();

    let mut builder = quick_builder(3);
    let out = builder.build(msa, &BuildRequest::default()).unwrap();
    assert_eq!(out.hmm.name.as_deref(), Some("globins"));
    assert_eq!(out.hmm.acc.as_deref(), Some("PF00042"));
    assert_eq!(out.hmm.desc.as_deref(), Some("Globin family"));
    assert_eq!(out.hmm.checksum, Some(checksum));
    assert_eq!(out.hmm.cutoffs[hmmforge::msa::CUTOFF_GA], Some((25.0, 25.0)));
    assert!(out.hmm.ctime.is_some());
}

#[test]
fn summary_output_contains_statistics() {
    let mut builder = quick_builder(5);
    let out = builder.build(family_msa("fam1"), &BuildRequest::default()).unwrap();
    let mut buf = Vec::new();
    out.hmm.write_summary(&mut buf).unwrap();
    let text = String::from_utf8(buf).unwrap();
    assert!(text.contains("NAME  fam1"));
    assert!(text.contains("LENG  20"));
    assert!(text.contains("STATS LAMBDA"));
    assert!(text.ends_with("//\n"));
}
