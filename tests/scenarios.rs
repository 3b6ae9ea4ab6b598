//! End-to-end scenarios from `SPEC_FULL.md` §8, run as a black-box integration suite
//! against the crate's public API only (mirrors the teacher's own `tests/` directory,
//! which exercises `secret_tree::SecretTree` the same way rather than reaching into
//! private internals).

use fss_core::{
    pir, DcfEvaluator, DcfKeyGenerator, DcfParameters, DpfEvaluator, DpfKeyGenerator,
    DpfParameters, EvalType, OutputMode, Prg,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use secrecy::ExposeSecret;

fn reconstruct(e: u32, share0: u64, share1: u64) -> u64 {
    let sum = share0.wrapping_add(share1);
    if e >= 64 {
        sum
    } else {
        sum & ((1u64 << e) - 1)
    }
}

/// S1: n=3, e=3, eval=Naive, (alpha, beta) = (5, 1): eval_at(x=5) reconstructs to 1;
/// eval_at(x=7) reconstructs to 0.
#[test]
fn s1_naive_dpf_point_function() {
    let prg = Prg::new();
    let (params, downgrades) =
        DpfParameters::resolve(3, 3, EvalType::Naive, OutputMode::ShiftedAdditive).unwrap();
    assert!(downgrades.is_empty());

    let generator = DpfKeyGenerator::new(&prg, params);
    let mut rng = ChaCha20Rng::seed_from_u64(0xbeef_0001);
    let (key0, key1) = generator.generate_keys(5, 1, &mut rng).unwrap();

    let evaluator = DpfEvaluator::new(&prg, params);
    let share0 = evaluator.evaluate_at(&key0, 5).unwrap();
    let share1 = evaluator.evaluate_at(&key1, 5).unwrap();
    assert_eq!(reconstruct(3, share0, share1), 1);

    let share0 = evaluator.evaluate_at(&key0, 7).unwrap();
    let share1 = evaluator.evaluate_at(&key1, 7).unwrap();
    assert_eq!(reconstruct(3, share0, share1), 0);
}

/// S2: n=10, e=10, eval=HybridBatched, (alpha, beta) = (5, 1): the full-domain
/// reconstruction vector has outputs[5] = 1 and outputs[i] = 0 for every other i.
#[test]
fn s2_hybrid_batched_full_domain_reconstruction() {
    let prg = Prg::new();
    let (params, _) =
        DpfParameters::resolve(10, 10, EvalType::HybridBatched, OutputMode::ShiftedAdditive)
            .unwrap();
    let generator = DpfKeyGenerator::new(&prg, params);
    let mut rng = ChaCha20Rng::seed_from_u64(0xbeef_0002);
    let (key0, key1) = generator.generate_keys(5, 1, &mut rng).unwrap();

    let evaluator = DpfEvaluator::new(&prg, params);
    let domain = 1usize << params.n();
    let mut full0 = vec![0u64; domain];
    let mut full1 = vec![0u64; domain];
    evaluator.evaluate_full_domain(&key0, &mut full0).unwrap();
    evaluator.evaluate_full_domain(&key1, &mut full1).unwrap();

    for i in 0..domain {
        let expected = if i == 5 { 1 } else { 0 };
        assert_eq!(
            reconstruct(params.e(), full0[i], full1[i]),
            expected,
            "i = {i}"
        );
    }
}

/// S3: n=10, e=1, SingleBitMask, alpha=5: the XOR of the reconstructed leaf blocks has
/// exactly one bit set, at the position corresponding to alpha, and is zero elsewhere.
#[test]
fn s3_single_bit_mask_reconstruction() {
    let prg = Prg::new();
    let (params, downgrades) =
        DpfParameters::resolve(10, 1, EvalType::HybridBatched, OutputMode::SingleBitMask)
            .unwrap();
    assert!(downgrades.is_empty());
    let generator = DpfKeyGenerator::new(&prg, params);
    let mut rng = ChaCha20Rng::seed_from_u64(0xbeef_0003);
    let (key0, key1) = generator.generate_keys(5, 1, &mut rng).unwrap();

    let evaluator = DpfEvaluator::new(&prg, params);
    let domain = 1usize << params.n();
    for x in 0..domain as u64 {
        let share0 = evaluator.evaluate_at(&key0, x).unwrap();
        let share1 = evaluator.evaluate_at(&key1, x).unwrap();
        let expected = if x == 5 { 1 } else { 0 };
        assert_eq!(share0 ^ share1, expected, "x = {x}");
    }
}

/// S4: DCF n=3, e=3, (alpha, beta) = (5, 1): eval_at(x=3) reconstructs to 1 (3 < 5);
/// eval_at(x=7) reconstructs to 0 (7 >= 5).
#[test]
fn s4_dcf_comparison_function() {
    let prg = Prg::new();
    let params = DcfParameters::resolve(3, 3).unwrap();
    let generator = DcfKeyGenerator::new(&prg, params);
    let mut rng = ChaCha20Rng::seed_from_u64(0xbeef_0004);
    let (key0, key1) = generator.generate_keys(5, 1, &mut rng).unwrap();

    let evaluator = DcfEvaluator::new(&prg, params);
    let share0 = evaluator.evaluate_at(&key0, 3).unwrap();
    let share1 = evaluator.evaluate_at(&key1, 3).unwrap();
    assert_eq!(reconstruct(3, share0, share1), 1);

    let share0 = evaluator.evaluate_at(&key0, 7).unwrap();
    let share1 = evaluator.evaluate_at(&key1, 7).unwrap();
    assert_eq!(reconstruct(3, share0, share1), 0);
}

/// S5: a key generated at n=20, e=20 with early termination enabled (r=2, nu=18)
/// serializes to `8 + 16 + 8 + 16*18 + 18 + 18 + 16 = 372` bytes and round-trips.
#[test]
fn s5_serialized_size_and_round_trip() {
    let prg = Prg::new();
    let (params, _) =
        DpfParameters::resolve(20, 20, EvalType::HybridBatched, OutputMode::ShiftedAdditive)
            .unwrap();
    assert_eq!(params.nu(), 18);
    assert_eq!(params.r(), 2);

    let generator = DpfKeyGenerator::new(&prg, params);
    let mut rng = ChaCha20Rng::seed_from_u64(0xbeef_0005);
    let (key0, _key1) = generator.generate_keys(123_456, 7, &mut rng).unwrap();

    let bytes = key0.serialize();
    assert_eq!(bytes.len(), 372);
    assert_eq!(bytes.len(), fss_core::DpfKey::serialized_size(&params));

    let restored = fss_core::DpfKey::deserialize(&bytes).unwrap();
    assert!(key0.equals(&restored));
}

/// S6: the parameter resolver downgrades an unsatisfiable request and leaves a
/// satisfiable one untouched (see also `params::tests::s6_*` for the unit-level check).
#[test]
fn s6_parameter_resolver_downgrade_table() {
    let (satisfiable, downgrades) =
        DpfParameters::resolve(10, 1, EvalType::Recursion, OutputMode::SingleBitMask).unwrap();
    assert!(downgrades.is_empty());
    assert!(satisfiable.enable_et());
    assert_eq!(satisfiable.nu(), 3);

    let (downgraded, downgrades) =
        DpfParameters::resolve(5, 1, EvalType::HybridBatched, OutputMode::SingleBitMask).unwrap();
    assert_eq!(downgrades.len(), 2);
    assert!(!downgraded.enable_et());
    assert_eq!(downgraded.eval_type(), EvalType::Naive);
    assert_eq!(downgraded.output_mode(), OutputMode::ShiftedAdditive);
}

/// P1: DPF point correctness swept across a grid of (n, e, alpha, beta, x).
#[test]
fn p1_dpf_point_correctness_grid() {
    let prg = Prg::new();
    for (seed, n, e, alpha, beta) in [
        (1u64, 5u32, 4u32, 3u64, 9u64),
        (2, 6, 1, 0, 1),
        (3, 9, 13, 400, 7000),
        (4, 12, 32, 2000, 123_456),
    ] {
        let (params, _) =
            DpfParameters::resolve(n, e, EvalType::Naive, OutputMode::ShiftedAdditive).unwrap();
        let generator = DpfKeyGenerator::new(&prg, params);
        let mut rng = ChaCha20Rng::seed_from_u64(0xc1a0_0000u64.wrapping_add(seed));
        let (key0, key1) = generator.generate_keys(alpha, beta, &mut rng).unwrap();

        let evaluator = DpfEvaluator::new(&prg, params);
        let domain = 1u64 << n;
        let sampled = (0..domain)
            .step_by(if n > 8 { 17 } else { 1 })
            .chain([alpha]);
        for x in sampled {
            let share0 = evaluator.evaluate_at(&key0, x).unwrap();
            let share1 = evaluator.evaluate_at(&key1, x).unwrap();
            let expected = if x == alpha { beta & mask_to_bits(e) } else { 0 };
            assert_eq!(reconstruct(e, share0, share1), expected, "n={n} e={e} x={x}");
        }
    }
}

fn mask_to_bits(e: u32) -> u64 {
    if e >= 64 {
        u64::MAX
    } else {
        (1u64 << e) - 1
    }
}

/// P6 (statistical): a party's root seed and published seed correction words look like
/// uniform random bits, not like a function of (alpha, beta). This is a coarse sanity
/// check on bit balance, not a rigorous indistinguishability proof.
#[test]
fn p6_seed_and_correction_word_bits_are_balanced() {
    let prg = Prg::new();
    let (params, _) =
        DpfParameters::resolve(10, 8, EvalType::Naive, OutputMode::ShiftedAdditive).unwrap();
    let generator = DpfKeyGenerator::new(&prg, params);

    let mut ones: u64 = 0;
    let mut total: u64 = 0;
    for trial in 0..300u64 {
        let mut rng = ChaCha20Rng::seed_from_u64(0xfeed_0000u64.wrapping_add(trial));
        let alpha = trial % (1 << params.n());
        let (key0, _key1) = generator.generate_keys(alpha, 1, &mut rng).unwrap();

        for byte in key0.init_seed().expose_secret().to_bytes() {
            ones += byte.count_ones() as u64;
            total += 8;
        }
    }

    let fraction = ones as f64 / total as f64;
    assert!(
        (0.45..0.55).contains(&fraction),
        "seed bit balance {fraction} outside [0.45, 0.55] over {total} bits"
    );
}

/// P7: the reconstructed value at every point agrees whether early termination is
/// enabled or disabled, for the same (alpha, beta).
#[test]
fn p7_early_termination_equivalence() {
    let prg = Prg::new();
    let (et_off, _) =
        DpfParameters::resolve(9, 5, EvalType::Naive, OutputMode::ShiftedAdditive).unwrap();
    let (et_on, _) =
        DpfParameters::resolve(9, 5, EvalType::Recursion, OutputMode::ShiftedAdditive).unwrap();

    let gen_off = DpfKeyGenerator::new(&prg, et_off);
    let gen_on = DpfKeyGenerator::new(&prg, et_on);
    let mut rng_off = ChaCha20Rng::seed_from_u64(0xca7f_0000);
    let mut rng_on = ChaCha20Rng::seed_from_u64(0xca7f_0001);
    let (key0_off, key1_off) = gen_off.generate_keys(301, 11, &mut rng_off).unwrap();
    let (key0_on, key1_on) = gen_on.generate_keys(301, 11, &mut rng_on).unwrap();

    let eval_off = DpfEvaluator::new(&prg, et_off);
    let eval_on = DpfEvaluator::new(&prg, et_on);
    for x in 0..(1u64 << 9) {
        let off = reconstruct(
            5,
            eval_off.evaluate_at(&key0_off, x).unwrap(),
            eval_off.evaluate_at(&key1_off, x).unwrap(),
        );
        let on = reconstruct(
            5,
            eval_on.evaluate_at(&key0_on, x).unwrap(),
            eval_on.evaluate_at(&key1_on, x).unwrap(),
        );
        assert_eq!(off, on, "x = {x}");
    }
}

/// A full PIR-style round trip: full-domain-evaluate a DPF key pair and fold both
/// shares against a public database, recovering `db[alpha]`.
#[test]
fn pir_dot_product_recovers_indexed_entry() {
    let prg = Prg::new();
    let (params, _) =
        DpfParameters::resolve(9, 16, EvalType::HybridBatched, OutputMode::ShiftedAdditive)
            .unwrap();
    let generator = DpfKeyGenerator::new(&prg, params);
    let mut rng = ChaCha20Rng::seed_from_u64(0xdead_beef);
    let alpha = 271u64;
    let (key0, key1) = generator.generate_keys(alpha, 1, &mut rng).unwrap();

    let evaluator = DpfEvaluator::new(&prg, params);
    let leaf_count = 1usize << params.cw_length();
    let mut blocks0 = vec![fss_core::Block::ZERO; leaf_count];
    let mut blocks1 = vec![fss_core::Block::ZERO; leaf_count];
    evaluator
        .evaluate_full_domain_blocks(&key0, &mut blocks0)
        .unwrap();
    evaluator
        .evaluate_full_domain_blocks(&key1, &mut blocks1)
        .unwrap();

    let n = params.n();
    let db: Vec<u64> = (0..(1u64 << n)).map(|i| (i * 7 + 3) & 0xffff).collect();

    let share0 = pir::dot_product(&blocks0, &db, params.r(), n).unwrap();
    let share1 = pir::dot_product(&blocks1, &db, params.r(), n).unwrap();
    let reconstructed = share0.wrapping_add(share1) & mask_to_bits(params.e());
    assert_eq!(reconstructed, db[alpha as usize] & mask_to_bits(params.e()));
}
