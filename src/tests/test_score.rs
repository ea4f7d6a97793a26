use approx::assert_abs_diff_eq;

use crate::errors::SeriationError;
use crate::permutation::Permutation;
use crate::score::{p_sum_score, score, LossKind};
use crate::similarity::SimilarityMatrix;
use crate::tests::init;
use crate::tests::test_data::{
    banded_rows, circular_banded_rows, dense, random_symmetric_rows, sparse,
};

const LOSSES: [LossKind; 4] = [LossKind::OneSum, LossKind::TwoSum, LossKind::Huber, LossKind::R2S];

fn brute_force_one_sum(rows: &[Vec<f64>], p: &Permutation) -> f64 {
    let n = rows.len();
    let mut total = 0.0;
    for i in 0..n {
        for j in 0..n {
            total += rows[i][j] * p.rank(i).abs_diff(p.rank(j)) as f64;
        }
    }
    total
}

/// Single symmetric pair (0, n−1) with weight 2.
fn far_pair(n: usize) -> SimilarityMatrix {
    SimilarityMatrix::from_triplets(n, &[0, n - 1], &[n - 1, 0], &[2.0, 2.0]).unwrap()
}

#[test]
fn test_one_sum_matches_brute_force() {
    init();
    for seed in 0..5 {
        let rows = random_symmetric_rows(9, seed);
        let p = Permutation::random(9, seed + 100);
        let expected = brute_force_one_sum(&rows, &p);
        for x in [dense(&rows), sparse(&rows)] {
            let got = score(&x, LossKind::OneSum, 1, Some(&p), false).unwrap();
            assert_abs_diff_eq!(got, expected, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_identity_when_no_permutation() {
    let rows = random_symmetric_rows(7, 42);
    let x = dense(&rows);
    for loss in LOSSES {
        let implicit = score(&x, loss, 2, None, false).unwrap();
        let explicit = score(&x, loss, 2, Some(&Permutation::identity(7)), false).unwrap();
        assert_abs_diff_eq!(implicit, explicit, epsilon = 1e-12);
    }
}

#[test]
fn test_dense_and_sparse_agree() {
    init();
    let rows = random_symmetric_rows(12, 7);
    let (d, s) = (dense(&rows), sparse(&rows));
    let p = Permutation::random(12, 1);
    for loss in LOSSES {
        for circular in [false, true] {
            for dh in [1, 3, 6] {
                let a = score(&d, loss, dh, Some(&p), circular).unwrap();
                let b = score(&s, loss, dh, Some(&p), circular).unwrap();
                assert_abs_diff_eq!(a, b, epsilon = 1e-9);
            }
        }
    }
}

#[test]
fn test_hand_computed_losses() {
    let x = far_pair(6);
    // d = 5, dh = 2, two stored entries of weight 2
    assert_abs_diff_eq!(score(&x, LossKind::OneSum, 2, None, false).unwrap(), 20.0);
    assert_abs_diff_eq!(score(&x, LossKind::TwoSum, 2, None, false).unwrap(), 100.0);
    assert_abs_diff_eq!(score(&x, LossKind::Huber, 2, None, false).unwrap(), 64.0);
    assert_abs_diff_eq!(score(&x, LossKind::R2S, 2, None, false).unwrap(), 16.0);

    // on the cycle the pair is adjacent
    assert_abs_diff_eq!(score(&x, LossKind::OneSum, 2, None, true).unwrap(), 4.0);
    assert_abs_diff_eq!(score(&x, LossKind::Huber, 2, None, true).unwrap(), 4.0);
}

#[test]
fn test_huber_is_continuous_at_band_edge() {
    for dh in 1..6 {
        let h = dh as f64;
        let inside = LossKind::Huber.transform(dh, dh, 100, false);
        let outside = LossKind::Huber.transform(dh + 1, dh, 100, false);
        assert_abs_diff_eq!(inside, h * h);
        // linear branch evaluated at the edge meets the quadratic one
        assert_abs_diff_eq!(2.0 * h * h - h * h, inside);
        assert_abs_diff_eq!(outside, h * h + 2.0 * h);
    }
}

#[test]
fn test_huber_equals_two_sum_for_wide_band() {
    let rows = random_symmetric_rows(10, 3);
    let x = sparse(&rows);
    let p = Permutation::random(10, 9);
    for circular in [false, true] {
        for dh in [10, 11, 25] {
            let huber = score(&x, LossKind::Huber, dh, Some(&p), circular).unwrap();
            let two = score(&x, LossKind::TwoSum, dh, Some(&p), circular).unwrap();
            assert_abs_diff_eq!(huber, two, epsilon = 1e-9);
        }
    }
}

#[test]
fn test_r2s_never_exceeds_two_sum() {
    for seed in 0..4 {
        let rows = random_symmetric_rows(11, seed);
        let x = dense(&rows);
        let p = Permutation::random(11, seed);
        for circular in [false, true] {
            for dh in 1..12 {
                let r2s = score(&x, LossKind::R2S, dh, Some(&p), circular).unwrap();
                let two = score(&x, LossKind::TwoSum, dh, Some(&p), circular).unwrap();
                assert!(r2s <= two + 1e-9, "R2S {} > 2SUM {} (dh={})", r2s, two, dh);
            }
        }
    }
}

#[test]
fn test_circular_banded_prefers_circular_distance() {
    let rows = circular_banded_rows(10, 2);
    let x = sparse(&rows);
    for loss in LOSSES {
        let circular = score(&x, loss, 2, None, true).unwrap();
        let linear = score(&x, loss, 2, None, false).unwrap();
        assert!(circular < linear, "{}: {} !< {}", loss, circular, linear);
    }
}

#[test]
fn test_banded_identity_is_optimal_one_sum() {
    let x = dense(&banded_rows(5, 1));
    let best = score(&x, LossKind::OneSum, 1, None, false).unwrap();
    assert_abs_diff_eq!(best, 8.0);
    for seed in 0..10 {
        let p = Permutation::random(5, seed);
        assert!(score(&x, LossKind::OneSum, 1, Some(&p), false).unwrap() >= best);
    }
}

#[test]
fn test_p_sum_matches_named_losses() {
    let x = sparse(&random_symmetric_rows(8, 5));
    let p = Permutation::random(8, 5);
    let one = score(&x, LossKind::OneSum, 1, Some(&p), false).unwrap();
    let two = score(&x, LossKind::TwoSum, 1, Some(&p), false).unwrap();
    assert_abs_diff_eq!(p_sum_score(&x, 1, Some(&p)).unwrap(), one, epsilon = 1e-9);
    assert_abs_diff_eq!(p_sum_score(&x, 2, Some(&p)).unwrap(), two, epsilon = 1e-9);
    assert!(p_sum_score(&x, 3, Some(&p)).unwrap() >= two);
    assert!(matches!(p_sum_score(&x, 0, None), Err(SeriationError::Config(_))));
    assert!(matches!(
        p_sum_score(&x, u32::MAX, None),
        Err(SeriationError::Config(_))
    ));
}

#[test]
fn test_invalid_inputs() {
    let x = far_pair(5);
    assert!(matches!(
        score(&x, LossKind::OneSum, 1, Some(&Permutation::identity(4)), false),
        Err(SeriationError::InvalidPermutation(_))
    ));
    assert!(matches!(
        score(&x, LossKind::Huber, 0, None, false),
        Err(SeriationError::Config(_))
    ));
}

#[test]
fn test_loss_names() {
    assert_eq!("1SUM".parse::<LossKind>().unwrap(), LossKind::OneSum);
    assert_eq!("2SUM".parse::<LossKind>().unwrap(), LossKind::TwoSum);
    assert_eq!("Huber".parse::<LossKind>().unwrap(), LossKind::Huber);
    assert_eq!("R2S".parse::<LossKind>().unwrap(), LossKind::R2S);
    for loss in LOSSES {
        assert_eq!(loss.to_string().parse::<LossKind>().unwrap(), loss);
    }
    match "3SUM".parse::<LossKind>() {
        Err(SeriationError::UnsupportedLoss(name)) => assert_eq!(name, "3SUM"),
        other => panic!("expected UnsupportedLoss, got {:?}", other),
    }
}

#[test]
fn test_empty_matrix_scores_zero() {
    let x = SimilarityMatrix::from_rows(&[]).unwrap();
    assert_eq!(x.n_items(), 0);
    // no empty dense grid exists, the empty matrix is stored sparse
    assert!(x.is_sparse());
    assert_eq!(x.n_edges(), 0);
    assert_abs_diff_eq!(score(&x, LossKind::TwoSum, 1, None, false).unwrap(), 0.0);
}
