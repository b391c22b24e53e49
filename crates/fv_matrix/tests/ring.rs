// crates/fv_matrix/tests/ring.rs

//! End-to-end multiply checks on a small periodic ring mesh.
//!
//! 4 cells connected in a ring give a discrete Laplacian whose behavior is
//! known in closed form, which pins down kernel semantics for every storage
//! kind and kernel variant.

use fv_matrix::{
    variant_list, BlockSize, FaceGroups, Matrix, MatrixKind, MatrixStructure, RotationMode,
    SpmvKernel, TranslationHalo,
};

const RING: [[usize; 2]; 4] = [[0, 1], [1, 2], [2, 3], [3, 0]];

/// Conflict-free grouping of the ring faces: (0,1)/(2,3) touch disjoint
/// cells, as do (1,2)/(3,0).
fn ring_groups() -> FaceGroups {
    let g = FaceGroups::new(vec![vec![0..1, 2..3], vec![1..2, 3..4]]);
    assert!(g.is_conflict_free(&RING));
    g
}

/// Laplacian of a constant field is zero, for every kind and scalar kernel.
#[test]
fn test_laplacian_of_constant_is_zero() {
    let groups = ring_groups();
    let da = [2.0; 4];
    let xa = [-1.0; 4];
    let x = [1.0; 4];

    for v in variant_list(0.5, 0.5, true) {
        let structure = MatrixStructure::new(v.kind, 4, 4, &RING);
        let mut m = Matrix::with_variant(&structure, &v);
        if v.kind == MatrixKind::Native {
            m.set_face_groups(&groups);
        }
        m.set_coefficients(true, BlockSize::SCALAR, Some(&da), Some(&xa))
            .unwrap();

        if v.kernels[0].is_none() {
            continue;
        }
        let mut y = [9.0; 4];
        m.vector_multiply_nosync(&x, &mut y).unwrap();
        for (ii, yi) in y.iter().enumerate() {
            assert!(yi.abs() < 1e-12, "{}: y[{ii}] = {yi}", v.name);
        }
    }
}

/// A.e0 picks out column 0: [2, -1, 0, -1] on the ring Laplacian.
#[test]
fn test_unit_vector_column() {
    let x = [1.0, 0.0, 0.0, 0.0];
    let expected = [2.0, -1.0, 0.0, -1.0];
    let da = [2.0; 4];
    let xa = [-1.0; 4];

    for kind in MatrixKind::ALL {
        let structure = MatrixStructure::new(kind, 4, 4, &RING);
        let mut m = Matrix::new(&structure);
        m.set_coefficients(true, BlockSize::SCALAR, Some(&da), Some(&xa))
            .unwrap();
        let mut y = [0.0; 4];
        m.vector_multiply_nosync(&x, &mut y).unwrap();
        for ii in 0..4 {
            assert!(
                (y[ii] - expected[ii]).abs() < 1e-12,
                "{kind}: y[{ii}] = {}",
                y[ii]
            );
        }
    }
}

/// Two faces joining the same cell pair merge into one slot whose value is
/// the sum of both face coefficients.
#[test]
fn test_duplicate_faces_accumulate() {
    let faces = [[0, 1], [1, 2], [2, 3], [3, 0], [0, 1]];
    let xa = [3.0, 0.0, 0.0, 0.0, 4.0];
    let da = [0.0; 4];
    let x = [0.0, 1.0, 0.0, 0.0];

    for kind in MatrixKind::ALL {
        let structure = MatrixStructure::new(kind, 4, 4, &faces);
        let mut m = Matrix::new(&structure);
        m.set_coefficients(true, BlockSize::SCALAR, Some(&da), Some(&xa))
            .unwrap();
        let mut y = [0.0; 4];
        m.vector_multiply_nosync(&x, &mut y).unwrap();
        assert!((y[0] - 7.0).abs() < 1e-12, "{kind}: y[0] = {}", y[0]);
    }
}

/// y_full = y_exdiag + D.x for every kind.
#[test]
fn test_diagonal_exclusion_recomposes() {
    let da = [2.0, 3.0, 4.0, 5.0];
    let xa = [-1.0, -0.5, -0.25, -2.0];
    let x = [0.3, -1.2, 2.5, 0.7];

    for kind in MatrixKind::ALL {
        let structure = MatrixStructure::new(kind, 4, 4, &RING);
        let mut m = Matrix::new(&structure);
        m.set_coefficients(true, BlockSize::SCALAR, Some(&da), Some(&xa))
            .unwrap();

        let mut y_full = [0.0; 4];
        let mut y_ex = [0.0; 4];
        let mut diag = [0.0; 4];
        m.vector_multiply_nosync(&x, &mut y_full).unwrap();
        m.exdiag_vector_multiply_nosync(&x, &mut y_ex).unwrap();
        m.get_diagonal(&mut diag).unwrap();

        for ii in 0..4 {
            let recomposed = y_ex[ii] + diag[ii] * x[ii];
            assert!(
                (y_full[ii] - recomposed).abs() < 1e-12,
                "{kind}: row {ii}"
            );
        }
    }
}

/// General (asymmetric) coefficients: forward and reverse couplings land on
/// the correct rows.
#[test]
fn test_asymmetric_couplings() {
    // single face 0 -> 1: A[0][1] = 10, A[1][0] = 20
    let faces = [[0usize, 1usize]];
    let da = [1.0, 1.0];
    let xa = [10.0, 20.0];
    let x = [1.0, 1.0];

    for kind in [MatrixKind::Native, MatrixKind::Csr, MatrixKind::Msr] {
        let structure = MatrixStructure::new(kind, 2, 2, &faces);
        let mut m = Matrix::new(&structure);
        m.set_coefficients(false, BlockSize::SCALAR, Some(&da), Some(&xa))
            .unwrap();
        let mut y = [0.0; 2];
        m.vector_multiply_nosync(&x, &mut y).unwrap();
        assert!((y[0] - 11.0).abs() < 1e-12, "{kind}: y[0] = {}", y[0]);
        assert!((y[1] - 21.0).abs() < 1e-12, "{kind}: y[1] = {}", y[1]);
    }
}

/// Fixed 3x3 block kernel is bit-identical to the generic blocked kernel.
#[test]
fn test_block_fixed3_matches_generic() {
    let b3 = BlockSize::fixed3();
    let da: Vec<f64> = (0..4 * b3.block_stride)
        .map(|i| 1.0 + (i as f64).cos())
        .collect();
    let xa: Vec<f64> = (0..4).map(|f| -0.5 * (1.0 + f as f64)).collect();
    let x: Vec<f64> = (0..4 * b3.vec_stride).map(|i| (i as f64).sin()).collect();

    let list = variant_list(0.5, 0.5, false);
    let generic = list.iter().find(|v| v.name == "Native, baseline").unwrap();
    let fixed = list.iter().find(|v| v.name == "Native, 3x3 blocks").unwrap();

    let mut outputs = Vec::new();
    for v in [generic, fixed] {
        let structure = MatrixStructure::new(MatrixKind::Native, 4, 4, &RING);
        let mut m = Matrix::with_variant(&structure, v);
        m.set_coefficients(true, b3, Some(&da), Some(&xa)).unwrap();
        let mut y = vec![0.0; 4 * b3.vec_stride];
        m.vector_multiply_nosync(&x, &mut y).unwrap();
        outputs.push(y);
    }
    assert_eq!(outputs[0], outputs[1], "blocked kernels must agree exactly");
}

/// Blocked multiply with diagonal blocks that act independently per
/// component matches three scalar multiplies.
#[test]
fn test_block_matches_componentwise_scalar() {
    let b3 = BlockSize::fixed3();
    // diagonal blocks diag(2, 2, 2): scalar equivalent has da = 2
    let mut da_b = vec![0.0; 4 * b3.block_stride];
    for ii in 0..4 {
        for kk in 0..3 {
            da_b[ii * 9 + kk * 3 + kk] = 2.0;
        }
    }
    let da_s = [2.0; 4];
    let xa = [-1.0; 4];

    let x_b: Vec<f64> = (0..12).map(|i| (i as f64) * 0.5 - 3.0).collect();

    let structure_b = MatrixStructure::new(MatrixKind::Native, 4, 4, &RING);
    let mut m_b = Matrix::new(&structure_b);
    m_b.set_coefficients(true, b3, Some(&da_b), Some(&xa))
        .unwrap();
    let mut y_b = vec![0.0; 12];
    m_b.vector_multiply_nosync(&x_b, &mut y_b).unwrap();

    let structure_s = MatrixStructure::new(MatrixKind::Native, 4, 4, &RING);
    let mut m_s = Matrix::new(&structure_s);
    m_s.set_coefficients(true, BlockSize::SCALAR, Some(&da_s), Some(&xa))
        .unwrap();

    for kk in 0..3 {
        let x_s: Vec<f64> = (0..4).map(|ii| x_b[ii * 3 + kk]).collect();
        let mut y_s = vec![0.0; 4];
        m_s.vector_multiply_nosync(&x_s, &mut y_s).unwrap();
        for ii in 0..4 {
            assert!(
                (y_b[ii * 3 + kk] - y_s[ii]).abs() < 1e-12,
                "component {kk}, row {ii}"
            );
        }
    }
}

/// The blocked kernel at degenerate extent 1 agrees with the scalar path.
#[test]
fn test_block_extent1_matches_scalar() {
    let b1 = BlockSize::from_extent(1);
    let da = [2.0, 3.0, 4.0, 5.0];
    let xa = [-1.0, -0.5, -0.25, -2.0];
    let x = [0.3, -0.7, 1.9, 0.2];

    let structure = MatrixStructure::new(MatrixKind::Native, 4, 4, &RING);
    let mut m = Matrix::new(&structure);
    m.set_coefficients(true, b1, Some(&da), Some(&xa)).unwrap();

    let mut y_scalar = [0.0; 4];
    let mut y_block = [0.0; 4];
    SpmvKernel::NativeSerial
        .run(false, &m, &x, &mut y_scalar)
        .unwrap();
    SpmvKernel::NativeBlock
        .run(false, &m, &x, &mut y_block)
        .unwrap();
    for ii in 0..4 {
        assert!(
            (y_block[ii] - y_scalar[ii]).abs() < 1e-14,
            "row {ii}: block {} vs scalar {}",
            y_block[ii],
            y_scalar[ii]
        );
    }
}

/// Ghost values are refreshed through the halo before the off-diagonal
/// phase reads them.
#[test]
fn test_halo_refresh_before_multiply() {
    // 3 owned cells in a line plus a ghost cell mirroring cell 0,
    // closing the ring periodically
    let faces = [[0, 1], [1, 2], [2, 3]];
    let halo = TranslationHalo::new(vec![(0, 3)]);
    let da = [2.0; 3];
    let xa = [-1.0; 3];

    for kind in MatrixKind::ALL {
        let structure = MatrixStructure::new(kind, 3, 4, &faces);
        let mut m = Matrix::new(&structure);
        m.set_halo(&halo);
        m.set_coefficients(true, BlockSize::SCALAR, Some(&da), Some(&xa))
            .unwrap();

        let mut x = [1.0, 1.0, 1.0, 99.0]; // stale ghost
        let mut y = [7.0; 4]; // stale output everywhere
        m.vector_multiply(RotationMode::Forbid, &mut x, &mut y)
            .unwrap();

        assert!((x[3] - 1.0).abs() < 1e-14, "{kind}: ghost not refreshed");
        // row 2 couples to the ghost: 2*1 - 1 - 1 = 0
        assert!(y[2].abs() < 1e-12, "{kind}: y[2] = {}", y[2]);
        // the ghost row is rewritten, never left with stale output
        assert!((y[3] - 7.0).abs() > 1e-9, "{kind}: stale ghost output");
    }
}
