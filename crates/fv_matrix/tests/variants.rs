// crates/fv_matrix/tests/variants.rs

//! Cross-variant agreement and auto-tuning on a structured grid mesh.

use fv_matrix::{
    check_variants, tune, BlockSize, FaceGroups, Matrix, MatrixError, MatrixKind, MatrixStructure,
    SpmvKernel, TuningOptions,
};

/// Faces of an nx * ny structured grid (horizontal + vertical neighbors).
fn grid_faces(nx: usize, ny: usize) -> Vec<[usize; 2]> {
    let mut faces = Vec::new();
    for j in 0..ny {
        for i in 0..nx {
            let c = j * nx + i;
            if i + 1 < nx {
                faces.push([c, c + 1]);
            }
            if j + 1 < ny {
                faces.push([c, c + nx]);
            }
        }
    }
    faces
}

/// Every kernel variant agrees with the reference within rounding noise on
/// all (block, symmetry, diagonal-exclusion) combinations.
#[test]
fn test_all_variants_agree_with_reference() {
    let faces = grid_faces(12, 12);
    let results = check_variants(144, 144, &faces, None).unwrap();
    assert!(!results.is_empty());

    for r in &results {
        assert!(
            r.max_diff < 1e-10,
            "{} / {}: max diff {}",
            r.variant,
            r.operation,
            r.max_diff
        );
    }

    // every shipped kernel family shows up in the results
    for name in [
        "Native, Bull algorithm",
        "CSR",
        "CSR, with prefetch",
        "CSR_SYM",
        "MSR",
        "MSR, with prefetch",
        "MSR_SYM",
    ] {
        assert!(
            results.iter().any(|r| r.variant == name),
            "variant {name} was never checked"
        );
    }
}

/// The grouped-sum kernel is covered by the checker when a grouping exists.
#[test]
fn test_grouped_variant_checked() {
    let faces = grid_faces(6, 1); // a line: faces (i, i+1)
    // even faces touch disjoint cell pairs, as do odd faces
    let groups = FaceGroups::new(vec![vec![0..1, 2..3, 4..5], vec![1..2, 3..4]]);
    assert!(groups.is_conflict_free(&faces));

    let results = check_variants(6, 6, &faces, Some(&groups)).unwrap();
    let grouped: Vec<_> = results
        .iter()
        .filter(|r| r.variant == "Native, grouped sum")
        .collect();
    assert!(!grouped.is_empty());
    for r in grouped {
        assert!(r.max_diff < 1e-12, "{}: {}", r.operation, r.max_diff);
    }
}

/// The grouped kernel matches the sequential reference on a mesh large
/// enough to spread ranges across workers.
#[test]
fn test_grouped_matches_serial_on_large_mesh() {
    let n = 1000usize;
    let faces: Vec<[usize; 2]> = (0..n - 1).map(|i| [i, i + 1]).collect();
    // even faces touch disjoint cell pairs, as do odd faces
    let evens: Vec<_> = (0..n - 1).step_by(2).map(|f| f..f + 1).collect();
    let odds: Vec<_> = (1..n - 1).step_by(2).map(|f| f..f + 1).collect();
    let groups = FaceGroups::new(vec![evens, odds]);
    assert!(groups.is_conflict_free(&faces));

    let da: Vec<f64> = (0..n).map(|i| 1.0 + (i as f64).cos()).collect();
    let xa: Vec<f64> = (0..faces.len())
        .map(|f| -0.5 * (0.9 + (f as f64).cos()))
        .collect();
    let x: Vec<f64> = (0..n).map(|i| (i as f64).sin()).collect();

    let structure = MatrixStructure::new(MatrixKind::Native, n, n, &faces);
    let mut m = Matrix::new(&structure);
    m.set_face_groups(&groups);
    m.set_coefficients(true, BlockSize::SCALAR, Some(&da), Some(&xa))
        .unwrap();

    let mut y_ref = vec![0.0; n];
    let mut y_grp = vec![0.0; n];
    SpmvKernel::NativeSerial
        .run(false, &m, &x, &mut y_ref)
        .unwrap();
    SpmvKernel::NativeGrouped
        .run(false, &m, &x, &mut y_grp)
        .unwrap();
    for ii in 0..n {
        assert!(
            (y_grp[ii] - y_ref[ii]).abs() < 1e-12,
            "row {ii}: grouped {} vs serial {}",
            y_grp[ii],
            y_ref[ii]
        );
    }
}

/// Tuning produces a usable variant that drives a matrix end to end.
#[test]
fn test_tuned_variant_is_usable() {
    let faces = grid_faces(8, 8);
    let opts = TuningOptions {
        t_measure: 1e-5,
        sym_weight: 0.5,
        block_weight: 0.0,
        n_min_products: 1000,
    };
    let v = tune(&opts, 64, 64, &faces, None).unwrap();

    assert!(v.kernels[0].is_some());
    assert!(v.kernels[1].is_some());
    assert!(v.create_cost > 0.0);
    assert!(v.spmv_cost[0] > 0.0 && v.spmv_cost[2] > 0.0);

    let da = vec![4.0; 64];
    let xa = vec![-1.0; faces.len()];
    let structure = MatrixStructure::new(v.kind, 64, 64, &faces);
    let mut m = Matrix::with_variant(&structure, &v);
    m.set_coefficients(true, BlockSize::SCALAR, Some(&da), Some(&xa))
        .unwrap();

    // A.1 leaves the boundary deficit: 4 - (number of neighbors)
    let x = vec![1.0; 64];
    let mut y = vec![0.0; 64];
    m.vector_multiply_nosync(&x, &mut y).unwrap();
    assert!((y[0] - 2.0).abs() < 1e-12, "corner cell has 2 neighbors");
    assert!((y[1] - 1.0).abs() < 1e-12, "edge cell has 3 neighbors");
    assert!(y[9].abs() < 1e-12, "interior cell has 4 neighbors");
}

/// The CSR prefetch kernel refuses diagonal exclusion with a pointer to the
/// supported path.
#[test]
fn test_csr_prefetch_rejects_diagonal_exclusion() {
    let faces = grid_faces(4, 4);
    let da = vec![1.0; 16];
    let xa = vec![-1.0; faces.len()];
    let structure = MatrixStructure::new(MatrixKind::Csr, 16, 16, &faces);
    let mut m = Matrix::new(&structure);
    m.set_coefficients(true, BlockSize::SCALAR, Some(&da), Some(&xa))
        .unwrap();

    let kernel = SpmvKernel::CsrPrefetch { loop_length: 0 };
    let x = vec![1.0; 16];
    let mut y = vec![0.0; 16];

    kernel.run(false, &m, &x, &mut y).unwrap();
    let err = kernel.run(true, &m, &x, &mut y).unwrap_err();
    assert!(matches!(err, MatrixError::NotImplemented { .. }));
}
