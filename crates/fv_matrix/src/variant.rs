// crates/fv_matrix/src/variant.rs

//! Kernel variant registry, auto-tuner and cross-variant checker.
//!
//! A [`MatrixVariant`] is a named (storage kind, kernel selection, loop
//! length) configuration plus its measured costs. [`tune`] times every
//! enumerated variant on the caller's mesh, scores storage kinds by weighted
//! speedup against the first variant, and synthesizes a single best variant
//! that may combine kernels from several named configurations of the winning
//! kind. [`check_variants`] runs every variant on deterministic synthetic
//! data and reports the maximum deviation from the reference variant, one
//! result per (variant, operation) pair.
//!
//! Timing protocol: run the operation repeatedly, doubling the repeat count
//! until the cumulative wall time reaches the measurement threshold, then
//! report time per call. This absorbs timer resolution and scheduler jitter
//! on fast operations.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::block::BlockSize;
use crate::error::{MatrixError, MatrixResult};
use crate::matrix::Matrix;
use crate::numbering::FaceGroups;
use crate::spmv::SpmvKernel;
use crate::structure::{MatrixKind, MatrixStructure};
use fv_foundation::AlignedVec;

/// Which symmetry cases a variant applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymmetrySupport {
    /// General (asymmetric) coefficients only.
    General,
    /// Symmetric coefficients only.
    Symmetric,
    /// Both cases.
    Both,
}

impl SymmetrySupport {
    /// Range of symmetry flags (0 = general, 1 = symmetric) to test.
    fn flags(self) -> std::ops::Range<usize> {
        match self {
            SymmetrySupport::General => 0..1,
            SymmetrySupport::Symmetric => 1..2,
            SymmetrySupport::Both => 0..2,
        }
    }
}

/// Tuning parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TuningOptions {
    /// Minimum wall time per measurement, in seconds.
    pub t_measure: f64,
    /// Weight of the symmetric-coefficients case (0 to 1).
    pub sym_weight: f64,
    /// Weight of the block-coupled case (0 to 1).
    pub block_weight: f64,
    /// Expected number of products per coefficient assignment, used to
    /// amortize assignment overhead into the multiply cost. Amortization
    /// applies only below 10000; with more products the overhead is noise.
    pub n_min_products: usize,
}

impl Default for TuningOptions {
    fn default() -> Self {
        Self {
            t_measure: 0.5,
            sym_weight: 0.5,
            block_weight: 0.0,
            n_min_products: 0,
        }
    }
}

/// A named, measurable kernel configuration.
///
/// Costs are negative until measured.
#[derive(Debug, Clone)]
pub struct MatrixVariant {
    /// Display name.
    pub name: String,
    /// Storage kind.
    pub kind: MatrixKind,
    /// Symmetry cases this variant applies to.
    pub symmetry: SymmetrySupport,
    /// Loop length for cache-blocked and prefetch kernels (0 = default).
    pub loop_length: usize,
    /// Kernel per slot: scalar, scalar exclude-diag, block, block exclude-diag.
    pub kernels: [Option<SpmvKernel>; 4],
    /// Structure creation time, seconds.
    pub create_cost: f64,
    /// Coefficient assignment time per (block, sym) category, seconds.
    pub assign_cost: [f64; 4],
    /// Multiply time per (block, sym, exclude-diag) category, seconds.
    pub spmv_cost: [f64; 8],
}

impl MatrixVariant {
    fn new(
        name: &str,
        kind: MatrixKind,
        symmetry: SymmetrySupport,
        loop_length: usize,
    ) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            symmetry,
            loop_length,
            kernels: [None; 4],
            create_cost: -1.0,
            assign_cost: [-1.0; 4],
            spmv_cost: [-1.0; 8],
        }
    }
}

fn kind_index(kind: MatrixKind) -> usize {
    MatrixKind::ALL.iter().position(|&k| k == kind).unwrap_or(0)
}

// ============================================================================
// Variant enumeration
// ============================================================================

/// Block-case filter: 0 = scalar only, 1 = block only, 2 = both.
fn block_flag(block_weight: f64) -> usize {
    if block_weight <= 0.0 {
        0
    } else if block_weight >= 1.0 {
        1
    } else {
        2
    }
}

fn sym_support(sym_weight: f64) -> SymmetrySupport {
    if sym_weight <= 0.0 {
        SymmetrySupport::General
    } else if sym_weight >= 1.0 {
        SymmetrySupport::Symmetric
    } else {
        SymmetrySupport::Both
    }
}

#[allow(clippy::too_many_arguments)]
fn add_variant(
    list: &mut Vec<MatrixVariant>,
    name: &str,
    kind: MatrixKind,
    symmetry: SymmetrySupport,
    bf: usize,
    with_exclude: bool,
    loop_length: usize,
    scalar: Option<SpmvKernel>,
    block: Option<SpmvKernel>,
) {
    let mut v = MatrixVariant::new(name, kind, symmetry, loop_length);
    if bf != 1 {
        v.kernels[0] = scalar;
        if with_exclude {
            v.kernels[1] = scalar;
        }
    }
    if bf != 0 {
        v.kernels[2] = block;
        if with_exclude {
            v.kernels[3] = block;
        }
    }
    list.push(v);
}

/// Enumerate the hand-curated variant list.
///
/// The first entry is the reference implementation every other variant is
/// measured (and checked) against. The grouped-sum variant appears only when
/// a conflict-free face grouping is available.
pub fn variant_list(
    sym_weight: f64,
    block_weight: f64,
    with_groups: bool,
) -> Vec<MatrixVariant> {
    let sym = sym_support(sym_weight);
    let bf = block_flag(block_weight);
    let mut list = Vec::new();

    add_variant(
        &mut list,
        "Native, baseline",
        MatrixKind::Native,
        sym,
        bf,
        true,
        0,
        Some(SpmvKernel::NativeSerial),
        Some(SpmvKernel::NativeBlock),
    );
    add_variant(
        &mut list,
        "Native, 3x3 blocks",
        MatrixKind::Native,
        sym,
        bf,
        true,
        0,
        None,
        Some(SpmvKernel::NativeBlock3),
    );
    if with_groups {
        add_variant(
            &mut list,
            "Native, grouped sum",
            MatrixKind::Native,
            sym,
            bf,
            true,
            0,
            Some(SpmvKernel::NativeGrouped),
            None,
        );
    }
    add_variant(
        &mut list,
        "Native, Bull algorithm",
        MatrixKind::Native,
        sym,
        bf,
        true,
        508,
        Some(SpmvKernel::NativeBull { loop_length: 508 }),
        None,
    );
    add_variant(
        &mut list,
        "CSR",
        MatrixKind::Csr,
        sym,
        bf,
        true,
        0,
        Some(SpmvKernel::Csr),
        None,
    );
    add_variant(
        &mut list,
        "CSR, with prefetch",
        MatrixKind::Csr,
        sym,
        bf,
        false, // no diagonal-exclusion support
        508,
        Some(SpmvKernel::CsrPrefetch { loop_length: 508 }),
        None,
    );
    if sym != SymmetrySupport::General {
        add_variant(
            &mut list,
            "CSR_SYM",
            MatrixKind::CsrSym,
            SymmetrySupport::Symmetric,
            bf,
            true,
            0,
            Some(SpmvKernel::CsrSym),
            None,
        );
    }
    add_variant(
        &mut list,
        "MSR",
        MatrixKind::Msr,
        sym,
        bf,
        true,
        0,
        Some(SpmvKernel::Msr),
        None,
    );
    add_variant(
        &mut list,
        "MSR, with prefetch",
        MatrixKind::Msr,
        sym,
        bf,
        true,
        508,
        Some(SpmvKernel::MsrPrefetch { loop_length: 508 }),
        None,
    );
    if sym != SymmetrySupport::General {
        add_variant(
            &mut list,
            "MSR_SYM",
            MatrixKind::MsrSym,
            SymmetrySupport::Symmetric,
            bf,
            true,
            0,
            Some(SpmvKernel::MsrSym),
            None,
        );
    }

    list
}

// ============================================================================
// Timing harness
// ============================================================================

/// Run `op` repeatedly, doubling the run count until cumulative wall time
/// reaches `t_measure`; return seconds per call.
fn time_doubling(t_measure: f64, mut op: impl FnMut() -> MatrixResult<()>) -> MatrixResult<f64> {
    let t0 = Instant::now();
    let mut run = 0usize;
    let mut n_runs = 8usize;
    loop {
        while run < n_runs {
            op()?;
            run += 1;
        }
        let elapsed = t0.elapsed().as_secs_f64();
        if elapsed >= t_measure {
            return Ok(elapsed / n_runs as f64);
        }
        n_runs *= 2;
    }
}

/// Deterministic synthetic coefficients and input vector.
///
/// Trigonometric fills are reproducible across runs and platforms without a
/// seeded generator, and produce no degenerate (all-equal) data.
struct TestData {
    da: Vec<f64>,
    xa: Vec<f64>,
    xa_sym: Vec<f64>,
    x: AlignedVec<f64>,
}

impl TestData {
    fn new(n_cols: usize, n_faces: usize) -> Self {
        let b3 = BlockSize::fixed3();
        let da = (0..n_cols * b3.block_stride)
            .map(|ii| 1.0 + (ii as f64).cos())
            .collect();
        let mut xa = vec![0.0; 2 * n_faces];
        let mut xa_sym = vec![0.0; n_faces];
        for f in 0..n_faces {
            let v = 0.5 * (0.9 + (f as f64).cos());
            xa[2 * f] = v;
            xa[2 * f + 1] = -v;
            xa_sym[f] = v;
        }
        let x = (0..n_cols * b3.vec_stride)
            .map(|ii| (ii as f64).sin())
            .collect();
        Self { da, xa, xa_sym, x }
    }

    fn xa_for(&self, symmetric: bool) -> &[f64] {
        if symmetric {
            &self.xa_sym
        } else {
            &self.xa
        }
    }
}

/// Measure creation, assignment and multiply costs for every variant.
fn tune_run(
    opts: &TuningOptions,
    n_rows: usize,
    n_cols: usize,
    face_cell: &[[usize; 2]],
    groups: Option<&FaceGroups>,
    variants: &mut [MatrixVariant],
) -> MatrixResult<()> {
    let bf = block_flag(opts.block_weight);
    let data = TestData::new(n_cols, face_cell.len());
    let mut y: AlignedVec<f64> = AlignedVec::zeros(n_cols * 3);
    let mut test_sum = 0.0;

    let mut kind_prev: Option<MatrixKind> = None;

    for v_id in 0..variants.len() {
        let kind = variants[v_id].kind;
        let test_assign = kind_prev != Some(kind);

        if test_assign {
            variants[v_id].create_cost = time_doubling(opts.t_measure, || {
                let s = MatrixStructure::new(kind, n_rows, n_cols, face_cell);
                std::hint::black_box(&s);
                Ok(())
            })?;
        }

        let structure = MatrixStructure::new(kind, n_rows, n_cols, face_cell);
        let mut m = Matrix::new(&structure);
        if let Some(g) = groups {
            if kind == MatrixKind::Native {
                m.set_face_groups(g);
            }
        }

        for b_id in 0..2usize {
            if (b_id == 0 && bf == 1) || (b_id == 1 && bf == 0) {
                continue;
            }
            // block coefficients only exist for native storage
            if b_id == 1 && kind != MatrixKind::Native {
                continue;
            }
            let block = if b_id == 0 {
                BlockSize::SCALAR
            } else {
                BlockSize::fixed3()
            };

            for sym_flag in variants[v_id].symmetry.flags() {
                let symmetric = sym_flag == 1;
                for ed_flag in 0..2usize {
                    let mut assign = || -> MatrixResult<()> {
                        m.set_coefficients(
                            symmetric,
                            block,
                            Some(&data.da[..n_rows * block.block_stride]),
                            Some(data.xa_for(symmetric)),
                        )
                    };

                    if test_assign && ed_flag == 0 {
                        variants[v_id].assign_cost[b_id * 2 + sym_flag] =
                            time_doubling(opts.t_measure, assign)?;
                    } else {
                        assign()?;
                    }

                    if let Some(kernel) = variants[v_id].kernels[b_id * 2 + ed_flag] {
                        let cost = time_doubling(opts.t_measure, || {
                            kernel.run(ed_flag == 1, &m, &data.x, &mut y)?;
                            test_sum += y[n_rows - 1];
                            Ok(())
                        })?;
                        variants[v_id].spmv_cost[b_id * 4 + sym_flag * 2 + ed_flag] = cost;
                    }

                    m.release_coefficients();
                }
            }
        }

        kind_prev = Some(kind);
    }

    tracing::trace!(test_sum, "tuning accumulator");
    Ok(())
}

// ============================================================================
// Selection
// ============================================================================

/// Time and select the best-performing variant for a mesh.
///
/// Storage kinds are scored by speedup against the first enumerated variant,
/// weighted by the symmetry and block preferences; a kind missing a
/// measurement for any weighted category is disqualified. The returned
/// variant carries, per category, the fastest measured kernel among the
/// winning kind's variants. Fails if every kind is disqualified.
pub fn tune(
    opts: &TuningOptions,
    n_rows: usize,
    n_cols: usize,
    face_cell: &[[usize; 2]],
    groups: Option<&FaceGroups>,
) -> MatrixResult<MatrixVariant> {
    if n_rows == 0 || n_rows > n_cols {
        return Err(MatrixError::tuning(format!(
            "invalid mesh extents: {n_rows} rows, {n_cols} columns"
        )));
    }

    let mut variants = variant_list(opts.sym_weight, opts.block_weight, groups.is_some());
    tune_run(opts, n_rows, n_cols, face_cell, groups, &mut variants)?;

    for v in &variants {
        tracing::info!(
            name = %v.name,
            kind = %v.kind,
            create_cost = v.create_cost,
            assign_cost = ?v.assign_cost,
            spmv_cost = ?v.spmv_cost,
            "variant timing"
        );
    }

    let n_kinds = MatrixKind::ALL.len();
    let mut t_speedup = vec![[-1.0f64; 8]; n_kinds];
    let mut t_overhead = vec![[0.0f64; 4]; n_kinds];

    let amortize = opts.n_min_products > 0 && opts.n_min_products < 10000;
    let base_kind = kind_index(variants[0].kind);

    for v in &variants {
        let t_id = kind_index(v.kind);
        for b in 0..2usize {
            for s in 0..2usize {
                let o_id = b * 2 + s;
                if amortize && v.assign_cost[o_id] > 0.0 {
                    t_overhead[t_id][o_id] =
                        v.assign_cost[o_id] / opts.n_min_products as f64;
                }
                let sub_id = b * 4 + s * 2;
                if v.spmv_cost[sub_id] > 0.0 && variants[0].spmv_cost[sub_id] > 0.0 {
                    let speedup = (variants[0].spmv_cost[sub_id]
                        + t_overhead[base_kind][o_id])
                        / (v.spmv_cost[sub_id] + t_overhead[t_id][o_id]);
                    if t_speedup[t_id][sub_id] < speedup {
                        t_speedup[t_id][sub_id] = speedup;
                    }
                }
            }
        }
    }

    let (bw, sw) = (opts.block_weight, opts.sym_weight);
    let mut max_speedup = 0.0;
    let mut best: Option<MatrixKind> = None;

    for (t_id, &kind) in MatrixKind::ALL.iter().enumerate() {
        let s = &t_speedup[t_id];
        let mut speedup = (1.0 - bw) * (1.0 - sw) * s[0]
            + (1.0 - bw) * sw * s[2]
            + bw * (1.0 - sw) * s[4]
            + bw * sw * s[6];
        if bw < 1.0 {
            if sw < 1.0 && s[0] < 0.0 {
                speedup = -1.0;
            }
            if sw > 0.0 && s[2] < 0.0 {
                speedup = -1.0;
            }
        }
        if bw > 0.0 {
            if sw < 1.0 && s[4] < 0.0 {
                speedup = -1.0;
            }
            if sw > 0.0 && s[6] < 0.0 {
                speedup = -1.0;
            }
        }
        if speedup > max_speedup {
            max_speedup = speedup;
            best = Some(kind);
        }
    }

    let best = best.ok_or_else(|| {
        MatrixError::tuning("no storage kind has valid timings for every weighted category")
    })?;

    // Assemble the winner from the per-category fastest kernels of its kind.
    let mut r = MatrixVariant::new(best.name(), best, sym_support(sw), 0);

    for v in variants.iter().filter(|v| v.kind == best) {
        if v.create_cost > 0.0 {
            r.create_cost = v.create_cost;
        }
        for o_id in 0..4 {
            if v.assign_cost[o_id] > 0.0 {
                r.assign_cost[o_id] = v.assign_cost[o_id];
            }
        }
        // descending flag order gives the full, non-symmetric scalar case
        // the last word on loop_length
        for b in (0..2usize).rev() {
            for s in (0..2usize).rev() {
                for ed in (0..2usize).rev() {
                    let sub_id = b * 4 + s * 2 + ed;
                    if v.spmv_cost[sub_id] > 0.0
                        && (r.spmv_cost[sub_id] < 0.0 || v.spmv_cost[sub_id] < r.spmv_cost[sub_id])
                    {
                        r.kernels[b * 2 + ed] = v.kernels[b * 2 + ed];
                        r.spmv_cost[sub_id] = v.spmv_cost[sub_id];
                        r.loop_length = v.loop_length;
                    }
                }
            }
        }
    }

    tracing::info!(
        kind = %r.kind,
        speedup = max_speedup,
        kernels = ?r.kernels.map(|k| k.map(|k| k.name())),
        "selected matrix variant"
    );

    Ok(r)
}

// ============================================================================
// Cross-variant checker
// ============================================================================

/// One checker measurement: a variant's deviation from the reference.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Variant display name.
    pub variant: String,
    /// Operation description.
    pub operation: &'static str,
    /// Maximum absolute elementwise difference from the reference variant.
    pub max_diff: f64,
}

const OPERATION_NAMES: [&str; 8] = [
    "y <- A.x",
    "y <- (A-D).x",
    "symmetric y <- A.x",
    "symmetric y <- (A-D).x",
    "block y <- A.x",
    "block y <- (A-D).x",
    "block symmetric y <- A.x",
    "block symmetric y <- (A-D).x",
];

fn max_abs_diff(y: &[f64], reference: &[f64]) -> f64 {
    y.iter()
        .zip(reference)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max)
}

/// Run every variant on deterministic synthetic data and compare each
/// against the first variant that handled the same operation.
///
/// Diagnostic: results carry the observed deviations, nothing fails here.
pub fn check_variants(
    n_rows: usize,
    n_cols: usize,
    face_cell: &[[usize; 2]],
    groups: Option<&FaceGroups>,
) -> MatrixResult<Vec<CheckResult>> {
    let variants = variant_list(0.5, 0.5, groups.is_some());
    let data = TestData::new(n_cols, face_cell.len());
    let mut y: AlignedVec<f64> = AlignedVec::zeros(n_cols * 3);
    let mut results = Vec::new();

    for b_id in 0..2usize {
        let block = if b_id == 0 {
            BlockSize::SCALAR
        } else {
            BlockSize::fixed3()
        };

        for sym_flag in 0..2usize {
            let symmetric = sym_flag == 1;
            for ed_flag in 0..2usize {
                let mut reference: Option<Vec<f64>> = None;

                for v in &variants {
                    if !v.symmetry.flags().contains(&sym_flag) {
                        continue;
                    }
                    if b_id == 1 && v.kind != MatrixKind::Native {
                        continue;
                    }
                    let kernel = match v.kernels[b_id * 2 + ed_flag] {
                        Some(k) => k,
                        None => continue,
                    };

                    let structure = MatrixStructure::new(v.kind, n_rows, n_cols, face_cell);
                    let mut m = Matrix::new(&structure);
                    if let Some(g) = groups {
                        if v.kind == MatrixKind::Native {
                            m.set_face_groups(g);
                        }
                    }
                    m.set_coefficients(
                        symmetric,
                        block,
                        Some(&data.da[..n_rows * block.block_stride]),
                        Some(data.xa_for(symmetric)),
                    )?;

                    kernel.run(ed_flag == 1, &m, &data.x, &mut y)?;
                    let n = n_rows * block.vec_stride;

                    match &reference {
                        None => reference = Some(y[..n].to_vec()),
                        Some(r) => {
                            let result = CheckResult {
                                variant: v.name.clone(),
                                operation: OPERATION_NAMES[b_id * 4 + sym_flag * 2 + ed_flag],
                                max_diff: max_abs_diff(&y[..n], r),
                            };
                            tracing::info!(
                                variant = %result.variant,
                                operation = result.operation,
                                max_diff = result.max_diff,
                                "variant check"
                            );
                            results.push(result);
                        }
                    }
                }
            }
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 8x4 structured grid: faces between horizontal and vertical neighbors
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

    #[test]
    fn test_variant_list_contents() {
        let list = variant_list(0.5, 0.5, false);
        let names: Vec<&str> = list.iter().map(|v| v.name.as_str()).collect();
        assert!(names.contains(&"Native, baseline"));
        assert!(names.contains(&"Native, Bull algorithm"));
        assert!(names.contains(&"CSR, with prefetch"));
        assert!(names.contains(&"CSR_SYM"));
        assert!(names.contains(&"MSR_SYM"));
        assert!(!names.contains(&"Native, grouped sum"));
        assert_eq!(list[0].name, "Native, baseline");

        let with_groups = variant_list(0.5, 0.5, true);
        assert!(with_groups.iter().any(|v| v.name == "Native, grouped sum"));
    }

    #[test]
    fn test_variant_list_symmetric_only() {
        let list = variant_list(0.0, 0.0, false);
        assert!(!list.iter().any(|v| v.kind == MatrixKind::CsrSym));
        assert!(!list.iter().any(|v| v.kind == MatrixKind::MsrSym));
        // scalar-only: no block kernels anywhere
        assert!(list.iter().all(|v| v.kernels[2].is_none()));
    }

    #[test]
    fn test_prefetch_variant_has_no_exclude_slot() {
        let list = variant_list(0.5, 0.5, false);
        let pf = list
            .iter()
            .find(|v| v.name == "CSR, with prefetch")
            .unwrap();
        assert!(pf.kernels[0].is_some());
        assert!(pf.kernels[1].is_none());
    }

    #[test]
    fn test_check_variants_agree() {
        let faces = grid_faces(8, 4);
        let results = check_variants(32, 32, &faces, None).unwrap();
        assert!(!results.is_empty());
        for r in &results {
            assert!(
                r.max_diff < 1e-11,
                "{} / {}: max diff {}",
                r.variant,
                r.operation,
                r.max_diff
            );
        }
        // symmetric kinds must have been exercised
        assert!(results.iter().any(|r| r.variant == "CSR_SYM"));
        assert!(results.iter().any(|r| r.variant == "MSR_SYM"));
    }

    #[test]
    fn test_tune_smoke() {
        let faces = grid_faces(8, 4);
        let opts = TuningOptions {
            t_measure: 1e-5,
            sym_weight: 0.5,
            block_weight: 0.0,
            n_min_products: 100,
        };
        let v = tune(&opts, 32, 32, &faces, None).unwrap();
        assert!(v.kernels[0].is_some(), "winner has a scalar kernel");
        assert!(v.kernels[1].is_some(), "winner has an exclude-diag kernel");
        assert!(v.spmv_cost[0] > 0.0);

        // the winner drives a matrix end to end
        let da = vec![4.0; 32];
        let xa = vec![-1.0; faces.len()];
        let structure = MatrixStructure::new(v.kind, 32, 32, &faces);
        let mut m = Matrix::with_variant(&structure, &v);
        m.set_coefficients(true, BlockSize::SCALAR, Some(&da), Some(&xa))
            .unwrap();
        let x = vec![1.0; 32];
        let mut y = vec![0.0; 32];
        m.vector_multiply_nosync(&x, &mut y).unwrap();
        // interior cells of the grid Laplacian with diag 4: y = 4 - neighbors
        assert!(y.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_tuning_options_from_json() {
        let opts: TuningOptions =
            serde_json::from_str(r#"{"t_measure": 0.25, "sym_weight": 1.0}"#).unwrap();
        assert!((opts.t_measure - 0.25).abs() < 1e-14);
        assert!((opts.sym_weight - 1.0).abs() < 1e-14);
        // unspecified fields fall back to defaults
        assert!((opts.block_weight - TuningOptions::default().block_weight).abs() < 1e-14);
        assert_eq!(opts.n_min_products, TuningOptions::default().n_min_products);
    }

    #[test]
    fn test_tune_rejects_bad_extents() {
        let faces = grid_faces(2, 2);
        let opts = TuningOptions::default();
        assert!(tune(&opts, 8, 4, &faces, None).is_err());
        assert!(tune(&opts, 0, 0, &faces, None).is_err());
    }
}
