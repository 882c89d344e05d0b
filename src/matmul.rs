//! Small GEMM wrapper used by batched forward/backward passes.
//!
//! This module provides a single abstraction over matrix multiplication:
//! - default: a simple, safe triple-loop implementation
//! - optional: a faster backend via the `matrixmultiply` feature
//!
//! Computes `C = alpha * A * B + beta * C` where the operands are flat
//! buffers addressed through explicit row/column strides. `beta = 1.0` turns
//! the call into an accumulation, which is how layer gradients are summed
//! across backward passes.

#[allow(clippy::too_many_arguments)]
#[inline]
pub(crate) fn gemm_f32(
    m: usize,
    n: usize,
    k: usize,
    alpha: f32,
    a: &[f32],
    rsa: usize,
    csa: usize,
    b: &[f32],
    rsb: usize,
    csb: usize,
    beta: f32,
    c: &mut [f32],
    rsc: usize,
    csc: usize,
) {
    debug_assert!(m > 0 && n > 0 && k > 0);

    #[cfg(feature = "matrixmultiply")]
    {
        // matrixmultiply supports arbitrary strides.
        unsafe {
            matrixmultiply::sgemm(
                m,
                k,
                n,
                alpha,
                a.as_ptr(),
                rsa as isize,
                csa as isize,
                b.as_ptr(),
                rsb as isize,
                csb as isize,
                beta,
                c.as_mut_ptr(),
                rsc as isize,
                csc as isize,
            );
        }
    }

    #[cfg(not(feature = "matrixmultiply"))]
    for i in 0..m {
        for j in 0..n {
            let mut acc = 0.0_f32;
            let a0 = i * rsa;
            let b0 = j * csb;

            for p in 0..k {
                let av = a[a0 + p * csa];
                let bv = b[p * rsb + b0];
                acc = av.mul_add(bv, acc);
            }

            let idx = i * rsc + j * csc;
            c[idx] = alpha * acc + beta * c[idx];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gemm_matches_hand_computed_product() {
        // A = [[1, 2], [3, 4]], B = [[5, 6], [7, 8]]
        let a = [1.0_f32, 2.0, 3.0, 4.0];
        let b = [5.0_f32, 6.0, 7.0, 8.0];
        let mut c = [0.0_f32; 4];

        gemm_f32(2, 2, 2, 1.0, &a, 2, 1, &b, 2, 1, 0.0, &mut c, 2, 1);

        assert_eq!(c, [19.0, 22.0, 43.0, 50.0]);
    }

    #[test]
    fn gemm_with_unit_beta_accumulates() {
        let a = [1.0_f32, 0.0, 0.0, 1.0];
        let b = [2.0_f32, 0.0, 0.0, 2.0];
        let mut c = [1.0_f32, 1.0, 1.0, 1.0];

        gemm_f32(2, 2, 2, 1.0, &a, 2, 1, &b, 2, 1, 1.0, &mut c, 2, 1);

        assert_eq!(c, [3.0, 1.0, 1.0, 3.0]);
    }

    #[test]
    fn gemm_transposed_a_via_strides() {
        // A^T where A = [[1, 2, 3], [4, 5, 6]] (2x3): A^T is 3x2.
        let a = [1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0];
        // B = identity 2x2.
        let b = [1.0_f32, 0.0, 0.0, 1.0];
        let mut c = [0.0_f32; 6];

        // Addressing A with rsa=1, csa=3 reads it transposed.
        gemm_f32(3, 2, 2, 1.0, &a, 1, 3, &b, 2, 1, 0.0, &mut c, 2, 1);

        assert_eq!(c, [1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
    }
}
