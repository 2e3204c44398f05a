//! Dense matrix helpers over `Decimal`.
//!
//! Matrices are row-major `Vec<Vec<Decimal>>`, matching the JSON layout of
//! covariance inputs. Dimensions are validated by the caller.

use rust_decimal::Decimal;

use crate::error::MarkowitzError;
use crate::MarkowitzResult;

/// Matrix-vector multiplication.
pub fn mat_vec_multiply(mat: &[Vec<Decimal>], v: &[Decimal]) -> MarkowitzResult<Vec<Decimal>> {
    mat.iter().map(|row| vec_dot(row, v)).collect()
}

/// Dot product.
pub fn vec_dot(a: &[Decimal], b: &[Decimal]) -> MarkowitzResult<Decimal> {
    a.iter().zip(b.iter()).try_fold(Decimal::ZERO, |acc, (x, y)| {
        checked_add(acc, checked_mul(*x, *y, "dot product")?, "dot product")
    })
}

/// Quadratic form `v' * M * v`.
pub fn quadratic_form(mat: &[Vec<Decimal>], v: &[Decimal]) -> MarkowitzResult<Decimal> {
    vec_dot(v, &mat_vec_multiply(mat, v)?)
}

/// `a * b`, or [`MarkowitzError::ArithmeticOverflow`] naming `context`.
pub fn checked_mul(a: Decimal, b: Decimal, context: &str) -> MarkowitzResult<Decimal> {
    a.checked_mul(b).ok_or_else(|| overflow(context))
}

pub fn checked_add(a: Decimal, b: Decimal, context: &str) -> MarkowitzResult<Decimal> {
    a.checked_add(b).ok_or_else(|| overflow(context))
}

pub fn checked_sub(a: Decimal, b: Decimal, context: &str) -> MarkowitzResult<Decimal> {
    a.checked_sub(b).ok_or_else(|| overflow(context))
}

/// `a / b`. Division by zero is reported the same way as overflow.
pub fn checked_div(a: Decimal, b: Decimal, context: &str) -> MarkowitzResult<Decimal> {
    a.checked_div(b).ok_or_else(|| overflow(context))
}

fn overflow(context: &str) -> MarkowitzError {
    MarkowitzError::ArithmeticOverflow {
        context: context.to_string(),
    }
}

/// Largest absolute entry of a matrix. Zero for an empty matrix.
pub fn max_abs_entry(mat: &[Vec<Decimal>]) -> Decimal {
    mat.iter()
        .flat_map(|row| row.iter())
        .map(|x| x.abs())
        .fold(Decimal::ZERO, |a, b| if b > a { b } else { a })
}

/// Matrix inverse via Gauss-Jordan with partial pivoting.
///
/// A pivot whose magnitude falls below `tolerance` marks the matrix as
/// singular. Callers pass a tolerance already scaled to the matrix entries.
#[allow(clippy::needless_range_loop)]
pub fn mat_inverse(
    mat: &[Vec<Decimal>],
    tolerance: Decimal,
) -> MarkowitzResult<Vec<Vec<Decimal>>> {
    let n = mat.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut aug: Vec<Vec<Decimal>> = Vec::with_capacity(n);
    for i in 0..n {
        let mut row = Vec::with_capacity(2 * n);
        row.extend_from_slice(&mat[i]);
        for j in 0..n {
            row.push(if i == j { Decimal::ONE } else { Decimal::ZERO });
        }
        aug.push(row);
    }

    for col in 0..n {
        // Partial pivoting
        let mut max_row = col;
        let mut max_val = aug[col][col].abs();
        for row in (col + 1)..n {
            let val = aug[row][col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val <= tolerance {
            return Err(MarkowitzError::SingularCovariance(format!(
                "pivot {} in column {} is within tolerance {} of zero",
                max_val, col, tolerance
            )));
        }

        if max_row != col {
            aug.swap(col, max_row);
        }

        let pivot = aug[col][col];
        for cell in aug[col].iter_mut() {
            *cell = checked_div(*cell, pivot, "matrix inverse")?;
        }

        let pivot_row = aug[col].clone();
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[row][col];
            if factor.is_zero() {
                continue;
            }
            for (cell, &pv) in aug[row].iter_mut().zip(pivot_row.iter()) {
                let delta = checked_mul(factor, pv, "matrix inverse")?;
                *cell = checked_sub(*cell, delta, "matrix inverse")?;
            }
        }
    }

    Ok(aug.iter().map(|row| row[n..].to_vec()).collect())
}
