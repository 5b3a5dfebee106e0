use super::*;

#[test]
fn test_from_vec_shape() {
    let m = Matrix::from_vec(2, 3, vec![1.0_f32, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    assert_eq!(m.shape(), (2, 3));
    assert_eq!(m.n_rows(), 2);
    assert_eq!(m.n_cols(), 3);
    assert!((m.get(1, 2) - 6.0).abs() < f32::EPSILON);
}

#[test]
fn test_from_vec_length_mismatch() {
    let result = Matrix::from_vec(2, 3, vec![1.0, 2.0]);
    assert!(result.is_err());
}

#[test]
fn test_set_get() {
    let mut m = Matrix::zeros(2, 2);
    m.set(0, 1, 3.5);
    assert!((m.get(0, 1) - 3.5).abs() < f32::EPSILON);
}

#[test]
fn test_transpose() {
    let m = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    let t = m.transpose();
    assert_eq!(t.shape(), (3, 2));
    assert!((t.get(2, 0) - 3.0).abs() < f32::EPSILON);
    assert!((t.get(0, 1) - 4.0).abs() < f32::EPSILON);
}

#[test]
fn test_matmul() {
    let a = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    let b = Matrix::from_vec(2, 2, vec![5.0, 6.0, 7.0, 8.0]).unwrap();
    let c = a.matmul(&b).unwrap();
    assert_eq!(c.shape(), (2, 2));
    assert!((c.get(0, 0) - 19.0).abs() < 1e-6);
    assert!((c.get(0, 1) - 22.0).abs() < 1e-6);
    assert!((c.get(1, 0) - 43.0).abs() < 1e-6);
    assert!((c.get(1, 1) - 50.0).abs() < 1e-6);
}

#[test]
fn test_matmul_dimension_mismatch() {
    let a = Matrix::zeros(2, 3);
    let b = Matrix::zeros(2, 3);
    assert!(a.matmul(&b).is_err());
}

#[test]
fn test_column_and_set_column() {
    let mut m = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    let col = m.column(1);
    assert_eq!(col.as_slice(), &[2.0, 5.0]);
    m.set_column(1, &[9.0, 10.0]);
    assert_eq!(m.column(1).as_slice(), &[9.0, 10.0]);
}

#[test]
fn test_columns_subset() {
    let m = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    let sub = m.columns(&[2, 0]);
    assert_eq!(sub.shape(), (2, 2));
    assert_eq!(sub.column(0).as_slice(), &[3.0, 6.0]);
    assert_eq!(sub.column(1).as_slice(), &[1.0, 4.0]);
}

#[test]
fn test_row_and_col_sums() {
    let m = Matrix::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
    assert_eq!(m.row_sums(), vec![6.0, 15.0]);
    assert_eq!(m.col_sums(), vec![5.0, 7.0, 9.0]);
}

#[test]
fn test_add_scaled() {
    let mut a = Matrix::from_vec(1, 2, vec![1.0, 2.0]).unwrap();
    let g = Matrix::from_vec(1, 2, vec![10.0, 20.0]).unwrap();
    a.add_scaled(&g, -0.1).unwrap();
    assert!((a.get(0, 0) - 0.0).abs() < 1e-6);
    assert!((a.get(0, 1) - 0.0).abs() < 1e-6);
}

#[test]
fn test_hadamard() {
    let a = Matrix::from_vec(1, 3, vec![1.0, 2.0, 3.0]).unwrap();
    let b = Matrix::from_vec(1, 3, vec![4.0, 5.0, 6.0]).unwrap();
    let c = a.hadamard(&b).unwrap();
    assert_eq!(c.as_slice(), &[4.0, 10.0, 18.0]);
}

#[test]
fn test_frobenius_and_nnz() {
    let m = Matrix::from_vec(2, 2, vec![3.0, 0.0, 0.0, 4.0]).unwrap();
    assert!((m.frobenius_norm() - 5.0).abs() < 1e-6);
    assert_eq!(m.nnz(), 2);
}

#[test]
fn test_scale_column() {
    let mut m = Matrix::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    m.scale_column(0, 2.0);
    assert_eq!(m.column(0).as_slice(), &[2.0, 6.0]);
    assert_eq!(m.column(1).as_slice(), &[2.0, 4.0]);
}

#[test]
fn test_mul_scalar_and_sub() {
    let a = Matrix::from_vec(1, 2, vec![1.0, 2.0]).unwrap();
    let b = a.mul_scalar(3.0);
    assert_eq!(b.as_slice(), &[3.0, 6.0]);
    let c = b.sub(&a).unwrap();
    assert_eq!(c.as_slice(), &[2.0, 4.0]);
}
