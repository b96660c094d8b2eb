/// compute the cross product of two vectors
pub fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[1] * b[2] - a[2] * b[1],
     a[2] * b[0] - a[0] * b[2],
     a[0] * b[1] - a[1] * b[0]]
}

/// compute the dot product between a row vector and a matrix
pub fn dot(v: [f64; 3], m: [[f64; 3]; 3]) -> [f64; 3] {
    let mut out = [0f64; 3];
    for (i, out) in out.iter_mut().enumerate() {
        *out = v[0] * m[0][i] + v[1] * m[1][i] + v[2] * m[2][i]
    }
    out
}

/// compute the dot product between two vectors
pub fn vdot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a.iter().zip(b.iter()).map(|(a, b)| a * b).sum()
}

/// signed volume of the parallelepiped spanned by the rows of m
pub fn triple_product(m: &[[f64; 3]; 3]) -> f64 {
    vdot(m[0], cross(m[1], m[2]))
}

/// Inverts a matrix of lattice row vectors so that `dot(cartesian, inverse)`
/// gives fractional coordinates. Returns None for a flat cell.
pub fn invert_lattice(lattice: &[[f64; 3]; 3]) -> Option<[[f64; 3]; 3]> {
    let determinant = triple_product(lattice);
    if determinant.abs() < 1e-16 {
        return None;
    }
    // the columns of the inverse are the reciprocal vectors
    let reciprocal = [cross(lattice[1], lattice[2]),
                      cross(lattice[2], lattice[0]),
                      cross(lattice[0], lattice[1])];
    let mut inverse = [[0f64; 3]; 3];
    for (i, row) in inverse.iter_mut().enumerate() {
        for (j, value) in row.iter_mut().enumerate() {
            *value = reciprocal[j][i] / determinant;
        }
    }
    Some(inverse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utils_dot() {
        assert_eq!(dot([1., 2., 3.],
                       [[1., 0., 0.], [0., 2., 0.], [0., 0., 3.]]),
                   [1., 4., 9.])
    }

    #[test]
    fn utils_vdot() {
        assert_eq!(vdot([1., 2., 3.], [1., 2., 3.]), 14.)
    }

    #[test]
    fn utils_triple_product() {
        let m = [[2., 0., 0.], [0., 3., 0.], [0., 0., 4.]];
        assert_eq!(triple_product(&m), 24.)
    }

    #[test]
    fn utils_invert_lattice() {
        let m = [[3., 0., 0.], [1., 2., 0.], [0., 0., 4.]];
        let inv = invert_lattice(&m).unwrap();
        // a cartesian lattice vector maps to a unit fractional vector
        let f = dot(m[1], inv);
        assert!((f[0]).abs() < 1e-12);
        assert!((f[1] - 1.).abs() < 1e-12);
        assert!((f[2]).abs() < 1e-12);
    }

    #[test]
    fn utils_invert_lattice_flat() {
        let m = [[1., 0., 0.], [2., 0., 0.], [0., 0., 1.]];
        assert!(invert_lattice(&m).is_none())
    }
}
