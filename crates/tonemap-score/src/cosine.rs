/// Cosine similarity of two unit vectors, computed as a plain dot product.
///
/// Nothing is renormalized here: inputs that are not unit length give a
/// scaled dot product, so callers must hand in L2-normalized vectors.
/// Accumulates in f64. Extra trailing components of the longer input are ignored.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l2_norm(v: &[f32]) -> f64 {
        v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum::<f64>().sqrt()
    }

    fn unit(v: &[f32]) -> Vec<f32> {
        let n = l2_norm(v) as f32;
        v.iter().map(|x| x / n).collect()
    }

    #[test]
    fn non_unit_inputs_are_a_plain_dot_product() {
        assert_eq!(cosine(&[2.0, 0.0], &[3.0, 0.0]), 6.0);
        assert_eq!(cosine(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]), 32.0);
    }

    #[test]
    fn unit_inputs_stay_within_bounds() {
        let pairs = [
            (unit(&[1.0, 2.0, 3.0]), unit(&[-3.0, 0.5, 2.0])),
            (unit(&[0.3, -0.7]), unit(&[0.3, -0.7])),
            (unit(&[1.0, 1.0]), unit(&[-1.0, -1.0])),
        ];
        for (a, b) in &pairs {
            let s = cosine(a, b);
            assert!((-1.0 - 1e-6..=1.0 + 1e-6).contains(&s), "similarity {s} out of range");
        }
        assert!((cosine(&pairs[1].0, &pairs[1].1) - 1.0).abs() < 1e-6);
        assert!((cosine(&pairs[2].0, &pairs[2].1) + 1.0).abs() < 1e-6);
    }
}
