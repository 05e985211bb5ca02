//! Per-pair invariant mass and angular separation.

use lepsel_frame::eval::delta_phi;

use crate::pairs::Pair;

/// Parallel kinematic arrays of one scope.
#[derive(Debug, Clone, Copy)]
pub struct LeptonKinematics<'a> {
    /// Transverse momenta.
    pub pt: &'a [f64],
    /// Pseudorapidities.
    pub eta: &'a [f64],
    /// Azimuthal angles.
    pub phi: &'a [f64],
    /// Masses.
    pub mass: &'a [f64],
}

impl LeptonKinematics<'_> {
    /// `(px, py, pz, E)` of lepton `i`, if every array covers it.
    #[inline]
    fn momentum(&self, i: usize) -> Option<[f64; 4]> {
        let (pt, eta, phi, m) = (*self.pt.get(i)?, *self.eta.get(i)?, *self.phi.get(i)?, *self.mass.get(i)?);
        let (px, py, pz) = (pt * phi.cos(), pt * phi.sin(), pt * eta.sinh());
        let e = (px * px + py * py + pz * pz + m * m).sqrt();
        Some([px, py, pz, e])
    }
}

/// Invariant mass of leptons `i` and `j`.
///
/// Returns 0 when either index is out of range or the mass-squared is not
/// positive (including NaN).
pub fn invariant_mass(k: &LeptonKinematics<'_>, i: usize, j: usize) -> f64 {
    let (Some(a), Some(b)) = (k.momentum(i), k.momentum(j)) else {
        return 0.0;
    };
    let (px, py, pz, e) = (a[0] + b[0], a[1] + b[1], a[2] + b[2], a[3] + b[3]);
    let m2 = e * e - (px * px + py * py + pz * pz);
    if m2 > 0.0 { m2.sqrt() } else { 0.0 }
}

/// ΔR between two leptons with Δφ wrapped into `(-π, π]`.
///
/// Returns 0 when either index is out of range for `eta`/`phi`.
pub fn delta_r(eta: &[f64], phi: &[f64], i: usize, j: usize) -> f64 {
    match (eta.get(i), eta.get(j), phi.get(i), phi.get(j)) {
        (Some(eta_i), Some(eta_j), Some(phi_i), Some(phi_j)) => {
            let deta = eta_i - eta_j;
            let dphi = delta_phi(*phi_j, *phi_i);
            (deta * deta + dphi * dphi).sqrt()
        }
        _ => 0.0,
    }
}

/// Invariant masses for a pair list.
pub fn masses(pairs: &[Pair], k: &LeptonKinematics<'_>) -> Vec<f64> {
    pairs.iter().map(|&(i, j)| invariant_mass(k, i, j)).collect()
}

/// ΔR values for a pair list.
pub fn delta_rs(pairs: &[Pair], eta: &[f64], phi: &[f64]) -> Vec<f64> {
    pairs.iter().map(|&(i, j)| delta_r(eta, phi, i, j)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn back_to_back_massless() {
        let k = LeptonKinematics { pt: &[50.0, 50.0], eta: &[0.0, 0.0], phi: &[0.0, PI], mass: &[0.0, 0.0] };
        assert_relative_eq!(invariant_mass(&k, 0, 1), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn z_like_pair() {
        // Two muons at the same azimuth and rapidity: mass is the sum of rest masses.
        let m = 0.1056583755;
        let k = LeptonKinematics { pt: &[40.0, 40.0], eta: &[0.7, 0.7], phi: &[1.2, 1.2], mass: &[m, m] };
        assert_relative_eq!(invariant_mass(&k, 0, 1), 2.0 * m, max_relative = 1e-4);
    }

    #[test]
    fn out_of_range_degrades_to_zero() {
        let k = LeptonKinematics { pt: &[10.0, 20.0], eta: &[0.1, 0.2], phi: &[0.0, 1.0], mass: &[0.0] };
        assert_eq!(invariant_mass(&k, 0, 1), 0.0);
        assert_eq!(delta_r(&[0.1], &[0.0, 1.0], 0, 1), 0.0);
        assert_eq!(masses(&[(0, 5)], &k), vec![0.0]);
    }

    #[test]
    fn delta_r_wraps_phi() {
        let dr = delta_r(&[0.0, 0.0], &[3.0, -3.0], 0, 1);
        assert_relative_eq!(dr, 2.0 * PI - 6.0, epsilon = 1e-12);
        let dr = delta_r(&[1.0, -1.0], &[0.5, 0.5], 0, 1);
        assert_relative_eq!(dr, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn nan_inputs_give_zero_mass() {
        let k = LeptonKinematics { pt: &[f64::NAN, 20.0], eta: &[0.0, 0.0], phi: &[0.0, 1.0], mass: &[0.0, 0.0] };
        assert_eq!(invariant_mass(&k, 0, 1), 0.0);
    }
}
