//! Fresnel reflectance for dielectrics and conductors.

/// Complex index of refraction: real part `n`, extinction `k`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ior {
    pub n: f32,
    pub k: f32,
}

impl Ior {
    pub fn new(n: f32, k: f32) -> Self {
        Self { n, k }
    }

    /// A lossless dielectric.
    pub fn dielectric(n: f32) -> Self {
        Self { n, k: 0.0 }
    }
}

/// Unpolarized Fresnel reflectance at a boundary between two media.
#[derive(Debug, Clone, Copy)]
pub struct Fresnel {
    /// Relative index of refraction (outside to inside)
    ior: Ior,
    n2k2: f32,
    n2_m_k2: f32,
}

impl Fresnel {
    /// Boundary from a dielectric of index `n1` into one of index `n2`.
    pub fn new(n1: f32, n2: f32) -> Self {
        let n = n2 / n1;
        Self {
            ior: Ior::dielectric(n),
            n2k2: 0.0,
            n2_m_k2: n * n,
        }
    }

    /// Boundary from a dielectric of index `n1` into a possibly conducting
    /// medium.
    pub fn with_ior(n1: f32, ior: Ior) -> Self {
        if ior.k == 0.0 {
            return Self::new(n1, ior.n);
        }
        let rel = Ior::new(ior.n / n1, ior.k / n1);
        Self {
            ior: rel,
            n2k2: rel.n * rel.n * rel.k * rel.k,
            n2_m_k2: rel.n * rel.n - rel.k * rel.k,
        }
    }

    /// Fraction of light reflected for an incidence angle with cosine
    /// `cos_i` (its sign is ignored).
    pub fn reflectance(&self, cos_i: f32) -> f32 {
        let cos_i = cos_i.clamp(-1.0, 1.0).abs();
        let sin_i = (1.0 - cos_i * cos_i).max(0.0).sqrt();

        let r = if self.ior.k == 0.0 {
            let n = self.ior.n;
            let sin_t = (sin_i / n).clamp(-1.0, 1.0);
            let cos_t = (1.0 - sin_t * sin_t).sqrt();
            let fs = (n * cos_i - cos_t) / (n * cos_i + cos_t);
            let fp = (cos_i - n * cos_t) / (cos_i + n * cos_t);
            (fs * fs + fp * fp) / 2.0
        } else {
            if cos_i < 1e-6 {
                return 1.0;
            }
            let n2_m_k2_m_sin2 = self.n2_m_k2 - sin_i * sin_i;
            let common = (n2_m_k2_m_sin2 * n2_m_k2_m_sin2 + 4.0 * self.n2k2).sqrt();
            let a2 = (common + n2_m_k2_m_sin2) / 2.0;
            let b2 = (common - n2_m_k2_m_sin2) / 2.0;
            let a = a2.sqrt();

            let rs_1 = a2 + b2 + cos_i * cos_i;
            let rs_2 = 2.0 * a * cos_i;
            let rs = (rs_1 - rs_2) / (rs_1 + rs_2);

            let sin_tan = sin_i * sin_i / cos_i;
            let rp_1 = a2 + b2 + sin_tan * sin_tan;
            let rp_2 = 2.0 * a * sin_tan;
            let rp = rs * (rp_1 - rp_2) / (rp_1 + rp_2);
            (rs + rp) / 2.0
        };

        if r.is_nan() {
            0.0
        } else {
            r.clamp(0.0, 1.0)
        }
    }
}
