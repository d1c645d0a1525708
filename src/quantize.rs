//! Rotation key compression.
//!
//! Compressed tracks store each XYZW component as one byte, mapped through a per-track affine
//! `base + byte / 255 * scale`. Uncompressed tracks store XYZ as floats and the reader rebuilds
//! W as `sqrt(max(0, 1 - x² - y² - z²))`.

use cgmath::Quaternion;

/// Scales below this are treated as degenerate.
pub const MIN_SCALE: f32 = 1e-10;
/// Scale substituted for degenerate components and empty tracks.
pub const DEFAULT_SCALE: f32 = 0.001;

/// The 32 byte unpack block written once per compressed rotation track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantizationParams {
    pub scale: [f32; 4],
    pub base: [f32; 4],
}

impl Default for QuantizationParams {
    fn default() -> Self {
        Self {
            scale: [DEFAULT_SCALE; 4],
            base: [0.0; 4],
        }
    }
}

/// Quaternion as `[x, y, z, w]`, the on-disk component order.
pub fn components(q: &Quaternion<f32>) -> [f32; 4] {
    [q.v.x, q.v.y, q.v.z, q.s]
}

pub fn from_components(c: [f32; 4]) -> Quaternion<f32> {
    Quaternion::new(c[3], c[0], c[1], c[2])
}

impl QuantizationParams {
    /// Component-wise min/max over the track's keys.
    pub fn derive<'a, I>(keys: I) -> Self
    where
        I: IntoIterator<Item = &'a Quaternion<f32>>,
    {
        let mut min = [f32::INFINITY; 4];
        let mut max = [f32::NEG_INFINITY; 4];
        let mut any = false;
        for q in keys {
            any = true;
            for (i, c) in components(q).iter().enumerate() {
                min[i] = min[i].min(*c);
                max[i] = max[i].max(*c);
            }
        }
        if !any {
            return Self::default();
        }

        let mut scale = [0.0; 4];
        for i in 0..4 {
            scale[i] = max[i] - min[i];
            if !(scale[i] >= MIN_SCALE) {
                scale[i] = DEFAULT_SCALE;
            }
        }
        Self { scale, base: min }
    }

    pub fn encode(&self, q: &Quaternion<f32>) -> [u8; 4] {
        let c = components(q);
        let mut out = [0u8; 4];
        for i in 0..4 {
            let scale = self.scale[i] as f64;
            out[i] = if scale.abs() > MIN_SCALE as f64 && scale.is_finite() {
                let v = ((c[i] as f64 - self.base[i] as f64) / scale * 255.0).round();
                v.max(0.0).min(255.0) as u8
            } else {
                128
            };
        }
        out
    }

    pub fn decode(&self, bytes: [u8; 4]) -> Quaternion<f32> {
        let mut c = [0.0; 4];
        for i in 0..4 {
            c[i] = self.base[i] + (bytes[i] as f32 / 255.0) * self.scale[i];
        }
        from_components(c)
    }

    /// Largest per-component error introduced by a round trip through this track.
    pub fn tolerance(&self, component: usize) -> f32 {
        self.scale[component] / 255.0
    }
}

/// XYZ stored for an uncompressed rotation key.
///
/// The reader always rebuilds a non-negative W, so keys with negative W are stored negated.
pub fn pack_xyz(q: &Quaternion<f32>) -> [f32; 3] {
    let q = if q.s < 0.0 { -*q } else { *q };
    [q.v.x, q.v.y, q.v.z]
}

pub fn unpack_xyz(xyz: [f32; 3]) -> Quaternion<f32> {
    let [x, y, z] = xyz;
    let w = (1.0 - x * x - y * y - z * z).max(0.0).sqrt();
    Quaternion::new(w, x, y, z)
}

#[cfg(test)]
mod test {
    use super::*;
    use cgmath::{Deg, InnerSpace, Rotation3, Vector3};

    fn sweep() -> Vec<Quaternion<f32>> {
        let axis = Vector3::new(0.3, 0.9, 0.1f32).normalize();
        (0..24)
            .map(|i| Quaternion::from_axis_angle(axis, Deg(i as f32 * 7.5)))
            .collect()
    }

    #[test]
    fn empty_track_uses_default() {
        let params = QuantizationParams::derive(Vec::<Quaternion<f32>>::new().iter());
        assert_eq!(params, QuantizationParams::default());
    }

    #[test]
    fn constant_component_is_clamped() {
        let keys = vec![Quaternion::new(1.0, 0.0, 0.0, 0.0); 3];
        let params = QuantizationParams::derive(&keys);
        assert_eq!(params.scale, [DEFAULT_SCALE; 4]);
        assert_eq!(params.base, [0.0, 0.0, 0.0, 1.0]);
        assert!(params.scale.iter().all(|s| *s >= MIN_SCALE));
    }

    #[test]
    fn roundtrip_within_tolerance() {
        let keys = sweep();
        let params = QuantizationParams::derive(&keys);
        for q in &keys {
            let back = params.decode(params.encode(q));
            let (a, b) = (components(q), components(&back));
            for i in 0..4 {
                assert!((a[i] - b[i]).abs() <= params.tolerance(i) + 1e-6);
                assert!(b[i] >= params.base[i] && b[i] <= params.base[i] + params.scale[i]);
            }
        }
    }

    #[test]
    fn encode_clamps_out_of_range() {
        let params = QuantizationParams {
            scale: [0.5; 4],
            base: [0.0; 4],
        };
        let bytes = params.encode(&Quaternion::new(2.0, -1.0, 0.25, 0.5));
        assert_eq!(bytes, [0, 128, 255, 255]);
    }

    #[test]
    fn degenerate_scale_encodes_midpoint() {
        let params = QuantizationParams {
            scale: [0.0, 1.0, 1.0, 1.0],
            base: [0.0; 4],
        };
        assert_eq!(params.encode(&Quaternion::new(1.0, 0.7, 0.0, 0.0))[0], 128);
    }

    #[test]
    fn uncompressed_rebuilds_w() {
        for q in sweep() {
            let back = unpack_xyz(pack_xyz(&q));
            assert!((back.s - q.s).abs() < 1e-5);
            assert!((back.v.y - q.v.y).abs() < 1e-6);
        }
    }

    #[test]
    fn uncompressed_flips_negative_w() {
        let q = Quaternion::new(-0.8, 0.6, 0.0, 0.0);
        let back = unpack_xyz(pack_xyz(&q));
        assert!((back.s - 0.8).abs() < 1e-6);
        assert!((back.v.x + 0.6).abs() < 1e-6);
    }
}
