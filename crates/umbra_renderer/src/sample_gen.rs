//! Sample generators: how the values of a channel are spread over `[0,1)`.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use umbra_core::SampleGenKind;
use umbra_math::Vec2;

/// Fills a channel buffer with values in `[0, 1)`.
pub trait SampleGen: Send + Sync {
    fn gen_floats(&self, rng: &mut StdRng, out: &mut [f32]);
    fn gen_uvs(&self, rng: &mut StdRng, out: &mut [Vec2]);
}

/// Jittered stratification. 2D channels use a grid of `ceil(sqrt(n))` by
/// `round(sqrt(n))` cells, randomly thinned to exactly `n`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridGen;

impl SampleGen for GridGen {
    fn gen_floats(&self, rng: &mut StdRng, out: &mut [f32]) {
        let n = out.len() as f32;
        for (i, v) in out.iter_mut().enumerate() {
            *v = ((i as f32 + rng.gen::<f32>()) / n).min(ONE_MINUS_EPS);
        }
    }

    fn gen_uvs(&self, rng: &mut StdRng, out: &mut [Vec2]) {
        let n = out.len();
        if n == 0 {
            return;
        }
        let root = (n as f32).sqrt();
        let u_steps = root.ceil() as usize;
        let v_steps = (root + 0.5).floor() as usize;

        let mut cells: Vec<Vec2> = (0..v_steps)
            .flat_map(|v| (0..u_steps).map(move |u| (u, v)))
            .map(|(u, v)| {
                Vec2::new(
                    ((u as f32 + rng.gen::<f32>()) / u_steps as f32).min(ONE_MINUS_EPS),
                    ((v as f32 + rng.gen::<f32>()) / v_steps as f32).min(ONE_MINUS_EPS),
                )
            })
            .collect();
        cells.shuffle(rng);
        out.copy_from_slice(&cells[..n]);
    }
}

/// Independent uniform values.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomGen;

impl SampleGen for RandomGen {
    fn gen_floats(&self, rng: &mut StdRng, out: &mut [f32]) {
        out.iter_mut().for_each(|v| *v = rng.gen());
    }

    fn gen_uvs(&self, rng: &mut StdRng, out: &mut [Vec2]) {
        out.iter_mut().for_each(|v| *v = Vec2::new(rng.gen(), rng.gen()));
    }
}

const ONE_MINUS_EPS: f32 = 1.0 - f32::EPSILON;

pub fn sample_gen(kind: SampleGenKind) -> Box<dyn SampleGen> {
    match kind {
        SampleGenKind::Grid => Box::new(GridGen),
        SampleGenKind::Random => Box::new(RandomGen),
    }
}
