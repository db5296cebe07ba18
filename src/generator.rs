//! Synthetic instance generation.
//!
//! Nodes are laid out on a rectangular panel by a [`Layout`] and then moved by
//! a [`Perturbation`]. Combined with [`CostFunction::Unfair`] this produces
//! asymmetric, sparse graphs that break the triangle inequality.
//!
//! [`CostFunction::Unfair`]: crate::instance::CostFunction::Unfair

use crate::instance::Node;
use rand::distributions::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;
use std::f64::consts::PI;

/// Rectangular area nodes are placed on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Panel {
    pub width: f64,
    pub height: f64,
}

impl Panel {
    pub fn new(width: f64, height: f64) -> Self {
        Panel { width, height }
    }

    fn clamp(&self, x: f64, y: f64) -> (f64, f64) {
        (x.clamp(0.0, self.width), y.clamp(0.0, self.height))
    }
}

impl Default for Panel {
    fn default() -> Self {
        Panel::new(200.0, 100.0)
    }
}

/// How base positions are chosen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Layout {
    /// Uniformly random positions
    Uniform,
    /// Uniformly random positions on the panel diagonal
    Line,
    /// Equally spaced points on a super-ellipse inscribed in the panel
    SuperEllipse { m: f64, n: f64 },
}

/// Noise applied to base positions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Perturbation {
    None,
    Uniform { magnitude: f64 },
    Normal { mean: f64, sigma: f64 },
}

/// Node generator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub layout: Layout,
    pub perturbation: Perturbation,
}

impl Default for Generator {
    fn default() -> Self {
        Generator {
            layout: Layout::Uniform,
            perturbation: Perturbation::Normal { mean: 0.0, sigma: 1.0 },
        }
    }
}

impl Generator {
    pub fn new(layout: Layout, perturbation: Perturbation) -> Self {
        Generator { layout, perturbation }
    }

    /// Generate `count` nodes numbered from 1
    pub fn generate<R: Rng + ?Sized>(&self, panel: &Panel, count: usize, rng: &mut R) -> Vec<Node> {
        let base = self.base_positions(panel, count, rng);
        base.into_iter()
            .enumerate()
            .map(|(i, (x, y))| {
                let (x, y) = self.perturb(panel, x, y, rng);
                Node::new(i + 1, x, y)
            })
            .collect()
    }

    fn base_positions<R: Rng + ?Sized>(&self, panel: &Panel, count: usize, rng: &mut R) -> Vec<(f64, f64)> {
        match self.layout {
            Layout::Uniform => (0..count)
                .map(|_| (rng.gen::<f64>() * panel.width, rng.gen::<f64>() * panel.height))
                .collect(),
            Layout::Line => {
                let slope = if panel.width > 0.0 { panel.height / panel.width } else { 0.0 };
                (0..count)
                    .map(|_| {
                        let x = rng.gen::<f64>() * panel.width;
                        (x, slope * x)
                    })
                    .collect()
            }
            Layout::SuperEllipse { m, n } => {
                let step = 2.0 * PI / count.max(1) as f64;
                let a = panel.width * 0.5;
                let b = panel.height * 0.5;
                (0..count)
                    .map(|i| {
                        let theta = step * i as f64;
                        let (s, c) = theta.sin_cos();
                        let x = a * c.abs().powf(2.0 / m) * sign(c) + a;
                        let y = b * s.abs().powf(2.0 / n) * sign(s) + b;
                        (x, y)
                    })
                    .collect()
            }
        }
    }

    fn perturb<R: Rng + ?Sized>(&self, panel: &Panel, x: f64, y: f64, rng: &mut R) -> (f64, f64) {
        match self.perturbation {
            Perturbation::None => (x, y),
            Perturbation::Uniform { magnitude } => {
                let dx = (rng.gen::<f64>() * 2.0 - 1.0) * magnitude;
                let dy = (rng.gen::<f64>() * 2.0 - 1.0) * magnitude;
                panel.clamp(x + dx, y + dy)
            }
            Perturbation::Normal { mean, sigma } => match Normal::new(mean, sigma) {
                Ok(normal) => {
                    let dx = normal.sample(rng);
                    let dy = normal.sample(rng);
                    panel.clamp(x + dx, y + dy)
                }
                Err(_) => panel.clamp(x + mean, y + mean),
            },
        }
    }
}

fn sign(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v.signum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_uniform_nodes_stay_on_panel() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let panel = Panel::new(50.0, 20.0);
        let generator = Generator::new(Layout::Uniform, Perturbation::Normal { mean: 0.0, sigma: 30.0 });

        let nodes = generator.generate(&panel, 40, &mut rng);

        assert_eq!(nodes.len(), 40);
        for (i, node) in nodes.iter().enumerate() {
            assert_eq!(node.id, i + 1);
            assert!((0.0..=50.0).contains(&node.x));
            assert!((0.0..=20.0).contains(&node.y));
        }
    }

    #[test]
    fn test_line_layout_without_noise() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let panel = Panel::new(200.0, 100.0);
        let generator = Generator::new(Layout::Line, Perturbation::None);

        for node in generator.generate(&panel, 10, &mut rng) {
            assert!((node.y - node.x * 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_super_ellipse_with_m_n_two_is_an_ellipse() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let panel = Panel::new(200.0, 100.0);
        let generator = Generator::new(Layout::SuperEllipse { m: 2.0, n: 2.0 }, Perturbation::None);

        let nodes = generator.generate(&panel, 8, &mut rng);

        assert!((nodes[0].x - 200.0).abs() < 1e-9);
        assert!((nodes[0].y - 50.0).abs() < 1e-9);
        for node in &nodes {
            let u = (node.x - 100.0) / 100.0;
            let v = (node.y - 50.0) / 50.0;
            assert!((u * u + v * v - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_same_seed_same_nodes() {
        let panel = Panel::default();
        let generator = Generator::default();
        let a = generator.generate(&panel, 12, &mut ChaCha8Rng::seed_from_u64(99));
        let b = generator.generate(&panel, 12, &mut ChaCha8Rng::seed_from_u64(99));
        assert_eq!(a, b);
    }
}
