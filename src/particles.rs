use crate::ring::NodeGraph;
use rand::Rng;
use ratatui::style::Color;

/// Ephemeral in-flight request visual, travelling from the ring center
/// toward one node. Dead once `progress` reaches 1.
#[derive(Clone, Debug)]
pub struct Particle {
    pub origin: (f64, f64),
    pub target: (f64, f64),
    pub color: Color,
    pub progress: f64,
    pub speed: f64,
}

impl Particle {
    /// Advance one animation frame. Returns false once the particle has
    /// arrived and must not be drawn again.
    pub fn advance(&mut self) -> bool {
        self.progress += self.speed;
        self.progress < 1.0
    }

    pub fn position(&self) -> (f64, f64) {
        let (ox, oy) = self.origin;
        let (tx, ty) = self.target;
        (ox + (tx - ox) * self.progress, oy + (ty - oy) * self.progress)
    }
}

/// The live particle set, ticked by the animation clock regardless of
/// whether any poll has ever succeeded.
pub struct ParticleField {
    particles: Vec<Particle>,
    speed_min: f64,
    speed_max: f64,
}

impl ParticleField {
    pub fn new(speed_min: f64, speed_max: f64) -> Self {
        Self {
            particles: Vec::new(),
            speed_min,
            speed_max,
        }
    }

    /// One animation frame: advance every particle, retire arrivals.
    pub fn advance(&mut self) {
        self.particles.retain_mut(|p| p.advance());
    }

    /// Launch one particle from the center toward the node whose identity
    /// contains `hint`, or a uniformly random node when nothing matches.
    /// No-op while the ring is empty.
    pub fn spawn(&mut self, hint: &str, graph: &NodeGraph) {
        if graph.is_empty() {
            return;
        }

        let mut rng = rand::thread_rng();
        let target = match graph.find_containing(hint) {
            Some(vn) => vn,
            None => match graph.nth(rng.gen_range(0..graph.len())) {
                Some(vn) => vn,
                None => return,
            },
        };

        // A config with min == max means constant speed; gen_range
        // panics on an empty range.
        let speed = if self.speed_max > self.speed_min {
            rng.gen_range(self.speed_min..self.speed_max)
        } else {
            self.speed_min
        };

        self.particles.push(Particle {
            origin: (0.0, 0.0),
            target: (target.x, target.y),
            color: Color::White,
            progress: 0.0,
            speed,
        });
    }

    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }
}
