#[derive(Clone, Debug)]
pub struct Config {
    /// Degree cap; reaching it moves a vertex from search to optimize.
    pub desired_degree: usize,
    /// Target inter-edge angles, in degrees.
    pub desired_angles: Vec<f32>,
    pub sight_radius: f32,
    pub connection_radius: f32,
    pub repulsion_radius: f32,
    pub repulsion_strength: f32,
    pub search_speed: f32,
    pub optimize_speed: f32,
    /// Magnitude of the single-axis random nudge applied to the optimize
    /// result.
    pub perturbation: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            desired_degree: 4,
            desired_angles: vec![36.0, 72.0, 108.0],
            sight_radius: 10.0,
            connection_radius: 2.0,
            repulsion_radius: 4.0,
            // Below the unit search steering, so repulsion slows an
            // approach without ever stalling it.
            repulsion_strength: 0.5,
            search_speed: 1.0,
            optimize_speed: 0.5,
            perturbation: 0.1,
        }
    }
}
