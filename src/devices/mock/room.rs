//! Simulated room geometry
//!
//! Analytic ray casting against four walls and round obstacles. Distances are
//! measured from the sensor position in centimeters.

use super::config::{ObstacleConfig, RoomConfig};

/// Room the simulated sensor sits in
#[derive(Debug, Clone)]
pub struct Room {
    width: f32,
    depth: f32,
    sensor: (f32, f32),
    obstacles: Vec<ObstacleConfig>,
}

impl Room {
    pub fn new(config: &RoomConfig) -> Self {
        Self {
            width: config.width_cm,
            depth: config.depth_cm,
            // max/min rather than clamp: tolerates a degenerate room
            sensor: (
                config.sensor_x_cm.max(0.0).min(config.width_cm),
                config.sensor_y_cm.max(0.0).min(config.depth_cm),
            ),
            obstacles: config.obstacles.clone(),
        }
    }

    /// Distance to the nearest surface along `heading_deg` (0° = +x, counter-clockwise)
    pub fn range_at(&self, heading_deg: f32) -> f32 {
        let theta = heading_deg.to_radians();
        let (dx, dy) = (theta.cos(), theta.sin());
        let (sx, sy) = self.sensor;

        let mut nearest = f32::INFINITY;

        // Walls
        if dx > f32::EPSILON {
            nearest = nearest.min((self.width - sx) / dx);
        } else if dx < -f32::EPSILON {
            nearest = nearest.min(-sx / dx);
        }
        if dy > f32::EPSILON {
            nearest = nearest.min((self.depth - sy) / dy);
        } else if dy < -f32::EPSILON {
            nearest = nearest.min(-sy / dy);
        }

        // Obstacles
        for obstacle in &self.obstacles {
            let fx = sx - obstacle.x_cm;
            let fy = sy - obstacle.y_cm;
            let b = fx * dx + fy * dy;
            let c = fx * fx + fy * fy - obstacle.radius_cm * obstacle.radius_cm;
            let disc = b * b - c;
            if disc < 0.0 {
                continue;
            }
            let root = disc.sqrt();
            let near = -b - root;
            let far = -b + root;
            let hit = if near > 0.0 { near } else { far };
            if hit > 0.0 {
                nearest = nearest.min(hit);
            }
        }

        nearest
    }
}
