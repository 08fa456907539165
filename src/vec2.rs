use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn scale(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s)
    }

    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    pub fn component(self, component: Component) -> f32 {
        match component {
            Component::U => self.x,
            Component::V => self.y,
        }
    }
}

/// Velocity component of a staggered field: `U` lives on vertical faces,
/// `V` on horizontal faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Component {
    U,
    V,
}
