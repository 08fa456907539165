use crate::error::{SimError, SimResult};
use crate::vec2::{Component, Vec2};
use crate::{Field2, Grid2};

/// Smallest grid with at least one interior row and column.
pub const MIN_CELLS: usize = 3;

/// Staggered (MAC) grid metadata: `nx` x `ny` cells covering
/// `length.x` x `length.y`. The mesh width is always derived from the stored
/// size and length, never rescaled incrementally.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MacGrid2 {
    nx: usize,
    ny: usize,
    length: Vec2,
    mesh: Vec2,
}

impl MacGrid2 {
    pub fn new(nx: usize, ny: usize, length: Vec2) -> SimResult<Self> {
        validate_size(nx, ny)?;
        validate_length(length)?;
        Ok(Self {
            nx,
            ny,
            length,
            mesh: mesh_of(nx, ny, length),
        })
    }

    pub fn width(&self) -> usize {
        self.nx
    }

    pub fn height(&self) -> usize {
        self.ny
    }

    pub fn length(&self) -> Vec2 {
        self.length
    }

    pub fn mesh(&self) -> Vec2 {
        self.mesh
    }

    pub fn set_size(&mut self, nx: usize, ny: usize) -> SimResult<()> {
        validate_size(nx, ny)?;
        self.nx = nx;
        self.ny = ny;
        self.mesh = mesh_of(nx, ny, self.length);
        Ok(())
    }

    pub fn set_length(&mut self, length: Vec2) -> SimResult<()> {
        validate_length(length)?;
        self.length = length;
        self.mesh = mesh_of(self.nx, self.ny, length);
        Ok(())
    }

    pub fn cell_grid(&self) -> Grid2 {
        Grid2::new(self.nx, self.ny)
    }

    /// Vertical faces; `u[i, j]` is the left face of cell `(i, j)`.
    pub fn u_grid(&self) -> Grid2 {
        Grid2::new(self.nx + 1, self.ny)
    }

    /// Horizontal faces; `v[i, j]` is the bottom face of cell `(i, j)`.
    pub fn v_grid(&self) -> Grid2 {
        Grid2::new(self.nx, self.ny + 1)
    }

    /// Interior cells only; entry `(i - 1, j - 1)` belongs to cell `(i, j)`.
    pub fn interior_grid(&self) -> Grid2 {
        Grid2::new(self.nx - 2, self.ny - 2)
    }
}

fn mesh_of(nx: usize, ny: usize, length: Vec2) -> Vec2 {
    Vec2::new(length.x / nx as f32, length.y / ny as f32)
}

fn validate_size(nx: usize, ny: usize) -> SimResult<()> {
    if nx < MIN_CELLS || ny < MIN_CELLS {
        return Err(SimError::config(
            0,
            format!("grid size {nx}x{ny} is below the {MIN_CELLS}x{MIN_CELLS} minimum"),
        ));
    }
    Ok(())
}

fn validate_length(length: Vec2) -> SimResult<()> {
    let valid = |value: f32| value.is_finite() && value > 0.0;
    if !valid(length.x) || !valid(length.y) {
        return Err(SimError::config(
            0,
            format!("domain length {} x {} must be positive", length.x, length.y),
        ));
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq)]
pub struct MacVelocity2 {
    grid: MacGrid2,
    u: Field2,
    v: Field2,
}

impl MacVelocity2 {
    pub fn new(grid: MacGrid2, fill: Vec2) -> Self {
        let u = Field2::new(grid.u_grid(), fill.x);
        let v = Field2::new(grid.v_grid(), fill.y);
        Self { grid, u, v }
    }

    pub fn from_components(grid: MacGrid2, u: Field2, v: Field2) -> Self {
        assert_eq!(u.grid(), grid.u_grid(), "u grid mismatch");
        assert_eq!(v.grid(), grid.v_grid(), "v grid mismatch");
        Self { grid, u, v }
    }

    pub fn grid(&self) -> MacGrid2 {
        self.grid
    }

    pub fn u(&self) -> &Field2 {
        &self.u
    }

    pub fn v(&self) -> &Field2 {
        &self.v
    }

    pub fn u_mut(&mut self) -> &mut Field2 {
        &mut self.u
    }

    pub fn v_mut(&mut self) -> &mut Field2 {
        &mut self.v
    }

    pub fn component_mut(&mut self, component: Component) -> &mut Field2 {
        match component {
            Component::U => &mut self.u,
            Component::V => &mut self.v,
        }
    }

    pub fn clone_from(&mut self, other: &Self) {
        self.u.clone_from(&other.u);
        self.v.clone_from(&other.v);
    }

    /// Velocity interpolated to the centre of cell `(x, y)`.
    pub fn cell_velocity(&self, x: usize, y: usize) -> Vec2 {
        Vec2::new(
            0.5 * (self.u.get(x, y) + self.u.get(x + 1, y)),
            0.5 * (self.v.get(x, y) + self.v.get(x, y + 1)),
        )
    }
}
