use crate::mask::BoundaryMask;
use crate::vec2::Component;
use crate::{Field2, MacVelocity2};

/// Projects the predicted velocity onto the divergence-free space:
/// `u = F - dt * dp/dx` and `v = G - dt * dp/dy` on faces between interior
/// fluid cells. Other faces take F (or G) unchanged.
pub fn correct(
    predicted: &MacVelocity2,
    pressure: &Field2,
    velocity: &mut MacVelocity2,
    mask: &BoundaryMask,
    dt: f32,
) {
    let mesh = predicted.grid().mesh();
    let f = predicted.u();
    let g = predicted.v();
    velocity.u_mut().fill_with_index(|x, y| {
        if mask.is_interior_face(Component::U, x, y) {
            f.get(x, y) - dt / mesh.x * (pressure.get(x, y) - pressure.get(x - 1, y))
        } else {
            f.get(x, y)
        }
    });
    velocity.v_mut().fill_with_index(|x, y| {
        if mask.is_interior_face(Component::V, x, y) {
            g.get(x, y) - dt / mesh.y * (pressure.get(x, y) - pressure.get(x, y - 1))
        } else {
            g.get(x, y)
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec2::Vec2;
    use crate::MacGrid2;

    fn assert_close(a: f32, b: f32, tol: f32) {
        assert!(
            (a - b).abs() <= tol,
            "expected {a} to be within {tol} of {b}"
        );
    }

    #[test]
    fn linear_pressure_removes_uniform_gradient() {
        let grid = MacGrid2::new(6, 6, Vec2::new(3.0, 3.0)).unwrap();
        let mask = BoundaryMask::lid_driven_cavity(grid.cell_grid());
        let predicted = MacVelocity2::new(grid, Vec2::new(1.0, 0.5));
        let pressure = Field2::from_fn(grid.cell_grid(), |x, y| x as f32 + 2.0 * y as f32);
        let mut velocity = MacVelocity2::new(grid, Vec2::zero());
        correct(&predicted, &pressure, &mut velocity, &mask, 0.25);

        let h = grid.mesh().x;
        assert_close(velocity.u().get(2, 2), 1.0 - 0.25 / h, 1e-6);
        assert_close(velocity.v().get(3, 3), 0.5 - 0.25 * 2.0 / h, 1e-6);
        // Faces touching a wall keep the predicted value for the boundary pass.
        assert_close(velocity.u().get(1, 2), 1.0, 1e-6);
        assert_close(velocity.v().get(3, 5), 0.5, 1e-6);
    }

    #[test]
    fn constant_pressure_leaves_prediction() {
        let grid = MacGrid2::new(5, 4, Vec2::new(1.0, 1.0)).unwrap();
        let mask = BoundaryMask::lid_driven_cavity(grid.cell_grid());
        let mut predicted = MacVelocity2::new(grid, Vec2::zero());
        predicted
            .u_mut()
            .fill_with_index(|x, y| (x * 3 + y) as f32 * 0.1);
        let pressure = Field2::new(grid.cell_grid(), 4.0);
        let mut velocity = MacVelocity2::new(grid, Vec2::zero());
        correct(&predicted, &pressure, &mut velocity, &mask, 1.0);
        assert_eq!(velocity, predicted);
    }
}
