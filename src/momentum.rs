use crate::mask::BoundaryMask;
use crate::vec2::{Component, Vec2};
use crate::{Field2, MacVelocity2};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MomentumParams {
    /// Reynolds number.
    pub re: f32,
    /// Donor-cell weight: 0 is pure central differencing, 1 pure upwind.
    pub alpha: f32,
    pub dt: f32,
    pub mesh: Vec2,
    /// Body force per unit mass.
    pub force: Vec2,
}

/// Convective derivative `d(t q)/ds` at a face from the transporting velocity
/// `t` at the two half points and the transported quantity `q` at the face
/// and its two neighbors along `s`.
fn convective(alpha: f32, h: f32, t_lo: f32, t_hi: f32, q_lo: f32, q: f32, q_hi: f32) -> f32 {
    let central = t_hi * 0.5 * (q + q_hi) - t_lo * 0.5 * (q_lo + q);
    let upwind = t_hi.abs() * 0.5 * (q - q_hi) - t_lo.abs() * 0.5 * (q_lo - q);
    (central + alpha * upwind) / h
}

fn laplacian(h: Vec2, left: f32, right: f32, bottom: f32, top: f32, center: f32) -> f32 {
    (left - 2.0 * center + right) / (h.x * h.x) + (bottom - 2.0 * center + top) / (h.y * h.y)
}

fn predict_u(u: &Field2, v: &Field2, params: &MomentumParams, x: usize, y: usize) -> f32 {
    let h = params.mesh;
    let center = u.get(x, y);
    let (left, right) = (u.get(x - 1, y), u.get(x + 1, y));
    let (bottom, top) = (u.get(x, y - 1), u.get(x, y + 1));

    let du2_dx = convective(
        params.alpha,
        h.x,
        0.5 * (left + center),
        0.5 * (center + right),
        left,
        center,
        right,
    );
    let v_top = 0.5 * (v.get(x - 1, y + 1) + v.get(x, y + 1));
    let v_bottom = 0.5 * (v.get(x - 1, y) + v.get(x, y));
    let duv_dy = convective(params.alpha, h.y, v_bottom, v_top, bottom, center, top);

    let diffusion = laplacian(h, left, right, bottom, top, center) / params.re;
    center + params.dt * (diffusion - du2_dx - duv_dy + params.force.x)
}

fn predict_v(u: &Field2, v: &Field2, params: &MomentumParams, x: usize, y: usize) -> f32 {
    let h = params.mesh;
    let center = v.get(x, y);
    let (left, right) = (v.get(x - 1, y), v.get(x + 1, y));
    let (bottom, top) = (v.get(x, y - 1), v.get(x, y + 1));

    let dv2_dy = convective(
        params.alpha,
        h.y,
        0.5 * (bottom + center),
        0.5 * (center + top),
        bottom,
        center,
        top,
    );
    let u_right = 0.5 * (u.get(x + 1, y - 1) + u.get(x + 1, y));
    let u_left = 0.5 * (u.get(x, y - 1) + u.get(x, y));
    let duv_dx = convective(params.alpha, h.x, u_left, u_right, left, center, right);

    let diffusion = laplacian(h, left, right, bottom, top, center) / params.re;
    center + params.dt * (diffusion - duv_dx - dv2_dy + params.force.y)
}

/// Explicit Euler predictor for the intermediate velocity (F, G) without the
/// pressure term. Only faces between two interior fluid cells are computed;
/// every other face copies the current velocity and is expected to go through
/// the boundary pass afterwards.
pub fn predict(
    velocity: &MacVelocity2,
    predicted: &mut MacVelocity2,
    mask: &BoundaryMask,
    params: MomentumParams,
) {
    let u = velocity.u();
    let v = velocity.v();
    predicted.u_mut().fill_with_index(|x, y| {
        if mask.is_interior_face(Component::U, x, y) {
            predict_u(u, v, &params, x, y)
        } else {
            u.get(x, y)
        }
    });
    predicted.v_mut().fill_with_index(|x, y| {
        if mask.is_interior_face(Component::V, x, y) {
            predict_v(u, v, &params, x, y)
        } else {
            v.get(x, y)
        }
    });
}
