use crate::mask::{BoundaryMask, CellType, NeighborFlags, VelocityRule};
use crate::vec2::{Component, Vec2};
use crate::{Field2, Grid2, MacVelocity2};

/// Cells on either side of a face along the component's normal axis:
/// `(lower, upper)`, i.e. (left, right) for `u` and (bottom, top) for `v`.
fn adjacent_cells(
    component: Component,
    cells: Grid2,
    x: usize,
    y: usize,
) -> (Option<(usize, usize)>, Option<(usize, usize)>) {
    let (x, y) = (x as i64, y as i64);
    let lower = match component {
        Component::U => (x - 1, y),
        Component::V => (x, y - 1),
    };
    let inside =
        |(cx, cy): (i64, i64)| cells.contains(cx, cy).then_some((cx as usize, cy as usize));
    (inside(lower), inside((x, y)))
}

/// Directions across a face's row (for `u`) or column (for `v`) in the order
/// they are searched for fluid, with the matching face offset.
fn tangential_directions(component: Component) -> [(NeighborFlags, i64, i64); 2] {
    match component {
        Component::U => [(NeighborFlags::TOP, 0, 1), (NeighborFlags::BOTTOM, 0, -1)],
        Component::V => [(NeighborFlags::RIGHT, 1, 0), (NeighborFlags::LEFT, -1, 0)],
    }
}

fn normal_face_value(
    field: &Field2,
    mask: &BoundaryMask,
    prescribed: f32,
    component: Component,
    x: usize,
    y: usize,
) -> Option<f32> {
    let (lower, upper) = adjacent_cells(component, mask.grid(), x, y);
    let (lower, upper) = (lower?, upper?);
    let lower_fluid = mask.is_fluid(lower.0, lower.1);
    let upper_fluid = mask.is_fluid(upper.0, upper.1);
    let (boundary, inward) = match (lower_fluid, upper_fluid) {
        (true, false) => (upper, -1),
        (false, true) => (lower, 1),
        _ => return None,
    };
    let rule = mask.cell_type(boundary.0, boundary.1).velocity_rule(component);
    let value = match rule {
        VelocityRule::Zero | VelocityRule::Slip => 0.0,
        VelocityRule::Prescribed => prescribed,
        VelocityRule::ZeroGradient => match component {
            Component::U => field.get((x as i64 + inward) as usize, y),
            Component::V => field.get(x, (y as i64 + inward) as usize),
        },
    };
    Some(value)
}

fn ghost_face_value(
    field: &Field2,
    mask: &BoundaryMask,
    prescribed: f32,
    component: Component,
    x: usize,
    y: usize,
) -> Option<f32> {
    let (lower, upper) = adjacent_cells(component, mask.grid(), x, y);
    let touches_fluid = [lower, upper]
        .into_iter()
        .flatten()
        .any(|(cx, cy)| mask.is_fluid(cx, cy));
    if touches_fluid {
        return None;
    }
    for (flag, dx, dy) in tangential_directions(component) {
        for (cx, cy) in [upper, lower].into_iter().flatten() {
            let cell = mask.cell(cx, cy);
            if !cell.neighbors().contains(flag) {
                continue;
            }
            let mirror = field.get((x as i64 + dx) as usize, (y as i64 + dy) as usize);
            let value = match cell.cell_type().velocity_rule(component) {
                VelocityRule::Zero => -mirror,
                VelocityRule::Prescribed => 2.0 * prescribed - mirror,
                VelocityRule::Slip | VelocityRule::ZeroGradient => mirror,
            };
            return Some(value);
        }
    }
    None
}

/// Boundary values for one velocity component (or its predicted counterpart).
///
/// Faces with exactly one fluid neighbor are set first. Ghost faces inside the
/// boundary layer are then mirrored around the wall using the values of the
/// first pass. Each pass gathers from a snapshot held in `scratch`, which must
/// have the shape of `field`.
pub fn apply_velocity_component(
    field: &mut Field2,
    scratch: &mut Field2,
    mask: &BoundaryMask,
    prescribed: f32,
    component: Component,
) {
    scratch.clone_from(field);
    let snapshot = &*scratch;
    field.update_with_index(|x, y, value| {
        normal_face_value(snapshot, mask, prescribed, component, x, y).unwrap_or(value)
    });
    scratch.clone_from(field);
    let snapshot = &*scratch;
    field.update_with_index(|x, y, value| {
        ghost_face_value(snapshot, mask, prescribed, component, x, y).unwrap_or(value)
    });
}

pub fn apply_velocity(
    velocity: &mut MacVelocity2,
    scratch: &mut MacVelocity2,
    mask: &BoundaryMask,
    prescribed: Vec2,
) {
    for component in [Component::U, Component::V] {
        apply_velocity_component(
            velocity.component_mut(component),
            scratch.component_mut(component),
            mask,
            prescribed.component(component),
            component,
        );
    }
}

/// Outflow cells hold the reference pressure `prescribed`. Every other
/// non-fluid cell with fluid neighbors takes their mean (zero normal gradient
/// at walls), and isolated non-fluid cells take `prescribed`. Fluid cells are
/// left alone.
pub fn apply_pressure(
    pressure: &mut Field2,
    scratch: &mut Field2,
    mask: &BoundaryMask,
    prescribed: f32,
) {
    scratch.clone_from(pressure);
    let snapshot = &*scratch;
    pressure.update_with_index(|x, y, value| {
        let cell = mask.cell(x, y);
        if cell.is_fluid() {
            return value;
        }
        if cell.cell_type() == CellType::Outflow {
            return prescribed;
        }
        let neighbors = cell.neighbors();
        let mut sum = 0.0;
        let mut count = 0;
        for (flag, nx, ny) in [
            (NeighborFlags::LEFT, x.wrapping_sub(1), y),
            (NeighborFlags::RIGHT, x + 1, y),
            (NeighborFlags::BOTTOM, x, y.wrapping_sub(1)),
            (NeighborFlags::TOP, x, y + 1),
        ] {
            if neighbors.contains(flag) {
                sum += snapshot.get(nx, ny);
                count += 1;
            }
        }
        if count == 0 {
            prescribed
        } else {
            sum / count as f32
        }
    });
}
