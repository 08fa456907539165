use crate::error::{SimError, SimResult};
use crate::vec2::Component;
use crate::Grid2;
use bitflags::bitflags;

const CELL_MASK_SELF: u8 = 0b0000_1111;

const BIT_VERTICAL: u8 = 0b1000;
const BIT_HORIZONTAL: u8 = 0b0100;
const BIT_SLIP: u8 = 0b0010;
const BIT_PRESCRIBED: u8 = 0b0001;

/// Cell type, stored in the low nibble of a mask byte.
///
/// Bit 3 and bit 2 name the vertical and horizontal velocity component the
/// type constrains, bit 0 means those components take the prescribed boundary
/// velocity and bit 1 means they are not held (free slip, or zero gradient
/// when both components are named).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CellType {
    Fluid = 0b0000,
    NoSlip = 0b1100,
    Inflow = 0b1101,
    InflowHoriz = 0b0101,
    InflowVert = 0b1001,
    SlipHoriz = 0b0110,
    SlipVert = 0b1010,
    Outflow = 0b1110,
}

impl CellType {
    pub const ALL: [CellType; 8] = [
        CellType::Fluid,
        CellType::NoSlip,
        CellType::Inflow,
        CellType::InflowHoriz,
        CellType::InflowVert,
        CellType::SlipHoriz,
        CellType::SlipVert,
        CellType::Outflow,
    ];

    pub fn bits(self) -> u8 {
        self as u8
    }

    pub fn from_bits(bits: u8) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|ty| ty.bits() == bits & CELL_MASK_SELF)
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            ' ' => Some(CellType::Fluid),
            '#' => Some(CellType::NoSlip),
            'I' => Some(CellType::Inflow),
            'H' => Some(CellType::InflowHoriz),
            'V' => Some(CellType::InflowVert),
            'O' => Some(CellType::Outflow),
            '-' => Some(CellType::SlipHoriz),
            '|' => Some(CellType::SlipVert),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            CellType::Fluid => ' ',
            CellType::NoSlip => '#',
            CellType::Inflow => 'I',
            CellType::InflowHoriz => 'H',
            CellType::InflowVert => 'V',
            CellType::Outflow => 'O',
            CellType::SlipHoriz => '-',
            CellType::SlipVert => '|',
        }
    }

    pub fn is_fluid(self) -> bool {
        self == CellType::Fluid
    }

    /// How this boundary type constrains one velocity component.
    pub fn velocity_rule(self, component: Component) -> VelocityRule {
        let bits = self.bits();
        let named = match component {
            Component::U => bits & BIT_HORIZONTAL != 0,
            Component::V => bits & BIT_VERTICAL != 0,
        };
        if !named {
            return VelocityRule::Zero;
        }
        let both = bits & (BIT_HORIZONTAL | BIT_VERTICAL) == BIT_HORIZONTAL | BIT_VERTICAL;
        match (bits & BIT_SLIP != 0, bits & BIT_PRESCRIBED != 0) {
            (true, _) if both => VelocityRule::ZeroGradient,
            (true, _) => VelocityRule::Slip,
            (false, true) => VelocityRule::Prescribed,
            (false, false) => VelocityRule::Zero,
        }
    }
}

/// Boundary value rule for one velocity component at a non-fluid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VelocityRule {
    /// Wall at rest: normal face 0, tangential ghost mirrored with sign flip.
    Zero,
    /// Moving wall or inflow: normal face takes the value, tangential ghost
    /// mirrored around it.
    Prescribed,
    /// Free slip: normal face 0, tangential ghost mirrored with same sign.
    Slip,
    /// Outflow: copy of the adjacent interior value.
    ZeroGradient,
}

bitflags! {
    /// Fluid-neighbor flags, stored in the high nibble of a mask byte.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    #[repr(transparent)]
    pub struct NeighborFlags: u8 {
        const LEFT = 0b1000_0000;
        const RIGHT = 0b0100_0000;
        const BOTTOM = 0b0010_0000;
        const TOP = 0b0001_0000;
    }
}

/// One mask byte: type code in the low nibble, [`NeighborFlags`] in the high.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Cell(u8);

impl Cell {
    pub fn new(ty: CellType, neighbors: NeighborFlags) -> Self {
        Self(ty.bits() | neighbors.bits())
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn cell_type(self) -> CellType {
        // Only constructed from a valid type code.
        CellType::from_bits(self.0).unwrap_or(CellType::NoSlip)
    }

    pub fn neighbors(self) -> NeighborFlags {
        NeighborFlags::from_bits_truncate(self.0)
    }

    pub fn is_fluid(self) -> bool {
        self.0 & CELL_MASK_SELF == CellType::Fluid.bits()
    }
}

/// Per-cell type codes plus fluid-neighbor flags. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundaryMask {
    grid: Grid2,
    cells: Vec<Cell>,
    num_fluid: usize,
}

impl BoundaryMask {
    pub fn build(grid: Grid2, types: &[CellType]) -> Self {
        assert_eq!(types.len(), grid.size(), "cell type grid mismatch");
        let is_fluid = |x: i64, y: i64| {
            grid.contains(x, y) && types[grid.idx(x as usize, y as usize)].is_fluid()
        };
        let cells = types
            .iter()
            .enumerate()
            .map(|(i, ty)| {
                let (x, y) = grid.coord(i);
                let (x, y) = (x as i64, y as i64);
                let mut neighbors = NeighborFlags::empty();
                neighbors.set(NeighborFlags::LEFT, is_fluid(x - 1, y));
                neighbors.set(NeighborFlags::RIGHT, is_fluid(x + 1, y));
                neighbors.set(NeighborFlags::BOTTOM, is_fluid(x, y - 1));
                neighbors.set(NeighborFlags::TOP, is_fluid(x, y + 1));
                Cell::new(*ty, neighbors)
            })
            .collect();
        let num_fluid = types.iter().filter(|ty| ty.is_fluid()).count();
        Self {
            grid,
            cells,
            num_fluid,
        }
    }

    pub fn from_types(grid: Grid2, f: impl Fn(usize, usize) -> CellType) -> Self {
        let types: Vec<CellType> = (0..grid.size())
            .map(|i| {
                let (x, y) = grid.coord(i);
                f(x, y)
            })
            .collect();
        Self::build(grid, &types)
    }

    /// Canonical lid-driven cavity: no-slip sides and bottom, a top row that
    /// drives the horizontal velocity, fluid everywhere else.
    pub fn lid_driven_cavity(grid: Grid2) -> Self {
        let (w, h) = (grid.width(), grid.height());
        Self::from_types(grid, |x, y| {
            if y + 1 == h {
                CellType::InflowHoriz
            } else if x == 0 || x + 1 == w || y == 0 {
                CellType::NoSlip
            } else {
                CellType::Fluid
            }
        })
    }

    /// Parses a free-form layout. Row 0 of the text is the top of the domain.
    pub fn from_rows<S: AsRef<str>>(grid: Grid2, rows: &[S]) -> SimResult<Self> {
        let (w, h) = (grid.width(), grid.height());
        let offending = rows
            .iter()
            .map(|row| row.as_ref().chars().count())
            .find(|len| *len != w);
        if rows.len() != h || offending.is_some() {
            return Err(SimError::GeometryMismatch {
                expected: (w, h),
                found: (offending.unwrap_or(w), rows.len()),
            });
        }
        let mut types = vec![CellType::Fluid; grid.size()];
        for (row, text) in rows.iter().enumerate() {
            let y = h - 1 - row;
            for (x, symbol) in text.as_ref().chars().enumerate() {
                let ty = CellType::from_symbol(symbol).ok_or(SimError::InvalidSymbol {
                    symbol,
                    row,
                    column: x,
                })?;
                types[grid.idx(x, y)] = ty;
            }
        }
        Ok(Self::build(grid, &types))
    }

    /// Inverse of [`BoundaryMask::from_rows`].
    pub fn to_rows(&self) -> Vec<String> {
        let (w, h) = (self.grid.width(), self.grid.height());
        (0..h)
            .rev()
            .map(|y| (0..w).map(|x| self.cell_type(x, y).symbol()).collect())
            .collect()
    }

    pub fn grid(&self) -> Grid2 {
        self.grid
    }

    pub fn cell(&self, x: usize, y: usize) -> Cell {
        self.cells[self.grid.idx(x, y)]
    }

    pub fn cell_type(&self, x: usize, y: usize) -> CellType {
        self.cell(x, y).cell_type()
    }

    pub fn is_fluid(&self, x: usize, y: usize) -> bool {
        self.cell(x, y).is_fluid()
    }

    /// Fluid and not on the domain edge; only these cells enter the stencils.
    pub fn is_interior_fluid(&self, x: usize, y: usize) -> bool {
        !self.grid.is_edge(x, y) && self.is_fluid(x, y)
    }

    /// Staggered face `(x, y)` of `component` whose two adjacent cells are
    /// both interior fluid.
    pub fn is_interior_face(&self, component: Component, x: usize, y: usize) -> bool {
        let (lx, ly) = match component {
            Component::U if x >= 1 => (x - 1, y),
            Component::V if y >= 1 => (x, y - 1),
            _ => return false,
        };
        x < self.grid.width()
            && y < self.grid.height()
            && self.is_interior_fluid(lx, ly)
            && self.is_interior_fluid(x, y)
    }

    pub fn num_fluid_cells(&self) -> usize {
        self.num_fluid
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.cells.iter().map(|cell| cell.bits()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows() -> Vec<&'static str> {
        vec!["HHHHHH", "#    O", "# ## O", "I  | #", "#-  V#", "######"]
    }

    #[test]
    fn type_codes_round_trip() {
        for ty in CellType::ALL {
            assert_eq!(CellType::from_bits(ty.bits()), Some(ty));
            assert_eq!(CellType::from_symbol(ty.symbol()), Some(ty));
            assert_eq!(ty.bits() & !CELL_MASK_SELF, 0);
        }
        assert_eq!(CellType::from_bits(0b0011), None);
    }

    #[test]
    fn velocity_rules_follow_code_bits() {
        use Component::{U, V};
        assert_eq!(CellType::NoSlip.velocity_rule(U), VelocityRule::Zero);
        assert_eq!(CellType::NoSlip.velocity_rule(V), VelocityRule::Zero);
        assert_eq!(CellType::Inflow.velocity_rule(U), VelocityRule::Prescribed);
        assert_eq!(CellType::Inflow.velocity_rule(V), VelocityRule::Prescribed);
        assert_eq!(CellType::InflowHoriz.velocity_rule(U), VelocityRule::Prescribed);
        assert_eq!(CellType::InflowHoriz.velocity_rule(V), VelocityRule::Zero);
        assert_eq!(CellType::InflowVert.velocity_rule(U), VelocityRule::Zero);
        assert_eq!(CellType::InflowVert.velocity_rule(V), VelocityRule::Prescribed);
        assert_eq!(CellType::SlipHoriz.velocity_rule(U), VelocityRule::Slip);
        assert_eq!(CellType::SlipHoriz.velocity_rule(V), VelocityRule::Zero);
        assert_eq!(CellType::SlipVert.velocity_rule(U), VelocityRule::Zero);
        assert_eq!(CellType::SlipVert.velocity_rule(V), VelocityRule::Slip);
        assert_eq!(CellType::Outflow.velocity_rule(U), VelocityRule::ZeroGradient);
        assert_eq!(CellType::Outflow.velocity_rule(V), VelocityRule::ZeroGradient);
    }

    #[test]
    fn neighbor_flags_use_fixed_bits() {
        let grid = Grid2::new(3, 3);
        let mask = BoundaryMask::lid_driven_cavity(grid);
        let center = mask.cell(1, 1);
        assert!(center.is_fluid());
        assert!(center.neighbors().is_empty());
        assert_eq!(mask.cell(0, 1).bits(), 0b0100_1100);
        assert_eq!(mask.cell(2, 1).bits(), 0b1000_1100);
        assert_eq!(mask.cell(1, 0).bits(), 0b0001_1100);
        assert_eq!(mask.cell(1, 2).bits(), 0b0010_0101);
        assert_eq!(mask.cell(0, 0).neighbors(), NeighborFlags::empty());
    }

    #[test]
    fn edge_cells_never_flag_outside_neighbors() {
        let grid = Grid2::new(4, 3);
        let mask = BoundaryMask::from_types(grid, |_, _| CellType::Fluid);
        let corner = mask.cell(0, 0).neighbors();
        assert_eq!(corner, NeighborFlags::RIGHT | NeighborFlags::TOP);
        let top_right = mask.cell(3, 2).neighbors();
        assert_eq!(top_right, NeighborFlags::LEFT | NeighborFlags::BOTTOM);
        assert!(!mask.is_interior_fluid(0, 1));
        assert!(mask.is_interior_fluid(1, 1));
    }

    #[test]
    fn interior_faces_need_two_interior_cells() {
        let mask = BoundaryMask::lid_driven_cavity(Grid2::new(5, 5));
        assert!(!mask.is_interior_face(Component::U, 1, 2));
        assert!(mask.is_interior_face(Component::U, 2, 2));
        assert!(mask.is_interior_face(Component::U, 3, 2));
        assert!(!mask.is_interior_face(Component::U, 4, 2));
        assert!(!mask.is_interior_face(Component::V, 2, 1));
        assert!(mask.is_interior_face(Component::V, 2, 2));
        assert!(!mask.is_interior_face(Component::V, 2, 4));
    }

    #[test]
    fn build_is_idempotent() {
        let grid = Grid2::new(6, 6);
        let first = BoundaryMask::from_rows(grid, &sample_rows()).unwrap();
        let types: Vec<CellType> = (0..grid.size())
            .map(|i| {
                let (x, y) = grid.coord(i);
                first.cell_type(x, y)
            })
            .collect();
        let second = BoundaryMask::build(grid, &types);
        let third = BoundaryMask::build(grid, &types);
        assert_eq!(first.bytes(), second.bytes());
        assert_eq!(second.bytes(), third.bytes());
    }

    #[test]
    fn num_fluid_cells_counts_fluid_types() {
        let grid = Grid2::new(6, 6);
        let mask = BoundaryMask::from_rows(grid, &sample_rows()).unwrap();
        let expected = sample_rows()
            .iter()
            .flat_map(|row| row.chars())
            .filter(|c| *c == ' ')
            .count();
        for _ in 0..3 {
            assert_eq!(mask.num_fluid_cells(), expected);
        }
        let cavity = BoundaryMask::lid_driven_cavity(Grid2::new(6, 5));
        assert_eq!(cavity.num_fluid_cells(), 4 * 3);
    }

    #[test]
    fn free_form_rows_are_flipped() {
        let grid = Grid2::new(6, 6);
        let mask = BoundaryMask::from_rows(grid, &sample_rows()).unwrap();
        assert_eq!(mask.cell_type(0, 5), CellType::InflowHoriz);
        assert_eq!(mask.cell_type(0, 0), CellType::NoSlip);
        assert_eq!(mask.cell_type(5, 4), CellType::Outflow);
        assert_eq!(mask.cell_type(0, 2), CellType::Inflow);
        assert_eq!(mask.cell_type(3, 2), CellType::SlipVert);
        assert_eq!(mask.cell_type(1, 1), CellType::SlipHoriz);
        assert_eq!(mask.cell_type(4, 1), CellType::InflowVert);
    }

    #[test]
    fn free_form_round_trip() {
        let grid = Grid2::new(6, 6);
        let mask = BoundaryMask::from_rows(grid, &sample_rows()).unwrap();
        let rows = mask.to_rows();
        assert_eq!(rows, sample_rows());
        let reloaded = BoundaryMask::from_rows(grid, &rows).unwrap();
        assert_eq!(reloaded, mask);
        let cavity = BoundaryMask::lid_driven_cavity(Grid2::new(7, 4));
        let reloaded = BoundaryMask::from_rows(cavity.grid(), &cavity.to_rows()).unwrap();
        assert_eq!(reloaded.bytes(), cavity.bytes());
    }

    #[test]
    fn size_mismatch_is_reported() {
        let grid = Grid2::new(6, 6);
        let mut rows = sample_rows();
        rows.pop();
        assert!(matches!(
            BoundaryMask::from_rows(grid, &rows),
            Err(SimError::GeometryMismatch { found: (6, 5), .. })
        ));
        let mut rows = sample_rows();
        rows.push("######");
        assert!(matches!(
            BoundaryMask::from_rows(grid, &rows),
            Err(SimError::GeometryMismatch { .. })
        ));
        let mut rows = sample_rows();
        rows[2] = "# ## O ";
        assert!(matches!(
            BoundaryMask::from_rows(grid, &rows),
            Err(SimError::GeometryMismatch { found: (7, 6), .. })
        ));
        let mut rows = sample_rows();
        rows[3] = "I  | ";
        assert!(matches!(
            BoundaryMask::from_rows(grid, &rows),
            Err(SimError::GeometryMismatch { .. })
        ));
    }

    #[test]
    fn invalid_symbol_is_reported() {
        let grid = Grid2::new(6, 6);
        let mut rows = sample_rows();
        rows[4] = "#-  x#";
        assert!(matches!(
            BoundaryMask::from_rows(grid, &rows),
            Err(SimError::InvalidSymbol {
                symbol: 'x',
                row: 4,
                column: 4
            })
        ));
    }
}
