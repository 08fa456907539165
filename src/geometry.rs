use crate::error::{SimError, SimResult};
use crate::input::{read_to_string, split_entry};
use crate::mask::BoundaryMask;
use crate::vec2::Vec2;
use crate::MacGrid2;
use std::fmt::Write as _;
use std::path::Path;

const DEFAULT_SIZE: (usize, usize) = (128, 128);
const DEFAULT_LENGTH: Vec2 = Vec2::new(1.0, 1.0);
const DEFAULT_VELOCITY: Vec2 = Vec2::new(1.0, 0.0);

/// Domain description: grid, boundary mask and the values prescribed at
/// inflow cells and isolated boundary cells.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    grid: MacGrid2,
    velocity: Vec2,
    pressure: f32,
    mask: BoundaryMask,
}

impl Geometry {
    pub fn new(grid: MacGrid2, velocity: Vec2, pressure: f32, mask: BoundaryMask) -> Self {
        assert_eq!(mask.grid(), grid.cell_grid(), "mask grid mismatch");
        Self {
            grid,
            velocity,
            pressure,
            mask,
        }
    }

    /// Square cavity whose top row moves with `lid_speed`.
    pub fn lid_driven_cavity(nx: usize, ny: usize, length: Vec2, lid_speed: f32) -> SimResult<Self> {
        let grid = MacGrid2::new(nx, ny, length)?;
        let mask = BoundaryMask::lid_driven_cavity(grid.cell_grid());
        Ok(Self::new(grid, Vec2::new(lid_speed, 0.0), 0.0, mask))
    }

    /// Parses a geometry description.
    ///
    /// Recognized keys are `size`, `length`, `velocity`, `pressure` and
    /// `geometry`. `geometry = free` is followed by exactly `size.y` rows of
    /// cell symbols, top row first; without it the domain is a lid-driven
    /// cavity of the declared size.
    pub fn parse(text: &str) -> SimResult<Self> {
        let (mut nx, mut ny) = DEFAULT_SIZE;
        let mut length = DEFAULT_LENGTH;
        let mut velocity = DEFAULT_VELOCITY;
        let mut pressure = 0.0;
        let mut rows: Option<Vec<String>> = None;
        let mut extra_rows = 0;

        let mut lines = text.lines().enumerate();
        while let Some((index, raw)) = lines.next() {
            let line = index + 1;
            if raw.trim().is_empty() {
                continue;
            }
            let Some(entry) = split_entry(line, raw) else {
                if rows.is_some() {
                    extra_rows += 1;
                } else {
                    tracing::warn!("ignoring geometry line {} without `=`: {:?}", line, raw);
                }
                continue;
            };
            match entry.key {
                "size" => {
                    if rows.is_some() {
                        return Err(SimError::config(
                            line,
                            "`size` must precede the free-form block",
                        ));
                    }
                    [nx, ny] = entry.values()?;
                }
                "length" => {
                    let [x, y] = entry.values()?;
                    length = Vec2::new(x, y);
                }
                "velocity" => {
                    let [x, y] = entry.values()?;
                    velocity = Vec2::new(x, y);
                }
                "pressure" => pressure = entry.value()?,
                "geometry" => match entry.value {
                    "free" => {
                        let block: Vec<String> = lines
                            .by_ref()
                            .take(ny)
                            .map(|(_, row)| row.trim_end_matches('\r').to_owned())
                            .collect();
                        rows = Some(block);
                    }
                    "cavity" => rows = None,
                    other => {
                        return Err(SimError::config(
                            line,
                            format!("unknown geometry kind {other:?}"),
                        ))
                    }
                },
                key => tracing::warn!("unknown geometry key `{}` at line {}", key, line),
            }
        }

        let grid = MacGrid2::new(nx, ny, length)?;
        let mask = match rows {
            Some(_) if extra_rows > 0 => {
                return Err(SimError::GeometryMismatch {
                    expected: (nx, ny),
                    found: (nx, ny + extra_rows),
                })
            }
            Some(rows) => BoundaryMask::from_rows(grid.cell_grid(), &rows)?,
            None => BoundaryMask::lid_driven_cavity(grid.cell_grid()),
        };
        Ok(Self::new(grid, velocity, pressure, mask))
    }

    pub fn load(path: &Path) -> SimResult<Self> {
        let geometry = Self::parse(&read_to_string(path)?)?;
        tracing::info!(
            "loaded geometry from {}: {}x{} cells, {} fluid",
            path.display(),
            geometry.grid.width(),
            geometry.grid.height(),
            geometry.mask.num_fluid_cells()
        );
        Ok(geometry)
    }

    /// Serializes back to the text format, always with a free-form block.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        let length = self.grid.length();
        // Writing into a String cannot fail.
        let _ = writeln!(text, "size = {} {}", self.grid.width(), self.grid.height());
        let _ = writeln!(text, "length = {} {}", length.x, length.y);
        let _ = writeln!(text, "velocity = {} {}", self.velocity.x, self.velocity.y);
        let _ = writeln!(text, "pressure = {}", self.pressure);
        let _ = writeln!(text, "geometry = free");
        for row in self.mask.to_rows() {
            text.push_str(&row);
            text.push('\n');
        }
        text
    }

    pub fn grid(&self) -> MacGrid2 {
        self.grid
    }

    pub fn mesh(&self) -> Vec2 {
        self.grid.mesh()
    }

    pub fn mask(&self) -> &BoundaryMask {
        &self.mask
    }

    /// Velocity prescribed at inflow and moving-wall cells.
    pub fn boundary_velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Pressure taken by boundary cells without fluid neighbors.
    pub fn boundary_pressure(&self) -> f32 {
        self.pressure
    }
}
