//! Static tile world: the resource property table and the sparse tile grid.

use crate::error::LoadError;
use crate::geom::{Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

pub type GridPos = (i32, i32);

pub const SOLID: &str = "solid";

/// Which variants of a resource a property applies to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FlagScope {
    All,
    Variants(Vec<usize>),
}

#[derive(Clone, Debug, Default)]
struct ResourceProps {
    variants: usize,
    flags: HashMap<String, Vec<bool>>,
}

/// Per-resource boolean properties such as `solid`, indexed by variant.
#[derive(Clone, Debug, Default)]
pub struct ResourceTable {
    resources: HashMap<String, ResourceProps>,
}

impl ResourceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a resource folder with `variants` images. Re-registering keeps
    /// existing flags and resizes them.
    pub fn register(&mut self, name: &str, variants: usize) {
        let props = self.resources.entry(name.to_string()).or_default();
        props.variants = variants;
        for values in props.flags.values_mut() {
            values.resize(variants, false);
        }
    }

    pub fn set_flag(&mut self, name: &str, flag: &str, scope: FlagScope) -> Result<(), LoadError> {
        let props = self
            .resources
            .get_mut(name)
            .ok_or_else(|| LoadError::UnknownResource(name.to_string()))?;
        let values = match scope {
            FlagScope::All => vec![true; props.variants],
            FlagScope::Variants(idxs) => {
                let mut values = vec![false; props.variants];
                for i in idxs {
                    let slot = values.get_mut(i).ok_or_else(|| LoadError::VariantOutOfRange {
                        resource: name.to_string(),
                        variant: i,
                        variants: props.variants,
                    })?;
                    *slot = true;
                }
                values
            }
        };
        props.flags.insert(flag.to_string(), values);
        Ok(())
    }

    /// Register `name` and apply an `info.txt` style property list: one
    /// property per line, either `flag` (all variants) or `flag: 0 2 5`.
    pub fn register_with_info(&mut self, name: &str, variants: usize, info: &str) -> Result<(), LoadError> {
        self.register(name, variants);
        for line in info.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let bad = || LoadError::BadResourceInfo {
                resource: name.to_string(),
                line: line.to_string(),
            };
            match line.split_once(':') {
                None => self.set_flag(name, line, FlagScope::All)?,
                Some((flag, list)) => {
                    let idxs = list
                        .split_whitespace()
                        .map(|s| s.parse::<usize>().map_err(|_| bad()))
                        .collect::<Result<Vec<_>, _>>()?;
                    self.set_flag(name, flag.trim(), FlagScope::Variants(idxs))?;
                }
            }
        }
        Ok(())
    }

    /// Load every sub-directory of `dir` as a resource. The variant count is
    /// the number of files other than `info.txt`.
    pub fn from_dir(dir: &Path) -> Result<Self, LoadError> {
        let io = |path: &Path| {
            let path = path.to_path_buf();
            move |source| LoadError::Io { path, source }
        };
        let mut table = Self::new();
        let mut folders = std::fs::read_dir(dir)
            .map_err(io(dir))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(io(dir))?;
        folders.sort_by_key(|e| e.file_name());

        for folder in folders {
            let path = folder.path();
            if !path.is_dir() {
                continue;
            }
            let name = folder.file_name().to_string_lossy().into_owned();
            let variants = std::fs::read_dir(&path)
                .map_err(io(&path))?
                .filter_map(Result::ok)
                .filter(|e| e.file_name() != "info.txt")
                .count();
            let info_path = path.join("info.txt");
            let info = if info_path.exists() {
                std::fs::read_to_string(&info_path).map_err(io(&info_path))?
            } else {
                String::new()
            };
            table.register_with_info(&name, variants, &info)?;
        }
        tracing::debug!(resources = table.resources.len(), "loaded resource table");
        Ok(table)
    }

    pub fn variants(&self, name: &str) -> Option<usize> {
        self.resources.get(name).map(|p| p.variants)
    }

    pub fn flag(&self, name: &str, variant: usize, flag: &str) -> bool {
        self.resources
            .get(name)
            .and_then(|p| p.flags.get(flag))
            .and_then(|values| values.get(variant))
            .copied()
            .unwrap_or(false)
    }

    pub fn is_solid(&self, name: &str, variant: usize) -> bool {
        self.flag(name, variant, SOLID)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub resource: String,
    pub variant: usize,
}

impl Tile {
    pub fn new(resource: &str, variant: usize) -> Self {
        Self {
            resource: resource.to_string(),
            variant,
        }
    }
}

/// A decorative or pickup tile placed at a pixel position (in base-tile
/// pixels, before render scaling).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OffgridTile {
    pub pos: Vec2,
    #[serde(flatten)]
    pub tile: Tile,
}

#[derive(Clone, Debug)]
struct Cell {
    tile: Tile,
    solid: bool,
}

/// Sparse tile dictionary with static-solid queries.
///
/// Terrain is immutable during play; only spawn and pickup tiles are removed,
/// through [`SpatialGrid::extract_tiles`] and [`SpatialGrid::remove`], both of
/// which tolerate already-removed coordinates.
#[derive(Clone, Debug)]
pub struct SpatialGrid {
    tile_size: f32,
    cells: BTreeMap<GridPos, Cell>,
    offgrid: Vec<OffgridTile>,
    resources: Arc<ResourceTable>,
}

impl SpatialGrid {
    pub fn new(tile_size: f32, resources: Arc<ResourceTable>) -> Self {
        Self {
            tile_size,
            cells: BTreeMap::new(),
            offgrid: Vec::new(),
            resources,
        }
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    pub fn insert(&mut self, pos: GridPos, tile: Tile) {
        let solid = self.resources.is_solid(&tile.resource, tile.variant);
        self.cells.insert(pos, Cell { tile, solid });
    }

    pub fn insert_offgrid(&mut self, tile: OffgridTile) {
        self.offgrid.push(tile);
    }

    /// Removes the tile at `pos`; a second call for the same coordinate is a no-op.
    pub fn remove(&mut self, pos: GridPos) -> Option<Tile> {
        self.cells.remove(&pos).map(|c| c.tile)
    }

    pub fn tile(&self, pos: GridPos) -> Option<&Tile> {
        self.cells.get(&pos).map(|c| &c.tile)
    }

    pub fn has_tile(&self, pos: GridPos) -> bool {
        self.cells.contains_key(&pos)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn offgrid(&self) -> &[OffgridTile] {
        &self.offgrid
    }

    pub fn to_grid(&self, x: f32, y: f32) -> GridPos {
        (
            (x / self.tile_size).floor() as i32,
            (y / self.tile_size).floor() as i32,
        )
    }

    pub fn tile_origin(&self, pos: GridPos) -> Vec2 {
        Vec2::new(pos.0 as f32 * self.tile_size, pos.1 as f32 * self.tile_size)
    }

    pub fn tile_rect(&self, pos: GridPos) -> Rect {
        let origin = self.tile_origin(pos);
        Rect::new(origin.x, origin.y, self.tile_size, self.tile_size)
    }

    pub fn is_solid_tile(&self, pos: GridPos) -> bool {
        self.cells.get(&pos).is_some_and(|c| c.solid)
    }

    /// Whether the pixel coordinate lies in a solid tile. Coordinates outside
    /// the loaded tiles are never solid.
    pub fn is_solid(&self, x: f32, y: f32) -> bool {
        self.is_solid_tile(self.to_grid(x, y))
    }

    /// Every solid tile rectangle that truly intersects `rect`, scanned
    /// over the tile range covering the rect with x outer and y inner.
    pub fn solid_intersections(&self, rect: &Rect) -> Vec<Rect> {
        let (i_start, j_start) = self.to_grid(rect.left(), rect.top());
        let (i_end, j_end) = self.to_grid(rect.right(), rect.bottom());
        let mut hits = Vec::new();
        for i in i_start..=i_end {
            for j in j_start..=j_end {
                if !self.is_solid_tile((i, j)) {
                    continue;
                }
                let tile_rect = self.tile_rect((i, j));
                if tile_rect.intersects(rect) {
                    hits.push(tile_rect);
                }
            }
        }
        hits
    }

    /// Find every grid tile of `resource`/`variant`, in coordinate order.
    /// Unless `keep` is set the tiles are removed from the grid.
    pub fn extract_tiles(&mut self, resource: &str, variant: usize, keep: bool) -> Vec<(GridPos, Tile)> {
        let found: Vec<(GridPos, Tile)> = self
            .cells
            .iter()
            .filter(|(_, c)| c.tile.resource == resource && c.tile.variant == variant)
            .map(|(pos, c)| (*pos, c.tile.clone()))
            .collect();
        if !keep {
            for (pos, _) in &found {
                self.cells.remove(pos);
            }
        }
        found
    }

    /// Same as [`SpatialGrid::extract_tiles`] for off-grid tiles, in file order.
    pub fn extract_offgrid(&mut self, resource: &str, variant: usize, keep: bool) -> Vec<OffgridTile> {
        let matches = |t: &OffgridTile| t.tile.resource == resource && t.tile.variant == variant;
        let found: Vec<OffgridTile> = self.offgrid.iter().filter(|t| matches(t)).cloned().collect();
        if !keep {
            self.offgrid.retain(|t| !matches(t));
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Arc<ResourceTable> {
        let mut t = ResourceTable::new();
        t.register_with_info("grass", 4, "solid\n").unwrap();
        t.register_with_info("decor", 3, "solid: 1\n").unwrap();
        t.register("coins", 2);
        Arc::new(t)
    }

    fn grid() -> SpatialGrid {
        let mut g = SpatialGrid::new(32.0, table());
        for x in 0..5 {
            g.insert((x, 3), Tile::new("grass", 0));
        }
        g.insert((2, 2), Tile::new("decor", 0));
        g.insert((3, 2), Tile::new("decor", 1));
        g.insert((7, 1), Tile::new("coins", 0));
        g
    }

    #[test]
    fn info_lines_apply_to_all_or_listed_variants() {
        let t = table();
        assert!(t.is_solid("grass", 3));
        assert!(!t.is_solid("decor", 0));
        assert!(t.is_solid("decor", 1));
        assert!(!t.is_solid("coins", 0));
        assert!(!t.is_solid("missing", 0));
    }

    #[test]
    fn bad_info_line_is_rejected() {
        let mut t = ResourceTable::new();
        let err = t.register_with_info("x", 2, "solid: one").unwrap_err();
        assert!(matches!(err, LoadError::BadResourceInfo { .. }));
        let err = t.register_with_info("y", 2, "solid: 5").unwrap_err();
        assert!(matches!(err, LoadError::VariantOutOfRange { variant: 5, .. }));
    }

    #[test]
    fn solidity_by_pixel() {
        let g = grid();
        assert!(g.is_solid(0.0, 96.0));
        assert!(g.is_solid(159.9, 127.9));
        assert!(!g.is_solid(160.0, 96.0));
        assert!(!g.is_solid(70.0, 70.0)); // decor variant 0
        assert!(g.is_solid(100.0, 70.0)); // decor variant 1
        assert!(!g.is_solid(-5000.0, 123456.0));
    }

    #[test]
    fn grid_coordinates_floor_negative_pixels() {
        let g = grid();
        assert_eq!(g.to_grid(31.9, 0.0), (0, 0));
        assert_eq!(g.to_grid(32.0, 64.0), (1, 2));
        assert_eq!(g.to_grid(-0.5, -32.5), (-1, -2));
    }

    #[test]
    fn intersections_are_post_filtered_and_ordered() {
        let g = grid();
        // Resting exactly on the floor touches but does not intersect.
        let resting = Rect::new(10.0, 66.0, 20.0, 30.0);
        assert!(g.solid_intersections(&resting).is_empty());

        let sunk = Rect::new(20.0, 70.0, 40.0, 30.0);
        let hits = g.solid_intersections(&sunk);
        assert_eq!(
            hits,
            vec![
                Rect::new(0.0, 96.0, 32.0, 32.0),
                Rect::new(32.0, 96.0, 32.0, 32.0),
            ]
        );
    }

    #[test]
    fn extraction_removes_once() {
        let mut g = grid();
        let found = g.extract_tiles("coins", 0, true);
        assert_eq!(found.len(), 1);
        assert!(g.has_tile((7, 1)));

        let found = g.extract_tiles("coins", 0, false);
        assert_eq!(found, vec![((7, 1), Tile::new("coins", 0))]);
        assert!(!g.has_tile((7, 1)));
        assert!(g.extract_tiles("coins", 0, false).is_empty());
        assert_eq!(g.remove((7, 1)), None);
    }

    #[test]
    fn offgrid_extraction() {
        let mut g = grid();
        g.insert_offgrid(OffgridTile {
            pos: Vec2::new(5.0, 6.0),
            tile: Tile::new("coins", 1),
        });
        g.insert_offgrid(OffgridTile {
            pos: Vec2::new(1.0, 1.0),
            tile: Tile::new("decor", 0),
        });
        let found = g.extract_offgrid("coins", 1, false);
        assert_eq!(found.len(), 1);
        assert_eq!(g.offgrid().len(), 1);
    }
}
