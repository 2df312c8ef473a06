//! Level documents: the sparse tile dictionary, off-grid tiles, tile sizes
//! and the starting camera.

use crate::error::LoadError;
use crate::geom::Vec2;
use crate::tiles::{GridPos, OffgridTile, ResourceTable, SpatialGrid, Tile};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::Arc;

#[derive(Deserialize)]
struct LevelDoc {
    tile_map: BTreeMap<String, Tile>,
    #[serde(default)]
    nogrid_tiles: Vec<DocOffgrid>,
    base_tile_size: f32,
    tile_size: f32,
    #[serde(default)]
    camera_x: f32,
    #[serde(default)]
    camera_y: f32,
}

#[derive(Deserialize)]
struct DocOffgrid {
    pos: [f32; 2],
    resource: String,
    variant: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Level {
    pub tiles: BTreeMap<GridPos, Tile>,
    /// Positions in base-tile pixels.
    pub offgrid: Vec<OffgridTile>,
    pub base_tile_size: f32,
    pub tile_size: f32,
    /// Where the main player starts.
    pub camera: Vec2,
}

/// Parse a tile dictionary key such as `"(3, -2)"`.
pub fn parse_tile_key(key: &str) -> Result<GridPos, LoadError> {
    let bad = || LoadError::BadTileKey(key.to_string());
    let inner = key
        .trim()
        .strip_prefix('(')
        .and_then(|k| k.strip_suffix(')'))
        .ok_or_else(bad)?;
    let (x, y) = inner.split_once(',').ok_or_else(bad)?;
    let x = x.trim().parse().map_err(|_| bad())?;
    let y = y.trim().parse().map_err(|_| bad())?;
    Ok((x, y))
}

impl Level {
    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        let doc: LevelDoc =
            serde_json::from_str(text).map_err(|source| LoadError::Json { path: None, source })?;
        Self::from_doc(doc)
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let doc: LevelDoc = serde_json::from_str(&text).map_err(|source| LoadError::Json {
            path: Some(path.to_path_buf()),
            source,
        })?;
        let level = Self::from_doc(doc)?;
        tracing::info!(
            path = %path.display(),
            tiles = level.tiles.len(),
            offgrid = level.offgrid.len(),
            "loaded level"
        );
        Ok(level)
    }

    fn from_doc(doc: LevelDoc) -> Result<Self, LoadError> {
        if doc.base_tile_size <= 0.0 || doc.tile_size <= 0.0 {
            return Err(LoadError::BadTileSize {
                base: doc.base_tile_size,
                target: doc.tile_size,
            });
        }
        let tiles = doc
            .tile_map
            .into_iter()
            .map(|(key, tile)| Ok((parse_tile_key(&key)?, tile)))
            .collect::<Result<_, LoadError>>()?;
        let offgrid = doc
            .nogrid_tiles
            .into_iter()
            .map(|t| OffgridTile {
                pos: Vec2::new(t.pos[0], t.pos[1]),
                tile: Tile {
                    resource: t.resource,
                    variant: t.variant,
                },
            })
            .collect();
        Ok(Self {
            tiles,
            offgrid,
            base_tile_size: doc.base_tile_size,
            tile_size: doc.tile_size,
            camera: Vec2::new(doc.camera_x, doc.camera_y),
        })
    }

    /// Render scale from base-tile pixels to world pixels.
    pub fn scale(&self) -> f32 {
        self.tile_size / self.base_tile_size
    }

    /// Every tile must name a registered resource and one of its variants.
    pub fn validate(&self, resources: &ResourceTable) -> Result<(), LoadError> {
        let all = self.tiles.values().chain(self.offgrid.iter().map(|t| &t.tile));
        for tile in all {
            let variants = resources
                .variants(&tile.resource)
                .ok_or_else(|| LoadError::UnknownResource(tile.resource.clone()))?;
            if tile.variant >= variants {
                return Err(LoadError::VariantOutOfRange {
                    resource: tile.resource.clone(),
                    variant: tile.variant,
                    variants,
                });
            }
        }
        Ok(())
    }

    pub fn grid(&self, resources: Arc<ResourceTable>) -> SpatialGrid {
        let mut grid = SpatialGrid::new(self.tile_size, resources);
        for (pos, tile) in &self.tiles {
            grid.insert(*pos, tile.clone());
        }
        for tile in &self.offgrid {
            grid.insert_offgrid(tile.clone());
        }
        grid
    }
}

/// Programmatic level construction for tools and tests.
#[derive(Clone, Debug)]
pub struct LevelBuilder {
    level: Level,
}

impl LevelBuilder {
    pub fn new(tile_size: f32) -> Self {
        Self {
            level: Level {
                tiles: BTreeMap::new(),
                offgrid: Vec::new(),
                base_tile_size: tile_size,
                tile_size,
                camera: Vec2::ZERO,
            },
        }
    }

    pub fn base_tile_size(mut self, base: f32) -> Self {
        self.level.base_tile_size = base;
        self
    }

    pub fn camera(mut self, x: f32, y: f32) -> Self {
        self.level.camera = Vec2::new(x, y);
        self
    }

    pub fn tile(mut self, x: i32, y: i32, resource: &str, variant: usize) -> Self {
        self.level.tiles.insert((x, y), Tile::new(resource, variant));
        self
    }

    pub fn row(mut self, y: i32, xs: RangeInclusive<i32>, resource: &str, variant: usize) -> Self {
        for x in xs {
            self.level.tiles.insert((x, y), Tile::new(resource, variant));
        }
        self
    }

    pub fn column(mut self, x: i32, ys: RangeInclusive<i32>, resource: &str, variant: usize) -> Self {
        for y in ys {
            self.level.tiles.insert((x, y), Tile::new(resource, variant));
        }
        self
    }

    /// `x`, `y` in base-tile pixels.
    pub fn offgrid(mut self, x: f32, y: f32, resource: &str, variant: usize) -> Self {
        self.level.offgrid.push(OffgridTile {
            pos: Vec2::new(x, y),
            tile: Tile::new(resource, variant),
        });
        self
    }

    pub fn build(self) -> Level {
        self.level
    }
}
