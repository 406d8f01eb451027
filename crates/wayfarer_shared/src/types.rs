//! Identity values shared across the engine: biomes, path personalities,
//! intersection kinds, LOD tiers, and section grid coordinates.
//!
//! These are plain immutable identity types with no owned resources.

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

/// Terrain archetypes the world can stream through.
///
/// "No biome" is expressed as `Option<Biome>` at API edges rather than a
/// sentinel variant.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Biome {
    /// Dense woodland with winding trails
    Forest = 0,
    /// Open coastline
    Beach = 1,
    /// Arid open flats
    Desert = 2,
    /// Built-up streets and squares
    Urban = 3,
    /// Rolling farmland, the neutral default
    Countryside = 4,
    /// High rocky terrain
    Mountains = 5,
    /// Marsh and river country
    Wetlands = 6,
}

impl Biome {
    /// All biomes in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Forest,
        Self::Beach,
        Self::Desert,
        Self::Urban,
        Self::Countryside,
        Self::Mountains,
        Self::Wetlands,
    ];

    /// The documented fallback biome used when generation degenerates.
    #[must_use]
    pub const fn fallback() -> Self {
        Self::Countryside
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Forest => "Forest",
            Self::Beach => "Beach",
            Self::Desert => "Desert",
            Self::Urban => "Urban",
            Self::Countryside => "Countryside",
            Self::Mountains => "Mountains",
            Self::Wetlands => "Wetlands",
        }
    }
}

/// Qualitative tags describing the feel of a path branch.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Personality {
    /// Natural, untamed paths
    Wild = 0,
    /// Well-maintained, civilized paths
    Safe = 1,
    /// Paths with beautiful views
    Scenic = 2,
    /// Paths with interesting terrain
    Challenge = 3,
    /// Paths leading to unknown discoveries
    Mystery = 4,
    /// Calm, meditative paths
    Peaceful = 5,
}

impl Personality {
    /// All personalities in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Wild,
        Self::Safe,
        Self::Scenic,
        Self::Challenge,
        Self::Mystery,
        Self::Peaceful,
    ];

    /// The engine-wide neutral default.
    #[must_use]
    pub const fn neutral() -> Self {
        Self::Peaceful
    }

    /// Dense index for preference tables.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Wild => "Wild",
            Self::Safe => "Safe",
            Self::Scenic => "Scenic",
            Self::Challenge => "Challenge",
            Self::Mystery => "Mystery",
            Self::Peaceful => "Peaceful",
        }
    }

    /// Whether this personality is drawn toward left-hand branches.
    ///
    /// Left branches skew wild and adventurous, right branches skew safe
    /// and scenic.
    #[must_use]
    pub const fn favors_left(self) -> bool {
        matches!(self, Self::Wild | Self::Challenge | Self::Mystery)
    }
}

/// Decision-point styles with biome-specific flavor.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntersectionKind {
    /// Classic Y-shaped forest split
    YFork = 0,
    /// Suburban T-intersection
    TJunction = 1,
    /// Bridge crossing over a valley or river
    Bridge = 2,
    /// Cave or tunnel branching
    CaveEntrance = 3,
    /// Beach boardwalk split
    Boardwalk = 4,
    /// Mountain rock-formation split
    RockPass = 5,
    /// Wetland river-crossing split
    RiverCrossing = 6,
    /// Urban roundabout
    Roundabout = 7,
}

impl IntersectionKind {
    /// All kinds in declaration order.
    pub const ALL: [Self; 8] = [
        Self::YFork,
        Self::TJunction,
        Self::Bridge,
        Self::CaveEntrance,
        Self::Boardwalk,
        Self::RockPass,
        Self::RiverCrossing,
        Self::Roundabout,
    ];

    /// Normalized (left, right) branch direction vectors for this kind.
    ///
    /// Directions are deterministic per kind; forward is +X, left is -Y.
    #[must_use]
    pub fn directions(self) -> (Vec3, Vec3) {
        let (left, right) = match self {
            Self::YFork => (Vec3::new(0.707, -0.707, 0.0), Vec3::new(0.707, 0.707, 0.0)),
            Self::TJunction => (Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0)),
            Self::Bridge => (Vec3::new(1.0, -0.5, 0.0), Vec3::new(1.0, 0.5, 0.0)),
            Self::CaveEntrance => {
                (Vec3::new(0.5, -0.866, -0.2), Vec3::new(0.5, 0.866, 0.2))
            }
            Self::Boardwalk => (Vec3::new(0.866, -0.5, 0.0), Vec3::new(0.866, 0.5, 0.0)),
            Self::RockPass => (Vec3::new(0.6, -0.8, 0.1), Vec3::new(0.6, 0.8, -0.1)),
            Self::RiverCrossing => (Vec3::new(0.8, -0.6, 0.0), Vec3::new(0.8, 0.6, 0.0)),
            Self::Roundabout => (Vec3::new(0.5, -0.866, 0.0), Vec3::new(0.5, 0.866, 0.0)),
        };
        (left.normalized(), right.normalized())
    }
}

/// Discrete detail tiers selected by distance from the viewer.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LodLevel {
    /// Highest detail
    Lod0 = 0,
    /// Medium detail
    Lod1 = 1,
    /// Low detail
    Lod2 = 2,
    /// Lowest detail
    Lod3 = 3,
    /// Not rendered at all
    Culled = 4,
}

/// Grid coordinate identifying a streaming section.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct SectionCoord {
    /// X coordinate (in sections, not world units).
    pub x: i32,
    /// Y coordinate (in sections, not world units).
    pub y: i32,
    /// Z coordinate (in sections, not world units).
    pub z: i32,
}

impl SectionCoord {
    /// Creates a new section coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Converts a world position to the containing section coordinate.
    #[inline]
    #[must_use]
    pub fn from_world(position: Vec3, section_size: f32) -> Self {
        Self {
            x: (position.x / section_size).floor() as i32,
            y: (position.y / section_size).floor() as i32,
            z: (position.z / section_size).floor() as i32,
        }
    }

    /// Returns the world position of the section's center.
    #[inline]
    #[must_use]
    pub fn world_center(self, section_size: f32) -> Vec3 {
        Vec3::new(
            self.x as f32 * section_size + section_size * 0.5,
            self.y as f32 * section_size + section_size * 0.5,
            self.z as f32 * section_size + section_size * 0.5,
        )
    }
}
