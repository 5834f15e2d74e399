use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use foundation::math::Projection;
use runtime::event_bus::{ListenerKey, Listeners};

use crate::error::SceneError;
use crate::layer::LayerId;
use crate::tiles::{TileCoord, UrlTemplate};

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one constructed source.
///
/// Every construction yields a fresh id, so two sources built from equal
/// options are still distinct. Tile requests carry the id of the source that
/// issued them and act as its generation tag.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    fn next() -> Self {
        SourceId(NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// Credential mode for tile fetches. Passed through to the embedder untouched.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CrossOrigin {
    Anonymous,
    UseCredentials,
}

impl CrossOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            CrossOrigin::Anonymous => "anonymous",
            CrossOrigin::UseCredentials => "use-credentials",
        }
    }
}

/// A fetch the embedder should perform for one tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRequest {
    pub layer: LayerId,
    pub source: SourceId,
    pub coord: TileCoord,
    pub url: String,
    pub cross_origin: Option<CrossOrigin>,
    pub headers: Vec<(String, String)>,
}

/// Customizes a request before it is handed to the embedder.
pub type TileLoadFn = Rc<dyn Fn(&mut TileRequest)>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileErrorEvent {
    pub layer: LayerId,
    pub source: SourceId,
    pub coord: TileCoord,
    pub message: String,
}

/// Listener for failed tile loads. Runs while the map is borrowed, so it must
/// not borrow the map again.
pub type TileErrorListener = dyn Fn(&TileErrorEvent);

#[derive(Clone)]
pub struct TileSourceOptions {
    pub url: String,
    pub projection: String,
    pub tile_load: Option<TileLoadFn>,
    pub revision: u64,
    pub cross_origin: Option<CrossOrigin>,
}

impl TileSourceOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            projection: Projection::Epsg3857.code().to_string(),
            tile_load: None,
            revision: 0,
            cross_origin: None,
        }
    }
}

impl std::fmt::Debug for TileSourceOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileSourceOptions")
            .field("url", &self.url)
            .field("projection", &self.projection)
            .field("tile_load", &self.tile_load.is_some())
            .field("revision", &self.revision)
            .field("cross_origin", &self.cross_origin)
            .finish()
    }
}

pub fn parse_projection(code: &str) -> Result<Projection, SceneError> {
    Projection::from_code(code).ok_or_else(|| SceneError::InvalidProjection {
        code: code.to_string(),
    })
}

/// XYZ raster source.
pub struct TileSource {
    id: SourceId,
    template: UrlTemplate,
    projection: Projection,
    tile_load: Option<TileLoadFn>,
    revision: u64,
    cross_origin: Option<CrossOrigin>,
    tile_error: Listeners<TileErrorListener>,
}

impl TileSource {
    /// Validates the projection and the url template. Both failures are
    /// configuration errors.
    pub fn new(options: TileSourceOptions) -> Result<Self, SceneError> {
        let projection = parse_projection(&options.projection)?;
        let template = UrlTemplate::parse(&options.url)?;
        Ok(Self {
            id: SourceId::next(),
            template,
            projection,
            tile_load: options.tile_load,
            revision: options.revision,
            cross_origin: options.cross_origin,
            tile_error: Listeners::new(),
        })
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn template(&self) -> &UrlTemplate {
        &self.template
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn cross_origin(&self) -> Option<CrossOrigin> {
        self.cross_origin
    }

    pub fn tile_load(&self) -> Option<&TileLoadFn> {
        self.tile_load.as_ref()
    }

    pub fn on_tile_error(&mut self, listener: Rc<TileErrorListener>) -> ListenerKey {
        self.tile_error.on(listener)
    }

    pub fn un_tile_error(&mut self, key: ListenerKey) -> bool {
        self.tile_error.un(key)
    }

    pub fn tile_error_listener_count(&self) -> usize {
        self.tile_error.len()
    }

    pub(crate) fn build_request(&self, layer: LayerId, coord: TileCoord) -> TileRequest {
        let mut request = TileRequest {
            layer,
            source: self.id,
            coord,
            url: self.template.expand(coord),
            cross_origin: self.cross_origin,
            headers: Vec::new(),
        };
        if let Some(load) = &self.tile_load {
            load(&mut request);
        }
        request
    }

    pub(crate) fn emit_tile_error(&self, event: &TileErrorEvent) {
        self.tile_error.emit(event);
    }
}

impl std::fmt::Debug for TileSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileSource")
            .field("id", &self.id)
            .field("template", &self.template.as_str())
            .field("projection", &self.projection)
            .field("revision", &self.revision)
            .field("tile_error_listeners", &self.tile_error.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point([f64; 2]),
    LineString(Vec<[f64; 2]>),
    Polygon(Vec<Vec<[f64; 2]>>),
}

impl Geometry {
    fn map_coords(&self, f: impl Fn([f64; 2]) -> [f64; 2]) -> Geometry {
        match self {
            Geometry::Point(p) => Geometry::Point(f(*p)),
            Geometry::LineString(line) => Geometry::LineString(line.iter().map(|p| f(*p)).collect()),
            Geometry::Polygon(rings) => Geometry::Polygon(
                rings
                    .iter()
                    .map(|ring| ring.iter().map(|p| f(*p)).collect())
                    .collect(),
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: String,
    pub geometry: Geometry,
}

impl Feature {
    pub fn new(id: impl Into<String>, geometry: Geometry) -> Self {
        Self {
            id: id.into(),
            geometry,
        }
    }
}

/// In-memory feature source. Features are stored in EPSG:3857.
#[derive(Debug)]
pub struct VectorSource {
    id: SourceId,
    features: Vec<Feature>,
    revision: u64,
}

impl VectorSource {
    /// Reprojects `features` from `projection` into the working projection.
    pub fn new(features: &[Feature], projection: &str, revision: u64) -> Result<Self, SceneError> {
        let projection = parse_projection(projection)?;
        let features = features
            .iter()
            .map(|feat| Feature {
                id: feat.id.clone(),
                geometry: feat.geometry.map_coords(|p| projection.to_mercator(p)),
            })
            .collect();
        Ok(Self {
            id: SourceId::next(),
            features,
            revision,
        })
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[derive(Debug)]
pub enum Source {
    Tile(TileSource),
    Vector(VectorSource),
}

impl Source {
    pub fn id(&self) -> SourceId {
        match self {
            Source::Tile(s) => s.id(),
            Source::Vector(s) => s.id(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Source::Tile(_) => "tile",
            Source::Vector(_) => "vector",
        }
    }

    pub fn as_tile(&self) -> Option<&TileSource> {
        match self {
            Source::Tile(s) => Some(s),
            Source::Vector(_) => None,
        }
    }

    pub fn as_tile_mut(&mut self) -> Option<&mut TileSource> {
        match self {
            Source::Tile(s) => Some(s),
            Source::Vector(_) => None,
        }
    }

    pub fn as_vector(&self) -> Option<&VectorSource> {
        match self {
            Source::Vector(s) => Some(s),
            Source::Tile(_) => None,
        }
    }
}
