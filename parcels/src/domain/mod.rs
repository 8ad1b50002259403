//! Domain core: value types, pure projections, and the fetch coordinator.
//!
//! Nothing here performs I/O directly; network, credential, and storage
//! concerns are reached through the traits in [`ports`].

pub mod auth;
pub mod coordinator;
pub mod export;
pub mod filters;
pub mod map_session;
pub mod parcel;
pub mod ports;

pub use self::auth::{Access, AuthResolver, BearerToken};
pub use self::coordinator::{
    Disposition, FetchCoordinator, FetchOutcome, Phase, RequestEpoch, Resolution, SyncSnapshot,
};
pub use self::export::{EXPORT_HEADER, ExportError, ExportSerializer};
pub use self::filters::{FilterCriteria, FilterCriteriaError, Query, QueryBuilder, Role};
pub use self::map_session::{MapSession, MapSessionPorts};
pub use self::parcel::{
    FeatureCollection, FeatureProperties, Geometry, GeometryError, ParcelRecord, Projection,
    RenderFeature, ResultProjector,
};
