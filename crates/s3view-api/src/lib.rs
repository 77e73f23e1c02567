// s3view-api: Async client for the s3view image catalog backend.
//
// Two surfaces: the GraphQL/HTTP endpoints (`BackendClient`) and the
// notification WebSocket (`NotificationStream`). Nothing in here knows
// about stores or reconciliation -- that lives in `s3view-core`.

pub mod client;
pub mod error;
pub mod models;
pub mod transport;
pub mod websocket;

pub use client::{BackendClient, TimeRange};
pub use error::Error;
pub use models::{
    CachedObject, Coordinates, CornerPoint, FeaturesRecord, FileList, GeonamesCounty,
    GeonamesObject, GeonamesRecord, GeonamesState, ImageGroupInfo, ImageRecord, ImageTypeInfo,
    LocalizationCorner, LocalizationRecord, NamedPlace, StaticInfo, SummaryRecord, WireEvent,
};
pub use transport::{TlsMode, TransportConfig};
pub use websocket::{NotificationStream, ReconnectConfig};
