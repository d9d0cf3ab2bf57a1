//! Gallery navigation and optimistic ordering for the portfolio client.
//!
//! Viewer side: [`gallery::Gallery`] combines display ordering, orientation
//! probing, portrait pairing and navigation. Admin side:
//! [`admin::ProjectBoard`] and [`admin::ProjectEditor`] edit through a
//! [`remote::PortfolioRemote`], reordering via [`reorder::ReorderSync`].

pub mod admin;
pub mod error;
pub mod gallery;
pub mod navigation;
pub mod ordering;
pub mod orientation;
pub mod pairing;
pub mod remote;
pub mod reorder;

pub use admin::{ProjectBoard, ProjectEditor};
pub use error::{ClientError, ClientResult};
pub use gallery::{Gallery, ListChange, ListIdentity, ProbeRequest, Slide};
pub use navigation::{DeviceClass, NavigationController, NavigationKey, PointerSide};
pub use ordering::{order_for_display, GalleryItem};
pub use orientation::{
    DimensionProbe, HttpDimensionProbe, MissingDimensionProbe, Orientation, OrientationCache,
};
pub use pairing::PairingPlanner;
pub use remote::{HttpPortfolioClient, PortfolioRemote};
pub use reorder::{Notice, OrderStore, Ordered, ReorderOutcome, ReorderSync, ReorderTicket};
