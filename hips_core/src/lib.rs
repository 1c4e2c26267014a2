//! Core types shared by the pyramid builder, reader and export engine:
//! byte buffers, tile identity, the FITS-like container codec, the WCS
//! engine, the HEALPix path layout, the properties descriptor, logging and
//! progress-bar plumbing, config/cancellation types, and thin HEALPix
//! primitive wrappers.

pub mod config;
pub use config::*;

pub mod container;
pub mod error;
pub use error::*;

pub mod healpix;
pub mod io;
pub mod macros;
pub mod moc;
pub mod path;
pub mod progress;
pub mod properties;
pub use properties::{Properties, ValidationReport};
pub mod types;
pub use types::*;
pub mod wcs;
pub use wcs::Wcs;
