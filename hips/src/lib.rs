//! The pyramid builder, reprojection kernels and export engine: the
//! operations layered on top of `hips_core`'s primitives and
//! `hips_container`'s storage/reader abstractions.

pub mod builder;
pub mod export;
pub mod remote_cutout;
pub mod reproject;
pub mod source;
