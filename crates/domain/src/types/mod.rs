//! Domain types and models

pub mod image;
pub mod token;

pub use image::{Dimensions, ImageFile, ImageRecord, UploadItem, UploadOptions};
pub use token::TokenPair;
