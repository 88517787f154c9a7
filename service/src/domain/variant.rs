use crate::domain::dimension::Dimension;
use crate::domain::DestinationReference;
use image::Rgba;

pub const THUMBNAIL_WIDTH: u32 = 200;
pub const COVER_WIDTH: u32 = 800;
pub const PASSPORT_WIDTH: u32 = 150;
pub const PASSPORT_HEIGHT: u32 = 200;

/// White with zero alpha. The passport blend never paints it opaque.
pub const BACKGROUND_COLOR: Rgba<u8> = Rgba([255, 255, 255, 0]);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariantSpec {
    pub name: &'static str,
    pub prefix: &'static str,
    pub dimension: Dimension,
    pub background: Option<Rgba<u8>>,
}

pub const THUMBNAIL: VariantSpec = VariantSpec {
    name: "thumbnail",
    prefix: "thumbnails",
    dimension: Dimension::Width(THUMBNAIL_WIDTH),
    background: None,
};

pub const COVER: VariantSpec = VariantSpec {
    name: "cover",
    prefix: "covers",
    dimension: Dimension::Width(COVER_WIDTH),
    background: None,
};

pub const PASSPORT: VariantSpec = VariantSpec {
    name: "passport",
    prefix: "passports",
    dimension: Dimension::Exact {
        width: PASSPORT_WIDTH,
        height: PASSPORT_HEIGHT,
    },
    background: Some(BACKGROUND_COLOR),
};

/// Rendered and uploaded in this order.
pub static VARIANTS: [VariantSpec; 3] = [THUMBNAIL, COVER, PASSPORT];

impl VariantSpec {
    pub fn destination(&self, bucket: &str, key: &str) -> DestinationReference {
        DestinationReference {
            bucket: bucket.to_string(),
            key: format!("{}/{}", self.prefix, key),
        }
    }
}
