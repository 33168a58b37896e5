pub mod bounds;
pub mod extend_rect;
