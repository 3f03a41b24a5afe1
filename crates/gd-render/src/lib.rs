//! Tile cache bookkeeping and run invalidation for document painting.

mod invalidation;
mod paint;
mod tiles;

pub use invalidation::InvalidationSet;
pub use paint::Frame;
pub use paint::PaintOp;
pub use paint::Painter;
pub use paint::RecordingPainter;
pub use paint::sync_tiles;
pub use tiles::TILE_COUNT;
pub use tiles::Tile;
pub use tiles::TileCache;
pub use tiles::VisBuffer;
