// ── Mirrored tree ──

mod folder;
mod point;

pub use folder::{Child, Folder, RootShared};
pub use point::Point;
