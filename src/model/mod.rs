pub(crate) mod channel;
pub(crate) mod image;
pub(crate) mod layer;

pub use channel::Channel;
pub use image::{Colormap, FloatingSelection, Image};
pub use layer::{Layer, LayerMask};
