use crate::{
    foundation::{
        core::{ImageBaseType, Rect},
        error::{MosaicError, MosaicResult},
        math::opacity_to_u8,
    },
    model::{channel::Channel, layer::Layer},
    paint::ops::blend_onto_layer,
    tile::{
        region::{PixelRegion, PixelRegionMut},
        store::TileStore,
    },
};

/// Palette of an indexed image.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Colormap {
    entries: Vec<[u8; 3]>,
}

impl Colormap {
    pub fn new(entries: Vec<[u8; 3]>) -> Self {
        Self { entries }
    }

    /// Palette from packed `r g b` triples; a trailing partial triple is ignored.
    pub fn from_packed(rgb: &[u8]) -> Self {
        Self {
            entries: rgb.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect(),
        }
    }

    /// Entry `index`; indices past the end are black.
    #[inline]
    pub fn get(&self, index: u8) -> [u8; 3] {
        self.entries
            .get(usize::from(index))
            .copied()
            .unwrap_or([0, 0, 0])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A temporary layer attached to `parent` that is merged into it on demand.
#[derive(Clone, Debug)]
pub struct FloatingSelection {
    layer: usize,
    parent: usize,
    backing: Option<TileStore>,
}

impl FloatingSelection {
    pub fn layer_index(&self) -> usize {
        self.layer
    }

    pub fn parent_index(&self) -> usize {
        self.parent
    }
}

/// Document read by the compositor. Layers and channels are ordered top to
/// bottom.
#[derive(Clone, Debug)]
pub struct Image {
    width: u32,
    height: u32,
    base_type: ImageBaseType,
    layers: Vec<Layer>,
    channels: Vec<Channel>,
    colormap: Option<Colormap>,
    floating: Option<FloatingSelection>,
}

impl Image {
    pub fn new(width: u32, height: u32, base_type: ImageBaseType) -> Self {
        Self {
            width,
            height,
            base_type,
            layers: Vec::new(),
            channels: Vec::new(),
            colormap: None,
            floating: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn base_type(&self) -> ImageBaseType {
        self.base_type
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }

    /// Insert `layer` above all others.
    pub fn add_layer(&mut self, layer: Layer) {
        self.layers.insert(0, layer);
        if let Some(fs) = &mut self.floating {
            fs.layer += 1;
            fs.parent += 1;
        }
    }

    /// Insert `channel` above all others.
    pub fn add_channel(&mut self, channel: Channel) {
        self.channels.insert(0, channel);
    }

    pub fn set_colormap(&mut self, colormap: Option<Colormap>) {
        self.colormap = colormap;
    }

    pub fn get_layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layers_mut(&mut self) -> &mut [Layer] {
        &mut self.layers
    }

    pub fn get_channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channels_mut(&mut self) -> &mut [Channel] {
        &mut self.channels
    }

    pub fn get_colormap(&self) -> Option<&Colormap> {
        self.colormap.as_ref()
    }

    pub fn get_floating_selection(&self) -> Option<&FloatingSelection> {
        self.floating.as_ref()
    }

    pub fn is_floating_layer(&self, index: usize) -> bool {
        self.floating.as_ref().is_some_and(|fs| fs.layer == index)
    }

    /// Add `layer` on top as a floating selection attached to the layer
    /// currently at `parent`.
    pub fn set_floating_selection(&mut self, layer: Layer, parent: usize) -> MosaicResult<()> {
        if self.floating.is_some() {
            return Err(MosaicError::validation("image already has a floating selection"));
        }
        let Some(parent_layer) = self.layers.get(parent) else {
            return Err(MosaicError::validation(format!(
                "floating selection parent {parent} out of range ({} layers)",
                self.layers.len()
            )));
        };
        if layer.format().base_type() != parent_layer.format().base_type() {
            return Err(MosaicError::validation(format!(
                "floating selection {:?} does not match parent {:?}",
                layer.format(),
                parent_layer.format()
            )));
        }
        self.add_layer(layer);
        self.floating = Some(FloatingSelection {
            layer: 0,
            parent: parent + 1,
            backing: None,
        });
        Ok(())
    }

    /// Detach the floating selection, restoring the parent to its unmerged
    /// pixels, and return the floating layer.
    pub fn remove_floating_selection(&mut self) -> Option<Layer> {
        let fs = self.floating.take()?;
        if let Some(backing) = fs.backing {
            self.layers[fs.parent].pixels = backing;
        }
        Some(self.layers.remove(fs.layer))
    }

    /// Merge the floating selection into its parent within `rect` (image
    /// coordinates). The parent is first restored from a backing copy taken on
    /// the first call, so flattening the same area twice gives the same result.
    pub fn flatten_floating_selection(&mut self, rect: Rect) -> MosaicResult<()> {
        let Some(fs) = self.floating.as_mut() else {
            return Ok(());
        };
        let (fi, pi) = (fs.layer, fs.parent);
        if fi == pi || fi >= self.layers.len() || pi >= self.layers.len() {
            return Err(MosaicError::validation("floating selection indices are stale"));
        }
        let (float, parent) = if fi < pi {
            let (head, tail) = self.layers.split_at_mut(pi);
            (&head[fi], &mut tail[0])
        } else {
            let (head, tail) = self.layers.split_at_mut(fi);
            (&tail[0], &mut head[pi])
        };

        let Some(area) = rect
            .intersect(float.bounds())
            .and_then(|r| r.intersect(parent.bounds()))
        else {
            return Ok(());
        };

        let backing = fs.backing.get_or_insert_with(|| parent.pixels.clone());
        let local = area.translate(-parent.offset_x, -parent.offset_y);
        parent.pixels.write_rect(local, &backing.read_rect(local))?;

        if !float.visible {
            return Ok(());
        }
        let src = PixelRegion::new(
            &float.pixels,
            area.translate(-float.offset_x, -float.offset_y),
        );
        let mut dest = PixelRegionMut::new(&mut parent.pixels, local, true);
        blend_onto_layer(&mut dest, &src, opacity_to_u8(float.opacity))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/image.rs"]
mod tests;
