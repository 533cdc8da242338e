//! Generator registry
//!
//! Ordered depth and image slots. A slot owns the generator handle, its reusable
//! metadata buffer and its generating flag, so handle and buffer lists can never
//! diverge in length.

use contracts::{
    DepthMetadata, FrameMetadata, GeneratorHandle, ImageMetadata, NodeKind, SensorIndex,
    SensorPair,
};

use crate::error::{Result, RigError};

/// One registered generator
#[derive(Debug)]
pub struct SensorSlot<P> {
    handle: GeneratorHandle,
    metadata: FrameMetadata<P>,
    generating: bool,
}

impl<P: Copy + Default> SensorSlot<P> {
    fn new(handle: GeneratorHandle) -> Self {
        Self {
            handle,
            metadata: FrameMetadata::new(),
            generating: false,
        }
    }

    #[inline]
    pub fn handle(&self) -> &GeneratorHandle {
        &self.handle
    }

    #[inline]
    pub fn metadata(&self) -> &FrameMetadata<P> {
        &self.metadata
    }

    #[inline]
    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub(crate) fn parts_mut(&mut self) -> (&GeneratorHandle, &mut FrameMetadata<P>) {
        (&self.handle, &mut self.metadata)
    }

    pub(crate) fn mark_generating(&mut self) {
        self.generating = true;
    }
}

/// Depth and image generators discovered by one initialization
///
/// Only the lifecycle manager mutates a registry; callers receive `&GeneratorRegistry`,
/// so the slot lists cannot change after initialization completes.
#[derive(Debug, Default)]
pub struct GeneratorRegistry {
    depth: Vec<SensorSlot<u16>>,
    image: Vec<SensorSlot<u8>>,
    pairs: Vec<SensorPair>,
}

impl GeneratorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a depth generator with a fresh metadata buffer
    pub fn register_depth_generator(&mut self, handle: GeneratorHandle) -> SensorIndex {
        self.depth.push(SensorSlot::new(handle));
        SensorIndex::new(self.depth.len() - 1)
    }

    /// Register an image generator with a fresh metadata buffer
    pub fn register_image_generator(&mut self, handle: GeneratorHandle) -> SensorIndex {
        self.image.push(SensorSlot::new(handle));
        SensorIndex::new(self.image.len() - 1)
    }

    pub fn depth_count(&self) -> usize {
        self.depth.len()
    }

    pub fn image_count(&self) -> usize {
        self.image.len()
    }

    pub fn depth_handle(&self, index: SensorIndex) -> Result<&GeneratorHandle> {
        self.depth_slot(index).map(SensorSlot::handle)
    }

    pub fn image_handle(&self, index: SensorIndex) -> Result<&GeneratorHandle> {
        self.image_slot(index).map(SensorSlot::handle)
    }

    pub fn depth_metadata(&self, index: SensorIndex) -> Result<&DepthMetadata> {
        self.depth_slot(index).map(SensorSlot::metadata)
    }

    pub fn image_metadata(&self, index: SensorIndex) -> Result<&ImageMetadata> {
        self.image_slot(index).map(SensorSlot::metadata)
    }

    pub fn depth_slot(&self, index: SensorIndex) -> Result<&SensorSlot<u16>> {
        slot(&self.depth, NodeKind::Depth, index)
    }

    pub fn image_slot(&self, index: SensorIndex) -> Result<&SensorSlot<u8>> {
        slot(&self.image, NodeKind::Image, index)
    }

    /// Whether the generator at `index` of `kind` has been started
    pub fn is_generating(&self, kind: NodeKind, index: SensorIndex) -> Result<bool> {
        match kind {
            NodeKind::Depth => self.depth_slot(index).map(SensorSlot::is_generating),
            NodeKind::Image => self.image_slot(index).map(SensorSlot::is_generating),
        }
    }

    pub(crate) fn depth_slot_mut(&mut self, index: SensorIndex) -> Result<&mut SensorSlot<u16>> {
        let len = self.depth.len();
        self.depth
            .get_mut(index.get())
            .ok_or_else(|| RigError::index_out_of_range(NodeKind::Depth, index, len))
    }

    pub(crate) fn image_slot_mut(&mut self, index: SensorIndex) -> Result<&mut SensorSlot<u8>> {
        let len = self.image.len();
        self.image
            .get_mut(index.get())
            .ok_or_else(|| RigError::index_out_of_range(NodeKind::Image, index, len))
    }

    pub(crate) fn depth_slots_mut(&mut self) -> impl Iterator<Item = (SensorIndex, &mut SensorSlot<u16>)> {
        self.depth
            .iter_mut()
            .enumerate()
            .map(|(i, s)| (SensorIndex::new(i), s))
    }

    pub(crate) fn image_slots_mut(&mut self) -> impl Iterator<Item = (SensorIndex, &mut SensorSlot<u8>)> {
        self.image
            .iter_mut()
            .enumerate()
            .map(|(i, s)| (SensorIndex::new(i), s))
    }

    /// Record positional pairs up to the shorter list
    pub(crate) fn pair_positionally(&mut self) {
        self.pairs = (0..self.depth.len().min(self.image.len()))
            .map(|i| SensorPair {
                depth_index: SensorIndex::new(i),
                color_index: SensorIndex::new(i),
            })
            .collect();
    }

    /// Depth/color pairs recorded at initialization
    pub fn pairs(&self) -> &[SensorPair] {
        &self.pairs
    }

    /// Whether every depth generator has a color counterpart and vice versa
    pub fn is_balanced(&self) -> bool {
        self.depth.len() == self.image.len()
    }
}

fn slot<P>(slots: &[SensorSlot<P>], kind: NodeKind, index: SensorIndex) -> Result<&SensorSlot<P>> {
    slots
        .get(index.get())
        .ok_or_else(|| RigError::index_out_of_range(kind, index, slots.len()))
}
