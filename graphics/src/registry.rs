//! Renderable registry and frame draw order.
//!
//! Instances are kept in insertion order. A frame with no transparent
//! instance draws in that order; otherwise opaque instances draw first and
//! transparent ones follow, ordered farther-first by their depth key.

use crate::renderable::Renderable;
use crate::transform::DrawOpt;

/// Named renderables with draw-order resolution.
#[derive(Default)]
pub struct Registry {
    items: Vec<(String, Renderable)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a renderable under an id. Replacing an existing id drops the old
    /// instance's GPU handles and warns.
    pub fn append(&mut self, id: impl Into<String>, renderable: Renderable) {
        let id = id.into();
        if let Some(existing) = self.items.iter_mut().find(|(name, _)| *name == id) {
            log::warn!("registry: replacing renderable {id}");
            existing.1 = renderable;
        } else {
            self.items.push((id, renderable));
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<Renderable> {
        let index = self.items.iter().position(|(name, _)| name == id)?;
        Some(self.items.remove(index).1)
    }

    pub fn remove_all(&mut self) {
        self.items.clear();
    }

    pub fn get(&self, id: &str) -> Option<&Renderable> {
        self.items
            .iter()
            .find(|(name, _)| name == id)
            .map(|(_, r)| r)
    }

    /// Update one instance. An unknown id warns and does nothing; an update
    /// failure is a recoverable per-frame condition and also warns.
    pub fn set_attributes(&mut self, id: &str, partial: &DrawOpt) {
        let Some((_, renderable)) = self.items.iter_mut().find(|(name, _)| name == id) else {
            log::warn!("registry: set_attributes on unknown id {id}");
            return;
        };
        if let Err(err) = renderable.set_attributes(partial) {
            log::warn!("registry: update of {id} failed: {err}");
        }
    }

    /// Update every instance. Uniforms a given program never declared are a
    /// silent per-instance no-op.
    pub fn set_to_all(&mut self, partial: &DrawOpt) {
        for (id, renderable) in &mut self.items {
            if let Err(err) = renderable.set_attributes(partial) {
                log::warn!("registry: update of {id} failed: {err}");
            }
        }
    }

    /// Draw one frame in resolved order. Per-instance draw failures warn
    /// and the frame continues.
    pub fn draw(&self) {
        for (id, renderable) in self.draw_order() {
            if !renderable.is_visible() {
                log::trace!("registry: culled {id}");
                continue;
            }
            if let Err(err) = renderable.draw() {
                log::warn!("registry: draw of {id} failed: {err}");
            }
        }
    }

    /// Ids in the order the next frame will draw them.
    pub fn resolved_draw_order(&self) -> Vec<&str> {
        self.draw_order().into_iter().map(|(id, _)| id).collect()
    }

    /// Opaque instances in insertion order, then transparent instances
    /// inserted into a sorted list by linear scan: each lands at the first
    /// index whose existing key is not strictly greater, which orders keys
    /// descending (farther first).
    pub(crate) fn draw_order(&self) -> Vec<(&str, &Renderable)> {
        if !self.items.iter().any(|(_, r)| r.transparent()) {
            return self
                .items
                .iter()
                .map(|(id, r)| (id.as_str(), r))
                .collect();
        }

        let mut order: Vec<(&str, &Renderable)> = self
            .items
            .iter()
            .filter(|(_, r)| !r.transparent())
            .map(|(id, r)| (id.as_str(), r))
            .collect();

        let mut sorted: Vec<(f32, &str, &Renderable)> = Vec::new();
        for (id, renderable) in self.items.iter().filter(|(_, r)| r.transparent()) {
            let key = renderable.sort_key();
            let index = sorted
                .iter()
                .position(|(existing, _, _)| !(*existing > key))
                .unwrap_or(sorted.len());
            sorted.insert(index, (key, id.as_str(), renderable));
        }
        order.extend(sorted.into_iter().map(|(_, id, r)| (id, r)));
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::DrawableElementAttributes;
    use crate::backend::dummy::DummyBackend;
    use crate::backend::GpuBackend;
    use crate::device::RenderDevice;
    use crate::shader::ShaderDialect;
    use larkspur_core::math::Vec3;
    use std::sync::Arc;

    fn setup() -> (Arc<DummyBackend>, RenderDevice) {
        let backend = Arc::new(DummyBackend::new(ShaderDialect::Wgsl));
        let device = RenderDevice::new(Arc::clone(&backend) as Arc<dyn GpuBackend>);
        (backend, device)
    }

    fn triangle_at(z: f32, transparent: bool) -> DrawableElementAttributes {
        let attrs = DrawableElementAttributes::new(vec![
            Vec3::new(-0.5, -0.5, z),
            Vec3::new(0.5, -0.5, z),
            Vec3::new(0.0, 0.5, z),
        ])
        .with_static();
        if transparent {
            attrs.with_transparency()
        } else {
            attrs
        }
    }

    #[test]
    fn opaque_frames_draw_in_insertion_order() {
        let (backend, device) = setup();
        let mut registry = Registry::new();
        registry.append(
            "b",
            device
                .create_renderable(&triangle_at(2.0, false), DrawOpt::new())
                .unwrap(),
        );
        registry.append(
            "a",
            device
                .create_renderable(&triangle_at(1.0, false), DrawOpt::new())
                .unwrap(),
        );
        let ids: Vec<_> = registry.draw_order().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec!["b", "a"]);
        registry.draw();
        assert_eq!(backend.draw_call_count(), 2);
    }

    #[test]
    fn transparent_instances_draw_farther_first() {
        let (_, device) = setup();
        let mut registry = Registry::new();
        registry.append(
            "near",
            device
                .create_renderable(&triangle_at(2.0, true), DrawOpt::new())
                .unwrap(),
        );
        registry.append(
            "far",
            device
                .create_renderable(&triangle_at(5.0, true), DrawOpt::new())
                .unwrap(),
        );
        registry.append(
            "solid",
            device
                .create_renderable(&triangle_at(0.0, false), DrawOpt::new())
                .unwrap(),
        );
        let ids: Vec<_> = registry.draw_order().iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec!["solid", "far", "near"]);
    }

    #[test]
    fn replacement_keeps_one_instance_per_id() {
        let (_, device) = setup();
        let mut registry = Registry::new();
        let make = || {
            device
                .create_renderable(&triangle_at(0.0, false), DrawOpt::new())
                .unwrap()
        };
        registry.append("only", make());
        registry.append("only", make());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unknown_id_update_is_a_no_op() {
        let (backend, device) = setup();
        let mut registry = Registry::new();
        registry.append(
            "a",
            device
                .create_renderable(&triangle_at(0.0, false), DrawOpt::new())
                .unwrap(),
        );
        let writes = backend.buffer_write_count();
        registry.set_attributes("missing", &DrawOpt::new().with_bump_scale(2.0));
        assert_eq!(backend.buffer_write_count(), writes);
    }

    #[test]
    fn remove_and_remove_all() {
        let (_, device) = setup();
        let mut registry = Registry::new();
        registry.append(
            "a",
            device
                .create_renderable(&triangle_at(0.0, false), DrawOpt::new())
                .unwrap(),
        );
        assert!(registry.remove("a").is_some());
        assert!(registry.remove("a").is_none());
        registry.append(
            "b",
            device
                .create_renderable(&triangle_at(0.0, false), DrawOpt::new())
                .unwrap(),
        );
        registry.remove_all();
        assert!(registry.is_empty());
    }
}
