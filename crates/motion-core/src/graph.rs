//! Scene graph construction.
//!
//! Built once per loaded composition: layer parent references become arena
//! indices, precomposition references become nested instances with their
//! own local clocks, and each instance gets a topological evaluation order
//! so the evaluator resolves every parent transform before its children.
//! The arena is index-based; two layers referencing the same precomp asset
//! get separate instances (separate clocks) over the same immutable model.

use crate::decode::{Composition, RefKind};
use motion_data::model::{self as data, layer_type};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// Only reachable when a composition bypassed decoder validation.
    #[error("unresolved {kind} reference `{id}` in scene graph")]
    UnresolvedReference { kind: RefKind, id: String },
}

/// Where a node's layer data lives in the model.
#[derive(Debug, Clone, Copy)]
pub(crate) enum LayerSource {
    Root(usize),
    Asset { asset: usize, layer: usize },
}

#[derive(Debug)]
pub(crate) struct LayerNode {
    pub source: LayerSource,
    /// Arena index of the transform parent, within the same instance.
    pub parent: Option<usize>,
    /// Arena index of the matte source layer this node consumes.
    pub matte_source: Option<usize>,
    /// Matte sources render only through their consumer.
    pub is_matte_source: bool,
    /// Nested instance for precomposition layers.
    pub sub_instance: Option<usize>,
}

#[derive(Debug)]
pub(crate) struct CompInstance {
    /// Arena ids in wire order (front-to-back).
    pub layers: Vec<usize>,
    /// Arena ids, every parent before its children.
    pub eval_order: Vec<usize>,
}

/// Immutable evaluation graph over a shared [`Composition`].
#[derive(Debug)]
pub struct SceneGraph {
    comp: Arc<Composition>,
    nodes: Vec<LayerNode>,
    instances: Vec<CompInstance>,
    root_instance: usize,
}

impl SceneGraph {
    /// Resolve references and compute evaluation order, once per load.
    pub fn build(comp: Arc<Composition>) -> Result<Self, BuildError> {
        let mut builder = Builder {
            comp: &comp,
            nodes: Vec::new(),
            instances: Vec::new(),
        };
        let root_instance = builder.build_instance(InstanceLayers::Root)?;
        Ok(SceneGraph {
            nodes: builder.nodes,
            instances: builder.instances,
            comp,
            root_instance,
        })
    }

    pub fn composition(&self) -> &Arc<Composition> {
        &self.comp
    }

    /// Total number of layer nodes across all instances.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node(&self, id: usize) -> &LayerNode {
        &self.nodes[id]
    }

    pub(crate) fn instance(&self, id: usize) -> &CompInstance {
        &self.instances[id]
    }

    pub(crate) fn root(&self) -> usize {
        self.root_instance
    }

    /// The model layer backing an arena node.
    pub(crate) fn layer(&self, id: usize) -> &data::Layer {
        match self.nodes[id].source {
            LayerSource::Root(i) => &self.comp.model().layers[i],
            LayerSource::Asset { asset, layer } => self.comp.model().assets[asset]
                .layers
                .as_ref()
                .expect("precomp asset verified at decode")
                .get(layer)
                .expect("layer index within asset"),
        }
    }
}

enum InstanceLayers {
    Root,
    Asset(usize),
}

struct Builder<'a> {
    comp: &'a Composition,
    nodes: Vec<LayerNode>,
    instances: Vec<CompInstance>,
}

impl<'a> Builder<'a> {
    fn build_instance(&mut self, which: InstanceLayers) -> Result<usize, BuildError> {
        let (layers, source_asset): (&[data::Layer], Option<usize>) = match which {
            InstanceLayers::Root => (&self.comp.model().layers, None),
            InstanceLayers::Asset(idx) => (
                self.comp.model().assets[idx]
                    .layers
                    .as_deref()
                    .unwrap_or(&[]),
                Some(idx),
            ),
        };

        // First pass: allocate arena nodes and map wire indices.
        let base = self.nodes.len();
        let mut by_index: HashMap<u32, usize> = HashMap::new();
        for (pos, layer) in layers.iter().enumerate() {
            let id = self.nodes.len();
            self.nodes.push(LayerNode {
                source: match source_asset {
                    None => LayerSource::Root(pos),
                    Some(asset) => LayerSource::Asset { asset, layer: pos },
                },
                parent: None,
                matte_source: None,
                is_matte_source: false,
                sub_instance: None,
            });
            if let Some(ind) = layer.ind {
                by_index.insert(ind, id);
            }
        }

        // Second pass: edges, mattes, nested instances.
        for (pos, layer) in layers.iter().enumerate() {
            let id = base + pos;

            if let Some(parent) = layer.parent {
                let parent_id =
                    *by_index
                        .get(&parent)
                        .ok_or_else(|| BuildError::UnresolvedReference {
                            kind: RefKind::Parent,
                            id: parent.to_string(),
                        })?;
                self.nodes[id].parent = Some(parent_id);
            }

            // A matted layer consumes the layer directly above it.
            if layer.tt.is_some() && pos > 0 {
                let matte_id = base + pos - 1;
                self.nodes[id].matte_source = Some(matte_id);
                self.nodes[matte_id].is_matte_source = true;
            }

            if layer.ty == layer_type::PRECOMP {
                let ref_id = layer.ref_id.as_deref().unwrap_or("");
                let asset_idx = self
                    .comp
                    .model()
                    .assets
                    .iter()
                    .position(|a| a.id == ref_id && a.is_precomp())
                    .ok_or_else(|| BuildError::UnresolvedReference {
                        kind: RefKind::Asset,
                        id: ref_id.to_string(),
                    })?;
                let sub = self.build_instance(InstanceLayers::Asset(asset_idx))?;
                self.nodes[id].sub_instance = Some(sub);
            }
        }

        let arena_ids: Vec<usize> = (base..base + layers.len()).collect();
        let eval_order = self.topological_order(&arena_ids);

        let instance_id = self.instances.len();
        self.instances.push(CompInstance {
            layers: arena_ids,
            eval_order,
        });
        Ok(instance_id)
    }

    /// Parents-before-children order. Parent chains are acyclic by decode
    /// contract, so every node is emitted.
    fn topological_order(&self, ids: &[usize]) -> Vec<usize> {
        let mut order = Vec::with_capacity(ids.len());
        let mut emitted: HashMap<usize, bool> = ids.iter().map(|&id| (id, false)).collect();

        fn emit(
            id: usize,
            nodes: &[LayerNode],
            emitted: &mut HashMap<usize, bool>,
            order: &mut Vec<usize>,
        ) {
            if emitted.get(&id).copied().unwrap_or(true) {
                return;
            }
            if let Some(parent) = nodes[id].parent {
                emit(parent, nodes, emitted, order);
            }
            emitted.insert(id, true);
            order.push(id);
        }

        for &id in ids {
            emit(id, &self.nodes, &mut emitted, &mut order);
        }
        order
    }
}
