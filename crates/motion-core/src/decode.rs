//! Decoding and validation of composition documents.
//!
//! `decode` is a one-shot, pure transform of bytes into a [`Composition`]:
//! parse, check the structural invariants the evaluator relies on, and
//! decode embedded image payloads. Nothing here touches the network or the
//! filesystem; external image paths are carried through unresolved.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use motion_data::model::{self as data, layer_type, Animation};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Parent,
    Asset,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefKind::Parent => f.write_str("parent"),
            RefKind::Asset => f.write_str("asset"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed JSON at line {line}, column {column}: {message}")]
    MalformedJson {
        line: usize,
        column: usize,
        message: String,
    },
    #[error("schema violation in `{field}`: {reason}")]
    SchemaViolation { field: String, reason: String },
    #[error("unresolved {kind} reference `{id}`")]
    UnresolvedReference { kind: RefKind, id: String },
    #[error("cyclic parent chain through layer indices {0:?}")]
    CyclicParentChain(Vec<u32>),
    #[error("precomposition asset `{id}` is referenced from inside itself")]
    RecursiveComposition { id: String },
    #[error("input of {len} bytes exceeds the caller limit of {limit} bytes")]
    InputTooLarge { len: usize, limit: usize },
}

impl DecodeError {
    fn schema(field: &str, reason: impl Into<String>) -> Self {
        DecodeError::SchemaViolation {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Resolved image payload: embedded bytes decoded once at load time, or an
/// external path for the drawing backend to fetch.
#[derive(Debug, Clone)]
pub enum ImageSource {
    Embedded(Arc<Vec<u8>>),
    External(String),
}

/// A decoded, validated animation document. Immutable after decode and
/// cheap to share read-only across any number of playback controllers.
#[derive(Debug)]
pub struct Composition {
    pub(crate) model: Animation,
    pub(crate) images: HashMap<String, ImageSource>,
}

impl Composition {
    pub fn frame_rate(&self) -> f32 {
        self.model.fr
    }

    pub fn start_frame(&self) -> f32 {
        self.model.ip
    }

    pub fn end_frame(&self) -> f32 {
        self.model.op
    }

    /// Playable length in frames.
    pub fn duration_frames(&self) -> f32 {
        self.model.op - self.model.ip
    }

    /// Playable length in seconds.
    pub fn duration(&self) -> f32 {
        self.duration_frames() / self.model.fr
    }

    pub fn width(&self) -> u32 {
        self.model.w
    }

    pub fn height(&self) -> u32 {
        self.model.h
    }

    /// Design-space bounds of the composition, origin at the top left.
    pub fn bounds(&self) -> kurbo::Rect {
        kurbo::Rect::new(0.0, 0.0, self.model.w as f64, self.model.h as f64)
    }

    pub fn name(&self) -> Option<&str> {
        self.model.nm.as_deref()
    }

    pub fn model(&self) -> &Animation {
        &self.model
    }

    pub(crate) fn image(&self, id: &str) -> Option<&ImageSource> {
        self.images.get(id)
    }
}

/// Decode a composition from raw JSON bytes.
pub fn decode(bytes: &[u8]) -> Result<Composition, DecodeError> {
    let raw: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| {
        // serde_json reports pure syntax problems and data-shape problems
        // through the same error type; only the former are MalformedJson.
        match e.classify() {
            serde_json::error::Category::Syntax | serde_json::error::Category::Eof => {
                DecodeError::MalformedJson {
                    line: e.line(),
                    column: e.column(),
                    message: e.to_string(),
                }
            }
            _ => DecodeError::schema("<document>", e.to_string()),
        }
    })?;

    check_required_fields(&raw)?;

    let model: Animation = serde_json::from_value(raw)
        .map_err(|e| DecodeError::schema("<document>", e.to_string()))?;

    validate(&model)?;

    let images = collect_images(&model);

    Ok(Composition { model, images })
}

/// As [`decode`], rejecting inputs larger than `limit` bytes before any
/// parsing work. Hardening for adversarial input on memory-bounded hosts.
pub fn decode_with_limit(bytes: &[u8], limit: usize) -> Result<Composition, DecodeError> {
    if bytes.len() > limit {
        return Err(DecodeError::InputTooLarge {
            len: bytes.len(),
            limit,
        });
    }
    decode(bytes)
}

fn check_required_fields(raw: &serde_json::Value) -> Result<(), DecodeError> {
    let obj = match raw.as_object() {
        Some(obj) => obj,
        None => return Err(DecodeError::schema("<document>", "not a JSON object")),
    };

    for field in ["fr", "ip", "op", "w", "h"] {
        match obj.get(field) {
            None => return Err(DecodeError::schema(field, "missing required field")),
            Some(v) if !v.is_number() => {
                return Err(DecodeError::schema(field, "expected a number"))
            }
            _ => {}
        }
    }

    match obj.get("layers") {
        None => return Err(DecodeError::schema("layers", "missing required field")),
        Some(v) if !v.is_array() => return Err(DecodeError::schema("layers", "expected an array")),
        _ => {}
    }

    Ok(())
}

fn validate(model: &Animation) -> Result<(), DecodeError> {
    if !(model.fr > 0.0) {
        return Err(DecodeError::schema("fr", "frame rate must be positive"));
    }
    if model.op <= model.ip {
        return Err(DecodeError::schema(
            "op",
            format!("out-point {} must be after in-point {}", model.op, model.ip),
        ));
    }
    if model.w == 0 || model.h == 0 {
        return Err(DecodeError::schema("w", "composition size must be nonzero"));
    }

    let assets_by_id: HashMap<&str, &data::Asset> = model
        .assets
        .iter()
        .map(|a| (a.id.as_str(), a))
        .collect();

    validate_layer_list(&model.layers, &assets_by_id)?;
    for asset in &model.assets {
        if let Some(layers) = &asset.layers {
            validate_layer_list(layers, &assets_by_id)?;
        }
    }

    check_precomp_recursion(model, &assets_by_id)?;

    Ok(())
}

/// Per-layer-list invariants: unique indices, resolvable and acyclic
/// parent chains, resolvable asset references.
fn validate_layer_list(
    layers: &[data::Layer],
    assets_by_id: &HashMap<&str, &data::Asset>,
) -> Result<(), DecodeError> {
    let mut by_index: HashMap<u32, usize> = HashMap::new();
    for (pos, layer) in layers.iter().enumerate() {
        if let Some(ind) = layer.ind {
            if by_index.insert(ind, pos).is_some() {
                return Err(DecodeError::schema(
                    "layers",
                    format!("duplicate layer index {ind}"),
                ));
            }
        }
    }

    for layer in layers {
        if let Some(parent) = layer.parent {
            if !by_index.contains_key(&parent) {
                return Err(DecodeError::UnresolvedReference {
                    kind: RefKind::Parent,
                    id: parent.to_string(),
                });
            }
        }

        match layer.ty {
            layer_type::PRECOMP => {
                let ref_id = layer.ref_id.as_deref().unwrap_or("");
                match assets_by_id.get(ref_id) {
                    Some(asset) if asset.is_precomp() => {}
                    _ => {
                        return Err(DecodeError::UnresolvedReference {
                            kind: RefKind::Asset,
                            id: ref_id.to_string(),
                        })
                    }
                }
            }
            layer_type::IMAGE => {
                let ref_id = layer.ref_id.as_deref().unwrap_or("");
                if !assets_by_id.contains_key(ref_id) {
                    return Err(DecodeError::UnresolvedReference {
                        kind: RefKind::Asset,
                        id: ref_id.to_string(),
                    });
                }
            }
            _ => {}
        }
    }

    // Cycle check: walk each parent chain; a chain longer than the layer
    // count has to revisit a node. Iterative, so adversarial documents
    // cannot overflow the stack.
    for layer in layers {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = layer.parent;
        while let Some(ind) = current {
            if !seen.insert(ind) {
                chain.push(ind);
                return Err(DecodeError::CyclicParentChain(chain));
            }
            chain.push(ind);
            current = by_index.get(&ind).and_then(|&pos| layers[pos].parent);
        }
    }

    Ok(())
}

/// Reject precomposition assets that (transitively) reference themselves;
/// inlining them would never terminate.
fn check_precomp_recursion(
    model: &Animation,
    assets_by_id: &HashMap<&str, &data::Asset>,
) -> Result<(), DecodeError> {
    fn visit<'a>(
        layers: &'a [data::Layer],
        assets_by_id: &HashMap<&str, &'a data::Asset>,
        visiting: &mut Vec<&'a str>,
    ) -> Result<(), DecodeError> {
        for layer in layers {
            if layer.ty != layer_type::PRECOMP {
                continue;
            }
            let Some(ref_id) = layer.ref_id.as_deref() else {
                continue;
            };
            if visiting.contains(&ref_id) {
                return Err(DecodeError::RecursiveComposition {
                    id: ref_id.to_string(),
                });
            }
            if let Some(asset) = assets_by_id.get(ref_id) {
                if let Some(sub_layers) = &asset.layers {
                    visiting.push(ref_id);
                    visit(sub_layers, assets_by_id, visiting)?;
                    visiting.pop();
                }
            }
        }
        Ok(())
    }

    let mut visiting = Vec::new();
    visit(&model.layers, assets_by_id, &mut visiting)
}

/// Decode `data:` URIs once at load time; keep external paths symbolic.
fn collect_images(model: &Animation) -> HashMap<String, ImageSource> {
    let mut images = HashMap::new();
    for asset in &model.assets {
        if asset.is_precomp() {
            continue;
        }
        let Some(p) = &asset.p else { continue };

        if p.starts_with("data:") && p.contains(";base64,") {
            if let Some(payload) = p.splitn(2, ',').nth(1) {
                if let Ok(bytes) = BASE64_STANDARD.decode(payload) {
                    images.insert(asset.id.clone(), ImageSource::Embedded(Arc::new(bytes)));
                }
            }
        } else {
            let path = match &asset.u {
                Some(u) if !u.is_empty() => format!("{u}{p}"),
                _ => p.clone(),
            };
            images.insert(asset.id.clone(), ImageSource::External(path));
        }
    }
    images
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_bytes_are_malformed_json() {
        let err = decode(b"BADDATA").unwrap_err();
        assert!(matches!(err, DecodeError::MalformedJson { .. }), "{err:?}");
    }

    #[test]
    fn byte_limit_rejects_before_parsing() {
        let err = decode_with_limit(&[b'x'; 64], 16).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::InputTooLarge { len: 64, limit: 16 }
        ));
    }

    #[test]
    fn data_uri_images_are_decoded_once() {
        // "hi" base64-encoded.
        let json = br#"{
            "fr": 30, "ip": 0, "op": 10, "w": 10, "h": 10,
            "assets": [{"id": "img_0", "w": 1, "h": 1, "p": "data:image/png;base64,aGk=", "e": 1}],
            "layers": [{"ty": 2, "ind": 1, "ip": 0, "op": 10, "refId": "img_0"}]
        }"#;
        let comp = decode(json).unwrap();
        match comp.image("img_0") {
            Some(ImageSource::Embedded(bytes)) => assert_eq!(bytes.as_slice(), b"hi".as_slice()),
            other => panic!("expected embedded bytes, got {other:?}"),
        }
    }
}
