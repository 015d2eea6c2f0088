// src/render.rs

use std::io;

use serde::Serialize;

use crate::circle::GeodesicPolygon;
use crate::geo::Coordinate;
use crate::session::SessionState;

/* ---------------- LAYERS ---------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerRole {
    Home,
    Antipode,
    Probe,
    Zone,
}

// Style hints for the map surface; it is free to ignore them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Style {
    pub color: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
    pub draggable: bool,
}

impl Style {
    const MARKER: Self = Self { color: "#2a81cb", fill_color: None, fill_opacity: None, draggable: false };
    const PROBE: Self = Self { color: "#2a81cb", fill_color: None, fill_opacity: None, draggable: true };
    const ZONE: Self = Self { color: "blue", fill_color: Some("#30f"), fill_opacity: Some(0.2), draggable: false };
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates", rename_all = "lowercase")]
pub enum Shape {
    Marker(Coordinate),
    Polygon(GeodesicPolygon),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    pub role: LayerRole,
    pub label: String,
    pub style: Style,
    pub shape: Shape,
}

/* ---------------- SCENE ---------------- */

// Everything the map should show for the current session, in draw order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scene {
    pub layers: Vec<Layer>,
}

impl Scene {
    pub fn from_session(session: &SessionState) -> Self {
        let mut layers = Vec::new();
        let Some(pair) = session.pair() else {
            return Self { layers };
        };

        let home_label = if session.home_label().is_empty() {
            "Home".to_string()
        } else {
            session.home_label().to_string()
        };
        layers.push(Layer {
            role: LayerRole::Home,
            label: home_label,
            style: Style::MARKER,
            shape: Shape::Marker(pair.home()),
        });
        layers.push(Layer {
            role: LayerRole::Antipode,
            label: "Antipode".to_string(),
            style: Style::MARKER,
            shape: Shape::Marker(pair.antipode()),
        });
        if let Some(probe) = session.probe() {
            layers.push(Layer {
                role: LayerRole::Probe,
                label: "Drag me!".to_string(),
                style: Style::PROBE,
                shape: Shape::Marker(probe),
            });
        }
        if let Some(resolved) = session.zone() {
            layers.push(Layer {
                role: LayerRole::Zone,
                label: resolved.zone.label(),
                style: Style::ZONE,
                shape: Shape::Polygon(resolved.polygon.clone()),
            });
        }

        Self { layers }
    }
}

/* ---------------- SURFACE ---------------- */

/// What the engine needs from a map surface.
///
/// `retire_all` must run before the layers of a new home are drawn.
pub trait RenderSurface {
    fn retire_all(&mut self);
    fn retire(&mut self, role: LayerRole);
    fn draw(&mut self, layer: &Layer);
}

const ROLES: [LayerRole; 4] = [LayerRole::Home, LayerRole::Antipode, LayerRole::Probe, LayerRole::Zone];

// Redraws `scene`. Layers whose role is absent from the scene are retired,
// so a cleared probe or zone never lingers on the surface.
pub fn present(surface: &mut dyn RenderSurface, scene: &Scene, retire_previous: bool) {
    if retire_previous {
        surface.retire_all();
    } else {
        for role in ROLES {
            if scene.layers.iter().all(|l| l.role != role) {
                surface.retire(role);
            }
        }
    }
    for layer in &scene.layers {
        surface.draw(layer);
    }
}

/// In-memory surface keeping one live layer per role.
#[derive(Debug, Default)]
pub struct LayerStore {
    layers: Vec<Layer>,
}

impl LayerStore {
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn into_scene(self) -> Scene {
        Scene { layers: self.layers }
    }
}

impl RenderSurface for LayerStore {
    fn retire_all(&mut self) {
        self.layers.clear();
    }

    fn retire(&mut self, role: LayerRole) {
        self.layers.retain(|l| l.role != role);
    }

    fn draw(&mut self, layer: &Layer) {
        match self.layers.iter_mut().find(|l| l.role == layer.role) {
            Some(existing) => *existing = layer.clone(),
            None => self.layers.push(layer.clone()),
        }
    }
}

/* ---------------- OUTPUT ---------------- */

// One CSV row per vertex (markers have a single vertex).
#[derive(Debug, Serialize)]
struct VertexRecord<'a> {
    layer: LayerRole,
    label: &'a str,
    seq: usize,
    lat: f64,
    lon: f64,
}

pub fn write_csv<W: io::Write>(writer: W, scene: &Scene) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    for layer in &scene.layers {
        let points: &[Coordinate] = match &layer.shape {
            Shape::Marker(c) => std::slice::from_ref(c),
            Shape::Polygon(polygon) => polygon.points(),
        };
        for (seq, p) in points.iter().enumerate() {
            writer.serialize(VertexRecord {
                layer: layer.role,
                label: &layer.label,
                seq,
                lat: p.lat(),
                lon: p.lon(),
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<W: io::Write>(writer: W, scene: &Scene) -> Result<(), serde_json::Error> {
    serde_json::to_writer_pretty(writer, scene)
}

/* ---------------- TEST ---------------- */
