//! Display preferences for tracks and sequences.
//!
//! [`VisualizationSettings`] is the context object every panel receives. It
//! layers typed accessors with category-aware defaults on top of the flat
//! [`SettingsStore`], keeps per-sequence viewports, and publishes
//! [`VisualizationEvent`]s so panels know what to redraw.
//!
//! Getters store the default they compute, so later reads (and exports) see
//! the same value. Setters invalidate derived values and request one redraw;
//! the batch variants request a single redraw for the whole batch.

use crate::color::{Color, ColorGradient};
use crate::events::{EventBus, VisualizationEvent};
use crate::model::{
    Alignment, ConnectorType, DataCatalog, GraphType, Orientation, Property, SequenceInfo,
    SettingKey, SettingType, SettingValue, TrackKind,
};
use crate::settings::SettingsStore;
use crate::tasks::TaskOutcome;
use crate::viewport::{Anchor, Viewport};
use crate::zoom::{clamp_zoom, next_zoom_in, next_zoom_out, Granularity, DEFAULT_ZOOM_LEVEL};
use log::{debug, info, warn};
use std::sync::mpsc::Receiver;

pub const DEFAULT_WINDOW_SIZE: u32 = 700;
pub const DEFAULT_MARGIN: u32 = 10;

const REGION_GREEN: Color = Color::rgb(0, 200, 0);

/// Cached values that must be re-derived when `property` changes.
fn dependents(property: Property) -> &'static [Property] {
    match property {
        Property::ForegroundColor => &[Property::ColorGradient],
        Property::BackgroundColor => &[Property::ColorGradient, Property::SecondaryColorGradient],
        Property::SecondaryColor => &[Property::SecondaryColorGradient],
        _ => &[],
    }
}

pub struct VisualizationSettings {
    store: SettingsStore,
    catalog: Box<dyn DataCatalog>,
    events: EventBus,
}

impl VisualizationSettings {
    /// Wrap `store`, running the one-time legacy migration over both the
    /// backing files and the values already in memory.
    pub fn new(store: SettingsStore, catalog: Box<dyn DataCatalog>) -> Self {
        if let Some(persistent) = store.persistent_store() {
            if let Err(e) = persistent.migrate() {
                warn!("[SETTINGS] Legacy preference migration failed: {:#}", e);
            }
        }
        let mut settings = Self { store, catalog, events: EventBus::default() };
        settings.migrate_legacy_values();
        info!("[SETTINGS] Visualization settings ready ({} values)", settings.store.len());
        settings
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SettingsStore {
        &mut self.store
    }

    pub fn catalog(&self) -> &dyn DataCatalog {
        self.catalog.as_ref()
    }

    pub fn set_catalog(&mut self, catalog: Box<dyn DataCatalog>) {
        self.catalog = catalog;
    }

    pub fn subscribe(&mut self) -> Receiver<VisualizationEvent> {
        self.events.subscribe()
    }

    pub fn request_redraw(&mut self) {
        self.events.publish(VisualizationEvent::RedrawRequested);
    }

    // --- generic plumbing ---

    fn track_kind(&self, entity: &str) -> Option<TrackKind> {
        self.catalog.data_item(entity).and_then(|item| item.track_kind())
    }

    fn get_or_init<T: SettingType + Clone>(
        &mut self,
        entity: &str,
        property: Property,
        default: impl FnOnce(&Self) -> T,
    ) -> T {
        let key = SettingKey::of(entity, property);
        if let Some(value) = self.store.get_typed(key.as_str()) {
            return value;
        }
        let value = default(self);
        self.store.store_as(key.as_str(), value.clone());
        value
    }

    fn apply(&mut self, entity: &str, property: Property, value: SettingValue) {
        self.store.store(SettingKey::of(entity, property).as_str(), value);
        for dependent in dependents(property) {
            self.store.clear(SettingKey::of(entity, *dependent).as_str());
        }
    }

    fn set_property<T: SettingType>(&mut self, entity: &str, property: Property, value: T) {
        self.apply(entity, property, value.into_setting());
        self.request_redraw();
    }

    fn set_property_batch<T: SettingType + Clone, S: AsRef<str>>(
        &mut self,
        entities: &[S],
        property: Property,
        value: T,
    ) {
        for entity in entities {
            self.apply(entity.as_ref(), property, value.clone().into_setting());
        }
        self.request_redraw();
    }

    // --- colors ---

    pub fn foreground_color(&mut self, entity: &str) -> Color {
        self.get_or_init(entity, Property::ForegroundColor, |s| match s.track_kind(entity) {
            Some(TrackKind::Numeric) => Color::BLUE,
            Some(TrackKind::Region) => REGION_GREEN,
            Some(TrackKind::Dna) | None => Color::BLACK,
        })
    }

    pub fn set_foreground_color(&mut self, entity: &str, color: Color) {
        self.set_property(entity, Property::ForegroundColor, color);
    }

    pub fn set_foreground_color_batch<S: AsRef<str>>(&mut self, entities: &[S], color: Color) {
        self.set_property_batch(entities, Property::ForegroundColor, color);
    }

    pub fn background_color(&mut self, entity: &str) -> Color {
        self.get_or_init(entity, Property::BackgroundColor, |_| Color::WHITE)
    }

    pub fn set_background_color(&mut self, entity: &str, color: Color) {
        self.set_property(entity, Property::BackgroundColor, color);
    }

    pub fn set_background_color_batch<S: AsRef<str>>(&mut self, entities: &[S], color: Color) {
        self.set_property_batch(entities, Property::BackgroundColor, color);
    }

    pub fn secondary_color(&mut self, entity: &str) -> Color {
        self.get_or_init(entity, Property::SecondaryColor, |_| Color::RED)
    }

    pub fn set_secondary_color(&mut self, entity: &str, color: Color) {
        self.set_property(entity, Property::SecondaryColor, color);
    }

    pub fn set_secondary_color_batch<S: AsRef<str>>(&mut self, entities: &[S], color: Color) {
        self.set_property_batch(entities, Property::SecondaryColor, color);
    }

    pub fn baseline_color(&mut self, entity: &str) -> Color {
        self.get_or_init(entity, Property::BaselineColor, |_| Color::LIGHT_GRAY)
    }

    pub fn set_baseline_color(&mut self, entity: &str, color: Color) {
        self.set_property(entity, Property::BaselineColor, color);
    }

    pub fn set_baseline_color_batch<S: AsRef<str>>(&mut self, entities: &[S], color: Color) {
        self.set_property_batch(entities, Property::BaselineColor, color);
    }

    fn derived_gradient(&mut self, entity: &str, property: Property, to: Color) -> ColorGradient {
        let from = self.background_color(entity);
        let key = SettingKey::of(entity, property);
        // A cached ramp only counts if it still matches the colors it came from;
        // raw store writes bypass the setters' invalidation.
        if let Some(cached) = self.store.get_typed::<ColorGradient>(key.as_str()) {
            if cached.from == from && cached.to == to {
                return cached;
            }
        }
        let gradient = ColorGradient::new(from, to);
        self.store.store(key.as_str(), SettingValue::Gradient(gradient));
        gradient
    }

    /// Ramp from the background to the foreground color.
    pub fn color_gradient(&mut self, entity: &str) -> ColorGradient {
        let to = self.foreground_color(entity);
        self.derived_gradient(entity, Property::ColorGradient, to)
    }

    /// Ramp from the background to the secondary color.
    pub fn secondary_color_gradient(&mut self, entity: &str) -> ColorGradient {
        let to = self.secondary_color(entity);
        self.derived_gradient(entity, Property::SecondaryColorGradient, to)
    }

    // --- track appearance ---

    pub fn track_height(&mut self, entity: &str) -> u32 {
        let height: i64 = self.get_or_init(entity, Property::TrackHeight, |s| match s.track_kind(entity) {
            Some(TrackKind::Dna) => 12,
            Some(TrackKind::Numeric) => 30,
            Some(TrackKind::Region) => 20,
            None => 16,
        });
        u32::try_from(height).unwrap_or(1)
    }

    pub fn set_track_height(&mut self, entity: &str, height: u32) {
        self.set_property(entity, Property::TrackHeight, height as i64);
    }

    pub fn set_track_height_batch<S: AsRef<str>>(&mut self, entities: &[S], height: u32) {
        self.set_property_batch(entities, Property::TrackHeight, height as i64);
    }

    pub fn graph_type(&mut self, entity: &str) -> GraphType {
        self.get_or_init(entity, Property::GraphType, |s| match s.track_kind(entity) {
            Some(TrackKind::Dna) => GraphType::Dna,
            Some(TrackKind::Region) => GraphType::Region,
            Some(TrackKind::Numeric) | None => GraphType::Filled,
        })
    }

    pub fn set_graph_type(&mut self, entity: &str, graph: GraphType) {
        self.set_property(entity, Property::GraphType, graph);
    }

    pub fn set_graph_type_batch<S: AsRef<str>>(&mut self, entities: &[S], graph: GraphType) {
        self.set_property_batch(entities, Property::GraphType, graph);
    }

    pub fn connector_type(&mut self, entity: &str) -> ConnectorType {
        self.get_or_init(entity, Property::ConnectorType, |_| ConnectorType::None)
    }

    pub fn set_connector_type(&mut self, entity: &str, connector: ConnectorType) {
        self.set_property(entity, Property::ConnectorType, connector);
    }

    pub fn set_connector_type_batch<S: AsRef<str>>(&mut self, entities: &[S], connector: ConnectorType) {
        self.set_property_batch(entities, Property::ConnectorType, connector);
    }

    pub fn is_expanded(&mut self, entity: &str) -> bool {
        self.get_or_init(entity, Property::Expanded, |_| false)
    }

    pub fn set_expanded(&mut self, entity: &str, expanded: bool) {
        self.set_property(entity, Property::Expanded, expanded);
    }

    pub fn set_expanded_batch<S: AsRef<str>>(&mut self, entities: &[S], expanded: bool) {
        self.set_property_batch(entities, Property::Expanded, expanded);
    }

    /// A track with no visibility entry is visible.
    pub fn is_track_visible(&self, entity: &str) -> bool {
        self.store.get_or(SettingKey::of(entity, Property::Visible).as_str(), true)
    }

    fn apply_visibility(&mut self, entity: &str, visible: bool) {
        let key = SettingKey::of(entity, Property::Visible);
        if visible {
            self.store.clear(key.as_str());
        } else {
            self.store.store(key.as_str(), SettingValue::Boolean(false));
        }
    }

    pub fn set_track_visible(&mut self, entity: &str, visible: bool) {
        self.apply_visibility(entity, visible);
        self.request_redraw();
    }

    pub fn set_track_visible_batch<S: AsRef<str>>(&mut self, entities: &[S], visible: bool) {
        for entity in entities {
            self.apply_visibility(entity.as_ref(), visible);
        }
        self.request_redraw();
    }

    /// Grouped tracks are drawn as a sub-row of the track above them.
    pub fn is_grouped_track(&self, entity: &str) -> bool {
        self.store.get_or(SettingKey::of(entity, Property::Grouped).as_str(), false)
    }

    pub fn set_grouped_track(&mut self, entity: &str, grouped: bool) {
        self.set_property(entity, Property::Grouped, grouped);
    }

    // --- global layout ---

    pub fn window_size(&self) -> u32 {
        let size = self.store.get_or(SettingKey::global(Property::WindowSize).as_str(), DEFAULT_WINDOW_SIZE as i64);
        u32::try_from(size).unwrap_or(DEFAULT_WINDOW_SIZE).max(1)
    }

    pub fn set_window_size(&mut self, size: u32) {
        let old_size = self.window_size();
        let new_size = size.max(1);
        self.store.store_as(SettingKey::global(Property::WindowSize).as_str(), new_size as i64);
        if old_size != new_size {
            self.events.publish(VisualizationEvent::WindowSizeChanged { old_size, new_size });
        }
    }

    /// The window width used for `sequence`: its own override or the global size.
    pub fn sequence_window_size(&self, sequence: &str) -> u32 {
        self.store
            .get_typed::<i64>(SettingKey::of(sequence, Property::WindowSize).as_str())
            .and_then(|size| u32::try_from(size).ok())
            .filter(|size| *size > 0)
            .unwrap_or_else(|| self.window_size())
    }

    /// `None` removes the override.
    pub fn set_sequence_window_size(&mut self, sequence: &str, size: Option<u32>) {
        let key = SettingKey::of(sequence, Property::WindowSize);
        let old_size = self.sequence_window_size(sequence);
        match size {
            Some(size) => self.store.store_as(key.as_str(), size.max(1) as i64),
            None => {
                self.store.clear(key.as_str());
            }
        }
        let new_size = self.sequence_window_size(sequence);
        if old_size != new_size {
            self.events.publish(VisualizationEvent::WindowSizeChanged { old_size, new_size });
        }
    }

    pub fn margin(&self) -> u32 {
        let margin = self.store.get_or(SettingKey::global(Property::Margin).as_str(), DEFAULT_MARGIN as i64);
        u32::try_from(margin).unwrap_or(DEFAULT_MARGIN)
    }

    pub fn set_margin(&mut self, margin: u32) {
        let old_margin = self.margin();
        self.store.store_as(SettingKey::global(Property::Margin).as_str(), margin as i64);
        if old_margin != margin {
            self.events.publish(VisualizationEvent::MarginChanged { old_margin, new_margin: margin });
        }
    }

    // --- orderings ---

    fn list(&self, property: Property) -> Vec<String> {
        self.store.get_or(SettingKey::global(property).as_str(), Vec::new())
    }

    fn set_list(&mut self, property: Property, names: Vec<String>) {
        self.store.store_as(SettingKey::global(property).as_str(), names);
    }

    /// Track names in display order.
    pub fn track_order(&self) -> Vec<String> {
        self.list(Property::TrackOrder)
    }

    pub fn set_track_order(&mut self, names: Vec<String>) {
        self.set_list(Property::TrackOrder, names);
        self.request_redraw();
    }

    /// Every known track, including hidden ones.
    pub fn master_track_order(&self) -> Vec<String> {
        self.list(Property::MasterTrackOrder)
    }

    pub fn set_master_track_order(&mut self, names: Vec<String>) {
        self.set_list(Property::MasterTrackOrder, names);
    }

    pub fn sequence_order(&self) -> Vec<String> {
        self.list(Property::SequenceOrder)
    }

    pub fn set_sequence_order(&mut self, names: Vec<String>) {
        self.set_list(Property::SequenceOrder, names);
        self.events.publish(VisualizationEvent::SequencesLayoutChanged { sequence: None });
    }

    fn move_in_list(&mut self, property: Property, name: &str, new_position: usize) -> Option<(usize, usize)> {
        let mut names = self.list(property);
        let old_position = names.iter().position(|n| n == name)?;
        let entry = names.remove(old_position);
        let new_position = new_position.min(names.len());
        names.insert(new_position, entry);
        self.set_list(property, names);
        Some((old_position, new_position))
    }

    /// Move a track within the display order. Returns false if it is not listed.
    pub fn move_track(&mut self, track: &str, new_position: usize) -> bool {
        let Some((old_position, new_position)) = self.move_in_list(Property::TrackOrder, track, new_position) else {
            return false;
        };
        if old_position != new_position {
            self.events.publish(VisualizationEvent::TrackReordered {
                track: track.to_string(),
                old_position,
                new_position,
            });
        }
        true
    }

    pub fn move_sequence(&mut self, sequence: &str, new_position: usize) -> bool {
        let Some((old_position, new_position)) = self.move_in_list(Property::SequenceOrder, sequence, new_position) else {
            return false;
        };
        if old_position != new_position {
            self.events.publish(VisualizationEvent::SequenceReordered {
                sequence: sequence.to_string(),
                old_position,
                new_position,
            });
        }
        true
    }

    /// Move every setting of `old` to `new` and substitute the name in place
    /// in the track and sequence orderings.
    pub fn rename_data_item(&mut self, old: &str, new: &str) {
        let moved = self.store.rename_entity(old, new);
        for property in [Property::TrackOrder, Property::MasterTrackOrder, Property::SequenceOrder] {
            let mut names = self.list(property);
            let mut changed = false;
            for name in names.iter_mut().filter(|n| n.as_str() == old) {
                *name = new.to_string();
                changed = true;
            }
            if changed {
                self.set_list(property, names);
            }
        }
        info!("[SETTINGS] Renamed '{}' to '{}' ({} settings)", old, new, moved);
        self.request_redraw();
    }

    /// Convert integer-encoded graph types left in memory to their names.
    /// Values that also have a backing file are rewritten there too.
    pub fn migrate_legacy_values(&mut self) -> usize {
        let suffix = format!(".{}", Property::GraphType.as_str());
        let legacy: Vec<(String, GraphType)> = self
            .store
            .iter()
            .filter(|(key, _)| key.ends_with(&suffix))
            .filter_map(|(key, value)| match value {
                SettingValue::Int(code) => GraphType::from_legacy_code(*code).map(|g| (key.to_string(), g)),
                _ => None,
            })
            .collect();
        for (key, graph) in &legacy {
            let value = graph.into_setting();
            if self.store.has_persistent(key) {
                self.store.store_persistent(key, value);
            } else {
                self.store.store(key, value);
            }
        }
        if !legacy.is_empty() {
            info!("[SETTINGS] Upgraded {} legacy graph type values", legacy.len());
        }
        legacy.len()
    }

    /// Apply the result of a background task on the owning thread.
    pub fn apply_outcome(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Exported { path, count } => {
                info!("[SETTINGS] Exported {} settings to {:?}", count, path);
            }
            TaskOutcome::Imported { values } => {
                info!("[SETTINGS] Importing {} settings", values.len());
                self.store.merge(values);
                self.migrate_legacy_values();
                self.events.publish(VisualizationEvent::SequencesLayoutChanged { sequence: None });
                self.request_redraw();
            }
            TaskOutcome::Reverted { keys } => {
                for key in &keys {
                    self.store.clear(key);
                }
                info!("[SETTINGS] Reverted {} persisted settings to defaults", keys.len());
                self.request_redraw();
            }
        }
    }

    // --- sequence viewports ---

    pub fn sequence(&self, sequence: &str) -> Option<SequenceInfo> {
        self.catalog.sequence(sequence)
    }

    /// Stored zoom levels outside the supported range (from imports or hand
    /// edited files) are clamped and written back.
    pub fn sequence_zoom_level(&mut self, sequence: &str) -> Option<f64> {
        self.sequence(sequence)?;
        let stored = self.get_or_init(sequence, Property::ZoomLevel, |_| DEFAULT_ZOOM_LEVEL);
        let zoom_level = clamp_zoom(stored);
        if zoom_level != stored {
            warn!("[VIEWPORT] {} zoom level {} is unusable, using {}", sequence, stored, zoom_level);
            self.store.store_as(SettingKey::of(sequence, Property::ZoomLevel).as_str(), zoom_level);
        }
        Some(zoom_level)
    }

    /// Set the zoom level without re-anchoring; the current start is re-constrained.
    pub fn set_sequence_zoom_level(&mut self, sequence: &str, zoom_level: f64) -> Option<f64> {
        let start = self.viewport_start(sequence)?;
        let zoom_level = clamp_zoom(zoom_level);
        self.store.store_as(SettingKey::of(sequence, Property::ZoomLevel).as_str(), zoom_level);
        self.set_sequence_viewport_start(sequence, start)?;
        Some(zoom_level)
    }

    pub fn sequence_orientation(&mut self, sequence: &str) -> Option<Orientation> {
        let info = self.sequence(sequence)?;
        Some(self.get_or_init(sequence, Property::Orientation, |_| info.strand))
    }

    pub fn set_sequence_orientation(&mut self, sequence: &str, orientation: Orientation) {
        self.apply(sequence, Property::Orientation, orientation.into_setting());
        self.events.publish(VisualizationEvent::SequencesLayoutChanged {
            sequence: Some(sequence.to_string()),
        });
    }

    pub fn set_sequence_orientation_batch<S: AsRef<str>>(&mut self, sequences: &[S], orientation: Orientation) {
        for sequence in sequences {
            self.apply(sequence.as_ref(), Property::Orientation, orientation.into_setting());
        }
        self.events.publish(VisualizationEvent::SequencesLayoutChanged { sequence: None });
    }

    pub fn sequence_alignment(&mut self, sequence: &str) -> Option<Alignment> {
        self.sequence(sequence)?;
        Some(self.get_or_init(sequence, Property::Alignment, |_| Alignment::None))
    }

    pub fn set_sequence_alignment(&mut self, sequence: &str, alignment: Alignment) {
        self.apply(sequence, Property::Alignment, alignment.into_setting());
        self.events.publish(VisualizationEvent::SequencesLayoutChanged {
            sequence: Some(sequence.to_string()),
        });
    }

    pub fn set_sequence_alignment_batch<S: AsRef<str>>(&mut self, sequences: &[S], alignment: Alignment) {
        for sequence in sequences {
            self.apply(sequence.as_ref(), Property::Alignment, alignment.into_setting());
        }
        self.events.publish(VisualizationEvent::SequencesLayoutChanged { sequence: None });
    }

    pub fn is_sequence_constrained(&mut self, sequence: &str) -> Option<bool> {
        self.sequence(sequence)?;
        Some(self.get_or_init(sequence, Property::Constrained, |_| true))
    }

    pub fn set_sequence_constrained(&mut self, sequence: &str, constrained: bool) {
        self.apply(sequence, Property::Constrained, constrained.into_setting());
    }

    /// Current viewport of `sequence`, or `None` for an unknown sequence.
    pub fn viewport(&mut self, sequence: &str) -> Option<Viewport> {
        let info = self.sequence(sequence)?;
        let zoom_level = self.sequence_zoom_level(sequence)?;
        let orientation = self.sequence_orientation(sequence)?;
        let start = self.get_or_init(sequence, Property::ViewportStart, |_| info.region_start);
        Some(Viewport::new(start, zoom_level, orientation, self.sequence_window_size(sequence)))
    }

    pub fn viewport_start(&mut self, sequence: &str) -> Option<i64> {
        self.viewport(sequence).map(|v| v.start)
    }

    pub fn viewport_end(&mut self, sequence: &str) -> Option<i64> {
        self.viewport(sequence).map(|v| v.end())
    }

    pub fn genomic_from_screen(&mut self, sequence: &str, x: i64) -> Option<[i64; 2]> {
        self.viewport(sequence).map(|v| v.genomic_from_screen(x))
    }

    pub fn screen_from_genomic(&mut self, sequence: &str, genomic: i64) -> Option<[i64; 2]> {
        self.viewport(sequence).map(|v| v.screen_from_genomic(genomic))
    }

    /// Move the viewport. Constrained sequences are clamped:
    ///
    /// - a sequence that fits in the window may not be moved partly out of view;
    /// - a larger sequence must fill the whole window.
    ///
    /// Returns the start actually applied.
    pub fn set_sequence_viewport_start(&mut self, sequence: &str, start: i64) -> Option<i64> {
        let info = self.sequence(sequence)?;
        let view = self.viewport(sequence)?;
        let start = if self.is_sequence_constrained(sequence)? {
            constrain_start(&info, view.visible_bases(), start)
        } else {
            start
        };
        debug!("[VIEWPORT] {} start -> {}", sequence, start);
        self.store.store_as(SettingKey::of(sequence, Property::ViewportStart).as_str(), start);
        self.request_redraw();
        Some(start)
    }

    /// Show `start..=end` across the window. The zoom level is derived from the span.
    pub fn set_viewport(&mut self, sequence: &str, start: i64, end: i64) -> Option<Viewport> {
        self.sequence(sequence)?;
        let (start, end) = (start.min(end), start.max(end));
        let orientation = self.sequence_orientation(sequence)?;
        let spanning = Viewport::spanning(start, end, orientation, self.sequence_window_size(sequence));
        self.store.store_as(
            SettingKey::of(sequence, Property::ZoomLevel).as_str(),
            clamp_zoom(spanning.zoom_level),
        );
        self.set_sequence_viewport_start(sequence, start)?;
        self.viewport(sequence)
    }

    /// Scroll so that `genomic` is drawn at `pixel`.
    pub fn align_viewport(&mut self, sequence: &str, genomic: i64, pixel: i64, anchor: Anchor) -> Option<i64> {
        let view = self.viewport(sequence)?;
        let start = view.start_for_anchor(genomic, pixel, anchor);
        self.set_sequence_viewport_start(sequence, start)
    }

    pub fn zoom_in(&mut self, sequence: &str, granularity: Granularity) -> Option<f64> {
        let current = self.sequence_zoom_level(sequence)?;
        self.zoom_to(sequence, next_zoom_in(current, granularity))
    }

    pub fn zoom_out(&mut self, sequence: &str, granularity: Granularity) -> Option<f64> {
        let current = self.sequence_zoom_level(sequence)?;
        self.zoom_to(sequence, next_zoom_out(current, granularity))
    }

    /// Change zoom, keeping the point named by the sequence's alignment fixed on
    /// screen: the left edge, the right edge, the TSS, or the center.
    pub fn zoom_to(&mut self, sequence: &str, zoom_level: f64) -> Option<f64> {
        let info = self.sequence(sequence)?;
        let alignment = self.sequence_alignment(sequence)?;
        let before = self.viewport(sequence)?;
        let last_pixel = before.window_size as i64 - 1;
        let direct = before.orientation == Orientation::Direct;

        let center = || {
            let pixel = last_pixel / 2;
            let range = before.genomic_from_screen(pixel);
            ((range[0] + range[1]) / 2, pixel, Anchor::Center)
        };
        let (genomic, pixel, anchor) = match alignment {
            Alignment::Left => {
                let range = before.genomic_from_screen(0);
                (if direct { range[0] } else { range[1] }, 0, Anchor::Left)
            }
            Alignment::Right => {
                let range = before.genomic_from_screen(last_pixel);
                (if direct { range[1] } else { range[0] }, last_pixel, Anchor::Right)
            }
            Alignment::Tss => match info.tss.filter(|tss| before.contains(*tss)) {
                Some(tss) => {
                    let pixels = before.screen_from_genomic(tss);
                    (tss, (pixels[0] + pixels[1]) / 2, Anchor::Center)
                }
                None => center(),
            },
            Alignment::None => center(),
        };

        let zoom_level = clamp_zoom(zoom_level);
        self.store.store_as(SettingKey::of(sequence, Property::ZoomLevel).as_str(), zoom_level);
        let after = Viewport { zoom_level, ..before };
        self.set_sequence_viewport_start(sequence, after.start_for_anchor(genomic, pixel, anchor))?;
        Some(zoom_level)
    }
}

/// Clamp a proposed start for a constrained viewport showing `window_bases` bases.
fn constrain_start(info: &SequenceInfo, window_bases: i64, start: i64) -> i64 {
    let pinned_end = info.region_end - window_bases + 1;
    if info.size() <= window_bases {
        start.clamp(pinned_end, info.region_start)
    } else {
        start.clamp(info.region_start, pinned_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Catalog, DataItem};
    use std::collections::BTreeMap;

    fn catalog() -> Catalog {
        let mut catalog = Catalog::default();
        catalog.insert_sequence(SequenceInfo::new("seq1", "chr1", 1000, 100_000));
        let mut small = SequenceInfo::new("small", "chr2", 500, 599);
        small.tss = Some(550);
        catalog.insert_sequence(small);
        let mut rev = SequenceInfo::new("rev", "chr3", 1, 50_000);
        rev.strand = Orientation::Reverse;
        rev.tss = Some(20_000);
        catalog.insert_sequence(rev);
        catalog.insert_track("DNA", TrackKind::Dna);
        catalog.insert_track("conservation", TrackKind::Numeric);
        catalog.insert_track("genes", TrackKind::Region);
        catalog.insert("motifs", DataItem::Other);
        catalog
    }

    fn settings() -> VisualizationSettings {
        VisualizationSettings::new(SettingsStore::new(), Box::new(catalog()))
    }

    fn redraws(rx: &Receiver<VisualizationEvent>) -> usize {
        rx.try_iter().filter(|e| *e == VisualizationEvent::RedrawRequested).count()
    }

    #[test]
    fn test_defaults_depend_on_track_kind() {
        let mut s = settings();
        assert_eq!(s.foreground_color("DNA"), Color::BLACK);
        assert_eq!(s.background_color("DNA"), Color::WHITE);
        assert_eq!(s.foreground_color("conservation"), Color::BLUE);
        assert!(s.track_height("conservation") > s.track_height("genes"), "Numeric tracks are taller");
        assert_eq!(s.graph_type("DNA"), GraphType::Dna);
        assert_eq!(s.graph_type("genes"), GraphType::Region);
        assert_eq!(s.connector_type("genes"), ConnectorType::None);
        assert!(!s.is_expanded("genes"));
    }

    #[test]
    fn test_getter_stores_computed_default() {
        let mut s = settings();
        assert!(!s.store().contains("conservation.trackHeight"));
        let height = s.track_height("conservation");
        assert_eq!(
            s.store().get("conservation.trackHeight"),
            Some(&SettingValue::Int(height as i64))
        );
    }

    #[test]
    fn test_foreground_change_invalidates_gradient() {
        let mut s = settings();
        let before = s.color_gradient("conservation");
        assert_eq!(before.base_color(), Color::BLUE);

        s.set_foreground_color("conservation", Color::RED);
        assert!(!s.store().contains("conservation.colorGradient"), "Cached gradient cleared");
        assert_eq!(s.color_gradient("conservation").base_color(), Color::RED);
    }

    #[test]
    fn test_raw_color_writes_do_not_leave_stale_gradient() {
        let mut s = settings();
        s.color_gradient("X");
        s.store_mut().store("X.foregroundColor", SettingValue::Color(Color::RED));
        s.store_mut().store("X.backgroundColor", SettingValue::Color(Color::BLUE));
        let gradient = s.color_gradient("X");
        assert_eq!(gradient.from, Color::BLUE);
        assert_eq!(gradient.to, Color::RED);
    }

    #[test]
    fn test_background_change_invalidates_both_gradients() {
        let mut s = settings();
        s.color_gradient("conservation");
        s.secondary_color_gradient("conservation");
        s.set_background_color("conservation", Color::BLACK);
        assert!(!s.store().contains("conservation.colorGradient"));
        assert!(!s.store().contains("conservation.secondaryColorGradient"));
        assert_eq!(s.secondary_color_gradient("conservation").from, Color::BLACK);
    }

    #[test]
    fn test_batch_setter_redraws_once() {
        let mut s = settings();
        let rx = s.subscribe();
        let tracks = ["DNA", "conservation", "genes"];
        s.set_foreground_color_batch(&tracks, Color::GRAY);
        assert_eq!(redraws(&rx), 1);
        for track in tracks {
            assert_eq!(s.foreground_color(track), Color::GRAY);
        }

        s.set_track_visible_batch(&tracks, false);
        s.set_track_height_batch(&tracks, 40);
        assert_eq!(redraws(&rx), 2, "One redraw per batch");

        s.set_foreground_color("DNA", Color::BLACK);
        s.set_foreground_color("genes", Color::BLACK);
        assert_eq!(redraws(&rx), 2, "Single setters redraw each time");
    }

    #[test]
    fn test_visibility_absence_means_visible() {
        let mut s = settings();
        assert!(s.is_track_visible("genes"));
        s.set_track_visible("genes", false);
        assert!(!s.is_track_visible("genes"));
        s.set_track_visible("genes", true);
        assert!(s.is_track_visible("genes"));
        assert!(!s.store().contains("genes.visible"), "Visible is stored as absence");
    }

    #[test]
    fn test_rename_migrates_keys_and_keeps_positions() {
        let mut s = settings();
        s.set_track_height("trackA", 44);
        s.set_track_order(vec!["DNA".into(), "trackA".into(), "genes".into()]);
        s.set_master_track_order(vec!["trackA".into(), "DNA".into(), "genes".into()]);

        s.rename_data_item("trackA", "trackB");

        assert_eq!(s.store().get("trackB.trackHeight"), Some(&SettingValue::Int(44)));
        assert!(!s.store().contains("trackA.trackHeight"));
        assert_eq!(s.track_order(), vec!["DNA", "trackB", "genes"]);
        assert_eq!(s.master_track_order(), vec!["trackB", "DNA", "genes"]);
    }

    #[test]
    fn test_move_track_reports_positions() {
        let mut s = settings();
        s.set_track_order(vec!["a".into(), "b".into(), "c".into()]);
        let rx = s.subscribe();

        assert!(s.move_track("a", 2));
        assert_eq!(s.track_order(), vec!["b", "c", "a"]);
        assert!(!s.move_track("missing", 0));
        assert_eq!(
            rx.try_recv(),
            Ok(VisualizationEvent::TrackReordered { track: "a".into(), old_position: 0, new_position: 2 })
        );
    }

    #[test]
    fn test_move_sequence_reports_positions() {
        let mut s = settings();
        s.set_sequence_order(vec!["seq1".into(), "small".into(), "rev".into()]);
        let rx = s.subscribe();
        assert!(s.move_sequence("rev", 0));
        assert_eq!(s.sequence_order(), vec!["rev", "seq1", "small"]);
        assert_eq!(
            rx.try_recv(),
            Ok(VisualizationEvent::SequenceReordered { sequence: "rev".into(), old_position: 2, new_position: 0 })
        );
    }

    #[test]
    fn test_window_and_margin_events() {
        let mut s = settings();
        let rx = s.subscribe();
        assert_eq!(s.window_size(), DEFAULT_WINDOW_SIZE);
        s.set_window_size(900);
        s.set_window_size(900);
        s.set_margin(20);
        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                VisualizationEvent::WindowSizeChanged { old_size: 700, new_size: 900 },
                VisualizationEvent::MarginChanged { old_margin: DEFAULT_MARGIN, new_margin: 20 },
            ]
        );
        s.set_sequence_window_size("seq1", Some(300));
        assert_eq!(s.sequence_window_size("seq1"), 300);
        assert_eq!(s.sequence_window_size("small"), 900);
        s.set_sequence_window_size("seq1", None);
        assert_eq!(s.sequence_window_size("seq1"), 900);
    }

    #[test]
    fn test_legacy_graph_type_upgraded_at_load() {
        let mut store = SettingsStore::new();
        store.store("conservation.graphType", SettingValue::Int(GraphType::Line.legacy_code()));
        store.store("genes.graphType", SettingValue::Int(99));
        let mut s = VisualizationSettings::new(store, Box::new(catalog()));
        assert_eq!(
            s.store().get("conservation.graphType"),
            Some(&SettingValue::Text("line".into())),
            "Integer code rewritten as name"
        );
        assert_eq!(s.graph_type("conservation"), GraphType::Line);
        assert_eq!(s.migrate_legacy_values(), 0, "Migration is one-way");
    }

    #[test]
    fn test_legacy_graph_type_rewrites_backing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let mut seed = SettingsStore::with_persistence(tmp.path());
        seed.store_persistent("conservation.graphType", SettingValue::Text("heatmap".into()));

        let mut store = SettingsStore::with_persistence(tmp.path());
        store.store("conservation.graphType", SettingValue::Int(GraphType::Gradient.legacy_code()));
        let s = VisualizationSettings::new(store, Box::new(catalog()));
        assert_eq!(s.store().get("conservation.graphType"), Some(&SettingValue::Text("gradient".into())));

        let mut reopened = SettingsStore::with_persistence(tmp.path());
        assert_eq!(
            reopened.get_persistent("conservation.graphType"),
            Some(SettingValue::Text("gradient".into()))
        );
    }

    #[test]
    fn test_concrete_viewport_scenarios() {
        let mut s = settings();
        assert_eq!(s.set_sequence_viewport_start("seq1", 1000), Some(1000));
        assert_eq!(s.viewport_end("seq1"), Some(1699));
        assert_eq!(s.genomic_from_screen("seq1", 0), Some([1000, 1000]));
        assert_eq!(s.genomic_from_screen("seq1", 699), Some([1699, 1699]));

        s.set_sequence_zoom_level("seq1", 50.0);
        assert_eq!(s.genomic_from_screen("seq1", 0), Some([1000, 1001]));
    }

    #[test]
    fn test_unknown_sequence_yields_none() {
        let mut s = settings();
        assert_eq!(s.viewport("nope"), None);
        assert_eq!(s.genomic_from_screen("nope", 10), None);
        assert_eq!(s.zoom_in("nope", Granularity::Coarse), None);
        assert_eq!(s.set_sequence_viewport_start("nope", 5), None);
        assert!(!s.store().contains("nope.zoomLevel"));
    }

    #[test]
    fn test_set_viewport_reproduces_span() {
        let mut s = settings();
        for (start, end) in [(2000, 2699), (5000, 5349), (10_000, 11_399), (3000, 3999)] {
            let view = s.set_viewport("seq1", start, end).unwrap();
            assert_eq!(view.start, start);
            assert!((view.end() - end).abs() <= 1, "{start}-{end} became {}", view.end());
        }
    }

    #[test]
    fn test_constrained_oversized_sequence_fills_window() {
        let mut s = settings();
        assert_eq!(s.set_sequence_viewport_start("seq1", -50), Some(1000), "Pinned to sequence start");
        assert_eq!(s.set_sequence_viewport_start("seq1", 99_900), Some(100_000 - 700 + 1));
        assert_eq!(s.viewport_end("seq1"), Some(100_000));

        s.set_sequence_constrained("seq1", false);
        assert_eq!(s.set_sequence_viewport_start("seq1", -50), Some(-50));
    }

    #[test]
    fn test_constrained_small_sequence_stays_in_view() {
        let mut s = settings();
        // 100 bases in a 700 pixel window at zoom 100.
        assert_eq!(s.set_sequence_viewport_start("small", 550), Some(500));
        assert_eq!(s.set_sequence_viewport_start("small", -500), Some(599 - 700 + 1));
        assert_eq!(s.set_sequence_viewport_start("small", 300), Some(300));
        let end = s.viewport_end("small").unwrap();
        assert!(end >= 599);
    }

    #[test]
    fn test_zoom_with_left_alignment_keeps_left_edge() {
        let mut s = settings();
        s.set_sequence_alignment("seq1", Alignment::Left);
        s.set_sequence_viewport_start("seq1", 20_000);
        assert_eq!(s.zoom_in("seq1", Granularity::Coarse), Some(200.0));
        assert_eq!(s.viewport_start("seq1"), Some(20_000));
        assert_eq!(s.zoom_out("seq1", Granularity::Fine), Some(175.0));
        assert_eq!(s.viewport_start("seq1"), Some(20_000));
    }

    #[test]
    fn test_zoom_with_right_alignment_keeps_right_edge() {
        let mut s = settings();
        s.set_sequence_alignment("seq1", Alignment::Right);
        s.set_sequence_viewport_start("seq1", 20_000);
        let end = s.viewport_end("seq1").unwrap();
        s.zoom_in("seq1", Granularity::Coarse);
        assert_eq!(s.viewport_end("seq1"), Some(end));
        s.zoom_out("seq1", Granularity::Coarse);
        s.zoom_out("seq1", Granularity::Coarse);
        assert_eq!(s.sequence_zoom_level("seq1"), Some(75.0));
        assert_eq!(s.viewport_end("seq1"), Some(end));
    }

    #[test]
    fn test_right_edge_stable_across_fine_steps() {
        let mut s = settings();
        s.set_sequence_alignment("seq1", Alignment::Right);
        s.set_sequence_zoom_level("seq1", 250.0);
        s.set_sequence_viewport_start("seq1", 20_000);
        let edge = s.genomic_from_screen("seq1", 699).unwrap()[1];
        for _ in 0..3 {
            let zoom = s.zoom_in("seq1", Granularity::Fine).unwrap();
            assert_eq!(s.genomic_from_screen("seq1", 699).unwrap()[1], edge, "zoom in to {zoom}");
        }
        for _ in 0..10 {
            let zoom = s.zoom_out("seq1", Granularity::Fine).unwrap();
            assert_eq!(s.genomic_from_screen("seq1", 699).unwrap()[1], edge, "zoom out to {zoom}");
        }
    }

    #[test]
    fn test_zoom_out_below_coarse_presets_keeps_zoom() {
        let mut s = settings();
        let view = s.set_viewport("seq1", 1000, 100_000).unwrap();
        assert!(view.zoom_level < 1.0, "Whole sequence is below the first coarse preset");

        let after = s.zoom_out("seq1", Granularity::Coarse).unwrap();
        assert!(after <= view.zoom_level, "zoom out went from {} to {after}", view.zoom_level);
        assert_eq!(s.sequence_zoom_level("seq1"), Some(view.zoom_level));

        let finer = s.zoom_out("seq1", Granularity::Fine).unwrap();
        assert_eq!(finer, 0.5);
    }

    #[test]
    fn test_unusable_stored_zoom_falls_back_to_default() {
        let mut s = settings();
        let mut values = BTreeMap::new();
        values.insert("seq1.zoomLevel".to_string(), SettingValue::Double(0.0));
        s.apply_outcome(TaskOutcome::Imported { values });
        assert_eq!(s.viewport_end("seq1"), Some(1699));
        assert_eq!(
            s.store().get("seq1.zoomLevel"),
            Some(&SettingValue::Double(DEFAULT_ZOOM_LEVEL)),
            "Repaired value is written back"
        );

        s.store_mut().store("seq1.zoomLevel", SettingValue::Double(f64::NAN));
        assert_eq!(s.sequence_zoom_level("seq1"), Some(DEFAULT_ZOOM_LEVEL));
        s.store_mut().store("seq1.zoomLevel", SettingValue::Int(-3));
        assert_eq!(s.genomic_from_screen("seq1", 0), Some([1000, 1000]));
        s.store_mut().store("seq1.zoomLevel", SettingValue::Double(1e12));
        assert_eq!(s.sequence_zoom_level("seq1"), Some(10_000.0), "Clamped to the largest zoom");
    }

    #[test]
    fn test_zoom_without_alignment_keeps_center() {
        let mut s = settings();
        s.set_sequence_viewport_start("seq1", 20_000);
        let center = s.genomic_from_screen("seq1", 349).unwrap()[0];
        s.zoom_in("seq1", Granularity::Coarse);
        let range = s.genomic_from_screen("seq1", 349).unwrap();
        assert!(range[0] <= center && center <= range[1], "{center} moved off center: {range:?}");
    }

    #[test]
    fn test_zoom_with_tss_alignment_keeps_tss_pixel() {
        let mut s = settings();
        s.set_sequence_alignment("rev", Alignment::Tss);
        s.align_viewport("rev", 20_000, 200, Anchor::Center);
        assert_eq!(s.screen_from_genomic("rev", 20_000), Some([200, 200]));
        s.zoom_in("rev", Granularity::Coarse);
        let pixels = s.screen_from_genomic("rev", 20_000).unwrap();
        assert!(pixels[0] <= 200 && 200 <= pixels[1], "TSS drawn at {pixels:?}");
    }

    #[test]
    fn test_orientation_defaults_to_strand_and_publishes_layout() {
        let mut s = settings();
        assert_eq!(s.sequence_orientation("rev"), Some(Orientation::Reverse));
        assert_eq!(s.sequence_orientation("seq1"), Some(Orientation::Direct));
        let rx = s.subscribe();
        s.set_sequence_orientation("seq1", Orientation::Reverse);
        assert_eq!(
            rx.try_recv(),
            Ok(VisualizationEvent::SequencesLayoutChanged { sequence: Some("seq1".into()) })
        );
        s.set_sequence_alignment_batch(&["seq1", "rev"], Alignment::Right);
        assert_eq!(rx.try_iter().count(), 1, "Batch publishes one layout change");
    }

    #[test]
    fn test_apply_outcomes() {
        let mut s = settings();
        let mut values = BTreeMap::new();
        values.insert("genes.graphType".to_string(), SettingValue::Int(GraphType::Heatmap.legacy_code()));
        values.insert("genes.trackHeight".to_string(), SettingValue::Int(50));
        s.apply_outcome(TaskOutcome::Imported { values });
        assert_eq!(s.graph_type("genes"), GraphType::Heatmap);
        assert_eq!(s.track_height("genes"), 50);

        s.apply_outcome(TaskOutcome::Reverted { keys: vec!["genes.trackHeight".into()] });
        assert_eq!(s.track_height("genes"), 20, "Back to the region default");
    }
}
