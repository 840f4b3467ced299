use crate::color::{Color, ColorGradient};
use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;

/// Which strand is drawn left-to-right.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    #[default]
    Direct,
    Reverse,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Direct => "direct",
            Orientation::Reverse => "reverse",
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Orientation::Direct => Orientation::Reverse,
            Orientation::Reverse => Orientation::Direct,
        }
    }
}

impl FromStr for Orientation {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "+" | "1" => Ok(Orientation::Direct),
            "reverse" | "-" | "-1" => Ok(Orientation::Reverse),
            _ => Err(SettingsError::InvalidOrientation(s.to_string())),
        }
    }
}

/// Anchor policy used when a sequence's viewport is re-derived after zooming.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Alignment {
    Left,
    Right,
    Tss,
    #[default]
    None,
}

impl Alignment {
    pub fn as_str(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Right => "right",
            Alignment::Tss => "tss",
            Alignment::None => "none",
        }
    }
}

impl FromStr for Alignment {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(Alignment::Left),
            "right" => Ok(Alignment::Right),
            "tss" => Ok(Alignment::Tss),
            "none" => Ok(Alignment::None),
            _ => Err(SettingsError::InvalidAlignment(s.to_string())),
        }
    }
}

/// Drawing style of a track. Older preference files stored these as integers.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GraphType {
    Filled,
    Line,
    Outlined,
    Gradient,
    Heatmap,
    Region,
    Dna,
}

impl GraphType {
    pub const ALL: [GraphType; 7] = [
        GraphType::Filled,
        GraphType::Line,
        GraphType::Outlined,
        GraphType::Gradient,
        GraphType::Heatmap,
        GraphType::Region,
        GraphType::Dna,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GraphType::Filled => "filled",
            GraphType::Line => "line",
            GraphType::Outlined => "outlined",
            GraphType::Gradient => "gradient",
            GraphType::Heatmap => "heatmap",
            GraphType::Region => "region",
            GraphType::Dna => "dna",
        }
    }

    pub fn legacy_code(self) -> i64 {
        GraphType::ALL.iter().position(|g| *g == self).unwrap_or(0) as i64
    }

    pub fn from_legacy_code(code: i64) -> Option<Self> {
        usize::try_from(code).ok().and_then(|i| GraphType::ALL.get(i).copied())
    }
}

impl FromStr for GraphType {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        GraphType::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == wanted)
            .ok_or_else(|| SettingsError::UnknownGraphType(s.to_string()))
    }
}

/// How the parts of a multi-segment region are joined.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ConnectorType {
    #[default]
    None,
    Line,
    Angled,
    Curved,
}

impl ConnectorType {
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectorType::None => "none",
            ConnectorType::Line => "line",
            ConnectorType::Angled => "angled",
            ConnectorType::Curved => "curved",
        }
    }
}

impl FromStr for ConnectorType {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ConnectorType::None),
            "line" => Ok(ConnectorType::Line),
            "angled" => Ok(ConnectorType::Angled),
            "curved" => Ok(ConnectorType::Curved),
            _ => Err(SettingsError::UnknownConnectorType(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Dna,
    Numeric,
    Region,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SequenceInfo {
    pub name: String,
    pub chromosome: String,
    pub region_start: i64,
    pub region_end: i64,
    pub strand: Orientation,
    pub tss: Option<i64>,
}

impl SequenceInfo {
    pub fn new(name: &str, chromosome: &str, region_start: i64, region_end: i64) -> Self {
        Self {
            name: name.to_string(),
            chromosome: chromosome.to_string(),
            region_start,
            region_end,
            strand: Orientation::Direct,
            tss: None,
        }
    }

    pub fn size(&self) -> i64 {
        self.region_end - self.region_start + 1
    }
}

/// Runtime category of a named entity, used to pick type-appropriate defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DataItem {
    Sequence(SequenceInfo),
    Track(TrackKind),
    Other,
}

impl DataItem {
    pub fn track_kind(&self) -> Option<TrackKind> {
        match self {
            DataItem::Track(kind) => Some(*kind),
            _ => None,
        }
    }
}

/// Entity lookup service: resolves a name to its runtime type.
pub trait DataCatalog {
    fn data_item(&self, name: &str) -> Option<DataItem>;

    fn sequence(&self, name: &str) -> Option<SequenceInfo> {
        match self.data_item(name)? {
            DataItem::Sequence(info) => Some(info),
            _ => None,
        }
    }
}

/// In-memory catalog, enough for the command line tool and tests.
#[derive(Default, Clone, Debug)]
pub struct Catalog {
    items: HashMap<String, DataItem>,
}

impl Catalog {
    pub fn insert_sequence(&mut self, info: SequenceInfo) {
        self.items.insert(info.name.clone(), DataItem::Sequence(info));
    }

    pub fn insert_track(&mut self, name: &str, kind: TrackKind) {
        self.items.insert(name.to_string(), DataItem::Track(kind));
    }

    pub fn insert(&mut self, name: &str, item: DataItem) {
        self.items.insert(name.to_string(), item);
    }
}

impl DataCatalog for Catalog {
    fn data_item(&self, name: &str) -> Option<DataItem> {
        self.items.get(name).cloned()
    }
}

/// A single value in the settings store.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", content = "value")]
pub enum SettingValue {
    Color(Color),
    Int(i64),
    Double(f64),
    Boolean(bool),
    Text(String),
    Gradient(ColorGradient),
    StringSet(BTreeSet<String>),
    StringList(Vec<String>),
    MacroMap(BTreeMap<String, String>),
}

impl SettingValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            SettingValue::Color(_) => "color",
            SettingValue::Int(_) => "int",
            SettingValue::Double(_) => "double",
            SettingValue::Boolean(_) => "boolean",
            SettingValue::Text(_) => "text",
            SettingValue::Gradient(_) => "gradient",
            SettingValue::StringSet(_) => "set",
            SettingValue::StringList(_) => "list",
            SettingValue::MacroMap(_) => "macros",
        }
    }

    /// Parse a value typed on the command line. Lists and sets are comma separated,
    /// macro maps are `name=value` pairs.
    pub fn parse_typed(type_name: &str, text: &str) -> Result<Self, SettingsError> {
        let items = || -> Vec<String> {
            text.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        };
        match type_name.to_ascii_lowercase().as_str() {
            "color" => Color::parse(text).map(SettingValue::Color),
            "int" => text
                .trim()
                .parse()
                .map(SettingValue::Int)
                .map_err(|_| SettingsError::InvalidInteger(text.to_string())),
            "double" => text
                .trim()
                .parse()
                .map(SettingValue::Double)
                .map_err(|_| SettingsError::InvalidNumber(text.to_string())),
            "boolean" => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(SettingValue::Boolean(true)),
                "false" | "no" | "0" => Ok(SettingValue::Boolean(false)),
                _ => Err(SettingsError::InvalidBoolean(text.to_string())),
            },
            "text" => Ok(SettingValue::Text(text.to_string())),
            "set" => Ok(SettingValue::StringSet(items().into_iter().collect())),
            "list" => Ok(SettingValue::StringList(items())),
            "macros" => Ok(SettingValue::MacroMap(
                items()
                    .into_iter()
                    .filter_map(|pair| {
                        let (name, value) = pair.split_once('=')?;
                        Some((name.trim().to_string(), value.trim().to_string()))
                    })
                    .collect(),
            )),
            other => Err(SettingsError::UnknownValueType(other.to_string())),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Color(c) => write!(f, "{c}"),
            SettingValue::Int(v) => write!(f, "{v}"),
            SettingValue::Double(v) => write!(f, "{v}"),
            SettingValue::Boolean(v) => write!(f, "{v}"),
            SettingValue::Text(v) => write!(f, "{v}"),
            SettingValue::Gradient(g) => write!(f, "{} -> {} ({} steps)", g.from, g.to, g.steps),
            SettingValue::StringSet(set) => {
                write!(f, "{}", set.iter().cloned().collect::<Vec<_>>().join(","))
            }
            SettingValue::StringList(list) => write!(f, "{}", list.join(",")),
            SettingValue::MacroMap(map) => {
                let pairs: Vec<String> = map.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "{}", pairs.join(","))
            }
        }
    }
}

/// Conversion between a Rust type and its stored representation.
/// Integers and doubles coerce into each other.
pub trait SettingType: Sized {
    fn from_setting(value: &SettingValue) -> Option<Self>;
    fn into_setting(self) -> SettingValue;
}

impl SettingType for i64 {
    fn from_setting(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Int(v) => Some(*v),
            SettingValue::Double(v) => Some(*v as i64),
            _ => None,
        }
    }
    fn into_setting(self) -> SettingValue {
        SettingValue::Int(self)
    }
}

impl SettingType for f64 {
    fn from_setting(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Double(v) => Some(*v),
            SettingValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }
    fn into_setting(self) -> SettingValue {
        SettingValue::Double(self)
    }
}

impl SettingType for bool {
    fn from_setting(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }
    fn into_setting(self) -> SettingValue {
        SettingValue::Boolean(self)
    }
}

impl SettingType for String {
    fn from_setting(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
    fn into_setting(self) -> SettingValue {
        SettingValue::Text(self)
    }
}

impl SettingType for Color {
    fn from_setting(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Color(c) => Some(*c),
            _ => None,
        }
    }
    fn into_setting(self) -> SettingValue {
        SettingValue::Color(self)
    }
}

impl SettingType for ColorGradient {
    fn from_setting(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::Gradient(g) => Some(*g),
            _ => None,
        }
    }
    fn into_setting(self) -> SettingValue {
        SettingValue::Gradient(self)
    }
}

impl SettingType for Vec<String> {
    fn from_setting(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::StringList(v) => Some(v.clone()),
            _ => None,
        }
    }
    fn into_setting(self) -> SettingValue {
        SettingValue::StringList(self)
    }
}

impl SettingType for BTreeSet<String> {
    fn from_setting(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::StringSet(v) => Some(v.clone()),
            _ => None,
        }
    }
    fn into_setting(self) -> SettingValue {
        SettingValue::StringSet(self)
    }
}

impl SettingType for BTreeMap<String, String> {
    fn from_setting(value: &SettingValue) -> Option<Self> {
        match value {
            SettingValue::MacroMap(v) => Some(v.clone()),
            _ => None,
        }
    }
    fn into_setting(self) -> SettingValue {
        SettingValue::MacroMap(self)
    }
}

// Named enums are stored by name so preference files survive reordering.
macro_rules! text_setting {
    ($($ty:ty),*) => {
        $(
            impl SettingType for $ty {
                fn from_setting(value: &SettingValue) -> Option<Self> {
                    match value {
                        SettingValue::Text(v) => v.parse().ok(),
                        _ => None,
                    }
                }
                fn into_setting(self) -> SettingValue {
                    SettingValue::Text(self.as_str().to_string())
                }
            }
        )*
    };
}

text_setting!(Orientation, Alignment, GraphType, ConnectorType);

/// Property names used by the convenience layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Property {
    ForegroundColor,
    BackgroundColor,
    SecondaryColor,
    BaselineColor,
    TrackHeight,
    GraphType,
    ConnectorType,
    Expanded,
    Visible,
    Grouped,
    ColorGradient,
    SecondaryColorGradient,
    ZoomLevel,
    Orientation,
    Alignment,
    ViewportStart,
    Constrained,
    WindowSize,
    Margin,
    TrackOrder,
    MasterTrackOrder,
    SequenceOrder,
}

impl Property {
    pub fn as_str(self) -> &'static str {
        match self {
            Property::ForegroundColor => "foregroundColor",
            Property::BackgroundColor => "backgroundColor",
            Property::SecondaryColor => "secondaryColor",
            Property::BaselineColor => "baselineColor",
            Property::TrackHeight => "trackHeight",
            Property::GraphType => "graphType",
            Property::ConnectorType => "connectorType",
            Property::Expanded => "expanded",
            Property::Visible => "visible",
            Property::Grouped => "grouped",
            Property::ColorGradient => "colorGradient",
            Property::SecondaryColorGradient => "secondaryColorGradient",
            Property::ZoomLevel => "zoomLevel",
            Property::Orientation => "orientation",
            Property::Alignment => "alignment",
            Property::ViewportStart => "viewPortStart",
            Property::Constrained => "constrained",
            Property::WindowSize => "windowSize",
            Property::Margin => "margin",
            Property::TrackOrder => "trackOrder",
            Property::MasterTrackOrder => "masterTrackOrder",
            Property::SequenceOrder => "sequenceOrder",
        }
    }
}

/// Namespaced settings key: `"property"` or `"entity.property"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SettingKey(String);

impl SettingKey {
    pub fn global(property: Property) -> Self {
        Self(property.as_str().to_string())
    }

    pub fn of(entity: &str, property: Property) -> Self {
        Self(format!("{entity}.{}", property.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SettingKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<SettingKey> for String {
    fn from(key: SettingKey) -> Self {
        key.0
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
