//! Lookup tables of the graph-based seed finder.
//!
//! Three external tables drive the algorithm:
//!
//! - the geometry selection (JSON) restricts seeding to listed volumes or
//!   layers
//! - the layer mapping (CSV) assigns each module a logical layer id and an
//!   eta module number
//! - the connection table (whitespace text) lists which logical layers may
//!   be linked and which pairs of their eta bins are allowed

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracklab_core::ConfigError;
use tracklab_types::GeometryId;

const SELECTION_TABLE: &str = "geometry selection";
const MAPPING_TABLE: &str = "layer mapping";
const CONNECTION_TABLE: &str = "connection";

fn read(path: &Path) -> Result<String, ConfigError> {
    ConfigError::read_file(path)
}

fn malformed(table: &'static str, line: usize, reason: impl Into<String>) -> ConfigError {
    ConfigError::MalformedTable {
        table,
        line,
        reason: reason.into(),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct SelectionEntry {
    pub volume: u32,
    #[serde(default)]
    pub layer: Option<u32>,
    #[serde(default)]
    pub sensitive: Option<u32>,
}

impl SelectionEntry {
    fn matches(&self, id: GeometryId) -> bool {
        self.volume == id.volume
            && self.layer.map_or(true, |layer| layer == id.layer)
            && self.sensitive.map_or(true, |sensitive| sensitive == id.sensitive)
    }
}

/// Modules eligible for seeding.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct GeometrySelection {
    #[serde(rename = "geometry-selection")]
    entries: Vec<SelectionEntry>,
}

impl GeometrySelection {
    pub fn new(entries: Vec<SelectionEntry>) -> Self {
        Self { entries }
    }

    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(input).map_err(|e| malformed(SELECTION_TABLE, e.line(), e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_json_str(&read(path)?)
    }

    pub fn selects(&self, id: GeometryId) -> bool {
        self.entries.iter().any(|entry| entry.matches(id))
    }

    pub fn entries(&self) -> &[SelectionEntry] {
        &self.entries
    }
}

/// Logical layer assignment of a module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerCode {
    pub layer_id: u32,
    pub eta_module: u32,
}

impl LayerCode {
    /// Identifier of the logical layer the module belongs to.
    pub fn combined_id(&self) -> u32 {
        self.layer_id * 1000 + self.eta_module
    }
}

/// Module to logical layer mapping.
///
/// Rows are keyed by (volume·100 + layer, module); module 0 covers the
/// whole layer and takes precedence over per-module rows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LayerMapping {
    entries: HashMap<(u32, u32), LayerCode>,
}

impl LayerMapping {
    /// Parse the CSV form `volume,layer,module,_,_,layer_id,eta_module,...`.
    ///
    /// Blank lines, `#` comments and a leading header row are skipped.
    pub fn from_csv_str(input: &str) -> Result<Self, ConfigError> {
        let mut entries = HashMap::new();
        for (number, line) in input.lines().enumerate() {
            let line_number = number + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let cells: Vec<&str> = line.split(',').map(str::trim).collect();
            let is_header = entries.is_empty() && cells[0].parse::<u32>().is_err();
            if is_header {
                continue;
            }
            if cells.len() < 7 {
                return Err(malformed(
                    MAPPING_TABLE,
                    line_number,
                    format!("expected at least 7 columns, found {}", cells.len()),
                ));
            }
            let cell = |i: usize| {
                cells[i].parse::<u32>().map_err(|_| {
                    malformed(
                        MAPPING_TABLE,
                        line_number,
                        format!("column {} is not an unsigned integer: '{}'", i + 1, cells[i]),
                    )
                })
            };
            let key = (cell(0)? * 100 + cell(1)?, cell(2)?);
            let code = LayerCode {
                layer_id: cell(5)?,
                eta_module: cell(6)?,
            };
            if entries.insert(key, code).is_some() {
                return Err(malformed(MAPPING_TABLE, line_number, "duplicate module entry"));
            }
        }
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_csv_str(&read(path)?)
    }

    pub fn insert(&mut self, volume: u32, layer: u32, module: u32, code: LayerCode) {
        self.entries.insert((volume * 100 + layer, module), code);
    }

    /// Logical layer of a module. Modules mapped to layer id 0 have no
    /// logical layer.
    pub fn lookup(&self, id: GeometryId) -> Option<LayerCode> {
        let joint = id.volume * 100 + id.layer;
        self.entries
            .get(&(joint, 0))
            .or_else(|| self.entries.get(&(joint, id.sensitive)))
            .copied()
            .filter(|code| code.layer_id != 0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An allowed link from an outer (source) to an inner (destination)
/// logical layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    pub stage: u32,
    pub src: u32,
    pub dst: u32,
    /// `height` rows indexed by source eta bin, `width` columns by
    /// destination eta bin.
    bins: Vec<Vec<bool>>,
}

impl Connection {
    pub fn new(stage: u32, src: u32, dst: u32, bins: Vec<Vec<bool>>) -> Self {
        Self {
            stage,
            src,
            dst,
            bins,
        }
    }

    /// A connection allowing every bin pair.
    pub fn open(stage: u32, src: u32, dst: u32) -> Self {
        Self::new(stage, src, dst, vec![vec![true]])
    }

    /// Whether source bin `src_bin` of `src_bins` may link to destination
    /// bin `dst_bin` of `dst_bins`.
    ///
    /// The table resolution need not match the layer binning; bins are
    /// mapped by their fractional position.
    pub fn allows(&self, src_bin: usize, src_bins: usize, dst_bin: usize, dst_bins: usize) -> bool {
        let height = self.bins.len();
        let Some(width) = self.bins.first().map(Vec::len) else {
            return false;
        };
        let scale = |bin: usize, bins: usize, size: usize| {
            let fraction = (bin as f64 + 0.5) / bins.max(1) as f64;
            ((fraction * size as f64) as usize).min(size.saturating_sub(1))
        };
        let row = scale(src_bin, src_bins, height);
        let column = scale(dst_bin, dst_bins, width);
        self.bins
            .get(row)
            .and_then(|r| r.get(column))
            .copied()
            .unwrap_or(false)
    }
}

/// Parsed connection table.
#[derive(Clone, Debug, PartialEq)]
pub struct ConnectionTable {
    pub eta_bin_width: f64,
    pub connections: Vec<Connection>,
}

struct Tokens<'a> {
    tokens: Vec<(usize, &'a str)>,
    position: usize,
    last_line: usize,
}

impl<'a> Tokens<'a> {
    fn new(input: &'a str) -> Self {
        let tokens: Vec<(usize, &str)> = input
            .lines()
            .enumerate()
            .flat_map(|(i, line)| {
                let content = line.split('#').next().unwrap_or("");
                content.split_whitespace().map(move |token| (i + 1, token))
            })
            .collect();
        let last_line = input.lines().count().max(1);
        Self {
            tokens,
            position: 0,
            last_line,
        }
    }

    fn is_done(&self) -> bool {
        self.position >= self.tokens.len()
    }

    fn next<T: std::str::FromStr>(&mut self, what: &str) -> Result<T, ConfigError> {
        let Some(&(line, token)) = self.tokens.get(self.position) else {
            return Err(malformed(
                CONNECTION_TABLE,
                self.last_line,
                format!("unexpected end of table, expected {what}"),
            ));
        };
        self.position += 1;
        token
            .parse()
            .map_err(|_| malformed(CONNECTION_TABLE, line, format!("invalid {what}: '{token}'")))
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.position)
            .map_or(self.last_line, |(line, _)| *line)
    }
}

impl ConnectionTable {
    /// Parse `n_links eta_bin_width`, then per link
    /// `index stage src dst n_entries height width` and `height` rows of
    /// `width` 0/1 entries.
    pub fn from_str_table(input: &str) -> Result<Self, ConfigError> {
        let mut tokens = Tokens::new(input);
        let n_links: usize = tokens.next("link count")?;
        let eta_bin_width: f64 = tokens.next("eta bin width")?;
        if !(eta_bin_width > 0.0) {
            return Err(malformed(CONNECTION_TABLE, 1, "eta bin width must be positive"));
        }

        let mut connections = Vec::with_capacity(n_links);
        for _ in 0..n_links {
            let line = tokens.line();
            let _index: u32 = tokens.next("link index")?;
            let stage: u32 = tokens.next("stage")?;
            let src: u32 = tokens.next("source layer")?;
            let dst: u32 = tokens.next("destination layer")?;
            let n_entries: usize = tokens.next("entry count")?;
            let height: usize = tokens.next("height")?;
            let width: usize = tokens.next("width")?;
            if height == 0 || width == 0 || height * width != n_entries {
                return Err(malformed(
                    CONNECTION_TABLE,
                    line,
                    format!("{n_entries} entries do not fill a {height}x{width} bin table"),
                ));
            }
            let mut bins = Vec::with_capacity(height);
            for _ in 0..height {
                let mut row = Vec::with_capacity(width);
                for _ in 0..width {
                    let entry_line = tokens.line();
                    let entry: u8 = tokens.next("bin entry")?;
                    if entry > 1 {
                        return Err(malformed(
                            CONNECTION_TABLE,
                            entry_line,
                            "bin entries must be 0 or 1",
                        ));
                    }
                    row.push(entry == 1);
                }
                bins.push(row);
            }
            connections.push(Connection::new(stage, src, dst, bins));
        }
        if !tokens.is_done() {
            return Err(malformed(
                CONNECTION_TABLE,
                tokens.line(),
                "trailing content after the last link",
            ));
        }
        Ok(Self {
            eta_bin_width,
            connections,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_str_table(&read(path)?)
    }
}
