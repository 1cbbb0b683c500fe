//! Denial records: lookup table, sources, and the per-session cache.
//!
//! ACL dumps store explicit deny ACEs in `<workdir>/Relations/*.deny.csv`,
//! UTF-16LE encoded, with the header
//! `dnMaster:START_ID,dnSlave:END_ID,keyword:TYPE`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;

use adcp_core::{DenyRecord, RelationKind};

use crate::error::DenyError;

const RELATIONS_DIR: &str = "Relations";
const DENY_SUFFIX: &str = ".deny.csv";

/// Denials indexed by source name, then target name.
#[derive(Debug, Clone, Default)]
pub struct DenyTable {
    by_source: HashMap<String, HashMap<String, HashSet<RelationKind>>>,
    len: usize,
}

impl DenyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: DenyRecord) -> bool {
        let inserted = self
            .by_source
            .entry(record.source)
            .or_default()
            .entry(record.target)
            .or_default()
            .insert(record.kind);
        if inserted {
            self.len += 1;
        }
        inserted
    }

    pub fn is_denied(&self, source: &str, target: &str, kind: &RelationKind) -> bool {
        self.by_source
            .get(source)
            .and_then(|targets| targets.get(target))
            .is_some_and(|kinds| kinds.contains(kind))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl FromIterator<DenyRecord> for DenyTable {
    fn from_iter<I: IntoIterator<Item = DenyRecord>>(iter: I) -> Self {
        let mut table = Self::new();
        for record in iter {
            table.insert(record);
        }
        table
    }
}

/// Where denial records come from.
#[async_trait]
pub trait DenySource: Send + Sync {
    async fn load(&self) -> Result<Vec<DenyRecord>, DenyError>;

    /// Human-readable origin, for logs.
    fn describe(&self) -> String;
}

/// Denials read from an ACL dump working directory.
#[derive(Debug, Clone)]
pub struct FileDenySource {
    workdir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct DenyRow {
    #[serde(rename = "dnMaster:START_ID")]
    source: String,
    #[serde(rename = "dnSlave:END_ID")]
    target: String,
    #[serde(rename = "keyword:TYPE")]
    kind: String,
}

impl FileDenySource {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
        }
    }

    /// Whether `workdir` looks like an ACL dump directory.
    pub fn is_workdir(workdir: &Path) -> bool {
        workdir.join(RELATIONS_DIR).is_dir()
    }

    fn relations_dir(&self) -> PathBuf {
        self.workdir.join(RELATIONS_DIR)
    }

    /// Deny files, sorted by name.
    async fn deny_files(&self) -> Result<Vec<PathBuf>, DenyError> {
        let dir = self.relations_dir();
        let io_err = |source| DenyError::Io {
            path: dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&dir).await.map_err(io_err)?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            let is_deny = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(DENY_SUFFIX));
            if is_deny {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl DenySource for FileDenySource {
    async fn load(&self) -> Result<Vec<DenyRecord>, DenyError> {
        let mut records = Vec::new();
        for path in self.deny_files().await? {
            let bytes = tokio::fs::read(&path).await.map_err(|source| DenyError::Io {
                path: path.clone(),
                source,
            })?;
            let text = decode_utf16le(&bytes).ok_or_else(|| DenyError::Encoding { path: path.clone() })?;
            let before = records.len();
            parse_deny_csv(&text, &path, &mut records)?;
            tracing::debug!(file = %path.display(), records = records.len() - before, "Deny file loaded");
        }
        Ok(records)
    }

    fn describe(&self) -> String {
        self.relations_dir().display().to_string()
    }
}

/// Denials supplied directly, e.g. by tests or embedding callers.
#[derive(Debug, Clone, Default)]
pub struct StaticDenySource(pub Vec<DenyRecord>);

#[async_trait]
impl DenySource for StaticDenySource {
    async fn load(&self) -> Result<Vec<DenyRecord>, DenyError> {
        Ok(self.0.clone())
    }

    fn describe(&self) -> String {
        format!("{} static records", self.0.len())
    }
}

/// Loads the deny table once per session and shares it across requests.
pub struct DenyCache {
    source: Option<Arc<dyn DenySource>>,
    table: OnceCell<Arc<DenyTable>>,
}

impl DenyCache {
    pub fn new(source: Arc<dyn DenySource>) -> Self {
        Self {
            source: Some(source),
            table: OnceCell::new(),
        }
    }

    /// A cache with no denial data: propagation is skipped.
    pub fn disabled() -> Self {
        Self {
            source: None,
            table: OnceCell::new(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.source.is_some()
    }

    /// The deny table, loading it on first use. A failed load is not cached.
    pub async fn table(&self) -> Result<Option<Arc<DenyTable>>, DenyError> {
        let Some(source) = &self.source else {
            return Ok(None);
        };
        let table = self
            .table
            .get_or_try_init(|| async {
                let records = source.load().await?;
                let table: DenyTable = records.into_iter().collect();
                tracing::info!(origin = %source.describe(), denials = table.len(), "Deny ACEs loaded");
                Ok::<_, DenyError>(Arc::new(table))
            })
            .await?;
        Ok(Some(Arc::clone(table)))
    }
}

impl Default for DenyCache {
    fn default() -> Self {
        Self::disabled()
    }
}

fn decode_utf16le(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let text = String::from_utf16(&units).ok()?;
    Some(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
}

fn parse_deny_csv(text: &str, path: &Path, records: &mut Vec<DenyRecord>) -> Result<(), DenyError> {
    let csv_err = |source| DenyError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    for row in reader.deserialize::<DenyRow>() {
        let row = row.map_err(csv_err)?;
        records.push(DenyRecord::new(row.source, row.target, row.kind.as_str()));
    }
    Ok(())
}
