use crate::config::{NormalizerOptions, INDEX_FORMAT_VERSION};
use crate::index::SearchIndex;
use anyhow::{bail, Context, Result};
use bincode;
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub version: u32,
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
}

/// On-disk bundle. `version` comes first so it can be checked before the
/// rest is decoded.
#[derive(Serialize)]
struct BundleRef<'a> {
    version: u32,
    options: NormalizerOptions,
    index: &'a SearchIndex,
}

#[derive(Deserialize)]
struct BundleHeader {
    version: u32,
}

#[derive(Deserialize)]
pub struct IndexBundle {
    pub version: u32,
    pub options: NormalizerOptions,
    pub index: SearchIndex,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn index(&self) -> PathBuf { self.root.join("index.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

/// Write `bytes` next to `path` and rename into place.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let mut f = File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn save_index(paths: &IndexPaths, index: &SearchIndex, options: NormalizerOptions) -> Result<MetaFile> {
    create_dir_all(&paths.root)?;
    let bundle = BundleRef { version: INDEX_FORMAT_VERSION, options, index };
    let bytes = bincode::serialize(&bundle)?;
    write_atomic(&paths.index(), &bytes)
        .with_context(|| format!("writing {}", paths.index().display()))?;

    let meta = MetaFile {
        version: INDEX_FORMAT_VERSION,
        num_docs: index.num_docs() as u32,
        num_terms: index.num_terms() as u32,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
    };
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), bytes = bytes.len(), "saved index bundle");
    Ok(meta)
}

pub fn load_index(paths: &IndexPaths) -> Result<IndexBundle> {
    let path = paths.index();
    let mut f = File::open(&path).with_context(|| format!("opening {}", path.display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;

    let header: BundleHeader = bincode::deserialize(&buf).context("reading index bundle header")?;
    if header.version != INDEX_FORMAT_VERSION {
        bail!(
            "index bundle {} has format version {}, expected {}",
            path.display(),
            header.version,
            INDEX_FORMAT_VERSION
        );
    }
    let bundle: IndexBundle = bincode::deserialize(&buf).context("decoding index bundle")?;
    if let Err(err) = bundle.index.validate() {
        bail!("index bundle {} is inconsistent: {err}", path.display());
    }
    tracing::info!(
        num_docs = bundle.index.num_docs(),
        num_terms = bundle.index.num_terms(),
        "loaded index bundle"
    );
    Ok(bundle)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    write_atomic(&paths.meta(), json.as_bytes())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}
