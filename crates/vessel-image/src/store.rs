//! Content-addressed local image store.
//!
//! On-disk layout under the store root:
//!
//! ```text
//! blobs/<digest>      original layer archives, content-addressed
//! layers/<digest>/    extracted filesystem diffs
//! layers.json         layer index (digest, parent, size)
//! catalog.json        tagged image catalog
//! ```
//!
//! Images and layers are immutable once imported; tags are the only
//! mutable metadata.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use vessel_common::error::{Result, VesselError};
use vessel_common::types::{ImageId, Sha256Digest};

use crate::graph::LayerGraph;
use crate::layer::LayerRecord;

/// Process configuration baked into an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Entrypoint prefix prepended to the command.
    #[serde(default)]
    pub entrypoint: Vec<String>,
    /// Default command run when the container starts.
    #[serde(default)]
    pub cmd: Vec<String>,
    /// Default environment variables.
    #[serde(default)]
    pub env: Vec<(String, String)>,
    /// Working directory for the container process.
    #[serde(default)]
    pub working_dir: Option<String>,
}

/// Entry in the image catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    /// Content-derived identifier (digest of the top layer).
    pub id: ImageId,
    /// Tags pointing at this image (`name:tag` form).
    pub tags: Vec<String>,
    /// Digest of the topmost layer.
    pub top_layer: Sha256Digest,
    /// Process configuration.
    pub config: ImageConfig,
    /// Total size of the image's layer chain in bytes.
    pub size_bytes: u64,
    /// ISO-8601 timestamp of when the image was imported.
    pub created_at: String,
}

/// Content-addressed store of images and layers.
#[derive(Debug)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    /// Opens or initializes the store at the given root.
    ///
    /// # Errors
    ///
    /// Returns an error if the store directories cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in [root.join("blobs"), root.join("layers")] {
            std::fs::create_dir_all(&dir).map_err(|e| VesselError::io(dir.clone(), e))?;
        }
        tracing::info!(path = %root.display(), "image store opened");
        Ok(Self { root })
    }

    /// Returns the store root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the blob path for a layer digest.
    #[must_use]
    pub fn blob_path(&self, digest: &Sha256Digest) -> PathBuf {
        self.root.join("blobs").join(digest.as_hex())
    }

    /// Returns the extracted diff directory for a layer digest.
    #[must_use]
    pub fn layer_dir(&self, digest: &Sha256Digest) -> PathBuf {
        self.root.join("layers").join(digest.as_hex())
    }

    /// Checks whether a layer is present in the store.
    #[must_use]
    pub fn has_layer(&self, digest: &Sha256Digest) -> bool {
        self.layer_dir(digest).exists()
    }

    /// Imports a local tar(.gz) archive as a new layer and image.
    ///
    /// The layer digest is computed from the archive bytes, so importing
    /// identical content is idempotent. `reference` tags the image
    /// (`name` or `name:tag`; the tag defaults to `latest`), moving the
    /// tag if another image held it. `parent` stacks the new layer on an
    /// existing one.
    ///
    /// # Errors
    ///
    /// Returns an error if the archive is unreadable, the parent is
    /// unknown, the parent conflicts with an existing layer record, or the
    /// index files cannot be written.
    pub fn import_archive(
        &self,
        archive: &Path,
        reference: Option<&str>,
        parent: Option<&Sha256Digest>,
        config: ImageConfig,
    ) -> Result<ImageRecord> {
        let digest = crate::digest::hash_file(archive)?;
        let mut layers = self.load_layers()?;

        if let Some(parent) = parent {
            if !layers.iter().any(|l| l.digest == *parent) {
                return Err(VesselError::NotFound {
                    kind: "parent layer",
                    id: parent.to_string(),
                });
            }
        }

        if let Some(existing) = layers.iter().find(|l| l.digest == digest) {
            if existing.parent.as_ref() != parent {
                return Err(VesselError::Config {
                    message: format!("layer {digest} already stored with a different parent"),
                });
            }
        } else {
            let blob = self.blob_path(&digest);
            let _ = std::fs::copy(archive, &blob).map_err(|e| VesselError::io(blob.clone(), e))?;
            crate::layer::unpack_layer(&blob, &self.layer_dir(&digest))?;

            let size_bytes = std::fs::metadata(&blob)
                .map_err(|e| VesselError::io(blob.clone(), e))?
                .len();
            layers.push(LayerRecord {
                digest: digest.clone(),
                parent: parent.cloned(),
                size_bytes,
                created_at: chrono::Utc::now().to_rfc3339(),
            });
            self.save_layers(&layers)?;
        }

        let graph = LayerGraph::from_records(&layers)?;
        let chain = graph.resolve_chain(&digest)?;
        let size_bytes = chain
            .iter()
            .filter_map(|d| layers.iter().find(|l| l.digest == *d))
            .map(|l| l.size_bytes)
            .sum();

        let id = ImageId::from_digest(&digest);
        let mut catalog = self.load_catalog()?;
        if !catalog.iter().any(|img| img.id == id) {
            catalog.push(ImageRecord {
                id: id.clone(),
                tags: Vec::new(),
                top_layer: digest.clone(),
                config,
                size_bytes,
                created_at: chrono::Utc::now().to_rfc3339(),
            });
        }
        if let Some(reference) = reference {
            apply_tag(&mut catalog, &id, &normalize_reference(reference));
        }
        self.save_catalog(&catalog)?;

        tracing::info!(id = %id, digest = %digest, "image imported");
        self.find_record(&catalog, &id)
    }

    /// Resolves an image reference: a tag (`name` or `name:tag`) or a
    /// unique ID prefix.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing matches, or a configuration error if
    /// an ID prefix matches more than one image.
    pub fn resolve(&self, reference: &str) -> Result<ImageRecord> {
        let catalog = self.load_catalog()?;

        let tagged = normalize_reference(reference);
        if let Some(record) = catalog.iter().find(|img| img.tags.contains(&tagged)) {
            return Ok(record.clone());
        }

        let matches: Vec<&ImageRecord> = catalog
            .iter()
            .filter(|img| img.id.as_str().starts_with(reference))
            .collect();
        match matches.as_slice() {
            [record] => Ok((*record).clone()),
            [] => Err(VesselError::NotFound {
                kind: "image",
                id: reference.to_string(),
            }),
            _ => Err(VesselError::Config {
                message: format!("ambiguous image reference: {reference}"),
            }),
        }
    }

    /// Adds a tag to an existing image, moving it if already in use.
    ///
    /// # Errors
    ///
    /// Returns an error if the source reference does not resolve or the
    /// catalog cannot be written.
    pub fn tag(&self, reference: &str, new_tag: &str) -> Result<()> {
        let record = self.resolve(reference)?;
        let mut catalog = self.load_catalog()?;
        apply_tag(&mut catalog, &record.id, &normalize_reference(new_tag));
        self.save_catalog(&catalog)?;
        tracing::info!(id = %record.id, tag = new_tag, "image tagged");
        Ok(())
    }

    /// Removes an image and garbage-collects layers no longer referenced
    /// by any remaining image chain.
    ///
    /// # Errors
    ///
    /// Returns an error if the reference does not resolve or store files
    /// cannot be updated. Callers are responsible for checking that no
    /// container still references the image.
    pub fn remove(&self, reference: &str) -> Result<ImageRecord> {
        let record = self.resolve(reference)?;
        let mut catalog = self.load_catalog()?;
        catalog.retain(|img| img.id != record.id);

        let mut layers = self.load_layers()?;
        let graph = LayerGraph::from_records(&layers)?;
        let mut referenced: Vec<Sha256Digest> = Vec::new();
        for img in &catalog {
            referenced.extend(graph.resolve_chain(&img.top_layer)?);
        }

        // Chains are enumerated in full, so `referenced` already covers
        // every ancestor a remaining image depends on.
        let (kept, orphaned): (Vec<LayerRecord>, Vec<LayerRecord>) = layers
            .drain(..)
            .partition(|l| referenced.contains(&l.digest));
        for orphan in &orphaned {
            let blob = self.blob_path(&orphan.digest);
            if blob.exists() {
                std::fs::remove_file(&blob).map_err(|e| VesselError::io(blob.clone(), e))?;
            }
            let dir = self.layer_dir(&orphan.digest);
            if dir.exists() {
                std::fs::remove_dir_all(&dir).map_err(|e| VesselError::io(dir.clone(), e))?;
            }
            tracing::info!(digest = %orphan.digest, "orphaned layer collected");
        }

        self.save_layers(&kept)?;
        self.save_catalog(&catalog)?;
        tracing::info!(id = %record.id, "image removed");
        Ok(record)
    }

    /// Lists all images in the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be read.
    pub fn list(&self) -> Result<Vec<ImageRecord>> {
        self.load_catalog()
    }

    /// Builds the layer graph from the current layer index.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is unreadable or inconsistent.
    pub fn layer_graph(&self) -> Result<LayerGraph> {
        LayerGraph::from_records(&self.load_layers()?)
    }

    /// Resolves an image's read-only rootfs chain as extracted layer
    /// directories, bottom layer first.
    ///
    /// # Errors
    ///
    /// Returns an error if the chain cannot be resolved or a layer's
    /// extracted directory is missing from disk.
    pub fn rootfs_chain(&self, record: &ImageRecord) -> Result<Vec<PathBuf>> {
        let graph = self.layer_graph()?;
        let chain = graph.resolve_chain(&record.top_layer)?;
        chain
            .iter()
            .map(|digest| {
                let dir = self.layer_dir(digest);
                if dir.exists() {
                    Ok(dir)
                } else {
                    Err(VesselError::NotFound {
                        kind: "layer directory",
                        id: digest.to_string(),
                    })
                }
            })
            .collect()
    }

    fn find_record(&self, catalog: &[ImageRecord], id: &ImageId) -> Result<ImageRecord> {
        catalog
            .iter()
            .find(|img| img.id == *id)
            .cloned()
            .ok_or_else(|| VesselError::NotFound {
                kind: "image",
                id: id.to_string(),
            })
    }

    fn load_layers(&self) -> Result<Vec<LayerRecord>> {
        read_json_list(&self.root.join("layers.json"))
    }

    fn save_layers(&self, layers: &[LayerRecord]) -> Result<()> {
        write_json_list(&self.root.join("layers.json"), layers)
    }

    fn load_catalog(&self) -> Result<Vec<ImageRecord>> {
        read_json_list(&self.root.join("catalog.json"))
    }

    fn save_catalog(&self, catalog: &[ImageRecord]) -> Result<()> {
        write_json_list(&self.root.join("catalog.json"), catalog)
    }
}

/// Normalizes a reference to `name:tag` form, defaulting the tag to `latest`.
#[must_use]
pub fn normalize_reference(reference: &str) -> String {
    if reference.contains(':') {
        reference.to_string()
    } else {
        format!("{reference}:latest")
    }
}

/// Points `tag` at `id`, removing it from any other image.
fn apply_tag(catalog: &mut [ImageRecord], id: &ImageId, tag: &str) {
    for img in catalog.iter_mut() {
        if img.id == *id {
            if !img.tags.iter().any(|t| t == tag) {
                img.tags.push(tag.to_string());
            }
        } else {
            img.tags.retain(|t| t != tag);
        }
    }
}

fn read_json_list<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content =
        std::fs::read_to_string(path).map_err(|e| VesselError::io(path.to_path_buf(), e))?;
    Ok(serde_json::from_str(&content)?)
}

fn write_json_list<T: Serialize>(path: &Path, list: &[T]) -> Result<()> {
    let json = serde_json::to_string_pretty(list)?;
    std::fs::write(path, json).map_err(|e| VesselError::io(path.to_path_buf(), e))
}
