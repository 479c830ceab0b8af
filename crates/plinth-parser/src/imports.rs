//! Import resolution across blueprint documents
//!
//! Imports are walked depth-first. The identifiers on the current path are
//! kept as an ordered stack so that a cycle can be reported as the exact
//! ring of files that closes it.

use std::collections::HashSet;

use plinth_core::error::Result;
use plinth_core::{BlueprintError, Document};
use tracing::{debug, trace};

use crate::fetch::{is_url, Fetcher};
use crate::yaml::parse_document;

/// Canonical identifier of `reference` as seen from `base_dir`.
///
/// URLs are kept verbatim. Relative paths are joined onto `base_dir` and
/// `.`/`..` components are folded lexically.
pub fn canonicalize(reference: &str, base_dir: Option<&str>) -> String {
    if is_url(reference) {
        return reference.to_string();
    }
    let joined = match base_dir {
        Some(base) if !reference.starts_with('/') && !base.is_empty() => {
            format!("{}/{}", base.trim_end_matches('/'), reference)
        }
        _ => reference.to_string(),
    };
    match split_url(&joined) {
        Some((authority, path)) => format!("{}{}", authority, normalize_path(path)),
        None => normalize_path(&joined),
    }
}

/// Directory part of an identifier, used as the base for its own imports.
pub fn parent_dir(id: &str) -> Option<&str> {
    let (authority_len, path) = match split_url(id) {
        Some((authority, path)) => (authority.len(), path),
        None => (0, id),
    };
    match path.rfind('/') {
        Some(0) => Some(&id[..authority_len + 1]),
        Some(pos) => Some(&id[..authority_len + pos]),
        None if authority_len > 0 => Some(&id[..authority_len]),
        None => None,
    }
}

/// `scheme://host` and the path after it.
fn split_url(id: &str) -> Option<(&str, &str)> {
    if !is_url(id) {
        return None;
    }
    let scheme_end = id.find("://")? + 3;
    let path_start = id[scheme_end..]
        .find('/')
        .map(|i| scheme_end + i)
        .unwrap_or(id.len());
    Some((&id[..path_start], &id[path_start..]))
}

fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    let joined = parts.join("/");
    if absolute {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// Walks the import graph of a root document.
pub struct ImportResolver<'f, F: Fetcher + ?Sized> {
    fetcher: &'f F,
    base_dir: Option<String>,
}

/// Per-call traversal state.
#[derive(Default)]
struct Walk {
    stack: Vec<String>,
    loaded: HashSet<String>,
    ordered: Vec<Document>,
}

impl<'f, F: Fetcher + ?Sized> ImportResolver<'f, F> {
    pub fn new(fetcher: &'f F) -> Self {
        Self {
            fetcher,
            base_dir: None,
        }
    }

    /// Directory relative imports of an in-memory root resolve against.
    pub fn with_base_dir(mut self, base_dir: impl Into<String>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Fetch and parse the root document at `location`, then resolve it.
    pub fn resolve_location(&self, location: &str) -> Result<Vec<Document>> {
        let id = canonicalize(location, self.base_dir.as_deref());
        let text = self.fetch(&id)?;
        self.resolve(parse_document(Some(id), &text)?)
    }

    /// All documents reachable from `root`, dependencies first, `root` last.
    pub fn resolve(&self, root: Document) -> Result<Vec<Document>> {
        debug!(root = root.display_id(), "resolving imports");
        let mut walk = Walk::default();
        if let Some(id) = &root.id {
            walk.stack.push(id.clone());
        }
        self.visit(root, &mut walk)?;
        debug!(documents = walk.ordered.len(), "imports resolved");
        Ok(walk.ordered)
    }

    fn visit(&self, document: Document, walk: &mut Walk) -> Result<()> {
        let base_dir = match &document.id {
            Some(id) => parent_dir(id).map(str::to_string),
            None => self.base_dir.clone(),
        };
        for reference in document.imports()? {
            let id = canonicalize(&reference, base_dir.as_deref());
            if let Some(start) = walk.stack.iter().position(|entry| entry == &id) {
                let mut circular_path = walk.stack[start..].to_vec();
                circular_path.push(id);
                return Err(BlueprintError::CircularImport { circular_path });
            }
            if walk.loaded.contains(&id) {
                trace!(import = %id, "already loaded");
                continue;
            }
            trace!(import = %id, from = document.display_id(), "loading import");
            let text = self.fetch(&id)?;
            let imported = parse_document(Some(id.clone()), &text)?;
            walk.stack.push(id.clone());
            self.visit(imported, walk)?;
            walk.stack.pop();
            walk.loaded.insert(id);
        }
        walk.ordered.push(document);
        Ok(())
    }

    fn fetch(&self, id: &str) -> Result<String> {
        self.fetcher
            .fetch(id)
            .map_err(|e| BlueprintError::BadImportPath {
                location: id.to_string(),
                reason: e.to_string(),
            })
    }
}
