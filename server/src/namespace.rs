//! In-memory directory tree backing the emulator.
//!
//! Paths are stored in absolute, normalised form (`/a/b`, root is `/`). The
//! JSON documents produced here follow the shapes the real NameNode returns.

use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::hash::{DefaultHasher, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

const SUPERUSER: &str = "hdfs";
const SUPERGROUP: &str = "supergroup";
const DEFAULT_DIR_PERMISSION: &str = "755";
const DEFAULT_FILE_PERMISSION: &str = "644";
const DEFAULT_REPLICATION: u16 = 3;
const BLOCK_SIZE: u64 = 128 * 1024 * 1024;

const XATTR_NAMESPACES: [&str; 4] = ["user.", "trusted.", "system.", "security."];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FsError {
    #[error("File does not exist: {0}")]
    NotFound(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("Parent path is not a directory: {0}")]
    ParentNotDirectory(String),

    #[error("{0} is non empty")]
    NotEmpty(String),

    #[error("{0}")]
    IllegalArgument(String),

    #[error("{0}")]
    XAttr(String),
}

impl FsError {
    /// Java exception name reported in `RemoteException` bodies.
    pub fn exception(&self) -> &'static str {
        match self {
            FsError::NotFound(_) => "FileNotFoundException",
            FsError::AlreadyExists(_) => "FileAlreadyExistsException",
            FsError::ParentNotDirectory(_) => "ParentNotDirectoryException",
            FsError::NotEmpty(_) => "PathIsNotEmptyDirectoryException",
            FsError::IllegalArgument(_) => "IllegalArgumentException",
            FsError::XAttr(_) => "IOException",
        }
    }

    pub fn java_class_name(&self) -> &'static str {
        match self {
            FsError::NotFound(_) => "java.io.FileNotFoundException",
            FsError::AlreadyExists(_) => "org.apache.hadoop.fs.FileAlreadyExistsException",
            FsError::ParentNotDirectory(_) => "org.apache.hadoop.fs.ParentNotDirectoryException",
            FsError::NotEmpty(_) => "org.apache.hadoop.fs.PathIsNotEmptyDirectoryException",
            FsError::IllegalArgument(_) => "java.lang.IllegalArgumentException",
            FsError::XAttr(_) => "java.io.IOException",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Directory,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub data: Vec<u8>,
    pub permission: String,
    pub owner: String,
    pub group: String,
    pub replication: u16,
    pub modification_time: u64,
    pub xattrs: BTreeMap<String, String>,
}

impl Node {
    fn directory(owner: &str, permission: &str) -> Self {
        Self {
            kind: NodeKind::Directory,
            data: Vec::new(),
            permission: permission.to_string(),
            owner: owner.to_string(),
            group: SUPERGROUP.to_string(),
            replication: 0,
            modification_time: now_millis(),
            xattrs: BTreeMap::new(),
        }
    }

    fn file(owner: &str, permission: &str, data: Vec<u8>) -> Self {
        Self {
            kind: NodeKind::File,
            data,
            permission: permission.to_string(),
            owner: owner.to_string(),
            group: SUPERGROUP.to_string(),
            replication: DEFAULT_REPLICATION,
            modification_time: now_millis(),
            xattrs: BTreeMap::new(),
        }
    }

    fn status(&self, path_suffix: &str) -> Value {
        let (kind, block_size) = match self.kind {
            NodeKind::File => ("FILE", BLOCK_SIZE),
            NodeKind::Directory => ("DIRECTORY", 0),
        };
        json!({
            "accessTime": 0,
            "blockSize": block_size,
            "group": self.group,
            "length": self.data.len(),
            "modificationTime": self.modification_time,
            "owner": self.owner,
            "pathSuffix": path_suffix,
            "permission": self.permission,
            "replication": self.replication,
            "type": kind,
        })
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Absolute form of `path`: leading, trailing and repeated separators dropped.
pub fn normalize(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

fn parent_of(key: &str) -> Option<String> {
    if key == "/" {
        return None;
    }
    match key.rsplit_once('/') {
        Some(("", _)) => Some("/".to_string()),
        Some((parent, _)) => Some(parent.to_string()),
        None => None,
    }
}

fn name_of(key: &str) -> &str {
    key.rsplit_once('/').map(|(_, name)| name).unwrap_or(key)
}

fn child_prefix(key: &str) -> String {
    if key == "/" { "/".to_string() } else { format!("{}/", key) }
}

fn validate_xattr_name(name: &str) -> Result<(), FsError> {
    if XATTR_NAMESPACES.iter().any(|ns| name.starts_with(ns) && name.len() > ns.len()) {
        Ok(())
    } else {
        Err(FsError::IllegalArgument(format!(
            "An XAttr name must be prefixed with user/trusted/security/system, followed by a '.': {}",
            name
        )))
    }
}

#[derive(Debug, Clone)]
pub struct Namespace {
    nodes: BTreeMap<String, Node>,
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::directory(SUPERUSER, DEFAULT_DIR_PERMISSION));
        Self { nodes }
    }

    pub fn get(&self, path: &str) -> Option<&Node> {
        self.nodes.get(&normalize(path))
    }

    fn node(&self, key: &str) -> Result<&Node, FsError> {
        self.nodes.get(key).ok_or_else(|| FsError::NotFound(key.to_string()))
    }

    fn node_mut(&mut self, key: &str) -> Result<&mut Node, FsError> {
        self.nodes
            .get_mut(key)
            .ok_or_else(|| FsError::NotFound(key.to_string()))
    }

    fn file(&self, key: &str) -> Result<&Node, FsError> {
        let node = self.node(key)?;
        if node.kind != NodeKind::File {
            return Err(FsError::NotFound(format!("Path is not a file: {}", key)));
        }
        Ok(node)
    }

    /// Keys of `key` and everything below it.
    fn subtree(&self, key: &str) -> Vec<String> {
        let prefix = child_prefix(key);
        let mut keys = vec![key.to_string()];
        keys.extend(
            self.nodes
                .range(prefix.clone()..)
                .take_while(|(k, _)| k.starts_with(&prefix))
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, _)| k.clone()),
        );
        keys
    }

    fn children(&self, key: &str) -> Vec<(&str, &Node)> {
        let prefix = child_prefix(key);
        self.nodes
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter(|(k, _)| k.len() > prefix.len() && !k[prefix.len()..].contains('/'))
            .map(|(k, node)| (name_of(k), node))
            .collect()
    }

    /// Creates every missing ancestor directory of `key`.
    fn ensure_parents(&mut self, key: &str, owner: &str) -> Result<(), FsError> {
        let mut missing = Vec::new();
        let mut cursor = parent_of(key);
        while let Some(dir) = cursor {
            match self.nodes.get(&dir) {
                Some(node) if node.kind == NodeKind::Directory => break,
                Some(_) => return Err(FsError::ParentNotDirectory(dir)),
                None => {
                    cursor = parent_of(&dir);
                    missing.push(dir);
                }
            }
        }
        for dir in missing.into_iter().rev() {
            self.nodes
                .insert(dir, Node::directory(owner, DEFAULT_DIR_PERMISSION));
        }
        Ok(())
    }

    pub fn check_file(&self, path: &str) -> Result<(), FsError> {
        self.file(&normalize(path)).map(|_| ())
    }

    pub fn create(
        &mut self,
        path: &str,
        data: Vec<u8>,
        overwrite: bool,
        permission: Option<&str>,
        owner: &str,
    ) -> Result<(), FsError> {
        let key = normalize(path);
        match self.nodes.get(&key) {
            Some(node) if node.kind == NodeKind::Directory => {
                return Err(FsError::AlreadyExists(format!("{} is a directory", key)));
            }
            Some(_) if !overwrite => return Err(FsError::AlreadyExists(key)),
            _ => {}
        }
        self.ensure_parents(&key, owner)?;
        let permission = permission.unwrap_or(DEFAULT_FILE_PERMISSION);
        self.nodes.insert(key, Node::file(owner, permission, data));
        Ok(())
    }

    pub fn append(&mut self, path: &str, data: &[u8]) -> Result<(), FsError> {
        let key = normalize(path);
        self.file(&key)?;
        let node = self.node_mut(&key)?;
        node.data.extend_from_slice(data);
        node.modification_time = now_millis();
        Ok(())
    }

    pub fn read(&self, path: &str, offset: u64, length: Option<u64>) -> Result<Vec<u8>, FsError> {
        let key = normalize(path);
        let node = self.file(&key)?;
        let len = node.data.len() as u64;
        if offset > len {
            return Err(FsError::IllegalArgument(format!(
                "Offset={} out of the range [0, {}]",
                offset, len
            )));
        }
        let end = match length {
            Some(length) => offset.saturating_add(length).min(len),
            None => len,
        };
        Ok(node.data[offset as usize..end as usize].to_vec())
    }

    pub fn mkdirs(&mut self, path: &str, permission: Option<&str>, owner: &str) -> Result<bool, FsError> {
        let key = normalize(path);
        match self.nodes.get(&key) {
            Some(node) if node.kind == NodeKind::Directory => return Ok(true),
            Some(_) => return Err(FsError::AlreadyExists(format!("Path is not a directory: {}", key))),
            None => {}
        }
        self.ensure_parents(&key, owner)?;
        let permission = permission.unwrap_or(DEFAULT_DIR_PERMISSION);
        self.nodes.insert(key, Node::directory(owner, permission));
        Ok(true)
    }

    pub fn delete(&mut self, path: &str, recursive: bool) -> Result<bool, FsError> {
        let key = normalize(path);
        if key == "/" || !self.nodes.contains_key(&key) {
            return Ok(false);
        }
        let subtree = self.subtree(&key);
        if subtree.len() > 1 && !recursive {
            return Err(FsError::NotEmpty(key));
        }
        for k in subtree {
            self.nodes.remove(&k);
        }
        Ok(true)
    }

    /// Moves `source` (and its subtree) to `destination`. Mirrors the NameNode
    /// by answering `false` instead of failing for the usual conflicts.
    pub fn rename(&mut self, source: &str, destination: &str) -> bool {
        let src = normalize(source);
        let mut dst = normalize(destination);
        if src == "/" || !self.nodes.contains_key(&src) {
            return false;
        }
        if let Some(node) = self.nodes.get(&dst) {
            if node.kind != NodeKind::Directory {
                return false;
            }
            dst = format!("{}{}", child_prefix(&dst), name_of(&src));
            if self.nodes.contains_key(&dst) {
                return false;
            }
        }
        if dst == src || dst.starts_with(&child_prefix(&src)) {
            return false;
        }
        match parent_of(&dst).and_then(|p| self.nodes.get(&p)) {
            Some(parent) if parent.kind == NodeKind::Directory => {}
            _ => return false,
        }

        for key in self.subtree(&src) {
            if let Some(node) = self.nodes.remove(&key) {
                let moved = format!("{}{}", dst, &key[src.len()..]);
                self.nodes.insert(moved, node);
            }
        }
        true
    }

    pub fn status(&self, path: &str) -> Result<Value, FsError> {
        let key = normalize(path);
        Ok(json!({ "FileStatus": self.node(&key)?.status("") }))
    }

    pub fn list(&self, path: &str) -> Result<Value, FsError> {
        let key = normalize(path);
        let node = self.node(&key)?;
        let entries: Vec<Value> = match node.kind {
            NodeKind::File => vec![node.status("")],
            NodeKind::Directory => self
                .children(&key)
                .into_iter()
                .map(|(name, child)| child.status(name))
                .collect(),
        };
        Ok(json!({ "FileStatuses": { "FileStatus": entries } }))
    }

    pub fn content_summary(&self, path: &str) -> Result<Value, FsError> {
        let key = normalize(path);
        self.node(&key)?;
        let (mut directories, mut files, mut length, mut consumed) = (0u64, 0u64, 0u64, 0u64);
        for k in self.subtree(&key) {
            if let Some(node) = self.nodes.get(&k) {
                match node.kind {
                    NodeKind::Directory => directories += 1,
                    NodeKind::File => {
                        files += 1;
                        length += node.data.len() as u64;
                        consumed += node.data.len() as u64 * u64::from(node.replication);
                    }
                }
            }
        }
        Ok(json!({
            "ContentSummary": {
                "directoryCount": directories,
                "fileCount": files,
                "length": length,
                "quota": -1,
                "spaceConsumed": consumed,
                "spaceQuota": -1,
            }
        }))
    }

    /// Content fingerprint. Not an HDFS MD5-of-CRC checksum, only stable for
    /// identical content.
    pub fn checksum(&self, path: &str) -> Result<Value, FsError> {
        let key = normalize(path);
        let node = self.file(&key)?;
        let mut hasher = DefaultHasher::new();
        hasher.write(&node.data);
        let digest = format!("{:016x}", hasher.finish());
        Ok(json!({
            "FileChecksum": {
                "algorithm": "EMULATOR-SIPHASH",
                "bytes": digest,
                "length": digest.len() / 2,
            }
        }))
    }

    pub fn set_permission(&mut self, path: &str, permission: &str) -> Result<(), FsError> {
        if permission.is_empty() || !permission.chars().all(|c| ('0'..='7').contains(&c)) || permission.len() > 4 {
            return Err(FsError::IllegalArgument(format!(
                "Invalid value for webhdfs parameter \"permission\": {}",
                permission
            )));
        }
        let key = normalize(path);
        self.node_mut(&key)?.permission = permission.to_string();
        Ok(())
    }

    pub fn set_owner(&mut self, path: &str, owner: Option<&str>, group: Option<&str>) -> Result<(), FsError> {
        if owner.is_none() && group.is_none() {
            return Err(FsError::IllegalArgument("Both owner and group are empty.".to_string()));
        }
        let key = normalize(path);
        let node = self.node_mut(&key)?;
        if let Some(owner) = owner {
            node.owner = owner.to_string();
        }
        if let Some(group) = group {
            node.group = group.to_string();
        }
        Ok(())
    }

    /// `false` for directories, which carry no replication factor.
    pub fn set_replication(&mut self, path: &str, replication: u16) -> Result<bool, FsError> {
        let key = normalize(path);
        let node = self.node_mut(&key)?;
        if node.kind == NodeKind::Directory {
            return Ok(false);
        }
        node.replication = replication;
        Ok(true)
    }

    pub fn set_xattr(&mut self, path: &str, name: &str, value: &str, flag: &str) -> Result<(), FsError> {
        validate_xattr_name(name)?;
        let key = normalize(path);
        let node = self.node_mut(&key)?;
        let exists = node.xattrs.contains_key(name);
        match flag.to_ascii_uppercase().as_str() {
            "CREATE" if exists => {
                return Err(FsError::XAttr(format!("XAttr: {} already exists. The REPLACE flag must be specified.", name)));
            }
            "REPLACE" if !exists => {
                return Err(FsError::XAttr(format!("XAttr: {} does not exist. The CREATE flag must be specified.", name)));
            }
            "CREATE" | "REPLACE" => {}
            other => {
                return Err(FsError::IllegalArgument(format!(
                    "Invalid value for webhdfs parameter \"flag\": {}",
                    other
                )));
            }
        }
        node.xattrs.insert(name.to_string(), value.to_string());
        Ok(())
    }

    /// Attributes named in `names`, or all of them when `names` is empty.
    pub fn get_xattrs(&self, path: &str, names: &[&str]) -> Result<Value, FsError> {
        let key = normalize(path);
        let node = self.node(&key)?;
        let mut found = Vec::new();
        if names.is_empty() {
            for (name, value) in &node.xattrs {
                found.push(json!({ "name": name, "value": value }));
            }
        } else {
            for name in names {
                let value = node.xattrs.get(*name).ok_or_else(|| {
                    FsError::XAttr("At least one of the attributes provided was not found.".to_string())
                })?;
                found.push(json!({ "name": name, "value": value }));
            }
        }
        Ok(json!({ "XAttrs": found }))
    }

    /// Names are returned as a JSON array encoded inside a string, as the
    /// NameNode does.
    pub fn list_xattrs(&self, path: &str) -> Result<Value, FsError> {
        let key = normalize(path);
        let names: Vec<&String> = self.node(&key)?.xattrs.keys().collect();
        let encoded = serde_json::to_string(&names).unwrap_or_else(|_| "[]".to_string());
        Ok(json!({ "XAttrNames": encoded }))
    }

    pub fn remove_xattr(&mut self, path: &str, name: &str) -> Result<(), FsError> {
        validate_xattr_name(name)?;
        let key = normalize(path);
        let node = self.node_mut(&key)?;
        if node.xattrs.remove(name).is_none() {
            return Err(FsError::XAttr("No matching attributes found for remove operation".to_string()));
        }
        Ok(())
    }
}
