//! In-memory hardware doubles for host tests

use std::collections::BTreeMap;
use std::string::{String, ToString};
use std::vec::Vec;

use blocktron_hal::{
    FileSystem, FsError, HttpClient, HttpError, HttpResponse, MountMode, NvmError, NvmKey,
    NvmStorage, SystemControl,
};

/// Non-volatile storage backed by two slots
#[derive(Debug, Default)]
pub struct MemoryNvm {
    slots: [Option<u8>; 2],
    failure: Option<NvmError>,
    writes: Vec<(NvmKey, u8)>,
}

impl MemoryNvm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: NvmKey) -> Option<u8> {
        self.slots[key.as_u8() as usize]
    }

    pub fn set(&mut self, key: NvmKey, value: u8) {
        self.slots[key.as_u8() as usize] = Some(value);
    }

    /// Fail every subsequent operation
    pub fn fail_with(&mut self, error: NvmError) {
        self.failure = Some(error);
    }

    pub fn writes(&self) -> &[(NvmKey, u8)] {
        &self.writes
    }
}

impl NvmStorage for MemoryNvm {
    async fn read(&mut self, key: NvmKey) -> Result<u8, NvmError> {
        if let Some(e) = self.failure {
            return Err(e);
        }
        self.get(key).ok_or(NvmError::NotFound)
    }

    async fn write(&mut self, key: NvmKey, value: u8) -> Result<(), NvmError> {
        if let Some(e) = self.failure {
            return Err(e);
        }
        self.set(key, value);
        self.writes.push((key, value));
        Ok(())
    }
}

/// A recorded filesystem mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsOp {
    Write(String),
    Rename(String, String),
    Remove(String),
}

/// Flat in-memory volume with mount state and fault injection
#[derive(Debug)]
pub struct MemoryFs {
    files: BTreeMap<String, Vec<u8>>,
    mode: MountMode,
    host_access: bool,
    failures: BTreeMap<String, FsError>,
    remount_failure: Option<FsError>,
    remounts: usize,
    mutations_left: Option<usize>,
    ops: Vec<FsOp>,
}

impl MemoryFs {
    fn with_state(mode: MountMode, host_access: bool) -> Self {
        Self {
            files: BTreeMap::new(),
            mode,
            host_access,
            failures: BTreeMap::new(),
            remount_failure: None,
            remounts: 0,
            mutations_left: None,
            ops: Vec::new(),
        }
    }

    /// Writable and hidden from the host
    pub fn writable() -> Self {
        Self::with_state(MountMode::Writable, false)
    }

    /// Read-only and hidden from the host
    pub fn read_only() -> Self {
        Self::with_state(MountMode::ReadOnly, false)
    }

    /// Read-only and exposed to the host, as after a normal boot
    pub fn shared() -> Self {
        Self::with_state(MountMode::ReadOnly, true)
    }

    /// Place a file regardless of mount mode
    pub fn insert(&mut self, path: &str, data: &[u8]) {
        self.files.insert(path.to_string(), data.to_vec());
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|v| v.as_slice())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn paths(&self) -> Vec<&str> {
        self.files.keys().map(|k| k.as_str()).collect()
    }

    /// Fail every operation touching `path`
    pub fn fail_on(&mut self, path: &str, error: FsError) {
        self.failures.insert(path.to_string(), error);
    }

    pub fn clear_failures(&mut self) {
        self.failures.clear();
        self.mutations_left = None;
    }

    pub fn fail_remount(&mut self, error: FsError) {
        self.remount_failure = Some(error);
    }

    pub fn remount_count(&self) -> usize {
        self.remounts
    }

    /// Simulate power loss: after `n` more mutations every mutation fails
    pub fn power_cut_after(&mut self, n: usize) {
        self.mutations_left = Some(n);
    }

    pub fn ops(&self) -> &[FsOp] {
        &self.ops
    }

    fn check(&self, path: &str) -> Result<(), FsError> {
        match self.failures.get(path) {
            Some(e) => Err(*e),
            None => Ok(()),
        }
    }

    fn check_writable(&self, path: &str) -> Result<(), FsError> {
        self.check(path)?;
        if self.mode != MountMode::Writable {
            return Err(FsError::ReadOnly);
        }
        Ok(())
    }

    /// Spend one mutation of the power budget
    fn consume(&mut self) -> Result<(), FsError> {
        match self.mutations_left {
            Some(0) => Err(FsError::Io),
            Some(n) => {
                self.mutations_left = Some(n - 1);
                Ok(())
            }
            None => Ok(()),
        }
    }
}

impl FileSystem for MemoryFs {
    fn exists(&mut self, path: &str) -> bool {
        self.contains(path)
    }

    fn read(&mut self, path: &str, buffer: &mut [u8]) -> Result<usize, FsError> {
        self.check(path)?;
        let data = self.files.get(path).ok_or(FsError::NotFound)?;
        if data.len() > buffer.len() {
            return Err(FsError::BufferTooSmall);
        }
        buffer[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    fn read_at(&mut self, path: &str, offset: usize, buffer: &mut [u8]) -> Result<usize, FsError> {
        self.check(path)?;
        let data = self.files.get(path).ok_or(FsError::NotFound)?;
        let rest = data.get(offset..).unwrap_or(&[]);
        let len = rest.len().min(buffer.len());
        buffer[..len].copy_from_slice(&rest[..len]);
        Ok(len)
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), FsError> {
        self.check_writable(path)?;
        self.consume()?;
        self.files.insert(path.to_string(), data.to_vec());
        self.ops.push(FsOp::Write(path.to_string()));
        Ok(())
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), FsError> {
        self.check(to)?;
        self.check_writable(from)?;
        if self.files.contains_key(to) {
            return Err(FsError::AlreadyExists);
        }
        if !self.files.contains_key(from) {
            return Err(FsError::NotFound);
        }
        self.consume()?;
        if let Some(data) = self.files.remove(from) {
            self.files.insert(to.to_string(), data);
        }
        self.ops
            .push(FsOp::Rename(from.to_string(), to.to_string()));
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<(), FsError> {
        self.check_writable(path)?;
        if !self.files.contains_key(path) {
            return Err(FsError::NotFound);
        }
        self.consume()?;
        self.files.remove(path);
        self.ops.push(FsOp::Remove(path.to_string()));
        Ok(())
    }

    fn mount_mode(&self) -> MountMode {
        self.mode
    }

    fn remount(&mut self, mode: MountMode) -> Result<(), FsError> {
        if let Some(e) = self.remount_failure {
            return Err(e);
        }
        self.remounts += 1;
        self.mode = mode;
        Ok(())
    }

    fn host_access(&self) -> bool {
        self.host_access
    }

    fn set_host_access(&mut self, enabled: bool) -> Result<(), FsError> {
        self.host_access = enabled;
        Ok(())
    }
}

/// HTTP client answering from a fixed table
///
/// URLs without an entry fail with [`HttpError::Connect`].
#[derive(Debug, Default)]
pub struct FakeHttp {
    routes: BTreeMap<String, Result<(u16, Vec<u8>), HttpError>>,
    requests: Vec<(String, u32)>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&mut self, url: &str, status: u16, body: &[u8]) {
        self.routes
            .insert(url.to_string(), Ok((status, body.to_vec())));
    }

    pub fn fail(&mut self, url: &str, error: HttpError) {
        self.routes.insert(url.to_string(), Err(error));
    }

    pub fn requests(&self) -> &[(String, u32)] {
        &self.requests
    }
}

impl HttpClient for FakeHttp {
    async fn get(
        &mut self,
        url: &str,
        timeout_ms: u32,
        body: &mut [u8],
    ) -> Result<HttpResponse, HttpError> {
        self.requests.push((url.to_string(), timeout_ms));
        match self.routes.get(url) {
            Some(Ok((status, data))) => {
                if data.len() > body.len() {
                    return Err(HttpError::BodyTooLarge);
                }
                body[..data.len()].copy_from_slice(data);
                Ok(HttpResponse {
                    status: *status,
                    len: data.len(),
                })
            }
            Some(Err(e)) => Err(*e),
            None => Err(HttpError::Connect),
        }
    }
}

/// System control that counts resets
#[derive(Debug, Default)]
pub struct RecordingSystem {
    pub resets: usize,
}

impl SystemControl for RecordingSystem {
    fn reset(&mut self) {
        self.resets += 1;
    }
}
