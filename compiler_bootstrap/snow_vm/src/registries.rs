//! Process-global resource registries backing the syscall subsystem: fd
//! table, sockets, epoll, mutexes, conditions, rwlocks, semaphores, threads,
//! processes, and the per-VM environment overlay. Each is a thread-safe
//! `id -> resource` map with `create`/`get`/`remove`, generalized from the
//! `Arc<Mutex<...>>` resource shape the teacher's channel registry uses for
//! its own cross-thread handles.

use std::collections::HashMap;
use std::io::{Read, Seek, Write};
use std::sync::{Arc, Condvar, Mutex, RwLock};

use crate::error::{FaultKind, VmResult};

/// Hands out ids from a single counter shared by the fd table and the
/// socket registry, so the two namespaces never collide (they overlap
/// starting at 3, per spec).
#[derive(Debug, Default)]
pub struct ResourceIds {
    next: Mutex<i64>,
}

impl ResourceIds {
    pub fn starting_at(first: i64) -> Self {
        Self { next: Mutex::new(first) }
    }

    pub fn alloc(&self) -> i64 {
        let mut next = self.next.lock().unwrap();
        let id = *next;
        *next += 1;
        id
    }
}

pub trait ByteChannel: Read + Write + Seek + Send + Sync {}
impl<T: Read + Write + Seek + Send + Sync> ByteChannel for T {}

pub struct FileDescriptor {
    pub channel: Box<dyn ByteChannel>,
    pub origin_path: Option<String>,
}

/// A generic `id -> resource` table with create/get/remove, shared by every
/// registry below. `R` is wrapped in `Arc` so callers can hold a resource
/// across a syscall boundary without holding the table's lock.
pub struct Registry<R> {
    entries: RwLock<HashMap<i64, Arc<R>>>,
    ids: ResourceIds,
}

impl<R> Registry<R> {
    pub fn new(first_id: i64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ids: ResourceIds::starting_at(first_id),
        }
    }

    pub fn create(&self, resource: R) -> i64 {
        let id = self.ids.alloc();
        self.entries.write().unwrap().insert(id, Arc::new(resource));
        id
    }

    pub fn insert_at(&self, id: i64, resource: R) {
        self.entries.write().unwrap().insert(id, Arc::new(resource));
    }

    pub fn get(&self, id: i64) -> VmResult<Arc<R>> {
        self.entries
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(FaultKind::InvalidHandle(id))
    }

    pub fn remove(&self, id: i64) -> VmResult<Arc<R>> {
        self.entries
            .write()
            .unwrap()
            .remove(&id)
            .ok_or(FaultKind::InvalidHandle(id))
    }
}

pub struct EpollInstance {
    /// `fd -> interest bits` (1=READ/ACCEPT, 2=WRITE, 4=CONNECT).
    pub interests: Mutex<HashMap<i64, u8>>,
}

pub struct NamedMutex {
    pub lock: Mutex<()>,
}

pub struct NamedCondition {
    pub condvar: Condvar,
    pub guard: Mutex<()>,
    /// The fd/mutex-registry id this condition is paired with, per spec's
    /// "coordinated with a paired mutex".
    pub paired_mutex: i64,
}

pub struct NamedRwLock {
    pub lock: RwLock<()>,
}

pub struct Semaphore {
    pub permits: Mutex<i64>,
    pub condvar: Condvar,
}

impl Semaphore {
    pub fn new(initial: i64) -> VmResult<Self> {
        if initial < 0 {
            return Err(FaultKind::InvalidInstruction(
                "SEM_CREATE".to_string(),
                "initial permits must be >= 0".to_string(),
            ));
        }
        Ok(Self { permits: Mutex::new(initial), condvar: Condvar::new() })
    }

    pub fn acquire(&self) {
        let mut permits = self.permits.lock().unwrap();
        while *permits == 0 {
            permits = self.condvar.wait(permits).unwrap();
        }
        *permits -= 1;
    }

    pub fn release(&self) {
        let mut permits = self.permits.lock().unwrap();
        *permits += 1;
        self.condvar.notify_one();
    }
}

pub struct ThreadHandle {
    pub join_handle: Mutex<Option<std::thread::JoinHandle<()>>>,
    pub result: Mutex<Option<crate::value::Value>>,
}

pub struct ProcessHandle {
    pub child: Mutex<std::process::Child>,
}

/// Per-VM `key -> value?` overlay on top of the OS environment. `None`
/// entries are tombstones (an explicitly-unset variable), distinct from a
/// key that was never overlaid at all.
#[derive(Default)]
pub struct EnvironmentOverlay {
    overlay: RwLock<HashMap<String, Option<String>>>,
}

impl EnvironmentOverlay {
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(entry) = self.overlay.read().unwrap().get(key) {
            return entry.clone();
        }
        std::env::var(key).ok()
    }

    pub fn set(&self, key: &str, value: String) {
        self.overlay.write().unwrap().insert(key.to_string(), Some(value));
    }

    pub fn unset(&self, key: &str) {
        self.overlay.write().unwrap().insert(key.to_string(), None);
    }

    /// Merged `key -> value` map for handing to a forked child process.
    pub fn snapshot(&self) -> HashMap<String, String> {
        let mut merged: HashMap<String, String> = std::env::vars().collect();
        for (k, v) in self.overlay.read().unwrap().iter() {
            match v {
                Some(value) => {
                    merged.insert(k.clone(), value.clone());
                }
                None => {
                    merged.remove(k);
                }
            }
        }
        merged
    }
}

pub struct Resources {
    pub ids: ResourceIds,
    pub fds: RwLock<HashMap<i64, FileDescriptor>>,
    pub sockets: RwLock<HashMap<i64, FileDescriptor>>,
    pub epolls: Registry<EpollInstance>,
    pub mutexes: Registry<NamedMutex>,
    pub conditions: Registry<NamedCondition>,
    pub rwlocks: Registry<NamedRwLock>,
    pub semaphores: Registry<Semaphore>,
    pub threads: Registry<ThreadHandle>,
    pub processes: Registry<ProcessHandle>,
    pub env: EnvironmentOverlay,
}

impl Resources {
    pub fn new(first_user_fd: i64) -> Self {
        let ids = ResourceIds::starting_at(first_user_fd);
        let mut fds: HashMap<i64, FileDescriptor> = HashMap::new();
        fds.insert(0, FileDescriptor { channel: Box::new(StdinChannel), origin_path: None });
        fds.insert(1, FileDescriptor { channel: Box::new(StdoutChannel), origin_path: None });
        fds.insert(2, FileDescriptor { channel: Box::new(StderrChannel), origin_path: None });
        Self {
            ids,
            fds: RwLock::new(fds),
            sockets: RwLock::new(HashMap::new()),
            epolls: Registry::new(1),
            mutexes: Registry::new(1),
            conditions: Registry::new(1),
            rwlocks: Registry::new(1),
            semaphores: Registry::new(1),
            threads: Registry::new(1),
            processes: Registry::new(1),
            env: EnvironmentOverlay::default(),
        }
    }

    pub fn alloc_fd(&self) -> i64 {
        self.ids.alloc()
    }
}

struct StdinChannel;
struct StdoutChannel;
struct StderrChannel;

impl Read for StdinChannel {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        std::io::stdin().read(buf)
    }
}
impl Write for StdinChannel {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        std::io::sink().write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
impl Seek for StdinChannel {
    fn seek(&mut self, _pos: std::io::SeekFrom) -> std::io::Result<u64> {
        Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "stdin is not seekable"))
    }
}

impl Read for StdoutChannel {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(0)
    }
}
impl Write for StdoutChannel {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        std::io::stdout().write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stdout().flush()
    }
}
impl Seek for StdoutChannel {
    fn seek(&mut self, _pos: std::io::SeekFrom) -> std::io::Result<u64> {
        Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "stdout is not seekable"))
    }
}

impl Read for StderrChannel {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(0)
    }
}
impl Write for StderrChannel {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        std::io::stderr().write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        std::io::stderr().flush()
    }
}
impl Seek for StderrChannel {
    fn seek(&mut self, _pos: std::io::SeekFrom) -> std::io::Result<u64> {
        Err(std::io::Error::new(std::io::ErrorKind::Unsupported, "stderr is not seekable"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_fds_are_preallocated() {
        let res = Resources::new(3);
        assert!(res.fds.read().unwrap().contains_key(&0));
        assert!(res.fds.read().unwrap().contains_key(&1));
        assert!(res.fds.read().unwrap().contains_key(&2));
    }

    #[test]
    fn fd_and_socket_ids_share_one_counter() {
        let res = Resources::new(3);
        let a = res.alloc_fd();
        let b = res.alloc_fd();
        assert_eq!(a, 3);
        assert_eq!(b, 4);
    }

    #[test]
    fn unknown_mutex_id_is_invalid_handle() {
        let res = Resources::new(3);
        assert!(matches!(res.mutexes.get(99), Err(FaultKind::InvalidHandle(99))));
    }

    #[test]
    fn semaphore_rejects_negative_initial_permits() {
        assert!(Semaphore::new(-1).is_err());
    }

    #[test]
    fn environment_overlay_tombstones_shadow_os_env() {
        let env = EnvironmentOverlay::default();
        env.set("SNOW_TEST_VAR", "1".to_string());
        assert_eq!(env.get("SNOW_TEST_VAR"), Some("1".to_string()));
        env.unset("SNOW_TEST_VAR");
        assert_eq!(env.get("SNOW_TEST_VAR"), None);
    }
}
