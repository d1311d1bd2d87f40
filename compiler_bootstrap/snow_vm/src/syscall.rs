//! The `SYSCALL <callId> [args…]` gateway: pops arguments from the current
//! frame's operand stack, dispatches to a registered handler keyed by
//! integer id, and pushes the handler's result. Generalized from the
//! teacher's arity-checked `HashMap<name, (fn, arity)>` builtin registry —
//! here keyed by integer id instead of name, since syscalls have no surface
//! identifier in the wire format.

use std::collections::HashMap;
use std::io::{Read, Write};

use crate::error::{FaultKind, VmResult};
use crate::registries::Resources;
use crate::value::Value;

pub type SyscallFn = fn(&Resources, &[Value]) -> VmResult<Vec<Value>>;

pub struct SyscallTable {
    handlers: HashMap<i64, (SyscallFn, &'static str)>,
}

impl SyscallTable {
    pub fn call(&self, id: i64, resources: &Resources, args: &[Value]) -> VmResult<Vec<Value>> {
        let (handler, _name) = self.handlers.get(&id).ok_or(FaultKind::UnknownSyscall(id))?;
        handler(resources, args)
    }

    fn register(&mut self, id: i64, name: &'static str, f: SyscallFn) {
        self.handlers.insert(id, (f, name));
    }
}

impl Default for SyscallTable {
    fn default() -> Self {
        let mut table = Self { handlers: HashMap::new() };
        table.register(0, "write", sys_write);
        table.register(1, "read", sys_read);
        table.register(2, "close", sys_close);
        table.register(3, "dup", sys_dup);
        table.register(4, "getenv", sys_getenv);
        table.register(5, "setenv", sys_setenv);
        table.register(6, "sem_acquire", sys_sem_acquire);
        table.register(7, "sem_release", sys_sem_release);
        table.register(8, "unlink", sys_unimplemented("unlink"));
        table.register(9, "fstat", sys_unimplemented("fstat"));
        table.register(10, "fork", sys_unimplemented("fork"));
        table
    }
}

fn sys_unimplemented(name: &'static str) -> SyscallFn {
    // Each id's closure needs to be a bare fn, so the name is baked into a
    // small dispatch instead of captured state.
    match name {
        "unlink" => |_r, _a| Err(FaultKind::Unimplemented("unlink".to_string())),
        "fstat" => |_r, _a| Err(FaultKind::Unimplemented("fstat".to_string())),
        "fork" => |_r, _a| Err(FaultKind::Unimplemented("fork".to_string())),
        _ => |_r, _a| Err(FaultKind::Unimplemented("unknown".to_string())),
    }
}

fn expect_int(v: &Value) -> VmResult<i64> {
    match v {
        Value::I32(n) => Ok(*n as i64),
        Value::L64(n) => Ok(*n),
        other => Err(FaultKind::TypeMismatch {
            expected: "integer".to_string(),
            found: format!("{:?}", other.width()),
        }),
    }
}

fn expect_str(v: &Value) -> VmResult<&str> {
    match v {
        Value::Str(s) => Ok(s.as_str()),
        other => Err(FaultKind::TypeMismatch {
            expected: "string".to_string(),
            found: format!("{:?}", other.width()),
        }),
    }
}

fn sys_write(resources: &Resources, args: &[Value]) -> VmResult<Vec<Value>> {
    let fd = expect_int(args.first().ok_or(FaultKind::StackUnderflow)?)?;
    let text = expect_str(args.get(1).ok_or(FaultKind::StackUnderflow)?)?;
    let mut fds = resources.fds.write().unwrap();
    let entry = fds.get_mut(&fd).ok_or(FaultKind::InvalidHandle(fd))?;
    entry.channel.write_all(text.as_bytes())?;
    Ok(vec![Value::I32(0)])
}

fn sys_read(resources: &Resources, args: &[Value]) -> VmResult<Vec<Value>> {
    let fd = expect_int(args.first().ok_or(FaultKind::StackUnderflow)?)?;
    let count = expect_int(args.get(1).ok_or(FaultKind::StackUnderflow)?)? as usize;
    let mut fds = resources.fds.write().unwrap();
    let entry = fds.get_mut(&fd).ok_or(FaultKind::InvalidHandle(fd))?;
    let mut buf = vec![0u8; count];
    let n = entry.channel.read(&mut buf)?;
    buf.truncate(n);
    Ok(vec![Value::Str(String::from_utf8_lossy(&buf).into_owned())])
}

fn sys_close(resources: &Resources, args: &[Value]) -> VmResult<Vec<Value>> {
    let fd = expect_int(args.first().ok_or(FaultKind::StackUnderflow)?)?;
    resources.fds.write().unwrap().remove(&fd).ok_or(FaultKind::InvalidHandle(fd))?;
    Ok(vec![Value::I32(0)])
}

fn sys_dup(resources: &Resources, args: &[Value]) -> VmResult<Vec<Value>> {
    let _fd = expect_int(args.first().ok_or(FaultKind::StackUnderflow)?)?;
    // duplicating a live channel handle requires an owned-clone hook the
    // channel trait doesn't expose yet; surfaced as an explicit extension
    // point rather than silently misbehaving.
    Err(FaultKind::Unimplemented("dup".to_string()))
}

fn sys_getenv(resources: &Resources, args: &[Value]) -> VmResult<Vec<Value>> {
    let key = expect_str(args.first().ok_or(FaultKind::StackUnderflow)?)?;
    Ok(vec![resources.env.get(key).map(Value::Str).unwrap_or(Value::Str(String::new()))])
}

fn sys_setenv(resources: &Resources, args: &[Value]) -> VmResult<Vec<Value>> {
    let key = expect_str(args.first().ok_or(FaultKind::StackUnderflow)?)?;
    let value = expect_str(args.get(1).ok_or(FaultKind::StackUnderflow)?)?;
    resources.env.set(key, value.to_string());
    Ok(vec![Value::I32(0)])
}

fn sys_sem_acquire(resources: &Resources, args: &[Value]) -> VmResult<Vec<Value>> {
    let id = expect_int(args.first().ok_or(FaultKind::StackUnderflow)?)?;
    resources.semaphores.get(id)?.acquire();
    Ok(vec![Value::I32(0)])
}

fn sys_sem_release(resources: &Resources, args: &[Value]) -> VmResult<Vec<Value>> {
    let id = expect_int(args.first().ok_or(FaultKind::StackUnderflow)?)?;
    resources.semaphores.get(id)?.release();
    Ok(vec![Value::I32(0)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_syscall_id_is_a_fault() {
        let table = SyscallTable::default();
        let resources = Resources::new(3);
        let err = table.call(999, &resources, &[]).unwrap_err();
        assert!(matches!(err, FaultKind::UnknownSyscall(999)));
    }

    #[test]
    fn write_to_stdout_succeeds() {
        let table = SyscallTable::default();
        let resources = Resources::new(3);
        let result = table
            .call(0, &resources, &[Value::I32(1), Value::Str("hi".to_string())])
            .unwrap();
        assert_eq!(result, vec![Value::I32(0)]);
    }

    #[test]
    fn unlink_is_an_acknowledged_stub() {
        let table = SyscallTable::default();
        let resources = Resources::new(3);
        let err = table.call(8, &resources, &[]).unwrap_err();
        assert!(matches!(err, FaultKind::Unimplemented(_)));
    }

    #[test]
    fn setenv_then_getenv_round_trips() {
        let table = SyscallTable::default();
        let resources = Resources::new(3);
        table
            .call(5, &resources, &[Value::Str("X".to_string()), Value::Str("1".to_string())])
            .unwrap();
        let r = table.call(4, &resources, &[Value::Str("X".to_string())]).unwrap();
        assert_eq!(r, vec![Value::Str("1".to_string())]);
    }
}
