//! Key and record encoding for LMDB storage.
//!
//! Permission keys are `[len][operation][id:8]`:
//! - the length byte makes `[len][operation]` an exact-match prefix, so a
//!   scan for `/Doc` never picks up `/Docs`
//! - the trailing big-endian id keeps keys unique per operation
//!
//! Records are fixed-width big-endian:
//! `[subject_tag:1][subject:8][scope_tag:1][scope:8][level:4][allow:1]`

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::{PermError, Result};
use crate::model::{EntitiesGroupId, EntityKey, GroupId, Permission, PermissionId, Scope, Subject, UserId};

/// Encoded record size
pub const RECORD_LEN: usize = 23;

/// Longest operation name that fits the one-byte length prefix
pub const MAX_OPERATION_LEN: usize = u8::MAX as usize;

/// Create a 16-byte key from two u64 values
#[inline]
pub fn pair(a: u64, b: u64) -> [u8; 16] {
    let mut k = [0u8; 16];
    k[..8].copy_from_slice(&a.to_be_bytes());
    k[8..].copy_from_slice(&b.to_be_bytes());
    k
}

/// Second half of a [`pair`] key
#[inline]
pub fn pair_second(k: &[u8]) -> Option<u64> {
    let tail: [u8; 8] = k.get(8..16)?.try_into().ok()?;
    Some(u64::from_be_bytes(tail))
}

/// Prefix selecting every record of one operation
pub fn operation_prefix(operation: &str) -> Result<Vec<u8>> {
    if operation.len() > MAX_OPERATION_LEN {
        return Err(PermError::invalid(format!(
            "operation name longer than {} bytes",
            MAX_OPERATION_LEN
        )));
    }
    let mut k = Vec::with_capacity(1 + operation.len() + 8);
    k.push(operation.len() as u8);
    k.extend_from_slice(operation.as_bytes());
    Ok(k)
}

/// Full key of one permission record
pub fn permission_key(operation: &str, id: PermissionId) -> Result<Vec<u8>> {
    let mut k = operation_prefix(operation)?;
    k.extend_from_slice(&id.0.to_be_bytes());
    Ok(k)
}

/// Split a permission key into (operation, id)
pub fn parse_permission_key(bytes: &[u8]) -> Option<(&str, PermissionId)> {
    let len = *bytes.first()? as usize;
    let op = bytes.get(1..1 + len)?;
    let id: [u8; 8] = bytes.get(1 + len..)?.try_into().ok()?;
    Some((std::str::from_utf8(op).ok()?, PermissionId(u64::from_be_bytes(id))))
}

/// Encode everything but the operation and id, which live in the key
pub fn encode_record(p: &Permission) -> Vec<u8> {
    let mut v = Vec::with_capacity(RECORD_LEN);
    let (stag, sid) = match p.subject {
        Subject::User(u) => (0u8, u.0),
        Subject::Group(g) => (1u8, g.0),
    };
    let (ctag, cid) = match p.scope {
        Scope::Global => (0u8, 0),
        Scope::Entity(k) => (1u8, k.0),
        Scope::EntitiesGroup(g) => (2u8, g.0),
    };
    v.push(stag);
    v.extend_from_slice(&sid.to_be_bytes());
    v.push(ctag);
    v.extend_from_slice(&cid.to_be_bytes());
    v.extend_from_slice(&p.level.to_be_bytes());
    v.push(p.allow as u8);
    v
}

/// Rebuild a record from its key and encoded value
pub fn decode_record(key: &[u8], value: &[u8]) -> Result<Permission> {
    let corrupt = |what: &str| PermError::CollaboratorUnavailable(format!("corrupt permission {}", what));
    let (operation, id) = parse_permission_key(key).ok_or_else(|| corrupt("key"))?;
    if value.len() != RECORD_LEN {
        return Err(corrupt("record length"));
    }
    let mut c = Cursor::new(value);
    let mut read = || -> std::io::Result<(u8, u64, u8, u64, i32, u8)> {
        Ok((
            c.read_u8()?,
            c.read_u64::<BigEndian>()?,
            c.read_u8()?,
            c.read_u64::<BigEndian>()?,
            c.read_i32::<BigEndian>()?,
            c.read_u8()?,
        ))
    };
    let (stag, sid, ctag, cid, level, allow) = read().map_err(|_| corrupt("record"))?;
    let subject = match stag {
        0 => Subject::User(UserId(sid)),
        1 => Subject::Group(GroupId(sid)),
        _ => return Err(corrupt("subject tag")),
    };
    let scope = match ctag {
        0 => Scope::Global,
        1 => Scope::Entity(EntityKey(cid)),
        2 => Scope::EntitiesGroup(EntitiesGroupId(cid)),
        _ => return Err(corrupt("scope tag")),
    };
    Ok(Permission { id, subject, scope, operation: operation.to_string(), level, allow: allow != 0 })
}
