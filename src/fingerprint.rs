//! Cache keys for resolution requests.
//!
//! Nothing in this crate caches. A caller that does can key its entries on
//! [`fingerprint`], which is stable across input order and duplicate names.

use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::model::Subject;
use crate::operation::expand_operation_names;
use crate::resolver::Target;

/// SHA-256 over subject, the sorted expanded operation set and target, hex encoded
pub fn fingerprint<S: AsRef<str>>(subject: &Subject, operations: &[S], target: Target) -> Result<String> {
    subject.validate()?;
    let mut names = expand_operation_names(operations)?;
    names.sort();

    let mut hasher = Sha256::new();
    hasher.update(subject.to_string().as_bytes());
    hasher.update([0u8]);
    for n in &names {
        hasher.update(n.as_bytes());
        hasher.update([0u8]);
    }
    match target {
        Target::Global => hasher.update(b"global"),
        Target::Entity(k) => {
            hasher.update(b"entity");
            hasher.update(k.0.to_be_bytes());
        }
    }
    Ok(hex::encode(hasher.finalize()))
}

mod hex {
    pub fn encode(data: impl AsRef<[u8]>) -> String {
        const DIGITS: &[u8; 16] = b"0123456789abcdef";
        let data = data.as_ref();
        let mut s = String::with_capacity(data.len() * 2);
        for &b in data {
            s.push(DIGITS[(b >> 4) as usize] as char);
            s.push(DIGITS[(b & 0xf) as usize] as char);
        }
        s
    }
}
