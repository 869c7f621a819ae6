use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use sha2::Digest as _;

/// Query parameters of one render request, in arrival order.
///
/// Values are kept verbatim; the scene decides what they mean. A name that arrives twice keeps
/// its first position and its last value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderRequest {
    params: IndexMap<String, String>,
}

impl RenderRequest {
    /// Build a request from `(name, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = IndexMap::new();
        for (k, v) in pairs {
            params.insert(k.into(), v.into());
        }
        Self { params }
    }

    /// Look up a parameter value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Iterate parameters in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of distinct parameter names.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Return `true` when no parameters were supplied.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameters sorted by name, as threaded into a composition.
    pub fn to_sorted(&self) -> BTreeMap<String, String> {
        self.params
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Order-independent digest of the parameter set.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut sorted: Vec<(&str, &str)> = self.iter().collect();
        sorted.sort_unstable();

        let mut hasher = sha2::Sha256::new();
        hasher.update((sorted.len() as u64).to_le_bytes());
        for (k, v) in sorted {
            write_str(&mut hasher, k);
            write_str(&mut hasher, v);
        }
        Fingerprint(hex(&hasher.finalize()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RenderRequest {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

fn write_str(hasher: &mut sha2::Sha256, s: &str) {
    hasher.update((s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// SHA-256 of a request's sorted parameters, lowercase hex.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Borrow the hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix for log lines.
    pub fn short(&self) -> &str {
        &self.0[..12.min(self.0.len())]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[path = "../tests/unit/request/fingerprint.rs"]
mod tests;
