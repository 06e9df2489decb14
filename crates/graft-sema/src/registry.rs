//! Registry of synthesized sum-type instantiations.
//!
//! Every distinct `Result`/`Option` instantiation the transform
//! encounters gets one descriptor, keyed by a mangled name that doubles
//! as the emitted type identifier. Mangling is deterministic and lossy;
//! it is never reversed. Consumers that need the payload types go
//! through [`TypeRegistry::lookup`], which returns the original strings
//! stored at registration time, never a re-parse of the mangled key.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::Serialize;

use graft_ast::Family;

use crate::ty::Ty;

/// One registered sum-type instantiation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SumTypeDescriptor {
    /// The mangled registry key, also the emitted type name.
    pub mangled_name: String,
    /// Which family this instantiation belongs to; the family fixes the
    /// ordered variant tags.
    pub family: Family,
    /// The original type-parameter strings, exactly as resolved. These
    /// are authoritative; the mangled name is derived from them.
    pub payload_types: Vec<String>,
    /// Registration order within this registry (0-based).
    pub seq: u64,
}

impl SumTypeDescriptor {
    /// The instantiation rendered back in source spelling,
    /// e.g. `Result<int, string>`.
    pub fn display_name(&self) -> String {
        format!(
            "{}<{}>",
            self.family.type_name(),
            self.payload_types.join(", ")
        )
    }

    /// The family's variant tags, in declaration order.
    pub fn tags(&self) -> [&'static str; 2] {
        self.family.tags()
    }

    /// Rebuild the instantiation as a structured type from the stored
    /// originals. The mangled name is never parsed apart.
    pub fn to_ty(&self) -> Ty {
        match self.family {
            Family::Option => Ty::option(Ty::parse(&self.payload_types[0])),
            Family::Result => Ty::result(
                Ty::parse(&self.payload_types[0]),
                Ty::parse(&self.payload_types[1]),
            ),
        }
    }
}

/// Outcome of a registration.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub mangled_name: String,
    /// False on a cache hit.
    pub newly_registered: bool,
    /// Set when the re-derivation check failed: the stored originals do
    /// not match the requested ones even though both mangle to the same
    /// key. Possible when an original contains the separator character.
    /// Non-fatal; the stored originals remain authoritative.
    pub collision: Option<MangleCollision>,
}

/// Details of a mangled-name collision, surfaced as a warning.
#[derive(Debug, Clone, PartialEq)]
pub struct MangleCollision {
    pub mangled_name: String,
    pub stored: Vec<String>,
    pub requested: Vec<String>,
}

/// Derive the mangled name for a family instantiation.
///
/// Structural characters collapse to the `_` separator and whitespace is
/// dropped, so the result is a legal host identifier. The function is
/// deterministic and lossy: distinct originals can collide, which is why
/// the originals are stored and the name is never parsed back.
pub fn mangle(family: Family, payloads: &[String]) -> String {
    let mut out = String::from(family.type_name());
    for payload in payloads {
        out.push('_');
        for c in payload.chars() {
            if c.is_alphanumeric() || c == '_' {
                out.push(c);
            } else if !c.is_whitespace() {
                out.push('_');
            }
        }
    }
    out
}

/// Per-file (or per-build, behind [`SharedRegistry`]) store of
/// synthesized sum-type descriptors.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    by_name: FxHashMap<String, SumTypeDescriptor>,
    /// Insertion order, for deterministic emitter output.
    order: Vec<String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instantiation, returning its mangled name.
    ///
    /// Idempotent: identical inputs hit the cache and the registry does
    /// not grow. A cache hit whose stored originals differ from the
    /// requested ones is reported via [`Registration::collision`] and
    /// keeps the stored descriptor.
    pub fn register(&mut self, family: Family, payloads: &[String]) -> Registration {
        let mangled = mangle(family, payloads);

        if let Some(existing) = self.by_name.get(&mangled) {
            let collision = if existing.payload_types != payloads {
                Some(MangleCollision {
                    mangled_name: mangled.clone(),
                    stored: existing.payload_types.clone(),
                    requested: payloads.to_vec(),
                })
            } else {
                None
            };
            return Registration {
                mangled_name: mangled,
                newly_registered: false,
                collision,
            };
        }

        let descriptor = SumTypeDescriptor {
            mangled_name: mangled.clone(),
            family,
            payload_types: payloads.to_vec(),
            seq: self.order.len() as u64,
        };

        // Re-derive the key from the stored originals and compare with the
        // name actually used. The stored strings are authoritative, so a
        // mismatch is reported upward, never fixed up by guessing.
        let rederived = mangle(descriptor.family, &descriptor.payload_types);
        let collision = if rederived != mangled {
            Some(MangleCollision {
                mangled_name: mangled.clone(),
                stored: descriptor.payload_types.clone(),
                requested: payloads.to_vec(),
            })
        } else {
            None
        };

        self.by_name.insert(mangled.clone(), descriptor);
        self.order.push(mangled.clone());

        Registration {
            mangled_name: mangled,
            newly_registered: true,
            collision,
        }
    }

    /// Look up a descriptor by its mangled name.
    pub fn lookup(&self, mangled: &str) -> Option<&SumTypeDescriptor> {
        self.by_name.get(mangled)
    }

    /// Number of distinct registered instantiations.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &SumTypeDescriptor> {
        self.order.iter().map(|name| &self.by_name[name])
    }
}

/// Registry shared across concurrently compiled files.
///
/// Registrations are rare relative to lookups, so reads take the shared
/// lock and `register` only upgrades to the exclusive lock after a
/// read-locked cache probe misses. For strictly single-file use, a plain
/// [`TypeRegistry`] value needs no lock at all.
#[derive(Debug, Default)]
pub struct SharedRegistry {
    inner: RwLock<TypeRegistry>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instantiation. Fast path: a read-locked probe that
    /// returns on an exact cache hit.
    pub fn register(&self, family: Family, payloads: &[String]) -> Registration {
        let mangled = mangle(family, payloads);
        {
            let inner = self.inner.read();
            if let Some(existing) = inner.lookup(&mangled) {
                if existing.payload_types == payloads {
                    return Registration {
                        mangled_name: mangled,
                        newly_registered: false,
                        collision: None,
                    };
                }
            }
        }
        self.inner.write().register(family, payloads)
    }

    /// Look up a descriptor, cloned out of the shared map.
    pub fn lookup(&self, mangled: &str) -> Option<SumTypeDescriptor> {
        self.inner.read().lookup(mangled).cloned()
    }

    /// Run `f` with read access to the underlying registry.
    pub fn with<R>(&self, f: impl FnOnce(&TypeRegistry) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
