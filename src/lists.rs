//! Named orbital lists, e.g. the occupied orbitals of each spin channel.

use color_eyre::eyre::{bail, ensure, Result};

/// Position of a list inside its [`OrbitalListRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListId(pub usize);

/// Ordered orbital indices; evaluation rows follow this order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrbitalList {
    name: String,
    indices: Box<[usize]>,
}

impl OrbitalList {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Immutable set of orbital lists, validated against the orbital count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrbitalListRegistry {
    lists: Vec<OrbitalList>,
}

impl OrbitalListRegistry {
    /// Validate and store `(name, indices)` pairs in the given order.
    pub fn build<I, S>(nmo: usize, raw: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<usize>)>,
        S: Into<String>,
    {
        let mut lists: Vec<OrbitalList> = Vec::new();
        for (name, indices) in raw {
            let name = name.into();
            ensure!(
                lists.iter().all(|l| l.name != name),
                "orbital list '{}' is defined twice",
                name
            );
            if let Some((pos, &mo)) = indices.iter().enumerate().find(|(_, &mo)| mo >= nmo) {
                bail!(
                    "orbital list '{}' entry {} is orbital {}, but only {} orbitals exist",
                    name,
                    pos,
                    mo,
                    nmo
                );
            }
            lists.push(OrbitalList {
                name,
                indices: indices.into_boxed_slice(),
            });
        }
        Ok(Self { lists })
    }

    pub fn id(&self, name: &str) -> Option<ListId> {
        self.lists.iter().position(|l| l.name == name).map(ListId)
    }

    pub fn get(&self, id: ListId) -> Option<&OrbitalList> {
        self.lists.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ListId, &OrbitalList)> {
        self.lists.iter().enumerate().map(|(i, l)| (ListId(i), l))
    }
}
