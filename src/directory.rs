use crate::{error::Error, knob::Knob};
use fnv::FnvBuildHasher;
use hashbrown::HashMap;

/// One registered (knob, CPU) pairing.
#[derive(Clone, Debug)]
pub(crate) struct Observation {
    pub(crate) knob: Knob,
    pub(crate) cpu: usize,
}

/// Knob-name cache and observation list.
///
/// Names resolve through the access library exactly once; later lookups hit
/// the cache regardless of which CPU registers the name.  Observations live
/// in an append-only list whose indices are the dense, never-reused ids the
/// host holds on to.
#[derive(Default)]
pub(crate) struct Directory {
    knobs: HashMap<String, Knob, FnvBuildHasher>,
    observations: Vec<Observation>,
}

impl Directory {
    /// Returns the cached handle for a name, resolving it with `lookup` on
    /// first use.
    pub(crate) fn resolve_with<F>(&mut self, name: &str, lookup: F) -> Result<Knob, Error>
    where
        F: FnOnce(&str) -> Result<Knob, Error>,
    {
        if let Some(knob) = self.knobs.get(name) {
            return Ok(knob.clone());
        }

        let knob = lookup(name)?;
        self.knobs.insert(name.to_string(), knob.clone());
        Ok(knob)
    }

    /// Appends a new observation, returning its id.
    pub(crate) fn observe(&mut self, knob: Knob, cpu: usize) -> usize {
        let id = self.observations.len();
        self.observations.push(Observation { knob, cpu });
        id
    }

    pub(crate) fn observation(&self, id: usize) -> Option<&Observation> {
        self.observations.get(id)
    }
}
