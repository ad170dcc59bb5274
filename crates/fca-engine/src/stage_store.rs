//! Step storage modules
//!
//! One typed accessor per stage over the durable cache, holding the stage's
//! in-progress form plus its UI toggles. Keys belong exclusively to the
//! stage's UI while the stage is active and are deleted the moment the stage
//! commits to the authoritative store.

use crate::forms::StageForm;
use fca_cache::{scoped_key, DurableCache};
use fca_store::CandidateId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// UI toggles cached alongside a stage's form data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageUiState {
    /// Letter preview open
    pub preview: bool,
    /// Currently open sub-dialog, if any
    pub open_dialog: Option<String>,
}

/// Typed cache accessor for one stage and one candidate.
#[derive(Debug, Clone)]
pub struct StageStore<F: StageForm> {
    cache: DurableCache,
    candidate_id: CandidateId,
    _marker: PhantomData<F>,
}

impl<F: StageForm> StageStore<F> {
    #[must_use]
    pub fn new(cache: DurableCache, candidate_id: CandidateId) -> Self {
        Self {
            cache,
            candidate_id,
            _marker: PhantomData,
        }
    }

    /// The in-progress form snapshot, if one is cached.
    #[must_use]
    pub fn load(&self) -> Option<F> {
        self.cache.read(&self.form_key())
    }

    /// The in-progress form, or a blank one.
    #[must_use]
    pub fn load_or_default(&self) -> F {
        self.load().unwrap_or_default()
    }

    /// Write-through save of the in-progress form.
    pub fn save(&self, form: &F) {
        self.cache.write(&self.form_key(), Some(form));
    }

    /// Whether an in-progress draft exists for this stage.
    #[must_use]
    pub fn has_draft(&self) -> bool {
        self.load().is_some()
    }

    #[must_use]
    pub fn ui(&self) -> StageUiState {
        self.cache.read_or(&self.ui_key(), StageUiState::default())
    }

    pub fn save_ui(&self, ui: &StageUiState) {
        self.cache.write(&self.ui_key(), Some(ui));
    }

    /// Read a sub-step value (multi-part wizard position, etc.).
    #[must_use]
    pub fn read_sub<T: DeserializeOwned>(&self, purpose: &str) -> Option<T> {
        self.cache
            .read(&scoped_key(purpose, self.candidate_id.as_str()))
    }

    /// Write a sub-step value; `None` deletes it.
    pub fn write_sub<T: Serialize>(&self, purpose: &str, value: Option<&T>) {
        self.cache
            .write(&scoped_key(purpose, self.candidate_id.as_str()), value);
    }

    /// Every cache key this stage owns for this candidate.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys = vec![self.form_key(), self.ui_key()];
        keys.extend(
            F::SUB_PURPOSES
                .iter()
                .map(|purpose| scoped_key(purpose, self.candidate_id.as_str())),
        );
        keys
    }

    /// Delete every key this stage owns. Called after the stage's data is
    /// durably committed.
    pub fn clear_all(&self) {
        for key in self.keys() {
            self.cache.remove(&key);
        }
    }

    fn form_key(&self) -> String {
        scoped_key(F::PURPOSE, self.candidate_id.as_str())
    }

    fn ui_key(&self) -> String {
        scoped_key(&format!("{}_ui", F::PURPOSE), self.candidate_id.as_str())
    }
}
