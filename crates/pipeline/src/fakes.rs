//! Hand-rolled capability fakes with call counters, for exercising the
//! engine's short-circuit and fail-closed contracts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;

use adweave_core::{
    CandidateProduct, ChatTurn, CreativeBrief, OpportunityAssessment, Vertical,
};

use crate::capabilities::{
    NarrativeGenerator, OrchestrationGenerator, ProductRetriever, ReceptivityClassifier,
};

pub(crate) struct FakeClassifier {
    assessment: Option<OpportunityAssessment>,
    calls: AtomicUsize,
    last_context_len: AtomicUsize,
}

impl FakeClassifier {
    pub(crate) fn opportunity(opportunity: bool) -> Arc<Self> {
        Arc::new(Self {
            assessment: Some(OpportunityAssessment {
                opportunity,
                reasoning: "scripted verdict".to_string(),
            }),
            calls: AtomicUsize::new(0),
            last_context_len: AtomicUsize::new(0),
        })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self {
            assessment: None,
            calls: AtomicUsize::new(0),
            last_context_len: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_context_len(&self) -> usize {
        self.last_context_len.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReceptivityClassifier for FakeClassifier {
    async fn assess(&self, context_turns: &[ChatTurn]) -> Result<OpportunityAssessment> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_context_len.store(context_turns.len(), Ordering::SeqCst);
        match &self.assessment {
            Some(assessment) => Ok(assessment.clone()),
            None => bail!("classifier capability unavailable"),
        }
    }
}

pub(crate) struct FakeRetriever {
    candidates: Option<Vec<CandidateProduct>>,
    calls: AtomicUsize,
}

impl FakeRetriever {
    pub(crate) fn with_candidates(candidates: Vec<CandidateProduct>) -> Arc<Self> {
        Arc::new(Self { candidates: Some(candidates), calls: AtomicUsize::new(0) })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self { candidates: None, calls: AtomicUsize::new(0) })
    }

    pub(crate) fn candidate(id: &str) -> CandidateProduct {
        CandidateProduct {
            id: id.to_string(),
            document: format!("Catalog entry for {id}."),
            attributes: Default::default(),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProductRetriever for FakeRetriever {
    async fn search(
        &self,
        _query: &str,
        _vertical: Vertical,
        _top_k: usize,
    ) -> Result<Vec<CandidateProduct>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.candidates {
            Some(candidates) => Ok(candidates.clone()),
            None => bail!("catalog unreachable"),
        }
    }
}

pub(crate) struct FakeOrchestrator {
    raw: Option<String>,
    calls: AtomicUsize,
}

impl FakeOrchestrator {
    pub(crate) fn returning(raw: String) -> Arc<Self> {
        Arc::new(Self { raw: Some(raw), calls: AtomicUsize::new(0) })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self { raw: None, calls: AtomicUsize::new(0) })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrchestrationGenerator for FakeOrchestrator {
    async fn orchestrate(
        &self,
        _history: &[ChatTurn],
        _vertical: Vertical,
        _candidates: &[CandidateProduct],
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.raw {
            Some(raw) => Ok(raw.clone()),
            None => bail!("orchestration capability unavailable"),
        }
    }
}

pub(crate) struct FakeNarrator {
    text: Option<String>,
    calls: AtomicUsize,
}

impl FakeNarrator {
    pub(crate) fn returning(text: impl Into<String>) -> Arc<Self> {
        Arc::new(Self { text: Some(text.into()), calls: AtomicUsize::new(0) })
    }

    pub(crate) fn failing() -> Arc<Self> {
        Arc::new(Self { text: None, calls: AtomicUsize::new(0) })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NarrativeGenerator for FakeNarrator {
    async fn narrate(
        &self,
        _history: &[ChatTurn],
        _vertical: Vertical,
        _brief: &CreativeBrief,
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.text {
            Some(text) => Ok(text.clone()),
            None => bail!("narration capability unavailable"),
        }
    }
}
