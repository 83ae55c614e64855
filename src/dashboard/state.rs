use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock, RwLockReadGuard};

use crate::insights::{EmissionAnalysis, Recommendations};
use crate::store::Snapshot;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadingFlags {
    pub data: bool,
    pub analysis: bool,
    pub recommendations: bool,
}

/// Application state shared by the dashboard surfaces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppState {
    pub operational_data: Snapshot,
    pub analysis: Option<EmissionAnalysis>,
    pub recommendations: Option<Recommendations>,
    pub loading: LoadingFlags,
    pub error: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            operational_data: Arc::new(Vec::new()),
            analysis: None,
            recommendations: None,
            loading: LoadingFlags { data: true, ..Default::default() },
            error: None,
        }
    }
}

/// State transitions
#[derive(Debug, Clone)]
pub enum Action {
    SetOperationalData(Snapshot),
    SetDataLoading(bool),
    SetAnalysisLoading(bool),
    SetAnalysisResult(Option<EmissionAnalysis>),
    SetRecommendationsLoading(bool),
    SetRecommendationsResult(Option<Recommendations>),
    SetError(Option<String>),
}

impl AppState {
    pub fn apply(&mut self, action: Action) {
        match action {
            Action::SetOperationalData(records) => self.operational_data = records,
            Action::SetDataLoading(flag) => self.loading.data = flag,
            Action::SetAnalysisLoading(flag) => self.loading.analysis = flag,
            Action::SetAnalysisResult(analysis) => {
                self.analysis = analysis;
                self.loading.analysis = false;
            }
            Action::SetRecommendationsLoading(flag) => self.loading.recommendations = flag,
            Action::SetRecommendationsResult(recommendations) => {
                self.recommendations = recommendations;
                self.loading.recommendations = false;
            }
            Action::SetError(error) => {
                self.error = error;
                self.loading = LoadingFlags::default();
            }
        }
    }
}

/// Notifications for state observers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum DashboardEvent {
    RecordsChanged { count: usize },
    AnalysisChanged,
    RecommendationsChanged,
    LoadingChanged(LoadingFlags),
    ErrorChanged(Option<String>),
}

impl DashboardEvent {
    fn for_action(action: &Action, state: &AppState) -> Self {
        match action {
            Action::SetOperationalData(records) => DashboardEvent::RecordsChanged { count: records.len() },
            Action::SetAnalysisResult(_) => DashboardEvent::AnalysisChanged,
            Action::SetRecommendationsResult(_) => DashboardEvent::RecommendationsChanged,
            Action::SetError(error) => DashboardEvent::ErrorChanged(error.clone()),
            Action::SetDataLoading(_) | Action::SetAnalysisLoading(_) | Action::SetRecommendationsLoading(_) => {
                DashboardEvent::LoadingChanged(state.loading)
            }
        }
    }
}

/// `AppState` behind a lock, mutated only through `dispatch`
pub struct SharedState {
    inner: RwLock<AppState>,
    tx: broadcast::Sender<DashboardEvent>,
}

impl SharedState {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { inner: RwLock::new(AppState::default()), tx }
    }

    /// Apply an action and notify observers
    pub async fn dispatch(&self, action: Action) {
        let event = {
            let mut state = self.inner.write().await;
            state.apply(action.clone());
            DashboardEvent::for_action(&action, &state)
        };
        let _ = self.tx.send(event);
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, AppState> {
        self.inner.read().await
    }

    /// Owned copy of the current state
    pub async fn current(&self) -> AppState {
        self.inner.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.tx.subscribe()
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
