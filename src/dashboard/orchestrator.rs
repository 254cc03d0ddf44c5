use crate::core::error::DashboardError;
use crate::dashboard::filter::{filter_users, FilterCriteria, StatusFilter};
use crate::dashboard::notifications::Notification;
use crate::dashboard::reconcile::PendingLedger;
use crate::dashboard::stats::{compute_stats, DashboardStats, DEFAULT_RECENT_WINDOW_DAYS};
use crate::models::user::{CreateUserData, User, UserPatch};
use crate::repository::user_repository::UserRepository;
use crate::validation::user_input::{validate_create, validate_patch};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, RwLock};
use tracing::{debug, error, info};

const NOTIFICATION_CAPACITY: usize = 64;

/// Whether the list has been loaded at least once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    Loading,
    Ready,
}

/// Which form the presentation layer should show
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "userId", rename_all = "lowercase")]
pub enum FormState {
    Closed,
    Creating,
    Editing(String),
}

#[derive(Debug, Clone)]
pub struct DashboardSettings {
    /// Wait before the refresh that reconciles a newly created user
    pub reconcile_delay: Duration,
    /// Window for the "recently created" counter
    pub recent_window: chrono::Duration,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            reconcile_delay: Duration::from_millis(1000),
            recent_window: chrono::Duration::days(DEFAULT_RECENT_WINDOW_DAYS),
        }
    }
}

/// Everything the presentation layer renders, recomputed after each change
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub users: Vec<User>,
    pub stats: DashboardStats,
    pub criteria: FilterCriteria,
    pub load_state: LoadState,
    pub refreshing: bool,
    pub form: FormState,
    /// Users with local changes a refresh has not confirmed yet
    pub pending: Vec<String>,
}

struct DashboardState {
    users: Vec<User>,
    criteria: FilterCriteria,
    load_state: LoadState,
    form: FormState,
    ledger: PendingLedger,
}

impl DashboardState {
    fn new() -> Self {
        Self {
            users: Vec::new(),
            criteria: FilterCriteria::default(),
            load_state: LoadState::Loading,
            form: FormState::Closed,
            ledger: PendingLedger::new(),
        }
    }

    fn view(&self, settings: &DashboardSettings) -> DashboardView {
        DashboardView {
            users: filter_users(&self.users, &self.criteria),
            stats: compute_stats(&self.users, Utc::now(), settings.recent_window),
            criteria: self.criteria.clone(),
            load_state: self.load_state,
            refreshing: self.ledger.refreshes_in_flight() > 0,
            form: self.form.clone(),
            pending: self.ledger.pending_ids(),
        }
    }
}

struct Inner {
    repository: UserRepository,
    settings: DashboardSettings,
    state: RwLock<DashboardState>,
    view_tx: watch::Sender<DashboardView>,
    notify_tx: broadcast::Sender<Notification>,
}

/// Owns the authoritative user list and drives every mutation.
///
/// Cloning is cheap and every clone shares the same state. The derived view
/// is republished on the watch channel after each change of the list or the
/// filter criteria; operation outcomes go out on the notification channel.
/// A failed operation never modifies the list.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<Inner>,
}

impl Dashboard {
    pub fn new(repository: UserRepository, settings: DashboardSettings) -> Self {
        let state = DashboardState::new();
        let (view_tx, _) = watch::channel(state.view(&settings));
        let (notify_tx, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        Self {
            inner: Arc::new(Inner {
                repository,
                settings,
                state: RwLock::new(state),
                view_tx,
                notify_tx,
            }),
        }
    }

    pub fn subscribe_view(&self) -> watch::Receiver<DashboardView> {
        self.inner.view_tx.subscribe()
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.notify_tx.subscribe()
    }

    /// Latest published view
    pub fn view(&self) -> DashboardView {
        self.inner.view_tx.borrow().clone()
    }

    /// The authoritative list, unfiltered
    pub async fn users(&self) -> Vec<User> {
        self.inner.state.read().await.users.clone()
    }

    pub async fn filtered_users(&self) -> Vec<User> {
        let state = self.inner.state.read().await;
        filter_users(&state.users, &state.criteria)
    }

    pub async fn stats(&self) -> DashboardStats {
        let state = self.inner.state.read().await;
        compute_stats(&state.users, Utc::now(), self.inner.settings.recent_window)
    }

    pub async fn criteria(&self) -> FilterCriteria {
        self.inner.state.read().await.criteria.clone()
    }

    pub async fn load_state(&self) -> LoadState {
        self.inner.state.read().await.load_state
    }

    pub async fn is_refreshing(&self) -> bool {
        self.inner.state.read().await.ledger.refreshes_in_flight() > 0
    }

    pub async fn is_pending(&self, id: &str) -> bool {
        self.inner.state.read().await.ledger.is_pending(id)
    }

    /// Reload the whole list from the store.
    ///
    /// On failure the current list stays as it is.
    pub async fn refresh(&self) -> Result<usize, DashboardError> {
        let started_at = {
            let mut state = self.inner.state.write().await;
            let started_at = state.ledger.begin_refresh();
            self.publish(&state);
            started_at
        };

        let result = self.inner.repository.list().await;

        let mut state = self.inner.state.write().await;

        match result {
            Ok(fetched) => {
                state.users = state.ledger.reconcile(fetched, started_at);
                state.load_state = LoadState::Ready;
                let count = state.users.len();
                self.publish(&state);
                drop(state);

                info!(users = count, "Dashboard refreshed");
                self.notify(Notification::success(
                    "Success",
                    format!("Loaded {} users", count),
                ));
                Ok(count)
            }
            Err(e) => {
                state.ledger.abandon_refresh();
                self.publish(&state);
                drop(state);

                error!(error = %e, "Failed to refresh users");
                self.notify(Notification::error(
                    "Connection Error",
                    "Failed to load users from the store. Please check your configuration.",
                ));
                Err(e.into())
            }
        }
    }

    /// Create a user and show it immediately.
    ///
    /// The new user is marked pending and a reconciling refresh is scheduled
    /// after the configured delay.
    pub async fn create_user(&self, data: CreateUserData) -> Result<User, DashboardError> {
        let data = data.normalized();
        if let Err(errors) = validate_create(&data) {
            debug!(errors = %errors, "Rejected invalid user");
            return Err(DashboardError::ValidationFailed(errors));
        }

        match self.inner.repository.create(data).await {
            Ok(user) => {
                let mut state = self.inner.state.write().await;
                state.users.retain(|u| u.id != user.id);
                state.users.insert(0, user.clone());
                state.ledger.record_created(user.clone());
                state.form = FormState::Closed;
                self.publish(&state);
                drop(state);

                self.notify(Notification::success(
                    "User Created",
                    format!("{} has been successfully added", user.name),
                ));
                self.schedule_reconcile();
                Ok(user)
            }
            Err(e) => {
                error!(error = %e, "Failed to create user");
                self.notify(Notification::error("Error", "Failed to create user"));
                Err(e.into())
            }
        }
    }

    /// Update a user in place, keeping its position in the list
    pub async fn update_user(&self, id: &str, patch: UserPatch) -> Result<User, DashboardError> {
        let patch = patch.normalized();
        if let Err(errors) = validate_patch(&patch) {
            debug!(user_id = id, errors = %errors, "Rejected invalid update");
            return Err(DashboardError::ValidationFailed(errors));
        }

        match self.inner.repository.update(id, &patch).await {
            Ok(user) => {
                let mut state = self.inner.state.write().await;
                if let Some(slot) = state.users.iter_mut().find(|u| u.id == id) {
                    *slot = user.clone();
                }
                state.ledger.record_updated(user.clone());
                if state.form == FormState::Editing(id.to_string()) {
                    state.form = FormState::Closed;
                }
                self.publish(&state);
                drop(state);

                self.notify(Notification::success(
                    "User Updated",
                    format!("{} has been successfully updated", user.name),
                ));
                Ok(user)
            }
            Err(e) => {
                error!(user_id = id, error = %e, "Failed to update user");
                self.notify(Notification::error("Error", "Failed to update user"));
                Err(e.into())
            }
        }
    }

    pub async fn delete_user(&self, id: &str) -> Result<(), DashboardError> {
        match self.inner.repository.delete(id).await {
            Ok(()) => {
                let mut state = self.inner.state.write().await;
                state.users.retain(|u| u.id != id);
                state.ledger.record_deleted(id);
                if state.form == FormState::Editing(id.to_string()) {
                    state.form = FormState::Closed;
                }
                self.publish(&state);
                drop(state);

                self.notify(Notification::success(
                    "User Deleted",
                    "User has been successfully removed",
                ));
                Ok(())
            }
            Err(e) => {
                error!(user_id = id, error = %e, "Failed to delete user");
                self.notify(Notification::error("Error", "Failed to delete user"));
                Err(e.into())
            }
        }
    }

    /// Fetch one user straight from the store
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, DashboardError> {
        self.inner.repository.get_by_id(id).await.map_err(|e| {
            error!(user_id = id, error = %e, "Failed to fetch user");
            self.notify(Notification::error("Error", "Failed to load user"));
            e.into()
        })
    }

    /// Name-prefix search against the store; see `UserRepository::search`
    pub async fn search(&self, term: &str) -> Result<Vec<User>, DashboardError> {
        self.inner.repository.search(term).await.map_err(|e| {
            error!(term = term, error = %e, "Failed to search users");
            self.notify(Notification::error("Error", "Failed to search users"));
            e.into()
        })
    }

    pub async fn set_search_term(&self, term: impl Into<String>) {
        let mut state = self.inner.state.write().await;
        state.criteria.search_term = term.into();
        self.publish(&state);
    }

    pub async fn set_status_filter(&self, filter: StatusFilter) {
        let mut state = self.inner.state.write().await;
        state.criteria.status = filter;
        self.publish(&state);
    }

    /// Replace the search term and the status filter together, so the view
    /// never pairs the new term with the old status
    pub async fn set_criteria(&self, criteria: FilterCriteria) {
        let mut state = self.inner.state.write().await;
        state.criteria = criteria;
        self.publish(&state);
    }

    pub async fn open_create_form(&self) {
        let mut state = self.inner.state.write().await;
        state.form = FormState::Creating;
        self.publish(&state);
    }

    /// Start editing a user from the current list; `None` if it is not there
    pub async fn open_edit_form(&self, id: &str) -> Option<User> {
        let mut state = self.inner.state.write().await;
        let user = state.users.iter().find(|u| u.id == id).cloned()?;
        state.form = FormState::Editing(user.id.clone());
        self.publish(&state);
        Some(user)
    }

    pub async fn close_form(&self) {
        let mut state = self.inner.state.write().await;
        state.form = FormState::Closed;
        self.publish(&state);
    }

    fn publish(&self, state: &DashboardState) {
        self.inner.view_tx.send_replace(state.view(&self.inner.settings));
    }

    fn notify(&self, notification: Notification) {
        // No subscribers is fine: nobody is listening yet
        let _ = self.inner.notify_tx.send(notification);
    }

    fn schedule_reconcile(&self) {
        let dashboard = self.clone();
        let delay = self.inner.settings.reconcile_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!("Running reconciling refresh");
            // Failures are already logged and announced by refresh()
            let _ = dashboard.refresh().await;
        });
    }
}
