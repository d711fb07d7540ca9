// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! A renaming session: settings, the open folder and its current plan

use std::path::Path;
use tracing::{info, warn};

use crate::config::{Settings, SettingsStore, SettingsUpdate};
use crate::executor;
use crate::history::Journal;
use crate::lookup::TitleLookup;
use crate::plan::{BuildOutcome, CancellationFlag, PlanBuilder, RenamePlan};
use crate::{PicnameError, Result};

/// Keeps settings, the builder and the most recent plan together.
///
/// Settings changes are persisted immediately and, once a folder has been
/// opened, trigger a rebuild of its plan. Every pass runs on its own task;
/// the builder is away while it does and comes back when the pass ends.
pub struct RenameSession<L> {
    store: SettingsStore,
    settings: Settings,
    builder: Option<PlanBuilder<L>>,
    plan: RenamePlan,
    cancel: CancellationFlag,
    opened: bool,
}

impl<L: TitleLookup + 'static> RenameSession<L> {
    pub fn new(store: SettingsStore, builder: PlanBuilder<L>) -> Result<Self> {
        let settings = store.load()?;
        Ok(Self {
            store,
            settings,
            builder: Some(builder),
            plan: RenamePlan::default(),
            cancel: CancellationFlag::new(),
            opened: false,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn plan(&self) -> &RenamePlan {
        &self.plan
    }

    /// Flag that stops the pass currently running in this session
    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    /// Open `path` and plan renames for it. Returns `false` if the pass was
    /// cancelled.
    pub async fn open_path(&mut self, path: &Path) -> Result<bool> {
        self.open_path_with_progress(path, |_| {}).await
    }

    /// Like [`RenameSession::open_path`], calling `report_progress` with
    /// each progress value the running pass publishes
    pub async fn open_path_with_progress<P>(&mut self, path: &Path, report_progress: P) -> Result<bool>
    where
        P: FnMut(f64),
    {
        self.settings.last_path = path.to_string_lossy().into_owned();
        self.store.save(&self.settings)?;
        self.opened = true;
        self.rebuild(report_progress).await
    }

    /// Validate and persist a settings change.
    ///
    /// A rejected update leaves both the in-memory and stored settings as
    /// they were. Returns `false` if a resulting rebuild was cancelled.
    pub async fn change_settings(&mut self, update: &SettingsUpdate) -> Result<bool> {
        let mut settings = self.settings.clone();
        settings.apply(update)?;
        self.store.save(&settings)?;
        self.settings = settings;
        info!("Settings updated: {:?}", self.settings);

        if self.opened {
            self.rebuild(|_| {}).await
        } else {
            Ok(true)
        }
    }

    /// Rename everything in the current plan; the plan is consumed either way
    pub fn apply(&mut self, journal: Option<&Journal>) -> Result<usize> {
        let plan = std::mem::take(&mut self.plan);
        executor::apply(&plan, journal)
    }

    async fn rebuild<P>(&mut self, mut report_progress: P) -> Result<bool>
    where
        P: FnMut(f64),
    {
        self.plan = RenamePlan::default();
        let root = Path::new(&self.settings.last_path).to_path_buf();

        let builder = self.builder.take().ok_or_else(|| {
            PicnameError::Config("plan builder was lost by an earlier failed pass".to_string())
        })?;
        let mut handle = builder.spawn(root.clone(), self.settings.clone(), self.cancel.clone());

        // Ends once the pass drops its sender; the last value is still delivered
        while handle.progress.changed().await.is_ok() {
            let fraction = *handle.progress.borrow_and_update();
            report_progress(fraction);
        }

        let (builder, result) = handle.join().await?;
        self.builder = Some(builder);

        match result? {
            BuildOutcome::Completed(plan) => {
                self.plan = plan;
                Ok(true)
            }
            BuildOutcome::Cancelled => {
                warn!("Planning for {:?} was cancelled", root);
                Ok(false)
            }
        }
    }
}
